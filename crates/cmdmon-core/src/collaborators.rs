use cmdmon_collab::{
    AccessFilter, ClientLog, Config, Keys, LocalClock, Manual, Reference, RefClocks, Rtc,
    Scheduler, Smooth, Sources,
};

/// Every external subsystem the dispatcher calls into (§6 "Collaborator
/// contracts"), gathered behind trait objects so `cmdmon-core` depends only
/// on the abstract contracts and never on a concrete clock-discipline
/// engine.
pub struct Collaborators {
    pub sources: Box<dyn Sources + Send>,
    pub refclocks: Box<dyn RefClocks + Send>,
    pub local_clock: Box<dyn LocalClock + Send>,
    pub reference: Box<dyn Reference + Send>,
    pub manual: Box<dyn Manual + Send>,
    pub smooth: Box<dyn Smooth + Send>,
    pub rtc: Box<dyn Rtc + Send>,
    pub access: Box<dyn AccessFilter + Send>,
    pub client_log: Box<dyn ClientLog + Send>,
    pub keys: Box<dyn Keys + Send>,
    pub scheduler: Box<dyn Scheduler + Send>,
    pub config: Box<dyn Config + Send>,
}

impl Collaborators {
    /// Wires up every collaborator's in-memory reference implementation
    /// (§6: "the reference implementations here exist only so `cmdmon-core`
    /// is independently buildable, runnable, and testable").
    pub fn in_memory(max_sources: usize) -> Self {
        use cmdmon_collab::{
            AccessTable, DaemonScheduler, InMemoryClientLog, InMemorySources, NoopConfig,
            NullKeys, NullRtc, SimpleLocalClock, SimpleManual, SimpleReference, SimpleSmooth,
        };

        Self {
            sources: Box::new(InMemorySources::new(max_sources)),
            refclocks: Box::new(cmdmon_collab::InMemoryRefClocks::new(0)),
            local_clock: Box::new(SimpleLocalClock::new()),
            reference: Box::new(SimpleReference::new()),
            manual: Box::new(SimpleManual::new()),
            smooth: Box::new(SimpleSmooth::new()),
            rtc: Box::new(NullRtc),
            access: Box::new(AccessTable::new()),
            client_log: Box::new(InMemoryClientLog::new()),
            keys: Box::new(NullKeys::default()),
            scheduler: Box::new(DaemonScheduler::new()),
            config: Box::new(NoopConfig::new()),
        }
    }
}
