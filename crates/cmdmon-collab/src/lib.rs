//! Trait definitions for every external collaborator the C/M core dispatches
//! into (§6 "Collaborator contracts"), plus one in-memory reference
//! implementation of each.
//!
//! In a full clock-discipline daemon every one of these lives in its own
//! subsystem (the NTP source engine, the reference-clock registry, the
//! local-clock driver, ...) and is genuinely out of scope for this crate
//! (§1 "Deliberately out of scope"). The reference implementations here
//! exist only so `cmdmon-core` is independently buildable, runnable, and
//! testable — the same role the teacher's `ServerStorage` plays for the
//! abstract `Storage` trait.

pub mod access_filter;
pub mod client_log;
pub mod config;
pub mod keys;
pub mod local_clock;
pub mod manual;
pub mod reference;
pub mod refclocks;
pub mod rtc;
pub mod scheduler;
pub mod smooth;
pub mod sources;

pub use access_filter::{AccessFilter, AccessTable, AccessVerdict, Namespace};
pub use client_log::{ClientLog, InMemoryClientLog};
pub use config::{BindAddresses, Config, NoopConfig};
pub use keys::{Keys, NullKeys};
pub use local_clock::{LocalClock, SimpleLocalClock};
pub use manual::{Manual, ManualError, SimpleManual};
pub use reference::{Reference, SimpleReference};
pub use refclocks::{InMemoryRefClocks, RefClocks};
pub use rtc::{NullRtc, Rtc, RtcError};
pub use scheduler::{DaemonScheduler, Scheduler};
pub use smooth::{Smooth, SimpleSmooth};
pub use sources::{InMemorySources, SourceAddOutcome, SourceControlOutcome, Sources};
