use std::collections::HashMap;
use std::net::IpAddr;

use cmdmon_wire::{ClientAccessRow, ClientAccessesPage};

/// Per-client request accounting used to answer `CLIENT-ACCESSES-BY-INDEX`
/// (§4.5 "Reporting", §6 "ClientLog").
pub trait ClientLog {
    fn record_access(&mut self, addr: IpAddr);
    fn record_dropped(&mut self, addr: IpAddr);

    /// Whether the table is currently serving data. `CLIENT-ACCESSES-BY-INDEX`
    /// replies `INACTIVE` instead of paging when this is `false` (§4.5
    /// "Paged reporting" outcome (a)).
    fn is_active(&self) -> bool;
    fn set_active(&mut self, active: bool);

    /// Returns up to `n_clients` rows starting at `first_index`, in a stable
    /// order, plus the index to resume from and the total known client
    /// count (§4.5 "CLIENT-ACCESSES-BY-INDEX is paged"). `next_index` is
    /// always `first_index + n_clients` — the requested window, not the
    /// number of rows actually returned — so a caller can keep paging past
    /// the end of the table without the response re-describing a window it
    /// never asked for.
    fn page(&self, first_index: u32, n_clients: u32) -> ClientAccessesPage;
}

#[derive(Default, Clone, Copy)]
struct Counters {
    n_requests: u32,
    n_dropped: u32,
}

/// In-memory client log keyed by source address, ordered by first-seen
/// insertion order so that paging is stable across calls.
pub struct InMemoryClientLog {
    order: Vec<IpAddr>,
    counters: HashMap<IpAddr, Counters>,
    active: bool,
}

impl Default for InMemoryClientLog {
    fn default() -> Self {
        Self {
            order: Vec::new(),
            counters: HashMap::new(),
            active: true,
        }
    }
}

impl InMemoryClientLog {
    pub fn new() -> Self {
        Self::default()
    }

    fn touch(&mut self, addr: IpAddr) -> &mut Counters {
        if !self.counters.contains_key(&addr) {
            self.order.push(addr);
        }
        self.counters.entry(addr).or_default()
    }
}

impl ClientLog for InMemoryClientLog {
    fn record_access(&mut self, addr: IpAddr) {
        self.touch(addr).n_requests += 1;
    }

    fn record_dropped(&mut self, addr: IpAddr) {
        self.touch(addr).n_dropped += 1;
    }

    fn is_active(&self) -> bool {
        self.active
    }

    fn set_active(&mut self, active: bool) {
        self.active = active;
    }

    fn page(&self, first_index: u32, n_clients: u32) -> ClientAccessesPage {
        let start = first_index as usize;
        let rows: Vec<ClientAccessRow> = self
            .order
            .iter()
            .skip(start)
            .take(n_clients as usize)
            .map(|addr| {
                let counters = self.counters.get(addr).copied().unwrap_or_default();
                ClientAccessRow {
                    ip: (*addr).into(),
                    last_access_ago_seconds: 0,
                    n_requests: counters.n_requests,
                    n_dropped: counters.n_dropped,
                }
            })
            .collect();

        let next_index = start as u32 + n_clients;

        ClientAccessesPage {
            rows,
            next_index,
            n_indices: self.order.len() as u32,
        }
    }
}
