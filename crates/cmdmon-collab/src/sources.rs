use std::net::IpAddr;

use cmdmon_wire::{ActivityReport, SourceDataRow, SourceParams, SourcestatsRow};

/// Outcome of `ADD-SERVER`/`ADD-PEER` (§4.5 "Source population").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceAddOutcome {
    Added,
    AlreadyKnown,
    TooMany,
    InvalidAf,
}

/// Outcome of a by-address source control operation (§4.5 "Source
/// control").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceControlOutcome {
    Ok,
    NoSuchSource,
}

/// The NTP source registry (§6 "Sources").
pub trait Sources {
    fn add_server(&mut self, addr: IpAddr, port: u16, params: SourceParams) -> SourceAddOutcome;
    fn add_peer(&mut self, addr: IpAddr, port: u16, params: SourceParams) -> SourceAddOutcome;
    fn remove(&mut self, addr: IpAddr) -> SourceControlOutcome;

    /// Returns the number of sources matched by `(mask, address)`.
    fn set_online(&mut self, mask: IpAddr, address: IpAddr) -> usize;
    fn set_offline(&mut self, mask: IpAddr, address: IpAddr) -> usize;
    fn initiate_burst(
        &mut self,
        mask: IpAddr,
        address: IpAddr,
        n_good_samples: u32,
        n_total_samples: u32,
    ) -> usize;

    fn modify_minpoll(&mut self, addr: IpAddr, value: i32) -> SourceControlOutcome;
    fn modify_maxpoll(&mut self, addr: IpAddr, value: i32) -> SourceControlOutcome;
    fn modify_min_stratum(&mut self, addr: IpAddr, value: i32) -> SourceControlOutcome;
    fn modify_poll_target(&mut self, addr: IpAddr, value: i32) -> SourceControlOutcome;
    fn modify_max_delay(&mut self, addr: IpAddr, value: f64) -> SourceControlOutcome;
    fn modify_max_delay_ratio(&mut self, addr: IpAddr, value: f64) -> SourceControlOutcome;
    fn modify_max_delay_dev_ratio(&mut self, addr: IpAddr, value: f64) -> SourceControlOutcome;

    fn n_sources(&self) -> u32;
    fn report_by_index(&self, index: u32) -> Option<SourceDataRow>;
    fn stats_by_index(&self, index: u32) -> Option<SourcestatsRow>;
    fn activity(&self) -> ActivityReport;
    fn refresh_addresses(&mut self);
}

struct Entry {
    addr: IpAddr,
    port: u16,
    is_peer: bool,
    online: bool,
    min_poll: i32,
    max_poll: i32,
    min_stratum: i32,
    poll_target: i32,
    max_delay: f64,
    max_delay_ratio: f64,
    max_delay_dev_ratio: f64,
}

/// In-memory `Sources` registry, enough to exercise ADD/DEL/control/report
/// dispatch without a real NTP engine behind it.
#[derive(Default)]
pub struct InMemorySources {
    entries: Vec<Entry>,
    max_sources: usize,
}

impl InMemorySources {
    pub fn new(max_sources: usize) -> Self {
        Self {
            entries: Vec::new(),
            max_sources,
        }
    }

    fn find(&self, addr: IpAddr) -> Option<usize> {
        self.entries.iter().position(|e| e.addr == addr)
    }

    fn matches_pattern(addr: IpAddr, mask: IpAddr, pattern: IpAddr) -> bool {
        // A mask of the unspecified address means "match everything"; this
        // mirrors NTP_Sources' broadcast wildcard convention.
        if mask.is_unspecified() {
            return true;
        }
        addr == pattern
    }
}

impl Sources for InMemorySources {
    fn add_server(&mut self, addr: IpAddr, port: u16, params: SourceParams) -> SourceAddOutcome {
        self.add(addr, port, params, false)
    }

    fn add_peer(&mut self, addr: IpAddr, port: u16, params: SourceParams) -> SourceAddOutcome {
        self.add(addr, port, params, true)
    }

    fn remove(&mut self, addr: IpAddr) -> SourceControlOutcome {
        match self.find(addr) {
            Some(idx) => {
                self.entries.remove(idx);
                SourceControlOutcome::Ok
            }
            None => SourceControlOutcome::NoSuchSource,
        }
    }

    fn set_online(&mut self, mask: IpAddr, address: IpAddr) -> usize {
        let mut count = 0;
        for entry in &mut self.entries {
            if Self::matches_pattern(entry.addr, mask, address) {
                entry.online = true;
                count += 1;
            }
        }
        count
    }

    fn set_offline(&mut self, mask: IpAddr, address: IpAddr) -> usize {
        let mut count = 0;
        for entry in &mut self.entries {
            if Self::matches_pattern(entry.addr, mask, address) {
                entry.online = false;
                count += 1;
            }
        }
        count
    }

    fn initiate_burst(
        &mut self,
        mask: IpAddr,
        address: IpAddr,
        _n_good_samples: u32,
        _n_total_samples: u32,
    ) -> usize {
        self.entries
            .iter()
            .filter(|e| Self::matches_pattern(e.addr, mask, address))
            .count()
    }

    fn modify_minpoll(&mut self, addr: IpAddr, value: i32) -> SourceControlOutcome {
        self.with_entry(addr, |e| e.min_poll = value)
    }

    fn modify_maxpoll(&mut self, addr: IpAddr, value: i32) -> SourceControlOutcome {
        self.with_entry(addr, |e| e.max_poll = value)
    }

    fn modify_min_stratum(&mut self, addr: IpAddr, value: i32) -> SourceControlOutcome {
        self.with_entry(addr, |e| e.min_stratum = value)
    }

    fn modify_poll_target(&mut self, addr: IpAddr, value: i32) -> SourceControlOutcome {
        self.with_entry(addr, |e| e.poll_target = value)
    }

    fn modify_max_delay(&mut self, addr: IpAddr, value: f64) -> SourceControlOutcome {
        self.with_entry(addr, |e| e.max_delay = value)
    }

    fn modify_max_delay_ratio(&mut self, addr: IpAddr, value: f64) -> SourceControlOutcome {
        self.with_entry(addr, |e| e.max_delay_ratio = value)
    }

    fn modify_max_delay_dev_ratio(&mut self, addr: IpAddr, value: f64) -> SourceControlOutcome {
        self.with_entry(addr, |e| e.max_delay_dev_ratio = value)
    }

    fn n_sources(&self) -> u32 {
        self.entries.len() as u32
    }

    fn report_by_index(&self, index: u32) -> Option<SourceDataRow> {
        let entry = self.entries.get(index as usize)?;
        Some(SourceDataRow {
            address: entry.addr.into(),
            poll: entry.min_poll as i8,
            stratum: 0,
            state: entry.online as u8,
            mode: entry.is_peer as u8,
            flags: 0,
            reachability: 0,
            since_sample: 0,
            orig_latest_meas: cmdmon_wire::NtpFloat(0.0),
            latest_meas: cmdmon_wire::NtpFloat(0.0),
            latest_meas_err: cmdmon_wire::NtpFloat(0.0),
        })
    }

    fn stats_by_index(&self, index: u32) -> Option<SourcestatsRow> {
        let entry = self.entries.get(index as usize)?;
        Some(SourcestatsRow {
            ref_id: 0,
            address: entry.addr.into(),
            n_samples: 0,
            n_runs: 0,
            span_seconds: 0,
            std_dev: cmdmon_wire::NtpFloat(0.0),
            resid_freq_ppm: cmdmon_wire::NtpFloat(0.0),
            skew_ppm: cmdmon_wire::NtpFloat(0.0),
            est_offset: cmdmon_wire::NtpFloat(0.0),
            est_offset_err: cmdmon_wire::NtpFloat(0.0),
        })
    }

    fn activity(&self) -> ActivityReport {
        let online = self.entries.iter().filter(|e| e.online).count() as i32;
        let offline = self.entries.len() as i32 - online;
        ActivityReport {
            online,
            offline,
            burst_online: 0,
            burst_offline: 0,
            unresolved: 0,
        }
    }

    fn refresh_addresses(&mut self) {}
}

impl InMemorySources {
    fn add(
        &mut self,
        addr: IpAddr,
        port: u16,
        params: SourceParams,
        is_peer: bool,
    ) -> SourceAddOutcome {
        if self.find(addr).is_some() {
            return SourceAddOutcome::AlreadyKnown;
        }

        if self.max_sources > 0 && self.entries.len() >= self.max_sources {
            return SourceAddOutcome::TooMany;
        }

        self.entries.push(Entry {
            addr,
            port,
            is_peer,
            online: true,
            min_poll: params.min_poll as i32,
            max_poll: params.max_poll as i32,
            min_stratum: params.min_stratum as i32,
            poll_target: params.poll_target as i32,
            max_delay: params.max_delay.0,
            max_delay_ratio: params.max_delay_ratio.0,
            max_delay_dev_ratio: params.max_delay_dev_ratio.0,
        });

        SourceAddOutcome::Added
    }

    fn with_entry(&mut self, addr: IpAddr, f: impl FnOnce(&mut Entry)) -> SourceControlOutcome {
        match self.find(addr) {
            Some(idx) => {
                f(&mut self.entries[idx]);
                SourceControlOutcome::Ok
            }
            None => SourceControlOutcome::NoSuchSource,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cmdmon_wire::NtpFloat;

    fn default_params() -> SourceParams {
        SourceParams {
            min_poll: 6,
            max_poll: 10,
            presend_min_poll: 0,
            min_stratum: 0,
            poll_target: 6,
            version: 4,
            max_sources: -1,
            min_samples: -1,
            max_samples: -1,
            filter_length: -1,
            max_delay: NtpFloat(3.0),
            max_delay_ratio: NtpFloat(0.0),
            max_delay_dev_ratio: NtpFloat(0.0),
            min_delay: NtpFloat(0.0),
            asymmetry: NtpFloat(0.0),
            offset: NtpFloat(0.0),
            flags: 0,
        }
    }

    #[test]
    fn add_server_then_n_sources_reflects_it() {
        let mut sources = InMemorySources::new(0);
        let addr: IpAddr = "192.0.2.1".parse().unwrap();

        assert_eq!(
            sources.add_server(addr, 123, default_params()),
            SourceAddOutcome::Added
        );
        assert_eq!(sources.n_sources(), 1);
        assert_eq!(
            sources.add_server(addr, 123, default_params()),
            SourceAddOutcome::AlreadyKnown
        );
    }

    #[test]
    fn too_many_sources_is_enforced() {
        let mut sources = InMemorySources::new(1);
        sources.add_server("192.0.2.1".parse().unwrap(), 123, default_params());

        assert_eq!(
            sources.add_server("192.0.2.2".parse().unwrap(), 123, default_params()),
            SourceAddOutcome::TooMany
        );
    }

    #[test]
    fn del_source_on_unknown_address_reports_no_such_source() {
        let mut sources = InMemorySources::new(0);
        assert_eq!(
            sources.remove("192.0.2.9".parse().unwrap()),
            SourceControlOutcome::NoSuchSource
        );
    }
}
