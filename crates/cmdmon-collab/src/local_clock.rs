use cmdmon_wire::{LocalRequest, NtpFloat, TrackingReport};

/// The local clock driver (§6 "LocalClock"): owns the system clock
/// discipline loop and answers `TRACKING`, `LOCAL`, `DFREQ`, `DOFFSET`,
/// `MAKESTEP`, and `MODIFY-MAXUPDATESKEW`.
pub trait LocalClock {
    fn set_local(&mut self, request: LocalRequest);
    fn step_frequency(&mut self, delta_ppm: NtpFloat);
    fn step_offset(&mut self, seconds: NtpFloat);

    /// `MAKESTEP` with no arguments: step immediately regardless of size.
    fn step_now(&mut self);

    /// `MODIFY MAKESTEP <limit> <threshold>` (§4.5 "Clock control"): from
    /// now on, step instead of slew for the next `limit` clock updates
    /// whenever the offset exceeds `threshold` seconds.
    fn set_makestep(&mut self, limit: i32, threshold: NtpFloat);
    fn set_max_update_skew(&mut self, ppm: NtpFloat);

    fn tracking(&self) -> TrackingReport;
}

/// In-memory `LocalClock` that records the most recent configuration
/// without driving any real clock adjustment.
#[derive(Debug, Clone, Copy)]
pub struct SimpleLocalClock {
    stratum: u16,
    root_delay: NtpFloat,
    root_dispersion: NtpFloat,
    freq_ppm: NtpFloat,
    last_offset: NtpFloat,
    max_update_skew: NtpFloat,
    makestep_limit: i32,
    makestep_threshold: NtpFloat,
}

impl Default for SimpleLocalClock {
    fn default() -> Self {
        Self {
            stratum: 10,
            root_delay: NtpFloat(0.0),
            root_dispersion: NtpFloat(0.0),
            freq_ppm: NtpFloat(0.0),
            last_offset: NtpFloat(0.0),
            max_update_skew: NtpFloat(1000.0),
            makestep_limit: 0,
            makestep_threshold: NtpFloat(0.0),
        }
    }
}

impl SimpleLocalClock {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LocalClock for SimpleLocalClock {
    fn set_local(&mut self, request: LocalRequest) {
        if request.on {
            self.stratum = request.stratum as u16;
        }
        let _ = request.distance;
        let _ = request.orphan;
    }

    fn step_frequency(&mut self, delta_ppm: NtpFloat) {
        self.freq_ppm = NtpFloat(self.freq_ppm.0 + delta_ppm.0);
    }

    fn step_offset(&mut self, seconds: NtpFloat) {
        self.last_offset = seconds;
    }

    fn step_now(&mut self) {
        self.last_offset = NtpFloat(0.0);
    }

    fn set_makestep(&mut self, limit: i32, threshold: NtpFloat) {
        self.makestep_limit = limit;
        self.makestep_threshold = threshold;
    }

    fn set_max_update_skew(&mut self, ppm: NtpFloat) {
        self.max_update_skew = ppm;
    }

    fn tracking(&self) -> TrackingReport {
        TrackingReport {
            ref_id: 0,
            address: cmdmon_wire::WireIpAddr::UNSPEC,
            stratum: self.stratum,
            leap_status: 0,
            ref_time: cmdmon_wire::Timestamp {
                seconds: 0,
                microseconds: 0,
            },
            current_correction: NtpFloat(0.0),
            last_offset: self.last_offset,
            rms_offset: NtpFloat(0.0),
            freq_ppm: self.freq_ppm,
            resid_freq_ppm: NtpFloat(0.0),
            skew_ppm: NtpFloat(0.0),
            root_delay: self.root_delay,
            root_dispersion: self.root_dispersion,
            last_update_interval: NtpFloat(0.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn step_frequency_accumulates() {
        let mut clock = SimpleLocalClock::new();
        clock.step_frequency(NtpFloat(1.5));
        clock.step_frequency(NtpFloat(0.5));
        assert_eq!(clock.tracking().freq_ppm.0, 2.0);
    }

    #[test]
    fn set_local_updates_stratum_only_when_enabled() {
        let mut clock = SimpleLocalClock::new();
        clock.set_local(LocalRequest {
            on: false,
            stratum: 1,
            distance: NtpFloat(0.0),
            orphan: false,
        });
        assert_eq!(clock.tracking().stratum, 10);

        clock.set_local(LocalRequest {
            on: true,
            stratum: 1,
            distance: NtpFloat(0.0),
            orphan: false,
        });
        assert_eq!(clock.tracking().stratum, 1);
    }
}
