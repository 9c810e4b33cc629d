use cmdmon_wire::{NtpFloat, SmoothingReport, SmoothtimeMode};

/// Time-smoothing state (§6 "Smooth"): when active, clients are told a
/// gradually-converging offset instead of the raw corrected time, to avoid
/// visible leap-second or large-step discontinuities.
pub trait Smooth {
    fn apply(&mut self, mode: SmoothtimeMode);
    fn report(&self) -> SmoothingReport;
}

#[derive(Debug, Clone, Copy)]
pub struct SimpleSmooth {
    active: bool,
    leap_only: bool,
    offset: NtpFloat,
    freq_ppm: NtpFloat,
}

impl Default for SimpleSmooth {
    fn default() -> Self {
        Self {
            active: false,
            leap_only: false,
            offset: NtpFloat(0.0),
            freq_ppm: NtpFloat(0.0),
        }
    }
}

impl SimpleSmooth {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Smooth for SimpleSmooth {
    fn apply(&mut self, mode: SmoothtimeMode) {
        match mode {
            SmoothtimeMode::Activate => self.active = true,
            SmoothtimeMode::Reset => {
                self.active = false;
                self.offset = NtpFloat(0.0);
                self.freq_ppm = NtpFloat(0.0);
            }
        }
    }

    fn report(&self) -> SmoothingReport {
        SmoothingReport {
            active: self.active,
            leap_only: self.leap_only,
            offset: self.offset,
            freq_ppm: self.freq_ppm,
            wander_ppm: NtpFloat(0.0),
            last_update_ago_seconds: NtpFloat(0.0),
            remaining_seconds: NtpFloat(0.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn activate_then_reset() {
        let mut smooth = SimpleSmooth::new();
        smooth.apply(SmoothtimeMode::Activate);
        assert!(smooth.report().active);

        smooth.apply(SmoothtimeMode::Reset);
        assert!(!smooth.report().active);
    }
}
