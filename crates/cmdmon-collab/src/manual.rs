use cmdmon_wire::{ManualMode, ManualSampleRow, NtpFloat, Timestamp};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ManualError {
    #[error("manual mode is not enabled")]
    NotEnabled,
    #[error("no manual sample at that index")]
    NoSuchSample,
}

/// Manual-timestamp bookkeeping (§6 "Manual"). `SETTIME` is only accepted
/// while manual mode is enabled (§4.5 "Manual timestamp": "SETTIME requires
/// manual mode enabled (else NOT-ENABLED)").
pub trait Manual {
    fn set_mode(&mut self, mode: ManualMode);
    fn is_enabled(&self) -> bool;

    fn accept_timestamp(&mut self, when: Timestamp) -> Result<(), ManualError>;
    fn samples(&self) -> Vec<ManualSampleRow>;
    fn delete_sample(&mut self, index: u32) -> Result<(), ManualError>;
}

#[derive(Debug, Default)]
pub struct SimpleManual {
    enabled: bool,
    samples: Vec<ManualSampleRow>,
    next_index: u32,
}

impl SimpleManual {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Manual for SimpleManual {
    fn set_mode(&mut self, mode: ManualMode) {
        match mode {
            ManualMode::Enable => self.enabled = true,
            ManualMode::Disable => self.enabled = false,
            ManualMode::Reset => {
                self.enabled = false;
                self.samples.clear();
            }
        }
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn accept_timestamp(&mut self, when: Timestamp) -> Result<(), ManualError> {
        if !self.enabled {
            return Err(ManualError::NotEnabled);
        }

        let index = self.next_index;
        self.next_index += 1;
        self.samples.push(ManualSampleRow {
            sample_index: index,
            when,
            offset: NtpFloat(0.0),
            peer_dispersion: NtpFloat(0.0),
        });
        Ok(())
    }

    fn samples(&self) -> Vec<ManualSampleRow> {
        self.samples.clone()
    }

    fn delete_sample(&mut self, index: u32) -> Result<(), ManualError> {
        let before = self.samples.len();
        self.samples.retain(|row| row.sample_index != index);
        if self.samples.len() == before {
            return Err(ManualError::NoSuchSample);
        }
        Ok(())
    }
}
