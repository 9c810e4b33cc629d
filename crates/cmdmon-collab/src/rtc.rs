use cmdmon_wire::RtcReport;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RtcError {
    #[error("no real-time clock is configured")]
    Unsupported,
}

/// The real-time (battery-backed) hardware clock driver (§6 "Rtc").
/// `TRIMRTC` and `WRITERTC` are both housekeeping operations that a daemon
/// with no RTC configured must refuse rather than silently no-op (§4.5
/// "Housekeeping": report `Unsupported` via the handler's own status
/// mapping).
pub trait Rtc {
    fn report(&self) -> Result<RtcReport, RtcError>;
    fn trim(&mut self) -> Result<(), RtcError>;
    fn write(&mut self) -> Result<(), RtcError>;
}

/// An `Rtc` that reports no hardware RTC is present, for daemon builds
/// that never configured one.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullRtc;

impl Rtc for NullRtc {
    fn report(&self) -> Result<RtcReport, RtcError> {
        Err(RtcError::Unsupported)
    }

    fn trim(&mut self) -> Result<(), RtcError> {
        Err(RtcError::Unsupported)
    }

    fn write(&mut self) -> Result<(), RtcError> {
        Err(RtcError::Unsupported)
    }
}
