use binbuf::prelude::*;

use crate::{NtpFloat, Timestamp, WireError, WireIpAddr};

macro_rules! reply_tags {
    ($($variant:ident = $value:expr),+ $(,)?) => {
        /// Discriminator for [`ReplyPayload`] carried in the reply header's
        /// `reply_tag` field. `Null` is the value a template reply starts
        /// with (§4.4) before a handler fills it in.
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        #[repr(u16)]
        pub enum ReplyTag {
            $($variant = $value),+
        }

        impl TryFrom<u16> for ReplyTag {
            type Error = WireError;

            fn try_from(value: u16) -> Result<Self, Self::Error> {
                match value {
                    $($value => Ok(ReplyTag::$variant),)+
                    other => Err(WireError::UnknownReplyTag(other)),
                }
            }
        }
    };
}

reply_tags! {
    Null = 0,
    NSources = 1,
    SourceData = 2,
    Sourcestats = 3,
    Tracking = 4,
    Rtc = 5,
    Activity = 6,
    Smoothing = 7,
    ManualList = 8,
    ClientAccesses = 9,
}

impl Writeable for ReplyTag {
    type Error = BufferError;

    fn write<E: Endianness>(&self, buf: &mut impl ToWriteBuffer) -> Result<usize, Self::Error> {
        (*self as u16).write::<E>(buf)
    }
}

/// Per-source report row, as returned by `SOURCE-DATA` (§4.5 "Reporting").
#[derive(Debug, Clone, Copy)]
pub struct SourceDataRow {
    pub address: WireIpAddr,
    pub poll: i8,
    pub stratum: u8,
    pub state: u8,
    pub mode: u8,
    pub flags: u8,
    pub reachability: u8,
    pub since_sample: u32,
    pub orig_latest_meas: NtpFloat,
    pub latest_meas: NtpFloat,
    pub latest_meas_err: NtpFloat,
}

/// Per-source statistics row, as returned by `SOURCESTATS`.
#[derive(Debug, Clone, Copy)]
pub struct SourcestatsRow {
    pub ref_id: u32,
    pub address: WireIpAddr,
    pub n_samples: u32,
    pub n_runs: u32,
    pub span_seconds: u32,
    pub std_dev: NtpFloat,
    pub resid_freq_ppm: NtpFloat,
    pub skew_ppm: NtpFloat,
    pub est_offset: NtpFloat,
    pub est_offset_err: NtpFloat,
}

/// `TRACKING` report body.
#[derive(Debug, Clone, Copy)]
pub struct TrackingReport {
    pub ref_id: u32,
    pub address: WireIpAddr,
    pub stratum: u16,
    pub leap_status: u16,
    pub ref_time: Timestamp,
    pub current_correction: NtpFloat,
    pub last_offset: NtpFloat,
    pub rms_offset: NtpFloat,
    pub freq_ppm: NtpFloat,
    pub resid_freq_ppm: NtpFloat,
    pub skew_ppm: NtpFloat,
    pub root_delay: NtpFloat,
    pub root_dispersion: NtpFloat,
    pub last_update_interval: NtpFloat,
}

/// `RTCREPORT` report body.
#[derive(Debug, Clone, Copy)]
pub struct RtcReport {
    pub ref_time: Timestamp,
    pub n_samples: u16,
    pub n_runs: u16,
    pub span_seconds: u32,
    pub rtc_seconds_fast: NtpFloat,
    pub rtc_gain_rate_ppm: NtpFloat,
}

/// `ACTIVITY` report body: counts of sources in each activity bucket.
#[derive(Debug, Clone, Copy)]
pub struct ActivityReport {
    pub online: i32,
    pub offline: i32,
    pub burst_online: i32,
    pub burst_offline: i32,
    pub unresolved: i32,
}

/// `SMOOTHING` report body.
#[derive(Debug, Clone, Copy)]
pub struct SmoothingReport {
    pub active: bool,
    pub leap_only: bool,
    pub offset: NtpFloat,
    pub freq_ppm: NtpFloat,
    pub wander_ppm: NtpFloat,
    pub last_update_ago_seconds: NtpFloat,
    pub remaining_seconds: NtpFloat,
}

/// One row of the `MANUAL-LIST` reply.
#[derive(Debug, Clone, Copy)]
pub struct ManualSampleRow {
    pub sample_index: u32,
    pub when: Timestamp,
    pub offset: NtpFloat,
    pub peer_dispersion: NtpFloat,
}

/// `CLIENT-ACCESSES-BY-INDEX` page: up to
/// [`crate::constants::MAX_CLIENT_ACCESSES_PER_REPLY`] rows.
#[derive(Debug, Clone)]
pub struct ClientAccessRow {
    pub ip: WireIpAddr,
    pub last_access_ago_seconds: u32,
    pub n_requests: u32,
    pub n_dropped: u32,
}

#[derive(Debug, Clone)]
pub struct ClientAccessesPage {
    pub rows: Vec<ClientAccessRow>,
    pub next_index: u32,
    pub n_indices: u32,
}

/// Reply-tagged payload union (§3 "Reply packet"). A handler that fails for
/// a semantic reason leaves this at [`ReplyPayload::None`] and sets the
/// header's status instead (§4.5 "Status-code policy").
#[derive(Debug, Clone)]
pub enum ReplyPayload {
    None,
    NSources(u32),
    SourceData(SourceDataRow),
    Sourcestats(SourcestatsRow),
    Tracking(TrackingReport),
    Rtc(RtcReport),
    Activity(ActivityReport),
    Smoothing(SmoothingReport),
    ManualList(Vec<ManualSampleRow>),
    ClientAccesses(ClientAccessesPage),
}

impl ReplyPayload {
    pub fn tag(&self) -> ReplyTag {
        match self {
            ReplyPayload::None => ReplyTag::Null,
            ReplyPayload::NSources(_) => ReplyTag::NSources,
            ReplyPayload::SourceData(_) => ReplyTag::SourceData,
            ReplyPayload::Sourcestats(_) => ReplyTag::Sourcestats,
            ReplyPayload::Tracking(_) => ReplyTag::Tracking,
            ReplyPayload::Rtc(_) => ReplyTag::Rtc,
            ReplyPayload::Activity(_) => ReplyTag::Activity,
            ReplyPayload::Smoothing(_) => ReplyTag::Smoothing,
            ReplyPayload::ManualList(_) => ReplyTag::ManualList,
            ReplyPayload::ClientAccesses(_) => ReplyTag::ClientAccesses,
        }
    }
}
