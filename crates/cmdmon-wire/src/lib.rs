//! Wire codec for the Command & Monitoring (C/M) request/reply protocol.
//!
//! This crate has no I/O of its own: it only converts between the on-the-wire
//! byte layout (§4.1) and host-order in-memory request/reply representations.
//! Everything here is network-order (big-endian), matching the `Readable` /
//! `Writeable` pattern the rest of this workspace uses for fixed-layout
//! packets.

pub mod constants;
mod float;
mod header;
mod ipaddr;
mod length;
mod opcode;
mod reply;
mod request;
mod status;
mod timestamp;

pub use float::NtpFloat;
pub use header::{ReplyHeader, RequestHeader, PACKET_TYPE_REPLY, PACKET_TYPE_REQUEST};
pub use ipaddr::{AddressFamily, WireIpAddr};
pub use length::{padding_length, reply_wire_length, request_wire_length};
pub use opcode::{Opcode, OpcodeError, PermissionClass, OPCODE_COUNT};
pub use reply::{
    ActivityReport, ClientAccessRow, ClientAccessesPage, ManualSampleRow, ReplyPayload, ReplyTag,
    RtcReport, SmoothingReport, SourceDataRow, SourcestatsRow, TrackingReport,
};
pub use request::{
    AccessSubnetRequest, AddressPattern, BurstRequest, LocalRequest, ManualMode,
    ManualSetRequest, ModifyFloatRequest, ModifyIntRequest, ModifyMakestepRequest, PagingRequest,
    RequestPayload, SmoothtimeMode, SourceAddress, SourceParams,
};
pub use status::Status;
pub use timestamp::Timestamp;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum WireError {
    #[error("buffer error: {0:?}")]
    Buffer(binbuf::BufferError),

    #[error("invalid opcode: {0}")]
    Opcode(#[from] OpcodeError),

    #[error("unknown reply tag {0}")]
    UnknownReplyTag(u16),

    #[error("unknown status code {0}")]
    UnknownStatus(u16),

    #[error("unknown address family {0}")]
    UnknownAddressFamily(u8),
}

impl From<binbuf::BufferError> for WireError {
    fn from(err: binbuf::BufferError) -> Self {
        WireError::Buffer(err)
    }
}

pub type WireResult<T> = Result<T, WireError>;
