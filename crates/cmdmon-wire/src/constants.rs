//! Protocol-wide constants (§6 wire protocol, §4.1 invariants).

/// Current protocol version understood by this daemon.
pub const PROTOCOL_VERSION: u8 = 6;

/// Lowest protocol version whose clients understand a `BAD-VERSION` reply.
/// Callers below this floor are silently dropped instead (§4.4 step 5).
pub const COMPATIBILITY_FLOOR: u8 = 5;

/// Maximum padding length within a request's fixed payload union (§4.1).
pub const MAX_PADDING_LEN: usize = 16;

/// Byte size of the fixed request header, up to and including the two
/// attempted-at timestamps and padding, before the opcode-tagged payload.
pub const REQUEST_HEADER_SIZE: usize = 28;

/// Byte size of the fixed reply header, before the reply-tagged payload.
pub const REPLY_HEADER_SIZE: usize = 28;

/// Implementation maximum page size for `CLIENT-ACCESSES-BY-INDEX` (§4.5).
pub const MAX_CLIENT_ACCESSES_PER_REPLY: usize = 64;
