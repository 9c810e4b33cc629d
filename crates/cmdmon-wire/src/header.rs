use binbuf::prelude::*;

use crate::{Timestamp, WireError};

pub const PACKET_TYPE_REQUEST: u8 = 1;
pub const PACKET_TYPE_REPLY: u8 = 2;

/// The fixed portion of a request packet (§3, §6). `command` is a raw u16:
/// it may not name a known [`crate::Opcode`], which is resolved later during
/// dispatch validation rather than while reading the header.
#[derive(Debug, Clone, Copy)]
pub struct RequestHeader {
    pub version: u8,
    pub pkt_type: u8,
    pub res1: u8,
    pub res2: u8,
    pub command: u16,
    pub attempt: u16,
    pub sequence: u32,
    /// Legacy authentication fields. Retained on the wire for byte layout
    /// compatibility; never given semantic meaning (§9 "Legacy-auth
    /// fields").
    pub utoken: u32,
    pub token: u32,
    pub auth: [u8; 16],
    pub attempted_at: Timestamp,
}

impl Readable for RequestHeader {
    type Error = WireError;

    fn read<E: Endianness>(buf: &mut impl ToReadBuffer) -> Result<Self, Self::Error> {
        let version = u8::read::<E>(buf)?;
        let pkt_type = u8::read::<E>(buf)?;
        let res1 = u8::read::<E>(buf)?;
        let res2 = u8::read::<E>(buf)?;
        let command = u16::read::<E>(buf)?;
        let attempt = u16::read::<E>(buf)?;
        let sequence = u32::read::<E>(buf)?;
        let utoken = u32::read::<E>(buf)?;
        let token = u32::read::<E>(buf)?;
        let auth_vec = buf.read_vec(16)?;
        let mut auth = [0u8; 16];
        auth.copy_from_slice(&auth_vec);
        let attempted_at = Timestamp::read::<E>(buf)?;

        Ok(Self {
            version,
            pkt_type,
            res1,
            res2,
            command,
            attempt,
            sequence,
            utoken,
            token,
            auth,
            attempted_at,
        })
    }
}

impl Writeable for RequestHeader {
    type Error = WireError;

    fn write<E: Endianness>(&self, buf: &mut impl ToWriteBuffer) -> Result<usize, Self::Error> {
        let mut n = 0;
        n += self.version.write::<E>(buf)?;
        n += self.pkt_type.write::<E>(buf)?;
        n += self.res1.write::<E>(buf)?;
        n += self.res2.write::<E>(buf)?;
        n += self.command.write::<E>(buf)?;
        n += self.attempt.write::<E>(buf)?;
        n += self.sequence.write::<E>(buf)?;
        n += self.utoken.write::<E>(buf)?;
        n += self.token.write::<E>(buf)?;
        buf.write_slice(&self.auth)?;
        n += 16;
        n += self.attempted_at.write::<E>(buf)?;
        Ok(n)
    }
}

/// The fixed portion of a reply packet (§3, §6). Echoes the request's
/// `command` and `sequence`.
#[derive(Debug, Clone, Copy)]
pub struct ReplyHeader {
    pub version: u8,
    pub pkt_type: u8,
    pub res1: u8,
    pub res2: u8,
    pub command: u16,
    pub reply_tag: u16,
    pub status: u16,
    pub pad1: u16,
    pub pad2: u16,
    pub pad3: u16,
    pub sequence: u32,
    pub pad4: u32,
    pub pad5: u32,
}

impl ReplyHeader {
    /// A zeroed "template" reply for `command`/`sequence`, as prepared by
    /// the dispatcher before invoking a handler (§4.4).
    pub fn template(command: u16, sequence: u32) -> Self {
        Self {
            version: crate::constants::PROTOCOL_VERSION,
            pkt_type: PACKET_TYPE_REPLY,
            res1: 0,
            res2: 0,
            command,
            reply_tag: 0,
            status: 0,
            pad1: 0,
            pad2: 0,
            pad3: 0,
            sequence,
            pad4: 0,
            pad5: 0,
        }
    }
}

impl Readable for ReplyHeader {
    type Error = WireError;

    fn read<E: Endianness>(buf: &mut impl ToReadBuffer) -> Result<Self, Self::Error> {
        Ok(Self {
            version: u8::read::<E>(buf)?,
            pkt_type: u8::read::<E>(buf)?,
            res1: u8::read::<E>(buf)?,
            res2: u8::read::<E>(buf)?,
            command: u16::read::<E>(buf)?,
            reply_tag: u16::read::<E>(buf)?,
            status: u16::read::<E>(buf)?,
            pad1: u16::read::<E>(buf)?,
            pad2: u16::read::<E>(buf)?,
            pad3: u16::read::<E>(buf)?,
            sequence: u32::read::<E>(buf)?,
            pad4: u32::read::<E>(buf)?,
            pad5: u32::read::<E>(buf)?,
        })
    }
}

impl Writeable for ReplyHeader {
    type Error = WireError;

    fn write<E: Endianness>(&self, buf: &mut impl ToWriteBuffer) -> Result<usize, Self::Error> {
        let mut n = 0;
        n += self.version.write::<E>(buf)?;
        n += self.pkt_type.write::<E>(buf)?;
        n += self.res1.write::<E>(buf)?;
        n += self.res2.write::<E>(buf)?;
        n += self.command.write::<E>(buf)?;
        n += self.reply_tag.write::<E>(buf)?;
        n += self.status.write::<E>(buf)?;
        n += self.pad1.write::<E>(buf)?;
        n += self.pad2.write::<E>(buf)?;
        n += self.pad3.write::<E>(buf)?;
        n += self.sequence.write::<E>(buf)?;
        n += self.pad4.write::<E>(buf)?;
        n += self.pad5.write::<E>(buf)?;
        Ok(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use binbuf::prelude::*;

    #[test]
    fn request_header_round_trips() {
        let header = RequestHeader {
            version: 6,
            pkt_type: PACKET_TYPE_REQUEST,
            res1: 0,
            res2: 0,
            command: 27,
            attempt: 0,
            sequence: 42,
            utoken: 0,
            token: 0,
            auth: [0; 16],
            attempted_at: Timestamp {
                seconds: 1,
                microseconds: 2,
            },
        };

        let mut wbuf = WriteBuffer::new();
        header.write::<BigEndian>(&mut wbuf).unwrap();

        let mut rbuf = ReadBuffer::new(wbuf.bytes());
        let decoded = RequestHeader::read::<BigEndian>(&mut rbuf).unwrap();

        assert_eq!(decoded.version, header.version);
        assert_eq!(decoded.command, header.command);
        assert_eq!(decoded.sequence, header.sequence);
    }

    #[test]
    fn reply_header_template_echoes_command_and_sequence() {
        let reply = ReplyHeader::template(27, 42);
        assert_eq!(reply.command, 27);
        assert_eq!(reply.sequence, 42);
        assert_eq!(reply.status, 0);
        assert_eq!(reply.reply_tag, 0);
    }
}
