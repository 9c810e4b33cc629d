use binbuf::prelude::*;

use crate::{NtpFloat, Opcode, Timestamp, WireError, WireIpAddr};

/// A source address together with the UDP port it is reachable on.
#[derive(Debug, Clone, Copy)]
pub struct SourceAddress {
    pub ip: WireIpAddr,
    pub port: u16,
}

impl Readable for SourceAddress {
    type Error = WireError;

    fn read<E: Endianness>(buf: &mut impl ToReadBuffer) -> Result<Self, Self::Error> {
        let ip = WireIpAddr::read::<E>(buf)?;
        let port = u16::read::<E>(buf)?;
        Ok(Self { ip, port })
    }
}

impl Writeable for SourceAddress {
    type Error = WireError;

    fn write<E: Endianness>(&self, buf: &mut impl ToWriteBuffer) -> Result<usize, Self::Error> {
        let mut n = self.ip.write::<E>(buf)?;
        n += self.port.write::<E>(buf)?;
        Ok(n)
    }
}

/// The polling/filtering/validation parameter bundle carried by `ADD-SERVER`
/// and `ADD-PEER` (§4.5 "Source population").
#[derive(Debug, Clone, Copy)]
pub struct SourceParams {
    pub min_poll: i8,
    pub max_poll: i8,
    pub presend_min_poll: i8,
    pub min_stratum: u8,
    pub poll_target: i8,
    pub version: u8,
    pub max_sources: i8,
    pub min_samples: i8,
    pub max_samples: i8,
    pub filter_length: i8,
    pub max_delay: NtpFloat,
    pub max_delay_ratio: NtpFloat,
    pub max_delay_dev_ratio: NtpFloat,
    pub min_delay: NtpFloat,
    pub asymmetry: NtpFloat,
    pub offset: NtpFloat,
    /// Bitfield of source flags (online/auto-offline/iburst/burst/
    /// interleaved/nts/copy), kept opaque to the wire codec; the `Sources`
    /// collaborator interprets it.
    pub flags: u16,
}

impl Readable for SourceParams {
    type Error = WireError;

    fn read<E: Endianness>(buf: &mut impl ToReadBuffer) -> Result<Self, Self::Error> {
        Ok(Self {
            min_poll: u8::read::<E>(buf)? as i8,
            max_poll: u8::read::<E>(buf)? as i8,
            presend_min_poll: u8::read::<E>(buf)? as i8,
            min_stratum: u8::read::<E>(buf)?,
            poll_target: u8::read::<E>(buf)? as i8,
            version: u8::read::<E>(buf)?,
            max_sources: u8::read::<E>(buf)? as i8,
            min_samples: u8::read::<E>(buf)? as i8,
            max_samples: u8::read::<E>(buf)? as i8,
            filter_length: u8::read::<E>(buf)? as i8,
            max_delay: NtpFloat::read::<E>(buf)?,
            max_delay_ratio: NtpFloat::read::<E>(buf)?,
            max_delay_dev_ratio: NtpFloat::read::<E>(buf)?,
            min_delay: NtpFloat::read::<E>(buf)?,
            asymmetry: NtpFloat::read::<E>(buf)?,
            offset: NtpFloat::read::<E>(buf)?,
            flags: u16::read::<E>(buf)?,
        })
    }
}

impl Writeable for SourceParams {
    type Error = WireError;

    fn write<E: Endianness>(&self, buf: &mut impl ToWriteBuffer) -> Result<usize, Self::Error> {
        let mut n = 0;
        n += (self.min_poll as u8).write::<E>(buf)?;
        n += (self.max_poll as u8).write::<E>(buf)?;
        n += (self.presend_min_poll as u8).write::<E>(buf)?;
        n += self.min_stratum.write::<E>(buf)?;
        n += (self.poll_target as u8).write::<E>(buf)?;
        n += self.version.write::<E>(buf)?;
        n += (self.max_sources as u8).write::<E>(buf)?;
        n += (self.min_samples as u8).write::<E>(buf)?;
        n += (self.max_samples as u8).write::<E>(buf)?;
        n += (self.filter_length as u8).write::<E>(buf)?;
        n += self.max_delay.write::<E>(buf)?;
        n += self.max_delay_ratio.write::<E>(buf)?;
        n += self.max_delay_dev_ratio.write::<E>(buf)?;
        n += self.min_delay.write::<E>(buf)?;
        n += self.asymmetry.write::<E>(buf)?;
        n += self.offset.write::<E>(buf)?;
        n += self.flags.write::<E>(buf)?;
        Ok(n)
    }
}

/// A `(mask, address)` pattern used by `ONLINE`/`OFFLINE`/`BURST` to select
/// one or more sources (§4.5 "Source control").
#[derive(Debug, Clone, Copy)]
pub struct AddressPattern {
    pub mask: WireIpAddr,
    pub address: WireIpAddr,
}

impl Readable for AddressPattern {
    type Error = WireError;

    fn read<E: Endianness>(buf: &mut impl ToReadBuffer) -> Result<Self, Self::Error> {
        let mask = WireIpAddr::read::<E>(buf)?;
        let address = WireIpAddr::read::<E>(buf)?;
        Ok(Self { mask, address })
    }
}

impl Writeable for AddressPattern {
    type Error = WireError;

    fn write<E: Endianness>(&self, buf: &mut impl ToWriteBuffer) -> Result<usize, Self::Error> {
        let mut n = self.mask.write::<E>(buf)?;
        n += self.address.write::<E>(buf)?;
        Ok(n)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct BurstRequest {
    pub pattern: AddressPattern,
    pub n_good_samples: u32,
    pub n_total_samples: u32,
}

#[derive(Debug, Clone, Copy)]
pub struct ModifyIntRequest {
    pub address: WireIpAddr,
    pub value: i32,
}

#[derive(Debug, Clone, Copy)]
pub struct ModifyFloatRequest {
    pub address: WireIpAddr,
    pub value: NtpFloat,
}

#[derive(Debug, Clone, Copy)]
pub struct ModifyMakestepRequest {
    pub limit: i32,
    pub threshold: NtpFloat,
}

#[derive(Debug, Clone, Copy)]
pub struct LocalRequest {
    pub on: bool,
    pub stratum: u8,
    pub distance: NtpFloat,
    pub orphan: bool,
}

#[derive(Debug, Clone, Copy)]
pub struct PagingRequest {
    pub first_index: u32,
    pub n_clients: u32,
}

/// Shared payload for `ALLOW`/`ALLOWALL`/`DENY`/`DENYALL` in both the NTP and
/// C/M namespaces: the opcode itself determines which `AccessFilter`
/// operation (plain vs "-all") and which namespace to call into.
#[derive(Debug, Clone, Copy)]
pub struct AccessSubnetRequest {
    pub ip: WireIpAddr,
    pub subnet_bits: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManualMode {
    Disable,
    Enable,
    Reset,
}

#[derive(Debug, Clone, Copy)]
pub struct ManualSetRequest {
    pub mode: ManualMode,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SmoothtimeMode {
    Reset,
    Activate,
}

/// Opcode-tagged request payload union (§2, §3, §9 "Tagged union
/// payloads"). Deserialization always happens in the context of a known
/// [`crate::Opcode`]: the dispatcher reads the header, resolves the opcode,
/// and only then parses the rest of the datagram through the matching
/// variant's `read` function.
#[derive(Debug, Clone, Copy)]
pub enum RequestPayload {
    None,
    ByIndex(u32),
    AddressPattern(AddressPattern),
    Burst(BurstRequest),
    SourceAddress(WireIpAddr),
    SourceAdd {
        address: SourceAddress,
        params: SourceParams,
    },
    ModifyInt(ModifyIntRequest),
    ModifyFloat(ModifyFloatRequest),
    ModifyMaxupdateskew(NtpFloat),
    ModifyMakestep(ModifyMakestepRequest),
    Local(LocalRequest),
    ReselectDistance(NtpFloat),
    Settime(Timestamp),
    Dfreq(NtpFloat),
    Doffset(NtpFloat),
    Paging(PagingRequest),
    AccessSubnet(AccessSubnetRequest),
    AccessCheck(WireIpAddr),
    Manual(ManualSetRequest),
    ManualDelete(u32),
    Smoothtime(SmoothtimeMode),
}

impl RequestPayload {
    /// Parses the opcode-tagged payload that follows a request header,
    /// given the already-resolved [`Opcode`] (§4.4 step 7: "the payload is
    /// parsed according to the table entry for the now-known opcode").
    pub fn read<E: Endianness>(
        opcode: Opcode,
        buf: &mut impl ToReadBuffer,
    ) -> Result<Self, WireError> {
        use Opcode::*;

        Ok(match opcode {
            Null | Tracking | NSources | Rtcreport | Activity | Smoothing | ManualList
            | Reselect | Refresh | Rekey | Makestep | Dump | Cyclelogs | Logon | Writertc
            | Trimrtc => RequestPayload::None,

            SourceData | Sourcestats => RequestPayload::ByIndex(u32::read::<E>(buf)?),

            Online | Offline => RequestPayload::AddressPattern(AddressPattern::read::<E>(buf)?),

            Burst => {
                let pattern = AddressPattern::read::<E>(buf)?;
                let n_good_samples = u32::read::<E>(buf)?;
                let n_total_samples = u32::read::<E>(buf)?;
                RequestPayload::Burst(BurstRequest {
                    pattern,
                    n_good_samples,
                    n_total_samples,
                })
            }

            DelSource | Accheck | Cmdaccheck => {
                RequestPayload::SourceAddress(WireIpAddr::read::<E>(buf)?)
            }

            AddServer | AddPeer => {
                let address = SourceAddress::read::<E>(buf)?;
                let params = SourceParams::read::<E>(buf)?;
                RequestPayload::SourceAdd { address, params }
            }

            ModifyMinpoll | ModifyMaxpoll | ModifyMinstratum | ModifyPolltarget => {
                let address = WireIpAddr::read::<E>(buf)?;
                let value = i32::read::<E>(buf)?;
                RequestPayload::ModifyInt(ModifyIntRequest { address, value })
            }

            ModifyMaxdelay | ModifyMaxdelayratio | ModifyMaxdelaydevratio => {
                let address = WireIpAddr::read::<E>(buf)?;
                let value = NtpFloat::read::<E>(buf)?;
                RequestPayload::ModifyFloat(ModifyFloatRequest { address, value })
            }

            ModifyMaxupdateskew => RequestPayload::ModifyMaxupdateskew(NtpFloat::read::<E>(buf)?),

            ModifyMakestep => {
                let limit = i32::read::<E>(buf)?;
                let threshold = NtpFloat::read::<E>(buf)?;
                RequestPayload::ModifyMakestep(ModifyMakestepRequest { limit, threshold })
            }

            Local => {
                let on = u8::read::<E>(buf)? != 0;
                let stratum = u8::read::<E>(buf)?;
                let distance = NtpFloat::read::<E>(buf)?;
                let orphan = u8::read::<E>(buf)? != 0;
                RequestPayload::Local(LocalRequest {
                    on,
                    stratum,
                    distance,
                    orphan,
                })
            }

            Reselectdistance => RequestPayload::ReselectDistance(NtpFloat::read::<E>(buf)?),
            Settime => RequestPayload::Settime(Timestamp::read::<E>(buf)?),
            Dfreq => RequestPayload::Dfreq(NtpFloat::read::<E>(buf)?),
            Doffset => RequestPayload::Doffset(NtpFloat::read::<E>(buf)?),

            ClientAccessesByIndex => {
                let first_index = u32::read::<E>(buf)?;
                let n_clients = u32::read::<E>(buf)?;
                RequestPayload::Paging(PagingRequest {
                    first_index,
                    n_clients,
                })
            }

            Allow | Allowall | Deny | Denyall | Cmdallow | Cmdallowall | Cmddeny | Cmddenyall => {
                let ip = WireIpAddr::read::<E>(buf)?;
                let subnet_bits = i32::read::<E>(buf)?;
                RequestPayload::AccessSubnet(AccessSubnetRequest { ip, subnet_bits })
            }

            Manual => {
                let mode = match u8::read::<E>(buf)? {
                    0 => ManualMode::Disable,
                    1 => ManualMode::Enable,
                    _ => ManualMode::Reset,
                };
                RequestPayload::Manual(ManualSetRequest { mode })
            }

            ManualDelete => RequestPayload::ManualDelete(u32::read::<E>(buf)?),

            Smoothtime => {
                let mode = match u8::read::<E>(buf)? {
                    0 => SmoothtimeMode::Reset,
                    _ => SmoothtimeMode::Activate,
                };
                RequestPayload::Smoothtime(mode)
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_less_opcode_reads_none() {
        let mut rbuf = ReadBuffer::new(&[]);
        let payload = RequestPayload::read::<BigEndian>(Opcode::Null, &mut rbuf).unwrap();
        assert!(matches!(payload, RequestPayload::None));
    }

    #[test]
    fn settime_reads_a_timestamp() {
        let ts = Timestamp {
            seconds: 5,
            microseconds: 6,
        };
        let mut wbuf = WriteBuffer::new();
        ts.write::<BigEndian>(&mut wbuf).unwrap();

        let mut rbuf = ReadBuffer::new(wbuf.bytes());
        let payload = RequestPayload::read::<BigEndian>(Opcode::Settime, &mut rbuf).unwrap();
        match payload {
            RequestPayload::Settime(decoded) => assert_eq!(decoded.seconds, 5),
            other => panic!("unexpected payload: {other:?}"),
        }
    }

    /// `ModifyMinpoll`/`ModifyMaxpoll`/`ModifyMinstratum`/`ModifyPolltarget`
    /// share the `ModifyIntRequest` shape, but each call to `read` parses a
    /// fresh `address`/`value` pair from the buffer it's given — there is no
    /// shared state between opcodes for one decode to alias into another.
    #[test]
    fn modify_int_opcodes_decode_independent_address_value_pairs() {
        let minpoll_addr: WireIpAddr = "192.0.2.1".parse::<std::net::IpAddr>().unwrap().into();
        let mut wbuf = WriteBuffer::new();
        minpoll_addr.write::<BigEndian>(&mut wbuf).unwrap();
        10i32.write::<BigEndian>(&mut wbuf).unwrap();
        let mut rbuf = ReadBuffer::new(wbuf.bytes());
        let minpoll = RequestPayload::read::<BigEndian>(Opcode::ModifyMinpoll, &mut rbuf).unwrap();

        let maxpoll_addr: WireIpAddr = "198.51.100.7".parse::<std::net::IpAddr>().unwrap().into();
        let mut wbuf = WriteBuffer::new();
        maxpoll_addr.write::<BigEndian>(&mut wbuf).unwrap();
        17i32.write::<BigEndian>(&mut wbuf).unwrap();
        let mut rbuf = ReadBuffer::new(wbuf.bytes());
        let maxpoll = RequestPayload::read::<BigEndian>(Opcode::ModifyMaxpoll, &mut rbuf).unwrap();

        match (minpoll, maxpoll) {
            (RequestPayload::ModifyInt(minpoll), RequestPayload::ModifyInt(maxpoll)) => {
                assert_eq!(minpoll.address, minpoll_addr);
                assert_eq!(minpoll.value, 10);
                assert_eq!(maxpoll.address, maxpoll_addr);
                assert_eq!(maxpoll.value, 17);
            }
            other => panic!("unexpected payloads: {other:?}"),
        }
    }
}
