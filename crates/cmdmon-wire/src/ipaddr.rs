use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use binbuf::prelude::*;

use crate::WireError;

/// Address-family tag carried alongside an IP address on the wire (§4.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressFamily {
    Unspec,
    Inet,
    Inet6,
}

impl AddressFamily {
    fn to_u8(self) -> u8 {
        match self {
            AddressFamily::Unspec => 0,
            AddressFamily::Inet => 1,
            AddressFamily::Inet6 => 2,
        }
    }

    fn from_u8(b: u8) -> Result<Self, WireError> {
        match b {
            0 => Ok(AddressFamily::Unspec),
            1 => Ok(AddressFamily::Inet),
            2 => Ok(AddressFamily::Inet6),
            other => Err(WireError::UnknownAddressFamily(other)),
        }
    }
}

/// A family-tagged IP address as carried in request/reply payloads. Always
/// occupies 20 bytes on the wire: 1 family byte, 3 reserved bytes, 16 address
/// bytes (IPv4 addresses are stored left-aligned, the remaining bytes zero).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WireIpAddr {
    pub family: AddressFamily,
    bytes: [u8; 16],
}

impl WireIpAddr {
    pub const UNSPEC: WireIpAddr = WireIpAddr {
        family: AddressFamily::Unspec,
        bytes: [0; 16],
    };

    pub fn to_ip_addr(self) -> Option<IpAddr> {
        match self.family {
            AddressFamily::Unspec => None,
            AddressFamily::Inet => {
                let mut octets = [0u8; 4];
                octets.copy_from_slice(&self.bytes[..4]);
                Some(IpAddr::V4(Ipv4Addr::from(octets)))
            }
            AddressFamily::Inet6 => Some(IpAddr::V6(Ipv6Addr::from(self.bytes))),
        }
    }
}

impl From<IpAddr> for WireIpAddr {
    fn from(addr: IpAddr) -> Self {
        match addr {
            IpAddr::V4(v4) => {
                let mut bytes = [0u8; 16];
                bytes[..4].copy_from_slice(&v4.octets());
                WireIpAddr {
                    family: AddressFamily::Inet,
                    bytes,
                }
            }
            IpAddr::V6(v6) => WireIpAddr {
                family: AddressFamily::Inet6,
                bytes: v6.octets(),
            },
        }
    }
}

impl Readable for WireIpAddr {
    type Error = WireError;

    fn read<E: Endianness>(buf: &mut impl ToReadBuffer) -> Result<Self, Self::Error> {
        let family = AddressFamily::from_u8(buf.pop()?)?;
        let _reserved = u8::read_multi::<E, 3>(buf)?;
        let raw = buf.read_vec(16)?;
        let mut bytes = [0u8; 16];
        bytes.copy_from_slice(&raw);
        Ok(WireIpAddr { family, bytes })
    }
}

impl Writeable for WireIpAddr {
    type Error = WireError;

    fn write<E: Endianness>(&self, buf: &mut impl ToWriteBuffer) -> Result<usize, Self::Error> {
        buf.push(self.family.to_u8());
        buf.push(0);
        buf.push(0);
        buf.push(0);
        buf.write_slice(&self.bytes)?;
        Ok(20)
    }
}
