use binbuf::prelude::*;

use crate::WireError;

macro_rules! status_taxonomy {
    ($($variant:ident = $value:expr),+ $(,)?) => {
        /// Reply `status` field taxonomy (§6 "Status taxonomy").
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        #[repr(u16)]
        pub enum Status {
            $($variant = $value),+
        }

        impl TryFrom<u16> for Status {
            type Error = WireError;

            fn try_from(value: u16) -> Result<Self, Self::Error> {
                match value {
                    $($value => Ok(Status::$variant),)+
                    other => Err(WireError::UnknownStatus(other)),
                }
            }
        }
    };
}

status_taxonomy! {
    Success = 0,
    Failed = 1,
    Unauthorized = 2,
    Invalid = 3,
    NoSuchSource = 4,
    SourceAlreadyKnown = 5,
    TooManySources = 6,
    NoRtc = 7,
    BadRtcFile = 8,
    Inactive = 9,
    BadSubnet = 10,
    AccessAllowed = 11,
    AccessDenied = 12,
    NoHostaccess = 13,
    InvalidAf = 14,
    BadSample = 15,
    BadPacketVersion = 16,
    BadPacketLength = 17,
    NotEnabled = 18,
}

impl Readable for Status {
    type Error = WireError;

    fn read<E: Endianness>(buf: &mut impl ToReadBuffer) -> Result<Self, Self::Error> {
        let raw = u16::read::<E>(buf)?;
        Status::try_from(raw)
    }
}

impl Writeable for Status {
    type Error = BufferError;

    fn write<E: Endianness>(&self, buf: &mut impl ToWriteBuffer) -> Result<usize, Self::Error> {
        (*self as u16).write::<E>(buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_every_status() {
        for value in 0u16..=18 {
            let status = Status::try_from(value).unwrap();
            assert_eq!(status as u16, value);
        }
    }

    #[test]
    fn rejects_unknown_status_codes() {
        assert!(Status::try_from(999).is_err());
    }
}
