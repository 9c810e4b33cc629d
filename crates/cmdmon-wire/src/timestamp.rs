use binbuf::prelude::*;

/// A wire timestamp: whole seconds since the epoch plus a microsecond
/// remainder, both network order (§4.1 numeric conventions).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Timestamp {
    pub seconds: u32,
    pub microseconds: u32,
}

impl Readable for Timestamp {
    type Error = BufferError;

    fn read<E: Endianness>(buf: &mut impl ToReadBuffer) -> Result<Self, Self::Error> {
        let seconds = u32::read::<E>(buf)?;
        let microseconds = u32::read::<E>(buf)?;
        Ok(Self {
            seconds,
            microseconds,
        })
    }
}

impl Writeable for Timestamp {
    type Error = BufferError;

    fn write<E: Endianness>(&self, buf: &mut impl ToWriteBuffer) -> Result<usize, Self::Error> {
        let mut n = 0;
        n += self.seconds.write::<E>(buf)?;
        n += self.microseconds.write::<E>(buf)?;
        Ok(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use binbuf::prelude::*;

    #[test]
    fn round_trips() {
        let ts = Timestamp {
            seconds: 1_700_000_000,
            microseconds: 123_456,
        };

        let mut wbuf = WriteBuffer::new();
        ts.write::<BigEndian>(&mut wbuf).unwrap();

        let mut rbuf = ReadBuffer::new(wbuf.bytes());
        let decoded = Timestamp::read::<BigEndian>(&mut rbuf).unwrap();
        assert_eq!(ts, decoded);
    }
}
