use binbuf::prelude::*;

/// Compact coded floating-point value used throughout the wire protocol for
/// non-integer quantities (delays, offsets, skew).
///
/// Encoding: a 32-bit word split into a 7-bit signed exponent and a 25-bit
/// signed coefficient (mantissa), network order. `value = coef * 2^(exp -
/// COEF_BITS)`. This is the inverse of itself modulo the representable
/// range: encoding a value produced by a previous decode, then decoding it
/// again, reproduces the original bits exactly.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NtpFloat(pub f64);

const EXP_BITS: u32 = 7;
const COEF_BITS: u32 = 25;
const COEF_MAX: i32 = (1 << (COEF_BITS - 1)) - 1;
const COEF_MIN: i32 = -(1 << (COEF_BITS - 1));
const EXP_MAX: i32 = (1 << (EXP_BITS - 1)) - 1;
const EXP_MIN: i32 = -(1 << (EXP_BITS - 1));

impl NtpFloat {
    pub fn encode(self) -> u32 {
        if self.0 == 0.0 {
            return 0;
        }

        let mut x = self.0;
        let negative = x < 0.0;
        if negative {
            x = -x;
        }

        let mut exp = x.log2().ceil() as i32 + 1;
        let mut coef = (x * 2f64.powi(COEF_BITS as i32 - exp)).round() as i64;

        // Rounding above can overflow the coefficient into the next power of
        // two; renormalize by shifting the exponent.
        if coef >= 1 << COEF_BITS {
            coef >>= 1;
            exp += 1;
        }

        let mut coef = coef as i32;
        if negative {
            coef = -coef;
        }

        if exp > EXP_MAX {
            coef = if negative { COEF_MIN } else { COEF_MAX };
            exp = EXP_MAX;
        } else if exp < EXP_MIN {
            return 0;
        }

        coef = coef.clamp(COEF_MIN, COEF_MAX);

        let exp_bits = (exp as i8 as u8 as u32) & ((1 << EXP_BITS) - 1);
        let coef_bits = (coef as u32) & ((1 << COEF_BITS) - 1);

        (exp_bits << COEF_BITS) | coef_bits
    }

    pub fn decode(word: u32) -> Self {
        let exp_bits = (word >> COEF_BITS) & ((1 << EXP_BITS) - 1);
        let coef_bits = word & ((1 << COEF_BITS) - 1);

        let exp = sign_extend(exp_bits, EXP_BITS);
        let coef = sign_extend(coef_bits, COEF_BITS);

        if coef == 0 {
            return NtpFloat(0.0);
        }

        NtpFloat(coef as f64 * 2f64.powi(exp - COEF_BITS as i32))
    }
}

fn sign_extend(bits: u32, width: u32) -> i32 {
    let shift = 32 - width;
    ((bits << shift) as i32) >> shift
}

impl Readable for NtpFloat {
    type Error = BufferError;

    fn read<E: Endianness>(buf: &mut impl ToReadBuffer) -> Result<Self, Self::Error> {
        let word = u32::read::<E>(buf)?;
        Ok(NtpFloat::decode(word))
    }
}

impl Writeable for NtpFloat {
    type Error = BufferError;

    fn write<E: Endianness>(&self, buf: &mut impl ToWriteBuffer) -> Result<usize, Self::Error> {
        self.encode().write::<E>(buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_round_trips() {
        assert_eq!(NtpFloat::decode(NtpFloat(0.0).encode()).0, 0.0);
    }

    #[test]
    fn representable_values_round_trip_through_repeated_encode_decode() {
        for value in [1.0, -1.0, 0.5, 123.456, -0.000_1, 1e6, -1e6] {
            let once = NtpFloat::decode(NtpFloat(value).encode());
            let twice = NtpFloat::decode(NtpFloat(once.0).encode());
            assert!(
                (once.0 - twice.0).abs() <= once.0.abs() * 1e-6 + 1e-12,
                "value {value} did not stabilize: {} vs {}",
                once.0,
                twice.0
            );
        }
    }

    #[test]
    fn out_of_range_saturates_instead_of_panicking() {
        let huge = NtpFloat(1e300);
        let decoded = NtpFloat::decode(huge.encode());
        assert!(decoded.0.is_finite());

        let tiny_negative = NtpFloat(-1e300);
        let decoded = NtpFloat::decode(tiny_negative.encode());
        assert!(decoded.0.is_finite());
        assert!(decoded.0 < 0.0);
    }
}
