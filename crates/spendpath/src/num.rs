//! Script numeric and boolean byte-string codecs.

use crate::error::Error;

/// Canonical true value: a single `0x01` byte.
pub const TRUE: &[u8] = &[0x01];
/// Canonical false value: the empty byte string.
pub const FALSE: &[u8] = &[];

/// A numeric value used in script arithmetic.
///
/// Script numbers are sign-magnitude little-endian byte strings. Decoding is
/// bounded to 4 bytes; encoding is always minimal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct ScriptNum {
    value: i64,
}

impl From<i64> for ScriptNum {
    fn from(value: i64) -> Self {
        Self { value }
    }
}

impl ScriptNum {
    /// Maximum script number length in bytes on decode.
    pub const MAX_NUM_SIZE: usize = 4;

    /// Decodes a byte string into a [`ScriptNum`].
    pub fn from_bytes(data: &[u8]) -> Result<Self, Error> {
        if data.len() > Self::MAX_NUM_SIZE {
            return Err(Error::NumOverflow);
        }

        if data.is_empty() {
            return Ok(Self { value: 0 });
        }

        let mut result = 0i64;

        // Little-endian magnitude.
        for (i, &byte) in data.iter().enumerate() {
            result |= i64::from(byte) << (8 * i);
        }

        // The top bit of the last byte is the sign.
        let last = *data.last().expect("data is non-empty as checked above; qed");
        if last & 0x80 != 0 {
            let value = -(result & !(0x80i64 << (8 * (data.len() - 1))));
            Ok(Self { value })
        } else {
            Ok(Self { value: result })
        }
    }

    /// Encodes the number as a minimally-sized byte string.
    pub fn to_bytes(&self) -> Vec<u8> {
        if self.value == 0 {
            return vec![];
        }

        let mut result = Vec::new();
        let mut abs_value = self.value.unsigned_abs();

        while abs_value != 0 {
            result.push((abs_value & 0xff) as u8);
            abs_value >>= 8;
        }

        let negative = self.value < 0;

        // An extra byte is needed when the magnitude's top bit would collide
        // with the sign bit.
        if result.last().expect("magnitude is non-zero; qed") & 0x80 != 0 {
            result.push(if negative { 0x80 } else { 0x00 });
        } else if negative {
            let len = result.len();
            result[len - 1] |= 0x80;
        }

        result
    }

    /// The underlying value.
    pub fn value(&self) -> i64 {
        self.value
    }
}

/// Converts a byte string to a boolean: false iff every byte is zero, modulo
/// a trailing `0x80` (negative zero).
pub fn cast_to_bool(data: &[u8]) -> bool {
    match data.split_last() {
        Some((&last, rest)) => rest.iter().any(|&x| x != 0) || (last != 0 && last != 0x80),
        None => false,
    }
}

/// Encodes a boolean as its canonical byte string.
pub fn encode_bool(value: bool) -> Vec<u8> {
    if value {
        TRUE.to_vec()
    } else {
        FALSE.to_vec()
    }
}

/// Canonical negation of an arbitrary byte string.
pub fn not_bytes(data: &[u8]) -> Vec<u8> {
    encode_bool(!cast_to_bool(data))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hex_to_bytes(s: &str) -> Vec<u8> {
        hex::decode(s).expect("Invalid hex")
    }

    #[test]
    fn test_script_num_to_bytes() {
        let tests = vec![
            (0i64, vec![]),
            (1, hex_to_bytes("01")),
            (-1, hex_to_bytes("81")),
            (127, hex_to_bytes("7f")),
            (-127, hex_to_bytes("ff")),
            (128, hex_to_bytes("8000")),
            (-128, hex_to_bytes("8080")),
            (129, hex_to_bytes("8100")),
            (-129, hex_to_bytes("8180")),
            (256, hex_to_bytes("0001")),
            (-256, hex_to_bytes("0081")),
            (32767, hex_to_bytes("ff7f")),
            (-32767, hex_to_bytes("ffff")),
            (32768, hex_to_bytes("008000")),
            (-32768, hex_to_bytes("008080")),
            (65535, hex_to_bytes("ffff00")),
            (-65535, hex_to_bytes("ffff80")),
            (8388608, hex_to_bytes("00008000")),
            (-8388608, hex_to_bytes("00008080")),
            (2147483647, hex_to_bytes("ffffff7f")),
            (-2147483647, hex_to_bytes("ffffffff")),
        ];

        for (num, expected) in tests {
            let got_bytes = ScriptNum::from(num).to_bytes();
            assert_eq!(
                got_bytes, expected,
                "Did not get expected bytes for {num}, got {got_bytes:?}, want {expected:?}",
            );
        }
    }

    #[test]
    fn test_script_num_from_bytes() {
        let tests = vec![
            ("", Ok(0)),
            ("01", Ok(1)),
            ("81", Ok(-1)),
            ("7f", Ok(127)),
            ("ff", Ok(-127)),
            ("8000", Ok(128)),
            ("8080", Ok(-128)),
            ("8100", Ok(129)),
            ("8180", Ok(-129)),
            ("0001", Ok(256)),
            ("0081", Ok(-256)),
            ("ff7f", Ok(32767)),
            ("ffff", Ok(-32767)),
            ("008000", Ok(32768)),
            ("008080", Ok(-32768)),
            ("ffffff7f", Ok(2147483647)),
            ("ffffffff", Ok(-2147483647)),
            // Non-minimal encodings decode fine; only the length is bounded.
            ("00", Ok(0)),
            ("80", Ok(0)),
            ("0100", Ok(1)),
            ("ff7f00", Ok(32767)),
            ("0000008000", Err(Error::NumOverflow)),
            ("ffffffff00", Err(Error::NumOverflow)),
            ("0000000001", Err(Error::NumOverflow)),
        ];

        for (serialized_in_hex, expected_result) in tests {
            let serialized = hex_to_bytes(serialized_in_hex);
            let result = ScriptNum::from_bytes(&serialized).map(|num| num.value());
            assert_eq!(
                result, expected_result,
                "Failed to convert bytes {serialized_in_hex} to ScriptNum, \
                got: {result:?}, expected {expected_result:?}"
            );
        }
    }

    #[test]
    fn test_script_num_round_trip() {
        for value in [
            0i64, 1, -1, 2, 16, 127, -127, 128, -128, 255, 256, 32767, -32768, 8388607,
            2147483647, -2147483647,
        ] {
            let encoded = ScriptNum::from(value).to_bytes();
            assert_eq!(ScriptNum::from_bytes(&encoded).map(|n| n.value()), Ok(value));
        }
    }

    #[test]
    fn test_cast_to_bool() {
        assert!(!cast_to_bool(&[]));
        assert!(!cast_to_bool(&[0x00]));
        assert!(!cast_to_bool(&[0x00, 0x00]));
        // Negative zero.
        assert!(!cast_to_bool(&[0x80]));
        assert!(!cast_to_bool(&[0x00, 0x80]));
        assert!(cast_to_bool(&[0x01]));
        assert!(cast_to_bool(&[0x80, 0x00]));
        assert!(cast_to_bool(&[0x00, 0x01, 0x00]));
    }

    #[test]
    fn test_bool_codec() {
        assert_eq!(encode_bool(true), vec![0x01]);
        assert_eq!(encode_bool(false), Vec::<u8>::new());
        assert!(cast_to_bool(&encode_bool(true)));
        assert!(!cast_to_bool(&encode_bool(false)));

        // Double negation preserves the truth value.
        for bytes in [
            &[][..],
            &[0x00][..],
            &[0x80][..],
            &[0x01][..],
            &[0x00, 0x80][..],
            &[0x05, 0x00][..],
        ] {
            assert_eq!(cast_to_bool(&not_bytes(&not_bytes(bytes))), cast_to_bool(bytes));
        }
    }
}
