//! Integer codec used by dictd index files.
//!
//! Offsets and lengths are written with a base64 alphabet
//! (`A-Z`, `a-z`, `0-9`, `+`, `/`), six bits per symbol, most significant
//! symbol first.

const ALPHABET: &[u8; 64] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";

/// Most symbols a `u64` can hold without dropping bits (10 * 6 = 60, plus 4 bits of the 11th).
const MAX_SYMBOLS: usize = 11;

fn symbol_value(ch: char) -> Option<u64> {
    let value = match ch {
        'A'..='Z' => ch as u64 - 'A' as u64,
        'a'..='z' => 26 + (ch as u64 - 'a' as u64),
        '0'..='9' => 52 + (ch as u64 - '0' as u64),
        '+' => 62,
        '/' => 63,
        _ => return None,
    };
    Some(value)
}

/// Decodes a dictd number. Unknown characters count as zero.
///
/// This never fails: malformed input yields a (probably wrong) number and the
/// caller is expected to sanity-check the result.
pub fn decode(symbols: &str) -> u64 {
    symbols
        .chars()
        .fold(0u64, |acc, ch| (acc << 6) | symbol_value(ch).unwrap_or(0))
}

/// Strict variant of [`decode`].
///
/// Returns `None` for empty input, for characters outside the alphabet and for
/// values that do not fit in a `u64`.
pub fn try_decode(symbols: &str) -> Option<u64> {
    if symbols.is_empty() || symbols.len() > MAX_SYMBOLS {
        return None;
    }
    let mut result = 0u64;
    for ch in symbols.chars() {
        let value = symbol_value(ch)?;
        if result > (u64::MAX >> 6) {
            return None;
        }
        result = (result << 6) | value;
    }
    Some(result)
}

/// Reference encoder, the inverse of [`decode`]. Zero encodes as `"A"`.
pub fn encode(mut value: u64) -> String {
    if value == 0 {
        return "A".to_string();
    }
    let mut symbols = Vec::new();
    while value > 0 {
        symbols.push(ALPHABET[(value & 0x3f) as usize]);
        value >>= 6;
    }
    symbols.reverse();
    // Every byte comes from ALPHABET, which is ASCII.
    symbols.into_iter().map(char::from).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_empty_is_zero() {
        assert_eq!(decode(""), 0);
    }

    #[test]
    fn test_decode_alphabet_boundaries() {
        assert_eq!(decode("A"), 0);
        assert_eq!(decode("Z"), 25);
        assert_eq!(decode("a"), 26);
        assert_eq!(decode("z"), 51);
        assert_eq!(decode("0"), 52);
        assert_eq!(decode("9"), 61);
        assert_eq!(decode("+"), 62);
        assert_eq!(decode("/"), 63);
        assert_eq!(decode("BA"), 64);
        assert_eq!(decode("B"), 1);
        assert_eq!(decode("C"), 2);
    }

    #[test]
    fn test_decode_unknown_characters_count_as_zero() {
        assert_eq!(decode("B?"), decode("BA"));
        assert_eq!(decode("*"), 0);
    }

    #[test]
    fn test_decode_grows_with_symbol_count() {
        // Appending a symbol shifts the prefix left by six bits.
        let mut previous = decode("B");
        for symbols in ["BA", "BAA", "BAAA", "BAAAA"] {
            let current = decode(symbols);
            assert!(current > previous, "{symbols} should decode above {previous}");
            assert_eq!(current, previous << 6);
            previous = current;
        }
    }

    #[test]
    fn test_encode_decode_round_trip() {
        let samples = [
            0u64,
            1,
            63,
            64,
            4095,
            4096,
            123_456_789,
            u32::MAX as u64,
            u32::MAX as u64 + 1,
            9_876_543_210_123,
            u64::MAX,
        ];
        for value in samples {
            let encoded = encode(value);
            assert_eq!(decode(&encoded), value, "round trip of {value} via {encoded}");
            assert_eq!(try_decode(&encoded), Some(value));
        }
    }

    #[test]
    fn test_try_decode_rejects_malformed_input() {
        assert_eq!(try_decode(""), None);
        assert_eq!(try_decode("AB-C"), None);
        assert_eq!(try_decode("ÄB"), None);
        // Twelve symbols cannot fit into 64 bits.
        assert_eq!(try_decode("BAAAAAAAAAAA"), None);
        // Eleven symbols overflow once the leading value needs more than four bits.
        assert_eq!(try_decode("/AAAAAAAAAA"), None);
        assert_eq!(try_decode("PAAAAAAAAAA"), Some(15u64 << 60));
    }
}
