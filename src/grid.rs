//! Spreadsheet column-letter arithmetic.

/// Convert a 1-based column number to its letter form (1 -> A, 27 -> AA).
///
/// Bijective base-26: there is no digit for zero, so each step subtracts one
/// before dividing. Callers must not pass 0.
pub fn col_letter(n: u32) -> String {
    debug_assert!(n > 0, "column numbers are 1-based");
    let mut n = n;
    let mut letters = String::new();
    while n > 0 {
        let remainder = ((n - 1) % 26) as u8;
        letters.insert(0, (b'A' + remainder) as char);
        n = (n - 1) / 26;
    }
    letters
}

/// Inverse of [`col_letter`]: "A" -> 1, "Z" -> 26, "AA" -> 27.
///
/// Input must be uppercase ASCII letters, as produced by [`col_letter`];
/// anything else is a caller error.
pub fn col_index(letters: &str) -> u32 {
    letters.bytes().fold(0u32, |acc, b| {
        debug_assert!(b.is_ascii_uppercase(), "column letters are uppercase A-Z");
        acc * 26 + u32::from(b - b'A' + 1)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_anchors() {
        assert_eq!(col_letter(1), "A");
        assert_eq!(col_letter(26), "Z");
        assert_eq!(col_letter(27), "AA");
        assert_eq!(col_letter(52), "AZ");
        assert_eq!(col_letter(53), "BA");
        assert_eq!(col_letter(702), "ZZ");
        assert_eq!(col_letter(703), "AAA");
    }

    #[test]
    fn test_bijection_through_zz() {
        for n in 1..=702 {
            assert_eq!(col_index(&col_letter(n)), n, "round trip failed at {}", n);
        }
    }

    #[test]
    #[should_panic(expected = "uppercase")]
    fn test_col_index_rejects_lowercase() {
        col_index("aa");
    }

    #[test]
    fn test_col_index_anchors() {
        assert_eq!(col_index("A"), 1);
        assert_eq!(col_index("E"), 5);
        assert_eq!(col_index("Z"), 26);
        assert_eq!(col_index("AA"), 27);
        assert_eq!(col_index("ZZ"), 702);
    }
}
