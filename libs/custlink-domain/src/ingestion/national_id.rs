//! National identification number validation
//!
//! A national ID is an 11-digit number whose last two digits are check digits
//! derived from the first nine by weighted sums modulo 11. Punctuation in the
//! raw text (e.g. `111.444.777-30`) is ignored when validating.

use std::fmt;

/// Number of digits in a national ID once punctuation is stripped
const ID_LENGTH: usize = 11;

/// Number of leading digits that feed both check digits
const BODY_LENGTH: usize = 9;

/// Check whether `id` is a valid national identification number
///
/// Every non-digit character is discarded first. The remaining digits must be
/// exactly 11 long, must not all be the same digit, and must end with the two
/// check digits computed from the first nine digits:
///
/// - first check digit: weights 10 down to 2
/// - second check digit: weights 11 down to 3
///
/// For each, `d = 11 - (sum % 11)`, and any `d > 9` becomes `0`.
///
/// Never panics; malformed input is simply invalid.
///
/// # Example
///
/// ```rust
/// use custlink_domain::ingestion::national_id::is_valid;
///
/// assert!(is_valid("111.444.777-30"));
/// assert!(!is_valid("111.444.777-31"));
/// assert!(!is_valid("11111111111"));
/// ```
pub fn is_valid(id: &str) -> bool {
    let digits = strip_to_digits(id);

    if digits.len() != ID_LENGTH {
        return false;
    }

    // Repeated-digit placeholders pass the checksum but are never real IDs
    if digits.iter().all(|&d| d == digits[0]) {
        return false;
    }

    digits[9] == check_digit(&digits, 10) && digits[10] == check_digit(&digits, 11)
}

fn strip_to_digits(id: &str) -> Vec<u32> {
    id.chars().filter_map(|c| c.to_digit(10)).collect()
}

/// Compute a check digit over the first nine digits, starting at `first_weight`
fn check_digit(digits: &[u32], first_weight: u32) -> u32 {
    let sum: u32 = digits[..BODY_LENGTH]
        .iter()
        .zip((0..).map(|i| first_weight - i))
        .map(|(digit, weight)| digit * weight)
        .sum();

    match 11 - (sum % 11) {
        d if d > 9 => 0,
        d => d,
    }
}

/// A national ID that has passed checksum validation
///
/// The raw text is kept as received so it can be persisted verbatim;
/// [`NationalId::digits`] gives the normalized form.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NationalId(String);

impl NationalId {
    /// Validate `raw` and wrap it, or return `None` if the checksum fails
    pub fn parse(raw: &str) -> Option<Self> {
        is_valid(raw).then(|| Self(raw.to_string()))
    }

    /// The ID exactly as it appeared in the input
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The 11 digits with punctuation removed
    pub fn digits(&self) -> String {
        self.0.chars().filter(char::is_ascii_digit).collect()
    }
}

impl fmt::Display for NationalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for NationalId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repeated_digit_sequences_are_invalid() {
        for digit in 0..=9 {
            let id = digit.to_string().repeat(11);
            assert!(!is_valid(&id), "{} should be rejected", id);
        }
    }

    #[test]
    fn test_valid_ids() {
        assert!(is_valid("11144477730"));
        assert!(is_valid("52998224729"));
    }

    #[test]
    fn test_single_altered_digit_is_invalid() {
        assert!(!is_valid("11144477731"));
        assert!(!is_valid("11144477736"));
        assert!(!is_valid("52998224728"));
        assert!(!is_valid("62998224729"));
    }

    #[test]
    fn test_second_check_digit_uses_first_nine_digits_only() {
        // Weights 11..=3 over 1,1,1,4,4,4,7,7,7 sum to 198, a multiple of 11,
        // so the second check digit is 0 rather than 5.
        assert_eq!(check_digit(&strip_to_digits("11144477735"), 11), 0);
        assert!(!is_valid("11144477735"));
        assert!(!is_valid("52998224725"));
    }

    #[test]
    fn test_punctuation_is_stripped() {
        assert!(is_valid("111.444.777-30"));
        assert!(is_valid("529.982.247-29"));
        assert!(is_valid(" 111 444 777 30 "));
    }

    #[test]
    fn test_wrong_length_is_invalid() {
        assert!(!is_valid(""));
        assert!(!is_valid("1114447773"));
        assert!(!is_valid("111444777300"));
        assert!(!is_valid("abc.def.ghi-jk"));
    }

    #[test]
    fn test_non_ascii_digits_are_stripped() {
        // Arabic-Indic digits are not decimal ASCII digits and are discarded
        assert!(!is_valid("١١١٤٤٤٧٧٧٣٠"));
    }

    #[test]
    fn test_first_check_digit_above_nine_becomes_zero() {
        // 1,0,0,0,0,0,0,0,1 → sum 12, 11 - 1 = 10 → 0
        assert_eq!(check_digit(&strip_to_digits("100000001"), 10), 0);
    }

    #[test]
    fn test_national_id_parse() {
        let id = NationalId::parse("111.444.777-30").expect("valid id");
        assert_eq!(id.as_str(), "111.444.777-30");
        assert_eq!(id.digits(), "11144477730");
        assert_eq!(id.to_string(), "111.444.777-30");

        assert!(NationalId::parse("111.444.777-35").is_none());
    }
}
