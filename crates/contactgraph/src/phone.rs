//! Phone number normalisation.
//!
//! Phone numbers are matched by their trailing digits: the "local" number. Stored numbers
//! carry it as a computed property so the store can compare suffixes cheaply.

/// Characters starting the DTMF tail of a dialable number.
pub const DTMF_CHARS: [char; 3] = ['p', 'w', 'x'];

/// Options for [`normalize_phone_number`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NormalizeOptions {
    /// Drop invisible Unicode format characters (bidi marks, joiners)
    pub remove_unicode_formatters: bool,
    /// Drop visual separators `( ) . -` and spaces
    pub remove_formatters: bool,
    /// Map decimal digits of any script to ASCII digits
    pub convert_to_latin: bool,
}

impl NormalizeOptions {
    /// Remove every kind of formatting, keep the script.
    pub fn strip() -> Self {
        Self {
            remove_unicode_formatters: true,
            remove_formatters: true,
            convert_to_latin: false,
        }
    }

    /// Remove formatting and convert digits to ASCII.
    pub fn latin() -> Self {
        Self {
            convert_to_latin: true,
            ..Self::strip()
        }
    }
}

/// Normalise `value` according to `options`.
pub fn normalize_phone_number(value: &str, options: NormalizeOptions) -> String {
    let mut result = String::with_capacity(value.len());

    for c in value.chars() {
        if options.convert_to_latin {
            if let Some(digit) = decimal_digit_value(c) {
                result.push(char::from(b'0' + digit));
                continue;
            }
        }

        if options.remove_formatters && matches!(c, '(' | ')' | ' ' | '.' | '-') {
            continue;
        }

        if options.remove_unicode_formatters && is_format_char(c) {
            continue;
        }

        result.push(c);
    }

    result
}

/// Index of the first DTMF character, if any.
pub fn dtmf_index(number: &str) -> Option<usize> {
    number
        .char_indices()
        .find(|(_, c)| DTMF_CHARS.contains(&c.to_ascii_lowercase()))
        .map(|(i, _)| i)
}

/// The last `length` characters of the normalised number, ignoring any DTMF tail.
pub fn local_phone_number(value: &str, length: usize) -> String {
    let number = normalize_phone_number(value, NormalizeOptions::latin());
    let end = dtmf_index(&number).unwrap_or(number.len());
    let dialable: Vec<char> = number[..end].chars().collect();
    let first = dialable.len().saturating_sub(length);

    dialable[first..].iter().collect()
}

const DIGIT_ZEROS: [u32; 18] = [
    0x0030, 0x0660, 0x06F0, 0x0966, 0x09E6, 0x0A66, 0x0AE6, 0x0B66, 0x0BE6, 0x0C66, 0x0CE6,
    0x0D66, 0x0E50, 0x0ED0, 0x0F20, 0x1040, 0x17E0, 0xFF10,
];

fn decimal_digit_value(c: char) -> Option<u8> {
    let code = c as u32;
    DIGIT_ZEROS
        .iter()
        .find(|&&zero| (zero..zero + 10).contains(&code))
        .map(|zero| (code - zero) as u8)
}

fn is_format_char(c: char) -> bool {
    matches!(c as u32,
        0x00AD
        | 0x0600..=0x0605
        | 0x061C
        | 0x06DD
        | 0x070F
        | 0x180E
        | 0x200B..=0x200F
        | 0x202A..=0x202E
        | 0x2060..=0x2064
        | 0x2066..=0x206F
        | 0xFEFF
        | 0xFFF9..=0xFFFB)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_formatters() {
        assert_eq!(
            normalize_phone_number("+49 (30) 123-45.67", NormalizeOptions::strip()),
            "+49301234567"
        );
    }

    #[test]
    fn test_convert_eastern_arabic_digits() {
        assert_eq!(
            normalize_phone_number("\u{0661}\u{0662}\u{0663}", NormalizeOptions::latin()),
            "123"
        );
        assert_eq!(
            normalize_phone_number("\u{0661}\u{0662}\u{0663}", NormalizeOptions::strip()),
            "\u{0661}\u{0662}\u{0663}"
        );
    }

    #[test]
    fn test_remove_bidi_marks() {
        assert_eq!(
            normalize_phone_number("\u{202A}555\u{202C}", NormalizeOptions::strip()),
            "555"
        );
    }

    #[test]
    fn test_local_phone_number() {
        assert_eq!(local_phone_number("+49 30 1234567", 7), "1234567");
        assert_eq!(local_phone_number("12345", 7), "12345");
        assert_eq!(local_phone_number("+4930123456p789", 7), "0123456");
        assert_eq!(local_phone_number("555W1", 7), "555");
    }

    #[test]
    fn test_dtmf_index() {
        assert_eq!(dtmf_index("123x45"), Some(3));
        assert_eq!(dtmf_index("12345"), None);
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn prop_latin_numbers_keep_only_digits(number in "[+]?[0-9() .-]{0,24}") {
                let normalized = normalize_phone_number(&number, NormalizeOptions::latin());
                prop_assert!(normalized.trim_start_matches('+').chars().all(|c| c.is_ascii_digit()));
            }

            #[test]
            fn prop_local_number_is_a_suffix(digits in "[0-9]{0,20}", length in 1usize..12) {
                let local = local_phone_number(&digits, length);
                prop_assert!(local.len() <= length);
                prop_assert!(digits.ends_with(&local));
            }

            #[test]
            fn prop_normalizing_twice_changes_nothing(number in "\\PC{0,16}") {
                let once = normalize_phone_number(&number, NormalizeOptions::latin());
                prop_assert_eq!(normalize_phone_number(&once, NormalizeOptions::latin()), once);
            }
        }
    }
}
