//! Checksum and digit-plausibility helpers shared by the detectors.

/// Extracts the ASCII digits of a string.
#[must_use]
pub fn digits(text: &str) -> Vec<u32> {
    text.chars().filter_map(|c| c.to_digit(10)).collect()
}

/// Validates a payment card number with the Luhn algorithm.
///
/// Non-digit characters are ignored. Accepts 13 to 19 digits.
#[must_use]
pub fn luhn(number: &str) -> bool {
    let digits = digits(number);
    if digits.len() < 13 || digits.len() > 19 {
        return false;
    }

    let sum: u32 = digits
        .iter()
        .rev()
        .enumerate()
        .map(|(i, &d)| {
            if i % 2 == 1 {
                let doubled = d * 2;
                if doubled > 9 {
                    doubled - 9
                } else {
                    doubled
                }
            } else {
                d
            }
        })
        .sum();

    sum % 10 == 0
}

/// ISO 7064 mod-97 check for a normalized IBAN (uppercase, no spaces).
///
/// The first four characters move to the end, letters expand to two-digit
/// values (A=10 through Z=35), and the resulting number must leave
/// remainder 1. The remainder is folded incrementally so arbitrarily long
/// inputs never overflow.
#[must_use]
pub fn iban_mod97(normalized: &str) -> bool {
    let bytes = normalized.as_bytes();
    if bytes.len() < 5 {
        return false;
    }

    let mut remainder: u32 = 0;
    for &b in bytes[4..].iter().chain(&bytes[..4]) {
        let value = match b {
            b'0'..=b'9' => u32::from(b - b'0'),
            b'A'..=b'Z' => u32::from(b - b'A') + 10,
            _ => return false,
        };
        if value >= 10 {
            remainder = (remainder * 10 + value / 10) % 97;
        }
        remainder = (remainder * 10 + value % 10) % 97;
    }

    remainder == 1
}

/// True when every digit in the string is the same digit.
///
/// Strings without any digit return false.
#[must_use]
pub fn all_same_digits(text: &str) -> bool {
    let mut digits = text.chars().filter(char::is_ascii_digit);
    let Some(first) = digits.next() else {
        return false;
    };
    digits.all(|d| d == first)
}

/// True when the digits form a strict +1 or -1 run, such as 1234567
/// or 987654321.
#[must_use]
pub fn sequential_digits(text: &str) -> bool {
    let digits = digits(text);
    if digits.len() < 2 {
        return false;
    }

    let ascending = digits.windows(2).all(|w| w[1] == w[0] + 1);
    let descending = digits.windows(2).all(|w| w[0] == w[1] + 1);
    ascending || descending
}
