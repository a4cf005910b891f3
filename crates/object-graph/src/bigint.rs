//! Arbitrary-precision integers kept in canonical decimal form.
//!
//! The graph never does arithmetic on big integers; it only has to carry
//! them losslessly. Storing the normalized digit string is enough for that
//! and keeps equality exact.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Error returned when text is not an integer literal.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Cannot convert {0} to a BigInt")]
pub struct ParseBigIntError(pub String);

/// An arbitrary-precision integer.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BigInt {
    negative: bool,
    /// Decimal digits, most significant first, no leading zeros (`"0"` for zero).
    digits: String,
}

impl BigInt {
    pub fn zero() -> Self {
        Self {
            negative: false,
            digits: "0".to_string(),
        }
    }

    pub fn is_negative(&self) -> bool {
        self.negative
    }

    /// Magnitude digits without sign.
    pub fn digits(&self) -> &str {
        &self.digits
    }
}

impl Default for BigInt {
    fn default() -> Self {
        Self::zero()
    }
}

/// Parses an integer literal the way a host `BigInt(text)` call does:
/// decimal digits with an optional sign, or a `0x`/`0o`/`0b` prefixed
/// literal (no sign allowed). Surrounding whitespace is ignored.
impl FromStr for BigInt {
    type Err = ParseBigIntError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let invalid = || ParseBigIntError(text.to_string());
        let trimmed = text.trim();
        if let Some((radix, body)) = radix_prefix(trimmed) {
            let digits = to_decimal(body, radix).ok_or_else(invalid)?;
            return Ok(Self::from_digits(false, &digits));
        }
        let (negative, body) = match trimmed.as_bytes().first() {
            Some(b'-') => (true, &trimmed[1..]),
            Some(b'+') => (false, &trimmed[1..]),
            _ => (false, trimmed),
        };
        if body.is_empty() || !body.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        Ok(Self::from_digits(negative, body))
    }
}

impl BigInt {
    fn from_digits(negative: bool, digits: &str) -> Self {
        let stripped = digits.trim_start_matches('0');
        if stripped.is_empty() {
            return Self::zero();
        }
        Self {
            negative,
            digits: stripped.to_string(),
        }
    }
}

fn radix_prefix(text: &str) -> Option<(u32, &str)> {
    let prefix = text.get(..2)?;
    let radix = match prefix {
        "0x" | "0X" => 16,
        "0o" | "0O" => 8,
        "0b" | "0B" => 2,
        _ => return None,
    };
    Some((radix, &text[2..]))
}

/// Converts `body`, written in `radix`, to decimal digit text.
fn to_decimal(body: &str, radix: u32) -> Option<String> {
    if body.is_empty() {
        return None;
    }
    // Little-endian decimal digits.
    let mut decimal: Vec<u32> = vec![0];
    for c in body.chars() {
        let mut carry = c.to_digit(radix)?;
        for digit in decimal.iter_mut() {
            let next = *digit * radix + carry;
            *digit = next % 10;
            carry = next / 10;
        }
        while carry > 0 {
            decimal.push(carry % 10);
            carry /= 10;
        }
    }
    Some(
        decimal
            .iter()
            .rev()
            .filter_map(|d| char::from_digit(*d, 10))
            .collect(),
    )
}

impl fmt::Display for BigInt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.negative {
            write!(f, "-{}", self.digits)
        } else {
            write!(f, "{}", self.digits)
        }
    }
}

impl From<i64> for BigInt {
    fn from(n: i64) -> Self {
        Self {
            negative: n < 0,
            digits: n.unsigned_abs().to_string(),
        }
    }
}

impl From<u64> for BigInt {
    fn from(n: u64) -> Self {
        Self {
            negative: false,
            digits: n.to_string(),
        }
    }
}
