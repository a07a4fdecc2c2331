use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

static SUFFIXED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)([0-9]+)(?:\.([0-9]+))?\s*([km])\b").expect("suffix pattern is valid")
});

static PLAIN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[0-9]{4,}").expect("digit pattern is valid"));

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("empty interest text")]
    Empty,
    #[error("no interest count found")]
    NotFound,
    #[error("interest count out of range: {0}")]
    Overflow(String),
}

pub type ParseResult<T> = Result<T, ParseError>;

/// Turn scraped text such as `64.6K+ are interested` into a plain count.
///
/// A number carrying a `K` or `M` suffix wins; fractional magnitudes are
/// scaled exactly and rounded half-up. Without a suffix, the first run of
/// four or more digits is taken as the count.
pub fn normalize(raw: &str) -> ParseResult<u64> {
    let text = raw.replace(',', "");
    let text = text.trim();
    if text.is_empty() {
        return Err(ParseError::Empty);
    }

    if let Some(caps) = SUFFIXED.captures(text) {
        let whole = &caps[1];
        let fraction = caps.get(2).map_or("", |m| m.as_str());
        let scale = match caps[3].to_ascii_lowercase().as_str() {
            "m" => 6,
            _ => 3,
        };
        return scale_decimal(whole, fraction, scale)
            .ok_or_else(|| ParseError::Overflow(caps[0].to_string()));
    }

    if let Some(digits) = PLAIN.find(text) {
        return digits
            .as_str()
            .parse()
            .map_err(|_| ParseError::Overflow(digits.as_str().to_string()));
    }

    Err(ParseError::NotFound)
}

/// `whole.fraction * 10^scale`, rounded half-up, without going through floats.
fn scale_decimal(whole: &str, fraction: &str, scale: usize) -> Option<u64> {
    let whole: u64 = whole.parse().ok()?;
    let factor = 10u64.checked_pow(scale as u32)?;

    let kept: String = fraction
        .chars()
        .chain(std::iter::repeat('0'))
        .take(scale)
        .collect();
    let kept: u64 = kept.parse().ok()?;
    let round_up = fraction.as_bytes().get(scale).is_some_and(|d| *d >= b'5');

    whole
        .checked_mul(factor)?
        .checked_add(kept)?
        .checked_add(u64::from(round_up))
}
