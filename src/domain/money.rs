use std::fmt;

/// Amounts are stored as integer hundredths of the currency unit.
/// `12.34` is held as `1234`.
pub type Cents = i64;

/// Largest magnitude accepted for any single amount: ten trillion units.
/// Keeps budgets, goals and savings balances far from the `i64` limits.
pub const MAX_AMOUNT_CENTS: Cents = 1_000_000_000_000_000;

/// Format cents as a decimal string, e.g. `-1234` -> `"-12.34"`.
pub fn format_cents(cents: Cents) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let abs_cents = cents.unsigned_abs();
    format!("{}{}.{:02}", sign, abs_cents / 100, abs_cents % 100)
}

/// Parse user-entered text into cents.
///
/// Accepts an optional sign, whole units, and an optional fractional part
/// (`"50"`, `"12.5"`, `".75"`, `"-3.10"`). More than two decimals is an
/// error rather than a silent rounding, as is a magnitude above
/// [`MAX_AMOUNT_CENTS`].
pub fn parse_cents(input: &str) -> Result<Cents, ParseCentsError> {
    let input = input.trim();
    if input.is_empty() {
        return Err(ParseCentsError::Empty);
    }

    let (negative, digits) = match input.as_bytes()[0] {
        b'-' => (true, &input[1..]),
        b'+' => (false, &input[1..]),
        _ => (false, input),
    };

    let (units_str, decimal_str) = match digits.split_once('.') {
        Some((units, decimal)) => (units, decimal),
        None => (digits, ""),
    };

    let all_digits = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
    if (units_str.is_empty() && decimal_str.is_empty())
        || !all_digits(units_str)
        || !all_digits(decimal_str)
    {
        return Err(ParseCentsError::InvalidFormat(input.to_string()));
    }

    let units: i64 = if units_str.is_empty() {
        0
    } else {
        units_str
            .parse()
            .map_err(|_| ParseCentsError::OutOfRange(input.to_string()))?
    };

    let decimal_cents: i64 = match decimal_str.len() {
        0 => 0,
        1 => decimal_str.parse::<i64>().unwrap_or(0) * 10,
        2 => decimal_str.parse().unwrap_or(0),
        _ => return Err(ParseCentsError::TooPrecise(input.to_string())),
    };

    let cents = units
        .checked_mul(100)
        .and_then(|c| c.checked_add(decimal_cents))
        .filter(|c| *c <= MAX_AMOUNT_CENTS)
        .ok_or_else(|| ParseCentsError::OutOfRange(input.to_string()))?;

    Ok(if negative { -cents } else { cents })
}

/// Sum of non-negative amounts, capped at `Cents::MAX` instead of overflowing.
pub fn saturating_total<I: IntoIterator<Item = Cents>>(amounts: I) -> Cents {
    amounts
        .into_iter()
        .fold(0, |total: Cents, cents| total.saturating_add(cents))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseCentsError {
    Empty,
    InvalidFormat(String),
    TooPrecise(String),
    OutOfRange(String),
}

impl fmt::Display for ParseCentsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseCentsError::Empty => write!(f, "amount is empty"),
            ParseCentsError::InvalidFormat(s) => write!(f, "'{}' is not a number", s),
            ParseCentsError::TooPrecise(s) => {
                write!(f, "'{}' has more than two decimal places", s)
            }
            ParseCentsError::OutOfRange(s) => write!(f, "'{}' is too large", s),
        }
    }
}

impl std::error::Error for ParseCentsError {}
