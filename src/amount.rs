//! Numeric input codec
//!
//! Converts free-form user keystrokes into canonical decimal strings and
//! canonical strings into fixed-point integer amounts for on-chain
//! submission. Sanitization is total and idempotent; validation reports
//! every violation without mutating; fixed-point parsing is decimal-aware
//! (string scaling, never float multiplication).

use std::fmt;

use alloy::primitives::U256;

use crate::error::AmountError;

/// Validation limits for user-entered amounts.
pub const MAX_INPUT_LENGTH: usize = 20;
pub const MAX_DECIMAL_PLACES: usize = 6;
pub const MAX_VALUE: f64 = 1e12;

/// Minimum balance a wallet must hold before an unwrap is allowed.
pub const MIN_BALANCE_REQUIRED: f64 = 1e-9;

/// Tolerance for float comparison in balance checks.
pub const BALANCE_EPSILON: f64 = 1e-9;

/// Machine-readable validation error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationCode {
    InvalidFormat,
    MaxLengthExceeded,
    ExcessiveDecimals,
    MultipleDecimals,
    ValueTooLow,
    ValueTooHigh,
    InvalidNumbers,
    InsufficientBalance,
    MinBalanceNotMet,
}

impl ValidationCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValidationCode::InvalidFormat => "INVALID_FORMAT",
            ValidationCode::MaxLengthExceeded => "MAX_LENGTH_EXCEEDED",
            ValidationCode::ExcessiveDecimals => "EXCESSIVE_DECIMALS",
            ValidationCode::MultipleDecimals => "MULTIPLE_DECIMALS",
            ValidationCode::ValueTooLow => "VALUE_TOO_LOW",
            ValidationCode::ValueTooHigh => "VALUE_TOO_HIGH",
            ValidationCode::InvalidNumbers => "INVALID_NUMBERS",
            ValidationCode::InsufficientBalance => "INSUFFICIENT_BALANCE",
            ValidationCode::MinBalanceNotMet => "MIN_BALANCE_NOT_MET",
        }
    }
}

impl fmt::Display for ValidationCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single validation violation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
    pub code: ValidationCode,
}

/// Outcome of a validation pass. Collects every violation rather than
/// stopping at the first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationResult {
    pub errors: Vec<ValidationError>,
}

impl ValidationResult {
    pub fn valid() -> Self {
        Self { errors: Vec::new() }
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// First error message, for single-line UI surfacing.
    pub fn first_message(&self) -> Option<&str> {
        self.errors.first().map(|e| e.message.as_str())
    }

    pub fn has_code(&self, code: ValidationCode) -> bool {
        self.errors.iter().any(|e| e.code == code)
    }
}

/// A non-negative integer amount scaled by `10^decimals`, ready for
/// on-chain submission. Constructed only through [`to_fixed_point`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedPointAmount(U256);

impl FixedPointAmount {
    pub fn raw(&self) -> U256 {
        self.0
    }
}

impl fmt::Display for FixedPointAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Sanitize raw keyboard input into a canonical decimal string.
///
/// Never fails: any input maps to some valid decimal string. Idempotent:
/// `sanitize(sanitize(x)) == sanitize(x)`. A trailing `.` is preserved so
/// the user can keep typing fractional digits; values with at most six
/// fractional digits are preserved verbatim; longer fractions are rounded
/// to 8 internal digits (half away from zero) and re-rendered to at most
/// 6 fractional digits.
pub fn sanitize(raw: &str) -> String {
    let mut s: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect();

    // collapse all but the first decimal point
    if let Some(dot) = s.find('.') {
        let tail: String = s[dot + 1..].chars().filter(|c| *c != '.').collect();
        s.truncate(dot + 1);
        s.push_str(&tail);
    }

    // strip leading zeros unless the value is "0" or "0.x"
    if s != "0" && !s.starts_with("0.") {
        while s.starts_with('0') && s[1..].starts_with(|c: char| c.is_ascii_digit()) {
            s.remove(0);
        }
    }

    if s.starts_with('.') {
        s.insert(0, '0');
    }

    if s.is_empty() {
        return "0".to_string();
    }

    // keep a trailing point so the user can continue typing
    if s.ends_with('.') {
        return s;
    }

    // short fractional values are kept verbatim while the user is typing
    if let Some(dot) = s.find('.') {
        if s.len() - dot <= MAX_DECIMAL_PLACES + 1
            && s.parse::<f64>().map(f64::is_finite).unwrap_or(false)
        {
            return s;
        }
    }

    let num: f64 = match s.parse() {
        Ok(n) => n,
        Err(_) => return s,
    };
    if !num.is_finite() {
        return s;
    }

    // round to 8 internal digits, half away from zero
    let fixed = (num * 1e8).round() / 1e8;
    let mut result = fixed.to_string();

    if let Some(dot) = result.find('.') {
        if result.len() - dot - 1 > MAX_DECIMAL_PLACES {
            result = format!("{:.*}", MAX_DECIMAL_PLACES, fixed);
            while result.ends_with('0') {
                result.pop();
            }
            if result.ends_with('.') {
                result.pop();
            }
        }
    }

    result
}

/// Validate a decimal string, reporting every violation.
///
/// An empty string is valid: it means "not yet entered", not an error.
pub fn validate(value: &str) -> ValidationResult {
    let mut errors = Vec::new();

    if value.trim().is_empty() {
        return ValidationResult::valid();
    }

    if !value.chars().all(|c| c.is_ascii_digit() || c == '.') {
        errors.push(ValidationError {
            field: "input_value",
            message: "Only numbers and decimal points are allowed".to_string(),
            code: ValidationCode::InvalidFormat,
        });
    }

    if value.len() > MAX_INPUT_LENGTH {
        errors.push(ValidationError {
            field: "input_value",
            message: format!("Maximum {MAX_INPUT_LENGTH} characters allowed"),
            code: ValidationCode::MaxLengthExceeded,
        });
    }

    if let Some(dot) = value.find('.') {
        if value.len() - dot - 1 > MAX_DECIMAL_PLACES {
            errors.push(ValidationError {
                field: "input_value",
                message: format!("Maximum {MAX_DECIMAL_PLACES} decimal places allowed"),
                code: ValidationCode::ExcessiveDecimals,
            });
        }
    }

    if value.matches('.').count() > 1 {
        errors.push(ValidationError {
            field: "input_value",
            message: "Only one decimal point allowed".to_string(),
            code: ValidationCode::MultipleDecimals,
        });
    }

    if let Ok(num) = value.parse::<f64>() {
        if num <= 0.0 {
            errors.push(ValidationError {
                field: "input_value",
                message: "Value must be greater than 0".to_string(),
                code: ValidationCode::ValueTooLow,
            });
        }
        if num > MAX_VALUE {
            errors.push(ValidationError {
                field: "input_value",
                message: "Value is too large".to_string(),
                code: ValidationCode::ValueTooHigh,
            });
        }
    }

    ValidationResult { errors }
}

/// Parse a decimal string into a fixed-point amount scaled by
/// `10^decimals`.
///
/// Scaling is done in integer arithmetic on the decimal digits, so
/// `"1.5"` at 18 decimals is exactly `1500000000000000000`. The float
/// parse is used only for the range checks.
pub fn to_fixed_point(value: &str, decimals: u32) -> Result<FixedPointAmount, AmountError> {
    let trimmed = value.trim();
    // syntactic zero covers "", "0", "0.0", "0.", ...
    if trimmed.is_empty() || trimmed.chars().all(|c| c == '0' || c == '.') {
        return Err(AmountError::EmptyOrZero);
    }

    let num: f64 = trimmed.parse().map_err(|_| AmountError::NotPositiveFinite)?;
    if !num.is_finite() || num <= 0.0 {
        return Err(AmountError::NotPositiveFinite);
    }
    if num > MAX_VALUE {
        return Err(AmountError::TooLarge);
    }

    let (int_part, frac_part) = match trimmed.split_once('.') {
        Some((i, f)) => (i, f),
        None => (trimmed, ""),
    };

    if frac_part.len() > decimals as usize {
        return Err(AmountError::ParseFailure(format!(
            "too many decimal places for {decimals}-decimal token: {trimmed}"
        )));
    }

    let int_val = parse_digits(int_part)?;
    let frac_val = parse_digits(frac_part)?;

    let scale = pow10(decimals)?;
    let frac_scale = pow10(decimals - frac_part.len() as u32)?;

    let amount = int_val
        .checked_mul(scale)
        .and_then(|v| frac_val.checked_mul(frac_scale).and_then(|f| v.checked_add(f)))
        .ok_or_else(|| AmountError::ParseFailure(format!("amount overflows: {trimmed}")))?;

    if amount.is_zero() {
        return Err(AmountError::ParseFailure("parsed amount is zero".to_string()));
    }

    Ok(FixedPointAmount(amount))
}

fn parse_digits(digits: &str) -> Result<U256, AmountError> {
    let mut value = U256::ZERO;
    let ten = U256::from(10u8);
    for c in digits.chars() {
        let d = c
            .to_digit(10)
            .ok_or_else(|| AmountError::ParseFailure(format!("invalid digit '{c}'")))?;
        value = value
            .checked_mul(ten)
            .and_then(|v| v.checked_add(U256::from(d)))
            .ok_or_else(|| AmountError::ParseFailure("amount overflows".to_string()))?;
    }
    Ok(value)
}

fn pow10(exp: u32) -> Result<U256, AmountError> {
    U256::from(10u8)
        .checked_pow(U256::from(exp))
        .ok_or_else(|| AmountError::ParseFailure("scale overflows".to_string()))
}

/// Check that `amount` can be covered by `balance`.
///
/// Floats are compared with a `1e-9` epsilon to absorb representation
/// noise. The minimum-balance check is independent of the amount check, so
/// both errors may fire together.
pub fn validate_sufficient_balance(amount: &str, balance: &str) -> ValidationResult {
    let mut errors = Vec::new();

    let amount_num: Result<f64, _> = amount.parse();
    let balance_num: Result<f64, _> = balance.parse();

    let (amount_num, balance_num) = match (amount_num, balance_num) {
        (Ok(a), Ok(b)) if !a.is_nan() && !b.is_nan() => (a, b),
        _ => {
            errors.push(ValidationError {
                field: "balance",
                message: "Invalid balance or amount".to_string(),
                code: ValidationCode::InvalidNumbers,
            });
            return ValidationResult { errors };
        }
    };

    if amount_num > balance_num + BALANCE_EPSILON {
        errors.push(ValidationError {
            field: "balance",
            message: "Insufficient balance".to_string(),
            code: ValidationCode::InsufficientBalance,
        });
    }

    if balance_num < MIN_BALANCE_REQUIRED {
        errors.push(ValidationError {
            field: "balance",
            message: "Minimum balance required".to_string(),
            code: ValidationCode::MinBalanceNotMet,
        });
    }

    ValidationResult { errors }
}

/// Render a number for UI display.
///
/// Magnitudes below `1e-6` use scientific notation with two significant
/// digits; everything else is fixed to `max_decimals` with trailing zeros
/// (and a trailing bare point) trimmed.
pub fn format_display(value: &str, max_decimals: usize) -> String {
    if value.is_empty() || value == "0" {
        return "0".to_string();
    }

    let num: f64 = match value.parse::<f64>() {
        Ok(n) if !n.is_nan() => n,
        _ => return "0".to_string(),
    };

    if num > 0.0 && num < 1e-6 {
        return format!("{num:.2e}");
    }

    let mut formatted = format!("{:.*}", max_decimals, num);
    if formatted.contains('.') {
        while formatted.ends_with('0') {
            formatted.pop();
        }
        if formatted.ends_with('.') {
            formatted.pop();
        }
    }
    formatted
}

/// True if the string parses as a finite number greater than zero.
pub fn is_valid_positive_number(value: &str) -> bool {
    value
        .parse::<f64>()
        .map(|n| n.is_finite() && n > 0.0)
        .unwrap_or(false)
}
