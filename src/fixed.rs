//! Read and write real numbers in fixed-width deck fields.
//!
//! Data cards are split into [`SLOTS_PER_CARD`] slots of [`FIELD_WIDTH`]
//! characters. [`parse_field`] reads one slot; [`format_field`] writes a value
//! back into exactly `FIELD_WIDTH` characters, right-justified:
//!
//! ```
//! # use kunit::fixed::{format_field, parse_field};
//! assert_eq!(format_field(0.01).unwrap(), "      0.01");
//! assert_eq!(format_field(5.242e9).unwrap(), "  5.242E+9");
//! assert_eq!(parse_field("   3.4E-6 ").unwrap(), 3.4e-6);
//! ```
//!
//! Both fixed notation and scientific notation are tried; whichever keeps
//! more significant digits of the value is written, fixed notation winning
//! ties. Digits that do not fit are rounded half-to-even.
use ryu_floating_decimal::d2d;

use crate::kunit_error::{KError, KResult};
use crate::parsing;

/// Width of one field in a data card
pub const FIELD_WIDTH: usize = 10;

/// Number of fields in a full data card
pub const SLOTS_PER_CARD: usize = 8;

/// Largest exponent magnitude written in scientific notation
const MAX_EXPONENT: u32 = 99;

/// Parse the text of one slot as a real number.
///
/// Surrounding spaces are ignored and a blank slot reads as 0.0. `e`, `E`,
/// `d` and `D` are accepted as exponent markers.
pub fn parse_field(text: &str) -> KResult<f64> {
    let s = text.trim();
    if s.is_empty() {
        return Ok(0.0);
    }

    parsing::parse_real(s).map_err(|_| KError::MalformedField { text: text.to_string(), location: None })
}

/// Format a value into exactly [`FIELD_WIDTH`] characters.
pub fn format_field(value: f64) -> KResult<String> {
    format_real(value, FIELD_WIDTH)
}

/// Format a value into exactly `width` characters, right-justified.
///
/// Returns `KError::FieldOverflow` if the value is not finite or cannot be
/// written in `width` characters with at least one significant digit.
pub fn format_real(value: f64, width: usize) -> KResult<String> {
    let overflow = || KError::FieldOverflow { value, location: None };
    if !value.is_finite() {
        return Err(overflow());
    }

    // Negative zero is written as plain zero
    if value == 0.0 {
        return pad("0.0", width).ok_or_else(overflow);
    }

    let neg = value < 0.0;
    let digits = Digits::from_f64(value);
    let fixed = fixed_candidate(neg, &digits, width);
    let sci = sci_candidate(neg, &digits, width);

    let text = match (fixed, sci) {
        (Some((f, n_fixed)), Some((s, n_sci))) => if n_fixed >= n_sci { f } else { s },
        (Some((f, _)), None) => f,
        (None, Some((s, _))) => s,
        (None, None) => return Err(overflow()),
    };
    pad(&text, width).ok_or_else(overflow)
}

/// Split a line into its slots. Slots past the end of the line are empty
/// strings and the last slot may be shorter than [`FIELD_WIDTH`].
pub fn split_slots(line: &str) -> Vec<String> {
    let chars: Vec<char> = line.chars().collect();
    (0..SLOTS_PER_CARD)
        .map(|i| {
            let start = (i * FIELD_WIDTH).min(chars.len());
            let end = ((i + 1) * FIELD_WIDTH).min(chars.len());
            chars[start..end].iter().collect()
        })
        .collect()
}

/// Join fields into a card, right-justifying each one in its slot.
///
/// Fields longer than [`FIELD_WIDTH`] are cut to width so the layout of the
/// card is never shifted.
pub fn join_slots<S: AsRef<str>>(fields: &[S]) -> String {
    let mut out = String::with_capacity(fields.len() * FIELD_WIDTH);
    for f in fields {
        let f: String = f.as_ref().trim().chars().take(FIELD_WIDTH).collect();
        out.push_str(&format!("{f:>FIELD_WIDTH$}"));
    }
    out
}

/// Replace one slot of a card with `field`, right-justified. A line too short
/// to reach the slot is padded with blanks first.
pub fn replace_slot(line: &str, slot: usize, field: &str) -> Option<String> {
    let field = pad(field.trim(), FIELD_WIDTH)?;
    let start = slot * FIELD_WIDTH;
    let mut chars: Vec<char> = line.chars().collect();
    if chars.len() < start + FIELD_WIDTH {
        chars.resize(start + FIELD_WIDTH, ' ');
    }
    chars.splice(start..start + FIELD_WIDTH, field.chars());
    Some(chars.into_iter().collect())
}

fn pad(s: &str, width: usize) -> Option<String> {
    if s.len() > width {
        None
    } else {
        Some(format!("{s:>width$}"))
    }
}

/// The decimal digits of a finite, non-zero magnitude: `0.d1d2d3... × 10^point`.
///
/// `digits` holds ASCII digits with no leading or trailing zeros.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Digits {
    digits: Vec<u8>,
    point: i32,
}

impl Digits {
    /// Shortest decimal representation that reads back as the same `f64`
    fn from_f64(v: f64) -> Self {
        let v = d2d(v.abs());
        let mut b = itoa::Buffer::new();
        let digits = b.format(v.mantissa).as_bytes().to_vec();
        let point = v.exponent + digits.len() as i32;
        let mut out = Self { digits, point };
        out.trim_trailing_zeros();
        out
    }

    fn len(&self) -> usize {
        self.digits.len()
    }

    fn trim_trailing_zeros(&mut self) {
        while self.digits.len() > 1 && self.digits.last() == Some(&b'0') {
            self.digits.pop();
        }
    }

    /// Round to at most `n` significant digits (`n >= 1`), ties to even.
    fn round_to(&self, n: usize) -> Self {
        if self.digits.len() <= n {
            return self.clone();
        }

        let mut kept = self.digits[..n].to_vec();
        let rest = &self.digits[n..];
        let round_up = match rest[0] {
            b'6'..=b'9' => true,
            b'5' => {
                let above_half = rest[1..].iter().any(|&d| d != b'0');
                let last_is_odd = kept.last().map(|d| (d - b'0') % 2 == 1).unwrap_or(false);
                above_half || last_is_odd
            },
            _ => false,
        };

        let mut point = self.point;
        if round_up {
            let mut i = kept.len();
            loop {
                if i == 0 {
                    kept.insert(0, b'1');
                    point += 1;
                    break;
                }
                i -= 1;
                if kept[i] == b'9' {
                    kept[i] = b'0';
                } else {
                    kept[i] += 1;
                    break;
                }
            }
        }

        let mut out = Self { digits: kept, point };
        out.trim_trailing_zeros();
        out
    }

    fn digit(&self, i: usize) -> char {
        self.digits.get(i).map(|&d| d as char).unwrap_or('0')
    }
}

/// Fixed notation and the number of significant digits it writes, if the value fits.
fn fixed_candidate(neg: bool, digits: &Digits, width: usize) -> Option<(String, usize)> {
    let sign = neg as usize;
    let int_len = digits.point.max(1) as usize;
    let decimals = width.checked_sub(sign + int_len + 1)?;

    // How many significant digits the decimals can hold; at least one must survive
    let capacity = digits.point + decimals as i32;
    if capacity < 1 {
        return None;
    }
    let rounded = digits.round_to(digits.len().min(capacity as usize));
    let s = render_fixed(neg, &rounded, width)?;
    Some((s, rounded.len()))
}

fn render_fixed(neg: bool, d: &Digits, width: usize) -> Option<String> {
    let mut s = String::with_capacity(width);
    if neg {
        s.push('-');
    }

    if d.point <= 0 {
        s.push('0');
    } else {
        for i in 0..d.point as usize {
            s.push(d.digit(i));
        }
    }
    s.push('.');

    if d.point < 0 {
        for _ in 0..-d.point {
            s.push('0');
        }
    }
    let first_frac = d.point.max(0) as usize;
    for i in first_frac..d.len() {
        s.push(d.digit(i));
    }

    // Whole numbers get one decimal digit when there is room for it
    if s.ends_with('.') && s.len() < width {
        s.push('0');
    }

    if s.len() <= width {
        Some(s)
    } else {
        None
    }
}

/// Scientific notation (`d.dddE+x`) and the number of significant digits it writes, if the value fits.
fn sci_candidate(neg: bool, digits: &Digits, width: usize) -> Option<(String, usize)> {
    let sign = neg as usize;
    let mut cap = digits.len();
    loop {
        let rounded = digits.round_to(cap);
        let exponent = rounded.point - 1;
        if exponent.unsigned_abs() > MAX_EXPONENT {
            return None;
        }

        let mut b = itoa::Buffer::new();
        let exp_digits = b.format(exponent.unsigned_abs());
        let exp_len = 2 + exp_digits.len();

        // Room for mantissa digits once the sign, decimal point and exponent are placed
        let max_digits = width.checked_sub(sign + 1 + exp_len)?;
        if max_digits == 0 {
            return None;
        }

        if rounded.len() <= max_digits {
            let mut s = String::with_capacity(width);
            if neg {
                s.push('-');
            }
            s.push(rounded.digit(0));
            s.push('.');
            if rounded.len() > 1 {
                for i in 1..rounded.len() {
                    s.push(rounded.digit(i));
                }
            } else if max_digits > 1 {
                s.push('0');
            }
            s.push('E');
            s.push(if exponent < 0 { '-' } else { '+' });
            s.push_str(exp_digits);
            return Some((s, rounded.len()));
        }

        cap = max_digits;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn digits(s: &str, point: i32) -> Digits {
        Digits { digits: s.as_bytes().to_vec(), point }
    }

    #[test]
    fn test_parse_blank_and_padded() -> KResult<()> {
        assert_eq!(parse_field("          ")?, 0.0);
        assert_eq!(parse_field("")?, 0.0);
        assert_eq!(parse_field("  10.00000")?, 10.0);
        assert_eq!(parse_field("-0.05031  ")?, -0.05031);
        Ok(())
    }

    #[test]
    fn test_parse_malformed_keeps_text() {
        let e = parse_field("abc123    ").unwrap_err();
        if let KError::MalformedField { text, location } = e {
            assert_eq!(text, "abc123    ");
            assert!(location.is_none());
        } else {
            panic!("Wrong error type: {e:?}");
        }
    }

    #[test]
    fn test_digits_from_f64() {
        assert_eq!(Digits::from_f64(3.14), digits("314", 1));
        assert_eq!(Digits::from_f64(0.0314), digits("314", -1));
        assert_eq!(Digits::from_f64(3140.0), digits("314", 4));
        assert_eq!(Digits::from_f64(-10.0), digits("1", 2));
    }

    #[test]
    fn test_round_half_even() {
        assert_eq!(digits("125", 1).round_to(2), digits("12", 1), "tie rounds to even (down)");
        assert_eq!(digits("135", 1).round_to(2), digits("14", 1), "tie rounds to even (up)");
        assert_eq!(digits("1251", 1).round_to(2), digits("13", 1), "above half rounds up");
        assert_eq!(digits("1249", 1).round_to(2), digits("12", 1), "below half rounds down");
        assert_eq!(digits("9996", 1).round_to(3), digits("1", 2), "carry adds a digit");
        assert_eq!(digits("105", 1).round_to(2), digits("1", 1), "trailing zero trimmed");
    }

    #[test]
    fn test_format_fixed() -> KResult<()> {
        assert_eq!(format_field(10.0)?, "      10.0");
        assert_eq!(format_field(0.01)?, "      0.01");
        assert_eq!(format_field(1.2)?, "       1.2");
        assert_eq!(format_field(-6.5011)?, "   -6.5011");
        assert_eq!(format_field(1200.0)?, "    1200.0");
        assert_eq!(format_field(1e-5)?, "   0.00001", "fixed wins ties");
        assert_eq!(format_field(-1234.5678901)?, "-1234.5679");
        assert_eq!(format_field(123456789.0)?, "123456789.");
        assert_eq!(format_field(12345678.0)?, "12345678.0");
        Ok(())
    }

    #[test]
    fn test_format_scientific() -> KResult<()> {
        assert_eq!(format_field(5.242e9)?, "  5.242E+9");
        assert_eq!(format_field(1e10)?, "   1.0E+10");
        assert_eq!(format_field(1.23456789e-7)?, "1.23457E-7");
        assert_eq!(format_field(-1.23456789e-7)?, "-1.2346E-7");
        assert_eq!(format_field(1234567890123.0)?, "1.2346E+12");
        assert_eq!(format_field(7.8e11)?, "   7.8E+11");
        assert_eq!(format_field(-3.4e-12)?, "  -3.4E-12");
        Ok(())
    }

    #[test]
    fn test_format_zero() -> KResult<()> {
        assert_eq!(format_field(0.0)?, "       0.0");
        assert_eq!(format_field(-0.0)?, "       0.0");
        Ok(())
    }

    #[test]
    fn test_format_boundaries() -> KResult<()> {
        // Rounding carries into a new integer digit
        assert_eq!(format_field(9.9999999999)?, "      10.0");
        assert_eq!(format_field(999999999.6)?, "    1.0E+9", "carry past fixed width switches to scientific");
        // Largest and smallest exponents that still fit
        assert_eq!(format_field(1.5e99)?, "   1.5E+99");
        assert_eq!(format_field(-2.5e-99)?, "  -2.5E-99");
        Ok(())
    }

    #[test]
    fn test_format_overflow() {
        for v in [1e100, -1e120, 1e-100, 9.99999999e99, f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            let e = format_field(v);
            assert!(matches!(e, Err(KError::FieldOverflow { .. })), "Formatting {v} did not overflow");
        }
    }

    fn significant_digits(field: &str) -> i32 {
        let mantissa = field.trim().split(['E', 'e']).next().unwrap_or("");
        let digits: String = mantissa.chars().filter(|c| c.is_ascii_digit()).collect();
        digits.trim_start_matches('0').len().max(1) as i32
    }

    #[test]
    fn test_width_invariant() -> KResult<()> {
        let values = [
            0.0, 1.0, -1.0, 0.1, -0.1, 3.14159265358979, 2.718281828e-3, 6.02214076e23, -1.602176634e-19, -1.6029e-19,
            299792458.0, -299792458.0, 9.999999999, 99999.99999, 1e-9, 4.2e-99, -9.1e98, 123.456, 1.0 / 3.0,
        ];
        for v in values {
            let s = format_field(v)?;
            assert_eq!(s.chars().count(), FIELD_WIDTH, "Formatting {v} gave '{s}'");
            let back = parse_field(&s)?;
            let err = if v == 0.0 { back.abs() } else { ((back - v) / v).abs() };
            // half a unit in the last written digit, relative to the leading digit
            let bound = 0.5 * 10f64.powi(1 - significant_digits(&s));
            assert!(err <= bound, "Round trip of {v} through '{s}' gave {back} (relative error {err}, bound {bound})");
            assert_eq!(format_field(back)?, s, "Formatting is not stable for {v}");
        }
        Ok(())
    }

    #[test]
    fn test_replace_slot() {
        let line = join_slots(&["7", "1.84", "-1.0E-4"]);
        assert_eq!(replace_slot(&line, 0, "1"), Some(join_slots(&["1", "1.84", "-1.0E-4"])));
        assert_eq!(replace_slot("         7", 2, "3"), Some(join_slots(&["7", "", "3"])), "Short lines are padded out to the slot");
        assert_eq!(replace_slot(&line, 1, "12345678901"), None);
    }

    #[test]
    fn test_other_widths() -> KResult<()> {
        assert_eq!(format_real(3.14, 4)?, "3.14");
        assert_eq!(format_real(-3.14, 4)?, "-3.1");
        assert_eq!(format_real(1.0, 3)?, "1.0");
        assert_eq!(format_real(2.5e-3, 16)?, "          0.0025");
        assert!(format_real(-12345.0, 4).is_err());
        Ok(())
    }

    #[test]
    fn test_split_and_join() {
        let line = join_slots(&["1", "1.2", "", "-3.0E+9"]);
        assert_eq!(line, format!("{:>10}{:>10}{:>10}{:>10}", "1", "1.2", "", "-3.0E+9"));
        let slots = split_slots(&line);
        assert_eq!(slots.len(), SLOTS_PER_CARD);
        assert_eq!(slots[1], "       1.2");
        assert_eq!(slots[3], "   -3.0E+9");
        assert_eq!(slots[4], "", "slots past the end of the line are empty");

        assert_eq!(join_slots(&["12345678901234"]), "1234567890", "long fields are cut to width");
        assert_eq!(split_slots("    1.5")[0], "    1.5", "short last slot is kept as is");
    }
}
