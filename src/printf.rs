//! `printf`-style formatting of a single value, used by the value formatter when a caller
//! supplies a format spec such as `%05d` or `%.2f`.
//!
//! Supported conversions: `b c d e E f F g G o s u x X %`, with the flags `-`, `+`, space,
//! `0` and `'c` (custom pad character), a width, a precision and an optional `1$` argument
//! position. Only one argument exists, so a spec may contain at most one conversion.

use crate::error::DbConnError;
use crate::types::RowValues;

/// Largest width or precision accepted in a spec.
const MAX_FIELD: usize = 512;

#[derive(Debug, Default)]
struct Spec {
    left: bool,
    plus: bool,
    space: bool,
    pad: Option<char>,
    width: usize,
    precision: Option<usize>,
    conversion: char,
}

/// Format `value` according to `fmt`.
///
/// # Errors
/// Returns `DbConnError::ParameterError` if the spec is malformed or needs more than one
/// argument.
pub fn sprintf(fmt: &str, value: &RowValues) -> Result<String, DbConnError> {
    let mut out = String::with_capacity(fmt.len() + 16);
    let mut chars = fmt.chars().peekable();
    let mut consumed = false;

    while let Some(c) = chars.next() {
        if c != '%' {
            out.push(c);
            continue;
        }
        if chars.peek() == Some(&'%') {
            chars.next();
            out.push('%');
            continue;
        }

        let spec = parse_spec(&mut chars, fmt)?;
        if consumed {
            return Err(DbConnError::ParameterError(format!(
                "format `{fmt}` needs more than one argument"
            )));
        }
        consumed = true;
        out.push_str(&render(&spec, value));
    }

    Ok(out)
}

fn parse_spec(
    chars: &mut std::iter::Peekable<std::str::Chars<'_>>,
    fmt: &str,
) -> Result<Spec, DbConnError> {
    let bad = || DbConnError::ParameterError(format!("malformed format spec `{fmt}`"));
    let mut spec = Spec::default();

    // Optional argument position; digits followed by `$`.
    let mut digits = String::new();
    while let Some(&d) = chars.peek() {
        if d.is_ascii_digit() {
            digits.push(d);
            chars.next();
        } else {
            break;
        }
    }
    if chars.peek() == Some(&'$') {
        chars.next();
        if digits != "1" {
            return Err(DbConnError::ParameterError(format!(
                "format `{fmt}` refers to argument {digits}, only one is available"
            )));
        }
        digits.clear();
    }

    if digits.is_empty() {
        loop {
            match chars.peek() {
                Some('-') => spec.left = true,
                Some('+') => spec.plus = true,
                Some(' ') => spec.space = true,
                Some('0') => spec.pad = Some('0'),
                Some('\'') => {
                    chars.next();
                    spec.pad = Some(chars.next().ok_or_else(bad)?);
                    continue;
                }
                _ => break,
            }
            chars.next();
        }
        while let Some(&d) = chars.peek() {
            if d.is_ascii_digit() {
                digits.push(d);
                chars.next();
            } else {
                break;
            }
        }
    } else if digits.starts_with('0') {
        // `%05d`: the leading zero read above was a flag.
        spec.pad = Some('0');
        digits.remove(0);
    }
    if !digits.is_empty() {
        spec.width = bounded(&digits, fmt)?;
    }

    if chars.peek() == Some(&'.') {
        chars.next();
        let mut prec = String::new();
        while let Some(&d) = chars.peek() {
            if d.is_ascii_digit() {
                prec.push(d);
                chars.next();
            } else {
                break;
            }
        }
        spec.precision = Some(if prec.is_empty() {
            0
        } else {
            bounded(&prec, fmt)?
        });
    }

    spec.conversion = chars.next().ok_or_else(bad)?;
    if !"bcdeEfFgGosuxX".contains(spec.conversion) {
        return Err(bad());
    }
    Ok(spec)
}

fn bounded(digits: &str, fmt: &str) -> Result<usize, DbConnError> {
    match digits.parse::<usize>() {
        Ok(n) if n <= MAX_FIELD => Ok(n),
        _ => Err(DbConnError::ParameterError(format!(
            "format `{fmt}` asks for more than {MAX_FIELD} characters"
        ))),
    }
}

#[allow(clippy::cast_sign_loss)]
fn render(spec: &Spec, value: &RowValues) -> String {
    let body = match spec.conversion {
        'd' => signed(spec, as_int(value).to_string(), as_int(value) < 0),
        'u' => (as_int(value) as u64).to_string(),
        'f' | 'F' => {
            let v = as_float(value);
            signed(spec, format!("{:.*}", spec.precision.unwrap_or(6), v), v < 0.0)
        }
        'e' | 'E' => {
            let v = as_float(value);
            let s = exponent(v, spec.precision.unwrap_or(6));
            let s = if spec.conversion == 'E' { s.to_uppercase() } else { s };
            signed(spec, s, v < 0.0)
        }
        'g' | 'G' => {
            let v = as_float(value);
            let s = general(v, spec.precision.unwrap_or(6));
            let s = if spec.conversion == 'G' { s.to_uppercase() } else { s };
            signed(spec, s, v < 0.0)
        }
        'x' => format!("{:x}", as_int(value) as u64),
        'X' => format!("{:X}", as_int(value) as u64),
        'o' => format!("{:o}", as_int(value) as u64),
        'b' => format!("{:b}", as_int(value) as u64),
        'c' => u32::try_from(as_int(value))
            .ok()
            .and_then(char::from_u32)
            .map(String::from)
            .unwrap_or_default(),
        _ => {
            let s = as_string(value);
            match spec.precision {
                Some(p) => s.chars().take(p).collect(),
                None => s,
            }
        }
    };
    pad(spec, body)
}

fn signed(spec: &Spec, digits: String, negative: bool) -> String {
    if negative {
        digits
    } else if spec.plus {
        format!("+{digits}")
    } else if spec.space {
        format!(" {digits}")
    } else {
        digits
    }
}

fn pad(spec: &Spec, body: String) -> String {
    let len = body.chars().count();
    if len >= spec.width {
        return body;
    }
    let fill = spec.width - len;
    let pad_char = spec.pad.unwrap_or(' ');

    if spec.left {
        // Zeros never go on the right of a number.
        let pad_char = if pad_char == '0' { ' ' } else { pad_char };
        let mut s = body;
        s.extend(std::iter::repeat_n(pad_char, fill));
        return s;
    }

    let numeric = "deEfFgG".contains(spec.conversion);
    if pad_char == '0' && numeric && body.starts_with(['-', '+', ' ']) {
        let (sign, rest) = body.split_at(1);
        return format!("{sign}{}{rest}", "0".repeat(fill));
    }
    let mut s: String = std::iter::repeat_n(pad_char, fill).collect();
    s.push_str(&body);
    s
}

/// `1.5e+3` style, with an explicit exponent sign and no exponent padding.
fn exponent(v: f64, precision: usize) -> String {
    let s = format!("{v:.precision$e}");
    match s.split_once('e') {
        Some((mantissa, exp)) if !exp.starts_with('-') => format!("{mantissa}e+{exp}"),
        _ => s,
    }
}

fn general(v: f64, precision: usize) -> String {
    if v == 0.0 {
        return "0".to_string();
    }
    let precision = precision.max(1);
    #[allow(clippy::cast_possible_truncation)]
    let exp = v.abs().log10().floor() as i64;
    let limit = i64::try_from(precision).unwrap_or(i64::MAX);
    if exp < -4 || exp >= limit {
        let s = exponent(v, precision - 1);
        match s.split_once('e') {
            Some((m, e)) if m.contains('.') => {
                format!("{}e{e}", m.trim_end_matches('0').trim_end_matches('.'))
            }
            _ => s,
        }
    } else {
        let decimals = usize::try_from(limit - 1 - exp).unwrap_or(0);
        let s = format!("{v:.decimals$}");
        if s.contains('.') {
            s.trim_end_matches('0').trim_end_matches('.').to_string()
        } else {
            s
        }
    }
}

#[allow(clippy::cast_possible_truncation)]
fn as_int(value: &RowValues) -> i64 {
    match value {
        RowValues::Int(i) => *i,
        RowValues::Float(f) if f.is_finite() => f.trunc() as i64,
        RowValues::Bool(b) => i64::from(*b),
        RowValues::Text(s) => leading_number(s).map_or(0, |f| f.trunc() as i64),
        RowValues::Timestamp(ts) => ts.and_utc().timestamp(),
        _ => 0,
    }
}

#[allow(clippy::cast_precision_loss)]
fn as_float(value: &RowValues) -> f64 {
    match value {
        RowValues::Float(f) => *f,
        RowValues::Text(s) => leading_number(s).unwrap_or(0.0),
        other => as_int(other) as f64,
    }
}

fn as_string(value: &RowValues) -> String {
    match value {
        RowValues::Text(s) => s.clone(),
        RowValues::Int(i) => i.to_string(),
        RowValues::Float(f) => f.to_string(),
        RowValues::Bool(true) => "1".to_string(),
        RowValues::Bool(false) | RowValues::Null => String::new(),
        RowValues::Timestamp(ts) => ts.format("%Y-%m-%d %H:%M:%S").to_string(),
        RowValues::JSON(json) => json.to_string(),
        RowValues::Blob(bytes) => String::from_utf8_lossy(bytes).into_owned(),
    }
}

/// Numeric prefix of a string (`"12abc"` reads as 12).
fn leading_number(s: &str) -> Option<f64> {
    let s = s.trim_start();
    let bytes = s.as_bytes();
    let mut end = 0;
    let mut seen_digit = false;
    let mut seen_dot = false;
    let mut seen_exp = false;
    while end < bytes.len() {
        match bytes[end] {
            b'+' | b'-' if end == 0 => {}
            b'+' | b'-' if seen_exp && matches!(bytes[end - 1], b'e' | b'E') => {}
            b'0'..=b'9' => seen_digit = true,
            b'.' if !seen_dot && !seen_exp => seen_dot = true,
            b'e' | b'E' if seen_digit && !seen_exp => seen_exp = true,
            _ => break,
        }
        end += 1;
    }
    let mut candidate = &s[..end];
    while !candidate.is_empty() {
        if let Ok(v) = candidate.parse::<f64>() {
            return Some(v);
        }
        candidate = &candidate[..candidate.len() - 1];
    }
    None
}
