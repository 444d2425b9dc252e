//! Number and time formatting for table output, plus the parsers that turn
//! user-supplied magnitudes (`"e500"`, `"500"`, `"1.5e300"`) into log10
//! values.

use anyhow::{anyhow, bail, Result};

/// Round to `dec` decimal places.
pub fn round(value: f64, dec: u32) -> f64 {
    let scale = 10f64.powi(dec as i32);
    (value * scale).round() / scale
}

/// Render a log10 magnitude as `<mantissa>e<exponent>`, e.g. `25.3 → "2e25"`
/// with `dec = 0`, `"1.995e25"` with `dec = 3`.
pub fn log_to_exp(num: f64, dec: u32) -> String {
    let mut whole = num.floor();
    let mut mantissa = round(10f64.powf(num - whole), dec);
    // Rounding can push the mantissa to exactly 10.
    if mantissa >= 10.0 {
        mantissa /= 10.0;
        whole += 1.0;
    }
    format!("{}e{}", trim_trailing_zeros(mantissa, dec), whole)
}

fn trim_trailing_zeros(value: f64, dec: u32) -> String {
    let s = format!("{:.*}", dec as usize, value);
    if s.contains('.') {
        s.trim_end_matches('0').trim_end_matches('.').to_string()
    } else {
        s
    }
}

/// Render seconds as `"<years>y <days>d HH:MM"`, omitting leading zero
/// fields. Year counts past a million collapse to e-notation.
pub fn convert_time(secs: f64) -> String {
    let total = secs.max(0.0);
    let years = (total / 31_536_000.0).floor();
    let days = ((total / 86_400.0) % 365.0).floor();
    let hrs = ((total / 3_600.0) % 24.0).floor();
    let mins = ((total / 60.0) % 60.0).floor();

    let mut out = String::new();
    if years >= 1e6 {
        out.push_str(&format!("{}y ", log_to_exp(years.log10(), 2)));
    } else if years >= 1.0 {
        out.push_str(&format!("{years:.0}y "));
    }
    if years >= 1.0 || days >= 1.0 {
        out.push_str(&format!("{days:.0}d "));
    }
    out.push_str(&format!("{hrs:02.0}:{mins:02.0}"));
    out
}

/// Format a linear value to `precision` significant digits, falling back to
/// e-notation outside a readable magnitude window.
pub fn format_number(value: f64, precision: usize) -> String {
    let sig = precision.max(1);
    if value == 0.0 || !value.is_finite() {
        return format!("{:.*}", sig - 1, value);
    }
    let exp = value.abs().log10().floor() as i32;
    if exp < -3 || exp >= sig as i32 {
        format!("{:.*e}", sig - 1, value)
    } else {
        let decimals = (sig as i32 - 1 - exp).max(0) as usize;
        format!("{:.*}", decimals, value)
    }
}

/// Parse `"<mantissa>e<exponent>"` into a log10 value. The mantissa is
/// clamped to at least 1 so `"0e300"` does not produce `-inf`.
pub fn parse_log10_string(s: &str) -> Result<f64> {
    let (mant, exp) = s
        .split_once('e')
        .ok_or_else(|| anyhow!("expected <mantissa>e<exponent>, got {s:?}"))?;
    let m: f64 = mant
        .parse()
        .map_err(|_| anyhow!("invalid mantissa in {s:?}"))?;
    let e: f64 = exp
        .parse()
        .map_err(|_| anyhow!("invalid exponent in {s:?}"))?;
    Ok(e + m.max(1.0).log10())
}

/// Parse a user-supplied magnitude into a log10 value. Accepted forms:
/// `"e500"` and `"500"` (already a log10 exponent) and `"1.5e300"`
/// (mantissa-exponent).
pub fn parse_value(s: &str) -> Result<f64> {
    let s = s.trim();
    if s.is_empty() {
        bail!("empty value; expected forms like \"e500\", \"500\" or \"1.5e300\"");
    }
    let parsed = if let Some(rest) = s.strip_prefix('e') {
        rest.parse::<f64>()
            .map_err(|_| anyhow!("invalid exponent in {s:?}"))?
    } else if s.contains('e') {
        parse_log10_string(s)?
    } else {
        s.parse::<f64>()
            .map_err(|_| anyhow!("invalid value {s:?}; expected forms like \"e500\", \"500\" or \"1.5e300\""))?
    };
    if !parsed.is_finite() {
        bail!("value {s:?} is out of range");
    }
    Ok(parsed)
}
