use smol_str::SmolStr;

pub fn format_int(value: i64) -> SmolStr {
    let mut buffer = itoa::Buffer::new();
    SmolStr::new(buffer.format(value))
}

/// Shortest text that reads back as the same `f64`.
pub fn format_decimal(value: f64) -> SmolStr {
    if !value.is_finite() {
        return SmolStr::new_static("null");
    }
    let mut buffer = ryu::Buffer::new();
    SmolStr::new(buffer.format_finite(value))
}

/// Decimal text used in wire frames: one fractional digit for integral
/// values below 1e15, otherwise 15 significant digits in the style of C's
/// `%.15g`.
pub fn format_wire_decimal(value: f64) -> String {
    if !value.is_finite() {
        return "null".to_string();
    }
    if value.fract() == 0.0 && value.abs() < 1e15 {
        return format!("{value:.1}");
    }
    format_general(value, 15)
}

fn format_general(value: f64, precision: usize) -> String {
    if value == 0.0 {
        return if value.is_sign_negative() { "-0" } else { "0" }.to_string();
    }
    let scientific = format!("{:.*e}", precision - 1, value);
    let Some((mantissa, exponent)) = scientific.split_once('e') else {
        return scientific;
    };
    let exponent: i32 = exponent.parse().unwrap_or(0);
    if exponent < -4 || exponent >= precision as i32 {
        let mantissa = trim_fraction(mantissa);
        let sign = if exponent < 0 { '-' } else { '+' };
        return format!("{mantissa}e{sign}{:02}", exponent.unsigned_abs());
    }
    let decimals = (precision as i32 - 1 - exponent).max(0) as usize;
    trim_fraction(&format!("{value:.decimals$}")).to_string()
}

fn trim_fraction(text: &str) -> &str {
    if !text.contains('.') {
        return text;
    }
    text.trim_end_matches('0').trim_end_matches('.')
}
