const HEX: &[u8; 16] = b"0123456789abcdef";

/// Appends `value` as a quoted JSON string.
pub fn write_quoted(out: &mut String, value: &str) {
    out.push('"');
    escape_string_into(out, value);
    out.push('"');
}

/// Escapes `"`, `\` and control characters. Everything else, `/` and
/// non-ASCII included, is copied through.
fn escape_string_into(out: &mut String, value: &str) {
    let bytes = value.as_bytes();
    let mut start = 0;
    for (idx, &byte) in bytes.iter().enumerate() {
        let escaped = match byte {
            b'"' => "\\\"",
            b'\\' => "\\\\",
            b'\n' => "\\n",
            b'\r' => "\\r",
            b'\t' => "\\t",
            0x08 => "\\b",
            0x0c => "\\f",
            0x00..=0x1f => "",
            _ => continue,
        };
        if start < idx {
            out.push_str(&value[start..idx]);
        }
        if escaped.is_empty() {
            out.push_str("\\u00");
            out.push(HEX[(byte >> 4) as usize] as char);
            out.push(HEX[(byte & 0x0f) as usize] as char);
        } else {
            out.push_str(escaped);
        }
        start = idx + 1;
    }
    if start < value.len() {
        out.push_str(&value[start..]);
    }
}

/// Value of an ASCII hex digit.
#[inline]
pub fn hex_value(byte: u8) -> Option<u32> {
    match byte {
        b'0'..=b'9' => Some((byte - b'0') as u32),
        b'a'..=b'f' => Some((byte - b'a' + 10) as u32),
        b'A'..=b'F' => Some((byte - b'A' + 10) as u32),
        _ => None,
    }
}
