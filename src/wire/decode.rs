use smallvec::SmallVec;

use crate::constants::DEFAULT_MAX_DEPTH;
use crate::decode::sax::CallbackOp;
use crate::wire::special::{format_time, format_uuid};
use crate::wire::tags::{self, int_tag_width, Family, PREFIX};
use crate::{Error, Result};

/// One value read from a wire frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum WireItem<'a> {
    Null,
    Bool(bool),
    Int(i64),
    Decimal(f64),
    /// A numeral kept as text.
    Number(&'a str),
    String(&'a str),
    /// The two halves of a UUID; [`WireItem::canonical`] gives the text.
    Uuid(u64, u64),
    /// Nanoseconds since the Unix epoch, UTC.
    Time(i64),
    /// Start of an array; [`WireVisitor::end`] follows its elements.
    Array,
    /// Start of an object; [`WireVisitor::end`] follows its members.
    Object,
}

impl WireItem<'_> {
    /// Text form of a packed UUID or timestamp, as it was before encoding.
    pub fn canonical(&self) -> Option<String> {
        match *self {
            WireItem::Uuid(high, low) => Some(format_uuid(high, low)),
            WireItem::Time(nanos) => Some(format_time(nanos)),
            _ => None,
        }
    }
}

/// Receiver for [`crate::wire::visit`]. `key` is the member name when the
/// value sits in an object. Returning [`CallbackOp::STOP`] ends the walk.
pub trait WireVisitor {
    fn item(&mut self, key: Option<&str>, item: WireItem<'_>) -> CallbackOp;

    fn end(&mut self) -> CallbackOp;
}

impl<V: WireVisitor + ?Sized> WireVisitor for &mut V {
    fn item(&mut self, key: Option<&str>, item: WireItem<'_>) -> CallbackOp {
        (**self).item(key, item)
    }

    fn end(&mut self) -> CallbackOp {
        (**self).end()
    }
}

/// Crate-side receiver; an `Err` ends the walk.
pub(crate) trait Handler {
    fn item(&mut self, key: Option<&str>, item: WireItem<'_>) -> Result<()>;

    fn end(&mut self) -> Result<()>;
}

pub(crate) struct VisitorHandler<'v, V>(pub(crate) &'v mut V);

impl<V: WireVisitor> Handler for VisitorHandler<'_, V> {
    fn item(&mut self, key: Option<&str>, item: WireItem<'_>) -> Result<()> {
        proceed(self.0.item(key, item))
    }

    fn end(&mut self) -> Result<()> {
        proceed(self.0.end())
    }
}

fn proceed(op: CallbackOp) -> Result<()> {
    if op.contains(CallbackOp::STOP) {
        Err(Error::abort())
    } else {
        Ok(())
    }
}

/// Payload of the frame at the start of `input`. Bytes after the frame
/// are not looked at.
pub(crate) fn payload(input: &[u8]) -> Result<&[u8]> {
    let Some((prefix, rest)) = input.split_first_chunk::<PREFIX>() else {
        return Err(Error::incomplete("wire frame truncated"));
    };
    let len = u32::from_be_bytes(*prefix) as usize;
    rest.get(..len)
        .ok_or_else(|| Error::incomplete("wire frame truncated"))
}

struct Cursor<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        let bytes = self
            .buf
            .get(self.pos..self.pos + n)
            .ok_or_else(|| Error::incomplete("wire value truncated"))?;
        self.pos += n;
        Ok(bytes)
    }

    fn byte(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    /// Big-endian unsigned value of `width` bytes.
    fn unsigned(&mut self, width: usize) -> Result<u64> {
        Ok(self
            .take(width)?
            .iter()
            .fold(0u64, |acc, &b| (acc << 8) | u64::from(b)))
    }

    /// Big-endian two's complement value of `width` bytes.
    fn signed(&mut self, width: usize) -> Result<i64> {
        let raw = self.unsigned(width)?;
        let shift = 64 - 8 * width as u32;
        Ok(((raw << shift) as i64) >> shift)
    }

    fn text(&mut self, width: usize) -> Result<&'a str> {
        let len = self.unsigned(width)? as usize;
        std::str::from_utf8(self.take(len)?)
            .map_err(|_| Error::unicode("invalid UTF-8 in wire text"))
    }
}

/// Walks one value from `payload`, which must hold nothing else.
pub(crate) fn walk<H: Handler>(payload: &[u8], handler: &mut H) -> Result<()> {
    let mut cursor = Cursor { buf: payload, pos: 0 };
    // true for an object.
    let mut stack: SmallVec<[bool; 32]> = SmallVec::new();
    loop {
        let mut tag = cursor.byte()?;
        let mut key = None;
        if stack.last() == Some(&true) {
            if tag == tags::OBJECT_END {
                stack.pop();
                handler.end()?;
                if stack.is_empty() {
                    break;
                }
                continue;
            }
            match Family::of(tag) {
                Some((Family::Key, width)) => key = Some(cursor.text(width)?),
                _ => return Err(Error::parse("expected a key in wire object")),
            }
            tag = cursor.byte()?;
        }
        let item = match tag {
            tags::NULL => WireItem::Null,
            tags::TRUE => WireItem::Bool(true),
            tags::FALSE => WireItem::Bool(false),
            tags::DECIMAL => {
                let len = usize::from(cursor.byte()?);
                let text = std::str::from_utf8(cursor.take(len)?)
                    .map_err(|_| Error::unicode("invalid UTF-8 in wire decimal"))?;
                let value = text
                    .parse::<f64>()
                    .map_err(|_| Error::parse(format!("invalid wire decimal '{text}'")))?;
                WireItem::Decimal(value)
            }
            tags::UUID => WireItem::Uuid(cursor.unsigned(8)?, cursor.unsigned(8)?),
            tags::TIME => WireItem::Time(cursor.signed(8)?),
            tags::ARRAY_START => WireItem::Array,
            tags::OBJECT_START => WireItem::Object,
            tags::ARRAY_END if stack.last() == Some(&false) => {
                stack.pop();
                handler.end()?;
                if stack.is_empty() {
                    break;
                }
                continue;
            }
            _ => {
                if let Some(width) = int_tag_width(tag) {
                    WireItem::Int(cursor.signed(width)?)
                } else {
                    match Family::of(tag) {
                        Some((Family::String, width)) => WireItem::String(cursor.text(width)?),
                        Some((Family::Number, width)) => WireItem::Number(cursor.text(width)?),
                        _ => {
                            return Err(Error::parse(format!("invalid wire tag 0x{tag:02x}")))
                        }
                    }
                }
            }
        };
        handler.item(key, item)?;
        match item {
            WireItem::Array | WireItem::Object => {
                if stack.len() >= DEFAULT_MAX_DEPTH {
                    return Err(Error::overflow(format!(
                        "wire nesting exceeds the limit of {DEFAULT_MAX_DEPTH} levels"
                    )));
                }
                stack.push(matches!(item, WireItem::Object));
            }
            _ if stack.is_empty() => break,
            _ => {}
        }
    }
    if cursor.pos != payload.len() {
        return Err(Error::parse("extra bytes after the wire value"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Trace(Vec<String>);

    impl Handler for Trace {
        fn item(&mut self, key: Option<&str>, item: WireItem<'_>) -> Result<()> {
            let prefix = key.map(|k| format!("{k}=")).unwrap_or_default();
            self.0.push(format!("{prefix}{item:?}"));
            Ok(())
        }

        fn end(&mut self) -> Result<()> {
            self.0.push("end".to_string());
            Ok(())
        }
    }

    fn trace(payload: &[u8]) -> Result<Vec<String>> {
        let mut trace = Trace::default();
        walk(payload, &mut trace)?;
        Ok(trace.0)
    }

    #[rstest::rstest]
    fn test_walk_object() {
        let payload = b"{k\x01ai\x05k\x01b[2\xff\x00Z]}";
        assert_eq!(
            trace(payload).unwrap(),
            ["Object", "a=Int(5)", "b=Array", "Int(-256)", "Null", "end", "end"]
        );
    }

    #[rstest::rstest]
    fn test_walk_signed_widths() {
        assert_eq!(trace(b"4\xff\xff\x63\xc0").unwrap(), ["Int(-40000)"]);
        assert_eq!(trace(b"i\x7f").unwrap(), ["Int(127)"]);
    }

    #[rstest::rstest]
    #[case(b"x".as_slice(), crate::ErrorKind::Parse, "invalid wire tag 0x78")]
    #[case(b"{i\x01}".as_slice(), crate::ErrorKind::Parse, "expected a key in wire object")]
    #[case(b"[i\x01".as_slice(), crate::ErrorKind::Incomplete, "wire value truncated")]
    #[case(b"s\x05ab".as_slice(), crate::ErrorKind::Incomplete, "wire value truncated")]
    #[case(b"ZZ".as_slice(), crate::ErrorKind::Parse, "extra bytes after the wire value")]
    #[case(b"s\x01\xff".as_slice(), crate::ErrorKind::Unicode, "invalid UTF-8 in wire text")]
    fn test_walk_errors(
        #[case] payload: &[u8],
        #[case] kind: crate::ErrorKind,
        #[case] message: &str,
    ) {
        let err = trace(payload).unwrap_err();
        assert_eq!(err.kind, kind);
        assert_eq!(err.message, message);
    }

    #[rstest::rstest]
    fn test_payload_bounds() {
        assert_eq!(payload(b"\x00\x00\x00\x01Zjunk").unwrap(), b"Z");
        assert_eq!(payload(b"\x00\x00").unwrap_err().kind, crate::ErrorKind::Incomplete);
        assert_eq!(payload(b"\x00\x00\x00\x09Z").unwrap_err().message, "wire frame truncated");
    }
}
