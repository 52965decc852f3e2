use crate::arena::Data;
use crate::num::number::format_wire_decimal;
use crate::types::walk::{Event, Walk};
use crate::wire::special::{parse_time, parse_uuid};
use crate::wire::tags::{self, int_tag, int_width, len_width, Family, PREFIX};
use crate::{Error, Result, ValueRef};

/// Destination of encoded bytes.
pub(crate) trait WireOut {
    fn put(&mut self, bytes: &[u8]) -> Result<()>;
}

impl WireOut for Vec<u8> {
    fn put(&mut self, bytes: &[u8]) -> Result<()> {
        self.extend_from_slice(bytes);
        Ok(())
    }
}

/// A caller-provided buffer that can not grow.
pub(crate) struct SliceOut<'b> {
    buf: &'b mut [u8],
    len: usize,
}

impl<'b> SliceOut<'b> {
    pub(crate) fn new(buf: &'b mut [u8]) -> Self {
        Self { buf, len: 0 }
    }

    pub(crate) fn len(&self) -> usize {
        self.len
    }
}

impl WireOut for SliceOut<'_> {
    fn put(&mut self, bytes: &[u8]) -> Result<()> {
        let end = self.len + bytes.len();
        let Some(target) = self.buf.get_mut(self.len..end) else {
            return Err(Error::overflow("buffer not large enough for wire output"));
        };
        target.copy_from_slice(bytes);
        self.len = end;
        Ok(())
    }
}

pub(crate) fn frame_len(payload: usize) -> Result<[u8; PREFIX]> {
    u32::try_from(payload)
        .map(u32::to_be_bytes)
        .map_err(|_| Error::overflow("value too large for a wire frame"))
}

/// Encoded size of `value` without the frame prefix.
pub(crate) fn value_size(value: ValueRef<'_>) -> usize {
    let pool = value.pool();
    Walk::new(value)
        .map(|event| match event {
            Event::Close { .. } => 1,
            Event::Value(value, key) => {
                let body = match value.data() {
                    Data::Null | Data::True | Data::False | Data::Opaque(_) => 1,
                    Data::Array(_) | Data::Object(_) => 1,
                    Data::Int(number) => 1 + int_width(*number),
                    Data::Decimal(number) => 2 + format_wire_decimal(*number).len(),
                    Data::BigNumber(text) => text_size(pool.text(text)),
                    Data::String(text) | Data::Word(text) => str_size(pool.text(text)),
                };
                key.map_or(0, text_size) + body
            }
        })
        .sum()
}

pub(crate) fn text_size(text: &str) -> usize {
    1 + len_width(text.len()) + text.len()
}

pub(crate) fn str_size(text: &str) -> usize {
    if parse_uuid(text).is_some() {
        17
    } else if parse_time(text).is_some() {
        9
    } else {
        text_size(text)
    }
}

pub(crate) fn put_int<O: WireOut>(out: &mut O, value: i64) -> Result<()> {
    let width = int_width(value);
    out.put(&[int_tag(width)])?;
    out.put(&value.to_be_bytes()[8 - width..])
}

pub(crate) fn put_decimal<O: WireOut>(out: &mut O, value: f64) -> Result<()> {
    let text = format_wire_decimal(value);
    let len = u8::try_from(text.len()).map_err(|_| Error::overflow("decimal text too long"))?;
    out.put(&[tags::DECIMAL, len])?;
    out.put(text.as_bytes())
}

/// Tag, length and bytes of a length-prefixed value.
pub(crate) fn put_text<O: WireOut>(out: &mut O, family: Family, text: &str) -> Result<()> {
    let len = text.len();
    out.put(&[family.tag(len)])?;
    match len_width(len) {
        1 => out.put(&[len as u8])?,
        2 => out.put(&(len as u16).to_be_bytes())?,
        _ => {
            let len = u32::try_from(len)
                .map_err(|_| Error::overflow("string too long for a wire frame"))?;
            out.put(&len.to_be_bytes())?
        }
    }
    out.put(text.as_bytes())
}

pub(crate) fn put_uuid<O: WireOut>(out: &mut O, high: u64, low: u64) -> Result<()> {
    out.put(&[tags::UUID])?;
    out.put(&high.to_be_bytes())?;
    out.put(&low.to_be_bytes())
}

pub(crate) fn put_time<O: WireOut>(out: &mut O, nanos: i64) -> Result<()> {
    out.put(&[tags::TIME])?;
    out.put(&nanos.to_be_bytes())
}

/// Strings that look like a UUID or a timestamp go out in their packed form.
pub(crate) fn put_str<O: WireOut>(out: &mut O, text: &str) -> Result<()> {
    if let Some((high, low)) = parse_uuid(text) {
        return put_uuid(out, high, low);
    }
    if let Some(nanos) = parse_time(text) {
        return put_time(out, nanos);
    }
    put_text(out, Family::String, text)
}

pub(crate) fn put_value<O: WireOut>(out: &mut O, value: ValueRef<'_>) -> Result<()> {
    let pool = value.pool();
    for event in Walk::new(value) {
        let (value, key) = match event {
            Event::Value(value, key) => (value, key),
            Event::Close { object: true } => {
                out.put(&[tags::OBJECT_END])?;
                continue;
            }
            Event::Close { object: false } => {
                out.put(&[tags::ARRAY_END])?;
                continue;
            }
        };
        if let Some(key) = key {
            put_text(out, Family::Key, key)?;
        }
        match value.data() {
            Data::Null | Data::Opaque(_) => out.put(&[tags::NULL])?,
            Data::True => out.put(&[tags::TRUE])?,
            Data::False => out.put(&[tags::FALSE])?,
            Data::Int(number) => put_int(out, *number)?,
            Data::Decimal(number) => put_decimal(out, *number)?,
            Data::BigNumber(text) => put_text(out, Family::Number, pool.text(text))?,
            Data::String(text) | Data::Word(text) => put_str(out, pool.text(text))?,
            Data::Array(_) => out.put(&[tags::ARRAY_START])?,
            Data::Object(_) => out.put(&[tags::OBJECT_START])?,
        }
    }
    Ok(())
}

/// Prefix plus value.
pub(crate) fn put_frame<O: WireOut>(out: &mut O, value: ValueRef<'_>) -> Result<()> {
    out.put(&frame_len(value_size(value))?)?;
    put_value(out, value)
}
