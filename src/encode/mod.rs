pub(crate) mod writer;

use std::io::{BufWriter, Write};

use crate::arena::Data;
use crate::decode::parser::Container;
use crate::num::number::{format_decimal, format_int};
use crate::types::walk::{Event, Walk};
use crate::{Result, ValueRef, WriteOptions};

use self::writer::{IoOutput, Output, SliceOutput, Writer};

/// Renders a value as JSON text. `indent` of zero gives compact output.
///
/// ```
/// use pooljson::{encode, parse_str};
///
/// let doc = parse_str(r#"{"x":true,"y":false}"#).unwrap();
/// assert_eq!(encode::to_string(doc.root(), 0), r#"{"x":true,"y":false}"#);
/// ```
pub fn to_string(value: ValueRef<'_>, indent: usize) -> String {
    to_string_with_options(value, &WriteOptions::new().with_indent(indent))
}

pub fn to_string_with_options(value: ValueRef<'_>, options: &WriteOptions) -> String {
    let mut writer = Writer::new(String::new(), options);
    // Writing into a String can not fail.
    if write_value(&mut writer, value).is_err() {
        return String::new();
    }
    writer.finish().unwrap_or_default()
}

/// Streams the text of `value` into `out`, a file or a socket for example.
pub fn to_writer<W: Write>(value: ValueRef<'_>, options: &WriteOptions, out: W) -> Result<()> {
    let mut writer = Writer::new(IoOutput(BufWriter::new(out)), options);
    write_value(&mut writer, value)?;
    let IoOutput(mut out) = writer.finish()?;
    out.flush()?;
    Ok(())
}

/// Writes into a fixed buffer and returns the number of bytes used.
/// Fails with an overflow error when the text does not fit.
pub fn fill(value: ValueRef<'_>, options: &WriteOptions, buf: &mut [u8]) -> Result<usize> {
    let mut writer = Writer::new(SliceOutput::new(buf), options);
    write_value(&mut writer, value)?;
    Ok(writer.finish()?.len())
}

pub(crate) fn write_value<O: Output>(writer: &mut Writer<O>, value: ValueRef<'_>) -> Result<()> {
    for event in Walk::new(value) {
        let (value, key) = match event {
            Event::Value(value, key) => (value, key),
            Event::Close { .. } => {
                writer.close()?;
                continue;
            }
        };
        let node = value.node();
        match &node.data {
            Data::Null => writer.raw(key, "null")?,
            Data::True => writer.raw(key, "true")?,
            Data::False => writer.raw(key, "false")?,
            Data::Int(number) => writer.raw(key, node.memo.get_or_init(|| format_int(*number)))?,
            Data::Decimal(number) => {
                writer.raw(key, node.memo.get_or_init(|| format_decimal(*number)))?
            }
            Data::BigNumber(text) => writer.raw(key, value.pool().text(text))?,
            Data::String(text) | Data::Word(text) => writer.string(key, value.pool().text(text))?,
            Data::Opaque(handle) => {
                if writer.options().write_opaque {
                    writer.raw(key, itoa::Buffer::new().format(*handle))?
                } else {
                    writer.raw(key, "null")?
                }
            }
            Data::Array(_) => writer.open(key, Container::Array)?,
            Data::Object(_) => writer.open(key, Container::Object)?,
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{parse_str, ValuePool};

    #[rstest::rstest]
    #[case("{}", 0, "{}")]
    #[case("{}", 2, "{\n}")]
    #[case("[]", 4, "[\n]")]
    #[case("[1, 2.50, -0.0e0, 123456789012345678901234567890]", 0, "[1,2.50,-0.0e0,123456789012345678901234567890]")]
    #[case("{\"a\" : [true , null]}", 1, "{\n \"a\":[\n  true,\n  null\n ]\n}")]
    #[case("\"tab\\there\\u0001\"", 0, "\"tab\\there\\u0001\"")]
    fn test_to_string(#[case] input: &str, #[case] indent: usize, #[case] expected: &str) {
        let doc = parse_str(input).unwrap();
        assert_eq!(to_string(doc.root(), indent), expected);
    }

    #[rstest::rstest]
    fn test_pretty_output_is_stable() {
        let doc = parse_str(r#"{"a":{"b":[1,{"c":[]}]},"d":"e"}"#).unwrap();
        let once = to_string(doc.root(), 2);
        let again = parse_str(&once).unwrap();
        assert_eq!(to_string(again.root(), 2), once);
    }

    #[rstest::rstest]
    fn test_created_values() {
        let mut pool = ValuePool::new();
        let array = pool.create_array();
        let decimal = pool.create_f64(0.1).unwrap();
        let word = pool.create_word("w");
        let opaque = pool.create_opaque(42);
        for id in [decimal, word, opaque] {
            pool.array_append(array, id).unwrap();
        }
        let root = pool.get(array).unwrap();
        assert_eq!(to_string(root, 0), r#"[0.1,"w",null]"#);
        let options = WriteOptions::new().with_write_opaque(true).with_trailing_newline(true);
        assert_eq!(to_string_with_options(root, &options), "[0.1,\"w\",42]\n");
    }

    #[rstest::rstest]
    fn test_deep_tree_is_written_without_recursion() {
        let mut pool = ValuePool::new();
        let root = pool.create_array();
        let mut parent = root;
        for _ in 0..30_000 {
            let child = pool.create_array();
            pool.array_append(parent, child).unwrap();
            parent = child;
        }
        let text = to_string(pool.get(root).unwrap(), 0);
        assert_eq!(text.len(), 2 * 30_001);
        assert!(text.starts_with("[[[") && text.ends_with("]]]"));
    }

    #[rstest::rstest]
    fn test_fill_and_to_writer() {
        let doc = parse_str(r#"{"k":"v"}"#).unwrap();
        let mut buf = [0u8; 16];
        let used = fill(doc.root(), &WriteOptions::new(), &mut buf).unwrap();
        assert_eq!(&buf[..used], br#"{"k":"v"}"#);

        let mut small = [0u8; 8];
        assert!(fill(doc.root(), &WriteOptions::new(), &mut small).is_err());

        let mut out = Vec::new();
        to_writer(doc.root(), &WriteOptions::new().with_indent(1), &mut out).unwrap();
        assert_eq!(out, b"{\n \"k\":\"v\"\n}");
    }

    #[rstest::rstest]
    fn test_failing_sink_is_a_write_error() {
        struct Broken;
        impl Write for Broken {
            fn write(&mut self, _: &[u8]) -> std::io::Result<usize> {
                Err(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "closed"))
            }
            fn flush(&mut self) -> std::io::Result<()> {
                Ok(())
            }
        }
        let doc = parse_str("[1]").unwrap();
        let err = to_writer(doc.root(), &WriteOptions::new(), Broken).unwrap_err();
        assert_eq!(err.kind, crate::ErrorKind::Write);
    }
}
