//! Compact binary frames for value trees.
//!
//! A frame is a four byte big-endian payload length followed by one
//! tagged value. Integers take the smallest width that holds them,
//! strings and keys carry a one, two or four byte length, and strings in
//! UUID or nanosecond timestamp form are packed into fixed-size bodies.
//!
//! ```
//! use pooljson::{parse_str, wire};
//!
//! let doc = parse_str(r#"{"abc":1,"def":[1,2]}"#).unwrap();
//! let frame = wire::to_vec(doc.root()).unwrap();
//! assert_eq!(frame.len(), wire::size(doc.root()));
//! assert_eq!(wire::to_json(&frame, 0).unwrap(), r#"{"abc":1,"def":[1,2]}"#);
//! ```

mod builder;
mod decode;
mod encode;
pub mod special;
mod tags;

use std::io::{Read, Write};

use log::{debug, warn};
use smallvec::SmallVec;

use crate::arena::{ValueId, ValuePool};
use crate::decode::parser::Container;
use crate::decode::pool::{put_pool, take_pool};
use crate::decode::Outcome;
use crate::document::Document;
use crate::encode::writer::Writer;
use crate::num::number::{format_decimal, format_int};
use crate::{Error, ErrorKind, Result, ValueRef, WriteOptions};

pub use self::builder::WireBuilder;
pub use self::decode::{WireItem, WireVisitor};
use self::decode::{payload, walk, Handler, VisitorHandler};
use self::encode::{put_frame, value_size, SliceOut};
use self::tags::PREFIX;

/// Bytes `value` takes as a frame, prefix included.
pub fn size(value: ValueRef<'_>) -> usize {
    PREFIX + value_size(value)
}

pub fn to_vec(value: ValueRef<'_>) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(size(value));
    put_frame(&mut out, value)?;
    Ok(out)
}

/// Encodes into a fixed buffer and returns the number of bytes used.
pub fn fill(value: ValueRef<'_>, buf: &mut [u8]) -> Result<usize> {
    let needed = size(value);
    if needed > buf.len() {
        return Err(Error::overflow("buffer not large enough for wire output"));
    }
    let mut out = SliceOut::new(buf);
    put_frame(&mut out, value)?;
    Ok(out.len())
}

/// Writes one frame to `out`, a file or a socket for example.
pub fn write_to<W: Write>(value: ValueRef<'_>, mut out: W) -> Result<()> {
    let frame = to_vec(value)?;
    out.write_all(&frame)?;
    out.flush()?;
    Ok(())
}

/// Decodes the frame at the start of `input` into a pool taken from the
/// process-wide reservoir.
pub fn parse(input: &[u8]) -> Result<Document> {
    let mut pool = take_pool();
    match parse_into(input, &mut pool) {
        Ok(root) => Ok(Document::new(pool, root)),
        Err(err) => {
            put_pool(pool);
            Err(err)
        }
    }
}

/// Decodes the frame at the start of `input` into `pool` and returns the
/// detached root. Nothing is left in the pool when decoding fails.
pub fn parse_into(input: &[u8], pool: &mut ValuePool) -> Result<ValueId> {
    let payload = payload(input)?;
    let mut handler = TreeHandler {
        pool,
        stack: SmallVec::new(),
        root: None,
    };
    let result = walk(payload, &mut handler);
    match (result, handler.root) {
        (Ok(()), Some(root)) => Ok(root),
        (Ok(()), None) => Err(Error::incomplete("no value in wire frame")),
        (Err(err), root) => {
            if let Some(root) = root {
                handler.pool.free_tree(root);
            }
            Err(err)
        }
    }
}

/// Reads exactly one frame from `input` and decodes it.
pub fn read_from<R: Read>(mut input: R) -> Result<Document> {
    let mut prefix = [0; PREFIX];
    input.read_exact(&mut prefix).map_err(read_error)?;
    let len = u32::from_be_bytes(prefix) as usize;
    // The prefix is untrusted: the buffer grows with the bytes that arrive.
    let mut frame = prefix.to_vec();
    let read = input
        .take(len as u64)
        .read_to_end(&mut frame)
        .map_err(read_error)?;
    if read < len {
        return Err(Error::incomplete("wire frame truncated"));
    }
    debug!("read wire frame of {} bytes", frame.len());
    parse(&frame)
}

fn read_error(err: std::io::Error) -> Error {
    if err.kind() == std::io::ErrorKind::UnexpectedEof {
        Error::incomplete("wire frame truncated")
    } else {
        Error::read(format!("read failed: {err}"))
    }
}

/// Reports every value of the frame to `visitor` without building a tree.
pub fn visit<V: WireVisitor>(input: &[u8], visitor: &mut V) -> Result<Outcome> {
    let payload = payload(input)?;
    match walk(payload, &mut VisitorHandler(visitor)) {
        Ok(()) => Ok(Outcome::Complete),
        Err(err) if err.kind == ErrorKind::Abort => Ok(Outcome::Stopped),
        Err(err) => Err(err),
    }
}

/// Renders a frame as JSON text without building a tree.
pub fn to_json(input: &[u8], indent: usize) -> Result<String> {
    let payload = payload(input)?;
    let mut handler = JsonHandler {
        writer: Writer::new(String::new(), &WriteOptions::new().with_indent(indent)),
    };
    walk(payload, &mut handler)?;
    handler.writer.finish()
}

struct TreeHandler<'p> {
    pool: &'p mut ValuePool,
    stack: SmallVec<[ValueId; 32]>,
    root: Option<ValueId>,
}

impl Handler for TreeHandler<'_> {
    fn item(&mut self, key: Option<&str>, item: WireItem<'_>) -> Result<()> {
        let pool = &mut *self.pool;
        let id = match item {
            WireItem::Null => pool.create_null(),
            WireItem::Bool(value) => pool.create_bool(value),
            WireItem::Int(value) => pool.create_int(value),
            WireItem::Decimal(value) => pool
                .create_f64(value)
                .map_err(|err| Error::parse(err.message))?,
            WireItem::Number(text) => pool
                .create_number(text)
                .map_err(|err| Error::parse(err.message))?,
            WireItem::String(text) => pool.create_str(text),
            WireItem::Uuid(..) | WireItem::Time(_) => {
                pool.create_str(&item.canonical().unwrap_or_default())
            }
            WireItem::Array => pool.create_array(),
            WireItem::Object => pool.create_object(),
        };
        let attached = match (self.stack.last().copied(), key) {
            (None, _) => {
                self.root = Some(id);
                Ok(())
            }
            (Some(parent), Some(key)) => pool.object_append(parent, key, id),
            (Some(parent), None) => pool.array_append(parent, id),
        };
        if let Err(err) = attached {
            // `id` is new and unlinked; a failed release leaves the attach
            // error as the one to report.
            if let Err(release) = pool.release(id) {
                warn!("wire decode could not release a rejected value: {release}");
            }
            return Err(err);
        }
        if matches!(item, WireItem::Array | WireItem::Object) {
            self.stack.push(id);
        }
        Ok(())
    }

    fn end(&mut self) -> Result<()> {
        self.stack.pop();
        Ok(())
    }
}

struct JsonHandler {
    writer: Writer<String>,
}

impl Handler for JsonHandler {
    fn item(&mut self, key: Option<&str>, item: WireItem<'_>) -> Result<()> {
        let writer = &mut self.writer;
        match item {
            WireItem::Null => writer.raw(key, "null"),
            WireItem::Bool(true) => writer.raw(key, "true"),
            WireItem::Bool(false) => writer.raw(key, "false"),
            WireItem::Int(value) => writer.raw(key, &format_int(value)),
            WireItem::Decimal(value) => writer.raw(key, &format_decimal(value)),
            WireItem::Number(text) => writer.raw(key, text),
            WireItem::String(text) => writer.string(key, text),
            WireItem::Uuid(..) | WireItem::Time(_) => {
                writer.string(key, &item.canonical().unwrap_or_default())
            }
            WireItem::Array => writer.open(key, Container::Array),
            WireItem::Object => writer.open(key, Container::Object),
        }
    }

    fn end(&mut self) -> Result<()> {
        self.writer.close()
    }
}
