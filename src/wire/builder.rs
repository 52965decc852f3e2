use smallvec::SmallVec;

use crate::constants::WIRE_STACK_SIZE;
use crate::wire::encode::{
    frame_len, put_decimal, put_int, put_str, put_text, put_time, put_uuid, WireOut,
};
use crate::wire::special::parse_uuid;
use crate::wire::tags::{self, Family, PREFIX};
use crate::{Error, Result};

/// Growable buffer, or a fixed one when a limit is set.
struct Bounded {
    buf: Vec<u8>,
    limit: Option<usize>,
}

impl WireOut for Bounded {
    fn put(&mut self, bytes: &[u8]) -> Result<()> {
        if let Some(limit) = self.limit {
            if self.buf.len() + bytes.len() > limit {
                return Err(Error::overflow("wire buffer is full"));
            }
        }
        self.buf.extend_from_slice(bytes);
        Ok(())
    }
}

/// Writes a wire frame value by value, without building a tree first.
///
/// Key rules match [`crate::Builder`]: object members need a key, array
/// elements must not have one. A failed push leaves the frame as it was.
///
/// ```
/// use pooljson::wire::{self, WireBuilder};
///
/// let mut b = WireBuilder::new();
/// b.push_object(None)?;
/// b.push_int(Some("abc"), 1)?;
/// b.push_int(Some("def"), 2)?;
/// let frame = b.finish()?;
/// assert_eq!(frame.len(), 20);
/// assert_eq!(wire::to_json(&frame, 0)?, r#"{"abc":1,"def":2}"#);
/// # Ok::<(), pooljson::Error>(())
/// ```
pub struct WireBuilder {
    out: Bounded,
    // true for an object.
    stack: SmallVec<[bool; 32]>,
    done: bool,
}

impl Default for WireBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl WireBuilder {
    pub fn new() -> Self {
        Self::start(Vec::new(), None)
    }

    /// A builder whose whole frame, prefix included, may not exceed
    /// `limit` bytes. Pushing past it is an overflow error.
    pub fn with_limit(limit: usize) -> Self {
        Self::start(Vec::with_capacity(limit), Some(limit))
    }

    fn start(mut buf: Vec<u8>, limit: Option<usize>) -> Self {
        buf.extend_from_slice(&[0; PREFIX]);
        Self {
            out: Bounded { buf, limit },
            stack: SmallVec::new(),
            done: false,
        }
    }

    /// Bytes written so far, prefix included.
    pub fn len(&self) -> usize {
        self.out.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.out.buf.len() == PREFIX
    }

    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    pub fn push_object(&mut self, key: Option<&str>) -> Result<()> {
        self.push_open(key, true)
    }

    pub fn push_array(&mut self, key: Option<&str>) -> Result<()> {
        self.push_open(key, false)
    }

    pub fn push_null(&mut self, key: Option<&str>) -> Result<()> {
        self.push(key, |out| out.put(&[tags::NULL]))
    }

    pub fn push_bool(&mut self, key: Option<&str>, value: bool) -> Result<()> {
        let tag = if value { tags::TRUE } else { tags::FALSE };
        self.push(key, |out| out.put(&[tag]))
    }

    pub fn push_int(&mut self, key: Option<&str>, value: i64) -> Result<()> {
        self.push(key, |out| put_int(out, value))
    }

    pub fn push_double(&mut self, key: Option<&str>, value: f64) -> Result<()> {
        if !value.is_finite() {
            return Err(Error::argument("only finite numbers can be written"));
        }
        self.push(key, |out| put_decimal(out, value))
    }

    /// Pushes a string; UUID and timestamp text is packed.
    pub fn push_str(&mut self, key: Option<&str>, value: &str) -> Result<()> {
        self.push(key, |out| put_str(out, value))
    }

    /// Pushes a numeral kept verbatim.
    pub fn push_number(&mut self, key: Option<&str>, numeral: &str) -> Result<()> {
        self.push(key, |out| put_text(out, Family::Number, numeral))
    }

    pub fn push_uuid(&mut self, key: Option<&str>, high: u64, low: u64) -> Result<()> {
        self.push(key, |out| put_uuid(out, high, low))
    }

    pub fn push_uuid_str(&mut self, key: Option<&str>, value: &str) -> Result<()> {
        let Some((high, low)) = parse_uuid(value) else {
            return Err(Error::argument(format!("'{value}' is not a UUID")));
        };
        self.push_uuid(key, high, low)
    }

    /// Pushes a time as nanoseconds since the Unix epoch.
    pub fn push_time(&mut self, key: Option<&str>, nanos: i64) -> Result<()> {
        self.push(key, |out| put_time(out, nanos))
    }

    /// Closes the innermost open container.
    pub fn pop(&mut self) -> Result<()> {
        let Some(object) = self.stack.last().copied() else {
            return Err(Error::argument("nothing left to pop"));
        };
        let tag = if object { tags::OBJECT_END } else { tags::ARRAY_END };
        self.out.put(&[tag])?;
        self.stack.pop();
        if self.stack.is_empty() {
            self.done = true;
        }
        Ok(())
    }

    /// Closes whatever is still open and returns the frame.
    pub fn finish(mut self) -> Result<Vec<u8>> {
        while !self.stack.is_empty() {
            self.pop()?;
        }
        if !self.done {
            return Err(Error::argument("nothing was built"));
        }
        let prefix = frame_len(self.out.buf.len() - PREFIX)?;
        self.out.buf[..PREFIX].copy_from_slice(&prefix);
        Ok(self.out.buf)
    }

    fn push_open(&mut self, key: Option<&str>, object: bool) -> Result<()> {
        if self.stack.len() >= WIRE_STACK_SIZE {
            return Err(Error::overflow(format!(
                "wire nesting exceeds the limit of {WIRE_STACK_SIZE} levels"
            )));
        }
        let tag = if object { tags::OBJECT_START } else { tags::ARRAY_START };
        self.write(key, |out| out.put(&[tag]))?;
        self.stack.push(object);
        Ok(())
    }

    fn push(&mut self, key: Option<&str>, body: impl FnOnce(&mut Bounded) -> Result<()>) -> Result<()> {
        self.write(key, body)?;
        if self.stack.is_empty() {
            self.done = true;
        }
        Ok(())
    }

    /// Key check, then key and body. On failure the buffer is cut back.
    fn write(&mut self, key: Option<&str>, body: impl FnOnce(&mut Bounded) -> Result<()>) -> Result<()> {
        if self.done {
            return Err(Error::argument("can not push after all elements have been closed"));
        }
        let mark = self.out.buf.len();
        let written = match (self.stack.last(), key) {
            (Some(true), Some(key)) => {
                put_text(&mut self.out, Family::Key, key).and_then(|()| body(&mut self.out))
            }
            (Some(true), None) => Err(Error::argument("a key is required to push to an object")),
            (Some(false), Some(_)) => {
                Err(Error::argument("a key is not needed to push to an array"))
            }
            (Some(false), None) | (None, _) => body(&mut self.out),
        };
        if written.is_err() {
            self.out.buf.truncate(mark);
        }
        written
    }
}
