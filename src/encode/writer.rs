use std::io::Write;

use smallvec::SmallVec;

use crate::decode::parser::Container;
use crate::text::string::write_quoted;
use crate::{Error, Result, WriteOptions};

/// Buffered text is handed to the output once it grows past this.
const FLUSH_AT: usize = 8 * 1024;

/// Destination of writer output.
pub(crate) trait Output {
    fn put(&mut self, text: &str) -> Result<()>;
}

impl Output for String {
    fn put(&mut self, text: &str) -> Result<()> {
        self.push_str(text);
        Ok(())
    }
}

pub(crate) struct IoOutput<W>(pub(crate) W);

impl<W: Write> Output for IoOutput<W> {
    fn put(&mut self, text: &str) -> Result<()> {
        self.0.write_all(text.as_bytes())?;
        Ok(())
    }
}

/// A caller-provided buffer that can not grow.
pub(crate) struct SliceOutput<'b> {
    buf: &'b mut [u8],
    len: usize,
}

impl<'b> SliceOutput<'b> {
    pub(crate) fn new(buf: &'b mut [u8]) -> Self {
        Self { buf, len: 0 }
    }

    pub(crate) fn len(&self) -> usize {
        self.len
    }
}

impl Output for SliceOutput<'_> {
    fn put(&mut self, text: &str) -> Result<()> {
        let end = self.len + text.len();
        let Some(target) = self.buf.get_mut(self.len..end) else {
            return Err(Error::overflow("buffer not large enough for output"));
        };
        target.copy_from_slice(text.as_bytes());
        self.len = end;
        Ok(())
    }
}

struct Open {
    close: char,
    empty: bool,
}

/// Event-driven JSON text writer, compact or pretty.
///
/// Pretty output puts every member on its own line and the closing
/// delimiter on a line of its own, with no space after `:`.
pub(crate) struct Writer<O> {
    out: O,
    buf: String,
    options: WriteOptions,
    open: SmallVec<[Open; 32]>,
    indent_cache: Vec<String>,
}

impl<O: Output> Writer<O> {
    pub(crate) fn new(out: O, options: &WriteOptions) -> Self {
        Self {
            out,
            buf: String::new(),
            options: *options,
            open: SmallVec::new(),
            indent_cache: vec![String::new()],
        }
    }

    pub(crate) fn options(&self) -> &WriteOptions {
        &self.options
    }

    fn write_indent(&mut self, depth: usize) {
        if self.options.indent == 0 {
            return;
        }
        self.buf.push('\n');
        while self.indent_cache.len() <= depth {
            let next = " ".repeat(self.options.indent * self.indent_cache.len());
            self.indent_cache.push(next);
        }
        self.buf.push_str(&self.indent_cache[depth]);
    }

    /// Separator, indentation and key ahead of a value.
    fn begin_value(&mut self, key: Option<&str>) -> Result<()> {
        let depth = self.open.len();
        let Some(top) = self.open.last_mut() else {
            return Ok(());
        };
        let first = std::mem::replace(&mut top.empty, false);
        let in_object = top.close == '}';
        if !first {
            self.buf.push(',');
        }
        self.write_indent(depth);
        if in_object {
            write_quoted(&mut self.buf, key.unwrap_or(""));
            self.buf.push(':');
        }
        Ok(())
    }

    fn end_value(&mut self) -> Result<()> {
        if self.buf.len() >= FLUSH_AT {
            self.out.put(&self.buf)?;
            self.buf.clear();
        }
        Ok(())
    }

    pub(crate) fn open(&mut self, key: Option<&str>, container: Container) -> Result<()> {
        self.begin_value(key)?;
        let (start, close) = match container {
            Container::Array => ('[', ']'),
            Container::Object => ('{', '}'),
        };
        self.buf.push(start);
        self.open.push(Open { close, empty: true });
        Ok(())
    }

    pub(crate) fn close(&mut self) -> Result<()> {
        let Some(open) = self.open.pop() else {
            return Err(Error::argument("nothing left to close"));
        };
        self.write_indent(self.open.len());
        self.buf.push(open.close);
        self.end_value()
    }

    /// Writes text that is already valid JSON: literals and numerals.
    pub(crate) fn raw(&mut self, key: Option<&str>, text: &str) -> Result<()> {
        self.begin_value(key)?;
        self.buf.push_str(text);
        self.end_value()
    }

    pub(crate) fn string(&mut self, key: Option<&str>, text: &str) -> Result<()> {
        self.begin_value(key)?;
        write_quoted(&mut self.buf, text);
        self.end_value()
    }

    /// Closes anything still open and flushes.
    pub(crate) fn finish(mut self) -> Result<O> {
        while !self.open.is_empty() {
            self.close()?;
        }
        if self.options.trailing_newline {
            self.buf.push('\n');
        }
        self.out.put(&self.buf)?;
        Ok(self.out)
    }
}
