use std::fmt;
use std::io::{self, Read};

use log::debug;
use memchr::{memchr, memchr_iter, memrchr};

use crate::constants::READ_BUF_SIZE;
use crate::error::Location;
use crate::Error;

enum Source<'a> {
    Slice(&'a [u8]),
    Stream(Box<dyn Read + 'a>),
}

/// Pull-based byte source with line/column tracking.
///
/// A slice source is read in place. Stream sources are buffered; consumed
/// bytes are slid out of the buffer on refill unless a protected region is
/// active, in which case the region is kept (and the buffer grown if it has
/// to be) so [`Reader::protected`] stays a contiguous slice.
pub struct Reader<'a> {
    source: Source<'a>,
    buf: Vec<u8>,
    pos: usize,
    end: usize,
    protect: Option<usize>,
    line: usize,
    col: usize,
    prev_col: usize,
    offset: usize,
    last: Option<u8>,
    eof: bool,
    error: Option<Error>,
}

impl<'a> Reader<'a> {
    pub fn from_slice(input: &'a [u8]) -> Self {
        Self::with_source(Source::Slice(input), Vec::new(), input.len())
    }

    pub fn from_str(input: &'a str) -> Self {
        Self::from_slice(input.as_bytes())
    }

    /// Buffers any [`Read`] implementation: files, sockets, or an
    /// [`FnSource`] wrapping a callback.
    pub fn from_read<R: Read + 'a>(reader: R) -> Self {
        Self::with_source(Source::Stream(Box::new(reader)), vec![0; READ_BUF_SIZE], 0)
    }

    fn with_source(source: Source<'a>, buf: Vec<u8>, end: usize) -> Self {
        Self {
            source,
            buf,
            pos: 0,
            end,
            protect: None,
            line: 1,
            col: 0,
            prev_col: 0,
            offset: 0,
            last: None,
            eof: false,
            error: None,
        }
    }

    /// Next byte, or `None` once the source is exhausted (or failed; see
    /// [`Reader::take_error`]).
    #[inline]
    pub fn get(&mut self) -> Option<u8> {
        if self.pos >= self.end && !self.read() {
            self.last = None;
            return None;
        }
        let byte = match &self.source {
            Source::Slice(input) => input.get(self.pos).copied(),
            Source::Stream(_) => self.buf.get(self.pos).copied(),
        }?;
        self.pos += 1;
        self.offset += 1;
        self.last = Some(byte);
        self.prev_col = self.col;
        if byte == b'\n' {
            self.line += 1;
            self.col = 0;
        } else {
            self.col += 1;
        }
        Some(byte)
    }

    /// Un-reads the last byte. Only one byte of history is kept.
    pub fn backup(&mut self) {
        if let Some(byte) = self.last.take() {
            self.pos -= 1;
            self.offset -= 1;
            if byte == b'\n' {
                self.line -= 1;
            }
            self.col = self.prev_col;
        }
    }

    /// Consumes bytes up to and including the next `needle`, scanning the
    /// buffered window at a time. Returns false if the input ends first.
    /// The skipped run can not be backed up over.
    pub fn skip_past(&mut self, needle: u8) -> bool {
        loop {
            let (taken, found, newlines, after_newline) = {
                let window = match &self.source {
                    Source::Slice(input) => input.get(self.pos..self.end).unwrap_or(&[]),
                    Source::Stream(_) => self.buf.get(self.pos..self.end).unwrap_or(&[]),
                };
                let found = memchr(needle, window);
                let taken = found.map_or(window.len(), |at| at + 1);
                let skipped = &window[..taken];
                let after_newline = memrchr(b'\n', skipped).map(|at| taken - at - 1);
                (taken, found.is_some(), memchr_iter(b'\n', skipped).count(), after_newline)
            };
            self.pos += taken;
            self.offset += taken;
            self.line += newlines;
            self.col = match after_newline {
                Some(column) => column,
                None => self.col + taken,
            };
            self.last = None;
            if found {
                return true;
            }
            if !self.read() {
                return false;
            }
        }
    }

    /// Marks the current position as the start of a protected region.
    pub fn protect(&mut self) {
        self.protect = Some(self.pos);
    }

    /// Marks the byte just read as the start of a protected region.
    pub fn protect_last(&mut self) {
        self.protect = Some(self.pos.saturating_sub(1));
    }

    /// Bytes from the protect mark up to the current position.
    pub fn protected(&self) -> &[u8] {
        let Some(start) = self.protect else {
            return &[];
        };
        let window = match &self.source {
            Source::Slice(input) => *input,
            Source::Stream(_) => &self.buf[..self.end],
        };
        window.get(start..self.pos).unwrap_or(&[])
    }

    pub fn release(&mut self) {
        self.protect = None;
    }

    /// Refills the buffer from the underlying source. Returns false at end
    /// of input. Read failures are recorded and reported as end of input.
    pub fn read(&mut self) -> bool {
        if self.eof {
            return false;
        }
        let Source::Stream(stream) = &mut self.source else {
            self.eof = true;
            return false;
        };

        // Keep one consumed byte for backup() plus any protected region.
        let keep_from = match self.protect {
            Some(start) => start.min(self.pos.saturating_sub(1)),
            None => self.pos.saturating_sub(1),
        };
        if keep_from > 0 {
            self.buf.copy_within(keep_from..self.end, 0);
            self.pos -= keep_from;
            self.end -= keep_from;
            if let Some(start) = self.protect.as_mut() {
                *start -= keep_from;
            }
        }
        if self.end == self.buf.len() {
            let grown = (self.buf.len() * 2).max(READ_BUF_SIZE);
            self.buf.resize(grown, 0);
            debug!("reader buffer grown to {grown} bytes");
        }

        loop {
            match stream.read(&mut self.buf[self.end..]) {
                Ok(0) => {
                    self.eof = true;
                    return false;
                }
                Ok(count) => {
                    self.end += count;
                    return true;
                }
                Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                Err(err) => {
                    self.error = Some(Error::read(format!("error while reading input: {err}")));
                    self.eof = true;
                    return false;
                }
            }
        }
    }

    pub fn line(&self) -> usize {
        self.line
    }

    /// Column of the last byte read, 1-based. Zero right after a newline.
    pub fn column(&self) -> usize {
        self.col
    }

    /// Number of bytes consumed so far.
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Where the last byte read sits. A newline belongs to the line it ends.
    pub fn location(&self) -> Location {
        let (line, column) = match self.last {
            Some(b'\n') => (self.line - 1, self.prev_col + 1),
            _ => (self.line, self.col),
        };
        Location {
            offset: self.offset.saturating_sub(1),
            line,
            column,
        }
    }

    pub fn error(&self) -> Option<&Error> {
        self.error.as_ref()
    }

    pub fn take_error(&mut self) -> Option<Error> {
        self.error.take()
    }
}

impl fmt::Debug for Reader<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reader")
            .field("line", &self.line)
            .field("column", &self.col)
            .field("offset", &self.offset)
            .field("protect", &self.protect)
            .field("eof", &self.eof)
            .finish()
    }
}

/// Adapts a fill callback into a [`Read`] source. The callback writes into
/// the given buffer and returns how many bytes it wrote; zero means done.
pub struct FnSource<F>(pub F);

impl<F> Read for FnSource<F>
where
    F: FnMut(&mut [u8]) -> io::Result<usize>,
{
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        (self.0)(buf)
    }
}

/// A [`Read`] source that yields the given chunks one `read` call at a
/// time, splitting tokens exactly where the chunks split them.
pub fn chunked<'c>(chunks: &'c [&'c str]) -> impl Read + 'c {
    let mut index = 0;
    let mut within = 0;
    FnSource(move |buf: &mut [u8]| {
        while let Some(chunk) = chunks.get(index) {
            let rest = &chunk.as_bytes()[within..];
            if rest.is_empty() {
                index += 1;
                within = 0;
                continue;
            }
            let count = rest.len().min(buf.len());
            buf[..count].copy_from_slice(&rest[..count]);
            within += count;
            return Ok(count);
        }
        Ok(0)
    })
}
