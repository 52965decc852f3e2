use smallvec::SmallVec;

use crate::decode::number::{NumberValue, Numeral};
use crate::decode::tables::{
    mode_of, Action, ByteClassTable, Mode, AFTER, ARRAY_COMMA, COLON, DIGIT, DOT, ESCAPE,
    EXPONENT, EXP_SIGN, EXP_START, FIRST_KEY, FRACTION, KEY, NEGATIVE, STRING, TRAIL, UNICODE,
    UTF8, VALUE, ZERO,
};
use crate::error::Location;
use crate::reader::Reader;
use crate::text::string::hex_value;
use crate::{Error, ParseOptions, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Container {
    Array,
    Object,
}

/// What the innermost open container accepts next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Expect {
    ArrayNew,
    ArrayElement,
    ArrayComma,
    ObjectNew,
    ObjectKey,
    ObjectColon,
    ObjectValue,
    ObjectComma,
}

#[derive(Debug, Clone, Copy)]
struct Frame {
    container: Container,
    expect: Expect,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum Scalar<'a> {
    Null,
    Bool(bool),
    Int(i64),
    /// Value plus the numeral as written.
    Decimal(f64, &'a str),
    BigNumber(&'a str),
    String(&'a str),
}

/// Receiver of parse events. Returning an abort error from any method
/// stops the parse.
pub(crate) trait Sink {
    fn open(&mut self, key: Option<&str>, container: Container) -> Result<()>;
    fn close(&mut self, container: Container) -> Result<()>;
    fn scalar(&mut self, key: Option<&str>, value: Scalar<'_>) -> Result<()>;
    /// A top-level value is complete.
    fn document(&mut self) -> Result<()>;
}

/// The table-driven state machine.
pub(crate) struct Machine<'r, 's, S> {
    reader: Reader<'r>,
    sink: &'s mut S,
    table: &'static ByteClassTable,
    stack: SmallVec<[Frame; 32]>,
    key: String,
    scratch: Vec<u8>,
    numeral: Numeral,
    options: ParseOptions,
    multi: bool,
    documents: usize,
}

fn member_key<'k>(stack: &[Frame], key: &'k str) -> Option<&'k str> {
    match stack.last() {
        Some(frame) if frame.container == Container::Object => Some(key),
        _ => None,
    }
}

impl<'r, 's, S: Sink> Machine<'r, 's, S> {
    /// With `multi` set any number of top-level values may follow each
    /// other; otherwise only whitespace may follow the first.
    pub(crate) fn new(reader: Reader<'r>, sink: &'s mut S, options: &ParseOptions, multi: bool) -> Self {
        Self {
            reader,
            sink,
            table: &VALUE,
            stack: SmallVec::new(),
            key: String::new(),
            scratch: Vec::new(),
            numeral: Numeral::default(),
            options: *options,
            multi,
            documents: 0,
        }
    }

    /// Runs to the end of input. Returns the number of complete top-level
    /// values seen.
    pub(crate) fn run(&mut self) -> Result<usize> {
        self.drive()?;
        Ok(self.documents)
    }

    pub(crate) fn location(&self) -> Location {
        self.reader.location()
    }

    fn drive(&mut self) -> Result<()> {
        loop {
            let Some(byte) = self.reader.get() else {
                return self.end_of_input();
            };
            match self.table[byte as usize] {
                Action::Skip | Action::Newline => {}
                Action::Comment => self.comment(byte)?,
                Action::BeginNull => {
                    self.literal(b"ull", "expected null")?;
                    self.emit(Scalar::Null)?;
                }
                Action::BeginTrue => {
                    self.literal(b"rue", "expected true")?;
                    self.emit(Scalar::Bool(true))?;
                }
                Action::BeginFalse => {
                    self.literal(b"alse", "expected false")?;
                    self.emit(Scalar::Bool(false))?;
                }
                Action::BeginNegative => {
                    self.numeral = Numeral::start(true);
                    self.reader.protect_last();
                    self.table = &NEGATIVE;
                }
                Action::BeginZero | Action::BeginDigit => {
                    self.numeral = Numeral::start(false);
                    self.numeral.int_digit(byte - b'0');
                    self.reader.protect_last();
                    self.table = if byte == b'0' { &ZERO } else { &DIGIT };
                }
                Action::IntZero => {
                    self.numeral.int_digit(0);
                    self.table = &ZERO;
                }
                Action::IntDigit => {
                    self.numeral.int_digit(byte - b'0');
                    self.table = &DIGIT;
                }
                Action::Dot => self.table = &DOT,
                Action::FracDigit => {
                    self.numeral.frac_digit(byte - b'0');
                    self.table = &FRACTION;
                }
                Action::ExpMark => self.table = &EXP_SIGN,
                Action::ExpSign => {
                    self.numeral.exp_sign(byte == b'-');
                    self.table = &EXP_START;
                }
                Action::ExpDigit => {
                    self.numeral.exp_digit(byte - b'0');
                    self.table = &EXPONENT;
                }
                Action::NumEnd => {
                    self.reader.backup();
                    self.end_number()?;
                }
                Action::BeginString => self.string_value()?,
                Action::KeyQuote => self.key()?,
                Action::Colon => {
                    self.set_expect(Expect::ObjectValue);
                    self.table = &VALUE;
                }
                Action::Comma => self.comma()?,
                Action::OpenArray => self.open(Container::Array)?,
                Action::OpenObject => self.open(Container::Object)?,
                Action::CloseArray => self.close(Container::Array)?,
                Action::CloseObject => self.close(Container::Object)?,
                _ => return Err(self.byte_error(self.table, byte)),
            }
        }
    }

    fn set_expect(&mut self, expect: Expect) {
        if let Some(frame) = self.stack.last_mut() {
            frame.expect = expect;
        }
    }

    fn emit(&mut self, value: Scalar<'static>) -> Result<()> {
        self.sink.scalar(member_key(&self.stack, &self.key), value)?;
        self.value_done()
    }

    /// Moves on after a complete value: to the next top-level value, or to
    /// the comma-or-close position of the enclosing container.
    fn value_done(&mut self) -> Result<()> {
        match self.stack.last_mut() {
            None => {
                self.documents += 1;
                self.table = if self.multi { &VALUE } else { &TRAIL };
                self.sink.document()?;
            }
            Some(frame) => {
                frame.expect = match frame.container {
                    Container::Array => Expect::ArrayComma,
                    Container::Object => Expect::ObjectComma,
                };
                self.table = &AFTER;
            }
        }
        Ok(())
    }

    fn literal(&mut self, rest: &[u8], message: &str) -> Result<()> {
        for &expected in rest {
            match self.reader.get() {
                Some(byte) if byte == expected => {}
                Some(_) => return Err(Error::parse(message).with_location(self.reader.location())),
                None => return Err(self.eof_error(message)),
            }
        }
        Ok(())
    }

    fn end_number(&mut self) -> Result<()> {
        let text = std::str::from_utf8(self.reader.protected())
            .map_err(|_| Error::parse("invalid numeral").with_location(self.reader.location()))?;
        let value = match self.numeral.finish() {
            NumberValue::Int(value) => Scalar::Int(value),
            NumberValue::Decimal(value) => Scalar::Decimal(value, text),
            NumberValue::Big => Scalar::BigNumber(text),
        };
        self.sink.scalar(member_key(&self.stack, &self.key), value)?;
        self.reader.release();
        self.value_done()
    }

    /// Reads a string body after its opening quote. The text is left in the
    /// reader's protected region (closing quote included) unless it had
    /// escapes, in which case it is in `scratch`. Returns true for the
    /// latter.
    fn read_string(&mut self) -> Result<bool> {
        self.reader.protect();
        self.scratch.clear();
        let mut escaped = false;
        loop {
            let Some(byte) = self.reader.get() else {
                return Err(self.eof_error("string not terminated"));
            };
            match STRING[byte as usize] {
                Action::StrByte => {
                    if escaped {
                        self.scratch.push(byte);
                    }
                }
                Action::StrEnd => return Ok(escaped),
                Action::StrEscape => {
                    if !escaped {
                        let body = self.reader.protected();
                        self.scratch
                            .extend_from_slice(&body[..body.len().saturating_sub(1)]);
                        self.reader.release();
                        escaped = true;
                    }
                    self.escape()?;
                }
                Action::Utf8Lead2 => self.utf8_tail(byte, 1, escaped)?,
                Action::Utf8Lead3 => self.utf8_tail(byte, 2, escaped)?,
                Action::Utf8Lead4 => self.utf8_tail(byte, 3, escaped)?,
                _ => return Err(self.byte_error(&STRING, byte)),
            }
        }
    }

    fn utf8_tail(&mut self, lead: u8, count: usize, escaped: bool) -> Result<()> {
        if escaped {
            self.scratch.push(lead);
        }
        for _ in 0..count {
            let Some(byte) = self.reader.get() else {
                return Err(self.eof_error("string not terminated"));
            };
            if UTF8[byte as usize] != Action::Utf8Cont {
                return Err(self.byte_error(&UTF8, byte));
            }
            if escaped {
                self.scratch.push(byte);
            }
        }
        Ok(())
    }

    fn escape(&mut self) -> Result<()> {
        let Some(byte) = self.reader.get() else {
            return Err(self.eof_error("string not terminated"));
        };
        match ESCAPE[byte as usize] {
            Action::EscChar => {
                self.scratch.push(match byte {
                    b'b' => 0x08,
                    b'f' => 0x0c,
                    b'n' => b'\n',
                    b'r' => b'\r',
                    b't' => b'\t',
                    other => other,
                });
                Ok(())
            }
            Action::EscUnicode => {
                let ch = self.unicode_escape()?;
                let mut utf8 = [0u8; 4];
                self.scratch
                    .extend_from_slice(ch.encode_utf8(&mut utf8).as_bytes());
                Ok(())
            }
            _ => Err(self.byte_error(&ESCAPE, byte)),
        }
    }

    /// Decodes the digits of a `\u` escape, joining a surrogate pair.
    fn unicode_escape(&mut self) -> Result<char> {
        let first = self.hex4()?;
        let code = match first {
            0xd800..=0xdbff => {
                let backslash = self.reader.get();
                let u = self.reader.get();
                if backslash != Some(b'\\') || u != Some(b'u') {
                    return Err(self.unicode_error("invalid escaped unicode surrogate pair"));
                }
                let second = self.hex4()?;
                if !(0xdc00..=0xdfff).contains(&second) {
                    return Err(self.unicode_error("invalid escaped unicode surrogate pair"));
                }
                0x10000 + ((first - 0xd800) << 10) + (second - 0xdc00)
            }
            0xdc00..=0xdfff => {
                return Err(self.unicode_error("unpaired low surrogate in unicode escape"))
            }
            code => code,
        };
        char::from_u32(code).ok_or_else(|| self.unicode_error("invalid unicode code point"))
    }

    fn hex4(&mut self) -> Result<u32> {
        let mut code = 0;
        for _ in 0..4 {
            let Some(byte) = self.reader.get() else {
                return Err(self.eof_error("string not terminated"));
            };
            match (UNICODE[byte as usize], hex_value(byte)) {
                (Action::HexDigit, Some(digit)) => code = code << 4 | digit,
                _ => return Err(self.unicode_error("invalid hex character in unicode escape")),
            }
        }
        Ok(code)
    }

    fn string_value(&mut self) -> Result<()> {
        let escaped = self.read_string()?;
        let location = self.reader.location();
        let bytes = if escaped {
            &self.scratch[..]
        } else {
            let body = self.reader.protected();
            &body[..body.len().saturating_sub(1)]
        };
        let text = std::str::from_utf8(bytes)
            .map_err(|_| Error::unicode("invalid UTF-8 in string").with_location(location))?;
        self.sink
            .scalar(member_key(&self.stack, &self.key), Scalar::String(text))?;
        self.reader.release();
        self.value_done()
    }

    fn key(&mut self) -> Result<()> {
        let escaped = self.read_string()?;
        let location = self.reader.location();
        let bytes = if escaped {
            &self.scratch[..]
        } else {
            let body = self.reader.protected();
            &body[..body.len().saturating_sub(1)]
        };
        let text = std::str::from_utf8(bytes)
            .map_err(|_| Error::unicode("invalid UTF-8 in key").with_location(location))?;
        self.key.clear();
        self.key.push_str(text);
        self.reader.release();
        self.set_expect(Expect::ObjectColon);
        self.table = &COLON;
        Ok(())
    }

    fn comma(&mut self) -> Result<()> {
        match self.stack.last_mut() {
            Some(frame) if frame.expect == Expect::ArrayComma => {
                frame.expect = Expect::ArrayElement;
                self.table = &ARRAY_COMMA;
            }
            Some(frame) if frame.expect == Expect::ObjectComma => {
                frame.expect = Expect::ObjectKey;
                self.table = &KEY;
            }
            _ => {
                return Err(Error::parse("unexpected comma").with_location(self.reader.location()))
            }
        }
        Ok(())
    }

    fn open(&mut self, container: Container) -> Result<()> {
        if self.stack.len() >= self.options.max_depth {
            return Err(Error::overflow(format!(
                "nesting exceeds the limit of {} levels",
                self.options.max_depth
            ))
            .with_location(self.reader.location()));
        }
        self.sink.open(member_key(&self.stack, &self.key), container)?;
        let (expect, table) = match container {
            Container::Array => (Expect::ArrayNew, &VALUE),
            Container::Object => (Expect::ObjectNew, &FIRST_KEY),
        };
        self.stack.push(Frame { container, expect });
        self.table = table;
        Ok(())
    }

    fn close(&mut self, container: Container) -> Result<()> {
        let closable = matches!(
            self.stack.last(),
            Some(frame) if frame.container == container
                && matches!(
                    frame.expect,
                    Expect::ArrayNew | Expect::ArrayComma | Expect::ObjectNew | Expect::ObjectComma
                )
        );
        if !closable {
            let message = match container {
                Container::Array => "unexpected array close",
                Container::Object => "unexpected object close",
            };
            return Err(Error::parse(message).with_location(self.reader.location()));
        }
        self.stack.pop();
        self.sink.close(container)?;
        self.value_done()
    }

    fn comment(&mut self, byte: u8) -> Result<()> {
        if !self.options.allow_comments {
            return Err(self.byte_error(self.table, byte));
        }
        match self.reader.get() {
            Some(b'/') => {
                self.reader.skip_past(b'\n');
                Ok(())
            }
            Some(b'*') => loop {
                if !self.reader.skip_past(b'*') {
                    return Err(self.eof_error("comment not terminated"));
                }
                match self.reader.get() {
                    Some(b'/') => return Ok(()),
                    Some(b'*') => self.reader.backup(),
                    Some(_) => {}
                    None => return Err(self.eof_error("comment not terminated")),
                }
            },
            _ => Err(Error::parse("invalid comment format").with_location(self.reader.location())),
        }
    }

    fn end_of_input(&mut self) -> Result<()> {
        if let Some(err) = self.reader.take_error() {
            return Err(err.with_location(self.reader.location()));
        }
        let mode = mode_of(self.table);
        if mode.ends_number() {
            self.end_number()?;
        } else if mode.in_number() {
            return Err(Error::incomplete("number not terminated").with_location(self.reader.location()));
        }
        match self.stack.last() {
            Some(frame) => {
                let message = match frame.container {
                    Container::Array => "array not terminated",
                    Container::Object => "object not terminated",
                };
                Err(Error::incomplete(message).with_location(self.reader.location()))
            }
            None => Ok(()),
        }
    }

    fn eof_error(&mut self, message: &str) -> Error {
        match self.reader.take_error() {
            Some(err) => err.with_location(self.reader.location()),
            None => Error::incomplete(message).with_location(self.reader.location()),
        }
    }

    fn unicode_error(&self, message: &str) -> Error {
        Error::unicode(message).with_location(self.reader.location())
    }

    fn byte_error(&self, table: &ByteClassTable, byte: u8) -> Error {
        let mode = mode_of(table);
        let message = match mode {
            Mode::String | Mode::Utf8 => format!("invalid JSON character 0x{byte:02x}"),
            Mode::Trail => "extra characters after the document".to_string(),
            Mode::Escape => format!("invalid escaped character {}", shown(byte)),
            _ => format!("unexpected character {} in '{}' mode", shown(byte), mode.label()),
        };
        Error::parse(message).with_location(self.reader.location())
    }
}

fn shown(byte: u8) -> String {
    if byte.is_ascii_graphic() {
        format!("'{}'", byte as char)
    } else {
        format!("0x{byte:02x}")
    }
}
