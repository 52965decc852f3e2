use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// A value was accessed as a variant it does not hold.
    Type,
    /// Malformed JSON or a malformed wire frame.
    Parse,
    /// The input ended in the middle of a token or container.
    Incomplete,
    /// A fixed buffer or the nesting stack ran out of room.
    Overflow,
    /// The output sink refused bytes.
    Write,
    /// Pool misuse, such as releasing a value twice.
    Memory,
    /// Bad `\u` escape, broken surrogate pair or invalid UTF-8.
    Unicode,
    /// A callback asked the parser to stop.
    Abort,
    /// Invalid API usage: unknown path, missing key, wrong container.
    Argument,
    /// The Reader's underlying source failed.
    Read,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::Type => "type error",
            ErrorKind::Parse => "parse error",
            ErrorKind::Incomplete => "incomplete",
            ErrorKind::Overflow => "overflow",
            ErrorKind::Write => "write error",
            ErrorKind::Memory => "memory error",
            ErrorKind::Unicode => "unicode error",
            ErrorKind::Abort => "aborted",
            ErrorKind::Argument => "argument error",
            ErrorKind::Read => "read error",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Location {
    pub offset: usize,
    pub line: usize,
    pub column: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}{}", LocationSuffix(.location))]
pub struct Error {
    pub kind: ErrorKind,
    pub message: String,
    pub location: Option<Location>,
}

struct LocationSuffix<'a>(&'a Option<Location>);

impl fmt::Display for LocationSuffix<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(loc) => write!(f, " at line {}, column {}", loc.line, loc.column),
            None => Ok(()),
        }
    }
}

impl Error {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            location: None,
        }
    }

    pub fn type_mismatch(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Type, message)
    }

    pub fn parse(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Parse, message)
    }

    pub fn incomplete(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Incomplete, message)
    }

    pub fn overflow(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Overflow, message)
    }

    pub fn write(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Write, message)
    }

    pub fn memory(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Memory, message)
    }

    pub fn unicode(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unicode, message)
    }

    pub fn abort() -> Self {
        Self::new(ErrorKind::Abort, "stopped by callback")
    }

    pub fn argument(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Argument, message)
    }

    pub fn read(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Read, message)
    }

    pub fn with_location(mut self, location: Location) -> Self {
        self.location = Some(location);
        self
    }

    pub fn line(&self) -> Option<usize> {
        self.location.map(|loc| loc.line)
    }

    pub fn column(&self) -> Option<usize> {
        self.location.map(|loc| loc.column)
    }

    pub fn is_abort(&self) -> bool {
        self.kind == ErrorKind::Abort
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::write(format!("write failed: {err}"))
    }
}

/// Error context for chains of accessor calls.
///
/// Once an error has been recorded every later call returns a zero value
/// without touching its input, so a caller can run a whole sequence and
/// check for failure once at the end.
///
/// ```
/// use pooljson::{parse_str, Sticky};
///
/// let doc = parse_str(r#"{"a":1,"b":"two"}"#).unwrap();
/// let root = doc.root();
/// let mut sticky = Sticky::new();
/// let a = sticky.int(root.get("a"));
/// let b = sticky.int(root.get("b"));
/// let c = sticky.int(root.get("a"));
/// assert_eq!((a, b, c), (1, 0, 0));
/// assert!(sticky.finish().is_err());
/// ```
#[derive(Debug, Default)]
pub struct Sticky {
    error: Option<Error>,
}

impl Sticky {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }

    pub fn error(&self) -> Option<&Error> {
        self.error.as_ref()
    }

    /// Runs `f` unless an error is already recorded; failures are recorded
    /// and replaced by `T::default()`.
    pub fn check<T: Default>(&mut self, f: impl FnOnce() -> crate::Result<T>) -> T {
        if self.error.is_some() {
            return T::default();
        }
        match f() {
            Ok(value) => value,
            Err(err) => {
                self.error = Some(err);
                T::default()
            }
        }
    }

    pub fn record(&mut self, err: Error) {
        if self.error.is_none() {
            self.error = Some(err);
        }
    }

    pub fn int(&mut self, value: Option<crate::ValueRef<'_>>) -> i64 {
        self.check(|| required(value)?.as_int())
    }

    pub fn double(&mut self, value: Option<crate::ValueRef<'_>>) -> f64 {
        self.check(|| required(value)?.as_f64())
    }

    pub fn boolean(&mut self, value: Option<crate::ValueRef<'_>>) -> bool {
        self.check(|| required(value)?.as_bool())
    }

    pub fn string(&mut self, value: Option<crate::ValueRef<'_>>) -> String {
        self.check(|| required(value)?.as_str().map(str::to_owned))
    }

    pub fn member_count(&mut self, value: Option<crate::ValueRef<'_>>) -> usize {
        self.check(|| required(value)?.member_count())
    }

    pub fn finish(self) -> crate::Result<()> {
        match self.error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

fn required(value: Option<crate::ValueRef<'_>>) -> crate::Result<crate::ValueRef<'_>> {
    value.ok_or_else(|| Error::argument("no value at that path"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[rstest::rstest]
    fn test_display_with_location() {
        let err = Error::parse("unexpected object close").with_location(Location {
            offset: 1,
            line: 1,
            column: 2,
        });
        assert_eq!(err.to_string(), "unexpected object close at line 1, column 2");
        assert_eq!(err.line(), Some(1));
        assert_eq!(err.column(), Some(2));
    }

    #[rstest::rstest]
    fn test_display_without_location() {
        let err = Error::memory("value already freed");
        assert_eq!(err.to_string(), "value already freed");
        assert_eq!(err.kind.as_str(), "memory error");
    }

    #[rstest::rstest]
    fn test_sticky_keeps_first_error() {
        let mut sticky = Sticky::new();
        let first: i64 = sticky.check(|| Err(Error::type_mismatch("first")));
        let second: i64 = sticky.check(|| Ok(7));
        assert_eq!((first, second), (0, 0));
        sticky.record(Error::argument("second"));
        let err = sticky.finish().unwrap_err();
        assert_eq!(err.kind, ErrorKind::Type);
        assert_eq!(err.message, "first");
    }
}
