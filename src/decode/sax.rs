use std::ops::BitOr;

use crate::decode::parser::{Container, Scalar, Sink};
use crate::{Error, Result};

/// Result of a parse callback. Flags combine with `|`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct CallbackOp(u8);

impl CallbackOp {
    pub const CONTINUE: CallbackOp = CallbackOp(0);
    /// Stop parsing after this callback.
    pub const STOP: CallbackOp = CallbackOp(1);
    /// Release the document just handed over.
    pub const DESTROY: CallbackOp = CallbackOp(2);

    pub fn contains(self, other: CallbackOp) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn bits(self) -> u8 {
        self.0
    }
}

impl BitOr for CallbackOp {
    type Output = CallbackOp;

    fn bitor(self, rhs: CallbackOp) -> CallbackOp {
        CallbackOp(self.0 | rhs.0)
    }
}

/// One value event of a streaming parse.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Push<'a> {
    Null,
    Bool(bool),
    Int(i64),
    Decimal(f64),
    /// A numeral kept as text.
    BigNumber(&'a str),
    String(&'a str),
    /// Start of an array; a matching `pop` follows its elements.
    Array,
    /// Start of an object; a matching `pop` follows its members.
    Object,
}

/// Receiver for [`crate::parse_streaming`]. The parser keeps no tree; the
/// visitor tracks nesting itself if it needs to.
///
/// `key` is the member name when the value sits in an object.
pub trait Visitor {
    fn push(&mut self, key: Option<&str>, value: Push<'_>) -> CallbackOp;

    fn pop(&mut self) -> CallbackOp;
}

impl<V: Visitor + ?Sized> Visitor for &mut V {
    fn push(&mut self, key: Option<&str>, value: Push<'_>) -> CallbackOp {
        (**self).push(key, value)
    }

    fn pop(&mut self) -> CallbackOp {
        (**self).pop()
    }
}

fn proceed(op: CallbackOp) -> Result<()> {
    if op.contains(CallbackOp::STOP) {
        Err(Error::abort())
    } else {
        Ok(())
    }
}

pub(crate) struct VisitorSink<'v, V> {
    visitor: &'v mut V,
}

impl<'v, V: Visitor> VisitorSink<'v, V> {
    pub(crate) fn new(visitor: &'v mut V) -> Self {
        Self { visitor }
    }
}

impl<V: Visitor> Sink for VisitorSink<'_, V> {
    fn open(&mut self, key: Option<&str>, container: Container) -> Result<()> {
        let push = match container {
            Container::Array => Push::Array,
            Container::Object => Push::Object,
        };
        proceed(self.visitor.push(key, push))
    }

    fn close(&mut self, _container: Container) -> Result<()> {
        proceed(self.visitor.pop())
    }

    fn scalar(&mut self, key: Option<&str>, value: Scalar<'_>) -> Result<()> {
        let push = match value {
            Scalar::Null => Push::Null,
            Scalar::Bool(value) => Push::Bool(value),
            Scalar::Int(value) => Push::Int(value),
            Scalar::Decimal(value, _) => Push::Decimal(value),
            Scalar::BigNumber(text) => Push::BigNumber(text),
            Scalar::String(text) => Push::String(text),
        };
        proceed(self.visitor.push(key, push))
    }

    fn document(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Discards every event.
pub(crate) struct ValidateSink;

impl Sink for ValidateSink {
    fn open(&mut self, _key: Option<&str>, _container: Container) -> Result<()> {
        Ok(())
    }

    fn close(&mut self, _container: Container) -> Result<()> {
        Ok(())
    }

    fn scalar(&mut self, _key: Option<&str>, _value: Scalar<'_>) -> Result<()> {
        Ok(())
    }

    fn document(&mut self) -> Result<()> {
        Ok(())
    }
}
