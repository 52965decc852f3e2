mod compare;
pub mod object;
mod ops;
mod value;
pub(crate) mod walk;

use std::fmt;

pub use self::object::ObjectMode;
pub use self::value::{Members, ValueRef};
use crate::arena::Data;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    Null,
    True,
    False,
    Int,
    Decimal,
    BigNumber,
    String,
    Word,
    Array,
    Object,
    Opaque,
}

impl Kind {
    pub fn name(self) -> &'static str {
        match self {
            Kind::Null => "null",
            Kind::True => "true",
            Kind::False => "false",
            Kind::Int => "int64",
            Kind::Decimal => "decimal",
            Kind::BigNumber => "number",
            Kind::String => "string",
            Kind::Word => "word",
            Kind::Array => "array",
            Kind::Object => "object",
            Kind::Opaque => "opaque",
        }
    }

    /// Name with its article, for messages.
    pub(crate) fn described(self) -> &'static str {
        match self {
            Kind::Null => "a null",
            Kind::True => "a true",
            Kind::False => "a false",
            Kind::Int => "an int64",
            Kind::Decimal => "a decimal",
            Kind::BigNumber => "a number",
            Kind::String => "a string",
            Kind::Word => "a word",
            Kind::Array => "an array",
            Kind::Object => "an object",
            Kind::Opaque => "an opaque",
        }
    }

    pub fn is_container(self) -> bool {
        matches!(self, Kind::Array | Kind::Object)
    }

    pub fn is_number(self) -> bool {
        matches!(self, Kind::Int | Kind::Decimal | Kind::BigNumber)
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl Data {
    pub(crate) fn kind(&self) -> Kind {
        match self {
            Data::Null => Kind::Null,
            Data::True => Kind::True,
            Data::False => Kind::False,
            Data::Int(_) => Kind::Int,
            Data::Decimal(_) => Kind::Decimal,
            Data::BigNumber(_) => Kind::BigNumber,
            Data::String(_) => Kind::String,
            Data::Word(_) => Kind::Word,
            Data::Array(_) => Kind::Array,
            Data::Object(_) => Kind::Object,
            Data::Opaque(_) => Kind::Opaque,
        }
    }
}
