//! A JSON engine built from three parts: a table-driven byte-class parser
//! and validator, a pooled value tree and a compact binary wire format.
//!
//! ```
//! let doc = pooljson::parse_str(r#"{"name":"pool","sizes":[1,2,3]}"#).unwrap();
//! assert_eq!(doc.root().get("sizes/1").unwrap().as_int().unwrap(), 2);
//! assert_eq!(doc.to_json(0), r#"{"name":"pool","sizes":[1,2,3]}"#);
//! ```

pub mod arena;
pub mod builder;
pub mod caller;
pub mod constants;
pub mod decode;
pub mod document;
pub mod encode;
pub mod error;
pub mod num;
pub mod options;
#[cfg(feature = "parallel")]
pub mod parallel;
pub mod reader;
mod serde;
pub mod text;
pub mod types;
pub mod wire;

use std::io::{Read, Write};

pub use crate::arena::{PoolStats, ValueId, ValuePool};
pub use crate::builder::Builder;
pub use crate::caller::Caller;
pub use crate::decode::sax::{CallbackOp, Push, Visitor};
pub use crate::decode::{Outcome, Parser};
pub use crate::document::Document;
pub use crate::error::{Error, ErrorKind, Location, Sticky};
pub use crate::options::{ParseOptions, WriteOptions};
pub use crate::reader::{FnSource, Reader};
pub use crate::types::{Kind, Members, ObjectMode, ValueRef};
pub use crate::wire::{WireBuilder, WireItem, WireVisitor};

pub type Result<T> = std::result::Result<T, Error>;

pub fn parse_str(input: &str) -> Result<Document> {
    Parser::from_str(input).parse_document()
}

pub fn parse_slice(input: &[u8]) -> Result<Document> {
    Parser::from_slice(input).parse_document()
}

pub fn parse_slice_with_options(input: &[u8], options: &ParseOptions) -> Result<Document> {
    Parser::from_slice(input).with_options(options).parse_document()
}

/// Parses one document from a file, a socket or any other reader.
pub fn parse_reader<R: Read>(reader: R) -> Result<Document> {
    parse_reader_with_options(reader, &ParseOptions::default())
}

pub fn parse_reader_with_options<R: Read>(reader: R, options: &ParseOptions) -> Result<Document> {
    Parser::from_read(reader).with_options(options).parse_document()
}

/// Checks that `input` holds one or more well-formed JSON documents.
pub fn validate(input: &[u8]) -> Result<()> {
    Parser::from_slice(input).validate()
}

pub fn validate_str(input: &str) -> Result<()> {
    Parser::from_str(input).validate()
}

pub fn validate_reader<R: Read>(reader: R) -> Result<()> {
    Parser::from_read(reader).validate()
}

pub fn validate_with_options(input: &[u8], options: &ParseOptions) -> Result<()> {
    Parser::from_slice(input).with_options(options).validate()
}

/// Parses concatenated documents into `pool`; see [`Parser::parse_each`].
pub fn parse_each<F>(pool: &mut ValuePool, input: &[u8], on_document: F) -> Result<Outcome>
where
    F: FnMut(&mut ValuePool, ValueId) -> CallbackOp,
{
    Parser::from_slice(input).parse_each(pool, on_document)
}

/// Reports every value to `visitor` without building a tree.
pub fn parse_streaming<V: Visitor>(input: &[u8], visitor: &mut V) -> Result<Outcome> {
    Parser::from_slice(input).parse_streaming(visitor)
}

pub fn to_string(value: ValueRef<'_>, indent: usize) -> String {
    encode::to_string(value, indent)
}

pub fn to_writer<W: Write>(value: ValueRef<'_>, options: &WriteOptions, out: W) -> Result<()> {
    encode::to_writer(value, options, out)
}

/// Writes compact or indented text into a fixed buffer; see [`encode::fill`].
pub fn fill(value: ValueRef<'_>, indent: usize, buf: &mut [u8]) -> Result<usize> {
    encode::fill(value, &WriteOptions::new().with_indent(indent), buf)
}
