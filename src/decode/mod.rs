pub mod number;
pub(crate) mod parser;
pub mod pool;
pub mod sax;
pub mod tables;
mod tree;

use std::io::Read;

use crate::arena::{ValueId, ValuePool};
use crate::decode::parser::Machine;
use crate::decode::pool::{put_pool, take_pool};
use crate::decode::sax::{CallbackOp, ValidateSink, Visitor, VisitorSink};
use crate::decode::tree::{EachDocument, KeepFirst, TreeSink};
use crate::document::Document;
use crate::reader::Reader;
use crate::{Error, ParseOptions, Result};

/// How a callback-driven parse ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// All input was consumed.
    Complete,
    /// A callback returned [`CallbackOp::STOP`].
    Stopped,
}

fn outcome(result: Result<usize>) -> Result<Outcome> {
    match result {
        Ok(_) => Ok(Outcome::Complete),
        Err(err) if err.is_abort() => Ok(Outcome::Stopped),
        Err(err) => Err(err),
    }
}

/// One parse over one input.
///
/// ```
/// use pooljson::Parser;
///
/// let doc = Parser::from_str(r#"{"x":true,"y":false}"#).parse_document().unwrap();
/// assert_eq!(doc.root().member_count().unwrap(), 2);
/// ```
pub struct Parser<'r> {
    reader: Reader<'r>,
    options: ParseOptions,
}

impl<'r> Parser<'r> {
    pub fn new(reader: Reader<'r>) -> Self {
        Self {
            reader,
            options: ParseOptions::default(),
        }
    }

    pub fn from_slice(input: &'r [u8]) -> Self {
        Self::new(Reader::from_slice(input))
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(input: &'r str) -> Self {
        Self::new(Reader::from_str(input))
    }

    pub fn from_read<R: Read + 'r>(reader: R) -> Self {
        Self::new(Reader::from_read(reader))
    }

    pub fn with_options(mut self, options: &ParseOptions) -> Self {
        self.options = *options;
        self
    }

    /// Checks well-formedness without building anything. Any number of
    /// concatenated documents is accepted; at least one is required.
    pub fn validate(self) -> Result<()> {
        let mut sink = ValidateSink;
        let mut machine = Machine::new(self.reader, &mut sink, &self.options, true);
        match machine.run()? {
            0 => Err(Error::incomplete("no JSON value found").with_location(machine.location())),
            _ => Ok(()),
        }
    }

    /// Parses a single document into a pool taken from the process-wide
    /// reservoir.
    pub fn parse_document(self) -> Result<Document> {
        let mut pool = take_pool();
        match self.parse_into(&mut pool) {
            Ok(root) => Ok(Document::new(pool, root)),
            Err(err) => {
                put_pool(pool);
                Err(err)
            }
        }
    }

    /// Parses a single document into `pool` and returns its detached root.
    /// Nothing is left in the pool when the parse fails.
    pub fn parse_into(self, pool: &mut ValuePool) -> Result<ValueId> {
        let mut sink = TreeSink::new(pool, KeepFirst::default(), self.options.hash_threshold);
        let result = {
            let mut machine = Machine::new(self.reader, &mut sink, &self.options, false);
            match machine.run() {
                Ok(0) => Err(Error::incomplete("no JSON value found")
                    .with_location(machine.location())),
                other => other,
            }
        };
        if result.is_err() {
            sink.abandon();
        }
        let root = sink.into_handler().root;
        match (result, root) {
            (Ok(_), Some(root)) => Ok(root),
            (Ok(_), None) => Err(Error::incomplete("no JSON value found")),
            (Err(err), root) => {
                if let Some(root) = root {
                    pool.free_tree(root);
                }
                Err(err)
            }
        }
    }

    /// Parses concatenated documents into `pool`, handing each root to
    /// `on_document` as soon as it is complete. The returned flags decide
    /// whether the root is released and whether parsing goes on.
    pub fn parse_each<F>(self, pool: &mut ValuePool, on_document: F) -> Result<Outcome>
    where
        F: FnMut(&mut ValuePool, ValueId) -> CallbackOp,
    {
        let mut sink = TreeSink::new(pool, EachDocument(on_document), self.options.hash_threshold);
        let result = Machine::new(self.reader, &mut sink, &self.options, true).run();
        if matches!(&result, Err(err) if !err.is_abort()) {
            sink.abandon();
        }
        outcome(result)
    }

    /// Reports every value to `visitor` without building a tree.
    pub fn parse_streaming<V: Visitor>(self, visitor: &mut V) -> Result<Outcome> {
        let mut sink = VisitorSink::new(visitor);
        let result = Machine::new(self.reader, &mut sink, &self.options, true).run();
        outcome(result)
    }
}
