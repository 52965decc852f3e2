use std::cmp::Ordering;
use std::fmt;
use std::iter::FusedIterator;
use std::slice;

use crate::arena::{Data, Node, ValueId, ValuePool};
use crate::constants::MAX_INDEX;
use crate::num::number::{format_decimal, format_int};
use crate::types::Kind;
use crate::{Error, Result, WriteOptions};

/// Read-only view of one node in a [`ValuePool`].
#[derive(Clone, Copy)]
pub struct ValueRef<'p> {
    pool: &'p ValuePool,
    id: ValueId,
}

impl<'p> ValueRef<'p> {
    pub(crate) fn new(pool: &'p ValuePool, id: ValueId) -> Self {
        Self { pool, id }
    }

    pub fn id(self) -> ValueId {
        self.id
    }

    pub fn pool(self) -> &'p ValuePool {
        self.pool
    }

    pub(crate) fn node(self) -> &'p Node {
        self.pool.node_or_detached(self.id)
    }

    pub(crate) fn data(self) -> &'p Data {
        &self.node().data
    }

    pub fn kind(self) -> Kind {
        self.data().kind()
    }

    pub fn type_name(self) -> &'static str {
        self.kind().name()
    }

    pub fn is_null(self) -> bool {
        matches!(self.data(), Data::Null)
    }

    /// Member key, present when the value belongs to an object.
    pub fn key(self) -> Option<&'p str> {
        self.node().key.as_ref().map(|key| self.pool.text(key))
    }

    pub fn as_bool(self) -> Result<bool> {
        match self.data() {
            Data::True => Ok(true),
            Data::False => Ok(false),
            _ => Err(self.mismatch("a bool")),
        }
    }

    pub fn as_int(self) -> Result<i64> {
        match self.data() {
            Data::Int(value) => Ok(*value),
            _ => Err(self.mismatch("an int64")),
        }
    }

    pub fn as_f64(self) -> Result<f64> {
        match self.data() {
            Data::Decimal(value) => Ok(*value),
            _ => Err(self.mismatch("a double")),
        }
    }

    /// Numeral text of any number kind. Big numbers give their verbatim
    /// source text.
    pub fn as_number_str(self) -> Result<&'p str> {
        let node = self.node();
        match &node.data {
            Data::BigNumber(text) => Ok(self.pool.text(text)),
            Data::Int(value) => Ok(node.memo.get_or_init(|| format_int(*value)).as_str()),
            Data::Decimal(value) => Ok(node.memo.get_or_init(|| format_decimal(*value)).as_str()),
            _ => Err(self.mismatch("a number")),
        }
    }

    /// Text of a string or word.
    pub fn as_str(self) -> Result<&'p str> {
        match self.data() {
            Data::String(text) | Data::Word(text) => Ok(self.pool.text(text)),
            _ => Err(self.mismatch("a string")),
        }
    }

    pub fn as_word(self) -> Result<&'p str> {
        match self.data() {
            Data::Word(text) => Ok(self.pool.text(text)),
            _ => Err(self.mismatch("a word")),
        }
    }

    pub fn as_opaque(self) -> Result<u64> {
        match self.data() {
            Data::Opaque(handle) => Ok(*handle),
            _ => Err(self.mismatch("an opaque")),
        }
    }

    /// Members of an array or object in order. Empty for scalars.
    pub fn members(self) -> Members<'p> {
        Members {
            pool: self.pool,
            ids: self.data().children().iter(),
        }
    }

    pub fn member_count(self) -> Result<usize> {
        match self.data() {
            Data::Array(members) => Ok(members.len()),
            Data::Object(object) => Ok(object.members.len()),
            _ => Err(Error::type_mismatch(format!(
                "can not count the members of {}",
                self.kind().described()
            ))),
        }
    }

    pub fn member(self, position: usize) -> Option<ValueRef<'p>> {
        let id = *self.data().children().get(position)?;
        Some(ValueRef::new(self.pool, id))
    }

    /// First member of an object with `key`.
    pub fn get_by_key(self, key: &str) -> Option<ValueRef<'p>> {
        let Data::Object(object) = self.data() else {
            return None;
        };
        let id = match object.indexed(key) {
            Some(positions) => {
                let first = *positions.first()?;
                *object.members.get(first as usize)?
            }
            None => *object
                .members
                .iter()
                .find(|member| self.pool.key_of(**member) == Some(key))?,
        };
        Some(ValueRef::new(self.pool, id))
    }

    /// Follows a `/`-separated path. A leading `/` is ignored, numeric
    /// segments index arrays and the empty path names the value itself.
    pub fn get(self, path: &str) -> Option<ValueRef<'p>> {
        let path = path.strip_prefix('/').unwrap_or(path);
        if path.is_empty() {
            return Some(self);
        }
        let mut current = self;
        for segment in path.split('/') {
            current = current.step(segment)?;
        }
        Some(current)
    }

    /// Follows a path given as separate segments.
    pub fn aget(self, path: &[&str]) -> Option<ValueRef<'p>> {
        path.iter().try_fold(self, |current, segment| current.step(segment))
    }

    pub(crate) fn step(self, segment: &str) -> Option<ValueRef<'p>> {
        match self.data() {
            Data::Array(_) => self.member(parse_index(segment)?),
            Data::Object(_) => self.get_by_key(segment),
            _ => None,
        }
    }

    pub fn to_json(self, indent: usize) -> String {
        crate::encode::to_string_with_options(self, &WriteOptions::new().with_indent(indent))
    }

    /// Structural ordering: kinds rank first, numbers compare by value,
    /// containers member by member.
    pub fn cmp_value(self, other: ValueRef<'_>) -> Ordering {
        super::compare::compare(self, other)
    }

    fn mismatch(self, wanted: &str) -> Error {
        Error::type_mismatch(format!(
            "can not get {wanted} from {}",
            self.kind().described()
        ))
    }
}

/// Array index from a path segment, bounded by [`MAX_INDEX`].
pub(crate) fn parse_index(segment: &str) -> Option<usize> {
    if segment.is_empty() || !segment.bytes().all(|byte| byte.is_ascii_digit()) {
        return None;
    }
    segment.parse::<usize>().ok().filter(|index| *index <= MAX_INDEX)
}

impl PartialEq for ValueRef<'_> {
    fn eq(&self, other: &Self) -> bool {
        super::compare::equal(*self, *other)
    }
}

impl fmt::Debug for ValueRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.id, self.to_json(0))
    }
}

impl fmt::Display for ValueRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_json(0))
    }
}

pub struct Members<'p> {
    pool: &'p ValuePool,
    ids: slice::Iter<'p, ValueId>,
}

impl<'p> Iterator for Members<'p> {
    type Item = ValueRef<'p>;

    fn next(&mut self) -> Option<Self::Item> {
        self.ids.next().map(|id| ValueRef::new(self.pool, *id))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.ids.size_hint()
    }
}

impl DoubleEndedIterator for Members<'_> {
    fn next_back(&mut self) -> Option<Self::Item> {
        self.ids.next_back().map(|id| ValueRef::new(self.pool, *id))
    }
}

impl ExactSizeIterator for Members<'_> {}

impl FusedIterator for Members<'_> {}
