use std::cmp::Ordering;
use std::sync::OnceLock;

use smol_str::SmolStr;

use crate::arena::{Data, Node, ValueId, ValuePool};
use crate::decode::number::is_numeral;
use crate::num::number::format_decimal;
use crate::types::object::{Object, ObjectMode};
use crate::types::value::parse_index;
use crate::types::Kind;
use crate::{Error, Result};

/// Constructors. New values are detached; they become part of a tree once
/// appended to a container.
impl ValuePool {
    pub fn create_null(&mut self) -> ValueId {
        self.insert(Node::new(Data::Null))
    }

    pub fn create_bool(&mut self, value: bool) -> ValueId {
        self.insert(Node::new(if value { Data::True } else { Data::False }))
    }

    pub fn create_int(&mut self, value: i64) -> ValueId {
        self.insert(Node::new(Data::Int(value)))
    }

    pub fn create_f64(&mut self, value: f64) -> Result<ValueId> {
        if !value.is_finite() {
            return Err(Error::argument(format!("{value} can not be written as JSON")));
        }
        let mut node = Node::new(Data::Decimal(value));
        node.memo = OnceLock::from(format_decimal(value));
        Ok(self.insert(node))
    }

    /// A big number holding `text` verbatim. The text must be a JSON numeral.
    pub fn create_number(&mut self, text: &str) -> Result<ValueId> {
        if !is_numeral(text) {
            return Err(Error::argument(format!("'{text}' is not a JSON number")));
        }
        let text = self.store_text(text);
        Ok(self.insert(Node::new(Data::BigNumber(text))))
    }

    pub fn create_str(&mut self, value: &str) -> ValueId {
        let text = self.store_text(value);
        self.insert(Node::new(Data::String(text)))
    }

    /// A word is an interned-style token; it is written as a JSON string.
    pub fn create_word(&mut self, value: &str) -> ValueId {
        let text = self.store_text(value);
        self.insert(Node::new(Data::Word(text)))
    }

    /// An application handle. Written as `null` unless opaque output is on.
    pub fn create_opaque(&mut self, handle: u64) -> ValueId {
        self.insert(Node::new(Data::Opaque(handle)))
    }

    pub fn create_array(&mut self) -> ValueId {
        self.insert(Node::new(Data::Array(Vec::new())))
    }

    pub fn create_object(&mut self) -> ValueId {
        self.insert(Node::new(Data::Object(Object::new())))
    }
}

/// Member operations on arrays and objects.
impl ValuePool {
    /// Sets the key of a detached value. Keys of members are fixed; use
    /// the object operations to rename.
    pub fn set_key(&mut self, id: ValueId, key: &str) -> Result<()> {
        if self.node(id)?.parent.is_some() {
            return Err(Error::argument("can not change the key of a container member"));
        }
        self.replace_key(id, Some(key))
    }

    pub fn object_mode(&self, object: ValueId) -> Result<ObjectMode> {
        match &self.node(object)?.data {
            Data::Object(object) => Ok(object.mode()),
            other => Err(not_a(other.kind(), "an object")),
        }
    }

    pub fn set_object_mode(&mut self, object: ValueId, mode: ObjectMode) -> Result<()> {
        self.object_ref(object)?;
        match mode {
            ObjectMode::Raw => self.object_mut(object)?.rebuild_index(None::<[&str; 0]>),
            ObjectMode::Hash => self.reindex(object, true)?,
        }
        Ok(())
    }

    pub fn object_append(&mut self, object: ValueId, key: &str, value: ValueId) -> Result<()> {
        self.object_ref(object)?;
        self.adopt(object, value, Some(key))?;
        self.object_mut(object)?.push(value, key);
        Ok(())
    }

    /// Replaces the first member with `key`, or appends when there is none.
    /// Returns true when a member was replaced.
    pub fn object_replace(&mut self, object: ValueId, key: &str, value: ValueId) -> Result<bool> {
        let position = self.find_key(object, key)?;
        match position {
            Some(position) => {
                self.replace_at_position(object, position, value, Some(key))?;
                Ok(true)
            }
            None => {
                self.object_append(object, key, value)?;
                Ok(false)
            }
        }
    }

    /// Inserts before `position`; positions past the end append.
    pub fn object_insert(
        &mut self,
        object: ValueId,
        position: usize,
        key: &str,
        value: ValueId,
    ) -> Result<()> {
        self.object_ref(object)?;
        self.adopt(object, value, Some(key))?;
        let members = &mut self.object_mut(object)?.members;
        members.insert(position.min(members.len()), value);
        self.reindex(object, false)
    }

    /// Removes and releases every member with `key`.
    pub fn object_remove_by_key(&mut self, object: ValueId, key: &str) -> Result<bool> {
        let doomed: Vec<ValueId> = self
            .object_ref(object)?
            .members
            .iter()
            .copied()
            .filter(|member| self.key_of(*member) == Some(key))
            .collect();
        if doomed.is_empty() {
            return Ok(false);
        }
        self.object_mut(object)?
            .members
            .retain(|member| !doomed.contains(member));
        self.reindex(object, false)?;
        for member in doomed {
            self.orphan(member)?;
            self.free_tree(member);
        }
        Ok(true)
    }

    /// Detaches the first member with `key` and hands it back. The value
    /// keeps its key.
    pub fn object_take(&mut self, object: ValueId, key: &str) -> Result<Option<ValueId>> {
        let Some(position) = self.find_key(object, key)? else {
            return Ok(None);
        };
        let member = self.object_mut(object)?.members.remove(position);
        self.reindex(object, false)?;
        self.orphan(member)?;
        Ok(Some(member))
    }

    pub fn object_get_by_key(&self, object: ValueId, key: &str) -> Result<Option<ValueId>> {
        let position = self.find_key(object, key)?;
        Ok(position.and_then(|position| self.object_ref(object).ok()?.members.get(position).copied()))
    }

    pub fn array_append(&mut self, array: ValueId, value: ValueId) -> Result<()> {
        self.array_ref(array)?;
        self.adopt(array, value, None)?;
        self.array_mut(array)?.push(value);
        Ok(())
    }

    /// Prepends `value`.
    pub fn array_push(&mut self, array: ValueId, value: ValueId) -> Result<()> {
        self.array_insert(array, 0, value)
    }

    /// Detaches and returns the first member.
    pub fn array_pop(&mut self, array: ValueId) -> Result<Option<ValueId>> {
        let members = self.array_mut(array)?;
        if members.is_empty() {
            return Ok(None);
        }
        let head = members.remove(0);
        self.orphan(head)?;
        Ok(Some(head))
    }

    /// Inserts before `position`; positions past the end append.
    pub fn array_insert(&mut self, array: ValueId, position: usize, value: ValueId) -> Result<()> {
        self.array_ref(array)?;
        self.adopt(array, value, None)?;
        let members = self.array_mut(array)?;
        members.insert(position.min(members.len()), value);
        Ok(())
    }

    /// Replaces the member at `position`, releasing the old one. Returns
    /// false when the position is out of range.
    pub fn array_replace(&mut self, array: ValueId, position: usize, value: ValueId) -> Result<bool> {
        if position >= self.array_ref(array)?.len() {
            return Ok(false);
        }
        self.replace_at_position(array, position, value, None)?;
        Ok(true)
    }

    pub fn get_member(&self, container: ValueId, position: usize) -> Result<Option<ValueId>> {
        Ok(self.children_ref(container)?.get(position).copied())
    }

    /// Removes and releases the member at `position` of an array or object.
    pub fn remove_by_pos(&mut self, container: ValueId, position: usize) -> Result<bool> {
        if position >= self.children_ref(container)?.len() {
            return Ok(false);
        }
        let member = match &mut self.node_mut(container)?.data {
            Data::Array(members) => members.remove(position),
            Data::Object(object) => object.members.remove(position),
            _ => return Ok(false),
        };
        self.reindex(container, false)?;
        self.orphan(member)?;
        self.free_tree(member);
        Ok(true)
    }
}

/// Path-addressed mutation. Paths use the syntax of [`crate::ValueRef::get`].
impl ValuePool {
    /// Appends `value` under the last path segment, creating missing
    /// intermediate objects. In an array the last segment is the insert
    /// position.
    pub fn append_at(&mut self, anchor: ValueId, path: &str, value: ValueId) -> Result<()> {
        let (parent, last) = self.walk_creating(anchor, path)?;
        match self.node(parent)?.data.kind() {
            Kind::Object => self.object_append(parent, last, value),
            Kind::Array => {
                let position = parse_index(last)
                    .ok_or_else(|| Error::argument(format!("'{last}' is not an array index")))?;
                self.array_insert(parent, position, value)
            }
            kind => Err(not_a(kind, "a container")),
        }
    }

    /// Replaces the value at `path`, or adds it when missing. Returns true
    /// when an existing value was replaced.
    pub fn set_at(&mut self, anchor: ValueId, path: &str, value: ValueId) -> Result<bool> {
        let (parent, last) = self.walk_creating(anchor, path)?;
        match self.node(parent)?.data.kind() {
            Kind::Object => self.object_replace(parent, last, value),
            Kind::Array => {
                let position = parse_index(last)
                    .ok_or_else(|| Error::argument(format!("'{last}' is not an array index")))?;
                if self.array_replace(parent, position, value)? {
                    Ok(true)
                } else {
                    self.array_append(parent, value)?;
                    Ok(false)
                }
            }
            kind => Err(not_a(kind, "a container")),
        }
    }

    /// Replaces the value at `path`. Returns false, leaving `value`
    /// detached, when nothing is there.
    pub fn replace_at(&mut self, anchor: ValueId, path: &str, value: ValueId) -> Result<bool> {
        let Some((container, position)) = self.locate(anchor, path)? else {
            return Ok(false);
        };
        let key = self.key_of(self.children_ref(container)?[position]).map(SmolStr::new);
        self.replace_at_position(container, position, value, key.as_deref())?;
        Ok(true)
    }

    /// Removes and releases the value at `path`. Returns false when nothing
    /// is there.
    pub fn remove_at(&mut self, anchor: ValueId, path: &str) -> Result<bool> {
        match self.locate(anchor, path)? {
            Some((container, position)) => self.remove_by_pos(container, position),
            None => Ok(false),
        }
    }

    pub fn lookup(&self, anchor: ValueId, path: &str) -> Result<Option<ValueId>> {
        Ok(self.get(anchor)?.get(path).map(|value| value.id()))
    }
}

/// Copies and comparisons.
impl ValuePool {
    /// Deep copy within this pool. The copy is detached and keeps the key.
    pub fn duplicate(&mut self, id: ValueId) -> Result<ValueId> {
        self.node(id)?;
        self.copy_tree(None, id)
    }

    /// Deep copy of a value from another pool into this one.
    pub fn import(&mut self, source: &ValuePool, id: ValueId) -> Result<ValueId> {
        source.node(id)?;
        self.copy_tree(Some(source), id)
    }

    pub fn equals(&self, a: ValueId, b: ValueId) -> Result<bool> {
        Ok(self.get(a)? == self.get(b)?)
    }

    pub fn compare(&self, a: ValueId, b: ValueId) -> Result<Ordering> {
        Ok(self.get(a)?.cmp_value(self.get(b)?))
    }

    fn copy_tree(&mut self, source: Option<&ValuePool>, id: ValueId) -> Result<ValueId> {
        let mut open: Vec<CopyFrame> = Vec::new();
        let mut current = self.copy_node(source, id);
        loop {
            if let Some(child) = current.pending.next() {
                let next = self.copy_node(source, child);
                open.push(std::mem::replace(&mut current, next));
                continue;
            }
            let copy = self.link_copy(source, current)?;
            match open.pop() {
                Some(mut parent) => {
                    parent.copied.push(copy);
                    current = parent;
                }
                None => return Ok(copy),
            }
        }
    }

    /// Copies one node without its members.
    fn copy_node(&mut self, source: Option<&ValuePool>, id: ValueId) -> CopyFrame {
        let (key, shallow, memo, children) = {
            let pool = source.unwrap_or(&*self);
            let node = pool.node_or_detached(id);
            let key = node.key.as_ref().map(|key| SmolStr::new(pool.text(key)));
            let data = match &node.data {
                Data::Null => Shallow::Data(Data::Null),
                Data::True => Shallow::Data(Data::True),
                Data::False => Shallow::Data(Data::False),
                Data::Int(value) => Shallow::Data(Data::Int(*value)),
                Data::Decimal(value) => Shallow::Data(Data::Decimal(*value)),
                Data::Opaque(handle) => Shallow::Data(Data::Opaque(*handle)),
                Data::BigNumber(text) => Shallow::BigNumber(SmolStr::new(pool.text(text))),
                Data::String(text) => Shallow::String(SmolStr::new(pool.text(text))),
                Data::Word(text) => Shallow::Word(SmolStr::new(pool.text(text))),
                Data::Array(_) => Shallow::Array,
                Data::Object(_) => Shallow::Object,
            };
            let memo = node.memo.get().cloned();
            (key, data, memo, node.data.children().to_vec())
        };
        let data = match shallow {
            Shallow::Data(data) => data,
            Shallow::BigNumber(text) => Data::BigNumber(self.store_text(&text)),
            Shallow::String(text) => Data::String(self.store_text(&text)),
            Shallow::Word(text) => Data::Word(self.store_text(&text)),
            Shallow::Array => Data::Array(Vec::with_capacity(children.len())),
            Shallow::Object => Data::Object(Object::new()),
        };
        let mut copy = Node::new(data);
        copy.key = key.map(|key| self.store_text(&key));
        if let Some(memo) = memo {
            copy.memo = OnceLock::from(memo);
        }
        let copied = Vec::with_capacity(children.len());
        CopyFrame {
            source: id,
            copy: self.insert(copy),
            pending: children.into_iter(),
            copied,
        }
    }

    /// Attaches the finished member copies to their container copy.
    fn link_copy(&mut self, source: Option<&ValuePool>, frame: CopyFrame) -> Result<ValueId> {
        let CopyFrame {
            source: from,
            copy,
            copied,
            ..
        } = frame;
        for child in &copied {
            self.node_mut(*child)?.parent = Some(copy);
        }
        match &mut self.node_mut(copy)?.data {
            Data::Array(members) => *members = copied,
            Data::Object(object) => *object = Object::with_members(copied),
            _ => return Ok(copy),
        }
        if source.unwrap_or(&*self).object_mode(from).ok() == Some(ObjectMode::Hash) {
            self.reindex(copy, true)?;
        }
        Ok(copy)
    }
}

/// A container being copied: the source id, its copy, the source members
/// still to copy and the copies made so far.
struct CopyFrame {
    source: ValueId,
    copy: ValueId,
    pending: std::vec::IntoIter<ValueId>,
    copied: Vec<ValueId>,
}

enum Shallow {
    Data(Data),
    BigNumber(SmolStr),
    String(SmolStr),
    Word(SmolStr),
    Array,
    Object,
}

/// Internal helpers.
impl ValuePool {
    fn object_ref(&self, id: ValueId) -> Result<&Object> {
        match &self.node(id)?.data {
            Data::Object(object) => Ok(object),
            other => Err(not_a(other.kind(), "an object")),
        }
    }

    fn object_mut(&mut self, id: ValueId) -> Result<&mut Object> {
        match &mut self.node_mut(id)?.data {
            Data::Object(object) => Ok(object),
            other => Err(not_a(other.kind(), "an object")),
        }
    }

    fn array_ref(&self, id: ValueId) -> Result<&Vec<ValueId>> {
        match &self.node(id)?.data {
            Data::Array(members) => Ok(members),
            other => Err(not_a(other.kind(), "an array")),
        }
    }

    fn array_mut(&mut self, id: ValueId) -> Result<&mut Vec<ValueId>> {
        match &mut self.node_mut(id)?.data {
            Data::Array(members) => Ok(members),
            other => Err(not_a(other.kind(), "an array")),
        }
    }

    fn children_ref(&self, id: ValueId) -> Result<&[ValueId]> {
        match &self.node(id)?.data {
            Data::Array(members) => Ok(members),
            Data::Object(object) => Ok(&object.members),
            other => Err(not_a(other.kind(), "a container")),
        }
    }

    fn find_key(&self, object: ValueId, key: &str) -> Result<Option<usize>> {
        let object = self.object_ref(object)?;
        Ok(match object.indexed(key) {
            Some(positions) => positions.first().map(|position| *position as usize),
            None => object
                .members
                .iter()
                .position(|member| self.key_of(*member) == Some(key)),
        })
    }

    /// Checks that `child` may join `parent` and links it, setting or
    /// clearing its key.
    fn adopt(&mut self, parent: ValueId, child: ValueId, key: Option<&str>) -> Result<()> {
        if self.node(child)?.parent.is_some() {
            return Err(Error::argument("value is already a member of a container"));
        }
        // Only a value with members of its own can hold `parent`; a scalar or
        // an empty container is linked without walking up the tree.
        let mut cursor = if child == parent || !self.node(child)?.data.children().is_empty() {
            Some(parent)
        } else {
            None
        };
        while let Some(ancestor) = cursor {
            if ancestor == child {
                return Err(Error::argument(
                    "a value can not be added to itself or to one of its members",
                ));
            }
            cursor = self.node(ancestor)?.parent;
        }
        self.replace_key(child, key)?;
        self.node_mut(child)?.parent = Some(parent);
        Ok(())
    }

    fn orphan(&mut self, id: ValueId) -> Result<()> {
        self.node_mut(id)?.parent = None;
        Ok(())
    }

    fn replace_key(&mut self, id: ValueId, key: Option<&str>) -> Result<()> {
        self.node(id)?;
        let text = key.map(|key| self.store_text(key));
        let old = std::mem::replace(&mut self.node_mut(id)?.key, text);
        if let Some(old) = old {
            self.texts.free(old);
        }
        Ok(())
    }

    fn replace_at_position(
        &mut self,
        container: ValueId,
        position: usize,
        value: ValueId,
        key: Option<&str>,
    ) -> Result<()> {
        self.adopt(container, value, key)?;
        let old = match &mut self.node_mut(container)?.data {
            Data::Array(members) => members.get_mut(position).map(|slot| std::mem::replace(slot, value)),
            Data::Object(object) => object
                .members
                .get_mut(position)
                .map(|slot| std::mem::replace(slot, value)),
            _ => None,
        };
        let Some(old) = old else {
            self.orphan(value)?;
            return Err(Error::argument(format!("no member at position {position}")));
        };
        self.reindex(container, false)?;
        self.orphan(old)?;
        self.free_tree(old);
        Ok(())
    }

    /// Refreshes the key index of a hashed object. With `force` the index
    /// is built even for a raw object.
    fn reindex(&mut self, id: ValueId, force: bool) -> Result<()> {
        let keys: Vec<SmolStr> = match &self.node(id)?.data {
            Data::Object(object) if force || object.mode() == ObjectMode::Hash => object
                .members
                .iter()
                .map(|member| SmolStr::new(self.key_of(*member).unwrap_or("")))
                .collect(),
            _ => return Ok(()),
        };
        self.object_mut(id)?
            .rebuild_index(Some(keys.iter().map(SmolStr::as_str)));
        Ok(())
    }

    /// Walks all but the last segment of `path`, creating objects for
    /// missing object members.
    fn walk_creating<'a>(&mut self, anchor: ValueId, path: &'a str) -> Result<(ValueId, &'a str)> {
        let path = path.strip_prefix('/').unwrap_or(path);
        let (parents, last) = path.rsplit_once('/').unwrap_or(("", path));
        if last.is_empty() {
            return Err(Error::argument("a path must end in a key or index"));
        }
        let mut current = anchor;
        for segment in parents.split('/').filter(|segment| !segment.is_empty()) {
            let next = match self.node(current)?.data.kind() {
                Kind::Object => match self.find_key(current, segment)? {
                    Some(position) => Some(self.children_ref(current)?[position]),
                    None => None,
                },
                Kind::Array => parse_index(segment)
                    .and_then(|index| self.array_ref(current).ok()?.get(index).copied()),
                kind => return Err(not_a(kind, "a container")),
            };
            current = match next {
                Some(next) => next,
                None if self.node(current)?.data.kind() == Kind::Object => {
                    let created = self.create_object();
                    self.object_append(current, segment, created)?;
                    created
                }
                None => {
                    return Err(Error::argument(format!(
                        "no array member at '{segment}'"
                    )))
                }
            };
        }
        Ok((current, last))
    }

    /// Container and position of the value at `path`, without creating.
    fn locate(&self, anchor: ValueId, path: &str) -> Result<Option<(ValueId, usize)>> {
        let path = path.strip_prefix('/').unwrap_or(path);
        let (parents, last) = path.rsplit_once('/').unwrap_or(("", path));
        if last.is_empty() {
            return Err(Error::argument("a path must end in a key or index"));
        }
        let Some(parent) = self.get(anchor)?.get(parents) else {
            return Ok(None);
        };
        let container = parent.id();
        Ok(match parent.kind() {
            Kind::Object => self.find_key(container, last)?.map(|position| (container, position)),
            Kind::Array => parse_index(last)
                .filter(|index| *index < parent.data().children().len())
                .map(|index| (container, index)),
            _ => None,
        })
    }
}

fn not_a(kind: Kind, wanted: &str) -> Error {
    Error::type_mismatch(format!("{} is not {wanted}", kind.described()))
}
