mod text;

use std::fmt;
use std::sync::OnceLock;

use log::{debug, trace, warn};
use smallvec::SmallVec;
use smol_str::SmolStr;

pub(crate) use self::text::{BlockStore, Text};
use crate::constants::BATCH_SIZE;
use crate::types::object::Object;
use crate::{Error, Result, ValueRef};

/// Handle to a node in a [`ValuePool`].
///
/// The generation makes a handle to a released node detectably stale,
/// even after its slot has been reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ValueId {
    index: u32,
    generation: u32,
}

impl ValueId {
    pub fn index(self) -> u32 {
        self.index
    }

    pub fn generation(self) -> u32 {
        self.generation
    }
}

impl fmt::Display for ValueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}v{}", self.index, self.generation)
    }
}

#[derive(Debug)]
pub(crate) enum Data {
    Null,
    True,
    False,
    Int(i64),
    Decimal(f64),
    BigNumber(Text),
    String(Text),
    Word(Text),
    Array(Vec<ValueId>),
    Object(Object),
    Opaque(u64),
}

impl Data {
    pub(crate) fn children(&self) -> &[ValueId] {
        match self {
            Data::Array(members) => members,
            Data::Object(object) => &object.members,
            _ => &[],
        }
    }
}

#[derive(Debug)]
pub(crate) struct Node {
    pub(crate) key: Option<Text>,
    pub(crate) data: Data,
    /// Formatted number text, filled on first write or at parse time.
    pub(crate) memo: OnceLock<SmolStr>,
    pub(crate) parent: Option<ValueId>,
}

impl Node {
    pub(crate) const fn new(data: Data) -> Self {
        Self {
            key: None,
            data,
            memo: OnceLock::new(),
            parent: None,
        }
    }
}

/// Stands in for a node that can no longer be reached; never observed
/// through a [`ValueRef`] obtained from a checked lookup.
pub(crate) static DETACHED: Node = Node::new(Data::Null);

#[derive(Debug)]
enum Slot {
    Live { generation: u32, node: Node },
    Free { generation: u32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PoolStats {
    pub live: usize,
    pub free: usize,
    pub blocks_live: usize,
    pub blocks_free: usize,
}

/// Slab of value nodes with a free index stack and pooled string blocks.
///
/// Nodes are addressed by [`ValueId`]. Releasing a node returns it and
/// everything below it to the free lists; the next allocation reuses the
/// slot under a new generation.
#[derive(Debug, Default)]
pub struct ValuePool {
    slots: Vec<Slot>,
    free: Vec<u32>,
    pub(crate) texts: BlockStore,
    generation: u32,
    live: usize,
}

impl ValuePool {
    pub const fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            texts: BlockStore::new(),
            generation: 0,
            live: 0,
        }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let mut pool = Self::new();
        pool.slots.reserve(capacity);
        pool
    }

    /// Number of live nodes.
    pub fn len(&self) -> usize {
        self.live
    }

    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    pub fn stats(&self) -> PoolStats {
        PoolStats {
            live: self.live,
            free: self.free.len(),
            blocks_live: self.texts.live(),
            blocks_free: self.texts.free_count(),
        }
    }

    /// True while `id` names a live node of this pool.
    pub fn contains(&self, id: ValueId) -> bool {
        self.node(id).is_ok()
    }

    pub fn get(&self, id: ValueId) -> Result<ValueRef<'_>> {
        self.node(id)?;
        Ok(ValueRef::new(self, id))
    }

    /// Allocates a detached null node.
    pub fn allocate(&mut self) -> ValueId {
        self.insert(Node::new(Data::Null))
    }

    /// Allocates `count` detached null nodes, taking recycled slots off the
    /// free stack in one move.
    pub fn allocate_batch(&mut self, count: usize) -> SmallVec<[ValueId; BATCH_SIZE]> {
        let recycled = count.min(self.free.len());
        let taken = self.free.split_off(self.free.len() - recycled);
        let mut ids = SmallVec::with_capacity(count);
        for index in taken.into_iter().rev() {
            let generation = self.next_generation();
            self.slots[index as usize] = Slot::Live {
                generation,
                node: Node::new(Data::Null),
            };
            ids.push(ValueId { index, generation });
        }
        self.slots.reserve(count - recycled);
        for _ in recycled..count {
            let generation = self.next_generation();
            let index = self.slots.len() as u32;
            self.slots.push(Slot::Live {
                generation,
                node: Node::new(Data::Null),
            });
            ids.push(ValueId { index, generation });
        }
        self.live += count;
        trace!("allocated batch of {count} nodes, {recycled} recycled");
        ids
    }

    /// Releases `id` and its whole subtree.
    ///
    /// Fails with a memory error when `id` was already released, and with
    /// an argument error while it is still a member of a container.
    pub fn release(&mut self, id: ValueId) -> Result<()> {
        match self.node(id) {
            Ok(node) if node.parent.is_some() => {
                return Err(Error::argument(
                    "value is still a member of a container; remove it instead",
                ));
            }
            Ok(_) => {}
            Err(_) => {
                warn!("rejected release of {id}: value already freed");
                return Err(Error::memory("value already freed"));
            }
        }
        self.free_tree(id);
        Ok(())
    }

    pub fn release_batch<I>(&mut self, ids: I) -> Result<()>
    where
        I: IntoIterator<Item = ValueId>,
    {
        let mut first_error = None;
        for id in ids {
            if let Err(err) = self.release(id) {
                first_error.get_or_insert(err);
            }
        }
        match first_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Hands unused slots and string blocks back to the allocator. Live
    /// nodes keep their ids.
    pub fn cleanup(&mut self) {
        let before = self.slots.len();
        while matches!(self.slots.last(), Some(Slot::Free { .. })) {
            self.slots.pop();
        }
        self.free = self
            .slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| matches!(slot, Slot::Free { .. }))
            .map(|(index, _)| index as u32)
            .collect();
        self.slots.shrink_to_fit();
        let blocks = self.texts.shrink();
        debug!(
            "pool cleanup dropped {} slots and {blocks} string blocks, {} live",
            before - self.slots.len(),
            self.live
        );
    }

    /// Frees every node at once, keeping the storage for reuse. Ids handed
    /// out before the reset become stale.
    pub(crate) fn reset(&mut self) {
        self.free.clear();
        for (index, slot) in self.slots.iter_mut().enumerate().rev() {
            let generation = match slot {
                Slot::Live { generation, .. } | Slot::Free { generation } => *generation,
            };
            *slot = Slot::Free { generation };
            self.free.push(index as u32);
        }
        self.texts.reset();
        self.live = 0;
    }

    pub(crate) fn node(&self, id: ValueId) -> Result<&Node> {
        match self.slots.get(id.index as usize) {
            Some(Slot::Live { generation, node }) if *generation == id.generation => Ok(node),
            _ => Err(stale(id)),
        }
    }

    pub(crate) fn node_mut(&mut self, id: ValueId) -> Result<&mut Node> {
        match self.slots.get_mut(id.index as usize) {
            Some(Slot::Live { generation, node }) if *generation == id.generation => Ok(node),
            _ => Err(stale(id)),
        }
    }

    /// Node lookup for ids reached through live containers.
    pub(crate) fn node_or_detached(&self, id: ValueId) -> &Node {
        self.node(id).unwrap_or(&DETACHED)
    }

    pub(crate) fn insert(&mut self, node: Node) -> ValueId {
        let generation = self.next_generation();
        self.live += 1;
        if let Some(index) = self.free.pop() {
            self.slots[index as usize] = Slot::Live { generation, node };
            return ValueId { index, generation };
        }
        let index = self.slots.len() as u32;
        self.slots.push(Slot::Live { generation, node });
        ValueId { index, generation }
    }

    pub(crate) fn store_text(&mut self, value: &str) -> Text {
        self.texts.store(value)
    }

    pub(crate) fn text<'a>(&'a self, text: &'a Text) -> &'a str {
        self.texts.resolve(text)
    }

    pub(crate) fn key_of(&self, id: ValueId) -> Option<&str> {
        self.node_or_detached(id)
            .key
            .as_ref()
            .map(|key| self.texts.resolve(key))
    }

    /// Releases a subtree without the membership check. The caller has
    /// already unlinked `id` from its parent.
    pub(crate) fn free_tree(&mut self, id: ValueId) {
        let mut pending: SmallVec<[ValueId; 16]> = SmallVec::new();
        pending.push(id);
        while let Some(id) = pending.pop() {
            let Some(slot) = self.slots.get_mut(id.index as usize) else {
                continue;
            };
            let node = match std::mem::replace(
                slot,
                Slot::Free {
                    generation: id.generation,
                },
            ) {
                Slot::Live { generation, node } if generation == id.generation => node,
                other => {
                    *slot = other;
                    continue;
                }
            };
            self.free.push(id.index);
            self.live -= 1;
            if let Some(key) = node.key {
                self.texts.free(key);
            }
            match node.data {
                Data::BigNumber(text) | Data::String(text) | Data::Word(text) => {
                    self.texts.free(text)
                }
                Data::Array(members) => pending.extend(members),
                Data::Object(object) => pending.extend(object.members),
                _ => {}
            }
        }
    }

    fn next_generation(&mut self) -> u32 {
        self.generation = self.generation.wrapping_add(1);
        self.generation
    }
}

fn stale(id: ValueId) -> Error {
    Error::memory(format!("value {id} has been released"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;

    #[rstest::rstest]
    fn test_release_recycles_slot_with_new_generation() {
        let mut pool = ValuePool::new();
        let first = pool.allocate();
        pool.release(first).unwrap();
        let second = pool.allocate();
        assert_eq!(first.index(), second.index());
        assert_ne!(first.generation(), second.generation());
        assert!(!pool.contains(first));
        assert!(pool.contains(second));
    }

    #[rstest::rstest]
    fn test_double_release_is_memory_error() {
        let mut pool = ValuePool::new();
        let id = pool.allocate();
        assert!(pool.release(id).is_ok());
        let err = pool.release(id).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Memory);
        assert_eq!(err.message, "value already freed");
        assert_eq!(pool.stats().free, 1);
    }

    #[rstest::rstest]
    fn test_batch_takes_recycled_slots_first() {
        let mut pool = ValuePool::new();
        let ids: Vec<_> = (0..4).map(|_| pool.allocate()).collect();
        pool.release_batch(ids.iter().copied()).unwrap();
        let batch = pool.allocate_batch(6);
        assert_eq!(batch.len(), 6);
        assert_eq!(pool.len(), 6);
        assert_eq!(pool.stats().free, 0);
        let mut indexes: Vec<_> = batch.iter().map(|id| id.index()).collect();
        indexes.sort_unstable();
        assert_eq!(indexes, vec![0, 1, 2, 3, 4, 5]);
    }

    #[rstest::rstest]
    fn test_release_frees_subtree_and_blocks() {
        let mut pool = ValuePool::new();
        let array = pool.create_array();
        let long = "z".repeat(100);
        let text = pool.create_str(&long);
        pool.array_append(array, text).unwrap();
        let inner = pool.create_object();
        let member = pool.create_int(3);
        pool.object_append(inner, "k", member).unwrap();
        pool.array_append(array, inner).unwrap();
        assert_eq!(pool.len(), 5);
        assert_eq!(pool.stats().blocks_live, 1);

        pool.release(array).unwrap();
        assert!(pool.is_empty());
        assert_eq!(pool.stats().blocks_live, 0);
        assert!(!pool.contains(member));
    }

    #[rstest::rstest]
    fn test_release_of_member_is_rejected() {
        let mut pool = ValuePool::new();
        let array = pool.create_array();
        let item = pool.create_null();
        pool.array_append(array, item).unwrap();
        let err = pool.release(item).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Argument);
        assert!(pool.contains(item));
    }

    #[rstest::rstest]
    fn test_cleanup_keeps_live_ids() {
        let mut pool = ValuePool::new();
        let keep = pool.create_str("kept");
        let drop: Vec<_> = (0..10).map(|_| pool.allocate()).collect();
        pool.release_batch(drop).unwrap();
        pool.cleanup();
        assert_eq!(pool.stats(), PoolStats { live: 1, free: 0, blocks_live: 0, blocks_free: 0 });
        assert_eq!(pool.get(keep).unwrap().as_str().unwrap(), "kept");
    }

    #[rstest::rstest]
    fn test_reset_invalidates_ids() {
        let mut pool = ValuePool::new();
        let id = pool.create_int(1);
        pool.reset();
        assert!(pool.is_empty());
        assert!(pool.get(id).is_err());
        let next = pool.create_int(2);
        assert_eq!(pool.get(next).unwrap().as_int().unwrap(), 2);
    }
}
