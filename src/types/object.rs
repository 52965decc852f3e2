use std::collections::HashMap;

use smallvec::SmallVec;
use smol_str::SmolStr;

use crate::arena::ValueId;

/// Member layout of an object.
///
/// Both modes keep members in insertion order; hash mode adds a key index
/// for lookups on large objects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ObjectMode {
    #[default]
    Raw,
    Hash,
}

type KeyIndex = HashMap<SmolStr, SmallVec<[u32; 1]>>;

#[derive(Debug, Default)]
pub(crate) struct Object {
    pub(crate) members: Vec<ValueId>,
    index: Option<KeyIndex>,
}

impl Object {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_members(members: Vec<ValueId>) -> Self {
        Self {
            members,
            index: None,
        }
    }

    pub(crate) fn mode(&self) -> ObjectMode {
        if self.index.is_some() {
            ObjectMode::Hash
        } else {
            ObjectMode::Raw
        }
    }

    pub(crate) fn push(&mut self, id: ValueId, key: &str) {
        let position = self.members.len() as u32;
        self.members.push(id);
        if let Some(index) = self.index.as_mut() {
            index.entry(SmolStr::new(key)).or_default().push(position);
        }
    }

    /// Positions of members with `key`, when the object is hashed.
    pub(crate) fn indexed(&self, key: &str) -> Option<&[u32]> {
        let index = self.index.as_ref()?;
        Some(index.get(key).map(|positions| positions.as_slice()).unwrap_or(&[]))
    }

    /// Rebuilds the key index from member keys listed in member order.
    /// Passing `None` drops the index and returns the object to raw mode.
    pub(crate) fn rebuild_index<'k, I>(&mut self, keys: Option<I>)
    where
        I: IntoIterator<Item = &'k str>,
    {
        self.index = keys.map(|keys| {
            let mut index = KeyIndex::with_capacity(self.members.len());
            for (position, key) in keys.into_iter().enumerate() {
                index.entry(SmolStr::new(key)).or_default().push(position as u32);
            }
            index
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ValuePool;

    #[rstest::rstest]
    fn test_index_tracks_pushes() {
        let mut pool = ValuePool::new();
        let ids: Vec<_> = (0..3).map(|_| pool.allocate()).collect();
        let mut object = Object::new();
        object.push(ids[0], "a");
        assert_eq!(object.mode(), ObjectMode::Raw);
        assert!(object.indexed("a").is_none());

        object.rebuild_index(Some(["a"]));
        assert_eq!(object.mode(), ObjectMode::Hash);
        object.push(ids[1], "b");
        object.push(ids[2], "a");
        assert_eq!(object.indexed("a"), Some(&[0, 2][..]));
        assert_eq!(object.indexed("b"), Some(&[1][..]));
        assert_eq!(object.indexed("zzz"), Some(&[][..]));

        object.rebuild_index(None::<[&str; 0]>);
        assert_eq!(object.mode(), ObjectMode::Raw);
    }
}
