use std::fmt;

use crate::arena::{ValueId, ValuePool};
use crate::decode::pool::put_pool;
use crate::{Result, ValueRef};

/// A parsed document: a pool plus the id of its root value.
///
/// Dropping the document hands the pool back to the process-wide
/// reservoir, where the next parse picks it up.
pub struct Document {
    pool: ValuePool,
    root: ValueId,
}

impl Document {
    pub(crate) fn new(pool: ValuePool, root: ValueId) -> Self {
        Self { pool, root }
    }

    /// Wraps a pool built by hand. `root` must be live in `pool`.
    pub fn from_parts(pool: ValuePool, root: ValueId) -> Result<Self> {
        pool.get(root)?;
        Ok(Self { pool, root })
    }

    pub fn root(&self) -> ValueRef<'_> {
        ValueRef::new(&self.pool, self.root)
    }

    pub fn root_id(&self) -> ValueId {
        self.root
    }

    pub fn pool(&self) -> &ValuePool {
        &self.pool
    }

    /// Mutable access for editing the tree in place. If the root itself is
    /// replaced, point the document at the new one with [`Document::set_root`].
    pub fn pool_mut(&mut self) -> &mut ValuePool {
        &mut self.pool
    }

    pub fn set_root(&mut self, root: ValueId) -> Result<()> {
        self.pool.get(root)?;
        self.root = root;
        Ok(())
    }

    pub fn to_json(&self, indent: usize) -> String {
        self.root().to_json(indent)
    }

    /// Takes the pool out; it is not returned to the reservoir.
    pub fn into_parts(mut self) -> (ValuePool, ValueId) {
        (std::mem::take(&mut self.pool), self.root)
    }
}

impl Drop for Document {
    fn drop(&mut self) {
        put_pool(std::mem::take(&mut self.pool));
    }
}

impl fmt::Debug for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Document")
            .field("root", &self.root)
            .field("stats", &self.pool.stats())
            .finish()
    }
}

impl fmt::Display for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.root(), f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::pool::{cleanup, pooled};
    use crate::parse_str;

    #[rstest::rstest]
    fn test_drop_returns_pool_to_reservoir() {
        cleanup();
        let doc = parse_str(r#"{"x":true,"y":false}"#).unwrap();
        assert_eq!(pooled(), 0);
        drop(doc);
        assert_eq!(pooled(), 1);

        let again = parse_str("[1,2,3]").unwrap();
        assert_eq!(pooled(), 0);
        assert_eq!(again.to_json(0), "[1,2,3]");
    }

    #[rstest::rstest]
    fn test_into_parts_keeps_tree() {
        let doc = parse_str(r#"{"a":[true]}"#).unwrap();
        let (pool, root) = doc.into_parts();
        assert_eq!(pool.get(root).unwrap().to_json(0), r#"{"a":[true]}"#);
    }

    #[rstest::rstest]
    fn test_edit_and_reroot() {
        let mut doc = parse_str(r#"{"keep":{"n":1},"drop":2}"#).unwrap();
        let root = doc.root_id();
        let pool = doc.pool_mut();
        let keep = pool.object_take(root, "keep").unwrap().unwrap();
        pool.release(root).unwrap();
        doc.set_root(keep).unwrap();
        assert_eq!(doc.to_json(0), r#"{"n":1}"#);
        assert!(doc.set_root(root).is_err());
    }
}
