use std::sync::OnceLock;

use log::trace;
use smallvec::SmallVec;
use smol_str::SmolStr;

use crate::arena::{Data, Node, ValueId, ValuePool};
use crate::constants::BATCH_SIZE;
use crate::decode::parser::{Container, Scalar, Sink};
use crate::decode::sax::CallbackOp;
use crate::types::object::{Object, ObjectMode};
use crate::{Error, Result};

/// Decides what happens to each completed top-level value.
pub(crate) trait DocumentHandler {
    fn document(&mut self, pool: &mut ValuePool, root: ValueId) -> CallbackOp;
}

/// Keeps the root of a single-document parse.
#[derive(Default)]
pub(crate) struct KeepFirst {
    pub(crate) root: Option<ValueId>,
}

impl DocumentHandler for KeepFirst {
    fn document(&mut self, _pool: &mut ValuePool, root: ValueId) -> CallbackOp {
        self.root = Some(root);
        CallbackOp::CONTINUE
    }
}

pub(crate) struct EachDocument<F>(pub(crate) F);

impl<F> DocumentHandler for EachDocument<F>
where
    F: FnMut(&mut ValuePool, ValueId) -> CallbackOp,
{
    fn document(&mut self, pool: &mut ValuePool, root: ValueId) -> CallbackOp {
        (self.0)(pool, root)
    }
}

/// Builds values in a pool as parse events arrive. Nodes are taken from
/// the pool a batch at a time.
pub(crate) struct TreeSink<'p, H> {
    pool: &'p mut ValuePool,
    handler: H,
    stack: SmallVec<[ValueId; 32]>,
    root: Option<ValueId>,
    ready: SmallVec<[ValueId; BATCH_SIZE]>,
    hash_threshold: Option<usize>,
}

impl<'p, H: DocumentHandler> TreeSink<'p, H> {
    pub(crate) fn new(pool: &'p mut ValuePool, handler: H, hash_threshold: Option<usize>) -> Self {
        Self {
            pool,
            handler,
            stack: SmallVec::new(),
            root: None,
            ready: SmallVec::new(),
            hash_threshold,
        }
    }

    /// Gives up the sink, releasing its borrow of the pool.
    pub(crate) fn into_handler(self) -> H {
        self.handler
    }

    fn next_id(&mut self) -> ValueId {
        if let Some(id) = self.ready.pop() {
            return id;
        }
        self.ready = self.pool.allocate_batch(BATCH_SIZE);
        self.ready.reverse();
        match self.ready.pop() {
            Some(id) => id,
            None => self.pool.allocate(),
        }
    }

    /// Fills a fresh node and links it under the open container.
    fn place(&mut self, key: Option<&str>, data: Data, memo: Option<&str>) -> Result<ValueId> {
        let id = self.next_id();
        let parent = self.stack.last().copied();
        let key_text = key.map(|key| self.pool.store_text(key));
        let node = self.pool.node_mut(id)?;
        *node = Node::new(data);
        node.key = key_text;
        node.parent = parent;
        if let Some(memo) = memo {
            node.memo = OnceLock::from(SmolStr::from(memo));
        }
        match parent {
            Some(parent) => match &mut self.pool.node_mut(parent)?.data {
                Data::Array(members) => members.push(id),
                Data::Object(object) => object.members.push(id),
                _ => return Err(Error::parse("value placed outside a container")),
            },
            None => self.root = Some(id),
        }
        Ok(id)
    }

    /// Returns unused batch nodes to the pool.
    fn return_ready(&mut self) {
        let ready = std::mem::take(&mut self.ready);
        for id in ready {
            self.pool.free_tree(id);
        }
    }

    /// Releases whatever was built for an unfinished document.
    pub(crate) fn abandon(&mut self) {
        self.return_ready();
        self.stack.clear();
        if let Some(root) = self.root.take() {
            self.pool.free_tree(root);
        }
    }
}

impl<H: DocumentHandler> Sink for TreeSink<'_, H> {
    fn open(&mut self, key: Option<&str>, container: Container) -> Result<()> {
        let data = match container {
            Container::Array => Data::Array(Vec::new()),
            Container::Object => Data::Object(Object::new()),
        };
        let id = self.place(key, data, None)?;
        self.stack.push(id);
        Ok(())
    }

    fn close(&mut self, container: Container) -> Result<()> {
        let Some(id) = self.stack.pop() else {
            return Err(Error::parse("close without an open container"));
        };
        if container == Container::Object {
            let large = match self.hash_threshold {
                Some(threshold) => self.pool.node(id)?.data.children().len() > threshold,
                None => false,
            };
            if large {
                self.pool.set_object_mode(id, ObjectMode::Hash)?;
            }
        }
        Ok(())
    }

    fn scalar(&mut self, key: Option<&str>, value: Scalar<'_>) -> Result<()> {
        let (data, memo) = match value {
            Scalar::Null => (Data::Null, None),
            Scalar::Bool(true) => (Data::True, None),
            Scalar::Bool(false) => (Data::False, None),
            Scalar::Int(value) => (Data::Int(value), None),
            Scalar::Decimal(value, text) => (Data::Decimal(value), Some(text)),
            Scalar::BigNumber(text) => (Data::BigNumber(self.pool.store_text(text)), None),
            Scalar::String(text) => (Data::String(self.pool.store_text(text)), None),
        };
        self.place(key, data, memo)?;
        Ok(())
    }

    fn document(&mut self) -> Result<()> {
        self.return_ready();
        let Some(root) = self.root.take() else {
            return Ok(());
        };
        trace!("document complete, root {root}");
        let op = self.handler.document(self.pool, root);
        if op.contains(CallbackOp::DESTROY) {
            self.pool.release(root)?;
        }
        if op.contains(CallbackOp::STOP) {
            return Err(Error::abort());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::parser::Machine;
    use crate::reader::Reader;
    use crate::ParseOptions;

    fn build(input: &str, pool: &mut ValuePool) -> Result<ValueId> {
        let mut sink = TreeSink::new(pool, KeepFirst::default(), None);
        let result =
            Machine::new(Reader::from_str(input), &mut sink, &ParseOptions::default(), false).run();
        if let Err(err) = result {
            sink.abandon();
            return Err(err);
        }
        sink.into_handler().root.ok_or_else(|| Error::incomplete("no value"))
    }

    #[rstest::rstest]
    fn test_unused_batch_nodes_are_returned() {
        let mut pool = ValuePool::new();
        let root = build(r#"{"a":[1,2],"b":"x"}"#, &mut pool).unwrap();
        assert_eq!(pool.len(), 5);
        assert_eq!(pool.get(root).unwrap().to_json(0), r#"{"a":[1,2],"b":"x"}"#);
    }

    #[rstest::rstest]
    fn test_failed_parse_leaves_pool_empty() {
        let mut pool = ValuePool::new();
        let err = build(r#"{"a":[1,2,{"b":"#, &mut pool).unwrap_err();
        assert_eq!(err.kind, crate::ErrorKind::Incomplete);
        assert!(pool.is_empty());
    }

    #[rstest::rstest]
    fn test_decimal_keeps_source_text() {
        let mut pool = ValuePool::new();
        let root = build("[1.50,2e-3]", &mut pool).unwrap();
        assert_eq!(pool.get(root).unwrap().to_json(0), "[1.50,2e-3]");
    }
}
