use log::warn;
use smallvec::SmallVec;

use crate::arena::{ValueId, ValuePool};
use crate::constants::DEFAULT_MAX_DEPTH;
use crate::decode::pool::{put_pool, take_pool};
use crate::document::Document;
use crate::types::Kind;
use crate::{Error, Result};

/// Stack-based construction of a value tree.
///
/// Containers pushed with [`Builder::push_object`] and
/// [`Builder::push_array`] stay open until popped. Members of an object
/// need a key; members of an array must not have one. The first error is
/// kept: every later call returns it again without doing anything, and
/// [`Builder::finish`] reports it.
///
/// At most [`DEFAULT_MAX_DEPTH`] containers may be open at once, the same
/// limit the parser applies; [`Builder::with_max_depth`] changes it.
///
/// ```
/// use pooljson::Builder;
///
/// let mut b = Builder::new();
/// b.push_object(None)?;
/// b.push_int(Some("id"), 7)?;
/// b.push_array(Some("tags"))?;
/// b.push_str(None, "a")?;
/// let doc = b.finish()?;
/// assert_eq!(doc.to_json(0), r#"{"id":7,"tags":["a"]}"#);
/// # Ok::<(), pooljson::Error>(())
/// ```
pub struct Builder {
    pool: ValuePool,
    stack: SmallVec<[ValueId; 16]>,
    root: Option<ValueId>,
    error: Option<Error>,
    max_depth: usize,
}

impl Default for Builder {
    fn default() -> Self {
        Self::new()
    }
}

impl Builder {
    /// A builder over a pool from the process-wide reservoir.
    pub fn new() -> Self {
        Self::with_pool(take_pool())
    }

    pub fn with_pool(pool: ValuePool) -> Self {
        Self {
            pool,
            stack: SmallVec::new(),
            root: None,
            error: None,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn error(&self) -> Option<&Error> {
        self.error.as_ref()
    }

    /// Open containers.
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    pub fn push_object(&mut self, key: Option<&str>) -> Result<()> {
        self.push_with(key, true, ValuePool::create_object)
    }

    pub fn push_array(&mut self, key: Option<&str>) -> Result<()> {
        self.push_with(key, true, ValuePool::create_array)
    }

    pub fn push_null(&mut self, key: Option<&str>) -> Result<()> {
        self.push_with(key, false, ValuePool::create_null)
    }

    pub fn push_bool(&mut self, key: Option<&str>, value: bool) -> Result<()> {
        self.push_with(key, false, |pool| pool.create_bool(value))
    }

    pub fn push_int(&mut self, key: Option<&str>, value: i64) -> Result<()> {
        self.push_with(key, false, |pool| pool.create_int(value))
    }

    pub fn push_double(&mut self, key: Option<&str>, value: f64) -> Result<()> {
        self.check()?;
        let id = self.fail_on(|pool| pool.create_f64(value))?;
        self.attach(key, id, false, true)
    }

    pub fn push_str(&mut self, key: Option<&str>, value: &str) -> Result<()> {
        self.push_with(key, false, |pool| pool.create_str(value))
    }

    /// Pushes a numeral kept verbatim, for numbers beyond `i64` and `f64`.
    pub fn push_number(&mut self, key: Option<&str>, numeral: &str) -> Result<()> {
        self.check()?;
        let id = self.fail_on(|pool| pool.create_number(numeral))?;
        self.attach(key, id, false, true)
    }

    /// Pushes a detached value already in the builder's pool. Containers
    /// pushed this way are complete; they are not opened.
    pub fn push_value(&mut self, key: Option<&str>, id: ValueId) -> Result<()> {
        self.check()?;
        self.fail_on(|pool| pool.get(id).map(|_| ()))?;
        self.attach(key, id, false, false)
    }

    /// Closes the innermost open container.
    pub fn pop(&mut self) -> Result<()> {
        self.check()?;
        if self.stack.pop().is_none() {
            return Err(self.fail(Error::argument("nothing left to pop")));
        }
        Ok(())
    }

    pub fn pop_all(&mut self) -> Result<()> {
        self.check()?;
        self.stack.clear();
        Ok(())
    }

    /// Pool access, for creating values to hand to [`Builder::push_value`].
    pub fn pool_mut(&mut self) -> &mut ValuePool {
        &mut self.pool
    }

    /// Closes whatever is still open and hands over the tree.
    pub fn finish(mut self) -> Result<Document> {
        if let Some(err) = self.error.take() {
            return Err(err);
        }
        let Some(root) = self.root else {
            return Err(Error::argument("nothing was built"));
        };
        let pool = std::mem::take(&mut self.pool);
        Ok(Document::new(pool, root))
    }

    fn check(&self) -> Result<()> {
        match &self.error {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }

    fn fail(&mut self, err: Error) -> Error {
        self.error = Some(err.clone());
        err
    }

    fn fail_on<T>(&mut self, f: impl FnOnce(&mut ValuePool) -> Result<T>) -> Result<T> {
        f(&mut self.pool).map_err(|err| self.fail(err))
    }

    fn push_with(
        &mut self,
        key: Option<&str>,
        open: bool,
        create: impl FnOnce(&mut ValuePool) -> ValueId,
    ) -> Result<()> {
        self.check()?;
        if open && self.stack.len() >= self.max_depth {
            return Err(self.fail(Error::overflow(format!(
                "nesting exceeds the limit of {} levels",
                self.max_depth
            ))));
        }
        let id = create(&mut self.pool);
        self.attach(key, id, open, true)
    }

    /// Links `id` under the open container. On failure a value the builder
    /// created itself is released again.
    fn attach(&mut self, key: Option<&str>, id: ValueId, open: bool, created: bool) -> Result<()> {
        let attached = match (self.stack.last().copied(), self.root) {
            (None, None) => {
                self.root = Some(id);
                Ok(())
            }
            (None, Some(_)) => Err(Error::argument(
                "can not push after all elements have been closed",
            )),
            (Some(parent), _) => match (self.pool.get(parent).map(|p| p.kind()), key) {
                (Ok(Kind::Array), None) => self.pool.array_append(parent, id),
                (Ok(Kind::Array), Some(_)) => {
                    Err(Error::argument("a key is not needed to push to an array"))
                }
                (Ok(Kind::Object), Some(key)) => self.pool.object_append(parent, key, id),
                (Ok(Kind::Object), None) => {
                    Err(Error::argument("a key is required to push to an object"))
                }
                (Ok(kind), _) => Err(Error::type_mismatch(format!(
                    "can not push onto {}",
                    kind.described()
                ))),
                (Err(err), _) => Err(err),
            },
        };
        match attached {
            Ok(()) => {
                if open {
                    self.stack.push(id);
                }
                Ok(())
            }
            Err(err) => {
                if created {
                    // `id` was made by this call and never linked, so the
                    // release only fails if it already was; keep the first error.
                    if let Err(release) = self.pool.release(id) {
                        warn!("builder could not release a rejected value: {release}");
                    }
                }
                Err(self.fail(err))
            }
        }
    }
}

impl Drop for Builder {
    fn drop(&mut self) {
        put_pool(std::mem::take(&mut self.pool));
    }
}
