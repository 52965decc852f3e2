use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{sync_channel, SyncSender};
use std::sync::Arc;
use std::thread::JoinHandle;

use log::{debug, info, warn};

use crate::arena::ValuePool;
use crate::constants::CALLER_QUEUE;
use crate::decode::pool::take_pool;
use crate::decode::{Outcome, Parser};
use crate::document::Document;
use crate::{CallbackOp, Error, Result};

/// Hands parsed documents to a callback running on its own thread.
///
/// Documents travel through a queue of [`CALLER_QUEUE`] slots, so a
/// producer that outruns the callback blocks instead of piling up memory.
/// The callback's flags are honored on the worker:
/// [`CallbackOp::DESTROY`] drops the document right away and
/// [`CallbackOp::STOP`] makes the producer stop after the current one.
/// Documents that are not destroyed are returned by [`Caller::wait`].
///
/// Dropped documents give their pool to the reservoir of the worker
/// thread. Turn on [`crate::decode::pool::set_thread_safe`] to let the
/// producer reuse them.
///
/// ```
/// use pooljson::{CallbackOp, Caller, Parser};
///
/// let mut caller = Caller::start(|doc: &mut pooljson::Document| {
///     if doc.root().as_int() == Ok(2) { CallbackOp::DESTROY } else { CallbackOp::CONTINUE }
/// });
/// caller.parse(Parser::from_str("1 2 3")).unwrap();
/// let kept = caller.wait().unwrap();
/// assert_eq!(kept.len(), 2);
/// ```
pub struct Caller {
    sender: Option<SyncSender<Document>>,
    worker: Option<JoinHandle<Vec<Document>>>,
    stopped: Arc<AtomicBool>,
    scratch: ValuePool,
}

impl Caller {
    pub fn start<F>(mut callback: F) -> Self
    where
        F: FnMut(&mut Document) -> CallbackOp + Send + 'static,
    {
        let (sender, receiver) = sync_channel::<Document>(CALLER_QUEUE);
        let stopped = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&stopped);
        let worker = std::thread::spawn(move || {
            let mut kept = Vec::new();
            for mut doc in receiver {
                let op = callback(&mut doc);
                if op.contains(CallbackOp::STOP) {
                    flag.store(true, Ordering::Release);
                }
                if op.contains(CallbackOp::DESTROY) {
                    drop(doc);
                } else {
                    kept.push(doc);
                }
            }
            debug!("caller worker done, {} documents kept", kept.len());
            kept
        });
        info!("caller worker started with a queue of {CALLER_QUEUE}");
        Self {
            sender: Some(sender),
            worker: Some(worker),
            stopped,
            scratch: ValuePool::new(),
        }
    }

    /// True once the callback has asked to stop.
    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::Acquire)
    }

    /// Queues a document for the callback. Blocks while the queue is full.
    /// Returns `false`, without queueing, once the callback has stopped.
    pub fn send(&mut self, doc: Document) -> Result<bool> {
        if self.is_stopped() {
            return Ok(false);
        }
        let Some(sender) = &self.sender else {
            return Ok(false);
        };
        match sender.send(doc) {
            Ok(()) => Ok(true),
            Err(_) => Err(Error::argument("caller worker is gone")),
        }
    }

    /// Parses every document of `parser`'s input and queues each one as it
    /// completes. Ends early with [`Outcome::Stopped`] when the callback
    /// asks to stop.
    pub fn parse(&mut self, parser: Parser<'_>) -> Result<Outcome> {
        let mut scratch = std::mem::take(&mut self.scratch);
        let mut failed = None;
        let result = parser.parse_each(&mut scratch, |pool, root| {
            let mut target = take_pool();
            let sent = target
                .import(pool, root)
                .and_then(|copy| self.send(Document::new(target, copy)));
            match sent {
                Ok(true) => CallbackOp::DESTROY,
                Ok(false) => CallbackOp::DESTROY | CallbackOp::STOP,
                Err(err) => {
                    failed = Some(err);
                    CallbackOp::DESTROY | CallbackOp::STOP
                }
            }
        });
        self.scratch = scratch;
        match failed {
            Some(err) => Err(err),
            None => result,
        }
    }

    /// Closes the queue, waits for the callback to drain it and returns the
    /// documents it kept.
    pub fn wait(mut self) -> Result<Vec<Document>> {
        self.finish()
    }

    fn finish(&mut self) -> Result<Vec<Document>> {
        self.sender = None;
        let Some(worker) = self.worker.take() else {
            return Ok(Vec::new());
        };
        let kept = worker
            .join()
            .map_err(|_| Error::argument("caller worker panicked"))?;
        info!("caller finished with {} documents kept", kept.len());
        Ok(kept)
    }
}

impl Drop for Caller {
    fn drop(&mut self) {
        if let Err(err) = self.finish() {
            warn!("caller dropped without a clean finish: {err}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[rstest::rstest]
    fn test_callback_sees_every_document_in_order() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let record = Arc::clone(&seen);
        let mut caller = Caller::start(move |doc: &mut Document| {
            record.lock().unwrap().push(doc.to_json(0));
            CallbackOp::DESTROY
        });
        let input: String = (0..40).map(|i| format!("{{\"n\":{i}}} ")).collect();
        let outcome = caller.parse(Parser::from_str(&input)).unwrap();
        assert_eq!(outcome, Outcome::Complete);
        assert!(caller.wait().unwrap().is_empty());
        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 40);
        assert_eq!(seen[39], r#"{"n":39}"#);
    }

    #[rstest::rstest]
    fn test_stop_ends_the_producer() {
        let mut caller = Caller::start(|doc: &mut Document| {
            if doc.root().as_int() == Ok(3) {
                CallbackOp::STOP
            } else {
                CallbackOp::CONTINUE
            }
        });
        let input: String = (1..=200).map(|i| format!("{i} ")).collect();
        let outcome = caller.parse(Parser::from_str(&input)).unwrap();
        assert_eq!(outcome, Outcome::Stopped);
        let kept = caller.wait().unwrap();
        // The queue may hold documents sent before the stop was seen.
        assert!(kept.len() >= 3 && kept.len() <= 3 + CALLER_QUEUE + 1);
        assert_eq!(kept[2].root().as_int().unwrap(), 3);
    }

    #[rstest::rstest]
    fn test_parse_error_is_returned() {
        let mut caller = Caller::start(|_: &mut Document| CallbackOp::CONTINUE);
        let err = caller.parse(Parser::from_str("[1] [2")).unwrap_err();
        assert_eq!(err.kind, crate::ErrorKind::Incomplete);
        assert_eq!(caller.wait().unwrap().len(), 1);
    }
}
