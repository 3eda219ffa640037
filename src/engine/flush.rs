//! Background flush worker.
//!
//! One worker thread per engine consumes [`FlushMessage`]s from the
//! bounded handoff channel. Each `Flush` persists the oldest frozen
//! memtable as an SSTable and publishes a snapshot replacing it with the
//! table; `Stop` terminates the loop. The engine is the sole sender, the
//! worker the sole receiver, and channel FIFO ordering guarantees that a
//! `Stop` is observed only after every earlier `Flush`.
//!
//! Flush failures are retried a bounded number of times with backoff.
//! After exhausting the retries the memtable stays on the queue — readers
//! keep serving it from memory, a later flush message retries it, and
//! `close()` makes the final attempt with the error surfaced to the
//! caller.

use std::{sync::Arc, thread, time::Duration};

use crossbeam::channel::Receiver;
use tracing::{debug, error, info, warn};

use crate::sstable::SSTable;

use super::{EngineCore, EngineError, StoreState};

/// Messages carried by the engine→worker handoff channel.
pub(crate) enum FlushMessage {
    /// Persist the oldest frozen memtable.
    Flush,

    /// Terminate the worker. Sent exactly once, at engine close.
    Stop,
}

/// Attempts per flush message before the failure is logged and deferred.
const FLUSH_RETRY_LIMIT: u32 = 3;

/// Base backoff between retries; grows linearly with the attempt number.
const FLUSH_RETRY_BACKOFF: Duration = Duration::from_millis(20);

/// Worker loop. Runs on its own thread until `Stop` arrives or the
/// channel disconnects.
pub(crate) fn run(core: Arc<EngineCore>, messages: Receiver<FlushMessage>) {
    info!("flush worker started");

    loop {
        match messages.recv() {
            Ok(FlushMessage::Flush) => flush_with_retries(&core),
            Ok(FlushMessage::Stop) => {
                info!("flush worker stopping");
                return;
            }
            Err(_) => {
                // Engine dropped without close(); nothing left to flush for.
                warn!("flush channel disconnected; worker exiting");
                return;
            }
        }
    }
}

/// Runs one flush, retrying transient failures with linear backoff.
fn flush_with_retries(core: &EngineCore) {
    let mut attempt = 0;
    loop {
        attempt += 1;
        match flush_oldest_frozen(core) {
            Ok(_) => return,
            Err(error) if attempt < FLUSH_RETRY_LIMIT => {
                warn!(%error, attempt, "flush failed; retrying");
                thread::sleep(FLUSH_RETRY_BACKOFF * attempt);
            }
            Err(error) => {
                // The memtable stays queued; reads are unaffected and a
                // later flush or close() retries it.
                error!(%error, attempt, "flush failed; leaving memtable queued");
                return;
            }
        }
    }
}

/// Persists the oldest frozen memtable as an SSTable and commits the
/// result.
///
/// Runs entirely under the exclusive state lock, so no rotation or other
/// flush can interleave. Returns `Ok(false)` when the frozen queue is
/// empty.
pub(crate) fn flush_oldest_frozen(core: &EngineCore) -> Result<bool, EngineError> {
    let _structural = core
        .state_lock
        .write()
        .map_err(|_| EngineError::Internal("RwLock poisoned".into()))?;

    let snapshot = core.current()?;
    let Some(oldest) = snapshot.frozen.front() else {
        return Ok(false);
    };

    // The SSTable inherits the memtable's id; writing happens before any
    // snapshot is touched, so a failure here publishes nothing.
    let sstable = SSTable::from_memtable(oldest.id(), &core.config.directory, oldest)?;

    let mut guard = core
        .snapshot
        .write()
        .map_err(|_| EngineError::Internal("RwLock poisoned".into()))?;

    let mut frozen_queue = snapshot.frozen.clone();
    frozen_queue.pop_front();
    let mut sstables = snapshot.sstables.clone();
    sstables.insert(sstable.id(), Arc::new(sstable));

    debug!(
        id = oldest.id(),
        remaining = frozen_queue.len(),
        "frozen memtable flushed"
    );

    *guard = Arc::new(StoreState {
        memtable: Arc::clone(&snapshot.memtable),
        frozen: frozen_queue,
        sstables,
        next_id: snapshot.next_id,
    });

    Ok(true)
}
