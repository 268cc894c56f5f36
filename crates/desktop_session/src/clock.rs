//! Session-time accounting as a cancellable local task.
//!
//! The host supplies the tick source (an interval timer in the browser, a channel in tests) as a
//! [`Stream`] of elapsed durations. The task is spawned on a [`LocalSpawn`] executor and aborted
//! as soon as its [`ScopedTask`] handle is dropped.

use std::cell::Cell;
use std::future::Future;
use std::rc::Rc;
use std::time::Duration;

use futures::future::{self, AbortHandle, Abortable};
use futures::task::{LocalSpawn, LocalSpawnExt, SpawnError};
use futures::{FutureExt, Stream, StreamExt};
use tracing::debug;

/// Owns a spawned local task. Dropping the handle aborts the task before its next poll.
#[derive(Debug)]
pub struct ScopedTask {
    abort: AbortHandle,
}

impl Drop for ScopedTask {
    fn drop(&mut self) {
        self.abort.abort();
    }
}

/// Spawns `task` on `spawner`, tied to the returned handle's lifetime.
///
/// # Errors
///
/// Returns the spawner's [`SpawnError`] when it has shut down.
pub fn spawn_scoped<S, F>(spawner: &S, task: F) -> Result<ScopedTask, SpawnError>
where
    S: LocalSpawn + ?Sized,
    F: Future<Output = ()> + 'static,
{
    let (abort, registration) = AbortHandle::new_pair();
    spawner.spawn_local(Abortable::new(task, registration).map(|_| ()))?;
    Ok(ScopedTask { abort })
}

#[derive(Debug, Default)]
pub struct SessionClock {
    elapsed: Rc<Cell<Duration>>,
    task: Option<ScopedTask>,
}

impl SessionClock {
    /// Starts accumulating the durations yielded by `ticks`. A running clock is restarted.
    ///
    /// # Errors
    ///
    /// Returns the spawner's [`SpawnError`] when it has shut down.
    pub fn start<S, T>(&mut self, spawner: &S, ticks: T) -> Result<(), SpawnError>
    where
        S: LocalSpawn + ?Sized,
        T: Stream<Item = Duration> + 'static,
    {
        self.stop();
        let elapsed = Rc::clone(&self.elapsed);
        let accumulate = ticks.for_each(move |tick| {
            elapsed.set(elapsed.get().saturating_add(tick));
            future::ready(())
        });
        self.task = Some(spawn_scoped(spawner, accumulate)?);
        debug!("session clock started");
        Ok(())
    }

    /// Cancels the tick task. Accumulated time is kept.
    pub fn stop(&mut self) {
        if self.task.take().is_some() {
            debug!(elapsed_secs = self.elapsed.get().as_secs(), "session clock stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.task.is_some()
    }

    pub fn elapsed(&self) -> Duration {
        self.elapsed.get()
    }

    /// Returns the accumulated time and resets it to zero.
    pub fn take_elapsed(&self) -> Duration {
        self.elapsed.replace(Duration::ZERO)
    }
}
