//! Completion barrier for a dynamically sized set of operations.
//!
//! Every in-flight operation holds a [`Registration`]. A registration can
//! spawn further registrations (a packing operation registers its own probe
//! step before it reports), so the barrier cannot fire while any work is still
//! outstanding. [`CompletionBarrier::wait`] consumes the barrier: it fires at
//! most once, after every registration has reported success, or as soon as
//! the first one reports a failure.
//!
//! # Example
//!
//! ```ignore
//! let barrier = CompletionBarrier::<u32, String>::new();
//! let reg = barrier.register("first");
//! tokio::spawn(async move { reg.complete(1) });
//! let values = barrier.wait().await?;
//! ```

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;

enum Event<T, E> {
    Done(T),
    Failed(E),
    Abandoned(String),
}

/// Reason a barrier did not fire successfully.
#[derive(Debug, PartialEq, Eq)]
pub enum WaitError<E> {
    /// An operation reported a failure
    Failed(E),
    /// An operation was dropped without reporting (its task panicked or was cancelled)
    Abandoned(String),
}

impl<E: std::fmt::Display> std::fmt::Display for WaitError<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WaitError::Failed(e) => write!(f, "{}", e),
            WaitError::Abandoned(label) => write!(f, "operation '{}' ended without reporting", label),
        }
    }
}

impl<E: std::fmt::Debug + std::fmt::Display> std::error::Error for WaitError<E> {}

/// Collects outcomes from a set of operations that may grow while running.
pub struct CompletionBarrier<T, E> {
    sender: Option<mpsc::UnboundedSender<Event<T, E>>>,
    receiver: mpsc::UnboundedReceiver<Event<T, E>>,
    registered: Arc<AtomicUsize>,
}

impl<T, E> CompletionBarrier<T, E> {
    /// Create an empty barrier.
    pub fn new() -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        Self { sender: Some(sender), receiver, registered: Arc::new(AtomicUsize::new(0)) }
    }

    /// Register an operation before it starts.
    pub fn register(&self, label: impl Into<String>) -> Registration<T, E> {
        // The sender is only taken by `wait`, which consumes the barrier
        let sender = self.sender.clone().unwrap_or_else(|| mpsc::unbounded_channel().0);
        Registration::new(sender, label.into(), Arc::clone(&self.registered))
    }

    /// Total number of operations registered so far, including dynamic ones.
    pub fn registered(&self) -> usize {
        self.registered.load(Ordering::SeqCst)
    }

    /// Wait for every registered operation.
    ///
    /// Returns the successful outcomes in arrival order. The first failure is
    /// returned immediately; operations still running are not cancelled and
    /// their late reports are discarded. With no registrations the barrier
    /// fires at once with an empty list.
    pub async fn wait(mut self) -> Result<Vec<T>, WaitError<E>> {
        drop(self.sender.take());

        let mut outcomes = Vec::new();
        while let Some(event) = self.receiver.recv().await {
            match event {
                Event::Done(value) => {
                    outcomes.push(value);
                    tracing::trace!(
                        completed = outcomes.len(),
                        registered = self.registered(),
                        "operation completed"
                    );
                }
                Event::Failed(error) => return Err(WaitError::Failed(error)),
                Event::Abandoned(label) => return Err(WaitError::Abandoned(label)),
            }
        }

        Ok(outcomes)
    }
}

impl<T, E> Default for CompletionBarrier<T, E> {
    fn default() -> Self {
        Self::new()
    }
}

/// Handle held by one in-flight operation.
///
/// Reporting consumes the handle. Dropping it without reporting counts as a
/// failure, so a panicking task can never leave the barrier waiting forever.
pub struct Registration<T, E> {
    sender: mpsc::UnboundedSender<Event<T, E>>,
    label: String,
    registered: Arc<AtomicUsize>,
    reported: bool,
}

impl<T, E> Registration<T, E> {
    fn new(
        sender: mpsc::UnboundedSender<Event<T, E>>,
        label: String,
        registered: Arc<AtomicUsize>,
    ) -> Self {
        registered.fetch_add(1, Ordering::SeqCst);
        Self { sender, label, registered, reported: false }
    }

    /// Register a follow-up operation from inside this one.
    ///
    /// Must be called before this registration reports, so the barrier never
    /// observes a moment with nothing outstanding.
    pub fn register(&self, label: impl Into<String>) -> Registration<T, E> {
        Registration::new(self.sender.clone(), label.into(), Arc::clone(&self.registered))
    }

    /// Label given at registration.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Report success.
    pub fn complete(mut self, value: T) {
        self.reported = true;
        // A closed channel means the barrier already failed
        let _ = self.sender.send(Event::Done(value));
    }

    /// Report failure.
    pub fn fail(mut self, error: E) {
        self.reported = true;
        let _ = self.sender.send(Event::Failed(error));
    }

    /// Report the outcome of an operation.
    pub fn finish(self, result: Result<T, E>) {
        match result {
            Ok(value) => self.complete(value),
            Err(error) => self.fail(error),
        }
    }
}

impl<T, E> Drop for Registration<T, E> {
    fn drop(&mut self) {
        if !self.reported {
            let _ = self.sender.send(Event::Abandoned(std::mem::take(&mut self.label)));
        }
    }
}
