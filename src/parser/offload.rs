//! Tokenizing large buffers off the calling thread
//!
//! The worker reports whole-percent progress and calls its completion callback
//! at most once: with the worker's tokens, or with a synchronous re-tokenization
//! if the worker panicked. Cancellation and completion race for the same flag, so
//! exactly one of them wins; a winning cancel suppresses the callback and stops
//! the tokenizer at its next token boundary.

use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::time::Duration;

use tracing::{debug, warn};

use super::tokenizer::{tokenize, Tokenizer};
use crate::error::SqlScopeError;
use crate::model::Token;

/// How long [`tokenize_with_timeout`] waits before tokenizing synchronously.
pub const DEFAULT_OFFLOAD_TIMEOUT: Duration = Duration::from_secs(60);

/// Cancels an offloaded tokenization.
#[derive(Debug, Clone, Default)]
pub struct OffloadHandle {
    cancelled: Arc<AtomicBool>,
    /// Set by whichever of cancel / completion happens first
    settled: Arc<AtomicBool>,
}

impl OffloadHandle {
    /// Cancel the worker. Returns `true` if the completion callback will not run,
    /// `false` if the worker had already started delivering its result.
    pub fn cancel(&self) -> bool {
        if !self.settle() {
            return false;
        }
        self.cancelled.store(true, Ordering::Release);
        true
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    fn settle(&self) -> bool {
        self.settled
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }
}

/// Tokenize `text` on the rayon pool.
pub fn tokenize_on_worker<P, C>(text: &str, on_progress: P, on_complete: C) -> OffloadHandle
where
    P: FnMut(u8) + Send + 'static,
    C: FnOnce(Vec<Token>) + Send + 'static,
{
    let handle = OffloadHandle::default();
    let worker = handle.clone();
    let text = text.to_string();

    rayon::spawn(move || {
        let mut on_progress = on_progress;
        let result = catch_unwind(AssertUnwindSafe(|| {
            Tokenizer::new(&text)
                .with_cancel_flag(Arc::clone(&worker.cancelled))
                .tokenize_with_progress(&mut on_progress)
        }));

        if !worker.settle() {
            debug!(bytes = text.len(), "Offloaded tokenization cancelled");
            return;
        }

        let tokens = match result {
            Ok(tokens) => tokens,
            Err(panic) => {
                let err = SqlScopeError::WorkerFailed {
                    message: panic_message(panic.as_ref()),
                };
                warn!(error = %err, "Falling back to synchronous tokenization");
                catch_unwind(|| tokenize(&text)).unwrap_or_default()
            }
        };
        on_complete(tokens);
    });

    handle
}

/// Tokenize on a worker, waiting at most `timeout` before cancelling it and
/// tokenizing on the calling thread instead.
pub fn tokenize_with_timeout(text: &str, timeout: Duration) -> Vec<Token> {
    let (tx, rx) = mpsc::channel();
    let handle = tokenize_on_worker(
        text,
        |_| {},
        move |tokens| {
            // The receiver is gone once the caller has timed out
            let _ = tx.send(tokens);
        },
    );

    match rx.recv_timeout(timeout) {
        Ok(tokens) => tokens,
        Err(err) => {
            if !handle.cancel() {
                // The worker won the race and is delivering
                if let Ok(tokens) = rx.recv() {
                    return tokens;
                }
            }
            let err = SqlScopeError::WorkerFailed {
                message: err.to_string(),
            };
            warn!(error = %err, bytes = text.len(), "Falling back to synchronous tokenization");
            tokenize(text)
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "worker panicked".to_string()
    }
}
