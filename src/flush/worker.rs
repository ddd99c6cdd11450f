//! Background flush worker
//!
//! A dedicated thread that runs the `Flusher` whenever it is asked to.
//! Requests travel over a bounded channel of capacity one, so any number of
//! requests made while a flush is pending collapse into a single flush.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam::channel::{self, Receiver, Sender, TrySendError};
use parking_lot::Mutex;

use crate::error::{MemcacheError, Result};

use super::Flusher;

enum FlushRequest {
    Flush,
    Shutdown,
}

/// Counters maintained by the worker thread
#[derive(Debug, Default)]
pub struct FlushMetrics {
    completed: AtomicU64,
    failed: AtomicU64,
    entries_flushed: AtomicU64,
}

impl FlushMetrics {
    /// Flushes that wrote a snapshot
    pub fn completed(&self) -> u64 {
        self.completed.load(Ordering::SeqCst)
    }

    /// Flushes that returned an error
    pub fn failed(&self) -> u64 {
        self.failed.load(Ordering::SeqCst)
    }

    /// Entries written across all completed flushes
    pub fn entries_flushed(&self) -> u64 {
        self.entries_flushed.load(Ordering::SeqCst)
    }
}

/// Handle to the background flush thread
pub struct FlushWorker {
    sender: Sender<FlushRequest>,
    handle: Mutex<Option<JoinHandle<()>>>,
    metrics: Arc<FlushMetrics>,
}

impl FlushWorker {
    /// Start the worker thread
    pub fn spawn(flusher: Arc<Flusher>, thread_name: &str) -> Result<Self> {
        let (sender, receiver) = channel::bounded(1);
        let metrics = Arc::new(FlushMetrics::default());

        let thread_metrics = Arc::clone(&metrics);
        let handle = thread::Builder::new()
            .name(thread_name.to_string())
            .spawn(move || run(receiver, flusher, thread_metrics))?;

        tracing::info!(thread = thread_name, "flush worker started");

        Ok(Self {
            sender,
            handle: Mutex::new(Some(handle)),
            metrics,
        })
    }

    /// Ask for a flush; returns immediately.
    ///
    /// A request made while another is still queued is merged into it.
    pub fn request_flush(&self) -> Result<()> {
        match self.sender.try_send(FlushRequest::Flush) {
            Ok(()) | Err(TrySendError::Full(_)) => Ok(()),
            Err(TrySendError::Disconnected(_)) => Err(MemcacheError::FlushWorkerStopped),
        }
    }

    /// Stop the worker after any queued flush and wait for it to exit.
    ///
    /// Calling it again is a no-op.
    pub fn shutdown(&self) -> Result<()> {
        let handle = match self.handle.lock().take() {
            Some(handle) => handle,
            None => return Ok(()),
        };

        self.sender
            .send(FlushRequest::Shutdown)
            .map_err(|_| MemcacheError::FlushWorkerStopped)?;

        handle
            .join()
            .map_err(|_| MemcacheError::Flush("flush worker panicked".to_string()))?;

        tracing::info!(
            completed = self.metrics.completed(),
            failed = self.metrics.failed(),
            "flush worker stopped"
        );
        Ok(())
    }

    pub fn metrics(&self) -> &FlushMetrics {
        &self.metrics
    }
}

fn run(receiver: Receiver<FlushRequest>, flusher: Arc<Flusher>, metrics: Arc<FlushMetrics>) {
    for request in receiver.iter() {
        match request {
            FlushRequest::Flush => match flusher.flush() {
                Ok(Some(stats)) => {
                    metrics.completed.fetch_add(1, Ordering::SeqCst);
                    metrics
                        .entries_flushed
                        .fetch_add(stats.entries as u64, Ordering::SeqCst);
                }
                Ok(None) => {}
                Err(e) => {
                    metrics.failed.fetch_add(1, Ordering::SeqCst);
                    tracing::warn!(error = %e, "background flush failed");
                }
            },
            FlushRequest::Shutdown => break,
        }
    }
}
