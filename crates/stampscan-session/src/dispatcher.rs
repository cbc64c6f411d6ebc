//! # Decode Dispatcher
//!
//! Drains one session's decode stream and reports the first real result.
//!
//! ## Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Dispatch Loop (one per generation)                 │
//! │                                                                         │
//! │   DecodeStream ──► NoResult ──────────► trace, keep going              │
//! │        │                                                                │
//! │        ├──────► Fault { fatal: false } ► debug, keep going             │
//! │        │                                                                │
//! │        ├──────► Fault { fatal: true } ─► listener.on_decoder_died ─┐   │
//! │        │                                                            │   │
//! │        ├──────► stream ended ──────────► listener.on_decoder_died ─┤   │
//! │        │                                                            │   │
//! │        └──────► Decoded { text } ──────► listener.on_decoded ──────┤   │
//! │                                                                     ▼   │
//! │   shutdown_rx (DispatchHandle::cancel) ─────────────────────────► exit │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The loop exits after at most one listener call. Dropping the stream on
//! exit unsubscribes from the decoder.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_stream::StreamExt;
use tracing::{debug, info, trace, warn};

use stampscan_core::DecodeOutcome;

use crate::platform::DecodeStream;

// =============================================================================
// Listener
// =============================================================================

/// Receives the terminal event of a dispatch loop.
///
/// Both calls carry the generation the loop was spawned for. The listener
/// decides whether that generation is still current.
#[async_trait]
pub trait DecodeListener: Send + Sync {
    /// First decoded text of the generation.
    async fn on_decoded(&self, generation: u64, text: String);

    /// The decoder died and will produce nothing more.
    async fn on_decoder_died(&self, generation: u64, reason: String);
}

// =============================================================================
// Dispatch Handle
// =============================================================================

/// Handle to a running dispatch loop.
#[derive(Debug)]
pub struct DispatchHandle {
    generation: u64,
    shutdown_tx: mpsc::Sender<()>,
    task: JoinHandle<()>,
}

impl DispatchHandle {
    /// Generation this loop serves.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Signals the loop to exit. Never waits.
    ///
    /// Safe to call from inside a listener callback of the same loop.
    pub fn cancel(&self) {
        let _ = self.shutdown_tx.try_send(());
    }

    /// Returns true once the loop has exited.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

// =============================================================================
// Dispatcher
// =============================================================================

/// Spawns per-generation dispatch loops.
pub struct DecodeDispatcher {
    generation: u64,
    decodes: DecodeStream,
    listener: Arc<dyn DecodeListener>,
    shutdown_rx: mpsc::Receiver<()>,
}

impl DecodeDispatcher {
    /// Starts draining `decodes` on a background task.
    pub fn spawn(
        generation: u64,
        decodes: DecodeStream,
        listener: Arc<dyn DecodeListener>,
    ) -> DispatchHandle {
        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>(1);

        let dispatcher = DecodeDispatcher {
            generation,
            decodes,
            listener,
            shutdown_rx,
        };

        let task = tokio::spawn(dispatcher.run());

        DispatchHandle {
            generation,
            shutdown_tx,
            task,
        }
    }

    async fn run(mut self) {
        let generation = self.generation;
        debug!(generation, "Decode dispatch started");

        let mut ignored_frames: u64 = 0;

        loop {
            tokio::select! {
                biased;

                _ = self.shutdown_rx.recv() => {
                    debug!(generation, ignored_frames, "Decode dispatch cancelled");
                    break;
                }

                next = self.decodes.next() => {
                    match next {
                        Some(DecodeOutcome::NoResult) => {
                            ignored_frames += 1;
                            trace!(generation, "No code in frame");
                        }

                        Some(DecodeOutcome::Fault { message, fatal: false }) => {
                            ignored_frames += 1;
                            debug!(generation, %message, "Decoder fault ignored");
                        }

                        Some(DecodeOutcome::Fault { message, fatal: true }) => {
                            warn!(generation, %message, "Decoder stopped");
                            self.listener.on_decoder_died(generation, message).await;
                            break;
                        }

                        Some(DecodeOutcome::Decoded { text }) => {
                            info!(generation, ignored_frames, "Code decoded");
                            self.listener.on_decoded(generation, text).await;
                            break;
                        }

                        None => {
                            warn!(generation, "Decode stream ended");
                            self.listener
                                .on_decoder_died(generation, "decode stream ended".to_string())
                                .await;
                            break;
                        }
                    }
                }
            }
        }

        debug!(generation, "Decode dispatch stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use tokio::sync::mpsc::UnboundedSender;
    use tokio_stream::wrappers::UnboundedReceiverStream;

    #[derive(Default)]
    struct Recorder {
        events: Mutex<Vec<String>>,
    }

    impl Recorder {
        fn events(&self) -> Vec<String> {
            self.events.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl DecodeListener for Recorder {
        async fn on_decoded(&self, generation: u64, text: String) {
            self.events.lock().unwrap().push(format!("decoded:{generation}:{text}"));
        }

        async fn on_decoder_died(&self, generation: u64, reason: String) {
            self.events.lock().unwrap().push(format!("died:{generation}:{reason}"));
        }
    }

    fn feed() -> (UnboundedSender<DecodeOutcome>, DecodeStream) {
        let (tx, rx) = mpsc::unbounded_channel();
        (tx, Box::pin(UnboundedReceiverStream::new(rx)))
    }

    async fn wait_finished(handle: &DispatchHandle) {
        for _ in 0..100 {
            if handle.is_finished() {
                return;
            }
            tokio::task::yield_now().await;
        }
        panic!("dispatch loop did not exit");
    }

    #[tokio::test]
    async fn test_no_results_are_skipped() {
        let recorder = Arc::new(Recorder::default());
        let (tx, stream) = feed();
        let handle = DecodeDispatcher::spawn(3, stream, recorder.clone());

        tx.send(DecodeOutcome::NoResult).unwrap();
        tx.send(DecodeOutcome::Fault {
            message: "blurry".into(),
            fatal: false,
        })
        .unwrap();
        tx.send(DecodeOutcome::decoded("QR-1")).unwrap();
        tx.send(DecodeOutcome::decoded("QR-2")).unwrap();

        wait_finished(&handle).await;
        assert_eq!(recorder.events(), vec!["decoded:3:QR-1".to_string()]);
        assert!(tx.is_closed());
    }

    #[tokio::test]
    async fn test_fatal_fault_reports_death() {
        let recorder = Arc::new(Recorder::default());
        let (tx, stream) = feed();
        let handle = DecodeDispatcher::spawn(1, stream, recorder.clone());

        tx.send(DecodeOutcome::Fault {
            message: "worker crashed".into(),
            fatal: true,
        })
        .unwrap();

        wait_finished(&handle).await;
        assert_eq!(recorder.events(), vec!["died:1:worker crashed".to_string()]);
    }

    #[tokio::test]
    async fn test_ended_stream_reports_death() {
        let recorder = Arc::new(Recorder::default());
        let (tx, stream) = feed();
        let handle = DecodeDispatcher::spawn(2, stream, recorder.clone());

        drop(tx);

        wait_finished(&handle).await;
        assert_eq!(recorder.events(), vec!["died:2:decode stream ended".to_string()]);
    }

    #[tokio::test]
    async fn test_cancel_unsubscribes_without_callback() {
        let recorder = Arc::new(Recorder::default());
        let (tx, stream) = feed();
        let handle = DecodeDispatcher::spawn(5, stream, recorder.clone());
        assert_eq!(handle.generation(), 5);

        handle.cancel();
        // Second cancel is harmless
        handle.cancel();

        wait_finished(&handle).await;
        assert!(tx.is_closed());
        assert!(recorder.events().is_empty());
    }
}
