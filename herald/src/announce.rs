// THEORY:
// The `announce` module owns every audible and printed side effect of a
// detection. It is deliberately split off from the capture loop: a spoken
// announcement takes seconds, a frame takes milliseconds, and the camera must
// keep flowing while the speaker talks.
//
// Key architectural principles:
// 1.  **Single Worker, Fixed Order**: one thread owns the tone emitter and
//     the speech synthesizer for the whole process. For each announcement it
//     performs, strictly in order: tone, console line, speech. Utterances can
//     therefore never overlap or interleave.
// 2.  **Bounded Queue, Never Block**: the capture loop hands announcements
//     over with `try_send` on a bounded channel. When the worker falls behind
//     the newest announcement is dropped and counted instead of stalling a
//     frame.
// 3.  **Injected Collaborators**: the worker drives `ToneEmitter` and
//     `SpeechSynthesizer` trait objects, constructed once at startup. Tests
//     substitute fakes and observe the exact side-effect sequence.

use std::sync::atomic::{AtomicU64, Ordering};
use std::thread::{self, JoinHandle};

use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use tracing::{debug, warn};

use crate::speech::SpeechSynthesizer;
use crate::tone::ToneEmitter;

/// Message type for the announcer worker.
enum WorkerMessage {
    Announce(String),
    Shutdown,
}

/// Configuration for the `Announcer`.
#[derive(Debug, Clone)]
pub struct AnnouncerConfig {
    /// Capacity of the bounded announcement queue. Announcements arriving
    /// while the queue is full are dropped and counted.
    pub queue_capacity: usize,
}

impl Default for AnnouncerConfig {
    fn default() -> Self {
        Self { queue_capacity: 8 }
    }
}

/// Formats the announcement for a decoded QR payload.
///
/// The phrasing is fixed: `Order Number <payload> Please collect your items`.
pub fn announcement_for(code_text: &str) -> String {
    format!("Order Number {code_text} Please collect your items")
}

/// Handle to the announcement worker thread.
pub struct Announcer {
    /// Channel into the worker.
    tx: Sender<WorkerMessage>,
    /// Worker join handle, taken by `shutdown`.
    worker: Option<JoinHandle<()>>,
    /// Announcements discarded because the queue was full.
    dropped: AtomicU64,
}

impl Announcer {
    /// Spawns the worker thread. The tone emitter and speech synthesizer are
    /// constructed by the caller exactly once and owned by the worker for the
    /// lifetime of the process.
    pub fn spawn(
        config: AnnouncerConfig,
        tone: Box<dyn ToneEmitter>,
        speech: Box<dyn SpeechSynthesizer>,
    ) -> Self {
        let (tx, rx) = bounded::<WorkerMessage>(config.queue_capacity);
        let worker = thread::spawn(move || run_worker(rx, tone, speech));
        Self {
            tx,
            worker: Some(worker),
            dropped: AtomicU64::new(0),
        }
    }

    /// Queues an announcement without blocking. A full queue drops the
    /// announcement and counts it; the caller is never stalled by playback.
    pub fn announce(&self, announcement: String) {
        match self.tx.try_send(WorkerMessage::Announce(announcement)) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                let dropped = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
                warn!("announcement queue full ({dropped} dropped so far)");
            }
            Err(TrySendError::Disconnected(_)) => {
                warn!("announcer worker has stopped; announcement discarded");
            }
        }
    }

    /// Number of announcements discarded because the queue was full.
    pub fn dropped_announcements(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Sends shutdown behind any queued announcements and waits for the
    /// worker to finish speaking them.
    pub fn shutdown(mut self) {
        let _ = self.tx.send(WorkerMessage::Shutdown);
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                warn!("announcer worker panicked");
            }
        }
    }
}

impl Drop for Announcer {
    fn drop(&mut self) {
        // Best effort shutdown on drop
        if self.worker.is_some() {
            let _ = self.tx.try_send(WorkerMessage::Shutdown);
        }
    }
}

/// Worker loop: drains the queue, performing tone -> console -> speech for
/// each announcement. Side-effect failures are logged and never fatal.
fn run_worker(
    rx: Receiver<WorkerMessage>,
    mut tone: Box<dyn ToneEmitter>,
    mut speech: Box<dyn SpeechSynthesizer>,
) {
    debug!("announcer worker started");
    while let Ok(msg) = rx.recv() {
        match msg {
            WorkerMessage::Announce(text) => {
                if let Err(e) = tone.beep() {
                    warn!("detection tone failed: {e}");
                }
                println!("{text}");
                if let Err(e) = speech.speak(&text) {
                    warn!("speech failed: {e}");
                }
            }
            WorkerMessage::Shutdown => break,
        }
    }
    debug!("announcer worker stopped");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn template_wraps_the_payload() {
        assert_eq!(
            announcement_for("12345"),
            "Order Number 12345 Please collect your items"
        );
    }

    #[test]
    fn template_keeps_the_payload_verbatim() {
        assert_eq!(
            announcement_for("A-77 b"),
            "Order Number A-77 b Please collect your items"
        );
    }
}
