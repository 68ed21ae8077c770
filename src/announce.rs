//! Non-blocking sign announcements.
//!
//! Speech synthesis is slow and blocking; the frame loop is not. The
//! announcer bridges the two with a bounded queue drained by one worker
//! thread that owns the synthesizer. `announce` never blocks the caller:
//! when the queue is full the request is dropped and counted instead.
//!
//! Deduplication is not this layer's job; the debounce policy decides what
//! reaches the queue.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::mpsc::{sync_channel, Receiver, SyncSender, TrySendError};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

use anyhow::{anyhow, Result};

/// Default bound on queued announcements.
pub const DEFAULT_QUEUE_DEPTH: usize = 4;

/// Blocking speech synthesis boundary.
///
/// `utter` performs synthesis and playback to completion. Implementations
/// run on the announcer's worker thread, never on the frame loop.
pub trait SpeechSynthesizer: Send {
    /// Synthesizer identifier for logs.
    fn name(&self) -> &'static str;

    /// Speak one phrase to completion.
    fn utter(&mut self, text: &str) -> Result<()>;
}

/// Bounded announcement dispatcher.
pub struct Announcer {
    tx: Option<SyncSender<String>>,
    abandon: Arc<AtomicBool>,
    uttered: Arc<AtomicU64>,
    join: Option<JoinHandle<()>>,
}

impl Announcer {
    /// Spawn the worker thread that owns `synth` and drains the queue.
    pub fn spawn(mut synth: Box<dyn SpeechSynthesizer>, queue_depth: usize) -> Self {
        let (tx, rx): (SyncSender<String>, Receiver<String>) = sync_channel(queue_depth.max(1));
        let abandon = Arc::new(AtomicBool::new(false));
        let uttered = Arc::new(AtomicU64::new(0));

        let abandon_worker = abandon.clone();
        let uttered_worker = uttered.clone();
        let join = std::thread::spawn(move || {
            while let Ok(text) = rx.recv() {
                if abandon_worker.load(Ordering::SeqCst) {
                    continue;
                }
                match synth.utter(&text) {
                    Ok(()) => {
                        uttered_worker.fetch_add(1, Ordering::SeqCst);
                    }
                    // Terminal only to this one announcement.
                    Err(err) => {
                        log::warn!("{} synthesis failed for '{}': {:#}", synth.name(), text, err);
                    }
                }
            }
        });

        Self {
            tx: Some(tx),
            abandon,
            uttered,
            join: Some(join),
        }
    }

    /// Dispatch one announcement without blocking.
    ///
    /// Returns false when the request was dropped (queue full or announcer
    /// already stopped).
    pub fn announce(&self, sign_name: &str) -> bool {
        let Some(tx) = &self.tx else {
            return false;
        };
        match tx.try_send(sign_name.to_string()) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                log::warn!("announcement queue full, dropping '{}'", sign_name);
                false
            }
            Err(TrySendError::Disconnected(_)) => {
                log::error!("announcement worker gone, dropping '{}'", sign_name);
                false
            }
        }
    }

    /// Announcements spoken to completion so far.
    pub fn uttered(&self) -> u64 {
        self.uttered.load(Ordering::SeqCst)
    }

    /// Stop the announcer, speaking everything already queued.
    pub fn stop(self) -> Result<u64> {
        self.shutdown(false)
    }

    /// Stop the announcer, skipping everything still queued. The utterance
    /// in flight, if any, still runs to completion.
    pub fn abandon(self) -> Result<u64> {
        self.shutdown(true)
    }

    fn shutdown(mut self, abandon: bool) -> Result<u64> {
        if abandon {
            self.abandon.store(true, Ordering::SeqCst);
        }
        // Closing the channel ends the worker's recv loop.
        self.tx.take();
        if let Some(join) = self.join.take() {
            join.join()
                .map_err(|_| anyhow!("announcement worker thread panicked"))?;
        }
        Ok(self.uttered.load(Ordering::SeqCst))
    }
}

// Dropping an un-stopped Announcer closes the queue; the worker drains what
// is left and exits on its own, unjoined.

/// Recording synthesizer for tests and model-less daemon runs.
#[derive(Clone)]
pub struct StubSynthesizer {
    utterances: Arc<Mutex<Vec<String>>>,
    fail_with: Option<String>,
}

impl StubSynthesizer {
    pub fn new() -> Self {
        Self {
            utterances: Arc::new(Mutex::new(Vec::new())),
            fail_with: None,
        }
    }

    /// Synthesizer whose every utterance fails with `message`.
    pub fn failing(message: &str) -> Self {
        Self {
            utterances: Arc::new(Mutex::new(Vec::new())),
            fail_with: Some(message.to_string()),
        }
    }

    /// Shared handle to everything spoken so far.
    pub fn spoken(&self) -> Arc<Mutex<Vec<String>>> {
        self.utterances.clone()
    }
}

impl Default for StubSynthesizer {
    fn default() -> Self {
        Self::new()
    }
}

impl SpeechSynthesizer for StubSynthesizer {
    fn name(&self) -> &'static str {
        "stub"
    }

    fn utter(&mut self, text: &str) -> Result<()> {
        if let Some(message) = &self.fail_with {
            return Err(anyhow!("{}", message));
        }
        log::info!("announcing: {}", text);
        self.utterances
            .lock()
            .map_err(|_| anyhow!("utterance log poisoned"))?
            .push(text.to_string());
        Ok(())
    }
}

/// System speech backend.
#[cfg(feature = "speech-tts")]
pub struct TtsSynthesizer {
    engine: tts::Tts,
}

#[cfg(feature = "speech-tts")]
impl TtsSynthesizer {
    pub fn new() -> Result<Self> {
        let engine = tts::Tts::default().map_err(|err| anyhow!("tts engine init failed: {}", err))?;
        Ok(Self { engine })
    }
}

#[cfg(feature = "speech-tts")]
impl SpeechSynthesizer for TtsSynthesizer {
    fn name(&self) -> &'static str {
        "tts"
    }

    fn utter(&mut self, text: &str) -> Result<()> {
        self.engine
            .speak(text, false)
            .map_err(|err| anyhow!("speak failed: {}", err))?;
        // Serialize utterances: hold the worker until playback finishes.
        while self
            .engine
            .is_speaking()
            .map_err(|err| anyhow!("speech state query failed: {}", err))?
        {
            std::thread::sleep(std::time::Duration::from_millis(20));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn announcements_are_spoken_in_dispatch_order() {
        let synth = StubSynthesizer::new();
        let spoken = synth.spoken();
        let announcer = Announcer::spawn(Box::new(synth), 8);

        assert!(announcer.announce("Stop"));
        assert!(announcer.announce("Yield"));
        let uttered = announcer.stop().unwrap();

        assert_eq!(uttered, 2);
        assert_eq!(*spoken.lock().unwrap(), vec!["Stop", "Yield"]);
    }

    /// Synthesizer that parks inside `utter` until released, so tests can
    /// pin the worker and fill the queue deterministically.
    struct GatedSynthesizer {
        started: std::sync::mpsc::Sender<String>,
        release: std::sync::mpsc::Receiver<()>,
    }

    impl SpeechSynthesizer for GatedSynthesizer {
        fn name(&self) -> &'static str {
            "gated"
        }

        fn utter(&mut self, text: &str) -> Result<()> {
            let _ = self.started.send(text.to_string());
            let _ = self.release.recv();
            Ok(())
        }
    }

    #[test]
    fn full_queue_drops_instead_of_blocking() {
        let (started_tx, started_rx) = std::sync::mpsc::channel();
        let (release_tx, release_rx) = std::sync::mpsc::channel();
        let announcer = Announcer::spawn(
            Box::new(GatedSynthesizer {
                started: started_tx,
                release: release_rx,
            }),
            1,
        );

        assert!(announcer.announce("Stop"));
        // Wait until the worker is parked inside utter(): the queue is
        // empty again and holds exactly one more slot.
        assert_eq!(started_rx.recv().unwrap(), "Stop");
        assert!(announcer.announce("Yield"));
        // Queue full now: the dispatch drops immediately instead of
        // waiting for the parked worker.
        assert!(!announcer.announce("No entry"));

        release_tx.send(()).unwrap();
        release_tx.send(()).unwrap();
        let uttered = announcer.stop().unwrap();
        assert_eq!(uttered, 2);
    }

    #[test]
    fn synthesis_failure_is_isolated_to_one_announcement() {
        let announcer = Announcer::spawn(Box::new(StubSynthesizer::failing("no audio device")), 4);
        assert!(announcer.announce("Stop"));
        // stop() joins cleanly even though every utterance failed.
        let uttered = announcer.stop().unwrap();
        assert_eq!(uttered, 0);
    }

    #[test]
    fn abandon_skips_queued_announcements() {
        let synth = StubSynthesizer::new();
        let spoken = synth.spoken();
        let announcer = Announcer::spawn(Box::new(synth), 16);
        // The worker races the queue, so only the upper bound is certain.
        for _ in 0..16 {
            announcer.announce("Yield");
        }
        let uttered = announcer.abandon().unwrap();
        assert_eq!(uttered as usize, spoken.lock().unwrap().len());
        assert!(uttered <= 16);
    }
}
