use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{anyhow, Context, Result};
use base64::{engine::general_purpose, Engine as _};
use crossbeam_channel::{unbounded, Receiver, Sender};
use parking_lot::Mutex;

pub const DEFAULT_FEEDBACK: Duration = Duration::from_secs(2);

pub trait ClipboardBackend: Send + Sync {
    fn name(&self) -> &'static str;
    fn copy(&self, text: &str) -> Result<()>;
}

/// The desktop clipboard. The handle is kept alive after the first copy so
/// X11/Wayland selections stay served while the app runs.
#[derive(Default)]
pub struct SystemClipboard {
    inner: Mutex<Option<arboard::Clipboard>>,
}

impl ClipboardBackend for SystemClipboard {
    fn name(&self) -> &'static str {
        "system"
    }

    fn copy(&self, text: &str) -> Result<()> {
        let mut guard = self.inner.lock();
        if guard.is_none() {
            *guard = Some(
                arboard::Clipboard::new()
                    .map_err(|err| anyhow!("create clipboard context: {}", err))?,
            );
        }
        let clipboard = guard
            .as_mut()
            .context("clipboard context unavailable")?;
        clipboard
            .set_text(text.to_string())
            .map_err(|err| anyhow!("write clipboard: {}", err))
    }
}

/// Asks the terminal to set the clipboard through an OSC 52 sequence. The
/// sequence is handed to the UI thread, which owns the terminal and writes
/// it between frames.
pub struct Osc52Clipboard {
    tx: Sender<String>,
}

impl Osc52Clipboard {
    pub fn new(tx: Sender<String>) -> Self {
        Self { tx }
    }
}

impl ClipboardBackend for Osc52Clipboard {
    fn name(&self) -> &'static str {
        "osc52"
    }

    fn copy(&self, text: &str) -> Result<()> {
        self.tx
            .send(osc52_sequence(text))
            .map_err(|_| anyhow!("terminal writer is gone"))
    }
}

pub fn osc52_sequence(text: &str) -> String {
    let payload = general_purpose::STANDARD.encode(text.as_bytes());
    format!("\x1b]52;c;{payload}\x07")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CopyMethod {
    Primary,
    Fallback,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopyOutcome {
    pub number: usize,
    pub result: std::result::Result<CopyMethod, String>,
}

/// Tries the primary backend, then the fallback. Failures are logged and
/// folded into the outcome; nothing propagates.
pub fn copy_with_fallback(
    primary: &dyn ClipboardBackend,
    fallback: Option<&dyn ClipboardBackend>,
    text: &str,
) -> std::result::Result<CopyMethod, String> {
    let primary_err = match primary.copy(text) {
        Ok(()) => return Ok(CopyMethod::Primary),
        Err(err) => err,
    };
    tracing::info!(
        backend = primary.name(),
        error = %format!("{primary_err:#}"),
        "clipboard copy failed; trying fallback"
    );

    let Some(fallback) = fallback else {
        tracing::warn!("no clipboard fallback configured; copy dropped");
        return Err(format!("{primary_err:#}"));
    };
    match fallback.copy(text) {
        Ok(()) => Ok(CopyMethod::Fallback),
        Err(err) => {
            tracing::warn!(
                backend = fallback.name(),
                error = %format!("{err:#}"),
                "clipboard fallback failed; copy dropped"
            );
            Err(format!("{primary_err:#}; {err:#}"))
        }
    }
}

/// Fire-and-forget copies on a worker thread. Results come back through
/// [`Copier::poll`].
pub struct Copier {
    primary: Arc<dyn ClipboardBackend>,
    fallback: Option<Arc<dyn ClipboardBackend>>,
    tx: Sender<CopyOutcome>,
    rx: Receiver<CopyOutcome>,
    terminal_rx: Receiver<String>,
}

impl Copier {
    pub fn new(osc52_fallback: bool) -> Self {
        let primary = Arc::new(SystemClipboard::default());
        if osc52_fallback {
            Self::with_terminal_fallback(primary)
        } else {
            Self::with_backends(primary, None)
        }
    }

    pub fn with_backends(
        primary: Arc<dyn ClipboardBackend>,
        fallback: Option<Arc<dyn ClipboardBackend>>,
    ) -> Self {
        let (tx, rx) = unbounded();
        let (_, terminal_rx) = unbounded();
        Self {
            primary,
            fallback,
            tx,
            rx,
            terminal_rx,
        }
    }

    /// `primary` backed by OSC 52. Sequences queue up until
    /// [`Copier::take_terminal_writes`] collects them.
    pub fn with_terminal_fallback(primary: Arc<dyn ClipboardBackend>) -> Self {
        let (terminal_tx, terminal_rx) = unbounded();
        let fallback: Arc<dyn ClipboardBackend> = Arc::new(Osc52Clipboard::new(terminal_tx));
        let mut copier = Self::with_backends(primary, Some(fallback));
        copier.terminal_rx = terminal_rx;
        copier
    }

    pub fn copy(&self, number: usize, text: String) {
        let primary = Arc::clone(&self.primary);
        let fallback = self.fallback.clone();
        let tx = self.tx.clone();
        thread::spawn(move || {
            let result = copy_with_fallback(primary.as_ref(), fallback.as_deref(), &text);
            let _ = tx.send(CopyOutcome { number, result });
        });
    }

    pub fn poll(&self) -> Vec<CopyOutcome> {
        self.rx.try_iter().collect()
    }

    /// Escape sequences waiting to be written to the terminal.
    pub fn take_terminal_writes(&self) -> Vec<String> {
        self.terminal_rx.try_iter().collect()
    }

    #[cfg(test)]
    fn wait(&self) -> Option<CopyOutcome> {
        self.rx.recv_timeout(Duration::from_secs(5)).ok()
    }
}

/// Transient "copied" marker for one code block.
#[derive(Debug, Clone)]
pub struct CopyFeedback {
    timeout: Duration,
    copied: Option<(usize, Instant)>,
}

impl CopyFeedback {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            copied: None,
        }
    }

    pub fn mark(&mut self, number: usize, now: Instant) {
        self.copied = Some((number, now));
    }

    pub fn active(&self, now: Instant) -> Option<usize> {
        self.copied
            .filter(|(_, at)| now.duration_since(*at) < self.timeout)
            .map(|(number, _)| number)
    }

    /// Drops an expired marker. Returns true when something was cleared.
    pub fn expire(&mut self, now: Instant) -> bool {
        match self.copied {
            Some((_, at)) if now.duration_since(at) >= self.timeout => {
                self.copied = None;
                true
            }
            _ => false,
        }
    }

    pub fn clear(&mut self) {
        self.copied = None;
    }
}
