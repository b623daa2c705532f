//! Voice capture.
//!
//! [`VoiceCapture`] is a small `Idle -> Recording -> Idle` state machine over an
//! injected [`SpeechCapability`]. Recognizers report back through an unbounded
//! channel; every event is tagged with the [`CaptureId`] it belongs to so late
//! events from a stopped capture are dropped.

use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use thiserror::Error;
use tokio::process::Command;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

pub const AUTO_SUBMIT_DELAY: Duration = Duration::from_millis(500);
pub const DEFAULT_LANGUAGE: &str = "en-US";
pub const STT_COMMAND_VAR: &str = "AITERM_STT_COMMAND";
pub const STT_LANG_VAR: &str = "AITERM_STT_LANG";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CaptureId(u64);

impl CaptureId {
    pub fn get(self) -> u64 {
        self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecognitionEvent {
    Transcript { capture: CaptureId, text: String },
    Error { capture: CaptureId, message: String },
    End { capture: CaptureId },
}

impl RecognitionEvent {
    pub fn capture(&self) -> CaptureId {
        match self {
            RecognitionEvent::Transcript { capture, .. }
            | RecognitionEvent::Error { capture, .. }
            | RecognitionEvent::End { capture } => *capture,
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VoiceError {
    #[error("Speech recognition is not supported in this terminal. Set AITERM_STT_COMMAND to enable voice input.")]
    Unsupported,

    #[error("failed to start speech recognition: {0}")]
    StartFailed(String),
}

/// A single-utterance speech recognizer.
///
/// `start` must return promptly; results arrive later on `events`, tagged with
/// `capture`. A recognizer should send at most one terminal event per capture.
pub trait SpeechRecognizer: Send + Sync {
    fn name(&self) -> &str;

    fn start(
        &self,
        capture: CaptureId,
        events: mpsc::UnboundedSender<RecognitionEvent>,
    ) -> Result<(), VoiceError>;

    fn stop(&self, capture: CaptureId);
}

#[derive(Clone)]
pub enum SpeechCapability {
    Supported(Arc<dyn SpeechRecognizer>),
    Unsupported,
}

impl SpeechCapability {
    /// Build from `AITERM_STT_COMMAND` / `AITERM_STT_LANG`.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        match lookup(STT_COMMAND_VAR).filter(|c| !c.trim().is_empty()) {
            Some(command) => {
                let language = lookup(STT_LANG_VAR)
                    .filter(|l| !l.trim().is_empty())
                    .unwrap_or_else(|| DEFAULT_LANGUAGE.to_string());
                SpeechCapability::Supported(Arc::new(CommandRecognizer::new(command, language)))
            }
            None => SpeechCapability::Unsupported,
        }
    }

    pub fn is_supported(&self) -> bool {
        matches!(self, SpeechCapability::Supported(_))
    }
}

impl std::fmt::Debug for SpeechCapability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SpeechCapability::Supported(r) => write!(f, "Supported({})", r.name()),
            SpeechCapability::Unsupported => f.write_str("Unsupported"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VoiceState {
    #[default]
    Idle,
    Recording,
}

/// What the owner of the capture should do after an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VoiceOutcome {
    /// Event from a capture that is no longer active.
    Ignored,
    /// Put `text` in the input and submit it as voice after [`AUTO_SUBMIT_DELAY`].
    Transcript(String),
    /// Capture ended without a transcript.
    Stopped { error: Option<String> },
}

pub struct VoiceCapture {
    capability: SpeechCapability,
    events: mpsc::UnboundedSender<RecognitionEvent>,
    state: VoiceState,
    active: Option<CaptureId>,
    next_capture: u64,
}

impl VoiceCapture {
    pub fn new(
        capability: SpeechCapability,
        events: mpsc::UnboundedSender<RecognitionEvent>,
    ) -> Self {
        Self {
            capability,
            events,
            state: VoiceState::Idle,
            active: None,
            next_capture: 0,
        }
    }

    pub fn state(&self) -> VoiceState {
        self.state
    }

    pub fn is_recording(&self) -> bool {
        self.state == VoiceState::Recording
    }

    pub fn is_supported(&self) -> bool {
        self.capability.is_supported()
    }

    pub fn active_capture(&self) -> Option<CaptureId> {
        self.active
    }

    pub fn start(&mut self) -> Result<CaptureId, VoiceError> {
        let SpeechCapability::Supported(recognizer) = &self.capability else {
            return Err(VoiceError::Unsupported);
        };
        if let (VoiceState::Recording, Some(active)) = (self.state, self.active) {
            return Ok(active);
        }

        self.next_capture += 1;
        let capture = CaptureId(self.next_capture);
        recognizer.start(capture, self.events.clone())?;
        info!(
            capture = capture.get(),
            recognizer = recognizer.name(),
            "voice capture started"
        );
        self.active = Some(capture);
        self.state = VoiceState::Recording;
        Ok(capture)
    }

    pub fn stop(&mut self) {
        if let (Some(capture), SpeechCapability::Supported(recognizer)) =
            (self.active.take(), &self.capability)
        {
            recognizer.stop(capture);
            debug!(capture = capture.get(), "voice capture stopped");
        }
        self.state = VoiceState::Idle;
    }

    pub fn toggle(&mut self) -> Result<VoiceState, VoiceError> {
        if self.is_recording() {
            self.stop();
        } else {
            self.start()?;
        }
        Ok(self.state)
    }

    pub fn handle_event(&mut self, event: RecognitionEvent) -> VoiceOutcome {
        if self.active != Some(event.capture()) {
            debug!(capture = event.capture().get(), "dropping stale recognition event");
            return VoiceOutcome::Ignored;
        }
        self.active = None;
        self.state = VoiceState::Idle;

        match event {
            RecognitionEvent::Transcript { text, .. } => {
                let text = text.trim().to_string();
                if text.is_empty() {
                    VoiceOutcome::Stopped { error: None }
                } else {
                    VoiceOutcome::Transcript(text)
                }
            }
            RecognitionEvent::Error { message, .. } => {
                warn!("speech recognition error: {message}");
                VoiceOutcome::Stopped {
                    error: Some(message),
                }
            }
            RecognitionEvent::End { .. } => VoiceOutcome::Stopped { error: None },
        }
    }
}

/// Run `submit` with `transcript` once [`AUTO_SUBMIT_DELAY`] has passed.
pub fn spawn_auto_submit<F>(transcript: String, submit: F) -> JoinHandle<()>
where
    F: FnOnce(String) + Send + 'static,
{
    tokio::spawn(async move {
        tokio::time::sleep(AUTO_SUBMIT_DELAY).await;
        submit(transcript);
    })
}

/// Recognizer backed by an external speech-to-text program.
///
/// The command line runs through `sh -c` with `AITERM_STT_LANG` exported; its
/// trimmed stdout is the transcript. A non-zero exit is reported as an error.
pub struct CommandRecognizer {
    command: String,
    language: String,
    running: Mutex<Option<(CaptureId, JoinHandle<()>)>>,
}

impl CommandRecognizer {
    pub fn new(command: impl Into<String>, language: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            language: language.into(),
            running: Mutex::new(None),
        }
    }

    fn spawn_child(&self) -> Result<tokio::process::Child, VoiceError> {
        Command::new("sh")
            .arg("-c")
            .arg(&self.command)
            .env(STT_LANG_VAR, &self.language)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| VoiceError::StartFailed(e.to_string()))
    }
}

impl SpeechRecognizer for CommandRecognizer {
    fn name(&self) -> &str {
        "command"
    }

    fn start(
        &self,
        capture: CaptureId,
        events: mpsc::UnboundedSender<RecognitionEvent>,
    ) -> Result<(), VoiceError> {
        let child = self.spawn_child()?;
        let handle = tokio::spawn(async move {
            let event = match child.wait_with_output().await {
                Ok(output) if output.status.success() => {
                    let text = String::from_utf8_lossy(&output.stdout).trim().to_string();
                    if text.is_empty() {
                        RecognitionEvent::End { capture }
                    } else {
                        RecognitionEvent::Transcript { capture, text }
                    }
                }
                Ok(output) => {
                    let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
                    let message = if stderr.is_empty() {
                        format!("recognizer exited with {}", output.status)
                    } else {
                        stderr
                    };
                    RecognitionEvent::Error { capture, message }
                }
                Err(e) => RecognitionEvent::Error {
                    capture,
                    message: e.to_string(),
                },
            };
            let _ = events.send(event);
        });

        if let Some((_, previous)) = self.running.lock().replace((capture, handle)) {
            previous.abort();
        }
        Ok(())
    }

    fn stop(&self, capture: CaptureId) {
        let mut running = self.running.lock();
        if running.as_ref().map(|(id, _)| *id) == Some(capture) {
            if let Some((_, handle)) = running.take() {
                // Aborting drops the child, which kills it.
                handle.abort();
            }
        }
    }
}
