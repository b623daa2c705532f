use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use futures::FutureExt;
use tokio::sync::mpsc;
use tracing::{info, warn};

use aiterm_client::{CommandTransport, EventChannel, Subscription, TransportError};
use aiterm_core::{
    spawn_auto_submit, PendingSubmission, RecognitionEvent, SessionStore, SpeechCapability,
    VoiceCapture, VoiceOutcome, EXAMPLE_PROMPTS,
};
use aiterm_types::{ChannelEvent, EventKind, ExecuteResponse, Executor, HealthResponse};

use crate::ui::components::composer_input::ComposerInputState;

const SCROLL_STEP: usize = 10;

#[derive(Debug)]
pub enum Action {
    Quit,
    Submit,
    InsertChar(char),
    InsertText(String),
    Backspace,
    DeleteForward,
    DeleteWord,
    CursorLeft,
    CursorRight,
    CursorHome,
    CursorEnd,
    ClearInput,
    ToggleExecutor,
    ToggleVoice,
    FillExample(usize),
    ScrollUp,
    ScrollDown,
    DismissAlert,
    Tick,
    Settled(
        PendingSubmission,
        Result<ExecuteResponse, TransportError>,
    ),
    Channel(ChannelEvent),
    Health(Result<HealthResponse, TransportError>),
    Recognition(RecognitionEvent),
    VoiceSubmit(String),
}

pub struct App {
    pub store: SessionStore,
    pub voice: VoiceCapture,
    pub composer: ComposerInputState,
    pub executor: Executor,
    pub alert: Option<String>,
    pub scroll_from_bottom: usize,
    pub tick_count: usize,
    pub should_quit: bool,
    transport: Arc<dyn CommandTransport>,
    action_tx: mpsc::UnboundedSender<Action>,
    channel: Option<EventChannel>,
    subscriptions: Vec<Subscription>,
    seen_history: usize,
}

impl App {
    /// Must be called inside a tokio runtime: recognizer events are forwarded
    /// into the action queue by a spawned task.
    pub fn new(
        transport: Arc<dyn CommandTransport>,
        capability: SpeechCapability,
        executor: Executor,
    ) -> (Self, mpsc::UnboundedReceiver<Action>) {
        let (action_tx, action_rx) = mpsc::unbounded_channel();
        let (voice_tx, mut voice_rx) = mpsc::unbounded_channel();

        let forward = action_tx.clone();
        tokio::spawn(async move {
            while let Some(event) = voice_rx.recv().await {
                if forward.send(Action::Recognition(event)).is_err() {
                    break;
                }
            }
        });

        let app = Self {
            store: SessionStore::new(),
            voice: VoiceCapture::new(capability, voice_tx),
            composer: ComposerInputState::new(),
            executor,
            alert: None,
            scroll_from_bottom: 0,
            tick_count: 0,
            should_quit: false,
            transport,
            action_tx,
            channel: None,
            subscriptions: Vec::new(),
            seen_history: 0,
        };
        (app, action_rx)
    }

    pub fn sender(&self) -> mpsc::UnboundedSender<Action> {
        self.action_tx.clone()
    }

    /// Route channel pushes into the action queue and open the connection.
    pub fn attach_channel(&mut self, channel: EventChannel) {
        for kind in [
            EventKind::Status,
            EventKind::Connected,
            EventKind::CommandResult,
            EventKind::CommandExecuted,
            EventKind::ServerError,
        ] {
            let tx = self.action_tx.clone();
            self.subscriptions.push(channel.subscribe(kind, move |event| {
                let _ = tx.send(Action::Channel(event.clone()));
            }));
        }
        channel.connect();
        self.channel = Some(channel);
    }

    pub fn shutdown(&mut self) {
        self.voice.stop();
        self.subscriptions.clear();
        if let Some(channel) = self.channel.take() {
            channel.disconnect();
        }
    }

    /// Text entry is blocked while a command runs or the microphone is open.
    pub fn input_locked(&self) -> bool {
        self.store.is_processing() || self.voice.is_recording()
    }

    pub fn handle_key_event(&self, key: KeyEvent) -> Option<Action> {
        if key.modifiers.contains(KeyModifiers::CONTROL) {
            return match key.code {
                KeyCode::Char('c') => Some(Action::Quit),
                KeyCode::Char('r') => Some(Action::ToggleVoice),
                KeyCode::Char('l') | KeyCode::Char('u') => Some(Action::ClearInput),
                KeyCode::Char('w') => Some(Action::DeleteWord),
                KeyCode::Char('a') => Some(Action::CursorHome),
                KeyCode::Char('e') => Some(Action::CursorEnd),
                _ => None,
            };
        }

        if self.alert.is_some() {
            return match key.code {
                KeyCode::Enter | KeyCode::Esc => Some(Action::DismissAlert),
                _ => None,
            };
        }

        match key.code {
            KeyCode::Enter => Some(Action::Submit),
            KeyCode::Tab => Some(Action::ToggleExecutor),
            KeyCode::F(2) => Some(Action::ToggleVoice),
            KeyCode::PageUp => Some(Action::ScrollUp),
            KeyCode::PageDown => Some(Action::ScrollDown),
            KeyCode::Backspace => Some(Action::Backspace),
            KeyCode::Delete => Some(Action::DeleteForward),
            KeyCode::Left => Some(Action::CursorLeft),
            KeyCode::Right => Some(Action::CursorRight),
            KeyCode::Home => Some(Action::CursorHome),
            KeyCode::End => Some(Action::CursorEnd),
            KeyCode::Char(c) => {
                let on_welcome = self.store.history().is_empty() && self.composer.is_empty();
                match c.to_digit(10) {
                    Some(n @ 1..=5) if on_welcome => Some(Action::FillExample(n as usize - 1)),
                    _ => Some(Action::InsertChar(c)),
                }
            }
            _ => None,
        }
    }

    pub fn update(&mut self, action: Action) {
        match action {
            Action::Quit => self.should_quit = true,
            Action::Tick => self.tick_count = self.tick_count.wrapping_add(1),
            Action::Submit if self.input_locked() => {}
            Action::Submit => {
                let text = self.composer.text().to_string();
                self.submit(text, false);
            }
            Action::VoiceSubmit(text) => self.submit(text, true),
            Action::Settled(pending, outcome) => self.store.settle(pending, outcome),

            Action::InsertChar(_)
            | Action::InsertText(_)
            | Action::Backspace
            | Action::DeleteForward
            | Action::DeleteWord
            | Action::ClearInput
                if self.input_locked() => {}
            Action::InsertChar(c) => self.edit(|composer| composer.insert_char(c)),
            Action::InsertText(text) => self.edit(|composer| composer.insert_str(&text)),
            Action::Backspace => self.edit(ComposerInputState::backspace),
            Action::DeleteForward => self.edit(ComposerInputState::delete_forward),
            Action::DeleteWord => self.edit(ComposerInputState::delete_word_back),
            Action::ClearInput => self.edit(ComposerInputState::clear),
            Action::CursorLeft => self.composer.move_left(),
            Action::CursorRight => self.composer.move_right(),
            Action::CursorHome => self.composer.move_home(),
            Action::CursorEnd => self.composer.move_end(),

            Action::FillExample(index) => {
                if !self.input_locked() {
                    if let Some(prompt) = self.store.fill_example(index) {
                        self.composer.set_text(prompt);
                    }
                }
            }
            Action::ToggleExecutor => {
                self.executor = self.executor.toggled();
                info!(executor = self.executor.as_str(), "preferred executor changed");
            }
            // The microphone stays closed while a command runs.
            Action::ToggleVoice if self.store.is_processing() && !self.voice.is_recording() => {}
            Action::ToggleVoice => {
                if let Err(err) = self.voice.toggle() {
                    warn!("voice capture unavailable: {err}");
                    self.alert = Some(err.to_string());
                }
            }
            Action::Recognition(event) => self.on_recognition(event),

            Action::ScrollUp => {
                self.scroll_from_bottom = self.scroll_from_bottom.saturating_add(SCROLL_STEP);
            }
            Action::ScrollDown => {
                self.scroll_from_bottom = self.scroll_from_bottom.saturating_sub(SCROLL_STEP);
            }
            Action::DismissAlert => self.alert = None,

            Action::Channel(event) => self.store.apply_channel_event(&event),
            Action::Health(Ok(health)) => self.store.apply_health(&health),
            Action::Health(Err(err)) => {
                warn!(kind = err.kind().as_str(), "failed to fetch system status: {err}");
            }
        }

        // New transcript content snaps the view back to the bottom.
        let len = self.store.history().len();
        if len != self.seen_history {
            self.seen_history = len;
            self.scroll_from_bottom = 0;
        }
    }

    fn edit(&mut self, f: impl FnOnce(&mut ComposerInputState)) {
        f(&mut self.composer);
        self.store.set_input_value(self.composer.text());
    }

    fn submit(&mut self, text: String, is_voice: bool) {
        let Some(pending) = self.store.begin_submission(&text, is_voice, self.executor) else {
            return;
        };
        self.composer.clear();

        let transport = self.transport.clone();
        let tx = self.action_tx.clone();
        tokio::spawn(async move {
            let request = pending.request().clone();
            // The submission must settle even if the transport panics.
            let outcome = AssertUnwindSafe(transport.execute(&request))
                .catch_unwind()
                .await
                .unwrap_or_else(|_| {
                    Err(TransportError::Network("request task panicked".to_string()))
                });
            let _ = tx.send(Action::Settled(pending, outcome));
        });
    }

    fn on_recognition(&mut self, event: RecognitionEvent) {
        match self.voice.handle_event(event) {
            VoiceOutcome::Transcript(text) => {
                self.composer.set_text(&text);
                self.store.set_input_value(text.clone());
                let tx = self.action_tx.clone();
                spawn_auto_submit(text, move |text| {
                    let _ = tx.send(Action::VoiceSubmit(text));
                });
            }
            VoiceOutcome::Stopped { error: Some(err) } => {
                warn!("voice capture ended with error: {err}");
            }
            VoiceOutcome::Stopped { error: None } | VoiceOutcome::Ignored => {}
        }
    }

    pub fn example_prompts(&self) -> &'static [&'static str] {
        &EXAMPLE_PROMPTS
    }
}
