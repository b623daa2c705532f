//! Client-side session state.
//!
//! [`SessionStore`] is the single source of truth the view renders from. It is
//! owned by one task; network work happens elsewhere and reports back through
//! [`SessionStore::settle`] and [`SessionStore::apply_channel_event`].
//!
//! A submission is a two-phase append: [`SessionStore::begin_submission`]
//! records the user's input immediately and hands out a [`PendingSubmission`]
//! token; settling consumes the token and appends exactly one terminal entry.

use chrono::Utc;
use tracing::{debug, Level};

use aiterm_client::{CommandTransport, TransportError, GENERIC_EXECUTE_FAILURE};
use aiterm_observability::{emit_event, redact_text, ObservabilityEvent, ProcessKind};
use aiterm_types::{
    ChannelEvent, ConnectedPayload, ConnectionStatus, ExecuteRequest, ExecuteResponse, Executor,
    HealthResponse, HistoryEntry, SystemStatus,
};

pub const DEFAULT_DIRECTORY: &str = "~";

/// Prompts offered on an empty transcript.
pub const EXAMPLE_PROMPTS: [&str; 5] = [
    "show me all python files",
    "open config.json in vscode",
    "go to downloads folder",
    "list all files with details",
    "find adi.c and open it",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubmissionId(u64);

impl SubmissionId {
    pub fn get(self) -> u64 {
        self.0
    }
}

/// Proof that a submission was accepted and has not been settled yet.
///
/// Not `Clone`; [`SessionStore::settle`] consumes it.
#[derive(Debug)]
#[must_use = "a pending submission must be settled"]
pub struct PendingSubmission {
    id: SubmissionId,
    request: ExecuteRequest,
}

impl PendingSubmission {
    pub fn id(&self) -> SubmissionId {
        self.id
    }

    pub fn request(&self) -> &ExecuteRequest {
        &self.request
    }
}

#[derive(Debug)]
pub struct SessionStore {
    process: ProcessKind,
    current_directory: String,
    connection: ConnectionStatus,
    is_processing: bool,
    input_value: String,
    system_status: SystemStatus,
    history: Vec<HistoryEntry>,
    in_flight: Option<SubmissionId>,
    next_submission: u64,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionStore {
    pub fn new() -> Self {
        Self::for_process(ProcessKind::Tui)
    }

    pub fn for_process(process: ProcessKind) -> Self {
        Self {
            process,
            current_directory: DEFAULT_DIRECTORY.to_string(),
            connection: ConnectionStatus::Disconnected,
            is_processing: false,
            input_value: String::new(),
            system_status: SystemStatus::default(),
            history: Vec::new(),
            in_flight: None,
            next_submission: 0,
        }
    }

    pub fn history(&self) -> &[HistoryEntry] {
        &self.history
    }

    pub fn current_directory(&self) -> &str {
        &self.current_directory
    }

    pub fn is_connected(&self) -> bool {
        self.connection.is_connected()
    }

    pub fn connection_status(&self) -> ConnectionStatus {
        self.connection
    }

    pub fn is_processing(&self) -> bool {
        self.is_processing
    }

    pub fn input_value(&self) -> &str {
        &self.input_value
    }

    pub fn system_status(&self) -> SystemStatus {
        self.system_status
    }

    pub fn set_input_value(&mut self, text: impl Into<String>) {
        self.input_value = text.into();
    }

    /// Put an example prompt into the input. Out-of-range indexes are ignored.
    pub fn fill_example(&mut self, index: usize) -> Option<&'static str> {
        let prompt = EXAMPLE_PROMPTS.get(index).copied()?;
        self.input_value = prompt.to_string();
        Some(prompt)
    }

    /// First phase of a submission. Returns `None` without touching any state
    /// when the text is blank or another submission is still in flight.
    pub fn begin_submission(
        &mut self,
        text: &str,
        is_voice: bool,
        executor: Executor,
    ) -> Option<PendingSubmission> {
        if text.trim().is_empty() {
            return None;
        }
        if let Some(active) = self.in_flight {
            debug!(
                active = active.get(),
                "submission rejected while another is in flight"
            );
            return None;
        }

        self.next_submission += 1;
        let id = SubmissionId(self.next_submission);
        self.in_flight = Some(id);
        self.is_processing = true;
        self.input_value.clear();
        self.history.push(HistoryEntry::Input {
            content: text.to_string(),
            is_voice,
            directory: self.current_directory.clone(),
            preferred_executor: executor,
            timestamp: Utc::now(),
        });

        let redacted = redact_text(text);
        emit_event(
            Level::INFO,
            self.process,
            ObservabilityEvent {
                event: "submission.begin",
                component: "session",
                submission_id: Some(id.get()),
                executor: Some(executor.as_str()),
                status: Some(if is_voice { "voice" } else { "typed" }),
                detail: Some(&redacted),
                ..Default::default()
            },
        );

        Some(PendingSubmission {
            id,
            request: ExecuteRequest {
                command: text.to_string(),
                is_voice,
                preferred_executor: executor,
            },
        })
    }

    /// Second phase: append the terminal entry and clear the processing flag.
    pub fn settle(
        &mut self,
        pending: PendingSubmission,
        outcome: Result<ExecuteResponse, TransportError>,
    ) {
        if self.in_flight == Some(pending.id) {
            self.in_flight = None;
        }
        self.is_processing = false;

        match outcome {
            Ok(response) => {
                if let Some(dir) = response.new_directory() {
                    self.current_directory = dir.to_string();
                }
                emit_event(
                    Level::INFO,
                    self.process,
                    ObservabilityEvent {
                        event: "submission.settled",
                        component: "session",
                        submission_id: Some(pending.id.get()),
                        executor: response.executor.as_deref(),
                        status: Some(if response.success { "success" } else { "failed" }),
                        ..Default::default()
                    },
                );
                self.append_result(response);
            }
            Err(err) => {
                emit_event(
                    Level::WARN,
                    self.process,
                    ObservabilityEvent {
                        event: "submission.error",
                        component: "session",
                        submission_id: Some(pending.id.get()),
                        executor: Some(pending.request.preferred_executor.as_str()),
                        error_code: Some(err.kind().as_str()),
                        ..Default::default()
                    },
                );
                self.append_error(err.user_message());
            }
        }
    }

    /// Both phases around a single transport call.
    pub async fn submit_command<T>(
        &mut self,
        transport: &T,
        text: &str,
        is_voice: bool,
        executor: Executor,
    ) -> Option<SubmissionId>
    where
        T: CommandTransport + ?Sized,
    {
        let pending = self.begin_submission(text, is_voice, executor)?;
        let id = pending.id();
        let outcome = transport.execute(pending.request()).await;
        self.settle(pending, outcome);
        Some(id)
    }

    pub fn apply_channel_event(&mut self, event: &ChannelEvent) {
        match event {
            ChannelEvent::Status(status) => self.connection = *status,
            ChannelEvent::Connected(payload) => self.apply_connected(payload),
            ChannelEvent::CommandResult(result) => self.append_result(result.clone()),
            ChannelEvent::CommandExecuted(entry) => {
                debug!(
                    command = %entry.command,
                    success = entry.result.success,
                    "backend executed command"
                );
            }
            ChannelEvent::ServerError(err) => {
                emit_event(
                    Level::WARN,
                    self.process,
                    ObservabilityEvent {
                        event: "channel.server_error",
                        component: "session",
                        detail: Some(&err.error),
                        ..Default::default()
                    },
                );
            }
        }
    }

    pub fn apply_health(&mut self, health: &HealthResponse) {
        self.system_status = SystemStatus::from(health);
        self.current_directory = non_blank(health.current_directory.as_deref())
            .unwrap_or(DEFAULT_DIRECTORY)
            .to_string();
    }

    fn apply_connected(&mut self, payload: &ConnectedPayload) {
        self.connection = ConnectionStatus::Connected;
        self.current_directory = non_blank(payload.current_directory.as_deref())
            .unwrap_or(DEFAULT_DIRECTORY)
            .to_string();
    }

    fn append_result(&mut self, response: ExecuteResponse) {
        let mut content = response.display_content().to_string();
        if content.is_empty() {
            if let Some(status) = non_blank(response.status.as_deref()) {
                content = status.to_string();
            }
        }
        self.history.push(HistoryEntry::Output {
            content,
            success: response.success,
            command: response.command,
            ai_interpretation: response.ai_interpretation,
            executor: response.executor,
            directory: response.current_directory,
            timestamp: Utc::now(),
        });
    }

    fn append_error(&mut self, message: String) {
        let content = if message.trim().is_empty() {
            GENERIC_EXECUTE_FAILURE.to_string()
        } else {
            message
        };
        self.history.push(HistoryEntry::Error {
            content,
            timestamp: Utc::now(),
        });
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}
