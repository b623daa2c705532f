//! Request and response bodies for the backend REST API.

use serde::{Deserialize, Serialize};

use crate::executor::Executor;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExecuteRequest {
    pub command: String,
    pub is_voice: bool,
    pub preferred_executor: Executor,
}

/// Backend translation metadata for a natural-language command.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AiInterpretation {
    #[serde(default)]
    pub confidence: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
    #[serde(default)]
    pub needs_file_search: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_file: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub search_results: Vec<String>,
}

impl AiInterpretation {
    /// Confidence as a whole percentage, clamped to `0..=100`.
    pub fn confidence_percent(&self) -> u8 {
        if !self.confidence.is_finite() {
            return 0;
        }
        (self.confidence.clamp(0.0, 1.0) * 100.0).round() as u8
    }
}

/// Shape shared by `POST /api/execute` and the `command_result` channel event.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ExecuteResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub output: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub executor: Option<String>,
    #[serde(default)]
    pub command: Option<String>,
    #[serde(default)]
    pub ai_interpretation: Option<AiInterpretation>,
    #[serde(default)]
    pub current_directory: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

impl ExecuteResponse {
    /// Stdout when present, otherwise the error text.
    pub fn display_content(&self) -> String {
        match (self.output.as_deref(), self.error.as_deref()) {
            (Some(out), _) if !out.is_empty() => out.to_string(),
            (_, Some(err)) if !err.is_empty() => err.to_string(),
            _ => String::new(),
        }
    }

    /// The reported working directory, ignoring blank values.
    pub fn new_directory(&self) -> Option<&str> {
        self.current_directory
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct HealthResponse {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub gemini_available: bool,
    #[serde(default)]
    pub mini_bash_available: bool,
    #[serde(default)]
    pub current_directory: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct DirectoryResponse {
    pub current_directory: String,
    #[serde(default)]
    pub home_directory: Option<String>,
    #[serde(default)]
    pub exists: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RemoteCommandResult {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub output: String,
    #[serde(default)]
    pub error: String,
    #[serde(default)]
    pub executor: String,
}

/// One backend-side execution record, as served by `/api/history` and the
/// `command_executed` channel event.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RemoteHistoryEntry {
    #[serde(default)]
    pub timestamp: String,
    #[serde(default)]
    pub user_input: String,
    #[serde(default)]
    pub command: String,
    #[serde(default)]
    pub is_voice: bool,
    #[serde(default)]
    pub result: RemoteCommandResult,
    #[serde(default)]
    pub ai_interpretation: Option<AiInterpretation>,
    #[serde(default)]
    pub directory: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct HistoryResponse {
    #[serde(default)]
    pub history: Vec<RemoteHistoryEntry>,
    #[serde(default)]
    pub total: usize,
}

/// Commands the sandbox executor could not handle and fell back on.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct FeedbackEntry {
    #[serde(default)]
    pub timestamp: String,
    #[serde(default)]
    pub command: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub error: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct FeedbackResponse {
    #[serde(default)]
    pub feedback: Vec<FeedbackEntry>,
    #[serde(default)]
    pub total: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchRequest {
    pub filename: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_dir: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SearchResponse {
    #[serde(default)]
    pub results: Vec<String>,
    #[serde(default)]
    pub count: usize,
    #[serde(default)]
    pub search_term: String,
}

/// Error body the backend attaches to non-2xx responses.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ErrorBody {
    #[serde(default)]
    pub error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn execute_response_prefers_output_over_error() {
        let resp: ExecuteResponse = serde_json::from_str(
            r#"{"success":true,"output":"a.py\nb.py","error":"","executor":"mini-bash"}"#,
        )
        .unwrap();
        assert_eq!(resp.display_content(), "a.py\nb.py");

        let resp: ExecuteResponse =
            serde_json::from_str(r#"{"success":false,"output":"","error":"boom"}"#).unwrap();
        assert_eq!(resp.display_content(), "boom");
    }

    #[test]
    fn execute_response_tolerates_processing_ack() {
        let resp: ExecuteResponse =
            serde_json::from_str(r#"{"status":"processing","command":"ls"}"#).unwrap();
        assert!(!resp.success);
        assert_eq!(resp.status.as_deref(), Some("processing"));
        assert_eq!(resp.display_content(), "");
    }

    #[test]
    fn blank_directory_is_not_a_change() {
        let resp = ExecuteResponse {
            current_directory: Some("  ".into()),
            ..Default::default()
        };
        assert_eq!(resp.new_directory(), None);
    }

    #[test]
    fn confidence_percent_rounds_and_clamps() {
        let ai = AiInterpretation {
            confidence: 0.856,
            ..Default::default()
        };
        assert_eq!(ai.confidence_percent(), 86);
        let ai = AiInterpretation {
            confidence: 1.7,
            ..Default::default()
        };
        assert_eq!(ai.confidence_percent(), 100);
    }

    #[test]
    fn search_request_omits_missing_start_dir() {
        let body = serde_json::to_value(SearchRequest {
            filename: "adi.c".into(),
            start_dir: None,
        })
        .unwrap();
        assert_eq!(body, serde_json::json!({"filename": "adi.c"}));
    }
}
