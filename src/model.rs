use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    #[default]
    Idle,
    Running,
    Paused,
    Completed,
    Stopped,
}

impl SessionState {
    /// Running or Paused: a session is live and a new Start is rejected.
    pub fn is_live(self) -> bool {
        matches!(self, SessionState::Running | SessionState::Paused)
    }
}

/// Point-in-time view of the session, as answered to `get_status`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionStatus {
    pub state: SessionState,
    pub is_running: bool,
    pub is_paused: bool,
    pub current_index: usize,
    pub text_length: usize,
    /// Epoch milliseconds, shifted forward by every completed pause.
    pub started_at: Option<u64>,
    pub paused_at: Option<u64>,
    pub total_duration_ms: u64,
    pub remaining_ms: u64,
    pub words_total: usize,
    pub words_typed: usize,
}

/// Everything needed to restart an interrupted run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    #[serde(flatten)]
    pub status: SessionStatus,
    pub text: String,
}

/// Asynchronous notifications sent to the observer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Notification {
    Progress {
        progress: f64,
        current_index: usize,
        words_typed: usize,
    },
    Paused {
        current_index: usize,
    },
    Resumed {
        current_index: usize,
    },
    Completed,
    Stopped,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Request {
    Start {
        text: String,
        total_duration_minutes: f64,
        #[serde(default)]
        start_index: usize,
    },
    Pause,
    Resume,
    Stop,
    GetStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Response {
    Started { current_index: usize },
    Paused { current_index: usize },
    Resumed { current_index: usize },
    Stopped,
    /// The request did not apply to the current state and changed nothing.
    Ignored { current_index: usize },
    Status(SessionStatus),
}
