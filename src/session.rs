use crate::error::{CadenceError, Result};
use crate::model::{SessionSnapshot, SessionState, SessionStatus};

/// Count words as maximal runs of non-whitespace code points.
pub fn count_words(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Position reached after one character was consumed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Progress {
    pub fraction: f64,
    pub current_index: usize,
    pub words_typed: usize,
}

/// One run of typing a text block over a target duration.
///
/// Time arguments are epoch milliseconds supplied by the caller, so every
/// transition here is a pure function of its inputs.
#[derive(Debug, Clone)]
pub struct TypingSession {
    text: Vec<char>,
    current_index: usize,
    state: SessionState,
    mean_interval_ms: f64,
    started_at: u64,
    paused_at: Option<u64>,
    total_duration_ms: u64,
    words_total: usize,
    words_typed: usize,
}

impl TypingSession {
    /// Create a Running session positioned at `start_index`.
    ///
    /// The mean interval is always derived from the full text, also when the
    /// session continues a previous run from a later index.
    pub fn start(text: &str, total_duration_ms: u64, start_index: usize, now: u64) -> Result<Self> {
        let chars: Vec<char> = text.chars().collect();
        if chars.is_empty() {
            return Err(CadenceError::invalid_request("text is empty"));
        }
        if start_index > chars.len() {
            return Err(CadenceError::invalid_request(format!(
                "start index {start_index} is past the end of a {}-character text",
                chars.len()
            )));
        }

        let prefix: String = chars[..start_index].iter().collect();

        Ok(Self {
            mean_interval_ms: total_duration_ms as f64 / chars.len() as f64,
            words_total: count_words(text),
            words_typed: count_words(&prefix),
            text: chars,
            current_index: start_index,
            state: SessionState::Running,
            started_at: now,
            paused_at: None,
            total_duration_ms,
        })
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn len(&self) -> usize {
        self.text.len()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    pub fn mean_interval_ms(&self) -> f64 {
        self.mean_interval_ms
    }

    pub fn started_at(&self) -> u64 {
        self.started_at
    }

    pub fn paused_at(&self) -> Option<u64> {
        self.paused_at
    }

    /// The next character to type, or `None` once the text is consumed.
    pub fn current_char(&self) -> Option<char> {
        self.text.get(self.current_index).copied()
    }

    pub fn is_exhausted(&self) -> bool {
        self.current_index >= self.text.len()
    }

    /// Consume the current character, whether it reached the surface or was skipped.
    pub fn advance(&mut self) -> Option<Progress> {
        let c = self.current_char()?;
        let starts_word = !c.is_whitespace()
            && (self.current_index == 0 || self.text[self.current_index - 1].is_whitespace());
        if starts_word {
            self.words_typed += 1;
        }
        self.current_index += 1;

        Some(Progress {
            fraction: self.current_index as f64 / self.text.len() as f64,
            current_index: self.current_index,
            words_typed: self.words_typed,
        })
    }

    pub fn pause(&mut self, now: u64) -> bool {
        if self.state != SessionState::Running {
            return false;
        }
        self.state = SessionState::Paused;
        self.paused_at = Some(now);
        true
    }

    /// Leave Paused, moving `started_at` forward by the time spent paused so
    /// the pause never eats into the duration budget.
    pub fn resume(&mut self, now: u64) -> bool {
        if self.state != SessionState::Paused {
            return false;
        }
        let paused_at = self.paused_at.take().unwrap_or(now);
        self.started_at = self.started_at.saturating_add(now.saturating_sub(paused_at));
        self.state = SessionState::Running;
        true
    }

    pub fn stop(&mut self) -> bool {
        if !self.state.is_live() {
            return false;
        }
        self.state = SessionState::Stopped;
        self.paused_at = None;
        true
    }

    pub fn complete(&mut self) -> bool {
        if self.state != SessionState::Running || !self.is_exhausted() {
            return false;
        }
        self.state = SessionState::Completed;
        true
    }

    pub fn elapsed_ms(&self, now: u64) -> u64 {
        let until = match self.state {
            SessionState::Paused => self.paused_at.unwrap_or(now),
            _ => now,
        };
        until.saturating_sub(self.started_at)
    }

    pub fn remaining_ms(&self, now: u64) -> u64 {
        match self.state {
            SessionState::Running | SessionState::Paused => {
                self.total_duration_ms.saturating_sub(self.elapsed_ms(now))
            }
            _ => 0,
        }
    }

    pub fn status(&self, now: u64) -> SessionStatus {
        SessionStatus {
            state: self.state,
            is_running: self.state.is_live(),
            is_paused: self.state == SessionState::Paused,
            current_index: self.current_index,
            text_length: self.text.len(),
            started_at: Some(self.started_at),
            paused_at: self.paused_at,
            total_duration_ms: self.total_duration_ms,
            remaining_ms: self.remaining_ms(now),
            words_total: self.words_total,
            words_typed: self.words_typed,
        }
    }

    pub fn snapshot(&self, now: u64) -> SessionSnapshot {
        SessionSnapshot {
            status: self.status(now),
            text: self.text.iter().collect(),
        }
    }
}
