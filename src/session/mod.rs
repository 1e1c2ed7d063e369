//! Sessions: one user request and its bounded sequence of attempts.
//!
//! A [`Session`] is the audit trail of a request. It refuses to record more
//! attempts than its cap and it takes exactly one terminal status.

mod controller;

pub use controller::RetryController;

use serde::Serialize;
use std::time::Duration;

use crate::error::{GateError, Result};
use crate::query::{ExecutionOutcome, GatewayReply};
use crate::safety::ValidationVerdict;

/// Default number of attempts per request.
pub const DEFAULT_ATTEMPT_CAP: usize = 5;

/// Lifecycle of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    /// Attempts may still be recorded.
    InProgress,
    /// A query ran successfully.
    Succeeded,
    /// The attempt cap was reached without a success.
    ExhaustedRetries,
    /// The session deadline passed without a success.
    DeadlineExceeded,
}

impl SessionStatus {
    /// Returns true for every status but `InProgress`.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::InProgress)
    }
}

/// One validate-then-maybe-execute cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttemptRecord {
    /// 1-based position in the session.
    pub index: usize,
    /// The raw query text the agent proposed.
    pub query: String,
    /// The validator's decision.
    pub verdict: ValidationVerdict,
    /// Present only if the query was executed.
    pub outcome: Option<ExecutionOutcome>,
    /// The text returned to the agent.
    pub feedback: String,
}

impl AttemptRecord {
    /// Returns true if this attempt executed successfully.
    pub fn is_success(&self) -> bool {
        self.outcome.as_ref().is_some_and(ExecutionOutcome::is_success)
    }
}

/// A user request and its attempts.
#[derive(Debug, Clone, Serialize)]
pub struct Session {
    request: String,
    attempt_cap: usize,
    attempts: Vec<AttemptRecord>,
    status: SessionStatus,
    answer: Option<String>,
    note: Option<String>,
}

impl Session {
    /// Starts a session for `request`.
    pub fn new(request: impl Into<String>, attempt_cap: usize) -> Self {
        Self {
            request: request.into(),
            attempt_cap,
            attempts: Vec::new(),
            status: SessionStatus::InProgress,
            answer: None,
            note: None,
        }
    }

    /// The user request this session answers.
    pub fn request(&self) -> &str {
        &self.request
    }

    /// Maximum number of attempts.
    pub fn attempt_cap(&self) -> usize {
        self.attempt_cap
    }

    /// Attempts so far, in order.
    pub fn attempts(&self) -> &[AttemptRecord] {
        &self.attempts
    }

    /// Current lifecycle status.
    pub fn status(&self) -> SessionStatus {
        self.status
    }

    /// The final answer, set on success.
    pub fn answer(&self) -> Option<&str> {
        self.answer.as_deref()
    }

    /// The user-visible note, set when the session ends without a result.
    pub fn note(&self) -> Option<&str> {
        self.note.as_deref()
    }

    /// What to show the user: the answer or the note.
    pub fn final_message(&self) -> Option<&str> {
        self.answer().or(self.note())
    }

    /// Returns true if another attempt may be recorded.
    pub fn can_attempt(&self) -> bool {
        !self.status.is_terminal() && self.attempts.len() < self.attempt_cap
    }

    /// Rows of the successful attempt, if one was recorded.
    pub fn successful_rows(&self) -> Option<&str> {
        self.attempts
            .iter()
            .find(|a| a.is_success())
            .map(|a| a.feedback.as_str())
    }

    /// Appends an attempt.
    ///
    /// Fails if the session is terminal, the cap is reached, or a success
    /// was already recorded.
    pub fn record(&mut self, query: impl Into<String>, reply: GatewayReply) -> Result<&AttemptRecord> {
        if self.status.is_terminal() {
            return Err(GateError::internal(format!(
                "attempt recorded on a finished session ({:?})",
                self.status
            )));
        }
        if self.attempts.len() >= self.attempt_cap {
            return Err(GateError::internal(format!(
                "attempt cap of {} exceeded",
                self.attempt_cap
            )));
        }
        if self.successful_rows().is_some() {
            return Err(GateError::internal("attempt recorded after a success"));
        }

        let feedback = reply.to_tool_text();
        self.attempts.push(AttemptRecord {
            index: self.attempts.len() + 1,
            query: query.into(),
            verdict: reply.verdict,
            outcome: reply.outcome,
            feedback,
        });
        self.attempts
            .last()
            .ok_or_else(|| GateError::internal("attempt was not recorded"))
    }

    /// Ends the session successfully with `answer`.
    pub fn succeed(&mut self, answer: impl Into<String>) -> Result<()> {
        if self.successful_rows().is_none() {
            return Err(GateError::internal(
                "session marked succeeded without a successful attempt",
            ));
        }
        self.finish(SessionStatus::Succeeded)?;
        self.answer = Some(answer.into());
        Ok(())
    }

    /// Ends the session because the attempt cap was reached.
    pub fn exhaust(&mut self) -> Result<()> {
        if self.attempts.len() < self.attempt_cap {
            return Err(GateError::internal(format!(
                "session exhausted after {} of {} attempts",
                self.attempts.len(),
                self.attempt_cap
            )));
        }
        self.finish(SessionStatus::ExhaustedRetries)?;

        let mut note = format!(
            "I could not answer this request within {} attempts.",
            self.attempt_cap
        );
        if let Some(last) = self.attempts.last() {
            note.push_str(&format!(" The last attempt failed with: {}", last.feedback));
        }
        self.note = Some(note);
        Ok(())
    }

    /// Ends the session because its deadline passed.
    pub fn expire(&mut self, deadline: Duration) -> Result<()> {
        self.finish(SessionStatus::DeadlineExceeded)?;
        self.note = Some(format!(
            "I could not answer this request within the {}s time limit ({} attempt(s) made).",
            deadline.as_secs(),
            self.attempts.len()
        ));
        Ok(())
    }

    fn finish(&mut self, status: SessionStatus) -> Result<()> {
        if self.status.is_terminal() {
            return Err(GateError::internal(format!(
                "session already finished as {:?}, cannot become {:?}",
                self.status, status
            )));
        }
        self.status = status;
        Ok(())
    }
}
