//! The retry loop.
//!
//! Runs agent, validator and executor strictly in sequence: each attempt's
//! feedback decides the next candidate, so nothing here runs in parallel.

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use super::{Session, DEFAULT_ATTEMPT_CAP};
use crate::agent::Agent;
use crate::error::{GateError, Result};
use crate::query::Gateway;

/// Orchestrates one request at a time against a gateway.
pub struct RetryController {
    gateway: Arc<Gateway>,
    attempt_cap: usize,
    deadline: Option<Duration>,
}

impl RetryController {
    /// Creates a controller with the default attempt cap and no deadline.
    pub fn new(gateway: Arc<Gateway>) -> Self {
        Self {
            gateway,
            attempt_cap: DEFAULT_ATTEMPT_CAP,
            deadline: None,
        }
    }

    /// Sets the attempt cap.
    pub fn with_attempt_cap(mut self, attempt_cap: usize) -> Self {
        self.attempt_cap = attempt_cap;
        self
    }

    /// Sets a wall-clock limit for a whole session.
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Returns the gateway attempts go through.
    pub fn gateway(&self) -> &Gateway {
        &self.gateway
    }

    /// Runs one request to a terminal status.
    ///
    /// Returns `Err` only when the agent itself fails (LLM transport) or the
    /// configuration cannot run any attempt. Rejections, execution failures,
    /// exhaustion and a missed deadline all end in an `Ok` session.
    pub async fn run_session(&self, agent: &mut dyn Agent, request: &str) -> Result<Session> {
        if self.attempt_cap == 0 {
            return Err(GateError::config("attempt cap must be at least 1"));
        }

        let mut session = Session::new(request, self.attempt_cap);

        match self.deadline {
            None => self.drive(agent, &mut session).await?,
            Some(deadline) => {
                match tokio::time::timeout(deadline, self.drive(agent, &mut session)).await {
                    Ok(result) => result?,
                    Err(_) => self.on_deadline(&mut session, deadline)?,
                }
            }
        }

        info!(
            status = ?session.status(),
            attempts = session.attempts().len(),
            "Session finished"
        );
        Ok(session)
    }

    async fn drive(&self, agent: &mut dyn Agent, session: &mut Session) -> Result<()> {
        let mut feedback: Option<String> = None;

        while session.can_attempt() {
            let candidate = agent
                .propose(session.request(), feedback.as_deref())
                .await?;
            let reply = self.gateway.attempt(&candidate).await;
            let (index, succeeded, text) = {
                let record = session.record(candidate, reply)?;
                (record.index, record.is_success(), record.feedback.clone())
            };

            if succeeded {
                info!(attempt = index, "Attempt succeeded");
                let answer = match agent.summarize(&text).await {
                    Ok(answer) => answer,
                    Err(e) => {
                        warn!(error = %e, "Could not phrase the answer, returning rows");
                        text
                    }
                };
                return session.succeed(answer);
            }

            info!(
                attempt = index,
                cap = session.attempt_cap(),
                feedback = %text,
                "Attempt failed"
            );
            feedback = Some(text);
        }

        session.exhaust()
    }

    /// A success recorded before the deadline still counts.
    fn on_deadline(&self, session: &mut Session, deadline: Duration) -> Result<()> {
        if let Some(rows) = session.successful_rows().map(str::to_string) {
            return session.succeed(rows);
        }
        warn!(
            deadline_secs = deadline.as_secs(),
            attempts = session.attempts().len(),
            "Session deadline exceeded"
        );
        session.expire(deadline)
    }
}
