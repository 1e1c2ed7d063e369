use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use super::Agent;
use crate::error::Result;

/// Deterministic agent that proposes a fixed list of candidates in order.
///
/// Once the list runs out the last candidate is repeated. Every feedback it
/// receives is recorded.
#[derive(Debug, Default)]
pub struct ScriptedAgent {
    candidates: VecDeque<String>,
    last: String,
    feedback: Arc<Mutex<Vec<Option<String>>>>,
    delay: Option<Duration>,
}

impl ScriptedAgent {
    /// Creates an agent that will propose `candidates` in order.
    pub fn new<I, S>(candidates: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            candidates: candidates.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Makes every proposal sleep first, to exercise deadlines.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Returns a handle to the feedback received, one entry per proposal.
    pub fn feedback_log(&self) -> Arc<Mutex<Vec<Option<String>>>> {
        Arc::clone(&self.feedback)
    }
}

#[async_trait]
impl Agent for ScriptedAgent {
    async fn propose(&mut self, _request: &str, feedback: Option<&str>) -> Result<String> {
        if let Ok(mut log) = self.feedback.lock() {
            log.push(feedback.map(str::to_string));
        }

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        if let Some(next) = self.candidates.pop_front() {
            self.last = next;
        }
        Ok(self.last.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_proposes_in_order_then_repeats() {
        let mut agent = ScriptedAgent::new(["SELECT 1", "SELECT 2"]);

        assert_eq!(agent.propose("q", None).await.unwrap(), "SELECT 1");
        assert_eq!(agent.propose("q", Some("Error: x")).await.unwrap(), "SELECT 2");
        assert_eq!(agent.propose("q", Some("Error: y")).await.unwrap(), "SELECT 2");
    }

    #[tokio::test]
    async fn test_records_feedback() {
        let mut agent = ScriptedAgent::new(["SELECT 1"]);
        let log = agent.feedback_log();

        agent.propose("q", None).await.unwrap();
        agent.propose("q", Some("Error: no such table: foo")).await.unwrap();

        assert_eq!(
            *log.lock().unwrap(),
            vec![None, Some("Error: no such table: foo".to_string())]
        );
    }

    #[tokio::test]
    async fn test_summarize_defaults_to_rows() {
        let mut agent = ScriptedAgent::new(Vec::<String>::new());
        assert_eq!(agent.summarize("n\n11").await.unwrap(), "n\n11");
        assert_eq!(agent.propose("q", None).await.unwrap(), "");
    }
}
