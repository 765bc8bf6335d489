//! Interviewer (human gate) contract (§4.10). A polymorphic capability the
//! `wait.human` handler and the swarm orchestrator's agent step delegate to
//! when they need a human answer before continuing.

use async_trait::async_trait;

use crate::error::EngineResult;

#[derive(Debug, Clone)]
pub struct Question {
    pub prompt: String,
    pub options: Vec<String>,
}

/// `ask` blocks until an answer is delivered, the context is cancelled, or a
/// timeout elapses. Concurrent asks are allowed; each must be answered
/// before its own context expires.
#[async_trait]
pub trait Interviewer: Send + Sync {
    async fn ask(&self, context: &str, question: Question) -> EngineResult<String>;
}

/// An interviewer that answers every question with a fixed string, used in
/// tests and headless runs where no human is attached.
pub struct AutoAnswerInterviewer {
    pub answer: String,
}

#[async_trait]
impl Interviewer for AutoAnswerInterviewer {
    async fn ask(&self, _context: &str, _question: Question) -> EngineResult<String> {
        Ok(self.answer.clone())
    }
}
