//! Commands the spec-state actor accepts (§4.7): the only mutation path.

use crate::card::CardType;
use crate::state::SpecCore;

#[derive(Debug, Clone)]
pub enum Command {
    SetCore(SpecCore),
    CreateCard {
        lane: String,
        card_type: CardType,
        title: String,
        body: Option<String>,
        refs: Vec<String>,
        created_by: String,
    },
    UpdateCard {
        card_id: String,
        title: Option<String>,
        body: Option<String>,
        refs: Option<Vec<String>>,
    },
    MoveCard {
        card_id: String,
        lane: String,
        order: f64,
    },
    DeleteCard {
        card_id: String,
    },
    AppendTranscript {
        sender: String,
        content: String,
    },
    AskHuman {
        prompt: String,
        options: Vec<String>,
        target_agent: Option<String>,
    },
    AnswerHuman {
        question_id: String,
        answer: String,
    },
    StartAgentStep {
        agent_id: String,
        description: String,
    },
    FinishAgentStep {
        agent_id: String,
        diff_summary: String,
    },
}

/// What applying a command hands back to the caller: a monotonic sequence
/// number and, for commands that mint an id, that id.
#[derive(Debug, Clone, Default)]
pub struct CommandAck {
    pub seq: u64,
    pub card_id: Option<String>,
    pub question_id: Option<String>,
}
