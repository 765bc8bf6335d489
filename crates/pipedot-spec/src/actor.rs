//! The command-log actor (§4.7): a single task serialises every mutation;
//! readers see a consistent snapshot through a callback run under a read
//! lock, never by touching the actor's mutable state directly.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::{broadcast, mpsc, oneshot, RwLock};
use tracing::{info, warn};

use crate::card::{order_between, Card};
use crate::command::{Command, CommandAck};
use crate::error::{SpecError, SpecResult};
use crate::event::{SpecEvent, SpecEventKind};
use crate::state::{PendingQuestion, SpecState, TranscriptEntry};

const EVENT_CHANNEL_CAPACITY: usize = 256;

type Envelope = (Command, oneshot::Sender<SpecResult<CommandAck>>);

/// A handle to a running spec actor. Cheaply cloneable; every clone shares
/// the same underlying task and state.
#[derive(Clone)]
pub struct SpecHandle {
    cmd_tx: mpsc::Sender<Envelope>,
    state: Arc<RwLock<SpecState>>,
    events: broadcast::Sender<SpecEvent>,
}

impl SpecHandle {
    /// Reads a consistent snapshot via `f`, executed under the internal
    /// read lock (§4.7, §5).
    pub async fn read<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&SpecState) -> R,
    {
        let guard = self.state.read().await;
        f(&guard)
    }

    /// Subscribes to state-change events. Each call returns an independent
    /// receiver so one slow or late subscriber never drains events meant
    /// for another (§4.9).
    pub fn subscribe(&self) -> broadcast::Receiver<SpecEvent> {
        self.events.subscribe()
    }

    pub async fn apply(&self, command: Command) -> SpecResult<CommandAck> {
        let (tx, rx) = oneshot::channel();
        self.cmd_tx.send((command, tx)).await.map_err(|_| SpecError::ActorGone)?;
        rx.await.map_err(|_| SpecError::ActorGone)?
    }
}

/// Spawns the actor task owning `state` and returns a handle to it.
pub fn spawn_spec_actor(state: SpecState) -> SpecHandle {
    let (cmd_tx, mut cmd_rx) = mpsc::channel::<Envelope>(64);
    let (events_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
    let shared = Arc::new(RwLock::new(state));

    let handle = SpecHandle { cmd_tx, state: shared.clone(), events: events_tx.clone() };

    tokio::spawn(async move {
        let seq = AtomicU64::new(0);
        while let Some((command, reply)) = cmd_rx.recv().await {
            let kind = event_kind_for(&command);
            let mut guard = shared.write().await;
            let result = apply_command(&mut guard, command, &seq);
            drop(guard);

            if let Ok(ack) = &result {
                let event = SpecEvent { seq: ack.seq, kind, card_id: ack.card_id.clone(), timestamp: now() };
                let _ = events_tx.send(event);
            }

            if reply.send(result).is_err() {
                warn!("spec command caller dropped before reply was sent");
            }
        }
        info!("spec actor shutting down: command channel closed");
    });

    handle
}

fn event_kind_for(command: &Command) -> SpecEventKind {
    match command {
        Command::SetCore(_) => SpecEventKind::CoreUpdated,
        Command::CreateCard { .. } => SpecEventKind::CardCreated,
        Command::UpdateCard { .. } => SpecEventKind::CardUpdated,
        Command::MoveCard { .. } => SpecEventKind::CardMoved,
        Command::DeleteCard { .. } => SpecEventKind::CardDeleted,
        Command::AppendTranscript { .. } => SpecEventKind::TranscriptAppended,
        Command::AskHuman { .. } => SpecEventKind::HumanAsked,
        Command::AnswerHuman { .. } => SpecEventKind::HumanAnswered,
        Command::StartAgentStep { .. } => SpecEventKind::AgentStepStarted,
        Command::FinishAgentStep { .. } => SpecEventKind::AgentStepFinished,
    }
}

fn now() -> chrono::DateTime<chrono::Utc> {
    chrono::Utc::now()
}

fn apply_command(state: &mut SpecState, command: Command, seq: &AtomicU64) -> SpecResult<CommandAck> {
    let seq_no = seq.fetch_add(1, Ordering::SeqCst) + 1;

    let (card_id, question_id) = match command {
        Command::SetCore(core) => {
            state.core = core;
            (None, None)
        }
        Command::CreateCard { lane, card_type, title, body, refs, created_by } => {
            let id = ulid::Ulid::new().to_string();
            let last_order = state
                .lane(&lane)
                .and_then(|l| l.cards.iter().map(|c| c.order).max_by(|a, b| a.total_cmp(b)));
            let order = order_between(last_order, None);
            state.lane_mut(&lane).cards.push(Card {
                id: id.clone(),
                card_type,
                title,
                body,
                order,
                refs,
                created_by,
            });
            (Some(id), None)
        }
        Command::UpdateCard { card_id, title, body, refs } => {
            let card = find_card_mut(state, &card_id)?;
            if let Some(title) = title {
                card.title = title;
            }
            if let Some(body) = body {
                card.body = Some(body);
            }
            if let Some(refs) = refs {
                card.refs = refs;
            }
            (Some(card_id), None)
        }
        Command::MoveCard { card_id, lane, order } => {
            let mut removed = None;
            for l in &mut state.lanes {
                if let Some(pos) = l.cards.iter().position(|c| c.id == card_id) {
                    removed = Some(l.cards.remove(pos));
                    break;
                }
            }
            let mut card = removed.ok_or_else(|| SpecError::CardNotFound(card_id.clone()))?;
            card.order = order;
            state.lane_mut(&lane).cards.push(card);
            (Some(card_id), None)
        }
        Command::DeleteCard { card_id } => {
            let mut found = false;
            for l in &mut state.lanes {
                let before = l.cards.len();
                l.cards.retain(|c| c.id != card_id);
                if l.cards.len() != before {
                    found = true;
                }
            }
            if !found {
                return Err(SpecError::CardNotFound(card_id));
            }
            (Some(card_id), None)
        }
        Command::AppendTranscript { sender, content } => {
            state.transcript.push(TranscriptEntry { sender, content, timestamp: now() });
            (None, None)
        }
        Command::AskHuman { prompt, options, target_agent } => {
            let id = ulid::Ulid::new().to_string();
            state.pending_questions.push(PendingQuestion { id: id.clone(), prompt, options, target_agent });
            (None, Some(id))
        }
        Command::AnswerHuman { question_id, answer } => {
            let pos = state
                .pending_questions
                .iter()
                .position(|q| q.id == question_id)
                .ok_or_else(|| SpecError::QuestionNotFound(question_id.clone()))?;
            let question = state.pending_questions.remove(pos);
            state.transcript.push(TranscriptEntry {
                sender: "human".to_string(),
                content: format!("[answer to {}] {}", question.prompt, answer),
                timestamp: now(),
            });
            (None, Some(question_id))
        }
        Command::StartAgentStep { agent_id, description } => {
            state.transcript.push(TranscriptEntry { sender: agent_id, content: format!("started: {description}"), timestamp: now() });
            (None, None)
        }
        Command::FinishAgentStep { agent_id, diff_summary } => {
            state.transcript.push(TranscriptEntry { sender: agent_id, content: format!("finished: {diff_summary}"), timestamp: now() });
            (None, None)
        }
    };

    Ok(CommandAck { seq: seq_no, card_id, question_id })
}

fn find_card_mut<'a>(state: &'a mut SpecState, card_id: &str) -> SpecResult<&'a mut Card> {
    state
        .lanes
        .iter_mut()
        .find_map(|lane| lane.cards.iter_mut().find(|c| c.id == card_id))
        .ok_or_else(|| SpecError::CardNotFound(card_id.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::card::CardType;
    use crate::state::SpecCore;

    #[tokio::test]
    async fn create_then_read_card() {
        let handle = spawn_spec_actor(SpecState::new(SpecCore::new("demo")));
        let ack = handle
            .apply(Command::CreateCard {
                lane: "Plan".to_string(),
                card_type: CardType::Task,
                title: "Build the thing".to_string(),
                body: None,
                refs: vec![],
                created_by: "planner".to_string(),
            })
            .await
            .unwrap();
        let card_id = ack.card_id.unwrap();
        let found = handle.read(|s| s.find_card(&card_id).is_some()).await;
        assert!(found);
    }

    #[tokio::test]
    async fn sequence_numbers_are_monotonic() {
        let handle = spawn_spec_actor(SpecState::new(SpecCore::new("demo")));
        let a = handle.apply(Command::AppendTranscript { sender: "x".to_string(), content: "1".to_string() }).await.unwrap();
        let b = handle.apply(Command::AppendTranscript { sender: "x".to_string(), content: "2".to_string() }).await.unwrap();
        assert!(b.seq > a.seq);
    }

    #[tokio::test]
    async fn update_missing_card_errors() {
        let handle = spawn_spec_actor(SpecState::new(SpecCore::new("demo")));
        let err = handle
            .apply(Command::UpdateCard { card_id: "ghost".to_string(), title: Some("x".to_string()), body: None, refs: None })
            .await
            .unwrap_err();
        assert!(matches!(err, SpecError::CardNotFound(_)));
    }

    #[tokio::test]
    async fn ask_then_answer_human_clears_question() {
        let handle = spawn_spec_actor(SpecState::new(SpecCore::new("demo")));
        let ack = handle
            .apply(Command::AskHuman { prompt: "continue?".to_string(), options: vec!["yes".to_string(), "no".to_string()], target_agent: None })
            .await
            .unwrap();
        let question_id = ack.question_id.unwrap();
        handle.apply(Command::AnswerHuman { question_id, answer: "yes".to_string() }).await.unwrap();
        let pending = handle.read(|s| s.pending_questions.len()).await;
        assert_eq!(pending, 0);
    }
}
