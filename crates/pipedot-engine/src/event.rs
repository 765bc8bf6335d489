//! Synchronous event bus (§4.6). Observers must not block; emission always
//! returns after every subscriber has received the event, matching the
//! ordering guarantee in §5 (a handler returns only after observers do).

use serde::{Serialize, Serializer};
use serde_json::Value;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventKind {
    PipelineStarted,
    PipelineCompleted,
    PipelineFailed,
    StageStarted,
    StageCompleted,
    StageFailed,
    StageRetrying,
    CheckpointSaved,
    AgentToolCallStart,
    AgentToolCallEnd,
    AgentLlmTurn,
    AgentTextDelta,
    AgentSteering,
    AgentLoopDetected,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::PipelineStarted => "pipeline.started",
            EventKind::PipelineCompleted => "pipeline.completed",
            EventKind::PipelineFailed => "pipeline.failed",
            EventKind::StageStarted => "stage.started",
            EventKind::StageCompleted => "stage.completed",
            EventKind::StageFailed => "stage.failed",
            EventKind::StageRetrying => "stage.retrying",
            EventKind::CheckpointSaved => "checkpoint.saved",
            EventKind::AgentToolCallStart => "agent.tool_call_start",
            EventKind::AgentToolCallEnd => "agent.tool_call_end",
            EventKind::AgentLlmTurn => "agent.llm_turn",
            EventKind::AgentTextDelta => "agent.text_delta",
            EventKind::AgentSteering => "agent.steering",
            EventKind::AgentLoopDetected => "agent.loop_detected",
        }
    }
}

/// `{type, node_id?, timestamp, data}` per §6's event payload schema.
/// `timestamp` is supplied by the caller rather than sampled internally,
/// since engine code must stay free of wall-clock reads to remain testable.
#[derive(Debug, Clone)]
pub struct Event {
    pub kind: EventKind,
    pub node_id: Option<String>,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub data: Value,
}

impl Serialize for Event {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        use serde::ser::SerializeStruct;
        let mut state = serializer.serialize_struct("Event", 4)?;
        state.serialize_field("type", self.kind.as_str())?;
        state.serialize_field("node_id", &self.node_id)?;
        state.serialize_field("timestamp", &self.timestamp)?;
        state.serialize_field("data", &self.data)?;
        state.end()
    }
}

impl Event {
    pub fn new(kind: EventKind, node_id: Option<String>, timestamp: chrono::DateTime<chrono::Utc>) -> Self {
        Self {
            kind,
            node_id,
            timestamp,
            data: Value::Object(Default::default()),
        }
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = data;
        self
    }
}

pub trait EventSubscriber: Send + Sync {
    fn on_event(&self, event: &Event);
}

/// Fan-out to every registered subscriber, in registration order.
#[derive(Clone, Default)]
pub struct EventBus {
    subscribers: Vec<Arc<dyn EventSubscriber>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, subscriber: Arc<dyn EventSubscriber>) {
        self.subscribers.push(subscriber);
    }

    pub fn publish(&self, event: Event) {
        for subscriber in &self.subscribers {
            subscriber.on_event(&event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct Recorder(Mutex<Vec<String>>);

    impl EventSubscriber for Recorder {
        fn on_event(&self, event: &Event) {
            self.0.lock().unwrap().push(event.kind.as_str().to_string());
        }
    }

    #[test]
    fn publish_reaches_all_subscribers() {
        let mut bus = EventBus::new();
        let recorder = Arc::new(Recorder(Mutex::new(Vec::new())));
        bus.subscribe(recorder.clone());
        bus.publish(Event::new(EventKind::PipelineStarted, None, chrono::Utc::now()));
        bus.publish(Event::new(EventKind::StageStarted, Some("w".to_string()), chrono::Utc::now()));
        assert_eq!(*recorder.0.lock().unwrap(), vec!["pipeline.started", "stage.started"]);
    }
}
