//! Reference human-gate bridge (§4.10): a request channel a terminal UI
//! polls (or a message-loop adapter consumes) and a response channel
//! carrying a single answer, wired to the engine's [`Interviewer`] trait.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use pipedot_engine::{CancellationToken, EngineError, EngineResult, Interviewer, Question};
use tokio::sync::{mpsc, oneshot, Mutex};

const CANCELLATION_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// A question surfaced to the UI, carrying the id `answer` must echo back.
#[derive(Debug, Clone)]
pub struct PendingAsk {
    pub id: u64,
    pub context: String,
    pub question: Question,
}

/// Bridges [`Interviewer::ask`] to a UI-facing request/response channel
/// pair. Submitting an answer deactivates the dialog and clears input by
/// construction: each id is answered at most once and then dropped.
pub struct BridgeInterviewer {
    request_tx: mpsc::Sender<PendingAsk>,
    pending: Arc<Mutex<HashMap<u64, oneshot::Sender<String>>>>,
    next_id: AtomicU64,
    cancellation: CancellationToken,
}

impl BridgeInterviewer {
    /// Returns the bridge plus the request receiver a UI consumes.
    pub fn new(cancellation: CancellationToken) -> (Self, mpsc::Receiver<PendingAsk>) {
        let (request_tx, request_rx) = mpsc::channel(32);
        let bridge = Self {
            request_tx,
            pending: Arc::new(Mutex::new(HashMap::new())),
            next_id: AtomicU64::new(1),
            cancellation,
        };
        (bridge, request_rx)
    }

    /// Delivers an answer for a previously issued request id. A stale or
    /// already-answered id is a silent no-op.
    pub async fn answer(&self, id: u64, answer: String) {
        if let Some(tx) = self.pending.lock().await.remove(&id) {
            let _ = tx.send(answer);
        }
    }
}

#[async_trait]
impl Interviewer for BridgeInterviewer {
    async fn ask(&self, context: &str, question: Question) -> EngineResult<String> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let (tx, mut rx) = oneshot::channel();
        self.pending.lock().await.insert(id, tx);

        if self
            .request_tx
            .send(PendingAsk { id, context: context.to_string(), question })
            .await
            .is_err()
        {
            self.pending.lock().await.remove(&id);
            return Err(EngineError::HandlerFailed("wait.human".to_string(), "no interviewer listening".to_string()));
        }

        loop {
            if self.cancellation.is_cancelled() {
                self.pending.lock().await.remove(&id);
                return Err(EngineError::Cancelled);
            }
            match tokio::time::timeout(CANCELLATION_POLL_INTERVAL, &mut rx).await {
                Ok(Ok(answer)) => return Ok(answer),
                Ok(Err(_)) => return Err(EngineError::HandlerFailed("wait.human".to_string(), "answer channel closed".to_string())),
                Err(_) => continue,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn answer_completes_pending_ask() {
        let (bridge, mut requests) = BridgeInterviewer::new(CancellationToken::new());
        let bridge = Arc::new(bridge);
        let asker = bridge.clone();
        let handle = tokio::spawn(async move {
            asker.ask("node", Question { prompt: "continue?".to_string(), options: vec![] }).await
        });

        let pending = requests.recv().await.unwrap();
        bridge.answer(pending.id, "yes".to_string()).await;

        let answer = handle.await.unwrap().unwrap();
        assert_eq!(answer, "yes");
    }

    #[tokio::test]
    async fn cancellation_aborts_pending_ask() {
        let cancellation = CancellationToken::new();
        let (bridge, mut requests) = BridgeInterviewer::new(cancellation.clone());
        let bridge = Arc::new(bridge);
        let asker = bridge.clone();
        let handle = tokio::spawn(async move {
            asker.ask("node", Question { prompt: "continue?".to_string(), options: vec![] }).await
        });

        let _pending = requests.recv().await.unwrap();
        cancellation.cancel();

        let result = handle.await.unwrap();
        assert!(matches!(result, Err(EngineError::Cancelled)));
    }
}
