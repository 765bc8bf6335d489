//! The structured result of a handler invocation (§3).

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OutcomeStatus {
    Success,
    Fail,
    Skip,
}

impl OutcomeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutcomeStatus::Success => "SUCCESS",
            OutcomeStatus::Fail => "FAIL",
            OutcomeStatus::Skip => "SKIP",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Outcome {
    pub status: OutcomeStatus,
    #[serde(default)]
    pub data: IndexMap<String, Value>,
    #[serde(default)]
    pub diff_summary: Option<String>,
    #[serde(default)]
    pub tokens_used: Option<u64>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub tool_calls: Vec<String>,
    /// Label preferred by the producing handler when routing (e.g. "success"/"fail" on
    /// a diamond). Always overwritten on each stage so stale values never linger.
    #[serde(default)]
    pub preferred_label: Option<String>,
    #[serde(default)]
    pub failure_reason: Option<String>,
}

impl Outcome {
    pub fn success() -> Self {
        Self {
            status: OutcomeStatus::Success,
            data: IndexMap::new(),
            diff_summary: None,
            tokens_used: None,
            model: None,
            tool_calls: Vec::new(),
            preferred_label: None,
            failure_reason: None,
        }
    }

    pub fn fail(reason: impl Into<String>) -> Self {
        Self {
            status: OutcomeStatus::Fail,
            failure_reason: Some(reason.into()),
            ..Self::success()
        }
    }

    pub fn skip() -> Self {
        Self {
            status: OutcomeStatus::Skip,
            ..Self::success()
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.preferred_label = Some(label.into());
        self
    }

    pub fn with_data(mut self, key: impl Into<String>, value: Value) -> Self {
        self.data.insert(key.into(), value);
        self
    }

    /// Flattens status, preferred label, and data into a string bag for
    /// condition evaluation (§4.4).
    pub fn as_bag(&self) -> IndexMap<String, String> {
        let mut bag = IndexMap::new();
        bag.insert("outcome".to_string(), self.status.as_str().to_string());
        bag.insert(
            "preferred_label".to_string(),
            self.preferred_label.clone().unwrap_or_default(),
        );
        for (k, v) in &self.data {
            let s = match v {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            bag.insert(k.clone(), s);
        }
        bag
    }
}
