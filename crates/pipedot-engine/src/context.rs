//! Shared run context: the string bag handlers read inputs from and the
//! engine folds outcomes into before edge selection (§4.4, §4.6).

use indexmap::IndexMap;
use pipedot_core::{Outcome, Stylesheet};

/// Context flowing through a single pipeline run. Mutated in place by the
/// scheduler between stages; handlers see it read-only via [`Context::bag`].
#[derive(Debug, Clone, Default)]
pub struct Context {
    bag: IndexMap<String, String>,
    model_stylesheet: Stylesheet,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> &str {
        self.bag.get(key).map(String::as_str).unwrap_or("")
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.bag.insert(key.into(), value.into());
    }

    pub fn bag(&self) -> &IndexMap<String, String> {
        &self.bag
    }

    /// The parsed graph-level `model_stylesheet`, resolved once at run
    /// start (§4.10). Empty when the graph declares no stylesheet.
    pub fn stylesheet(&self) -> &Stylesheet {
        &self.model_stylesheet
    }

    pub fn set_stylesheet(&mut self, sheet: Stylesheet) {
        self.model_stylesheet = sheet;
    }

    /// Folds an outcome's flattened bag into the context, then records
    /// routing-relevant keys the way the engine's stage loop does (§4.6):
    /// `outcome` and `preferred_label` are always overwritten so stale
    /// values from an earlier stage never linger.
    pub fn apply_outcome(&mut self, node_id: &str, outcome: &Outcome) {
        for (k, v) in outcome.as_bag() {
            self.bag.insert(k, v);
        }
        self.bag.insert("current_node".to_string(), node_id.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pipedot_core::Outcome;

    #[test]
    fn apply_outcome_overwrites_routing_keys() {
        let mut ctx = Context::new();
        ctx.set("outcome", "STALE");
        ctx.apply_outcome("w", &Outcome::success().with_label("ok"));
        assert_eq!(ctx.get("outcome"), "SUCCESS");
        assert_eq!(ctx.get("preferred_label"), "ok");
        assert_eq!(ctx.get("current_node"), "w");
    }

    #[test]
    fn absent_key_reads_empty() {
        let ctx = Context::new();
        assert_eq!(ctx.get("missing"), "");
    }
}
