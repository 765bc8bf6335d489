//! The spec state itself (§3, §6): core metadata plus lanes of cards,
//! exportable to the YAML schema external tooling consumes.

use serde::{Deserialize, Serialize};

use crate::card::{Card, Lane};
use crate::error::SpecResult;

/// Top-level fields of a spec, mirroring the YAML export schema (§6).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SpecCore {
    pub name: String,
    pub version: String,
    pub one_liner: String,
    pub goal: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub constraints: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub success_criteria: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub risks: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl SpecCore {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: "0.1".to_string(),
            ..Default::default()
        }
    }
}

/// A single transcript entry (agent chatter, human answers).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptEntry {
    pub sender: String,
    pub content: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

/// A pending human question raised by `AskHuman` (§4.7).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingQuestion {
    pub id: String,
    pub prompt: String,
    pub options: Vec<String>,
    pub target_agent: Option<String>,
}

/// The mutable state a command actor owns exclusively (§4.7, §5). Readers
/// see it only through a callback executed under a read lock.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SpecState {
    pub core: SpecCore,
    pub lanes: Vec<Lane>,
    #[serde(skip)]
    pub transcript: Vec<TranscriptEntry>,
    #[serde(skip)]
    pub pending_questions: Vec<PendingQuestion>,
}

/// Well-known lane ordering for export: `Ideas`, `Plan`, `Spec`, then any
/// extra lanes alphabetically (§6).
const LANE_ORDER: &[&str] = &["Ideas", "Plan", "Spec"];

impl SpecState {
    pub fn new(core: SpecCore) -> Self {
        Self { core, lanes: Vec::new(), transcript: Vec::new(), pending_questions: Vec::new() }
    }

    pub fn lane(&self, name: &str) -> Option<&Lane> {
        self.lanes.iter().find(|l| l.name == name)
    }

    pub fn lane_mut(&mut self, name: &str) -> &mut Lane {
        if let Some(pos) = self.lanes.iter().position(|l| l.name == name) {
            &mut self.lanes[pos]
        } else {
            self.lanes.push(Lane::new(name));
            self.lanes.last_mut().expect("just pushed")
        }
    }

    pub fn find_card(&self, card_id: &str) -> Option<(&str, &Card)> {
        self.lanes
            .iter()
            .find_map(|lane| lane.cards.iter().find(|c| c.id == card_id).map(|c| (lane.name.as_str(), c)))
    }

    /// Cards from every lane except `Ideas`, the set the exporter draws
    /// from (§4.8 step 1).
    pub fn exportable_cards(&self) -> Vec<&Card> {
        self.lanes
            .iter()
            .filter(|lane| lane.name != "Ideas")
            .flat_map(|lane| lane.sorted_cards())
            .collect()
    }

    /// Serialises to the external YAML schema (§6): lanes sorted per
    /// `LANE_ORDER` then alphabetically, cards sorted by `(order, id)`.
    pub fn to_yaml(&self) -> SpecResult<String> {
        let mut lanes = self.lanes.clone();
        lanes.sort_by(|a, b| lane_rank(&a.name).cmp(&lane_rank(&b.name)).then_with(|| a.name.cmp(&b.name)));
        for lane in &mut lanes {
            let mut sorted: Vec<Card> = lane.sorted_cards().into_iter().cloned().collect();
            std::mem::swap(&mut lane.cards, &mut sorted);
        }
        let exportable = SpecState { core: self.core.clone(), lanes, transcript: Vec::new(), pending_questions: Vec::new() };
        Ok(serde_yaml::to_string(&exportable)?)
    }
}

fn lane_rank(name: &str) -> usize {
    LANE_ORDER.iter().position(|n| *n == name).unwrap_or(LANE_ORDER.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::card::CardType;

    #[test]
    fn lane_mut_creates_missing_lane() {
        let mut state = SpecState::new(SpecCore::new("demo"));
        state.lane_mut("Plan").cards.push(Card {
            id: "c1".to_string(),
            card_type: CardType::Task,
            title: "t".to_string(),
            body: None,
            order: 0.0,
            refs: vec![],
            created_by: "a".to_string(),
        });
        assert_eq!(state.lane("Plan").unwrap().cards.len(), 1);
    }

    #[test]
    fn export_orders_lanes_and_excludes_transcript() {
        let mut state = SpecState::new(SpecCore::new("demo"));
        state.lane_mut("Zeta");
        state.lane_mut("Ideas");
        state.lane_mut("Plan");
        let yaml = state.to_yaml().unwrap();
        let ideas_pos = yaml.find("Ideas").unwrap();
        let plan_pos = yaml.find("Plan").unwrap();
        let zeta_pos = yaml.find("Zeta").unwrap();
        assert!(ideas_pos < plan_pos);
        assert!(plan_pos < zeta_pos);
    }

    #[test]
    fn exportable_cards_exclude_ideas_lane() {
        let mut state = SpecState::new(SpecCore::new("demo"));
        state.lane_mut("Ideas").cards.push(Card {
            id: "i1".to_string(),
            card_type: CardType::Idea,
            title: "idea".to_string(),
            body: None,
            order: 0.0,
            refs: vec![],
            created_by: "a".to_string(),
        });
        assert!(state.exportable_cards().is_empty());
    }
}
