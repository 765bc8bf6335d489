//! Cards and lanes (§3, §4.7): the unit of content a spec state holds.

use serde::{Deserialize, Serialize};

/// The kind of content a card records. Free-form beyond the well-known
/// lane-partitioning categories the exporter inspects (§4.8).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CardType {
    Task,
    Plan,
    Decision,
    Risk,
    Idea,
}

impl CardType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CardType::Task => "task",
            CardType::Plan => "plan",
            CardType::Decision => "decision",
            CardType::Risk => "risk",
            CardType::Idea => "idea",
        }
    }
}

/// A single unit of spec content, positioned within a lane by a fractional
/// `order` (§4.7): ties broken by `id` string ascending.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Card {
    pub id: String,
    #[serde(rename = "type")]
    pub card_type: CardType,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    pub order: f64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub refs: Vec<String>,
    pub created_by: String,
}

impl Card {
    /// Truncates `title: body` to `max_runes` Unicode scalar values, the way
    /// the exporter synthesises a codergen prompt from a card (§4.8).
    pub fn prompt(&self, max_runes: usize) -> String {
        let combined = match &self.body {
            Some(body) if !body.is_empty() => format!("{}: {}", self.title, body),
            _ => self.title.clone(),
        };
        truncate_runes(&combined, max_runes)
    }
}

pub fn truncate_runes(s: &str, max_runes: usize) -> String {
    if s.chars().count() <= max_runes {
        s.to_string()
    } else {
        s.chars().take(max_runes).collect()
    }
}

/// A named column of cards, sorted by `(order, id)` on read (§6).
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Lane {
    pub name: String,
    pub cards: Vec<Card>,
}

impl Lane {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), cards: Vec::new() }
    }

    pub fn sorted_cards(&self) -> Vec<&Card> {
        let mut cards: Vec<&Card> = self.cards.iter().collect();
        cards.sort_by(|a, b| {
            a.order
                .partial_cmp(&b.order)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.id.cmp(&b.id))
        });
        cards
    }
}

/// Computes a fractional order strictly between two neighbours (§4.7),
/// defaulting to a midpoint around 0 when there is no neighbour on a side.
pub fn order_between(before: Option<f64>, after: Option<f64>) -> f64 {
    match (before, after) {
        (Some(b), Some(a)) => (b + a) / 2.0,
        (Some(b), None) => b + 1.0,
        (None, Some(a)) => a - 1.0,
        (None, None) => 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn card(id: &str, order: f64) -> Card {
        Card {
            id: id.to_string(),
            card_type: CardType::Task,
            title: "t".to_string(),
            body: None,
            order,
            refs: vec![],
            created_by: "agent".to_string(),
        }
    }

    #[test]
    fn sorts_by_order_then_id() {
        let lane = Lane { name: "Plan".to_string(), cards: vec![card("b", 1.0), card("a", 1.0), card("c", 0.5)] };
        let ids: Vec<_> = lane.sorted_cards().iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["c", "a", "b"]);
    }

    #[test]
    fn prompt_truncates_to_rune_budget() {
        let c = Card { body: Some("x".repeat(20)), ..card("a", 0.0) };
        assert_eq!(c.prompt(5).chars().count(), 5);
    }

    #[test]
    fn order_between_midpoints_neighbours() {
        assert_eq!(order_between(Some(1.0), Some(3.0)), 2.0);
        assert_eq!(order_between(None, Some(3.0)), 2.0);
        assert_eq!(order_between(Some(1.0), None), 2.0);
        assert_eq!(order_between(None, None), 0.0);
    }
}
