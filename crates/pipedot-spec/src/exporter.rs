//! Graph exporter (§4.8): turns a spec state into a validated DAG ready
//! for the engine.

use std::collections::{HashMap, HashSet, VecDeque};

use pipedot_core::graph::{Attrs, Edge, Graph, Node};

use crate::card::{Card, CardType};
use crate::error::{SpecError, SpecResult};
use crate::state::SpecState;

const PROMPT_RUNE_BUDGET: usize = 500;

fn is_conditional_title(title: &str) -> bool {
    let lower = title.to_lowercase();
    word_match(&lower, "if") || word_match(&lower, "when")
}

fn word_match(haystack: &str, word: &str) -> bool {
    haystack.split(|c: char| !c.is_alphanumeric()).any(|token| token == word)
}

enum Segment<'a> {
    Conditional(&'a Card),
    Regular(Vec<&'a Card>),
}

fn split_into_segments<'a>(cards: &[&'a Card]) -> Vec<Segment<'a>> {
    let mut segments = Vec::new();
    let mut run: Vec<&Card> = Vec::new();
    for card in cards {
        if is_conditional_title(&card.title) {
            if !run.is_empty() {
                segments.push(Segment::Regular(std::mem::take(&mut run)));
            }
            segments.push(Segment::Conditional(card));
        } else {
            run.push(card);
        }
    }
    if !run.is_empty() {
        segments.push(Segment::Regular(run));
    }
    segments
}

/// Orders `cards` by their `refs` dependency graph (a referenced card must
/// run before the card referencing it). Falls back to original order for
/// any cycle remainder (§4.8 step 3).
fn topo_order<'a>(cards: &[&'a Card]) -> Vec<&'a Card> {
    let ids: HashSet<&str> = cards.iter().map(|c| c.id.as_str()).collect();
    let mut indegree: HashMap<&str, usize> = cards.iter().map(|c| (c.id.as_str(), 0)).collect();
    let mut dependents: HashMap<&str, Vec<&str>> = HashMap::new();

    for card in cards {
        for r in &card.refs {
            if ids.contains(r.as_str()) {
                *indegree.get_mut(card.id.as_str()).unwrap() += 1;
                dependents.entry(r.as_str()).or_default().push(card.id.as_str());
            }
        }
    }

    let mut ready: VecDeque<&str> = cards.iter().filter(|c| indegree[c.id.as_str()] == 0).map(|c| c.id.as_str()).collect();
    let mut ordered_ids = Vec::new();
    let mut seen = HashSet::new();

    while let Some(id) = ready.pop_front() {
        if !seen.insert(id) {
            continue;
        }
        ordered_ids.push(id);
        if let Some(deps) = dependents.get(id) {
            for &d in deps {
                let entry = indegree.get_mut(d).unwrap();
                *entry -= 1;
                if *entry == 0 {
                    ready.push_back(d);
                }
            }
        }
    }

    for card in cards {
        if !seen.contains(card.id.as_str()) {
            ordered_ids.push(card.id.as_str());
            seen.insert(card.id.as_str());
        }
    }

    let by_id: HashMap<&str, &Card> = cards.iter().map(|c| (c.id.as_str(), *c)).collect();
    ordered_ids.into_iter().filter_map(|id| by_id.get(id).copied()).collect()
}

fn codergen_node(id: impl Into<String>, prompt: impl Into<String>) -> Node {
    let mut node = Node::new(id);
    node.attrs.set("shape", "box");
    node.attrs.set("type", "codergen");
    node.attrs.set("prompt", prompt.into());
    node
}

fn gate_node(id: impl Into<String>, condition: impl Into<String>) -> Node {
    let mut node = Node::new(id);
    node.attrs.set("shape", "diamond");
    node.attrs.set("type", "conditional");
    node.attrs.set("condition", condition.into());
    node
}

fn plain_edge(from: &str, to: &str) -> Edge {
    Edge { id: String::new(), from: from.to_string(), to: to.to_string(), attrs: Attrs::new() }
}

fn labelled_edge(from: &str, to: &str, label: &str, condition: &str) -> Edge {
    let mut attrs = Attrs::new();
    attrs.set("label", label);
    attrs.set("condition", condition);
    Edge { id: String::new(), from: from.to_string(), to: to.to_string(), attrs }
}

/// Exports a validated DAG from `state` (§4.8). Rejects with
/// `GeneratedInvalid` if the produced graph carries any error diagnostic.
pub fn export_graph(state: &SpecState) -> SpecResult<Graph> {
    let mut graph = Graph::new(if state.core.name.is_empty() { "spec".to_string() } else { state.core.name.clone() });

    let mut start = Node::new("start");
    start.attrs.set("shape", "Mdiamond");
    start.attrs.set("type", "start");
    graph.add_node(start)?;

    let mut exit = Node::new("exit");
    exit.attrs.set("shape", "Msquare");
    exit.attrs.set("type", "exit");
    graph.add_node(exit)?;

    let cards = state.exportable_cards();
    let (risk_cards, other_cards): (Vec<&Card>, Vec<&Card>) =
        cards.into_iter().partition(|c| c.card_type == CardType::Risk);

    let mut cursor = "start".to_string();

    for segment in split_into_segments(&other_cards) {
        match segment {
            Segment::Conditional(card) => {
                let gate_id = format!("gate_{}", card.id);
                let box_id = format!("box_{}", card.id);
                let after_id = format!("after_{}", card.id);

                graph.add_node(gate_node(gate_id.clone(), "verified = yes"))?;
                graph.add_node(codergen_node(box_id.clone(), card.prompt(PROMPT_RUNE_BUDGET)))?;
                graph.add_node(codergen_node(after_id.clone(), format!("continue after {}", card.title)))?;

                graph.add_edge(plain_edge(&cursor, &gate_id))?;
                graph.add_edge(labelled_edge(&gate_id, &box_id, "success", "outcome = SUCCESS"))?;
                graph.add_edge(labelled_edge(&gate_id, &after_id, "fail", "outcome = FAIL"))?;
                graph.add_edge(plain_edge(&box_id, &after_id))?;

                cursor = after_id;
            }
            Segment::Regular(run) => {
                for card in topo_order(&run) {
                    let node_id = card.id.clone();
                    graph.add_node(codergen_node(node_id.clone(), card.prompt(PROMPT_RUNE_BUDGET)))?;
                    graph.add_edge(plain_edge(&cursor, &node_id))?;
                    cursor = node_id;
                }
            }
        }
    }

    if !risk_cards.is_empty() {
        let summary = risk_cards.iter().map(|c| c.title.as_str()).collect::<Vec<_>>().join("; ");
        graph.add_node(gate_node("verify_risks", "verified = yes"))?;
        graph.add_node(codergen_node("remediate", crate::card::truncate_runes(&format!("remediate: {summary}"), PROMPT_RUNE_BUDGET)))?;
        graph.add_node(codergen_node("risk_cleared", "risks cleared"))?;

        graph.add_edge(plain_edge(&cursor, "verify_risks"))?;
        graph.add_edge(labelled_edge("verify_risks", "risk_cleared", "success", "outcome = SUCCESS"))?;
        graph.add_edge(labelled_edge("verify_risks", "remediate", "fail", "outcome = FAIL"))?;
        graph.add_edge(plain_edge("remediate", "verify_risks"))?;

        cursor = "risk_cleared".to_string();
    }

    graph.add_edge(plain_edge(&cursor, "exit"))?;
    graph.assign_edge_ids();

    let goal = if !state.core.goal.is_empty() {
        state.core.goal.clone()
    } else {
        format!("{}: {}", state.core.name, state.core.one_liner)
    };
    graph.update_graph_attrs([("goal".to_string(), goal), ("rankdir".to_string(), "TB".to_string())]);

    let diagnostics = pipedot_validate::validate(&graph);
    let error_count = diagnostics.iter().filter(|d| d.severity == pipedot_core::Severity::Error).count();
    if error_count > 0 {
        return Err(SpecError::GeneratedInvalid(error_count));
    }

    Ok(graph)
}
