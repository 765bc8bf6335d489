//! Validator (lint): ~24 structural and semantic rules over an immutable
//! graph snapshot (§4.3). Never aborts on first failure — every rule runs
//! and contributes its diagnostics.

use pipedot_core::graph::{KNOWN_FIDELITIES, KNOWN_HANDLER_KINDS, KNOWN_SHAPES};
use pipedot_core::{Condition, CoreError, CoreResult, Diagnostic, Graph};

/// One structural or semantic check. Implementations never panic; an
/// unparseable attribute is itself a diagnostic, not an `Err`.
pub trait LintRule {
    fn id(&self) -> &'static str;
    fn check(&self, graph: &Graph) -> Vec<Diagnostic>;
}

struct StartNode;
impl LintRule for StartNode {
    fn id(&self) -> &'static str {
        "start_node"
    }
    fn check(&self, graph: &Graph) -> Vec<Diagnostic> {
        let starts: Vec<_> = graph.nodes().filter(|n| n.is_start()).collect();
        match starts.len() {
            1 => vec![],
            0 => vec![Diagnostic::error(self.id(), "graph has no start sentinel")],
            n => vec![Diagnostic::error(
                self.id(),
                format!("graph has {n} start sentinels, expected exactly one"),
            )],
        }
    }
}

struct ExitNode;
impl LintRule for ExitNode {
    fn id(&self) -> &'static str {
        "exit_node"
    }
    fn check(&self, graph: &Graph) -> Vec<Diagnostic> {
        if graph.exit_nodes().next().is_some() {
            vec![]
        } else {
            vec![Diagnostic::error(self.id(), "graph has no exit sentinel")]
        }
    }
}

struct Reachability;
impl LintRule for Reachability {
    fn id(&self) -> &'static str {
        "reachability"
    }
    fn check(&self, graph: &Graph) -> Vec<Diagnostic> {
        let Some(start) = graph.find_start_node() else {
            return vec![];
        };
        let reached = graph.reachable_from(&start.id);
        graph
            .node_ids()
            .filter(|id| !reached.contains(id.as_str()))
            .map(|id| {
                Diagnostic::error(self.id(), format!("node `{id}` is unreachable from start")).with_node(id.clone())
            })
            .collect()
    }
}

struct StartNoIncoming;
impl LintRule for StartNoIncoming {
    fn id(&self) -> &'static str {
        "start_no_incoming"
    }
    fn check(&self, graph: &Graph) -> Vec<Diagnostic> {
        let Some(start) = graph.find_start_node() else {
            return vec![];
        };
        if graph.incoming_edges(&start.id).is_empty() {
            vec![]
        } else {
            vec![Diagnostic::error(self.id(), "start node has incoming edges").with_node(start.id.clone())]
        }
    }
}

struct ExitNoOutgoing;
impl LintRule for ExitNoOutgoing {
    fn id(&self) -> &'static str {
        "exit_no_outgoing"
    }
    fn check(&self, graph: &Graph) -> Vec<Diagnostic> {
        graph
            .exit_nodes()
            .filter(|n| !graph.outgoing_edges(&n.id).is_empty())
            .map(|n| Diagnostic::error(self.id(), "exit node has outgoing edges").with_node(n.id.clone()))
            .collect()
    }
}

struct SelfLoop;
impl LintRule for SelfLoop {
    fn id(&self) -> &'static str {
        "self_loop"
    }
    fn check(&self, graph: &Graph) -> Vec<Diagnostic> {
        graph
            .edges()
            .iter()
            .filter(|e| e.from == e.to)
            .map(|e| Diagnostic::error(self.id(), format!("edge `{}` is a self-loop", e.id)).with_edge(e.id.clone()))
            .collect()
    }
}

struct EdgeTargetExists;
impl LintRule for EdgeTargetExists {
    fn id(&self) -> &'static str {
        "edge_target_exists"
    }
    fn check(&self, graph: &Graph) -> Vec<Diagnostic> {
        graph
            .edges()
            .iter()
            .filter(|e| graph.find_node(&e.from).is_none() || graph.find_node(&e.to).is_none())
            .map(|e| {
                Diagnostic::error(self.id(), format!("edge `{}` references a missing endpoint", e.id))
                    .with_edge(e.id.clone())
            })
            .collect()
    }
}

struct ConditionSyntax;
impl LintRule for ConditionSyntax {
    fn id(&self) -> &'static str {
        "condition_syntax"
    }
    fn check(&self, graph: &Graph) -> Vec<Diagnostic> {
        graph
            .edges()
            .iter()
            .filter_map(|e| {
                let cond = e.condition();
                if cond.is_empty() {
                    return None;
                }
                Condition::parse(cond).err().map(|err| {
                    Diagnostic::error(self.id(), format!("edge `{}` has invalid condition: {err}", e.id))
                        .with_edge(e.id.clone())
                })
            })
            .collect()
    }
}

struct DeadEnd;
impl LintRule for DeadEnd {
    fn id(&self) -> &'static str {
        "dead_end"
    }
    fn check(&self, graph: &Graph) -> Vec<Diagnostic> {
        graph
            .nodes()
            .filter(|n| !n.is_exit() && graph.outgoing_edges(&n.id).is_empty())
            .map(|n| Diagnostic::warning(self.id(), format!("node `{}` is a dead end", n.id)).with_node(n.id.clone()))
            .collect()
    }
}

struct ValidShape;
impl LintRule for ValidShape {
    fn id(&self) -> &'static str {
        "valid_shape"
    }
    fn check(&self, graph: &Graph) -> Vec<Diagnostic> {
        graph
            .nodes()
            .filter(|n| {
                let shape = n.attrs.get("shape");
                !shape.is_empty() && !KNOWN_SHAPES.contains(&shape)
            })
            .map(|n| {
                Diagnostic::warning(self.id(), format!("node `{}` has unrecognised shape `{}`", n.id, n.attrs.get("shape")))
                    .with_node(n.id.clone())
            })
            .collect()
    }
}

struct PromptRequired;
impl LintRule for PromptRequired {
    fn id(&self) -> &'static str {
        "prompt_required"
    }
    fn check(&self, graph: &Graph) -> Vec<Diagnostic> {
        graph
            .nodes()
            .filter(|n| n.is_codergen() && n.attrs.get_opt("prompt").is_none() && n.attrs.get_opt("label").is_none())
            .map(|n| {
                Diagnostic::warning(self.id(), format!("codergen node `{}` has no prompt or label", n.id)).with_node(n.id.clone())
            })
            .collect()
    }
}

struct MaxRetries;
impl LintRule for MaxRetries {
    fn id(&self) -> &'static str {
        "max_retries"
    }
    fn check(&self, graph: &Graph) -> Vec<Diagnostic> {
        graph
            .nodes()
            .filter_map(|n| {
                let raw = n.attrs.get_opt("max_retries")?;
                if raw.parse::<u32>().is_ok() {
                    None
                } else {
                    Some(
                        Diagnostic::warning(self.id(), format!("node `{}` has non-numeric max_retries `{raw}`", n.id))
                            .with_node(n.id.clone()),
                    )
                }
            })
            .collect()
    }
}

struct GoalGateCodergen;
impl LintRule for GoalGateCodergen {
    fn id(&self) -> &'static str {
        "goal_gate_codergen"
    }
    fn check(&self, graph: &Graph) -> Vec<Diagnostic> {
        graph
            .nodes()
            .filter(|n| n.attrs.get("goal_gate") == "true" && !n.is_codergen())
            .map(|n| {
                Diagnostic::warning(self.id(), format!("node `{}` sets goal_gate but is not codergen", n.id)).with_node(n.id.clone())
            })
            .collect()
    }
}

struct GoalGateHasRetry;
impl LintRule for GoalGateHasRetry {
    fn id(&self) -> &'static str {
        "goal_gate_has_retry"
    }
    fn check(&self, graph: &Graph) -> Vec<Diagnostic> {
        graph
            .nodes()
            .filter(|n| n.attrs.get("goal_gate") == "true" && n.attrs.get_opt("retry_target").is_none())
            .map(|n| {
                Diagnostic::warning(self.id(), format!("node `{}` has goal_gate without retry_target", n.id))
                    .with_node(n.id.clone())
            })
            .collect()
    }
}

struct IncompleteOutcomes;
impl LintRule for IncompleteOutcomes {
    fn id(&self) -> &'static str {
        "incomplete_outcomes"
    }
    fn check(&self, graph: &Graph) -> Vec<Diagnostic> {
        graph
            .nodes()
            .filter(|n| n.attrs.get("shape") == "diamond" || n.attrs.get("shape") == "Mdiamond")
            .filter(|n| {
                let out = graph.outgoing_edges(&n.id);
                let has_success = out.iter().any(|e| e.label() == "success");
                let has_fail = out.iter().any(|e| e.label() == "fail");
                !out.is_empty() && !(has_success && has_fail)
            })
            .map(|n| {
                Diagnostic::warning(self.id(), format!("diamond node `{}` lacks a success/fail edge pair", n.id))
                    .with_node(n.id.clone())
            })
            .collect()
    }
}

struct ValidWeight;
impl LintRule for ValidWeight {
    fn id(&self) -> &'static str {
        "valid_weight"
    }
    fn check(&self, graph: &Graph) -> Vec<Diagnostic> {
        graph
            .edges()
            .iter()
            .filter_map(|e| {
                let raw = e.attrs.get_opt("weight")?;
                match raw.parse::<i64>() {
                    Ok(n) if n > 0 => None,
                    _ => Some(
                        Diagnostic::warning(self.id(), format!("edge `{}` has non-positive weight `{raw}`", e.id))
                            .with_edge(e.id.clone()),
                    ),
                }
            })
            .collect()
    }
}

struct ValidFidelity;
impl LintRule for ValidFidelity {
    fn id(&self) -> &'static str {
        "valid_fidelity"
    }
    fn check(&self, graph: &Graph) -> Vec<Diagnostic> {
        graph
            .nodes()
            .filter_map(|n| {
                let raw = n.attrs.get_opt("fidelity")?;
                if KNOWN_FIDELITIES.contains(&raw) {
                    None
                } else {
                    Some(
                        Diagnostic::warning(self.id(), format!("node `{}` has unrecognised fidelity `{raw}`", n.id))
                            .with_node(n.id.clone()),
                    )
                }
            })
            .collect()
    }
}

struct ValidRankdir;
impl LintRule for ValidRankdir {
    fn id(&self) -> &'static str {
        "valid_rankdir"
    }
    fn check(&self, graph: &Graph) -> Vec<Diagnostic> {
        match graph.graph_attrs.get_opt("rankdir") {
            Some(v) if !["LR", "TB", "RL", "BT"].contains(&v) => {
                vec![Diagnostic::warning(self.id(), format!("graph has unrecognised rankdir `{v}`"))]
            }
            _ => vec![],
        }
    }
}

struct GraphGoal;
impl LintRule for GraphGoal {
    fn id(&self) -> &'static str {
        "graph_goal"
    }
    fn check(&self, graph: &Graph) -> Vec<Diagnostic> {
        if graph.graph_attrs.get_opt("goal").is_some() {
            vec![]
        } else {
            vec![Diagnostic::warning(self.id(), "graph has no goal attribute")]
        }
    }
}

struct RetryTarget;
impl LintRule for RetryTarget {
    fn id(&self) -> &'static str {
        "retry_target"
    }
    fn check(&self, graph: &Graph) -> Vec<Diagnostic> {
        graph
            .nodes()
            .filter_map(|n| {
                let target = n.attrs.get_opt("retry_target")?;
                if graph.find_node(target).is_some() {
                    None
                } else {
                    Some(
                        Diagnostic::warning(self.id(), format!("node `{}` retry_target `{target}` does not exist", n.id))
                            .with_node(n.id.clone()),
                    )
                }
            })
            .collect()
    }
}

struct TypeKnown;
impl LintRule for TypeKnown {
    fn id(&self) -> &'static str {
        "type_known"
    }
    fn check(&self, graph: &Graph) -> Vec<Diagnostic> {
        graph
            .nodes()
            .filter_map(|n| {
                let kind = n.attrs.get_opt("type")?;
                if KNOWN_HANDLER_KINDS.contains(&kind) {
                    None
                } else {
                    Some(Diagnostic::warning(self.id(), format!("node `{}` has unrecognised type `{kind}`", n.id)).with_node(n.id.clone()))
                }
            })
            .collect()
    }
}

fn rules() -> Vec<Box<dyn LintRule>> {
    vec![
        Box::new(StartNode),
        Box::new(ExitNode),
        Box::new(Reachability),
        Box::new(StartNoIncoming),
        Box::new(ExitNoOutgoing),
        Box::new(SelfLoop),
        Box::new(EdgeTargetExists),
        Box::new(ConditionSyntax),
        Box::new(DeadEnd),
        Box::new(ValidShape),
        Box::new(PromptRequired),
        Box::new(MaxRetries),
        Box::new(GoalGateCodergen),
        Box::new(GoalGateHasRetry),
        Box::new(IncompleteOutcomes),
        Box::new(ValidWeight),
        Box::new(ValidFidelity),
        Box::new(ValidRankdir),
        Box::new(GraphGoal),
        Box::new(RetryTarget),
        Box::new(TypeKnown),
    ]
}

/// Runs every rule against the graph and returns every diagnostic, in rule
/// order. Never aborts early.
pub fn validate(graph: &Graph) -> Vec<Diagnostic> {
    rules().iter().flat_map(|rule| rule.check(graph)).collect()
}

/// Runs `validate` and raises `GraphInvalid` if any error-severity diagnostic
/// is present.
pub fn validate_or_raise(graph: &Graph) -> CoreResult<Vec<Diagnostic>> {
    let diagnostics = validate(graph);
    let error_count = diagnostics
        .iter()
        .filter(|d| d.severity == pipedot_core::Severity::Error)
        .count();
    if error_count > 0 {
        return Err(CoreError::GraphInvalid(error_count));
    }
    Ok(diagnostics)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pipedot_dot::parse;

    fn errors_of<'a>(diagnostics: &'a [Diagnostic]) -> Vec<&'a Diagnostic> {
        diagnostics.iter().filter(|d| d.severity == pipedot_core::Severity::Error).collect()
    }

    #[test]
    fn canonical_positive_example_has_zero_errors() {
        let dot = r#"digraph G { goal="x"; s [shape=Mdiamond]; w [shape=box, prompt="do"]; e [shape=Msquare]; s->w; w->e }"#;
        let graph = parse(dot).unwrap();
        assert!(errors_of(&validate(&graph)).is_empty());
    }

    #[test]
    fn unreachable_node_flags_reachability_error() {
        let dot = r#"digraph G { goal="x"; s [shape=Mdiamond]; w [shape=box, prompt="do"]; e [shape=Msquare]; island [shape=box]; s->w; w->e }"#;
        let graph = parse(dot).unwrap();
        let diagnostics = validate(&graph);
        let hit = diagnostics.iter().find(|d| d.rule == "reachability").unwrap();
        assert_eq!(hit.node_id.as_deref(), Some("island"));
        assert_eq!(hit.severity, pipedot_core::Severity::Error);
    }

    #[test]
    fn missing_start_is_an_error() {
        let dot = r#"digraph G { w [shape=box, prompt="do"]; e [shape=Msquare]; w->e }"#;
        let graph = parse(dot).unwrap();
        assert!(validate(&graph).iter().any(|d| d.rule == "start_node"));
    }

    #[test]
    fn self_loop_detected() {
        let dot = r#"digraph G { s [shape=Mdiamond]; e [shape=Msquare]; s->s; s->e }"#;
        let graph = parse(dot).unwrap();
        assert!(validate(&graph).iter().any(|d| d.rule == "self_loop"));
    }

    #[test]
    fn dead_end_is_warning_not_error() {
        let dot = r#"digraph G { s [shape=Mdiamond]; w [shape=box, prompt="do"]; e [shape=Msquare]; s->w }"#;
        let graph = parse(dot).unwrap();
        let diagnostics = validate(&graph);
        let hit = diagnostics.iter().find(|d| d.rule == "dead_end").unwrap();
        assert_eq!(hit.severity, pipedot_core::Severity::Warning);
    }

    #[test]
    fn validate_or_raise_fails_closed_on_errors() {
        let dot = r#"digraph G { w [shape=box, prompt="do"]; }"#;
        let graph = parse(dot).unwrap();
        assert!(validate_or_raise(&graph).is_err());
    }

    #[test]
    fn goal_gate_requires_codergen_and_retry_target() {
        let dot = r#"digraph G { s [shape=Mdiamond]; d [shape=diamond, goal_gate="true"]; e [shape=Msquare]; s->d; d->e }"#;
        let graph = parse(dot).unwrap();
        let diagnostics = validate(&graph);
        assert!(diagnostics.iter().any(|d| d.rule == "goal_gate_codergen" && d.node_id.as_deref() == Some("d")));
        assert!(diagnostics.iter().any(|d| d.rule == "goal_gate_has_retry" && d.node_id.as_deref() == Some("d")));
    }

    #[test]
    fn invalid_condition_syntax_is_error() {
        let dot = r#"digraph G { s [shape=Mdiamond]; w [shape=box, prompt="do"]; e [shape=Msquare]; s->w; w->e [condition="broken no operator"] }"#;
        let graph = parse(dot).unwrap();
        let diagnostics = validate(&graph);
        let hit = diagnostics.iter().find(|d| d.rule == "condition_syntax").unwrap();
        assert_eq!(hit.severity, pipedot_core::Severity::Error);
    }
}
