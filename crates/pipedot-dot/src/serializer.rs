//! DOT serializer (§4.2). Round-trip stable modulo whitespace and comments.

use std::fmt::Write as _;

use pipedot_core::Graph;

/// Serializes a graph back to DOT text: header, sorted graph attrs, nodes in
/// insertion order, edges in original order.
pub fn serialize(graph: &Graph) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "digraph {} {{", sanitize_ident(&graph.name));

    let mut graph_attrs: Vec<(&String, &String)> = graph.graph_attrs.iter().collect();
    graph_attrs.sort_by(|a, b| a.0.cmp(b.0));
    for (key, value) in graph_attrs {
        let _ = writeln!(out, "  {}={};", key, quote(value));
    }

    for node in graph.nodes() {
        let attrs = render_attrs(node.attrs.iter());
        if attrs.is_empty() {
            let _ = writeln!(out, "  {};", sanitize_ident(&node.id));
        } else {
            let _ = writeln!(out, "  {} [{}];", sanitize_ident(&node.id), attrs);
        }
    }

    for edge in graph.edges() {
        let attrs = render_attrs(edge.attrs.iter());
        if attrs.is_empty() {
            let _ = writeln!(
                out,
                "  {} -> {};",
                sanitize_ident(&edge.from),
                sanitize_ident(&edge.to)
            );
        } else {
            let _ = writeln!(
                out,
                "  {} -> {} [{}];",
                sanitize_ident(&edge.from),
                sanitize_ident(&edge.to),
                attrs
            );
        }
    }

    out.push_str("}\n");
    out
}

fn render_attrs<'a>(attrs: impl Iterator<Item = (&'a String, &'a String)>) -> String {
    attrs
        .map(|(k, v)| format!("{k}={}", quote(v)))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Bareword identifiers pass through unquoted; anything else is quoted and
/// escaped.
fn sanitize_ident(raw: &str) -> String {
    let is_bareword = !raw.is_empty()
        && raw
            .chars()
            .all(|c| c.is_alphanumeric() || c == '_' || c == '.' || c == '-' || c == ':');
    if is_bareword {
        raw.to_string()
    } else {
        quote(raw)
    }
}

fn quote(raw: &str) -> String {
    let escaped = raw.replace('\\', "\\\\").replace('"', "\\\"");
    format!("\"{escaped}\"")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    #[test]
    fn deterministic_output() {
        let dot = r#"digraph G { goal="x"; s [shape=Mdiamond]; w [shape=box, prompt="do"]; e [shape=Msquare]; s->w; w->e }"#;
        let graph = parse(dot).unwrap();
        let first = serialize(&graph);
        let second = serialize(&graph);
        assert_eq!(first, second);
    }

    #[test]
    fn round_trip_preserves_structure() {
        let dot = r#"digraph G { goal="x"; s [shape=Mdiamond]; w [shape=box, prompt="do"]; e [shape=Msquare]; s->w; w->e [label="success", condition="outcome = SUCCESS"] }"#;
        let graph = parse(dot).unwrap();
        let text = serialize(&graph);
        let reparsed = parse(&text).unwrap();

        assert_eq!(
            graph.node_ids().collect::<Vec<_>>(),
            reparsed.node_ids().collect::<Vec<_>>()
        );
        for id in graph.node_ids() {
            assert_eq!(
                graph.find_node(id).unwrap().attrs,
                reparsed.find_node(id).unwrap().attrs
            );
        }
        assert_eq!(graph.edges().len(), reparsed.edges().len());
        for (original, round_tripped) in graph.edges().iter().zip(reparsed.edges().iter()) {
            assert_eq!(original.from, round_tripped.from);
            assert_eq!(original.to, round_tripped.to);
            assert_eq!(original.attrs, round_tripped.attrs);
        }
    }

    #[test]
    fn escapes_quotes_and_backslashes() {
        let mut graph = Graph::new("G");
        let mut node = pipedot_core::Node::new("n");
        node.attrs.set("label", "say \"hi\" \\ bye");
        graph.add_node(node).unwrap();
        let text = serialize(&graph);
        assert!(text.contains(r#"say \"hi\" \\ bye"#));
        let reparsed = parse(&text).unwrap();
        assert_eq!(reparsed.find_node("n").unwrap().attrs.get("label"), "say \"hi\" \\ bye");
    }
}
