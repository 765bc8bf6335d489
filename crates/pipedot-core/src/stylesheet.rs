//! CSS-like stylesheet rules used for model resolution (§3, §4.10).

use indexmap::IndexMap;

use crate::graph::Node;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selector {
    Universal,
    Id(String),
    Class(String),
}

impl Selector {
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if raw == "*" {
            Some(Selector::Universal)
        } else if let Some(id) = raw.strip_prefix('#') {
            Some(Selector::Id(id.to_string()))
        } else if let Some(class) = raw.strip_prefix('.') {
            Some(Selector::Class(class.to_string()))
        } else {
            None
        }
    }

    pub fn specificity(&self) -> u8 {
        match self {
            Selector::Universal => 0,
            Selector::Class(_) => 1,
            Selector::Id(_) => 2,
        }
    }

    fn matches(&self, node: &Node) -> bool {
        match self {
            Selector::Universal => true,
            Selector::Id(id) => node.id == *id,
            Selector::Class(class) => node
                .attrs
                .get("class")
                .split_whitespace()
                .any(|c| c == class),
        }
    }
}

#[derive(Debug, Clone)]
pub struct StylesheetRule {
    pub selector: Selector,
    pub properties: IndexMap<String, String>,
    pub declaration_order: usize,
}

/// An ordered set of stylesheet rules, resolved highest-specificity-first
/// with last-declared-wins on ties.
#[derive(Debug, Clone, Default)]
pub struct Stylesheet {
    rules: Vec<StylesheetRule>,
}

impl Stylesheet {
    pub fn new() -> Self {
        Self { rules: Vec::new() }
    }

    pub fn add_rule(&mut self, selector: Selector, properties: IndexMap<String, String>) {
        let declaration_order = self.rules.len();
        self.rules.push(StylesheetRule {
            selector,
            properties,
            declaration_order,
        });
    }

    /// Resolves a property for a node: direct attribute wins outright; else
    /// the highest-specificity matching rule, last-declared on ties.
    pub fn resolve(&self, node: &Node, property: &str) -> Option<String> {
        if let Some(direct) = node.attrs.get_opt(property) {
            return Some(direct.to_string());
        }
        self.rules
            .iter()
            .filter(|r| r.selector.matches(node) && r.properties.contains_key(property))
            .max_by_key(|r| (r.selector.specificity(), r.declaration_order))
            .map(|r| r.properties[property].clone())
    }

    /// Parses the graph-level `model_stylesheet` attribute (§4.10): a
    /// sequence of CSS-like blocks, `selector { key: value; ... }`.
    /// Unparseable selectors are skipped rather than erroring, since a
    /// stylesheet is an optional refinement, not a structural requirement.
    pub fn parse(source: &str) -> Self {
        let mut sheet = Self::new();
        for block in source.split('}') {
            let Some((selector_raw, body)) = block.split_once('{') else { continue };
            let Some(selector) = Selector::parse(selector_raw) else { continue };
            let mut properties = IndexMap::new();
            for decl in body.split(';') {
                let Some((key, value)) = decl.split_once(':') else { continue };
                let key = key.trim().to_string();
                let value = value.trim().to_string();
                if !key.is_empty() && !value.is_empty() {
                    properties.insert(key, value);
                }
            }
            if !properties.is_empty() {
                sheet.add_rule(selector, properties);
            }
        }
        sheet
    }
}

/// Resolves the model for a codergen node: direct `llm_model` attribute
/// first, else the graph-level `model_stylesheet` (§4.10).
pub fn resolve_model(node: &Node, stylesheet: &Stylesheet) -> Option<String> {
    stylesheet.resolve(node, "llm_model")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Node;

    #[test]
    fn direct_attribute_wins_over_stylesheet() {
        let mut node = Node::new("n1");
        node.attrs.set("llm_model", "direct-model");
        let mut sheet = Stylesheet::new();
        sheet.add_rule(Selector::Universal, [("llm_model".to_string(), "default-model".to_string())].into());
        assert_eq!(resolve_model(&node, &sheet), Some("direct-model".to_string()));
    }

    #[test]
    fn id_selector_beats_universal() {
        let mut node = Node::new("n1");
        let mut sheet = Stylesheet::new();
        sheet.add_rule(Selector::Universal, [("llm_model".to_string(), "u".to_string())].into());
        sheet.add_rule(Selector::Id("n1".to_string()), [("llm_model".to_string(), "specific".to_string())].into());
        assert_eq!(resolve_model(&node, &sheet), Some("specific".to_string()));
        node.attrs.set("class", "x");
    }

    #[test]
    fn ties_broken_by_last_declared() {
        let node = Node::new("n1");
        let mut sheet = Stylesheet::new();
        sheet.add_rule(Selector::Universal, [("llm_model".to_string(), "first".to_string())].into());
        sheet.add_rule(Selector::Universal, [("llm_model".to_string(), "second".to_string())].into());
        assert_eq!(resolve_model(&node, &sheet), Some("second".to_string()));
    }

    #[test]
    fn parses_css_like_blocks() {
        let sheet = Stylesheet::parse("* { llm_model: gpt-4o; } #special { llm_model: claude-3-5-sonnet; }");
        let plain = Node::new("n1");
        assert_eq!(resolve_model(&plain, &sheet), Some("gpt-4o".to_string()));
        let special = Node::new("special");
        assert_eq!(resolve_model(&special, &sheet), Some("claude-3-5-sonnet".to_string()));
    }

    #[test]
    fn unparseable_blocks_are_skipped() {
        let sheet = Stylesheet::parse("not-a-selector { llm_model: x; } * { llm_model: default; }");
        let node = Node::new("n1");
        assert_eq!(resolve_model(&node, &sheet), Some("default".to_string()));
    }
}
