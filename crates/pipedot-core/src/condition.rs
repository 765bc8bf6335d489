//! Edge condition grammar and evaluation (§4.4).
//!
//! `Predicate ::= Clause ( "&&" Clause )*`
//! `Clause    ::= Key ("=" | "!=") Value`

use indexmap::IndexMap;

use crate::error::{CoreError, CoreResult};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Op {
    Eq,
    Ne,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Clause {
    key: String,
    op: Op,
    value: String,
}

/// A parsed condition predicate: a conjunction of key/value clauses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Condition {
    clauses: Vec<Clause>,
}

impl Condition {
    /// Parses a predicate string. An empty string parses to the trivially-true
    /// condition (the vacuous conjunction).
    pub fn parse(source: &str) -> CoreResult<Self> {
        let trimmed = source.trim();
        if trimmed.is_empty() {
            return Ok(Self { clauses: Vec::new() });
        }
        let mut clauses = Vec::new();
        for part in trimmed.split("&&") {
            clauses.push(parse_clause(part)?);
        }
        Ok(Self { clauses })
    }

    /// True iff every clause holds against `bag`. The vacuous (empty)
    /// condition is always true.
    pub fn evaluate(&self, bag: &IndexMap<String, String>) -> bool {
        self.clauses.iter().all(|clause| {
            let actual = bag.get(&clause.key).map(String::as_str).unwrap_or("");
            match clause.op {
                Op::Eq => actual == clause.value,
                Op::Ne => actual != clause.value,
            }
        })
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }
}

fn parse_clause(part: &str) -> CoreResult<Clause> {
    let part = part.trim();
    let (key, op, value) = if let Some(idx) = part.find("!=") {
        (&part[..idx], Op::Ne, &part[idx + 2..])
    } else if let Some(idx) = part.find('=') {
        (&part[..idx], Op::Eq, &part[idx + 1..])
    } else {
        return Err(CoreError::ConditionSyntax(format!(
            "clause `{part}` is missing `=` or `!=`"
        )));
    };
    let key = key.trim().to_string();
    let value = value.trim().to_string();
    if key.is_empty() || value.is_empty() {
        return Err(CoreError::ConditionSyntax(format!(
            "clause `{part}` has an empty key or value"
        )));
    }
    Ok(Clause { key, op, value })
}

/// Evaluates a raw condition string directly; used by the validator's
/// `condition_syntax` rule and by callers that don't want to hold a parsed
/// `Condition` around.
pub fn evaluate(predicate: &str, bag: &IndexMap<String, String>) -> CoreResult<bool> {
    Ok(Condition::parse(predicate)?.evaluate(bag))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bag(pairs: &[(&str, &str)]) -> IndexMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn empty_condition_is_true() {
        assert!(evaluate("", &bag(&[])).unwrap());
    }

    #[test]
    fn eq_and_ne() {
        let b = bag(&[("status", "done")]);
        assert!(evaluate("status = done", &b).unwrap());
        assert!(!evaluate("status != done", &b).unwrap());
        assert!(evaluate("status != other", &b).unwrap());
    }

    #[test]
    fn conjunction_matches_split_evaluation() {
        let b = bag(&[("a", "1"), ("b", "2")]);
        let combined = evaluate("a = 1 && b = 2", &b).unwrap();
        let split = evaluate("a = 1", &b).unwrap() && evaluate("b = 2", &b).unwrap();
        assert_eq!(combined, split);

        let b2 = bag(&[("a", "1"), ("b", "9")]);
        let combined2 = evaluate("a = 1 && b = 2", &b2).unwrap();
        let split2 = evaluate("a = 1", &b2).unwrap() && evaluate("b = 2", &b2).unwrap();
        assert_eq!(combined2, split2);
        assert!(!combined2);
    }

    #[test]
    fn missing_operator_is_syntax_error() {
        assert!(Condition::parse("status done").is_err());
    }

    #[test]
    fn missing_value_is_syntax_error() {
        assert!(Condition::parse("status =").is_err());
    }

    #[test]
    fn absent_key_treated_as_empty_string() {
        let b = bag(&[]);
        assert!(evaluate("missing != present", &b).unwrap());
        assert!(!evaluate("missing = present", &b).unwrap());
    }
}
