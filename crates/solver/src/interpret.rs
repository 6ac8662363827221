//! Reading a model back into relation contents.
//!
//! A relation's content under a model is its lower bound plus every
//! optional tuple whose selector the model sets to true. The result is
//! a plain, serializable structure with atom names instead of indices,
//! suitable for printing or JSON export.

use std::collections::BTreeMap;

use membound_encoder::Justification;
use serde::Serialize;

use crate::model::Model;
use crate::translate::Translation;

/// One relation's resolved tuples, by atom name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RelationTrace {
    pub relation: String,
    pub tuples: Vec<Vec<String>>,
}

/// A full satisfying execution, one entry per relation in declaration
/// order. Relations whose content is empty are omitted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExecutionTrace {
    pub relations: Vec<RelationTrace>,
}

impl ExecutionTrace {
    pub fn relation(&self, name: &str) -> Option<&RelationTrace> {
        self.relations.iter().find(|r| r.relation == name)
    }

    pub fn contains(&self, relation: &str, tuple: &[&str]) -> bool {
        self.relation(relation)
            .map(|r| r.tuples.iter().any(|t| t == tuple))
            .unwrap_or(false)
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|_| "{}".to_string())
    }

    /// Action names sorted by the given ordering relation. A total
    /// order assigns each action a distinct predecessor count, which is
    /// its position. Useful with a per-thread ordering to list one
    /// thread's view of the run.
    pub fn ordered_actions(&self, ordering: &str) -> Vec<String> {
        let rel = match self.relation(ordering) {
            Some(r) => r,
            None => return Vec::new(),
        };
        let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
        for tuple in &rel.tuples {
            if tuple.len() == 2 {
                counts.entry(tuple[0].as_str()).or_insert(0);
                *counts.entry(tuple[1].as_str()).or_insert(0) += 1;
            }
        }
        let mut names: Vec<(&str, usize)> = counts.into_iter().collect();
        names.sort_by_key(|&(_, c)| c);
        names.into_iter().map(|(n, _)| n.to_string()).collect()
    }
}

/// Resolve every relation of the justification under `model`.
pub fn execution_trace(
    justification: &Justification,
    translation: &Translation,
    model: &Model,
) -> ExecutionTrace {
    let pool = justification.pool();
    let universe = justification.universe();
    let bounds = justification.bounds();

    let mut relations = Vec::new();
    for relation in pool.iter() {
        let rel = relation.id();
        let mut tuples: Vec<Vec<String>> = Vec::new();
        if let Some(lower) = bounds.lower(rel) {
            for tuple in lower.iter() {
                tuples.push(
                    tuple
                        .atoms()
                        .iter()
                        .map(|a| universe.name(*a).to_string())
                        .collect(),
                );
            }
        }
        for (name, sel_rel, tuple) in translation.selectors() {
            if *sel_rel == rel && model.is_true(name) {
                tuples.push(
                    tuple
                        .atoms()
                        .iter()
                        .map(|a| universe.name(*a).to_string())
                        .collect(),
                );
            }
        }
        if tuples.is_empty() {
            continue;
        }
        tuples.sort();
        relations.push(RelationTrace {
            relation: relation.name().to_string(),
            tuples,
        });
    }
    ExecutionTrace { relations }
}
