//! Matcher
//!
//! Scores user input against the candidate phrasings of the eligible edges
//! and picks the best one. Candidates are flattened edge by edge, pattern by
//! pattern, so "first seen" means earliest edge, then earliest pattern.
//!
//! The matcher never applies the confidence threshold: a weak best match is
//! still a match. Deciding whether it is good enough belongs to the caller.

use sdk::errors::{EngineError, Result};
use serde::Serialize;
use std::collections::BTreeSet;

use crate::context_gate;
use crate::feature_space::{cosine_similarity, FeatureSpace, SparseVector};
use crate::graph::GraphModel;

/// One phrasing that could move the conversation forward
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candidate<'a> {
    pub vector: &'a SparseVector,
    pub pattern: &'a str,
    pub end_state: &'a str,
}

/// A scored candidate
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Match<'a> {
    pub score: f64,
    pub pattern: &'a str,
    pub end_state: &'a str,
}

/// The flattened candidates reachable from one state
#[derive(Debug, Clone)]
pub struct CandidateSet<'a> {
    state: &'a str,
    candidates: Vec<Candidate<'a>>,
}

impl<'a> CandidateSet<'a> {
    /// Every pattern of every edge leaving `state` that passes the context gate
    ///
    /// # Errors
    ///
    /// Propagates graph lookup errors for undefined or duplicated end states.
    pub fn collect(
        graph: &'a GraphModel,
        state: &'a str,
        active: &BTreeSet<String>,
    ) -> Result<Self> {
        let candidates = context_gate::eligible_edges(graph, state, active)?
            .into_iter()
            .flat_map(|edge| {
                edge.pattern_pairs().map(move |(vector, pattern)| Candidate {
                    vector,
                    pattern,
                    end_state: edge.end_state.as_str(),
                })
            })
            .collect();

        Ok(Self { state, candidates })
    }

    /// Build a set from explicit candidates
    pub fn from_candidates(state: &'a str, candidates: Vec<Candidate<'a>>) -> Self {
        Self { state, candidates }
    }

    pub fn state(&self) -> &'a str {
        self.state
    }

    pub fn candidates(&self) -> &[Candidate<'a>] {
        &self.candidates
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }
}

/// Score every candidate against `input`, in candidate order
pub fn rank<'a>(space: &FeatureSpace, set: &CandidateSet<'a>, input: &str) -> Vec<Match<'a>> {
    let input_vector = space.transform(input);
    set.candidates
        .iter()
        .map(|candidate| Match {
            score: cosine_similarity(&input_vector, candidate.vector),
            pattern: candidate.pattern,
            end_state: candidate.end_state,
        })
        .collect()
}

/// The highest-scoring candidate; ties go to the earliest one
///
/// # Errors
///
/// Returns `EngineError::NoCandidates` when the set is empty.
pub fn best_match<'a>(space: &FeatureSpace, set: &CandidateSet<'a>, input: &str) -> Result<Match<'a>> {
    let mut best: Option<Match<'a>> = None;
    for scored in rank(space, set, input) {
        match best {
            Some(ref current) if scored.score <= current.score => {}
            _ => best = Some(scored),
        }
    }

    best.ok_or_else(|| EngineError::NoCandidates {
        state: set.state.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use sdk::definition::{EdgeRecord, GraphDefinition, NodeRecord, RawRecord};

    fn graph() -> GraphModel {
        GraphModel::load(GraphDefinition::from_records(vec![
            RawRecord::from(NodeRecord::new("entry")),
            NodeRecord::new("files").into(),
            NodeRecord::new("csv").into(),
            NodeRecord::new("plot").into(),
            NodeRecord::new("locked").with_context_require(["key"]).into(),
            EdgeRecord::new(["entry"], "files", ["show me all files"]).into(),
            EdgeRecord::new(["entry"], "csv", ["show me all csv files"]).into(),
            EdgeRecord::new(["entry"], "plot", ["plot the data", "draw a chart"]).into(),
            EdgeRecord::new(["entry"], "locked", ["open sesame"]).into(),
        ]))
        .unwrap()
    }

    #[test]
    fn test_collect_flattens_in_edge_then_pattern_order() {
        let graph = graph();
        let set = CandidateSet::collect(&graph, "entry", &BTreeSet::new()).unwrap();
        let patterns: Vec<&str> = set.candidates().iter().map(|c| c.pattern).collect();
        assert_eq!(
            patterns,
            vec![
                "show me all files",
                "show me all csv files",
                "plot the data",
                "draw a chart"
            ]
        );
        assert_eq!(set.state(), "entry");
    }

    #[test]
    fn test_collect_respects_context_gate() {
        let graph = graph();
        let active: BTreeSet<String> = ["key".to_string()].into_iter().collect();
        let set = CandidateSet::collect(&graph, "entry", &active).unwrap();
        assert_eq!(set.len(), 5);
        assert_eq!(set.candidates()[4].end_state, "locked");
    }

    #[test]
    fn test_best_match_picks_highest_score() {
        let graph = graph();
        let set = CandidateSet::collect(&graph, "entry", &BTreeSet::new()).unwrap();

        let m = best_match(graph.feature_space(), &set, "show me csv files").unwrap();
        assert_eq!(m.end_state, "csv");

        let m = best_match(graph.feature_space(), &set, "draw chart").unwrap();
        assert_eq!(m.end_state, "plot");
        assert_eq!(m.pattern, "draw a chart");
    }

    #[test]
    fn test_exact_pattern_scores_one() {
        let graph = graph();
        let set = CandidateSet::collect(&graph, "entry", &BTreeSet::new()).unwrap();
        let m = best_match(graph.feature_space(), &set, "plot the data").unwrap();
        assert!((m.score - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_ties_go_to_first_candidate() {
        let space = FeatureSpace::fit(["hello"]).unwrap();
        let v = space.transform("hello");
        let set = CandidateSet::from_candidates(
            "entry",
            vec![
                Candidate {
                    vector: &v,
                    pattern: "hello",
                    end_state: "first",
                },
                Candidate {
                    vector: &v,
                    pattern: "hello",
                    end_state: "second",
                },
            ],
        );

        let m = best_match(&space, &set, "hello").unwrap();
        assert_eq!(m.end_state, "first");

        // All-zero scores tie too
        let m = best_match(&space, &set, "nothing known").unwrap();
        assert_eq!(m.score, 0.0);
        assert_eq!(m.end_state, "first");
    }

    #[test]
    fn test_empty_set_is_no_candidates() {
        let space = FeatureSpace::fit(["hello"]).unwrap();
        let set = CandidateSet::from_candidates("dead_end", Vec::new());
        let err = best_match(&space, &set, "hello").unwrap_err();
        assert!(matches!(err, EngineError::NoCandidates { ref state } if state == "dead_end"));
    }

    #[test]
    fn test_rank_keeps_candidate_order() {
        let graph = graph();
        let set = CandidateSet::collect(&graph, "entry", &BTreeSet::new()).unwrap();
        let ranked = rank(graph.feature_space(), &set, "files");
        assert_eq!(ranked.len(), set.len());
        assert_eq!(ranked[0].end_state, "files");
        assert!(ranked.iter().all(|m| (0.0..=1.0).contains(&m.score)));
        assert_eq!(ranked[2].score, 0.0);
    }
}
