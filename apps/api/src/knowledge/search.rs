//! University search ranking: BM25 keyword scoring, cosine similarity over
//! embeddings, and Reciprocal Rank Fusion for hybrid queries.
//!
//! Structured filters run in SQL (see `repository`); everything here is pure
//! and operates on the filtered candidate set.

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::knowledge::embedding::cosine_similarity;
use crate::knowledge::models::InstitutionType;
use crate::knowledge::text::tokenize;

const BM25_K1: f64 = 1.2;
const BM25_B: f64 = 0.75;
/// RRF damping constant.
const RRF_K: f64 = 60.0;

pub const DEFAULT_LIMIT: usize = 10;
pub const MAX_LIMIT: usize = 50;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchType {
    #[default]
    Hybrid,
    Semantic,
    Keyword,
}

impl SearchType {
    pub fn needs_embedding(self) -> bool {
        matches!(self, SearchType::Hybrid | SearchType::Semantic)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchFilters {
    pub state: Option<String>,
    pub institution_type: Option<InstitutionType>,
    pub min_acceptance_rate: Option<f64>,
    pub max_acceptance_rate: Option<f64>,
}

impl SearchFilters {
    pub fn validate(&self) -> Result<(), AppError> {
        for (label, value) in [
            ("min_acceptance_rate", self.min_acceptance_rate),
            ("max_acceptance_rate", self.max_acceptance_rate),
        ] {
            if let Some(v) = value {
                if !(0.0..=100.0).contains(&v) {
                    return Err(AppError::Validation(format!(
                        "{label} must be between 0 and 100"
                    )));
                }
            }
        }
        if let (Some(min), Some(max)) = (self.min_acceptance_rate, self.max_acceptance_rate) {
            if min > max {
                return Err(AppError::Validation(
                    "min_acceptance_rate cannot exceed max_acceptance_rate".to_string(),
                ));
            }
        }
        Ok(())
    }

    /// State codes are matched case-insensitively.
    pub fn normalized_state(&self) -> Option<String> {
        self.state
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_uppercase)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchRequest {
    pub query: String,
    #[serde(default)]
    pub search_type: SearchType,
    #[serde(default)]
    pub filters: SearchFilters,
    pub limit: Option<usize>,
}

impl SearchRequest {
    pub fn effective_limit(&self) -> usize {
        self.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT)
    }
}

/// Minimal view of an indexed university used for ranking.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub university_id: String,
    pub name: String,
    pub search_text: String,
    pub embedding: Vec<f32>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Ranked {
    /// Index into the candidate slice.
    pub index: usize,
    pub score: f64,
    pub keyword_score: Option<f64>,
    pub semantic_score: Option<f64>,
}

/// Okapi BM25 score of every document against the query terms.
pub fn bm25_scores(query_terms: &[String], documents: &[Vec<String>]) -> Vec<f64> {
    let n = documents.len() as f64;
    if documents.is_empty() || query_terms.is_empty() {
        return vec![0.0; documents.len()];
    }
    let avg_len = documents.iter().map(Vec::len).sum::<usize>() as f64 / n;
    let unique_terms: HashSet<&String> = query_terms.iter().collect();

    let doc_freq: HashMap<&String, usize> = unique_terms
        .iter()
        .map(|term| (*term, documents.iter().filter(|d| d.contains(term)).count()))
        .collect();

    documents
        .iter()
        .map(|doc| {
            let len = doc.len() as f64;
            unique_terms
                .iter()
                .map(|term| {
                    let tf = doc.iter().filter(|t| t == term).count() as f64;
                    if tf == 0.0 {
                        return 0.0;
                    }
                    let df = doc_freq[*term] as f64;
                    let idf = (1.0 + (n - df + 0.5) / (df + 0.5)).ln();
                    let norm = if avg_len > 0.0 { len / avg_len } else { 1.0 };
                    idf * tf * (BM25_K1 + 1.0) / (tf + BM25_K1 * (1.0 - BM25_B + BM25_B * norm))
                })
                .sum()
        })
        .collect()
}

fn sort_desc(scored: &mut [(usize, f64)], candidates: &[Candidate]) {
    scored.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(Ordering::Equal)
            .then_with(|| candidates[a.0].name.cmp(&candidates[b.0].name))
            .then_with(|| candidates[a.0].university_id.cmp(&candidates[b.0].university_id))
    });
}

fn keyword_ranking(query: &str, candidates: &[Candidate]) -> Vec<(usize, f64)> {
    let terms = tokenize(query);
    let documents: Vec<Vec<String>> = candidates.iter().map(|c| tokenize(&c.search_text)).collect();
    let mut scored: Vec<(usize, f64)> = bm25_scores(&terms, &documents)
        .into_iter()
        .enumerate()
        .filter(|(_, s)| *s > 0.0)
        .collect();
    sort_desc(&mut scored, candidates);
    scored
}

fn semantic_ranking(query_embedding: &[f32], candidates: &[Candidate]) -> Vec<(usize, f64)> {
    let mut scored: Vec<(usize, f64)> = candidates
        .iter()
        .enumerate()
        .map(|(i, c)| (i, f64::from(cosine_similarity(query_embedding, &c.embedding))))
        .filter(|(_, s)| *s > 0.0)
        .collect();
    sort_desc(&mut scored, candidates);
    scored
}

/// Ranks candidates for a query. `query_embedding` is required for
/// semantic and hybrid search.
pub fn rank(
    query: &str,
    query_embedding: Option<&[f32]>,
    search_type: SearchType,
    candidates: &[Candidate],
    limit: usize,
) -> Vec<Ranked> {
    let keyword = match search_type {
        SearchType::Keyword | SearchType::Hybrid => keyword_ranking(query, candidates),
        SearchType::Semantic => Vec::new(),
    };
    let semantic = match (search_type, query_embedding) {
        (SearchType::Semantic | SearchType::Hybrid, Some(embedding)) => {
            semantic_ranking(embedding, candidates)
        }
        _ => Vec::new(),
    };

    let keyword_by_index: HashMap<usize, f64> = keyword.iter().copied().collect();
    let semantic_by_index: HashMap<usize, f64> = semantic.iter().copied().collect();

    let ordered: Vec<(usize, f64)> = match search_type {
        SearchType::Keyword => keyword,
        SearchType::Semantic => semantic,
        SearchType::Hybrid => {
            let mut fused = reciprocal_rank_fusion(&[keyword.as_slice(), semantic.as_slice()]);
            sort_desc(&mut fused, candidates);
            fused
        }
    };

    ordered
        .into_iter()
        .take(limit)
        .map(|(index, score)| Ranked {
            index,
            score,
            keyword_score: keyword_by_index.get(&index).copied(),
            semantic_score: semantic_by_index.get(&index).copied(),
        })
        .collect()
}

/// Sums `1 / (k + rank)` (1-based rank) across rankings.
pub fn reciprocal_rank_fusion(rankings: &[&[(usize, f64)]]) -> Vec<(usize, f64)> {
    let mut fused: HashMap<usize, f64> = HashMap::new();
    for ranking in rankings {
        for (position, (index, _)) in ranking.iter().enumerate() {
            *fused.entry(*index).or_default() += 1.0 / (RRF_K + position as f64 + 1.0);
        }
    }
    fused.into_iter().collect()
}
