// src/matcher/mod.rs
//! Company name → listed-security identifiers via fuzzy matching against the
//! reference table.

pub mod fuzzy;
pub mod table;

use std::cmp::Ordering;
use std::path::{Path, PathBuf};

use metrics::counter;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::PipelineConfig;
use table::{ReferenceRow, ReferenceTable};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IdentifierMatch {
    pub matched_name: String,
    pub isin: String,
    pub nse_symbol: String,
    pub bse_code: String,
    pub industry: String,
    /// 1-based, best first.
    pub rank: usize,
    pub score: u8,
}

impl IdentifierMatch {
    fn from_row(row: &ReferenceRow, rank: usize, score: u8) -> Self {
        Self {
            matched_name: row.company_name.clone(),
            isin: row.isin.clone(),
            nse_symbol: row.nse_symbol.clone(),
            bse_code: row.bse_code.clone(),
            industry: row.industry.clone(),
            rank,
            score,
        }
    }
}

/// Score every row, keep those at or above `min_score`, best `top_n` first.
/// Equal scores are ordered by normalized Levenshtein similarity of the
/// processed names, then by table order.
pub fn rank_matches(name: &str, table: &ReferenceTable, top_n: usize, min_score: u8) -> Vec<IdentifierMatch> {
    let query = fuzzy::process(name);
    if query.is_empty() {
        return Vec::new();
    }

    let mut scored: Vec<(usize, u8, f64)> = table
        .rows()
        .iter()
        .enumerate()
        .filter_map(|(idx, row)| {
            let score = fuzzy::token_sort_ratio(name, &row.company_name);
            (score >= min_score).then(|| {
                let tie = strsim::normalized_levenshtein(&query, &fuzzy::process(&row.company_name));
                (idx, score, tie)
            })
        })
        .collect();

    scored.sort_by(|a, b| {
        b.1.cmp(&a.1)
            .then_with(|| b.2.partial_cmp(&a.2).unwrap_or(Ordering::Equal))
            .then_with(|| a.0.cmp(&b.0))
    });

    scored
        .into_iter()
        .take(top_n)
        .enumerate()
        .map(|(i, (idx, score, _))| IdentifierMatch::from_row(&table.rows()[idx], i + 1, score))
        .collect()
}

#[derive(Debug, Clone)]
pub struct IdentifierMatcher {
    path: PathBuf,
    top_n: usize,
    min_score: u8,
}

impl IdentifierMatcher {
    pub fn new(path: impl Into<PathBuf>, top_n: usize, min_score: u8) -> Self {
        Self {
            path: path.into(),
            top_n,
            min_score,
        }
    }

    pub fn from_config(cfg: &PipelineConfig) -> Self {
        Self::new(&cfg.reference_table, cfg.match_top_n, cfg.match_min_score)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reloads the table on every call so edits are picked up without a restart.
    /// Load failures are logged and yield no matches.
    pub fn lookup(&self, name: &str) -> Vec<IdentifierMatch> {
        if name.trim().is_empty() {
            return Vec::new();
        }
        let table = match ReferenceTable::load(&self.path) {
            Ok(t) => t,
            Err(e) => {
                warn!(target: "matcher", error = %format!("{e:#}"), "reference table unavailable");
                counter!("matcher_table_errors_total").increment(1);
                return Vec::new();
            }
        };
        debug!(target: "matcher", rows = table.len(), "reference table loaded");

        let matches = rank_matches(name, &table, self.top_n, self.min_score);
        if matches.is_empty() {
            info!(target: "matcher", company = name, min_score = self.min_score, "no match above threshold");
        } else {
            for m in &matches {
                info!(
                    target: "matcher",
                    company = name,
                    rank = m.rank,
                    matched = %m.matched_name,
                    score = m.score,
                    isin = %m.isin,
                    "match"
                );
            }
        }
        counter!("matcher_lookups_total").increment(1);
        matches
    }
}
