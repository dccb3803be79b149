//! Multi-symbol analysis on a bounded worker pool.

use crate::error::AppError;
use crate::services::analyzer::Analyzer;
use crate::services::params::flatten_groups;
use crate::types::SymbolAnalysis;
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{error, info};

/// Result for one symbol of a batch.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SymbolOutcome {
    pub symbol: String,
    pub result: Result<SymbolAnalysis, String>,
}

impl SymbolOutcome {
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

/// Outcomes in the order the symbols were given.
///
/// `groups` keeps the stock-list lines the symbols came from; a symbol listed
/// on several lines is analysed once and appears in each of its groups.
#[derive(Debug, Serialize)]
pub struct BatchReport {
    pub date: NaiveDate,
    pub groups: Vec<Vec<String>>,
    pub outcomes: Vec<SymbolOutcome>,
}

impl BatchReport {
    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_ok()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.succeeded()
    }

    /// Successful analyses, hottest composite score first.
    pub fn ranked(&self) -> Vec<&SymbolAnalysis> {
        let mut ranked: Vec<&SymbolAnalysis> = self
            .outcomes
            .iter()
            .filter_map(|o| o.result.as_ref().ok())
            .collect();
        ranked.sort_by(|a, b| b.score.composite.total_cmp(&a.score.composite));
        ranked
    }

    /// [`ranked`](Self::ranked), computed separately within each group.
    pub fn ranked_groups(&self) -> Vec<Vec<&SymbolAnalysis>> {
        let by_symbol: HashMap<&str, &SymbolAnalysis> = self
            .outcomes
            .iter()
            .filter_map(|o| o.result.as_ref().ok().map(|a| (o.symbol.as_str(), a)))
            .collect();

        self.groups
            .iter()
            .map(|group| {
                let mut ranked: Vec<&SymbolAnalysis> = group
                    .iter()
                    .filter_map(|s| by_symbol.get(s.as_str()).copied())
                    .collect();
                ranked.sort_by(|a, b| b.score.composite.total_cmp(&a.score.composite));
                ranked
            })
            .collect()
    }
}

/// Runs [`Analyzer::analyze`] for many symbols, at most `max_workers` at a time.
///
/// Symbols share no mutable state, so each runs as its own task; one symbol
/// failing never aborts the others.
pub struct BatchAnalyzer {
    analyzer: Arc<Analyzer>,
    max_workers: usize,
}

impl BatchAnalyzer {
    pub fn new(analyzer: Arc<Analyzer>, max_workers: usize) -> Self {
        Self {
            analyzer,
            max_workers: max_workers.max(1),
        }
    }

    /// Analyse every symbol of `groups` once and keep the grouping.
    pub async fn run_groups(&self, groups: &[Vec<String>], date: NaiveDate) -> BatchReport {
        let mut report = self.run(&flatten_groups(groups), date).await;
        report.groups = groups.to_vec();
        report
    }

    pub async fn run(&self, symbols: &[String], date: NaiveDate) -> BatchReport {
        info!(
            "Analyzing {} symbols for {} with {} workers",
            symbols.len(),
            date,
            self.max_workers
        );

        let permits = Arc::new(Semaphore::new(self.max_workers));
        let mut handles = Vec::with_capacity(symbols.len());

        for symbol in symbols {
            let analyzer = self.analyzer.clone();
            let permits = permits.clone();
            let symbol = symbol.clone();
            handles.push(tokio::spawn(async move {
                let _permit = permits
                    .acquire_owned()
                    .await
                    .map_err(|e| AppError::Computation(e.to_string()))?;
                analyzer.analyze(&symbol, date).await
            }));
        }

        let mut outcomes = Vec::with_capacity(symbols.len());
        for (symbol, handle) in symbols.iter().zip(handles) {
            let result = match handle.await {
                Ok(Ok(analysis)) => Ok(analysis),
                Ok(Err(e)) => {
                    error!("Analysis of {} failed ({}): {}", symbol, e.kind(), e);
                    Err(e.to_string())
                }
                Err(e) => {
                    error!("Analysis task for {} aborted: {}", symbol, e);
                    Err(format!("task aborted: {}", e))
                }
            };
            outcomes.push(SymbolOutcome {
                symbol: symbol.clone(),
                result,
            });
        }

        let report = BatchReport {
            date,
            groups: vec![symbols.to_vec()],
            outcomes,
        };
        info!(
            "Batch for {} finished: {} ok, {} failed",
            date,
            report.succeeded(),
            report.failed()
        );
        report
    }
}
