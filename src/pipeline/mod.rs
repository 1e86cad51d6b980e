//! Cleaning and aggregation pipeline
//!
//! Runs Loader → Cleaner → Deriver → Aggregator strictly in sequence. Every
//! stage reads the previous stage's table and returns a new one, so all
//! intermediate tables stay available in [`PipelineOutput`]. The first error
//! aborts the run and is reported together with the stage that raised it.

pub mod aggregate;
pub mod clean;
pub mod coerce;
pub mod derive;
pub mod filter;
pub mod sorter;

pub use aggregate::{
    aggregate, aggregate_all, partition, Aggregation, Group, Reduction, ReductionKind,
    SortByResult,
};
pub use clean::{clean, CleanRule, RowPredicate};
pub use coerce::CoerceTarget;
pub use derive::{derive, DeriveRule, Derivation, FnDerivation, TenureYears, ThresholdBucket};
pub use filter::{ComparisonOp, FilterExpression, Literal, LogicalOp};
pub use sorter::{NullPosition, SortField, SortOrder, Sorter};

use crate::error::{Result, Stage, StageError, StageExt};
use crate::loader::{self, LoadOptions};
use crate::table::Table;
use chrono::NaiveDate;
use std::path::Path;
use tracing::{debug, info};

/// Ordered rules for every stage after loading
#[derive(Debug, Clone, Default)]
pub struct Pipeline {
    pub clean_rules: Vec<CleanRule>,
    pub derive_rules: Vec<DeriveRule>,
    pub aggregations: Vec<Aggregation>,
}

/// Every table produced by one run
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub raw: Table,
    pub cleaned: Table,
    pub derived: Table,
    /// Aggregate tables in configuration order, keyed by aggregation name
    pub aggregates: Vec<(String, Table)>,
}

impl PipelineOutput {
    pub fn aggregate(&self, name: &str) -> Option<&Table> {
        self.aggregates
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, t)| t)
    }
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_clean_rule(mut self, rule: CleanRule) -> Self {
        self.clean_rules.push(rule);
        self
    }

    pub fn with_derivation(mut self, rule: DeriveRule) -> Self {
        self.derive_rules.push(rule);
        self
    }

    pub fn with_aggregation(mut self, aggregation: Aggregation) -> Self {
        self.aggregations.push(aggregation);
        self
    }

    /// Structural checks that need no data
    pub fn validate(&self) -> Result<()> {
        for aggregation in &self.aggregations {
            aggregation.validate()?;
        }
        Ok(())
    }

    /// Load a delimited file and run every stage over it
    pub fn run_path(
        &self,
        path: impl AsRef<Path>,
        options: &LoadOptions,
        reference: NaiveDate,
    ) -> std::result::Result<PipelineOutput, StageError> {
        let raw = loader::load_path(path, options).in_stage(Stage::Load)?;
        self.run(raw, reference)
    }

    /// Run the cleaning, derivation and aggregation stages over a loaded table
    ///
    /// `reference` is the date tenure-style derivations measure against.
    pub fn run(
        &self,
        raw: Table,
        reference: NaiveDate,
    ) -> std::result::Result<PipelineOutput, StageError> {
        info!(
            "Running pipeline over {} rows (reference date {})",
            raw.len(),
            reference
        );

        let cleaned = clean(&raw, &self.clean_rules).in_stage(Stage::Clean)?;
        debug!("Clean stage: {} -> {} rows", raw.len(), cleaned.len());

        let derivations: Vec<Box<dyn Derivation>> = self
            .derive_rules
            .iter()
            .map(|rule| rule.build(reference))
            .collect();
        let derived = derive(&cleaned, &derivations).in_stage(Stage::Derive)?;
        debug!(
            "Derive stage: {} -> {} columns",
            cleaned.schema().len(),
            derived.schema().len()
        );

        let aggregates = aggregate_all(&derived, &self.aggregations).in_stage(Stage::Aggregate)?;
        debug!("Aggregate stage: {} tables", aggregates.len());

        Ok(PipelineOutput {
            raw,
            cleaned,
            derived,
            aggregates,
        })
    }
}
