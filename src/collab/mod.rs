//! Downstream collaborators
//!
//! Charts and statistical tests read tables produced by the pipeline. The
//! pipeline only guarantees them a well-typed table; rendering and model
//! fitting sit behind the [`ChartRenderer`] and [`StatsBackend`] traits.

pub mod chart;
pub mod stats;

pub use chart::{ChartKind, ChartRenderer, ChartSpec, VegaLiteRenderer};
pub use stats::{Coefficient, ModelFrame, ModelKind, ModelSpec, StatsBackend, TestOutcome};
