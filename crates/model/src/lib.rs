//! Client for the external analysis-model HTTP endpoint.
//!
//! The analysis stages (query analysis, per-asset analysis) are thin
//! request/response transformations against hosted models. This crate
//! wraps that endpoint behind the [`AnalysisModel`] trait so the
//! pipeline can be tested against fakes, with [`RemoteAnalyzer`] as the
//! production implementation over [`ModelApi`].

pub mod analyzer;
pub mod api;
pub mod parse;
pub mod prompts;

pub use analyzer::{AnalysisModel, ModelConfig, RemoteAnalyzer};
pub use api::{ModelApi, ModelApiError};
