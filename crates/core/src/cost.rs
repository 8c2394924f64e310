//! Cost estimation and model-usage aggregation.
//!
//! The estimate is a simple linear function of asset count: external
//! model inference dominates, one analysis call per asset plus the fixed
//! query-analysis and synthesis overhead.

/// Fixed cost per query (query analysis + synthesis), in USD.
pub const BASE_COST_USD: f64 = 0.02;

/// Incremental cost per analyzed asset, in USD.
pub const PER_ASSET_COST_USD: f64 = 0.015;

/// Estimate the cost of one pipeline run over `asset_count` assets.
pub fn estimate_cost(asset_count: usize) -> f64 {
    BASE_COST_USD + PER_ASSET_COST_USD * asset_count as f64
}

/// Deduplicate the list of model identifiers used during a run,
/// preserving first-use order.
pub fn dedup_models_used(models: Vec<String>) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    models
        .into_iter()
        .filter(|m| seen.insert(m.clone()))
        .collect()
}
