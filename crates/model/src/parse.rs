//! Decoders for model JSON output.
//!
//! Models occasionally return the right fields under the wrong shape;
//! every deviation maps to [`ModelApiError::Malformed`] so the pipeline
//! can distinguish "model misbehaved" from transport failures.

use dreamcut_core::analysis::{AssetAnalysis, QueryAnalysis};
use dreamcut_core::status::MediaType;

use crate::api::ModelApiError;

/// Decode a stage-1 query analysis, clamping confidence into [0, 1].
pub fn parse_query_analysis(value: serde_json::Value) -> Result<QueryAnalysis, ModelApiError> {
    let mut analysis: QueryAnalysis = serde_json::from_value(value)
        .map_err(|e| ModelApiError::Malformed(format!("query analysis: {e}")))?;
    analysis.confidence = analysis.confidence.clamp(0.0, 1.0);
    Ok(analysis)
}

/// Decode a stage-2 asset analysis and check its `kind` tag against the
/// media type we asked about.
pub fn parse_asset_analysis(
    value: serde_json::Value,
    expected: MediaType,
) -> Result<AssetAnalysis, ModelApiError> {
    let analysis: AssetAnalysis = serde_json::from_value(value)
        .map_err(|e| ModelApiError::Malformed(format!("asset analysis: {e}")))?;
    if analysis.media_type() != expected {
        return Err(ModelApiError::Malformed(format!(
            "asset analysis kind {:?} does not match requested media type {:?}",
            analysis.media_type(),
            expected
        )));
    }
    Ok(analysis)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use dreamcut_core::status::Intent;

    #[test]
    fn query_analysis_decodes_and_clamps_confidence() {
        let value = serde_json::json!({
            "detected_intent": "video",
            "subjects": ["rain", "glass"],
            "modifiers": ["moody"],
            "style": "cinematic",
            "target_duration_secs": 30.0,
            "wants_voiceover": false,
            "confidence": 1.4,
        });
        let analysis = parse_query_analysis(value).unwrap();
        assert_eq!(analysis.detected_intent, Intent::Video);
        assert_eq!(analysis.confidence, 1.0);
    }

    #[test]
    fn missing_fields_are_malformed() {
        let value = serde_json::json!({"detected_intent": "video"});
        assert_matches!(parse_query_analysis(value), Err(ModelApiError::Malformed(_)));
    }

    #[test]
    fn asset_kind_must_match_requested_media() {
        let value = serde_json::json!({
            "kind": "image",
            "caption": "a window",
            "objects": ["window"],
            "style_tags": [],
            "width": 1920,
            "height": 1080,
            "quality_score": 0.8,
        });
        assert!(parse_asset_analysis(value.clone(), MediaType::Image).is_ok());
        assert_matches!(
            parse_asset_analysis(value, MediaType::Video),
            Err(ModelApiError::Malformed(_))
        );
    }
}
