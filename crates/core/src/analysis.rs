//! Typed analysis shapes produced by the analysis stages.
//!
//! Asset analysis results are a tagged variant per media kind so the
//! synthesis stage can pattern-match exhaustively instead of probing an
//! untyped map.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::status::{Intent, MediaType};

/// Input descriptor for one asset, as supplied by the client.
///
/// This is the shape handed to the asset-analysis stage; it carries no
/// database identity so the model crate stays independent of the store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetDescriptor {
    /// Source URL of the media file.
    pub url: String,
    /// Optional original filename.
    pub filename: Option<String>,
    /// Media kind.
    pub media_type: MediaType,
    /// Optional user-supplied description of what the asset is for.
    pub user_description: Option<String>,
    /// Size of the file in bytes (0 when unknown).
    pub file_size_bytes: i64,
    /// Arbitrary client-supplied metadata.
    pub metadata: serde_json::Value,
}

/// Structured breakdown of what the user asked for.
///
/// Output of the query-analysis stage.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct QueryAnalysis {
    /// Intent detected from the prompt (may refine the declared intent).
    pub detected_intent: Intent,
    /// Main subjects mentioned in the prompt.
    pub subjects: Vec<String>,
    /// Style / mood / treatment modifiers extracted from the prompt.
    pub modifiers: Vec<String>,
    /// Named visual style, if one was identified.
    pub style: Option<String>,
    /// Target duration in seconds, if the prompt implies one.
    pub target_duration_secs: Option<f64>,
    /// Whether the prompt asks for narration / voiceover.
    pub wants_voiceover: bool,
    /// Model confidence in this breakdown, `0.0..=1.0`.
    pub confidence: f32,
}

/// Per-media-kind analysis result for one asset.
///
/// Output of the asset-analysis stage; stored as the asset row's
/// `analysis` JSONB column.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(tag = "kind", rename_all = "snake_case")]
#[ts(export)]
pub enum AssetAnalysis {
    Image(ImageAnalysis),
    Video(VideoAnalysis),
    Audio(AudioAnalysis),
}

impl AssetAnalysis {
    /// The media kind this analysis describes.
    pub fn media_type(&self) -> MediaType {
        match self {
            Self::Image(_) => MediaType::Image,
            Self::Video(_) => MediaType::Video,
            Self::Audio(_) => MediaType::Audio,
        }
    }

    /// Overall quality score of the analyzed media, `0.0..=1.0`.
    pub fn quality_score(&self) -> f32 {
        match self {
            Self::Image(a) => a.quality_score,
            Self::Video(a) => a.quality_score,
            Self::Audio(a) => a.quality_score,
        }
    }

    /// Playback duration in seconds, for time-based media.
    pub fn duration_secs(&self) -> Option<f64> {
        match self {
            Self::Image(_) => None,
            Self::Video(a) => Some(a.duration_secs),
            Self::Audio(a) => Some(a.duration_secs),
        }
    }
}

/// Analysis of a still image.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ImageAnalysis {
    /// One-sentence caption of the image content.
    pub caption: String,
    /// Detected objects / entities.
    pub objects: Vec<String>,
    /// Style descriptors (e.g. "photorealistic", "watercolor").
    pub style_tags: Vec<String>,
    /// Pixel dimensions, when determinable from the source.
    pub width: Option<u32>,
    pub height: Option<u32>,
    /// Quality score, `0.0..=1.0`.
    pub quality_score: f32,
}

/// Analysis of a video clip.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct VideoAnalysis {
    /// One-sentence caption of the video content.
    pub caption: String,
    /// Detected objects / entities across sampled frames.
    pub objects: Vec<String>,
    /// Clip duration in seconds.
    pub duration_secs: f64,
    /// Number of distinct scenes detected.
    pub scene_count: u32,
    /// Whether the clip carries an audio track.
    pub has_audio: bool,
    /// Quality score, `0.0..=1.0`.
    pub quality_score: f32,
}

/// Analysis of an audio file.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct AudioAnalysis {
    /// Transcript, when the audio contains recognizable speech.
    pub transcript: Option<String>,
    /// Duration in seconds.
    pub duration_secs: f64,
    /// Coarse content kind: "speech", "music", or "sfx".
    pub content_kind: String,
    /// Quality score, `0.0..=1.0`.
    pub quality_score: f32,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn analysis_tag_round_trips() {
        let analysis = AssetAnalysis::Audio(AudioAnalysis {
            transcript: Some("hello".into()),
            duration_secs: 12.5,
            content_kind: "speech".into(),
            quality_score: 0.9,
        });
        let json = serde_json::to_value(&analysis).unwrap();
        assert_eq!(json["kind"], "audio");

        let back: AssetAnalysis = serde_json::from_value(json).unwrap();
        assert_eq!(back.media_type(), MediaType::Audio);
        assert_eq!(back.duration_secs(), Some(12.5));
    }

    #[test]
    fn image_analysis_has_no_duration() {
        let analysis = AssetAnalysis::Image(ImageAnalysis {
            caption: "a cat".into(),
            objects: vec!["cat".into()],
            style_tags: vec![],
            width: Some(1024),
            height: Some(768),
            quality_score: 0.8,
        });
        assert_eq!(analysis.duration_secs(), None);
        assert_eq!(analysis.media_type(), MediaType::Image);
    }
}
