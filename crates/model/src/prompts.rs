//! Prompt templates for the analysis stages.
//!
//! Each template pins the exact JSON shape the model must return; the
//! counterpart decoders live in [`crate::parse`].

use dreamcut_core::analysis::AssetDescriptor;
use dreamcut_core::status::{Intent, MediaType};

/// Prompt for stage 1: structured analysis of the user's request.
pub fn query_analysis_prompt(user_prompt: &str, declared_intent: Intent) -> String {
    format!(
        r#"You are a creative-production planner. Analyze the user's request and respond with ONLY a JSON object of this exact shape:
{{
  "detected_intent": "image" | "video" | "audio" | "mixed",
  "subjects": [string],
  "modifiers": [string],
  "style": string | null,
  "target_duration_secs": number | null,
  "wants_voiceover": boolean,
  "confidence": number between 0 and 1
}}

The user declared their intent as "{declared_intent}". Trust the request text over the declaration when they disagree.

Request:
{user_prompt}"#
    )
}

/// Prompt for stage 2: per-asset analysis, shaped by media type.
pub fn asset_analysis_prompt(descriptor: &AssetDescriptor) -> String {
    let shape = match descriptor.media_type {
        MediaType::Image => {
            r#"{
  "kind": "image",
  "caption": string,
  "objects": [string],
  "style_tags": [string],
  "width": integer,
  "height": integer,
  "quality_score": number between 0 and 1
}"#
        }
        MediaType::Video => {
            r#"{
  "kind": "video",
  "caption": string,
  "objects": [string],
  "duration_secs": number,
  "scene_count": integer,
  "has_audio": boolean,
  "quality_score": number between 0 and 1
}"#
        }
        MediaType::Audio => {
            r#"{
  "kind": "audio",
  "transcript": string,
  "duration_secs": number,
  "content_kind": string,
  "quality_score": number between 0 and 1
}"#
        }
    };

    let description = descriptor
        .user_description
        .as_deref()
        .unwrap_or("(none provided)");

    format!(
        r#"Analyze the {media} at the URL below for use in a creative-production pipeline. Respond with ONLY a JSON object of this exact shape:
{shape}

URL: {url}
User's description of it: {description}"#,
        media = descriptor.media_type,
        url = descriptor.url,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_prompt_carries_declared_intent_and_text() {
        let prompt = query_analysis_prompt("a moody rain video", Intent::Video);
        assert!(prompt.contains("\"video\""));
        assert!(prompt.contains("a moody rain video"));
        assert!(prompt.contains("detected_intent"));
    }

    #[test]
    fn asset_prompt_shape_follows_media_type() {
        let descriptor = AssetDescriptor {
            url: "https://example.com/voice.mp3".to_string(),
            filename: None,
            media_type: MediaType::Audio,
            user_description: Some("narration take".to_string()),
            file_size_bytes: 1024,
            metadata: serde_json::json!({}),
        };
        let prompt = asset_analysis_prompt(&descriptor);
        assert!(prompt.contains("\"transcript\""));
        assert!(!prompt.contains("scene_count"));
        assert!(prompt.contains("narration take"));
    }
}
