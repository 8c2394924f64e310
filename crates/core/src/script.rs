//! Script-generation stage: templated narration assembly.
//!
//! Takes the synthesized creative brief plus a named creative profile and
//! produces human-readable narration text with simple metadata. Pure
//! profile lookup and text assembly; no cross-referencing.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::synthesis::SynthesisResult;

/// Approximate words per narrated second, used for the word budget.
const WORDS_PER_SECOND: f64 = 2.5;

/// Fallback profile when the requested name is unknown.
pub const DEFAULT_PROFILE: &str = "cinematic";

/// A named narration style template.
#[derive(Debug, Clone, Copy)]
pub struct CreativeProfile {
    /// Lookup key, e.g. `"documentary"`.
    pub name: &'static str,
    /// Pacing label carried into the script metadata.
    pub pacing: &'static str,
    /// Opening line template (`{subject}` is substituted).
    pub opener: &'static str,
    /// Per-scene line template (`{subject}` is substituted).
    pub scene_line: &'static str,
    /// Closing line template.
    pub closer: &'static str,
    /// Target seconds per scene; drives the scene count.
    pub secs_per_scene: f64,
}

/// The built-in profile catalog.
pub const PROFILES: &[CreativeProfile] = &[
    CreativeProfile {
        name: "cinematic",
        pacing: "measured",
        opener: "A quiet frame opens on {subject}.",
        scene_line: "The camera lingers, letting {subject} fill the screen.",
        closer: "The light fades, and the story rests.",
        secs_per_scene: 8.0,
    },
    CreativeProfile {
        name: "documentary",
        pacing: "steady",
        opener: "This is the story of {subject}.",
        scene_line: "Here we observe {subject} up close.",
        closer: "And that is what makes {subject} remarkable.",
        secs_per_scene: 10.0,
    },
    CreativeProfile {
        name: "energetic",
        pacing: "fast",
        opener: "Get ready — {subject} is about to take over.",
        scene_line: "Boom. Another look at {subject}, bigger than before.",
        closer: "That was {subject}. Don't blink.",
        secs_per_scene: 4.0,
    },
    CreativeProfile {
        name: "minimalist",
        pacing: "slow",
        opener: "{subject}.",
        scene_line: "Simply {subject}.",
        closer: "Nothing more is needed.",
        secs_per_scene: 12.0,
    },
    CreativeProfile {
        name: "playful",
        pacing: "bouncy",
        opener: "Guess who's here? It's {subject}!",
        scene_line: "And look — {subject} again, being delightful.",
        closer: "Wasn't that fun?",
        secs_per_scene: 5.0,
    },
    CreativeProfile {
        name: "corporate",
        pacing: "confident",
        opener: "Introducing {subject}: built for what comes next.",
        scene_line: "With {subject}, every detail works harder.",
        closer: "{subject}. Ready when you are.",
        secs_per_scene: 7.0,
    },
    CreativeProfile {
        name: "noir",
        pacing: "brooding",
        opener: "The city never asked for {subject}. It got it anyway.",
        scene_line: "Shadows cross {subject} like old debts.",
        closer: "Some stories end. This one just goes dark.",
        secs_per_scene: 9.0,
    },
    CreativeProfile {
        name: "vlog",
        pacing: "casual",
        opener: "Hey everyone — today we're checking out {subject}.",
        scene_line: "Okay, so this part of {subject} is honestly amazing.",
        closer: "Thanks for watching — see you in the next one.",
        secs_per_scene: 6.0,
    },
    CreativeProfile {
        name: "educational",
        pacing: "clear",
        opener: "Let's learn about {subject}.",
        scene_line: "Notice how {subject} works in this example.",
        closer: "Now you know the essentials of {subject}.",
        secs_per_scene: 10.0,
    },
    CreativeProfile {
        name: "dreamlike",
        pacing: "floating",
        opener: "Somewhere between waking and sleep, {subject} appears.",
        scene_line: "{subject} drifts past, half-remembered.",
        closer: "Then it is gone, the way dreams go.",
        secs_per_scene: 11.0,
    },
];

/// Look up a profile by name, case-insensitively.
pub fn find_profile(name: &str) -> Option<&'static CreativeProfile> {
    PROFILES.iter().find(|p| p.name.eq_ignore_ascii_case(name))
}

/// Generated narration script with metadata.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ScriptResult {
    /// The assembled narration text.
    pub narration: String,
    /// Profile the script was generated with.
    pub profile: String,
    /// Number of narrated scenes.
    pub scene_count: u32,
    /// Word count of the narration.
    pub word_count: u32,
    /// Estimated word budget for the planned runtime, for voiceover
    /// pacing downstream.
    pub word_budget: u32,
    /// Pacing label from the profile.
    pub pacing: String,
}

/// Generate a narration script from a creative brief.
///
/// `profile_name` falls back to [`DEFAULT_PROFILE`] when unknown. The
/// scene count is derived from the plan's total runtime estimate and the
/// profile's seconds-per-scene, clamped to at least one scene.
pub fn generate_script(synthesis: &SynthesisResult, profile_name: &str) -> ScriptResult {
    let profile = find_profile(profile_name)
        .or_else(|| find_profile(DEFAULT_PROFILE))
        .expect("default profile must exist in the catalog");

    let subject = extract_subject(&synthesis.unified_intent.summary);
    let runtime = synthesis.plan.total_estimated_secs;
    let scene_count = ((runtime / profile.secs_per_scene).ceil() as u32).max(1);

    let mut lines = Vec::with_capacity(scene_count as usize + 2);
    lines.push(profile.opener.replace("{subject}", &subject));
    for _ in 0..scene_count {
        lines.push(profile.scene_line.replace("{subject}", &subject));
    }
    lines.push(profile.closer.replace("{subject}", &subject));

    let narration = lines.join(" ");
    let word_count = narration.split_whitespace().count() as u32;

    ScriptResult {
        narration,
        profile: profile.name.to_string(),
        scene_count,
        word_count,
        word_budget: word_budget(runtime),
        pacing: profile.pacing.to_string(),
    }
}

/// Estimated word budget for a narration of the given runtime.
pub fn word_budget(runtime_secs: f64) -> u32 {
    (runtime_secs * WORDS_PER_SECOND).round() as u32
}

/// Pull the subject phrase out of a unified-intent summary.
///
/// Summaries are produced as "<intent> production of <subject>[ in a
/// <style> style]"; everything after "of " up to the style suffix is the
/// subject.
fn extract_subject(summary: &str) -> String {
    let tail = summary.split_once(" of ").map(|(_, t)| t).unwrap_or(summary);
    let subject = tail.split(" in a ").next().unwrap_or(tail).trim();
    if subject.is_empty() {
        "the story".to_string()
    } else {
        subject.to_string()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::status::Intent;
    use crate::synthesis::{ProductionPlan, SynthesisResult, UnifiedIntent};

    fn brief(runtime: f64) -> SynthesisResult {
        SynthesisResult {
            unified_intent: UnifiedIntent {
                intent: Intent::Video,
                summary: "video production of a mountain lake in a cinematic style".into(),
                confidence: 0.9,
            },
            conflicts: vec![],
            gaps: vec![],
            roles: vec![],
            plan: ProductionPlan {
                steps: vec![],
                total_estimated_secs: runtime,
                generated_only: true,
            },
            completeness_score: 1.0,
            alignment_score: 1.0,
        }
    }

    #[test]
    fn catalog_has_ten_unique_profiles() {
        assert_eq!(PROFILES.len(), 10);
        let mut names: Vec<_> = PROFILES.iter().map(|p| p.name).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), 10);
    }

    #[test]
    fn lookup_is_case_insensitive() {
        assert!(find_profile("Documentary").is_some());
        assert!(find_profile("no-such-profile").is_none());
    }

    #[test]
    fn unknown_profile_falls_back_to_default() {
        let script = generate_script(&brief(60.0), "no-such-profile");
        assert_eq!(script.profile, DEFAULT_PROFILE);
    }

    #[test]
    fn scene_count_scales_with_runtime() {
        let short = generate_script(&brief(10.0), "documentary");
        let long = generate_script(&brief(120.0), "documentary");
        assert!(long.scene_count > short.scene_count);
        assert!(short.scene_count >= 1);
    }

    #[test]
    fn narration_mentions_the_subject() {
        let script = generate_script(&brief(30.0), "vlog");
        assert!(script.narration.contains("a mountain lake"));
        assert_eq!(script.pacing, "casual");
        assert!(script.word_count > 0);
    }

    #[test]
    fn word_budget_tracks_runtime() {
        let script = generate_script(&brief(60.0), "documentary");
        assert_eq!(script.word_budget, word_budget(60.0));
        assert_eq!(word_budget(60.0), 150);
        assert!(word_budget(120.0) > word_budget(60.0));
    }

    #[test]
    fn subject_extraction_strips_style_suffix() {
        assert_eq!(
            extract_subject("video production of a red fox in a noir style"),
            "a red fox"
        );
        assert_eq!(extract_subject("image production of sunflowers"), "sunflowers");
    }
}
