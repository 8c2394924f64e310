//! Combination / synthesis stage logic.
//!
//! Cross-references the query analysis with the per-asset analyses to
//! produce a unified intent, detected conflicts and gaps, exactly one
//! role bucket per asset, a production plan, and overall completeness /
//! alignment scores. Pure functions; no I/O.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::analysis::{AssetAnalysis, QueryAnalysis};
use crate::status::{Intent, MediaType, Severity};
use crate::types::EntityId;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Assets scoring below this are never used, regardless of media fit.
const MIN_USABLE_QUALITY: f32 = 0.3;

/// Off-intent assets scoring at least this are kept as reference material.
const MIN_REFERENCE_QUALITY: f32 = 0.5;

/// Completeness penalty per gap, by severity.
const GAP_PENALTY_LOW: f32 = 0.05;
const GAP_PENALTY_MEDIUM: f32 = 0.10;
const GAP_PENALTY_HIGH: f32 = 0.20;
const GAP_PENALTY_CRITICAL: f32 = 0.35;

/// Confidence penalty applied to the unified intent per detected conflict.
const CONFLICT_CONFIDENCE_PENALTY: f32 = 0.08;

/// Default production duration (seconds) when the prompt implies none.
const DEFAULT_TARGET_DURATION_SECS: f64 = 30.0;

// ---------------------------------------------------------------------------
// Input / output shapes
// ---------------------------------------------------------------------------

/// One successfully analyzed asset, keyed by its row id.
#[derive(Debug, Clone)]
pub struct AnalyzedAsset {
    pub asset_id: EntityId,
    pub analysis: AssetAnalysis,
}

/// Inputs to the synthesis stage.
#[derive(Debug)]
pub struct SynthesisInput<'a> {
    /// Intent declared on the inbound request.
    pub declared_intent: Intent,
    /// Structured prompt breakdown from the query-analysis stage.
    pub query: &'a QueryAnalysis,
    /// Analyses of every asset that completed successfully.
    pub assets: &'a [AnalyzedAsset],
}

/// Utilization bucket for one asset. Every asset lands in exactly one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum AssetRole {
    Primary,
    Supporting,
    Reference,
    Unused,
}

/// Role assignment for one asset.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct AssetRoleAssignment {
    pub asset_id: EntityId,
    pub role: AssetRole,
    /// Short human-readable justification shown in the director feed.
    pub reason: String,
}

/// A contradiction between the stated intent and the supplied assets.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct DetectedConflict {
    pub description: String,
    pub severity: Severity,
    /// How the plan resolves the conflict.
    pub resolution: String,
}

/// Something the request needs that the assets do not provide.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct DetectedGap {
    pub description: String,
    pub impact: Severity,
}

/// The merged creative direction.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct UnifiedIntent {
    pub intent: Intent,
    pub summary: String,
    /// Confidence after conflict penalties, `0.0..=1.0`.
    pub confidence: f32,
}

/// One ordered step of the production plan.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PlanStep {
    pub order: u32,
    pub description: String,
    pub estimated_secs: f64,
}

/// Ordered production steps with a total time estimate.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ProductionPlan {
    pub steps: Vec<PlanStep>,
    pub total_estimated_secs: f64,
    /// True when no supplied asset contributes and everything is generated.
    pub generated_only: bool,
}

/// Full output of the synthesis stage.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SynthesisResult {
    pub unified_intent: UnifiedIntent,
    pub conflicts: Vec<DetectedConflict>,
    pub gaps: Vec<DetectedGap>,
    pub roles: Vec<AssetRoleAssignment>,
    pub plan: ProductionPlan,
    /// How much of the request the assets cover, `0.0..=1.0`.
    pub completeness_score: f32,
    /// How well the assets align with the intent, `0.0..=1.0`.
    pub alignment_score: f32,
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

/// Run the full synthesis over a query analysis and its asset analyses.
pub fn synthesize(input: &SynthesisInput) -> SynthesisResult {
    let intent = resolve_intent(input.declared_intent, input.query.detected_intent);
    let conflicts = detect_conflicts(input, intent);
    let roles = assign_roles(intent, input.assets);
    let gaps = detect_gaps(input, intent, &roles);

    let confidence = (input.query.confidence
        - conflicts.len() as f32 * CONFLICT_CONFIDENCE_PENALTY)
        .clamp(0.0, 1.0);

    let unified_intent = UnifiedIntent {
        intent,
        summary: summarize(input.query, intent),
        confidence,
    };

    let completeness_score = completeness_score(&gaps);
    let alignment_score = alignment_score(&roles, &conflicts);
    let plan = build_plan(input, intent, &roles);

    SynthesisResult {
        unified_intent,
        conflicts,
        gaps,
        roles,
        plan,
        completeness_score,
        alignment_score,
    }
}

// ---------------------------------------------------------------------------
// Intent resolution
// ---------------------------------------------------------------------------

/// Merge the declared and detected intents.
///
/// When they disagree, neither is discarded: the unified intent widens to
/// `Mixed` so both directions survive into the plan. The disagreement
/// itself is recorded as a conflict by [`detect_conflicts`].
fn resolve_intent(declared: Intent, detected: Intent) -> Intent {
    if declared == detected {
        declared
    } else {
        Intent::Mixed
    }
}

/// One-line creative summary for the unified intent.
fn summarize(query: &QueryAnalysis, intent: Intent) -> String {
    let subject = query
        .subjects
        .first()
        .map(String::as_str)
        .unwrap_or("the requested content");
    match query.style.as_deref() {
        Some(style) => format!("{intent} production of {subject} in a {style} style"),
        None => format!("{intent} production of {subject}"),
    }
}

// ---------------------------------------------------------------------------
// Conflict detection
// ---------------------------------------------------------------------------

/// Detect contradictions between the stated intent and what the assets
/// can actually deliver.
fn detect_conflicts(input: &SynthesisInput, intent: Intent) -> Vec<DetectedConflict> {
    let mut conflicts = Vec::new();

    if input.declared_intent != input.query.detected_intent {
        conflicts.push(DetectedConflict {
            description: format!(
                "Declared intent is {} but the prompt reads as {}",
                input.declared_intent, input.query.detected_intent
            ),
            severity: Severity::Medium,
            resolution: "Widened to a mixed production covering both".to_string(),
        });
    }

    let target = input.query.target_duration_secs;

    // Footage shortfall: requested duration exceeds available video material.
    if intent == Intent::Video || intent == Intent::Mixed {
        if let Some(target) = target {
            let footage: f64 = input
                .assets
                .iter()
                .filter_map(|a| match &a.analysis {
                    AssetAnalysis::Video(v) => Some(v.duration_secs),
                    _ => None,
                })
                .sum();
            let has_video = input
                .assets
                .iter()
                .any(|a| a.analysis.media_type() == MediaType::Video);
            if has_video && footage < target / 2.0 {
                conflicts.push(DetectedConflict {
                    description: format!(
                        "Target duration is {target:.0}s but supplied footage totals only {footage:.0}s"
                    ),
                    severity: Severity::High,
                    resolution: "Remaining runtime will be filled with generated segments"
                        .to_string(),
                });
            }
        }
    }

    // Audio overruns: supplied audio longer than the target runtime.
    if let Some(target) = target {
        for asset in input.assets {
            if let AssetAnalysis::Audio(audio) = &asset.analysis {
                if audio.duration_secs > target {
                    conflicts.push(DetectedConflict {
                        description: format!(
                            "Audio asset runs {:.0}s, longer than the {target:.0}s target",
                            audio.duration_secs
                        ),
                        severity: Severity::Medium,
                        resolution: "Audio will be trimmed to fit the target duration".to_string(),
                    });
                }
            }
        }
    }

    // Double narration: voiceover requested while speech audio was supplied.
    if input.query.wants_voiceover {
        let has_speech = input.assets.iter().any(|a| {
            matches!(&a.analysis, AssetAnalysis::Audio(audio) if audio.content_kind == "speech")
        });
        if has_speech {
            conflicts.push(DetectedConflict {
                description: "Narration was requested but a speech track was also supplied"
                    .to_string(),
                severity: Severity::Medium,
                resolution: "Supplied speech takes precedence; narration covers the remainder"
                    .to_string(),
            });
        }
    }

    // Still-image intent with time-based assets.
    if intent == Intent::Image {
        let time_based = input
            .assets
            .iter()
            .filter(|a| a.analysis.duration_secs().is_some())
            .count();
        if time_based > 0 {
            conflicts.push(DetectedConflict {
                description: format!(
                    "{time_based} time-based asset(s) supplied for a still-image request"
                ),
                severity: Severity::Low,
                resolution: "Representative frames will be extracted as reference".to_string(),
            });
        }
    }

    conflicts
}

// ---------------------------------------------------------------------------
// Role assignment
// ---------------------------------------------------------------------------

/// Assign every asset to exactly one utilization bucket.
///
/// The highest-quality on-intent asset becomes `Primary`; remaining
/// on-intent assets become `Supporting`; usable off-intent assets become
/// `Reference`; anything below [`MIN_USABLE_QUALITY`] is `Unused`.
pub fn assign_roles(intent: Intent, assets: &[AnalyzedAsset]) -> Vec<AssetRoleAssignment> {
    let primary_idx = assets
        .iter()
        .enumerate()
        .filter(|(_, a)| {
            intent.accepts(a.analysis.media_type())
                && a.analysis.quality_score() >= MIN_USABLE_QUALITY
        })
        .max_by(|(_, a), (_, b)| {
            a.analysis
                .quality_score()
                .total_cmp(&b.analysis.quality_score())
        })
        .map(|(i, _)| i);

    assets
        .iter()
        .enumerate()
        .map(|(i, asset)| {
            let quality = asset.analysis.quality_score();
            let media = asset.analysis.media_type();

            let (role, reason) = if Some(i) == primary_idx {
                (
                    AssetRole::Primary,
                    format!("Highest-quality {media} asset matching the intent"),
                )
            } else if quality < MIN_USABLE_QUALITY {
                (
                    AssetRole::Unused,
                    format!("Quality score {quality:.2} below usable threshold"),
                )
            } else if intent.accepts(media) {
                (
                    AssetRole::Supporting,
                    format!("Additional {media} material for the main track"),
                )
            } else if quality >= MIN_REFERENCE_QUALITY {
                (
                    AssetRole::Reference,
                    format!("{media} does not fit the intent; kept as style reference"),
                )
            } else {
                (
                    AssetRole::Unused,
                    format!("{media} does not fit the intent and is not reference-grade"),
                )
            };

            AssetRoleAssignment {
                asset_id: asset.asset_id,
                role,
                reason,
            }
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Gap detection
// ---------------------------------------------------------------------------

/// Detect what the request still needs beyond what the assets provide.
fn detect_gaps(
    input: &SynthesisInput,
    intent: Intent,
    roles: &[AssetRoleAssignment],
) -> Vec<DetectedGap> {
    let mut gaps = Vec::new();

    let has_primary = roles.iter().any(|r| r.role == AssetRole::Primary);
    if !has_primary {
        let impact = if input.assets.is_empty() {
            // Nothing supplied at all: the whole production is generated.
            Severity::High
        } else {
            // Assets exist but none can anchor the production.
            Severity::Critical
        };
        gaps.push(DetectedGap {
            description: "No primary asset; base content will be fully generated".to_string(),
            impact,
        });
    }

    if input.query.wants_voiceover {
        let has_speech = input.assets.iter().any(|a| {
            matches!(&a.analysis, AssetAnalysis::Audio(audio) if audio.content_kind == "speech")
        });
        if !has_speech {
            gaps.push(DetectedGap {
                description: "Narration requested without a speech track; voiceover will be synthesized"
                    .to_string(),
                impact: Severity::Medium,
            });
        }
    }

    if (intent == Intent::Video || intent == Intent::Mixed)
        && input.query.target_duration_secs.is_none()
    {
        gaps.push(DetectedGap {
            description: format!(
                "No target duration given; defaulting to {DEFAULT_TARGET_DURATION_SECS:.0}s"
            ),
            impact: Severity::Low,
        });
    }

    if input.query.style.is_none() {
        let has_style_reference = input.assets.iter().any(|a| match &a.analysis {
            AssetAnalysis::Image(img) => !img.style_tags.is_empty(),
            _ => false,
        });
        if !has_style_reference {
            gaps.push(DetectedGap {
                description: "No style stated or inferable from assets; a house style will be applied"
                    .to_string(),
                impact: Severity::Low,
            });
        }
    }

    gaps
}

// ---------------------------------------------------------------------------
// Scoring
// ---------------------------------------------------------------------------

/// Completeness as `1.0` minus a per-gap penalty, clamped to `0.0..=1.0`.
pub fn completeness_score(gaps: &[DetectedGap]) -> f32 {
    let penalty: f32 = gaps
        .iter()
        .map(|g| match g.impact {
            Severity::Low => GAP_PENALTY_LOW,
            Severity::Medium => GAP_PENALTY_MEDIUM,
            Severity::High => GAP_PENALTY_HIGH,
            Severity::Critical => GAP_PENALTY_CRITICAL,
        })
        .sum();
    (1.0 - penalty).clamp(0.0, 1.0)
}

/// Alignment as the average role weight, discounted per conflict.
///
/// With no assets there is nothing to misalign, so the base is `1.0`.
pub fn alignment_score(roles: &[AssetRoleAssignment], conflicts: &[DetectedConflict]) -> f32 {
    let base = if roles.is_empty() {
        1.0
    } else {
        let total: f32 = roles
            .iter()
            .map(|r| match r.role {
                AssetRole::Primary => 1.0,
                AssetRole::Supporting => 0.8,
                AssetRole::Reference => 0.4,
                AssetRole::Unused => 0.0,
            })
            .sum();
        total / roles.len() as f32
    };
    (base - conflicts.len() as f32 * 0.05).clamp(0.0, 1.0)
}

// ---------------------------------------------------------------------------
// Production plan
// ---------------------------------------------------------------------------

/// Build the ordered production plan.
///
/// With zero contributing assets the plan is still valid — it simply
/// starts from generation instead of asset preparation.
fn build_plan(
    input: &SynthesisInput,
    intent: Intent,
    roles: &[AssetRoleAssignment],
) -> ProductionPlan {
    let contributing = roles
        .iter()
        .filter(|r| r.role != AssetRole::Unused)
        .count();
    let generated_only = contributing == 0;
    let target = input
        .query
        .target_duration_secs
        .unwrap_or(DEFAULT_TARGET_DURATION_SECS);

    let mut steps = Vec::new();
    let mut order = 1u32;
    let mut push = |steps: &mut Vec<PlanStep>, description: String, estimated_secs: f64| {
        steps.push(PlanStep {
            order,
            description,
            estimated_secs,
        });
        order += 1;
    };

    if !generated_only {
        push(
            &mut steps,
            format!("Prepare and normalize {contributing} supplied asset(s)"),
            15.0,
        );
    }

    match intent {
        Intent::Image => push(
            &mut steps,
            "Generate and compose still imagery".to_string(),
            40.0,
        ),
        Intent::Audio => push(
            &mut steps,
            format!("Produce {target:.0}s audio track"),
            target.max(20.0),
        ),
        Intent::Video | Intent::Mixed => {
            push(
                &mut steps,
                format!("Generate visual segments for {target:.0}s runtime"),
                target * 2.0,
            );
            if input.query.wants_voiceover {
                push(&mut steps, "Synthesize narration track".to_string(), 20.0);
            }
        }
    }

    push(
        &mut steps,
        "Merge tracks and composite timeline".to_string(),
        30.0,
    );
    push(&mut steps, "Final render and quality pass".to_string(), 45.0);

    let total_estimated_secs = steps.iter().map(|s| s.estimated_secs).sum();
    ProductionPlan {
        steps,
        total_estimated_secs,
        generated_only,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
