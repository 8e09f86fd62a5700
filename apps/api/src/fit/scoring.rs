//! Fit Scoring: pluggable, trait-based scorer that measures a student profile
//! against a university's admission statistics.
//!
//! Default: `RubricFitScorer` (pure Rust, deterministic, fully testable).
//! `AppState` holds an `Arc<dyn FitScorer>`, chosen at startup.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::knowledge::models::{GpaBand, TestPolicy, UniversityProfile};
use crate::knowledge::text::tokenize;
use crate::profile::models::{act_to_sat, StudentProfile};

// ────────────────────────────────────────────────────────────────────────────
// Output data models (shared across all scorer backends)
// ────────────────────────────────────────────────────────────────────────────

/// Maximum points per factor. Defaults sum to 150.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct FitWeights {
    pub gpa: f64,
    pub test_scores: f64,
    pub acceptance_rate: f64,
    pub course_rigor: f64,
    pub major_fit: f64,
    pub activities: f64,
    pub early_action: f64,
}

impl Default for FitWeights {
    fn default() -> Self {
        Self {
            gpa: 40.0,
            test_scores: 25.0,
            acceptance_rate: 25.0,
            course_rigor: 20.0,
            major_fit: 15.0,
            activities: 15.0,
            early_action: 10.0,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum FactorKind {
    GpaMatch,
    TestScores,
    AcceptanceRate,
    CourseRigor,
    MajorFit,
    Activities,
    EarlyAction,
}

impl FactorKind {
    pub fn label(self) -> &'static str {
        match self {
            FactorKind::GpaMatch => "GPA match",
            FactorKind::TestScores => "test scores",
            FactorKind::AcceptanceRate => "acceptance rate",
            FactorKind::CourseRigor => "course rigor",
            FactorKind::MajorFit => "major fit",
            FactorKind::Activities => "activities",
            FactorKind::EarlyAction => "early action",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FactorStatus {
    Scored,
    /// Student side gap: zero points, still counted in the denominator.
    MissingProfileData,
    /// University side gap: excluded from the denominator.
    DataUnavailable,
    /// Factor does not apply to this school (e.g. test-blind).
    NotApplicable,
}

impl FactorStatus {
    pub fn counts_toward_max(self) -> bool {
        matches!(self, FactorStatus::Scored | FactorStatus::MissingProfileData)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FactorScore {
    pub factor: FactorKind,
    pub points: f64,
    pub max_points: f64,
    pub status: FactorStatus,
    pub detail: String,
}

/// Ordered from hardest to easiest, so `min` picks the harder category.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FitCategory {
    SuperReach,
    Reach,
    Target,
    Safety,
}

/// Full fit result returned to callers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FitResult {
    pub university_id: String,
    pub university_name: String,
    pub category: FitCategory,
    /// Sum of factor points.
    pub overall_score: f64,
    /// Sum of `max_points` over factors that count toward the denominator.
    pub max_possible: f64,
    pub percentage: f64,
    pub factors: Vec<FactorScore>,
    pub data_gaps: Vec<String>,
    pub recommendation: String,
    pub scorer_backend: String, // "rubric" for transparency
}

// ────────────────────────────────────────────────────────────────────────────
// Trait definition
// ────────────────────────────────────────────────────────────────────────────

/// The fit scorer trait. Implement this to swap backends without touching
/// the endpoint, handler, or caller code.
///
/// Carried in `AppState` as `Arc<dyn FitScorer>`.
#[async_trait]
pub trait FitScorer: Send + Sync {
    async fn score(
        &self,
        profile: &StudentProfile,
        university: &UniversityProfile,
    ) -> Result<FitResult, AppError>;
}

// ────────────────────────────────────────────────────────────────────────────
// RubricFitScorer — default implementation
// ────────────────────────────────────────────────────────────────────────────

/// Weighted seven-factor rubric. Fast, deterministic, no LLM call.
///
/// Algorithm:
/// 1. Score each factor against its maximum, recording a status per factor.
/// 2. overall_score = Σ factor points; max_possible = Σ max over factors that
///    count (scored or missing on the student side).
/// 3. Bucket the percentage: ≥75 SAFETY, ≥55 TARGET, ≥35 REACH, else SUPER_REACH.
/// 4. Cap by selectivity: <10% admit rate is at best REACH, <20% at best TARGET.
#[derive(Debug, Clone, Default)]
pub struct RubricFitScorer {
    pub weights: FitWeights,
}

#[async_trait]
impl FitScorer for RubricFitScorer {
    async fn score(
        &self,
        profile: &StudentProfile,
        university: &UniversityProfile,
    ) -> Result<FitResult, AppError> {
        score_fit(profile, university, &self.weights)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Core rubric
// ────────────────────────────────────────────────────────────────────────────

const SAFETY_THRESHOLD: f64 = 75.0;
const TARGET_THRESHOLD: f64 = 55.0;
const REACH_THRESHOLD: f64 = 35.0;

/// Acceptance rate at which the acceptance factor reaches full credit.
const ACCEPTANCE_FULL_CREDIT_RATE: f64 = 75.0;

const UNDECIDED_MAJORS: &[&str] = &["undecided", "undeclared", "exploratory", "unsure"];

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Position of `x` between `lo` and `hi`, clamped to 0..=1.
fn fraction(x: f64, lo: f64, hi: f64) -> f64 {
    if hi > lo {
        ((x - lo) / (hi - lo)).clamp(0.0, 1.0)
    } else {
        1.0
    }
}

fn factor(kind: FactorKind, max: f64, ratio: f64, status: FactorStatus, detail: String) -> FactorScore {
    let points = if status == FactorStatus::Scored {
        round1(max * ratio.clamp(0.0, 1.0))
    } else {
        0.0
    };
    FactorScore {
        factor: kind,
        points,
        max_points: max,
        status,
        detail,
    }
}

pub fn score_fit(
    profile: &StudentProfile,
    university: &UniversityProfile,
    weights: &FitWeights,
) -> Result<FitResult, AppError> {
    if profile.gpa.normalized().is_none() && profile.tests.is_empty() {
        return Err(AppError::InsufficientData(
            "Profile has neither a GPA nor a test score; add at least one to calculate fit"
                .to_string(),
        ));
    }

    let factors = vec![
        score_gpa(profile, &university.gpa, weights.gpa),
        score_tests(profile, university, weights.test_scores),
        score_acceptance(university.acceptance_rate, weights.acceptance_rate),
        score_rigor(profile, weights.course_rigor),
        score_major(profile, university, weights.major_fit),
        score_activities(profile, weights.activities),
        score_early_action(university, weights.early_action),
    ];

    if !factors.iter().any(|f| f.status == FactorStatus::Scored) {
        return Err(AppError::InsufficientData(format!(
            "Not enough data to score fit for {}",
            university.name
        )));
    }

    let overall_score = round1(factors.iter().map(|f| f.points).sum());
    let max_possible: f64 = factors
        .iter()
        .filter(|f| f.status.counts_toward_max())
        .map(|f| f.max_points)
        .sum();
    let percentage = if max_possible > 0.0 {
        round1(overall_score / max_possible * 100.0)
    } else {
        0.0
    };

    let category = apply_selectivity_cap(category_for(percentage), university.acceptance_rate);

    let data_gaps: Vec<String> = factors
        .iter()
        .filter(|f| f.status == FactorStatus::DataUnavailable)
        .map(|f| f.detail.clone())
        .collect();

    let recommendation = build_recommendation(category, percentage, &factors);

    Ok(FitResult {
        university_id: university.university_id.clone(),
        university_name: university.name.clone(),
        category,
        overall_score,
        max_possible,
        percentage,
        factors,
        data_gaps,
        recommendation,
        scorer_backend: "rubric".to_string(),
    })
}

/// Category for an overall percentage, before any selectivity cap.
pub fn category_for(percentage: f64) -> FitCategory {
    if percentage >= SAFETY_THRESHOLD {
        FitCategory::Safety
    } else if percentage >= TARGET_THRESHOLD {
        FitCategory::Target
    } else if percentage >= REACH_THRESHOLD {
        FitCategory::Reach
    } else {
        FitCategory::SuperReach
    }
}

/// Highly selective schools are never easier than REACH (<10%) or TARGET (<20%).
pub fn apply_selectivity_cap(category: FitCategory, acceptance_rate: Option<f64>) -> FitCategory {
    match acceptance_rate {
        Some(rate) if rate < 10.0 => category.min(FitCategory::Reach),
        Some(rate) if rate < 20.0 => category.min(FitCategory::Target),
        _ => category,
    }
}

/// (p25, p50, p75). A single missing percentile is mirrored around the
/// others; with fewer than two, the band is synthesised from the average
/// (or a lone median).
fn gpa_percentiles(band: &GpaBand) -> Option<(f64, f64, f64)> {
    match (band.p25, band.p50, band.p75) {
        (Some(p25), Some(p50), Some(p75)) => Some((p25, p50, p75)),
        (Some(p25), None, Some(p75)) => Some((p25, (p25 + p75) / 2.0, p75)),
        (None, Some(p50), Some(p75)) => Some(((2.0 * p50 - p75).max(0.0), p50, p75)),
        (Some(p25), Some(p50), None) => Some((p25, p50, (2.0 * p50 - p25).min(4.0))),
        _ => band
            .average
            .or(band.p50)
            .map(|avg| ((avg - 0.2).max(0.0), avg, (avg + 0.15).min(4.0))),
    }
}

fn score_gpa(profile: &StudentProfile, band: &GpaBand, max: f64) -> FactorScore {
    let kind = FactorKind::GpaMatch;
    let Some((p25, p50, p75)) = gpa_percentiles(band) else {
        return factor(
            kind,
            max,
            0.0,
            FactorStatus::DataUnavailable,
            "Admitted-student GPA data unavailable".to_string(),
        );
    };
    let Some(gpa) = profile.gpa.normalized() else {
        return factor(
            kind,
            max,
            0.0,
            FactorStatus::MissingProfileData,
            "No GPA on profile".to_string(),
        );
    };

    let ratio = if gpa >= p75 {
        1.0
    } else if gpa >= p50 {
        0.75 + 0.25 * fraction(gpa, p50, p75)
    } else if gpa >= p25 {
        0.45 + 0.30 * fraction(gpa, p25, p50)
    } else {
        (0.45 - (p25 - gpa) / 0.1 * 0.10).max(0.0)
    };

    factor(
        kind,
        max,
        ratio,
        FactorStatus::Scored,
        format!("GPA {gpa:.2} vs admitted middle 50% {p25:.2}-{p75:.2} (median {p50:.2})"),
    )
}

/// SAT-scale (p25, p75); an ACT band is concorded when no SAT band exists.
fn sat_scale_band(university: &UniversityProfile) -> Option<(u16, u16)> {
    university.sat.range().or_else(|| {
        university
            .act
            .range()
            .map(|(lo, hi)| (act_to_sat(lo as u8), act_to_sat(hi as u8)))
    })
}

fn score_tests(profile: &StudentProfile, university: &UniversityProfile, max: f64) -> FactorScore {
    let kind = FactorKind::TestScores;
    if university.test_policy == TestPolicy::Blind {
        return factor(
            kind,
            max,
            0.0,
            FactorStatus::NotApplicable,
            format!("{} is test-blind", university.name),
        );
    }
    let Some((p25, p75)) = sat_scale_band(university) else {
        return factor(
            kind,
            max,
            0.0,
            FactorStatus::DataUnavailable,
            "Admitted-student test score data unavailable".to_string(),
        );
    };
    let Some(score) = profile.tests.sat_equivalent() else {
        let detail = match university.test_policy {
            TestPolicy::Required => "No SAT/ACT score on profile; this school requires one",
            _ => "No SAT/ACT score on profile; submitting one strengthens the application",
        };
        return factor(
            kind,
            max,
            0.0,
            FactorStatus::MissingProfileData,
            detail.to_string(),
        );
    };

    let (score_f, p25_f, p75_f) = (f64::from(score), f64::from(p25), f64::from(p75));
    let ratio = if score >= p75 {
        1.0
    } else if score >= p25 {
        0.48 + 0.52 * fraction(score_f, p25_f, p75_f)
    } else {
        (0.48 - (p25_f - score_f) / 10.0 * 0.04).max(0.0)
    };

    factor(
        kind,
        max,
        ratio,
        FactorStatus::Scored,
        format!("SAT-equivalent {score} vs admitted middle 50% {p25}-{p75}"),
    )
}

fn score_acceptance(acceptance_rate: Option<f64>, max: f64) -> FactorScore {
    let kind = FactorKind::AcceptanceRate;
    match acceptance_rate {
        Some(rate) => factor(
            kind,
            max,
            rate.min(ACCEPTANCE_FULL_CREDIT_RATE) / ACCEPTANCE_FULL_CREDIT_RATE,
            FactorStatus::Scored,
            format!("Acceptance rate {rate:.1}%"),
        ),
        None => factor(
            kind,
            max,
            0.0,
            FactorStatus::DataUnavailable,
            "Acceptance rate unknown".to_string(),
        ),
    }
}

fn score_rigor(profile: &StudentProfile, max: f64) -> FactorScore {
    let kind = FactorKind::CourseRigor;
    let courses = &profile.courses;
    if courses.is_empty() {
        return factor(
            kind,
            max,
            0.0,
            FactorStatus::MissingProfileData,
            "No AP/IB courses on profile".to_string(),
        );
    }

    let count_part = courses.len().min(10) as f64 / 10.0;
    let exam_ratios: Vec<f64> = courses
        .iter()
        .filter_map(|c| {
            c.score
                .map(|s| f64::from(s) / f64::from(c.program.max_score()))
        })
        .collect();
    let exam_part = if exam_ratios.is_empty() {
        0.5
    } else {
        exam_ratios.iter().sum::<f64>() / exam_ratios.len() as f64
    };

    factor(
        kind,
        max,
        0.6 * count_part + 0.4 * exam_part,
        FactorStatus::Scored,
        format!(
            "{} AP/IB courses, {} with exam scores",
            courses.len(),
            exam_ratios.len()
        ),
    )
}

fn same_major(a: &str, b: &str) -> bool {
    a.trim().eq_ignore_ascii_case(b.trim())
}

fn score_major(profile: &StudentProfile, university: &UniversityProfile, max: f64) -> FactorScore {
    let kind = FactorKind::MajorFit;
    if university.majors.is_empty() {
        return factor(
            kind,
            max,
            0.0,
            FactorStatus::DataUnavailable,
            "Offered majors unknown".to_string(),
        );
    }

    let intended = profile
        .intended_major
        .as_deref()
        .map(str::trim)
        .filter(|m| !m.is_empty() && !UNDECIDED_MAJORS.iter().any(|u| same_major(m, u)));
    let Some(intended) = intended else {
        return factor(
            kind,
            max,
            2.0 / 3.0,
            FactorStatus::Scored,
            "Undecided major; exploring is possible".to_string(),
        );
    };

    let wanted = tokenize(intended);
    let (ratio, matched): (f64, Option<&str>) = match university
        .majors
        .iter()
        .find(|m| same_major(m, intended))
    {
        Some(major) => (1.0, Some(major.as_str())),
        None => match university
            .majors
            .iter()
            .find(|m| tokenize(m).iter().any(|t| wanted.contains(t)))
        {
            Some(major) => (0.6, Some(major.as_str())),
            None => (0.0, None),
        },
    };

    let impacted = matched.is_some_and(|m| {
        university
            .impacted_majors
            .iter()
            .any(|i| same_major(i, m) || same_major(i, intended))
    });

    let (ratio, detail) = match matched {
        Some(major) if impacted => (
            ratio.min(2.0 / 3.0),
            format!("{major} is offered but capacity-constrained"),
        ),
        Some(major) if ratio >= 1.0 => (ratio, format!("{major} is offered")),
        Some(major) => (ratio, format!("Closest offered major to {intended}: {major}")),
        None => (ratio, format!("{intended} is not offered")),
    };

    factor(kind, max, ratio, FactorStatus::Scored, detail)
}

const ACTIVITY_POINTS: f64 = 2.0;
const MAX_COUNTED_ACTIVITIES: usize = 4;
const LEADERSHIP_POINTS: f64 = 3.0;
const MAX_COUNTED_LEADERSHIP: usize = 2;
const AWARD_POINTS: f64 = 1.0;

fn score_activities(profile: &StudentProfile, max: f64) -> FactorScore {
    let kind = FactorKind::Activities;
    if profile.activities.is_empty() && profile.awards.is_empty() {
        return factor(
            kind,
            max,
            0.0,
            FactorStatus::MissingProfileData,
            "No activities or awards on profile".to_string(),
        );
    }

    let scale = ACTIVITY_POINTS * MAX_COUNTED_ACTIVITIES as f64
        + LEADERSHIP_POINTS * MAX_COUNTED_LEADERSHIP as f64
        + AWARD_POINTS;
    let leaders = profile.leadership_count();
    let raw = ACTIVITY_POINTS * profile.activities.len().min(MAX_COUNTED_ACTIVITIES) as f64
        + LEADERSHIP_POINTS * leaders.min(MAX_COUNTED_LEADERSHIP) as f64
        + if profile.awards.is_empty() { 0.0 } else { AWARD_POINTS };

    factor(
        kind,
        max,
        raw / scale,
        FactorStatus::Scored,
        format!(
            "{} activities ({leaders} leadership), {} awards",
            profile.activities.len(),
            profile.awards.len()
        ),
    )
}

fn score_early_action(university: &UniversityProfile, max: f64) -> FactorScore {
    let kind = FactorKind::EarlyAction;
    if university.early_programs.is_empty() {
        return factor(
            kind,
            max,
            0.0,
            FactorStatus::NotApplicable,
            format!("{} has no early program", university.name),
        );
    }
    match (university.early_acceptance_rate, university.acceptance_rate) {
        (Some(early), Some(overall)) if overall > 0.0 => factor(
            kind,
            max,
            early / overall - 1.0,
            FactorStatus::Scored,
            format!("Early round admits {early:.1}% vs {overall:.1}% overall"),
        ),
        _ => factor(
            kind,
            max,
            0.0,
            FactorStatus::DataUnavailable,
            "Early-round acceptance rate unknown".to_string(),
        ),
    }
}

/// Builds a human-readable recommendation from the category and factor gaps.
fn build_recommendation(category: FitCategory, percentage: f64, factors: &[FactorScore]) -> String {
    let mut text = match category {
        FitCategory::Safety => format!(
            "Safety ({percentage:.0}%). Your record sits at or above this school's admitted range."
        ),
        FitCategory::Target => format!(
            "Target ({percentage:.0}%). You are competitive; strong essays and recommendations matter."
        ),
        FitCategory::Reach => format!(
            "Reach ({percentage:.0}%). Admission is possible but uncertain; balance your list with targets."
        ),
        FitCategory::SuperReach => format!(
            "Super reach ({percentage:.0}%). Admission is unlikely on current numbers; apply only alongside several targets and safeties."
        ),
    };

    let missing: Vec<&str> = factors
        .iter()
        .filter(|f| f.status == FactorStatus::MissingProfileData)
        .map(|f| f.factor.label())
        .collect();
    if !missing.is_empty() {
        text.push_str(&format!(
            " Add your {} to sharpen this estimate.",
            missing.join(", ")
        ));
    }

    let early = factors
        .iter()
        .find(|f| f.factor == FactorKind::EarlyAction && f.status == FactorStatus::Scored);
    if early.is_some_and(|f| f.points >= f.max_points / 2.0) {
        text.push_str(" Applying early noticeably improves your odds here.");
    }
    text
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::knowledge::models::fixtures::{stanford, state_flagship};
    use crate::knowledge::models::{EarlyProgram, ScoreBand};
    use crate::profile::models::{
        Activity, AdvancedCourse, Award, CourseProgram, GpaRecord, TestScores,
    };

    fn activity(name: &str, leader: bool) -> Activity {
        Activity {
            name: name.to_string(),
            role: leader.then(|| "President".to_string()),
            is_leadership: leader,
            years: Some(3),
            description: None,
        }
    }

    fn strong_student() -> StudentProfile {
        StudentProfile {
            name: Some("Ada".to_string()),
            gpa: GpaRecord {
                unweighted: Some(3.95),
                ..Default::default()
            },
            tests: TestScores {
                sat_total: Some(1540),
                ..Default::default()
            },
            courses: (0..8)
                .map(|i| AdvancedCourse {
                    name: format!("AP Course {i}"),
                    program: CourseProgram::Ap,
                    score: Some(5),
                })
                .collect(),
            activities: vec![
                activity("Robotics", true),
                activity("Debate", true),
                activity("Orchestra", false),
                activity("Tutoring", false),
            ],
            awards: vec![Award {
                title: "USACO Gold".to_string(),
                level: Some("national".to_string()),
            }],
            intended_major: Some("Computer Science".to_string()),
            ..Default::default()
        }
    }

    fn weak_student() -> StudentProfile {
        StudentProfile {
            gpa: GpaRecord {
                unweighted: Some(3.0),
                ..Default::default()
            },
            activities: vec![activity("Soccer", false)],
            intended_major: Some("Nursing".to_string()),
            ..Default::default()
        }
    }

    fn score(profile: &StudentProfile, university: &UniversityProfile) -> FitResult {
        score_fit(profile, university, &FitWeights::default()).unwrap()
    }

    fn factor_of(result: &FitResult, kind: FactorKind) -> &FactorScore {
        result.factors.iter().find(|f| f.factor == kind).unwrap()
    }

    /// Factor points add up to the overall score and counted maxima to the denominator.
    fn assert_totals_consistent(result: &FitResult) {
        let sum: f64 = result.factors.iter().map(|f| f.points).sum();
        assert!(
            (sum - result.overall_score).abs() < 1e-6,
            "sum {sum} != overall {}",
            result.overall_score
        );
        let counted: f64 = result
            .factors
            .iter()
            .filter(|f| f.status.counts_toward_max())
            .map(|f| f.max_points)
            .sum();
        assert!((counted - result.max_possible).abs() < 1e-6);
        assert_eq!(result.factors.len(), 7);
    }

    #[test]
    fn test_default_weights_total_150() {
        let result = score(&strong_student(), &state_flagship());
        let total: f64 = result.factors.iter().map(|f| f.max_points).sum();
        assert_eq!(total, 150.0);
    }

    #[test]
    fn test_factor_points_sum_to_overall() {
        for profile in [strong_student(), weak_student()] {
            for university in [stanford(), state_flagship()] {
                assert_totals_consistent(&score(&profile, &university));
            }
        }
    }

    #[test]
    fn test_strong_student_at_flagship_is_safety() {
        let result = score(&strong_student(), &state_flagship());
        assert_eq!(result.category, FitCategory::Safety);
        assert_eq!(factor_of(&result, FactorKind::GpaMatch).points, 40.0);
        assert_eq!(factor_of(&result, FactorKind::TestScores).points, 25.0);
        assert_eq!(factor_of(&result, FactorKind::AcceptanceRate).points, 25.0);
        assert_eq!(factor_of(&result, FactorKind::CourseRigor).points, 17.6);
        assert_eq!(factor_of(&result, FactorKind::Activities).points, 15.0);
        // No early program: excluded from the denominator.
        assert_eq!(result.max_possible, 140.0);
        assert_eq!(result.overall_score, 137.6);
        assert_eq!(result.scorer_backend, "rubric");
    }

    #[test]
    fn test_elite_school_capped_at_reach() {
        let result = score(&strong_student(), &stanford());
        assert_eq!(factor_of(&result, FactorKind::GpaMatch).points, 28.3);
        assert_eq!(factor_of(&result, FactorKind::TestScores).points, 19.4);
        assert_eq!(factor_of(&result, FactorKind::AcceptanceRate).points, 1.3);
        assert_eq!(factor_of(&result, FactorKind::EarlyAction).points, 10.0);
        assert_eq!(result.overall_score, 106.6);
        assert_eq!(result.percentage, 71.1);
        assert_eq!(category_for(result.percentage), FitCategory::Target);
        assert_eq!(result.category, FitCategory::Reach);
    }

    #[test]
    fn test_unknown_acceptance_rate_is_explicit() {
        let mut university = state_flagship();
        university.acceptance_rate = None;
        let result = score(&strong_student(), &university);

        let acceptance = factor_of(&result, FactorKind::AcceptanceRate);
        assert_eq!(acceptance.status, FactorStatus::DataUnavailable);
        assert_eq!(acceptance.points, 0.0);
        assert_eq!(result.max_possible, 115.0);
        assert!(result.data_gaps.iter().any(|g| g.contains("Acceptance rate")));
        assert_totals_consistent(&result);
    }

    #[test]
    fn test_category_monotonic_in_percentage() {
        for rate in [None, Some(5.0), Some(15.0), Some(60.0)] {
            let mut previous = FitCategory::SuperReach;
            for step in 0..=1000 {
                let pct = step as f64 / 10.0;
                let category = apply_selectivity_cap(category_for(pct), rate);
                assert!(category >= previous, "{pct}% regressed at rate {rate:?}");
                previous = category;
            }
        }
    }

    #[test]
    fn test_scoring_is_idempotent() {
        let profile = strong_student();
        let university = stanford();
        assert_eq!(score(&profile, &university), score(&profile, &university));
    }

    #[test]
    fn test_blind_school_does_not_penalize_missing_scores() {
        let mut university = state_flagship();
        university.test_policy = TestPolicy::Blind;
        let mut profile = strong_student();
        profile.tests = TestScores::default();
        let result = score(&profile, &university);

        let tests = factor_of(&result, FactorKind::TestScores);
        assert_eq!(tests.status, FactorStatus::NotApplicable);
        assert_eq!(result.max_possible, 115.0);
        assert_totals_consistent(&result);
    }

    #[test]
    fn test_optional_school_counts_missing_scores() {
        let result = score(&weak_student(), &state_flagship());
        let tests = factor_of(&result, FactorKind::TestScores);
        assert_eq!(tests.status, FactorStatus::MissingProfileData);
        assert_eq!(tests.points, 0.0);
        assert_eq!(result.max_possible, 140.0);
        assert!(result.recommendation.contains("test scores"));
        assert_totals_consistent(&result);
    }

    #[test]
    fn test_weak_student_factor_values() {
        let result = score(&weak_student(), &state_flagship());
        assert_eq!(factor_of(&result, FactorKind::GpaMatch).points, 10.0);
        assert_eq!(
            factor_of(&result, FactorKind::CourseRigor).status,
            FactorStatus::MissingProfileData
        );
        // Nursing is impacted: capped at 2/3 of 15.
        assert_eq!(factor_of(&result, FactorKind::MajorFit).points, 10.0);
        assert_eq!(factor_of(&result, FactorKind::Activities).points, 2.0);
        assert_eq!(result.overall_score, 47.0);
    }

    #[test]
    fn test_act_concorded_to_sat() {
        let mut act_student = strong_student();
        act_student.tests = TestScores {
            act_composite: Some(35),
            ..Default::default()
        };
        let act_result = score(&act_student, &stanford());
        let sat_result = score(&strong_student(), &stanford());
        assert_eq!(act_to_sat(35), 1540);
        assert_eq!(
            factor_of(&act_result, FactorKind::TestScores).points,
            factor_of(&sat_result, FactorKind::TestScores).points
        );
    }

    #[test]
    fn test_act_only_band_is_used() {
        let mut university = state_flagship();
        university.sat = ScoreBand::default();
        university.act = ScoreBand {
            p25: Some(22),
            p75: Some(28),
        };
        let result = score(&strong_student(), &university);
        let tests = factor_of(&result, FactorKind::TestScores);
        assert_eq!(tests.status, FactorStatus::Scored);
        assert_eq!(tests.points, 25.0);
    }

    #[test]
    fn test_below_band_scores_decay() {
        let mut profile = strong_student();
        profile.tests.sat_total = Some(1400);
        let result = score(&profile, &stanford());
        // 100 points under p25: 48% - 40% = 8% of 25.
        assert_eq!(factor_of(&result, FactorKind::TestScores).points, 2.0);
    }

    #[test]
    fn test_gpa_band_from_average_only() {
        let mut university = state_flagship();
        university.gpa = GpaBand {
            average: Some(3.5),
            ..Default::default()
        };
        let mut profile = strong_student();
        profile.gpa.unweighted = Some(3.5);
        let result = score(&profile, &university);
        assert_eq!(factor_of(&result, FactorKind::GpaMatch).points, 30.0);
    }

    #[test]
    fn test_gpa_band_with_two_percentiles() {
        let full = GpaBand {
            p25: Some(3.5),
            p50: Some(3.7),
            p75: Some(3.9),
            average: None,
        };
        let mut profile = strong_student();
        profile.gpa.unweighted = Some(3.6);

        for partial in [
            GpaBand { p25: None, ..full },
            GpaBand { p75: None, ..full },
        ] {
            let mut university = state_flagship();
            university.gpa = partial;
            let from_partial = score(&profile, &university);
            university.gpa = full;
            let from_full = score(&profile, &university);

            let gpa = factor_of(&from_partial, FactorKind::GpaMatch);
            assert_eq!(gpa.status, FactorStatus::Scored);
            assert!(
                (gpa.points - factor_of(&from_full, FactorKind::GpaMatch).points).abs() < 0.11
            );
        }
    }

    #[test]
    fn test_major_fit_variants() {
        let university = stanford();
        let mut profile = strong_student();

        profile.intended_major = Some("undecided".to_string());
        assert_eq!(
            factor_of(&score(&profile, &university), FactorKind::MajorFit).points,
            10.0
        );

        profile.intended_major = Some("Computer Engineering".to_string());
        assert_eq!(
            factor_of(&score(&profile, &university), FactorKind::MajorFit).points,
            9.0
        );

        profile.intended_major = Some("Theater".to_string());
        let result = score(&profile, &university);
        let major = factor_of(&result, FactorKind::MajorFit);
        assert_eq!(major.points, 0.0);
        assert!(major.detail.contains("not offered"));

        let mut impacted = stanford();
        impacted.impacted_majors = vec!["Computer Science".to_string()];
        profile.intended_major = Some("computer science".to_string());
        let result = score(&profile, &impacted);
        let major = factor_of(&result, FactorKind::MajorFit);
        assert_eq!(major.points, 10.0);
        assert!(major.detail.contains("capacity-constrained"));
    }

    #[test]
    fn test_unknown_majors_are_a_data_gap() {
        let mut university = stanford();
        university.majors.clear();
        let result = score(&strong_student(), &university);
        assert_eq!(
            factor_of(&result, FactorKind::MajorFit).status,
            FactorStatus::DataUnavailable
        );
        assert_totals_consistent(&result);
    }

    #[test]
    fn test_early_action_statuses() {
        let mut university = state_flagship();
        university.early_programs = vec![EarlyProgram::EarlyAction];
        let result = score(&strong_student(), &university);
        assert_eq!(
            factor_of(&result, FactorKind::EarlyAction).status,
            FactorStatus::DataUnavailable
        );

        university.early_acceptance_rate = Some(86.0);
        let result = score(&strong_student(), &university);
        let early = factor_of(&result, FactorKind::EarlyAction);
        assert_eq!(early.status, FactorStatus::Scored);
        assert_eq!(early.points, 0.0);
    }

    #[test]
    fn test_selectivity_cap() {
        assert_eq!(
            apply_selectivity_cap(FitCategory::Safety, Some(4.0)),
            FitCategory::Reach
        );
        assert_eq!(
            apply_selectivity_cap(FitCategory::Safety, Some(15.0)),
            FitCategory::Target
        );
        assert_eq!(
            apply_selectivity_cap(FitCategory::SuperReach, Some(4.0)),
            FitCategory::SuperReach
        );
        assert_eq!(
            apply_selectivity_cap(FitCategory::Safety, None),
            FitCategory::Safety
        );
    }

    #[test]
    fn test_empty_profile_is_insufficient_data() {
        let err = score_fit(&StudentProfile::default(), &stanford(), &FitWeights::default())
            .unwrap_err();
        assert!(matches!(err, AppError::InsufficientData(_)));
    }

    #[test]
    fn test_category_serializes_screaming_snake() {
        assert_eq!(
            serde_json::to_value(FitCategory::SuperReach).unwrap(),
            serde_json::json!("SUPER_REACH")
        );
    }

    #[tokio::test]
    async fn test_rubric_scorer_matches_pure_function() {
        let scorer = RubricFitScorer::default();
        let via_trait = scorer.score(&strong_student(), &stanford()).await.unwrap();
        assert_eq!(via_trait, score(&strong_student(), &stanford()));
    }
}
