use serde::{Deserialize, Serialize};

use crate::profile::models::StudentProfile;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum ConflictType {
    GpaMismatch,
    TestScoreMismatch,
    DuplicateCourse,
    DuplicateActivity,
    MajorChange,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum ConflictSeverity {
    Advisory,
    Warning,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConflictWarning {
    pub conflict_type: ConflictType,
    pub field: String,
    pub description: String,
    pub severity: ConflictSeverity,
}

/// GPA differences below this are treated as rounding.
const GPA_TOLERANCE: f64 = 0.01;

/// Compares an extracted profile against the stored one.
/// Returns advisory warnings; nothing here blocks a merge.
pub fn check_for_conflicts(
    existing: &StudentProfile,
    extracted: &StudentProfile,
) -> Vec<ConflictWarning> {
    let mut warnings = Vec::new();

    for (field, old, new) in [
        ("gpa.unweighted", existing.gpa.unweighted, extracted.gpa.unweighted),
        ("gpa.weighted", existing.gpa.weighted, extracted.gpa.weighted),
    ] {
        if let (Some(old), Some(new)) = (old, new) {
            if (old - new).abs() > GPA_TOLERANCE {
                warnings.push(ConflictWarning {
                    conflict_type: ConflictType::GpaMismatch,
                    field: field.to_string(),
                    description: format!(
                        "Document reports {field} {new:.2} but the profile has {old:.2}. The document value will replace it."
                    ),
                    severity: ConflictSeverity::Warning,
                });
            }
        }
    }

    let test_pairs = [
        (
            "tests.sat_total",
            existing.tests.sat().map(u32::from),
            extracted.tests.sat().map(u32::from),
        ),
        (
            "tests.act_composite",
            existing.tests.act_composite.map(u32::from),
            extracted.tests.act_composite.map(u32::from),
        ),
    ];
    for (field, old, new) in test_pairs {
        if let (Some(old), Some(new)) = (old, new) {
            if old != new {
                let severity = if new < old {
                    ConflictSeverity::Warning
                } else {
                    ConflictSeverity::Advisory
                };
                warnings.push(ConflictWarning {
                    conflict_type: ConflictType::TestScoreMismatch,
                    field: field.to_string(),
                    description: format!(
                        "Document reports {field} {new}, profile has {old}. Keep whichever is your best official score."
                    ),
                    severity,
                });
            }
        }
    }

    for course in &extracted.courses {
        if let Some(stored) = existing
            .courses
            .iter()
            .find(|c| c.program == course.program && same_name(&c.name, &course.name))
        {
            if stored.score != course.score {
                warnings.push(ConflictWarning {
                    conflict_type: ConflictType::DuplicateCourse,
                    field: "courses".to_string(),
                    description: format!(
                        "{} {} is already listed with score {}; the document says {}.",
                        course.program.label(),
                        course.name,
                        display_score(stored.score),
                        display_score(course.score)
                    ),
                    severity: ConflictSeverity::Advisory,
                });
            }
        }
    }

    for activity in &extracted.activities {
        let changed = existing
            .activities
            .iter()
            .find(|a| same_name(&a.name, &activity.name))
            .is_some_and(|stored| {
                stored.role != activity.role
                    || stored.is_leadership != activity.is_leadership
                    || stored.years != activity.years
                    || stored.description != activity.description
            });
        if changed {
            warnings.push(ConflictWarning {
                conflict_type: ConflictType::DuplicateActivity,
                field: "activities".to_string(),
                description: format!(
                    "Activity '{}' already exists; the stored entry will be updated.",
                    activity.name
                ),
                severity: ConflictSeverity::Advisory,
            });
        }
    }

    if let (Some(old), Some(new)) = (&existing.intended_major, &extracted.intended_major) {
        if !same_name(old, new) {
            warnings.push(ConflictWarning {
                conflict_type: ConflictType::MajorChange,
                field: "intended_major".to_string(),
                description: format!("Intended major would change from '{old}' to '{new}'."),
                severity: ConflictSeverity::Warning,
            });
        }
    }

    warnings
}

pub(crate) fn same_name(a: &str, b: &str) -> bool {
    normalize(a) == normalize(b)
}

fn normalize(s: &str) -> String {
    s.split_whitespace()
        .map(|w| w.to_lowercase())
        .collect::<Vec<_>>()
        .join(" ")
}

fn display_score(score: Option<u8>) -> String {
    score.map_or_else(|| "pending".to_string(), |s| s.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::models::{Activity, AdvancedCourse, CourseProgram, GpaRecord, TestScores};

    fn stored() -> StudentProfile {
        StudentProfile {
            gpa: GpaRecord {
                unweighted: Some(3.85),
                ..Default::default()
            },
            tests: TestScores {
                sat_total: Some(1480),
                ..Default::default()
            },
            courses: vec![AdvancedCourse {
                name: "Biology".to_string(),
                program: CourseProgram::Ap,
                score: None,
            }],
            activities: vec![Activity {
                name: "Model UN".to_string(),
                role: None,
                is_leadership: false,
                years: None,
                description: None,
            }],
            intended_major: Some("Biology".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_identical_profile_has_no_conflicts() {
        assert!(check_for_conflicts(&stored(), &stored()).is_empty());
    }

    #[test]
    fn test_gpa_rounding_is_ignored() {
        let mut extracted = StudentProfile::default();
        extracted.gpa.unweighted = Some(3.855);
        assert!(check_for_conflicts(&stored(), &extracted).is_empty());
    }

    #[test]
    fn test_lower_sat_is_warning() {
        let mut extracted = StudentProfile::default();
        extracted.tests.sat_total = Some(1400);
        let warnings = check_for_conflicts(&stored(), &extracted);
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].conflict_type, ConflictType::TestScoreMismatch);
        assert_eq!(warnings[0].severity, ConflictSeverity::Warning);
    }

    #[test]
    fn test_course_score_update_and_duplicate_activity() {
        let extracted = StudentProfile {
            courses: vec![AdvancedCourse {
                name: "biology".to_string(),
                program: CourseProgram::Ap,
                score: Some(5),
            }],
            activities: vec![Activity {
                name: "Model  UN".to_string(),
                role: Some("Secretary-General".to_string()),
                is_leadership: true,
                years: Some(3),
                description: None,
            }],
            ..Default::default()
        };
        let kinds: Vec<_> = check_for_conflicts(&stored(), &extracted)
            .into_iter()
            .map(|w| w.conflict_type)
            .collect();
        assert_eq!(
            kinds,
            vec![ConflictType::DuplicateCourse, ConflictType::DuplicateActivity]
        );
    }

    #[test]
    fn test_unchanged_activity_not_flagged() {
        let extracted = StudentProfile {
            activities: vec![Activity {
                name: "model un".to_string(),
                role: None,
                is_leadership: false,
                years: None,
                description: None,
            }],
            ..Default::default()
        };
        assert!(check_for_conflicts(&stored(), &extracted).is_empty());
    }

    #[test]
    fn test_major_change_flagged() {
        let mut extracted = StudentProfile::default();
        extracted.intended_major = Some("Economics".to_string());
        let warnings = check_for_conflicts(&stored(), &extracted);
        assert_eq!(warnings[0].conflict_type, ConflictType::MajorChange);
    }
}
