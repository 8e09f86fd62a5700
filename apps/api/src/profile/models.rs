use serde::{Deserialize, Serialize};

use crate::errors::AppError;

/// Advanced-course program. Exam score ceilings differ per program.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CourseProgram {
    Ap,
    Ib,
}

impl CourseProgram {
    pub fn max_score(self) -> u8 {
        match self {
            CourseProgram::Ap => 5,
            CourseProgram::Ib => 7,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            CourseProgram::Ap => "AP",
            CourseProgram::Ib => "IB",
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct GpaRecord {
    /// Unweighted, 4.0 scale.
    pub unweighted: Option<f64>,
    pub weighted: Option<f64>,
    /// Scale of the weighted GPA (defaults to 5.0).
    pub scale: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TestScores {
    pub sat_total: Option<u16>,
    pub sat_math: Option<u16>,
    pub sat_ebrw: Option<u16>,
    pub act_composite: Option<u8>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AdvancedCourse {
    pub name: String,
    pub program: CourseProgram,
    /// Exam score, absent while the course is in progress.
    pub score: Option<u8>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Activity {
    pub name: String,
    pub role: Option<String>,
    #[serde(default)]
    pub is_leadership: bool,
    pub years: Option<u8>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Award {
    pub title: String,
    /// school / regional / state / national / international
    pub level: Option<String>,
}

/// A student's academic record as used by scoring and the counseling agent.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StudentProfile {
    pub name: Option<String>,
    pub high_school: Option<String>,
    pub state: Option<String>,
    pub graduation_year: Option<u16>,
    pub gpa: GpaRecord,
    pub tests: TestScores,
    pub courses: Vec<AdvancedCourse>,
    pub activities: Vec<Activity>,
    pub awards: Vec<Award>,
    pub intended_major: Option<String>,
}

const DEFAULT_WEIGHTED_SCALE: f64 = 5.0;

/// ACT composite → SAT total concordance (2018 tables), composites 9..=36.
const ACT_TO_SAT: [u16; 28] = [
    590, 630, 670, 710, 760, 800, 850, 890, 930, 970, 1010, 1040, 1080, 1110, 1140, 1180, 1210,
    1240, 1280, 1310, 1340, 1370, 1400, 1430, 1460, 1500, 1540, 1590,
];

pub fn act_to_sat(act: u8) -> u16 {
    match act {
        0 => 400,
        1..=8 => (590 - (9 - act as u16) * 24).max(400),
        9..=36 => ACT_TO_SAT[(act - 9) as usize],
        _ => 1600,
    }
}

impl GpaRecord {
    /// GPA on a 4.0 unweighted scale. Weighted GPAs are rescaled and capped.
    pub fn normalized(&self) -> Option<f64> {
        if let Some(gpa) = self.unweighted {
            return Some(gpa.clamp(0.0, 4.0));
        }
        let weighted = self.weighted?;
        let scale = self.scale.filter(|s| *s > 0.0).unwrap_or(DEFAULT_WEIGHTED_SCALE);
        Some((weighted / scale * 4.0).clamp(0.0, 4.0))
    }
}

impl TestScores {
    /// SAT total, derived from sections when only those were reported.
    pub fn sat(&self) -> Option<u16> {
        self.sat_total.or(match (self.sat_math, self.sat_ebrw) {
            (Some(math), Some(ebrw)) => Some(math + ebrw),
            _ => None,
        })
    }

    /// Best score on the SAT scale across SAT and concorded ACT.
    pub fn sat_equivalent(&self) -> Option<u16> {
        let act = self.act_composite.map(act_to_sat);
        match (self.sat(), act) {
            (Some(sat), Some(act)) => Some(sat.max(act)),
            (sat, act) => sat.or(act),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.sat().is_none() && self.act_composite.is_none()
    }
}

impl StudentProfile {
    pub fn leadership_count(&self) -> usize {
        self.activities.iter().filter(|a| a.is_leadership).count()
    }

    /// Rejects out-of-range academic values before they are stored.
    pub fn validate(&self) -> Result<(), AppError> {
        let mut problems = Vec::new();

        if let Some(gpa) = self.gpa.unweighted {
            if !(0.0..=4.0).contains(&gpa) {
                problems.push(format!("unweighted GPA {gpa} must be between 0.0 and 4.0"));
            }
        }
        if let Some(scale) = self.gpa.scale {
            if scale <= 0.0 {
                problems.push(format!("GPA scale {scale} must be positive"));
            }
        }
        if let Some(weighted) = self.gpa.weighted {
            let scale = self.gpa.scale.unwrap_or(DEFAULT_WEIGHTED_SCALE);
            if weighted < 0.0 || weighted > scale {
                problems.push(format!("weighted GPA {weighted} must be between 0 and {scale}"));
            }
        }
        if let Some(sat) = self.tests.sat_total {
            if !(400..=1600).contains(&sat) {
                problems.push(format!("SAT total {sat} must be between 400 and 1600"));
            }
        }
        for (label, section) in [("math", self.tests.sat_math), ("EBRW", self.tests.sat_ebrw)] {
            if let Some(score) = section {
                if !(200..=800).contains(&score) {
                    problems.push(format!("SAT {label} {score} must be between 200 and 800"));
                }
            }
        }
        if let Some(act) = self.tests.act_composite {
            if !(1..=36).contains(&act) {
                problems.push(format!("ACT composite {act} must be between 1 and 36"));
            }
        }
        for course in &self.courses {
            if course.name.trim().is_empty() {
                problems.push("course name cannot be empty".to_string());
            }
            if let Some(score) = course.score {
                let max = course.program.max_score();
                if score == 0 || score > max {
                    problems.push(format!(
                        "{} {} score {score} must be between 1 and {max}",
                        course.program.label(),
                        course.name
                    ));
                }
            }
        }
        if self.activities.iter().any(|a| a.name.trim().is_empty()) {
            problems.push("activity name cannot be empty".to_string());
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(AppError::Validation(problems.join("; ")))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unweighted_gpa_preferred() {
        let gpa = GpaRecord {
            unweighted: Some(3.7),
            weighted: Some(4.4),
            scale: Some(5.0),
        };
        assert_eq!(gpa.normalized(), Some(3.7));
    }

    #[test]
    fn test_weighted_gpa_rescaled() {
        let gpa = GpaRecord {
            unweighted: None,
            weighted: Some(4.5),
            scale: Some(5.0),
        };
        let normalized = gpa.normalized().unwrap();
        assert!((normalized - 3.6).abs() < 1e-9, "got {normalized}");
    }

    #[test]
    fn test_sat_from_sections() {
        let tests = TestScores {
            sat_math: Some(760),
            sat_ebrw: Some(720),
            ..Default::default()
        };
        assert_eq!(tests.sat(), Some(1480));
    }

    #[test]
    fn test_sat_equivalent_takes_best() {
        let tests = TestScores {
            sat_total: Some(1300),
            act_composite: Some(33),
            ..Default::default()
        };
        assert_eq!(tests.sat_equivalent(), Some(1460));
    }

    #[test]
    fn test_act_concordance_edges() {
        assert_eq!(act_to_sat(36), 1590);
        assert_eq!(act_to_sat(9), 590);
        assert!(act_to_sat(1) >= 400);
    }

    #[test]
    fn test_validation_collects_problems() {
        let profile = StudentProfile {
            gpa: GpaRecord {
                unweighted: Some(4.3),
                ..Default::default()
            },
            tests: TestScores {
                act_composite: Some(40),
                ..Default::default()
            },
            courses: vec![AdvancedCourse {
                name: "Calculus BC".to_string(),
                program: CourseProgram::Ap,
                score: Some(6),
            }],
            ..Default::default()
        };
        let err = profile.validate().unwrap_err().to_string();
        assert!(err.contains("unweighted GPA"));
        assert!(err.contains("ACT composite"));
        assert!(err.contains("Calculus BC"));
    }

    #[test]
    fn test_ib_seven_is_valid() {
        let profile = StudentProfile {
            courses: vec![AdvancedCourse {
                name: "HL Physics".to_string(),
                program: CourseProgram::Ib,
                score: Some(7),
            }],
            ..Default::default()
        };
        assert!(profile.validate().is_ok());
    }
}
