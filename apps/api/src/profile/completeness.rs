use serde::{Deserialize, Serialize};

use crate::profile::models::StudentProfile;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum SectionStatus {
    Strong,
    Moderate,
    Weak,
    Missing,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SectionHealth {
    pub section: String,
    pub score: f64,
    pub status: SectionStatus,
    pub recommendations: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletenessReport {
    pub overall_score: f64,
    pub sections: Vec<SectionHealth>,
    pub missing_sections: Vec<String>,
}

/// Sections that feed fit scoring, weighted by how much scoring depends on them.
const SECTION_WEIGHTS: &[(&str, f64)] = &[
    ("gpa", 0.30),
    ("tests", 0.20),
    ("courses", 0.20),
    ("activities", 0.15),
    ("major", 0.10),
    ("awards", 0.05),
];

pub fn compute_completeness_report(profile: &StudentProfile) -> CompletenessReport {
    let mut sections = Vec::new();
    let mut missing_sections = Vec::new();
    let mut weighted_score_sum = 0.0;

    for (section_key, weight) in SECTION_WEIGHTS {
        let (score, recommendations) = assess_section(profile, section_key);

        let status = match score {
            s if s >= 0.8 => SectionStatus::Strong,
            s if s >= 0.5 => SectionStatus::Moderate,
            s if s > 0.0 => SectionStatus::Weak,
            _ => SectionStatus::Missing,
        };
        if status == SectionStatus::Missing {
            missing_sections.push(section_key.to_string());
        }

        weighted_score_sum += score * weight;
        sections.push(SectionHealth {
            section: section_key.to_string(),
            score,
            status,
            recommendations,
        });
    }

    let total_weight: f64 = SECTION_WEIGHTS.iter().map(|(_, w)| w).sum();
    let overall_score = if total_weight > 0.0 {
        (weighted_score_sum / total_weight).clamp(0.0, 1.0)
    } else {
        0.0
    };

    CompletenessReport {
        overall_score,
        sections,
        missing_sections,
    }
}

fn assess_section(profile: &StudentProfile, section: &str) -> (f64, Vec<String>) {
    match section {
        "gpa" => match (profile.gpa.unweighted, profile.gpa.weighted) {
            (Some(_), _) => (1.0, vec![]),
            (None, Some(_)) => (
                0.6,
                vec!["Add your unweighted GPA; weighted GPAs are only an estimate".to_string()],
            ),
            (None, None) => (0.0, vec!["Add your GPA to enable fit scoring".to_string()]),
        },
        "tests" => {
            if profile.tests.is_empty() {
                (
                    0.0,
                    vec![
                        "Add SAT or ACT scores, or note that you are applying test-optional"
                            .to_string(),
                    ],
                )
            } else {
                (1.0, vec![])
            }
        }
        "courses" => {
            let count = profile.courses.len();
            if count == 0 {
                return (
                    0.0,
                    vec!["List your AP/IB courses so course rigor can be assessed".to_string()],
                );
            }
            let unscored = profile.courses.iter().filter(|c| c.score.is_none()).count();
            let mut recommendations = Vec::new();
            if unscored > 0 {
                recommendations.push(format!(
                    "{unscored} course(s) have no exam score yet — update them when scores arrive"
                ));
            }
            let coverage = (count as f64 / 5.0).min(1.0);
            (0.4 + 0.6 * coverage, recommendations)
        }
        "activities" => {
            let count = profile.activities.len();
            if count == 0 {
                return (
                    0.0,
                    vec!["Add extracurricular activities with your role in each".to_string()],
                );
            }
            let mut recommendations = Vec::new();
            if profile.leadership_count() == 0 {
                recommendations
                    .push("Mark activities where you held a leadership role".to_string());
            }
            let missing_roles = profile.activities.iter().filter(|a| a.role.is_none()).count();
            if missing_roles > 0 {
                recommendations.push(format!("{missing_roles} activity(ies) have no role listed"));
            }
            let coverage = (count as f64 / 4.0).min(1.0);
            let leadership = if profile.leadership_count() > 0 { 0.2 } else { 0.0 };
            ((0.3 + 0.5 * coverage + leadership).min(1.0), recommendations)
        }
        "major" => match &profile.intended_major {
            Some(major) if !major.trim().is_empty() => (1.0, vec![]),
            _ => (
                0.0,
                vec!["Add an intended major (or 'Undecided') to assess major fit".to_string()],
            ),
        },
        "awards" => {
            if profile.awards.is_empty() {
                (0.0, vec!["Add honors or awards, if any".to_string()])
            } else {
                (1.0, vec![])
            }
        }
        _ => (0.0, vec![]),
    }
}
