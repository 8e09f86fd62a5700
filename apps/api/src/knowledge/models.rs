use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::AppError;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum InstitutionType {
    Public,
    Private,
}

impl InstitutionType {
    pub fn as_str(self) -> &'static str {
        match self {
            InstitutionType::Public => "public",
            InstitutionType::Private => "private",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EarlyProgram {
    EarlyAction,
    RestrictiveEarlyAction,
    EarlyDecision,
    EarlyDecisionIi,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TestPolicy {
    Required,
    #[default]
    Optional,
    Blind,
}

/// Admitted-student GPA distribution on an unweighted 4.0 scale.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct GpaBand {
    pub p25: Option<f64>,
    pub p50: Option<f64>,
    pub p75: Option<f64>,
    pub average: Option<f64>,
}

/// Middle-50% range for a standardized test.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct ScoreBand {
    pub p25: Option<u16>,
    pub p75: Option<u16>,
}

impl ScoreBand {
    pub fn range(&self) -> Option<(u16, u16)> {
        match (self.p25, self.p75) {
            (Some(lo), Some(hi)) if lo <= hi => Some((lo, hi)),
            _ => None,
        }
    }
}

/// Knowledge-base entry for one university. Read-only from the scorer's point of view.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UniversityProfile {
    pub university_id: String,
    pub name: String,
    pub state: Option<String>,
    pub city: Option<String>,
    pub institution_type: InstitutionType,
    /// Overall admit rate, percent.
    pub acceptance_rate: Option<f64>,
    /// Admit rate of the early round, percent.
    pub early_acceptance_rate: Option<f64>,
    #[serde(default)]
    pub early_programs: Vec<EarlyProgram>,
    #[serde(default)]
    pub gpa: GpaBand,
    #[serde(default)]
    pub test_policy: TestPolicy,
    #[serde(default)]
    pub sat: ScoreBand,
    #[serde(default)]
    pub act: ScoreBand,
    #[serde(default)]
    pub majors: Vec<String>,
    #[serde(default)]
    pub impacted_majors: Vec<String>,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub application_strategy: String,
    /// Set by the store; ignored on input.
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

fn check_percent(problems: &mut Vec<String>, label: &str, value: Option<f64>) {
    if let Some(v) = value {
        if !(0.0..=100.0).contains(&v) {
            problems.push(format!("{label} {v} must be a percentage between 0 and 100"));
        }
    }
}

/// Slugs are lowercase ASCII letters, digits and underscores.
pub fn is_valid_university_id(id: &str) -> bool {
    !id.is_empty()
        && id.len() <= 128
        && id
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
}

impl UniversityProfile {
    pub fn validate(&self) -> Result<(), AppError> {
        let mut problems = Vec::new();

        if !is_valid_university_id(&self.university_id) {
            problems.push(format!(
                "university_id '{}' must be a lowercase slug (a-z, 0-9, _)",
                self.university_id
            ));
        }
        if self.name.trim().is_empty() {
            problems.push("name cannot be empty".to_string());
        }
        check_percent(&mut problems, "acceptance_rate", self.acceptance_rate);
        check_percent(&mut problems, "early_acceptance_rate", self.early_acceptance_rate);

        let gpa_values = [self.gpa.p25, self.gpa.p50, self.gpa.p75, self.gpa.average];
        if gpa_values.iter().flatten().any(|g| !(0.0..=4.0).contains(g)) {
            problems.push("GPA band values must be between 0.0 and 4.0".to_string());
        }
        let ordered: Vec<f64> = [self.gpa.p25, self.gpa.p50, self.gpa.p75]
            .into_iter()
            .flatten()
            .collect();
        if ordered.windows(2).any(|w| w[0] > w[1]) {
            problems.push("GPA percentiles must be non-decreasing".to_string());
        }

        for (label, band, lo, hi) in [("SAT", self.sat, 400, 1600), ("ACT", self.act, 1, 36)] {
            for value in [band.p25, band.p75].into_iter().flatten() {
                if !(lo..=hi).contains(&value) {
                    problems.push(format!("{label} band value {value} must be between {lo} and {hi}"));
                }
            }
            if let (Some(p25), Some(p75)) = (band.p25, band.p75) {
                if p25 > p75 {
                    problems.push(format!("{label} 25th percentile exceeds the 75th"));
                }
            }
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(AppError::Validation(problems.join("; ")))
        }
    }

    /// Text indexed for keyword and semantic search.
    pub fn search_text(&self) -> String {
        let mut parts = vec![self.name.clone()];
        parts.extend(self.city.clone());
        parts.extend(self.state.clone());
        parts.push(self.institution_type.as_str().to_string());
        parts.push(self.summary.clone());
        parts.push(self.majors.join(", "));
        parts.push(self.application_strategy.clone());
        parts.retain(|p| !p.trim().is_empty());
        parts.join("\n")
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    pub fn stanford() -> UniversityProfile {
        UniversityProfile {
            university_id: "stanford_university".to_string(),
            name: "Stanford University".to_string(),
            state: Some("CA".to_string()),
            city: Some("Stanford".to_string()),
            institution_type: InstitutionType::Private,
            acceptance_rate: Some(3.9),
            early_acceptance_rate: Some(8.9),
            early_programs: vec![EarlyProgram::RestrictiveEarlyAction],
            gpa: GpaBand {
                p25: Some(3.89),
                p50: Some(3.96),
                p75: Some(4.0),
                average: Some(3.96),
            },
            test_policy: TestPolicy::Required,
            sat: ScoreBand {
                p25: Some(1500),
                p75: Some(1570),
            },
            act: ScoreBand {
                p25: Some(34),
                p75: Some(35),
            },
            majors: vec![
                "Computer Science".to_string(),
                "Economics".to_string(),
                "Human Biology".to_string(),
            ],
            impacted_majors: vec![],
            summary: "Private research university in Silicon Valley known for engineering and entrepreneurship.".to_string(),
            application_strategy: "Restrictive early action; essays weigh intellectual vitality.".to_string(),
            updated_at: None,
        }
    }

    pub fn state_flagship() -> UniversityProfile {
        UniversityProfile {
            university_id: "university_of_arizona".to_string(),
            name: "University of Arizona".to_string(),
            state: Some("AZ".to_string()),
            city: Some("Tucson".to_string()),
            institution_type: InstitutionType::Public,
            acceptance_rate: Some(86.0),
            early_acceptance_rate: None,
            early_programs: vec![],
            gpa: GpaBand {
                p25: Some(3.2),
                p50: Some(3.5),
                p75: Some(3.8),
                average: None,
            },
            test_policy: TestPolicy::Optional,
            sat: ScoreBand {
                p25: Some(1120),
                p75: Some(1350),
            },
            act: ScoreBand::default(),
            majors: vec![
                "Computer Science".to_string(),
                "Nursing".to_string(),
                "Astronomy".to_string(),
            ],
            impacted_majors: vec!["Nursing".to_string()],
            summary: "Large public research university in the desert southwest with strong astronomy and optical sciences.".to_string(),
            application_strategy: "Rolling admission; apply by November for priority merit aid.".to_string(),
            updated_at: None,
        }
    }
}
