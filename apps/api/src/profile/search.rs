use serde::Serialize;

use crate::errors::AppError;
use crate::knowledge::text::tokenize;
use crate::profile::models::StudentProfile;
use crate::profile::versioning::profile_sections;

#[derive(Debug, Clone, Serialize)]
pub struct ProfileSearchHit {
    pub section: String,
    pub text: String,
    /// Fraction of query terms found in the line or its section title.
    pub score: f64,
}

/// Keyword lookup over the rendered profile sections.
///
/// A query naming a section ("test scores", "activities") matches every line
/// in it; otherwise lines are ranked by how many query terms they contain.
pub fn search_profile(
    profile: &StudentProfile,
    query: &str,
    limit: usize,
) -> Result<Vec<ProfileSearchHit>, AppError> {
    let terms = tokenize(query);
    if terms.is_empty() {
        return Err(AppError::Validation(
            "query must contain at least one searchable word".to_string(),
        ));
    }

    let mut hits = Vec::new();
    for section in profile_sections(profile) {
        let title_tokens = tokenize(section.title);
        for line in &section.lines {
            let line_tokens = tokenize(line);
            let matched = terms
                .iter()
                .filter(|t| line_tokens.contains(t) || title_tokens.contains(t))
                .count();
            if matched > 0 {
                hits.push(ProfileSearchHit {
                    section: section.title.to_string(),
                    text: line.replace("**", ""),
                    score: matched as f64 / terms.len() as f64,
                });
            }
        }
    }

    hits.sort_by(|a, b| b.score.total_cmp(&a.score));
    hits.truncate(limit);
    Ok(hits)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::models::{Activity, GpaRecord, TestScores};

    fn profile() -> StudentProfile {
        StudentProfile {
            gpa: GpaRecord {
                unweighted: Some(3.95),
                ..Default::default()
            },
            tests: TestScores {
                sat_total: Some(1520),
                act_composite: Some(34),
                ..Default::default()
            },
            activities: vec![
                Activity {
                    name: "Science Olympiad".to_string(),
                    role: Some("President".to_string()),
                    is_leadership: true,
                    years: Some(3),
                    description: None,
                },
                Activity {
                    name: "Varsity Soccer".to_string(),
                    role: None,
                    is_leadership: false,
                    years: Some(4),
                    description: None,
                },
            ],
            ..Default::default()
        }
    }

    #[test]
    fn test_section_title_returns_all_lines() {
        let hits = search_profile(&profile(), "test scores", 10).unwrap();
        assert_eq!(hits.len(), 2);
        assert!(hits.iter().all(|h| h.section == "Test Scores"));
        assert!(hits[0].text.contains("SAT: 1520"));
    }

    #[test]
    fn test_line_terms_rank_higher() {
        let hits = search_profile(&profile(), "olympiad activities", 10).unwrap();
        assert_eq!(hits[0].text, "Science Olympiad — President [leadership] (3 yrs)");
        assert_eq!(hits[0].score, 1.0);
    }

    #[test]
    fn test_limit_applied() {
        let hits = search_profile(&profile(), "activities", 1).unwrap();
        assert_eq!(hits.len(), 1);
    }

    #[test]
    fn test_empty_query_rejected() {
        assert!(search_profile(&profile(), "the of", 5).is_err());
    }
}
