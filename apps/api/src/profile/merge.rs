//! Combining profile updates with the stored profile.

use serde_json::Value;

use crate::errors::AppError;
use crate::profile::conflicts::same_name;
use crate::profile::models::StudentProfile;

/// Applies an RFC 7396 JSON merge patch to `profile` and decodes the result.
pub fn apply_merge_patch(profile: &StudentProfile, patch: &Value) -> Result<StudentProfile, AppError> {
    if !patch.is_object() {
        return Err(AppError::Validation(
            "profile patch must be a JSON object".to_string(),
        ));
    }
    let mut target = serde_json::to_value(profile).map_err(anyhow::Error::from)?;
    merge_patch(&mut target, patch);
    serde_json::from_value(target)
        .map_err(|e| AppError::Validation(format!("patched profile is invalid: {e}")))
}

fn merge_patch(target: &mut Value, patch: &Value) {
    let Value::Object(patch_map) = patch else {
        *target = patch.clone();
        return;
    };
    if !target.is_object() {
        *target = Value::Object(serde_json::Map::new());
    }
    if let Value::Object(target_map) = target {
        for (key, value) in patch_map {
            if value.is_null() {
                target_map.remove(key);
            } else {
                merge_patch(target_map.entry(key.clone()).or_insert(Value::Null), value);
            }
        }
    }
}

/// Folds a document extraction into the stored profile.
///
/// Scalars present in the extraction win. Courses and activities are matched
/// by name (courses also by program) and updated in place; unmatched ones are
/// appended. Awards are appended when their title is new.
pub fn merge_extraction(existing: &StudentProfile, extracted: &StudentProfile) -> StudentProfile {
    let mut merged = existing.clone();

    merged.name = extracted.name.clone().or(merged.name);
    merged.high_school = extracted.high_school.clone().or(merged.high_school);
    merged.state = extracted.state.clone().or(merged.state);
    merged.graduation_year = extracted.graduation_year.or(merged.graduation_year);
    merged.intended_major = extracted.intended_major.clone().or(merged.intended_major);

    merged.gpa.unweighted = extracted.gpa.unweighted.or(merged.gpa.unweighted);
    merged.gpa.weighted = extracted.gpa.weighted.or(merged.gpa.weighted);
    merged.gpa.scale = extracted.gpa.scale.or(merged.gpa.scale);

    merged.tests.sat_total = extracted.tests.sat_total.or(merged.tests.sat_total);
    merged.tests.sat_math = extracted.tests.sat_math.or(merged.tests.sat_math);
    merged.tests.sat_ebrw = extracted.tests.sat_ebrw.or(merged.tests.sat_ebrw);
    merged.tests.act_composite = extracted.tests.act_composite.or(merged.tests.act_composite);

    for course in &extracted.courses {
        match merged
            .courses
            .iter_mut()
            .find(|c| c.program == course.program && same_name(&c.name, &course.name))
        {
            Some(stored) => stored.score = course.score.or(stored.score),
            None => merged.courses.push(course.clone()),
        }
    }

    for activity in &extracted.activities {
        match merged
            .activities
            .iter_mut()
            .find(|a| same_name(&a.name, &activity.name))
        {
            Some(stored) => {
                stored.role = activity.role.clone().or(stored.role.take());
                stored.is_leadership |= activity.is_leadership;
                stored.years = activity.years.or(stored.years);
                stored.description = activity.description.clone().or(stored.description.take());
            }
            None => merged.activities.push(activity.clone()),
        }
    }

    for award in &extracted.awards {
        if !merged.awards.iter().any(|a| same_name(&a.title, &award.title)) {
            merged.awards.push(award.clone());
        }
    }

    merged
}
