use anyhow::{Context, Result};
use aws_sdk_s3::primitives::ByteStream;
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::profile::{ProfileSnapshotRow, StudentProfileRow};
use crate::profile::models::StudentProfile;

/// Where a profile version came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileSource {
    Manual,
    Onboarding,
    Document,
}

impl ProfileSource {
    pub fn as_str(self) -> &'static str {
        match self {
            ProfileSource::Manual => "manual",
            ProfileSource::Onboarding => "onboarding",
            ProfileSource::Document => "document",
        }
    }
}

pub struct ProfileVersion {
    pub version: i32,
    pub s3_key: String,
}

/// A stored profile decoded into its typed form.
#[derive(Debug, Clone)]
pub struct CurrentProfile {
    /// Row id; a fresh value per stored version, never reused after deletion.
    pub id: Uuid,
    pub version: i32,
    pub source: String,
    pub profile: StudentProfile,
}

impl TryFrom<StudentProfileRow> for CurrentProfile {
    type Error = anyhow::Error;

    fn try_from(row: StudentProfileRow) -> Result<Self> {
        let profile = serde_json::from_value(row.profile).with_context(|| {
            format!(
                "stored profile for {} v{} is not a valid StudentProfile",
                row.user_id, row.version
            )
        })?;
        Ok(Self {
            id: row.id,
            version: row.version,
            source: row.source,
            profile,
        })
    }
}

/// Appends a new profile version and uploads its markdown snapshot.
/// Rows are never updated in place.
pub async fn commit_profile_version(
    pool: &PgPool,
    s3: &aws_sdk_s3::Client,
    s3_bucket: &str,
    user_id: &str,
    profile: &StudentProfile,
    source: ProfileSource,
) -> Result<ProfileVersion, AppError> {
    let current_max: Option<i32> =
        sqlx::query_scalar("SELECT MAX(version) FROM student_profiles WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(pool)
            .await?;
    let new_version = current_max.unwrap_or(0) + 1;

    let profile_json = serde_json::to_value(profile).map_err(anyhow::Error::from)?;
    sqlx::query(
        "INSERT INTO student_profiles (user_id, version, profile, source) VALUES ($1, $2, $3, $4)",
    )
    .bind(user_id)
    .bind(new_version)
    .bind(&profile_json)
    .bind(source.as_str())
    .execute(pool)
    .await?;

    info!(
        "Stored profile version {new_version} for user {user_id} (source={})",
        source.as_str()
    );

    let md_content = render_profile_to_md(user_id, new_version, profile);
    let s3_key = snapshot_key(user_id, new_version);
    s3.put_object()
        .bucket(s3_bucket)
        .key(&s3_key)
        .body(ByteStream::from(md_content.into_bytes()))
        .content_type("text/markdown")
        .send()
        .await
        .map_err(|e| AppError::S3(format!("upload of {s3_key} failed: {e}")))?;

    info!("Uploaded profile snapshot to s3://{}/{}", s3_bucket, s3_key);

    sqlx::query(
        "INSERT INTO profile_snapshots (id, user_id, version, s3_key) VALUES ($1, $2, $3, $4)",
    )
    .bind(Uuid::new_v4())
    .bind(user_id)
    .bind(new_version)
    .bind(&s3_key)
    .execute(pool)
    .await?;

    Ok(ProfileVersion {
        version: new_version,
        s3_key,
    })
}

/// Latest profile version for a user, if any.
pub async fn get_current_profile(pool: &PgPool, user_id: &str) -> Result<Option<CurrentProfile>> {
    let row = sqlx::query_as::<_, StudentProfileRow>(
        "SELECT * FROM student_profiles WHERE user_id = $1 ORDER BY version DESC LIMIT 1",
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await?;
    row.map(CurrentProfile::try_from).transpose()
}

pub async fn get_profile_at_version(
    pool: &PgPool,
    user_id: &str,
    version: i32,
) -> Result<Option<CurrentProfile>> {
    let row = sqlx::query_as::<_, StudentProfileRow>(
        "SELECT * FROM student_profiles WHERE user_id = $1 AND version = $2",
    )
    .bind(user_id)
    .bind(version)
    .fetch_optional(pool)
    .await?;
    row.map(CurrentProfile::try_from).transpose()
}

pub async fn get_version_history(pool: &PgPool, user_id: &str) -> Result<Vec<ProfileSnapshotRow>> {
    Ok(sqlx::query_as::<_, ProfileSnapshotRow>(
        "SELECT * FROM profile_snapshots WHERE user_id = $1 ORDER BY version ASC",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?)
}

/// Removes every stored version, snapshot record and college-list entry for a user.
/// Returns the number of profile versions deleted. S3 snapshot objects are left in place.
pub async fn delete_profile(pool: &PgPool, user_id: &str) -> Result<u64> {
    let mut tx = pool.begin().await?;

    let deleted = sqlx::query("DELETE FROM student_profiles WHERE user_id = $1")
        .bind(user_id)
        .execute(&mut *tx)
        .await?
        .rows_affected();
    sqlx::query("DELETE FROM profile_snapshots WHERE user_id = $1")
        .bind(user_id)
        .execute(&mut *tx)
        .await?;
    sqlx::query("DELETE FROM college_list WHERE user_id = $1")
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;
    info!("Deleted {deleted} profile versions for user {user_id}");
    Ok(deleted)
}

pub fn snapshot_key(user_id: &str, version: i32) -> String {
    let safe_user: String = user_id
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || "@._-".contains(c) { c } else { '_' })
        .collect();
    format!("profiles/{safe_user}/v{version}.md")
}

/// Renders a profile as the markdown document stored in S3 and searched by the agent.
pub fn render_profile_to_md(user_id: &str, version: i32, profile: &StudentProfile) -> String {
    let mut md = format!("# Student Profile — {user_id} (v{version})\n\n");

    for section in profile_sections(profile) {
        md.push_str(&format!("## {}\n\n", section.title));
        for line in &section.lines {
            md.push_str(&format!("- {line}\n"));
        }
        md.push('\n');
    }
    md
}

/// One titled block of a rendered profile.
#[derive(Debug, Clone)]
pub struct ProfileSection {
    pub title: &'static str,
    pub lines: Vec<String>,
}

/// Flattens a profile into titled, human-readable sections. Empty sections are skipped.
pub fn profile_sections(profile: &StudentProfile) -> Vec<ProfileSection> {
    let mut sections = Vec::new();

    let mut overview = Vec::new();
    if let Some(name) = &profile.name {
        overview.push(format!("**Name:** {name}"));
    }
    if let Some(school) = &profile.high_school {
        overview.push(format!("**High school:** {school}"));
    }
    if let Some(state) = &profile.state {
        overview.push(format!("**State:** {state}"));
    }
    if let Some(year) = profile.graduation_year {
        overview.push(format!("**Graduation year:** {year}"));
    }
    if let Some(major) = &profile.intended_major {
        overview.push(format!("**Intended major:** {major}"));
    }
    push_section(&mut sections, "Overview", overview);

    let mut academics = Vec::new();
    if let Some(gpa) = profile.gpa.unweighted {
        academics.push(format!("**Unweighted GPA:** {gpa:.2}"));
    }
    if let Some(gpa) = profile.gpa.weighted {
        let scale = profile.gpa.scale.unwrap_or(5.0);
        academics.push(format!("**Weighted GPA:** {gpa:.2} / {scale:.1}"));
    }
    push_section(&mut sections, "GPA", academics);

    let mut tests = Vec::new();
    if let Some(sat) = profile.tests.sat() {
        let detail = match (profile.tests.sat_math, profile.tests.sat_ebrw) {
            (Some(m), Some(e)) => format!(" (Math {m}, EBRW {e})"),
            _ => String::new(),
        };
        tests.push(format!("**SAT:** {sat}{detail}"));
    }
    if let Some(act) = profile.tests.act_composite {
        tests.push(format!("**ACT:** {act}"));
    }
    push_section(&mut sections, "Test Scores", tests);

    let courses = profile
        .courses
        .iter()
        .map(|c| match c.score {
            Some(score) => format!("{} {} — score {score}", c.program.label(), c.name),
            None => format!("{} {} — in progress", c.program.label(), c.name),
        })
        .collect();
    push_section(&mut sections, "Advanced Coursework", courses);

    let activities = profile
        .activities
        .iter()
        .map(|a| {
            let mut line = a.name.clone();
            if let Some(role) = &a.role {
                line.push_str(&format!(" — {role}"));
            }
            if a.is_leadership {
                line.push_str(" [leadership]");
            }
            if let Some(years) = a.years {
                line.push_str(&format!(" ({years} yrs)"));
            }
            if let Some(description) = &a.description {
                line.push_str(&format!(": {description}"));
            }
            line
        })
        .collect();
    push_section(&mut sections, "Activities", activities);

    let awards = profile
        .awards
        .iter()
        .map(|a| match &a.level {
            Some(level) => format!("{} ({level})", a.title),
            None => a.title.clone(),
        })
        .collect();
    push_section(&mut sections, "Awards", awards);

    sections
}

fn push_section(sections: &mut Vec<ProfileSection>, title: &'static str, lines: Vec<String>) {
    if !lines.is_empty() {
        sections.push(ProfileSection { title, lines });
    }
}
