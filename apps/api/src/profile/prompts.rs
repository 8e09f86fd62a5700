// Profile extraction prompt templates.

pub const PROFILE_EXTRACT_SYSTEM: &str = "\
You extract academic records for a college admissions counselor. \
Read transcripts, score reports, resumes and activity lists and return structured JSON. \
You MUST respond with valid JSON only, without markdown fences or explanations. \
Mark an activity as leadership only when the document names a leadership role \
(president, captain, founder, editor, chair, lead, head).";

pub const PROFILE_EXTRACT_PROMPT: &str = r#"Extract the student's academic profile from the document below.

DOCUMENT:
{document_text}

OUTPUT SCHEMA (return exactly this structure, null for anything not stated):
{
  "name": "string" | null,
  "high_school": "string" | null,
  "state": "two-letter US state code" | null,
  "graduation_year": number | null,
  "gpa": { "unweighted": number | null, "weighted": number | null, "scale": number | null },
  "tests": { "sat_total": number | null, "sat_math": number | null, "sat_ebrw": number | null, "act_composite": number | null },
  "courses": [ { "name": "string", "program": "ap" | "ib", "score": number | null } ],
  "activities": [ { "name": "string", "role": "string" | null, "is_leadership": boolean, "years": number | null, "description": "string" | null } ],
  "awards": [ { "title": "string", "level": "school" | "regional" | "state" | "national" | "international" | null } ],
  "intended_major": "string" | null
}

{no_invention}"#;
