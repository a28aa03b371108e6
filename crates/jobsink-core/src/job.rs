//! Canonical job record types shared across the pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const MAX_EXTERNAL_ID_LEN: usize = 200;
pub const MAX_URL_LEN: usize = 500;
pub const MAX_TITLE_LEN: usize = 200;
pub const MAX_COMPANY_LEN: usize = 200;
pub const MAX_CATEGORY_LEN: usize = 100;
pub const MAX_LOCATION_LEN: usize = 200;
pub const MAX_DESCRIPTION_LEN: usize = 5000;

/// Employment type of a posting.
///
/// Stored as its canonical display string (`as_str`). Fuzzy matching of raw
/// feed values lives in the normalizer; [`JobType::from_canonical`] only
/// accepts the exact stored form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobType {
    #[serde(rename = "Full-time")]
    FullTime,
    #[serde(rename = "Part-time")]
    PartTime,
    Contract,
    Freelance,
    Remote,
    Other,
}

impl JobType {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            JobType::FullTime => "Full-time",
            JobType::PartTime => "Part-time",
            JobType::Contract => "Contract",
            JobType::Freelance => "Freelance",
            JobType::Remote => "Remote",
            JobType::Other => "Other",
        }
    }

    /// Parse the exact canonical form back into the enum.
    ///
    /// Unrecognized input maps to [`JobType::Other`]; the database only ever
    /// holds canonical strings, so this is a read-path convenience.
    #[must_use]
    pub fn from_canonical(s: &str) -> Self {
        match s {
            "Full-time" => JobType::FullTime,
            "Part-time" => JobType::PartTime,
            "Contract" => JobType::Contract,
            "Freelance" => JobType::Freelance,
            "Remote" => JobType::Remote,
            _ => JobType::Other,
        }
    }
}

impl std::fmt::Display for JobType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A normalized job posting, not yet persisted.
///
/// Produced by the normalizer from a raw feed item; consumed by the queue and
/// the processor. Serializes with camelCase keys — this is the wire shape of
/// the `jobCandidate` field in a queue message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobCandidate {
    pub external_id: String,
    pub url: String,
    pub title: String,
    pub company: String,
    pub category: String,
    #[serde(rename = "type")]
    pub job_type: JobType,
    pub location: String,
    pub description: String,
    pub posted_at: DateTime<Utc>,
}

/// A job record as persisted by the store.
#[derive(Debug, Clone)]
pub struct StoredJob {
    pub id: i64,
    pub external_id: String,
    pub url: String,
    pub title: String,
    pub company: String,
    pub category: String,
    pub job_type: JobType,
    pub location: String,
    pub description: String,
    pub posted_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn job_type_round_trips_through_canonical_form() {
        for ty in [
            JobType::FullTime,
            JobType::PartTime,
            JobType::Contract,
            JobType::Freelance,
            JobType::Remote,
            JobType::Other,
        ] {
            assert_eq!(JobType::from_canonical(ty.as_str()), ty);
        }
    }

    #[test]
    fn job_type_from_canonical_defaults_to_other() {
        assert_eq!(JobType::from_canonical("full time"), JobType::Other);
        assert_eq!(JobType::from_canonical(""), JobType::Other);
    }

    #[test]
    fn job_candidate_serializes_with_camel_case_keys() {
        let candidate = JobCandidate {
            external_id: "acme-1".to_string(),
            url: "https://jobs.acme.test/1".to_string(),
            title: "Engineer".to_string(),
            company: "Acme".to_string(),
            category: "General".to_string(),
            job_type: JobType::FullTime,
            location: "Remote".to_string(),
            description: String::new(),
            posted_at: Utc::now(),
        };

        let json = serde_json::to_string(&candidate).expect("serialize candidate");
        assert!(json.contains("\"externalId\":\"acme-1\""));
        assert!(json.contains("\"type\":\"Full-time\""));
        assert!(json.contains("\"postedAt\""));
    }
}
