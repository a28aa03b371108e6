//! Field normalization from raw feed items to canonical [`JobCandidate`]s.
//!
//! Every canonical field is driven by an ordered alias list evaluated against
//! the generic key-value view of the raw item, so the fallback behavior per
//! field is auditable in one place. Normalization never rejects an item:
//! absent fields get fixed defaults, overlong strings are truncated to their
//! schema bound, and unparsable dates fall back to the processing time.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde_json::Value;

use jobsink_core::{
    JobCandidate, JobType, MAX_CATEGORY_LEN, MAX_COMPANY_LEN, MAX_DESCRIPTION_LEN,
    MAX_EXTERNAL_ID_LEN, MAX_LOCATION_LEN, MAX_TITLE_LEN, MAX_URL_LEN,
};

use crate::extract::RawItem;

const ID_ALIASES: &[&str] = &["id", "guid", "jobId", "externalId"];
const TITLE_ALIASES: &[&str] = &["title", "jobTitle", "position", "rawText"];
const COMPANY_ALIASES: &[&str] = &["company", "companyName", "employer", "organization"];
const URL_ALIASES: &[&str] = &["link", "url", "applyUrl", "guid", "sourceUrl"];
const DESCRIPTION_ALIASES: &[&str] = &["description", "summary", "content", "jobDescription"];
const LOCATION_ALIASES: &[&str] = &["location", "jobLocation", "city", "region"];
const CATEGORY_ALIASES: &[&str] = &["category", "jobCategory", "industry", "sector"];
const TYPE_ALIASES: &[&str] = &["type", "jobType", "employmentType"];
const DATE_ALIASES: &[&str] = &["postedAt", "pubDate", "published", "date", "created"];

const DEFAULT_TITLE: &str = "Untitled Position";
const DEFAULT_COMPANY: &str = "Unknown Company";
const DEFAULT_LOCATION: &str = "Remote";
const DEFAULT_CATEGORY: &str = "General";

/// Normalize one raw feed item into a canonical candidate.
///
/// `source_url` is the feed the item came from; it is the final fallback for
/// the candidate's `url` and an input to identity synthesis.
#[must_use]
pub fn normalize(item: &RawItem, source_url: &str) -> JobCandidate {
    let title = first_string(item, TITLE_ALIASES).unwrap_or_else(|| DEFAULT_TITLE.to_string());
    let company =
        first_string(item, COMPANY_ALIASES).unwrap_or_else(|| DEFAULT_COMPANY.to_string());
    let url = first_string(item, URL_ALIASES).unwrap_or_else(|| source_url.to_string());

    let external_id = first_string(item, ID_ALIASES)
        .unwrap_or_else(|| synthesize_external_id(source_url, &title, &company));

    let job_type = first_string(item, TYPE_ALIASES)
        .map_or(JobType::Other, |raw| parse_job_type(&raw));

    let posted_at = first_string(item, DATE_ALIASES)
        .and_then(|raw| parse_posted_at(&raw))
        .unwrap_or_else(Utc::now);

    JobCandidate {
        external_id: truncate(external_id, MAX_EXTERNAL_ID_LEN),
        url: truncate(url, MAX_URL_LEN),
        title: truncate(title, MAX_TITLE_LEN),
        company: truncate(company, MAX_COMPANY_LEN),
        category: truncate(
            first_string(item, CATEGORY_ALIASES)
                .unwrap_or_else(|| DEFAULT_CATEGORY.to_string()),
            MAX_CATEGORY_LEN,
        ),
        job_type,
        location: truncate(
            first_string(item, LOCATION_ALIASES)
                .unwrap_or_else(|| DEFAULT_LOCATION.to_string()),
            MAX_LOCATION_LEN,
        ),
        description: truncate(
            first_string(item, DESCRIPTION_ALIASES).unwrap_or_default(),
            MAX_DESCRIPTION_LEN,
        ),
        posted_at,
    }
}

/// First non-empty string value among the aliases, in order.
fn first_string(item: &RawItem, aliases: &[&str]) -> Option<String> {
    let map = item.as_object()?;
    for alias in aliases {
        match map.get(*alias) {
            Some(Value::String(s)) => {
                let trimmed = s.trim();
                if !trimmed.is_empty() {
                    return Some(trimmed.to_string());
                }
            }
            Some(Value::Number(n)) => return Some(n.to_string()),
            _ => {}
        }
    }
    None
}

/// Deterministic identity for items without an explicit id or guid.
///
/// Lowercases `source_url + title + company` and collapses every run of
/// non-alphanumeric characters to a single `-`, so re-fetching the same item
/// from the same feed always yields the same identity.
fn synthesize_external_id(source_url: &str, title: &str, company: &str) -> String {
    let raw = format!("{source_url} {title} {company}");
    let mut slug = String::with_capacity(raw.len());
    let mut pending_separator = false;

    for ch in raw.chars() {
        if ch.is_alphanumeric() {
            if pending_separator && !slug.is_empty() {
                slug.push('-');
            }
            pending_separator = false;
            slug.extend(ch.to_lowercase());
        } else {
            pending_separator = true;
        }
    }

    slug
}

/// Case-, whitespace-, and punctuation-insensitive employment type lookup.
fn parse_job_type(raw: &str) -> JobType {
    let folded: String = raw
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .map(|c| c.to_ascii_lowercase())
        .collect();

    match folded.as_str() {
        "fulltime" | "ft" | "permanent" => JobType::FullTime,
        "parttime" | "pt" => JobType::PartTime,
        "contract" | "contractor" | "temporary" | "temp" => JobType::Contract,
        "freelance" | "freelancer" => JobType::Freelance,
        "remote" => JobType::Remote,
        _ => JobType::Other,
    }
}

/// Parse the first date-like alias value.
///
/// Accepts RFC 2822 (RSS `pubDate`), RFC 3339 (Atom `published`), and the
/// common bare date/datetime forms feeds emit. `None` means "use now".
fn parse_posted_at(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc2822(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S") {
        return Some(naive.and_utc());
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Some(date.and_hms_opt(0, 0, 0)?.and_utc());
    }
    None
}

/// Truncate to at most `max_chars` characters, never rejecting.
fn truncate(mut s: String, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => {
            s.truncate(idx);
            s
        }
        None => s,
    }
}
