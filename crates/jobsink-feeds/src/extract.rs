//! Shape-tolerant item extraction.
//!
//! Feeds structurally satisfy more than one known dialect at once, so the
//! probe order below is part of the contract: the first matching shape wins
//! and lower-priority shapes are never consulted.

use serde_json::Value;

/// A raw feed item: the generic value-tree node for one posting, before any
/// field normalization.
pub type RawItem = Value;

/// Locate the repeating item structure in a parsed feed document.
///
/// Recognized shapes, in priority order:
/// 1. RSS `rss.channel.item` (or bare `channel.item`), singular or array
/// 2. Atom `feed.entry`
/// 3. generic `jobs.job` wrapper
/// 4. bare top-level `job` field
/// 5. the document itself is an array
///
/// An unrecognized shape is "zero jobs found", never an error.
#[must_use]
pub fn extract(document: &Value, source_url: &str) -> Vec<RawItem> {
    let probes: [(&str, Option<&Value>); 4] = [
        (
            "rss.channel.item",
            lookup(document, &["rss", "channel", "item"])
                .or_else(|| lookup(document, &["channel", "item"])),
        ),
        ("feed.entry", lookup(document, &["feed", "entry"])),
        ("jobs.job", lookup(document, &["jobs", "job"])),
        ("job", lookup(document, &["job"])),
    ];

    for (shape, node) in probes {
        if let Some(node) = node {
            let items = as_items(node);
            tracing::debug!(source_url, shape, count = items.len(), "feed shape matched");
            return items;
        }
    }

    if let Value::Array(items) = document {
        tracing::debug!(
            source_url,
            shape = "top-level array",
            count = items.len(),
            "feed shape matched"
        );
        return items.clone();
    }

    tracing::debug!(source_url, "no recognized feed shape; zero items");
    Vec::new()
}

fn lookup<'a>(document: &'a Value, path: &[&str]) -> Option<&'a Value> {
    let mut node = document;
    for key in path {
        node = node.as_object()?.get(*key)?;
    }
    Some(node)
}

/// A repeating element is singular when the feed has exactly one entry.
fn as_items(node: &Value) -> Vec<RawItem> {
    match node {
        Value::Array(items) => items.clone(),
        other => vec![other.clone()],
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    const SOURCE: &str = "https://feeds.example.test/jobs.xml";

    #[test]
    fn extracts_rss_channel_items() {
        let doc = json!({"rss": {"channel": {"item": [{"title": "A"}, {"title": "B"}]}}});
        let items = extract(&doc, SOURCE);
        assert_eq!(items.len(), 2);
    }

    #[test]
    fn singular_rss_item_yields_one_record() {
        let doc = json!({"rss": {"channel": {"item": {"title": "Only"}}}});
        let items = extract(&doc, SOURCE);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0]["title"], "Only");
    }

    #[test]
    fn bare_channel_counts_as_rss() {
        let doc = json!({"channel": {"item": [{"title": "A"}]}});
        assert_eq!(extract(&doc, SOURCE).len(), 1);
    }

    #[test]
    fn extracts_atom_entries() {
        let doc = json!({"feed": {"entry": [{"title": "A"}, {"title": "B"}, {"title": "C"}]}});
        assert_eq!(extract(&doc, SOURCE).len(), 3);
    }

    #[test]
    fn extracts_jobs_job_wrapper() {
        let doc = json!({"jobs": {"job": [{"title": "A"}]}});
        assert_eq!(extract(&doc, SOURCE).len(), 1);
    }

    #[test]
    fn extracts_bare_job_field() {
        let doc = json!({"job": {"title": "A"}});
        assert_eq!(extract(&doc, SOURCE).len(), 1);
    }

    #[test]
    fn extracts_top_level_array() {
        let doc = json!([{"title": "A"}, {"title": "B"}]);
        assert_eq!(extract(&doc, SOURCE).len(), 2);
    }

    #[test]
    fn rss_wins_over_other_shapes() {
        // A document that satisfies both the RSS path and the jobs.job
        // wrapper must extract via the RSS path.
        let doc = json!({
            "rss": {"channel": {"item": [{"title": "rss-1"}, {"title": "rss-2"}]}},
            "jobs": {"job": [{"title": "wrapped"}]}
        });
        let items = extract(&doc, SOURCE);
        assert_eq!(items.len(), 2);
        assert_eq!(items[0]["title"], "rss-1");
    }

    #[test]
    fn atom_wins_over_job_wrapper() {
        let doc = json!({
            "feed": {"entry": {"title": "atom"}},
            "job": {"title": "bare"}
        });
        let items = extract(&doc, SOURCE);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0]["title"], "atom");
    }

    #[test]
    fn unrecognized_shape_returns_empty() {
        let doc = json!({"catalog": {"product": [{"name": "widget"}]}});
        assert!(extract(&doc, SOURCE).is_empty());
    }

    #[test]
    fn null_document_returns_empty() {
        assert!(extract(&Value::Null, SOURCE).is_empty());
    }
}
