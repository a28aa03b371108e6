//! XML → generic value tree.
//!
//! Feeds arrive in several structural dialects, so instead of binding to a
//! fixed schema the document is parsed into a `serde_json::Value` tree:
//! elements become objects keyed by child name, repeated child names are
//! promoted to arrays, and text-only elements become strings. The extractor
//! and normalizer then work against this generic key-value view.

use quick_xml::events::Event;
use quick_xml::Reader;
use serde_json::{Map, Value};

use crate::error::FeedError;

/// Parse an XML document into a value tree rooted at the document element.
///
/// `<rss><channel>..</channel></rss>` yields `{"rss": {"channel": ..}}`.
/// Attributes are ignored; for elements like `<guid isPermaLink="true">` the
/// text content is what identifies the item. Namespace prefixes are stripped
/// (`atom:entry` → `entry`).
///
/// # Errors
///
/// Returns [`FeedError::Xml`] if the document is not well-formed.
pub fn parse_document(xml: &str) -> Result<Value, FeedError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    // (element name, accumulated children, accumulated text)
    let mut stack: Vec<(String, Map<String, Value>, String)> = Vec::new();
    let mut root = Value::Null;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                let name = local_name(e.name().as_ref());
                stack.push((name, Map::new(), String::new()));
            }
            Ok(Event::Empty(e)) => {
                let name = local_name(e.name().as_ref());
                if let Some((_, children, _)) = stack.last_mut() {
                    insert_child(children, name, Value::String(String::new()));
                }
            }
            Ok(Event::Text(e)) => {
                if let Some((_, _, text)) = stack.last_mut() {
                    let chunk = e.unescape().unwrap_or_default();
                    if !text.is_empty() && !chunk.is_empty() {
                        text.push(' ');
                    }
                    text.push_str(&chunk);
                }
            }
            Ok(Event::CData(e)) => {
                if let Some((_, _, text)) = stack.last_mut() {
                    let chunk = String::from_utf8_lossy(e.as_ref());
                    if !text.is_empty() && !chunk.is_empty() {
                        text.push(' ');
                    }
                    text.push_str(&chunk);
                }
            }
            Ok(Event::End(_)) => {
                let Some((name, children, text)) = stack.pop() else {
                    continue;
                };
                let value = if children.is_empty() {
                    Value::String(text)
                } else {
                    // Mixed content: element text alongside child elements is
                    // not meaningful in any feed dialect we accept.
                    Value::Object(children)
                };
                if let Some((_, parent, _)) = stack.last_mut() {
                    insert_child(parent, name, value);
                } else {
                    let mut doc = Map::new();
                    doc.insert(name, value);
                    root = Value::Object(doc);
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(FeedError::Xml(e)),
            _ => {}
        }
    }

    Ok(root)
}

/// Insert a child value, promoting repeated names to an array.
fn insert_child(map: &mut Map<String, Value>, name: String, value: Value) {
    match map.get_mut(&name) {
        Some(Value::Array(items)) => items.push(value),
        Some(existing) => {
            let prev = existing.take();
            *existing = Value::Array(vec![prev, value]);
        }
        None => {
            map.insert(name, value);
        }
    }
}

fn local_name(raw: &[u8]) -> String {
    let name = std::str::from_utf8(raw).unwrap_or("");
    name.rsplit(':').next().unwrap_or(name).to_string()
}
