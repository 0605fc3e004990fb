//! Reading and building Notion page property values.

use std::str::FromStr;

use rust_decimal::Decimal;
use serde_json::{Map, Value, json};

/// Concatenated plain text of a `title` or `rich_text` property.
#[must_use]
pub fn plain_text(props: &Map<String, Value>, name: &str) -> Option<String> {
    let prop = props.get(name)?;
    let fragments = prop
        .get("title")
        .or_else(|| prop.get("rich_text"))?
        .as_array()?;

    let text: String = fragments
        .iter()
        .filter_map(|fragment| {
            fragment
                .get("plain_text")
                .or_else(|| fragment.get("text").and_then(|t| t.get("content")))
                .and_then(Value::as_str)
        })
        .collect();
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}

/// Name of the chosen option of a `select` or `status` property.
#[must_use]
pub fn select(props: &Map<String, Value>, name: &str) -> Option<String> {
    let prop = props.get(name)?;
    prop.get("select")
        .or_else(|| prop.get("status"))
        .and_then(|s| s.get("name"))
        .and_then(Value::as_str)
        .map(ToString::to_string)
}

#[must_use]
pub fn number(props: &Map<String, Value>, name: &str) -> Option<Decimal> {
    let raw = props.get(name)?.get("number")?;
    match raw {
        Value::Number(n) => Decimal::from_str(&n.to_string()).ok(),
        _ => None,
    }
}

#[must_use]
pub fn checkbox(props: &Map<String, Value>, name: &str) -> Option<bool> {
    props.get(name)?.get("checkbox")?.as_bool()
}

#[must_use]
pub fn url(props: &Map<String, Value>, name: &str) -> Option<String> {
    props
        .get(name)?
        .get("url")?
        .as_str()
        .map(ToString::to_string)
}

/// Page ids of a `relation` property.
#[must_use]
pub fn relation(props: &Map<String, Value>, name: &str) -> Vec<String> {
    props
        .get(name)
        .and_then(|p| p.get("relation"))
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|item| item.get("id").and_then(Value::as_str))
                .map(ToString::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// URLs of a `files` property (`external.url` or hosted `file.url`).
#[must_use]
pub fn files(props: &Map<String, Value>, name: &str) -> Vec<String> {
    let Some(files) = props
        .get(name)
        .and_then(|p| p.get("files"))
        .and_then(Value::as_array)
    else {
        return Vec::new();
    };

    files
        .iter()
        .filter_map(|file| {
            file.get("external")
                .and_then(|e| e.get("url"))
                .or_else(|| file.get("file").and_then(|f| f.get("url")))
                .and_then(Value::as_str)
                .filter(|u| !u.is_empty())
                .map(ToString::to_string)
        })
        .collect()
}

#[must_use]
pub fn rich_text_value(content: &str) -> Value {
    json!({ "rich_text": [{ "text": { "content": content } }] })
}

#[must_use]
pub fn title_value(content: &str) -> Value {
    json!({ "title": [{ "text": { "content": content } }] })
}

#[must_use]
pub fn select_value(option: &str) -> Value {
    json!({ "select": { "name": option } })
}

/// A `files` property of external URLs.
#[must_use]
pub fn files_value(urls: &[String]) -> Value {
    let files: Vec<Value> = urls
        .iter()
        .map(|url| json!({ "external": { "url": url } }))
        .collect();
    json!({ "files": files })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;

    fn props() -> Map<String, Value> {
        let value = json!({
            "Product": { "relation": [{ "id": "page-1" }] },
            "Title": { "title": [{ "plain_text": "Tactical " }, { "plain_text": "Vest" }] },
            "ID": { "rich_text": [{ "plain_text": "PZ-001" }] },
            "Status": { "select": { "name": "Active" } },
            "Margin": { "number": 0.45 },
            "In Stock": { "checkbox": true },
            "Images": { "files": [
                { "type": "external", "external": { "url": "https://cdn.example.com/1.jpg" } },
                { "type": "file", "file": { "url": "https://s3.example.com/2.jpg" } }
            ] }
        });
        value.as_object().unwrap().clone()
    }

    #[test]
    fn test_reads_text_properties() {
        let props = props();
        assert_eq!(plain_text(&props, "Title").as_deref(), Some("Tactical Vest"));
        assert_eq!(plain_text(&props, "ID").as_deref(), Some("PZ-001"));
        assert_eq!(plain_text(&props, "Missing"), None);
    }

    #[test]
    fn test_reads_scalar_properties() {
        let props = props();
        assert_eq!(select(&props, "Status").as_deref(), Some("Active"));
        assert_eq!(number(&props, "Margin"), Some(dec!(0.45)));
        assert_eq!(checkbox(&props, "In Stock"), Some(true));
        assert_eq!(relation(&props, "Product"), vec!["page-1"]);
    }

    #[test]
    fn test_reads_both_file_kinds() {
        assert_eq!(
            files(&props(), "Images"),
            vec!["https://cdn.example.com/1.jpg", "https://s3.example.com/2.jpg"]
        );
    }
}
