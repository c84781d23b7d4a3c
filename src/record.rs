use serde::{Deserialize, Serialize};

/// One generated article as stored in the collection file.
///
/// Key names match the collection format the page renderer already reads
/// (`shortDesc`, `article`, `date`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArticleRecord {
    pub title: String,
    #[serde(rename = "shortDesc", default)]
    pub short_description: String,
    #[serde(rename = "article")]
    pub body: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(rename = "date", default, skip_serializing_if = "Option::is_none")]
    pub published_date: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_with_collection_keys() {
        let record = ArticleRecord {
            title: "Foo".into(),
            short_description: "Bar".into(),
            body: "Baz qux.".into(),
            author: None,
            published_date: None,
        };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "title": "Foo", "shortDesc": "Bar", "article": "Baz qux." })
        );
    }

    #[test]
    fn reads_later_shape_with_author_and_date() {
        let raw = r#"{"title":"T","shortDesc":"S","article":"B","author":"Ada","date":"2025-02-01"}"#;
        let record: ArticleRecord = serde_json::from_str(raw).unwrap();
        assert_eq!(record.author.as_deref(), Some("Ada"));
        assert_eq!(record.published_date.as_deref(), Some("2025-02-01"));
    }

    #[test]
    fn missing_short_description_defaults_to_empty() {
        let record: ArticleRecord = serde_json::from_str(r#"{"title":"T","article":"B"}"#).unwrap();
        assert_eq!(record.short_description, "");
        assert!(record.author.is_none());
    }
}
