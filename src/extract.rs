use std::sync::LazyLock;

use regex::Regex;

use crate::error::GenerateError;
use crate::record::ArticleRecord;

static LABEL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(Title|Short Description|Article|Author|Date):(.*)$").unwrap()
});

/// The labels a completion is asked to emit, in prompt order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Title,
    ShortDescription,
    Article,
    Author,
    Date,
}

impl Field {
    fn from_label(label: &str) -> Option<Self> {
        match label {
            "Title" => Some(Field::Title),
            "Short Description" => Some(Field::ShortDescription),
            "Article" => Some(Field::Article),
            "Author" => Some(Field::Author),
            "Date" => Some(Field::Date),
            _ => None,
        }
    }

    /// Block fields keep collecting lines until the next label.
    fn is_block(self) -> bool {
        matches!(self, Field::Article | Field::Date)
    }

    fn slot(self) -> usize {
        self as usize
    }
}

/// Raw per-label captures. `None` means the label never appeared.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Fields {
    values: [Option<String>; 5],
}

impl Fields {
    pub fn get(&self, field: Field) -> Option<&str> {
        self.values[field.slot()].as_deref()
    }

    fn set_once(&mut self, field: Field, value: &str) {
        let slot = &mut self.values[field.slot()];
        if slot.is_none() {
            *slot = Some(value.trim().to_string());
        }
    }

    fn has(&self, field: Field) -> bool {
        self.values[field.slot()].is_some()
    }

    /// Present and non-empty after trimming.
    fn filled(&self, field: Field) -> Option<String> {
        self.get(field).filter(|v| !v.is_empty()).map(str::to_string)
    }
}

/// Split a completion into its labeled fields. Never fails.
pub fn scan_fields(text: &str) -> Fields {
    let text = text.replace("\r\n", "\n");
    let mut fields = Fields::default();
    let mut block: Option<(Field, Vec<&str>)> = None;

    for line in text.lines() {
        let label = LABEL_RE
            .captures(line)
            .and_then(|caps| Some((Field::from_label(caps.get(1)?.as_str())?, caps.get(2)?.as_str())));

        let Some((field, rest)) = label else {
            if let Some((_, lines)) = block.as_mut() {
                lines.push(line);
            }
            continue;
        };

        // Any recognized label ends the running block.
        if let Some((open, lines)) = block.take() {
            fields.set_once(open, &lines.join("\n"));
        }

        if fields.has(field) {
            continue;
        }
        if field.is_block() {
            block = Some((field, vec![rest]));
        } else {
            fields.set_once(field, rest);
        }
    }

    if let Some((open, lines)) = block {
        fields.set_once(open, &lines.join("\n"));
    }

    fields
}

/// Turn one completion into a validated record.
///
/// Only the title and the article body are required; every other field
/// falls back to empty or absent.
pub fn extract_record(text: &str) -> Result<ArticleRecord, GenerateError> {
    let fields = scan_fields(text);

    let title = fields
        .filled(Field::Title)
        .ok_or(GenerateError::MalformedResponse("title"))?;
    let body = fields
        .filled(Field::Article)
        .ok_or(GenerateError::MalformedResponse("article"))?;

    Ok(ArticleRecord {
        title,
        short_description: fields.filled(Field::ShortDescription).unwrap_or_default(),
        body,
        author: fields.filled(Field::Author),
        published_date: fields.filled(Field::Date),
    })
}
