// Flattens a list record plus its detail record into one CSV-ready row.

use crate::models::{DetailRecord, ListRecord, MergedRow};
use serde_json::{Map, Number, Value};

/// Language codes that mark an object as a multi-language value. Each one
/// becomes a `<field>_<lang>` column.
pub const LANGUAGES: [&str; 2] = ["zh_TW", "en"];

/// List fields that may carry a multi-language value.
pub const LIST_LANGUAGE_FIELDS: [&str; 7] = [
    "custName",
    "institutionName",
    "companyAddr",
    "note",
    "otherPlaceName",
    "otherPlaceAddr",
    "otherPlaceRange",
];

/// Plain list fields copied as-is, flagged `true` when only the date part is kept.
pub const LIST_SCALAR_FIELDS: [(&str, bool); 6] = [
    ("verifyAccredit", false),
    ("initialAccreditDate", true),
    ("accreditValidDate", true),
    ("tel", false),
    ("certificateNo", false),
    ("uuid", false),
];

/// Length of a `YYYY-MM-DD` prefix.
const DATE_PREFIX_CHARS: usize = 10;

/// Shape of a raw JSON field, as far as flattening cares.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldValue<'a> {
    Scalar(Scalar<'a>),
    MultiLanguage(&'a Map<String, Value>),
    /// Arrays and objects without a recognised language key.
    Unsupported,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Scalar<'a> {
    Text(&'a str),
    Number(&'a Number),
    Bool(bool),
    Null,
}

impl Scalar<'_> {
    pub fn to_text(self) -> String {
        match self {
            Scalar::Text(s) => s.to_string(),
            Scalar::Number(n) => n.to_string(),
            Scalar::Bool(b) => b.to_string(),
            Scalar::Null => String::new(),
        }
    }
}

impl<'a> FieldValue<'a> {
    /// An absent field classifies the same as JSON `null`.
    pub fn classify(value: Option<&'a Value>) -> Self {
        match value {
            None | Some(Value::Null) => FieldValue::Scalar(Scalar::Null),
            Some(Value::String(s)) => FieldValue::Scalar(Scalar::Text(s)),
            Some(Value::Number(n)) => FieldValue::Scalar(Scalar::Number(n)),
            Some(Value::Bool(b)) => FieldValue::Scalar(Scalar::Bool(*b)),
            Some(Value::Object(map)) if LANGUAGES.iter().any(|lang| map.contains_key(*lang)) => {
                FieldValue::MultiLanguage(map)
            }
            Some(Value::Object(_)) | Some(Value::Array(_)) => FieldValue::Unsupported,
        }
    }
}

/// Keeps the first ten characters, i.e. the calendar date of an ISO timestamp.
pub fn truncate_date(value: &str) -> String {
    value.chars().take(DATE_PREFIX_CHARS).collect()
}

fn is_date_key(key: &str) -> bool {
    key.to_ascii_lowercase().contains("date")
}

// Writes `<key>_<lang>` for every known language, empty when a language is missing
fn insert_languages(row: &mut MergedRow, key: &str, values: &Map<String, Value>) {
    for lang in LANGUAGES {
        let text = match FieldValue::classify(values.get(lang)) {
            FieldValue::Scalar(scalar) => scalar.to_text(),
            FieldValue::MultiLanguage(_) | FieldValue::Unsupported => String::new(),
        };
        row.insert(format!("{}_{}", key, lang), text);
    }
}

/// Combines a list record and its detail record. Detail fields are written last
/// and overwrite list fields that flatten to the same column.
pub fn merge_record(list: &ListRecord, detail: &DetailRecord) -> MergedRow {
    let mut row = MergedRow::new();

    for key in LIST_LANGUAGE_FIELDS {
        match FieldValue::classify(list.get(key)) {
            FieldValue::MultiLanguage(values) => insert_languages(&mut row, key, values),
            FieldValue::Scalar(scalar) => row.insert(key, scalar.to_text()),
            // Fixed list columns always exist, even when the value can't be flattened
            FieldValue::Unsupported => row.insert(key, ""),
        }
    }

    for (key, is_date) in LIST_SCALAR_FIELDS {
        let text = match FieldValue::classify(list.get(key)) {
            FieldValue::Scalar(scalar) => scalar.to_text(),
            FieldValue::MultiLanguage(_) | FieldValue::Unsupported => String::new(),
        };
        row.insert(key, if is_date { truncate_date(&text) } else { text });
    }

    for (key, value) in detail.iter() {
        match FieldValue::classify(Some(value)) {
            FieldValue::MultiLanguage(values) => insert_languages(&mut row, key, values),
            FieldValue::Scalar(Scalar::Text(text)) if is_date_key(key) => {
                row.insert(key.as_str(), truncate_date(text))
            }
            FieldValue::Scalar(scalar) => row.insert(key.as_str(), scalar.to_text()),
            FieldValue::Unsupported => {
                // Nested records and lists have no flat form yet; the field is dropped.
                tracing::debug!(field = %key, "Skipping nested detail field");
            }
        }
    }

    row
}
