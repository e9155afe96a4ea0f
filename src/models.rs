// Data structures shared by the pipeline stages

use indexmap::IndexMap;
use serde::Deserialize;
use serde_json::{Map, Value};

/// One item from a list page. Field names follow the remote JSON.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListRecord(Map<String, Value>);

impl ListRecord {
    pub fn new(fields: Map<String, Value>) -> Self {
        Self(fields)
    }

    /// Non-object items have no fields and therefore no identifier.
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Object(fields) => Self(fields),
            _ => Self::default(),
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// The stable identifier, if present and non-empty.
    pub fn uuid(&self) -> Option<String> {
        let id = match self.0.get("uuid")? {
            Value::String(s) => s.clone(),
            Value::Number(n) => n.to_string(),
            _ => return None,
        };
        (!id.is_empty()).then_some(id)
    }
}

/// Extra fields for one record from the detail endpoint. Schema is not fixed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DetailRecord(Map<String, Value>);

impl DetailRecord {
    pub fn new(fields: Map<String, Value>) -> Self {
        Self(fields)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }
}

/// Raw shape of a list endpoint response.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListPage {
    pub item_list: Option<Value>,
    pub page_count: Option<Value>,
    pub query_count: Option<Value>,
}

impl ListPage {
    /// Items on this page, `None` when `itemList` is missing or not an array.
    pub fn items(self) -> Option<Vec<ListRecord>> {
        match self.item_list? {
            Value::Array(items) => Some(items.into_iter().map(ListRecord::from_value).collect()),
            _ => None,
        }
    }

    /// Reported number of pages. Missing, zero or garbage means a single page.
    pub fn page_count(&self) -> u32 {
        self.page_count
            .as_ref()
            .and_then(as_count)
            .and_then(|n| u32::try_from(n).ok())
            .filter(|&n| n > 0)
            .unwrap_or(1)
    }

    pub fn query_count(&self) -> u64 {
        self.query_count.as_ref().and_then(as_count).unwrap_or(0)
    }
}

// Counts come back as numbers or numeric strings depending on the page
fn as_count(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64().or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// A flattened output row. Keys keep insertion order, which drives the CSV header.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergedRow(IndexMap<String, String>);

impl MergedRow {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets `key`, keeping its original position if it already exists.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for MergedRow {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

/// A finished export, ready to hand to a delivery mechanism.
#[derive(Debug, Clone)]
pub struct Export {
    pub filename: String,
    pub csv: String,
    pub rows: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> ListRecord {
        ListRecord::from_value(value)
    }

    #[test]
    fn uuid_requires_a_non_empty_identifier() {
        assert_eq!(record(json!({"uuid": "a1"})).uuid().as_deref(), Some("a1"));
        assert_eq!(record(json!({"uuid": 42})).uuid().as_deref(), Some("42"));
        assert_eq!(record(json!({"uuid": ""})).uuid(), None);
        assert_eq!(record(json!({"uuid": null})).uuid(), None);
        assert_eq!(record(json!({"name": "x"})).uuid(), None);
        assert_eq!(record(json!("not an object")).uuid(), None);
    }

    #[test]
    fn page_counts_accept_numbers_and_strings() {
        let page: ListPage =
            serde_json::from_value(json!({"itemList": [], "pageCount": "3", "queryCount": 120})).unwrap();
        assert_eq!(page.page_count(), 3);
        assert_eq!(page.query_count(), 120);

        let page: ListPage = serde_json::from_value(json!({"itemList": [], "pageCount": 0})).unwrap();
        assert_eq!(page.page_count(), 1);
        assert_eq!(page.query_count(), 0);
    }

    #[test]
    fn missing_item_list_is_reported() {
        let page: ListPage = serde_json::from_value(json!({"pageCount": 2})).unwrap();
        assert!(page.items().is_none());

        let page: ListPage = serde_json::from_value(json!({"itemList": {"uuid": "a"}})).unwrap();
        assert!(page.items().is_none());
    }

    #[test]
    fn merged_row_overwrites_in_place() {
        let mut row = MergedRow::new();
        row.insert("a", "1");
        row.insert("b", "2");
        row.insert("a", "3");
        assert_eq!(row.keys().collect::<Vec<_>>(), vec!["a", "b"]);
        assert_eq!(row.get("a"), Some("3"));
    }
}
