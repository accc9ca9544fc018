//! Remote data gateway abstraction.
//!
//! The data store is reached through a small set of generic verbs over named
//! collections of JSON rows. Domain modules decode rows into typed records
//! with [`select_as`] and [`maybe_single`].

use crate::{Error, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::cmp::Ordering;

pub mod file;

pub use file::FileGateway;

/// A stored record
pub type Row = serde_json::Map<String, Value>;

/// Collection names as constants.
pub mod collections {
    pub const PROFILES: &str = "profiles";
    pub const WORKOUTS: &str = "workouts";
    pub const WORKOUT_STEPS: &str = "workout_steps";
    pub const WORKOUT_HISTORY: &str = "workout_history";
    pub const WEIGHT_TRACKING: &str = "weight_tracking";
}

/// Row predicate
#[derive(Clone, Debug, PartialEq)]
pub enum Filter {
    /// Column equals value
    Eq(String, Value),
    /// Case-insensitive pattern match, `%` matches any run of characters
    ILike(String, String),
}

impl Filter {
    pub fn eq(column: &str, value: impl Into<Value>) -> Self {
        Filter::Eq(column.to_string(), value.into())
    }

    pub fn ilike(column: &str, pattern: impl Into<String>) -> Self {
        Filter::ILike(column.to_string(), pattern.into())
    }

    pub fn matches(&self, row: &Row) -> bool {
        match self {
            Filter::Eq(column, value) => row.get(column) == Some(value),
            Filter::ILike(column, pattern) => row
                .get(column)
                .and_then(Value::as_str)
                .map(|text| like_match(pattern, text))
                .unwrap_or(false),
        }
    }
}

/// Sort key for a select
#[derive(Clone, Debug, PartialEq)]
pub struct Order {
    pub column: String,
    pub ascending: bool,
}

/// Select parameters: projection, filters, order and limit
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Query {
    pub columns: Option<Vec<String>>,
    pub filters: Vec<Filter>,
    pub order: Option<Order>,
    pub limit: Option<usize>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn columns(mut self, columns: &[&str]) -> Self {
        self.columns = Some(columns.iter().map(|c| c.to_string()).collect());
        self
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn eq(self, column: &str, value: impl Into<Value>) -> Self {
        self.filter(Filter::eq(column, value))
    }

    pub fn ilike(self, column: &str, pattern: impl Into<String>) -> Self {
        self.filter(Filter::ilike(column, pattern))
    }

    pub fn order(mut self, column: &str, ascending: bool) -> Self {
        self.order = Some(Order {
            column: column.to_string(),
            ascending,
        });
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn matches(&self, row: &Row) -> bool {
        self.filters.iter().all(|f| f.matches(row))
    }

    /// Evaluate the query against an in-memory collection
    pub fn apply<'a>(&self, rows: impl IntoIterator<Item = &'a Row>) -> Vec<Row> {
        let mut selected: Vec<&Row> = rows.into_iter().filter(|r| self.matches(r)).collect();

        if let Some(order) = &self.order {
            selected.sort_by(|a, b| {
                compare_column(a.get(&order.column), b.get(&order.column), order.ascending)
            });
        }

        let limit = self.limit.unwrap_or(usize::MAX);
        selected
            .into_iter()
            .take(limit)
            .map(|row| match &self.columns {
                Some(columns) => row
                    .iter()
                    .filter(|(k, _)| columns.iter().any(|c| c == *k))
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect(),
                None => row.clone(),
            })
            .collect()
    }
}

/// Generic verbs over named record collections
#[async_trait]
pub trait DataGateway: Send + Sync {
    async fn select(&self, collection: &str, query: &Query) -> Result<Vec<Row>>;

    /// Insert a row, returning it with any store-assigned columns filled in
    async fn insert(&self, collection: &str, row: Row) -> Result<Row>;

    /// Merge `patch` into every row matching `filters`
    async fn update(&self, collection: &str, patch: Row, filters: &[Filter]) -> Result<usize>;

    /// Create or replace by `id`
    async fn upsert(&self, collection: &str, row: Row) -> Result<Row>;

    async fn delete(&self, collection: &str, filters: &[Filter]) -> Result<usize>;
}

#[async_trait]
impl<G: DataGateway + ?Sized> DataGateway for std::sync::Arc<G> {
    async fn select(&self, collection: &str, query: &Query) -> Result<Vec<Row>> {
        (**self).select(collection, query).await
    }

    async fn insert(&self, collection: &str, row: Row) -> Result<Row> {
        (**self).insert(collection, row).await
    }

    async fn update(&self, collection: &str, patch: Row, filters: &[Filter]) -> Result<usize> {
        (**self).update(collection, patch, filters).await
    }

    async fn upsert(&self, collection: &str, row: Row) -> Result<Row> {
        (**self).upsert(collection, row).await
    }

    async fn delete(&self, collection: &str, filters: &[Filter]) -> Result<usize> {
        (**self).delete(collection, filters).await
    }
}

/// Serialize a record into a row
pub fn to_row<T: Serialize>(value: &T) -> Result<Row> {
    match serde_json::to_value(value)? {
        Value::Object(map) => Ok(map),
        other => Err(Error::Other(format!("expected an object row, got {}", other))),
    }
}

/// Decode a row into a record
pub fn from_row<T: DeserializeOwned>(collection: &str, row: Row) -> Result<T> {
    serde_json::from_value(Value::Object(row))
        .map_err(|e| Error::Gateway(format!("malformed {} row: {}", collection, e)))
}

/// Select and decode every matching row
pub async fn select_as<T, G>(gateway: &G, collection: &str, query: &Query) -> Result<Vec<T>>
where
    T: DeserializeOwned,
    G: DataGateway + ?Sized,
{
    gateway
        .select(collection, query)
        .await?
        .into_iter()
        .map(|row| from_row(collection, row))
        .collect()
}

/// Select the first matching row, if any
pub async fn maybe_single<T, G>(gateway: &G, collection: &str, query: &Query) -> Result<Option<T>>
where
    T: DeserializeOwned,
    G: DataGateway + ?Sized,
{
    let query = query.clone().limit(1);
    match gateway.select(collection, &query).await?.into_iter().next() {
        Some(row) => from_row(collection, row).map(Some),
        None => Ok(None),
    }
}

/// SQL-style ILIKE with `%` wildcards
fn like_match(pattern: &str, text: &str) -> bool {
    let pattern = pattern.to_lowercase();
    let text = text.to_lowercase();
    let parts: Vec<&str> = pattern.split('%').collect();

    if parts.len() == 1 {
        return pattern == text;
    }

    let mut rest = text.as_str();
    let last = parts.len() - 1;
    for (i, &part) in parts.iter().enumerate() {
        if part.is_empty() {
            continue;
        }
        if i == 0 {
            match rest.strip_prefix(part) {
                Some(r) => rest = r,
                None => return false,
            }
        } else if i == last {
            return rest.ends_with(part);
        } else {
            match rest.find(part) {
                Some(pos) => rest = &rest[pos + part.len()..],
                None => return false,
            }
        }
    }
    true
}

/// Order two column values. Missing and null values sort last either way.
fn compare_column(a: Option<&Value>, b: Option<&Value>, ascending: bool) -> Ordering {
    let a = a.filter(|v| !v.is_null());
    let b = b.filter(|v| !v.is_null());
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (Some(a), Some(b)) => {
            let ord = compare_values(a, b);
            if ascending {
                ord
            } else {
                ord.reverse()
            }
        }
    }
}

fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => {
            let x = x.as_f64().unwrap_or(0.0);
            let y = y.as_f64().unwrap_or(0.0);
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Value::String(x), Value::String(y)) => {
            // Timestamps with differing fractional precision don't sort lexically
            match (
                DateTime::parse_from_rfc3339(x),
                DateTime::parse_from_rfc3339(y),
            ) {
                (Ok(x), Ok(y)) => x.with_timezone(&Utc).cmp(&y.with_timezone(&Utc)),
                _ => x.cmp(y),
            }
        }
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        _ => a.to_string().cmp(&b.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(value: Value) -> Row {
        value.as_object().unwrap().clone()
    }

    #[test]
    fn test_like_match() {
        assert!(like_match("%yoga flow%", "Morning Yoga Flow"));
        assert!(like_match("%HIIT%", "hiit blast"));
        assert!(like_match("hiit%", "HIIT Blast"));
        assert!(!like_match("hiit%", "Big HIIT"));
        assert!(like_match("%blast", "HIIT Blast"));
        assert!(like_match("%full%beginner%", "Full Body Beginner"));
        assert!(!like_match("%yoga%", "Strength Training"));
        assert!(like_match("exact", "EXACT"));
    }

    #[test]
    fn test_filters_and_order() {
        let rows = vec![
            row(json!({"id": "a", "user_id": "u1", "duration_seconds": 300})),
            row(json!({"id": "b", "user_id": "u1", "duration_seconds": 120})),
            row(json!({"id": "c", "user_id": "u2", "duration_seconds": 900})),
            row(json!({"id": "d", "user_id": "u1", "duration_seconds": 600})),
        ];

        let query = Query::new()
            .eq("user_id", "u1")
            .order("duration_seconds", false);
        let ids: Vec<_> = query
            .apply(&rows)
            .iter()
            .map(|r| r["id"].as_str().unwrap().to_string())
            .collect();

        assert_eq!(ids, vec!["d", "a", "b"]);
    }

    #[test]
    fn test_nulls_sort_last() {
        let rows = vec![
            row(json!({"id": "a", "duration_seconds": null})),
            row(json!({"id": "b", "duration_seconds": 5})),
            row(json!({"id": "c"})),
            row(json!({"id": "d", "duration_seconds": 9})),
        ];

        for ascending in [true, false] {
            let out = Query::new().order("duration_seconds", ascending).apply(&rows);
            assert!(out[0]["duration_seconds"].is_number());
            assert!(out[1]["duration_seconds"].is_number());
        }
    }

    #[test]
    fn test_timestamps_order_by_instant() {
        let rows = vec![
            row(json!({"id": "fraction", "at": "2025-01-01T10:00:00.500Z"})),
            row(json!({"id": "whole", "at": "2025-01-01T10:00:00Z"})),
        ];
        // .500Z is after 00Z even though it sorts lower as a string
        let out = Query::new().order("at", true).apply(&rows);
        assert_eq!(out[0]["id"], "whole");
    }

    #[test]
    fn test_projection_and_limit() {
        let rows = vec![
            row(json!({"id": "a", "title": "One", "calories": 10})),
            row(json!({"id": "b", "title": "Two", "calories": 20})),
        ];
        let out = Query::new().columns(&["id"]).limit(1).apply(&rows);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].len(), 1);
        assert!(out[0].contains_key("id"));
    }

    #[test]
    fn test_from_row_reports_collection() {
        let err = from_row::<crate::Workout>("workouts", row(json!({"id": 1}))).unwrap_err();
        assert!(matches!(err, Error::Gateway(msg) if msg.contains("workouts")));
    }
}
