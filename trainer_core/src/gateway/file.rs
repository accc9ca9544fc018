//! File-backed data gateway.
//!
//! Every collection lives in one JSON document managed through
//! [`crate::persist`], so concurrent CLI processes never interleave writes.

use super::{collections, DataGateway, Filter, Query, Row};
use crate::{persist, Error, Result};
use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

#[derive(Debug, Default, Serialize, Deserialize)]
struct Store {
    #[serde(default)]
    collections: BTreeMap<String, Vec<Row>>,
}

/// Gateway over a local JSON document
#[derive(Clone, Debug)]
pub struct FileGateway {
    path: PathBuf,
}

impl FileGateway {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Store) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let path = self.path.clone();
        persist::blocking(move || {
            let store: Store = persist::load_json(&path)?;
            f(&store)
        })
        .await
        .map_err(into_gateway_error)
    }

    async fn write<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Store) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let path = self.path.clone();
        persist::blocking(move || persist::update_json(&path, f))
            .await
            .map_err(into_gateway_error)
    }
}

#[async_trait]
impl DataGateway for FileGateway {
    async fn select(&self, collection: &str, query: &Query) -> Result<Vec<Row>> {
        tracing::debug!(collection, ?query, "select");
        let collection = collection.to_string();
        let query = query.clone();
        self.read(move |store| {
            Ok(query.apply(store.collections.get(&collection).into_iter().flatten()))
        })
        .await
    }

    async fn insert(&self, collection: &str, row: Row) -> Result<Row> {
        tracing::debug!(collection, "insert");
        let collection = collection.to_string();
        self.write(move |store| {
            let mut row = row;
            if !row.contains_key("id") {
                row.insert("id".into(), Value::String(uuid::Uuid::new_v4().to_string()));
            }
            if let Some(column) = timestamp_default(&collection) {
                if !row.contains_key(column) {
                    row.insert(column.into(), Value::String(now_rfc3339()));
                }
            }

            let rows = store.collections.entry(collection.clone()).or_default();
            if rows.iter().any(|r| r.get("id") == row.get("id")) {
                return Err(Error::Gateway(format!(
                    "duplicate id {} in {}",
                    row["id"], collection
                )));
            }
            rows.push(row.clone());
            Ok(row)
        })
        .await
    }

    async fn update(&self, collection: &str, patch: Row, filters: &[Filter]) -> Result<usize> {
        tracing::debug!(collection, ?filters, "update");
        let collection = collection.to_string();
        let query = filter_query(filters)?;
        self.write(move |store| {
            let mut count = 0;
            if let Some(rows) = store.collections.get_mut(&collection) {
                for row in rows.iter_mut().filter(|r| query.matches(r)) {
                    for (key, value) in &patch {
                        row.insert(key.clone(), value.clone());
                    }
                    count += 1;
                }
            }
            Ok(count)
        })
        .await
    }

    async fn upsert(&self, collection: &str, row: Row) -> Result<Row> {
        tracing::debug!(collection, "upsert");
        if !row.contains_key("id") {
            return Err(Error::Gateway(format!("upsert into {} requires an id", collection)));
        }
        let collection = collection.to_string();
        self.write(move |store| {
            let rows = store.collections.entry(collection).or_default();
            match rows.iter_mut().find(|r| r.get("id") == row.get("id")) {
                Some(existing) => *existing = row.clone(),
                None => rows.push(row.clone()),
            }
            Ok(row)
        })
        .await
    }

    async fn delete(&self, collection: &str, filters: &[Filter]) -> Result<usize> {
        tracing::debug!(collection, ?filters, "delete");
        let collection = collection.to_string();
        let query = filter_query(filters)?;
        self.write(move |store| {
            let Some(rows) = store.collections.get_mut(&collection) else {
                return Ok(0);
            };
            let before = rows.len();
            rows.retain(|r| !query.matches(r));
            Ok(before - rows.len())
        })
        .await
    }
}

/// Mutations without a filter would touch the whole collection
fn filter_query(filters: &[Filter]) -> Result<Query> {
    if filters.is_empty() {
        return Err(Error::Gateway("refusing to mutate without a filter".into()));
    }
    Ok(Query {
        filters: filters.to_vec(),
        ..Query::default()
    })
}

/// Columns the store fills in when an insert leaves them out
fn timestamp_default(collection: &str) -> Option<&'static str> {
    match collection {
        collections::WORKOUT_HISTORY => Some("completed_at"),
        collections::WEIGHT_TRACKING => Some("recorded_at"),
        collections::WORKOUTS => Some("created_at"),
        _ => None,
    }
}

fn now_rfc3339() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Local I/O and decode failures surface as gateway failures
fn into_gateway_error(err: Error) -> Error {
    match err {
        Error::Io(e) => Error::Gateway(format!("store I/O failed: {}", e)),
        Error::Json(e) => Error::Gateway(format!("store is corrupt: {}", e)),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(value: Value) -> Row {
        value.as_object().unwrap().clone()
    }

    fn gateway(dir: &tempfile::TempDir) -> FileGateway {
        FileGateway::new(dir.path().join("store.json"))
    }

    #[tokio::test]
    async fn test_insert_assigns_id_and_timestamp() {
        let temp_dir = tempfile::tempdir().unwrap();
        let gw = gateway(&temp_dir);

        let stored = gw
            .insert(
                collections::WEIGHT_TRACKING,
                row(json!({"user_id": "u1", "weight": 72.5})),
            )
            .await
            .unwrap();

        assert!(stored["id"].as_str().is_some());
        assert!(stored["recorded_at"].as_str().is_some());

        let rows = gw
            .select(collections::WEIGHT_TRACKING, &Query::new().eq("user_id", "u1"))
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["weight"], json!(72.5));
    }

    #[tokio::test]
    async fn test_rows_persist_across_instances() {
        let temp_dir = tempfile::tempdir().unwrap();
        gateway(&temp_dir)
            .insert(collections::WORKOUTS, row(json!({"id": "w1", "title": "HIIT"})))
            .await
            .unwrap();

        let rows = gateway(&temp_dir)
            .select(collections::WORKOUTS, &Query::new())
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["id"], "w1");
    }

    #[tokio::test]
    async fn test_duplicate_id_rejected() {
        let temp_dir = tempfile::tempdir().unwrap();
        let gw = gateway(&temp_dir);
        gw.insert(collections::WORKOUTS, row(json!({"id": "w1"})))
            .await
            .unwrap();

        let err = gw
            .insert(collections::WORKOUTS, row(json!({"id": "w1"})))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Gateway(_)));
    }

    #[tokio::test]
    async fn test_update_merges_matching_rows() {
        let temp_dir = tempfile::tempdir().unwrap();
        let gw = gateway(&temp_dir);
        gw.insert(
            collections::WEIGHT_TRACKING,
            row(json!({"id": "e1", "user_id": "u1", "weight": 80.0})),
        )
        .await
        .unwrap();

        let count = gw
            .update(
                collections::WEIGHT_TRACKING,
                row(json!({"weight": 78.0})),
                &[Filter::eq("id", "e1")],
            )
            .await
            .unwrap();
        assert_eq!(count, 1);

        let rows = gw
            .select(collections::WEIGHT_TRACKING, &Query::new())
            .await
            .unwrap();
        assert_eq!(rows[0]["weight"], json!(78.0));
        assert_eq!(rows[0]["user_id"], "u1");
    }

    #[tokio::test]
    async fn test_upsert_replaces_by_id() {
        let temp_dir = tempfile::tempdir().unwrap();
        let gw = gateway(&temp_dir);
        gw.upsert(collections::PROFILES, row(json!({"id": "u1", "name": "A"})))
            .await
            .unwrap();
        gw.upsert(collections::PROFILES, row(json!({"id": "u1", "name": "B"})))
            .await
            .unwrap();

        let rows = gw.select(collections::PROFILES, &Query::new()).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["name"], "B");

        let err = gw
            .upsert(collections::PROFILES, row(json!({"name": "C"})))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Gateway(_)));
    }

    #[tokio::test]
    async fn test_delete_requires_filter() {
        let temp_dir = tempfile::tempdir().unwrap();
        let gw = gateway(&temp_dir);
        for user in ["u1", "u1", "u2"] {
            gw.insert(collections::WORKOUT_HISTORY, row(json!({"user_id": user})))
                .await
                .unwrap();
        }

        assert!(gw.delete(collections::WORKOUT_HISTORY, &[]).await.is_err());

        let removed = gw
            .delete(collections::WORKOUT_HISTORY, &[Filter::eq("user_id", "u1")])
            .await
            .unwrap();
        assert_eq!(removed, 2);

        let rows = gw
            .select(collections::WORKOUT_HISTORY, &Query::new())
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
    }

    #[tokio::test]
    async fn test_corrupt_store_is_gateway_error() {
        let temp_dir = tempfile::tempdir().unwrap();
        let gw = gateway(&temp_dir);
        std::fs::write(gw.path(), "{ not json").unwrap();

        let err = gw
            .select(collections::WORKOUTS, &Query::new())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Gateway(msg) if msg.contains("corrupt")));
    }

    #[tokio::test]
    async fn test_atomic_save_leaves_no_temp_files() {
        let temp_dir = tempfile::tempdir().unwrap();
        let gw = gateway(&temp_dir);
        gw.insert(collections::WORKOUTS, row(json!({"id": "w1"})))
            .await
            .unwrap();

        let names: Vec<String> = std::fs::read_dir(temp_dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .collect();
        assert!(names.contains(&"store.json".to_string()));
        assert!(
            names.iter().all(|n| n == "store.json" || n == "store.lock"),
            "unexpected files: {:?}",
            names
        );
    }
}
