//! Body-weight measurements.

use crate::advice::{self, Advice};
use crate::gateway::{self, collections, to_row, DataGateway, Filter, Query};
use crate::{Error, Result, UserId, WeightEntry};
use serde::Serialize;
use serde_json::json;

#[derive(Serialize)]
struct NewWeight<'a> {
    user_id: &'a UserId,
    weight: f64,
}

/// The user's measurements, oldest first
pub async fn list_weights<G>(gateway: &G, user: &UserId) -> Result<Vec<WeightEntry>>
where
    G: DataGateway + ?Sized,
{
    let query = Query::new()
        .eq("user_id", user.as_str())
        .order("recorded_at", true);
    gateway::select_as(gateway, collections::WEIGHT_TRACKING, &query).await
}

/// Record a new measurement, or correct an existing one when `editing` is set.
///
/// Returns the advice for the saved weight.
pub async fn save_weight<G>(
    gateway: &G,
    user: &UserId,
    weight: f64,
    editing: Option<&str>,
) -> Result<Advice>
where
    G: DataGateway + ?Sized,
{
    let advice = advice::advise(weight).ok_or_else(|| {
        Error::InvalidInput(format!("weight must be a positive number, got {}", weight))
    })?;

    match editing {
        Some(id) => {
            let mut patch = gateway::Row::new();
            patch.insert("weight".into(), json!(weight));
            let updated = gateway
                .update(collections::WEIGHT_TRACKING, patch, &owned(user, id))
                .await?;
            if updated == 0 {
                return Err(Error::NotFound(format!("weight entry {}", id)));
            }
            tracing::info!(user = %user, id, weight, "Weight entry updated");
        }
        None => {
            let row = gateway
                .insert(
                    collections::WEIGHT_TRACKING,
                    to_row(&NewWeight { user_id: user, weight })?,
                )
                .await?;
            tracing::info!(
                user = %user,
                id = row.get("id").and_then(|v| v.as_str()).unwrap_or_default(),
                weight,
                "Weight recorded"
            );
        }
    }

    Ok(advice)
}

pub async fn delete_weight<G>(gateway: &G, user: &UserId, id: &str) -> Result<()>
where
    G: DataGateway + ?Sized,
{
    let deleted = gateway
        .delete(collections::WEIGHT_TRACKING, &owned(user, id))
        .await?;
    if deleted == 0 {
        return Err(Error::NotFound(format!("weight entry {}", id)));
    }
    tracing::info!(user = %user, id, "Weight entry deleted");
    Ok(())
}

/// Change between the two most recent measurements, rounded to 0.1 kg.
///
/// Expects entries oldest first, as returned by [`list_weights`].
pub fn weight_delta(entries: &[WeightEntry]) -> Option<f64> {
    match entries {
        [.., previous, latest] => Some(((latest.weight - previous.weight) * 10.0).round() / 10.0),
        _ => None,
    }
}

// Rows are only ever touched through the owner's id
fn owned(user: &UserId, id: &str) -> [Filter; 2] {
    [Filter::eq("id", id), Filter::eq("user_id", user.as_str())]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::advice::Intensity;
    use crate::gateway::FileGateway;
    use chrono::Utc;

    fn entry(weight: f64) -> WeightEntry {
        WeightEntry {
            id: "w".into(),
            user_id: UserId::from("u1"),
            weight,
            recorded_at: Utc::now(),
        }
    }

    #[test]
    fn test_delta_rounds_to_tenths() {
        assert_eq!(weight_delta(&[]), None);
        assert_eq!(weight_delta(&[entry(70.0)]), None);
        assert_eq!(weight_delta(&[entry(70.0), entry(71.26)]), Some(1.3));
        assert_eq!(weight_delta(&[entry(90.0), entry(72.0), entry(71.5)]), Some(-0.5));
    }

    #[tokio::test]
    async fn test_add_edit_delete() {
        let temp_dir = tempfile::tempdir().unwrap();
        let gw = FileGateway::new(temp_dir.path().join("store.json"));
        let user = UserId::from("u1");

        let advice = save_weight(&gw, &user, 82.0, None).await.unwrap();
        assert_eq!(advice.intensity, Intensity::High);
        save_weight(&gw, &user, 80.5, None).await.unwrap();

        let entries = list_weights(&gw, &user).await.unwrap();
        assert_eq!(entries.len(), 2);
        assert!(entries[0].recorded_at <= entries[1].recorded_at);

        let first = entries[0].id.clone();
        let advice = save_weight(&gw, &user, 65.0, Some(&first)).await.unwrap();
        assert_eq!(advice.intensity, Intensity::Medium);

        let entries = list_weights(&gw, &user).await.unwrap();
        assert_eq!(entries.iter().find(|e| e.id == first).unwrap().weight, 65.0);

        delete_weight(&gw, &user, &first).await.unwrap();
        assert_eq!(list_weights(&gw, &user).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_other_users_entries_are_untouched() {
        let temp_dir = tempfile::tempdir().unwrap();
        let gw = FileGateway::new(temp_dir.path().join("store.json"));
        let owner = UserId::from("owner");
        let other = UserId::from("other");

        save_weight(&gw, &owner, 70.0, None).await.unwrap();
        let id = list_weights(&gw, &owner).await.unwrap()[0].id.clone();

        let err = save_weight(&gw, &other, 50.0, Some(&id)).await.unwrap_err();
        assert!(err.is_not_found());
        let err = delete_weight(&gw, &other, &id).await.unwrap_err();
        assert!(err.is_not_found());
        assert!(list_weights(&gw, &other).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_invalid_weight_rejected() {
        let temp_dir = tempfile::tempdir().unwrap();
        let gw = FileGateway::new(temp_dir.path().join("store.json"));
        let user = UserId::from("u1");

        for bad in [0.0, -3.0, f64::NAN] {
            let err = save_weight(&gw, &user, bad, None).await.unwrap_err();
            assert!(matches!(err, Error::InvalidInput(_)));
        }
        assert!(list_weights(&gw, &user).await.unwrap().is_empty());
    }
}
