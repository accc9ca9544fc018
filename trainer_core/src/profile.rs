//! User profiles: one row per user, keyed by the user id.

use crate::gateway::{self, collections, to_row, DataGateway, Query};
use crate::{Error, Profile, Result, UserId};

pub async fn load_profile<G>(gateway: &G, user: &UserId) -> Result<Option<Profile>>
where
    G: DataGateway + ?Sized,
{
    let query = Query::new().eq("id", user.as_str());
    gateway::maybe_single(gateway, collections::PROFILES, &query).await
}

/// Validate and create or replace the profile
pub async fn save_profile<G>(gateway: &G, profile: &Profile) -> Result<()>
where
    G: DataGateway + ?Sized,
{
    validate(profile)?;
    gateway
        .upsert(collections::PROFILES, to_row(profile)?)
        .await?;
    tracing::info!(user = %profile.id, "Profile saved");
    Ok(())
}

/// True when the user has not completed their profile yet
pub async fn needs_profile<G>(gateway: &G, user: &UserId) -> Result<bool>
where
    G: DataGateway + ?Sized,
{
    Ok(load_profile(gateway, user).await?.is_none())
}

fn validate(profile: &Profile) -> Result<()> {
    if profile.name.trim().is_empty() {
        return Err(Error::InvalidInput("name must not be empty".into()));
    }
    if profile.age == 0 {
        return Err(Error::InvalidInput("age must be positive".into()));
    }
    if !profile.weight.is_finite() || profile.weight <= 0.0 {
        return Err(Error::InvalidInput(format!(
            "weight must be positive, got {}",
            profile.weight
        )));
    }
    Ok(())
}
