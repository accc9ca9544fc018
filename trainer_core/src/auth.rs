//! Identity provider seam.
//!
//! The provider issues an [`Identity`] on sign-in or sign-up and publishes
//! identity changes on a watch channel. Consumers hold an [`IdentityWatch`]
//! instead of reading ambient global state.

use crate::{persist, Error, Identity, Result, UserId};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use tokio::sync::watch;

/// Receiver side of identity change notifications
pub type IdentityWatch = watch::Receiver<Option<Identity>>;

/// Minimum accepted password length on sign-up
pub const MIN_PASSWORD_LEN: usize = 6;

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn sign_in(&self, email: &str, password: &str) -> Result<Identity>;

    async fn sign_up(&self, email: &str, password: &str) -> Result<Identity>;

    async fn sign_out(&self) -> Result<()>;

    /// The currently signed-in identity, if any
    fn current(&self) -> Option<Identity>;

    /// Subscribe to identity changes
    fn subscribe(&self) -> IdentityWatch;
}

#[derive(Clone, Debug, Serialize, Deserialize)]
struct Account {
    user_id: UserId,
    email: String,
    password_hash: String,
}

/// Accounts keyed by normalized email
type Accounts = BTreeMap<String, Account>;

#[derive(Debug, Default, Serialize, Deserialize)]
struct SessionFile {
    identity: Option<Identity>,
}

/// Identity provider backed by local account and session files
///
/// Passwords are stored as bcrypt hashes in `accounts.json`; the active
/// identity is kept in `session.json` so a sign-in outlives the process.
pub struct LocalIdentityProvider {
    accounts_path: PathBuf,
    session_path: PathBuf,
    hash_cost: u32,
    sender: watch::Sender<Option<Identity>>,
}

impl LocalIdentityProvider {
    /// Open the provider rooted at `dir`, restoring any persisted sign-in
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        let session_path = dir.join("session.json");
        let session: SessionFile = persist::load_json(&session_path).unwrap_or_else(|e| {
            tracing::warn!(
                "Failed to read session file {:?}: {}. Treating as signed out.",
                session_path,
                e
            );
            SessionFile::default()
        });
        let (sender, _) = watch::channel(session.identity);

        Ok(Self {
            accounts_path: dir.join("accounts.json"),
            session_path,
            hash_cost: bcrypt::DEFAULT_COST,
            sender,
        })
    }

    /// Override the bcrypt cost (tests use the minimum)
    pub fn with_hash_cost(mut self, cost: u32) -> Self {
        self.hash_cost = cost;
        self
    }

    async fn set_identity(&self, identity: Option<Identity>) -> Result<()> {
        let path = self.session_path.clone();
        let session = SessionFile {
            identity: identity.clone(),
        };
        persist::blocking(move || persist::save_json(&path, &session)).await?;
        self.sender.send_replace(identity);
        Ok(())
    }
}

fn normalize_email(email: &str) -> Result<String> {
    let email = email.trim().to_lowercase();
    if email.is_empty() || !email.contains('@') {
        return Err(Error::Auth(format!("invalid email address '{}'", email)));
    }
    Ok(email)
}

#[async_trait]
impl IdentityProvider for LocalIdentityProvider {
    async fn sign_in(&self, email: &str, password: &str) -> Result<Identity> {
        let email = normalize_email(email)?;
        let accounts_path = self.accounts_path.clone();
        let password = password.to_string();

        let identity = persist::blocking(move || {
            let accounts: Accounts = persist::load_json(&accounts_path)?;
            let account = accounts
                .get(&email)
                .ok_or_else(|| Error::Auth("invalid email or password".into()))?;
            let valid = bcrypt::verify(&password, &account.password_hash)
                .map_err(|e| Error::Auth(format!("stored credential unreadable: {}", e)))?;
            if !valid {
                return Err(Error::Auth("invalid email or password".into()));
            }
            Ok(Identity {
                user_id: account.user_id.clone(),
                email: account.email.clone(),
            })
        })
        .await?;

        self.set_identity(Some(identity.clone())).await?;
        tracing::info!(user_id = %identity.user_id, "Signed in");
        Ok(identity)
    }

    async fn sign_up(&self, email: &str, password: &str) -> Result<Identity> {
        let email = normalize_email(email)?;
        if password.len() < MIN_PASSWORD_LEN {
            return Err(Error::Auth(format!(
                "password must be at least {} characters",
                MIN_PASSWORD_LEN
            )));
        }

        let accounts_path = self.accounts_path.clone();
        let password = password.to_string();
        let cost = self.hash_cost;

        let identity = persist::blocking(move || {
            let password_hash = bcrypt::hash(&password, cost)
                .map_err(|e| Error::Auth(format!("could not hash password: {}", e)))?;

            persist::update_json(&accounts_path, |accounts: &mut Accounts| {
                if accounts.contains_key(&email) {
                    return Err(Error::Auth(format!("an account for {} already exists", email)));
                }
                let account = Account {
                    user_id: UserId(uuid::Uuid::new_v4().to_string()),
                    email: email.clone(),
                    password_hash,
                };
                let identity = Identity {
                    user_id: account.user_id.clone(),
                    email: account.email.clone(),
                };
                accounts.insert(email.clone(), account);
                Ok(identity)
            })
        })
        .await?;

        self.set_identity(Some(identity.clone())).await?;
        tracing::info!(user_id = %identity.user_id, "Account created");
        Ok(identity)
    }

    async fn sign_out(&self) -> Result<()> {
        self.set_identity(None).await?;
        tracing::info!("Signed out");
        Ok(())
    }

    fn current(&self) -> Option<Identity> {
        self.sender.borrow().clone()
    }

    fn subscribe(&self) -> IdentityWatch {
        self.sender.subscribe()
    }
}
