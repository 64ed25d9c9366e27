//! Registration and login flows.
//!
//! Registration: validate → hash → resolve avatar → persist. The uniqueness
//! check before hashing is advisory; [`AccountRepository::append`] is the
//! authority and its `Conflict` also ends in [`Error::UsernameTaken`].
//!
//! Login: look up → verify. An unknown username and a wrong password both end
//! in [`Error::InvalidCredentials`], and both pay for one Argon2 verification.

use chrono::Utc;
use secrecy::{ExposeSecret, SecretString};
use std::sync::Arc;
use tokio::{sync::OnceCell, task};
use tracing::{debug, error, info, instrument};
use ulid::Ulid;

use super::{
    avatar::{AvatarStore, AvatarUpload},
    error::{Error, StoreError},
    model::Account,
    password::PasswordHasher,
    repository::AccountRepository,
};

/// Registration form fields as extracted by the HTTP shell.
#[derive(Debug)]
pub struct Registration {
    pub username: String,
    pub password: SecretString,
    pub password_repeat: SecretString,
    pub email: String,
    pub full_name: String,
    pub nickname: String,
    pub phone: String,
    pub gender: String,
    pub avatar: Option<AvatarUpload>,
}

#[derive(Debug)]
pub struct Credentials {
    pub username: String,
    pub password: SecretString,
}

#[derive(Debug)]
pub struct AccountService {
    repository: Arc<AccountRepository>,
    hasher: PasswordHasher,
    avatars: AvatarStore,
    // Verified against on unknown usernames so both login failures cost the same
    dummy_digest: OnceCell<String>,
}

impl AccountService {
    #[must_use]
    pub fn new(
        repository: Arc<AccountRepository>,
        hasher: PasswordHasher,
        avatars: AvatarStore,
    ) -> Self {
        Self {
            repository,
            hasher,
            avatars,
            dummy_digest: OnceCell::new(),
        }
    }

    #[must_use]
    pub fn repository(&self) -> &AccountRepository {
        &self.repository
    }

    #[must_use]
    pub fn avatars(&self) -> &AvatarStore {
        &self.avatars
    }

    /// Derive the digest checked on unknown usernames, so the first failed
    /// login does not also pay for a hash.
    ///
    /// # Errors
    /// [`Error::Hashing`] if the digest cannot be derived.
    pub async fn warm_up(&self) -> Result<(), Error> {
        self.dummy_digest().await.map(|_| ())
    }

    /// Register a new account and return it.
    ///
    /// # Errors
    /// - [`Error::MissingUsername`] / [`Error::PasswordMismatch`] for invalid input
    /// - [`Error::UsernameTaken`] if the username exists, including when a
    ///   concurrent registration committed it first
    /// - [`Error::Storage`] / [`Error::Hashing`] on internal failures
    #[instrument(skip(self, registration), fields(username = %registration.username))]
    pub async fn register(&self, registration: Registration) -> Result<Account, Error> {
        let Registration {
            username,
            password,
            password_repeat,
            email,
            full_name,
            nickname,
            phone,
            gender,
            avatar,
        } = registration;

        if username.is_empty() {
            return Err(Error::MissingUsername);
        }

        if password.expose_secret() != password_repeat.expose_secret() {
            debug!("Passwords do not match");
            return Err(Error::PasswordMismatch);
        }
        drop(password_repeat);

        if self.repository.exists_by_username(&username).await? {
            debug!("Username already taken");
            return Err(Error::UsernameTaken);
        }

        let password_hash = self.hash(password).await?;

        let stored_avatar = self.avatars.accept(avatar).await?;
        let avatar_url = self.avatars.url_for(stored_avatar.as_deref());

        let account = Account {
            username,
            password_hash,
            email,
            full_name,
            nickname,
            phone,
            gender,
            avatar_url,
            registered_at: Utc::now(),
        };

        match self.repository.append(account.clone()).await {
            Ok(()) => {
                info!("Account registered");
                Ok(account)
            }
            Err(e) => {
                if let Some(name) = &stored_avatar {
                    self.avatars.discard(name).await;
                }
                match e {
                    StoreError::Conflict(_) => {
                        debug!("Lost registration race");
                        Err(Error::UsernameTaken)
                    }
                    other => Err(other.into()),
                }
            }
        }
    }

    /// Authenticate and return the account.
    ///
    /// # Errors
    /// [`Error::InvalidCredentials`] for an unknown username or a wrong password,
    /// [`Error::Storage`] if the store cannot be read.
    #[instrument(skip(self, credentials), fields(username = %credentials.username))]
    pub async fn login(&self, credentials: Credentials) -> Result<Account, Error> {
        let Credentials { username, password } = credentials;

        let Some(account) = self.repository.find_by_username(&username).await? else {
            let dummy = self.dummy_digest().await?;
            let _ = self.verify(password, dummy).await;
            debug!("Login failed");
            return Err(Error::InvalidCredentials);
        };

        if self.verify(password, account.password_hash.clone()).await {
            info!("Login successful");
            Ok(account)
        } else {
            debug!("Login failed");
            Err(Error::InvalidCredentials)
        }
    }

    /// Look up an account for display.
    ///
    /// # Errors
    /// [`Error::Storage`] if the store cannot be read.
    pub async fn profile(&self, username: &str) -> Result<Option<Account>, Error> {
        Ok(self.repository.find_by_username(username).await?)
    }

    async fn hash(&self, password: SecretString) -> Result<String, Error> {
        let hasher = self.hasher.clone();
        task::spawn_blocking(move || hasher.hash(password.expose_secret()))
            .await
            .map_err(|e| {
                error!("Hashing task failed: {}", e);
                Error::Hashing
            })?
    }

    async fn verify(&self, password: SecretString, digest: String) -> bool {
        let hasher = self.hasher.clone();
        task::spawn_blocking(move || hasher.verify(password.expose_secret(), &digest))
            .await
            .unwrap_or_else(|e| {
                error!("Verification task failed: {}", e);
                false
            })
    }

    async fn dummy_digest(&self) -> Result<String, Error> {
        self.dummy_digest
            .get_or_try_init(|| self.hash(SecretString::from(Ulid::new().to_string())))
            .await
            .cloned()
    }
}
