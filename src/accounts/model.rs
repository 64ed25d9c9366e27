use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use utoipa::ToSchema;

/// A registered user as persisted in the account store.
///
/// Serialized field names follow the on-disk format (`password`, `name`,
/// `registration_date`), not the Rust field names.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub username: String,
    #[serde(rename = "password")]
    pub password_hash: String,
    pub email: String,
    #[serde(rename = "name")]
    pub full_name: String,
    pub nickname: String,
    pub phone: String,
    pub gender: String,
    pub avatar_url: String,
    #[serde(rename = "registration_date", with = "timestamp")]
    pub registered_at: DateTime<Utc>,
}

impl fmt::Debug for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Account")
            .field("username", &self.username)
            .field("password_hash", &"***")
            .field("email", &self.email)
            .field("full_name", &self.full_name)
            .field("nickname", &self.nickname)
            .field("phone", &self.phone)
            .field("gender", &self.gender)
            .field("avatar_url", &self.avatar_url)
            .field("registered_at", &self.registered_at)
            .finish()
    }
}

/// Public view of an [`Account`]: everything except the password digest.
#[derive(ToSchema, Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Profile {
    pub username: String,
    pub email: String,
    pub name: String,
    pub nickname: String,
    pub phone: String,
    pub gender: String,
    pub avatar_url: String,
    pub registration_date: DateTime<Utc>,
}

impl From<&Account> for Profile {
    fn from(account: &Account) -> Self {
        Self {
            username: account.username.clone(),
            email: account.email.clone(),
            name: account.full_name.clone(),
            nickname: account.nickname.clone(),
            phone: account.phone.clone(),
            gender: account.gender.clone(),
            avatar_url: account.avatar_url.clone(),
            registration_date: account.registered_at,
        }
    }
}

/// The persisted document: `{"users": [...]}`.
#[derive(Serialize, Deserialize, Debug, Default)]
pub(crate) struct StoreDocument {
    pub(crate) users: Vec<Account>,
}

/// ISO-8601 timestamps. Written as RFC 3339 in UTC; timestamps without an
/// offset are read as UTC.
mod timestamp {
    use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_rfc3339_opts(SecondsFormat::AutoSi, true))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).map_err(de::Error::custom)
    }

    pub(super) fn parse(raw: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
        DateTime::parse_from_rfc3339(raw)
            .map(|dt| dt.with_timezone(&Utc))
            .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f").map(|n| n.and_utc()))
    }
}
