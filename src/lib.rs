//! # Signet (Account & Credential Store)
//!
//! `signet` registers user accounts and authenticates them against stored
//! credentials. The core lives in [`accounts`]; [`api`] is a thin axum shell on
//! top of it and [`cli`] wires configuration, logging and the server together.
//!
//! ## Accounts
//!
//! - **Uniqueness:** usernames are case-sensitive identity keys. The repository
//!   re-checks uniqueness inside its write lock, so a registration that passed
//!   the advisory check can still be rejected when another one won the race.
//! - **Passwords:** only Argon2id PHC strings are persisted. Plaintext is held in
//!   `SecretString` and never logged.
//! - **Storage:** the whole collection is a single JSON document rewritten
//!   atomically (temp file + rename) on every registration.
//!
//! ## Avatars
//!
//! Uploaded images are allow-listed by extension and stored under a generated
//! UUID name; the client-supplied filename never reaches the filesystem.
//!
//! ## Login
//!
//! Unknown usernames and wrong passwords produce the same `401` response.

pub mod accounts;
pub mod api;
pub mod cli;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};
