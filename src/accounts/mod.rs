//! Account and credential store.
//!
//! Leaves first: [`password`] derives and checks digests, [`avatar`] stores
//! uploaded images, [`repository`] owns the persisted collection and
//! [`service`] runs the registration and login flows over all three.

pub mod avatar;
pub mod error;
pub mod model;
pub mod password;
pub mod repository;
pub mod service;

pub use self::avatar::{AvatarStore, AvatarUpload};
pub use self::error::{Error, StoreError};
pub use self::model::{Account, Profile};
pub use self::password::PasswordHasher;
pub use self::repository::AccountRepository;
pub use self::service::{AccountService, Credentials, Registration};
