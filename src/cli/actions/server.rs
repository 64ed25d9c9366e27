use crate::{
    accounts::{AccountRepository, AccountService, AvatarStore, PasswordHasher},
    api,
    cli::telemetry,
};
use anyhow::{Context, Result};
use std::{path::PathBuf, sync::Arc};
use tokio::fs;
use tracing::{debug, info, warn};

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub max_body_bytes: usize,
    pub users_file: PathBuf,
    pub media_root: PathBuf,
    pub avatar_url_prefix: String,
    pub default_avatar: String,
}

/// Execute the server action.
/// # Errors
/// Returns an error if the account store is unreadable, the media root cannot be
/// created, or the server fails to start.
pub async fn execute(args: Args) -> Result<()> {
    debug!("Server args: {:?}", args);

    let avatars = AvatarStore::new(args.media_root, args.avatar_url_prefix, args.default_avatar);

    fs::create_dir_all(avatars.media_root())
        .await
        .with_context(|| {
            format!(
                "Failed to create media root: {}",
                avatars.media_root().display()
            )
        })?;

    if !avatars.has_default_avatar().await {
        warn!(
            "Default avatar {} is missing; accounts without an upload will link to a 404",
            avatars.url_for(None)
        );
    }

    let repository = Arc::new(AccountRepository::new(args.users_file));

    // Fail fast on a corrupt store instead of on the first request
    let accounts = repository
        .load_all()
        .await
        .context("Failed to load account store")?;

    info!(
        accounts = accounts.len(),
        path = %repository.path().display(),
        "Account store loaded"
    );

    let service = Arc::new(AccountService::new(
        repository,
        PasswordHasher::default(),
        avatars,
    ));

    service
        .warm_up()
        .await
        .context("Failed to prepare login verification")?;

    let result = api::new(args.port, service, args.max_body_bytes).await;

    telemetry::shutdown_tracer();

    result
}
