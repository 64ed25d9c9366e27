//! Command-line argument dispatch.
//!
//! This module maps validated CLI arguments to the action to run, currently
//! only starting the API server with its storage configuration.

use crate::cli::actions::{server::Args, Action};
use crate::cli::commands::{storage, ARG_MAX_BODY_BYTES, ARG_PORT};
use anyhow::Result;

/// Map validated CLI matches to a server action.
///
/// # Errors
/// Returns an error if required arguments are missing or inconsistent.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let port = matches.get_one::<u16>(ARG_PORT).copied().unwrap_or(8080);
    let max_body_bytes = matches
        .get_one::<usize>(ARG_MAX_BODY_BYTES)
        .copied()
        .unwrap_or(crate::api::DEFAULT_MAX_BODY_BYTES);

    let storage_opts = storage::Options::parse(matches)?;

    Ok(Action::Server(Args {
        port,
        max_body_bytes,
        users_file: storage_opts.users_file,
        media_root: storage_opts.media_root,
        avatar_url_prefix: storage_opts.avatar_url_prefix,
        default_avatar: storage_opts.default_avatar,
    }))
}
