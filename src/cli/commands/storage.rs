use anyhow::{anyhow, Result};
use clap::{Arg, ArgMatches, Command};
use std::path::PathBuf;

pub const ARG_USERS_FILE: &str = "users-file";
pub const ARG_MEDIA_ROOT: &str = "media-root";
pub const ARG_AVATAR_URL_PREFIX: &str = "avatar-url-prefix";
pub const ARG_DEFAULT_AVATAR: &str = "default-avatar";

#[derive(Debug, Clone)]
pub struct Options {
    pub users_file: PathBuf,
    pub media_root: PathBuf,
    pub avatar_url_prefix: String,
    pub default_avatar: String,
}

impl Options {
    /// Parse storage arguments from matches.
    ///
    /// # Errors
    /// Returns an error if an argument is missing or the avatar URL prefix is
    /// not an absolute path below `/`.
    pub fn parse(matches: &ArgMatches) -> Result<Self> {
        let read_required = |id: &str| -> Result<String> {
            matches
                .get_one::<String>(id)
                .cloned()
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| anyhow!("missing required argument: --{id}"))
        };

        let avatar_url_prefix = read_required(ARG_AVATAR_URL_PREFIX)?;
        if !avatar_url_prefix.starts_with('/') || avatar_url_prefix.trim_end_matches('/').is_empty()
        {
            return Err(anyhow!(
                "--{ARG_AVATAR_URL_PREFIX} must be an absolute path such as /static/avatars"
            ));
        }

        let default_avatar = read_required(ARG_DEFAULT_AVATAR)?;
        if default_avatar.contains('/') {
            return Err(anyhow!("--{ARG_DEFAULT_AVATAR} must be a file name"));
        }

        Ok(Self {
            users_file: PathBuf::from(read_required(ARG_USERS_FILE)?),
            media_root: PathBuf::from(read_required(ARG_MEDIA_ROOT)?),
            avatar_url_prefix,
            default_avatar,
        })
    }
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_USERS_FILE)
                .long(ARG_USERS_FILE)
                .help("Path to the JSON account store")
                .env("SIGNET_USERS_FILE")
                .default_value("users.json"),
        )
        .arg(
            Arg::new(ARG_MEDIA_ROOT)
                .long(ARG_MEDIA_ROOT)
                .help("Directory where uploaded avatars are stored")
                .env("SIGNET_MEDIA_ROOT")
                .default_value("static/avatars"),
        )
        .arg(
            Arg::new(ARG_AVATAR_URL_PREFIX)
                .long(ARG_AVATAR_URL_PREFIX)
                .help("Public URL path under which avatars are served")
                .env("SIGNET_AVATAR_URL_PREFIX")
                .default_value("/static/avatars"),
        )
        .arg(
            Arg::new(ARG_DEFAULT_AVATAR)
                .long(ARG_DEFAULT_AVATAR)
                .help("Avatar file name used when none was uploaded")
                .env("SIGNET_DEFAULT_AVATAR")
                .default_value("default.png"),
        )
}
