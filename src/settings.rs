//! Environment-sourced settings for the bot.

use std::env;
use std::path::PathBuf;

use anyhow::{Context, Result};
use twilight_model::id::marker::GuildMarker;
use twilight_model::id::Id;

/// Main structure that holds all the settings of this bot.
#[derive(Debug)]
pub struct Settings {
    /// Location of the YAML document holding the question pool.
    pub question_pool_filepath: PathBuf,
    /// Raise the terminal log output to debug verbosity.
    pub debug: bool,
    /// A token to authenticate against the Discord API as a bot and send messages.
    pub discord_token: String,
    /// Restrict slash command registration to a single guild during development. Global
    /// registration takes up to an hour to propagate, guild registration is instant.
    pub test_guild: Option<Id<GuildMarker>>,
}

impl Settings {
    /// Read all settings from the environment. `DISCORD_TOKEN` is the only required variable;
    /// call [`dotenv::dotenv`] beforehand to pick up a `.env` file.
    pub fn from_env() -> Result<Self> {
        let question_pool_filepath = env::var("QUESTION_POOL_FILEPATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("models/question_pool.yaml"));

        let debug = env::var("DEBUG")
            .map(|v| matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
            .unwrap_or(false);

        let discord_token = env::var("DISCORD_TOKEN").context("DISCORD_TOKEN env var missing")?;

        let test_guild = match env::var("TEST_GUILD") {
            Ok(raw) => Some(raw.parse().context("TEST_GUILD is not a valid guild id")?),
            Err(_) => None,
        };

        Ok(Self {
            question_pool_filepath,
            debug,
            discord_token,
            test_guild,
        })
    }
}
