use std::fs::File;

use anyhow::{Context, Result};
use log::info;
use simplelog::{
    ColorChoice, CombinedLogger, ConfigBuilder, LevelFilter, TermLogger, TerminalMode, WriteLogger,
};

use trivia_bot::discord;
use trivia_bot::pool;
use trivia_bot::settings::Settings;

#[tokio::main]
async fn main() -> Result<()> {
    // Loading .env file
    dotenv::dotenv().ok();
    let settings = Settings::from_env()?;

    init_logger(settings.debug)?;
    info!("logging initialized");

    // A malformed pool must fail the process here, before it ever talks to Discord. Later
    // per-command re-reads only log their failures.
    let pool = pool::load_pool(&settings.question_pool_filepath)
        .context("question pool failed to load at startup")?;
    info!("loaded question pool with {} exams", pool.len());
    for exam in &pool {
        info!(
            "exam '{}' offers {} questions",
            exam.command_name,
            exam.questions.len()
        );
    }
    drop(pool);

    info!("connecting to Discord");
    discord::run(settings).await
}

/// Combined terminal and file logging. The gateway and HTTP internals are kept out of the
/// stream; `DEBUG` only raises the verbosity of this bot's own modules.
fn init_logger(debug: bool) -> Result<()> {
    let level = if debug {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    let config = ConfigBuilder::new()
        .add_filter_ignore_str("twilight_gateway")
        .add_filter_ignore_str("twilight_http")
        .build();

    CombinedLogger::init(vec![
        TermLogger::new(level, config.clone(), TerminalMode::Mixed, ColorChoice::Auto),
        WriteLogger::new(
            LevelFilter::Info,
            config,
            File::create("trivia_bot.log").context("failed creating log file")?,
        ),
    ])?;

    Ok(())
}
