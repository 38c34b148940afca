//! Discord client glue: command registration, the gateway event loop, and interaction dispatch.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context as _, Result};
use log::{debug, error, info, warn};
use sha2::{Digest, Sha256};
use twilight_cache_inmemory::{InMemoryCache, ResourceType};
use twilight_gateway::{Event, Intents, Shard, ShardId};
use twilight_http::client::InteractionClient;
use twilight_http::Client as HttpClient;
use twilight_model::application::command::CommandType;
use twilight_model::application::interaction::{Interaction, InteractionData, InteractionType};
use twilight_model::channel::message::{Component, Embed, MessageFlags};
use twilight_model::http::interaction::{
    InteractionResponse, InteractionResponseData, InteractionResponseType,
};
use twilight_model::id::marker::ApplicationMarker;
use twilight_model::id::Id;
use twilight_util::builder::command::CommandBuilder;
use uuid::Uuid;

use crate::embeds::{self, sanitize::sanitize};
use crate::pool::{self, PoolError};
use crate::settings::Settings;
use crate::trivia::{self, SessionRegistry};

/// How often the guild quantity is written to the log.
const GUILD_LOG_INTERVAL: Duration = Duration::from_secs(3600);

/// Shared state handed to every handler task. Passed around explicitly instead of living in a
/// global so each piece stays independently testable.
pub struct Context {
    http: HttpClient,
    app_id: Id<ApplicationMarker>,
    cache: InMemoryCache,
    settings: Settings,
    sessions: SessionRegistry,
    tasks_started: AtomicBool,
}

impl Context {
    fn interaction(&self) -> InteractionClient<'_> {
        self.http.interaction(self.app_id)
    }
}

/// Connect to Discord and process gateway events until a fatal gateway error or Ctrl-C.
pub async fn run(settings: Settings) -> Result<()> {
    let http = HttpClient::new(settings.discord_token.clone());
    let app_id = http
        .current_user_application()
        .await
        .context("failed fetching the bot application")?
        .model()
        .await?
        .id;

    // Only guild lifecycle events are worth caching; interactions arrive regardless.
    let cache = InMemoryCache::builder()
        .resource_types(ResourceType::GUILD)
        .build();

    let ctx = Arc::new(Context {
        http,
        app_id,
        cache,
        settings,
        sessions: SessionRegistry::new(),
        tasks_started: AtomicBool::new(false),
    });

    register_commands(&ctx).await?;

    let mut shard = Shard::new(
        ShardId::ONE,
        ctx.settings.discord_token.clone(),
        Intents::GUILDS,
    );
    debug!("shard set up");

    loop {
        let event = tokio::select! {
            event = shard.next_event() => match event {
                Ok(event) => event,
                Err(source) => {
                    warn!("error receiving gateway event: {source}");
                    if source.is_fatal() {
                        break;
                    }
                    continue;
                }
            },
            _ = tokio::signal::ctrl_c() => {
                info!("shutting down");
                break;
            }
        };

        ctx.cache.update(&event);

        let latency = shard.latency().average();
        let ctx = Arc::clone(&ctx);
        tokio::spawn(handle_event(ctx, event, latency));
    }

    Ok(())
}

/// Build one chat-input command per exam in the pool, plus `/hello`, and register the lot.
/// Registration is guild-scoped when a test guild is configured, global otherwise.
async fn register_commands(ctx: &Context) -> Result<()> {
    let pool = pool::load_pool(&ctx.settings.question_pool_filepath)
        .context("question pool failed to load")?;

    let mut commands = vec![CommandBuilder::new(
        "hello",
        "Simple ping/pong hello command",
        CommandType::ChatInput,
    )
    .build()];

    for exam in &pool {
        commands.push(
            CommandBuilder::new(
                exam.command_name.as_str(),
                exam.command_description.as_str(),
                CommandType::ChatInput,
            )
            .build(),
        );
        info!(
            "registered slash command '{}': {}",
            exam.command_name, exam.command_description
        );
    }

    match ctx.settings.test_guild {
        Some(guild_id) => {
            ctx.interaction()
                .set_guild_commands(guild_id, &commands)
                .await
                .context("failed syncing guild commands")?;
            info!("synced {} commands to test guild {guild_id}", commands.len());
        }
        None => {
            ctx.interaction()
                .set_global_commands(&commands)
                .await
                .context("failed syncing global commands")?;
            info!("synced {} global commands", commands.len());
        }
    }

    Ok(())
}

async fn handle_event(ctx: Arc<Context>, event: Event, latency: Option<Duration>) {
    match event {
        Event::Ready(ready) => {
            info!("logged in as {} ({})", ready.user.name, ready.user.id);
            // Ready fires again after reconnects; the logging task must only start once.
            if !ctx.tasks_started.swap(true, Ordering::Relaxed) {
                tokio::spawn(log_guild_quantity(Arc::clone(&ctx)));
            }
        }
        Event::Resumed => info!("gateway session resumed"),
        Event::GuildCreate(guild) => {
            info!("joined guild {} ({})", guild.name, guild.id);
        }
        Event::GuildDelete(guild) => {
            // The removal payload carries no guild name.
            info!("removed from guild {}", guild.id);
        }
        Event::InteractionCreate(interaction) => {
            handle_interaction(&ctx, interaction.0, latency).await;
        }
        _ => {}
    }
}

/// Log the number of cached guilds once an hour.
async fn log_guild_quantity(ctx: Arc<Context>) {
    let mut interval = tokio::time::interval(GUILD_LOG_INTERVAL);
    loop {
        interval.tick().await;
        info!("currently serving {} guilds", ctx.cache.stats().guilds());
    }
}

/// Error boundary for interaction handlers: anything a handler fails to handle itself is
/// fingerprinted, logged, and reported back to the invoking user.
async fn handle_interaction(ctx: &Context, interaction: Interaction, latency: Option<Duration>) {
    let command = match &interaction.data {
        Some(InteractionData::ApplicationCommand(data)) => Some(data.name.clone()),
        _ => None,
    };

    let result = match interaction.kind {
        InteractionType::ApplicationCommand => on_command(ctx, &interaction, latency).await,
        InteractionType::MessageComponent => on_component(ctx, &interaction).await,
        _ => Ok(()),
    };

    if let Err(err) = result {
        report_command_failure(ctx, &interaction, command.as_deref().unwrap_or("unknown"), &err)
            .await;
    }
}

/// Dispatch one slash command invocation.
async fn on_command(
    ctx: &Context,
    interaction: &Interaction,
    latency: Option<Duration>,
) -> Result<()> {
    let Some(InteractionData::ApplicationCommand(data)) = &interaction.data else {
        anyhow::bail!("application command interaction without command data");
    };
    let name = data.name.as_str();

    if name == "hello" {
        send_embeds(ctx, interaction, vec![embeds::hello_reply(latency)], &[], false).await;
    } else {
        // The pool is re-read on every invocation so edits are picked up live.
        let pool = match pool::load_pool(&ctx.settings.question_pool_filepath) {
            Ok(pool) => pool,
            Err(err @ PoolError::NotFound(_)) => {
                warn!("{err}");
                return Ok(());
            }
            Err(err) => return Err(err.into()),
        };

        let Some(exam) = pool::lookup_exam(&pool, name) else {
            warn!("no exam in the question pool matches command '{name}'");
            return Ok(());
        };

        let Some(posted) = trivia::pose_question(exam, interaction.id) else {
            warn!("exam '{name}' has no usable question");
            return Ok(());
        };

        ctx.sessions.insert(interaction.id, posted.session);
        send_embeds(ctx, interaction, sanitize(posted.embed), &posted.components, false).await;
    }

    if let Some(user) = interaction.author() {
        info!("command '{name}' completed for {} ({})", user.name, user.id);
    }

    Ok(())
}

/// Grade one answer button press against its trivia session and reply privately.
async fn on_component(ctx: &Context, interaction: &Interaction) -> Result<()> {
    let Some(InteractionData::MessageComponent(data)) = &interaction.data else {
        anyhow::bail!("component interaction without component data");
    };

    let Some((key, choice_id)) = trivia::parse_custom_id(&data.custom_id) else {
        anyhow::bail!("malformed component custom id '{}'", data.custom_id);
    };

    // Build the reply while holding the registry entry, then release it before sending.
    let embed = match ctx.sessions.get(&key) {
        Some(session) => {
            if session.grade(choice_id) {
                embeds::trivia_correct(session.explanation())
            } else {
                embeds::trivia_incorrect(session.correct_answer(), session.explanation())
            }
        }
        None => {
            debug!("no live session for interaction {key}");
            respond_text(ctx, interaction, "This trivia question is no longer active.").await;
            return Ok(());
        }
    };

    send_embeds(ctx, interaction, sanitize(embed), &[], true).await;
    Ok(())
}

/// Deliver sanitized embeds for an interaction: the first as the interaction response, the rest
/// as followups. Every delivery failure is logged at warn level and swallowed; the user simply
/// sees no reply.
async fn send_embeds(
    ctx: &Context,
    interaction: &Interaction,
    embeds: Vec<Embed>,
    components: &[Component],
    ephemeral: bool,
) {
    let flags = ephemeral.then_some(MessageFlags::EPHEMERAL);
    let mut embeds = embeds.into_iter();
    let Some(first) = embeds.next() else {
        return;
    };

    let response = InteractionResponse {
        kind: InteractionResponseType::ChannelMessageWithSource,
        data: Some(InteractionResponseData {
            embeds: Some(vec![first.clone()]),
            components: (!components.is_empty()).then(|| components.to_vec()),
            flags,
            ..Default::default()
        }),
    };

    if let Err(err) = ctx
        .interaction()
        .create_response(interaction.id, &interaction.token, &response)
        .await
    {
        // Most commonly the interaction was already responded to (error reports after a
        // partial reply); fall back to a followup before giving up.
        warn!("failed sending interaction response, retrying as followup: {err}");
        send_followup(ctx, &interaction.token, &first, components, flags).await;
    }

    for embed in embeds {
        send_followup(ctx, &interaction.token, &embed, components, flags).await;
    }
}

async fn send_followup(
    ctx: &Context,
    token: &str,
    embed: &Embed,
    components: &[Component],
    flags: Option<MessageFlags>,
) {
    let client = ctx.interaction();
    let followup = match client.create_followup(token).embeds(std::slice::from_ref(embed)) {
        Ok(followup) => followup,
        Err(err) => {
            warn!("invalid followup embed: {err}");
            return;
        }
    };

    let followup = if components.is_empty() {
        followup
    } else {
        match followup.components(components) {
            Ok(followup) => followup,
            Err(err) => {
                warn!("invalid followup components: {err}");
                return;
            }
        }
    };

    let followup = match flags {
        Some(flags) => followup.flags(flags),
        None => followup,
    };

    if let Err(err) = followup.await {
        warn!("failed sending followup embed: {err}");
    }
}

/// Ephemeral plain-text reply, for interactions that cannot be served.
async fn respond_text(ctx: &Context, interaction: &Interaction, text: &str) {
    let response = InteractionResponse {
        kind: InteractionResponseType::ChannelMessageWithSource,
        data: Some(InteractionResponseData {
            content: Some(text.to_owned()),
            flags: Some(MessageFlags::EPHEMERAL),
            ..Default::default()
        }),
    };

    if let Err(err) = ctx
        .interaction()
        .create_response(interaction.id, &interaction.token, &response)
        .await
    {
        warn!("failed sending interaction response: {err}");
    }
}

/// Fingerprint an unhandled command error, log it, and tell the invoking user. The checksum
/// groups recurrences of the same fault while the unique id pins down a single occurrence.
async fn report_command_failure(
    ctx: &Context,
    interaction: &Interaction,
    command: &str,
    err: &anyhow::Error,
) {
    let trace = format!("{err:?}");
    let checksum = hex::encode(Sha256::digest(trace.as_bytes()));
    let error_id = Uuid::new_v4().to_string();
    error!("command '{command}' failed: {trace} (checksum {checksum}, error id {error_id})");

    let embed = embeds::command_failed(command, &checksum, &error_id, &trace);
    send_embeds(ctx, interaction, sanitize(embed), &[], false).await;
}
