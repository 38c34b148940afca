//! Builders for the embeds sent in reply to commands.
//!
//! Every reply starts from a common base carrying a title, the current timestamp, and a status
//! icon thumbnail, then adds its own fields on top.

pub mod sanitize;

use chrono::Utc;
use twilight_model::channel::message::Embed;
use twilight_model::util::Timestamp;
use twilight_util::builder::embed::{EmbedBuilder, EmbedFieldBuilder, ImageSource};

pub const OK_ICON: &str = "https://docs.getbernard.io/img/valid_icon.png";
pub const WRONG_ICON: &str = "https://docs.getbernard.io/img/wrong_icon.png";
pub const CRITICAL_ICON: &str = "https://docs.getbernard.io/img/critical_icon.png";

const GREEN: u32 = 0x2ecc71;
const RED: u32 = 0xe74c3c;

const REPORT_ISSUE: &str =
    "*Problem with this question? Report it to the bot operators so the pool can be fixed!*";

/// Base embed shared by every command reply.
fn command_embed(title: impl Into<String>, icon: &str, colour: u32) -> EmbedBuilder {
    let mut builder = EmbedBuilder::new().title(title).color(colour);
    if let Ok(ts) = Timestamp::from_secs(Utc::now().timestamp()) {
        builder = builder.timestamp(ts);
    }
    if let Ok(icon) = ImageSource::url(icon) {
        builder = builder.thumbnail(icon);
    }
    builder
}

/// Base embed for replies reporting success.
pub fn command_ok(title: impl Into<String>) -> EmbedBuilder {
    command_embed(title, OK_ICON, GREEN)
}

/// Base embed for replies reporting that something is wrong.
pub fn command_wrong(title: impl Into<String>) -> EmbedBuilder {
    command_embed(title, WRONG_ICON, RED)
}

/// Base embed for replies reporting a bot-side failure.
pub fn command_error(title: impl Into<String>) -> EmbedBuilder {
    command_embed(title, CRITICAL_ICON, RED)
}

/// Reply for the `/hello` ping command.
pub fn hello_reply(latency: Option<std::time::Duration>) -> Embed {
    let latency = match latency {
        Some(latency) => format!("{:.2} ms", latency.as_secs_f64() * 1000.0),
        None => "unknown".to_owned(),
    };

    command_ok("__Hello!__")
        .field(EmbedFieldBuilder::new("Version", concat!("v", env!("CARGO_PKG_VERSION"))).build())
        .field(EmbedFieldBuilder::new("Discord API Latency", latency).build())
        .build()
}

/// One multiple-choice question with its (already shuffled) choices numbered from one.
pub fn trivia_question(meta_name: &str, prompt: &str, choices: &[&str]) -> Embed {
    let mut builder = command_ok(format!("__{meta_name}__"))
        .field(EmbedFieldBuilder::new("Question", prompt).build());

    for (index, choice) in choices.iter().enumerate() {
        builder = builder.field(
            EmbedFieldBuilder::new(
                format!("Choice #{}", index + 1),
                format!("```\n{choice}\n```"),
            )
            .build(),
        );
    }

    builder.build()
}

/// Private reply for a correct answer.
pub fn trivia_correct(explanation: Option<&str>) -> Embed {
    let mut builder = command_ok("__Trivia Answer Correct__")
        .description(REPORT_ISSUE)
        .field(
            EmbedFieldBuilder::new("Response", "Your answer to the trivia question was correct!")
                .build(),
        );

    if let Some(explanation) = explanation {
        builder = builder.field(EmbedFieldBuilder::new("Explanation", explanation).build());
    }

    builder.build()
}

/// Private reply for an incorrect answer, naming the correct choice.
pub fn trivia_incorrect(correct_answer: &str, explanation: Option<&str>) -> Embed {
    let mut builder = command_wrong("__Trivia Answer Incorrect__")
        .description(REPORT_ISSUE)
        .field(
            EmbedFieldBuilder::new(
                "Response",
                "Your answer to the trivia question was incorrect.",
            )
            .build(),
        )
        .field(EmbedFieldBuilder::new("Correct Answer", correct_answer).build());

    if let Some(explanation) = explanation {
        builder = builder.field(EmbedFieldBuilder::new("Explanation", explanation).build());
    }

    builder.build()
}

/// Reply for a slash command that raised an unhandled error. Carries both identifiers logged on
/// our side so users can quote them in a report.
pub fn command_failed(command: &str, checksum: &str, error_id: &str, trace: &str) -> Embed {
    command_error("__Command Error__")
        .field(EmbedFieldBuilder::new("Failed Command", format!("`/{command}`")).build())
        .field(EmbedFieldBuilder::new("Generic Error ID", checksum).build())
        .field(EmbedFieldBuilder::new("Unique Error ID", error_id).build())
        .field(EmbedFieldBuilder::new("Traceback", format!("```\n{trace}\n```")).build())
        .build()
}
