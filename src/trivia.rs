//! The trivia question lifecycle: question selection, choice shuffling, rendering, and answer
//! grading.
//!
//! A posted question is remembered as a [`TriviaSession`] keyed by the interaction that created
//! it; every answer button carries that key in its `custom_id`. Grading only ever reads the
//! captured state, so any number of users may press any button at any time without locking.

use dashmap::DashMap;
use rand::rng;
use rand::seq::{IndexedRandom, SliceRandom};
use twilight_model::channel::message::component::{ActionRow, Button, ButtonStyle};
use twilight_model::channel::message::{Component, Embed};
use twilight_model::id::marker::InteractionMarker;
use twilight_model::id::Id;

use crate::embeds;
use crate::pool::{Choice, Exam};

/// Discord places at most five buttons in one action row.
const BUTTONS_PER_ROW: usize = 5;

/// Key of a posted question: the id of the interaction that invoked the trivia command.
pub type SessionKey = Id<InteractionMarker>;

/// All live sessions, shared across handler tasks. Entries are immutable once inserted and are
/// kept for the lifetime of the process; there is no answer deadline.
pub type SessionRegistry = DashMap<SessionKey, TriviaSession>;

/// Immutable state captured when a question is posted.
#[derive(Debug)]
pub struct TriviaSession {
    /// Id of the correct choice.
    correct_choice: u32,
    /// The correct choice rendered as `"{n}. {text}"` in display order.
    correct_answer: String,
    explanation: Option<String>,
}

impl TriviaSession {
    /// Whether the pressed choice is the correct one. Pressing again, or pressing another
    /// choice, grades again; nothing is recorded.
    pub fn grade(&self, choice_id: u32) -> bool {
        choice_id == self.correct_choice
    }

    pub fn correct_answer(&self) -> &str {
        &self.correct_answer
    }

    pub fn explanation(&self) -> Option<&str> {
        self.explanation.as_deref()
    }
}

/// A rendered question ready for delivery: the embed, one answer button per choice, and the
/// session state to remember until the buttons are pressed.
pub struct PostedQuestion {
    pub embed: Embed,
    pub components: Vec<Component>,
    pub session: TriviaSession,
}

/// Pick a random question from the exam, shuffle a copy of its choices, and render everything.
///
/// Returns `None` for an exam without questions or whose correct-choice id points nowhere; the
/// pool test suite rules both out for shipped data.
pub fn pose_question(exam: &Exam, key: SessionKey) -> Option<PostedQuestion> {
    let mut rng = rng();
    let question = exam.questions.choose(&mut rng)?;
    let mut choices: Vec<&Choice> = question.choices.iter().collect();
    choices.shuffle(&mut rng);
    drop(rng);

    let (position, correct) = choices
        .iter()
        .enumerate()
        .find(|(_, choice)| choice.id == question.correct_choice)?;

    let session = TriviaSession {
        correct_choice: question.correct_choice,
        correct_answer: format!("{}. {}", position + 1, correct.text),
        explanation: question.explanation.clone(),
    };

    let texts: Vec<&str> = choices.iter().map(|choice| choice.text.as_str()).collect();
    let embed = embeds::trivia_question(&exam.meta_name, &question.prompt, &texts);
    let components = answer_buttons(&choices, key);

    Some(PostedQuestion {
        embed,
        components,
        session,
    })
}

/// One secondary-style button per choice, labelled with its display position, grouped into
/// action rows of at most five.
fn answer_buttons(choices: &[&Choice], key: SessionKey) -> Vec<Component> {
    choices
        .chunks(BUTTONS_PER_ROW)
        .enumerate()
        .map(|(row, chunk)| {
            Component::ActionRow(ActionRow {
                components: chunk
                    .iter()
                    .enumerate()
                    .map(|(slot, choice)| {
                        let position = row * BUTTONS_PER_ROW + slot + 1;
                        Component::Button(Button {
                            custom_id: Some(format!("{key}:{}", choice.id)),
                            disabled: false,
                            emoji: None,
                            label: Some(format!("{position}: {}", choice.text)),
                            style: ButtonStyle::Secondary,
                            url: None,
                        })
                    })
                    .collect(),
            })
        })
        .collect()
}

/// Parse a button `custom_id` back into its session key and choice id.
pub fn parse_custom_id(custom_id: &str) -> Option<(SessionKey, u32)> {
    let (key, choice) = custom_id.split_once(':')?;
    Some((key.parse().ok()?, choice.parse().ok()?))
}
