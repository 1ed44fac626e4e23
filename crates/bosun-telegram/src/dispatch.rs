//! Explicit handler dispatch.
//!
//! At startup the runtime builds one [`HandlerRegistry`]: an ordered table
//! of (trigger → handler). Dispatch walks the table, first match wins, and a
//! handler may return [`Outcome::Pass`] to fall through to later entries.
//! The fallback echo entry is registered last so it can never shadow a
//! specific trigger.

use std::sync::Arc;

use futures::future::BoxFuture;
use regex::Regex;
use teloxide::prelude::*;
use teloxide::types::User;
use tracing::{Instrument, debug, error, info_span};

use bosun_core::{CallerIdentity, UserId};
use bosun_crypto::CallbackCodec;

use crate::render;
use crate::state::BotState;

/// One decoded update, as handlers see it.
#[derive(Debug, Clone)]
pub enum Event {
    /// A chat message.
    Message(Message),
    /// An inline-keyboard callback.
    Callback(CallbackQuery),
}

impl Event {
    /// The sending user, when the platform attached one.
    #[must_use]
    pub fn user(&self) -> Option<&User> {
        match self {
            Self::Message(msg) => msg.from.as_ref(),
            Self::Callback(query) => Some(&query.from),
        }
    }

    /// The sending user's id.
    #[must_use]
    pub fn user_id(&self) -> Option<UserId> {
        self.user().map(|u| UserId(u.id.0))
    }

    /// The chat the reply should go to.
    #[must_use]
    pub fn chat_id(&self) -> Option<ChatId> {
        match self {
            Self::Message(msg) => Some(msg.chat.id),
            Self::Callback(query) => query.message.as_ref().map(|m| m.chat().id),
        }
    }

    /// Message text, for message events.
    #[must_use]
    pub fn text(&self) -> Option<&str> {
        match self {
            Self::Message(msg) => msg.text(),
            Self::Callback(_) => None,
        }
    }

    /// Callback data, for callback events.
    #[must_use]
    pub fn callback_data(&self) -> Option<&str> {
        match self {
            Self::Message(_) => None,
            Self::Callback(query) => query.data.as_deref(),
        }
    }

    /// The raw trigger content, as the referer mechanism stores it.
    #[must_use]
    pub fn trigger_data(&self) -> &str {
        match self {
            Self::Message(msg) => msg.text().unwrap_or_default(),
            Self::Callback(query) => query.data.as_deref().unwrap_or_default(),
        }
    }

    /// Identity values that must never surface in returned container logs.
    #[must_use]
    pub fn caller_identity(&self) -> CallerIdentity {
        self.user().map_or_else(CallerIdentity::default, |user| {
            CallerIdentity {
                username: user.username.clone(),
                first_name: Some(user.first_name.clone()),
                last_name: user.last_name.clone(),
                user_id: user.id.0.to_string(),
            }
        })
    }
}

/// Whether a handler consumed the event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Consumed; dispatch stops.
    Handled,
    /// Not consumed; dispatch continues down the table.
    Pass,
}

/// A boxed handler function.
pub type HandlerFn =
    Arc<dyn Fn(Event, BotState) -> BoxFuture<'static, anyhow::Result<Outcome>> + Send + Sync>;

/// What fires a handler.
#[derive(Debug, Clone)]
pub enum Trigger {
    /// First token of a message equals the command (bot-suffix tolerant).
    Command(String),
    /// Message text contains the fragment (keyboard buttons carry emoji
    /// prefixes, so matching is substring, as the original did).
    TextFragment(String),
    /// Message text matches the regex.
    TextRegex(Regex),
    /// Callback data starts with the prefix.
    CallbackPrefix(String),
    /// Callback data equals the value.
    CallbackExact(String),
    /// Callback data has the shape of a signed codec payload.
    SignedCallback,
    /// Any message at all; used by the pending-rename hook and the echo.
    AnyMessage,
}

impl Trigger {
    fn matches(&self, event: &Event) -> bool {
        match self {
            Self::Command(cmd) => event.text().is_some_and(|text| {
                let first = text.split_whitespace().next().unwrap_or("");
                first == cmd || first.split('@').next() == Some(cmd.as_str())
            }),
            Self::TextFragment(fragment) => {
                event.text().is_some_and(|text| text.contains(fragment))
            },
            Self::TextRegex(re) => event.text().is_some_and(|text| re.is_match(text)),
            Self::CallbackPrefix(prefix) => event
                .callback_data()
                .is_some_and(|data| data.starts_with(prefix)),
            Self::CallbackExact(value) => event.callback_data() == Some(value.as_str()),
            Self::SignedCallback => event
                .callback_data()
                .is_some_and(CallbackCodec::looks_signed),
            Self::AnyMessage => matches!(event, Event::Message(_)),
        }
    }
}

/// One registered handler.
pub struct HandlerEntry {
    /// Name used in spans and logs.
    pub name: String,
    /// What fires it.
    pub trigger: Trigger,
    /// The handler itself.
    pub handler: HandlerFn,
}

/// The ordered dispatch table.
#[derive(Default)]
pub struct HandlerRegistry {
    entries: Vec<HandlerEntry>,
}

impl HandlerRegistry {
    /// An empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry; order is significance.
    pub fn push(&mut self, name: impl Into<String>, trigger: Trigger, handler: HandlerFn) {
        self.entries.push(HandlerEntry {
            name: name.into(),
            trigger,
            handler,
        });
    }

    /// Number of registered entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Name of the last registered entry (the fallback, once assembled).
    #[must_use]
    pub fn last_name(&self) -> Option<&str> {
        self.entries.last().map(|e| e.name.as_str())
    }

    /// Registered entry names, in dispatch order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.name.as_str())
    }

    /// Name of the first entry whose trigger matches, without running it.
    /// Test aid for the table's ordering guarantees.
    #[must_use]
    pub fn match_name(&self, event: &Event) -> Option<&str> {
        self.entries
            .iter()
            .find(|e| e.trigger.matches(event))
            .map(|e| e.name.as_str())
    }

    /// Route one event through the table.
    ///
    /// Runs to completion before returning; the runtime spawns one worker
    /// per update, so handlers only need to be re-entrant, not short.
    pub async fn dispatch(&self, event: Event, state: BotState) {
        state.health.record_update();

        for entry in &self.entries {
            if !entry.trigger.matches(&event) {
                continue;
            }

            let span = info_span!(
                "handler",
                handler = entry.name.as_str(),
                user_id = event.user_id().map(|u| u.get()).unwrap_or_default(),
            );
            let result = (entry.handler)(event.clone(), state.clone())
                .instrument(span)
                .await;

            match result {
                Ok(Outcome::Handled) => {
                    debug!(handler = entry.name.as_str(), "update handled");
                    return;
                },
                Ok(Outcome::Pass) => {},
                Err(e) => {
                    error!(
                        handler = entry.name.as_str(),
                        error = %state.redactor.scrub_error(&format!("{e:#}")),
                        "handler failed"
                    );
                    reply_generic_error(&event, &state).await;
                    return;
                },
            }
        }

        // Messages always end in the echo entry; only callbacks can fall
        // off the table.
        if let Event::Callback(query) = &event {
            let _ = state
                .bot
                .answer_callback_query(&query.id)
                .text("Unknown action")
                .await;
        }
    }
}

async fn reply_generic_error(event: &Event, state: &BotState) {
    match event {
        Event::Message(msg) => {
            let _ = state
                .bot
                .send_message(msg.chat.id, render::internal_error())
                .await;
        },
        Event::Callback(query) => {
            let _ = state
                .bot
                .answer_callback_query(&query.id)
                .text(render::internal_error())
                .await;
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message_event(text: &str) -> Event {
        let value = serde_json::json!({
            "message_id": 1,
            "date": 1_700_000_000,
            "chat": { "id": 10, "type": "private", "first_name": "A" },
            "from": { "id": 42, "is_bot": false, "first_name": "Alice", "username": "alice" },
            "text": text
        });
        Event::Message(serde_json::from_value(value).unwrap())
    }

    fn callback_event(data: &str) -> Event {
        let value = serde_json::json!({
            "id": "q1",
            "from": { "id": 42, "is_bot": false, "first_name": "Alice", "username": "alice" },
            "chat_instance": "ci",
            "data": data
        });
        Event::Callback(serde_json::from_value(value).unwrap())
    }

    #[test]
    fn command_trigger_matches_with_bot_suffix() {
        let trigger = Trigger::Command("/start".to_owned());
        assert!(trigger.matches(&message_event("/start")));
        assert!(trigger.matches(&message_event("/start@bosun_bot")));
        assert!(trigger.matches(&message_event("/start extra")));
        assert!(!trigger.matches(&message_event("/started")));
    }

    #[test]
    fn fragment_trigger_ignores_emoji_prefix() {
        let trigger = Trigger::TextFragment("Load average".to_owned());
        assert!(trigger.matches(&message_event("🪫 Load average")));
        assert!(trigger.matches(&message_event("Load average")));
        assert!(!trigger.matches(&message_event("load average")));
    }

    #[test]
    fn regex_trigger_matches_totp_codes() {
        let trigger = Trigger::TextRegex(Regex::new(r"^/?\d{6}$").unwrap());
        assert!(trigger.matches(&message_event("137821")));
        assert!(trigger.matches(&message_event("/137821")));
        assert!(!trigger.matches(&message_event("1378213")));
        assert!(!trigger.matches(&message_event("abc123")));
    }

    #[test]
    fn callback_triggers_match_prefix_and_exact() {
        let prefix = Trigger::CallbackPrefix("__get_full__:".to_owned());
        assert!(prefix.matches(&callback_event("__get_full__:nginx:42")));
        assert!(!prefix.matches(&callback_event("__get_logs__:nginx:42")));

        let exact = Trigger::CallbackExact("back_to_containers".to_owned());
        assert!(exact.matches(&callback_event("back_to_containers")));
        assert!(!exact.matches(&callback_event("back_to_containers:x")));
    }

    #[test]
    fn event_accessors_expose_sender() {
        let event = message_event("hello");
        assert_eq!(event.user_id(), Some(UserId(42)));
        assert_eq!(event.chat_id(), Some(ChatId(10)));
        assert_eq!(event.trigger_data(), "hello");

        let identity = event.caller_identity();
        assert_eq!(identity.username.as_deref(), Some("alice"));
        assert_eq!(identity.user_id, "42");
    }

    #[test]
    fn callback_event_trigger_data_is_payload() {
        let event = callback_event("__manage__:nginx:42");
        assert_eq!(event.trigger_data(), "__manage__:nginx:42");
        assert!(event.text().is_none());
    }
}
