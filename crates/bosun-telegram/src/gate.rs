//! The two-factor gate for privileged handlers.
//!
//! A privileged handler is wrapped at registration time. The wrapper admits
//! the call only for an admin holding a live authenticated session; anyone
//! else is short-circuited. For an admin who still needs to authenticate,
//! the original trigger is stored as the referer so a successful login can
//! offer to resume it.

use std::sync::Arc;

use teloxide::prelude::*;
use teloxide::types::ParseMode;
use tracing::info;

use bosun_session::RefererKind;

use crate::dispatch::{Event, HandlerFn, Outcome};
use crate::keyboards;
use crate::render;
use crate::state::BotState;

/// Wrap a handler so it only runs for an authenticated admin.
#[must_use]
pub fn require_totp(inner: HandlerFn) -> HandlerFn {
    Arc::new(move |event: Event, state: BotState| {
        let inner = Arc::clone(&inner);
        Box::pin(async move {
            let Some(user) = event.user_id() else {
                // Middleware already drops sender-less updates; nothing to do.
                return Ok(Outcome::Handled);
            };

            if !state.config.is_admin(user.get()) {
                deny(&event, &state, &render::access_denied()).await;
                return Ok(Outcome::Handled);
            }

            if state.sessions.is_authenticated(user).await {
                return inner(event, state).await;
            }

            // Admin without a live session: remember where they were going.
            let kind = match &event {
                Event::Message(_) => RefererKind::Message,
                Event::Callback(_) => RefererKind::CallbackQuery,
            };
            state
                .sessions
                .set_referer(user, kind, event.trigger_data())
                .await;
            info!(user_id = %user, "privileged handler gated, authentication required");

            if let Event::Callback(query) = &event {
                let _ = state
                    .bot
                    .answer_callback_query(&query.id)
                    .text(render::access_denied())
                    .show_alert(true)
                    .await;
            }
            if let Some(chat) = event.chat_id() {
                let _ = state
                    .bot
                    .send_message(chat, render::auth_required())
                    .parse_mode(ParseMode::Html)
                    .reply_markup(keyboards::auth_keyboard())
                    .await;
            }
            Ok(Outcome::Handled)
        })
    })
}

async fn deny(event: &Event, state: &BotState, text: &str) {
    match event {
        Event::Message(msg) => {
            let _ = state.bot.send_message(msg.chat.id, text.to_owned()).await;
        },
        Event::Callback(query) => {
            let _ = state
                .bot
                .answer_callback_query(&query.id)
                .text(text.to_owned())
                .show_alert(true)
                .await;
        },
    }
}
