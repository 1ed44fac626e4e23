//! Two-factor authentication handlers: prompt, QR enrolment, code entry.

use std::time::Duration;

use teloxide::prelude::*;
use teloxide::types::{InputFile, ParseMode};
use tracing::{info, warn};

use bosun_session::{AttemptOutcome, AuthState};

use crate::dispatch::{Event, Outcome};
use crate::handlers::send_html;
use crate::keyboards::{self, ResumeKeyboard};
use crate::render;
use crate::state::BotState;

/// The enrolment QR self-destructs after this long.
const QR_TTL: Duration = Duration::from_secs(60);

/// `Enter 2FA code` — move the caller into `processing` and prompt.
pub(super) async fn enter_code(event: Event, state: BotState) -> anyhow::Result<Outcome> {
    let (Some(chat), Some(user)) = (event.chat_id(), event.user_id()) else {
        return Ok(Outcome::Handled);
    };

    if !state.config.is_admin(user.get()) {
        send_html(&state, chat, render::qr_not_admin()).await;
        return Ok(Outcome::Handled);
    }

    match state.sessions.begin_processing(user).await {
        AuthState::Blocked => {
            send_html(&state, chat, render::totp_blocked(5)).await;
        },
        _ => {
            send_html(&state, chat, render::totp_prompt()).await;
        },
    }
    Ok(Outcome::Handled)
}

/// `/qrcode` and the QR keyboard button — issue the enrolment QR code.
///
/// The image is sent behind a spoiler and deleted after sixty seconds; if
/// deletion fails the caller is told to remove it by hand.
pub(super) async fn send_qrcode(event: Event, state: BotState) -> anyhow::Result<Outcome> {
    let (Some(chat), Some(user)) = (event.chat_id(), event.user_id()) else {
        return Ok(Outcome::Handled);
    };

    if !state.config.is_admin(user.get()) {
        send_html(&state, chat, render::qr_not_admin()).await;
        return Ok(Outcome::Handled);
    }

    let username = event
        .user()
        .and_then(|u| u.username.clone())
        .unwrap_or_default();

    let png = state.totp.qr_png(user.get(), &username)?;
    let sent = state
        .bot
        .send_photo(chat, InputFile::memory(png).file_name("bosun-2fa.png"))
        .caption(render::qr_caption())
        .has_spoiler(true)
        .await?;
    info!(user_id = %user, "enrolment QR code issued");

    // Self-destruct timer; failure downgrades to a manual-delete note.
    let bot = state.bot.clone();
    let message_id = sent.id;
    tokio::spawn(async move {
        tokio::time::sleep(QR_TTL).await;
        if let Err(e) = bot.delete_message(chat, message_id).await {
            warn!(error = %e, "QR code auto-deletion failed");
            let _ = bot.send_message(chat, render::qr_delete_failed()).await;
        }
    });

    Ok(Outcome::Handled)
}

/// A six-digit message (optionally slash-prefixed) — verify the code.
///
/// Passes the event on when the caller is not in `processing`, so six-digit
/// rename targets or plain chatter still reach later handlers.
pub(super) async fn process_code(event: Event, state: BotState) -> anyhow::Result<Outcome> {
    let (Some(chat), Some(user)) = (event.chat_id(), event.user_id()) else {
        return Ok(Outcome::Handled);
    };

    if state.sessions.state(user).await != AuthState::Processing {
        return Ok(Outcome::Pass);
    }

    let code = event
        .text()
        .unwrap_or_default()
        .trim_start_matches('/')
        .to_owned();
    let username = event
        .user()
        .and_then(|u| u.username.clone())
        .unwrap_or_default();

    // The message holds a secret; drop it from the chat, best effort.
    if let Event::Message(msg) = &event {
        let _ = state.bot.delete_message(chat, msg.id).await;
    }

    if state.totp.verify(user.get(), &username, &code)? {
        state.sessions.mark_authenticated(user).await;
        reply_success(&state, chat, user).await;
        return Ok(Outcome::Handled);
    }

    match state.sessions.record_failed_attempt(user).await {
        AttemptOutcome::Retry { attempts } => {
            info!(user_id = %user, attempts, "invalid TOTP code");
            send_html(&state, chat, render::totp_invalid()).await;
        },
        AttemptOutcome::Blocked { until } => {
            warn!(user_id = %user, %until, "TOTP entry blocked");
            send_html(&state, chat, render::totp_blocked(5)).await;
        },
    }
    Ok(Outcome::Handled)
}

/// Success reply, with the referer keyboard when a privileged flow was
/// interrupted by the auth gate.
async fn reply_success(state: &BotState, chat: ChatId, user: bosun_core::UserId) {
    match state.sessions.take_referer(user).await {
        Some(referer) => {
            let text = render::totp_success_with_referer();
            match keyboards::referer_keyboard(&referer) {
                ResumeKeyboard::Inline(markup) => {
                    let _ = state
                        .bot
                        .send_message(chat, text)
                        .parse_mode(ParseMode::Html)
                        .reply_markup(markup)
                        .await;
                },
                ResumeKeyboard::Reply(markup) => {
                    let _ = state
                        .bot
                        .send_message(chat, text)
                        .parse_mode(ParseMode::Html)
                        .reply_markup(markup)
                        .await;
                },
            }
        },
        None => {
            send_html(state, chat, render::totp_success()).await;
        },
    }
}
