//! General and host-metric handlers.

use teloxide::prelude::*;
use teloxide::types::ParseMode;

use crate::dispatch::{Event, Outcome};
use crate::handlers::send_html;
use crate::keyboards;
use crate::render;
use crate::state::BotState;

/// `/start` — welcome plus the main keyboard.
pub(super) async fn start(event: Event, state: BotState) -> anyhow::Result<Outcome> {
    let Some(chat) = event.chat_id() else {
        return Ok(Outcome::Handled);
    };
    let first_name = event
        .user()
        .map_or_else(|| "operator".to_owned(), |u| u.first_name.clone());

    state
        .bot
        .send_message(chat, render::welcome(&first_name))
        .parse_mode(ParseMode::Html)
        .reply_markup(keyboards::main_keyboard())
        .await?;
    Ok(Outcome::Handled)
}

/// `/help`.
pub(super) async fn help(event: Event, state: BotState) -> anyhow::Result<Outcome> {
    let Some(chat) = event.chat_id() else {
        return Ok(Outcome::Handled);
    };
    send_html(&state, chat, render::help()).await;
    Ok(Outcome::Handled)
}

/// `/back` and the `Back to main menu` button.
pub(super) async fn back(event: Event, state: BotState) -> anyhow::Result<Outcome> {
    let Some(chat) = event.chat_id() else {
        return Ok(Outcome::Handled);
    };
    state
        .bot
        .send_message(chat, "Main menu 👇")
        .reply_markup(keyboards::main_keyboard())
        .await?;
    Ok(Outcome::Handled)
}

/// `About me`.
pub(super) async fn about(event: Event, state: BotState) -> anyhow::Result<Outcome> {
    let Some(chat) = event.chat_id() else {
        return Ok(Outcome::Handled);
    };
    send_html(&state, chat, render::about()).await;
    Ok(Outcome::Handled)
}

/// Fallback echo; registered last and consumes anything left over.
pub(super) async fn echo(event: Event, state: BotState) -> anyhow::Result<Outcome> {
    let Some(chat) = event.chat_id() else {
        return Ok(Outcome::Handled);
    };
    send_html(&state, chat, render::echo()).await;
    Ok(Outcome::Handled)
}

/// `Load average`.
pub(super) async fn load_average(event: Event, state: BotState) -> anyhow::Result<Outcome> {
    let Some(chat) = event.chat_id() else {
        return Ok(Outcome::Handled);
    };
    let load = state.system.load_average();
    send_html(&state, chat, render::load_average(&load)).await;
    Ok(Outcome::Handled)
}

/// `Memory load`, with the swap drill-down button.
pub(super) async fn memory(event: Event, state: BotState) -> anyhow::Result<Outcome> {
    let Some(chat) = event.chat_id() else {
        return Ok(Outcome::Handled);
    };
    let snapshot = state.system.memory();
    state
        .bot
        .send_message(chat, render::memory(&snapshot))
        .parse_mode(ParseMode::Html)
        .reply_markup(keyboards::memory_keyboard())
        .await?;
    Ok(Outcome::Handled)
}

/// `__swap_info__` callback.
pub(super) async fn swap_info(event: Event, state: BotState) -> anyhow::Result<Outcome> {
    let Event::Callback(query) = &event else {
        return Ok(Outcome::Pass);
    };
    let snapshot = state.system.swap();

    let _ = state.bot.answer_callback_query(&query.id).await;
    if let Some(message) = &query.message {
        state
            .bot
            .edit_message_text(message.chat().id, message.id(), render::swap(&snapshot))
            .parse_mode(ParseMode::Html)
            .await?;
    }
    Ok(Outcome::Handled)
}

/// `Sensors`.
pub(super) async fn sensors(event: Event, state: BotState) -> anyhow::Result<Outcome> {
    let Some(chat) = event.chat_id() else {
        return Ok(Outcome::Handled);
    };
    let readings = state.system.sensors();
    send_html(&state, chat, render::sensors(&readings)).await;
    Ok(Outcome::Handled)
}

/// `Process`.
pub(super) async fn process(event: Event, state: BotState) -> anyhow::Result<Outcome> {
    let Some(chat) = event.chat_id() else {
        return Ok(Outcome::Handled);
    };
    let counts = state.system.processes();
    send_html(&state, chat, render::processes(&counts)).await;
    Ok(Outcome::Handled)
}

/// `Uptime`.
pub(super) async fn uptime(event: Event, state: BotState) -> anyhow::Result<Outcome> {
    let Some(chat) = event.chat_id() else {
        return Ok(Outcome::Handled);
    };
    let uptime = state.system.uptime();
    send_html(&state, chat, render::uptime(&uptime)).await;
    Ok(Outcome::Handled)
}

/// `File system`.
pub(super) async fn file_system(event: Event, state: BotState) -> anyhow::Result<Outcome> {
    let Some(chat) = event.chat_id() else {
        return Ok(Outcome::Handled);
    };
    let disks = state.system.disks();
    send_html(&state, chat, render::file_systems(&disks)).await;
    Ok(Outcome::Handled)
}

/// `Network`.
pub(super) async fn network(event: Event, state: BotState) -> anyhow::Result<Outcome> {
    let Some(chat) = event.chat_id() else {
        return Ok(Outcome::Handled);
    };
    let interfaces = state.system.network();
    send_html(&state, chat, render::network(&interfaces)).await;
    Ok(Outcome::Handled)
}
