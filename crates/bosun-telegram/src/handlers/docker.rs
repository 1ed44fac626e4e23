//! Container and image handlers.

use teloxide::prelude::*;
use teloxide::types::ParseMode;
use tracing::{error, warn};

use bosun_crypto::{CallbackCodec, CallbackPayload};
use bosun_docker::{ContainerAction, DockerError};

use crate::dispatch::{Event, Outcome};
use crate::handlers::send_html;
use crate::keyboards;
use crate::render;
use crate::state::BotState;

/// `/docker` and the `Docker` button — overview plus the Docker keyboard.
pub(super) async fn overview(event: Event, state: BotState) -> anyhow::Result<Outcome> {
    let Some(chat) = event.chat_id() else {
        return Ok(Outcome::Handled);
    };

    let text = match state.docker.docker_counters().await {
        Ok(counters) => render::docker_overview(&counters),
        Err(e) => {
            warn!(error = %state.redactor.scrub_error(&e.to_string()), "docker overview failed");
            render::docker_unavailable()
        },
    };
    state
        .bot
        .send_message(chat, text)
        .parse_mode(ParseMode::Html)
        .reply_markup(keyboards::docker_keyboard())
        .await?;
    Ok(Outcome::Handled)
}

/// `/containers` and the `Containers` button.
pub(super) async fn containers(event: Event, state: BotState) -> anyhow::Result<Outcome> {
    let (Some(chat), Some(user)) = (event.chat_id(), event.user_id()) else {
        return Ok(Outcome::Handled);
    };

    match state.docker.list_containers().await {
        Ok(summaries) => {
            let names: Vec<String> = summaries.iter().map(|s| s.name.to_lowercase()).collect();
            state
                .bot
                .send_message(chat, render::containers(&summaries))
                .parse_mode(ParseMode::Html)
                .reply_markup(keyboards::containers_keyboard(&names, user.get()))
                .await?;
        },
        Err(e) => {
            warn!(error = %state.redactor.scrub_error(&e.to_string()), "container listing failed");
            send_html(&state, chat, render::docker_unavailable()).await;
        },
    }
    Ok(Outcome::Handled)
}

/// `/images` and the `Images` button.
pub(super) async fn images(event: Event, state: BotState) -> anyhow::Result<Outcome> {
    let Some(chat) = event.chat_id() else {
        return Ok(Outcome::Handled);
    };

    match state.docker.list_images().await {
        Ok(records) => send_html(&state, chat, render::images(&records)).await,
        Err(e) => {
            warn!(error = %state.redactor.scrub_error(&e.to_string()), "image listing failed");
            send_html(&state, chat, render::docker_unavailable()).await;
        },
    }
    Ok(Outcome::Handled)
}

/// `__get_full__:<name>:<uid>` — the full-details screen.
pub(super) async fn container_full(event: Event, state: BotState) -> anyhow::Result<Outcome> {
    let Event::Callback(query) = &event else {
        return Ok(Outcome::Pass);
    };
    let Some((name, issued_for)) = split_callback(query.data.as_deref()) else {
        return Ok(Outcome::Pass);
    };

    let stats = match state.docker.container_stats(&name).await {
        Ok(stats) => stats,
        Err(DockerError::NotFound { .. }) => {
            answer_alert(&state, &query.id, format!("{name}: Container not found")).await;
            return Ok(Outcome::Handled);
        },
        Err(e) => {
            error!(error = %state.redactor.scrub_error(&e.to_string()), "container stats failed");
            answer_alert(&state, &query.id, format!("{name}: Error getting container details"))
                .await;
            return Ok(Outcome::Handled);
        },
    };

    let caller = query.from.id.0;
    let include_manage = state.config.is_admin(caller) && Some(caller) == issued_for;

    let _ = state.bot.answer_callback_query(&query.id).await;
    if let Some(message) = &query.message {
        state
            .bot
            .edit_message_text(
                message.chat().id,
                message.id(),
                render::container_full(&name, &stats),
            )
            .parse_mode(ParseMode::Html)
            .reply_markup(keyboards::container_detail_keyboard(&name, caller, include_manage))
            .await?;
    }
    Ok(Outcome::Handled)
}

/// `__get_logs__:<name>:<uid>` — sanitized log tail.
pub(super) async fn container_logs(event: Event, state: BotState) -> anyhow::Result<Outcome> {
    let Event::Callback(query) = &event else {
        return Ok(Outcome::Pass);
    };
    let Some((name, _)) = split_callback(query.data.as_deref()) else {
        return Ok(Outcome::Pass);
    };

    let logs = match state
        .docker
        .fetch_logs(&name, &event.caller_identity())
        .await
    {
        Ok(logs) if !logs.trim().is_empty() => logs,
        Ok(_) | Err(DockerError::NotFound { .. }) => {
            answer_alert(&state, &query.id, format!("{name}: Error getting logs")).await;
            return Ok(Outcome::Handled);
        },
        Err(e) => {
            error!(error = %state.redactor.scrub_error(&e.to_string()), "log fetch failed");
            answer_alert(&state, &query.id, format!("{name}: Error getting logs")).await;
            return Ok(Outcome::Handled);
        },
    };

    let _ = state.bot.answer_callback_query(&query.id).await;
    if let Some(message) = &query.message {
        state
            .bot
            .edit_message_text(
                message.chat().id,
                message.id(),
                render::container_logs(&name, &logs),
            )
            .parse_mode(ParseMode::Html)
            .reply_markup(keyboards::back_to_containers_keyboard())
            .await?;
    }
    Ok(Outcome::Handled)
}

/// `back_to_containers` — refresh and return to the listing.
pub(super) async fn back_to_containers(event: Event, state: BotState) -> anyhow::Result<Outcome> {
    let Event::Callback(query) = &event else {
        return Ok(Outcome::Pass);
    };

    let summaries = match state.docker.list_containers().await {
        Ok(summaries) => summaries,
        Err(e) => {
            warn!(error = %state.redactor.scrub_error(&e.to_string()), "container listing failed");
            answer_alert(&state, &query.id, render::docker_unavailable()).await;
            return Ok(Outcome::Handled);
        },
    };
    let names: Vec<String> = summaries.iter().map(|s| s.name.to_lowercase()).collect();

    let _ = state.bot.answer_callback_query(&query.id).await;
    if let Some(message) = &query.message {
        state
            .bot
            .edit_message_text(message.chat().id, message.id(), render::containers(&summaries))
            .parse_mode(ParseMode::Html)
            .reply_markup(keyboards::containers_keyboard(&names, query.from.id.0))
            .await?;
    }
    Ok(Outcome::Handled)
}

/// `__manage__:<name>:<uid>` — the action menu (behind the 2FA gate).
pub(super) async fn manage_menu(event: Event, state: BotState) -> anyhow::Result<Outcome> {
    let Event::Callback(query) = &event else {
        return Ok(Outcome::Pass);
    };
    let Some((name, issued_for)) = split_callback(query.data.as_deref()) else {
        return Ok(Outcome::Pass);
    };

    let caller = query.from.id.0;
    if Some(caller) != issued_for {
        error!(user_id = caller, container = %name, "DENIED: manage menu for another user's button");
        answer_alert(&state, &query.id, format!("Managing {name}: Access denied")).await;
        return Ok(Outcome::Handled);
    }

    let actions = [
        ("Start", "start"),
        ("Stop", "stop"),
        ("Restart", "restart"),
        ("Rename", "rename"),
    ]
    .into_iter()
    .map(|(label, action)| {
        (label.to_owned(), action_callback_data(&state.codec, action, &name, caller))
    })
    .collect();

    let _ = state.bot.answer_callback_query(&query.id).await;
    if let Some(message) = &query.message {
        state
            .bot
            .edit_message_text(message.chat().id, message.id(), render::manage_menu(&name))
            .parse_mode(ParseMode::Html)
            .reply_markup(keyboards::manage_actions_keyboard(actions))
            .await?;
    }
    Ok(Outcome::Handled)
}

/// Signed manage-action callbacks (behind the 2FA gate).
pub(super) async fn manage_action_signed(event: Event, state: BotState) -> anyhow::Result<Outcome> {
    let Event::Callback(query) = &event else {
        return Ok(Outcome::Pass);
    };
    let Some(data) = query.data.as_deref() else {
        return Ok(Outcome::Pass);
    };

    let caller = u32::try_from(query.from.id.0).ok();
    let payload = match state.codec.decode(data, caller) {
        Ok(payload) => payload,
        Err(e) => {
            warn!(error = %e, "signed callback rejected");
            answer_alert(&state, &query.id, "Invalid or expired button".to_owned()).await;
            return Ok(Outcome::Handled);
        },
    };

    let Some(container) = payload.param("c").map(str::to_owned) else {
        answer_alert(&state, &query.id, "Invalid or expired button".to_owned()).await;
        return Ok(Outcome::Handled);
    };
    let Some(action) = parse_action(&payload.action) else {
        answer_alert(&state, &query.id, "Invalid or expired button".to_owned()).await;
        return Ok(Outcome::Handled);
    };

    run_action(&event, &state, &container, action).await;
    Ok(Outcome::Handled)
}

/// Plain `__start__:…`-style manage callbacks (behind the 2FA gate).
pub(super) async fn manage_action_plain(event: Event, state: BotState) -> anyhow::Result<Outcome> {
    let Event::Callback(query) = &event else {
        return Ok(Outcome::Pass);
    };
    let Some(data) = query.data.as_deref() else {
        return Ok(Outcome::Pass);
    };

    let mut parts = data.splitn(3, ':');
    let prefix = parts.next().unwrap_or_default();
    let Some(action) = parse_action(prefix.trim_matches('_')) else {
        return Ok(Outcome::Pass);
    };
    let Some(container) = parts.next().map(str::to_owned) else {
        return Ok(Outcome::Pass);
    };
    let issued_for = parts.next().and_then(|raw| raw.parse::<u64>().ok());

    let caller = query.from.id.0;
    if Some(caller) != issued_for {
        error!(user_id = caller, container = %container, "DENIED: action button for another user");
        answer_alert(&state, &query.id, format!("Managing {container}: Access denied")).await;
        return Ok(Outcome::Handled);
    }

    run_action(&event, &state, &container, action).await;
    Ok(Outcome::Handled)
}

/// A plain text message while a rename prompt is outstanding for the chat.
pub(super) async fn pending_rename(event: Event, state: BotState) -> anyhow::Result<Outcome> {
    let Event::Message(msg) = &event else {
        return Ok(Outcome::Pass);
    };
    let Some(user) = event.user_id() else {
        return Ok(Outcome::Pass);
    };

    let container = {
        let mut pending = state.pending_renames.lock().await;
        match pending.remove(&msg.chat.id) {
            Some(container) => container,
            None => return Ok(Outcome::Pass),
        }
    };

    let new_name = msg.text().unwrap_or_default().trim().to_owned();
    let reply = match state
        .docker
        .manage(user, &container, ContainerAction::Rename, Some(&new_name))
        .await
    {
        Ok(()) => format!("Renaming {container}: Success"),
        Err(DockerError::InvalidRename { .. }) => format!("Renaming {container}: Invalid new name"),
        Err(DockerError::PermissionDenied { .. }) => {
            format!("Renaming {container}: Access denied")
        },
        Err(DockerError::NotFound { .. }) => format!("{container}: Container not found"),
        Err(e) => {
            error!(error = %state.redactor.scrub_error(&e.to_string()), "rename failed");
            format!("Renaming {container}: Error occurred. See logs")
        },
    };
    send_html(&state, msg.chat.id, render::html_escape(&reply)).await;
    Ok(Outcome::Handled)
}

// ---------------------------------------------------------------------------
// helpers
// ---------------------------------------------------------------------------

/// `__prefix__:<name>:<uid>` → `(name, uid)`.
fn split_callback(data: Option<&str>) -> Option<(String, Option<u64>)> {
    let mut parts = data?.splitn(3, ':');
    let _prefix = parts.next()?;
    let name = parts.next()?.to_owned();
    if name.is_empty() {
        return None;
    }
    let issued_for = parts.next().and_then(|raw| raw.parse::<u64>().ok());
    Some((name, issued_for))
}

fn parse_action(raw: &str) -> Option<ContainerAction> {
    match raw {
        "start" => Some(ContainerAction::Start),
        "stop" => Some(ContainerAction::Stop),
        "restart" => Some(ContainerAction::Restart),
        "rename" => Some(ContainerAction::Rename),
        _ => None,
    }
}

const fn gerund(action: ContainerAction) -> &'static str {
    match action {
        ContainerAction::Start => "Starting",
        ContainerAction::Stop => "Stopping",
        ContainerAction::Restart => "Restarting",
        ContainerAction::Rename => "Renaming",
    }
}

/// Build callback data for one manage action: a signed payload when it
/// fits, the readable prefix form otherwise (long container names exceed
/// the codec's value budget).
fn action_callback_data(codec: &CallbackCodec, action: &str, container: &str, caller: u64) -> String {
    let payload = CallbackPayload::new(
        action,
        &[("c", container)],
        u32::try_from(caller).ok(),
    );
    match codec.encode(&payload) {
        Ok(encoded) => encoded,
        Err(e) => {
            warn!(error = %e, container, "signed callback did not fit, using plain form");
            format!("__{action}__:{container}:{caller}")
        },
    }
}

/// Run one mutating action and answer the callback with the outcome.
async fn run_action(
    event: &Event,
    state: &BotState,
    container: &str,
    action: ContainerAction,
) {
    let Event::Callback(query) = event else {
        return;
    };
    let Some(user) = event.user_id() else {
        return;
    };

    // Rename needs a follow-up message with the target name.
    if action == ContainerAction::Rename {
        if let Some(message) = &query.message {
            let mut pending = state.pending_renames.lock().await;
            pending.insert(message.chat().id, container.to_owned());
        }
        let _ = state.bot.answer_callback_query(&query.id).await;
        if let Some(message) = &query.message {
            let _ = state
                .bot
                .send_message(message.chat().id, render::rename_prompt(container))
                .parse_mode(ParseMode::Html)
                .await;
        }
        return;
    }

    let verb = gerund(action);
    let reply = match state.docker.manage(user, container, action, None).await {
        Ok(()) => format!("{verb} {container}: Success"),
        Err(DockerError::PermissionDenied { .. }) => {
            format!("Managing {container}: Access denied")
        },
        Err(DockerError::NotFound { .. }) => format!("{container}: Container not found"),
        Err(DockerError::RestartTimeout { .. }) => {
            format!("{verb} {container}: Container did not reach running state")
        },
        Err(e) => {
            error!(error = %state.redactor.scrub_error(&e.to_string()), "container action failed");
            format!("{verb} {container}: Error occurred. See logs")
        },
    };
    answer_alert(state, &query.id, reply).await;
}

async fn answer_alert(state: &BotState, query_id: &str, text: impl Into<String>) {
    let _ = state
        .bot
        .answer_callback_query(query_id)
        .text(text.into())
        .show_alert(true)
        .await;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_callback_extracts_name_and_user() {
        assert_eq!(
            split_callback(Some("__get_full__:nginx:42")),
            Some(("nginx".to_owned(), Some(42)))
        );
        assert_eq!(
            split_callback(Some("__get_logs__:web:")),
            Some(("web".to_owned(), None))
        );
        assert_eq!(split_callback(Some("__manage__:")), None);
        assert_eq!(split_callback(None), None);
    }

    #[test]
    fn parse_action_covers_the_four_verbs() {
        assert_eq!(parse_action("start"), Some(ContainerAction::Start));
        assert_eq!(parse_action("stop"), Some(ContainerAction::Stop));
        assert_eq!(parse_action("restart"), Some(ContainerAction::Restart));
        assert_eq!(parse_action("rename"), Some(ContainerAction::Rename));
        assert_eq!(parse_action("destroy"), None);
    }

    #[test]
    fn action_callback_data_signs_when_it_fits() {
        let codec = CallbackCodec::from_secret(b"salt");
        let data = action_callback_data(&codec, "start", "nginx", 42);
        assert!(CallbackCodec::looks_signed(&data));
        assert!(data.len() <= 64);
    }

    #[test]
    fn action_callback_data_falls_back_for_long_names() {
        let codec = CallbackCodec::from_secret(b"salt");
        let long = "a-container-name-well-beyond-the-value-budget";
        let data = action_callback_data(&codec, "start", long, 42);
        assert_eq!(data, format!("__start__:{long}:42"));
    }
}
