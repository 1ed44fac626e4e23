//! Handler implementations and registry assembly.
//!
//! Registration order is part of the contract: message handlers, then
//! callback handlers, then plugin handlers, and the fallback echo strictly
//! last so it never shadows a specific trigger.

mod auth;
mod default;
mod docker;
mod updates;

use std::future::Future;
use std::sync::Arc;

use regex::Regex;
use teloxide::prelude::*;
use teloxide::types::ParseMode;
use tracing::warn;

use bosun_plugins::{PluginContext, PluginTrigger};

use crate::dispatch::{Event, HandlerFn, HandlerRegistry, Outcome, Trigger};
use crate::gate::require_totp;
use crate::state::BotState;

/// Lift an async fn into a [`HandlerFn`].
pub(crate) fn wrap<F, Fut>(f: F) -> HandlerFn
where
    F: Fn(Event, BotState) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<Outcome>> + Send + 'static,
{
    Arc::new(move |event, state| Box::pin(f(event, state)))
}

/// Send an HTML-mode message, best effort.
pub(crate) async fn send_html(state: &BotState, chat: ChatId, text: String) {
    let _ = state
        .bot
        .send_message(chat, text)
        .parse_mode(ParseMode::Html)
        .await;
}

/// Build the full dispatch table.
pub async fn build_registry(state: &BotState) -> HandlerRegistry {
    let mut registry = HandlerRegistry::new();

    // --- message handlers -------------------------------------------------
    registry.push("start", Trigger::Command("/start".into()), wrap(default::start));
    registry.push("help", Trigger::Command("/help".into()), wrap(default::help));
    registry.push("back", Trigger::Command("/back".into()), wrap(default::back));
    registry.push(
        "back_button",
        Trigger::TextFragment("Back to main menu".into()),
        wrap(default::back),
    );
    registry.push(
        "docker_overview",
        Trigger::Command("/docker".into()),
        wrap(docker::overview),
    );
    registry.push(
        "docker_button",
        Trigger::TextFragment("Docker".into()),
        wrap(docker::overview),
    );
    registry.push(
        "containers",
        Trigger::Command("/containers".into()),
        wrap(docker::containers),
    );
    registry.push(
        "containers_button",
        Trigger::TextFragment("Containers".into()),
        wrap(docker::containers),
    );
    registry.push(
        "images",
        Trigger::Command("/images".into()),
        wrap(docker::images),
    );
    registry.push(
        "images_button",
        Trigger::TextFragment("Images".into()),
        wrap(docker::images),
    );
    registry.push(
        "qrcode",
        Trigger::Command("/qrcode".into()),
        wrap(auth::send_qrcode),
    );
    registry.push(
        "qrcode_button",
        Trigger::TextFragment("Get QR-code for 2FA app".into()),
        wrap(auth::send_qrcode),
    );
    registry.push(
        "check_updates",
        Trigger::Command("/check_bot_updates".into()),
        wrap(updates::check_bot_updates),
    );
    registry.push(
        "load_average",
        Trigger::TextFragment("Load average".into()),
        wrap(default::load_average),
    );
    registry.push(
        "memory",
        Trigger::TextFragment("Memory load".into()),
        wrap(default::memory),
    );
    registry.push(
        "sensors",
        Trigger::TextFragment("Sensors".into()),
        wrap(default::sensors),
    );
    registry.push(
        "process",
        Trigger::TextFragment("Process".into()),
        wrap(default::process),
    );
    registry.push(
        "uptime",
        Trigger::TextFragment("Uptime".into()),
        wrap(default::uptime),
    );
    registry.push(
        "file_system",
        Trigger::TextFragment("File system".into()),
        wrap(default::file_system),
    );
    registry.push(
        "network",
        Trigger::TextFragment("Network".into()),
        wrap(default::network),
    );
    registry.push(
        "about",
        Trigger::TextFragment("About me".into()),
        wrap(default::about),
    );
    registry.push(
        "enter_totp",
        Trigger::TextFragment("Enter 2FA code".into()),
        wrap(auth::enter_code),
    );
    registry.push(
        "totp_code",
        Trigger::TextRegex(totp_code_regex()),
        wrap(auth::process_code),
    );
    registry.push(
        "pending_rename",
        Trigger::AnyMessage,
        wrap(docker::pending_rename),
    );

    // --- callback handlers ------------------------------------------------
    registry.push(
        "container_full",
        Trigger::CallbackPrefix("__get_full__:".into()),
        wrap(docker::container_full),
    );
    registry.push(
        "container_logs",
        Trigger::CallbackPrefix("__get_logs__:".into()),
        wrap(docker::container_logs),
    );
    registry.push(
        "back_to_containers",
        Trigger::CallbackExact("back_to_containers".into()),
        wrap(docker::back_to_containers),
    );
    registry.push(
        "manage_menu",
        Trigger::CallbackPrefix("__manage__:".into()),
        require_totp(wrap(docker::manage_menu)),
    );
    registry.push(
        "manage_action_signed",
        Trigger::SignedCallback,
        require_totp(wrap(docker::manage_action_signed)),
    );
    for prefix in ["__start__:", "__stop__:", "__restart__:", "__rename__:"] {
        registry.push(
            format!("manage_action{prefix}"),
            Trigger::CallbackPrefix(prefix.into()),
            require_totp(wrap(docker::manage_action_plain)),
        );
    }
    registry.push(
        "how_update",
        Trigger::CallbackExact("__how_update__".into()),
        wrap(updates::how_to_update),
    );
    registry.push(
        "swap_info",
        Trigger::CallbackExact("__swap_info__".into()),
        wrap(default::swap_info),
    );

    // --- plugin handlers --------------------------------------------------
    for (plugin, handler) in state.plugins.handlers().await {
        let trigger = match &handler.trigger {
            PluginTrigger::Command(cmd) => Trigger::Command(cmd.clone()),
            PluginTrigger::ButtonText(text) => Trigger::TextFragment(text.clone()),
        };
        let reply = Arc::clone(&handler.reply);
        let plugin_name = plugin.clone();
        let handler_fn: HandlerFn = Arc::new(move |event: Event, state: BotState| {
            let reply = Arc::clone(&reply);
            let plugin_name = plugin_name.clone();
            Box::pin(async move {
                let Some(chat) = event.chat_id() else {
                    return Ok(Outcome::Handled);
                };
                let context = PluginContext {
                    user_id: event.user_id().map(|u| u.get()).unwrap_or_default(),
                    text: event.trigger_data().to_owned(),
                };
                match reply(context).await {
                    Ok(text) => send_html(&state, chat, text).await,
                    Err(e) => {
                        warn!(plugin = %plugin_name, error = %e, "plugin handler failed");
                        send_html(&state, chat, crate::render::internal_error()).await;
                    },
                }
                Ok(Outcome::Handled)
            })
        });
        registry.push(format!("plugin:{plugin}"), trigger, handler_fn);
    }

    // --- fallback, strictly last ------------------------------------------
    registry.push("echo", Trigger::AnyMessage, wrap(default::echo));

    registry
}

fn totp_code_regex() -> Regex {
    Regex::new(r"^/?\d{6}$").unwrap_or_else(|_| unreachable!("static pattern"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use bosun_config::BotConfig;

    fn test_state() -> BotState {
        let config: BotConfig = serde_yaml::from_str(
            r#"
bot_token:
  prod_token: ["test-token"]
access_control:
  allowed_user_ids: [42]
  allowed_admins_ids: [42]
  auth_salt: ["salt"]
"#,
        )
        .unwrap();
        BotState::new(
            teloxide::Bot::new("0000000000:TESTTESTTESTTESTTESTTESTTESTTESTTES"),
            config,
            std::env::temp_dir().join("bosun-test-plugins"),
            bosun_config::SecretBox::new("test-token"),
        )
    }

    #[tokio::test]
    async fn echo_is_registered_last() {
        let state = test_state();
        let registry = build_registry(&state).await;
        assert!(!registry.is_empty());
        assert!(registry.len() > 20);
        assert_eq!(registry.last_name(), Some("echo"));
    }
}
