//! Release check against the public release feed.

use std::time::Duration;

use serde::Deserialize;
use teloxide::prelude::*;
use teloxide::types::ParseMode;
use tracing::warn;

use crate::dispatch::{Event, Outcome};
use crate::handlers::send_html;
use crate::keyboards;
use crate::render;
use crate::state::BotState;

/// Release feed endpoint.
const RELEASES_URL: &str = "https://api.github.com/repos/bosun-ops/bosun/releases/latest";

/// Budget for the whole check.
const CHECK_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Deserialize)]
struct Release {
    tag_name: String,
}

/// `/check_bot_updates`.
pub(super) async fn check_bot_updates(event: Event, state: BotState) -> anyhow::Result<Outcome> {
    let Some(chat) = event.chat_id() else {
        return Ok(Outcome::Handled);
    };

    let current = env!("CARGO_PKG_VERSION");
    let text = match fetch_latest_tag().await {
        Ok(latest_tag) => compare_versions(current, &latest_tag),
        Err(e) => {
            warn!(error = %state.redactor.scrub_error(&e.to_string()), "release check failed");
            render::update_check_failed()
        },
    };

    state
        .bot
        .send_message(chat, text)
        .parse_mode(ParseMode::Html)
        .reply_markup(keyboards::update_keyboard())
        .await?;
    Ok(Outcome::Handled)
}

/// `__how_update__` callback.
pub(super) async fn how_to_update(event: Event, state: BotState) -> anyhow::Result<Outcome> {
    let Event::Callback(query) = &event else {
        return Ok(Outcome::Pass);
    };

    let _ = state.bot.answer_callback_query(&query.id).await;
    if let Some(chat) = event.chat_id() {
        send_html(&state, chat, render::how_to_update()).await;
    }
    Ok(Outcome::Handled)
}

async fn fetch_latest_tag() -> anyhow::Result<String> {
    let client = reqwest::Client::builder()
        .timeout(CHECK_TIMEOUT)
        .user_agent(concat!("bosun/", env!("CARGO_PKG_VERSION")))
        .build()?;
    let release: Release = client
        .get(RELEASES_URL)
        .send()
        .await?
        .error_for_status()?
        .json()
        .await?;
    Ok(release.tag_name)
}

/// Classify the running version against the newest published tag.
fn compare_versions(current: &str, latest_tag: &str) -> String {
    let latest = latest_tag.trim_start_matches('v');
    match (
        semver::Version::parse(current),
        semver::Version::parse(latest),
    ) {
        (Ok(ours), Ok(theirs)) => {
            if ours == theirs {
                render::update_in_date(current)
            } else if ours < theirs {
                render::update_available(current, latest)
            } else {
                render::update_ahead(current, latest)
            }
        },
        _ => render::update_check_failed(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equal_versions_are_in_date() {
        let text = compare_versions("1.2.3", "v1.2.3");
        assert!(text.contains("latest release"));
    }

    #[test]
    fn older_version_sees_the_update() {
        let text = compare_versions("1.2.3", "v1.3.0");
        assert!(text.contains("v1.3.0"));
        assert!(text.contains("1.2.3"));
    }

    #[test]
    fn newer_version_is_flagged_as_ahead() {
        let text = compare_versions("2.0.0", "v1.9.9");
        assert!(text.contains("ahead"));
    }

    #[test]
    fn unparseable_tag_reports_failure() {
        let text = compare_versions("1.2.3", "not-a-version");
        assert_eq!(text, render::update_check_failed());
    }
}
