//! The middleware pipeline: AccessControl, then RateLimit.
//!
//! Each middleware may short-circuit the update before it reaches the
//! handler registry. Order matters and is fixed at launch.

use async_trait::async_trait;
use teloxide::prelude::*;
use tracing::{debug, warn};

use bosun_session::AccessVerdict;

use crate::dispatch::Event;
use crate::render;
use crate::state::BotState;

/// Whether the update continues down the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Keep going.
    Continue,
    /// Drop the update; the middleware already replied if it wanted to.
    Drop,
}

/// One pipeline stage.
#[async_trait]
pub trait Middleware: Send + Sync {
    /// Stage name for logs.
    fn name(&self) -> &'static str;

    /// Inspect the update; may reply and short-circuit.
    async fn handle(&self, event: &Event, state: &BotState) -> Verdict;
}

/// Allow-listing with escalating blocks (first stage).
#[derive(Debug, Default, Clone, Copy)]
pub struct AccessControl;

#[async_trait]
impl Middleware for AccessControl {
    fn name(&self) -> &'static str {
        "access_control"
    }

    async fn handle(&self, event: &Event, state: &BotState) -> Verdict {
        let Some(user) = event.user_id() else {
            warn!("update without a sender dropped");
            return Verdict::Drop;
        };

        let allow_listed = state.config.is_user_allowed(user.get());
        match state.access.assess(user, allow_listed).await {
            AccessVerdict::Allowed => Verdict::Continue,
            AccessVerdict::Blocked => Verdict::Drop,
            AccessVerdict::Refused { rejection, .. } => {
                let text = if rejection <= 1 {
                    render::access_refused_terse()
                } else {
                    render::access_refused_final()
                };
                if let Some(chat) = event.chat_id() {
                    let _ = state.bot.send_message(chat, text).await;
                }
                Verdict::Drop
            },
        }
    }
}

/// Sliding-window throttle (second stage).
#[derive(Debug, Default, Clone, Copy)]
pub struct RateLimit;

#[async_trait]
impl Middleware for RateLimit {
    fn name(&self) -> &'static str {
        "rate_limit"
    }

    async fn handle(&self, event: &Event, state: &BotState) -> Verdict {
        let Some(user) = event.user_id() else {
            return Verdict::Drop;
        };

        if state.rate.try_acquire(user).await {
            return Verdict::Continue;
        }

        match event {
            Event::Message(msg) => {
                let _ = state.bot.send_message(msg.chat.id, render::slow_down()).await;
            },
            Event::Callback(query) => {
                let _ = state
                    .bot
                    .answer_callback_query(&query.id)
                    .text(render::slow_down())
                    .await;
            },
        }
        Verdict::Drop
    }
}

/// The fixed pipeline: returns `true` when the update may proceed.
pub async fn run_pipeline(event: &Event, state: &BotState) -> bool {
    let stages: [&dyn Middleware; 2] = [&AccessControl, &RateLimit];
    for stage in stages {
        if stage.handle(event, state).await == Verdict::Drop {
            debug!(stage = stage.name(), "update short-circuited by middleware");
            return false;
        }
    }
    true
}
