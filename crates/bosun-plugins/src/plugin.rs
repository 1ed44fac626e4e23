//! The plugin trait and the handler seam towards the bot runtime.

use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;

use crate::error::PluginResult;

/// What fires a plugin handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PluginTrigger {
    /// A slash command, e.g. `/monitoring`.
    Command(String),
    /// An exact keyboard-button text, e.g. `Monitoring`.
    ButtonText(String),
}

/// Invocation context handed to a plugin handler.
#[derive(Debug, Clone)]
pub struct PluginContext {
    /// The caller.
    pub user_id: u64,
    /// The full trigger text.
    pub text: String,
}

/// The reply function of one plugin handler.
///
/// Plugins return rendered HTML text; the runtime owns actually sending it,
/// so plugins never touch the messaging client.
pub type PluginReplyFn =
    Arc<dyn Fn(PluginContext) -> BoxFuture<'static, PluginResult<String>> + Send + Sync>;

/// One handler contributed by a plugin.
#[derive(Clone)]
pub struct PluginHandler {
    /// What fires this handler.
    pub trigger: PluginTrigger,
    /// Short description for the help screen.
    pub description: String,
    /// The reply function.
    pub reply: PluginReplyFn,
}

impl std::fmt::Debug for PluginHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginHandler")
            .field("trigger", &self.trigger)
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}

/// A loaded, running plugin.
#[async_trait]
pub trait BotPlugin: Send + Sync {
    /// The plugin's validated name.
    fn name(&self) -> &str;

    /// Handlers the plugin contributes to the dispatch table.
    fn handlers(&self) -> Vec<PluginHandler>;

    /// Release plugin resources; called once at shutdown or explicit drop.
    async fn cleanup(&self) {}
}
