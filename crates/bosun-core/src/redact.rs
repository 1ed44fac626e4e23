//! Output sanitisation.
//!
//! Two distinct surfaces are scrubbed before anything leaves the process:
//! exception text that ends up in log lines, and container log text that is
//! echoed back to a Telegram chat. Both replace sensitive substrings with an
//! asterisk run of equal length so the output keeps its shape without
//! betraying even the length class of the secret relative to the message.

use std::sync::OnceLock;

use regex::Regex;

/// ANSI CSI escape sequences as emitted by colourised container logs.
const ANSI_PATTERN: &str = "\x1b\\[[0-?]*[ -/]*[@-~]";

fn ansi_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(ANSI_PATTERN).unwrap_or_else(|_| unreachable!("static pattern")))
}

/// Strip ANSI colour/control escapes from container log output.
#[must_use]
pub fn strip_ansi(input: &str) -> String {
    ansi_re().replace_all(input, "").into_owned()
}

/// Identity of the caller whose traces must not appear in returned logs.
#[derive(Debug, Clone, Default)]
pub struct CallerIdentity {
    /// Telegram username, if set on the account.
    pub username: Option<String>,
    /// First name as reported by the platform.
    pub first_name: Option<String>,
    /// Last name, if present.
    pub last_name: Option<String>,
    /// Numeric user id rendered as a string.
    pub user_id: String,
}

/// Replaces configured secret values with equal-length asterisk runs.
///
/// Built once at startup from the configuration and shared by every
/// component that logs caught errors or returns engine output to a chat.
#[derive(Clone, Default)]
pub struct Redactor {
    secrets: Vec<String>,
}

impl Redactor {
    /// Build a redactor over the given secret values.
    ///
    /// Empty strings are dropped: replacing the empty string would loop on
    /// every position of the input.
    #[must_use]
    pub fn new<I, S>(secrets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut secrets: Vec<String> = secrets
            .into_iter()
            .map(Into::into)
            .filter(|s| !s.is_empty())
            .collect();
        // Longest first, so a secret that contains another secret is masked
        // as one unit instead of leaving a recognisable prefix.
        secrets.sort_by(|a, b| b.len().cmp(&a.len()));
        Self { secrets }
    }

    /// Mask every configured secret occurring in `input`.
    ///
    /// The output has exactly the same length as the input.
    #[must_use]
    pub fn mask(&self, input: &str) -> String {
        let mut out = input.to_owned();
        for secret in &self.secrets {
            if out.contains(secret.as_str()) {
                out = out.replace(secret.as_str(), &"*".repeat(secret.chars().count()));
            }
        }
        out
    }

    /// Sanitise exception text destined for a log line.
    ///
    /// Alias of [`Redactor::mask`]; named separately so call sites read as
    /// what they do.
    #[must_use]
    pub fn scrub_error(&self, error_text: &str) -> String {
        self.mask(error_text)
    }

    /// Sanitise container log text before it is shown to a user.
    ///
    /// Strips ANSI escapes, then masks the caller's username, first name,
    /// last name and numeric id along with every configured secret.
    #[must_use]
    pub fn scrub_container_logs(&self, logs: &str, caller: &CallerIdentity) -> String {
        let mut out = strip_ansi(logs);

        let mut caller_values: Vec<&str> = Vec::with_capacity(4);
        if let Some(username) = caller.username.as_deref() {
            caller_values.push(username);
        }
        if let Some(first) = caller.first_name.as_deref() {
            caller_values.push(first);
        }
        if let Some(last) = caller.last_name.as_deref() {
            caller_values.push(last);
        }
        if !caller.user_id.is_empty() {
            caller_values.push(caller.user_id.as_str());
        }

        for value in caller_values {
            if !value.is_empty() && out.contains(value) {
                out = out.replace(value, &"*".repeat(value.chars().count()));
            }
        }

        self.mask(&out)
    }
}

impl std::fmt::Debug for Redactor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Redactor")
            .field("secrets", &self.secrets.len())
            .finish()
    }
}
