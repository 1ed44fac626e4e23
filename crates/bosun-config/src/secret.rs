//! Secret values that never leak through `Debug` or serialisation.

use std::fmt;

use serde::de::{self, Deserializer, SeqAccess, Visitor};
use serde::{Deserialize, Serialize, Serializer};

/// A secret string loaded from the config file.
///
/// `Debug` prints `***` regardless of content, and serialisation emits the
/// same placeholder, so a dumped config can never disclose a token or salt.
/// The YAML form accepts either a bare string or a one-element list (the
/// historical config template wraps every secret in a list).
#[derive(Clone, PartialEq, Eq, Default)]
pub struct SecretBox(String);

impl SecretBox {
    /// Wrap a secret value.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Access the underlying secret.
    ///
    /// The spelled-out name keeps accidental exposure visible in review.
    #[must_use]
    pub fn expose_secret(&self) -> &str {
        &self.0
    }

    /// Whether the secret is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for SecretBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("***")
    }
}

impl Serialize for SecretBox {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str("***")
    }
}

impl<'de> Deserialize<'de> for SecretBox {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct SecretVisitor;

        impl<'de> Visitor<'de> for SecretVisitor {
            type Value = SecretBox;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a secret string or a one-element list of strings")
            }

            fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                Ok(SecretBox::new(value))
            }

            fn visit_seq<A>(self, mut seq: A) -> Result<Self::Value, A::Error>
            where
                A: SeqAccess<'de>,
            {
                let first: Option<String> = seq.next_element()?;
                // Drain any extra elements so the deserializer stays consistent.
                while seq.next_element::<de::IgnoredAny>()?.is_some() {}
                Ok(SecretBox::new(first.unwrap_or_default()))
            }
        }

        deserializer.deserialize_any(SecretVisitor)
    }
}
