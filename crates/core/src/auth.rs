use serde::{Deserialize, Serialize};

use crate::{AppResult, NonEmptyString};

/// Identity of the user performing a mutation, as forwarded by the auth layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActorIdentity {
    id: NonEmptyString,
    label: String,
}

impl ActorIdentity {
    /// Creates an actor identity. The identifier must not be blank.
    pub fn new(id: impl Into<String>, label: impl Into<String>) -> AppResult<Self> {
        Ok(Self {
            id: NonEmptyString::new(id)?,
            label: label.into(),
        })
    }

    /// Resolves an actor from optional transport values.
    ///
    /// Returns `None` when no usable identifier was supplied, which callers treat
    /// as an unresolvable actor.
    #[must_use]
    pub fn resolve(id: Option<&str>, label: Option<&str>) -> Option<Self> {
        let id = id?.trim();
        let label = label
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .unwrap_or(id);

        Self::new(id, label).ok()
    }

    /// Returns the stable actor identifier.
    #[must_use]
    pub fn id(&self) -> &str {
        self.id.as_str()
    }

    /// Returns the human readable actor label.
    #[must_use]
    pub fn label(&self) -> &str {
        self.label.as_str()
    }
}

/// Optional request metadata captured alongside an audited mutation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestContext {
    /// Caller IP address if available.
    pub ip: Option<String>,
    /// Caller user-agent if available.
    pub user_agent: Option<String>,
}

impl RequestContext {
    /// Returns true when neither value was captured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ip.is_none() && self.user_agent.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::{ActorIdentity, RequestContext};

    #[test]
    fn resolve_rejects_missing_or_blank_identifier() {
        assert!(ActorIdentity::resolve(None, Some("Registrar")).is_none());
        assert!(ActorIdentity::resolve(Some("  "), Some("Registrar")).is_none());
    }

    #[test]
    fn resolve_falls_back_to_identifier_for_label() {
        let actor = ActorIdentity::resolve(Some("user-7"), None);
        assert_eq!(actor.as_ref().map(ActorIdentity::label), Some("user-7"));
    }

    #[test]
    fn empty_context_reports_empty() {
        assert!(RequestContext::default().is_empty());
    }
}
