//! Well-known JSON-RPC method/notification names the session engine treats
//! specially, plus the mapping from a `*ListChanged`/`updated` notification
//! to the capability that must have been advertised before it is sent.

/// The `initialize` request method.
pub const INITIALIZE: &str = "initialize";
/// The `notifications/initialized` notification method.
pub const INITIALIZED: &str = "notifications/initialized";
/// The `notifications/cancelled` notification method.
pub const CANCELLED: &str = "notifications/cancelled";
/// The `notifications/progress` notification method.
pub const PROGRESS: &str = "notifications/progress";
/// The `ping` request method.
pub const PING: &str = "ping";
/// The `notifications/message` logging notification method.
pub const LOGGING_MESSAGE: &str = "notifications/message";

const TOOLS_LIST_CHANGED: &str = "notifications/tools/list_changed";
const RESOURCES_LIST_CHANGED: &str = "notifications/resources/list_changed";
const PROMPTS_LIST_CHANGED: &str = "notifications/prompts/list_changed";
const ROOTS_LIST_CHANGED: &str = "notifications/roots/list_changed";
const RESOURCES_UPDATED: &str = "notifications/resources/updated";

/// A notification that must not be sent unless a particular capability was
/// advertised during the handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CapabilityGatedNotification {
    /// Requires the server's `tools.listChanged`.
    ToolsListChanged,
    /// Requires the server's `resources.listChanged`.
    ResourcesListChanged,
    /// Requires the server's `prompts.listChanged`.
    PromptsListChanged,
    /// Requires the client's `roots.listChanged`.
    RootsListChanged,
    /// Requires the server's `resources.subscribe`.
    ResourcesUpdated,
}

impl CapabilityGatedNotification {
    /// The human-readable capability name, for use in the rejection error
    /// message the spec requires ("fails with an error whose message names
    /// the missing capability").
    #[must_use]
    pub fn capability_name(self) -> &'static str {
        match self {
            Self::ToolsListChanged => "tools.listChanged",
            Self::ResourcesListChanged => "resources.listChanged",
            Self::PromptsListChanged => "prompts.listChanged",
            Self::RootsListChanged => "roots.listChanged",
            Self::ResourcesUpdated => "resources.subscribe",
        }
    }
}

/// Resolve the capability gate for a given outbound notification method, if
/// any. Methods not covered here (e.g. `notifications/cancelled`,
/// `notifications/progress`) are always permitted.
#[must_use]
pub fn is_list_changed_method(method: &str) -> Option<CapabilityGatedNotification> {
    match method {
        TOOLS_LIST_CHANGED => Some(CapabilityGatedNotification::ToolsListChanged),
        RESOURCES_LIST_CHANGED => Some(CapabilityGatedNotification::ResourcesListChanged),
        PROMPTS_LIST_CHANGED => Some(CapabilityGatedNotification::PromptsListChanged),
        ROOTS_LIST_CHANGED => Some(CapabilityGatedNotification::RootsListChanged),
        RESOURCES_UPDATED => Some(CapabilityGatedNotification::ResourcesUpdated),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognizes_gated_methods() {
        assert_eq!(
            is_list_changed_method(TOOLS_LIST_CHANGED),
            Some(CapabilityGatedNotification::ToolsListChanged)
        );
        assert_eq!(is_list_changed_method(CANCELLED), None);
    }

    #[test]
    fn capability_name_is_human_readable() {
        assert_eq!(
            CapabilityGatedNotification::ResourcesUpdated.capability_name(),
            "resources.subscribe"
        );
    }
}
