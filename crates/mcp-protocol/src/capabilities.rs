use serde::{Deserialize, Serialize};

/// A sub-capability that advertises whether its list can change at
/// runtime. When the parent capability object is present but this flag is
/// absent, [`normalize`](ServerCapabilities::normalize) fills it with
/// `true`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListChangedCapability {
    #[serde(rename = "listChanged", skip_serializing_if = "Option::is_none")]
    pub list_changed: Option<bool>,
}

impl ListChangedCapability {
    /// Whether list-changed notifications are enabled, with the
    /// present-but-absent-flag default of `true` applied.
    #[must_use]
    pub fn list_changed_enabled(&self) -> bool {
        self.list_changed.unwrap_or(true)
    }
}

/// Server's `resources` capability: list-changed plus subscribe support.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourcesCapability {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subscribe: Option<bool>,
    #[serde(rename = "listChanged", skip_serializing_if = "Option::is_none")]
    pub list_changed: Option<bool>,
}

impl ResourcesCapability {
    #[must_use]
    pub fn list_changed_enabled(&self) -> bool {
        self.list_changed.unwrap_or(true)
    }

    #[must_use]
    pub fn subscribe_enabled(&self) -> bool {
        self.subscribe.unwrap_or(false)
    }
}

/// Server's `logging` capability. Presence alone is the signal; the object
/// carries no sub-fields in this core.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingCapability {}

/// Client's `sampling` capability. Presence alone is the signal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SamplingCapability {}

/// Client's `elicitation` capability. Presence alone is the signal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElicitationCapability {}

/// The server's advertised capability set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerCapabilities {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<ListChangedCapability>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resources: Option<ResourcesCapability>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompts: Option<ListChangedCapability>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logging: Option<LoggingCapability>,
}

impl ServerCapabilities {
    /// Fill every present capability object's absent sub-flags with their
    /// documented defaults (`listChanged = true`). Absent capability
    /// objects stay absent — this only normalizes objects the peer (or
    /// auto-inference) actually advertised.
    #[must_use]
    pub fn normalize(mut self) -> Self {
        if let Some(tools) = &mut self.tools {
            tools.list_changed.get_or_insert(true);
        }
        if let Some(resources) = &mut self.resources {
            resources.list_changed.get_or_insert(true);
        }
        if let Some(prompts) = &mut self.prompts {
            prompts.list_changed.get_or_insert(true);
        }
        self
    }

    #[must_use]
    pub fn supports_tools_list_changed(&self) -> bool {
        self.tools.is_some_and(|t| t.list_changed_enabled())
    }

    #[must_use]
    pub fn supports_prompts_list_changed(&self) -> bool {
        self.prompts.is_some_and(|p| p.list_changed_enabled())
    }

    #[must_use]
    pub fn supports_resources_list_changed(&self) -> bool {
        self.resources.is_some_and(|r| r.list_changed_enabled())
    }

    #[must_use]
    pub fn supports_resources_updated(&self) -> bool {
        self.resources.is_some_and(|r| r.subscribe_enabled())
    }
}

/// The client's advertised capability set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientCapabilities {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sampling: Option<SamplingCapability>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub roots: Option<ListChangedCapability>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub elicitation: Option<ElicitationCapability>,
}

impl ClientCapabilities {
    /// See [`ServerCapabilities::normalize`].
    #[must_use]
    pub fn normalize(mut self) -> Self {
        if let Some(roots) = &mut self.roots {
            roots.list_changed.get_or_insert(true);
        }
        self
    }

    #[must_use]
    pub fn supports_roots_list_changed(&self) -> bool {
        self.roots.is_some_and(|r| r.list_changed_enabled())
    }
}

/// Which request handlers are registered, used for capability
/// auto-inference. Handler registration order has no effect on the merged
/// result: this is a plain set of booleans, not a log of registration
/// events.
#[derive(Debug, Clone, Copy, Default)]
pub struct RegisteredServerHandlers {
    pub tools: bool,
    pub resources: bool,
    pub resources_subscribe: bool,
    pub prompts: bool,
    pub logging: bool,
}

/// See [`RegisteredServerHandlers`], client side.
#[derive(Debug, Clone, Copy, Default)]
pub struct RegisteredClientHandlers {
    pub sampling: bool,
    pub roots: bool,
    pub elicitation: bool,
}

/// Merge explicitly-configured server capabilities with auto-inference
/// from registered handlers. Explicit configuration always wins: a
/// capability object the caller supplied is never overwritten or removed
/// by inference, only left as-is. Inference only fills in capabilities the
/// caller left `None`.
#[must_use]
pub fn merge_server_capabilities(
    explicit: ServerCapabilities,
    handlers: RegisteredServerHandlers,
) -> ServerCapabilities {
    let tools = explicit
        .tools
        .or_else(|| handlers.tools.then(ListChangedCapability::default));
    let resources = explicit.resources.or_else(|| {
        handlers.resources.then(|| ResourcesCapability {
            subscribe: handlers.resources_subscribe.then_some(true),
            list_changed: None,
        })
    });
    let prompts = explicit
        .prompts
        .or_else(|| handlers.prompts.then(ListChangedCapability::default));
    let logging = explicit
        .logging
        .or_else(|| handlers.logging.then(LoggingCapability::default));
    ServerCapabilities {
        tools,
        resources,
        prompts,
        logging,
    }
    .normalize()
}

/// Client-side mirror of [`merge_server_capabilities`].
#[must_use]
pub fn merge_client_capabilities(
    explicit: ClientCapabilities,
    handlers: RegisteredClientHandlers,
) -> ClientCapabilities {
    let sampling = explicit
        .sampling
        .or_else(|| handlers.sampling.then(SamplingCapability::default));
    let roots = explicit
        .roots
        .or_else(|| handlers.roots.then(ListChangedCapability::default));
    let elicitation = explicit
        .elicitation
        .or_else(|| handlers.elicitation.then(ElicitationCapability::default));
    ClientCapabilities {
        sampling,
        roots,
        elicitation,
    }
    .normalize()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn listchanged_absent_defaults_to_true_only_when_object_present() {
        let caps = ServerCapabilities {
            tools: Some(ListChangedCapability { list_changed: None }),
            ..Default::default()
        }
        .normalize();
        assert!(caps.supports_tools_list_changed());
        assert!(!caps.supports_prompts_list_changed());
    }

    #[test]
    fn explicit_config_wins_over_inference() {
        let explicit = ServerCapabilities {
            tools: Some(ListChangedCapability { list_changed: Some(false) }),
            ..Default::default()
        };
        let merged = merge_server_capabilities(
            explicit,
            RegisteredServerHandlers {
                tools: true,
                ..Default::default()
            },
        );
        assert!(!merged.supports_tools_list_changed());
    }

    #[test]
    fn inference_fills_unconfigured_capability() {
        let merged = merge_server_capabilities(
            ServerCapabilities::default(),
            RegisteredServerHandlers {
                resources: true,
                resources_subscribe: true,
                ..Default::default()
            },
        );
        assert!(merged.resources.is_some());
        assert!(merged.supports_resources_updated());
        assert!(merged.supports_resources_list_changed());
    }

    #[test]
    fn registration_order_does_not_affect_merge() {
        let a = merge_server_capabilities(
            ServerCapabilities::default(),
            RegisteredServerHandlers {
                tools: true,
                prompts: true,
                ..Default::default()
            },
        );
        let b = merge_server_capabilities(
            ServerCapabilities::default(),
            RegisteredServerHandlers {
                prompts: true,
                tools: true,
                ..Default::default()
            },
        );
        assert_eq!(a, b);
    }
}
