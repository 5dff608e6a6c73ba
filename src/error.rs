//! Error types.
//!
//! Configuration errors (unknown module/component, duplicate or invalid
//! names) are fatal at the call site and are returned as [`OveeError`].
//! Missing-context usage of composables is only an error for accessors
//! such as `use_app()`; the lifecycle helpers log a warning instead.

use thiserror::Error;

/// Everything that can go wrong inside the framework.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OveeError {
    /// A module was looked up by a name (or definition) that was never registered.
    #[error("[{namespace} ~ ModulesManager] module '{name}' is not registered")]
    UnregisteredModule { namespace: String, name: String },

    /// A component was looked up by a name (or definition) that was never registered.
    #[error("[{namespace} ~ ComponentsManager] component '{name}' is not registered")]
    UnregisteredComponent { namespace: String, name: String },

    /// The same name was registered twice in one configurator.
    #[error("[{namespace} ~ AppConfigurator] '{name}' is already registered as a {kind}")]
    DuplicateName {
        namespace: String,
        name: String,
        kind: &'static str,
    },

    /// A name that cannot be turned into a selector / tag name.
    #[error("[{namespace} ~ AppConfigurator] '{name}' is not a valid {kind} name")]
    InvalidName {
        namespace: String,
        name: String,
        kind: &'static str,
    },

    /// An accessor that requires a setup context was called outside of one.
    #[error("[{namespace} ~ {subsystem}] {helper}() must be called synchronously inside a setup function")]
    MissingContext {
        namespace: String,
        subsystem: &'static str,
        helper: &'static str,
    },

    /// The root element's document is gone.
    #[error("[{namespace} ~ App] the root element does not belong to a live document")]
    MissingDocument { namespace: String },

    /// A fiber could not be committed.
    #[error("[{namespace} ~ Renderer] {message}")]
    Render { namespace: String, message: String },
}

/// Convenience alias used across the crate.
pub type Result<T> = std::result::Result<T, OveeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_are_namespaced() {
        let err = OveeError::UnregisteredModule {
            namespace: "Ovee".into(),
            name: "nav".into(),
        };
        assert_eq!(
            err.to_string(),
            "[Ovee ~ ModulesManager] module 'nav' is not registered"
        );

        let err = OveeError::MissingContext {
            namespace: "Ovee".into(),
            subsystem: "useApp",
            helper: "use_app",
        };
        assert!(err.to_string().starts_with("[Ovee ~ useApp]"));
    }
}
