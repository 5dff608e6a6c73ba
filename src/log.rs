//! Namespaced logger.
//!
//! Every framework message goes through `tracing` with the
//! `[<Namespace> ~ <subsystem>] message` prefix.

use std::fmt::Display;

use crate::config::display_namespace;

/// Logger bound to one namespace and subsystem.
#[derive(Clone, Debug)]
pub struct Logger {
    prefix: String,
}

impl Logger {
    pub fn new(namespace: &str, subsystem: &str) -> Self {
        Self {
            prefix: format!("[{} ~ {}]", display_namespace(namespace), subsystem),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Format a message the way it is logged.
    pub fn format(&self, message: impl Display) -> String {
        format!("{} {}", self.prefix, message)
    }

    pub fn debug(&self, message: impl Display) {
        tracing::debug!(target: "ovee", "{}", self.format(message));
    }

    pub fn info(&self, message: impl Display) {
        tracing::info!(target: "ovee", "{}", self.format(message));
    }

    pub fn warn(&self, message: impl Display) {
        tracing::warn!(target: "ovee", "{}", self.format(message));
    }

    pub fn error(&self, message: impl Display) {
        tracing::error!(target: "ovee", "{}", self.format(message));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefix() {
        let logger = Logger::new("ovee", "ComponentsManager");
        assert_eq!(logger.prefix(), "[Ovee ~ ComponentsManager]");
        assert_eq!(logger.format("boom"), "[Ovee ~ ComponentsManager] boom");
    }
}
