//! Application configuration and runtime mode.
//!
//! The mode is read once from the `OVEE_ENV` environment variable
//! (`production`, `development`, `test`). It only gates the development
//! tip printed when an app starts.

use std::sync::OnceLock;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::dom::Document;

/// Namespace used when an app does not configure one.
pub const DEFAULT_NAMESPACE: &str = "ovee";

/// Environment variable holding the runtime mode.
pub const MODE_ENV_VAR: &str = "OVEE_ENV";

// =============================================================================
// Mode
// =============================================================================

/// Runtime mode of the framework.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Mode {
    Production,
    #[default]
    Development,
    Test,
}

impl Mode {
    /// Parse a mode string. Unknown values fall back to development.
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "production" | "prod" => Mode::Production,
            "test" => Mode::Test,
            _ => Mode::Development,
        }
    }

    /// The process-wide mode, read once.
    pub fn current() -> Self {
        *MODE.get_or_init(|| {
            if cfg!(test) {
                return Mode::Test;
            }
            std::env::var(MODE_ENV_VAR)
                .map(|v| Mode::parse(&v))
                .unwrap_or_default()
        })
    }

    /// Fix the process-wide mode before anything reads it, e.g. from an
    /// integration test harness. Returns false once the mode is settled.
    pub fn init(mode: Mode) -> bool {
        MODE.set(mode).is_ok()
    }
}

static MODE: OnceLock<Mode> = OnceLock::new();

// =============================================================================
// AppConfig
// =============================================================================

/// Configuration record handed to an [`App`](crate::App).
#[derive(Clone, Debug)]
pub struct AppConfig {
    /// Prefix of framework DOM events (`<namespace>:initialized`) and log lines.
    pub namespace: String,
    /// Print the development-mode tip on `run()`.
    pub production_tip: bool,
    /// Document the app lives in. Defaults to the root element's document.
    pub document: Option<Document>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            namespace: DEFAULT_NAMESPACE.to_string(),
            production_tip: true,
            document: None,
        }
    }
}

impl AppConfig {
    /// Namespace as shown in log prefixes (`ovee` -> `Ovee`).
    pub fn display_namespace(&self) -> String {
        display_namespace(&self.namespace)
    }

    /// CSS class added to every element hosting a component.
    pub fn marker_class(&self) -> String {
        format!("{}-component", self.namespace.to_ascii_lowercase())
    }

    /// Full name of a framework DOM event.
    pub fn event_name(&self, event: &str) -> String {
        format!("{}:{}", self.namespace, event)
    }
}

/// Capitalize the first character of a namespace.
pub fn display_namespace(namespace: &str) -> String {
    let mut chars = namespace.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

// =============================================================================
// Production tip
// =============================================================================

static TIP_SHOWN: AtomicBool = AtomicBool::new(false);

/// Log the development-mode tip once. Returns true if it was logged.
pub(crate) fn show_production_tip(config: &AppConfig) -> bool {
    if !config.production_tip || Mode::current() != Mode::Development {
        return false;
    }
    if TIP_SHOWN.swap(true, Ordering::Relaxed) {
        return false;
    }
    tracing::info!(
        target: "ovee",
        "[{}] You are running in development mode. Set {}=production when deploying.",
        config.display_namespace(),
        MODE_ENV_VAR
    );
    true
}
