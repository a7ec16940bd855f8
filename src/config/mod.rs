//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! CLI args
//!     → args.rs (flags, --config paths)
//!     → loader.rs (each path: file or directory → overlays)
//!     → AgentConfig::default() + file overlays + flag overlay
//!     → stamp build info
//!     → validation.rs (normalize addresses, absolute paths)
//!     → AgentConfig (one immutable snapshot)
//!
//! On SIGHUP:
//!     the same path runs again and the lifecycle controller swaps
//!     the active Arc<AgentConfig> only if acquisition succeeded
//! ```
//!
//! # Design Decisions
//! - Acquisition never panics; every failure is a `ConfigError`
//! - Startup and reload share one `ConfigSource`, so they cannot drift

pub mod args;
pub mod loader;
pub mod schema;
pub mod validation;

use std::ffi::OsString;

use clap::Parser;

pub use args::AgentArgs;
pub use loader::ConfigError;
pub use schema::{AgentConfig, ConfigOverlay, NormalizedAddrs};

use crate::ui::Ui;

/// Version metadata stamped into every acquired config.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildInfo {
    pub version: String,
    pub version_prerelease: String,
    pub revision: String,
}

impl BuildInfo {
    /// Build info of the running binary.
    pub fn current() -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            version_prerelease: option_env!("MAYA_VERSION_PRERELEASE")
                .unwrap_or_default()
                .to_string(),
            revision: option_env!("MAYA_GIT_REVISION")
                .unwrap_or_default()
                .to_string(),
        }
    }
}

/// Produces a fresh config snapshot. Called once at startup and again on
/// every reload.
pub trait ConfigSource: Send + Sync {
    fn acquire(&self, ui: &dyn Ui) -> Result<AgentConfig, ConfigError>;
}

/// Config acquired from command line flags and the files they name.
#[derive(Debug, Clone)]
pub struct CliConfigSource {
    args: Vec<OsString>,
    build: BuildInfo,
}

impl CliConfigSource {
    /// `args` includes the program name, as in `std::env::args_os()`.
    pub fn new(args: impl IntoIterator<Item = impl Into<OsString>>, build: BuildInfo) -> Self {
        Self {
            args: args.into_iter().map(Into::into).collect(),
            build,
        }
    }
}

impl ConfigSource for CliConfigSource {
    fn acquire(&self, ui: &dyn Ui) -> Result<AgentConfig, ConfigError> {
        let args = AgentArgs::try_parse_from(&self.args)?;

        let mut config = AgentConfig::default();
        for path in &args.config {
            for file in loader::load_path(path)? {
                if file.overlay.is_empty() {
                    ui.warn(&format!(
                        "No configuration loaded from {}",
                        file.path.display()
                    ));
                }
                config.apply(&file.overlay);
                config.files.push(file.path.display().to_string());
            }
        }

        config.apply(&args.overlay());

        config.version = self.build.version.clone();
        config.version_prerelease = self.build.version_prerelease.clone();
        config.revision = self.build.revision.clone();

        validation::normalize_addrs(&mut config)?;
        validation::verify_paths(&config)?;

        tracing::debug!(
            files = config.files.len(),
            region = %config.region,
            datacenter = %config.datacenter,
            "Configuration acquired"
        );
        Ok(config)
    }
}
