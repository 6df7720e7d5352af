//! Configuration management.
//!
//! `WardenConfig` is read from TOML. Every section is optional; anything
//! left out keeps its default.
//!
//! ```toml
//! data_dir = ".warden"
//! role_base_url = ""
//!
//! [identity]
//! fields = ["label", "email", "description", "url", "image", "memberOf"]
//!
//! [[identity.identities]]
//! identity = { id = "https://example.com/i/admin", type = "Identity" }
//! resource_roles = [{ sysRole = "identity.admin" }]
//!
//! [[roles]]
//! id = "identity.regular"
//! sysPermission = ["IDENTITY_ACCESS", "IDENTITY_UPDATE"]
//!
//! [logging]
//! format = "json"
//! filter = "warden=debug"
//! ```

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::authorization::StaticRoleCatalog;
use crate::models::{Identity, IdentityStatus, ResourceRole, Role};
use crate::observability::LogFormat;

/// Environment variable naming the config file.
pub const CONFIG_PATH_ENV: &str = "WARDEN_CONFIG_PATH";
/// Environment variable overriding `data_dir`.
pub const DATA_DIR_ENV: &str = "WARDEN_DATA_DIR";

/// Attribute fields `update` may change unless configured otherwise.
pub const DEFAULT_UPDATE_FIELDS: &[&str] =
    &["label", "email", "description", "url", "image", "memberOf"];

/// Main configuration for warden.
#[derive(Debug, Clone)]
pub struct WardenConfig {
    /// Directory holding the identity database.
    pub data_dir: PathBuf,
    /// Identity settings.
    pub identity: IdentitySettings,
    /// Role catalog; empty means the built-in roles.
    pub roles: Vec<Role>,
    /// Prefix applied to relative role ids when records are read.
    ///
    /// Empty disables the rewrite.
    pub role_base_url: String,
    /// Logging settings.
    pub logging: LoggingSettings,
}

/// Identity settings.
#[derive(Debug, Clone)]
pub struct IdentitySettings {
    /// Attribute fields `update` may change. `id` is never mutable.
    pub fields: Vec<String>,
    /// Identities created by `init`.
    pub identities: Vec<SeedIdentity>,
}

/// An identity created at startup.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SeedIdentity {
    /// The identity document.
    pub identity: Identity,
    /// Resource roles granted to it.
    #[serde(default)]
    pub resource_roles: Vec<ResourceRole>,
    /// Initial status.
    #[serde(default)]
    pub status: IdentityStatus,
}

/// Logging settings as written in the config file.
#[derive(Debug, Clone)]
pub struct LoggingSettings {
    /// Output format.
    pub format: LogFormat,
    /// `EnvFilter` directive.
    pub filter: String,
    /// Log file; stderr when absent.
    pub file: Option<PathBuf>,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            format: LogFormat::Pretty,
            filter: "info".to_string(),
            file: None,
        }
    }
}

impl Default for IdentitySettings {
    fn default() -> Self {
        Self {
            fields: DEFAULT_UPDATE_FIELDS.iter().map(ToString::to_string).collect(),
            identities: Vec::new(),
        }
    }
}

/// Configuration file structure (for TOML parsing).
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFile {
    /// Data directory.
    pub data_dir: Option<String>,
    /// Role id prefix.
    pub role_base_url: Option<String>,
    /// Identity section.
    pub identity: Option<ConfigFileIdentity>,
    /// Role catalog.
    pub roles: Option<Vec<Role>>,
    /// Logging section.
    pub logging: Option<ConfigFileLogging>,
}

/// Identity section in config file.
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFileIdentity {
    /// Updatable fields.
    pub fields: Option<Vec<String>>,
    /// Seed identities.
    pub identities: Option<Vec<SeedIdentity>>,
}

/// Logging section in config file.
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFileLogging {
    /// `pretty` or `json`.
    pub format: Option<String>,
    /// Filter directive.
    pub filter: Option<String>,
    /// Log file path.
    pub file: Option<String>,
}

impl Default for WardenConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(".warden"),
            identity: IdentitySettings::default(),
            roles: Vec::new(),
            role_base_url: String::new(),
            logging: LoggingSettings::default(),
        }
    }
}

impl WardenConfig {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from a file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_from_file(path: &Path) -> crate::Result<Self> {
        let contents =
            std::fs::read_to_string(path).map_err(|e| crate::Error::OperationFailed {
                operation: "read_config_file".to_string(),
                cause: format!("{}: {e}", path.display()),
            })?;
        Self::from_toml(&contents)
    }

    /// Parses configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not a valid config file.
    pub fn from_toml(contents: &str) -> crate::Result<Self> {
        let file: ConfigFile =
            toml::from_str(contents).map_err(|e| crate::Error::OperationFailed {
                operation: "parse_config_file".to_string(),
                cause: e.to_string(),
            })?;
        Ok(Self::from_config_file(file))
    }

    /// Loads configuration from the default location.
    ///
    /// Checks `<platform config dir>/warden/config.toml`, then
    /// `~/.config/warden/config.toml`. Returns defaults if neither exists
    /// or parses.
    #[must_use]
    pub fn load_default() -> Self {
        let Some(base_dirs) = directories::BaseDirs::new() else {
            return Self::default();
        };

        let candidates = [
            base_dirs.config_dir().join("warden").join("config.toml"),
            base_dirs
                .home_dir()
                .join(".config")
                .join("warden")
                .join("config.toml"),
        ];
        for path in candidates {
            if !path.exists() {
                continue;
            }
            match Self::load_from_file(&path) {
                Ok(config) => return config,
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Ignoring unreadable config");
                },
            }
        }

        Self::default()
    }

    /// Loads configuration from `explicit`, `WARDEN_CONFIG_PATH`, or the
    /// default location, then applies environment overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if an explicitly named file cannot be loaded.
    pub fn load(explicit: Option<&Path>) -> crate::Result<Self> {
        let from_env = std::env::var(CONFIG_PATH_ENV).ok().map(PathBuf::from);
        let mut config = match explicit.map(Path::to_path_buf).or(from_env) {
            Some(path) => Self::load_from_file(&path)?,
            None => Self::load_default(),
        };
        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Applies overrides read through `lookup` (the process environment in
    /// production).
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(data_dir) = lookup(DATA_DIR_ENV).filter(|v| !v.is_empty()) {
            self.data_dir = PathBuf::from(data_dir);
        }
    }

    /// Builds the role catalog.
    #[must_use]
    pub fn role_catalog(&self) -> StaticRoleCatalog {
        if self.roles.is_empty() {
            StaticRoleCatalog::builtin()
        } else {
            StaticRoleCatalog::new(self.roles.clone())
        }
    }

    /// Converts a `ConfigFile` to `WardenConfig`.
    fn from_config_file(file: ConfigFile) -> Self {
        let mut config = Self::default();

        if let Some(data_dir) = file.data_dir {
            config.data_dir = PathBuf::from(data_dir);
        }
        if let Some(base) = file.role_base_url {
            config.role_base_url = base;
        }
        if let Some(identity) = file.identity {
            if let Some(fields) = identity.fields {
                config.identity.fields = fields;
            }
            if let Some(identities) = identity.identities {
                config.identity.identities = identities;
            }
        }
        if let Some(roles) = file.roles {
            config.roles = roles;
        }
        if let Some(logging) = file.logging {
            if let Some(format) = logging.format.as_deref().and_then(LogFormat::parse) {
                config.logging.format = format;
            }
            if let Some(filter) = logging.filter {
                config.logging.filter = filter;
            }
            config.logging.file = logging.file.map(PathBuf::from);
        }

        config
    }

    /// Sets the data directory.
    #[must_use]
    pub fn with_data_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.data_dir = path.into();
        self
    }

    /// Sets the updatable fields.
    #[must_use]
    pub fn with_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.identity.fields = fields.into_iter().map(Into::into).collect();
        self
    }
}
