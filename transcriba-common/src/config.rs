//! Configuration loading and root folder resolution
//!
//! Bootstrap configuration comes from a TOML file. Every key has a built-in
//! default so that an empty (or missing) file yields a working service.
//!
//! Root folder priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable `TRANSCRIBA_ROOT`
//! 3. `root_folder` key of the TOML config file
//! 4. OS-dependent compiled default (fallback)

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Environment variable consulted for the root folder
pub const ROOT_FOLDER_ENV: &str = "TRANSCRIBA_ROOT";

/// Name of the administrator role; must be the last configured role
pub const ADMIN_ROLE: &str = "administrator";

/// Role whose edits are approved without a community vote
pub const TRUSTED_ROLE: &str = "trusted";

/// Complete service configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TranscribaConfig {
    pub app_name: String,
    pub app_url: String,
    pub root_folder: Option<PathBuf>,
    pub database_path: Option<PathBuf>,
    pub import_directory: Option<PathBuf>,
    pub asset_directory: Option<PathBuf>,
    pub server: ServerConfig,
    pub viewer: ViewerConfig,
    pub game: GameConfig,
    pub rbac: RbacConfig,
    pub admin: AccountConfig,
    pub bot: AccountConfig,
    pub auth: AuthConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    /// Edge length of one square image tile in pixels
    pub tile_size: u32,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct GameConfig {
    pub voting_requirements: VotingRequirements,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct VotingRequirements {
    /// Score a user needs before voting on revisions
    pub minimum_score: i64,
    /// Revision votes a user may cast within 24 hours
    pub maximum_votes_per_day: i64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RbacConfig {
    /// Role names ordered from lowest to highest privilege
    pub roles: Vec<String>,
    /// Role granted once a user confirmed the email address
    pub default_role: String,
    /// Higher roles include every lower role
    pub hierarchical: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AccountConfig {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Lifetime of issued access tokens
    pub token_ttl_secs: i64,
}

impl Default for TranscribaConfig {
    fn default() -> Self {
        Self {
            app_name: "Transcriba".to_string(),
            app_url: "localhost".to_string(),
            root_folder: None,
            database_path: None,
            import_directory: None,
            asset_directory: None,
            server: ServerConfig::default(),
            viewer: ViewerConfig::default(),
            game: GameConfig::default(),
            rbac: RbacConfig::default(),
            admin: AccountConfig {
                username: "admin".to_string(),
                email: "admin@transcriba.local".to_string(),
                password: "admin".to_string(),
            },
            bot: AccountConfig {
                username: "bot".to_string(),
                email: "bot@transcriba.local".to_string(),
                password: "bot".to_string(),
            },
            auth: AuthConfig::default(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
        }
    }
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self { tile_size: 256 }
    }
}

impl Default for VotingRequirements {
    fn default() -> Self {
        Self {
            minimum_score: 50,
            maximum_votes_per_day: 20,
        }
    }
}

impl Default for RbacConfig {
    fn default() -> Self {
        Self {
            roles: vec![
                "user".to_string(),
                TRUSTED_ROLE.to_string(),
                "moderator".to_string(),
                ADMIN_ROLE.to_string(),
            ],
            default_role: "user".to_string(),
            hierarchical: true,
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            token_ttl_secs: 60 * 60 * 24 * 14,
        }
    }
}

impl TranscribaConfig {
    /// Parse configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(content).map_err(|e| Error::Config(format!("Invalid TOML: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Cannot read config file {}: {}", path.display(), e))
        })?;
        info!("Loaded configuration from {}", path.display());
        Self::from_toml_str(&content)
    }

    /// Load the given file, the platform config file, or fall back to defaults
    pub fn load_or_default(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        match default_config_file() {
            Some(path) => Self::load(&path),
            None => {
                debug!("No config file found, using built-in defaults");
                Ok(Self::default())
            }
        }
    }

    /// Check values that serde cannot express
    pub fn validate(&self) -> Result<()> {
        if self.viewer.tile_size == 0 {
            return Err(Error::Config("viewer.tile_size must be positive".to_string()));
        }
        if self.rbac.roles.is_empty() {
            return Err(Error::Config("rbac.roles must not be empty".to_string()));
        }
        if !self.rbac.roles.contains(&self.rbac.default_role) {
            return Err(Error::Config(format!(
                "rbac.default_role '{}' is not a configured role",
                self.rbac.default_role
            )));
        }
        if self.auth.token_ttl_secs <= 0 {
            return Err(Error::Config("auth.token_ttl_secs must be positive".to_string()));
        }
        Ok(())
    }
}

/// Platform config file, if one exists
///
/// Linux checks `~/.config/transcriba/config.toml` then
/// `/etc/transcriba/config.toml`; other platforms only the user config dir.
pub fn default_config_file() -> Option<PathBuf> {
    let user_config = dirs::config_dir().map(|d| d.join("transcriba").join("config.toml"));
    if let Some(path) = user_config {
        if path.exists() {
            return Some(path);
        }
    }
    if cfg!(target_os = "linux") {
        let system_config = PathBuf::from("/etc/transcriba/config.toml");
        if system_config.exists() {
            return Some(system_config);
        }
    }
    None
}

/// Resolves the root folder following the documented priority order
pub struct RootFolderResolver<'a> {
    cli_arg: Option<&'a Path>,
    config: &'a TranscribaConfig,
}

impl<'a> RootFolderResolver<'a> {
    pub fn new(cli_arg: Option<&'a Path>, config: &'a TranscribaConfig) -> Self {
        Self { cli_arg, config }
    }

    pub fn resolve(&self) -> PathBuf {
        if let Some(path) = self.cli_arg {
            return path.to_path_buf();
        }
        if let Ok(path) = std::env::var(ROOT_FOLDER_ENV) {
            if !path.is_empty() {
                return PathBuf::from(path);
            }
        }
        if let Some(path) = &self.config.root_folder {
            return path.clone();
        }
        default_root_folder()
    }
}

/// OS-dependent default root folder path
fn default_root_folder() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("transcriba"))
        .unwrap_or_else(|| PathBuf::from("./transcriba_data"))
}

/// Filesystem locations derived from the root folder
#[derive(Debug, Clone)]
pub struct ServicePaths {
    pub database: PathBuf,
    pub imports: PathBuf,
    pub assets: PathBuf,
}

/// Creates the root folder and derives the service paths
pub struct RootFolderInitializer {
    root: PathBuf,
}

impl RootFolderInitializer {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn ensure_directory_exists(&self) -> Result<()> {
        if !self.root.exists() {
            std::fs::create_dir_all(&self.root)?;
            info!("Created root folder: {}", self.root.display());
        }
        Ok(())
    }

    pub fn database_path(&self) -> PathBuf {
        self.root.join("transcriba.db")
    }

    /// Explicit config paths win over root-relative defaults
    pub fn paths(&self, config: &TranscribaConfig) -> ServicePaths {
        ServicePaths {
            database: config
                .database_path
                .clone()
                .unwrap_or_else(|| self.database_path()),
            imports: config
                .import_directory
                .clone()
                .unwrap_or_else(|| self.root.join("imports")),
            assets: config
                .asset_directory
                .clone()
                .unwrap_or_else(|| self.root.join("assets")),
        }
    }
}
