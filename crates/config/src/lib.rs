//! Configuration loading, validation, and management for kitsmith.
//!
//! Loads configuration from `~/.kitsmith/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use kitsmith_core::Position;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// The root configuration structure.
///
/// Maps directly to `~/.kitsmith/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// World connection settings (consumed by the protocol adapter)
    #[serde(default)]
    pub world: WorldConfig,

    /// Fixed storage locations
    #[serde(default)]
    pub locations: LocationsConfig,

    /// Storage scan settings
    #[serde(default)]
    pub scan: ScanConfig,

    /// Container placement settings
    #[serde(default)]
    pub placement: PlacementConfig,

    /// Convergence delays and timeouts
    #[serde(default)]
    pub timing: TimingConfig,

    /// Retry policies per actuation class
    #[serde(default)]
    pub retry: RetryConfig,

    /// Tool preferences
    #[serde(default)]
    pub tools: ToolsConfig,

    /// Location Index persistence
    #[serde(default)]
    pub index: IndexConfig,

    /// HTTP gateway
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Chat command relay
    #[serde(default)]
    pub discord: DiscordConfig,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorldConfig {
    #[serde(default = "default_world_host")]
    pub host: String,

    #[serde(default = "default_world_port")]
    pub port: u16,

    #[serde(default = "default_username")]
    pub username: String,

    #[serde(default = "default_world_version")]
    pub version: String,
}

fn default_world_host() -> String {
    "localhost".into()
}
fn default_world_port() -> u16 {
    25565
}
fn default_username() -> String {
    "kitsmith".into()
}
fn default_world_version() -> String {
    "1.21.1".into()
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            host: default_world_host(),
            port: default_world_port(),
            username: default_username(),
            version: default_world_version(),
        }
    }
}

/// The four fixed containers the pipeline moves stock between.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LocationsConfig {
    /// Chest holding empty packaged containers
    #[serde(default)]
    pub supply: Position,

    /// Chest receiving emptied working sources
    #[serde(default)]
    pub discard: Position,

    /// Chest receiving finished kits
    #[serde(default)]
    pub destination: Position,

    /// Container whose first 27 slots define the reference kit
    #[serde(default)]
    pub reference: Position,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanConfig {
    #[serde(default = "default_search_radius")]
    pub radius: u32,

    #[serde(default = "default_max_containers")]
    pub max_containers: usize,

    /// Also inspect single-width containers (only double-width ones by default)
    #[serde(default)]
    pub include_single_containers: bool,

    /// Block names treated as storage containers
    #[serde(default = "default_container_blocks")]
    pub container_blocks: Vec<String>,
}

fn default_container_blocks() -> Vec<String> {
    vec!["chest".into(), "trapped_chest".into()]
}

fn default_search_radius() -> u32 {
    64
}
fn default_max_containers() -> usize {
    1000
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            radius: default_search_radius(),
            max_containers: default_max_containers(),
            include_single_containers: false,
            container_blocks: default_container_blocks(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlacementConfig {
    /// Ground block on which kit containers may be placed
    #[serde(default = "default_ground_block")]
    pub ground_block: String,

    #[serde(default = "default_search_radius")]
    pub search_radius: u32,

    /// Radius searched for a cell when the default working-source cell is blocked
    #[serde(default = "default_working_source_radius")]
    pub working_source_search_radius: u32,

    /// Containers withdrawn per run (one container's worth of slots)
    #[serde(default = "default_capacity")]
    pub capacity: u32,
}

fn default_ground_block() -> String {
    "smooth_stone".into()
}
fn default_working_source_radius() -> u32 {
    5
}
fn default_capacity() -> u32 {
    27
}

impl Default for PlacementConfig {
    fn default() -> Self {
        Self {
            ground_block: default_ground_block(),
            search_radius: default_search_radius(),
            working_source_search_radius: default_working_source_radius(),
            capacity: default_capacity(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimingConfig {
    /// Delay after withdraw/deposit before the same state is read again
    #[serde(default = "default_convergence_ms")]
    pub convergence_ms: u64,

    /// Delay after closing a container
    #[serde(default = "default_close_settle_ms")]
    pub close_settle_ms: u64,

    /// Delay after breaking blocks before drops are collected
    #[serde(default = "default_drop_settle_ms")]
    pub drop_settle_ms: u64,

    #[serde(default = "default_open_timeout_ms")]
    pub container_open_timeout_ms: u64,

    /// Poll interval for state-convergence checks
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Upper bound for state-convergence checks
    #[serde(default = "default_poll_timeout_ms")]
    pub poll_timeout_ms: u64,

    /// Inventory passes without progress before a drain loop gives up
    #[serde(default = "default_drain_idle_passes")]
    pub drain_idle_passes: u32,
}

fn default_convergence_ms() -> u64 {
    150
}
fn default_close_settle_ms() -> u64 {
    250
}
fn default_drop_settle_ms() -> u64 {
    500
}
fn default_open_timeout_ms() -> u64 {
    5000
}
fn default_poll_interval_ms() -> u64 {
    100
}
fn default_poll_timeout_ms() -> u64 {
    2000
}
fn default_drain_idle_passes() -> u32 {
    10
}

impl TimingConfig {
    pub fn convergence(&self) -> Duration {
        Duration::from_millis(self.convergence_ms)
    }

    pub fn close_settle(&self) -> Duration {
        Duration::from_millis(self.close_settle_ms)
    }

    pub fn drop_settle(&self) -> Duration {
        Duration::from_millis(self.drop_settle_ms)
    }

    pub fn container_open_timeout(&self) -> Duration {
        Duration::from_millis(self.container_open_timeout_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn poll_timeout(&self) -> Duration {
        Duration::from_millis(self.poll_timeout_ms)
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            convergence_ms: default_convergence_ms(),
            close_settle_ms: default_close_settle_ms(),
            drop_settle_ms: default_drop_settle_ms(),
            container_open_timeout_ms: default_open_timeout_ms(),
            poll_interval_ms: default_poll_interval_ms(),
            poll_timeout_ms: default_poll_timeout_ms(),
            drain_idle_passes: default_drain_idle_passes(),
        }
    }
}

/// Bounded retry with exponential backoff.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicyConfig {
    /// Total attempts including the first one
    pub max_attempts: u32,

    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,

    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
}

fn default_base_delay_ms() -> u64 {
    100
}
fn default_max_delay_ms() -> u64 {
    1000
}

impl RetryPolicyConfig {
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Movement: the second attempt narrows the goal tolerance
    #[serde(default = "default_movement_retry")]
    pub movement: RetryPolicyConfig,

    /// Container open; timeouts are never retried regardless
    #[serde(default = "default_container_open_retry")]
    pub container_open: RetryPolicyConfig,

    #[serde(default = "default_placement_retry")]
    pub placement: RetryPolicyConfig,
}

fn default_movement_retry() -> RetryPolicyConfig {
    RetryPolicyConfig::new(2)
}
fn default_container_open_retry() -> RetryPolicyConfig {
    RetryPolicyConfig::new(2)
}
fn default_placement_retry() -> RetryPolicyConfig {
    RetryPolicyConfig::new(2)
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            movement: default_movement_retry(),
            container_open: default_container_open_retry(),
            placement: default_placement_retry(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolsConfig {
    /// Tools equipped before breaking containers, in order of preference
    #[serde(default = "default_break_tools")]
    pub break_tools: Vec<String>,
}

fn default_break_tools() -> Vec<String> {
    vec!["netherite_pickaxe".into(), "diamond_pickaxe".into()]
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            break_tools: default_break_tools(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexConfig {
    /// Snapshot path; defaults to `~/.kitsmith/itemDictionary.json`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,

    /// Which indexed container to fetch from: "first_match" or "nearest"
    #[serde(default = "default_selector")]
    pub selector: String,
}

fn default_selector() -> String {
    "first_match".into()
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            path: None,
            selector: default_selector(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_host")]
    pub host: String,
}

fn default_port() -> u16 {
    3000
}
fn default_host() -> String {
    "127.0.0.1".into()
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            host: default_host(),
        }
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct DiscordConfig {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,

    /// Allowlist of sender IDs. Empty = deny all. ["*"] = allow all.
    #[serde(default)]
    pub allowed_users: Vec<String>,

    #[serde(default = "default_prefix")]
    pub prefix: String,

    /// Ignore messages from other bots
    #[serde(default = "default_true")]
    pub ignore_bots: bool,
}

fn default_prefix() -> String {
    "!".into()
}

impl Default for DiscordConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            token: None,
            allowed_users: vec![],
            prefix: default_prefix(),
            ignore_bots: true,
        }
    }
}

impl std::fmt::Debug for DiscordConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiscordConfig")
            .field("enabled", &self.enabled)
            .field("token", &redact(&self.token))
            .field("allowed_users", &self.allowed_users)
            .field("prefix", &self.prefix)
            .field("ignore_bots", &self.ignore_bots)
            .finish()
    }
}

/// Redact a secret for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl AppConfig {
    /// Load configuration from the default path (~/.kitsmith/config.toml).
    ///
    /// Environment overrides:
    /// - `KITSMITH_INDEX_PATH`
    /// - `KITSMITH_WORLD_HOST`
    /// - `KITSMITH_DISCORD_TOKEN`
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(path) = std::env::var("KITSMITH_INDEX_PATH") {
            self.index.path = Some(PathBuf::from(path));
        }
        if let Ok(host) = std::env::var("KITSMITH_WORLD_HOST") {
            self.world.host = host;
        }
        if self.discord.token.is_none() {
            self.discord.token = std::env::var("KITSMITH_DISCORD_TOKEN").ok();
        }
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".kitsmith")
    }

    /// Resolved Location Index snapshot path.
    pub fn index_path(&self) -> PathBuf {
        self.index
            .path
            .clone()
            .unwrap_or_else(|| Self::config_dir().join("itemDictionary.json"))
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.scan.radius == 0 || self.placement.search_radius == 0 {
            return Err(ConfigError::ValidationError(
                "search radii must be greater than 0".into(),
            ));
        }

        if self.placement.capacity == 0 || self.placement.capacity > 27 {
            return Err(ConfigError::ValidationError(
                "placement.capacity must be between 1 and 27".into(),
            ));
        }

        if self.timing.container_open_timeout_ms == 0 || self.timing.poll_interval_ms == 0 {
            return Err(ConfigError::ValidationError(
                "timeouts and poll intervals must be greater than 0".into(),
            ));
        }

        if !matches!(self.index.selector.as_str(), "first_match" | "nearest") {
            return Err(ConfigError::ValidationError(format!(
                "index.selector must be 'first_match' or 'nearest', got '{}'",
                self.index.selector
            )));
        }

        for (name, policy) in [
            ("movement", &self.retry.movement),
            ("container_open", &self.retry.container_open),
            ("placement", &self.retry.placement),
        ] {
            if policy.max_attempts == 0 {
                return Err(ConfigError::ValidationError(format!(
                    "retry.{name}.max_attempts must be at least 1"
                )));
            }
        }

        Ok(())
    }

    /// Generate a default config TOML string (for `config init`).
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn default_config_is_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.placement.capacity, 27);
        assert_eq!(config.timing.container_open_timeout_ms, 5000);
        assert_eq!(config.retry.movement.max_attempts, 2);
    }

    #[test]
    fn config_roundtrip_toml() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.placement.ground_block, config.placement.ground_block);
        assert_eq!(parsed.gateway.port, config.gateway.port);
    }

    #[test]
    fn locations_parse_from_position_strings() {
        let toml_str = r#"
[locations]
supply = "100,64,100"
discard = "102,64,100"
destination = "104,64,100"
reference = "106,64,100"

[placement]
ground_block = "white_concrete"
"#;
        let config: AppConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.locations.supply, Position::new(100, 64, 100));
        assert_eq!(config.locations.reference, Position::new(106, 64, 100));
        assert_eq!(config.placement.ground_block, "white_concrete");
        assert_eq!(config.placement.search_radius, 64);
    }

    #[test]
    fn invalid_capacity_rejected() {
        let mut config = AppConfig::default();
        config.placement.capacity = 40;
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_retry_attempts_rejected() {
        let mut config = AppConfig::default();
        config.retry.placement.max_attempts = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("retry.placement"));
    }

    #[test]
    fn missing_config_file_returns_defaults() {
        let result = AppConfig::load_from(Path::new("/nonexistent/config.toml"));
        assert!(result.is_ok());
        assert_eq!(result.unwrap().scan.radius, 64);
    }

    #[test]
    fn load_from_file_validates() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        writeln!(tmp, "[scan]\nradius = 0").unwrap();
        let err = AppConfig::load_from(tmp.path()).unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
    }

    #[test]
    fn discord_token_is_redacted() {
        let mut config = AppConfig::default();
        config.discord.token = Some("super-secret".into());
        let debug = format!("{config:?}");
        assert!(!debug.contains("super-secret"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn default_toml_generation() {
        let toml_str = AppConfig::default_toml();
        assert!(toml_str.contains("smooth_stone"));
        assert!(toml_str.contains("container_open_timeout_ms"));
    }
}
