pub mod config_cmd;
pub mod index;
pub mod sequence;
pub mod serve;
pub mod stage;

use kitsmith_config::AppConfig;
use kitsmith_core::World;
use kitsmith_index::FileStore;
use kitsmith_sim::WorldFixture;
use kitsmith_workflow::Session;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

/// Global options shared by every command.
pub struct Context {
    pub config_path: Option<PathBuf>,
    pub world_path: Option<PathBuf>,
}

impl Context {
    pub fn config_file(&self) -> PathBuf {
        self.config_path
            .clone()
            .unwrap_or_else(|| AppConfig::config_dir().join("config.toml"))
    }

    pub fn load_config(&self) -> Result<AppConfig, Box<dyn std::error::Error>> {
        let config = match &self.config_path {
            Some(path) => AppConfig::load_from(path),
            None => AppConfig::load(),
        };
        Ok(config.map_err(|e| format!("Failed to load config: {e}"))?)
    }

    /// The world to act in. Only simulated fixtures are available from the
    /// command line.
    pub fn load_world(&self) -> Result<Arc<dyn World>, Box<dyn std::error::Error>> {
        let path = self
            .world_path
            .as_ref()
            .ok_or("No world available: pass --world <fixture.json>")?;
        let fixture = WorldFixture::load_json(path)
            .map_err(|e| format!("Failed to load world fixture {}: {e}", path.display()))?;
        info!(fixture = %path.display(), "Loaded simulated world");
        Ok(Arc::new(fixture.into_world()))
    }

    /// A session over the configured index file and the loaded world.
    pub fn session(&self) -> Result<Session, Box<dyn std::error::Error>> {
        let config = self.load_config()?;
        let world = self.load_world()?;
        let store = Arc::new(FileStore::new(config.index_path()));
        Ok(Session::new(world, store, config))
    }
}
