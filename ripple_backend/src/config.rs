use anyhow::{anyhow, Result};
use std::env;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct RippleConfig {
    pub api_port: u16,
    pub paths: RipplePaths,
}

impl RippleConfig {
    pub fn from_env() -> Result<Self> {
        let paths = match env::var("RIPPLE_DATA_DIR") {
            Ok(base) if !base.trim().is_empty() => RipplePaths::from_base_dir(base)?,
            _ => RipplePaths::discover()?,
        };
        let api_port = env::var("RIPPLE_API_PORT")
            .ok()
            .and_then(|raw| raw.parse().ok())
            .unwrap_or(8080);
        Ok(Self { api_port, paths })
    }

    pub fn new(api_port: u16, paths: RipplePaths) -> Self {
        Self { api_port, paths }
    }
}

#[derive(Debug, Clone, Default)]
pub struct RipplePaths {
    pub base: PathBuf,
    pub data_dir: PathBuf,
    pub db_path: PathBuf,
    pub avatars_dir: PathBuf,
}

impl RipplePaths {
    pub fn discover() -> Result<Self> {
        let exe_path = std::env::current_exe()
            .map_err(|err| anyhow!("failed to resolve current executable: {err}"))?;
        let base = exe_path
            .parent()
            .ok_or_else(|| anyhow!("executable path missing parent"))?
            .to_path_buf();
        Self::from_base_dir(base)
    }

    pub fn from_base_dir<P: AsRef<Path>>(base: P) -> Result<Self> {
        let base = base.as_ref().to_path_buf();
        let data_dir = base.join("data");
        let db_path = data_dir.join("ripple.db");
        let avatars_dir = base.join("avatars");

        Ok(Self {
            base,
            data_dir,
            db_path,
            avatars_dir,
        })
    }

    pub fn ensure_dirs(&self) -> Result<()> {
        std::fs::create_dir_all(&self.data_dir)?;
        std::fs::create_dir_all(&self.avatars_dir)?;
        Ok(())
    }
}
