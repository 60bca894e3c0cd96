use std::{
    fs::File,
    io::Read,
    path::{Path, PathBuf},
};

use color_eyre::{Result, eyre::Context};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct ParserConfig {
    /// Reject header keys and values this reader does not know
    pub strict_header: bool,
    /// Initial capacity of the open tag stack
    pub stack_capacity: usize,
    /// Tracing filter used when `RUST_LOG` is unset
    pub log_filter: String,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            strict_header: false,
            stack_capacity: 1024,
            log_filter: "warn".to_owned(),
        }
    }
}

impl ParserConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let mut config_text = String::new();

        File::open(path)
            .and_then(|mut f| f.read_to_string(&mut config_text))
            .wrap_err_with(|| format!("Cannot read config file at {:?}", path))?;

        toml::from_str(&config_text).wrap_err("Malformed config file")
    }

    /// `ofx/config.toml` in the OS config directory
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("ofx").join("config.toml"))
    }

    /// Load the default config file, falling back to defaults when it does not exist
    pub fn load_default() -> Result<Self> {
        match Self::default_path() {
            Some(path) if path.is_file() => Self::load(&path),
            _ => Ok(Self::default()),
        }
    }
}
