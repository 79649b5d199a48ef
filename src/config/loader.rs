//! Engine config loading: TOML text to a validated [`EngineConfig`].

use crate::config::errors::ConfigError;
use crate::config::schema::EngineConfig;
use std::fs;
use std::path::Path;
use tracing::debug;

/// Parse and validate a TOML config. An empty document yields the defaults.
pub fn load_from_str(input: &str) -> Result<EngineConfig, ConfigError> {
    parse_and_validate(input, None)
}

/// Read, parse and validate the TOML config at `path`. Errors name the file.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<EngineConfig, ConfigError> {
    let path = path.as_ref();
    let input = fs::read_to_string(path).map_err(|source| ConfigError::io(path, source))?;
    let config = parse_and_validate(&input, Some(path))?;
    debug!(path = %path.display(), "loaded engine config");
    Ok(config)
}

fn parse_and_validate(input: &str, origin: Option<&Path>) -> Result<EngineConfig, ConfigError> {
    let path = || origin.map(Path::to_path_buf);
    let config: EngineConfig = toml_edit::de::from_str(input).map_err(|source| ConfigError::Toml {
        path: path(),
        source,
    })?;
    config.validate().map_err(|source| ConfigError::Invalid {
        path: path(),
        source,
    })?;
    Ok(config)
}
