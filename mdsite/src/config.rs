//! Code for reading app configuration from an optional TOML file. The file path is supplied via the command line.

use anyhow::{anyhow, Context, Result};
use same_file::is_same_file;
use serde::Deserialize;
use std::{
    fs::read_to_string,
    net::{IpAddr, Ipv4Addr},
    path::Path,
};
use toml_edit::de::from_str as toml_from_str;

pub const DEFAULT_MANIFEST: &str = "content/publish_index.json";
pub const DEFAULT_OUTPUT_DIR: &str = "htdocs";
pub const DEFAULT_PORT: u16 = 3000;

#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    // Path to the JSON manifest listing every page to generate
    pub manifest: Box<Path>,
    // Path to directory for generated site output
    pub output_dir: Box<Path>,
    // Path to a custom HTML page template; the built-in template is used if absent
    pub template: Option<Box<Path>>,
    // Development server settings
    pub serve: ServeConfig,
}

#[derive(Clone, Copy, Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServeConfig {
    pub interface: IpAddr,
    pub port: u16,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            manifest: Path::new(DEFAULT_MANIFEST).into(),
            output_dir: Path::new(DEFAULT_OUTPUT_DIR).into(),
            template: None,
            serve: ServeConfig::default(),
        }
    }
}

impl Default for ServeConfig {
    fn default() -> Self {
        Self {
            interface: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: DEFAULT_PORT,
        }
    }
}

impl Config {
    /// Reads a config file. Settings missing from the file keep their default values.
    ///
    /// # Errors
    /// This function returns an error if the file cannot be read or is not valid configuration TOML.
    pub fn from_path(path: &Path) -> Result<Self> {
        let text = read_to_string(path)
            .with_context(|| format!("failed to read configuration from {path:?}"))?;

        Self::from_toml(&text).context("failed to parse configuration file")
    }

    /// Parses configuration from TOML text.
    ///
    /// # Errors
    /// This function returns an error if the text is not valid TOML, contains unknown settings,
    /// or contains settings of the wrong type.
    pub fn from_toml(text: &str) -> Result<Self> {
        toml_from_str(text).map_err(Into::into)
    }

    /// Checks that the configured paths can be used for a build.
    ///
    /// # Errors
    /// This function returns an error if:
    /// - `manifest` does not point to a file
    /// - `template` is set and does not point to a file
    /// - `output_dir` and `manifest` point to the same location
    pub fn check_paths(&self) -> Result<()> {
        if !self.manifest.is_file() {
            return Err(anyhow!(
                "`manifest`: {:?} does not point to a file",
                self.manifest
            ));
        }

        if let Some(template) = &self.template {
            if !template.is_file() {
                return Err(anyhow!("`template`: {template:?} does not point to a file"));
            }
        }

        if is_same_file(&self.output_dir, &self.manifest).unwrap_or(false) {
            Err(anyhow!(
                "`output_dir` and `manifest` point to the same location"
            ))
        } else {
            Ok(())
        }
    }
}
