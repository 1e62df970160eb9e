use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::export::{ExportOptions, OutputFormat};

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
/// User defaults for mist, read from `config.toml`.
pub struct AppConfig {
    pub font_path: Option<PathBuf>,
    pub output_format: Option<OutputFormat>,
    pub jpg_quality: Option<u8>,
    pub png_compression: Option<u8>,
    pub resize_long_edge: Option<u32>,
}

impl AppConfig {
    /// Returns the user config file path, if a config directory is available.
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("mist").join("config.toml"))
    }

    /// Loads config from disk, falling back to defaults on any error.
    pub fn load() -> Self {
        let Some(path) = Self::config_path() else {
            return Self::default();
        };
        Self::load_from(&path)
    }

    pub fn load_from(path: &Path) -> Self {
        let Ok(contents) = std::fs::read_to_string(path) else {
            return Self::default();
        };
        match toml::from_str(&contents) {
            Ok(config) => config,
            Err(err) => {
                tracing::warn!(path = %path.display(), %err, "ignoring invalid config");
                Self::default()
            }
        }
    }

    /// Export options with config values layered over the built-in defaults.
    pub fn export_options(&self) -> ExportOptions {
        let defaults = ExportOptions::default();
        ExportOptions {
            format: self.output_format,
            jpg_quality: self.jpg_quality.unwrap_or(defaults.jpg_quality),
            png_compression: self.png_compression.unwrap_or(defaults.png_compression),
            resize_long_edge: self.resize_long_edge.filter(|&edge| edge > 0),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::{Path, PathBuf};

    use super::AppConfig;
    use crate::export::OutputFormat;

    #[test]
    fn missing_file_gives_defaults() {
        let config = AppConfig::load_from(Path::new("/nonexistent/mist/config.toml"));
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn partial_toml_fills_export_options() {
        let config: AppConfig = toml::from_str(
            r#"
            font_path = "/fonts/Fjalla.ttf"
            output_format = "jpg"
            jpg_quality = 75
            resize_long_edge = 0
            "#,
        )
        .unwrap();
        assert_eq!(config.font_path, Some(PathBuf::from("/fonts/Fjalla.ttf")));

        let opts = config.export_options();
        assert_eq!(opts.format, Some(OutputFormat::Jpg));
        assert_eq!(opts.jpg_quality, 75);
        assert_eq!(opts.png_compression, 6);
        assert_eq!(opts.resize_long_edge, None);
    }
}
