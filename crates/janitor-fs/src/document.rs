//! Serde documents on disk
//!
//! The repair config, the object documents of the directory host and the
//! generated descriptors all go through [`DocumentStore`]. Rendered output
//! always ends with a newline, and saving an unchanged document is a no-op.

use serde::{Serialize, de::DeserializeOwned};

use crate::{Error, NormalizedPath, Result, io};

/// On-disk document format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Toml,
    Json,
    Yaml,
}

impl Format {
    /// Detect the format from the file extension
    pub fn from_path(path: &NormalizedPath) -> Result<Self> {
        let extension = path.extension().unwrap_or("");
        match extension.to_lowercase().as_str() {
            "toml" => Ok(Self::Toml),
            "json" => Ok(Self::Json),
            "yaml" | "yml" => Ok(Self::Yaml),
            _ => Err(Error::UnsupportedFormat {
                extension: extension.to_string(),
            }),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Toml => "TOML",
            Self::Json => "JSON",
            Self::Yaml => "YAML",
        }
    }
}

#[derive(Debug, Default)]
pub struct DocumentStore {
    robustness: io::RobustnessConfig,
}

impl DocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_robustness(robustness: io::RobustnessConfig) -> Self {
        Self { robustness }
    }

    /// Load a document whose format follows its extension
    pub fn load<T: DeserializeOwned>(&self, path: &NormalizedPath) -> Result<T> {
        self.load_as(path, Format::from_path(path)?)
    }

    pub fn load_as<T: DeserializeOwned>(&self, path: &NormalizedPath, format: Format) -> Result<T> {
        let content = io::read_text(path)?;
        let parsed = match format {
            Format::Toml => toml::from_str(&content).map_err(|e| e.to_string()),
            Format::Json => serde_json::from_str(&content).map_err(|e| e.to_string()),
            Format::Yaml => serde_yaml::from_str(&content).map_err(|e| e.to_string()),
        };
        parsed.map_err(|message| Error::DocumentParse {
            path: path.to_native(),
            format: format.name().into(),
            message,
        })
    }

    /// Render `value` exactly as [`DocumentStore::save_as`] would write it
    pub fn render<T: Serialize>(&self, path: &NormalizedPath, format: Format, value: &T) -> Result<String> {
        let rendered = match format {
            Format::Toml => toml::to_string_pretty(value).map_err(|e| e.to_string()),
            Format::Json => serde_json::to_string_pretty(value).map_err(|e| e.to_string()),
            Format::Yaml => serde_yaml::to_string(value).map_err(|e| e.to_string()),
        };
        let mut content = rendered.map_err(|message| Error::DocumentSerialize {
            path: path.to_native(),
            format: format.name().into(),
            message,
        })?;
        if !content.ends_with('\n') {
            content.push('\n');
        }
        Ok(content)
    }

    /// True when the file at `path` already holds the rendering of `value`
    pub fn is_current<T: Serialize>(&self, path: &NormalizedPath, format: Format, value: &T) -> Result<bool> {
        let desired = self.render(path, format, value)?;
        Ok(path.is_file() && io::read_text(path).is_ok_and(|current| current == desired))
    }

    /// Write `value` atomically unless the file already holds it.
    ///
    /// Returns whether anything was written.
    pub fn save_as<T: Serialize>(&self, path: &NormalizedPath, format: Format, value: &T) -> Result<bool> {
        let desired = self.render(path, format, value)?;
        if path.is_file() && io::read_text(path).is_ok_and(|current| current == desired) {
            return Ok(false);
        }
        io::write_atomic(path, desired.as_bytes(), self.robustness)?;
        Ok(true)
    }
}
