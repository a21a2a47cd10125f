use directories::ProjectDirs;
use eyre::Result;
use folio_export::ExportOptions;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub export: ExportConfig,
    #[serde(default)]
    pub images: ImageConfig,
    #[serde(default)]
    pub render: RenderConfig,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct ExportConfig {
    pub output_dir: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ImageConfig {
    pub timeout_ms: u64,
    pub max_width: u32,
    pub placeholder_width: u32,
    pub placeholder_height: u32,
    pub placeholder_caption: String,
    pub base_url: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct RenderConfig {
    pub raster_scale: f32,
}

impl Default for ImageConfig {
    fn default() -> Self {
        let options = ExportOptions::default();
        Self {
            timeout_ms: options.image_timeout_ms,
            max_width: options.max_image_width,
            placeholder_width: options.placeholder_width,
            placeholder_height: options.placeholder_height,
            placeholder_caption: options.placeholder_caption,
            base_url: options.base_url,
        }
    }
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            raster_scale: ExportOptions::default().raster_scale,
        }
    }
}

impl Config {
    /// Every key accepted by [`Config::get_value`] and [`Config::set_value`].
    pub const KEYS: &'static [&'static str] = &[
        "export.output_dir",
        "images.timeout_ms",
        "images.max_width",
        "images.placeholder_width",
        "images.placeholder_height",
        "images.placeholder_caption",
        "images.base_url",
        "render.raster_scale",
    ];

    pub fn get_config_path() -> PathBuf {
        get_default_config_dir().join("config.json")
    }

    pub async fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            let default_config = Self::default();
            default_config.save(path).await?;
            return Ok(default_config);
        }

        let content = fs::read_to_string(path).await?;
        let config: Config = serde_json::from_str(&content)?;
        Ok(config)
    }

    pub async fn save(&self, path: &Path) -> Result<()> {
        // Create parent directory if it doesn't exist
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content).await?;
        Ok(())
    }

    /// Options handed to the export manager.
    pub fn export_options(&self) -> ExportOptions {
        ExportOptions {
            image_timeout_ms: self.images.timeout_ms,
            max_image_width: self.images.max_width,
            placeholder_width: self.images.placeholder_width,
            placeholder_height: self.images.placeholder_height,
            placeholder_caption: self.images.placeholder_caption.clone(),
            raster_scale: self.render.raster_scale,
            base_url: self.images.base_url.clone(),
        }
    }

    pub fn set_value(&mut self, key: &str, value: &str) -> Result<()> {
        let parts: Vec<&str> = key.split('.').collect();

        match parts.as_slice() {
            ["export", "output_dir"] => {
                self.export.output_dir = optional(value);
            }
            ["images", "timeout_ms"] => {
                self.images.timeout_ms = parse_number(value)?;
            }
            ["images", "max_width"] => {
                self.images.max_width = parse_positive(value)?;
            }
            ["images", "placeholder_width"] => {
                self.images.placeholder_width = parse_positive(value)?;
            }
            ["images", "placeholder_height"] => {
                self.images.placeholder_height = parse_positive(value)?;
            }
            ["images", "placeholder_caption"] => {
                self.images.placeholder_caption = value.to_string();
            }
            ["images", "base_url"] => {
                if !value.is_empty() {
                    url::Url::parse(value)
                        .map_err(|e| eyre::eyre!("Invalid URL '{}': {}", value, e))?;
                }
                self.images.base_url = optional(value);
            }
            ["render", "raster_scale"] => {
                let scale = value
                    .parse::<f32>()
                    .map_err(|_| eyre::eyre!("Invalid number: {}", value))?;
                if !(scale.is_finite() && scale > 0.0) {
                    return Err(eyre::eyre!("Raster scale must be positive: {}", value));
                }
                self.render.raster_scale = scale;
            }
            _ => {
                return Err(eyre::eyre!("Unknown configuration key: {}", key));
            }
        }

        Ok(())
    }

    pub fn get_value(&self, key: &str) -> Result<String> {
        let parts: Vec<&str> = key.split('.').collect();

        let value = match parts.as_slice() {
            ["export", "output_dir"] => self.export.output_dir.clone().unwrap_or_default(),
            ["images", "timeout_ms"] => self.images.timeout_ms.to_string(),
            ["images", "max_width"] => self.images.max_width.to_string(),
            ["images", "placeholder_width"] => self.images.placeholder_width.to_string(),
            ["images", "placeholder_height"] => self.images.placeholder_height.to_string(),
            ["images", "placeholder_caption"] => self.images.placeholder_caption.clone(),
            ["images", "base_url"] => self.images.base_url.clone().unwrap_or_default(),
            ["render", "raster_scale"] => self.render.raster_scale.to_string(),
            _ => {
                return Err(eyre::eyre!("Unknown configuration key: {}", key));
            }
        };

        Ok(value)
    }

    pub fn show_all(&self) -> String {
        let not_set = "(not set)".to_string();
        format!(
            "Configuration:\n\
             Export:\n\
             └─ output_dir: {}\n\
             Images:\n\
             ├─ timeout_ms: {}\n\
             ├─ max_width: {}\n\
             ├─ placeholder_width: {}\n\
             ├─ placeholder_height: {}\n\
             ├─ placeholder_caption: {}\n\
             └─ base_url: {}\n\
             Render:\n\
             └─ raster_scale: {}",
            self.export.output_dir.as_ref().unwrap_or(&not_set),
            self.images.timeout_ms,
            self.images.max_width,
            self.images.placeholder_width,
            self.images.placeholder_height,
            self.images.placeholder_caption,
            self.images.base_url.as_ref().unwrap_or(&not_set),
            self.render.raster_scale,
        )
    }

    pub async fn reset(path: &Path) -> Result<Self> {
        let config = Self::default();
        config.save(path).await?;
        Ok(config)
    }
}

fn optional(value: &str) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

fn parse_number<T: std::str::FromStr>(value: &str) -> Result<T> {
    value
        .parse::<T>()
        .map_err(|_| eyre::eyre!("Invalid number: {}", value))
}

fn parse_positive(value: &str) -> Result<u32> {
    match parse_number::<u32>(value)? {
        0 => Err(eyre::eyre!("Value must be positive: {}", value)),
        n => Ok(n),
    }
}

/// Get the default configuration directory
fn get_default_config_dir() -> PathBuf {
    if let Some(proj_dirs) = ProjectDirs::from("org", "folio", "folio") {
        proj_dirs.config_dir().to_path_buf()
    } else {
        // Fallback to current directory if we can't determine project dirs
        PathBuf::from(".folio").join("config")
    }
}
