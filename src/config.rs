//! Layered configuration: defaults, an optional file, then `CANOPY__*`
//! environment variables.
use canopy_render::RenderOptions;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CanopyConfig {
    pub render: RenderSettings,
    pub fetch: FetchSettings,
    pub document: DocumentSettings,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RenderSettings {
    pub request_timeout_ms: u64,
    pub max_component_depth: usize,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            request_timeout_ms: 5000,
            max_component_depth: 64,
        }
    }
}

impl RenderSettings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn to_options(&self) -> RenderOptions {
        RenderOptions {
            request_timeout: self.request_timeout(),
            max_component_depth: self.max_component_depth,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FetchSettings {
    pub user_agent: String,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            user_agent: concat!("canopy/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

/// Settings for the HTML document wrapped around a rendered page.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DocumentSettings {
    pub lang: String,
    pub title: Option<String>,
    /// Client bundle loaded after the hydration data.
    pub client_script: Option<String>,
}

impl Default for DocumentSettings {
    fn default() -> Self {
        Self {
            lang: "en".to_string(),
            title: None,
            client_script: None,
        }
    }
}

impl CanopyConfig {
    /// Loads `path` (format by extension) if given, then layers environment
    /// variables such as `CANOPY__RENDER__REQUEST_TIMEOUT_MS` on top.
    pub fn load(path: Option<&Path>) -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            log::debug!("Loading configuration from {}", path.display());
            builder = builder.add_source(config::File::from(path));
        }
        builder = builder.add_source(config::Environment::with_prefix("CANOPY").separator("__"));
        builder.build()?.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn defaults_without_sources() {
        let config = CanopyConfig::load(None).unwrap();
        assert_eq!(config.render.request_timeout_ms, 5000);
        assert_eq!(config.render.max_component_depth, 64);
        assert_eq!(config.document.lang, "en");
        assert!(config.fetch.user_agent.starts_with("canopy/"));
    }

    #[test]
    fn file_values_override_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("canopy.toml");
        fs::write(
            &path,
            "[render]\nrequest_timeout_ms = 250\n\n[document]\ntitle = \"Shop\"\n",
        )
        .unwrap();

        let config = CanopyConfig::load(Some(&path)).unwrap();
        assert_eq!(config.render.request_timeout(), Duration::from_millis(250));
        assert_eq!(config.render.max_component_depth, 64);
        assert_eq!(config.document.title.as_deref(), Some("Shop"));
    }

    #[test]
    fn missing_file_is_an_error() {
        let dir = tempdir().unwrap();
        let result = CanopyConfig::load(Some(&dir.path().join("absent.toml")));
        assert!(result.is_err());
    }
}
