//! Globe configuration.
//!
//! Every field has a default, so an empty JSON object (or no file at all)
//! yields a working globe. A config file only needs the fields it changes:
//!
//! ```json
//! {
//!   "view": { "reduced_motion": true },
//!   "locale": { "default": "en" },
//!   "overrides": { "pinned": ["Yemen"] }
//! }
//! ```

use std::{fs, path::Path};

use anyhow::{bail, Context};
use serde::Deserialize;

use crate::i18n::Locale;
use crate::policy::Overrides;

const TOPOLOGY_URL: &str = "https://unpkg.com/world-atlas@2/countries-110m.json";

// restcountries caps `fields` at ten entries; the emoji flag is derived
// from the `flags` image names instead.
const METADATA_URL: &str = "https://restcountries.com/v3.1/all\
     ?fields=ccn3,name,capital,region,subregion,population,area,flags,currencies,languages";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct GlobeConfig {
    pub sources: Sources,
    pub view: ViewSettings,
    pub locale: LocaleSettings,
    pub overrides: Overrides,
}

/// Where the loader fetches from. `file://` URLs read the local filesystem.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Sources {
    pub topology_url: String,
    /// Name of the object inside the topology's `objects` map.
    pub topology_object: String,
    /// Optional `id<TAB>name` table that renames features by numeric id.
    pub names_url: Option<String>,
    pub metadata_url: String,
    /// Static metadata merged after the REST data; fills gaps only.
    pub fallback_url: Option<String>,
    pub user_agent: String,
}

impl Default for Sources {
    fn default() -> Self {
        Self {
            topology_url: TOPOLOGY_URL.to_string(),
            topology_object: "countries".to_string(),
            names_url: None,
            metadata_url: METADATA_URL.to_string(),
            fallback_url: None,
            user_agent: concat!("world-globe/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ViewSettings {
    pub initial_yaw: f64,
    pub initial_pitch: f64,
    pub initial_zoom: f64,
    /// Pitch is clamped to `[-pitch_limit, pitch_limit]` degrees.
    pub pitch_limit: f64,
    pub min_zoom: f64,
    pub max_zoom: f64,
    /// Degrees of rotation per pixel of drag.
    pub drag_sensitivity: f64,
    /// Zoom factor exponent per wheel delta unit.
    pub wheel_sensitivity: f64,
    /// Idle auto-rotation speed in degrees per millisecond.
    pub spin_speed: f64,
    /// Quiet time after the last wheel event before the globe counts as idle again.
    pub zoom_settle_ms: f64,
    pub reduced_motion: bool,
    /// Maximum screen-space error (px) when resampling great-circle edges.
    /// Zero disables resampling.
    pub precision: f64,
    /// Gap (px) between the sphere outline and the viewport edge.
    pub margin: f64,
    pub aspect: f64,
    pub min_height: f64,
    pub max_height: f64,
}

impl Default for ViewSettings {
    fn default() -> Self {
        Self {
            initial_yaw: 0.0,
            initial_pitch: -15.0,
            initial_zoom: 1.0,
            pitch_limit: 60.0,
            min_zoom: 0.5,
            max_zoom: 3.0,
            drag_sensitivity: 0.25,
            wheel_sensitivity: 0.002,
            spin_speed: 0.015,
            zoom_settle_ms: 150.0,
            reduced_motion: false,
            precision: 0.5,
            margin: 8.0,
            aspect: 0.65,
            min_height: 420.0,
            max_height: 720.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LocaleSettings {
    pub default: Locale,
    /// Hide names that have no translation instead of showing the source name.
    pub strict: bool,
    /// Extra translation tables merged over the built-in catalog.
    pub catalog_path: Option<String>,
}

impl Default for LocaleSettings {
    fn default() -> Self {
        Self {
            default: Locale::Ar,
            strict: false,
            catalog_path: None,
        }
    }
}

impl GlobeConfig {
    /// Read a JSON config file and validate it.
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let config: Self = serde_json::from_str(&text)
            .with_context(|| format!("parsing config {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        let v = &self.view;
        if !(v.pitch_limit > 0.0 && v.pitch_limit <= 90.0) {
            bail!("view.pitch_limit must be in (0, 90], got {}", v.pitch_limit);
        }
        if !(v.min_zoom > 0.0 && v.min_zoom <= v.max_zoom) {
            bail!(
                "view zoom range is invalid: min_zoom {} / max_zoom {}",
                v.min_zoom,
                v.max_zoom
            );
        }
        if v.min_height > v.max_height {
            bail!(
                "view height range is invalid: min_height {} / max_height {}",
                v.min_height,
                v.max_height
            );
        }
        if v.precision < 0.0 {
            bail!("view.precision must not be negative, got {}", v.precision);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_object_gives_defaults() {
        let config: GlobeConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.view.pitch_limit, 60.0);
        assert_eq!(config.view.min_zoom, 0.5);
        assert_eq!(config.view.max_zoom, 3.0);
        assert_eq!(config.locale.default, Locale::Ar);
        assert_eq!(config.sources.topology_object, "countries");
        config.validate().unwrap();
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let config: GlobeConfig = serde_json::from_str(
            r#"{ "view": { "reduced_motion": true }, "locale": { "default": "en" } }"#,
        )
        .unwrap();
        assert!(config.view.reduced_motion);
        assert_eq!(config.view.spin_speed, 0.015);
        assert_eq!(config.locale.default, Locale::En);
        assert!(!config.locale.strict);
    }

    #[test]
    fn inverted_zoom_range_is_rejected() {
        let mut config = GlobeConfig::default();
        config.view.min_zoom = 4.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn load_reports_missing_file() {
        let err = GlobeConfig::load("/nonexistent/globe.json").unwrap_err();
        assert!(format!("{err:#}").contains("reading config"));
    }
}
