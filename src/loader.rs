//! Fetching and merging the map data.
//!
//! Boundaries and metadata are fetched concurrently and independently: a
//! failed metadata request leaves a globe of names with unknown details, a
//! failed boundary request leaves the globe loading. Neither is fatal.

use std::{collections::HashMap, fs, thread, time::Duration};

use anyhow::{anyhow, Context};
use serde_json::Value;

use crate::config::GlobeConfig;
use crate::country::{parse_rest_countries, CountryFeature, CountryInfo, FeatureSet, InfoLookup};
use crate::policy::apply_overrides;
use crate::topology::{apply_names, decode_features, parse_names_tsv};

/// Something that can produce a document body for a URL.
pub trait Source: Sync {
    fn fetch_text(&self, url: &str) -> anyhow::Result<String>;
}

/// Blocking HTTP(S) source. `file://` URLs are read from disk.
pub struct HttpSource {
    agent: ureq::Agent,
}

impl HttpSource {
    pub fn new(user_agent: &str) -> Self {
        let agent = ureq::AgentBuilder::new()
            .user_agent(user_agent)
            .timeout(Duration::from_secs(30))
            .build();
        Self { agent }
    }
}

impl Source for HttpSource {
    fn fetch_text(&self, url: &str) -> anyhow::Result<String> {
        if let Some(path) = url.strip_prefix("file://") {
            return fs::read_to_string(path).with_context(|| format!("reading {path}"));
        }
        let body = self
            .agent
            .get(url)
            .set("Accept-Encoding", "identity")
            .call()
            .with_context(|| format!("GET {url}"))?
            .into_string()
            .with_context(|| format!("reading body of {url}"))?;
        Ok(body)
    }
}

/// Outcome of one fetch.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum SourceState {
    /// Not configured.
    #[default]
    Skipped,
    /// Number of records taken from the source.
    Loaded(usize),
    Failed(String),
}

impl SourceState {
    pub fn is_loaded(&self) -> bool {
        matches!(self, Self::Loaded(_))
    }

    fn from_result<T>(result: &anyhow::Result<T>, count: impl Fn(&T) -> usize) -> Self {
        match result {
            Ok(v) => Self::Loaded(count(v)),
            Err(e) => Self::Failed(format!("{e:#}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct LoadStatus {
    pub topology: SourceState,
    pub names: SourceState,
    pub metadata: SourceState,
    pub fallback: SourceState,
}

/// Everything the globe needs to draw and describe countries.
#[derive(Debug, Clone, Default)]
pub struct World {
    pub features: FeatureSet,
    pub info: InfoLookup,
    pub status: LoadStatus,
}

impl World {
    /// Boundaries are present; metadata may still be missing.
    pub fn is_ready(&self) -> bool {
        self.status.topology.is_loaded() && !self.features.is_empty()
    }
}

fn fetch_features(source: &dyn Source, config: &GlobeConfig) -> anyhow::Result<Vec<CountryFeature>> {
    let url = &config.sources.topology_url;
    let text = source.fetch_text(url)?;
    let doc: Value = serde_json::from_str(&text).with_context(|| format!("parsing {url}"))?;
    decode_features(&doc, &config.sources.topology_object).with_context(|| format!("decoding {url}"))
}

fn fetch_info(source: &dyn Source, url: &str) -> anyhow::Result<Vec<CountryInfo>> {
    let text = source.fetch_text(url)?;
    parse_rest_countries(&text).with_context(|| format!("parsing {url}"))
}

fn log_failure(what: &str, result: &anyhow::Result<impl Sized>) {
    if let Err(e) = result {
        log::warn!("{what} unavailable: {e:#}");
    }
}

/// Fetch every configured source and merge the results.
pub fn load(source: &dyn Source, config: &GlobeConfig) -> World {
    let sources = &config.sources;
    log::info!("fetching boundaries from {}", sources.topology_url);
    log::info!("fetching metadata from {}", sources.metadata_url);

    let (features, metadata) = thread::scope(|s| {
        let features = s.spawn(|| fetch_features(source, config));
        let metadata = s.spawn(|| fetch_info(source, &sources.metadata_url));
        (
            features.join().unwrap_or_else(|_| Err(anyhow!("boundary fetch panicked"))),
            metadata.join().unwrap_or_else(|_| Err(anyhow!("metadata fetch panicked"))),
        )
    });

    let names = sources
        .names_url
        .as_deref()
        .map(|url| source.fetch_text(url).map(|t| parse_names_tsv(&t)));
    let fallback = sources.fallback_url.as_deref().map(|url| fetch_info(source, url));

    let mut status = LoadStatus {
        topology: SourceState::from_result(&features, Vec::len),
        metadata: SourceState::from_result(&metadata, Vec::len),
        ..Default::default()
    };
    log_failure("boundaries", &features);
    log_failure("metadata", &metadata);

    let mut features = features.unwrap_or_default();
    if let Some(names) = names {
        log_failure("names table", &names);
        status.names = SourceState::from_result(&names, HashMap::len);
        if let Ok(names) = names {
            let renamed = apply_names(&mut features, &names);
            log::debug!("names table renamed {renamed} features");
        }
    }

    let mut info = InfoLookup::new(metadata.unwrap_or_default());
    if let Some(fallback) = fallback {
        log_failure("fallback metadata", &fallback);
        status.fallback = SourceState::from_result(&fallback, Vec::len);
        if let Ok(records) = fallback {
            info.merge_fallback(records);
        }
    }

    let mut features = FeatureSet::new(features);
    apply_overrides(&config.overrides, &mut features, &mut info);
    log::info!(
        "loaded {} countries, {} metadata records",
        features.len(),
        info.len()
    );

    World { features, info, status }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::country::FeatureId;
    use serde_json::json;

    /// In-memory source keyed by URL.
    #[derive(Default)]
    pub(crate) struct FakeSource {
        pub bodies: HashMap<String, String>,
    }

    impl FakeSource {
        pub fn with(mut self, url: &str, body: impl Into<String>) -> Self {
            self.bodies.insert(url.to_string(), body.into());
            self
        }
    }

    impl Source for FakeSource {
        fn fetch_text(&self, url: &str) -> anyhow::Result<String> {
            self.bodies
                .get(url)
                .cloned()
                .ok_or_else(|| anyhow!("connection refused: {url}"))
        }
    }

    pub(crate) const TOPOLOGY: &str = "mem://topology";
    pub(crate) const METADATA: &str = "mem://metadata";

    /// France (250) and Yemen (887) as unquantized squares.
    pub(crate) fn topology() -> String {
        json!({
            "type": "Topology",
            "arcs": [
                [[0, 40], [10, 40], [10, 50], [0, 50], [0, 40]],
                [[40, 10], [50, 10], [50, 20], [40, 20], [40, 10]]
            ],
            "objects": {
                "countries": {
                    "type": "GeometryCollection",
                    "geometries": [
                        { "type": "Polygon", "id": "250", "arcs": [[0]], "properties": { "name": "France" } },
                        { "type": "Polygon", "id": "887", "arcs": [[1]], "properties": { "name": "Yemen" } }
                    ]
                }
            }
        })
        .to_string()
    }

    pub(crate) fn metadata() -> String {
        json!([
            {
                "ccn3": "250",
                "name": { "common": "France", "official": "French Republic" },
                "capital": ["Paris"],
                "region": "Europe",
                "population": 67391582
            },
            {
                "ccn3": "887",
                "name": { "common": "Yemen", "official": "Republic of Yemen" },
                "capital": ["Sana'a"],
                "region": "Asia",
                "population": 29825968
            }
        ])
        .to_string()
    }

    pub(crate) fn config() -> GlobeConfig {
        let mut config = GlobeConfig::default();
        config.sources.topology_url = TOPOLOGY.into();
        config.sources.metadata_url = METADATA.into();
        config
    }

    #[test]
    fn loads_and_joins_both_sources() {
        let source = FakeSource::default()
            .with(TOPOLOGY, topology())
            .with(METADATA, metadata());
        let world = load(&source, &config());
        assert!(world.is_ready());
        assert_eq!(world.status.topology, SourceState::Loaded(2));
        assert_eq!(world.status.metadata, SourceState::Loaded(2));
        assert_eq!(world.status.names, SourceState::Skipped);

        let yemen = world.features.get(&FeatureId::Code(887)).unwrap();
        let info = world.info.resolve(yemen).unwrap();
        assert_eq!(info.capital.as_deref(), Some("Sana'a"));
    }

    #[test]
    fn metadata_failure_keeps_the_map() {
        let source = FakeSource::default().with(TOPOLOGY, topology());
        let world = load(&source, &config());
        assert!(world.is_ready());
        assert!(world.info.is_empty());
        assert!(matches!(world.status.metadata, SourceState::Failed(ref e) if e.contains("connection refused")));
    }

    #[test]
    fn topology_failure_leaves_the_globe_loading() {
        let source = FakeSource::default()
            .with(TOPOLOGY, "<html>oops</html>")
            .with(METADATA, metadata());
        let world = load(&source, &config());
        assert!(!world.is_ready());
        assert!(matches!(world.status.topology, SourceState::Failed(_)));
        assert_eq!(world.info.len(), 2);
    }

    #[test]
    fn optional_sources_and_overrides() {
        let mut config = config();
        config.sources.names_url = Some("mem://names".into());
        config.sources.fallback_url = Some("mem://fallback".into());
        config.overrides.capitals.insert("Yemen".into(), "Aden".into());
        let fallback = json!([
            { "ccn3": "887", "name": { "common": "Yemen" }, "capital": ["Ignored"], "area": 527968.0 }
        ]);
        let source = FakeSource::default()
            .with(TOPOLOGY, topology())
            .with(METADATA, metadata())
            .with("mem://names", "id\tname\n250\tFrench Republic\n")
            .with("mem://fallback", fallback.to_string());

        let world = load(&source, &config);
        assert_eq!(world.status.names, SourceState::Loaded(1));
        assert_eq!(world.status.fallback, SourceState::Loaded(1));

        let france = world.features.get(&FeatureId::Code(250)).unwrap();
        assert_eq!(france.name, "French Republic");
        assert_eq!(world.info.resolve(france).unwrap().capital.as_deref(), Some("Paris"));

        let yemen = world.info.by_code(887).unwrap();
        assert_eq!(yemen.capital.as_deref(), Some("Aden"));
        assert_eq!(yemen.area, Some(527968.0));
    }

    #[test]
    fn file_urls_read_from_disk() {
        let path = std::env::temp_dir().join(format!("world-globe-{}.tsv", std::process::id()));
        fs::write(&path, "250\tFrance\n").unwrap();
        let source = HttpSource::new("test");
        let text = source.fetch_text(&format!("file://{}", path.display())).unwrap();
        assert_eq!(text, "250\tFrance\n");
        fs::remove_file(&path).unwrap();
        assert!(source.fetch_text(&format!("file://{}", path.display())).is_err());
    }
}
