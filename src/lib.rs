//! world-globe: the core of an interactive orthographic world globe.
//!
//! Country boundaries come from a TopoJSON (or GeoJSON) document, country
//! metadata from a REST endpoint. Both are merged into a [`World`], handed
//! to a [`Globe`], and the globe turns pointer/wheel/tick input into
//! painted [`Scene`]s that serialize to SVG.
//!
//! ```no_run
//! use world_globe::{config::GlobeConfig, i18n::Catalog, loader, Globe};
//!
//! let config = GlobeConfig::default();
//! let source = loader::HttpSource::new(&config.sources.user_agent);
//! let world = loader::load(&source, &config);
//!
//! let mut globe = Globe::new(config, Catalog::builtin(), 960.0)?;
//! globe.apply_world(world);
//! globe.tick(16.0);
//! if let Some(scene) = globe.frame() {
//!     std::fs::write("globe.svg", scene.to_svg())?;
//! }
//! # Ok::<(), anyhow::Error>(())
//! ```

pub mod config;
pub mod country;
pub mod dialog;
pub mod frame;
pub mod geo;
pub mod globe;
pub mod i18n;
pub mod interaction;
pub mod loader;
pub mod policy;
pub mod projection;
pub mod render;
pub mod search;
pub mod topology;

pub use globe::Globe;
pub use loader::World;
pub use render::Scene;
