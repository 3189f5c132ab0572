//! world-globe: fetch country boundaries and metadata, drive the globe
//! headlessly and write the painted frame as a self-contained SVG.
//!
//! Output: `globe.svg` (orthographic projection)
//!
//! Colours:
//!   dark blue (#1d3461) country
//!   yellow    (#fde047) hovered
//!   red       (#f87171) selected by search
//!   purple    (#c084fc) pinned

use std::{fs, path::PathBuf};

use anyhow::{bail, Context};
use clap::Parser;
use log::{info, warn};

use world_globe::{config::GlobeConfig, i18n::Catalog, i18n::Locale, loader, Globe};

/// Length of one simulated display frame.
const FRAME_MS: f64 = 16.0;

#[derive(Parser, Debug)]
#[command(author, version, about = "Render the interactive world globe to SVG")]
struct Args {
    /// JSON config file (sources, view, locale, overrides)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Available width in pixels; the height follows the configured aspect ratio
    #[arg(long, default_value_t = 960.0)]
    width: f64,

    /// UI language: ar or en
    #[arg(long)]
    locale: Option<Locale>,

    /// Initial yaw in degrees
    #[arg(long, allow_hyphen_values = true)]
    yaw: Option<f64>,

    /// Initial pitch in degrees
    #[arg(long, allow_hyphen_values = true)]
    pitch: Option<f64>,

    /// Initial zoom factor
    #[arg(long)]
    zoom: Option<f64>,

    /// Disable idle auto-rotation
    #[arg(long)]
    reduced_motion: bool,

    /// Extra translation catalog (JSON) merged over the built-in tables
    #[arg(long)]
    catalog: Option<PathBuf>,

    /// Milliseconds of idle spin to simulate before painting
    #[arg(long, default_value_t = 0.0)]
    spin_ms: f64,

    /// Pointer position "x,y" to hover before painting
    #[arg(long, value_parser = parse_point, allow_hyphen_values = true)]
    hover: Option<(f64, f64)>,

    /// Country to search for and center on
    #[arg(long)]
    search: Option<String>,

    /// Print the detail panel of the searched (or hovered) country
    #[arg(long)]
    details: bool,

    /// Output file
    #[arg(long, default_value = "globe.svg")]
    out: PathBuf,
}

fn parse_point(s: &str) -> Result<(f64, f64), String> {
    let (x, y) = s
        .split_once(',')
        .ok_or_else(|| format!("expected x,y but got {s:?}"))?;
    let coord = |v: &str| {
        v.trim()
            .parse::<f64>()
            .map_err(|e| format!("bad coordinate {v:?}: {e}"))
    };
    Ok((coord(x)?, coord(y)?))
}

// ---------------------------------------------------------------------------
// Setup
// ---------------------------------------------------------------------------

fn build_config(args: &Args) -> anyhow::Result<GlobeConfig> {
    let mut config = match &args.config {
        Some(path) => GlobeConfig::load(path)?,
        None => GlobeConfig::default(),
    };
    let view = &mut config.view;
    if let Some(yaw) = args.yaw {
        view.initial_yaw = yaw;
    }
    if let Some(pitch) = args.pitch {
        view.initial_pitch = pitch;
    }
    if let Some(zoom) = args.zoom {
        view.initial_zoom = zoom;
    }
    if args.reduced_motion {
        view.reduced_motion = true;
    }
    if let Some(locale) = args.locale {
        config.locale.default = locale;
    }
    if let Some(path) = &args.catalog {
        config.locale.catalog_path = Some(path.display().to_string());
    }
    config.validate()?;
    Ok(config)
}

fn build_catalog(config: &GlobeConfig) -> anyhow::Result<Catalog> {
    let mut catalog = Catalog::builtin();
    if let Some(path) = &config.locale.catalog_path {
        let text = fs::read_to_string(path).with_context(|| format!("reading catalog {path}"))?;
        catalog
            .extend_from_json(&text)
            .with_context(|| format!("loading catalog {path}"))?;
        info!("merged translations from {path}");
    }
    Ok(catalog)
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    if !(args.width.is_finite() && args.width > 0.0) {
        bail!("--width must be a positive number, got {}", args.width);
    }
    let config = build_config(&args)?;
    let catalog = build_catalog(&config)?;

    let source = loader::HttpSource::new(&config.sources.user_agent);
    let world = loader::load(&source, &config);
    if !world.is_ready() {
        warn!("no country boundaries; the globe will show its loading placeholder");
    }

    let mut globe = Globe::new(config, catalog, args.width)?;
    globe.apply_world(world);

    let mut elapsed = 0.0;
    while elapsed < args.spin_ms {
        let dt = FRAME_MS.min(args.spin_ms - elapsed);
        globe.tick(dt);
        elapsed += dt;
    }

    if let Some(query) = &args.search {
        match globe.search(query) {
            Some(note) => info!("{}", note.message),
            None => warn!("empty search query ignored"),
        }
    }

    if let Some(point) = args.hover {
        globe.pointer_move(point);
        match globe.tooltip() {
            Some(tip) => info!("tooltip: {}", tip.lines().join(" | ")),
            None => info!("no country under {point:?}"),
        }
    }

    if args.details {
        match globe.selected().or(globe.hovered()).cloned() {
            Some(id) => {
                globe.open_details(&id);
                match globe.dialog().details() {
                    Some(details) => print!("{details}"),
                    None => warn!("no details available for {id}"),
                }
            }
            None => warn!("--details needs --search or --hover to pick a country"),
        }
    }

    let scene = globe.render();
    let svg = scene.to_svg();
    fs::write(&args.out, &svg).with_context(|| format!("writing {}", args.out.display()))?;
    info!(
        "written {} ({} countries, {} bytes)",
        args.out.display(),
        scene.countries.len(),
        svg.len()
    );
    globe.teardown();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn points_parse() {
        assert_eq!(parse_point("120, -4.5"), Ok((120.0, -4.5)));
        assert!(parse_point("120").is_err());
        assert!(parse_point("a,b").is_err());
    }

    #[test]
    fn flags_override_config() {
        let args = Args::parse_from([
            "world-globe",
            "--locale",
            "en",
            "--yaw",
            "-30",
            "--reduced-motion",
            "--hover",
            "400,260",
        ]);
        assert_eq!(args.hover, Some((400.0, 260.0)));
        let config = build_config(&args).unwrap();
        assert_eq!(config.locale.default, Locale::En);
        assert_eq!(config.view.initial_yaw, -30.0);
        assert!(config.view.reduced_motion);
        assert_eq!(config.view.initial_pitch, -15.0);
    }

    #[test]
    fn unreadable_config_is_an_error() {
        let mut args = Args::parse_from(["world-globe", "--zoom", "2"]);
        assert_eq!(build_config(&args).unwrap().view.initial_zoom, 2.0);
        args.config = Some(PathBuf::from("/nonexistent/world-globe.json"));
        assert!(build_config(&args).is_err());
    }
}
