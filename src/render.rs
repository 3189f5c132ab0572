//! Scene painting and SVG output.
//!
//! A [`Scene`] is a complete description of one frame: the sphere, the
//! graticule, one path per visible country with its highlight style, and
//! the tooltip. Hosts either consume the scene directly or serialize it
//! with [`Scene::to_svg`].

use std::borrow::Cow;
use std::fmt::Write as _;

use glam::DVec3;

use crate::country::{FeatureId, FeatureSet};
use crate::geo::LonLat;
use crate::hit_test::Tooltip;
use crate::i18n::Direction;
use crate::policy::{HighlightPolicy, PolicyTable};
use crate::projection::{PathBuilder, Projection};

const OCEAN: &str = "#0c1a2e";
const GRATICULE: &str = "#162032";
const LAND: &str = "#1d3461";
const BORDER: &str = "#2d4a7a";
const PINNED: &str = "#c084fc";
const SELECTED: &str = "#f87171";
const HOVERED: &str = "#fde047";
const TEXT: &str = "#e2e8f0";

/// Grid spacing of the graticule, in degrees.
const GRATICULE_STEP: i32 = 10;
/// Sampling step along graticule lines, in degrees.
const GRATICULE_SAMPLE: f64 = 2.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PathStyle {
    #[default]
    Base,
    Hovered,
    Selected,
    Pinned,
}

impl PathStyle {
    /// Pinned wins over everything; hover wins over selection unless the
    /// feature is excluded from hover highlighting.
    pub fn resolve(policy: HighlightPolicy, hovered: bool, selected: bool) -> Self {
        match policy {
            HighlightPolicy::Pinned => Self::Pinned,
            HighlightPolicy::Normal if hovered => Self::Hovered,
            _ if selected => Self::Selected,
            _ => Self::Base,
        }
    }

    pub fn fill(self) -> &'static str {
        match self {
            Self::Base => LAND,
            Self::Hovered => HOVERED,
            Self::Selected => SELECTED,
            Self::Pinned => PINNED,
        }
    }

    fn class(self) -> &'static str {
        match self {
            Self::Base => "country",
            Self::Hovered => "country hovered",
            Self::Selected => "country selected",
            Self::Pinned => "country pinned",
        }
    }
}

/// Which features are highlighted this frame.
#[derive(Debug, Clone, Copy)]
pub struct Highlight<'a> {
    pub policies: &'a PolicyTable,
    pub hovered: Option<&'a FeatureId>,
    pub selected: Option<&'a FeatureId>,
}

impl Highlight<'_> {
    pub fn style_for(&self, id: &FeatureId) -> PathStyle {
        PathStyle::resolve(
            self.policies.get(id),
            self.hovered == Some(id),
            self.selected == Some(id),
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CountryPath {
    pub id: FeatureId,
    pub d: String,
    pub style: PathStyle,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Scene {
    pub width: f64,
    pub height: f64,
    pub direction: Direction,
    pub title: String,
    pub sphere: String,
    pub graticule: String,
    /// Visible countries in paint order.
    pub countries: Vec<CountryPath>,
    pub tooltip: Option<Tooltip>,
    /// Shown instead of countries while the map data is loading.
    pub placeholder: Option<String>,
}

/// Meridians every 10° (stopping at ±80° except the four main ones, which
/// reach the poles) and parallels every 10° up to ±80°.
pub fn graticule_lines() -> Vec<Vec<DVec3>> {
    let samples = |from: f64, to: f64| {
        let n = ((to - from) / GRATICULE_SAMPLE).round() as usize;
        (0..=n).map(move |i| from + i as f64 * GRATICULE_SAMPLE)
    };

    let mut lines = Vec::new();
    for lon in (-180..180).step_by(GRATICULE_STEP as usize) {
        let extent = if lon % 90 == 0 { 90.0 } else { 80.0 };
        lines.push(
            samples(-extent, extent)
                .map(|lat| LonLat::new(lon as f64, lat).to_vec3())
                .collect(),
        );
    }
    for lat in (-80..=80).step_by(GRATICULE_STEP as usize) {
        lines.push(
            samples(-180.0, 180.0)
                .map(|lon| LonLat::new(lon, lat as f64).to_vec3())
                .collect(),
        );
    }
    lines
}

fn graticule_path(projection: &Projection) -> String {
    let mut out = PathBuilder::new();
    for line in graticule_lines() {
        projection.line_path(&line, &mut out);
    }
    out.finish()
}

impl Scene {
    fn frame(projection: &Projection, width: f64, height: f64, direction: Direction, title: &str) -> Self {
        Self {
            width,
            height,
            direction,
            title: title.to_string(),
            sphere: projection.sphere_path(),
            graticule: graticule_path(projection),
            countries: Vec::new(),
            tooltip: None,
            placeholder: None,
        }
    }

    /// Paint every country that is at least partly on the visible side.
    pub fn paint(
        projection: &Projection,
        (width, height): (f64, f64),
        direction: Direction,
        title: &str,
        features: &FeatureSet,
        highlight: Highlight<'_>,
        tooltip: Option<Tooltip>,
    ) -> Self {
        let mut scene = Self::frame(projection, width, height, direction, title);
        for feature in features.iter() {
            let mut out = PathBuilder::new();
            for polygon in feature.geometry.polygons() {
                projection.polygon_path(polygon, &mut out);
            }
            if out.is_empty() {
                continue;
            }
            scene.countries.push(CountryPath {
                id: feature.id.clone(),
                d: out.finish(),
                style: highlight.style_for(&feature.id),
            });
        }
        scene.tooltip = tooltip;
        scene
    }

    /// The empty globe with a loading message.
    pub fn loading(
        projection: &Projection,
        (width, height): (f64, f64),
        direction: Direction,
        title: &str,
        message: &str,
    ) -> Self {
        let mut scene = Self::frame(projection, width, height, direction, title);
        scene.placeholder = Some(message.to_string());
        scene
    }

    pub fn country(&self, id: &FeatureId) -> Option<&CountryPath> {
        self.countries.iter().find(|c| &c.id == id)
    }

    /// Ids whose path or style differs from `prev`, including countries that
    /// appeared or disappeared.
    pub fn changed_since(&self, prev: &Scene) -> Vec<FeatureId> {
        let mut changed: Vec<FeatureId> = self
            .countries
            .iter()
            .filter(|c| prev.country(&c.id) != Some(*c))
            .map(|c| c.id.clone())
            .collect();
        changed.extend(
            prev.countries
                .iter()
                .filter(|c| self.country(&c.id).is_none())
                .map(|c| c.id.clone()),
        );
        changed
    }

    pub fn to_svg(&self) -> String {
        let (w, h) = (self.width, self.height);
        let mut s = String::with_capacity(256 << 10);

        let _ = write!(
            s,
            r#"<?xml version="1.0" encoding="UTF-8"?>
<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}" direction="{dir}">
  <title>{title}</title>
"#,
            dir = self.direction.as_str(),
            title = escape(&self.title),
        );

        let _ = writeln!(
            s,
            "  <path data-layer='sphere' d='{}' fill='{OCEAN}' stroke='{BORDER}' stroke-width='1'/>",
            self.sphere
        );
        let _ = writeln!(
            s,
            "  <path data-layer='graticule' d='{}' fill='none' stroke='{GRATICULE}' stroke-width='0.5'/>",
            self.graticule
        );

        s.push_str("  <g data-layer='countries' stroke='");
        s.push_str(BORDER);
        s.push_str("' stroke-width='0.5' fill-rule='evenodd'>\n");
        for c in &self.countries {
            let _ = writeln!(
                s,
                "    <path class='{}' data-id='{}' d='{}' fill='{}'/>",
                c.style.class(),
                escape(&c.id.to_string()),
                c.d,
                c.style.fill()
            );
        }
        s.push_str("  </g>\n");

        if let Some(text) = &self.placeholder {
            let _ = writeln!(
                s,
                "  <text data-layer='placeholder' x='{:.1}' y='{:.1}' text-anchor='middle' font-family='sans-serif' font-size='16' fill='{TEXT}'>{}</text>",
                w / 2.0,
                h / 2.0,
                escape(text)
            );
        }

        if let Some(tip) = &self.tooltip {
            let lines = tip.lines();
            let height = 8.0 + 16.0 * lines.len() as f64;
            let _ = writeln!(
                s,
                "  <g data-layer='tooltip' transform='translate({:.1},{:.1})' direction='{}' font-family='sans-serif' font-size='12' fill='{TEXT}'>",
                tip.x,
                tip.y,
                tip.direction.as_str()
            );
            let _ = writeln!(
                s,
                "    <rect width='220' height='{height:.1}' rx='4' fill='{OCEAN}' fill-opacity='0.9' stroke='{BORDER}'/>"
            );
            for (i, line) in lines.iter().enumerate() {
                let _ = writeln!(
                    s,
                    "    <text x='8' y='{:.1}'>{}</text>",
                    20.0 + 16.0 * i as f64,
                    escape(line)
                );
            }
            s.push_str("  </g>\n");
        }

        s.push_str("</svg>\n");
        s
    }
}

fn escape(text: &str) -> Cow<'_, str> {
    if !text.contains(['&', '<', '>', '\'', '"']) {
        return Cow::Borrowed(text);
    }
    let mut out = String::with_capacity(text.len() + 8);
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\'' => out.push_str("&apos;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    Cow::Owned(out)
}
