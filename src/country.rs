//! Country features (geometry) and country info (metadata).
//!
//! Features and info records come from unrelated sources. A feature is
//! identified by [`FeatureId`]; an info record is found by numeric code or
//! by case-folded name, see [`InfoLookup::resolve`].

use std::{collections::HashMap, fmt};

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::geo::MultiPolygon;

/// Case-folded key used for every name comparison.
pub fn fold(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Identity of a feature: a numeric country code when the topology has one,
/// otherwise the feature's name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FeatureId {
    Code(u16),
    Name(String),
}

impl FeatureId {
    /// Interpret a raw topology id (`"004"`, `250`, `"-99"`), falling back
    /// to the feature name when the id is absent or not a country code.
    pub fn from_raw(raw: Option<&Value>, name: &str) -> Option<Self> {
        let code = match raw {
            Some(Value::Number(n)) => n.as_u64().and_then(|n| u16::try_from(n).ok()),
            Some(Value::String(s)) => s.trim().parse::<u16>().ok(),
            _ => None,
        };
        match code {
            Some(code) => Some(Self::Code(code)),
            None if !name.trim().is_empty() => Some(Self::Name(name.trim().to_string())),
            None => match raw {
                Some(Value::String(s)) if !s.trim().is_empty() => {
                    Some(Self::Name(s.trim().to_string()))
                }
                _ => None,
            },
        }
    }

    pub fn code(&self) -> Option<u16> {
        match self {
            Self::Code(code) => Some(*code),
            Self::Name(_) => None,
        }
    }
}

impl fmt::Display for FeatureId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Code(code) => write!(f, "{code:03}"),
            Self::Name(name) => f.write_str(name),
        }
    }
}

/// One country's boundary plus its display properties.
#[derive(Debug, Clone)]
pub struct CountryFeature {
    pub id: FeatureId,
    /// Display name in the source language.
    pub name: String,
    pub geometry: MultiPolygon,
    /// Remaining properties from the source document.
    pub properties: Map<String, Value>,
}

/// The loaded features, at most one per id, in source order.
#[derive(Debug, Clone, Default)]
pub struct FeatureSet {
    features: Vec<CountryFeature>,
    index: HashMap<FeatureId, usize>,
    /// Names as loaded, for features renamed since.
    loaded_names: HashMap<FeatureId, String>,
}

impl FeatureSet {
    /// Build the set; features sharing an id are merged into the first one.
    pub fn new(features: Vec<CountryFeature>) -> Self {
        let mut set = Self::default();
        for feature in features {
            if let Some(&i) = set.index.get(&feature.id) {
                log::debug!("merging duplicate feature {} into {}", feature.name, feature.id);
                set.features[i].geometry.extend(feature.geometry);
                continue;
            }
            set.index.insert(feature.id.clone(), set.features.len());
            set.features.push(feature);
        }
        set
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &CountryFeature> {
        self.features.iter()
    }

    /// Change a feature's display name. Ids are fixed once loaded.
    pub fn rename(&mut self, id: &FeatureId, name: &str) -> bool {
        let Some(&i) = self.index.get(id) else {
            return false;
        };
        let old = std::mem::replace(&mut self.features[i].name, name.to_string());
        self.loaded_names.entry(id.clone()).or_insert(old);
        true
    }

    /// The name a feature had before any [`rename`](Self::rename).
    pub fn loaded_name<'a>(&'a self, feature: &'a CountryFeature) -> &'a str {
        self.loaded_names
            .get(&feature.id)
            .map_or(feature.name.as_str(), String::as_str)
    }

    pub fn get(&self, id: &FeatureId) -> Option<&CountryFeature> {
        self.index.get(id).map(|&i| &self.features[i])
    }

    pub fn contains(&self, id: &FeatureId) -> bool {
        self.index.contains_key(id)
    }

    /// Case-insensitive lookup by display name.
    pub fn find_by_name(&self, name: &str) -> Option<&CountryFeature> {
        let key = fold(name);
        self.features.iter().find(|f| fold(&f.name) == key)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Currency {
    pub code: String,
    pub name: String,
    pub symbol: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlagImages {
    pub png: Option<String>,
    pub svg: Option<String>,
    pub alt: Option<String>,
}

/// Metadata for one country.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CountryInfo {
    pub name: String,
    pub official_name: Option<String>,
    pub code: Option<u16>,
    pub capital: Option<String>,
    pub population: Option<u64>,
    /// Square kilometres.
    pub area: Option<f64>,
    pub region: Option<String>,
    pub subregion: Option<String>,
    pub currencies: Vec<Currency>,
    pub languages: Vec<String>,
    /// Emoji flag.
    pub flag: Option<String>,
    pub flags: FlagImages,
}

fn fill<T: Clone>(slot: &mut Option<T>, other: &Option<T>) {
    if slot.is_none() {
        slot.clone_from(other);
    }
}

impl CountryInfo {
    /// Copy over every field of `other` that is missing here. Present values
    /// are never replaced.
    pub fn fill_gaps(&mut self, other: &CountryInfo) {
        if self.name.trim().is_empty() {
            self.name.clone_from(&other.name);
        }
        fill(&mut self.official_name, &other.official_name);
        fill(&mut self.code, &other.code);
        fill(&mut self.capital, &other.capital);
        fill(&mut self.population, &other.population);
        fill(&mut self.area, &other.area);
        fill(&mut self.region, &other.region);
        fill(&mut self.subregion, &other.subregion);
        fill(&mut self.flag, &other.flag);
        fill(&mut self.flags.png, &other.flags.png);
        fill(&mut self.flags.svg, &other.flags.svg);
        fill(&mut self.flags.alt, &other.flags.alt);
        if self.currencies.is_empty() {
            self.currencies.clone_from(&other.currencies);
        }
        if self.languages.is_empty() {
            self.languages.clone_from(&other.languages);
        }
    }
}

// ---------------------------------------------------------------------------
// REST wire format
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct RestCountry {
    #[serde(default)]
    ccn3: Option<String>,
    name: RestName,
    #[serde(default)]
    capital: Vec<String>,
    #[serde(default)]
    region: Option<String>,
    #[serde(default)]
    subregion: Option<String>,
    #[serde(default)]
    population: Option<u64>,
    #[serde(default)]
    area: Option<f64>,
    #[serde(default)]
    flag: Option<String>,
    #[serde(default)]
    flags: Option<RestFlags>,
    #[serde(default)]
    currencies: Option<std::collections::BTreeMap<String, RestCurrency>>,
    #[serde(default)]
    languages: Option<std::collections::BTreeMap<String, String>>,
}

#[derive(Debug, Deserialize)]
struct RestName {
    common: String,
    #[serde(default)]
    official: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RestFlags {
    png: Option<String>,
    svg: Option<String>,
    alt: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RestCurrency {
    name: String,
    #[serde(default)]
    symbol: Option<String>,
}

fn non_empty(s: Option<String>) -> Option<String> {
    s.filter(|s| !s.trim().is_empty())
}

/// Emoji flag from a flag image URL named after the ISO alpha-2 code,
/// e.g. `https://flagcdn.com/w320/ye.png` → 🇾🇪.
fn flag_from_image(url: &str) -> Option<String> {
    let file = url.rsplit('/').next()?;
    let stem = file.split_once('.').map_or(file, |(stem, _)| stem);
    if stem.len() != 2 || !stem.bytes().all(|b| b.is_ascii_alphabetic()) {
        return None;
    }
    stem.bytes()
        .map(|b| char::from_u32(0x1F1E6 + u32::from(b.to_ascii_lowercase() - b'a')))
        .collect()
}

impl From<RestCountry> for CountryInfo {
    fn from(rc: RestCountry) -> Self {
        let flags = rc.flags.map_or_else(FlagImages::default, |f| FlagImages {
            png: non_empty(f.png),
            svg: non_empty(f.svg),
            alt: non_empty(f.alt),
        });
        Self {
            name: rc.name.common,
            official_name: non_empty(rc.name.official),
            code: rc.ccn3.and_then(|c| c.trim().parse().ok()),
            capital: non_empty(rc.capital.into_iter().next()),
            population: rc.population.filter(|&p| p > 0),
            area: rc.area.filter(|&a| a > 0.0),
            region: non_empty(rc.region),
            subregion: non_empty(rc.subregion),
            currencies: rc
                .currencies
                .unwrap_or_default()
                .into_iter()
                .map(|(code, c)| Currency {
                    code,
                    name: c.name,
                    symbol: non_empty(c.symbol),
                })
                .collect(),
            languages: rc.languages.unwrap_or_default().into_values().collect(),
            flag: non_empty(rc.flag).or_else(|| {
                flags
                    .png
                    .as_deref()
                    .or(flags.svg.as_deref())
                    .and_then(flag_from_image)
            }),
            flags,
        }
    }
}

/// Parse a REST metadata payload (a JSON array of country records).
pub fn parse_rest_countries(text: &str) -> anyhow::Result<Vec<CountryInfo>> {
    let records: Vec<RestCountry> = serde_json::from_str(text)?;
    Ok(records.into_iter().map(CountryInfo::from).collect())
}

// ---------------------------------------------------------------------------
// Lookup
// ---------------------------------------------------------------------------

/// Country info indexed by numeric code and by case-folded name.
#[derive(Debug, Clone, Default)]
pub struct InfoLookup {
    records: Vec<CountryInfo>,
    by_name: HashMap<String, usize>,
    by_code: HashMap<u16, usize>,
}

impl InfoLookup {
    pub fn new(records: Vec<CountryInfo>) -> Self {
        let mut lookup = Self::default();
        for info in records {
            lookup.insert(info);
        }
        lookup
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &CountryInfo> {
        self.records.iter()
    }

    fn position_of(&self, info: &CountryInfo) -> Option<usize> {
        info.code
            .and_then(|c| self.by_code.get(&c))
            .or_else(|| self.by_name.get(&fold(&info.name)))
            .or_else(|| {
                info.official_name
                    .as_deref()
                    .and_then(|n| self.by_name.get(&fold(n)))
            })
            .copied()
    }

    fn index(&mut self, i: usize) {
        let info = &self.records[i];
        if let Some(code) = info.code {
            self.by_code.entry(code).or_insert(i);
        }
        let names = std::iter::once(info.name.as_str()).chain(info.official_name.as_deref());
        for name in names {
            let key = fold(name);
            if !key.is_empty() {
                self.by_name.entry(key).or_insert(i);
            }
        }
    }

    /// Add a record. A record matching an existing one by code or name is
    /// merged into it, the earlier values taking precedence.
    pub fn insert(&mut self, info: CountryInfo) {
        match self.position_of(&info) {
            Some(i) => {
                self.records[i].fill_gaps(&info);
                self.index(i);
            }
            None => {
                self.records.push(info);
                self.index(self.records.len() - 1);
            }
        }
    }

    /// Merge a later, static dataset: it fills gaps only.
    pub fn merge_fallback(&mut self, records: Vec<CountryInfo>) {
        for info in records {
            self.insert(info);
        }
    }

    /// Case-insensitive lookup by common or official name.
    pub fn get(&self, name: &str) -> Option<&CountryInfo> {
        self.by_name.get(&fold(name)).map(|&i| &self.records[i])
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut CountryInfo> {
        self.by_name.get(&fold(name)).map(|&i| &mut self.records[i])
    }

    pub fn by_code(&self, code: u16) -> Option<&CountryInfo> {
        self.by_code.get(&code).map(|&i| &self.records[i])
    }

    /// Info for a feature: by numeric code first, then by display name,
    /// then by the name a code-less feature was loaded under.
    pub fn resolve(&self, feature: &CountryFeature) -> Option<&CountryInfo> {
        match &feature.id {
            FeatureId::Code(code) => self.by_code(*code).or_else(|| self.get(&feature.name)),
            FeatureId::Name(loaded) => self.get(&feature.name).or_else(|| self.get(loaded)),
        }
    }
}
