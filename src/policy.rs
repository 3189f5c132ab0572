//! Per-country overrides supplied by configuration.
//!
//! Name substitutions, fixed capitals, permanently highlighted features and
//! features that never take hover highlighting. They are resolved once when
//! the world is loaded; painting only consults the resolved table.

use std::collections::{BTreeMap, HashMap};

use serde::Deserialize;

use crate::country::{fold, CountryFeature, CountryInfo, FeatureId, FeatureSet, InfoLookup};

/// Every section keys a feature the same way: by its id (`"887"`) or by
/// the name it was loaded under, case-insensitively. A substitute name from
/// `names` is never a key, so `{"names": {"Kosovo": "Kosova"}}` is still
/// pinned with `"pinned": ["Kosovo"]`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Overrides {
    /// Feature → display name.
    pub names: BTreeMap<String, String>,
    /// Feature → capital.
    pub capitals: BTreeMap<String, String>,
    /// Features always painted in the pinned style.
    pub pinned: Vec<String>,
    /// Features that never take hover highlighting.
    pub no_hover: Vec<String>,
}

impl Overrides {
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
            && self.capitals.is_empty()
            && self.pinned.is_empty()
            && self.no_hover.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HighlightPolicy {
    #[default]
    Normal,
    Pinned,
    NoHover,
}

fn matches(feature: &CountryFeature, loaded_name: &str, key: &str) -> bool {
    let key = key.trim();
    let by_id = match (&feature.id, key.parse::<u16>()) {
        (FeatureId::Code(code), Ok(k)) => *code == k,
        _ => false,
    };
    by_id || fold(loaded_name) == fold(key) || fold(&feature.id.to_string()) == fold(key)
}

fn find<'a>(features: &'a FeatureSet, key: &str) -> Option<&'a CountryFeature> {
    let found = features
        .iter()
        .find(|f| matches(f, features.loaded_name(f), key));
    if found.is_none() {
        log::warn!("override entry {key:?} matches no country");
    }
    found
}

/// Apply capital and name overrides to freshly loaded data. A capital is
/// set on the info record resolved for the feature, or on a new record when
/// there is none.
pub fn apply_overrides(overrides: &Overrides, features: &mut FeatureSet, info: &mut InfoLookup) {
    for (key, capital) in &overrides.capitals {
        let Some(feature) = find(features, key) else {
            continue;
        };
        let known = info.resolve(feature).map(|i| i.name.clone());
        match known.as_deref().and_then(|n| info.get_mut(n)) {
            Some(record) => record.capital = Some(capital.clone()),
            None => info.insert(CountryInfo {
                name: feature.name.clone(),
                code: feature.id.code(),
                capital: Some(capital.clone()),
                ..Default::default()
            }),
        }
    }

    for (key, name) in &overrides.names {
        let Some(id) = find(features, key).map(|f| f.id.clone()) else {
            continue;
        };
        log::debug!("renaming {id} to {name}");
        features.rename(&id, name);
    }
}

/// Highlight policy per feature id.
#[derive(Debug, Clone, Default)]
pub struct PolicyTable {
    by_id: HashMap<FeatureId, HighlightPolicy>,
}

impl PolicyTable {
    /// Resolve the configured entries against the loaded features. A feature
    /// listed as both pinned and hover-excluded is pinned.
    pub fn resolve(overrides: &Overrides, features: &FeatureSet) -> Self {
        let mut by_id = HashMap::new();
        for key in &overrides.no_hover {
            if let Some(f) = find(features, key) {
                by_id.insert(f.id.clone(), HighlightPolicy::NoHover);
            }
        }
        for key in &overrides.pinned {
            if let Some(f) = find(features, key) {
                by_id.insert(f.id.clone(), HighlightPolicy::Pinned);
            }
        }
        Self { by_id }
    }

    pub fn get(&self, id: &FeatureId) -> HighlightPolicy {
        self.by_id.get(id).copied().unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::MultiPolygon;
    use serde_json::Map;

    fn features() -> FeatureSet {
        let f = |id: FeatureId, name: &str| CountryFeature {
            id,
            name: name.to_string(),
            geometry: MultiPolygon::default(),
            properties: Map::new(),
        };
        FeatureSet::new(vec![
            f(FeatureId::Code(887), "Yemen"),
            f(FeatureId::Code(250), "France"),
            f(FeatureId::Name("N. Cyprus".into()), "N. Cyprus"),
        ])
    }

    fn overrides(json: &str) -> Overrides {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn entries_match_by_code_or_name() {
        let set = features();
        let yemen = set.get(&FeatureId::Code(887)).unwrap();
        assert!(matches(yemen, "Yemen", "887"));
        assert!(matches(yemen, "Yemen", " yemen "));
        assert!(!matches(yemen, "Yemen", "France"));
        let cyprus = set.get(&FeatureId::Name("N. Cyprus".into())).unwrap();
        assert!(matches(cyprus, "N. Cyprus", "n. cyprus"));
    }

    #[test]
    fn policy_table_resolves_once() {
        let set = features();
        let table = PolicyTable::resolve(
            &overrides(r#"{ "pinned": ["yemen"], "no_hover": ["N. Cyprus", "887", "Atlantis"] }"#),
            &set,
        );
        assert_eq!(table.len(), 2);
        assert_eq!(table.get(&FeatureId::Code(887)), HighlightPolicy::Pinned);
        assert_eq!(
            table.get(&FeatureId::Name("N. Cyprus".into())),
            HighlightPolicy::NoHover
        );
        assert_eq!(table.get(&FeatureId::Code(250)), HighlightPolicy::Normal);
    }

    #[test]
    fn names_and_capitals_are_overridden() {
        let mut set = features();
        let mut info = InfoLookup::new(vec![CountryInfo {
            name: "France".into(),
            code: Some(250),
            capital: Some("Paris".into()),
            ..Default::default()
        }]);
        let o = overrides(
            r#"{
                "names": { "250": "République française" },
                "capitals": { "France": "Lutèce", "Yemen": "Aden" }
            }"#,
        );
        assert!(!o.is_empty());
        apply_overrides(&o, &mut set, &mut info);

        let france = set.get(&FeatureId::Code(250)).unwrap();
        assert_eq!(france.name, "République française");
        assert_eq!(info.by_code(250).unwrap().capital.as_deref(), Some("Lutèce"));
        assert_eq!(info.get("Yemen").unwrap().capital.as_deref(), Some("Aden"));
    }

    #[test]
    fn every_section_keys_on_the_loaded_name() {
        let mut set = features();
        let mut info = InfoLookup::default();
        let o = overrides(
            r#"{
                "names": { "France": "République française", "N. Cyprus": "Cyprus (north)" },
                "capitals": { "France": "Lutèce" },
                "pinned": ["France"],
                "no_hover": ["n. cyprus", "République française"]
            }"#,
        );
        apply_overrides(&o, &mut set, &mut info);
        assert_eq!(info.by_code(250).unwrap().capital.as_deref(), Some("Lutèce"));

        let table = PolicyTable::resolve(&o, &set);
        assert_eq!(table.get(&FeatureId::Code(250)), HighlightPolicy::Pinned);
        assert_eq!(
            table.get(&FeatureId::Name("N. Cyprus".into())),
            HighlightPolicy::NoHover
        );
        assert_eq!(table.len(), 2);
    }
}
