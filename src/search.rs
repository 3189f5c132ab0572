//! Country lookup by free-text name.

use crate::country::{CountryFeature, FeatureId, FeatureSet, InfoLookup};
use crate::i18n::{Catalog, Locale, TranslationPolicy};

#[derive(Debug, Clone, PartialEq)]
pub enum SearchOutcome {
    /// `id` is `None` when only a metadata record matched and no feature
    /// carries that country.
    Found { id: Option<FeatureId>, name: String },
    NotFound { query: String },
}

impl SearchOutcome {
    pub fn feature(&self) -> Option<&FeatureId> {
        match self {
            Self::Found { id, .. } => id.as_ref(),
            Self::NotFound { .. } => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    Found,
    NotFound,
}

/// A short, non-blocking message shown after a search.
#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub kind: NotificationKind,
    pub message: String,
}

impl Notification {
    pub fn for_outcome(outcome: &SearchOutcome, catalog: &Catalog, locale: Locale) -> Self {
        match outcome {
            SearchOutcome::Found { name, .. } => {
                let shown = catalog.country(locale, name, TranslationPolicy::Fallback);
                let shown = shown.as_deref().unwrap_or(name);
                Self {
                    kind: NotificationKind::Found,
                    message: catalog.t_with(locale, "search.found", &[("name", shown)]),
                }
            }
            SearchOutcome::NotFound { query } => Self {
                kind: NotificationKind::NotFound,
                message: catalog.t_with(locale, "search.notFound", &[("query", query.as_str())]),
            },
        }
    }
}

fn feature_for<'a>(
    name: &str,
    features: &'a FeatureSet,
    info: &InfoLookup,
) -> Option<&'a CountryFeature> {
    if let Some(feature) = features.find_by_name(name) {
        return Some(feature);
    }
    let record = info.get(name)?;
    record
        .code
        .and_then(|c| features.get(&FeatureId::Code(c)))
        .or_else(|| features.find_by_name(&record.name))
}

/// Look a country up by name. Input is trimmed; blank input yields `None`.
///
/// Tried in order: feature display names, metadata common and official
/// names, then names translated by the catalog (so `اليمن` finds Yemen).
pub fn search(
    query: &str,
    features: &FeatureSet,
    info: &InfoLookup,
    catalog: &Catalog,
) -> Option<SearchOutcome> {
    let query = query.trim();
    if query.is_empty() {
        return None;
    }

    let candidates = std::iter::once(query.to_string()).chain(catalog.source_names_for(query));
    for name in candidates {
        if let Some(feature) = feature_for(&name, features, info) {
            log::debug!("search {query:?} matched feature {}", feature.id);
            return Some(SearchOutcome::Found {
                id: Some(feature.id.clone()),
                name: feature.name.clone(),
            });
        }
        if let Some(record) = info.get(&name) {
            log::debug!("search {query:?} matched metadata only");
            return Some(SearchOutcome::Found {
                id: None,
                name: record.name.clone(),
            });
        }
    }

    log::debug!("search {query:?} found nothing");
    Some(SearchOutcome::NotFound {
        query: query.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::country::CountryInfo;
    use crate::geo::MultiPolygon;
    use serde_json::Map;

    fn data() -> (FeatureSet, InfoLookup) {
        let f = |code: u16, name: &str| CountryFeature {
            id: FeatureId::Code(code),
            name: name.to_string(),
            geometry: MultiPolygon::default(),
            properties: Map::new(),
        };
        let features = FeatureSet::new(vec![
            f(887, "Yemen"),
            f(250, "France"),
            f(840, "United States of America"),
        ]);
        let info = InfoLookup::new(vec![
            CountryInfo {
                name: "United States".into(),
                official_name: Some("United States of America".into()),
                code: Some(840),
                ..Default::default()
            },
            CountryInfo {
                name: "Tuvalu".into(),
                code: Some(798),
                ..Default::default()
            },
        ]);
        (features, info)
    }

    #[test]
    fn finds_by_display_name() {
        let (features, info) = data();
        let catalog = Catalog::builtin();
        let hit = search("  yemen ", &features, &info, &catalog).unwrap();
        assert_eq!(
            hit,
            SearchOutcome::Found { id: Some(FeatureId::Code(887)), name: "Yemen".into() }
        );
        assert_eq!(hit.feature(), Some(&FeatureId::Code(887)));
    }

    #[test]
    fn finds_through_metadata_names() {
        let (features, info) = data();
        let catalog = Catalog::builtin();
        let hit = search("United States", &features, &info, &catalog).unwrap();
        assert_eq!(hit.feature(), Some(&FeatureId::Code(840)));
        let hit = search("tuvalu", &features, &info, &catalog).unwrap();
        assert_eq!(hit, SearchOutcome::Found { id: None, name: "Tuvalu".into() });
    }

    #[test]
    fn finds_by_translated_name() {
        let (features, info) = data();
        let catalog = Catalog::builtin();
        let hit = search("اليمن", &features, &info, &catalog).unwrap();
        assert_eq!(hit.feature(), Some(&FeatureId::Code(887)));
    }

    #[test]
    fn misses_and_blank_input() {
        let (features, info) = data();
        let catalog = Catalog::builtin();
        assert_eq!(
            search("Atlantis", &features, &info, &catalog),
            Some(SearchOutcome::NotFound { query: "Atlantis".into() })
        );
        assert_eq!(search("   ", &features, &info, &catalog), None);
    }

    #[test]
    fn notifications_are_localized() {
        let catalog = Catalog::builtin();
        let found = SearchOutcome::Found { id: Some(FeatureId::Code(887)), name: "Yemen".into() };
        let n = Notification::for_outcome(&found, &catalog, Locale::En);
        assert_eq!(n.kind, NotificationKind::Found);
        assert_eq!(n.message, "Found Yemen");
        let n = Notification::for_outcome(&found, &catalog, Locale::Ar);
        assert_eq!(n.message, "تم العثور على اليمن");

        let missed = SearchOutcome::NotFound { query: "Atlantis".into() };
        let n = Notification::for_outcome(&missed, &catalog, Locale::En);
        assert_eq!(n.kind, NotificationKind::NotFound);
        assert_eq!(n.message, "No country named \"Atlantis\" was found");
    }
}
