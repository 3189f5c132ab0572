//! Localization: UI strings, country and capital names, number formatting.
//!
//! English is the source language: country and capital tables are keyed
//! by the case-folded English name, and a missing translation falls back
//! to that name unless strict translation is requested.

use std::{borrow::Cow, collections::HashMap, fmt, str::FromStr};

use anyhow::{bail, Context};
use serde::Deserialize;

use crate::country::fold;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    #[default]
    Ar,
    En,
}

/// Text direction for a locale.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Ltr,
    Rtl,
}

impl Direction {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ltr => "ltr",
            Self::Rtl => "rtl",
        }
    }
}

impl Locale {
    pub const ALL: [Locale; 2] = [Locale::Ar, Locale::En];
    pub const SOURCE: Locale = Locale::En;

    pub fn code(self) -> &'static str {
        match self {
            Self::Ar => "ar",
            Self::En => "en",
        }
    }

    pub fn direction(self) -> Direction {
        match self {
            Self::Ar => Direction::Rtl,
            Self::En => Direction::Ltr,
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            Self::Ar => Self::En,
            Self::En => Self::Ar,
        }
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Locale {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ar" => Ok(Self::Ar),
            "en" => Ok(Self::En),
            other => bail!("unsupported locale {other:?} (expected \"ar\" or \"en\")"),
        }
    }
}

/// What to do with a name that has no translation in the active locale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TranslationPolicy {
    /// Show the source-language name.
    #[default]
    Fallback,
    /// Show nothing.
    Strict,
}

impl TranslationPolicy {
    pub fn from_strict(strict: bool) -> Self {
        if strict {
            Self::Strict
        } else {
            Self::Fallback
        }
    }
}

const EN_UI: &[(&str, &str)] = &[
    ("globe.title", "World Countries Globe"),
    ("globe.instructions", "Drag to rotate. Scroll to zoom. Hover a country to see its name and capital."),
    ("globe.loading", "Loading map..."),
    ("globe.capital", "Capital"),
    ("globe.region", "Region"),
    ("globe.population", "Population"),
    ("globe.unknown", "Unknown"),
    ("globe.aria", "Interactive spinning globe with world countries"),
    ("search.placeholder", "Search for a country..."),
    ("search.button", "Search"),
    ("search.found", "Found {name}"),
    ("search.notFound", "No country named \"{query}\" was found"),
    ("countryInfo.loading", "Loading..."),
    ("countryInfo.capital", "Capital"),
    ("countryInfo.population", "Population"),
    ("countryInfo.area", "Area"),
    ("countryInfo.km2", "km²"),
    ("countryInfo.languages", "Languages"),
    ("countryInfo.currency", "Currency"),
    ("countryInfo.region", "Region"),
    ("countryInfo.unknown", "Unknown"),
    ("language.switch", "العربية"),
];

const AR_UI: &[(&str, &str)] = &[
    ("globe.title", "خريطة دول العالم"),
    ("globe.instructions", "اسحب للدوران. قم بالتمرير للتكبير. حرك الماوس فوق دولة لرؤية اسمها وعاصمتها."),
    ("globe.loading", "تحميل الخريطة..."),
    ("globe.capital", "العاصمة"),
    ("globe.region", "المنطقة"),
    ("globe.population", "عدد السكان"),
    ("globe.unknown", "غير معروف"),
    ("globe.aria", "كرة أرضية تفاعلية دوارة تعرض دول العالم"),
    ("search.placeholder", "ابحث عن دولة..."),
    ("search.button", "بحث"),
    ("search.found", "تم العثور على {name}"),
    ("search.notFound", "لم يتم العثور على دولة باسم \"{query}\""),
    ("countryInfo.loading", "جار التحميل..."),
    ("countryInfo.capital", "العاصمة"),
    ("countryInfo.population", "عدد السكان"),
    ("countryInfo.area", "المساحة"),
    ("countryInfo.km2", "كم²"),
    ("countryInfo.languages", "اللغات"),
    ("countryInfo.currency", "العملة"),
    ("countryInfo.region", "المنطقة"),
    ("countryInfo.unknown", "غير معروف"),
    ("language.switch", "English"),
    ("region.Africa", "أفريقيا"),
    ("region.Americas", "الأمريكتان"),
    ("region.Antarctic", "القارة القطبية الجنوبية"),
    ("region.Asia", "آسيا"),
    ("region.Europe", "أوروبا"),
    ("region.Oceania", "أوقيانوسيا"),
];

/// (English name, Arabic name, English capital, Arabic capital)
const AR_COUNTRIES: &[(&str, &str, &str, &str)] = &[
    ("Afghanistan", "أفغانستان", "Kabul", "كابل"),
    ("Algeria", "الجزائر", "Algiers", "الجزائر"),
    ("Argentina", "الأرجنتين", "Buenos Aires", "بوينس آيرس"),
    ("Australia", "أستراليا", "Canberra", "كانبرا"),
    ("Bahrain", "البحرين", "Manama", "المنامة"),
    ("Brazil", "البرازيل", "Brasília", "برازيليا"),
    ("Canada", "كندا", "Ottawa", "أوتاوا"),
    ("China", "الصين", "Beijing", "بكين"),
    ("Egypt", "مصر", "Cairo", "القاهرة"),
    ("France", "فرنسا", "Paris", "باريس"),
    ("Germany", "ألمانيا", "Berlin", "برلين"),
    ("India", "الهند", "New Delhi", "نيودلهي"),
    ("Indonesia", "إندونيسيا", "Jakarta", "جاكرتا"),
    ("Iran", "إيران", "Tehran", "طهران"),
    ("Iraq", "العراق", "Baghdad", "بغداد"),
    ("Italy", "إيطاليا", "Rome", "روما"),
    ("Japan", "اليابان", "Tokyo", "طوكيو"),
    ("Jordan", "الأردن", "Amman", "عمّان"),
    ("Kuwait", "الكويت", "Kuwait City", "مدينة الكويت"),
    ("Lebanon", "لبنان", "Beirut", "بيروت"),
    ("Libya", "ليبيا", "Tripoli", "طرابلس"),
    ("Mauritania", "موريتانيا", "Nouakchott", "نواكشوط"),
    ("Mexico", "المكسيك", "Mexico City", "مكسيكو سيتي"),
    ("Morocco", "المغرب", "Rabat", "الرباط"),
    ("Nigeria", "نيجيريا", "Abuja", "أبوجا"),
    ("Oman", "عُمان", "Muscat", "مسقط"),
    ("Pakistan", "باكستان", "Islamabad", "إسلام آباد"),
    ("Qatar", "قطر", "Doha", "الدوحة"),
    ("Russia", "روسيا", "Moscow", "موسكو"),
    ("Saudi Arabia", "السعودية", "Riyadh", "الرياض"),
    ("Somalia", "الصومال", "Mogadishu", "مقديشو"),
    ("South Africa", "جنوب أفريقيا", "Pretoria", "بريتوريا"),
    ("Spain", "إسبانيا", "Madrid", "مدريد"),
    ("Sudan", "السودان", "Khartoum", "الخرطوم"),
    ("Syria", "سوريا", "Damascus", "دمشق"),
    ("Tunisia", "تونس", "Tunis", "تونس"),
    ("Turkey", "تركيا", "Ankara", "أنقرة"),
    ("United Arab Emirates", "الإمارات", "Abu Dhabi", "أبوظبي"),
    ("United Kingdom", "المملكة المتحدة", "London", "لندن"),
    ("United States of America", "الولايات المتحدة", "Washington, D.C.", "واشنطن"),
    ("United States", "الولايات المتحدة", "Washington D.C.", "واشنطن"),
    ("Yemen", "اليمن", "Sana'a", "صنعاء"),
];

#[derive(Debug, Default, Clone)]
struct Tables {
    ui: HashMap<String, String>,
    countries: HashMap<String, String>,
    capitals: HashMap<String, String>,
}

/// Shape of an external catalog file: locale code → tables.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct TablesFile {
    ui: HashMap<String, String>,
    countries: HashMap<String, String>,
    capitals: HashMap<String, String>,
}

/// Translation tables for every supported locale.
#[derive(Debug, Clone)]
pub struct Catalog {
    tables: HashMap<Locale, Tables>,
}

impl Catalog {
    /// An empty catalog: every lookup falls back.
    pub fn empty() -> Self {
        Self {
            tables: Locale::ALL.iter().map(|&l| (l, Tables::default())).collect(),
        }
    }

    pub fn builtin() -> Self {
        let mut catalog = Self::empty();
        for (locale, ui) in [(Locale::En, EN_UI), (Locale::Ar, AR_UI)] {
            let tables = catalog.tables_mut(locale);
            tables
                .ui
                .extend(ui.iter().map(|&(k, v)| (k.to_string(), v.to_string())));
        }
        let ar = catalog.tables_mut(Locale::Ar);
        for &(name, name_ar, capital, capital_ar) in AR_COUNTRIES {
            ar.countries.insert(fold(name), name_ar.to_string());
            ar.capitals.insert(fold(capital), capital_ar.to_string());
        }
        catalog
    }

    fn tables_mut(&mut self, locale: Locale) -> &mut Tables {
        self.tables.entry(locale).or_default()
    }

    /// Merge a JSON catalog (`{"ar": {"ui": {..}, "countries": {..}, "capitals": {..}}}`)
    /// over the current tables. Unknown locale codes are skipped.
    pub fn extend_from_json(&mut self, text: &str) -> anyhow::Result<()> {
        let file: HashMap<String, TablesFile> =
            serde_json::from_str(text).context("catalog is not a locale → tables map")?;
        for (code, incoming) in file {
            let Ok(locale) = code.parse::<Locale>() else {
                log::warn!("catalog: skipping unsupported locale {code:?}");
                continue;
            };
            let tables = self.tables_mut(locale);
            tables.ui.extend(incoming.ui);
            tables
                .countries
                .extend(incoming.countries.into_iter().map(|(k, v)| (fold(&k), v)));
            tables
                .capitals
                .extend(incoming.capitals.into_iter().map(|(k, v)| (fold(&k), v)));
        }
        Ok(())
    }

    fn ui(&self, locale: Locale, key: &str) -> Option<&str> {
        self.tables
            .get(&locale)
            .and_then(|t| t.ui.get(key))
            .map(String::as_str)
    }

    /// UI string for `key`, falling back to English and then to the key itself.
    pub fn t<'a>(&'a self, locale: Locale, key: &'a str) -> &'a str {
        self.ui(locale, key)
            .or_else(|| self.ui(Locale::SOURCE, key))
            .unwrap_or(key)
    }

    /// UI string with `{name}` style placeholders filled in.
    pub fn t_with(&self, locale: Locale, key: &str, args: &[(&str, &str)]) -> String {
        let mut text = self.t(locale, key).to_string();
        for (name, value) in args {
            text = text.replace(&format!("{{{name}}}"), value);
        }
        text
    }

    fn translate<'a>(
        &'a self,
        locale: Locale,
        source: &'a str,
        policy: TranslationPolicy,
        pick: impl Fn(&Tables) -> &HashMap<String, String>,
    ) -> Option<Cow<'a, str>> {
        if locale == Locale::SOURCE {
            return Some(Cow::Borrowed(source));
        }
        let found = self
            .tables
            .get(&locale)
            .and_then(|t| pick(t).get(&fold(source)));
        match (found, policy) {
            (Some(text), _) => Some(Cow::Borrowed(text.as_str())),
            (None, TranslationPolicy::Fallback) => Some(Cow::Borrowed(source)),
            (None, TranslationPolicy::Strict) => None,
        }
    }

    /// Country name in `locale`; `None` only under strict translation.
    pub fn country<'a>(
        &'a self,
        locale: Locale,
        name: &'a str,
        policy: TranslationPolicy,
    ) -> Option<Cow<'a, str>> {
        self.translate(locale, name, policy, |t| &t.countries)
    }

    /// Capital name in `locale`; `None` only under strict translation.
    pub fn capital<'a>(
        &'a self,
        locale: Locale,
        name: &'a str,
        policy: TranslationPolicy,
    ) -> Option<Cow<'a, str>> {
        self.translate(locale, name, policy, |t| &t.capitals)
    }

    /// Region name (`Asia`, `Europe`, ...) in `locale`, or the name unchanged.
    pub fn region<'a>(&'a self, locale: Locale, region: &'a str) -> &'a str {
        self.ui(locale, &format!("region.{region}")).unwrap_or(region)
    }

    /// English names whose translation in any locale equals `query` (case-folded).
    pub fn source_names_for(&self, query: &str) -> Vec<String> {
        let key = fold(query);
        let mut names: Vec<String> = self
            .tables
            .values()
            .flat_map(|t| t.countries.iter())
            .filter(|(_, translated)| fold(translated) == key)
            .map(|(source, _)| source.clone())
            .collect();
        names.sort();
        names.dedup();
        names
    }
}

/// Group separator used between thousands.
fn group_separator(locale: Locale) -> char {
    match locale {
        Locale::Ar => '\u{066C}',
        Locale::En => ',',
    }
}

/// Digits in the locale's script.
fn localize_digit(locale: Locale, d: char) -> char {
    match locale {
        Locale::Ar => d
            .to_digit(10)
            .and_then(|v| char::from_u32(0x0660 + v))
            .unwrap_or(d),
        Locale::En => d,
    }
}

/// `1234567` → `1,234,567` (en) / `١٬٢٣٤٬٥٦٧` (ar).
pub fn format_number(locale: Locale, n: u64) -> String {
    let digits = n.to_string();
    let sep = group_separator(locale);
    let mut out = String::with_capacity(digits.len() * 3);
    for (i, d) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(sep);
        }
        out.push(localize_digit(locale, d));
    }
    out
}

/// Rounded, grouped number for measurements such as area.
pub fn format_amount(locale: Locale, value: f64) -> String {
    if !value.is_finite() || value < 0.0 {
        return value.to_string();
    }
    format_number(locale, value.round() as u64)
}

pub fn list_separator(locale: Locale) -> &'static str {
    match locale {
        Locale::Ar => "، ",
        Locale::En => ", ",
    }
}

pub fn join_list<S: AsRef<str>>(locale: Locale, items: &[S]) -> String {
    items
        .iter()
        .map(AsRef::as_ref)
        .collect::<Vec<_>>()
        .join(list_separator(locale))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn locale_basics() {
        assert_eq!("AR".parse::<Locale>().unwrap(), Locale::Ar);
        assert!("fr".parse::<Locale>().is_err());
        assert_eq!(Locale::Ar.direction(), Direction::Rtl);
        assert_eq!(Locale::En.direction().as_str(), "ltr");
        assert_eq!(Locale::Ar.toggled(), Locale::En);
        assert_eq!(Locale::default(), Locale::Ar);
    }

    #[test]
    fn ui_strings_fall_back_to_english_then_key() {
        let mut catalog = Catalog::builtin();
        assert_eq!(catalog.t(Locale::Ar, "globe.capital"), "العاصمة");
        assert_eq!(catalog.t(Locale::En, "globe.capital"), "Capital");
        catalog
            .extend_from_json(r#"{ "en": { "ui": { "only.en": "English only" } } }"#)
            .unwrap();
        assert_eq!(catalog.t(Locale::Ar, "only.en"), "English only");
        assert_eq!(catalog.t(Locale::Ar, "no.such.key"), "no.such.key");
    }

    #[test]
    fn placeholders_are_filled() {
        let catalog = Catalog::builtin();
        assert_eq!(
            catalog.t_with(Locale::En, "search.found", &[("name", "Yemen")]),
            "Found Yemen"
        );
        assert!(catalog
            .t_with(Locale::Ar, "search.notFound", &[("query", "Atlantis")])
            .contains("Atlantis"));
    }

    #[test]
    fn country_names_translate_with_fallback() {
        let catalog = Catalog::builtin();
        let lenient = TranslationPolicy::Fallback;
        let strict = TranslationPolicy::Strict;
        assert_eq!(catalog.country(Locale::Ar, "yemen", lenient).unwrap(), "اليمن");
        assert_eq!(catalog.country(Locale::Ar, "Fiji", lenient).unwrap(), "Fiji");
        assert_eq!(catalog.country(Locale::Ar, "Fiji", strict), None);
        assert_eq!(catalog.country(Locale::En, "Fiji", strict).unwrap(), "Fiji");
        assert_eq!(catalog.capital(Locale::Ar, "Paris", lenient).unwrap(), "باريس");
        assert_eq!(catalog.region(Locale::Ar, "Asia"), "آسيا");
        assert_eq!(catalog.region(Locale::En, "Asia"), "Asia");
    }

    #[test]
    fn reverse_lookup_finds_source_names() {
        let catalog = Catalog::builtin();
        assert_eq!(catalog.source_names_for("اليمن"), vec!["yemen".to_string()]);
        assert_eq!(catalog.source_names_for(" الولايات المتحدة ").len(), 2);
        assert!(catalog.source_names_for("Atlantis").is_empty());
    }

    #[test]
    fn external_catalog_extends_tables() {
        let mut catalog = Catalog::builtin();
        catalog
            .extend_from_json(
                r#"{
                    "ar": { "countries": { "Fiji": "فيجي" }, "capitals": { "Suva": "سوفا" } },
                    "fr": { "ui": { "globe.title": "Globe" } }
                }"#,
            )
            .unwrap();
        let strict = TranslationPolicy::Strict;
        assert_eq!(catalog.country(Locale::Ar, "FIJI", strict).unwrap(), "فيجي");
        assert_eq!(catalog.capital(Locale::Ar, "Suva", strict).unwrap(), "سوفا");
        assert!(catalog.extend_from_json("[1, 2]").is_err());
    }

    #[test]
    fn numbers_follow_the_locale() {
        assert_eq!(format_number(Locale::En, 0), "0");
        assert_eq!(format_number(Locale::En, 999), "999");
        assert_eq!(format_number(Locale::En, 1_000), "1,000");
        assert_eq!(format_number(Locale::En, 29_825_968), "29,825,968");
        assert_eq!(format_number(Locale::Ar, 1_234_567), "١٬٢٣٤٬٥٦٧");
        assert_eq!(format_amount(Locale::En, 527_968.4), "527,968");
    }

    #[test]
    fn lists_use_the_locale_separator() {
        assert_eq!(join_list(Locale::En, &["Arabic", "English"]), "Arabic, English");
        assert_eq!(join_list(Locale::Ar, &["Arabic", "English"]), "Arabic، English");
        assert_eq!(join_list::<&str>(Locale::En, &[]), "");
    }
}
