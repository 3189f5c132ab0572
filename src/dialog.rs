//! Country detail panel.

use std::fmt;

use crate::country::CountryInfo;
use crate::i18n::{format_amount, format_number, join_list, Catalog, Direction, Locale, TranslationPolicy};

/// A labelled value in the detail panel.
#[derive(Debug, Clone, PartialEq)]
pub struct DetailRow {
    pub label: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CountryDetails {
    pub title: String,
    pub flag: Option<String>,
    pub flag_image: Option<String>,
    pub rows: Vec<DetailRow>,
    /// Region and subregion.
    pub badges: Vec<String>,
    pub direction: Direction,
}

impl CountryDetails {
    pub fn new(info: &CountryInfo, catalog: &Catalog, locale: Locale, policy: TranslationPolicy) -> Self {
        let unknown = catalog.t(locale, "countryInfo.unknown");
        let or_unknown = |v: Option<String>| v.unwrap_or_else(|| unknown.to_string());
        let row = |key: &str, value: String| DetailRow {
            label: catalog.t(locale, key).to_string(),
            value,
        };

        let title = catalog
            .country(locale, &info.name, policy)
            .map_or_else(|| info.name.clone(), |n| n.into_owned());
        let capital = info
            .capital
            .as_deref()
            .and_then(|c| catalog.capital(locale, c, policy))
            .map(|c| c.into_owned());
        let area = info.area.map(|a| {
            format!("{} {}", format_amount(locale, a), catalog.t(locale, "countryInfo.km2"))
        });
        let languages = (!info.languages.is_empty()).then(|| join_list(locale, &info.languages));
        let currencies: Vec<String> = info
            .currencies
            .iter()
            .map(|c| match &c.symbol {
                Some(symbol) => format!("{} ({symbol})", c.name),
                None => c.name.clone(),
            })
            .collect();
        let currencies = (!currencies.is_empty()).then(|| join_list(locale, &currencies));

        let rows = vec![
            row("countryInfo.capital", or_unknown(capital)),
            row("countryInfo.population", or_unknown(info.population.map(|p| format_number(locale, p)))),
            row("countryInfo.area", or_unknown(area)),
            row("countryInfo.languages", or_unknown(languages)),
            row("countryInfo.currency", or_unknown(currencies)),
        ];

        let badges = [info.region.as_deref(), info.subregion.as_deref()]
            .into_iter()
            .flatten()
            .map(|r| catalog.region(locale, r).to_string())
            .collect();

        Self {
            title,
            flag: info.flag.clone(),
            flag_image: info.flags.svg.clone().or_else(|| info.flags.png.clone()),
            rows,
            badges,
            direction: locale.direction(),
        }
    }

    pub fn value(&self, label: &str) -> Option<&str> {
        self.rows
            .iter()
            .find(|r| r.label == label)
            .map(|r| r.value.as_str())
    }
}

impl fmt::Display for CountryDetails {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.flag {
            Some(flag) => writeln!(f, "{flag} {}", self.title)?,
            None => writeln!(f, "{}", self.title)?,
        }
        if !self.badges.is_empty() {
            writeln!(f, "[{}]", self.badges.join("] ["))?;
        }
        for row in &self.rows {
            writeln!(f, "{}: {}", row.label, row.value)?;
        }
        Ok(())
    }
}

/// Visibility of the detail panel.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum DialogState {
    #[default]
    Closed,
    /// Opened before the metadata arrived.
    Loading,
    Open(Box<CountryDetails>),
}

impl DialogState {
    pub fn is_open(&self) -> bool {
        !matches!(self, Self::Closed)
    }

    pub fn details(&self) -> Option<&CountryDetails> {
        match self {
            Self::Open(details) => Some(&**details),
            _ => None,
        }
    }
}
