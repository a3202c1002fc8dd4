use crate::record::VoteType;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// META keys the data model knows about. Anything else lands in the
/// extension bag and is retained verbatim.
const RECOGNIZED_KEYS: &[&str] = &[
    "description",
    "country",
    "unit",
    "city",
    "district",
    "instance",
    "subunit",
    "num_projects",
    "num_votes",
    "budget",
    "vote_type",
    "rule",
    "currency",
    "min_length",
    "max_length",
    "language",
    "edition",
    "comment",
    "date_begin",
    "date_end",
    "year",
    "experimental",
    "webpage",
    "acknowledgments",
];

static YEAR_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d{4})").expect("valid year regex"));

/// Typed view over the META section: a fixed set of recognized keys plus an
/// extension bag for everything else. Key lookup is case-insensitive.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetaBag {
    recognized: BTreeMap<String, String>,
    extra: BTreeMap<String, String>,
}

impl MetaBag {
    pub fn insert(&mut self, key: &str, value: &str) {
        let key = key.trim().to_lowercase();
        if key.is_empty() {
            return;
        }
        let value = value.trim().to_string();
        if RECOGNIZED_KEYS.contains(&key.as_str()) {
            self.recognized.insert(key, value);
        } else {
            self.extra.insert(key, value);
        }
    }

    /// Value for a recognized or extension key; empty string when missing.
    pub fn get(&self, key: &str) -> &str {
        let key = key.trim().to_lowercase();
        self.recognized
            .get(&key)
            .or_else(|| self.extra.get(&key))
            .map(String::as_str)
            .unwrap_or("")
    }

    pub fn is_empty(&self) -> bool {
        self.recognized.is_empty() && self.extra.is_empty()
    }

    /// Unrecognized keys, retained but unused by the core.
    pub fn extensions(&self) -> &BTreeMap<String, String> {
        &self.extra
    }

    fn first_of(&self, keys: &[&str]) -> &str {
        for key in keys {
            let value = self.get(key);
            if !value.is_empty() {
                return value;
            }
        }
        ""
    }

    pub fn country(&self) -> &str {
        self.get("country")
    }

    /// `unit` with legacy fallbacks used by older files.
    pub fn unit(&self) -> &str {
        self.first_of(&["unit", "city", "district"])
    }

    /// `instance` falling back to `year` for files that predate the key.
    pub fn instance(&self) -> &str {
        self.first_of(&["instance", "year"])
    }

    pub fn subunit(&self) -> &str {
        self.get("subunit")
    }

    pub fn description(&self) -> &str {
        self.get("description")
    }

    pub fn currency(&self) -> &str {
        self.get("currency")
    }

    pub fn comment(&self) -> &str {
        self.get("comment")
    }

    pub fn rule(&self) -> &str {
        self.get("rule")
    }

    pub fn edition(&self) -> &str {
        self.get("edition")
    }

    pub fn language(&self) -> &str {
        self.get("language")
    }

    pub fn declared_num_projects(&self) -> Option<u64> {
        self.get("num_projects").parse().ok()
    }

    pub fn declared_num_votes(&self) -> Option<u64> {
        self.get("num_votes").parse().ok()
    }

    /// Declared budget truncated to whole units; absent when unparsable.
    pub fn budget(&self) -> Option<i64> {
        let raw = self.get("budget").replace(',', ".");
        if raw.is_empty() {
            return None;
        }
        raw.parse::<f64>().ok().map(|b| b.trunc() as i64)
    }

    /// `vote_type`, falling back to `rule`. Unknown free text becomes
    /// [`VoteType::Other`], never a failure.
    pub fn vote_type(&self) -> VoteType {
        VoteType::parse(self.first_of(&["vote_type", "rule"]))
    }

    /// Explicit experimental flag; never inferred from other fields.
    pub fn experimental(&self) -> bool {
        matches!(
            self.get("experimental").to_lowercase().as_str(),
            "1" | "true" | "yes" | "y"
        )
    }

    /// Dataset year: the first plausible 4-digit year in `date_begin`, then
    /// `year`, then `instance`.
    pub fn year(&self) -> Option<i32> {
        for candidate in [self.get("date_begin"), self.get("year"), self.instance()] {
            if candidate.is_empty() {
                continue;
            }
            if let Some(m) = YEAR_RE.find(candidate) {
                if let Ok(year) = m.as_str().parse::<i32>() {
                    if (1900..=2100).contains(&year) {
                        return Some(year);
                    }
                }
            }
        }
        None
    }

    /// `country_unit_instance_subunit` with empty parts skipped.
    pub fn webpage_name(&self) -> String {
        [self.country(), self.unit(), self.instance(), self.subunit()]
            .iter()
            .filter(|part| !part.is_empty())
            .cloned()
            .collect::<Vec<_>>()
            .join("_")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn bag(pairs: &[(&str, &str)]) -> MetaBag {
        let mut bag = MetaBag::default();
        for (k, v) in pairs {
            bag.insert(k, v);
        }
        bag
    }

    #[test]
    fn keys_are_case_insensitive() {
        let bag = bag(&[("Country", "Poland")]);
        assert_eq!(bag.country(), "Poland");
        assert_eq!(bag.get("COUNTRY"), "Poland");
    }

    #[test]
    fn unit_falls_back_to_city_then_district() {
        assert_eq!(bag(&[("city", "Katowice")]).unit(), "Katowice");
        assert_eq!(bag(&[("district", "Koszutka")]).unit(), "Koszutka");
        assert_eq!(
            bag(&[("unit", "Katowice"), ("city", "ignored")]).unit(),
            "Katowice"
        );
    }

    #[test]
    fn unknown_keys_land_in_extension_bag() {
        let bag = bag(&[("funding_model", "municipal")]);
        assert_eq!(bag.get("funding_model"), "municipal");
        assert_eq!(bag.extensions().len(), 1);
    }

    #[test]
    fn budget_truncates_and_tolerates_decimal_comma() {
        assert_eq!(bag(&[("budget", "100000.75")]).budget(), Some(100_000));
        assert_eq!(bag(&[("budget", "100000,75")]).budget(), Some(100_000));
        assert_eq!(bag(&[("budget", "n/a")]).budget(), None);
    }

    #[test]
    fn year_prefers_date_begin() {
        let bag = bag(&[("date_begin", "01.03.2021"), ("year", "2019")]);
        assert_eq!(bag.year(), Some(2021));
    }

    #[test]
    fn year_rejects_implausible_values() {
        assert_eq!(bag(&[("year", "1021")]).year(), None);
        assert_eq!(bag(&[("instance", "2024")]).year(), Some(2024));
    }

    #[test]
    fn webpage_name_skips_empty_parts() {
        let bag = bag(&[
            ("country", "Poland"),
            ("unit", "Katowice"),
            ("instance", "2024"),
        ]);
        assert_eq!(bag.webpage_name(), "Poland_Katowice_2024");
    }

    #[test]
    fn experimental_requires_explicit_flag() {
        assert!(bag(&[("experimental", "Yes")]).experimental());
        assert!(!bag(&[("experimental", "maybe")]).experimental());
        assert!(!bag(&[("description", "an experimental process")]).experimental());
    }
}
