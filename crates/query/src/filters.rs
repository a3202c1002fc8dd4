use nucleo_matcher::pattern::{Atom, AtomKind, CaseMatching, Normalization};
use nucleo_matcher::{Matcher, Utf32Str};
use pb_index::Tile;
use serde::{Deserialize, Serialize};

/// Conjunctive filter set over current tiles. Unset fields do not restrict.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchFilters {
    /// Free-text substring over title, name, description, comments and
    /// file name. Case- and diacritic-insensitive.
    pub text: Option<String>,
    pub country: Option<String>,
    pub unit: Option<String>,
    pub year: Option<i32>,
    pub vote_type: Option<String>,
    pub votes_min: Option<u64>,
    pub votes_max: Option<u64>,
    pub projects_min: Option<u64>,
    pub projects_max: Option<u64>,
    pub vote_length_min: Option<f64>,
    pub vote_length_max: Option<f64>,
    #[serde(default)]
    pub exclude_fully_funded: bool,
    #[serde(default)]
    pub exclude_experimental: bool,
    #[serde(default)]
    pub require_geo: bool,
    #[serde(default)]
    pub require_target: bool,
    #[serde(default)]
    pub require_category: bool,
}

impl SearchFilters {
    pub(crate) fn compile(&self) -> CompiledFilters<'_> {
        CompiledFilters {
            filters: self,
            text: self
                .text
                .as_deref()
                .filter(|t| !t.trim().is_empty())
                .map(TextQuery::new),
        }
    }
}

pub(crate) struct CompiledFilters<'a> {
    filters: &'a SearchFilters,
    text: Option<TextQuery>,
}

impl CompiledFilters<'_> {
    pub(crate) fn matches(&mut self, tile: &Tile) -> bool {
        let f = self.filters;

        if let Some(country) = &f.country {
            if !tile.country.eq_ignore_ascii_case(country) {
                return false;
            }
        }
        if let Some(unit) = &f.unit {
            if !tile.unit.eq_ignore_ascii_case(unit) {
                return false;
            }
        }
        if let Some(year) = f.year {
            if tile.year != Some(year) {
                return false;
            }
        }
        if let Some(vote_type) = &f.vote_type {
            if !tile.vote_type.as_str().eq_ignore_ascii_case(vote_type) {
                return false;
            }
        }

        if !in_range(tile.num_votes, f.votes_min, f.votes_max) {
            return false;
        }
        if !in_range(tile.num_projects, f.projects_min, f.projects_max) {
            return false;
        }
        if f.vote_length_min.is_some() || f.vote_length_max.is_some() {
            let Some(length) = tile.vote_length else {
                return false;
            };
            if f.vote_length_min.is_some_and(|min| length < min)
                || f.vote_length_max.is_some_and(|max| length > max)
            {
                return false;
            }
        }

        if f.exclude_fully_funded && tile.fully_funded {
            return false;
        }
        if f.exclude_experimental && tile.experimental {
            return false;
        }
        if f.require_geo && !tile.has_geo {
            return false;
        }
        if f.require_target && !tile.has_target {
            return false;
        }
        if f.require_category && !tile.has_category {
            return false;
        }

        match &mut self.text {
            Some(text) => text.matches_tile(tile),
            None => true,
        }
    }
}

fn in_range(value: u64, min: Option<u64>, max: Option<u64>) -> bool {
    !min.is_some_and(|min| value < min) && !max.is_some_and(|max| value > max)
}

/// One free-text needle compiled for repeated substring scoring.
/// Underscores and hyphens count as spaces on both sides so a query like
/// `poznan 2020` finds `poznan_2020.pb`.
pub(crate) struct TextQuery {
    atom: Atom,
    matcher: Matcher,
    buf: Vec<char>,
}

impl TextQuery {
    pub(crate) fn new(text: &str) -> Self {
        let needle = normalize(text);
        Self {
            atom: Atom::new(
                &needle,
                CaseMatching::Ignore,
                Normalization::Smart,
                AtomKind::Substring,
                false,
            ),
            matcher: Matcher::new(nucleo_matcher::Config::DEFAULT),
            buf: Vec::new(),
        }
    }

    pub(crate) fn matches_tile(&mut self, tile: &Tile) -> bool {
        self.matches(&tile.title)
            || self.matches(&tile.webpage_name)
            || self.matches(&tile.description)
            || self.matches(&tile.file_name)
            || tile.comments.iter().any(|c| self.matches(c))
    }

    fn matches(&mut self, haystack: &str) -> bool {
        let haystack = normalize(haystack);
        let utf32 = Utf32Str::new(&haystack, &mut self.buf);
        self.atom.score(utf32, &mut self.matcher).is_some()
    }
}

fn normalize(text: &str) -> String {
    text.replace(['_', '-'], " ")
}
