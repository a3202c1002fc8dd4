use crate::comments::extract_comments;
use crate::meta::MetaBag;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Voting method declared in META. Unknown free text is its own category so
/// downstream code never has to fail on it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VoteType {
    Approval,
    Ordinal,
    Cumulative,
    Other(String),
}

impl VoteType {
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "approval" => Self::Approval,
            "ordinal" => Self::Ordinal,
            "cumulative" => Self::Cumulative,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Approval => "approval",
            Self::Ordinal => "ordinal",
            Self::Cumulative => "cumulative",
            Self::Other(raw) => raw,
        }
    }
}

impl fmt::Display for VoteType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One row of the PROJECTS section. Numeric fields are absent (not zero)
/// when the source value does not parse.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: String,
    pub name: String,
    pub cost: Option<f64>,
    pub votes: Option<u64>,
    pub score: Option<f64>,
    pub selected: Option<bool>,
    pub categories: Vec<String>,
    pub targets: Vec<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    /// Columns the parser does not recognize, retained verbatim.
    pub extra: BTreeMap<String, String>,
}

impl Project {
    /// Coordinates, only when both are present and within valid bounds.
    pub fn geo(&self) -> Option<(f64, f64)> {
        let (lat, lon) = (self.latitude?, self.longitude?);
        ((-90.0..=90.0).contains(&lat) && (-180.0..=180.0).contains(&lon)).then_some((lat, lon))
    }
}

/// One row of the VOTES section.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Ballot {
    pub voter_id: String,
    /// Chosen project ids, in ballot order, empty tokens dropped.
    pub choices: Vec<String>,
    /// Cumulative-voting points parallel to `choices`; empty when the file
    /// has no points column. Unparsable entries stay `None`.
    pub points: Vec<Option<f64>>,
    pub age: Option<u32>,
    pub sex: Option<String>,
}

/// Non-fatal degradation observed during parsing. The record stays usable;
/// quality and flag computation work from what actually parsed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum DataWarning {
    DeclaredProjectsMismatch { declared: u64, parsed: u64 },
    DeclaredVotesMismatch { declared: u64, parsed: u64 },
    UnparsableNumber { section: String, row: u64, column: String, value: String },
    ExtraFields { section: String, row: u64 },
    DuplicateVoterId { voter_id: String },
    HeaderMismatch { section: String, found: String },
    MalformedRow { section: String, row: u64, detail: String },
}

impl fmt::Display for DataWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DeclaredProjectsMismatch { declared, parsed } => {
                write!(f, "META declares {declared} projects but {parsed} parsed")
            }
            Self::DeclaredVotesMismatch { declared, parsed } => {
                write!(f, "META declares {declared} votes but {parsed} parsed")
            }
            Self::UnparsableNumber { section, row, column, value } => {
                write!(f, "{section} row {row}: {column}={value:?} is not a number")
            }
            Self::ExtraFields { section, row } => {
                write!(f, "{section} row {row} has more fields than the header")
            }
            Self::DuplicateVoterId { voter_id } => {
                write!(f, "duplicate voter id {voter_id:?}; first ballot kept")
            }
            Self::HeaderMismatch { section, found } => {
                write!(f, "{section} header starts with {found:?}")
            }
            Self::MalformedRow { section, row, detail } => {
                write!(f, "{section} row {row}: {detail}")
            }
        }
    }
}

/// Structured output of parsing one PB file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawRecord {
    pub meta: MetaBag,
    pub projects: Vec<Project>,
    pub ballots: Vec<Ballot>,
    /// Whether the PROJECTS header carried a `selected` column at all,
    /// so "no column" and "nothing selected" stay distinguishable.
    pub selected_column: bool,
    pub warnings: Vec<DataWarning>,
}

impl RawRecord {
    pub fn vote_type(&self) -> VoteType {
        self.meta.vote_type()
    }

    /// Mean number of chosen projects per ballot, restricted to ballots
    /// with at least one non-empty choice. `None` when no ballot qualifies.
    pub fn vote_length(&self) -> Option<f64> {
        let lengths: Vec<usize> = self
            .ballots
            .iter()
            .map(|b| b.choices.len())
            .filter(|&len| len > 0)
            .collect();
        if lengths.is_empty() {
            return None;
        }
        Some(lengths.iter().sum::<usize>() as f64 / lengths.len() as f64)
    }

    /// Declared vote count, falling back to the parsed ballot count.
    pub fn num_votes(&self) -> u64 {
        self.meta
            .declared_num_votes()
            .unwrap_or(self.ballots.len() as u64)
    }

    /// Declared project count, falling back to the parsed row count.
    pub fn num_projects(&self) -> u64 {
        self.meta
            .declared_num_projects()
            .unwrap_or(self.projects.len() as u64)
    }

    /// Number of selected projects; `None` when the file has no selected
    /// column.
    pub fn num_selected_projects(&self) -> Option<u64> {
        self.selected_column.then(|| {
            self.projects
                .iter()
                .filter(|p| p.selected == Some(true))
                .count() as u64
        })
    }

    /// Summed cost of selected projects; unparsable costs contribute nothing.
    pub fn selected_cost_sum(&self) -> f64 {
        self.projects
            .iter()
            .filter(|p| p.selected == Some(true))
            .filter_map(|p| p.cost)
            .sum()
    }

    /// Comment entries extracted from the META `comment` field.
    pub fn comments(&self) -> Vec<String> {
        extract_comments(self.meta.comment())
    }
}
