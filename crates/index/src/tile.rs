use crate::fmt::{format_budget, format_int, format_vote_length};
use crate::quality;
use pb_format::{RawRecord, VoteType};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

/// Longest raw group key kept verbatim; longer keys get a stable hash
/// suffix so they remain index-safe.
const GROUP_KEY_MAX_LEN: usize = 191;

/// Identity of one logical dataset across file versions:
/// `(country, unit, instance, subunit)` normalized to lowercase.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GroupKey(String);

impl GroupKey {
    pub fn new(country: &str, unit: &str, instance: &str, subunit: &str) -> Self {
        let key = [country, unit, instance, subunit]
            .iter()
            .map(|part| part.trim().to_lowercase())
            .collect::<Vec<_>>()
            .join("|");
        if key.len() <= GROUP_KEY_MAX_LEN {
            return Self(key);
        }
        let mut hasher = Sha256::new();
        hasher.update(key.as_bytes());
        let digest = hasher.finalize();
        let hash: String = digest.iter().take(6).map(|b| format!("{b:02x}")).collect();
        // Do not cut through a multi-byte character.
        let mut cut = GROUP_KEY_MAX_LEN - 1 - hash.len();
        while !key.is_char_boundary(cut) {
            cut -= 1;
        }
        Self(format!("{}_{hash}", &key[..cut]))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// The derived, queryable summary of one PB dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tile {
    pub file_name: String,
    pub title: String,
    pub webpage_name: String,
    pub description: String,
    pub country: String,
    pub unit: String,
    pub instance: String,
    pub subunit: String,
    pub year: Option<i32>,
    pub currency: String,
    pub num_votes: u64,
    pub num_votes_display: String,
    pub num_projects: u64,
    pub num_projects_display: String,
    pub num_selected_projects: Option<u64>,
    pub budget: Option<i64>,
    pub budget_display: String,
    pub vote_type: VoteType,
    pub vote_length: Option<f64>,
    pub vote_length_display: String,
    pub quality: f64,
    pub quality_short: String,
    pub fully_funded: bool,
    pub experimental: bool,
    pub has_geo: bool,
    pub has_target: bool,
    pub has_category: bool,
    pub rule: String,
    pub edition: String,
    pub language: String,
    pub comments: Vec<String>,
    pub categories: Vec<String>,
    pub targets: Vec<String>,
}

impl Tile {
    /// Derive the tile for one parsed file.
    pub fn from_record(file_name: &str, record: &RawRecord) -> Self {
        let meta = &record.meta;
        let webpage_name = meta.webpage_name();
        let title = if webpage_name.is_empty() {
            file_stem(file_name).replace('_', " ")
        } else {
            webpage_name.replace('_', " ")
        };

        let flags = quality::compute(record);
        let budget = meta.budget();
        let vote_length = record.vote_length();

        Self {
            file_name: file_name.to_string(),
            title,
            webpage_name,
            description: meta.description().to_string(),
            country: meta.country().to_string(),
            unit: meta.unit().to_string(),
            instance: meta.instance().to_string(),
            subunit: meta.subunit().to_string(),
            year: meta.year(),
            currency: meta.currency().to_string(),
            num_votes: record.num_votes(),
            num_votes_display: format_int(record.num_votes() as i64),
            num_projects: record.num_projects(),
            num_projects_display: format_int(record.num_projects() as i64),
            num_selected_projects: record.num_selected_projects(),
            budget,
            budget_display: format_budget(meta.currency(), budget),
            vote_type: record.vote_type(),
            vote_length,
            vote_length_display: format_vote_length(vote_length),
            quality: flags.quality,
            quality_short: flags.quality_short,
            fully_funded: flags.fully_funded,
            experimental: flags.experimental,
            has_geo: flags.has_geo,
            has_target: flags.has_target,
            has_category: flags.has_category,
            rule: meta.rule().to_string(),
            edition: meta.edition().to_string(),
            language: meta.language().to_string(),
            comments: record.comments(),
            categories: collect_tokens(record.projects.iter().flat_map(|p| &p.categories)),
            targets: collect_tokens(record.projects.iter().flat_map(|p| &p.targets)),
        }
    }

    pub fn group_key(&self) -> GroupKey {
        GroupKey::new(&self.country, &self.unit, &self.instance, &self.subunit)
    }
}

/// Unique tokens across projects; first-seen casing wins, sorted
/// case-insensitively for display.
fn collect_tokens<'a>(tokens: impl Iterator<Item = &'a String>) -> Vec<String> {
    let mut display: BTreeMap<String, &str> = BTreeMap::new();
    for token in tokens {
        display.entry(token.to_lowercase()).or_insert(token);
    }
    display.into_values().map(str::to_string).collect()
}

fn file_stem(file_name: &str) -> &str {
    file_name.strip_suffix(".pb").unwrap_or(file_name)
}
