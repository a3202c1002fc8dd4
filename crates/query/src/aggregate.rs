use pb_index::Snapshot;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

const TOP_CITIES: usize = 10;

/// Corpus-wide totals and series over current tiles.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CorpusStatistics {
    pub num_files: usize,
    pub num_countries: usize,
    /// Distinct `(country, unit)` pairs.
    pub num_cities: usize,
    pub total_projects: u64,
    pub total_votes: u64,
    pub total_selected_projects: u64,
    pub budget_by_currency: BTreeMap<String, i64>,
    pub files_per_year: BTreeMap<i32, usize>,
    pub votes_per_country: BTreeMap<String, u64>,
    pub budget_per_country: BTreeMap<String, i64>,
    pub vote_type_histogram: BTreeMap<String, usize>,
    /// `country / unit` labels with their summed votes, largest first.
    pub top_cities_by_votes: Vec<(String, u64)>,
}

pub fn aggregate_statistics(snapshot: &Snapshot) -> CorpusStatistics {
    let mut stats = CorpusStatistics::default();
    let mut countries = BTreeSet::new();
    let mut city_votes: BTreeMap<(String, String), u64> = BTreeMap::new();

    for tile in snapshot.current_tiles() {
        stats.num_files += 1;
        stats.total_projects += tile.num_projects;
        stats.total_votes += tile.num_votes;
        stats.total_selected_projects += tile.num_selected_projects.unwrap_or(0);

        if !tile.country.is_empty() {
            countries.insert(tile.country.clone());
            *stats
                .votes_per_country
                .entry(tile.country.clone())
                .or_insert(0) += tile.num_votes;
        }
        if !tile.country.is_empty() || !tile.unit.is_empty() {
            *city_votes
                .entry((tile.country.clone(), tile.unit.clone()))
                .or_insert(0) += tile.num_votes;
        }
        if let Some(budget) = tile.budget {
            *stats
                .budget_by_currency
                .entry(tile.currency.clone())
                .or_insert(0) += budget;
            if !tile.country.is_empty() {
                *stats
                    .budget_per_country
                    .entry(tile.country.clone())
                    .or_insert(0) += budget;
            }
        }
        if let Some(year) = tile.year {
            *stats.files_per_year.entry(year).or_insert(0) += 1;
        }
        *stats
            .vote_type_histogram
            .entry(tile.vote_type.as_str().to_string())
            .or_insert(0) += 1;
    }

    stats.num_countries = countries.len();
    stats.num_cities = city_votes.len();

    let mut cities: Vec<(String, u64)> = city_votes
        .into_iter()
        .map(|((country, unit), votes)| (format!("{country} / {unit}"), votes))
        .collect();
    cities.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    cities.truncate(TOP_CITIES);
    stats.top_cities_by_votes = cities;

    stats
}

/// One comment text and the current files carrying it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommentGroup {
    pub text: String,
    pub files: Vec<String>,
}

/// Distinct comments across current tiles, most frequent first, ties
/// broken by text.
pub fn aggregate_comments(snapshot: &Snapshot) -> Vec<CommentGroup> {
    let mut by_text: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for tile in snapshot.current_tiles() {
        for comment in &tile.comments {
            by_text
                .entry(comment.clone())
                .or_default()
                .push(tile.file_name.clone());
        }
    }

    let mut groups: Vec<CommentGroup> = by_text
        .into_iter()
        .map(|(text, mut files)| {
            files.sort();
            CommentGroup { text, files }
        })
        .collect();
    groups.sort_by(|a, b| b.files.len().cmp(&a.files.len()).then_with(|| a.text.cmp(&b.text)));
    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use pb_format::parse_str;
    use pb_index::{IndexEntry, Tile};
    use pretty_assertions::assert_eq;
    use std::collections::BTreeMap;

    fn snapshot(rows: &[(&str, &str, &str, u64, &str)]) -> Snapshot {
        // (file_name, country, unit, budget, comment)
        let mut entries = BTreeMap::new();
        for (file_name, country, unit, budget, comment) in rows {
            let text = format!(
                "META\nkey;value\ncountry;{country}\nunit;{unit}\nbudget;{budget}\n\
                 currency;PLN\ncomment;#1: {comment}\ndate_begin;01.01.2021\n\
                 PROJECTS\nproject_id;cost\n1;100\n2;200\nVOTES\nvoter_id;vote\n1;1\n2;2\n"
            );
            let tile = Tile::from_record(file_name, &parse_str(&text).unwrap());
            let mut entry = IndexEntry::new(file_name, 1, 1, tile);
            entry.is_current = true;
            entries.insert(file_name.to_string(), entry);
        }
        Snapshot::from_entries(entries)
    }

    #[test]
    fn totals_and_series_cover_current_tiles() {
        let snapshot = snapshot(&[
            ("a.pb", "Poland", "Katowice", 100, "First"),
            ("b.pb", "Poland", "Krakow", 200, "First"),
            ("c.pb", "France", "Paris", 300, "Second"),
        ]);
        let stats = aggregate_statistics(&snapshot);

        assert_eq!(stats.num_files, 3);
        assert_eq!(stats.num_countries, 2);
        assert_eq!(stats.num_cities, 3);
        assert_eq!(stats.total_projects, 6);
        assert_eq!(stats.total_votes, 6);
        assert_eq!(stats.budget_by_currency["PLN"], 600);
        assert_eq!(stats.votes_per_country["Poland"], 4);
        assert_eq!(stats.budget_per_country["France"], 300);
        assert_eq!(stats.files_per_year[&2021], 3);
    }

    #[test]
    fn comments_group_by_frequency_then_text() {
        let snapshot = snapshot(&[
            ("a.pb", "Poland", "Katowice", 100, "Shared note"),
            ("b.pb", "Poland", "Krakow", 200, "Shared note"),
            ("c.pb", "France", "Paris", 300, "Alone"),
        ]);
        let groups = aggregate_comments(&snapshot);

        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].text, "Shared note");
        assert_eq!(groups[0].files, vec!["a.pb", "b.pb"]);
        assert_eq!(groups[1].text, "Alone");
    }

    #[test]
    fn empty_snapshot_aggregates_to_zero() {
        let snapshot = Snapshot::default();
        let stats = aggregate_statistics(&snapshot);
        assert_eq!(stats.num_files, 0);
        assert!(stats.top_cities_by_votes.is_empty());
        assert!(aggregate_comments(&snapshot).is_empty());
    }
}
