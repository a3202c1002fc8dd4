use pb_index::fmt::round_sig;
use pb_index::{Tile, QUALITY_DISPLAY_DIGITS};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    #[default]
    Quality,
    Votes,
    Projects,
    Budget,
    Year,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDir {
    Asc,
    #[default]
    Desc,
}

impl FromStr for SortKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "quality" => Ok(Self::Quality),
            "votes" => Ok(Self::Votes),
            "projects" => Ok(Self::Projects),
            "budget" => Ok(Self::Budget),
            "year" => Ok(Self::Year),
            other => Err(format!("unknown sort key: {other}")),
        }
    }
}

impl FromStr for SortDir {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "asc" => Ok(Self::Asc),
            "desc" => Ok(Self::Desc),
            other => Err(format!("unknown sort direction: {other}")),
        }
    }
}

/// Order tiles by the chosen key, then by case-insensitive title ascending
/// so equal keys always land in the same order.
///
/// Quality compares on the same rounded value the short display shows, so
/// sorting never disagrees with what the user sees.
pub fn sort_tiles(tiles: &mut [&Tile], key: SortKey, dir: SortDir) {
    tiles.sort_by(|a, b| {
        let ord = compare(a, b, key);
        let ord = match dir {
            SortDir::Asc => ord,
            SortDir::Desc => ord.reverse(),
        };
        ord.then_with(|| a.title.to_lowercase().cmp(&b.title.to_lowercase()))
    });
}

fn compare(a: &Tile, b: &Tile, key: SortKey) -> Ordering {
    match key {
        SortKey::Quality => round_sig(a.quality, QUALITY_DISPLAY_DIGITS)
            .total_cmp(&round_sig(b.quality, QUALITY_DISPLAY_DIGITS)),
        SortKey::Votes => a.num_votes.cmp(&b.num_votes),
        SortKey::Projects => a.num_projects.cmp(&b.num_projects),
        SortKey::Budget => a.budget.cmp(&b.budget),
        SortKey::Year => a.year.cmp(&b.year),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pb_format::parse_str;
    use pretty_assertions::assert_eq;

    fn tile(file_name: &str, title: &str, num_votes: usize) -> Tile {
        let mut text = format!(
            "META\nkey;value\nwebpage_name;{}\nPROJECTS\nproject_id;cost\n1;100\nVOTES\nvoter_id;vote\n",
            title.replace(' ', "_")
        );
        for i in 0..num_votes {
            text.push_str(&format!("{i};1\n"));
        }
        Tile::from_record(file_name, &parse_str(&text).unwrap())
    }

    fn names(tiles: &[&Tile]) -> Vec<String> {
        tiles.iter().map(|t| t.file_name.clone()).collect()
    }

    #[test]
    fn votes_desc_is_default_direction() {
        let a = tile("a.pb", "Alpha", 5);
        let b = tile("b.pb", "Beta", 20);
        let mut tiles = vec![&a, &b];
        sort_tiles(&mut tiles, SortKey::Votes, SortDir::default());
        assert_eq!(names(&tiles), vec!["b.pb", "a.pb"]);
    }

    #[test]
    fn ties_break_on_title_case_insensitively() {
        let a = tile("a.pb", "zebra", 5);
        let b = tile("b.pb", "Apple", 5);
        let mut tiles = vec![&a, &b];
        sort_tiles(&mut tiles, SortKey::Votes, SortDir::Desc);
        assert_eq!(names(&tiles), vec!["b.pb", "a.pb"]);

        // Same tie-break under the other direction.
        sort_tiles(&mut tiles, SortKey::Votes, SortDir::Asc);
        assert_eq!(names(&tiles), vec!["b.pb", "a.pb"]);
    }

    #[test]
    fn quality_sorts_on_the_rounded_value() {
        let mut a = tile("a.pb", "Alpha", 1);
        let mut b = tile("b.pb", "beta", 1);
        // Differ only past the sixth significant digit.
        a.quality = 1_234_567.1;
        b.quality = 1_234_567.4;
        let mut tiles = vec![&a, &b];
        sort_tiles(&mut tiles, SortKey::Quality, SortDir::Desc);
        // Equal after rounding, so title decides.
        assert_eq!(names(&tiles), vec!["a.pb", "b.pb"]);
    }

    #[test]
    fn sort_keys_parse_from_strings() {
        assert_eq!("quality".parse::<SortKey>().unwrap(), SortKey::Quality);
        assert_eq!("Budget".parse::<SortKey>().unwrap(), SortKey::Budget);
        assert!("size".parse::<SortKey>().is_err());
        assert_eq!("ASC".parse::<SortDir>().unwrap(), SortDir::Asc);
    }

    #[test]
    fn absent_budget_sorts_below_any_value() {
        let mut a = tile("a.pb", "Alpha", 1);
        let mut b = tile("b.pb", "Beta", 1);
        a.budget = None;
        b.budget = Some(0);
        let mut tiles = vec![&a, &b];
        sort_tiles(&mut tiles, SortKey::Budget, SortDir::Desc);
        assert_eq!(names(&tiles), vec!["b.pb", "a.pb"]);
    }
}
