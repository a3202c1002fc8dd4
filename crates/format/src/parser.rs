use crate::error::{ParseError, Result};
use crate::meta::MetaBag;
use crate::record::{Ballot, DataWarning, Project, RawRecord};
use std::collections::BTreeSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Meta,
    Projects,
    Votes,
}

impl Section {
    fn detect(first_field: &str) -> Option<Self> {
        match first_field.trim().to_lowercase().as_str() {
            "meta" => Some(Self::Meta),
            "projects" => Some(Self::Projects),
            "votes" => Some(Self::Votes),
            _ => None,
        }
    }

    fn name(self) -> &'static str {
        match self {
            Self::Meta => "META",
            Self::Projects => "PROJECTS",
            Self::Votes => "VOTES",
        }
    }

    fn expected_id_column(self) -> Option<&'static str> {
        match self {
            Self::Meta => None,
            Self::Projects => Some("project_id"),
            Self::Votes => Some("voter_id"),
        }
    }
}

/// Parse raw bytes as a PB file.
pub fn parse(bytes: &[u8]) -> Result<RawRecord> {
    let text = std::str::from_utf8(bytes)?;
    parse_str(text)
}

/// Parse one PB file. Pure; no I/O beyond the provided text.
pub fn parse_str(text: &str) -> Result<RawRecord> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b';')
        .has_headers(false)
        .flexible(true)
        .from_reader(text.as_bytes());

    let mut record = RawRecord::default();
    let mut section: Option<Section> = None;
    let mut expect_header = false;
    let mut header: Vec<String> = Vec::new();
    let mut seen_any_section = false;
    let mut seen_voters: BTreeSet<String> = BTreeSet::new();
    let mut row_no: u64 = 0;

    for row in reader.records() {
        let row = match row {
            Ok(row) => row,
            Err(err) => {
                record.warnings.push(DataWarning::MalformedRow {
                    section: section.map(Section::name).unwrap_or("FILE").to_string(),
                    row: row_no,
                    detail: err.to_string(),
                });
                continue;
            }
        };
        if row.iter().all(|field| field.trim().is_empty()) {
            continue;
        }
        let first = row.get(0).unwrap_or("");

        if let (true, Some(current)) = (expect_header, section) {
            header = row.iter().map(|f| f.trim().to_lowercase()).collect();
            if let Some(expected) = current.expected_id_column() {
                let found = header.first().map(String::as_str).unwrap_or("");
                if found != expected {
                    record.warnings.push(DataWarning::HeaderMismatch {
                        section: current.name().to_string(),
                        found: found.to_string(),
                    });
                }
            }
            expect_header = false;
            row_no = 0;
            continue;
        }

        if let Some(next) = Section::detect(first) {
            section = Some(next);
            seen_any_section = true;
            expect_header = true;
            if next == Section::Projects {
                // Column presence is part of the record, not just the rows.
                record.selected_column = false;
            }
            continue;
        }

        row_no += 1;
        match section {
            None => {}
            Some(Section::Meta) => {
                let value = row.get(1).unwrap_or("");
                record.meta.insert(first, value);
                if row.len() > 2 {
                    record.warnings.push(DataWarning::ExtraFields {
                        section: "META".to_string(),
                        row: row_no,
                    });
                }
            }
            Some(Section::Projects) => {
                let project = parse_project(
                    &row,
                    &header,
                    row_no,
                    &mut record.warnings,
                    &mut record.selected_column,
                );
                record.projects.push(project);
            }
            Some(Section::Votes) => {
                let ballot = parse_ballot(&row, &header, row_no, &mut record.warnings);
                if seen_voters.contains(&ballot.voter_id) {
                    record.warnings.push(DataWarning::DuplicateVoterId {
                        voter_id: ballot.voter_id,
                    });
                } else {
                    seen_voters.insert(ballot.voter_id.clone());
                    record.ballots.push(ballot);
                }
            }
        }
    }

    if !seen_any_section {
        return Err(ParseError::NoSections);
    }

    check_declared_counts(&mut record);
    log::debug!(
        "parsed {} projects, {} ballots, {} warnings",
        record.projects.len(),
        record.ballots.len(),
        record.warnings.len()
    );
    Ok(record)
}

fn parse_project(
    row: &csv::StringRecord,
    header: &[String],
    row_no: u64,
    warnings: &mut Vec<DataWarning>,
    selected_column: &mut bool,
) -> Project {
    let mut project = Project {
        id: row.get(0).unwrap_or("").trim().to_string(),
        ..Project::default()
    };

    if row.len() > header.len() && !header.is_empty() {
        warnings.push(DataWarning::ExtraFields {
            section: "PROJECTS".to_string(),
            row: row_no,
        });
    }

    for (idx, column) in header.iter().enumerate().skip(1) {
        // Short rows are padded with the empty string.
        let value = row.get(idx).unwrap_or("").trim();
        match column.as_str() {
            "name" => project.name = value.to_string(),
            "cost" => {
                project.cost = parse_number(value, "PROJECTS", row_no, column, warnings);
            }
            "votes" => {
                project.votes = parse_number(value, "PROJECTS", row_no, column, warnings)
                    .map(|v| v.trunc() as u64);
            }
            "score" => {
                project.score = parse_number(value, "PROJECTS", row_no, column, warnings);
            }
            "selected" => {
                *selected_column = true;
                project.selected = (!value.is_empty()).then(|| value == "1");
            }
            "category" | "categories" => project.categories = split_tokens(value),
            "target" | "targets" => project.targets = split_tokens(value),
            "latitude" | "lat" => {
                project.latitude = parse_number(value, "PROJECTS", row_no, column, warnings);
            }
            "longitude" | "lon" | "long" => {
                project.longitude = parse_number(value, "PROJECTS", row_no, column, warnings);
            }
            _ => {
                if !value.is_empty() {
                    project.extra.insert(column.clone(), value.to_string());
                }
            }
        }
    }
    project
}

fn parse_ballot(
    row: &csv::StringRecord,
    header: &[String],
    row_no: u64,
    warnings: &mut Vec<DataWarning>,
) -> Ballot {
    let mut ballot = Ballot {
        voter_id: row.get(0).unwrap_or("").trim().to_string(),
        ..Ballot::default()
    };

    if row.len() > header.len() && !header.is_empty() {
        warnings.push(DataWarning::ExtraFields {
            section: "VOTES".to_string(),
            row: row_no,
        });
    }

    for (idx, column) in header.iter().enumerate().skip(1) {
        let value = row.get(idx).unwrap_or("").trim();
        match column.as_str() {
            "vote" => ballot.choices = split_tokens(value),
            "points" => {
                ballot.points = value
                    .split(',')
                    .map(str::trim)
                    .filter(|t| !t.is_empty())
                    .map(|t| parse_number(t, "VOTES", row_no, column, warnings))
                    .collect();
            }
            "age" => {
                ballot.age = parse_number(value, "VOTES", row_no, column, warnings)
                    .map(|v| v.trunc() as u32);
            }
            "sex" => {
                ballot.sex = (!value.is_empty()).then(|| value.to_string());
            }
            _ => {}
        }
    }
    ballot
}

/// Best-effort numeric parse; `None` (absent) on failure, never zero.
fn parse_number(
    value: &str,
    section: &str,
    row_no: u64,
    column: &str,
    warnings: &mut Vec<DataWarning>,
) -> Option<f64> {
    if value.is_empty() {
        return None;
    }
    let normalized = value.replace(',', ".");
    match normalized.parse::<f64>() {
        Ok(parsed) => Some(parsed),
        Err(_) => {
            warnings.push(DataWarning::UnparsableNumber {
                section: section.to_string(),
                row: row_no,
                column: column.to_string(),
                value: value.to_string(),
            });
            None
        }
    }
}

fn split_tokens(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

fn check_declared_counts(record: &mut RawRecord) {
    if let Some(declared) = record.meta.declared_num_projects() {
        let parsed = record.projects.len() as u64;
        if declared != parsed {
            record
                .warnings
                .push(DataWarning::DeclaredProjectsMismatch { declared, parsed });
        }
    }
    if let Some(declared) = record.meta.declared_num_votes() {
        let parsed = record.ballots.len() as u64;
        if declared != parsed {
            record
                .warnings
                .push(DataWarning::DeclaredVotesMismatch { declared, parsed });
        }
    }
}
