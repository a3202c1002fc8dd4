use crate::fmt::{format_short_number, round_sig};
use pb_format::RawRecord;

/// Significant digits used for the short quality display and for quality
/// ordering in the query engine.
pub const QUALITY_DISPLAY_DIGITS: u32 = 6;

/// Derived quality score and boolean flags for one record.
#[derive(Debug, Clone, PartialEq)]
pub struct QualityFlags {
    pub quality: f64,
    pub quality_short: String,
    pub fully_funded: bool,
    pub experimental: bool,
    pub has_geo: bool,
    pub has_target: bool,
    pub has_category: bool,
}

/// Compute the quality score and flags for a parsed record.
///
/// The score is `vote_length^3 * projects^2 * votes` over the counts that
/// actually parsed, not the declared META counts; a missing factor makes the
/// score 0 rather than an error.
pub fn compute(record: &RawRecord) -> QualityFlags {
    let quality = match record.vote_length() {
        Some(length) if !record.projects.is_empty() && !record.ballots.is_empty() => {
            length.powi(3)
                * (record.projects.len() as f64).powi(2)
                * record.ballots.len() as f64
        }
        _ => 0.0,
    };

    QualityFlags {
        quality,
        quality_short: format_short_number(round_sig(quality, QUALITY_DISPLAY_DIGITS)),
        fully_funded: fully_funded(record),
        experimental: record.meta.experimental(),
        has_geo: record.projects.iter().any(|p| p.geo().is_some()),
        has_target: record.projects.iter().any(|p| !p.targets.is_empty()),
        has_category: record.projects.iter().any(|p| !p.categories.is_empty()),
    }
}

/// Every project selected and the summed selected cost within the declared
/// budget (non-strict), or no budget declared at all. An empty project list
/// is never fully funded.
fn fully_funded(record: &RawRecord) -> bool {
    if record.projects.is_empty() {
        return false;
    }
    if !record.projects.iter().all(|p| p.selected == Some(true)) {
        return false;
    }
    match record.meta.budget() {
        Some(budget) => record.selected_cost_sum() <= budget as f64,
        None => true,
    }
}
