//! # PB Format
//!
//! Parser for semicolon-delimited participatory-budgeting data files.
//!
//! ## Layout of a PB file
//!
//! ```text
//! META
//! key;value
//! country;Poland
//! ...
//! PROJECTS
//! project_id;cost;name;selected
//! 1;40000;New playground;1
//! ...
//! VOTES
//! voter_id;vote;points
//! 1;3,7,12;10,5,1
//! ...
//! ```
//!
//! Parsing is deliberately tolerant: a missing section yields an empty
//! collection, short rows are padded, numeric fields that fail to parse are
//! recorded as absent (never coerced to zero) and every such degradation is
//! captured as a [`DataWarning`] on the resulting [`RawRecord`]. A file only
//! fails to parse when it is not text or contains no recognizable section
//! header at all.

mod comments;
mod error;
mod meta;
mod parser;
mod record;

pub use comments::extract_comments;
pub use error::{ParseError, Result};
pub use meta::MetaBag;
pub use parser::{parse, parse_str};
pub use record::{Ballot, DataWarning, Project, RawRecord, VoteType};
