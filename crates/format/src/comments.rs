/// Extract comment entries from a META `comment` value.
///
/// A comment field may hold several entries delimited by sequential markers
/// `#1:`, `#2:`, ... on one or many lines. Text between consecutive markers
/// becomes one entry, trimmed of whitespace and trailing `;`/`.`. A
/// non-empty field without markers is a single entry.
pub fn extract_comments(raw: &str) -> Vec<String> {
    let flat = raw.trim().replace('\n', " ");
    if flat.is_empty() {
        return Vec::new();
    }

    let mut parts = Vec::new();
    let mut expecting = 1u32;
    loop {
        let marker = format!("#{expecting}:");
        let next_marker = format!("#{}:", expecting + 1);
        let Some(start) = flat.find(&marker) else {
            if expecting == 1 {
                push_trimmed(&mut parts, &flat);
            }
            break;
        };
        let body_start = start + marker.len();
        let end = flat[body_start..].find(&next_marker).map(|i| body_start + i);
        let chunk = match end {
            Some(end) => &flat[body_start..end],
            None => &flat[body_start..],
        };
        push_trimmed(&mut parts, chunk);
        expecting += 1;
        if end.is_none() {
            break;
        }
    }
    parts
}

fn push_trimmed(parts: &mut Vec<String>, chunk: &str) {
    let text = chunk.trim().trim_matches(|c| c == ';' || c == '.').trim();
    if !text.is_empty() {
        parts.push(text.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn empty_comment_yields_nothing() {
        assert_eq!(extract_comments(""), Vec::<String>::new());
        assert_eq!(extract_comments("   "), Vec::<String>::new());
    }

    #[test]
    fn plain_text_is_a_single_entry() {
        assert_eq!(
            extract_comments("Vote count includes invalid ballots."),
            vec!["Vote count includes invalid ballots"]
        );
    }

    #[test]
    fn sequential_markers_split_entries() {
        let raw = "#1: First remark. #2: Second remark; #3: Third";
        assert_eq!(
            extract_comments(raw),
            vec!["First remark", "Second remark", "Third"]
        );
    }

    #[test]
    fn markers_spanning_lines_are_flattened() {
        let raw = "#1: Line one\n#2: Line two";
        assert_eq!(extract_comments(raw), vec!["Line one", "Line two"]);
    }

    #[test]
    fn gap_in_marker_sequence_stops_the_scan() {
        // #3 is never expected after #1, so only the first entry is taken.
        let raw = "#1: First #3: Orphan";
        assert_eq!(extract_comments(raw), vec!["First #3: Orphan"]);
    }
}
