use crate::contract::DocEntry;

/// Joins per-file summaries into one markdown document.
///
/// Each entry gets a `##` heading with the file's base name and a line with
/// its full path; entries are separated by a horizontal rule of dashes.
pub fn aggregate(entries: &[DocEntry]) -> String {
    let separator = format!("\n\n{}\n\n", "---".repeat(20));
    entries
        .iter()
        .map(|e| {
            format!(
                "## {}\n\n**File Path:** `{}`\n\n{}",
                e.file_name, e.full_path, e.summary
            )
        })
        .collect::<Vec<_>>()
        .join(&separator)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::DocStatus;

    fn entry(name: &str, summary: &str) -> DocEntry {
        DocEntry {
            file_name: name.to_string(),
            full_path: format!("parsed_code/job/{name}"),
            summary: summary.to_string(),
            status: DocStatus::Success,
        }
    }

    #[test]
    fn single_entry_has_heading_path_and_summary() {
        let doc = aggregate(&[entry("a.js", "Does a.")]);
        assert_eq!(
            doc,
            "## a.js\n\n**File Path:** `parsed_code/job/a.js`\n\nDoes a."
        );
    }

    #[test]
    fn entries_keep_order_and_are_separated() {
        let doc = aggregate(&[entry("a.js", "A"), entry("b.ts", "B"), entry("c.js", "C")]);
        let rule = "-".repeat(60);
        assert_eq!(doc.matches(&rule).count(), 2);

        let a = doc.find("## a.js").unwrap();
        let b = doc.find("## b.ts").unwrap();
        let c = doc.find("## c.js").unwrap();
        assert!(a < b && b < c);
    }

    #[test]
    fn deterministic_for_same_input() {
        let entries = vec![entry("a.js", "A"), entry("b.ts", "B")];
        assert_eq!(aggregate(&entries), aggregate(&entries));
    }

    #[test]
    fn empty_input_gives_empty_document() {
        assert_eq!(aggregate(&[]), "");
    }
}
