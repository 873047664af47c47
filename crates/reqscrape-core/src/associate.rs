use crate::model::{PreamblePolicy, RequirementRow, TextMatch};

/// Attribute each requirement to the heading section whose offsets contain it.
///
/// For each heading `current` after the first, requirements strictly between
/// the previous heading and `current` are emitted under the previous heading.
/// When `current` is the last heading, requirements strictly after it are
/// additionally emitted under it. The two checks are independent, and a
/// requirement starting exactly on a heading offset satisfies neither bound.
///
/// Rows come out heading-major, requirement-minor. A document with fewer than
/// two headings yields no sectioned rows; with zero headings it yields no rows
/// at all, whatever the preamble policy.
pub fn associate(
    headings: &[TextMatch],
    requirements: &[TextMatch],
    document: &str,
    preamble: &PreamblePolicy,
) -> Vec<RequirementRow> {
    let mut rows = Vec::new();

    let Some(first) = headings.first() else {
        return rows;
    };

    if let PreamblePolicy::Attribute(label) = preamble {
        for r in requirements.iter().filter(|r| r.start < first.start) {
            rows.push(row(document, label, r));
        }
    }

    let last_index = headings.len() - 1;
    for (i, current) in headings.iter().enumerate().skip(1) {
        let previous = &headings[i - 1];

        for r in requirements {
            if previous.start < r.start && r.start < current.start {
                rows.push(row(document, &previous.text, r));
            }
        }

        if i == last_index {
            for r in requirements {
                if r.start > current.start {
                    rows.push(row(document, &current.text, r));
                }
            }
        }
    }

    rows
}

fn row(document: &str, heading: &str, requirement: &TextMatch) -> RequirementRow {
    RequirementRow::new(document, heading.trim(), &flatten(&requirement.text))
}

/// Requirement text as one spreadsheet line: newlines become single spaces.
fn flatten(text: &str) -> String {
    text.trim().replace("\r\n", " ").replace('\n', " ")
}
