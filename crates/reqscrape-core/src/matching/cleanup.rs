use regex::Regex;
use std::sync::LazyLock;

/// `(cid:NN)` tokens left behind by glyphs without a unicode mapping, typical
/// of OCR'd PDFs.
static CID_ARTIFACT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\(cid:\d*\)").expect("static pattern is valid"));

/// Delete every `(cid:NN)` artifact from `text`.
///
/// Removal is repeated until nothing matches, so nested leftovers such as
/// `(cid:(cid:1)2)` are gone too and the result is a fixed point.
pub fn remove_cid_artifacts(text: &str) -> String {
    let mut current = text.to_string();
    while CID_ARTIFACT.is_match(&current) {
        current = CID_ARTIFACT.replace_all(&current, "").into_owned();
    }
    current
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_removes_artifacts() {
        assert_eq!(remove_cid_artifacts("Con(cid:3)tractor (cid:127)"), "Contractor ");
    }

    #[test]
    fn test_empty_digits() {
        assert_eq!(remove_cid_artifacts("a(cid:)b"), "ab");
    }

    #[test]
    fn test_leaves_other_parentheses() {
        let text = "(a) see (cid) and (cid:x1)";
        assert_eq!(remove_cid_artifacts(text), text);
    }

    #[test]
    fn test_nested_leftovers_removed() {
        assert_eq!(remove_cid_artifacts("x(cid:(cid:1)2)y"), "xy");
    }

    #[test]
    fn test_idempotent() {
        let samples = [
            "plain text",
            "(cid:1)(cid:2)",
            "x(cid:(cid:1)2)y",
            "(a) Provide(cid:31) access.\n",
        ];
        for s in samples {
            let once = remove_cid_artifacts(s);
            assert_eq!(remove_cid_artifacts(&once), once);
        }
    }
}
