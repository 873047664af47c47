pub mod cleanup;

use fancy_regex::{Regex, RegexBuilder};

use crate::error::ScrapeError;
use crate::model::TextMatch;

pub use cleanup::remove_cid_artifacts;

const BACKTRACK_LIMIT: usize = 10_000_000;

/// Applies one configured regular expression to document text.
///
/// Backed by `fancy_regex` so presets may use look-around, which the
/// clause-terminating requirement patterns depend on.
#[derive(Debug, Clone)]
pub struct PatternMatcher {
    regex: Regex,
}

impl PatternMatcher {
    pub fn new(pattern: &str) -> Result<Self, fancy_regex::Error> {
        let regex = RegexBuilder::new(pattern)
            .backtrack_limit(BACKTRACK_LIMIT)
            .build()?;
        Ok(Self { regex })
    }

    pub fn as_str(&self) -> &str {
        self.regex.as_str()
    }

    /// Every non-overlapping match, scanning left to right.
    ///
    /// Results are ordered by `start`, which association relies on.
    pub fn find_all(&self, text: &str) -> Result<Vec<TextMatch>, ScrapeError> {
        let mut matches = Vec::new();
        for m in self.regex.find_iter(text) {
            let m = m.map_err(|e| ScrapeError::Matching(e.to_string()))?;
            matches.push(TextMatch::new(m.start(), m.end(), m.as_str()));
        }
        Ok(matches)
    }
}

/// Headings and requirements located in one document's text.
#[derive(Debug, Clone, Default)]
pub struct DocumentMatches {
    pub headings: Vec<TextMatch>,
    pub requirements: Vec<TextMatch>,
}

/// Clean `text` of OCR artifacts, then run both patterns over the result.
///
/// Returns the cleaned text alongside the matches, since match offsets refer to it.
pub fn match_document(
    text: &str,
    headings: &PatternMatcher,
    requirements: &PatternMatcher,
) -> Result<(String, DocumentMatches), ScrapeError> {
    let cleaned = remove_cid_artifacts(text);
    let matches = DocumentMatches {
        headings: headings.find_all(&cleaned)?,
        requirements: requirements.find_all(&cleaned)?,
    };
    Ok((cleaned, matches))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::presets::PresetRegistry;

    const SAMPLE: &str = "1. Intro\n(a) Do the thing.\n2. Details\n(b) Do another thing.\n";

    fn texts(matches: &[TextMatch]) -> Vec<&str> {
        matches.iter().map(|m| m.text.as_str()).collect()
    }

    #[test]
    fn test_find_all_in_order() {
        let m = PatternMatcher::new(r"\d+").unwrap();
        let found = m.find_all("a1 b22 c333").unwrap();
        assert_eq!(texts(&found), vec!["1", "22", "333"]);
        assert_eq!(found[1].start, 4);
        assert_eq!(found[1].end, 6);
        assert!(found.windows(2).all(|w| w[0].start < w[1].start));
    }

    #[test]
    fn test_tfnsw_headings() {
        let reg = PresetRegistry::builtin().unwrap();
        let headings = reg.heading_pattern("TfNSW").unwrap();
        let found = headings.find_all(SAMPLE).unwrap();
        assert_eq!(texts(&found), vec!["1. Intro", "2. Details"]);
    }

    #[test]
    fn test_tfnsw_heading_depths() {
        let reg = PresetRegistry::builtin().unwrap();
        let headings = reg.heading_pattern("TfNSW").unwrap();
        let text = "3 Scope\nbody\n3.2 Materials\nbody\n3.2.1 Earthworks\n3.2.1.4 Too deep\n";
        let found = headings.find_all(text).unwrap();
        assert_eq!(texts(&found), vec!["3 Scope", "3.2 Materials", "3.2.1 Earthworks"]);
    }

    #[test]
    fn test_tfnsw_requirements_stop_at_label_heading_or_end() {
        let reg = PresetRegistry::builtin().unwrap();
        let reqs = reg.requirement_pattern("TfNSW").unwrap();
        let text = "(a) First clause\ncontinues here.\n(b) Second.\n2. Next Section\n(c) Last one.\n";
        let found = reqs.find_all(text).unwrap();
        assert_eq!(
            texts(&found),
            vec!["(a) First clause\ncontinues here.", "(b) Second.", "(c) Last one."]
        );
    }

    #[test]
    fn test_rms_qa_spec_headings() {
        let reg = PresetRegistry::builtin().unwrap();
        let headings = reg.heading_pattern("RMS QA SPEC").unwrap();
        let text = "A1 General\nSome text here\n4. Materials\n";
        let found = headings.find_all(text).unwrap();
        assert_eq!(texts(&found), vec!["A1 General", "4. Materials"]);
    }

    #[test]
    fn test_general_requirements() {
        let reg = PresetRegistry::builtin().unwrap();
        let reqs = reg.requirement_pattern("General").unwrap();
        let text = "The Contractor shall submit a plan.\nABC header line\n(i) Provide access;\n";
        let found = reqs.find_all(text).unwrap();
        assert_eq!(found.len(), 2);
        assert!(found[0].text.starts_with("The Contractor"));
        assert!(found[1].text.starts_with("(i) Provide access;"));
    }

    #[test]
    fn test_match_document_cleans_before_matching() {
        let reg = PresetRegistry::builtin().unwrap();
        let headings = reg.heading_pattern("TfNSW").unwrap();
        let reqs = reg.requirement_pattern("TfNSW").unwrap();
        let (cleaned, matches) =
            match_document("1. In(cid:12)tro\n(a) Do(cid:3) it.\n", &headings, &reqs).unwrap();
        assert_eq!(cleaned, "1. Intro\n(a) Do it.\n");
        assert_eq!(texts(&matches.headings), vec!["1. Intro"]);
        assert_eq!(texts(&matches.requirements), vec!["(a) Do it."]);
    }
}
