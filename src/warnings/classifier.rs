use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, trace};

use crate::error::Error;
use crate::types::Result;
use crate::warnings::templates::{WarningTemplate, TEMPLATES};

const PLACEHOLDER: &str = r"<[A-Za-z][A-Za-z0-9_]*>";

static DEFAULT_CLASSIFIER: Lazy<std::result::Result<WarningClassifier, String>> =
    Lazy::new(|| WarningClassifier::from_templates(TEMPLATES).map_err(|e| e.to_string()));

/// Pattern for one line of a template
#[derive(Debug)]
enum LinePattern {
    /// Placeholder-only line, matches any content
    Any,
    /// Literal text with optional inline placeholders
    Text(Regex),
}

impl LinePattern {
    fn compile(line: &str, placeholder: &Regex) -> Result<Self> {
        let line = line.trim();

        if let Some(found) = placeholder.find(line) {
            if found.start() == 0 && found.end() == line.len() {
                return Ok(LinePattern::Any);
            }
        }

        let mut pattern = String::from("^");
        let mut last = 0;
        for found in placeholder.find_iter(line) {
            pattern.push_str(&regex::escape(&line[last..found.start()]));
            pattern.push_str(".*");
            last = found.end();
        }
        pattern.push_str(&regex::escape(&line[last..]));
        pattern.push('$');

        Regex::new(&pattern)
            .map(LinePattern::Text)
            .map_err(|e| Error::Internal(format!("invalid warning template line '{}': {}", line, e)))
    }

    fn matches(&self, line: &str) -> bool {
        match self {
            LinePattern::Any => true,
            LinePattern::Text(regex) => regex.is_match(line),
        }
    }
}

#[derive(Debug)]
struct CompiledTemplate {
    code: &'static str,
    lines: Vec<LinePattern>,
}

impl CompiledTemplate {
    /// Whether the template matches the start of `lines`
    fn matches(&self, lines: &[&str]) -> bool {
        self.lines.len() <= lines.len()
            && self.lines.iter().zip(lines).all(|(pattern, line)| pattern.matches(line))
    }
}

/// Maps free-text warning blocks to warning codes
#[derive(Debug)]
pub struct WarningClassifier {
    templates: Vec<CompiledTemplate>,
}

impl WarningClassifier {
    /// Classifier over the shipped warning table
    pub fn new() -> Result<Self> {
        Self::from_templates(TEMPLATES)
    }

    /// Classifier over an arbitrary table
    pub fn from_templates(templates: &'static [WarningTemplate]) -> Result<Self> {
        let placeholder = Regex::new(PLACEHOLDER)
            .map_err(|e| Error::Internal(format!("invalid placeholder pattern: {}", e)))?;

        let templates = templates
            .iter()
            .map(|template| {
                if template.lines.is_empty() {
                    return Err(Error::Internal(format!("warning template {} has no lines", template.code)));
                }
                let lines = template
                    .lines
                    .iter()
                    .map(|line| LinePattern::compile(line, &placeholder))
                    .collect::<Result<Vec<_>>>()?;
                Ok(CompiledTemplate { code: template.code, lines })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { templates })
    }

    /// Classify a warning block into codes, in order of appearance
    ///
    /// Blank lines between warnings are skipped. Fails with [`Error::UnknownWarnings`] listing every line that no
    /// template accounts for.
    pub fn classify(&self, raw: &str) -> Result<Vec<&'static str>> {
        // Blank lines stay in place so a placeholder line can bind to one.
        let lines: Vec<&str> = raw.lines().map(str::trim).collect();

        let mut codes = Vec::new();
        let mut unmatched = Vec::new();
        let mut cursor = 0;

        while cursor < lines.len() {
            if lines[cursor].is_empty() {
                cursor += 1;
                continue;
            }
            match self.longest_match(&lines[cursor..]) {
                Some((code, consumed)) => {
                    trace!("Warning line {} classified as {} ({} lines)", cursor, code, consumed);
                    codes.push(code);
                    cursor += consumed;
                }
                None => {
                    unmatched.push(lines[cursor].to_string());
                    cursor += 1;
                }
            }
        }

        if !unmatched.is_empty() {
            debug!("{} warning lines could not be classified", unmatched.len());
            return Err(Error::UnknownWarnings(unmatched));
        }

        Ok(codes)
    }

    fn longest_match(&self, lines: &[&str]) -> Option<(&'static str, usize)> {
        let mut best: Option<(&'static str, usize)> = None;

        for template in &self.templates {
            if !template.matches(lines) {
                continue;
            }
            let consumed = template.lines.len();
            if best.map_or(true, |(_, longest)| consumed > longest) {
                best = Some((template.code, consumed));
            }
        }

        best
    }
}

/// Classify using the shipped warning table
pub fn classify(raw: &str) -> Result<Vec<&'static str>> {
    match &*DEFAULT_CLASSIFIER {
        Ok(classifier) => classifier.classify(raw),
        Err(e) => Err(Error::Internal(e.clone())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_input() {
        assert!(classify("").unwrap().is_empty());
        assert!(classify("\n  \n").unwrap().is_empty());
    }

    #[test]
    fn test_shared_first_line() {
        let codes = classify("Trust chain is empty.\nCertificate has a null issuer").unwrap();
        assert_eq!(codes, vec!["TRUST_CHAIN_NULL_OR_EMPTY", "CERTIFICATE_HAS_NULL_ISSUER"]);

        let codes = classify("Trust chain is empty.\nThe certificate is not signed by a trusted root CA.").unwrap();
        assert_eq!(codes, vec!["TRUST_CHAIN_EMPTY_AND_CERTIFICATE_SIGNED_BY_NON_ROOT_CA"]);
    }

    #[test]
    fn test_multi_line_templates() {
        let raw = "Expected to find trust chain:\n    <expectedName>\n    <expectedDescription>\n  Instead found:\n    <actualName>\n    <actualDescription>\nExtra certificates were found in the chain and are being removed.\ntrustChainData";
        let codes = classify(raw).unwrap();
        assert_eq!(codes, vec!["NAMED_TRUST_CHAIN_MISMATCH", "EXTRA_CERT_IN_TRUST_CHAIN"]);
    }

    #[test]
    fn test_placeholder_lines_take_real_content() {
        let raw = "Expected to find trust chain:\n    DigiCert Global Root G2\n    Issued by DigiCert Inc\n  Instead found:\n    ISRG Root X1\n    Issued by Internet Security Research Group";
        assert_eq!(classify(raw).unwrap(), vec!["NAMED_TRUST_CHAIN_MISMATCH"]);
    }

    #[test]
    fn test_inline_placeholders() {
        let raw = "Certificate data is blank or missing for 'ECDSA'.\n\
                   The common name in the certificate (www.example.org) does not match the common name in the CSR (www.example.com).\n\
                   Certificate will expire in less than 7 days.";
        assert_eq!(
            classify(raw).unwrap(),
            vec!["CERTIFICATE_DATA_BLANK_OR_MISSING", "CN_MISMATCH", "CERTIFICATE_EXPIRES_SOON"]
        );
    }

    #[test]
    fn test_duplicates_preserved() {
        let codes = classify("Certificate has a null issuer\nTrust chain is empty.\nCertificate has a null issuer").unwrap();
        assert_eq!(
            codes,
            vec!["CERTIFICATE_HAS_NULL_ISSUER", "TRUST_CHAIN_NULL_OR_EMPTY", "CERTIFICATE_HAS_NULL_ISSUER"]
        );
    }

    #[test]
    fn test_every_template_classifies_itself() {
        let mut raw = String::new();
        let mut expected = Vec::new();
        for template in TEMPLATES {
            for line in template.lines {
                raw.push_str(line);
                raw.push('\n');
            }
            expected.push(template.code);
        }

        assert_eq!(classify(&raw).unwrap(), expected);
    }

    #[test]
    fn test_blank_placeholder_line_does_not_swallow_next_warning() {
        let raw = "Extra certificates were found in the chain and are being removed.\n\nCertificate has a null issuer";
        assert_eq!(
            classify(raw).unwrap(),
            vec!["EXTRA_CERT_IN_TRUST_CHAIN", "CERTIFICATE_HAS_NULL_ISSUER"]
        );
    }

    #[test]
    fn test_blank_placeholder_inside_multi_line_template() {
        let raw = "Expected to find trust chain:\n    \n    Issued by DigiCert\n  Instead found:\n    ISRG Root X1\n    Issued by ISRG";
        assert_eq!(classify(raw).unwrap(), vec!["NAMED_TRUST_CHAIN_MISMATCH"]);
    }

    #[test]
    fn test_blank_lines_between_warnings_are_skipped() {
        let raw = "\n\nTrust chain is empty.\n\n\nCertificate has a null issuer\n\n";
        assert_eq!(
            classify(raw).unwrap(),
            vec!["TRUST_CHAIN_NULL_OR_EMPTY", "CERTIFICATE_HAS_NULL_ISSUER"]
        );
    }

    /// Render templates in the given order with placeholders filled in
    fn render(order: &[usize], data_line: &str) -> (String, Vec<&'static str>) {
        let placeholder = Regex::new(PLACEHOLDER).unwrap();
        let mut raw = String::new();
        let mut expected = Vec::new();
        for &index in order {
            let template = &TEMPLATES[index];
            for line in template.lines {
                let whole = placeholder
                    .find(line)
                    .map_or(false, |found| found.start() == 0 && found.end() == line.len());
                if whole {
                    raw.push_str(data_line);
                } else {
                    raw.push_str(&placeholder.replace_all(line, "example-value"));
                }
                raw.push('\n');
            }
            expected.push(template.code);
        }
        (raw, expected)
    }

    #[test]
    fn test_templates_classify_in_any_order() {
        let forward: Vec<usize> = (0..TEMPLATES.len()).collect();
        let reversed: Vec<usize> = forward.iter().rev().copied().collect();
        let scrambled: Vec<usize> = forward
            .iter()
            .copied()
            .filter(|i| i % 2 == 1)
            .chain(forward.iter().copied().filter(|i| i % 2 == 0).rev())
            .collect();

        for order in [&forward, &reversed, &scrambled] {
            for data_line in ["    -----BEGIN CERTIFICATE-----MIIB", "DigiCert Global Root G2", ""] {
                let (raw, expected) = render(order, data_line);
                assert_eq!(classify(&raw).unwrap(), expected, "data line {:?}", data_line);
            }
        }
    }

    #[test]
    fn test_unknown_sentences_are_reported() {
        let raw = "Trust chain is empty.\nSomething went sideways.\nCertificate has a null issuer\nAnother mystery";
        match classify(raw) {
            Err(Error::UnknownWarnings(lines)) => {
                assert_eq!(lines, vec!["Something went sideways.", "Another mystery"]);
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_incomplete_multi_line_template_is_unknown() {
        let result = classify("Expected to find trust chain:\n    only one line");
        match result {
            Err(Error::UnknownWarnings(lines)) => assert_eq!(lines.len(), 2),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_declaration_order_breaks_ties() {
        static TABLE: &[WarningTemplate] = &[
            WarningTemplate { code: "FIRST", lines: &["Disk <name> is full"] },
            WarningTemplate { code: "SECOND", lines: &["Disk <name> is <state>"] },
        ];
        let classifier = WarningClassifier::from_templates(TABLE).unwrap();
        assert_eq!(classifier.classify("Disk sda is full").unwrap(), vec!["FIRST"]);
        assert_eq!(classifier.classify("Disk sda is fine").unwrap(), vec!["SECOND"]);
    }

    #[test]
    fn test_rejects_empty_template() {
        static TABLE: &[WarningTemplate] = &[WarningTemplate { code: "EMPTY", lines: &[] }];
        assert!(matches!(WarningClassifier::from_templates(TABLE), Err(Error::Internal(_))));
    }
}
