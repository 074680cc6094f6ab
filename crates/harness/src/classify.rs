//! Pass/fail classification of a finished render

use screentest_common::PipelineError;
use tracing::{error, warn};

/// Output prefix used when a render raised before writing anything
pub const RENDER_EXCEPTION_PREFIX: &str = "RENDER_EXCEPTION: ";

/// Collects error messages for one render from the pipeline outcome, the
/// structured-message channel and literal error signatures in the output.
#[derive(Debug, Clone, Default)]
pub struct ErrorClassifier {
    signatures: Vec<String>,
}

impl ErrorClassifier {
    pub fn new(signatures: Vec<String>) -> Self {
        Self {
            signatures: signatures.into_iter().filter(|s| !s.is_empty()).collect(),
        }
    }

    pub fn signatures(&self) -> &[String] {
        &self.signatures
    }

    /// Record a pipeline failure. Fills `output` with a sentinel if nothing
    /// was captured so a failed render always has output.
    pub fn record_failure(
        &self,
        path: &str,
        failure: &PipelineError,
        output: &mut Option<String>,
        errors: &mut Vec<String>,
    ) {
        let message = format!("Exception in render of {}: {}", path, failure);
        error!("{}", message);
        errors.push(message);
        if output.is_none() {
            *output = Some(format!("{}{}", RENDER_EXCEPTION_PREFIX, failure.message()));
        }
    }

    /// One message per configured signature found in `output`
    pub fn scan(&self, path: &str, output: &str) -> Vec<String> {
        self.signatures
            .iter()
            .filter(|sig| output.contains(sig.as_str()))
            .map(|sig| {
                let message = format!("Found error [{}] in output from {}", sig, path);
                warn!("{}", message);
                message
            })
            .collect()
    }

    /// Final error list, in order: pipeline failure, structured errors, signatures
    pub fn classify(
        &self,
        path: &str,
        failure: Option<&PipelineError>,
        structured_errors: Vec<String>,
        output: &mut Option<String>,
    ) -> Vec<String> {
        let mut errors = Vec::new();
        if let Some(failure) = failure {
            self.record_failure(path, failure, output, &mut errors);
        }
        errors.extend(structured_errors);
        if let Some(text) = output.as_deref() {
            errors.extend(self.scan(path, text));
        }
        errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn classifier() -> ErrorClassifier {
        ErrorClassifier::new(vec![
            "[Template Error".to_string(),
            "FTL stack trace".to_string(),
            String::new(),
        ])
    }

    #[test]
    fn test_empty_signatures_dropped() {
        assert_eq!(classifier().signatures().len(), 2);
    }

    #[test_case("<p>fine</p>", 0 ; "clean output")]
    #[test_case("<p>[Template Error: x undefined]</p>", 1 ; "one signature")]
    #[test_case("[Template Error] and FTL stack trace", 2 ; "two signatures")]
    fn test_scan_counts(output: &str, expected: usize) {
        assert_eq!(classifier().scan("users/list", output).len(), expected);
    }

    #[test]
    fn test_scan_message_names_signature_and_path() {
        let found = classifier().scan("users/list", "oops [Template Error here");
        assert_eq!(found, vec!["Found error [[Template Error] in output from users/list"]);
    }

    #[test]
    fn test_failure_sets_sentinel_only_when_no_output() {
        let failure = PipelineError::Render("boom".to_string());

        let mut output = None;
        let errors = classifier().classify("a/b", Some(&failure), vec![], &mut output);
        assert_eq!(output.as_deref(), Some("RENDER_EXCEPTION: boom"));
        assert_eq!(errors, vec!["Exception in render of a/b: Render error: boom"]);

        let mut partial = Some("<div>".to_string());
        classifier().classify("a/b", Some(&failure), vec![], &mut partial);
        assert_eq!(partial.as_deref(), Some("<div>"));
    }

    #[test]
    fn test_classify_order() {
        let failure = PipelineError::Template("bad".to_string());
        let mut output = Some("FTL stack trace".to_string());
        let errors = classifier().classify(
            "x",
            Some(&failure),
            vec!["structured".to_string()],
            &mut output,
        );
        assert_eq!(errors.len(), 3);
        assert!(errors[0].starts_with("Exception in render of x"));
        assert_eq!(errors[1], "structured");
        assert!(errors[2].contains("FTL stack trace"));
    }
}
