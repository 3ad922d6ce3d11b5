//! Self-heal policy: failure classification and the retry decision.
//!
//! Classification is substring matching over the diagnostic, tuned for
//! shell tooling output. It only shapes the advisory hint; the retry
//! decision itself depends solely on the attempt bound, so an unclassified
//! failure still retries and a perfectly classified one still gives up at
//! the limit.

use tracing::debug;

use crate::domain::{FailureClass, RemediationHint, StageFailure};

/// Outcome of a self-heal decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealDecision {
    /// Route back to authoring with this hint.
    Retry(RemediationHint),
    /// Attempt bound reached; fail the tool for this run.
    GiveUp,
}

/// Decide whether a failed attempt retries.
///
/// `attempt_number` is the attempt that just failed (1-indexed);
/// `max_attempts` counts the initial attempt.
pub fn remediate(failure: &StageFailure, attempt_number: u32, max_attempts: u32) -> HealDecision {
    if attempt_number >= max_attempts {
        debug!(stage = %failure.stage, attempt_number, max_attempts, "attempt bound reached");
        return HealDecision::GiveUp;
    }

    let (class, identifiers) = classify(&failure.diagnostic);
    let instruction = match class {
        FailureClass::MissingDependency => {
            "install the missing dependency before the main install steps".to_string()
        }
        FailureClass::QuotingSyntax => {
            "fix the quoting or syntax problem in the procedure".to_string()
        }
        FailureClass::Unknown => "review the failure output and correct the procedure".to_string(),
    };

    debug!(stage = %failure.stage, %class, ?identifiers, "retrying with remediation hint");
    HealDecision::Retry(RemediationHint::new(class, instruction, identifiers))
}

/// Classify a diagnostic and extract concrete identifiers from it.
pub fn classify(diagnostic: &str) -> (FailureClass, Vec<String>) {
    if let Some(rest) = diagnostic.split("error while loading shared libraries:").nth(1) {
        let lib = rest.split(':').next().unwrap_or("").trim();
        let identifiers = if lib.is_empty() { vec![] } else { vec![lib.to_string()] };
        return (FailureClass::MissingDependency, identifiers);
    }

    if diagnostic.contains("unbound variable") {
        // bash prints "line N: NAME: unbound variable"
        let name = diagnostic
            .split(": unbound variable")
            .next()
            .and_then(|head| head.rsplit(':').next())
            .map(str::trim)
            .unwrap_or("");
        let identifiers = if name.is_empty() { vec![] } else { vec![name.to_string()] };
        return (FailureClass::MissingDependency, identifiers);
    }

    if diagnostic.contains("command not found") {
        let name = diagnostic
            .split(": command not found")
            .next()
            .and_then(|head| head.rsplit(':').next())
            .map(str::trim)
            .unwrap_or("");
        let identifiers = if name.is_empty() { vec![] } else { vec![name.to_string()] };
        return (FailureClass::MissingDependency, identifiers);
    }

    if let Some(rest) = diagnostic.split("Unable to locate package").nth(1) {
        let pkg = rest.split_whitespace().next().unwrap_or("");
        let identifiers = if pkg.is_empty() { vec![] } else { vec![pkg.to_string()] };
        return (FailureClass::MissingDependency, identifiers);
    }

    if diagnostic.contains("unexpected EOF while looking for matching")
        || diagnostic.contains("syntax error near unexpected token")
        || diagnostic.contains("SC2086")
        || diagnostic.contains("Double quote to prevent globbing")
    {
        return (FailureClass::QuotingSyntax, vec![]);
    }

    (FailureClass::Unknown, vec![])
}
