//! Pattern rules and PII detectors
//!
//! The rule list is an explicit, ordered sequence of (severity, pattern,
//! message, hint) records. All rules evaluate independently; order only
//! affects presentation order of findings, never suppression. The set is
//! intentionally small and explainable.

use crate::error::RuleError;
use crate::types::Severity;
use regex::Regex;

/// A compiled keyword rule bound to a fixed severity and message/hint pair.
#[derive(Debug, Clone)]
pub struct PatternRule {
    pub severity: Severity,
    pub pattern: Regex,
    pub message: String,
    pub hint: String,
}

/// Uncompiled rule record, for callers supplying their own list.
#[derive(Debug, Clone)]
pub struct RuleSpec<'a> {
    pub severity: Severity,
    pub pattern: &'a str,
    pub message: &'a str,
    pub hint: &'a str,
}

/// Compile an ordered rule list, preserving order.
pub fn compile_rules(specs: &[RuleSpec<'_>]) -> Result<Vec<PatternRule>, RuleError> {
    let mut out = Vec::with_capacity(specs.len());
    for spec in specs {
        let pattern = Regex::new(spec.pattern).map_err(|e| RuleError {
            message: spec.message.to_string(),
            pattern: spec.pattern.to_string(),
            source: e,
        })?;
        out.push(PatternRule {
            severity: spec.severity,
            pattern,
            message: spec.message.to_string(),
            hint: spec.hint.to_string(),
        });
    }
    Ok(out)
}

const BUILTIN_SPECS: &[RuleSpec<'static>] = &[
    RuleSpec {
        severity: Severity::Error,
        pattern: r"(?i)\b(answer\s*key|official\s*solutions?|solutions?\s*manual)\b",
        message: "Possible answer key / solutions content.",
        hint: "Remove it unless explicitly permitted for public sharing.",
    },
    RuleSpec {
        severity: Severity::Warn,
        pattern: r"(?i)\b(midterm|final\s*exam|exam\s*questions?|test\s*questions?)\b",
        message: "Possible exam/test content reference.",
        hint: "Avoid posting assessment questions/answers or details from recent assessments.",
    },
    RuleSpec {
        severity: Severity::Warn,
        pattern: r"(?i)\b(canvas\s*grade|gradebook|student\s*id|pid\b)\b",
        message: "Possible grade/identifier reference.",
        hint: "Ensure no student records or identifiers are included.",
    },
];

/// The built-in keyword rules, in evaluation order.
pub fn builtin_rules() -> Vec<PatternRule> {
    compile_rules(BUILTIN_SPECS).expect("built-in rule patterns are valid")
}

/// Email-shaped tokens. Fires at ERROR everywhere text is read.
pub fn email_detector() -> Regex {
    Regex::new(r"(?i)\b[A-Z0-9._%+-]+@[A-Z0-9.-]+\.[A-Z]{2,}\b")
        .expect("built-in email pattern is valid")
}

/// Phone-number-shaped tokens. Fires at ERROR everywhere text is read.
pub fn phone_detector() -> Regex {
    Regex::new(r"\b(?:\+?1[\s.-]?)?\(?\d{3}\)?[\s.-]?\d{3}[\s.-]?\d{4}\b")
        .expect("built-in phone pattern is valid")
}

/// Image filenames suggesting private content (email/grades/roster).
pub fn suspicious_image_name() -> Regex {
    Regex::new(r"(?i)(email|inbox|gmail|outlook|canvas|grade|roster|student|pid|id)")
        .expect("built-in filename pattern is valid")
}

/// Keep the domain shape, hide most of the local part.
pub fn mask_email(value: &str) -> String {
    match value.split_once('@') {
        None => value.to_string(),
        Some(("", domain)) => format!("***@{domain}"),
        Some((local, domain)) => {
            let keep: String = local.chars().take(1).collect();
            format!("{keep}***@{domain}")
        }
    }
}

/// Keep only the last four digits.
pub fn mask_phone(value: &str) -> String {
    let digits: String = value.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.len() < 4 {
        "***".to_string()
    } else {
        format!("***-***-{}", &digits[digits.len() - 4..])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_rules_compile_in_order() {
        let rules = builtin_rules();
        assert_eq!(rules.len(), 3);
        assert_eq!(rules[0].severity, Severity::Error);
        assert_eq!(rules[1].message, "Possible exam/test content reference.");
    }

    #[test]
    fn exam_rule_matches_exact_phrase() {
        let rules = builtin_rules();
        assert!(rules[1].pattern.is_match("Final Exam Questions"));
        assert!(rules[1].pattern.is_match("the midterm went fine"));
        assert!(!rules[1].pattern.is_match("examine the data"));
    }

    #[test]
    fn answer_key_rule_is_case_insensitive() {
        let rules = builtin_rules();
        assert!(rules[0].pattern.is_match("ANSWER KEY attached"));
        assert!(rules[0].pattern.is_match("official solutions manual"));
    }

    #[test]
    fn email_detector_matches_addresses() {
        let re = email_detector();
        assert!(re.is_match("contact jdoe@example.edu for details"));
        assert!(!re.is_match("just an @ sign"));
    }

    #[test]
    fn phone_detector_matches_common_shapes() {
        let re = phone_detector();
        assert!(re.is_match("call 919-555-0123"));
        assert!(re.is_match("call (919) 555 0123"));
        assert!(re.is_match("+1 919.555.0123"));
        assert!(!re.is_match("version 1.2.3"));
    }

    #[test]
    fn suspicious_name_heuristic() {
        let re = suspicious_image_name();
        assert!(re.is_match("gradebook_export.png"));
        assert!(re.is_match("Canvas-screenshot.jpg"));
        assert!(!re.is_match("diagram.png"));
    }

    #[test]
    fn masks_hide_most_of_the_value() {
        assert_eq!(mask_email("jdoe@example.edu"), "j***@example.edu");
        assert_eq!(mask_email("@example.edu"), "***@example.edu");
        assert_eq!(mask_phone("919-555-0123"), "***-***-0123");
        assert_eq!(mask_phone("12"), "***");
    }

    #[test]
    fn invalid_custom_pattern_is_rejected() {
        let specs = [RuleSpec {
            severity: Severity::Warn,
            pattern: "(unclosed",
            message: "m",
            hint: "h",
        }];
        assert!(compile_rules(&specs).is_err());
    }
}
