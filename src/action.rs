//! Per-field transforms the user can pick for a detected value.

use crate::error::WorkflowError;
use std::fmt;
use std::str::FromStr;

pub const MASK_PLACEHOLDER: &str = "[Masked]";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PiiAction {
    Redact,
    Delete,
    Mask,
}

impl PiiAction {
    pub const ALL: [PiiAction; 3] = [PiiAction::Redact, PiiAction::Delete, PiiAction::Mask];

    /// Replacement text for `raw`. Length is counted in chars, not bytes.
    pub fn apply(self, raw: &str) -> String {
        let n = raw.chars().count();
        match self {
            PiiAction::Redact => "*".repeat(n),
            PiiAction::Delete => " ".repeat(n),
            PiiAction::Mask => MASK_PLACEHOLDER.to_string(),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            PiiAction::Redact => "Redact",
            PiiAction::Delete => "Delete",
            PiiAction::Mask => "Mask",
        }
    }
}

impl fmt::Display for PiiAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for PiiAction {
    type Err = WorkflowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "redact" | "r" => Ok(PiiAction::Redact),
            "delete" | "d" => Ok(PiiAction::Delete),
            "mask" | "m" => Ok(PiiAction::Mask),
            _ => Err(WorkflowError::InvalidAction(s.trim().to_string())),
        }
    }
}

/// Parse a user choice where an empty string or `none` means "no action".
pub fn parse_choice(s: &str) -> Result<Option<PiiAction>, WorkflowError> {
    let s = s.trim();
    if s.is_empty() || s.eq_ignore_ascii_case("none") {
        return Ok(None);
    }
    s.parse().map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redact_keeps_length_with_asterisks() {
        for v in ["", "a", "John Doe", "555-0100", "Zoë Ångström"] {
            let out = PiiAction::Redact.apply(v);
            assert_eq!(out.chars().count(), v.chars().count());
            assert!(out.chars().all(|c| c == '*'));
        }
    }

    #[test]
    fn delete_keeps_length_with_spaces() {
        for v in ["", "x", "john@example.com", "Zoë"] {
            let out = PiiAction::Delete.apply(v);
            assert_eq!(out.chars().count(), v.chars().count());
            assert!(out.chars().all(|c| c == ' '));
        }
    }

    #[test]
    fn mask_ignores_value() {
        assert_eq!(PiiAction::Mask.apply(""), "[Masked]");
        assert_eq!(PiiAction::Mask.apply("a much longer value than the placeholder"), "[Masked]");
    }

    #[test]
    fn john_doe_redacts_to_eight_asterisks() {
        assert_eq!(PiiAction::Redact.apply("John Doe"), "********");
    }

    #[test]
    fn parses_case_insensitively() {
        assert_eq!("Redact".parse::<PiiAction>().unwrap(), PiiAction::Redact);
        assert_eq!(" DELETE ".parse::<PiiAction>().unwrap(), PiiAction::Delete);
        assert_eq!("m".parse::<PiiAction>().unwrap(), PiiAction::Mask);
        assert!(matches!(
            "blur".parse::<PiiAction>(),
            Err(WorkflowError::InvalidAction(ref s)) if s == "blur"
        ));
    }

    #[test]
    fn empty_choice_is_no_action() {
        assert_eq!(parse_choice("").unwrap(), None);
        assert_eq!(parse_choice("   ").unwrap(), None);
        assert_eq!(parse_choice("None\n").unwrap(), None);
        assert_eq!(parse_choice("mask").unwrap(), Some(PiiAction::Mask));
    }
}
