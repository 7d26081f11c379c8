//! Verdict parsing for reviewer and validator output files.
//!
//! A verdict file is free-form markdown whose first non-whitespace token is
//! either `APPROVED` or `REJECTED:<feedback>`. Anything else reads as a
//! rejection with the whole body as feedback.

const REJECTED_MARKER: &[u8] = b"REJECTED:";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Approved,
    Rejected,
}

impl Verdict {
    pub fn as_str(&self) -> &'static str {
        match self {
            Verdict::Approved => "APPROVED",
            Verdict::Rejected => "REJECTED",
        }
    }
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Approved iff the trimmed, upper-cased content begins with `APPROVED`.
pub fn parse_verdict(content: &str) -> Verdict {
    if content.trim().to_uppercase().starts_with("APPROVED") {
        Verdict::Approved
    } else {
        Verdict::Rejected
    }
}

/// The text after the first case-insensitive `REJECTED:`, trimmed. Without
/// the marker, the whole content is the feedback.
pub fn extract_feedback(content: &str) -> String {
    let bytes = content.as_bytes();
    match bytes
        .windows(REJECTED_MARKER.len())
        .position(|w| w.eq_ignore_ascii_case(REJECTED_MARKER))
    {
        Some(idx) => content[idx + REJECTED_MARKER.len()..].trim().to_string(),
        None => content.to_string(),
    }
}
