//! Document entity and parse lifecycle
//!
//! A `Document` is the durable record of one uploaded resume. The parse
//! lifecycle and soft deletion are tracked as two orthogonal fields; the
//! packed legacy status code only exists at the API boundary.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Parse lifecycle of a document.
///
/// A document is created in `Parsing` the moment its metadata is
/// registered. `Succeeded` and `Failed` are terminal: no transition out
/// of either happens in this service (re-processing requires an external
/// re-publish of the ingestion event).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParseState {
    Parsing,
    Succeeded,
    Failed,
}

impl ParseState {
    /// Stored integer representation.
    pub fn as_i32(self) -> i32 {
        match self {
            ParseState::Parsing => 1,
            ParseState::Succeeded => 2,
            ParseState::Failed => 3,
        }
    }

    pub fn from_i32(value: i32) -> Option<Self> {
        match value {
            1 => Some(ParseState::Parsing),
            2 => Some(ParseState::Succeeded),
            3 => Some(ParseState::Failed),
            _ => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        !matches!(self, ParseState::Parsing)
    }
}

/// Durable record of an uploaded resume.
///
/// `file_key` is immutable once set; only the parse lifecycle fields
/// (`parse_state`, `llm_parse_content`, `parse_error`) and `updated_at`
/// mutate after creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: i64,
    pub user_id: i64,
    pub file_key: String,
    pub filename: String,
    pub filetype: String,
    pub filesize: i64,
    pub parse_state: ParseState,
    pub deleted: bool,
    /// JSON-serialized `ParseResult`, empty until a successful parse.
    pub llm_parse_content: String,
    /// Short failure summary, empty unless the parse failed.
    pub parse_error: String,
    pub updated_at: DateTime<Utc>,
}

impl Document {
    /// Packed status code used by the original wire contract:
    /// 1 = uploaded, 2 = parsing, 3 = parse_success, 4 = deleted,
    /// 5 = failed.
    ///
    /// Code 1 is never produced here: registration creates rows directly
    /// in `Parsing`. Deletion wins over the parse lifecycle.
    pub fn wire_status(&self) -> i32 {
        if self.deleted {
            return 4;
        }
        match self.parse_state {
            ParseState::Parsing => 2,
            ParseState::Succeeded => 3,
            ParseState::Failed => 5,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(state: ParseState, deleted: bool) -> Document {
        Document {
            id: 42,
            user_id: 7,
            file_key: "resume/7/42.pdf".to_string(),
            filename: "cv.pdf".to_string(),
            filetype: "pdf".to_string(),
            filesize: 10_240,
            parse_state: state,
            deleted,
            llm_parse_content: String::new(),
            parse_error: String::new(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_parse_state_roundtrip() {
        for state in [ParseState::Parsing, ParseState::Succeeded, ParseState::Failed] {
            assert_eq!(ParseState::from_i32(state.as_i32()), Some(state));
        }
        assert_eq!(ParseState::from_i32(0), None);
        assert_eq!(ParseState::from_i32(9), None);
    }

    #[test]
    fn test_terminal_states() {
        assert!(!ParseState::Parsing.is_terminal());
        assert!(ParseState::Succeeded.is_terminal());
        assert!(ParseState::Failed.is_terminal());
    }

    #[test]
    fn test_wire_status_mapping() {
        assert_eq!(sample(ParseState::Parsing, false).wire_status(), 2);
        assert_eq!(sample(ParseState::Succeeded, false).wire_status(), 3);
        assert_eq!(sample(ParseState::Failed, false).wire_status(), 5);
        // Soft delete wins regardless of the parse lifecycle.
        assert_eq!(sample(ParseState::Parsing, true).wire_status(), 4);
        assert_eq!(sample(ParseState::Succeeded, true).wire_status(), 4);
    }
}
