//! Leading header-block detection.
//!
//! A sample's header is its leading run of `#` comment lines and blank
//! lines. Lines starting with `####` are separators; the header ends right
//! after the second separator even if more comment lines follow.

/// Separator count that closes a header block.
const CLOSING_SEPARATORS: usize = 2;

/// Position of the scanner relative to the header block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderState {
    /// Still inside the header, having seen `separators` `####` lines.
    InHeader { separators: usize },
    /// Past the header; every remaining line is body.
    InBody,
}

impl Default for HeaderState {
    fn default() -> Self {
        Self::InHeader { separators: 0 }
    }
}

impl HeaderState {
    /// Consume one line. Returns the next state and whether `line` is body.
    pub fn advance(self, line: &str) -> (Self, bool) {
        match self {
            Self::InBody => (Self::InBody, true),
            Self::InHeader { separators } => {
                if !is_header_line(line) {
                    return (Self::InBody, true);
                }

                let separators = separators + usize::from(line.starts_with("####"));
                if separators >= CLOSING_SEPARATORS {
                    (Self::InBody, false)
                } else {
                    (Self::InHeader { separators }, false)
                }
            }
        }
    }
}

fn is_header_line(line: &str) -> bool {
    line.is_empty() || line.starts_with('#')
}

/// Drop the leading header block. A sample that is all header yields `""`.
pub fn strip_header(sample: &str) -> String {
    let mut state = HeaderState::default();
    let mut body = Vec::new();

    for line in sample.split('\n') {
        let (next, is_body) = state.advance(line);
        state = next;
        if is_body {
            body.push(line);
        }
    }

    body.join("\n")
}
