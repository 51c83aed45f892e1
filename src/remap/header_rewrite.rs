//! # Header-Rewrite Compilation
//!
//! Parses the line-oriented legacy header-rewrite policy into structured,
//! direction-tagged set/drop operations. Lines are separated by the
//! `__RETURN__` terminator; a running direction (initially origin-bound)
//! flips on `cond` lines referencing the request/response hooks.

use serde::{Deserialize, Serialize};

use crate::errors::HeaderRewriteError;

/// Line terminator of the legacy policy encoding.
const LINE_TERMINATOR: &str = "__RETURN__";

/// Trailing last-rule flag, carried over from the source dialect and
/// irrelevant here.
const LAST_RULE_FLAG: &str = "[L]";

const RESPONSE_HOOK: &str = "%{SEND_RESPONSE_HDR_HOOK}";
const REQUEST_HOOK: &str = "%{SEND_REQUEST_HDR_HOOK}";

/// A header name/value pair to set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Header {
    pub name: String,
    pub value: String,
}

/// Header operations for one direction: pairs to set, names to drop.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeaderOps {
    #[serde(default)]
    pub set: Vec<Header>,
    #[serde(default)]
    pub drop: Vec<String>,
}

impl HeaderOps {
    pub fn is_empty(&self) -> bool {
        self.set.is_empty() && self.drop.is_empty()
    }
}

/// Compiled header-rewrite policy, split by direction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderRewrite {
    /// Operations applied to the response sent back to the client
    pub client: HeaderOps,
    /// Operations applied to the request forwarded to the origin
    pub origin: HeaderOps,
}

/// Which way the current operations point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Client,
    Origin,
}

/// Compile a header-rewrite policy.
///
/// An empty policy yields empty operations for both directions. Any line
/// with too few tokens for its directive, or with a directive the language
/// does not define, is a parse error; the assembler treats these as
/// structural and aborts the run.
pub fn compile_header_rewrite(policy: &str) -> Result<HeaderRewrite, HeaderRewriteError> {
    let normalized = policy.split_whitespace().collect::<Vec<_>>().join(" ");
    if normalized.is_empty() {
        return Ok(HeaderRewrite::default());
    }

    let mut compiled = HeaderRewrite::default();
    let mut direction = Direction::Origin;

    for raw_line in normalized.split(LINE_TERMINATOR) {
        let line = raw_line.trim();
        let line = line.strip_suffix(LAST_RULE_FLAG).unwrap_or(line).trim_end();
        let tokens: Vec<&str> = line.split_whitespace().collect();
        if tokens.is_empty() {
            continue;
        }

        // A cond directive guards whatever follows it on the same line, so
        // each line is consumed as a directive stream, not a single shape.
        let mut cursor = 0;
        while cursor < tokens.len() {
            let remaining = tokens.len() - cursor;
            match tokens[cursor] {
                "cond" => {
                    if remaining < 2 {
                        return Err(HeaderRewriteError::MalformedLine { line: line.to_string() });
                    }
                    if tokens[cursor + 1] == RESPONSE_HOOK {
                        direction = Direction::Client;
                    } else if tokens[cursor + 1] == REQUEST_HOOK {
                        direction = Direction::Origin;
                    }
                    // Conditions on other hooks leave the direction unchanged.
                    cursor += 2;
                }
                "set-header" | "add-header" => {
                    if remaining < 3 {
                        return Err(HeaderRewriteError::MalformedLine { line: line.to_string() });
                    }
                    let header = Header {
                        name: tokens[cursor + 1].to_string(),
                        value: tokens[cursor + 2..].join(" "),
                    };
                    ops_mut(&mut compiled, direction).set.push(header);
                    // The value runs to the end of the line.
                    cursor = tokens.len();
                }
                "rm-header" => {
                    if remaining < 2 {
                        return Err(HeaderRewriteError::MalformedLine { line: line.to_string() });
                    }
                    ops_mut(&mut compiled, direction).drop.push(tokens[cursor + 1].to_string());
                    cursor += 2;
                }
                directive => {
                    return Err(HeaderRewriteError::UnknownDirective {
                        directive: directive.to_string(),
                        line: line.to_string(),
                    });
                }
            }
        }
    }

    Ok(compiled)
}

fn ops_mut(compiled: &mut HeaderRewrite, direction: Direction) -> &mut HeaderOps {
    match direction {
        Direction::Client => &mut compiled.client,
        Direction::Origin => &mut compiled.origin,
    }
}
