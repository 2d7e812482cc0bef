//! Tolerant manifest parsing.
//!
//! Reads the `module` header and `require` directives out of a `go.mod`
//! file and ignores everything else, including directives this tool has no
//! use for (`go`, `toolchain`, `replace`, `exclude`, `retract`) and any
//! future ones. Both the single-line and the parenthesized block form of
//! `require` are understood.

use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ParseError {
    #[error("line {0}: malformed require directive")]
    MalformedRequire(usize),
    #[error("line {0}: malformed module directive")]
    MalformedModule(usize),
    #[error("unclosed block started on line {0}")]
    UnclosedBlock(usize),
}

/// A single requirement: path plus version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Require {
    pub path: String,
    pub version: String,
}

/// The parts of a manifest this tool cares about.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ModFile {
    pub module: Option<String>,
    pub require: Vec<Require>,
}

/// Parse a manifest, ignoring unknown directives.
pub fn parse_lax(input: &str) -> Result<ModFile, ParseError> {
    let mut out = ModFile::default();
    // Some(verb, start_line) while inside a parenthesized block.
    let mut block: Option<(String, usize)> = None;

    for (idx, raw) in input.lines().enumerate() {
        let lineno = idx + 1;
        let line = strip_comment(raw).trim();
        if line.is_empty() {
            continue;
        }

        if let Some((verb, _)) = &block {
            if line == ")" {
                block = None;
                continue;
            }
            if verb == "require" {
                let tokens: Vec<&str> = line.split_whitespace().collect();
                if tokens.len() != 2 {
                    return Err(ParseError::MalformedRequire(lineno));
                }
                out.require.push(Require {
                    path: unquote(tokens[0]).to_string(),
                    version: tokens[1].to_string(),
                });
            }
            continue;
        }

        let tokens: Vec<&str> = line.split_whitespace().collect();
        let verb = tokens[0];

        if tokens.last() == Some(&"(") {
            block = Some((verb.to_string(), lineno));
            continue;
        }

        match verb {
            "module" => {
                if tokens.len() != 2 {
                    return Err(ParseError::MalformedModule(lineno));
                }
                if out.module.is_none() {
                    out.module = Some(unquote(tokens[1]).to_string());
                }
            }
            "require" => {
                if tokens.len() != 3 {
                    return Err(ParseError::MalformedRequire(lineno));
                }
                out.require.push(Require {
                    path: unquote(tokens[1]).to_string(),
                    version: tokens[2].to_string(),
                });
            }
            _ => {}
        }
    }

    if let Some((_, start)) = block {
        return Err(ParseError::UnclosedBlock(start));
    }

    Ok(out)
}

fn strip_comment(line: &str) -> &str {
    // Quoted module paths never contain `//`, so a plain scan is enough.
    match line.find("//") {
        Some(idx) => &line[..idx],
        None => line,
    }
}

fn unquote(token: &str) -> &str {
    token
        .strip_prefix('"')
        .and_then(|t| t.strip_suffix('"'))
        .unwrap_or(token)
}
