//! # Header Validation
//!
//! A header schema is a fixed-length array contract over the first lines of
//! the target file:
//!
//! ```json
//! {
//!   "type": "array",
//!   "minItems": 2,
//!   "maxItems": 2,
//!   "prefixItems": [
//!     { "type": "string", "pattern": "^# Wind time series" },
//!     { "type": "string", "pattern": "^time,speed" }
//!   ]
//! }
//! ```
//!
//! Only the first `minItems` lines are read. `\n`, `\r\n` and a lone `\r`
//! all end a line, and every line read is reported with a `\n` terminator.
//! Each line must match its pattern at the start of the line (prefix match),
//! in the same regex dialect the schema engine uses for `pattern`, so
//! look-around and backreferences are available. All failing lines are
//! collected before the validation fails.

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

use filegate_core::{
    ConfigurationError, FilegateError, HeaderMismatch, SchemaViolation, ShortHeaderPolicy,
};
use fancy_regex::Regex;
use serde_json::Value;

/// Text encodings accepted for target files.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextEncoding {
    Utf8,
    /// UTF-8 with an optional leading byte-order mark, which is dropped.
    Utf8Sig,
    Latin1,
    Ascii,
}

impl TextEncoding {
    /// Parse an encoding label such as `"utf-8"` or `"ISO-8859-1"`.
    pub fn from_label(label: &str) -> Result<Self, ConfigurationError> {
        let normalized = label.trim().to_ascii_lowercase().replace('_', "-");
        match normalized.as_str() {
            "utf-8" | "utf8" => Ok(TextEncoding::Utf8),
            "utf-8-sig" | "utf8-sig" => Ok(TextEncoding::Utf8Sig),
            "latin-1" | "latin1" | "iso-8859-1" | "iso8859-1" => Ok(TextEncoding::Latin1),
            "ascii" | "us-ascii" => Ok(TextEncoding::Ascii),
            _ => Err(ConfigurationError::UnsupportedEncoding(label.to_string())),
        }
    }

    fn decode(self, bytes: &[u8], first_line: bool) -> Option<String> {
        match self {
            TextEncoding::Utf8 => std::str::from_utf8(bytes).ok().map(str::to_string),
            TextEncoding::Utf8Sig => {
                let bytes = match bytes.strip_prefix(b"\xEF\xBB\xBF") {
                    Some(rest) if first_line => rest,
                    _ => bytes,
                };
                std::str::from_utf8(bytes).ok().map(str::to_string)
            }
            TextEncoding::Latin1 => Some(bytes.iter().map(|&b| char::from(b)).collect()),
            TextEncoding::Ascii => bytes
                .is_ascii()
                .then(|| bytes.iter().map(|&b| char::from(b)).collect()),
        }
    }
}

#[derive(Debug, Clone)]
struct LinePattern {
    source: String,
    regex: Regex,
}

/// A validated header schema: one compiled, start-anchored pattern per line.
#[derive(Debug, Clone)]
pub struct HeaderSchema {
    lines: Vec<LinePattern>,
}

impl HeaderSchema {
    /// Check the schema's shape and compile its patterns.
    ///
    /// # Errors
    ///
    /// [`ConfigurationError::HeaderShape`] unless `minItems == maxItems` and
    /// `prefixItems` holds exactly that many entries with a string `pattern`;
    /// [`ConfigurationError::InvalidPattern`] if a pattern does not compile.
    pub fn from_schema(schema: &Value) -> Result<Self, ConfigurationError> {
        let shape = |reason: String| ConfigurationError::HeaderShape { reason };

        let min = schema.get("minItems").and_then(Value::as_u64);
        let max = schema.get("maxItems").and_then(Value::as_u64);
        let count = match (min, max) {
            (Some(min), Some(max)) if min == max => min,
            (Some(min), Some(max)) => {
                return Err(shape(format!("minItems ({min}) != maxItems ({max})")))
            }
            _ => return Err(shape("minItems and maxItems must both be set".to_string())),
        };
        let count = usize::try_from(count).map_err(|_| shape(format!("minItems {count} is too large")))?;

        let items = schema
            .get("prefixItems")
            .and_then(Value::as_array)
            .ok_or_else(|| shape("prefixItems is missing".to_string()))?;
        if items.len() != count {
            return Err(shape(format!(
                "prefixItems has {} entries, expected {count}",
                items.len()
            )));
        }

        let lines = items
            .iter()
            .enumerate()
            .map(|(index, item)| {
                let pattern = item
                    .get("pattern")
                    .and_then(Value::as_str)
                    .ok_or_else(|| shape(format!("prefixItems[{index}] has no string pattern")))?;
                let regex = Regex::new(&format!("^(?:{pattern})")).map_err(|e| {
                    ConfigurationError::InvalidPattern {
                        index,
                        pattern: pattern.to_string(),
                        reason: e.to_string(),
                    }
                })?;
                Ok(LinePattern {
                    source: pattern.to_string(),
                    regex,
                })
            })
            .collect::<Result<Vec<_>, ConfigurationError>>()?;

        Ok(Self { lines })
    }

    /// Number of header lines declared.
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// The declared patterns, in line order.
    pub fn patterns(&self) -> impl Iterator<Item = &str> {
        self.lines.iter().map(|l| l.source.as_str())
    }

    /// Match `lines` positionally against the patterns.
    ///
    /// Lines beyond the declared length are ignored; positions without a
    /// line are not reported.
    ///
    /// # Errors
    ///
    /// [`ConfigurationError::InvalidPattern`] if a pattern exceeds the
    /// backtracking limit while being evaluated.
    pub fn mismatches(&self, lines: &[String]) -> Result<Vec<HeaderMismatch>, ConfigurationError> {
        let mut mismatches = Vec::new();
        for (index, (line, pattern)) in lines.iter().zip(&self.lines).enumerate() {
            let matched = pattern
                .regex
                .is_match(strip_terminator(line))
                .map_err(|e| ConfigurationError::InvalidPattern {
                    index,
                    pattern: pattern.source.clone(),
                    reason: format!("evaluation failed: {e}"),
                })?;
            if !matched {
                mismatches.push(HeaderMismatch {
                    line_number: index + 1,
                    line: line.clone(),
                    pattern: pattern.source.clone(),
                });
            }
        }
        Ok(mismatches)
    }

    /// Read the header of `path` and check it.
    pub fn validate(
        &self,
        path: &Path,
        encoding: TextEncoding,
        encoding_label: &str,
        policy: ShortHeaderPolicy,
    ) -> Result<(), FilegateError> {
        let lines = read_lines(path, self.len(), encoding, encoding_label)?;
        tracing::trace!(path = %path.display(), read = lines.len(), declared = self.len(), "read header");

        if lines.len() < self.len() && policy == ShortHeaderPolicy::Reject {
            return Err(ConfigurationError::HeaderTooShort {
                expected: self.len(),
                found: lines.len(),
            }
            .into());
        }

        let mismatches = self.mismatches(&lines)?;
        if mismatches.is_empty() {
            Ok(())
        } else {
            Err(SchemaViolation::Header { mismatches }.into())
        }
    }
}

/// The line without its trailing `\n`.
fn strip_terminator(line: &str) -> &str {
    line.strip_suffix('\n').unwrap_or(line)
}

/// Read one raw line into `buf`, terminator excluded. A line ends at `\n`,
/// `\r\n` or a lone `\r`.
///
/// Returns `None` at end of input, otherwise whether the line was terminated.
fn read_raw_line<R: BufRead>(reader: &mut R, buf: &mut Vec<u8>) -> io::Result<Option<bool>> {
    let mut after_cr = false;
    loop {
        let (consumed, outcome) = {
            let available = reader.fill_buf()?;
            if available.is_empty() {
                let outcome = if after_cr {
                    Some(true)
                } else if buf.is_empty() {
                    None
                } else {
                    Some(false)
                };
                return Ok(outcome);
            }
            if after_cr {
                // Swallow the `\n` of a `\r\n` pair split across reads.
                let consumed = usize::from(available[0] == b'\n');
                (consumed, Some(Some(true)))
            } else {
                match available.iter().position(|&b| b == b'\n' || b == b'\r') {
                    Some(i) if available[i] == b'\n' => {
                        buf.extend_from_slice(&available[..i]);
                        (i + 1, Some(Some(true)))
                    }
                    Some(i) => {
                        buf.extend_from_slice(&available[..i]);
                        after_cr = true;
                        match available.get(i + 1) {
                            Some(b'\n') => (i + 2, Some(Some(true))),
                            Some(_) => (i + 1, Some(Some(true))),
                            None => (i + 1, None),
                        }
                    }
                    None => {
                        buf.extend_from_slice(available);
                        (available.len(), None)
                    }
                }
            }
        };
        reader.consume(consumed);
        if let Some(outcome) = outcome {
            return Ok(outcome);
        }
    }
}

/// Read at most `count` lines from the start of `path`. Terminated lines
/// end in `\n` whatever their terminator in the file.
pub fn read_lines(
    path: &Path,
    count: usize,
    encoding: TextEncoding,
    encoding_label: &str,
) -> Result<Vec<String>, FilegateError> {
    let io_error = |source: io::Error| FilegateError::Io {
        path: path.to_path_buf(),
        source,
    };

    let mut reader = BufReader::new(File::open(path).map_err(io_error)?);
    let mut lines = Vec::with_capacity(count);
    let mut buf = Vec::new();

    while lines.len() < count {
        buf.clear();
        let Some(terminated) = read_raw_line(&mut reader, &mut buf).map_err(io_error)? else {
            break;
        };
        let mut line = encoding
            .decode(&buf, lines.is_empty())
            .ok_or_else(|| FilegateError::Decode {
                path: path.to_path_buf(),
                line: lines.len() + 1,
                encoding: encoding_label.to_string(),
            })?;
        if terminated {
            line.push('\n');
        }
        lines.push(line);
    }

    Ok(lines)
}

/// Validate the header lines of `path` against `schema`.
pub fn validate_header(
    path: &Path,
    encoding: &str,
    schema: &Value,
    policy: ShortHeaderPolicy,
) -> Result<(), FilegateError> {
    let header = HeaderSchema::from_schema(schema)?;
    let text_encoding = TextEncoding::from_label(encoding)?;
    header.validate(path, text_encoding, encoding, policy)
}
