//! Line parser for uploaded customer files
//!
//! The file format is line oriented: a header line, then one customer per
//! line. Only the part of a line before its first tab is used, split on
//! runs of whitespace into positional tokens.
//!
//! Lines are split on raw bytes. The header is never decoded, and each data
//! line is decoded as UTF-8 on its own, so one badly encoded line only costs
//! that line.

use crate::ingestion::{error::Rejection, record::CandidateRecord};

/// Parse a single data line into a candidate record
///
/// Returns `None` when the first tab field has fewer than eight tokens.
/// Tokens are passed through verbatim.
pub fn parse_line(line: &str) -> Option<CandidateRecord> {
    let first_field = line.split_once('\t').map_or(line, |(field, _)| field);
    let tokens: Vec<&str> = first_field.split_whitespace().collect();

    CandidateRecord::from_tokens(&tokens)
}

/// Outcome of parsing one data line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedLine {
    /// The line produced a candidate record
    Record { line: usize, record: CandidateRecord },
    /// The line was structurally absent and is dropped
    Rejected(Rejection),
}

/// Lazy iterator over the data lines of a file
///
/// Created by [`parse`]. The header (first line) is never yielded.
pub struct ParsedLines<'a> {
    rest: &'a [u8],
    line: usize,
}

impl<'a> ParsedLines<'a> {
    /// Next raw line, without its `\n` or `\r\n` terminator
    fn next_raw(&mut self) -> Option<&'a [u8]> {
        if self.rest.is_empty() {
            return None;
        }

        let raw = match self.rest.iter().position(|&b| b == b'\n') {
            Some(end) => {
                let raw = &self.rest[..end];
                self.rest = &self.rest[end + 1..];
                raw.strip_suffix(b"\r").unwrap_or(raw)
            }
            None => std::mem::take(&mut self.rest),
        };

        self.line += 1;
        Some(raw)
    }
}

impl<'a> Iterator for ParsedLines<'a> {
    type Item = ParsedLine;

    fn next(&mut self) -> Option<Self::Item> {
        // Header
        if self.line == 0 {
            self.next_raw()?;
        }

        let raw = self.next_raw()?;
        let line = self.line;

        let Ok(text) = std::str::from_utf8(raw) else {
            return Some(ParsedLine::Rejected(Rejection::UndecodableLine { line }));
        };

        Some(match parse_line(text) {
            Some(record) => ParsedLine::Record { line, record },
            None => ParsedLine::Rejected(Rejection::MalformedLine { line }),
        })
    }
}

/// Parse the full content of an uploaded file
///
/// The first line is a header and is skipped without inspection, whatever
/// its encoding. Both `\n` and `\r\n` line endings are accepted. Output
/// order matches input order.
pub fn parse<C>(content: &C) -> ParsedLines<'_>
where
    C: AsRef<[u8]> + ?Sized,
{
    ParsedLines {
        rest: content.as_ref(),
        line: 0,
    }
}

/// Candidate records of a file, with unusable lines silently dropped
pub fn candidates<C>(content: &C) -> impl Iterator<Item = CandidateRecord> + '_
where
    C: AsRef<[u8]> + ?Sized,
{
    parse(content).filter_map(|parsed| match parsed {
        ParsedLine::Record { record, .. } => Some(record),
        ParsedLine::Rejected(_) => None,
    })
}
