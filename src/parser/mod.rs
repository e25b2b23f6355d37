//! Log stream parser — rebuilds commit records from interleaved `git log` output.
//!
//! The history tool emits, per commit, one header line followed by zero or one
//! `--shortstat` summary line (absent when the commit changed no lines, e.g.
//! most merges). A header starts with [`RECORD_START`] and carries
//! [`FIELD_SEP`]-separated fields, so ref names and emails need no escaping.
//! Statistics lines are free text and are attached to the most recently seen
//! header.
//!
//! Line classification is behind [`LineClassifier`] so the matching rules can be
//! exercised and swapped independently of the state machine in [`LogStreamParser`].

use std::io::BufRead;
use std::sync::LazyLock;

use regex::Regex;
use tracing::{trace, warn};

use crate::model::{Commit, CommitHeader};

// ─── Line classification ────────────────────────────────────────────

/// First byte of every header line (`%x1e`).
pub const RECORD_START: char = '\u{1e}';

/// Separator between header fields (`%x1f`). Git forbids control characters
/// in ref names, and the other fields never contain it.
pub const FIELD_SEP: char = '\u{1f}';

/// Counts pulled from a statistics line. Either side may be missing.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StatCounts {
    pub insertions: Option<u64>,
    pub deletions: Option<u64>,
}

impl StatCounts {
    pub fn is_empty(&self) -> bool {
        self.insertions.is_none() && self.deletions.is_none()
    }
}

/// What a single line of the history stream turned out to be.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LineClass {
    /// A decodable commit header.
    Header(CommitHeader),
    /// Marked as a header but not decodable. Ends the previous commit.
    BrokenHeader,
    /// A statistics line carrying at least one count.
    Stats(StatCounts),
    /// Blank lines, locale noise, anything else.
    Noise,
}

/// Strategy for classifying one line of history output.
pub trait LineClassifier {
    fn classify(&self, line: &str) -> LineClass;
}

static INSERTIONS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+) insertions?\(\+\)").expect("valid insertions pattern"));
static DELETIONS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+) deletions?\(-\)").expect("valid deletions pattern"));

/// Default classifier for `--pretty=format:<json> --shortstat` output.
///
/// Accepts git's singular and plural wording (`1 insertion(+)`,
/// `12 insertions(+)`, `1 deletion(-)`, `3 deletions(-)`).
pub struct ShortStatClassifier {
    insertions: Regex,
    deletions: Regex,
}

impl ShortStatClassifier {
    pub fn new() -> Self {
        Self {
            insertions: INSERTIONS_RE.clone(),
            deletions: DELETIONS_RE.clone(),
        }
    }

    /// Classifier with custom statistics patterns. Each pattern's first
    /// capture group must be the count.
    pub fn with_patterns(insertions: &str, deletions: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            insertions: Regex::new(insertions)?,
            deletions: Regex::new(deletions)?,
        })
    }

    /// Decode `<author>␟<date>␟<title>␟<hash>␟<refs>` after the record marker.
    fn decode_header(body: &str) -> Option<CommitHeader> {
        let mut fields = body.splitn(5, FIELD_SEP);
        let author = fields.next()?.trim();
        let date = fields.next()?.trim().parse().ok()?;
        let title = fields.next()?.trim();
        let hash = fields.next()?.trim();
        let refs = fields.next()?.trim();
        if hash.is_empty() {
            return None;
        }
        Some(CommitHeader {
            author: author.to_string(),
            date,
            title: title.to_string(),
            hash: hash.to_string(),
            refs: refs.to_string(),
        })
    }

    fn capture_count(re: &Regex, line: &str) -> Option<u64> {
        re.captures(line)
            .and_then(|caps| caps.get(1))
            .and_then(|m| m.as_str().parse().ok())
    }
}

impl Default for ShortStatClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl LineClassifier for ShortStatClassifier {
    fn classify(&self, line: &str) -> LineClass {
        if let Some(body) = line.strip_prefix(RECORD_START) {
            return match Self::decode_header(body) {
                Some(header) => LineClass::Header(header),
                None => LineClass::BrokenHeader,
            };
        }

        let trimmed = line.trim();
        if trimmed.is_empty() {
            return LineClass::Noise;
        }

        let counts = StatCounts {
            insertions: Self::capture_count(&self.insertions, trimmed),
            deletions: Self::capture_count(&self.deletions, trimmed),
        };
        if counts.is_empty() {
            LineClass::Noise
        } else {
            LineClass::Stats(counts)
        }
    }
}

// ─── State machine ──────────────────────────────────────────────────

/// Single-pass parser over a history stream for one repository.
///
/// Holds nothing but the output sequence built so far. Statistics only ever
/// touch the last appended commit, and only while no broken header has been
/// seen since; otherwise the statistics line is dropped.
pub struct LogStreamParser<'c, C: LineClassifier> {
    repo: String,
    classifier: &'c C,
    commits: Vec<Commit>,
    /// Whether the last commit may still receive statistics.
    open: bool,
    orphan_stats: usize,
    broken_headers: usize,
}

impl<'c, C: LineClassifier> LogStreamParser<'c, C> {
    pub fn new(repo: &str, classifier: &'c C) -> Self {
        Self {
            repo: repo.to_string(),
            classifier,
            commits: Vec::new(),
            open: false,
            orphan_stats: 0,
            broken_headers: 0,
        }
    }

    /// Consume one line of output.
    pub fn feed(&mut self, line: &str) {
        match self.classifier.classify(line) {
            LineClass::Header(header) => {
                self.commits.push(Commit::from_header(&self.repo, header));
                self.open = true;
            }
            LineClass::BrokenHeader => {
                self.open = false;
                self.broken_headers += 1;
                warn!(
                    repo = %self.repo,
                    line = %line.replace([RECORD_START, FIELD_SEP], "|"),
                    "undecodable commit header, skipped"
                );
            }
            LineClass::Stats(counts) => match self.commits.last_mut() {
                Some(last) if self.open => {
                    if let Some(n) = counts.insertions {
                        last.insertions = n;
                    }
                    if let Some(n) = counts.deletions {
                        last.deletions = n;
                    }
                }
                _ => {
                    self.orphan_stats += 1;
                    trace!(repo = %self.repo, line, "statistics line without a header, ignored");
                }
            },
            LineClass::Noise => {}
        }
    }

    /// Commits parsed so far, in stream order.
    pub fn commits(&self) -> &[Commit] {
        &self.commits
    }

    /// Number of statistics lines that had no header to attach to.
    pub fn orphan_stats(&self) -> usize {
        self.orphan_stats
    }

    /// Number of header lines that could not be decoded.
    pub fn broken_headers(&self) -> usize {
        self.broken_headers
    }

    pub fn finish(self) -> Vec<Commit> {
        self.commits
    }
}

/// Parse a whole history stream (line by line, streaming).
///
/// Lines are decoded lossily: old histories can carry non-UTF-8 author data and
/// one bad byte must not fail the whole repository. Returns an I/O error only if
/// reading the stream fails; the caller decides what a non-zero exit of the
/// producing process means.
pub fn parse_log_stream<C: LineClassifier>(
    mut reader: impl BufRead,
    repo: &str,
    classifier: &C,
) -> std::io::Result<Vec<Commit>> {
    let mut parser = LogStreamParser::new(repo, classifier);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf)? == 0 {
            break;
        }
        let line = String::from_utf8_lossy(&buf);
        parser.feed(line.trim_end_matches(['\n', '\r']));
    }
    Ok(parser.finish())
}

#[cfg(test)]
#[path = "parser_tests.rs"]
mod tests;
