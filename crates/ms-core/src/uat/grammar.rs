//! Line-oriented UAT grammar.
//!
//! Every body line is classified once by [`classify`]; the [`Parser`] then
//! decides what a line means from the section it is in. Lines that mean
//! nothing in their section are dropped, except inside unrecognised sections
//! and the preamble, which are kept verbatim.

use super::{BatchRecord, FieldMap, TestRecord, UatFile};
use crate::frontmatter::split_frontmatter;
use regex::Regex;
use serde_yaml::{Mapping, Value};
use std::sync::OnceLock;

static SECTION_RE: OnceLock<Regex> = OnceLock::new();
static TEST_RE: OnceLock<Regex> = OnceLock::new();
static BATCH_RE: OnceLock<Regex> = OnceLock::new();
static ITEM_START_RE: OnceLock<Regex> = OnceLock::new();
static FIELD_RE: OnceLock<Regex> = OnceLock::new();

fn section_re() -> &'static Regex {
    SECTION_RE.get_or_init(|| Regex::new(r"^##\s+(.+)$").unwrap())
}

fn test_re() -> &'static Regex {
    TEST_RE.get_or_init(|| Regex::new(r"^###\s+(\d+)\.\s+(.+)$").unwrap())
}

fn batch_re() -> &'static Regex {
    BATCH_RE.get_or_init(|| Regex::new(r"^###\s+Batch\s+(\d+):\s+(.+)$").unwrap())
}

fn item_start_re() -> &'static Regex {
    ITEM_START_RE.get_or_init(|| Regex::new(r"^-\s+(\w+)\s*:\s*(.*)$").unwrap())
}

fn field_re() -> &'static Regex {
    FIELD_RE.get_or_init(|| Regex::new(r"^(\w+)\s*:\s*(.*)$").unwrap())
}

// ---------------------------------------------------------------------------
// Line classification
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Line<'a> {
    /// `## Name`
    Section(&'a str),
    /// `### N. Name`
    TestHeader { num: &'a str, name: &'a str },
    /// `### Batch N: Name`
    BatchHeader { num: &'a str, name: &'a str },
    /// `- key: value`
    ItemStart { key: &'a str, value: &'a str },
    /// `key: value`, possibly indented.
    Field {
        key: &'a str,
        value: &'a str,
        indented: bool,
    },
    Text,
}

pub(crate) fn classify(line: &str) -> Line<'_> {
    if let Some(c) = section_re().captures(line) {
        return Line::Section(c.get(1).map_or("", |m| m.as_str().trim()));
    }
    if let Some(c) = batch_re().captures(line) {
        return Line::BatchHeader {
            num: c.get(1).map_or("", |m| m.as_str()),
            name: c.get(2).map_or("", |m| m.as_str().trim()),
        };
    }
    if let Some(c) = test_re().captures(line) {
        return Line::TestHeader {
            num: c.get(1).map_or("", |m| m.as_str()),
            name: c.get(2).map_or("", |m| m.as_str().trim()),
        };
    }
    if let Some(c) = item_start_re().captures(line) {
        return Line::ItemStart {
            key: c.get(1).map_or("", |m| m.as_str()),
            value: c.get(2).map_or("", |m| m.as_str().trim()),
        };
    }
    let trimmed = line.trim();
    if let Some(c) = field_re().captures(trimmed) {
        return Line::Field {
            key: c.get(1).map_or("", |m| m.as_str()),
            value: c.get(2).map_or("", |m| m.as_str().trim()),
            indented: line.starts_with(char::is_whitespace),
        };
    }
    Line::Text
}

// ---------------------------------------------------------------------------
// Sections
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Section {
    Progress,
    CurrentBatch,
    Tests,
    FixesApplied,
    Batches,
    Assumptions,
}

impl Section {
    pub(crate) fn from_name(name: &str) -> Option<Self> {
        match name {
            "Progress" => Some(Section::Progress),
            "Current Batch" => Some(Section::CurrentBatch),
            "Tests" => Some(Section::Tests),
            "Fixes Applied" => Some(Section::FixesApplied),
            "Batches" => Some(Section::Batches),
            "Assumptions" => Some(Section::Assumptions),
            _ => None,
        }
    }

    pub(crate) fn title(self) -> &'static str {
        match self {
            Section::Progress => "Progress",
            Section::CurrentBatch => "Current Batch",
            Section::Tests => "Tests",
            Section::FixesApplied => "Fixes Applied",
            Section::Batches => "Batches",
            Section::Assumptions => "Assumptions",
        }
    }
}

// ---------------------------------------------------------------------------
// Parser
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
enum State {
    Preamble,
    Known(Section),
    Unknown,
}

/// Record under construction; flushed into the document when the next record
/// or section begins.
#[derive(Debug)]
enum Open {
    Nothing,
    Test(TestRecord),
    Batch(BatchRecord),
    Item(FieldMap),
    Unknown { name: String, lines: Vec<String> },
}

struct Parser {
    doc: UatFile,
    state: State,
    open: Open,
}

impl Parser {
    fn new(frontmatter: Mapping) -> Self {
        Self {
            doc: UatFile {
                frontmatter,
                ..Default::default()
            },
            state: State::Preamble,
            open: Open::Nothing,
        }
    }

    fn flush(&mut self) {
        match std::mem::replace(&mut self.open, Open::Nothing) {
            Open::Nothing => {}
            Open::Test(t) => self.doc.tests.push(t),
            Open::Batch(b) => self.doc.batches.push(b),
            Open::Item(item) => match self.state {
                State::Known(Section::Assumptions) => self.doc.assumptions.push(item),
                _ => self.doc.fixes.push(item),
            },
            Open::Unknown { name, lines } => {
                let lines = trim_blank(lines);
                match self.doc.extra_sections.iter_mut().find(|(n, _)| *n == name) {
                    Some((_, existing)) => *existing = lines,
                    None => self.doc.extra_sections.push((name, lines)),
                }
            }
        }
    }

    /// A repeated section replaces the earlier one.
    fn enter(&mut self, name: &str) {
        self.flush();
        match Section::from_name(name) {
            Some(section) => {
                match section {
                    Section::Progress => {}
                    Section::CurrentBatch => self.doc.current_batch = FieldMap::default(),
                    Section::Tests => self.doc.tests.clear(),
                    Section::FixesApplied => self.doc.fixes.clear(),
                    Section::Batches => self.doc.batches.clear(),
                    Section::Assumptions => self.doc.assumptions.clear(),
                }
                self.state = State::Known(section);
            }
            None => {
                self.state = State::Unknown;
                self.open = Open::Unknown {
                    name: name.to_string(),
                    lines: Vec::new(),
                };
            }
        }
    }

    fn line(&mut self, raw: &str) {
        let line = classify(raw);
        if let Line::Section(name) = line {
            self.enter(name);
            return;
        }

        match (self.state, line) {
            (State::Preamble, _) => self.doc.preamble.push(raw.to_string()),
            (State::Unknown, _) => {
                if let Open::Unknown { lines, .. } = &mut self.open {
                    lines.push(raw.to_string());
                }
            }
            // Derived on every read; whatever the file says is discarded.
            (State::Known(Section::Progress), _) => {}
            (State::Known(Section::CurrentBatch), Line::Field { key, value, .. }) => {
                self.doc.current_batch.set(key, value);
            }
            (State::Known(Section::Tests), Line::TestHeader { num, name }) => {
                self.flush();
                self.open = Open::Test(TestRecord::new(num, name));
            }
            (State::Known(Section::Batches), Line::BatchHeader { num, name }) => {
                self.flush();
                self.open = Open::Batch(BatchRecord::new(num, name));
            }
            (State::Known(Section::Tests | Section::Batches), Line::Field { key, value, .. }) => {
                match &mut self.open {
                    Open::Test(t) => t.set(key, value),
                    Open::Batch(b) => b.set(key, value),
                    _ => {}
                }
            }
            (
                State::Known(Section::FixesApplied | Section::Assumptions),
                Line::ItemStart { key, value },
            ) => {
                self.flush();
                let mut item = FieldMap::default();
                item.set(key, value);
                self.open = Open::Item(item);
            }
            (
                State::Known(Section::FixesApplied | Section::Assumptions),
                Line::Field {
                    key,
                    value,
                    indented: true,
                },
            ) => {
                if let Open::Item(item) = &mut self.open {
                    item.set(key, value);
                }
            }
            _ => {}
        }
    }

    fn finish(mut self) -> UatFile {
        self.flush();
        self.doc.preamble = trim_blank(std::mem::take(&mut self.doc.preamble));
        self.doc.canonicalize();
        self.doc
    }
}

/// Drop leading and trailing blank lines.
fn trim_blank(mut lines: Vec<String>) -> Vec<String> {
    while lines.last().is_some_and(|l| l.trim().is_empty()) {
        lines.pop();
    }
    let start = lines
        .iter()
        .position(|l| !l.trim().is_empty())
        .unwrap_or(lines.len());
    lines.drain(..start);
    lines
}

/// Parse UAT text. Never fails: unparseable frontmatter reads as empty and
/// unrecognised lines are skipped.
pub(crate) fn parse(text: &str) -> UatFile {
    let (frontmatter, body) = match split_frontmatter(text) {
        Some((yaml, body)) => {
            let map = match serde_yaml::from_str::<Value>(yaml) {
                Ok(Value::Mapping(map)) => map,
                Ok(_) => Mapping::new(),
                Err(e) => {
                    tracing::warn!(error = %e, "UAT frontmatter is not valid YAML");
                    Mapping::new()
                }
            };
            (map, body)
        }
        None => (Mapping::new(), text),
    };

    let mut parser = Parser::new(frontmatter);
    for raw in body.lines() {
        parser.line(raw);
    }
    parser.finish()
}
