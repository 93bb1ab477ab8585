//! UAT tracking document: parse, mutate, recompute progress, serialize.
//!
//! A UAT file is loaded, changed, and written back within a single command.
//! Progress counters are never stored: [`UatFile::progress`] derives them from
//! the tests every time, and the `## Progress` section of a parsed file is
//! ignored.
//!
//! Record values are kept as the raw text that appears after `key: ` in the
//! file. Fields that are always written quoted (`reported` on tests,
//! `description` on fixes, `name`/`expected`/`reason` on assumptions) are
//! quoted as soon as they enter the model, so a parsed file and its
//! re-serialization parse to the same document.

mod grammar;
mod render;

use crate::error::{MsError, Result};
use crate::frontmatter::yaml_to_json;
use crate::io;
use crate::paths;
use crate::phase::normalize_phase;
use regex::Regex;
use render::{ASSUMPTION_QUOTED, FIX_QUOTED, TEST_QUOTED};
use serde::{Deserialize, Serialize};
use serde_json::{Map as JsonMap, Value as JsonValue};
use serde_yaml::{Mapping, Value};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

pub const RESULT_PENDING: &str = "[pending]";
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M";

static FIELD_KEY_RE: OnceLock<Regex> = OnceLock::new();

fn field_key_re() -> &'static Regex {
    FIELD_KEY_RE.get_or_init(|| Regex::new(r"^\w+$").unwrap())
}

// ---------------------------------------------------------------------------
// Field checks
// ---------------------------------------------------------------------------

// Everything written into a section must read back as the same record: keys
// are `\w+` and values stay on one line.

fn invalid(key: &str, reason: &'static str) -> MsError {
    MsError::InvalidField {
        key: key.to_string(),
        reason,
    }
}

fn check_single_line(key: &str, value: &str) -> Result<()> {
    if value.contains(['\r', '\n']) {
        return Err(invalid(key, "value must be a single line"));
    }
    Ok(())
}

fn check_field(key: &str, value: &str) -> Result<()> {
    if !field_key_re().is_match(key) {
        return Err(invalid(key, "key may only contain letters, digits and '_'"));
    }
    check_single_line(key, value)
}

/// `num` and `name` end up in a `###` header line.
fn check_record_field(key: &str, value: &str) -> Result<()> {
    match key {
        "num" if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) => {
            Err(invalid(key, "must be a number"))
        }
        "name" if value.trim().is_empty() => Err(invalid(key, "cannot be empty")),
        _ => check_field(key, value),
    }
}

// ---------------------------------------------------------------------------
// FieldMap
// ---------------------------------------------------------------------------

/// Ordered `key: value` fields of one record. Setting an existing key
/// replaces its value in place.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldMap(Vec<(String, String)>);

impl FieldMap {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn set(&mut self, key: &str, value: impl Into<String>) {
        let value = value.into();
        match self.0.iter_mut().find(|(k, _)| k == key) {
            Some((_, v)) => *v = value,
            None => self.0.push((key.to_string(), value)),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> + '_ {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn quote(&mut self, keys: &[&str]) {
        for (k, v) in self.0.iter_mut() {
            if keys.contains(&k.as_str()) {
                *v = ensure_quoted(v);
            }
        }
    }
}

impl FromIterator<(String, String)> for FieldMap {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        let mut map = FieldMap::default();
        for (k, v) in iter {
            map.set(&k, v);
        }
        map
    }
}

/// Wrap in double quotes unless already wrapped.
pub fn ensure_quoted(value: &str) -> String {
    if value.starts_with('"') && value.ends_with('"') {
        value.to_string()
    } else {
        format!("\"{value}\"")
    }
}

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// A `### <num>. <name>` test or `### Batch <num>: <name>` batch plus its fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeadedRecord {
    pub num: String,
    pub name: String,
    pub fields: FieldMap,
}

pub type TestRecord = HeadedRecord;
pub type BatchRecord = HeadedRecord;

impl HeadedRecord {
    pub(crate) fn new(num: &str, name: &str) -> Self {
        Self {
            num: num.to_string(),
            name: name.to_string(),
            fields: FieldMap::default(),
        }
    }

    /// `num` and `name` rewrite the header; every other key is a field.
    pub(crate) fn set(&mut self, key: &str, value: &str) {
        match key {
            "num" => self.num = value.to_string(),
            "name" => self.name = value.trim().to_string(),
            _ => self.fields.set(key, value),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields.get(key)
    }

    /// Missing results read as `[pending]`.
    pub fn result(&self) -> &str {
        self.get("result").unwrap_or(RESULT_PENDING)
    }

    pub fn fix_status(&self) -> &str {
        self.get("fix_status").unwrap_or_default()
    }

    fn is_fixing(&self) -> bool {
        matches!(self.fix_status(), "investigating" | "applied")
    }
}

// ---------------------------------------------------------------------------
// Progress
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Progress {
    pub total: usize,
    pub tested: usize,
    pub passed: usize,
    pub issues: usize,
    pub fixing: usize,
    pub pending: usize,
    pub skipped: usize,
}

/// Bucket every test by result and fix status. Unknown results count as
/// tested but land in no bucket.
pub fn recalc_progress(tests: &[TestRecord]) -> Progress {
    let mut p = Progress {
        total: tests.len(),
        ..Default::default()
    };
    for t in tests {
        match (t.result(), t.fix_status()) {
            (RESULT_PENDING | "blocked", _) => p.pending += 1,
            ("pass", _) | ("issue", "verified") => p.passed += 1,
            ("issue", "investigating" | "applied") => p.fixing += 1,
            ("issue", _) => p.issues += 1,
            ("skipped", _) => p.skipped += 1,
            _ => {}
        }
    }
    p.tested = p.total - p.pending;
    p
}

impl Progress {
    /// `3/5 (2 pass, 0 issue, 1 fixing, 0 skip)`
    pub fn summary(&self) -> String {
        format!(
            "{}/{} ({} pass, {} issue, {} fixing, {} skip)",
            self.tested, self.total, self.passed, self.issues, self.fixing, self.skipped
        )
    }
}

// ---------------------------------------------------------------------------
// Init payload
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UatInit {
    #[serde(default)]
    pub source: Vec<String>,
    #[serde(default)]
    pub tests: Vec<InitTest>,
    #[serde(default)]
    pub batches: Vec<InitBatch>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InitTest {
    pub name: String,
    pub expected: String,
    #[serde(default)]
    pub mock_required: bool,
    #[serde(default)]
    pub mock_type: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InitBatch {
    pub name: String,
    #[serde(default)]
    pub mock_type: Option<String>,
    /// Test numbers; strings such as `"1"` are written as-is.
    pub tests: Vec<JsonValue>,
}

impl UatInit {
    pub fn from_json(text: &str) -> Result<Self> {
        let payload: Self =
            serde_json::from_str(text).map_err(|e| MsError::InvalidPayload(e.to_string()))?;
        payload.check()?;
        Ok(payload)
    }

    /// Names become `###` headers and every other value a single field line.
    fn check(&self) -> Result<()> {
        for t in &self.tests {
            check_record_field("name", &t.name)?;
            check_single_line("expected", &t.expected)?;
            check_single_line("mock_type", t.mock_type.as_deref().unwrap_or_default())?;
        }
        for b in &self.batches {
            check_record_field("name", &b.name)?;
            check_single_line("mock_type", b.mock_type.as_deref().unwrap_or_default())?;
            check_single_line("tests", &batch_tests(&b.tests))?;
        }
        Ok(())
    }
}

/// Parse a fix or assumption payload, which must be a JSON object.
pub fn parse_record_payload(text: &str) -> Result<JsonMap<String, JsonValue>> {
    match serde_json::from_str::<JsonValue>(text) {
        Ok(JsonValue::Object(map)) => Ok(map),
        Ok(_) => Err(MsError::InvalidPayload("expected a JSON object".to_string())),
        Err(e) => Err(MsError::InvalidPayload(e.to_string())),
    }
}

fn mock_type_or_null(mock_type: &Option<String>) -> String {
    match mock_type.as_deref() {
        Some(m) if !m.is_empty() => m.to_string(),
        _ => "null".to_string(),
    }
}

fn batch_tests(tests: &[JsonValue]) -> String {
    let items: Vec<String> = tests.iter().map(json_text).collect();
    bracketed(&items)
}

fn bracketed<T: ToString>(items: &[T]) -> String {
    let joined: Vec<String> = items.iter().map(ToString::to_string).collect();
    format!("[{}]", joined.join(", "))
}

/// Fields of a fix or assumption payload, checked as list-item lines.
fn payload_fields(record: &JsonMap<String, JsonValue>) -> Result<FieldMap> {
    record
        .iter()
        .map(|(k, v)| {
            let text = json_text(v);
            check_field(k, &text)?;
            Ok((k.clone(), text))
        })
        .collect()
}

/// Text of a JSON payload value as it is written into a record.
fn json_text(value: &JsonValue) -> String {
    match value {
        JsonValue::String(s) => s.clone(),
        JsonValue::Null => "null".to_string(),
        JsonValue::Array(items) => {
            let items: Vec<String> = items.iter().map(json_text).collect();
            bracketed(&items)
        }
        other => other.to_string(),
    }
}

fn timestamp() -> String {
    chrono::Local::now().format(TIMESTAMP_FORMAT).to_string()
}

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FixingTest {
    pub num: u32,
    pub name: String,
    pub fix_status: String,
    pub fix_commit: String,
    pub retry_count: u32,
}

/// Compact resume view of a UAT file.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UatStatus {
    pub status: JsonValue,
    pub current_batch: JsonValue,
    pub total_batches: usize,
    pub progress: Progress,
    pub mocked_files: JsonValue,
    pub fixing_tests: Vec<FixingTest>,
    pub pending_tests: Vec<u32>,
    pub blocked_tests: Vec<u32>,
    pub pre_work_stash: JsonValue,
    pub path: String,
}

// ---------------------------------------------------------------------------
// UatFile
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq)]
pub struct UatFile {
    frontmatter: Mapping,
    /// Text between the frontmatter and the first section.
    preamble: Vec<String>,
    current_batch: FieldMap,
    tests: Vec<TestRecord>,
    fixes: Vec<FieldMap>,
    batches: Vec<BatchRecord>,
    assumptions: Vec<FieldMap>,
    /// Unrecognised `##` sections, re-emitted after the known ones.
    extra_sections: Vec<(String, Vec<String>)>,
}

impl UatFile {
    pub fn parse(text: &str) -> Self {
        grammar::parse(text)
    }

    /// Fresh document for a phase directory called `phase_name`.
    pub fn from_init(payload: &UatInit, phase_name: &str) -> Self {
        let now = timestamp();
        let mut fm = Mapping::new();
        fm.insert("status".into(), "testing".into());
        fm.insert("phase".into(), phase_name.into());
        fm.insert(
            "source".into(),
            Value::Sequence(payload.source.iter().map(|s| s.as_str().into()).collect()),
        );
        fm.insert("started".into(), now.as_str().into());
        fm.insert("updated".into(), now.as_str().into());
        fm.insert("current_batch".into(), Value::Number(1_i64.into()));
        fm.insert("mocked_files".into(), Value::Sequence(Vec::new()));
        fm.insert("pre_work_stash".into(), Value::Null);

        let tests = payload
            .tests
            .iter()
            .zip(1..)
            .map(|(t, num): (&InitTest, u32)| {
                let mut record = TestRecord::new(&num.to_string(), &t.name);
                record.fields.set("expected", t.expected.as_str());
                record.fields.set("mock_required", t.mock_required.to_string());
                record.fields.set("mock_type", mock_type_or_null(&t.mock_type));
                record.fields.set("result", RESULT_PENDING);
                record
            })
            .collect();

        let batches = payload
            .batches
            .iter()
            .zip(1..)
            .map(|(b, num): (&InitBatch, u32)| {
                let mut record = BatchRecord::new(&num.to_string(), &b.name);
                record.fields.set("tests", batch_tests(&b.tests));
                record.fields.set("status", "pending");
                record.fields.set("mock_type", mock_type_or_null(&b.mock_type));
                record
            })
            .collect();

        let mut current_batch = FieldMap::default();
        if let Some(first) = payload.batches.first() {
            current_batch.set("batch", format!("1 of {}", payload.batches.len()));
            current_batch.set("name", ensure_quoted(&first.name));
            current_batch.set("mock_type", mock_type_or_null(&first.mock_type));
            current_batch.set("tests", batch_tests(&first.tests));
            current_batch.set("status", "pending");
        }

        Self {
            frontmatter: fm,
            current_batch,
            tests,
            batches,
            ..Default::default()
        }
    }

    // --- Accessors ---

    pub fn frontmatter(&self) -> &Mapping {
        &self.frontmatter
    }

    pub fn current_batch(&self) -> &FieldMap {
        &self.current_batch
    }

    pub fn tests(&self) -> &[TestRecord] {
        &self.tests
    }

    pub fn test(&self, num: u32) -> Option<&TestRecord> {
        let num = num.to_string();
        self.tests.iter().find(|t| t.num == num)
    }

    pub fn batches(&self) -> &[BatchRecord] {
        &self.batches
    }

    pub fn fixes(&self) -> &[FieldMap] {
        &self.fixes
    }

    pub fn assumptions(&self) -> &[FieldMap] {
        &self.assumptions
    }

    pub fn progress(&self) -> Progress {
        recalc_progress(&self.tests)
    }

    pub fn progress_summary(&self) -> String {
        self.progress().summary()
    }

    // --- Mutations ---

    /// Fails before changing anything if a field could not be written back
    /// as part of this test.
    pub fn update_test(&mut self, num: u32, fields: &[(String, String)]) -> Result<()> {
        for (k, v) in fields {
            check_record_field(k, v)?;
        }
        let key = num.to_string();
        let test = self
            .tests
            .iter_mut()
            .find(|t| t.num == key)
            .ok_or_else(|| MsError::TestNotFound(key.clone()))?;
        for (k, v) in fields {
            test.set(k, v);
        }
        test.fields.quote(TEST_QUOTED);
        Ok(())
    }

    pub fn update_batch(&mut self, num: u32, fields: &[(String, String)]) -> Result<()> {
        for (k, v) in fields {
            check_record_field(k, v)?;
        }
        let key = num.to_string();
        let batch = self
            .batches
            .iter_mut()
            .find(|b| b.num == key)
            .ok_or_else(|| MsError::BatchNotFound(key.clone()))?;
        for (k, v) in fields {
            batch.set(k, v);
        }
        Ok(())
    }

    /// Merge into the frontmatter. An empty value clears the field (to `[]`
    /// for `mocked_files`, `null` otherwise); `mocked_files` is comma-split;
    /// a numeric `current_batch` is stored as an integer and refreshes the
    /// `Current Batch` section from the matching batch. Multi-line values are
    /// rejected before anything changes.
    pub fn update_session(&mut self, fields: &[(String, String)]) -> Result<()> {
        for (k, v) in fields {
            if k.trim().is_empty() {
                return Err(invalid(k, "key cannot be empty"));
            }
            check_single_line(k, v)?;
        }
        for (k, v) in fields {
            let value = if v.is_empty() {
                if k == "mocked_files" {
                    Value::Sequence(Vec::new())
                } else {
                    Value::Null
                }
            } else if k == "mocked_files" {
                Value::Sequence(
                    v.split(',')
                        .map(str::trim)
                        .filter(|f| !f.is_empty())
                        .map(Value::from)
                        .collect(),
                )
            } else if k == "current_batch" {
                match v.trim().parse::<i64>() {
                    Ok(n) => {
                        self.sync_current_batch(n);
                        Value::Number(n.into())
                    }
                    Err(_) => Value::from(v.as_str()),
                }
            } else {
                Value::from(v.as_str())
            };
            self.frontmatter.insert(Value::from(k.as_str()), value);
        }
        Ok(())
    }

    fn sync_current_batch(&mut self, num: i64) {
        let key = num.to_string();
        let total = self.batches.len();
        let Some(batch) = self.batches.iter().find(|b| b.num == key) else {
            tracing::debug!(batch = num, "no such batch; Current Batch left unchanged");
            return;
        };
        let name = if batch.name.starts_with('"') {
            batch.name.clone()
        } else {
            ensure_quoted(&batch.name)
        };
        let mut current = FieldMap::default();
        current.set("batch", format!("{num} of {total}"));
        current.set("name", name);
        current.set("mock_type", batch.get("mock_type").unwrap_or("null"));
        current.set("tests", batch.get("tests").unwrap_or("[]"));
        current.set("status", batch.get("status").unwrap_or("pending"));
        self.current_batch = current;
    }

    /// Add a fix, replacing any existing fix for the same test. List values
    /// are written bracketed; `description` is always quoted.
    pub fn append_fix(&mut self, record: &JsonMap<String, JsonValue>) -> Result<()> {
        let mut fix = payload_fields(record)?;
        fix.quote(FIX_QUOTED);

        let test = fix.get("test").unwrap_or_default().to_string();
        match self.fixes.iter_mut().find(|f| f.get("test") == Some(test.as_str())) {
            Some(existing) => *existing = fix,
            None => self.fixes.push(fix),
        }
        Ok(())
    }

    /// Always appends; several assumptions may name the same test.
    pub fn append_assumption(&mut self, record: &JsonMap<String, JsonValue>) -> Result<()> {
        let mut assumption = payload_fields(record)?;
        assumption.quote(ASSUMPTION_QUOTED);
        self.assumptions.push(assumption);
        Ok(())
    }

    pub(crate) fn canonicalize(&mut self) {
        for t in &mut self.tests {
            t.fields.quote(TEST_QUOTED);
        }
        for f in &mut self.fixes {
            f.quote(FIX_QUOTED);
        }
        for a in &mut self.assumptions {
            a.quote(ASSUMPTION_QUOTED);
        }
    }

    // --- Serialization ---

    /// Set `updated` to the current time.
    pub fn touch(&mut self) {
        self.frontmatter
            .insert("updated".into(), Value::from(timestamp()));
    }

    /// Canonical text of the document as it stands.
    pub fn render(&self) -> Result<String> {
        render::render(self)
    }

    /// Refresh `updated`, then render.
    pub fn serialize(&mut self) -> Result<String> {
        self.touch();
        self.render()
    }

    pub fn save(&mut self, path: &Path) -> Result<()> {
        let text = self.serialize()?;
        io::atomic_write(path, text.as_bytes())
    }

    pub fn load(path: &Path) -> Result<Self> {
        Ok(Self::parse(&io::read_lossy(path)?))
    }

    pub fn status(&self, path: &Path) -> UatStatus {
        let fm = |key: &str| self.frontmatter.get(key).map(yaml_to_json);
        let num = |t: &TestRecord| t.num.parse::<u32>().unwrap_or_default();

        let fixing_tests = self
            .tests
            .iter()
            .filter(|t| t.is_fixing())
            .map(|t| FixingTest {
                num: num(t),
                name: t.name.clone(),
                fix_status: t.fix_status().to_string(),
                fix_commit: t.get("fix_commit").unwrap_or_default().to_string(),
                retry_count: t
                    .get("retry_count")
                    .and_then(|r| r.trim().parse().ok())
                    .unwrap_or(0),
            })
            .collect();
        let with_result = |result: &str| -> Vec<u32> {
            self.tests
                .iter()
                .filter(|t| t.result() == result)
                .map(num)
                .collect()
        };

        UatStatus {
            status: fm("status").unwrap_or_else(|| JsonValue::String(String::new())),
            current_batch: fm("current_batch").unwrap_or(JsonValue::Null),
            total_batches: self.batches.len(),
            progress: self.progress(),
            mocked_files: fm("mocked_files").unwrap_or_else(|| JsonValue::Array(Vec::new())),
            fixing_tests,
            pending_tests: with_result(RESULT_PENDING),
            blocked_tests: with_result("blocked"),
            pre_work_stash: fm("pre_work_stash").unwrap_or(JsonValue::Null),
            path: path.display().to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Files on disk
// ---------------------------------------------------------------------------

/// Path of an existing UAT file for `phase`.
pub fn find_uat_file(planning: &Path, phase: &str) -> Result<PathBuf> {
    let phase = normalize_phase(phase);
    let dir = paths::find_phase_dir(planning, &phase).ok_or(MsError::PhaseDirNotFound(phase))?;
    let path = paths::uat_path(&dir);
    if !path.is_file() {
        return Err(MsError::UatNotFound(path.display().to_string()));
    }
    Ok(path)
}

/// Write a new UAT file for `phase`, creating `phases/<phase>` when no phase
/// directory matches. An existing UAT file is overwritten.
pub fn init_uat(planning: &Path, phase: &str, payload: &UatInit) -> Result<(PathBuf, UatFile)> {
    let phase = normalize_phase(phase);
    let dir = match paths::find_phase_dir(planning, &phase) {
        Some(dir) => dir,
        None => {
            let dir = paths::phases_dir(planning).join(&phase);
            std::fs::create_dir_all(&dir)?;
            dir
        }
    };
    let mut uat = UatFile::from_init(payload, &paths::dir_name(&dir));
    let path = paths::uat_path(&dir);
    uat.save(&path)?;
    tracing::info!(path = %path.display(), tests = uat.tests.len(), "created UAT file");
    Ok((path, uat))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
