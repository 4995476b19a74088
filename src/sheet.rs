//! Spreadsheet-backed task store.
//!
//! The whole table lives in one JSON file: a title, a header row and string
//! cells. Columns are addressed by header name, so extra columns and any column
//! order are tolerated. A missing or empty header is replaced with the default
//! one on first access.
//!
//! ```text
//! <data>/tasks.sheet.json        # {"title", "header": [...], "rows": [[...], ...]}
//! <data>/tasks.sheet.json.lock   # exclusive lock held for each access
//! ```

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::clock::Clock;
use crate::error::{Error, Result};
use crate::lock::{self, FileLock};
use crate::store::{build_task, TaskStore};
use crate::task::{Difficulty, Domain, DueDate, NewTask, Status, Task, TaskPatch};

pub const COL_ID: &str = "TaskId";
pub const COL_NAME: &str = "TaskName";
pub const COL_DESCRIPTION: &str = "Description";
pub const COL_DOMAIN: &str = "Domain";
pub const COL_MODE: &str = "Mode";
pub const COL_STATUS: &str = "Status";
pub const COL_CREATED: &str = "CreatedDate";
pub const COL_DUE: &str = "DueDate";

pub const DEFAULT_HEADER: [&str; 8] = [
    COL_ID,
    COL_NAME,
    COL_DESCRIPTION,
    COL_DOMAIN,
    COL_MODE,
    COL_STATUS,
    COL_CREATED,
    COL_DUE,
];

const DEFAULT_TITLE: &str = "Tasks";

fn default_title() -> String {
    DEFAULT_TITLE.to_string()
}

/// In-memory image of the sheet file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Sheet {
    #[serde(default = "default_title")]
    pub title: String,
    #[serde(default)]
    pub header: Vec<String>,
    #[serde(default)]
    pub rows: Vec<Vec<String>>,
}

impl Default for Sheet {
    fn default() -> Self {
        Self {
            title: default_title(),
            header: Vec::new(),
            rows: Vec::new(),
        }
    }
}

/// Header name -> column index, validated to contain every required column.
struct Columns(HashMap<String, usize>);

impl Columns {
    fn index(&self, name: &str) -> usize {
        // Presence checked in Sheet::columns.
        self.0[name]
    }
}

impl Sheet {
    /// Reads the sheet file; a missing file is an empty sheet.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_json::from_str(&content)?)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let data = serde_json::to_vec_pretty(self)?;
        lock::write_atomic(path, &data)
    }

    /// Writes the default header when none is present. Returns true if it did.
    pub fn ensure_header(&mut self) -> bool {
        if self.header.iter().any(|cell| !cell.trim().is_empty()) {
            return false;
        }
        self.header = DEFAULT_HEADER.iter().map(|col| col.to_string()).collect();
        true
    }

    fn columns(&self) -> Result<Columns> {
        let map: HashMap<String, usize> = self
            .header
            .iter()
            .enumerate()
            .map(|(idx, name)| (name.trim().to_string(), idx))
            .collect();
        let missing: Vec<&str> = DEFAULT_HEADER
            .iter()
            .copied()
            .filter(|col| !map.contains_key(*col))
            .collect();
        if !missing.is_empty() {
            return Err(Error::StoreUnavailable(format!(
                "sheet '{}' header is missing columns: {}",
                self.title,
                missing.join(", ")
            )));
        }
        Ok(Columns(map))
    }

    fn position(&self, columns: &Columns, id: &str) -> Option<usize> {
        let id_col = columns.index(COL_ID);
        self.rows
            .iter()
            .position(|row| row.get(id_col).map(String::as_str) == Some(id))
    }

    pub fn tasks(&self) -> Result<Vec<Task>> {
        let columns = self.columns()?;
        Ok(self
            .rows
            .iter()
            .map(|row| row_to_task(&columns, row))
            .collect())
    }

    pub fn append(&mut self, task: &Task) -> Result<()> {
        let columns = self.columns()?;
        let mut row = vec![String::new(); self.header.len()];
        write_row(&columns, &mut row, task);
        self.rows.push(row);
        Ok(())
    }

    pub fn update(&mut self, id: &str, patch: &TaskPatch) -> Result<Task> {
        let columns = self.columns()?;
        let idx = self
            .position(&columns, id)
            .ok_or_else(|| Error::NotFound(id.to_string()))?;
        let row = &mut self.rows[idx];
        let mut task = row_to_task(&columns, row);
        patch.apply(&mut task);
        if row.len() < self.header.len() {
            row.resize(self.header.len(), String::new());
        }
        write_row(&columns, row, &task);
        Ok(task)
    }

    pub fn remove(&mut self, id: &str) -> Result<()> {
        let columns = self.columns()?;
        let idx = self
            .position(&columns, id)
            .ok_or_else(|| Error::NotFound(id.to_string()))?;
        self.rows.remove(idx);
        Ok(())
    }
}

fn cell<'a>(columns: &Columns, row: &'a [String], name: &str) -> &'a str {
    row.get(columns.index(name)).map(String::as_str).unwrap_or("")
}

fn row_to_task(columns: &Columns, row: &[String]) -> Task {
    let id = cell(columns, row, COL_ID);
    let raw_status = cell(columns, row, COL_STATUS);
    let status = if raw_status.trim().is_empty() {
        Status::default()
    } else {
        raw_status.parse::<Status>().unwrap_or_else(|_| {
            tracing::warn!(task_id = id, status = raw_status, "unknown status in sheet, reading as Not Started");
            Status::default()
        })
    };

    Task {
        id: id.to_string(),
        name: cell(columns, row, COL_NAME).to_string(),
        description: cell(columns, row, COL_DESCRIPTION).to_string(),
        domain: cell(columns, row, COL_DOMAIN).parse::<Domain>().ok(),
        difficulty: cell(columns, row, COL_MODE).parse::<Difficulty>().ok(),
        status,
        created_at: cell(columns, row, COL_CREATED).to_string(),
        due_date: DueDate::new(cell(columns, row, COL_DUE)),
    }
}

fn write_row(columns: &Columns, row: &mut [String], task: &Task) {
    let mut set = |name: &str, value: &str| {
        row[columns.index(name)] = value.to_string();
    };
    set(COL_ID, &task.id);
    set(COL_NAME, &task.name);
    set(COL_DESCRIPTION, &task.description);
    set(COL_DOMAIN, task.domain.map(Domain::as_str).unwrap_or(""));
    set(COL_MODE, task.difficulty.map(Difficulty::as_str).unwrap_or(""));
    set(COL_STATUS, task.status.as_str());
    set(COL_CREATED, &task.created_at);
    set(COL_DUE, task.due_date.as_str());
}

/// Summary returned by [`SheetStore::describe`].
#[derive(Debug, Clone, Serialize)]
pub struct SheetInfo {
    pub title: String,
    pub path: PathBuf,
    pub rows: usize,
}

/// File-backed [`TaskStore`].
#[derive(Clone)]
pub struct SheetStore {
    path: PathBuf,
    lock_timeout_ms: u64,
    clock: Arc<dyn Clock>,
}

impl SheetStore {
    pub fn new(path: impl Into<PathBuf>, lock_timeout_ms: u64, clock: Arc<dyn Clock>) -> Self {
        Self {
            path: path.into(),
            lock_timeout_ms,
            clock,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Title and size of the sheet; also writes the header if it was missing.
    pub async fn describe(&self) -> Result<SheetInfo> {
        let path = self.path.clone();
        self.access(false, move |sheet| {
            Ok(SheetInfo {
                title: sheet.title.clone(),
                path,
                rows: sheet.rows.len(),
            })
        })
        .await
    }

    async fn access<T, F>(&self, mutate: bool, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut Sheet) -> Result<T> + Send + 'static,
    {
        let path = self.path.clone();
        let timeout_ms = self.lock_timeout_ms;
        tokio::task::spawn_blocking(move || with_sheet(&path, timeout_ms, mutate, f))
            .await
            .map_err(|err| Error::StoreUnavailable(format!("sheet worker failed: {err}")))?
    }
}

/// Runs `f` against the sheet under the file lock, saving afterwards when
/// `mutate` is set or the header had to be created.
fn with_sheet<T>(
    path: &Path,
    timeout_ms: u64,
    mutate: bool,
    f: impl FnOnce(&mut Sheet) -> Result<T>,
) -> Result<T> {
    let _lock = FileLock::acquire(lock::lock_path_for(path), timeout_ms).map_err(unavailable)?;
    let mut sheet = Sheet::load(path).map_err(unavailable)?;
    let header_written = sheet.ensure_header();
    if header_written {
        tracing::info!(sheet = %path.display(), "header missing or empty, writing defaults");
    }

    let value = f(&mut sheet)?;

    if mutate || header_written {
        sheet.save(path).map_err(unavailable)?;
    }
    Ok(value)
}

/// Infrastructure failures on the sheet surface as `StoreUnavailable`.
fn unavailable(err: Error) -> Error {
    match err {
        Error::StoreUnavailable(_) => err,
        Error::LockFailed(path) => {
            Error::StoreUnavailable(format!("sheet is locked: {}", path.display()))
        }
        other => Error::StoreUnavailable(other.to_string()),
    }
}

#[async_trait]
impl TaskStore for SheetStore {
    fn backend_tag(&self) -> &'static str {
        "sheet"
    }

    async fn list_tasks(&self) -> Result<Vec<Task>> {
        let tasks = self.access(false, |sheet| sheet.tasks()).await?;
        tracing::debug!(count = tasks.len(), "listed tasks");
        Ok(tasks)
    }

    async fn insert_task(&self, fields: NewTask) -> Result<Task> {
        let task = build_task(fields, self.clock.now())?;
        let row = task.clone();
        self.access(true, move |sheet| sheet.append(&row)).await?;
        tracing::info!(task_id = %task.id, "row added");
        Ok(task)
    }

    async fn update_task(&self, id: &str, patch: TaskPatch) -> Result<()> {
        let target = id.to_string();
        self.access(true, move |sheet| sheet.update(&target, &patch).map(|_| ()))
            .await?;
        tracing::info!(task_id = id, "row updated");
        Ok(())
    }

    async fn delete_task(&self, id: &str) -> Result<()> {
        let target = id.to_string();
        self.access(true, move |sheet| sheet.remove(&target)).await?;
        tracing::info!(task_id = id, "row deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use chrono::DateTime;
    use std::fs;

    fn store_in(dir: &Path) -> SheetStore {
        let now = DateTime::parse_from_rfc3339("2024-06-10T09:00:00+00:00").unwrap();
        SheetStore::new(dir.join("tasks.sheet.json"), 1000, Arc::new(FixedClock(now)))
    }

    #[tokio::test]
    async fn missing_file_gets_default_header() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = store_in(dir.path());

        assert!(store.list_tasks().await.unwrap().is_empty());

        let sheet = Sheet::load(store.path()).unwrap();
        assert_eq!(sheet.header, DEFAULT_HEADER.map(String::from).to_vec());
        assert_eq!(sheet.title, "Tasks");
    }

    #[tokio::test]
    async fn rows_round_trip_through_the_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = store_in(dir.path());

        let mut fields = NewTask::named("Graph problems");
        fields.domain = Some(Domain::Dsa);
        fields.difficulty = Some(Difficulty::Hard);
        fields.due_date = Some(DueDate::new("2024-06-12"));
        let created = store.insert_task(fields).await.unwrap();

        let reopened = store_in(dir.path());
        assert_eq!(reopened.list_tasks().await.unwrap(), vec![created]);
    }

    #[tokio::test]
    async fn update_keeps_unrelated_cells() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("tasks.sheet.json");
        let sheet = serde_json::json!({
            "title": "Personal",
            "header": ["TaskId", "TaskName", "Description", "Domain", "Mode", "Status",
                       "CreatedDate", "DueDate", "Notes"],
            "rows": [["t1", "Old", "", "DSA", "Easy", "Not Started",
                      "2024-06-01T00:00:00.000Z", "2024-06-09", "keep me"]]
        });
        fs::write(&path, serde_json::to_string(&sheet).unwrap()).unwrap();

        let store = store_in(dir.path());
        store
            .update_task("t1", TaskPatch::status(Status::Completed))
            .await
            .unwrap();

        let sheet = Sheet::load(&path).unwrap();
        assert_eq!(sheet.rows[0][5], "Completed");
        assert_eq!(sheet.rows[0][7], "2024-06-09");
        assert_eq!(sheet.rows[0][8], "keep me");
        assert_eq!(sheet.title, "Personal");
    }

    #[tokio::test]
    async fn unknown_cells_are_read_leniently() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("tasks.sheet.json");
        let sheet = serde_json::json!({
            "header": DEFAULT_HEADER,
            "rows": [["t1", "Odd", "", "Gardening", "Brutal", "Blocked", "", "whenever"],
                     ["t2", "Short row"]]
        });
        fs::write(&path, serde_json::to_string(&sheet).unwrap()).unwrap();

        let tasks = store_in(dir.path()).list_tasks().await.unwrap();
        assert_eq!(tasks.len(), 2);
        assert_eq!(tasks[0].domain, None);
        assert_eq!(tasks[0].difficulty, None);
        assert_eq!(tasks[0].status, Status::NotStarted);
        assert_eq!(tasks[0].due_date.as_str(), "whenever");
        assert_eq!(tasks[1].name, "Short row");
        assert_eq!(tasks[1].due_date.as_str(), "");
    }

    #[tokio::test]
    async fn header_without_required_columns_is_unavailable() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("tasks.sheet.json");
        fs::write(&path, r#"{"header": ["TaskId", "TaskName"], "rows": []}"#).unwrap();

        let err = store_in(dir.path()).list_tasks().await.unwrap_err();
        match err {
            Error::StoreUnavailable(msg) => assert!(msg.contains("Status")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn corrupt_file_is_unavailable() {
        let dir = tempfile::tempdir().expect("tempdir");
        fs::write(dir.path().join("tasks.sheet.json"), "{not json").unwrap();

        let err = store_in(dir.path()).list_tasks().await.unwrap_err();
        assert!(matches!(err, Error::StoreUnavailable(_)));
    }

    #[tokio::test]
    async fn held_lock_is_unavailable() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = SheetStore::new(
            dir.path().join("tasks.sheet.json"),
            50,
            Arc::new(crate::clock::SystemClock),
        );
        let _held = FileLock::acquire(lock::lock_path_for(store.path()), 1000).unwrap();

        let err = store.list_tasks().await.unwrap_err();
        match err {
            Error::StoreUnavailable(msg) => assert!(msg.contains("locked")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn missing_rows_are_not_found() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = store_in(dir.path());

        let err = store.delete_task("ghost").await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
        let err = store
            .update_task("ghost", TaskPatch::status(Status::Completed))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[tokio::test]
    async fn describe_reports_title_and_rows() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = store_in(dir.path());
        store.insert_task(NewTask::named("one")).await.unwrap();

        let info = store.describe().await.unwrap();
        assert_eq!(info.title, "Tasks");
        assert_eq!(info.rows, 1);
    }
}
