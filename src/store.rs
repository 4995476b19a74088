//! Task store contract and an in-memory implementation.
//!
//! The store is the system of record. Every call is attempted once; there is
//! no retry, timeout or conflict detection at this layer.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, SecondsFormat};
use tokio::sync::Mutex;
use ulid::Ulid;

use crate::clock::{Clock, SystemClock};
use crate::error::{Error, Result};
use crate::task::{DueDate, NewTask, Task, TaskPatch};

#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Short backend name for logs.
    fn backend_tag(&self) -> &'static str;

    /// All tasks, in storage order.
    async fn list_tasks(&self) -> Result<Vec<Task>>;

    /// Creates a task, assigning id, creation time, default status and,
    /// when none was supplied, a due date of now.
    async fn insert_task(&self, fields: NewTask) -> Result<Task>;

    /// Merges the provided fields into an existing task.
    async fn update_task(&self, id: &str, patch: TaskPatch) -> Result<()>;

    async fn delete_task(&self, id: &str) -> Result<()>;
}

pub fn format_timestamp(now: DateTime<FixedOffset>) -> String {
    now.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Builds the record for a new task. Shared by every store implementation.
pub fn build_task(fields: NewTask, now: DateTime<FixedOffset>) -> Result<Task> {
    let name = fields.validated_name()?;
    let created_at = format_timestamp(now);
    let due_date = fields
        .supplied_due()
        .cloned()
        .unwrap_or_else(|| DueDate::new(created_at.clone()));

    Ok(Task {
        id: Ulid::new().to_string(),
        name,
        description: fields.description.unwrap_or_default(),
        domain: Some(fields.domain.unwrap_or_default()),
        difficulty: Some(fields.difficulty.unwrap_or_default()),
        status: Default::default(),
        created_at,
        due_date,
    })
}

/// Volatile store used by tests and demos. Failures can be switched on to
/// exercise reconciliation paths.
pub struct MemoryStore {
    tasks: Mutex<Vec<Task>>,
    clock: Arc<dyn Clock>,
    unavailable: AtomicBool,
    fail_updates: AtomicBool,
    fail_lists: AtomicBool,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new(Arc::new(SystemClock))
    }
}

impl MemoryStore {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            tasks: Mutex::new(Vec::new()),
            clock,
            unavailable: AtomicBool::new(false),
            fail_updates: AtomicBool::new(false),
            fail_lists: AtomicBool::new(false),
        }
    }

    pub fn with_tasks(clock: Arc<dyn Clock>, tasks: Vec<Task>) -> Self {
        Self {
            tasks: Mutex::new(tasks),
            ..Self::new(clock)
        }
    }

    /// Every call fails with `StoreUnavailable` while set.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Only `update_task` fails while set.
    pub fn set_fail_updates(&self, fail: bool) {
        self.fail_updates.store(fail, Ordering::SeqCst);
    }

    /// Only `list_tasks` fails while set.
    pub fn set_fail_lists(&self, fail: bool) {
        self.fail_lists.store(fail, Ordering::SeqCst);
    }

    pub async fn snapshot(&self) -> Vec<Task> {
        self.tasks.lock().await.clone()
    }

    fn check_available(&self) -> Result<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(Error::StoreUnavailable("memory store offline".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl TaskStore for MemoryStore {
    fn backend_tag(&self) -> &'static str {
        "memory"
    }

    async fn list_tasks(&self) -> Result<Vec<Task>> {
        self.check_available()?;
        if self.fail_lists.load(Ordering::SeqCst) {
            return Err(Error::StoreUnavailable("list rejected".to_string()));
        }
        Ok(self.tasks.lock().await.clone())
    }

    async fn insert_task(&self, fields: NewTask) -> Result<Task> {
        self.check_available()?;
        let task = build_task(fields, self.clock.now())?;
        self.tasks.lock().await.push(task.clone());
        Ok(task)
    }

    async fn update_task(&self, id: &str, patch: TaskPatch) -> Result<()> {
        self.check_available()?;
        if self.fail_updates.load(Ordering::SeqCst) {
            return Err(Error::StoreUnavailable("update rejected".to_string()));
        }
        let mut tasks = self.tasks.lock().await;
        let task = tasks
            .iter_mut()
            .find(|task| task.id == id)
            .ok_or_else(|| Error::NotFound(id.to_string()))?;
        patch.apply(task);
        Ok(())
    }

    async fn delete_task(&self, id: &str) -> Result<()> {
        self.check_available()?;
        let mut tasks = self.tasks.lock().await;
        let idx = tasks
            .iter()
            .position(|task| task.id == id)
            .ok_or_else(|| Error::NotFound(id.to_string()))?;
        tasks.remove(idx);
        Ok(())
    }
}
