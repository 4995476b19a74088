//! Board state and the mutations a user can perform on it.
//!
//! [`BoardState`] is a plain value: view-update functions take a state and
//! return the next one. [`Board`] pairs those transforms with store calls.
//!
//! Status moves are applied optimistically. If the store rejects one, the
//! provisional state is thrown away and the whole list is re-read; there is no
//! per-field rollback. Create, edit and delete are not optimistic: on failure
//! the error is returned and the caller keeps its previous state.

use std::sync::Arc;

use chrono::NaiveDate;
use serde::Serialize;

use crate::clock::Clock;
use crate::error::{Error, Result};
use crate::schedule::{classify, Reference, Views};
use crate::store::TaskStore;
use crate::task::{NewTask, Status, Task, TaskPatch};

/// Everything the board view renders from.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BoardState {
    pub tasks: Vec<Task>,
    /// True until the first read completes, successfully or not.
    pub loading: bool,
    /// Task open in the edit form, if any.
    pub editing: Option<Task>,
    /// Last failure shown to the user.
    pub notice: Option<String>,
}

impl BoardState {
    pub fn initial() -> Self {
        Self {
            loading: true,
            ..Self::default()
        }
    }

    pub fn loaded(tasks: Vec<Task>) -> Self {
        Self {
            tasks,
            ..Self::default()
        }
    }

    pub fn find(&self, id: &str) -> Option<&Task> {
        self.tasks.iter().find(|task| task.id == id)
    }

    pub fn views(&self, reference: &Reference) -> Views {
        classify(&self.tasks, reference)
    }

    /// Today's workflow split into status columns.
    pub fn columns(&self, reference: &Reference) -> Columns {
        Columns::from_tasks(self.views(reference).active)
    }

    /// Provisional state with `id` moved to `status`. `None` if no such task.
    pub fn with_status(&self, id: &str, status: Status) -> Option<BoardState> {
        self.find(id)?;
        let mut next = self.clone();
        for task in next.tasks.iter_mut().filter(|task| task.id == id) {
            task.status = status;
        }
        Some(next)
    }

    pub fn without_task(&self, id: &str) -> BoardState {
        let mut next = self.clone();
        next.tasks.retain(|task| task.id != id);
        if next.editing.as_ref().is_some_and(|task| task.id == id) {
            next.editing = None;
        }
        next
    }

    pub fn open_editor(&self, id: &str) -> BoardState {
        let mut next = self.clone();
        next.editing = self.find(id).cloned();
        next
    }

    pub fn close_editor(&self) -> BoardState {
        let mut next = self.clone();
        next.editing = None;
        next
    }

    fn with_notice(&self, notice: impl Into<String>) -> BoardState {
        let mut next = self.clone();
        next.notice = Some(notice.into());
        next.loading = false;
        next
    }
}

/// Active tasks grouped by status, each column in list order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Columns {
    pub not_started: Vec<Task>,
    pub in_progress: Vec<Task>,
    pub completed: Vec<Task>,
}

impl Columns {
    pub fn from_tasks(tasks: Vec<Task>) -> Self {
        let mut columns = Self::default();
        for task in tasks {
            match task.status {
                Status::NotStarted => columns.not_started.push(task),
                Status::InProgress => columns.in_progress.push(task),
                Status::Completed => columns.completed.push(task),
            }
        }
        columns
    }

    pub fn get(&self, status: Status) -> &[Task] {
        match status {
            Status::NotStarted => &self.not_started,
            Status::InProgress => &self.in_progress,
            Status::Completed => &self.completed,
        }
    }

    pub fn len(&self) -> usize {
        self.not_started.len() + self.in_progress.len() + self.completed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Both views as rendered for one reference day.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BoardView {
    pub today: NaiveDate,
    pub active: Columns,
    pub upcoming: Vec<Task>,
    pub hidden: usize,
}

impl BoardView {
    pub fn build(tasks: &[Task], reference: &Reference) -> Self {
        let views = classify(tasks, reference);
        Self {
            today: reference.today(),
            active: Columns::from_tasks(views.active),
            upcoming: views.upcoming,
            hidden: views.hidden,
        }
    }
}

/// Reference for an optional `YYYY-MM-DD` override: midnight of that day in
/// the clock's offset, or the clock's own "now" when absent.
pub fn reference_for_day(raw: Option<&str>, clock: &dyn Clock) -> Result<Reference> {
    let raw = match raw.map(str::trim).filter(|raw| !raw.is_empty()) {
        Some(raw) => raw,
        None => return Ok(Reference::from_clock(clock)),
    };
    let day = NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|_| {
        Error::InvalidArgument(format!("today must be YYYY-MM-DD, got '{raw}'"))
    })?;
    Reference::start_of(day, *clock.now().offset())
        .ok_or_else(|| Error::InvalidArgument(format!("no midnight on {day}")))
}

/// A drag that ended. `destination` is `None` when dropped outside a column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DragEnd {
    pub task_id: String,
    pub destination: Option<Status>,
}

/// How a status move ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum MoveOutcome {
    /// Nothing to do: no destination, or the task is not on the board.
    Ignored,
    /// The store accepted the move.
    Confirmed,
    /// The store rejected the move; state was rebuilt from a fresh read.
    Reverted { error: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub state: BoardState,
    pub outcome: MoveOutcome,
}

/// Drives board mutations against a store.
#[derive(Clone)]
pub struct Board {
    store: Arc<dyn TaskStore>,
}

impl Board {
    pub fn new(store: Arc<dyn TaskStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<dyn TaskStore> {
        &self.store
    }

    /// Re-reads the list. On failure the previous tasks stay and a notice is set.
    pub async fn refresh(&self, state: &BoardState) -> BoardState {
        match self.store.list_tasks().await {
            Ok(tasks) => BoardState {
                tasks,
                loading: false,
                editing: state.editing.clone(),
                notice: None,
            },
            Err(err) => {
                tracing::error!(backend = self.store.backend_tag(), error = %err, "failed to load tasks");
                state.with_notice(err.to_string())
            }
        }
    }

    /// Applies a drag optimistically, then confirms it with the store.
    pub async fn move_task(&self, state: &BoardState, drag: DragEnd) -> Transition {
        let destination = match drag.destination {
            Some(status) => status,
            None => return ignored(state),
        };
        let provisional = match state.with_status(&drag.task_id, destination) {
            Some(next) => next,
            None => return ignored(state),
        };

        match self
            .store
            .update_task(&drag.task_id, TaskPatch::status(destination))
            .await
        {
            Ok(()) => {
                tracing::debug!(task_id = %drag.task_id, status = %destination, "status move confirmed");
                Transition {
                    state: provisional,
                    outcome: MoveOutcome::Confirmed,
                }
            }
            Err(err) => {
                tracing::warn!(task_id = %drag.task_id, error = %err, "status move failed, reloading");
                let error = err.to_string();
                // Reload from the store; if that fails too, fall back to the
                // pre-move state so the provisional change never sticks.
                let mut reloaded = self.refresh(state).await;
                reloaded.notice = Some(match reloaded.notice.take() {
                    Some(reload_error) => format!("{error}; reload failed: {reload_error}"),
                    None => error.clone(),
                });
                Transition {
                    state: reloaded,
                    outcome: MoveOutcome::Reverted { error },
                }
            }
        }
    }

    /// Creates a task and re-reads the list.
    pub async fn create(&self, state: &BoardState, fields: NewTask) -> Result<(Task, BoardState)> {
        let task = self.store.insert_task(fields).await?;
        let next = self.refresh(state).await;
        Ok((task, next))
    }

    /// Saves an edit, re-reads the list and closes the editor.
    pub async fn edit(&self, state: &BoardState, id: &str, patch: TaskPatch) -> Result<BoardState> {
        self.store.update_task(id, patch).await?;
        Ok(self.refresh(state).await.close_editor())
    }

    /// Deletes a task and drops it from the local list.
    pub async fn delete(&self, state: &BoardState, id: &str) -> Result<BoardState> {
        self.store.delete_task(id).await?;
        Ok(state.without_task(id))
    }
}

fn ignored(state: &BoardState) -> Transition {
    Transition {
        state: state.clone(),
        outcome: MoveOutcome::Ignored,
    }
}
