//! taskboard task command implementation
//!
//! Adds, lists, edits, moves and deletes tasks in the sheet.

use std::str::FromStr;

use serde::Serialize;

use crate::board::{Board, BoardState, DragEnd, MoveOutcome};
use crate::error::{Error, Result};
use crate::output::{emit_success, HumanOutput};
use crate::schedule::{placement, Due, Placement, Reference};
use crate::store::TaskStore;
use crate::task::{DueDate, NewTask, Status, Task, TaskPatch};

use super::Context;

pub struct AddOptions {
    pub name: String,
    pub description: Option<String>,
    pub domain: Option<String>,
    pub difficulty: Option<String>,
    pub due: Option<String>,
}

pub struct EditOptions {
    pub id: String,
    pub name: Option<String>,
    pub description: Option<String>,
    pub domain: Option<String>,
    pub difficulty: Option<String>,
    pub due: Option<String>,
    pub status: Option<String>,
}

pub struct MoveOptions {
    pub id: String,
    pub status: String,
}

pub struct RmOptions {
    pub id: String,
}

#[derive(Serialize)]
struct TaskListOutput {
    total: usize,
    tasks: Vec<Task>,
}

#[derive(Serialize)]
struct MoveOutput {
    task: Task,
    from: Status,
    to: Status,
}

#[derive(Serialize)]
struct EditOutput {
    id: String,
    message: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    task: Option<Task>,
}

#[derive(Serialize)]
struct RmOutput {
    id: String,
    message: &'static str,
}

pub async fn run_add(ctx: Context, options: AddOptions) -> Result<()> {
    let task = add_task(ctx.store.as_ref(), options).await?;
    let reference = Reference::from_clock(ctx.clock.as_ref());

    let mut human = HumanOutput::new("Task created");
    human.push_summary("ID", task.id.clone());
    human.push_summary("Name", task.name.clone());
    human.push_summary("Due", task.due_date.to_string());
    human.push_summary("Board", placement_label(&task, &reference));
    if Due::parse(task.due_date.as_str()).is_none() {
        human.push_warning(format!(
            "due date '{}' is not a recognised date; the task will not appear on the board",
            task.due_date
        ));
    }

    emit_success(ctx.output, "task add", &task, Some(&human))
}

pub async fn run_list(ctx: Context) -> Result<()> {
    let tasks = ctx.store.list_tasks().await?;

    let mut human = HumanOutput::new("Tasks");
    human.push_summary("Total", tasks.len().to_string());
    human.push_section(
        "Sheet order",
        tasks
            .iter()
            .map(|task| {
                format!(
                    "{}  [{}] {} (due {})",
                    task.id, task.status, task.name, task.due_date
                )
            })
            .collect(),
    );

    let output = TaskListOutput {
        total: tasks.len(),
        tasks,
    };
    emit_success(ctx.output, "task list", &output, Some(&human))
}

pub async fn run_edit(ctx: Context, options: EditOptions) -> Result<()> {
    let patch = TaskPatch {
        name: options.name,
        description: options.description,
        domain: parse_opt(options.domain)?,
        difficulty: parse_opt(options.difficulty)?,
        status: parse_opt(options.status)?,
        due_date: options.due.map(DueDate::new),
    };
    if patch.is_empty() {
        return Err(Error::InvalidArgument(
            "nothing to change; pass at least one non-empty field".to_string(),
        ));
    }

    let board = Board::new(ctx.store.clone());
    let saved = save_edit(&board, &options.id, patch).await?;

    let mut human = HumanOutput::new("Task updated");
    human.push_summary("ID", options.id.clone());
    if let Some(task) = &saved.task {
        human.push_summary("Name", task.name.clone());
        human.push_summary("Status", task.status.to_string());
        human.push_summary("Due", task.due_date.to_string());
    }
    if let Some(warning) = saved.warning {
        human.push_warning(warning);
    }

    let output = EditOutput {
        id: options.id,
        message: "Updated",
        task: saved.task,
    };
    emit_success(ctx.output, "task edit", &output, Some(&human))
}

pub async fn run_move(ctx: Context, options: MoveOptions) -> Result<()> {
    let destination = Status::from_str(&options.status)?;
    let board = Board::new(ctx.store.clone());

    let state = board.refresh(&BoardState::initial()).await;
    if let Some(notice) = state.notice {
        return Err(Error::StoreUnavailable(notice));
    }
    let from = state
        .find(&options.id)
        .map(|task| task.status)
        .ok_or_else(|| Error::NotFound(options.id.clone()))?;

    let transition = board
        .move_task(
            &state,
            DragEnd {
                task_id: options.id.clone(),
                destination: Some(destination),
            },
        )
        .await;

    let task = match transition.outcome {
        MoveOutcome::Confirmed => transition
            .state
            .find(&options.id)
            .cloned()
            .ok_or_else(|| Error::NotFound(options.id.clone()))?,
        MoveOutcome::Reverted { error } => return Err(Error::StoreUnavailable(error)),
        MoveOutcome::Ignored => return Err(Error::NotFound(options.id)),
    };

    let mut human = HumanOutput::new("Task moved");
    human.push_summary("ID", task.id.clone());
    human.push_summary("From", from.to_string());
    human.push_summary("To", destination.to_string());

    let output = MoveOutput {
        task,
        from,
        to: destination,
    };
    emit_success(ctx.output, "task move", &output, Some(&human))
}

pub async fn run_rm(ctx: Context, options: RmOptions) -> Result<()> {
    let board = Board::new(ctx.store.clone());
    board.delete(&BoardState::initial(), &options.id).await?;

    let mut human = HumanOutput::new("Task deleted");
    human.push_summary("ID", options.id.clone());

    let output = RmOutput {
        id: options.id,
        message: "Deleted",
    };
    emit_success(ctx.output, "task rm", &output, Some(&human))
}

/// Inserts straight into the store; the new task is all the caller needs.
async fn add_task(store: &dyn TaskStore, options: AddOptions) -> Result<Task> {
    let fields = NewTask {
        name: Some(options.name),
        description: options.description,
        domain: parse_opt(options.domain)?,
        difficulty: parse_opt(options.difficulty)?,
        due_date: options.due.map(DueDate::new),
    };
    store.insert_task(fields).await
}

/// A saved edit. `task` is the re-read record, absent when the re-read failed.
struct SavedEdit {
    task: Option<Task>,
    warning: Option<String>,
}

/// Writes the patch, then re-reads the sheet. Only the write decides success.
async fn save_edit(board: &Board, id: &str, patch: TaskPatch) -> Result<SavedEdit> {
    let state = board.edit(&BoardState::initial(), id, patch).await?;
    if let Some(notice) = state.notice {
        tracing::warn!(task_id = id, error = %notice, "edit saved but reload failed");
        return Ok(SavedEdit {
            task: None,
            warning: Some(format!(
                "task {id} was updated but the list could not be re-read: {notice}"
            )),
        });
    }
    Ok(SavedEdit {
        task: state.find(id).cloned(),
        warning: None,
    })
}

/// Parses an optional label; a blank value counts as absent.
fn parse_opt<T: FromStr<Err = Error>>(value: Option<String>) -> Result<Option<T>> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(T::from_str)
        .transpose()
}

fn placement_label(task: &Task, reference: &Reference) -> &'static str {
    match placement(task, reference) {
        Placement::Active => "today",
        Placement::Upcoming => "upcoming",
        Placement::Hidden => "hidden",
    }
}
