//! taskboard board command implementation
//!
//! Prints today's workflow as status columns, then the upcoming list.

use crate::board::{reference_for_day, BoardView};
use crate::error::Result;
use crate::output::{emit_success, HumanOutput};
use crate::store::TaskStore;
use crate::task::{Status, Task};

use super::Context;

/// Options for the board command
pub struct BoardOptions {
    pub today: Option<String>,
}

pub async fn run(ctx: Context, options: BoardOptions) -> Result<()> {
    let reference = reference_for_day(options.today.as_deref(), ctx.clock.as_ref())?;
    let tasks = ctx.store.list_tasks().await?;
    let view = BoardView::build(&tasks, &reference);

    let mut human = HumanOutput::new("Task board");
    human.push_summary("Today", view.today.to_string());
    human.push_summary("Active", view.active.len().to_string());
    human.push_summary("Upcoming", view.upcoming.len().to_string());
    for status in Status::ALL {
        human.push_section(
            status.as_str(),
            view.active.get(status).iter().map(active_line).collect(),
        );
    }
    human.push_section("Upcoming", view.upcoming.iter().map(upcoming_line).collect());
    if view.hidden > 0 {
        human.push_warning(format!(
            "{} task(s) hidden: completed in the past or due date unreadable",
            view.hidden
        ));
    }

    emit_success(ctx.output, "board", &view, Some(&human))
}

fn active_line(task: &Task) -> String {
    format!("{}  {}{}", task.id, task.name, labels(task))
}

fn upcoming_line(task: &Task) -> String {
    format!(
        "{}  {}  {}{} [{}]",
        task.due_date, task.id, task.name, labels(task), task.status
    )
}

fn labels(task: &Task) -> String {
    let mut parts = Vec::new();
    if let Some(domain) = task.domain {
        parts.push(domain.as_str());
    }
    if let Some(difficulty) = task.difficulty {
        parts.push(difficulty.as_str());
    }
    if parts.is_empty() {
        String::new()
    } else {
        format!(" ({})", parts.join(", "))
    }
}
