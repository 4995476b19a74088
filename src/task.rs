//! Task data model.
//!
//! Field names on the wire and in the sheet follow the sheet header:
//! `TaskId, TaskName, Description, Domain, Mode, Status, CreatedDate, DueDate`.
//! `Mode` carries the difficulty.
//!
//! Labels are read the same way on every input surface: CLI arguments and
//! REST bodies both ignore case, spaces, dashes and underscores, and a blank
//! label counts as not provided. Output always uses the canonical label.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Workflow status. Every status is reachable from every other one.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
pub enum Status {
    #[default]
    #[serde(rename = "Not Started")]
    NotStarted,
    #[serde(rename = "In Progress")]
    InProgress,
    #[serde(rename = "Completed")]
    Completed,
}

impl Status {
    /// Board column order.
    pub const ALL: [Status; 3] = [Status::NotStarted, Status::InProgress, Status::Completed];

    pub fn as_str(self) -> &'static str {
        match self {
            Status::NotStarted => "Not Started",
            Status::InProgress => "In Progress",
            Status::Completed => "Completed",
        }
    }
}

/// Work domain of a task.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
pub enum Domain {
    #[serde(rename = "DSA")]
    Dsa,
    #[default]
    #[serde(rename = "Development")]
    Development,
    #[serde(rename = "Basic Task")]
    BasicTask,
    #[serde(rename = "Ofc Work")]
    OfcWork,
}

impl Domain {
    pub const ALL: [Domain; 4] = [
        Domain::Dsa,
        Domain::Development,
        Domain::BasicTask,
        Domain::OfcWork,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Domain::Dsa => "DSA",
            Domain::Development => "Development",
            Domain::BasicTask => "Basic Task",
            Domain::OfcWork => "Ofc Work",
        }
    }
}

/// Difficulty, shown as "Mode". Only used for display and tie-breaking.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
pub enum Difficulty {
    Easy,
    #[default]
    Medium,
    Hard,
}

impl Difficulty {
    pub const ALL: [Difficulty; 3] = [Difficulty::Easy, Difficulty::Medium, Difficulty::Hard];

    pub fn as_str(self) -> &'static str {
        match self {
            Difficulty::Easy => "Easy",
            Difficulty::Medium => "Medium",
            Difficulty::Hard => "Hard",
        }
    }
}

/// Folds case, spaces, dashes and underscores so `in-progress`,
/// `In Progress` and `in_progress` all compare equal.
fn fold_label(value: &str) -> String {
    value
        .trim()
        .chars()
        .filter(|ch| !matches!(ch, ' ' | '-' | '_'))
        .flat_map(char::to_lowercase)
        .collect()
}

fn parse_label<T: Copy>(
    value: &str,
    all: &[T],
    label: fn(T) -> &'static str,
    what: &str,
) -> Result<T> {
    let folded = fold_label(value);
    all.iter()
        .copied()
        .find(|entry| fold_label(label(*entry)) == folded)
        .ok_or_else(|| {
            let expected: Vec<&str> = all.iter().map(|entry| label(*entry)).collect();
            Error::Validation(format!(
                "invalid {what} '{}' (expected {})",
                value.trim(),
                expected.join("|")
            ))
        })
}

impl FromStr for Status {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self> {
        parse_label(value, &Status::ALL, Status::as_str, "status")
    }
}

impl FromStr for Domain {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self> {
        parse_label(value, &Domain::ALL, Domain::as_str, "domain")
    }
}

impl FromStr for Difficulty {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self> {
        parse_label(value, &Difficulty::ALL, Difficulty::as_str, "difficulty")
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reads an optional label through its loose `FromStr`; blank or null is `None`.
fn loose_label<'de, D, T>(deserializer: D) -> std::result::Result<Option<T>, D::Error>
where
    D: serde::Deserializer<'de>,
    T: FromStr<Err = Error>,
{
    match Option::<String>::deserialize(deserializer)? {
        Some(raw) if !raw.trim().is_empty() => {
            raw.parse::<T>().map(Some).map_err(serde::de::Error::custom)
        }
        _ => Ok(None),
    }
}

/// Due date exactly as stored.
///
/// The store gives no guarantee that the value parses, so it is kept verbatim
/// and interpreted by [`crate::schedule`] at classification time.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct DueDate(String);

impl DueDate {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Display for DueDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Task {
    #[serde(rename = "TaskId")]
    pub id: String,
    #[serde(rename = "TaskName")]
    pub name: String,
    #[serde(rename = "Description", default)]
    pub description: String,
    #[serde(rename = "Domain", default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<Domain>,
    #[serde(rename = "Mode", default, skip_serializing_if = "Option::is_none")]
    pub difficulty: Option<Difficulty>,
    #[serde(rename = "Status", default)]
    pub status: Status,
    /// RFC 3339 creation timestamp, never rewritten.
    #[serde(rename = "CreatedDate")]
    pub created_at: String,
    #[serde(rename = "DueDate")]
    pub due_date: DueDate,
}

/// Fields accepted when creating a task. The store fills in the rest.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct NewTask {
    #[serde(rename = "TaskName", default)]
    pub name: Option<String>,
    #[serde(rename = "Description", default)]
    pub description: Option<String>,
    #[serde(rename = "Domain", default, deserialize_with = "loose_label")]
    pub domain: Option<Domain>,
    #[serde(rename = "Mode", default, deserialize_with = "loose_label")]
    pub difficulty: Option<Difficulty>,
    #[serde(rename = "DueDate", default)]
    pub due_date: Option<DueDate>,
}

impl NewTask {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    /// Returns the trimmed display name, or a validation error when absent.
    pub fn validated_name(&self) -> Result<String> {
        let name = self.name.as_deref().map(str::trim).unwrap_or_default();
        if name.is_empty() {
            return Err(Error::Validation("TaskName is required".to_string()));
        }
        Ok(name.to_string())
    }

    /// Due date if one was supplied; a blank value counts as absent.
    pub fn supplied_due(&self) -> Option<&DueDate> {
        self.due_date.as_ref().filter(|due| !due.is_blank())
    }
}

/// Partial update. Absent and empty fields leave the stored value alone.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct TaskPatch {
    #[serde(rename = "TaskName", default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "Description", default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(
        rename = "Domain",
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "loose_label"
    )]
    pub domain: Option<Domain>,
    #[serde(
        rename = "Mode",
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "loose_label"
    )]
    pub difficulty: Option<Difficulty>,
    #[serde(
        rename = "Status",
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "loose_label"
    )]
    pub status: Option<Status>,
    #[serde(rename = "DueDate", default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<DueDate>,
}

impl TaskPatch {
    /// A patch that only moves the task to another status column.
    pub fn status(status: Status) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        non_blank(&self.name).is_none()
            && non_blank(&self.description).is_none()
            && self.domain.is_none()
            && self.difficulty.is_none()
            && self.status.is_none()
            && self.due_date.as_ref().filter(|due| !due.is_blank()).is_none()
    }

    /// Merges the provided fields into `task`. Id and creation time never change.
    pub fn apply(&self, task: &mut Task) {
        if let Some(name) = non_blank(&self.name) {
            task.name = name.trim().to_string();
        }
        if let Some(description) = non_blank(&self.description) {
            task.description = description.to_string();
        }
        if let Some(domain) = self.domain {
            task.domain = Some(domain);
        }
        if let Some(difficulty) = self.difficulty {
            task.difficulty = Some(difficulty);
        }
        if let Some(status) = self.status {
            task.status = status;
        }
        if let Some(due) = self.due_date.as_ref().filter(|due| !due.is_blank()) {
            task.due_date = due.clone();
        }
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|value| !value.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Task {
        Task {
            id: "t1".to_string(),
            name: "Read chapter".to_string(),
            description: "graphs".to_string(),
            domain: Some(Domain::Dsa),
            difficulty: Some(Difficulty::Hard),
            status: Status::NotStarted,
            created_at: "2024-06-01T09:00:00.000+00:00".to_string(),
            due_date: DueDate::new("2024-06-10"),
        }
    }

    #[test]
    fn labels_parse_loosely() {
        assert_eq!("in-progress".parse::<Status>().unwrap(), Status::InProgress);
        assert_eq!("Not Started".parse::<Status>().unwrap(), Status::NotStarted);
        assert_eq!("completed".parse::<Status>().unwrap(), Status::Completed);
        assert_eq!("basic_task".parse::<Domain>().unwrap(), Domain::BasicTask);
        assert_eq!("dsa".parse::<Domain>().unwrap(), Domain::Dsa);
        assert_eq!("HARD".parse::<Difficulty>().unwrap(), Difficulty::Hard);
    }

    #[test]
    fn unknown_status_is_a_validation_error() {
        let err = "Blocked".parse::<Status>().expect_err("unknown status");
        match err {
            Error::Validation(msg) => assert!(msg.contains("Not Started|In Progress|Completed")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn task_uses_sheet_field_names() {
        let json = serde_json::to_value(sample()).expect("serialize");
        assert_eq!(json["TaskId"], "t1");
        assert_eq!(json["TaskName"], "Read chapter");
        assert_eq!(json["Domain"], "DSA");
        assert_eq!(json["Mode"], "Hard");
        assert_eq!(json["Status"], "Not Started");
        assert_eq!(json["DueDate"], "2024-06-10");
    }

    #[test]
    fn new_task_requires_a_name() {
        let err = NewTask::default().validated_name().expect_err("missing name");
        assert!(matches!(err, Error::Validation(_)));

        let err = NewTask::named("   ").validated_name().expect_err("blank name");
        assert!(matches!(err, Error::Validation(_)));

        assert_eq!(NewTask::named("  Ship it ").validated_name().unwrap(), "Ship it");
    }

    #[test]
    fn blank_due_counts_as_absent() {
        let mut fields = NewTask::named("x");
        fields.due_date = Some(DueDate::new(""));
        assert!(fields.supplied_due().is_none());
        fields.due_date = Some(DueDate::new("2024-06-12"));
        assert_eq!(fields.supplied_due().map(DueDate::as_str), Some("2024-06-12"));
    }

    #[test]
    fn status_patch_touches_only_status() {
        let mut task = sample();
        let before = task.clone();
        TaskPatch::status(Status::Completed).apply(&mut task);
        assert_eq!(task.status, Status::Completed);
        assert_eq!(task.due_date, before.due_date);
        assert_eq!(task.domain, before.domain);
        assert_eq!(task.difficulty, before.difficulty);
        assert_eq!(task.name, before.name);
    }

    #[test]
    fn empty_fields_do_not_overwrite() {
        let mut task = sample();
        let patch = TaskPatch {
            name: Some(String::new()),
            description: Some("  ".to_string()),
            due_date: Some(DueDate::new("")),
            ..TaskPatch::default()
        };
        assert!(patch.is_empty());
        patch.apply(&mut task);
        assert_eq!(task, sample());
    }

    #[test]
    fn patch_rejects_unknown_status_on_the_wire() {
        let result: std::result::Result<TaskPatch, _> =
            serde_json::from_str(r#"{"Status": "Archived"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn blank_labels_on_the_wire_are_not_provided() {
        let patch: TaskPatch = serde_json::from_str(
            r#"{"TaskName": "", "Status": "", "Domain": " ", "Mode": null}"#,
        )
        .expect("blank labels");
        assert_eq!(patch.status, None);
        assert_eq!(patch.domain, None);
        assert_eq!(patch.difficulty, None);
        assert!(patch.is_empty());

        let fields: NewTask =
            serde_json::from_str(r#"{"TaskName": "x", "Domain": "", "Mode": ""}"#)
                .expect("blank labels");
        assert_eq!(fields.domain, None);
        assert_eq!(fields.difficulty, None);
    }

    #[test]
    fn wire_labels_parse_like_cli_labels() {
        let patch: TaskPatch =
            serde_json::from_str(r#"{"Status": "in-progress", "Domain": "basic task"}"#)
                .expect("loose labels");
        assert_eq!(patch.status, Some(Status::InProgress));
        assert_eq!(patch.domain, Some(Domain::BasicTask));

        let fields: NewTask = serde_json::from_str(r#"{"TaskName": "x", "Mode": "HARD"}"#)
            .expect("loose labels");
        assert_eq!(fields.difficulty, Some(Difficulty::Hard));

        let json = serde_json::to_value(&patch).expect("serialize");
        assert_eq!(json["Status"], "In Progress");
        assert_eq!(json["Domain"], "Basic Task");
    }
}
