//! Shared output formatting for taskboard CLI commands.

use serde::Serialize;

use crate::error::{Error, Result};

pub const SCHEMA_VERSION: &str = "taskboard.v1";

#[derive(Debug, Clone, Copy)]
pub struct OutputOptions {
    pub json: bool,
    pub quiet: bool,
}

#[derive(Debug, Clone)]
pub struct HumanOutput {
    header: String,
    summary: Vec<(String, String)>,
    sections: Vec<(String, Vec<String>)>,
    warnings: Vec<String>,
}

impl HumanOutput {
    pub fn new(header: impl Into<String>) -> Self {
        Self {
            header: header.into(),
            summary: Vec::new(),
            sections: Vec::new(),
            warnings: Vec::new(),
        }
    }

    pub fn push_summary(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.summary.push((key.into(), value.into()));
    }

    /// Adds a titled list. Empty sections print `(none)` so columns stay visible.
    pub fn push_section(&mut self, title: impl Into<String>, items: Vec<String>) {
        self.sections.push((title.into(), items));
    }

    pub fn push_warning(&mut self, value: impl Into<String>) {
        self.warnings.push(value.into());
    }
}

pub fn emit_success<T: Serialize>(
    options: OutputOptions,
    command: &str,
    data: &T,
    human: Option<&HumanOutput>,
) -> Result<()> {
    if options.json {
        let warnings = human.map(|h| h.warnings.clone()).unwrap_or_default();

        #[derive(Serialize)]
        struct Envelope<'a, T: Serialize> {
            schema_version: &'static str,
            command: &'a str,
            status: &'static str,
            data: &'a T,
            #[serde(skip_serializing_if = "Vec::is_empty")]
            warnings: Vec<String>,
        }

        let payload = Envelope {
            schema_version: SCHEMA_VERSION,
            command,
            status: "success",
            data,
            warnings,
        };

        println!("{}", serde_json::to_string_pretty(&payload)?);
        return Ok(());
    }

    if options.quiet {
        return Ok(());
    }

    if let Some(human) = human {
        println!("{}", format_human(human));
    }

    Ok(())
}

pub fn emit_error(command: &str, err: &Error, json: bool) -> Result<()> {
    let hint = error_hint(err);
    if json {
        #[derive(Serialize)]
        struct ErrorBody<'a> {
            message: &'a str,
            code: i32,
            kind: &'static str,
        }

        #[derive(Serialize)]
        struct Envelope<'a> {
            schema_version: &'static str,
            command: &'a str,
            status: &'static str,
            error: ErrorBody<'a>,
            #[serde(skip_serializing_if = "Option::is_none")]
            hint: Option<&'a str>,
        }

        let payload = Envelope {
            schema_version: SCHEMA_VERSION,
            command,
            status: "error",
            error: ErrorBody {
                message: &err.to_string(),
                code: err.exit_code(),
                kind: err.kind(),
            },
            hint,
        };

        println!("{}", serde_json::to_string_pretty(&payload)?);
        return Ok(());
    }

    eprintln!("error: {err}");
    if let Some(hint) = hint {
        eprintln!("hint: {hint}");
    }
    Ok(())
}

pub fn format_human(output: &HumanOutput) -> String {
    let mut lines = vec![output.header.clone()];

    if !output.summary.is_empty() {
        lines.push(String::new());
        for (key, value) in &output.summary {
            lines.push(format!("  {key}: {value}"));
        }
    }

    for (title, items) in &output.sections {
        lines.push(String::new());
        lines.push(format!("{title}:"));
        if items.is_empty() {
            lines.push("  (none)".to_string());
        }
        for item in items {
            lines.push(format!("  - {item}"));
        }
    }

    if !output.warnings.is_empty() {
        lines.push(String::new());
        lines.push("Warnings:".to_string());
        for warning in &output.warnings {
            lines.push(format!("  - {warning}"));
        }
    }

    lines.join("\n")
}

/// Best-effort command name for error envelopes, e.g. `task add`.
pub fn infer_command_name_from_args() -> String {
    command_name_from(std::env::args().skip(1))
}

/// Global flags whose value is a separate argument.
const GLOBAL_VALUE_FLAGS: [&str; 2] = ["--data", "--config"];

fn command_name_from(args: impl Iterator<Item = String>) -> String {
    let mut positional = Vec::new();
    let mut skip_value = false;
    for arg in args {
        if skip_value {
            skip_value = false;
        } else if GLOBAL_VALUE_FLAGS.contains(&arg.as_str()) {
            skip_value = true;
        } else if !arg.starts_with('-') {
            positional.push(arg);
        }
    }
    let mut positional = positional.into_iter();
    let command = match positional.next() {
        Some(cmd) => cmd,
        None => return "taskboard".to_string(),
    };
    if command == "task" {
        if let Some(sub) = positional.next() {
            return format!("{command} {sub}");
        }
    }
    command
}

fn error_hint(err: &Error) -> Option<&'static str> {
    match err {
        Error::NotFound(_) => Some("taskboard task list"),
        Error::StoreUnavailable(_) | Error::LockFailed(_) => {
            Some("check the sheet file and that no other writer is stuck holding its lock")
        }
        Error::InvalidConfig(_) => Some("fix taskboard.toml then retry"),
        _ => None,
    }
}
