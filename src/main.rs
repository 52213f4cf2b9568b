//! # weekroster
//!
//! A weekly workforce scheduling engine (scheduling core; executed by backend)

#![warn(missing_docs)]
#![deny(clippy::undocumented_unsafe_blocks)]
#![cfg_attr(
    not(any(test, debug_assertions)),
    deny(clippy::unwrap_used, clippy::panic, clippy::todo, clippy::dbg_macro)
)]

use clap::{
    Parser,
    builder::{Styles, styling::AnsiColor},
};
use data::{ScheduleRequest, ScheduleResult};
use miette::{Diagnostic, IntoDiagnostic, NamedSource, Result, SourceOffset};
use std::{
    fs,
    path::{Path, PathBuf},
};
use thiserror::Error;

pub mod algo;
pub mod data;

const HELP_STYLE: Styles = Styles::styled()
    .header(AnsiColor::Yellow.on_default().bold())
    .usage(AnsiColor::Yellow.on_default().bold())
    .literal(AnsiColor::Green.on_default())
    .placeholder(AnsiColor::BrightBlue.on_default());

/// Weekroster scheduling software
#[derive(Debug, Parser)]
#[command(version, about, long_about = None, styles = HELP_STYLE)]
pub struct Cli {
    /// Provide path to the schedule request file
    #[arg(short, long, value_name = "PATH", default_value_os_t = PathBuf::from("./request.json"))]
    request: PathBuf,

    /// Provide path to the output roster file
    #[arg(short, long, value_name = "PATH", default_value_os_t = PathBuf::from("./roster.json"))]
    output: PathBuf,
}

/// The request file exists but cannot be turned into a [`ScheduleRequest`].
#[derive(Debug, Diagnostic, Error)]
pub enum RequestError {
    /// The file holds something other than valid request JSON.
    #[error("{path} is not a valid schedule request")]
    Malformed {
        /// Where the file came from.
        path: String,

        #[source_code]
        source_code: NamedSource<String>,

        #[label("{cause}")]
        at: SourceOffset,

        #[source]
        cause: serde_json::Error,
    },

    /// The file could not be read at all.
    #[error("could not read schedule request from {path}")]
    Unreadable {
        /// Where the file was looked for.
        path: String,

        #[source]
        cause: std::io::Error,
    },
}

/// Load the request, or, on a first run, drop a default template at the
/// path and schedule from that.
fn load_request(path: &Path) -> Result<ScheduleRequest> {
    let display = path.display().to_string();

    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            let template =
                serde_json::to_string_pretty(&ScheduleRequest::default()).into_diagnostic()?;
            fs::write(path, &template).into_diagnostic()?;
            template
        }
        Err(cause) => {
            return Err(RequestError::Unreadable {
                path: display,
                cause,
            }
            .into());
        }
    };

    serde_json::from_str(&text).map_err(|cause| {
        RequestError::Malformed {
            at: SourceOffset::from_location(&text, cause.line(), cause.column()),
            source_code: NamedSource::new(&display, text).with_language("JSON"),
            path: display,
            cause,
        }
        .into()
    })
}

/// Render a per-day listing of the roster for the terminal.
fn summarize(request: &ScheduleRequest, result: &ScheduleResult) -> String {
    let operator_name = |id| {
        request
            .operators
            .iter()
            .find(|o| o.id == id)
            .map(|o| o.name.as_str())
            .unwrap_or("?")
    };
    let task_name = |id| {
        request
            .tasks
            .iter()
            .find(|t| t.id == id)
            .map(|t| t.name.as_str())
            .unwrap_or("?")
    };

    let mut out = String::new();
    for &day in &request.workdays {
        out.push_str(&format!("{day}\n"));
        for assignment in result.assignments.iter().filter(|a| a.day == day) {
            out.push_str(&format!(
                "  {:<20} -> {}\n",
                operator_name(assignment.operator),
                task_name(assignment.task),
            ));
        }
    }
    if !result.warnings.is_empty() {
        out.push_str(&format!("{} warning(s):\n", result.warnings.len()));
        for warning in &result.warnings {
            out.push_str(&format!("  ! {warning}\n"));
        }
    }
    out
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let request = load_request(&cli.request)?;
    let result = algo::schedule(&request);

    print!("{}", summarize(&request, &result));

    let roster = serde_json::to_string_pretty(&result).into_diagnostic()?;
    fs::write(&cli.output, roster).into_diagnostic()?;

    Ok(())
}
