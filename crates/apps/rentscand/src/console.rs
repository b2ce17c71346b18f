//! Operator console for inspecting and resetting the rental table.
//!
//! Reads one command per line. Output goes to the provided writer so the
//! console can be driven by tests as well as stdin/stdout.

use std::fmt::Write as _;

use rentscan_backend::{RentalRecord, RentalStore};
use rentscan_protocol::TagId;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio_util::sync::CancellationToken;

pub const HELP: &str = "\
Commands:
  list           show all rental records
  status <tag>   show one record (tag in hex)
  clear          remove all records
  help           show this help
  exit           stop the backend
";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleCommand {
    List,
    Status(String),
    Clear,
    Exit,
    Help,
    Empty,
    Unknown(String),
}

impl ConsoleCommand {
    pub fn parse(line: &str) -> Self {
        let mut words = line.split_whitespace();
        let Some(head) = words.next() else {
            return Self::Empty;
        };
        match head.to_ascii_lowercase().as_str() {
            "list" => Self::List,
            "status" => match words.next() {
                Some(tag) => Self::Status(tag.to_string()),
                None => Self::Unknown(line.trim().to_string()),
            },
            "clear" => Self::Clear,
            "exit" | "quit" => Self::Exit,
            "help" | "?" => Self::Help,
            _ => Self::Unknown(line.trim().to_string()),
        }
    }
}

/// Why [`Console::run`] returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleExit {
    Exit,
    Eof,
    Cancelled,
}

pub struct Console {
    store: RentalStore,
}

impl Console {
    pub fn new(store: RentalStore) -> Self {
        Self { store }
    }

    /// Execute one command line. Returns the text to print and whether the
    /// operator asked to exit.
    pub fn handle_line(&self, line: &str) -> (String, bool) {
        match ConsoleCommand::parse(line) {
            ConsoleCommand::Empty => (String::new(), false),
            ConsoleCommand::List => (self.render_list(), false),
            ConsoleCommand::Status(tag) => (self.render_status(&tag), false),
            ConsoleCommand::Clear => {
                let removed = self.store.clear();
                log::info!("console: cleared records={}", removed);
                ("All rentals cleared\n".to_string(), false)
            }
            ConsoleCommand::Help => (HELP.to_string(), false),
            ConsoleCommand::Exit => ("Exiting\n".to_string(), true),
            ConsoleCommand::Unknown(input) => {
                (format!("Unknown command: {input}\nType 'help' for commands\n"), false)
            }
        }
    }

    fn render_list(&self) -> String {
        let records = self.store.snapshot();
        if records.is_empty() {
            return "No rental items found\n".to_string();
        }
        let mut out = format!("Rental items ({}):\n", records.len());
        for (tag, record) in &records {
            render_record(&mut out, tag, record);
        }
        out
    }

    fn render_status(&self, input: &str) -> String {
        let tag = match TagId::from_hex(input) {
            Ok(tag) => tag,
            Err(err) => return format!("Invalid tag {input}: {err}\n"),
        };
        match self.store.get(&tag) {
            Some(record) => {
                let mut out = String::new();
                render_record(&mut out, &tag, &record);
                out
            }
            None => format!("No rental found for tag {tag}\n"),
        }
    }

    /// Read commands until `exit`, end of input, or cancellation.
    pub async fn run<R, W>(
        &self,
        input: R,
        mut output: W,
        cancel: CancellationToken,
    ) -> std::io::Result<ConsoleExit>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut lines = input.lines();
        loop {
            let next = tokio::select! {
                _ = cancel.cancelled() => return Ok(ConsoleExit::Cancelled),
                next = lines.next_line() => next?,
            };
            let Some(line) = next else {
                log::debug!("console: input closed");
                return Ok(ConsoleExit::Eof);
            };

            let (text, exit) = self.handle_line(&line);
            if !text.is_empty() {
                output.write_all(text.as_bytes()).await?;
                output.flush().await?;
            }
            if exit {
                return Ok(ConsoleExit::Exit);
            }
        }
    }
}

fn render_record(out: &mut String, tag: &TagId, record: &RentalRecord) {
    let _ = writeln!(out, "  tag {tag} ({} bytes)", tag.len());
    let _ = writeln!(out, "    status:   {} ({})", record.status.code(), record.status);
    let _ = writeln!(out, "    rented:   {}", describe_timestamp(record.rent_timestamp));
    let _ = writeln!(out, "    duration: {}s", record.duration);
    let _ = writeln!(out, "    returned: {}", describe_timestamp(record.return_timestamp));
}

fn describe_timestamp(secs: u64) -> String {
    if secs == 0 {
        return "0".to_string();
    }
    format!("{secs} ({})", format_timestamp(secs))
}

/// Render epoch seconds as RFC 3339, falling back to the raw number when the
/// value is out of range.
pub fn format_timestamp(secs: u64) -> String {
    i64::try_from(secs)
        .ok()
        .and_then(|secs| OffsetDateTime::from_unix_timestamp(secs).ok())
        .and_then(|at| at.format(&Rfc3339).ok())
        .unwrap_or_else(|| secs.to_string())
}
