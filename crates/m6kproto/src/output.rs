use std::io::IsTerminal;

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use m6kproto_midi::CommandKind;
use m6kproto_peer::{DissectResult, MessageOutcome, MessageReport};
use serde::Serialize;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    /// One JSON object per line.
    Json,
    Table,
    Pretty,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MessageRow {
    pub direction: &'static str,
    pub start_seq: u64,
    pub end_seq: u64,
    /// `reset`, `command` or `error`.
    pub kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command_type: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command_name: Option<&'static str>,
    pub summary: String,
}

impl From<&MessageReport> for MessageRow {
    fn from(report: &MessageReport) -> Self {
        let (kind, command_type) = match &report.outcome {
            MessageOutcome::Reset => ("reset", None),
            MessageOutcome::Command(result) => ("command", Some(result.command_type)),
            MessageOutcome::Failed(_) => ("error", None),
        };
        Self {
            direction: report.direction.as_str(),
            start_seq: report.start_seq,
            end_seq: report.end_seq,
            kind,
            command_type,
            command_name: command_type
                .and_then(CommandKind::from_code)
                .map(CommandKind::name),
            summary: report.to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct FieldRow {
    pub filter: &'static str,
    pub name: &'static str,
    pub offset: usize,
    pub length: usize,
}

#[derive(Debug, Serialize)]
pub struct PacketRow {
    pub seq: u64,
    pub protocol: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub direction: Option<&'static str>,
    pub info: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<FieldRow>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub messages: Vec<MessageRow>,
}

impl PacketRow {
    pub fn new(seq: u64, result: &DissectResult, with_fields: bool) -> Self {
        let fields = if with_fields {
            result
                .fields
                .iter()
                .map(|f| FieldRow {
                    filter: f.field.filter(),
                    name: f.field.name(),
                    offset: f.offset,
                    length: f.length,
                })
                .collect()
        } else {
            Vec::new()
        };
        Self {
            seq,
            protocol: result.protocol,
            direction: result.direction.map(|d| d.as_str()),
            info: result.info.clone(),
            fields,
            messages: result.messages.iter().map(MessageRow::from).collect(),
        }
    }
}

/// Writes rows to stdout in the selected format.
///
/// JSON and pretty output stream row by row; the table is printed once
/// [`Printer::finish`] is called.
pub struct Printer {
    format: OutputFormat,
    table: Option<Table>,
}

impl Printer {
    pub fn new(format: OutputFormat) -> Self {
        Self {
            format,
            table: None,
        }
    }

    pub fn packet(&mut self, row: &PacketRow) {
        match self.format {
            OutputFormat::Json => print_json(row),
            OutputFormat::Pretty => {
                let dir = row.direction.unwrap_or("-");
                println!("#{} [{}] {}: {}", row.seq, row.protocol, dir, row.info);
                for field in &row.fields {
                    println!(
                        "    {} @{}+{} ({})",
                        field.filter, field.offset, field.length, field.name
                    );
                }
                if row.messages.len() > 1 {
                    for message in &row.messages {
                        println!(
                            "    {}..{} {}",
                            message.start_seq, message.end_seq, message.summary
                        );
                    }
                }
            }
            OutputFormat::Table => {
                let table = self.table.get_or_insert_with(|| {
                    new_table(vec!["SEQ", "PROTOCOL", "DIRECTION", "INFO"])
                });
                table.add_row(vec![
                    row.seq.to_string(),
                    row.protocol.to_string(),
                    row.direction.unwrap_or("-").to_string(),
                    row.info.clone(),
                ]);
            }
        }
    }

    pub fn message(&mut self, row: &MessageRow) {
        match self.format {
            OutputFormat::Json => print_json(row),
            OutputFormat::Pretty => println!(
                "{}..{} {}: {}",
                row.start_seq, row.end_seq, row.direction, row.summary
            ),
            OutputFormat::Table => {
                let table = self.table.get_or_insert_with(|| {
                    new_table(vec!["SEQ", "DIRECTION", "TYPE", "SUMMARY"])
                });
                table.add_row(vec![
                    format!("{}..{}", row.start_seq, row.end_seq),
                    row.direction.to_string(),
                    row.command_name.unwrap_or(row.kind).to_string(),
                    row.summary.clone(),
                ]);
            }
        }
    }

    pub fn finish(self) {
        if let Some(table) = self.table {
            println!("{table}");
        }
    }
}

fn new_table(header: Vec<&'static str>) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header);
    table
}

fn print_json<T: Serialize>(row: &T) {
    println!(
        "{}",
        serde_json::to_string(row).unwrap_or_else(|_| "{}".to_string())
    );
}
