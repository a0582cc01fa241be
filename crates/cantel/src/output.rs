use std::io::IsTerminal;
use std::time::Instant;

use cantel_codec::{DecodeResult, DecodedFrame, SignalDescriptor, Value};
use cantel_pipeline::{DiagnosticsSnapshot, IngestReport};
use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
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

#[derive(Serialize)]
struct Reading {
    id: String,
    key: &'static str,
    name: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    value: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    faults: Option<Vec<&'static str>>,
    unit: &'static str,
    display: String,
    raw: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    age_ms: Option<u64>,
}

impl Reading {
    fn from_frame(frame: &DecodedFrame, now: Option<Instant>) -> Self {
        let descriptor = frame.descriptor();
        let (value, faults) = match frame.value {
            Value::Numeric(v) => (Some(v), None),
            Value::Faults(set) => (None, Some(set.labels())),
        };
        Self {
            id: format_id(frame.id),
            key: descriptor.map(|d| d.key).unwrap_or("?"),
            name: descriptor.map(|d| d.name).unwrap_or("Unknown"),
            value,
            faults,
            unit: descriptor.map(|d| d.unit).unwrap_or(""),
            display: frame.formatted_value(),
            raw: frame.hex(),
            age_ms: now.map(|now| {
                now.saturating_duration_since(frame.timestamp)
                    .as_millis()
                    .try_into()
                    .unwrap_or(u64::MAX)
            }),
        }
    }
}

#[derive(Serialize)]
struct DashboardOutput {
    r#type: &'static str,
    signals: Vec<Reading>,
    diagnostics: DiagnosticsSnapshot,
    error_rate: f64,
    recorded: u64,
}

/// Print the latest value of every signal seen so far, plus loop health.
pub fn print_dashboard(
    latest: &[DecodedFrame],
    diagnostics: &DiagnosticsSnapshot,
    recorded: u64,
    format: OutputFormat,
) {
    let now = Instant::now();
    match format {
        OutputFormat::Json => {
            let out = DashboardOutput {
                r#type: "dashboard",
                signals: latest
                    .iter()
                    .map(|frame| Reading::from_frame(frame, Some(now)))
                    .collect(),
                diagnostics: *diagnostics,
                error_rate: diagnostics.error_rate(),
                recorded,
            };
            print_json(&out);
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["ID", "SIGNAL", "VALUE", "RAW", "AGE"]);
            for frame in latest {
                let reading = Reading::from_frame(frame, Some(now));
                table.add_row(vec![
                    reading.id,
                    reading.name.to_string(),
                    reading.display,
                    reading.raw,
                    format_age(reading.age_ms),
                ]);
            }
            println!("{table}");
            println!("{}", diagnostics_line(diagnostics));
        }
        OutputFormat::Pretty => {
            for frame in latest {
                let reading = Reading::from_frame(frame, Some(now));
                println!(
                    "{} {:<18} {:<28} [{}] {}",
                    reading.id,
                    reading.name,
                    reading.display,
                    reading.raw,
                    format_age(reading.age_ms)
                );
            }
            println!("{}", diagnostics_line(diagnostics));
        }
    }
}

#[derive(Serialize)]
struct SummaryOutput<'a> {
    r#type: &'static str,
    #[serde(flatten)]
    report: &'a IngestReport,
    error_rate: f64,
    recorded: u64,
}

/// Print the final report of a listen session.
pub fn print_summary(report: &IngestReport, recorded: u64, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(&SummaryOutput {
            r#type: "summary",
            report,
            error_rate: report.diagnostics.error_rate(),
            recorded,
        }),
        OutputFormat::Table | OutputFormat::Pretty => {
            let reason = match report.reason {
                cantel_pipeline::StopReason::Shutdown => "shutdown",
                cantel_pipeline::StopReason::FrameLimit => "frame limit",
            };
            println!(
                "stopped ({reason}): {recorded} recorded, {}",
                diagnostics_line(&report.diagnostics)
            );
        }
    }
}

#[derive(Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
enum DecodeOutput {
    Decoded(Reading),
    UnknownId { id: String, bytes: String },
    Malformed { id: String, name: &'static str, len: usize, expected: usize },
}

/// Print the outcome of decoding a single frame.
pub fn print_decode(result: &DecodeResult, format: OutputFormat) {
    let out = match result {
        DecodeResult::Decoded(frame) => DecodeOutput::Decoded(Reading::from_frame(frame, None)),
        DecodeResult::UnknownId { id, bytes } => DecodeOutput::UnknownId {
            id: format_id(*id),
            bytes: format_hex(bytes),
        },
        DecodeResult::Malformed { id, len } => {
            let descriptor = cantel_codec::lookup(*id);
            DecodeOutput::Malformed {
                id: format_id(*id),
                name: descriptor.map(|d| d.name).unwrap_or("Unknown"),
                len: *len,
                expected: descriptor.map(|d| d.kind.payload_len()).unwrap_or(0),
            }
        }
    };

    match format {
        OutputFormat::Json => print_json(&out),
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["ID", "SIGNAL", "RESULT", "RAW"]);
            table.add_row(decode_row(out));
            println!("{table}");
        }
        OutputFormat::Pretty => {
            let [id, name, result, raw] = decode_row(out);
            println!("{id} {name}: {result} [{raw}]");
        }
    }
}

fn decode_row(out: DecodeOutput) -> [String; 4] {
    match out {
        DecodeOutput::Decoded(reading) => {
            [reading.id, reading.name.to_string(), reading.display, reading.raw]
        }
        DecodeOutput::UnknownId { id, bytes } => {
            [id, "Unknown".to_string(), "unknown id".to_string(), bytes]
        }
        DecodeOutput::Malformed {
            id,
            name,
            len,
            expected,
        } => [
            id,
            name.to_string(),
            format!("malformed: {len} bytes, expected {expected}"),
            String::new(),
        ],
    }
}

#[derive(Serialize)]
struct SignalRow {
    #[serde(flatten)]
    descriptor: &'static SignalDescriptor,
    resolution: f64,
    min: f64,
    max: f64,
}

/// Print the signal table.
pub fn print_signals(signals: &'static [SignalDescriptor], format: OutputFormat) {
    let rows: Vec<SignalRow> = signals
        .iter()
        .map(|descriptor| {
            let (min, max) = descriptor.range();
            SignalRow {
                descriptor,
                resolution: descriptor.resolution(),
                min,
                max,
            }
        })
        .collect();

    match format {
        OutputFormat::Json => print_json(&rows),
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["ID", "KEY", "NAME", "KIND", "UNIT", "RANGE"]);
            for row in &rows {
                table.add_row(vec![
                    format_id(row.descriptor.id),
                    row.descriptor.key.to_string(),
                    row.descriptor.name.to_string(),
                    row.descriptor.kind.as_str().to_string(),
                    row.descriptor.unit.to_string(),
                    format_range(row),
                ]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty => {
            for row in &rows {
                println!(
                    "{} {:<12} {:<18} {:<10} {}",
                    format_id(row.descriptor.id),
                    row.descriptor.key,
                    row.descriptor.name,
                    row.descriptor.kind.as_str(),
                    format_range(row)
                );
            }
        }
    }
}

#[derive(Serialize)]
struct SentOutput {
    r#type: &'static str,
    id: String,
    name: &'static str,
    display: String,
    payload: String,
    destination: String,
    count: u32,
}

/// Print a confirmation for frames written by `send`.
pub fn print_sent(
    frame: &DecodedFrame,
    payload: &[u8],
    destination: &str,
    count: u32,
    format: OutputFormat,
) {
    let reading = Reading::from_frame(frame, None);
    match format {
        OutputFormat::Json => print_json(&SentOutput {
            r#type: "sent",
            id: reading.id,
            name: reading.name,
            display: reading.display,
            payload: format_hex(payload),
            destination: destination.to_string(),
            count,
        }),
        OutputFormat::Table | OutputFormat::Pretty => {
            println!(
                "sent {} {} = {} [{}] to {destination} x{count}",
                reading.id,
                reading.name,
                reading.display,
                format_hex(payload)
            );
        }
    }
}

fn print_json<T: Serialize>(value: &T) {
    println!(
        "{}",
        serde_json::to_string(value).unwrap_or_else(|_| "{}".to_string())
    );
}

fn diagnostics_line(diagnostics: &DiagnosticsSnapshot) -> String {
    format!(
        "status={} decoded={} unknown_id={} malformed={} transport_errors={} error_rate={:.1}%",
        diagnostics.status.as_str(),
        diagnostics.decoded,
        diagnostics.unknown_id,
        diagnostics.malformed,
        diagnostics.transport_errors,
        diagnostics.error_rate() * 100.0
    )
}

fn format_range(row: &SignalRow) -> String {
    if row.descriptor.is_bitmask() {
        "flags".to_string()
    } else {
        format!("{} .. {} (step {})", row.min, row.max, row.resolution)
    }
}

fn format_age(age_ms: Option<u64>) -> String {
    match age_ms {
        Some(ms) if ms < 1000 => format!("{ms}ms"),
        Some(ms) => format!("{:.1}s", ms as f64 / 1000.0),
        None => "-".to_string(),
    }
}

pub fn format_id(id: u16) -> String {
    format!("0x{id:03X}")
}

pub fn format_hex(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{b:02X}"))
        .collect::<Vec<_>>()
        .join(" ")
}
