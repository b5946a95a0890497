use crate::core::{Event, Which};
use crate::error::{DecodeError, SegmentTruncated};
use crate::input::ParsedLog;
use std::io::Read;
use tracing::debug;

const TIME_COLUMNS: &[&str] = &["mono_time", "logmonotime", "time", "timestamp", "ts"];
const WHICH_COLUMNS: &[&str] = &["which", "type", "service", "name"];
const DATA_COLUMNS: &[&str] = &["data", "payload", "hex", "bytes"];

/// Parse a segment log stored as CSV
///
/// Supported column names (case-insensitive):
/// - time: mono_time, logMonoTime, time, timestamp, ts (nanoseconds)
/// - type: which, type, service, name (service name such as `carState`)
/// - payload: data, payload, hex, bytes (hex string)
///
/// The first row that fails to parse ends the log; rows before it are kept.
pub fn parse_csv<R: Read>(reader: R) -> Result<ParsedLog, DecodeError> {
    let mut rdr = csv::Reader::from_reader(reader);

    let headers = rdr.headers()?.clone();
    let (time_idx, which_idx, data_idx) = detect_columns(&headers)?;

    let mut log = ParsedLog::default();

    for (row, result) in rdr.records().enumerate() {
        let parsed = result
            .map_err(|e| e.to_string())
            .and_then(|record| parse_record(&record, time_idx, which_idx, data_idx));

        match parsed {
            Ok(event) => log.push(event),
            Err(reason) => {
                // +2: header line and 1-based rows
                log.truncated = Some(SegmentTruncated {
                    parsed: log.events.len(),
                    at: row + 2,
                    reason,
                });
                break;
            }
        }
    }

    debug!("csv log parsed: {} events", log.events.len());
    Ok(log)
}

fn parse_record(
    record: &csv::StringRecord,
    time_idx: usize,
    which_idx: usize,
    data_idx: usize,
) -> Result<Event, String> {
    let mono_time = record
        .get(time_idx)
        .and_then(|s| s.trim().parse::<u64>().ok())
        .ok_or("bad timestamp")?;

    let name = record.get(which_idx).map(str::trim).unwrap_or_default();
    let which = Which::from_name(name).ok_or_else(|| format!("unknown event type {:?}", name))?;

    let data = record
        .get(data_idx)
        .and_then(Event::parse_hex)
        .ok_or("bad payload")?;

    Ok(Event::new(mono_time, which, data))
}

/// Detect column indices from CSV headers
fn detect_columns(headers: &csv::StringRecord) -> Result<(usize, usize, usize), DecodeError> {
    let time_idx = find_column(headers, TIME_COLUMNS)?;
    let which_idx = find_column(headers, WHICH_COLUMNS)?;
    let data_idx = find_column(headers, DATA_COLUMNS)?;

    Ok((time_idx, which_idx, data_idx))
}

/// Find a column by checking possible names
fn find_column(headers: &csv::StringRecord, names: &'static [&'static str]) -> Result<usize, DecodeError> {
    headers
        .iter()
        .position(|header| {
            let header_lower = header.trim().to_lowercase();
            names.iter().any(|&name| header_lower == name)
        })
        .ok_or(DecodeError::MissingColumn(names))
}
