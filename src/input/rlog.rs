use crate::core::{Event, Which};
use crate::error::{DecodeError, SegmentTruncated};
use crate::input::ParsedLog;

/// Magic bytes at the start of a binary segment log
pub const RLOG_MAGIC: &[u8; 4] = b"RLG1";

const HEADER_LEN: usize = 8 + 2 + 4;

/// Parse a binary segment log
///
/// Layout after the magic is a sequence of records:
/// - `mono_time` u64 LE
/// - `which` u16 LE (type ordinal)
/// - `len` u32 LE
/// - `len` payload bytes
///
/// A record cut short at the tail, or one with an unknown type ordinal, ends
/// parsing. Everything before it is kept and the damage is reported in
/// [`ParsedLog::truncated`].
pub fn parse_rlog(data: &[u8]) -> Result<ParsedLog, DecodeError> {
    let body = data.strip_prefix(RLOG_MAGIC.as_slice()).ok_or(DecodeError::BadMagic("rlog"))?;

    let mut log = ParsedLog::default();
    let mut pos = 0;

    while pos < body.len() {
        let Some(header) = body.get(pos..pos + HEADER_LEN) else {
            log.truncated = Some(truncated(&log, pos, "short record header"));
            break;
        };

        let mono_time = u64::from_le_bytes(header[0..8].try_into().unwrap_or_default());
        let ordinal = u16::from_le_bytes([header[8], header[9]]);
        let len = u32::from_le_bytes([header[10], header[11], header[12], header[13]]) as usize;

        let Some(which) = Which::from_ordinal(ordinal) else {
            log.truncated = Some(truncated(&log, pos, &format!("unknown event type {}", ordinal)));
            break;
        };

        let start = pos + HEADER_LEN;
        let Some(payload) = start.checked_add(len).and_then(|end| body.get(start..end)) else {
            log.truncated = Some(truncated(&log, pos, "short record payload"));
            break;
        };

        log.push(Event::new(mono_time, which, payload.to_vec()));
        pos = start + len;
    }

    Ok(log)
}

/// Serialize events into the binary segment log layout
pub fn write_rlog(events: &[Event]) -> Vec<u8> {
    let mut out = RLOG_MAGIC.to_vec();
    for event in events {
        out.extend_from_slice(&event.mono_time.to_le_bytes());
        out.extend_from_slice(&event.which.ordinal().to_le_bytes());
        out.extend_from_slice(&(event.data.len() as u32).to_le_bytes());
        out.extend_from_slice(&event.data);
    }
    out
}

fn truncated(log: &ParsedLog, pos: usize, reason: &str) -> SegmentTruncated {
    SegmentTruncated {
        parsed: log.events.len(),
        at: pos + RLOG_MAGIC.len(),
        reason: reason.to_string(),
    }
}
