/// Append-only log of emitted DAO/DIO/DIS messages.
///
/// Records are immutable once appended and ordered by `(time, seq)`,
/// which is dispatch order. The log exports to a line-oriented text
/// format and to JSON, and hashes deterministically for replay checks.
use std::io::{self, BufRead, Write};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::time::VirtualTime;

// ── Hash utility ──────────────────────────────────────────────────────

/// Combine two u64 hashes deterministically.
pub fn hash_combine(a: u64, b: u64) -> u64 {
    let mut h = a;
    h = h.wrapping_mul(0x517cc1b727220a95);
    h = h.wrapping_add(b);
    h ^= h >> 32;
    h
}

/// Hash a byte slice deterministically (FNV-1a).
pub fn hash_bytes(data: &[u8]) -> u64 {
    let mut h: u64 = 0xcbf29ce484222325;
    for &b in data {
        h ^= b as u64;
        h = h.wrapping_mul(0x100000001b3);
    }
    h
}

// ── Records ───────────────────────────────────────────────────────────

/// Kind of control message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MessageKind {
    Dao,
    Dio,
    Dis,
}

impl MessageKind {
    pub fn as_str(self) -> &'static str {
        match self {
            MessageKind::Dao => "DAO",
            MessageKind::Dio => "DIO",
            MessageKind::Dis => "DIS",
        }
    }
}

impl std::fmt::Display for MessageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for MessageKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "DAO" => Ok(MessageKind::Dao),
            "DIO" => Ok(MessageKind::Dio),
            "DIS" => Ok(MessageKind::Dis),
            _ => Err(format!("unknown message kind: {}", s)),
        }
    }
}

/// One emitted message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageRecord {
    /// Position in the log.
    pub seq: u64,
    pub time: VirtualTime,
    /// Name of the emitting node.
    pub node: String,
    pub kind: MessageKind,
    /// Human-readable description, e.g. `node3 sends DAO to node2`.
    pub detail: String,
}

impl std::fmt::Display for MessageRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {} {}", self.time, self.kind, self.detail)
    }
}

// ── Reporter ──────────────────────────────────────────────────────────

/// Consumer of records as they are appended.
pub trait Reporter {
    fn report(&mut self, record: &MessageRecord);
}

/// Emits every record as a structured `tracing` event.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingReporter;

impl Reporter for TracingReporter {
    fn report(&mut self, record: &MessageRecord) {
        info!(
            time = record.time.as_f64(),
            node = %record.node,
            kind = %record.kind,
            "{}",
            record.detail
        );
    }
}

/// Buffers records in memory; mostly useful in tests.
#[derive(Debug, Clone, Default)]
pub struct CollectingReporter {
    pub records: Vec<MessageRecord>,
}

impl Reporter for CollectingReporter {
    fn report(&mut self, record: &MessageRecord) {
        self.records.push(record.clone());
    }
}

// ── Event Log ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventLog {
    records: Vec<MessageRecord>,
}

impl EventLog {
    pub fn new() -> Self {
        EventLog {
            records: Vec::new(),
        }
    }

    /// Append a record and return it.
    pub fn record(
        &mut self,
        time: VirtualTime,
        node: impl Into<String>,
        kind: MessageKind,
        detail: impl Into<String>,
    ) -> &MessageRecord {
        let seq = self.records.len() as u64;
        self.records.push(MessageRecord {
            seq,
            time,
            node: node.into(),
            kind,
            detail: detail.into(),
        });
        &self.records[self.records.len() - 1]
    }

    pub fn records(&self) -> &[MessageRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records of one kind, in log order.
    pub fn of_kind(&self, kind: MessageKind) -> impl Iterator<Item = &MessageRecord> + '_ {
        self.records.iter().filter(move |r| r.kind == kind)
    }

    pub fn count(&self, kind: MessageKind) -> usize {
        self.of_kind(kind).count()
    }

    /// Records emitted by `node`, in log order.
    pub fn for_node<'a>(&'a self, node: &'a str) -> impl Iterator<Item = &'a MessageRecord> + 'a {
        self.records.iter().filter(move |r| r.node == node)
    }

    /// Compute a deterministic hash of the entire log.
    pub fn log_hash(&self) -> u64 {
        let mut h: u64 = 0;
        for r in &self.records {
            h = hash_combine(h, r.seq);
            h = hash_combine(h, r.time.as_f64().to_bits());
            h = hash_combine(h, hash_bytes(r.node.as_bytes()));
            h = hash_combine(h, hash_bytes(r.kind.as_str().as_bytes()));
            h = hash_combine(h, hash_bytes(r.detail.as_bytes()));
        }
        h
    }

    // ── Export / Import ───────────────────────────────────────────

    /// Export the log in a deterministic text format.
    ///
    /// Times are written as their IEEE-754 bit pattern so import is exact.
    pub fn export<W: Write>(&self, w: &mut W) -> io::Result<()> {
        writeln!(w, "# DODAG EVENT LOG v1")?;
        writeln!(w, "# records: {}", self.records.len())?;
        for r in &self.records {
            writeln!(
                w,
                "R {} {:016x} {} {} {}",
                r.seq,
                r.time.as_f64().to_bits(),
                r.node,
                r.kind,
                r.detail
            )?;
        }
        Ok(())
    }

    pub fn export_to_file(&self, path: &str) -> io::Result<()> {
        let mut f = std::fs::File::create(path)?;
        self.export(&mut f)
    }

    /// Import a log written by [`EventLog::export`].
    pub fn import<R: BufRead>(r: R) -> io::Result<Self> {
        let mut records = Vec::new();
        for line in r.lines() {
            let line = line?;
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let record = deserialize_record(line)
                .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
            records.push(record);
        }
        Ok(EventLog { records })
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&self.records)
    }
}

/// Compare two logs for identical records.
pub fn logs_match(a: &EventLog, b: &EventLog) -> bool {
    a.records == b.records
}

fn deserialize_record(line: &str) -> Result<MessageRecord, String> {
    let parts: Vec<&str> = line.splitn(6, ' ').collect();
    if parts.len() < 6 || parts[0] != "R" {
        return Err(format!("invalid record line: {}", line));
    }
    let seq: u64 = parts[1].parse().map_err(|e| format!("seq: {}", e))?;
    let bits = u64::from_str_radix(parts[2], 16).map_err(|e| format!("time: {}", e))?;
    let time = VirtualTime::new(f64::from_bits(bits))
        .ok_or_else(|| format!("time out of range: {}", parts[2]))?;
    let kind: MessageKind = parts[4].parse()?;
    Ok(MessageRecord {
        seq,
        time,
        node: parts[3].to_string(),
        kind,
        detail: parts[5].to_string(),
    })
}
