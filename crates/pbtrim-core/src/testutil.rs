use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::io;
use std::sync::Mutex;
use std::time::Duration;

use chrono::{TimeZone, Utc};

use pbtrim_storage::{BackendAck, PageBlobBackend, PageRangeListing, RangeRead};
use pbtrim_types::error::{PbtrimError, Result};
use pbtrim_types::page_range::PageRange;

use crate::console::{Console, Response};

/// Backend operations, for call recording and failure injection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    List,
    Read,
    Write,
    Resize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    List(String),
    Read(String, u64, u64),
    Write(String, u64, usize),
    Resize(String, u64),
}

#[derive(Debug, Clone, Default)]
struct MemoryBlob {
    size: u64,
    /// Written regions keyed by offset. Reported as-is, never coalesced.
    pages: BTreeMap<u64, Vec<u8>>,
}

impl MemoryBlob {
    fn ranges(&self) -> Vec<PageRange> {
        self.pages
            .iter()
            .map(|(&offset, data)| PageRange::new(offset, data.len() as u64))
            .collect()
    }

    /// Remove `[start, end)` from every stored region, splitting as needed.
    fn punch(&mut self, start: u64, end: u64) {
        let mut kept = BTreeMap::new();
        for (offset, data) in std::mem::take(&mut self.pages) {
            let region_end = offset + data.len() as u64;
            if region_end <= start || offset >= end {
                kept.insert(offset, data);
                continue;
            }
            if offset < start {
                kept.insert(offset, data[..(start - offset) as usize].to_vec());
            }
            if region_end > end {
                kept.insert(end, data[(end - offset) as usize..].to_vec());
            }
        }
        self.pages = kept;
    }
}

/// In-memory page-blob store that records every call.
pub struct MemoryPageBlobs {
    blobs: Mutex<HashMap<String, MemoryBlob>>,
    calls: Mutex<Vec<Call>>,
    failing: Mutex<HashSet<Op>>,
    /// Truncate every read to this many bytes.
    short_read: Mutex<Option<usize>>,
}

impl MemoryPageBlobs {
    pub fn new() -> Self {
        Self {
            blobs: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
            failing: Mutex::new(HashSet::new()),
            short_read: Mutex::new(None),
        }
    }

    /// Create a blob whose range `i` is filled with byte `i + 1`.
    pub fn with_blob(self, name: &str, size: u64, ranges: &[(u64, u64)]) -> Self {
        let mut blob = MemoryBlob {
            size,
            ..Default::default()
        };
        for (i, &(offset, length)) in ranges.iter().enumerate() {
            blob.pages
                .insert(offset, vec![(i + 1) as u8; length as usize]);
        }
        self.blobs.lock().unwrap().insert(name.to_string(), blob);
        self
    }

    pub fn fail_on(&self, op: Op) {
        self.failing.lock().unwrap().insert(op);
    }

    pub fn truncate_reads_to(&self, bytes: usize) {
        *self.short_read.lock().unwrap() = Some(bytes);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn mutation_calls(&self) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|c| matches!(c, Call::Write(..) | Call::Resize(..)))
            .collect()
    }

    pub fn size_of(&self, name: &str) -> u64 {
        self.blobs.lock().unwrap()[name].size
    }

    pub fn ranges_of(&self, name: &str) -> Vec<PageRange> {
        self.blobs.lock().unwrap()[name].ranges()
    }

    pub fn bytes_at(&self, name: &str, offset: u64) -> Option<Vec<u8>> {
        self.blobs.lock().unwrap()[name].pages.get(&offset).cloned()
    }

    fn record(&self, call: Call, op: Op) -> Result<()> {
        self.calls.lock().unwrap().push(call);
        if self.failing.lock().unwrap().contains(&op) {
            return Err(PbtrimError::Backend(format!("injected {op:?} failure")));
        }
        Ok(())
    }

    fn ack() -> BackendAck {
        BackendAck {
            last_modified: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).single(),
            etag: Some("\"0x1\"".into()),
        }
    }

    fn not_found(name: &str) -> PbtrimError {
        PbtrimError::Backend(format!("HTTP 404 (BlobNotFound): {name}"))
    }
}

impl PageBlobBackend for MemoryPageBlobs {
    fn list_page_ranges(&self, blob: &str) -> Result<PageRangeListing> {
        self.record(Call::List(blob.to_string()), Op::List)?;
        let blobs = self.blobs.lock().unwrap();
        let b = blobs.get(blob).ok_or_else(|| Self::not_found(blob))?;
        Ok(PageRangeListing {
            ranges: b.ranges(),
            ack: Self::ack(),
        })
    }

    fn read_range(&self, blob: &str, offset: u64, length: u64) -> Result<RangeRead> {
        self.record(Call::Read(blob.to_string(), offset, length), Op::Read)?;
        let blobs = self.blobs.lock().unwrap();
        let b = blobs.get(blob).ok_or_else(|| Self::not_found(blob))?;
        let mut data = b
            .pages
            .range(..=offset)
            .next_back()
            .filter(|(start, d)| offset < **start + d.len() as u64)
            .map(|(start, d)| {
                let from = (offset - start) as usize;
                let to = (from + length as usize).min(d.len());
                d[from..to].to_vec()
            })
            .unwrap_or_default();
        if let Some(limit) = *self.short_read.lock().unwrap() {
            data.truncate(limit);
        }
        Ok(RangeRead {
            data,
            ack: Self::ack(),
        })
    }

    fn write_range(&self, blob: &str, offset: u64, data: &[u8]) -> Result<BackendAck> {
        self.record(Call::Write(blob.to_string(), offset, data.len()), Op::Write)?;
        let mut blobs = self.blobs.lock().unwrap();
        let b = blobs.get_mut(blob).ok_or_else(|| Self::not_found(blob))?;
        let end = offset + data.len() as u64;
        if end > b.size {
            return Err(PbtrimError::Backend(format!(
                "write past end of blob: {end} > {}",
                b.size
            )));
        }
        b.punch(offset, end);
        b.pages.insert(offset, data.to_vec());
        Ok(Self::ack())
    }

    fn resize(&self, blob: &str, size: u64) -> Result<BackendAck> {
        self.record(Call::Resize(blob.to_string(), size), Op::Resize)?;
        let mut blobs = self.blobs.lock().unwrap();
        let b = blobs.get_mut(blob).ok_or_else(|| Self::not_found(blob))?;
        b.punch(size, u64::MAX);
        b.size = size;
        Ok(Self::ack())
    }
}

/// Console fed from a fixed list of responses. Pauses are recorded, not slept.
pub struct ScriptedConsole {
    responses: VecDeque<Response>,
    pub output: String,
    pub errors: Vec<String>,
    pub pauses: Vec<Duration>,
}

impl ScriptedConsole {
    pub fn new(responses: &[Response]) -> Self {
        Self {
            responses: responses.iter().copied().collect(),
            output: String::new(),
            errors: Vec::new(),
            pauses: Vec::new(),
        }
    }

    pub fn remaining_responses(&self) -> usize {
        self.responses.len()
    }
}

impl Console for ScriptedConsole {
    fn line(&mut self, text: &str) -> io::Result<()> {
        self.output.push_str(text);
        self.output.push('\n');
        Ok(())
    }

    fn print(&mut self, text: &str) -> io::Result<()> {
        self.output.push_str(text);
        Ok(())
    }

    fn read_response(&mut self) -> io::Result<Response> {
        Ok(self.responses.pop_front().unwrap_or(Response::EndOfInput))
    }

    fn pause(&mut self, duration: Duration) {
        self.pauses.push(duration);
    }

    fn error(&mut self, text: &str) -> io::Result<()> {
        self.errors.push(text.to_string());
        Ok(())
    }
}
