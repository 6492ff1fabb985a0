use std::fs::{self, File, OpenOptions};
use std::io::{self, BufReader, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, RwLock};

use tracing::{debug, info, warn};
use trail_types::{CdoSnapshot, Commit, CommitId, GlobalId};

use crate::error::{StoreError, StoreResult};
use crate::memory::SnapshotIndex;
use crate::traits::SnapshotRepository;

/// Header size: 4 bytes length + 4 bytes CRC.
const HEADER_SIZE: usize = 8;

/// Durable snapshot repository backed by an append-only commit log.
///
/// On-disk format, one record per commit:
/// ```text
/// [4 bytes: payload length (little-endian u32)]
/// [4 bytes: CRC32 of payload (little-endian u32)]
/// [N bytes: payload (JSON-serialized Commit)]
/// ```
///
/// A commit is encoded into one buffer, written and synced before it becomes
/// visible. A failed write is truncated away, so it lands entirely or not at
/// all. On open the log is replayed
/// into an in-memory index; records that fail the CRC check or do not decode
/// are skipped, and a torn tail ends the replay.
pub struct JsonFileRepository {
    path: PathBuf,
    writer: Mutex<LogWriter<File>>,
    index: RwLock<SnapshotIndex>,
    next_commit: AtomicU64,
}

impl JsonFileRepository {
    /// Open (or create) the commit log at `path`.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(path)?;

        let mut index = SnapshotIndex::default();
        let mut recovered = 0usize;
        for commit in recover(path)? {
            if let Err(e) = index.validate(&commit) {
                warn!(commit = %commit.id(), error = %e, "inconsistent commit in log; skipping");
                continue;
            }
            index.apply(&commit);
            recovered += 1;
        }
        let next = index.last_commit().map_or(1, |last| last.0 + 1);
        info!(path = %path.display(), commits = recovered, "opened commit log");

        Ok(Self {
            path: path.to_path_buf(),
            writer: Mutex::new(LogWriter::new(file)),
            index: RwLock::new(index),
            next_commit: AtomicU64::new(next),
        })
    }

    /// Path to the commit log.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SnapshotRepository for JsonFileRepository {
    fn get_latest(&self, global_id: &GlobalId) -> StoreResult<Option<CdoSnapshot>> {
        let index = self.index.read().map_err(|_| StoreError::LockPoisoned)?;
        Ok(index.latest(global_id).cloned())
    }

    fn get_state_history(
        &self,
        global_id: &GlobalId,
        limit: usize,
    ) -> StoreResult<Vec<CdoSnapshot>> {
        let index = self.index.read().map_err(|_| StoreError::LockPoisoned)?;
        Ok(index.history(global_id, limit))
    }

    fn persist(&self, commit: &Commit) -> StoreResult<()> {
        let mut writer = self.writer.lock().map_err(|_| StoreError::LockPoisoned)?;
        self.index
            .read()
            .map_err(|_| StoreError::LockPoisoned)?
            .validate(commit)?;

        let record = encode_record(commit)?;
        writer.append(&record)?;

        self.index
            .write()
            .map_err(|_| StoreError::LockPoisoned)?
            .apply(commit);
        debug!(commit = %commit.id(), len = record.len(), "appended commit record");
        Ok(())
    }

    fn next_commit_id(&self) -> StoreResult<CommitId> {
        Ok(CommitId(self.next_commit.fetch_add(1, Ordering::SeqCst)))
    }

    fn global_ids(&self) -> StoreResult<Vec<GlobalId>> {
        let index = self.index.read().map_err(|_| StoreError::LockPoisoned)?;
        Ok(index.global_ids())
    }
}

impl std::fmt::Debug for JsonFileRepository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JsonFileRepository")
            .field("path", &self.path)
            .finish()
    }
}

/// Frame `commit` as one length and CRC prefixed record.
fn encode_record(commit: &Commit) -> StoreResult<Vec<u8>> {
    let payload =
        serde_json::to_vec(commit).map_err(|e| StoreError::Serialization(e.to_string()))?;
    let length = u32::try_from(payload.len()).map_err(|_| {
        StoreError::Serialization(format!("commit too large: {} bytes", payload.len()))
    })?;
    let mut record = Vec::with_capacity(HEADER_SIZE + payload.len());
    record.extend_from_slice(&length.to_le_bytes());
    record.extend_from_slice(&crc32fast::hash(&payload).to_le_bytes());
    record.extend_from_slice(&payload);
    Ok(record)
}

/// What the writer needs from the file underneath it.
trait LogFile: Write {
    fn end(&mut self) -> io::Result<u64>;
    fn truncate(&mut self, len: u64) -> io::Result<()>;
    fn sync(&mut self) -> io::Result<()>;
}

impl LogFile for File {
    fn end(&mut self) -> io::Result<u64> {
        Ok(self.metadata()?.len())
    }

    fn truncate(&mut self, len: u64) -> io::Result<()> {
        self.set_len(len)
    }

    fn sync(&mut self) -> io::Result<()> {
        self.sync_all()
    }
}

/// Appends whole records, cutting the log back to its previous end when a
/// write or sync fails.
struct LogWriter<L> {
    log: L,
    broken: bool,
}

impl<L: LogFile> LogWriter<L> {
    fn new(log: L) -> Self {
        Self { log, broken: false }
    }

    fn append(&mut self, record: &[u8]) -> StoreResult<()> {
        if self.broken {
            return Err(StoreError::LogUnusable(
                "an earlier failed append left a partial record".into(),
            ));
        }
        let end = self.log.end()?;
        let written = self.log.write_all(record).and_then(|()| self.log.sync());
        let Err(e) = written else {
            return Ok(());
        };
        warn!(end, error = %e, "commit record write failed; truncating");
        if let Err(rollback) = self.log.truncate(end) {
            self.broken = true;
            return Err(StoreError::LogUnusable(format!(
                "write failed ({e}) and truncation failed ({rollback})"
            )));
        }
        Err(e.into())
    }
}

/// Read every intact commit record from the log, front to back.
fn recover(path: &Path) -> StoreResult<Vec<Commit>> {
    let mut bytes = Vec::new();
    BufReader::new(File::open(path)?).read_to_end(&mut bytes)?;

    let mut commits = Vec::new();
    let mut offset = 0usize;
    while offset + HEADER_SIZE <= bytes.len() {
        let header = &bytes[offset..offset + HEADER_SIZE];
        let length = u32::from_le_bytes([header[0], header[1], header[2], header[3]]) as usize;
        let expected_crc = u32::from_le_bytes([header[4], header[5], header[6], header[7]]);

        let start = offset + HEADER_SIZE;
        if length == 0 || start + length > bytes.len() {
            warn!(offset, length, file_len = bytes.len(), "torn commit record; stopping recovery");
            break;
        }
        let payload = &bytes[start..start + length];
        offset = start + length;

        let actual_crc = crc32fast::hash(payload);
        if actual_crc != expected_crc {
            warn!(
                offset = start - HEADER_SIZE,
                expected = expected_crc,
                actual = actual_crc,
                "CRC mismatch; skipping commit record"
            );
            continue;
        }
        match serde_json::from_slice::<Commit>(payload) {
            Ok(commit) => commits.push(commit),
            Err(e) => {
                warn!(offset = start - HEADER_SIZE, error = %e, "undecodable commit record; skipping");
            }
        }
    }
    if offset < bytes.len() && offset + HEADER_SIZE > bytes.len() {
        warn!(offset, file_len = bytes.len(), "partial record header at end of log");
    }
    debug!(recovered = commits.len(), "commit log recovery complete");
    Ok(commits)
}
