//! File-backed snapshot store.
//!
//! Layout: magic, version byte, then one frame per record:
//! `time (i64 LE, unix micros) | length (u32 LE) | bincode payload`.
//! Opening a file reads only frame headers; payloads are decoded on `load`.

use super::store::{SnapshotRecord, SnapshotStore};
use crate::error::{HistoryError, Result};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::fs::{File, OpenOptions};
use std::io::{BufReader, ErrorKind, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

const SNAPSHOT_MAGIC: &[u8] = b"ENTITY_ACTIVATIONS";
const SNAPSHOT_VERSION: u8 = 1;
const FRAME_HEADER_LEN: u64 = 12;

#[derive(Debug, Clone, Copy)]
struct FrameRef {
    time: DateTime<Utc>,
    offset: u64,
    len: u32,
}

pub struct SnapshotFile {
    path: PathBuf,
    file: Mutex<File>,
    frames: Vec<FrameRef>,
    size: u64,
}

impl SnapshotFile {
    /// Open or create a snapshot file and index its frames.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let mut file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .read(true)
            .write(true)
            .open(&path)?;

        let mut size = file.metadata()?.len();
        if size == 0 {
            file.write_all(SNAPSHOT_MAGIC)?;
            file.write_all(&[SNAPSHOT_VERSION])?;
            file.sync_all()?;
            size = SNAPSHOT_MAGIC.len() as u64 + 1;
        }

        file.seek(SeekFrom::Start(0))?;
        let frames = {
            let mut reader = BufReader::new(&mut file);
            read_header(&mut reader)?;
            index_frames(&mut reader, size)?
        };

        log::debug!(
            "Opened snapshot file {}: {} records",
            path.display(),
            frames.len()
        );

        Ok(Self {
            path,
            file: Mutex::new(file),
            frames,
            size,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn size(&self) -> u64 {
        self.size
    }
}

impl SnapshotStore for SnapshotFile {
    fn append(&mut self, record: SnapshotRecord) -> Result<()> {
        record.validate()?;
        let payload = bincode::serialize(&record)?;
        let len = u32::try_from(payload.len())
            .map_err(|_| HistoryError::Serialization("snapshot record too large".into()))?;

        let mut frame = Vec::with_capacity(FRAME_HEADER_LEN as usize + payload.len());
        frame.extend_from_slice(&record.time.timestamp_micros().to_le_bytes());
        frame.extend_from_slice(&len.to_le_bytes());
        frame.extend_from_slice(&payload);

        let file = self.file.get_mut();
        file.seek(SeekFrom::Start(self.size))?;
        file.write_all(&frame)?;
        file.sync_data()?;

        let frame_ref = FrameRef {
            time: record.time,
            offset: self.size + FRAME_HEADER_LEN,
            len,
        };
        self.size += frame.len() as u64;
        insert_sorted(&mut self.frames, frame_ref);
        Ok(())
    }

    fn times(&self) -> Result<Vec<DateTime<Utc>>> {
        Ok(self.frames.iter().map(|f| f.time).collect())
    }

    fn load(&self, index: usize) -> Result<SnapshotRecord> {
        let frame = self.frames.get(index).ok_or(HistoryError::InvalidFormat)?;
        let mut buf = vec![0u8; frame.len as usize];
        {
            let mut file = self.file.lock();
            file.seek(SeekFrom::Start(frame.offset))?;
            file.read_exact(&mut buf)?;
        }
        let record: SnapshotRecord = bincode::deserialize(&buf)?;
        record.validate()?;
        Ok(record)
    }

    fn len(&self) -> usize {
        self.frames.len()
    }
}

fn insert_sorted(frames: &mut Vec<FrameRef>, frame: FrameRef) {
    let at = frames.partition_point(|f| f.time <= frame.time);
    frames.insert(at, frame);
}

fn read_header<R: Read>(reader: &mut R) -> Result<()> {
    let mut magic = vec![0u8; SNAPSHOT_MAGIC.len()];
    reader.read_exact(&mut magic)?;
    if magic != SNAPSHOT_MAGIC {
        return Err(HistoryError::InvalidFormat);
    }

    let mut version = [0u8; 1];
    reader.read_exact(&mut version)?;
    if version[0] != SNAPSHOT_VERSION {
        return Err(HistoryError::InvalidFormat);
    }
    Ok(())
}

fn index_frames<R: Read + Seek>(reader: &mut R, size: u64) -> Result<Vec<FrameRef>> {
    let mut frames = Vec::new();
    let mut offset = SNAPSHOT_MAGIC.len() as u64 + 1;

    while offset < size {
        let mut header = [0u8; FRAME_HEADER_LEN as usize];
        match reader.read_exact(&mut header) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::UnexpectedEof => {
                log::warn!("Truncated snapshot frame header at offset {}", offset);
                return Err(HistoryError::InvalidFormat);
            }
            Err(e) => return Err(e.into()),
        }

        let mut micros = [0u8; 8];
        micros.copy_from_slice(&header[..8]);
        let mut len = [0u8; 4];
        len.copy_from_slice(&header[8..]);
        let len = u32::from_le_bytes(len);

        let time = DateTime::<Utc>::from_timestamp_micros(i64::from_le_bytes(micros))
            .ok_or(HistoryError::InvalidFormat)?;
        let payload_offset = offset + FRAME_HEADER_LEN;
        if payload_offset + u64::from(len) > size {
            return Err(HistoryError::InvalidFormat);
        }

        insert_sorted(
            &mut frames,
            FrameRef {
                time,
                offset: payload_offset,
                len,
            },
        );
        reader.seek(SeekFrom::Current(i64::from(len)))?;
        offset = payload_offset + u64::from(len);
    }

    Ok(frames)
}
