//! Byte-level persistence of a [`HistogramStore`].
//!
//! Layout, little endian:
//!
//! ```text
//! header (16 bytes): magic "THST" | version u16 | header_len u16 | entry_count u32 | crc32 u32
//! entries:           minute_epoch_secs i64 | count u64   (x entry_count, ascending)
//! ```
//!
//! The checksum covers the entry section only.

use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

use crc32fast::Hasher;
use tracing::info;

use crate::constants::SECONDS_PER_MINUTE;
use crate::error::{Error, Result};
use crate::store::{epoch_seconds, from_epoch_seconds, HistogramStore};

pub const MAGIC: [u8; 4] = *b"THST";
pub const VERSION: u16 = 1;
pub const HEADER_LEN: usize = 16;
pub const ENTRY_LEN: usize = 16;

#[derive(Debug, Clone, Copy)]
struct Header {
    entry_count: u32,
    crc32: u32,
}

pub fn encode(store: &HistogramStore) -> Result<Vec<u8>> {
    let entry_count = u32::try_from(store.len())
        .map_err(|_| Error::Unsupported(format!("{} entries exceed u32", store.len())))?;

    let mut payload = Vec::with_capacity(store.len() * ENTRY_LEN);
    for (minute, count) in store {
        payload.extend_from_slice(&epoch_seconds(minute).to_le_bytes());
        payload.extend_from_slice(&count.to_le_bytes());
    }

    let mut hasher = Hasher::new();
    hasher.update(&payload);
    let header = Header {
        entry_count,
        crc32: hasher.finalize(),
    };

    let mut bytes = Vec::with_capacity(HEADER_LEN + payload.len());
    write_header(&mut bytes, &header);
    bytes.extend_from_slice(&payload);
    Ok(bytes)
}

pub fn decode(bytes: &[u8]) -> Result<HistogramStore> {
    let header = read_header(bytes)?;
    let payload = &bytes[HEADER_LEN..];

    let expected = header.entry_count as usize * ENTRY_LEN;
    if payload.len() != expected {
        return Err(Error::Corrupt(format!(
            "expected {expected} entry bytes, found {}",
            payload.len()
        )));
    }

    let mut hasher = Hasher::new();
    hasher.update(payload);
    if hasher.finalize() != header.crc32 {
        return Err(Error::Corrupt("checksum mismatch".into()));
    }

    let mut store = HistogramStore::new();
    let mut previous: Option<i64> = None;
    for entry in payload.chunks_exact(ENTRY_LEN) {
        let secs = i64::from_le_bytes(le_array(&entry[..8]));
        let count = u64::from_le_bytes(le_array(&entry[8..]));

        if secs.rem_euclid(SECONDS_PER_MINUTE) != 0 {
            return Err(Error::Corrupt(format!("key {secs} is not minute aligned")));
        }
        if previous.is_some_and(|prev| prev >= secs) {
            return Err(Error::Corrupt(format!("key {secs} is out of order")));
        }
        if count == 0 {
            return Err(Error::Corrupt(format!("key {secs} has a zero count")));
        }
        let minute = from_epoch_seconds(secs).map_err(|_| {
            Error::Corrupt(format!("key {secs} is outside the representable range"))
        })?;
        store.add(minute, count);
        previous = Some(secs);
    }
    Ok(store)
}

pub fn write_snapshot(path: &Path, store: &HistogramStore) -> Result<()> {
    let bytes = encode(store)?;
    let mut file = File::create(path)?;
    file.write_all(&bytes)?;
    file.sync_all()?;
    info!(path = %path.display(), entries = store.len(), "wrote snapshot");
    Ok(())
}

pub fn read_snapshot(path: &Path) -> Result<HistogramStore> {
    let bytes = fs::read(path)?;
    let store = decode(&bytes)?;
    info!(path = %path.display(), entries = store.len(), "read snapshot");
    Ok(store)
}

impl HistogramStore {
    pub fn serialize(&self) -> Result<Vec<u8>> {
        encode(self)
    }

    pub fn deserialize(bytes: &[u8]) -> Result<Self> {
        decode(bytes)
    }
}

fn write_header(out: &mut Vec<u8>, header: &Header) {
    out.extend_from_slice(&MAGIC);
    out.extend_from_slice(&VERSION.to_le_bytes());
    out.extend_from_slice(&(HEADER_LEN as u16).to_le_bytes());
    out.extend_from_slice(&header.entry_count.to_le_bytes());
    out.extend_from_slice(&header.crc32.to_le_bytes());
}

fn read_header(bytes: &[u8]) -> Result<Header> {
    if bytes.len() < HEADER_LEN {
        return Err(Error::Corrupt(format!(
            "snapshot is {} bytes, shorter than its header",
            bytes.len()
        )));
    }
    if bytes[..4] != MAGIC {
        return Err(Error::Corrupt("bad magic".into()));
    }

    let version = u16::from_le_bytes(le_array(&bytes[4..6]));
    if version != VERSION {
        return Err(Error::Unsupported(format!("unsupported version: {version}")));
    }

    let header_len = u16::from_le_bytes(le_array(&bytes[6..8]));
    if header_len as usize != HEADER_LEN {
        return Err(Error::Corrupt("header length mismatch".into()));
    }

    Ok(Header {
        entry_count: u32::from_le_bytes(le_array(&bytes[8..12])),
        crc32: u32::from_le_bytes(le_array(&bytes[12..16])),
    })
}

// Callers always pass slices of exactly N bytes.
fn le_array<const N: usize>(slice: &[u8]) -> [u8; N] {
    let mut out = [0u8; N];
    out.copy_from_slice(slice);
    out
}
