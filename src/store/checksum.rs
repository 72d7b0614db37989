//! CRC32 framing for persisted records
//!
//! Record format:
//!
//! ```text
//! +------------------+
//! | Payload Length   | (u32 LE)
//! +------------------+
//! | Payload          | (bytes)
//! +------------------+
//! | Checksum         | (u32 LE, over length + payload)
//! +------------------+
//! ```

use crc32fast::Hasher;

use super::errors::{StoreError, StoreResult};

/// Computes a CRC32 checksum over the provided data.
pub fn compute_checksum(data: &[u8]) -> u32 {
    let mut hasher = Hasher::new();
    hasher.update(data);
    hasher.finalize()
}

/// Wrap a payload into a checksummed record
pub fn frame(payload: &[u8]) -> Vec<u8> {
    let mut record = Vec::with_capacity(payload.len() + 8);
    record.extend_from_slice(&(payload.len() as u32).to_le_bytes());
    record.extend_from_slice(payload);
    let checksum = compute_checksum(&record);
    record.extend_from_slice(&checksum.to_le_bytes());
    record
}

/// Verify a framed record and return its payload
pub fn unframe(record: &[u8]) -> StoreResult<Vec<u8>> {
    if record.len() < 8 {
        return Err(StoreError::Corrupted(format!(
            "record too short: {} bytes",
            record.len()
        )));
    }

    let len = u32::from_le_bytes([record[0], record[1], record[2], record[3]]) as usize;
    if record.len() != len + 8 {
        return Err(StoreError::Corrupted(format!(
            "length mismatch: header says {} bytes, record holds {}",
            len,
            record.len() - 8
        )));
    }

    let checksum_offset = 4 + len;
    let stored = u32::from_le_bytes([
        record[checksum_offset],
        record[checksum_offset + 1],
        record[checksum_offset + 2],
        record[checksum_offset + 3],
    ]);
    let computed = compute_checksum(&record[..checksum_offset]);
    if computed != stored {
        return Err(StoreError::Corrupted(format!(
            "checksum mismatch: computed {:08x}, stored {:08x}",
            computed, stored
        )));
    }

    Ok(record[4..checksum_offset].to_vec())
}
