//! Persistent storage for the learned remote profile.
//!
//! The device keeps exactly one record at a fixed offset of a byte store. The record is written
//! in a single `put` and only once a profile is complete, so a power loss during learning leaves
//! the previous record untouched.
//!
//! # Record format
//!
//! - Magic number (4 bytes): `0x4652_5043` ('CRPF')
//! - Payload length (2 bytes)
//! - Payload: postcard-serialized [`RemoteProfile`]
//! - CRC32 (4 bytes) of everything before it

use crc32fast::Hasher;

use crate::profile::RemoteProfile;
use crate::{Error, Result};

/// Raw byte storage with a single fixed record slot.
pub trait ByteStore {
    /// Fill `buffer` with the bytes stored at `offset`.
    ///
    /// # Errors
    /// Returns an error if the range is outside the store or the medium fails.
    fn get(&mut self, offset: u32, buffer: &mut [u8]) -> Result<()>;

    /// Overwrite the bytes at `offset`.
    ///
    /// # Errors
    /// Returns an error if the range is outside the store or the medium fails.
    fn put(&mut self, offset: u32, bytes: &[u8]) -> Result<()>;
}

const MAGIC: u32 = 0x4652_5043; // 'CRPF'
const HEADER_SIZE: usize = 4 + 2; // Magic + PayloadLen
const CRC_SIZE: usize = 4;
const MAX_PAYLOAD_SIZE: usize = 24;
/// Bytes reserved for the record in the byte store.
pub const RECORD_SIZE: usize = HEADER_SIZE + MAX_PAYLOAD_SIZE + CRC_SIZE;
const RECORD_OFFSET: u32 = 0;

/// Reads and writes the learned [`RemoteProfile`] record.
pub struct ProfileStore<S> {
    store: S,
}

impl<S: ByteStore> ProfileStore<S> {
    #[must_use]
    pub const fn new(store: S) -> Self {
        Self { store }
    }

    /// Give back the underlying byte store.
    pub fn into_inner(self) -> S {
        self.store
    }

    /// Load the stored profile.
    ///
    /// Returns `Ok(None)` when the slot holds no record.
    ///
    /// # Errors
    /// Returns [`Error::StorageCorrupted`] if a record is present but damaged or incomplete.
    pub fn load(&mut self) -> Result<Option<RemoteProfile>> {
        let mut buffer = [0u8; RECORD_SIZE];
        self.store.get(RECORD_OFFSET, &mut buffer)?;

        let (magic, rest) = buffer
            .split_first_chunk::<4>()
            .ok_or(Error::StorageCorrupted)?;
        if u32::from_le_bytes(*magic) != MAGIC {
            info!("Store: no learned profile");
            return Ok(None);
        }

        let (len, rest) = rest
            .split_first_chunk::<2>()
            .ok_or(Error::StorageCorrupted)?;
        let payload_len = usize::from(u16::from_le_bytes(*len));
        if payload_len > MAX_PAYLOAD_SIZE {
            error!("Store: invalid payload length {}", payload_len);
            return Err(Error::StorageCorrupted);
        }

        let (payload, rest) = rest
            .split_at_checked(payload_len)
            .ok_or(Error::StorageCorrupted)?;
        let (stored_crc, _) = rest
            .split_first_chunk::<CRC_SIZE>()
            .ok_or(Error::StorageCorrupted)?;
        let stored_crc = u32::from_le_bytes(*stored_crc);
        let computed_crc = compute_crc(&[magic.as_slice(), len.as_slice(), payload]);
        if stored_crc != computed_crc {
            error!(
                "Store: CRC mismatch (expected {}, found {})",
                computed_crc, stored_crc
            );
            return Err(Error::StorageCorrupted);
        }

        let profile: RemoteProfile = postcard::from_bytes(payload)
            .map_err(|_| {
                error!("Store: profile deserialization failed");
                Error::StorageCorrupted
            })?;
        if !profile.is_complete() {
            error!("Store: stored profile is incomplete");
            return Err(Error::StorageCorrupted);
        }

        info!("Store: loaded profile for address 0x{:04X}", profile.address);
        Ok(Some(profile))
    }

    /// Persist a complete profile, replacing the previous record.
    ///
    /// # Errors
    /// Returns [`Error::ProfileIncomplete`] for a profile with unfilled slots, or the store's
    /// error if the write fails.
    pub fn save(&mut self, profile: &RemoteProfile) -> Result<()> {
        if !profile.is_complete() {
            return Err(Error::ProfileIncomplete);
        }

        let mut payload_buffer = [0u8; MAX_PAYLOAD_SIZE];
        let payload = postcard::to_slice(profile, &mut payload_buffer).map_err(|_| {
            error!(
                "Store: serialization failed (max {} bytes)",
                MAX_PAYLOAD_SIZE
            );
            Error::FormatError
        })?;
        let payload: &[u8] = payload;
        let payload_len = payload.len();

        let magic = MAGIC.to_le_bytes();
        let len = u16::try_from(payload_len)
            .map_err(|_| Error::FormatError)?
            .to_le_bytes();
        let crc = compute_crc(&[magic.as_slice(), len.as_slice(), payload]).to_le_bytes();

        // Unused bytes after the CRC stay erased.
        let mut buffer = [0xFFu8; RECORD_SIZE];
        let record = magic.iter().chain(&len).chain(payload).chain(&crc);
        for (slot, byte) in buffer.iter_mut().zip(record) {
            *slot = *byte;
        }

        self.store.put(RECORD_OFFSET, &buffer)?;
        info!(
            "Store: saved profile for address 0x{:04X} ({} bytes)",
            profile.address, payload_len
        );
        Ok(())
    }
}

/// CRC32 over the concatenation of `parts`.
fn compute_crc(parts: &[&[u8]]) -> u32 {
    let mut hasher = Hasher::new();
    for part in parts {
        hasher.update(part);
    }
    hasher.finalize()
}
