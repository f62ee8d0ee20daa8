//! Directory content codec.
//!
//! A directory's content is a packed array of fixed-width entries:
//!
//! ```text
//! | name: 28 bytes, NUL padded | descriptor id: u32 little-endian |
//! ```
//!
//! Entries keep their insertion order. Removing one shifts the survivors
//! left by one slot without reordering them.

use crate::fs::{
    config::{DIR_ENTRY_SIZE, MAX_NAME_LEN},
    descriptor::DescriptorId,
    error::{FileSystemError, Result},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    pub name: String,
    pub descriptor_id: DescriptorId,
}

impl DirEntry {
    pub fn new(name: &str, descriptor_id: DescriptorId) -> Self {
        Self {
            name: name.to_string(),
            descriptor_id,
        }
    }

    pub fn encode(&self) -> [u8; DIR_ENTRY_SIZE] {
        let mut raw = [0u8; DIR_ENTRY_SIZE];
        let name = self.name.as_bytes();
        raw[..name.len()].copy_from_slice(name);
        raw[MAX_NAME_LEN..].copy_from_slice(&self.descriptor_id.to_le_bytes());
        raw
    }

    pub fn decode(raw: &[u8]) -> Result<Self> {
        if raw.len() != DIR_ENTRY_SIZE {
            return Err(FileSystemError::Corrupted(format!(
                "directory entry of {} bytes",
                raw.len()
            )));
        }
        let name_field = &raw[..MAX_NAME_LEN];
        let end = name_field
            .iter()
            .position(|&b| b == 0)
            .unwrap_or(MAX_NAME_LEN);
        if end == 0 {
            return Err(FileSystemError::Corrupted(
                "directory entry with empty name".to_string(),
            ));
        }
        let name = std::str::from_utf8(&name_field[..end])
            .map_err(|e| FileSystemError::Corrupted(format!("directory entry name: {}", e)))?;
        let id = [
            raw[MAX_NAME_LEN],
            raw[MAX_NAME_LEN + 1],
            raw[MAX_NAME_LEN + 2],
            raw[MAX_NAME_LEN + 3],
        ];

        Ok(Self::new(name, DescriptorId::from_le_bytes(id)))
    }
}

/// Checks that `name` can be stored in a directory entry.
pub fn validate_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(FileSystemError::InvalidPath("empty file name".to_string()));
    }
    if name.contains('/') || name.contains('\0') {
        return Err(FileSystemError::InvalidPath(name.to_string()));
    }
    if name.len() > MAX_NAME_LEN {
        return Err(FileSystemError::NameTooLong(name.to_string()));
    }
    Ok(())
}

pub fn encode(entries: &[DirEntry]) -> Vec<u8> {
    entries.iter().flat_map(DirEntry::encode).collect()
}

pub fn decode(bytes: &[u8]) -> Result<Vec<DirEntry>> {
    if bytes.len() % DIR_ENTRY_SIZE != 0 {
        return Err(FileSystemError::Corrupted(format!(
            "directory content of {} bytes",
            bytes.len()
        )));
    }
    bytes.chunks_exact(DIR_ENTRY_SIZE).map(DirEntry::decode).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Vec<DirEntry> {
        vec![
            DirEntry::new(".", 3),
            DirEntry::new("..", 0),
            DirEntry::new("notes.txt", 7),
            DirEntry::new("a-name-of-exactly-28-bytes!!", 65_536),
        ]
    }

    #[test]
    fn decode_preserves_storage_order() {
        let entries = sample();
        let bytes = encode(&entries);
        assert_eq!(bytes.len(), entries.len() * DIR_ENTRY_SIZE);
        assert_eq!(decode(&bytes).unwrap(), entries);
    }

    #[test]
    fn removing_a_slot_keeps_neighbours_intact() {
        let mut entries = sample();
        let bytes = encode(&entries);

        let mut compacted = bytes[..2 * DIR_ENTRY_SIZE].to_vec();
        compacted.extend_from_slice(&bytes[3 * DIR_ENTRY_SIZE..]);
        entries.remove(2);

        assert_eq!(decode(&compacted).unwrap(), entries);
    }

    #[test]
    fn appending_does_not_touch_existing_bytes() {
        let entries = sample();
        let mut bytes = encode(&entries[..2]);
        let before = bytes.clone();
        bytes.extend_from_slice(&entries[2].encode());

        assert_eq!(&bytes[..before.len()], &before[..]);
        assert_eq!(decode(&bytes).unwrap(), entries[..3].to_vec());
    }

    #[test]
    fn ragged_content_is_corrupt() {
        assert!(matches!(
            decode(&[0u8; DIR_ENTRY_SIZE + 1]),
            Err(FileSystemError::Corrupted(_))
        ));
        assert!(matches!(
            decode(&[0u8; DIR_ENTRY_SIZE]),
            Err(FileSystemError::Corrupted(_))
        ));
    }

    #[test]
    fn names_are_validated() {
        assert!(validate_name("ok").is_ok());
        assert!(validate_name(&"x".repeat(MAX_NAME_LEN)).is_ok());
        assert!(matches!(
            validate_name(&"x".repeat(MAX_NAME_LEN + 1)),
            Err(FileSystemError::NameTooLong(_))
        ));
        assert!(matches!(
            validate_name("a/b"),
            Err(FileSystemError::InvalidPath(_))
        ));
        assert!(matches!(
            validate_name(""),
            Err(FileSystemError::InvalidPath(_))
        ));
    }
}
