//! Table file I/O operations
//!
//! This module provides functions for reading and writing rainbow table files.
//! A file is a `TableHeader` followed by `num_chains` little-endian
//! `(start, end)` records.

use crate::constants::{CHAIN_ENTRY_SIZE, FILE_HEADER_SIZE};
use crate::domain::chain::ChainEntry;
use crate::domain::table::RainbowTable;
use crate::domain::table_format::{
    TableFormatError, TableHeader, ValidationOptions, expected_file_size, validate_header,
};
use crate::error::RainbowResult;
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

#[cfg(feature = "mmap")]
use memmap2::Mmap;

/// Save table to file
///
/// The table is written to a temporary sibling file which is then renamed
/// over `path`, so readers never observe a partially written table.
pub fn save_table(path: impl AsRef<Path>, table: &RainbowTable) -> RainbowResult<()> {
    let path = path.as_ref();
    let tmp_path = temp_path(path);

    let mut header = table.header().clone();
    header.num_chains = table.len() as u64;

    let result = write_table_file(&tmp_path, &header, table.entries());
    if result.is_err() {
        fs::remove_file(&tmp_path).ok();
    }
    result?;

    fs::rename(&tmp_path, path)?;
    debug!(path = %path.display(), chains = table.len(), "table written");

    Ok(())
}

fn write_table_file(path: &Path, header: &TableHeader, entries: &[ChainEntry]) -> RainbowResult<()> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);

    writer.write_all(&header.to_bytes())?;
    for entry in entries {
        writer.write_u64::<LittleEndian>(entry.start)?;
        writer.write_u64::<LittleEndian>(entry.end)?;
    }

    writer.flush()?;
    writer.into_inner().map_err(|e| e.into_error())?.sync_all()?;

    Ok(())
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(OsString::from)
        .unwrap_or_else(|| OsString::from("table"));
    name.push(".tmp");
    path.with_file_name(name)
}

/// Load table from file
///
/// Checks the magic, version, header sanity and file size.
pub fn load_table(path: impl AsRef<Path>) -> RainbowResult<RainbowTable> {
    load_table_validated(path, &ValidationOptions::for_inspection())
}

/// Load table from file and validate its header before reading any entry
pub fn load_table_validated(
    path: impl AsRef<Path>,
    options: &ValidationOptions,
) -> RainbowResult<RainbowTable> {
    let file = File::open(path.as_ref())?;
    let file_size = file.metadata()?.len();

    let mut reader = BufReader::new(file);
    let header = read_header(&mut reader, file_size)?;
    validate_header(&header, options)?;

    let mut entries = Vec::with_capacity(header.num_chains as usize);
    for _ in 0..header.num_chains {
        let start = reader.read_u64::<LittleEndian>()?;
        let end = reader.read_u64::<LittleEndian>()?;
        entries.push(ChainEntry { start, end });
    }

    debug!(
        path = %path.as_ref().display(),
        chains = entries.len(),
        chain_length = header.chain_length,
        "table loaded"
    );

    Ok(RainbowTable::from_parts(header, entries))
}

/// Read only the header of a table file
pub fn read_table_header(path: impl AsRef<Path>) -> RainbowResult<TableHeader> {
    let file = File::open(path)?;
    let file_size = file.metadata()?.len();
    let mut reader = BufReader::new(file);
    read_header(&mut reader, file_size)
}

fn read_header<R: Read>(reader: &mut R, file_size: u64) -> RainbowResult<TableHeader> {
    if file_size < FILE_HEADER_SIZE as u64 {
        return Err(TableFormatError::InvalidFileSize {
            expected: FILE_HEADER_SIZE as u64,
            found: file_size,
        }
        .into());
    }

    let mut buf = [0u8; FILE_HEADER_SIZE];
    reader.read_exact(&mut buf)?;
    let header = TableHeader::from_bytes(&buf)?;

    let expected = expected_file_size(&header)?;
    if expected != file_size {
        return Err(TableFormatError::InvalidFileSize {
            expected,
            found: file_size,
        }
        .into());
    }

    Ok(header)
}

// =============================================================================
// Memory-mapped table I/O (mmap feature)
// =============================================================================

/// Memory-mapped rainbow table
///
/// Read-only access to a table file without loading it into memory.
/// The OS manages paging of the chain records.
#[cfg(feature = "mmap")]
pub struct MappedTable {
    mmap: Mmap,
    header: TableHeader,
    len: usize,
}

#[cfg(feature = "mmap")]
impl MappedTable {
    /// Open a table file as memory-mapped
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened or mapped, or if its
    /// header or size is invalid.
    pub fn open(path: impl AsRef<Path>) -> RainbowResult<Self> {
        let file = File::open(path)?;
        let file_size = file.metadata()?.len();

        // SAFETY: the mapping is read-only and table files are never
        // modified in place (writes go through a rename).
        let mmap = unsafe { Mmap::map(&file)? };

        let header = read_header(&mut &mmap[..], file_size)?;
        let len = header.num_chains as usize;

        Ok(Self { mmap, header, len })
    }

    /// Open a table file and validate its header
    pub fn open_validated(
        path: impl AsRef<Path>,
        options: &ValidationOptions,
    ) -> RainbowResult<Self> {
        let table = Self::open(path)?;
        validate_header(&table.header, options)?;
        Ok(table)
    }

    pub fn header(&self) -> &TableHeader {
        &self.header
    }

    /// Get the number of entries
    pub fn len(&self) -> usize {
        self.len
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Get an entry by index
    ///
    /// Returns `None` if the index is out of bounds.
    pub fn get(&self, index: usize) -> Option<ChainEntry> {
        if index >= self.len {
            return None;
        }

        let offset = FILE_HEADER_SIZE + index * CHAIN_ENTRY_SIZE;
        let mut bytes = &self.mmap[offset..offset + CHAIN_ENTRY_SIZE];

        let start = bytes.read_u64::<LittleEndian>().ok()?;
        let end = bytes.read_u64::<LittleEndian>().ok()?;

        Some(ChainEntry { start, end })
    }

    /// Get a slice view as ChainEntry array
    ///
    /// Zero-copy access to the chain records. Only available on
    /// little-endian platforms, where the file layout matches the in-memory
    /// layout of `ChainEntry`.
    ///
    /// # Panics
    ///
    /// Panics if the mapping is not aligned for `ChainEntry`.
    #[cfg(target_endian = "little")]
    pub fn as_slice(&self) -> &[ChainEntry] {
        let data = &self.mmap[FILE_HEADER_SIZE..];
        let ptr = data.as_ptr();
        assert_eq!(
            ptr as usize % std::mem::align_of::<ChainEntry>(),
            0,
            "Memory-mapped data is not properly aligned for ChainEntry"
        );

        // SAFETY: ChainEntry is repr(C) with two u64 fields, the file size
        // was checked against num_chains in open(), and alignment is asserted.
        unsafe { std::slice::from_raw_parts(ptr as *const ChainEntry, self.len) }
    }

    /// Copy the mapped records into an owned table
    pub fn to_table(&self) -> RainbowTable {
        RainbowTable::from_parts(self.header.clone(), self.iter().collect())
    }

    /// Return an iterator over entries
    pub fn iter(&self) -> impl Iterator<Item = ChainEntry> + '_ {
        (0..self.len).filter_map(move |i| self.get(i))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::config::Configuration;
    use crate::error::RainbowError;
    use tempfile::tempdir;

    fn config() -> Configuration {
        Configuration::new(3, 100).unwrap()
    }

    fn sample_table() -> RainbowTable {
        RainbowTable::from_sorted(
            &config(),
            vec![
                ChainEntry::new(1, 100),
                ChainEntry::new(2, 200),
                ChainEntry::new(3, 300),
            ],
        )
    }

    #[test]
    fn test_save_and_load_table() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("table.rt");

        let table = sample_table();
        save_table(&path, &table).unwrap();
        let loaded = load_table(&path).unwrap();

        assert_eq!(loaded, table);
        assert!(!dir.path().join("table.rt.tmp").exists());
    }

    #[test]
    fn test_save_empty_table() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("empty.rt");

        save_table(&path, &RainbowTable::from_sorted(&config(), vec![])).unwrap();
        let loaded = load_table(&path).unwrap();

        assert!(loaded.is_empty());
        assert_eq!(fs::metadata(&path).unwrap().len(), FILE_HEADER_SIZE as u64);
    }

    #[test]
    fn test_save_overwrites_existing() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("table.rt");
        fs::write(&path, b"garbage").unwrap();

        save_table(&path, &sample_table()).unwrap();
        assert_eq!(load_table(&path).unwrap().len(), 3);
    }

    #[test]
    fn test_load_nonexistent_file() {
        assert!(matches!(
            load_table("/nonexistent/path/file.rt"),
            Err(RainbowError::Io(_))
        ));
    }

    #[test]
    fn test_load_truncated_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("table.rt");
        save_table(&path, &sample_table()).unwrap();

        let bytes = fs::read(&path).unwrap();
        fs::write(&path, &bytes[..bytes.len() - 4]).unwrap();

        assert!(matches!(
            load_table(&path),
            Err(RainbowError::TableFormat(
                TableFormatError::InvalidFileSize { .. }
            ))
        ));
    }

    #[test]
    fn test_load_short_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("short.rt");
        fs::write(&path, b"DESRBWTB").unwrap();

        assert!(matches!(
            load_table(&path),
            Err(RainbowError::TableFormat(
                TableFormatError::InvalidFileSize { .. }
            ))
        ));
    }

    #[test]
    fn test_load_validated_rejects_mismatch() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("table.rt");
        save_table(&path, &sample_table()).unwrap();

        let other = Configuration::new(3, 50).unwrap();
        assert!(matches!(
            load_table_validated(&path, &ValidationOptions::for_crack(&other)),
            Err(RainbowError::ConfigMismatch { .. })
        ));
        assert!(load_table_validated(&path, &ValidationOptions::for_crack(&config())).is_ok());
    }

    #[test]
    fn test_read_table_header() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("table.rt");
        save_table(&path, &sample_table()).unwrap();

        let header = read_table_header(&path).unwrap();
        assert_eq!(header.num_chains, 3);
        assert_eq!(header.chain_length, 100);
    }

    #[test]
    fn test_file_format_little_endian() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("endian.rt");

        let table =
            RainbowTable::from_sorted(&config(), vec![ChainEntry::new(0x12345678, 0xABCDEF00)]);
        save_table(&path, &table).unwrap();

        let bytes = fs::read(&path).unwrap();
        assert_eq!(bytes.len(), FILE_HEADER_SIZE + CHAIN_ENTRY_SIZE);

        let record = &bytes[FILE_HEADER_SIZE..];
        assert_eq!(&record[0..8], &0x12345678u64.to_le_bytes());
        assert_eq!(&record[8..16], &0xABCDEF00u64.to_le_bytes());
    }

    #[cfg(feature = "mmap")]
    #[test]
    fn test_mapped_table_read() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("mmap.rt");
        save_table(&path, &sample_table()).unwrap();

        let table = MappedTable::open(&path).unwrap();

        assert_eq!(table.len(), 3);
        assert!(!table.is_empty());
        assert_eq!(table.get(0), Some(ChainEntry::new(1, 100)));
        assert_eq!(table.get(2), Some(ChainEntry::new(3, 300)));
        assert_eq!(table.get(3), None);
        assert_eq!(table.header().chain_length, 100);
    }

    #[cfg(all(feature = "mmap", target_endian = "little"))]
    #[test]
    fn test_mapped_table_matches_load_table() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("mmap.rt");
        save_table(&path, &sample_table()).unwrap();

        let loaded = load_table(&path).unwrap();
        let mapped = MappedTable::open(&path).unwrap();

        assert_eq!(loaded.entries(), mapped.as_slice());
        assert_eq!(mapped.to_table(), loaded);
    }

    #[cfg(feature = "mmap")]
    #[test]
    fn test_mapped_table_validated() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("mmap.rt");
        save_table(&path, &sample_table()).unwrap();

        let other = Configuration::new(4, 100).unwrap();
        assert!(MappedTable::open_validated(&path, &ValidationOptions::for_crack(&other)).is_err());
    }
}
