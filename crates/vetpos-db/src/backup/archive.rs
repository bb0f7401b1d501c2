//! ZIP container of CSV tables.
//!
//! Writing takes already-encoded text rows; reading returns raw text rows
//! keyed by entry name. Neither side knows about entity types.

use csv::StringRecord;
use std::collections::BTreeMap;
use std::io::{Read, Seek, Write};
use tracing::{debug, warn};
use zip::result::ZipError;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use super::error::{BackupError, BackupResult};
use crate::table::Table;

/// One CSV entry as text: header plus data rows.
#[derive(Debug, Clone, Default)]
pub(crate) struct RawTable {
    pub headers: StringRecord,
    pub rows: Vec<StringRecord>,
}

impl RawTable {
    /// Index of `column` in the header, compared trimmed.
    pub fn column(&self, column: &str) -> Option<usize> {
        self.headers.iter().position(|h| h.trim() == column)
    }
}

/// Every readable entry of an archive, keyed by file name.
#[derive(Debug, Default)]
pub(crate) struct RawArchive {
    entries: BTreeMap<String, RawTable>,
}

impl RawArchive {
    pub fn table(&self, table: Table) -> Option<&RawTable> {
        self.entries.get(table.file_name())
    }

    /// Tables present in the archive, parents first.
    pub fn tables(&self) -> Vec<Table> {
        Table::merge_order()
            .into_iter()
            .filter(|t| self.entries.contains_key(t.file_name()))
            .collect()
    }

    pub fn unknown_entries(&self) -> Vec<&str> {
        self.entries
            .keys()
            .filter(|name| Table::from_file_name(name).is_none())
            .map(String::as_str)
            .collect()
    }
}

/// Writes one deflated CSV entry per table and finishes the archive.
pub(crate) fn write_archive<W: Write + Seek>(
    writer: W,
    tables: &[(Table, Vec<Vec<String>>)],
) -> BackupResult<W> {
    let mut zip = ZipWriter::new(writer);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    for (table, rows) in tables {
        let mut csv = csv::Writer::from_writer(Vec::new());
        csv.write_record(table.header())?;
        for row in rows {
            csv.write_record(row)?;
        }
        let bytes = csv.into_inner().map_err(|e| BackupError::Io(e.into_error()))?;

        zip.start_file(table.file_name(), options)?;
        zip.write_all(&bytes)?;
        debug!(file = table.file_name(), rows = rows.len(), "Archive entry written");
    }

    Ok(zip.finish()?)
}

/// Unpacks every entry as a header-first CSV.
///
/// Directories are skipped and entries inside folders are keyed by their
/// bare file name. A table that appears twice (`a/clients.csv` and
/// `b/clients.csv`) makes the archive invalid. Unknown entries are kept if
/// they parse and dropped with a warning if they don't.
pub(crate) fn read_archive<R: Read + Seek>(reader: R) -> BackupResult<RawArchive> {
    let mut zip = ZipArchive::new(reader)
        .map_err(|e: ZipError| BackupError::InvalidBackup(format!("not a ZIP archive: {e}")))?;

    let mut archive = RawArchive::default();
    for index in 0..zip.len() {
        let mut entry = zip.by_index(index)?;
        if entry.is_dir() {
            continue;
        }

        let name = entry
            .name()
            .rsplit('/')
            .next()
            .unwrap_or_default()
            .to_string();
        if archive.entries.contains_key(&name) {
            if Table::from_file_name(&name).is_some() {
                return Err(BackupError::InvalidBackup(format!(
                    "{} appears more than once ('{}')",
                    name,
                    entry.name()
                )));
            }
            warn!(file = %entry.name(), "Skipping repeated entry");
            continue;
        }

        let mut bytes = Vec::new();
        entry.read_to_end(&mut bytes)?;

        match parse_csv(&bytes) {
            Ok(raw) => {
                debug!(file = %name, rows = raw.rows.len(), "Archive entry read");
                archive.entries.insert(name, raw);
            }
            Err(e) if Table::from_file_name(&name).is_some() => return Err(e),
            Err(e) => warn!(file = %name, error = %e, "Skipping unreadable entry"),
        }
    }

    if archive.tables().is_empty() {
        return Err(BackupError::InvalidBackup(
            "the archive contains no recognized tables".to_string(),
        ));
    }

    Ok(archive)
}

fn parse_csv(bytes: &[u8]) -> BackupResult<RawTable> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(bytes);

    let headers = reader.headers()?.clone();
    let rows = reader.records().collect::<Result<Vec<_>, _>>()?;

    Ok(RawTable { headers, rows })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn zip_of(entries: &[(&str, &str)]) -> Vec<u8> {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default();
        for (name, body) in entries {
            if name.ends_with('/') {
                zip.add_directory(*name, options).unwrap();
            } else {
                zip.start_file(*name, options).unwrap();
                zip.write_all(body.as_bytes()).unwrap();
            }
        }
        zip.finish().unwrap().into_inner()
    }

    #[test]
    fn test_write_then_read_keeps_text() {
        let rows = vec![vec![
            "c1".to_string(),
            "Ana, \"La Vet\"".to_string(),
            String::new(),
            String::new(),
            String::new(),
            "0.00".to_string(),
            "2026-01-01 00:00:00.000".to_string(),
        ]];
        let cursor = write_archive(Cursor::new(Vec::new()), &[(Table::Clients, rows)]).unwrap();
        let archive = read_archive(Cursor::new(cursor.into_inner())).unwrap();

        let clients = archive.table(Table::Clients).unwrap();
        assert_eq!(clients.rows.len(), 1);
        assert_eq!(&clients.rows[0][1], "Ana, \"La Vet\"");
        assert_eq!(clients.column("debt"), Some(5));
        assert_eq!(archive.tables(), vec![Table::Clients]);
    }

    #[test]
    fn test_folders_and_unknown_entries() {
        let bytes = zip_of(&[
            ("backup/", ""),
            ("backup/pets.csv", "id,name\np1,Luna\n"),
            ("readme.txt", "hello\n"),
        ]);
        let archive = read_archive(Cursor::new(bytes)).unwrap();

        assert_eq!(archive.tables(), vec![Table::Pets]);
        assert_eq!(archive.unknown_entries(), vec!["readme.txt"]);
    }

    #[test]
    fn test_repeated_table_is_rejected() {
        let bytes = zip_of(&[
            ("a/clients.csv", "id,name\nc1,Ana\n"),
            ("b/clients.csv", "id,name\nc2,Bruno\n"),
        ]);
        let err = read_archive(Cursor::new(bytes)).unwrap_err();
        match err {
            BackupError::InvalidBackup(message) => assert!(message.contains("clients.csv")),
            other => panic!("expected invalid backup, got {other:?}"),
        }

        let bytes = zip_of(&[
            ("clients.csv", "id,name\nc1,Ana\n"),
            ("a/readme.txt", "first\n"),
            ("b/readme.txt", "second\n"),
        ]);
        let archive = read_archive(Cursor::new(bytes)).unwrap();
        assert_eq!(archive.unknown_entries(), vec!["readme.txt"]);
    }

    #[test]
    fn test_rejects_non_zip_and_unrecognized() {
        let err = read_archive(Cursor::new(b"id,name\n".to_vec())).unwrap_err();
        assert!(matches!(err, BackupError::InvalidBackup(_)));

        let err = read_archive(Cursor::new(zip_of(&[("notes.csv", "a\n1\n")]))).unwrap_err();
        assert!(matches!(err, BackupError::InvalidBackup(_)));
    }
}
