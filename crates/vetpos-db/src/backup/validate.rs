//! Referential checks over an unpacked archive.
//!
//! Checks are archive-local: a foreign key must point at a row of the same
//! archive, whatever the live store holds. Every problem is reported.

use std::collections::{HashMap, HashSet};

use super::archive::RawArchive;
use crate::table::Table;

/// Returns one message per dangling reference, in merge order.
///
/// Missing columns are left to the parser, which reports them with the
/// row they occur on.
pub(crate) fn check_references(archive: &RawArchive) -> Vec<String> {
    let ids = identifier_sets(archive);
    let none = HashSet::new();
    let mut problems = Vec::new();

    for table in archive.tables() {
        let Some(raw) = archive.table(table) else {
            continue;
        };

        for key in table.foreign_keys() {
            let Some(column) = raw.column(key.column) else {
                continue;
            };
            let parents = ids.get(&key.parent).unwrap_or(&none);

            for (index, row) in raw.rows.iter().enumerate() {
                let value = row.get(column).unwrap_or_default().trim();
                if value.is_empty() && key.optional {
                    continue;
                }
                if !parents.contains(value) {
                    problems.push(format!(
                        "{} row {}: {} '{}' not found in {}",
                        table.file_name(),
                        index + 1,
                        key.column,
                        value,
                        key.parent.file_name()
                    ));
                }
            }
        }
    }

    problems
}

/// `id` values of every table in the archive that has one.
fn identifier_sets(archive: &RawArchive) -> HashMap<Table, HashSet<&str>> {
    let mut sets = HashMap::new();

    for table in archive.tables() {
        if !table.has_id_column() {
            continue;
        }
        let Some(raw) = archive.table(table) else {
            continue;
        };
        let Some(column) = raw.column("id") else {
            continue;
        };

        let ids = raw
            .rows
            .iter()
            .filter_map(|row| row.get(column))
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .collect();
        sets.insert(table, ids);
    }

    sets
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backup::archive::{read_archive, write_archive};
    use std::io::Cursor;

    fn archive(tables: &[(Table, Vec<Vec<&str>>)]) -> RawArchive {
        let owned: Vec<(Table, Vec<Vec<String>>)> = tables
            .iter()
            .map(|(t, rows)| {
                let rows = rows
                    .iter()
                    .map(|r| r.iter().map(|s| s.to_string()).collect())
                    .collect();
                (*t, rows)
            })
            .collect();
        let cursor = write_archive(Cursor::new(Vec::new()), &owned).unwrap();
        read_archive(Cursor::new(cursor.into_inner())).unwrap()
    }

    const DATE: &str = "2026-01-01 00:00:00.000";

    #[test]
    fn test_dangling_owner_is_reported() {
        let raw = archive(&[
            (Table::Clients, vec![vec!["c1", "Ana", "", "", "", "0.00", DATE]]),
            (
                Table::Pets,
                vec![
                    vec!["p1", "Luna", "cat", "", "", "", "c1", "", DATE],
                    vec!["p2", "Rex", "dog", "", "", "", "c9", "", DATE],
                ],
            ),
        ]);

        assert_eq!(
            check_references(&raw),
            vec!["pets.csv row 2: owner_id 'c9' not found in clients.csv".to_string()]
        );
    }

    #[test]
    fn test_missing_parent_table_fails_every_reference() {
        let raw = archive(&[(
            Table::SaleItems,
            vec![vec!["s1", "prod1", "1", "5.00"], vec!["s1", "prod2", "2", "1.00"]],
        )]);

        // Two foreign keys per row, both parents absent.
        assert_eq!(check_references(&raw).len(), 4);
    }

    #[test]
    fn test_empty_optional_keys_are_skipped() {
        let raw = archive(&[
            (Table::Sales, vec![vec!["s1", "", DATE, "10.00", "10.00", "cash", ""]]),
            (Table::Clients, vec![vec!["c1", "Ana", "", "", "", "0.00", DATE]]),
        ]);
        assert!(check_references(&raw).is_empty());

        let raw = archive(&[(
            Table::Sales,
            vec![vec!["s1", "ghost", DATE, "10.00", "0.00", "credit", ""]],
        )]);
        assert_eq!(check_references(&raw).len(), 1);
    }
}
