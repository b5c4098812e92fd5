//! Load and unload keys from whitespace-separated integer lists.
//!
//! Test fixtures are often plain text files of integers. Each integer
//! becomes a key via [`IntegerKey::from_integer`] and a value via
//! [`RecordId::from_integer`].

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use tracing::debug;

use crate::common::{Error, RecordId, Result};
use crate::index::{IntegerKey, KeyComparator};

use super::tree::BPlusTree;

/// Read every integer up front so a malformed file changes nothing.
fn parse_integers<R: BufRead>(reader: R) -> Result<Vec<i64>> {
    let mut values = Vec::new();
    for (line_no, line) in reader.lines().enumerate() {
        let line = line?;
        for token in line.split_whitespace() {
            let value = token.parse::<i64>().map_err(|e| {
                Error::InvalidInput(format!("line {}: {:?}: {}", line_no + 1, token, e))
            })?;
            values.push(value);
        }
    }
    Ok(values)
}

impl<K: IntegerKey, C: KeyComparator<K>> BPlusTree<K, C> {
    /// Insert every integer read from `reader`.
    ///
    /// Returns how many were new. Duplicates are skipped.
    ///
    /// # Errors
    /// `Error::InvalidInput` if a token is not an integer, in which case
    /// nothing is inserted. Insert errors stop the load part way.
    pub fn insert_from_reader<R: BufRead>(&mut self, reader: R) -> Result<usize> {
        let values = parse_integers(reader)?;
        let mut inserted = 0;
        for &value in &values {
            if self.insert(&K::from_integer(value), RecordId::from_integer(value))? {
                inserted += 1;
            }
        }
        debug!(index = %self.index_name, read = values.len(), inserted, "btree.bulk_insert");
        Ok(inserted)
    }

    /// Insert every integer in the file at `path`.
    pub fn insert_from_file<P: AsRef<Path>>(&mut self, path: P) -> Result<usize> {
        let file = File::open(path)?;
        self.insert_from_reader(BufReader::new(file))
    }

    /// Remove every integer read from `reader`. Returns how many tokens
    /// were processed; absent keys are no-ops.
    pub fn remove_from_reader<R: BufRead>(&mut self, reader: R) -> Result<usize> {
        let values = parse_integers(reader)?;
        for &value in &values {
            self.remove(&K::from_integer(value))?;
        }
        debug!(index = %self.index_name, read = values.len(), "btree.bulk_remove");
        Ok(values.len())
    }

    pub fn remove_from_file<P: AsRef<Path>>(&mut self, path: P) -> Result<usize> {
        let file = File::open(path)?;
        self.remove_from_reader(BufReader::new(file))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_integers() {
        let input = "1 2  3\n\n-4\t5\n";
        assert_eq!(parse_integers(input.as_bytes()).unwrap(), vec![1, 2, 3, -4, 5]);
        assert!(parse_integers("".as_bytes()).unwrap().is_empty());
    }

    #[test]
    fn test_parse_rejects_garbage() {
        let err = parse_integers("1 2\n3 x4\n".as_bytes()).unwrap_err();
        match err {
            Error::InvalidInput(msg) => assert!(msg.starts_with("line 2")),
            other => panic!("unexpected error {other:?}"),
        }
    }
}
