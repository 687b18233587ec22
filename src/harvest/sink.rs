//! Incremental CSV output.
//!
//! [`CsvSink`] owns one open output file. Creating it truncates any previous
//! file of the same name and writes the header; every [`CsvSink::append`]
//! writes and flushes exactly one row, so a run that aborts part way leaves a
//! header plus the rows written so far.

use std::fs::File;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::harvest::traits::{CsvRecord, PersistenceError};

pub struct CsvSink<R: CsvRecord> {
    writer: csv::Writer<File>,
    path: PathBuf,
    rows: u64,
    _record: PhantomData<fn(R)>,
}

impl<R: CsvRecord> CsvSink<R> {
    /// Creates (or truncates) `path` and writes the header row.
    pub fn create(path: impl AsRef<Path>) -> Result<Self, PersistenceError> {
        let path = path.as_ref().to_path_buf();
        let file = File::create(&path)?;
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);

        writer.write_record(R::HEADER)?;
        writer.flush()?;
        debug!(path = %path.display(), columns = R::HEADER.len(), "Output file created");

        Ok(Self {
            writer,
            path,
            rows: 0,
            _record: PhantomData,
        })
    }

    /// Appends one row and flushes it to disk.
    pub fn append(&mut self, record: &R) -> Result<(), PersistenceError> {
        self.writer.serialize(record)?;
        self.writer.flush()?;
        self.rows += 1;
        Ok(())
    }

    /// Number of data rows written, header excluded.
    pub fn rows(&self) -> u64 {
        self.rows
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Output file name for a posts harvest: `tweets_<name>.csv`.
pub fn posts_file_name(name: &str) -> String {
    format!("tweets_{}.csv", sanitize(name))
}

/// Output file name for a users harvest: `tweets_<label>_users.csv`.
pub fn users_file_name(label: &str) -> String {
    format!("tweets_{}_users.csv", sanitize(label))
}

/// Keeps the name inside the output directory.
fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| if c == '/' || c == '\\' { '_' } else { c })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::harvest::traits::UserRow;

    fn user(id: u64) -> UserRow {
        UserRow {
            user_id: id,
            user_name: format!("user{id}"),
            user_display_name: None,
            user_description: Some("likes, commas".to_string()),
            user_verified: false,
            user_created: None,
            user_followers: 0,
            user_following: 0,
            user_tweets_count: 0,
            user_location: None,
        }
    }

    #[test]
    fn test_header_written_on_create() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");

        let sink = CsvSink::<UserRow>::create(&path).unwrap();
        assert_eq!(sink.rows(), 0);

        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents.trim_end(), UserRow::HEADER.join(","));
    }

    #[test]
    fn test_rows_visible_before_sink_is_dropped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");

        let mut sink = CsvSink::<UserRow>::create(&path).unwrap();
        sink.append(&user(1)).unwrap();
        sink.append(&user(2)).unwrap();

        let mut reader = csv::Reader::from_path(&path).unwrap();
        let records: Vec<_> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(records.len(), 2);
        assert_eq!(&records[1][1], "user2");
        assert_eq!(&records[0][3], "likes, commas");
        assert_eq!(sink.rows(), 2);
    }

    #[test]
    fn test_create_truncates_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        std::fs::write(&path, "stale\nstale\nstale\n").unwrap();

        let mut sink = CsvSink::<UserRow>::create(&path).unwrap();
        sink.append(&user(1)).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(!contents.contains("stale"));
        assert_eq!(contents.lines().count(), 2);
    }

    #[test]
    fn test_create_fails_in_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("out.csv");

        let err = CsvSink::<UserRow>::create(&path).err().unwrap();
        assert!(matches!(err, PersistenceError::Io(_)));
    }

    #[test]
    fn test_file_names() {
        assert_eq!(posts_file_name("rust"), "tweets_rust.csv");
        assert_eq!(posts_file_name("a/b"), "tweets_a_b.csv");
        assert_eq!(users_file_name("team"), "tweets_team_users.csv");
    }
}
