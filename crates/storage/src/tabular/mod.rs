//! CSV-file backend: one row per study session.
//!
//! Every call reads the whole file and every mutation rewrites it. Writes go to
//! a sibling temporary file that is then renamed over the live file.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, ErrorKind};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use study_core::model::{NewSession, SessionId, StudySession};
use tracing::{debug, info, warn};

use crate::repository::{SessionRepository, StorageError};

mod layout;

use layout::Table;

#[derive(Debug, Clone)]
pub struct CsvRepository {
    path: PathBuf,
}

impl CsvRepository {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the table, or `None` if the file does not exist yet.
    ///
    /// Files written by older layouts are repaired and written back before
    /// returning.
    fn read_table(&self) -> Result<Option<Table>, StorageError> {
        let file = match File::open(&self.path) {
            Ok(file) => file,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };

        let (table, repair) = Table::parse(BufReader::new(file))?;
        if repair.is_needed() {
            warn!(
                path = %self.path.display(),
                added_completed_column = repair.added_completed_column,
                assigned_ids = repair.assigned_ids,
                untitled_topics = repair.untitled_topics,
                "repairing study schedule layout"
            );
            self.write_table(&table)?;
        }
        Ok(Some(table))
    }

    fn write_table(&self, table: &Table) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        let result = File::create(&tmp)
            .map_err(StorageError::from)
            .and_then(|file| table.write(BufWriter::new(file)))
            .and_then(|()| fs::rename(&tmp, &self.path).map_err(StorageError::from));
        if result.is_err() {
            // Best-effort cleanup.
            let _ = fs::remove_file(&tmp);
        }
        result
    }
}

#[async_trait]
impl SessionRepository for CsvRepository {
    async fn append(&self, session: NewSession) -> Result<StudySession, StorageError> {
        let mut table = match self.read_table()? {
            Some(table) => table,
            None => {
                info!(
                    path = %self.path.display(),
                    review_columns = session.review_count(),
                    "creating study schedule"
                );
                Table::empty(session.review_count())
            }
        };

        if table.review_count() != session.review_count() {
            return Err(StorageError::Schema(format!(
                "store has {} review columns but the session has {} review dates",
                table.review_count(),
                session.review_count()
            )));
        }

        let stored = session.into_session(table.next_id()?);
        table.push(stored.clone());
        self.write_table(&table)?;

        debug!(
            id = %stored.id(),
            topic = stored.topic(),
            rows = table.sessions().len(),
            "appended study session"
        );
        Ok(stored)
    }

    async fn load_all(&self) -> Result<Vec<StudySession>, StorageError> {
        Ok(self
            .read_table()?
            .map(Table::into_sessions)
            .unwrap_or_default())
    }

    async fn increment_completion(&self, id: SessionId) -> Result<StudySession, StorageError> {
        let mut table = self.read_table()?.ok_or(StorageError::NotFound)?;

        let session = table
            .sessions_mut()
            .iter_mut()
            .find(|session| session.id() == id)
            .ok_or(StorageError::NotFound)?;
        session.record_completion();
        let updated = session.clone();

        self.write_table(&table)?;
        Ok(updated)
    }
}
