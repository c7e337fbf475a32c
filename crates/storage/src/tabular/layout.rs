//! Column layout of the study schedule file and row (de)serialization.
//!
//! Header: `Study Date,Topic,Review 1..Review N,Completed Reviews,Session Id`.
//! Older files may lack the last two columns; `Table::parse` fills them in and
//! reports what it repaired so the caller can write the file back.

use std::collections::HashSet;
use std::io::{Read, Write};

use chrono::NaiveDate;
use study_core::model::{SessionId, StudySession};
use study_core::time::{format_date, parse_date};

use crate::repository::{StorageError, next_session_id};

pub(crate) const STUDY_DATE: &str = "Study Date";
pub(crate) const TOPIC: &str = "Topic";
pub(crate) const COMPLETED_REVIEWS: &str = "Completed Reviews";
pub(crate) const SESSION_ID: &str = "Session Id";
/// Stands in for a blank topic found in an older file.
pub(crate) const UNTITLED_TOPIC: &str = "Untitled";

pub(crate) fn review_column(number: usize) -> String {
    format!("Review {number}")
}

fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

/// What `Table::parse` had to fix in a file written by an older layout.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct SchemaRepair {
    pub added_completed_column: bool,
    pub assigned_ids: usize,
    pub untitled_topics: usize,
}

impl SchemaRepair {
    pub(crate) fn is_needed(self) -> bool {
        self.added_completed_column || self.assigned_ids > 0 || self.untitled_topics > 0
    }
}

/// Column positions resolved from a header row.
struct Columns {
    study_date: usize,
    topic: usize,
    reviews: Vec<usize>,
    completed: Option<usize>,
    session_id: Option<usize>,
}

impl Columns {
    fn resolve(headers: &csv::StringRecord) -> Result<Self, StorageError> {
        let find = |name: &str| headers.iter().position(|h| h.trim() == name);

        let study_date = find(STUDY_DATE)
            .ok_or_else(|| StorageError::Schema(format!("missing column {STUDY_DATE:?}")))?;
        let topic =
            find(TOPIC).ok_or_else(|| StorageError::Schema(format!("missing column {TOPIC:?}")))?;

        let mut reviews = Vec::new();
        while let Some(pos) = find(&review_column(reviews.len() + 1)) {
            reviews.push(pos);
        }
        if reviews.is_empty() {
            return Err(StorageError::Schema(format!(
                "missing column {:?}",
                review_column(1)
            )));
        }

        Ok(Self {
            study_date,
            topic,
            reviews,
            completed: find(COMPLETED_REVIEWS),
            session_id: find(SESSION_ID),
        })
    }
}

struct RawRow {
    id: Option<SessionId>,
    topic: String,
    study_date: NaiveDate,
    review_dates: Vec<NaiveDate>,
    completed: u32,
}

fn cell<'a>(record: &'a csv::StringRecord, pos: usize, row: usize) -> Result<&'a str, StorageError> {
    record
        .get(pos)
        .map(str::trim)
        .ok_or_else(|| StorageError::Serialization(format!("row {row}: missing field {pos}")))
}

/// The whole file in memory: its review column count and every session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Table {
    review_count: usize,
    sessions: Vec<StudySession>,
}

impl Table {
    pub(crate) fn empty(review_count: usize) -> Self {
        Self {
            review_count,
            sessions: Vec::new(),
        }
    }

    pub(crate) fn review_count(&self) -> usize {
        self.review_count
    }

    pub(crate) fn sessions(&self) -> &[StudySession] {
        &self.sessions
    }

    pub(crate) fn sessions_mut(&mut self) -> &mut [StudySession] {
        &mut self.sessions
    }

    pub(crate) fn into_sessions(self) -> Vec<StudySession> {
        self.sessions
    }

    pub(crate) fn next_id(&self) -> Result<SessionId, StorageError> {
        next_session_id(self.sessions.iter().map(StudySession::id).max())
    }

    pub(crate) fn push(&mut self, session: StudySession) {
        self.sessions.push(session);
    }

    pub(crate) fn headers(&self) -> Vec<String> {
        let mut headers = Vec::with_capacity(self.review_count + 4);
        headers.push(STUDY_DATE.to_owned());
        headers.push(TOPIC.to_owned());
        headers.extend((1..=self.review_count).map(review_column));
        headers.push(COMPLETED_REVIEWS.to_owned());
        headers.push(SESSION_ID.to_owned());
        headers
    }

    /// Parse a schedule file, repairing missing completion and id columns.
    pub(crate) fn parse<R: Read>(reader: R) -> Result<(Self, SchemaRepair), StorageError> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .from_reader(reader);
        let columns = Columns::resolve(reader.headers().map_err(ser)?)?;

        let mut repair = SchemaRepair {
            added_completed_column: columns.completed.is_none(),
            assigned_ids: 0,
            untitled_topics: 0,
        };

        // Rows are parsed first, ids assigned afterwards so new ids never collide
        // with ids already present further down the file.
        let mut rows: Vec<RawRow> = Vec::new();
        for (idx, record) in reader.records().enumerate() {
            let row = idx + 1;
            let record = record.map_err(ser)?;

            let study_date = parse_date(cell(&record, columns.study_date, row)?)
                .map_err(|e| StorageError::Serialization(format!("row {row}: study date: {e}")))?;
            let topic = match cell(&record, columns.topic, row)? {
                "" => {
                    repair.untitled_topics += 1;
                    UNTITLED_TOPIC.to_owned()
                }
                topic => topic.to_owned(),
            };

            let mut review_dates = Vec::with_capacity(columns.reviews.len());
            for (n, pos) in columns.reviews.iter().enumerate() {
                let date = parse_date(cell(&record, *pos, row)?).map_err(|e| {
                    StorageError::Serialization(format!("row {row}: review {}: {e}", n + 1))
                })?;
                review_dates.push(date);
            }

            let completed = match columns.completed {
                Some(pos) => match cell(&record, pos, row)? {
                    "" => 0,
                    raw => raw.parse::<u32>().map_err(|e| {
                        StorageError::Serialization(format!("row {row}: completed reviews: {e}"))
                    })?,
                },
                None => 0,
            };

            let id = match columns.session_id {
                Some(pos) => match cell(&record, pos, row)? {
                    "" => None,
                    raw => Some(raw.parse::<SessionId>().map_err(|e| {
                        StorageError::Serialization(format!("row {row}: {e}"))
                    })?),
                },
                None => None,
            };

            rows.push(RawRow {
                id,
                topic,
                study_date,
                review_dates,
                completed,
            });
        }

        let mut seen = HashSet::new();
        for row in &rows {
            if let Some(id) = row.id {
                if !seen.insert(id) {
                    return Err(StorageError::Schema(format!("duplicate session id {id}")));
                }
            }
        }

        let mut last = rows.iter().filter_map(|row| row.id).max();

        let mut sessions = Vec::with_capacity(rows.len());
        for row in rows {
            let id = match row.id {
                Some(id) => id,
                None => {
                    let assigned = next_session_id(last)?;
                    last = Some(assigned);
                    repair.assigned_ids += 1;
                    assigned
                }
            };
            let session = StudySession::from_persisted(
                id,
                row.topic,
                row.study_date,
                row.review_dates,
                row.completed,
            )
            .map_err(|e| StorageError::Serialization(format!("session {id}: {e}")))?;
            sessions.push(session);
        }

        Ok((
            Self {
                review_count: columns.reviews.len(),
                sessions,
            },
            repair,
        ))
    }

    /// Write the full table, header first.
    pub(crate) fn write<W: Write>(&self, writer: W) -> Result<(), StorageError> {
        let mut writer = csv::Writer::from_writer(writer);
        writer.write_record(self.headers()).map_err(ser)?;

        for session in &self.sessions {
            let mut record = Vec::with_capacity(self.review_count + 4);
            record.push(format_date(session.study_date()));
            record.push(session.topic().to_owned());
            record.extend(session.review_dates().iter().map(|d| format_date(*d)));
            record.push(session.completed_reviews().to_string());
            record.push(session.id().to_string());
            writer.write_record(&record).map_err(ser)?;
        }

        writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LEGACY_DENSE_HEADER: &str = "Study Date,Topic,Review 1,Review 2,Review 3";

    #[test]
    fn headers_follow_review_count() {
        let table = Table::empty(3);
        assert_eq!(
            table.headers(),
            vec![
                "Study Date",
                "Topic",
                "Review 1",
                "Review 2",
                "Review 3",
                "Completed Reviews",
                "Session Id"
            ]
        );
    }

    #[test]
    fn legacy_file_without_completion_or_ids_is_repaired() {
        let raw = format!(
            "{LEGACY_DENSE_HEADER}\n\
             2024-01-01,Ownership,2024-01-02,2024-01-04,2024-01-07\n\
             2024-01-02,Lifetimes,2024-01-03,2024-01-05,2024-01-08\n"
        );
        let (table, repair) = Table::parse(raw.as_bytes()).unwrap();

        assert!(repair.added_completed_column);
        assert_eq!(repair.assigned_ids, 2);
        assert_eq!(table.review_count(), 3);
        let ids: Vec<_> = table.sessions().iter().map(StudySession::id).collect();
        assert_eq!(ids, vec![SessionId::new(1), SessionId::new(2)]);
        assert!(table.sessions().iter().all(|s| s.completed_reviews() == 0));
    }

    #[test]
    fn missing_ids_are_assigned_after_existing_ones() {
        let raw = "Study Date,Topic,Review 1,Completed Reviews,Session Id\n\
                   2024-01-01,A,2024-01-02,0,\n\
                   2024-01-01,B,2024-01-02,2,7\n";
        let (table, repair) = Table::parse(raw.as_bytes()).unwrap();

        assert!(!repair.added_completed_column);
        assert_eq!(repair.assigned_ids, 1);
        assert_eq!(table.sessions()[0].id(), SessionId::new(8));
        assert_eq!(table.sessions()[1].id(), SessionId::new(7));
        assert_eq!(table.next_id().unwrap(), SessionId::new(9));
    }

    #[test]
    fn blank_legacy_topics_are_renamed() {
        let raw = "Study Date,Topic,Review 1\n\
                   2024-01-01,   ,2024-01-02\n\
                   2024-01-02,Traits,2024-01-03\n";
        let (table, repair) = Table::parse(raw.as_bytes()).unwrap();

        assert_eq!(repair.untitled_topics, 1);
        assert!(repair.is_needed());
        assert_eq!(table.sessions()[0].topic(), UNTITLED_TOPIC);
        assert_eq!(table.sessions()[1].topic(), "Traits");
    }

    #[test]
    fn exhausted_ids_are_reported_instead_of_reused() {
        let raw = format!(
            "Study Date,Topic,Review 1,Completed Reviews,Session Id\n\
             2024-01-01,A,2024-01-02,0,{}\n",
            u64::MAX
        );
        let (table, _) = Table::parse(raw.as_bytes()).unwrap();
        assert!(matches!(table.next_id(), Err(StorageError::Schema(_))));

        let with_gap = format!("{raw}2024-01-02,B,2024-01-03,0,\n");
        assert!(matches!(
            Table::parse(with_gap.as_bytes()),
            Err(StorageError::Schema(_))
        ));
    }

    #[test]
    fn rejects_files_without_required_columns() {
        let err = Table::parse("Topic,Review 1\nA,2024-01-02\n".as_bytes()).unwrap_err();
        assert!(matches!(err, StorageError::Schema(_)));

        let err = Table::parse("Study Date,Topic\n2024-01-01,A\n".as_bytes()).unwrap_err();
        assert!(matches!(err, StorageError::Schema(_)));
    }

    #[test]
    fn rejects_duplicate_ids_and_bad_dates() {
        let dup = "Study Date,Topic,Review 1,Completed Reviews,Session Id\n\
                   2024-01-01,A,2024-01-02,0,1\n\
                   2024-01-01,B,2024-01-02,0,1\n";
        assert!(matches!(
            Table::parse(dup.as_bytes()).unwrap_err(),
            StorageError::Schema(_)
        ));

        let bad = "Study Date,Topic,Review 1\n01/01/2024,A,2024-01-02\n";
        assert!(matches!(
            Table::parse(bad.as_bytes()).unwrap_err(),
            StorageError::Serialization(_)
        ));
    }

    #[test]
    fn write_then_parse_keeps_every_field() {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let mut session = StudySession::from_persisted(
            SessionId::new(3),
            "Pattern matching, \"quoted\"".into(),
            start,
            vec![
                NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
                NaiveDate::from_ymd_opt(2024, 1, 4).unwrap(),
            ],
            0,
        )
        .unwrap();
        session.record_completion();

        let mut table = Table::empty(2);
        table.push(session);

        let mut buf = Vec::new();
        table.write(&mut buf).unwrap();
        let (parsed, repair) = Table::parse(buf.as_slice()).unwrap();

        assert!(!repair.is_needed());
        assert_eq!(parsed, table);
    }
}
