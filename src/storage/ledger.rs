use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::params;
use std::collections::HashMap;

use super::Database;

/// Aggregate answer history for one chapter
#[derive(Debug, Clone, Copy, Default)]
pub struct ChapterAnswerStats {
    pub total_events: i64,
    pub unique_correct: i64,
    pub wrong_events: i64,
}

/// Append-only record of every answer the user has ever submitted.
/// Rows are never updated or deleted; repeated attempts at the same
/// question simply add more rows.
pub struct AnswerLedger<'a> {
    db: &'a Database,
}

impl<'a> AnswerLedger<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    pub fn record(
        &self,
        question_id: i64,
        category_id: i64,
        is_correct: bool,
        at: DateTime<Utc>,
    ) -> Result<()> {
        self.db
            .conn
            .execute(
                "INSERT INTO answer_events (question_id, category_id, is_correct, answered_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![question_id, category_id, is_correct, at.to_rfc3339()],
            )
            .context("Failed to record answer event")?;
        Ok(())
    }

    /// (total events, correct events) across the whole ledger
    pub fn totals(&self) -> Result<(i64, i64)> {
        let row: (i64, i64) = self.db.conn.query_row(
            "SELECT COUNT(*), COALESCE(SUM(is_correct), 0) FROM answer_events",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;

        Ok(row)
    }

    /// Distinct questions answered correctly at least once, bank-wide
    pub fn unique_correct_total(&self) -> Result<i64> {
        let count: i64 = self.db.conn.query_row(
            "SELECT COUNT(DISTINCT question_id) FROM answer_events WHERE is_correct = 1",
            [],
            |row| row.get(0),
        )?;

        Ok(count)
    }

    /// Per-category event counts, unique-correct counts, and wrong counts
    pub fn stats_per_category(&self) -> Result<HashMap<i64, ChapterAnswerStats>> {
        let mut stmt = self.db.conn.prepare(
            "SELECT category_id,
                    COUNT(*),
                    COUNT(DISTINCT CASE WHEN is_correct = 1 THEN question_id END),
                    SUM(CASE WHEN is_correct = 0 THEN 1 ELSE 0 END)
             FROM answer_events
             GROUP BY category_id",
        )?;

        let mut rows = stmt.query([])?;
        let mut stats = HashMap::new();

        while let Some(row) = rows.next()? {
            stats.insert(
                row.get::<_, i64>(0)?,
                ChapterAnswerStats {
                    total_events: row.get(1)?,
                    unique_correct: row.get(2)?,
                    wrong_events: row.get(3)?,
                },
            );
        }

        Ok(stats)
    }

    /// Questions with at least one wrong event and no correct event ever.
    /// This is the review-wrong selection set.
    pub fn never_correct_question_ids(&self) -> Result<Vec<i64>> {
        let mut stmt = self.db.conn.prepare(
            "SELECT question_id FROM answer_events
             GROUP BY question_id
             HAVING SUM(CASE WHEN is_correct = 0 THEN 1 ELSE 0 END) > 0
                AND SUM(CASE WHEN is_correct = 1 THEN 1 ELSE 0 END) = 0
             ORDER BY question_id",
        )?;

        let mut rows = stmt.query([])?;
        let mut ids = Vec::new();

        while let Some(row) = rows.next()? {
            ids.push(row.get(0)?);
        }

        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::db::test_support::test_db;
    use crate::storage::{Question, QuestionStore};

    fn seed_questions(db: &Database, count: i64) {
        let store = QuestionStore::new(db);
        store.upsert_category(1, "Ch 1").unwrap();
        for id in 1..=count {
            store
                .upsert_question(&Question {
                    id,
                    category_id: 1,
                    text: format!("q{}", id),
                    options: vec!["a".into(), "b".into()],
                    correct_index: 0,
                })
                .unwrap();
        }
    }

    #[test]
    fn never_correct_excludes_questions_with_any_correct_event() {
        let db = test_db();
        seed_questions(&db, 3);
        let ledger = AnswerLedger::new(&db);
        let now = Utc::now();

        // q1: wrong then correct later -> excluded
        ledger.record(1, 1, false, now).unwrap();
        ledger.record(1, 1, true, now).unwrap();
        // q2: wrong only -> included
        ledger.record(2, 1, false, now).unwrap();
        ledger.record(2, 1, false, now).unwrap();
        // q3: never answered -> excluded

        assert_eq!(ledger.never_correct_question_ids().unwrap(), vec![2]);

        let _ = std::fs::remove_file(db.path.as_path());
    }

    #[test]
    fn per_category_stats_counts_events_and_distinct_correct() {
        let db = test_db();
        seed_questions(&db, 2);
        let ledger = AnswerLedger::new(&db);
        let now = Utc::now();

        ledger.record(1, 1, true, now).unwrap();
        ledger.record(1, 1, true, now).unwrap();
        ledger.record(2, 1, false, now).unwrap();

        let stats = ledger.stats_per_category().unwrap();
        let ch1 = stats.get(&1).copied().unwrap();
        assert_eq!(ch1.total_events, 3);
        assert_eq!(ch1.unique_correct, 1);
        assert_eq!(ch1.wrong_events, 1);

        // Spec invariants: unique correct bounded by events and bank size
        assert!(ch1.unique_correct <= ch1.total_events);

        assert_eq!(ledger.totals().unwrap(), (3, 2));
        assert_eq!(ledger.unique_correct_total().unwrap(), 1);

        let _ = std::fs::remove_file(db.path.as_path());
    }
}
