use anyhow::{Context, Result};
use rand::seq::SliceRandom;
use rusqlite::params;
use std::collections::HashMap;

use super::Database;

#[derive(Debug, Clone)]
pub struct Category {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone)]
pub struct Question {
    pub id: i64,
    pub category_id: i64,
    pub text: String,
    pub options: Vec<String>,
    pub correct_index: usize,
}

/// Read-only view of the question bank. The only write path is the
/// import command, which upserts through this store.
pub struct QuestionStore<'a> {
    db: &'a Database,
}

impl<'a> QuestionStore<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    pub fn upsert_category(&self, id: i64, name: &str) -> Result<()> {
        self.db
            .conn
            .execute(
                "INSERT INTO categories (id, name) VALUES (?1, ?2)
                 ON CONFLICT(id) DO UPDATE SET name = excluded.name",
                params![id, name],
            )
            .context("Failed to upsert category")?;
        Ok(())
    }

    pub fn upsert_question(&self, question: &Question) -> Result<()> {
        let options = serde_json::to_string(&question.options)
            .context("Failed to serialize question options")?;

        // Update in place on conflict: a REPLACE would delete the old row
        // and cascade away its ledger, favorite, and session-answer rows
        self.db
            .conn
            .execute(
                "INSERT INTO questions (id, category_id, text, options, correct_index)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT(id) DO UPDATE SET
                     category_id = excluded.category_id,
                     text = excluded.text,
                     options = excluded.options,
                     correct_index = excluded.correct_index",
                params![
                    question.id,
                    question.category_id,
                    question.text,
                    options,
                    question.correct_index as i64
                ],
            )
            .context("Failed to upsert question")?;
        Ok(())
    }

    /// List all categories, ordered by id
    pub fn categories(&self) -> Result<Vec<Category>> {
        let mut stmt = self
            .db
            .conn
            .prepare("SELECT id, name FROM categories ORDER BY id")?;

        let mut rows = stmt.query([])?;
        let mut categories = Vec::new();

        while let Some(row) = rows.next()? {
            categories.push(Category {
                id: row.get(0)?,
                name: row.get(1)?,
            });
        }

        Ok(categories)
    }

    /// Total number of questions in the bank
    pub fn count(&self) -> Result<i64> {
        let count: i64 =
            self.db
                .conn
                .query_row("SELECT COUNT(*) FROM questions", [], |row| row.get(0))?;

        Ok(count)
    }

    /// Question count per category id
    pub fn counts_per_category(&self) -> Result<HashMap<i64, i64>> {
        let mut stmt = self
            .db
            .conn
            .prepare("SELECT category_id, COUNT(*) FROM questions GROUP BY category_id")?;

        let mut rows = stmt.query([])?;
        let mut counts = HashMap::new();

        while let Some(row) = rows.next()? {
            counts.insert(row.get::<_, i64>(0)?, row.get::<_, i64>(1)?);
        }

        Ok(counts)
    }

    /// Get a question by ID
    pub fn get(&self, id: i64) -> Result<Option<Question>> {
        let mut stmt = self.db.conn.prepare(
            "SELECT id, category_id, text, options, correct_index FROM questions WHERE id = ?1",
        )?;

        let mut rows = stmt.query(params![id])?;

        if let Some(row) = rows.next()? {
            Ok(Some(Self::row_to_question(row)?))
        } else {
            Ok(None)
        }
    }

    /// Fetch questions by id, preserving the order of `ids`.
    /// Unknown ids are silently skipped.
    pub fn by_ids(&self, ids: &[i64]) -> Result<Vec<Question>> {
        let mut questions = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(q) = self.get(*id)? {
                questions.push(q);
            }
        }
        Ok(questions)
    }

    pub fn ids_in_category(&self, category_id: i64) -> Result<Vec<i64>> {
        let mut stmt = self
            .db
            .conn
            .prepare("SELECT id FROM questions WHERE category_id = ?1 ORDER BY id")?;

        let mut rows = stmt.query(params![category_id])?;
        let mut ids = Vec::new();

        while let Some(row) = rows.next()? {
            ids.push(row.get(0)?);
        }

        Ok(ids)
    }

    pub fn all_ids(&self) -> Result<Vec<i64>> {
        let mut stmt = self.db.conn.prepare("SELECT id FROM questions ORDER BY id")?;

        let mut rows = stmt.query([])?;
        let mut ids = Vec::new();

        while let Some(row) = rows.next()? {
            ids.push(row.get(0)?);
        }

        Ok(ids)
    }

    /// Up to `limit` random questions from one category
    pub fn random_from_category(&self, category_id: i64, limit: usize) -> Result<Vec<Question>> {
        let mut ids = self.ids_in_category(category_id)?;
        ids.shuffle(&mut rand::thread_rng());
        ids.truncate(limit);
        self.by_ids(&ids)
    }

    /// Up to `limit` random questions from the whole bank
    pub fn random_any(&self, limit: usize) -> Result<Vec<Question>> {
        let mut ids = self.all_ids()?;
        ids.shuffle(&mut rand::thread_rng());
        ids.truncate(limit);
        self.by_ids(&ids)
    }

    fn row_to_question(row: &rusqlite::Row) -> Result<Question> {
        let options_json: String = row.get(3)?;
        let options: Vec<String> =
            serde_json::from_str(&options_json).context("Invalid options column")?;
        let correct_index: i64 = row.get(4)?;

        Ok(Question {
            id: row.get(0)?,
            category_id: row.get(1)?,
            text: row.get(2)?,
            options,
            correct_index: correct_index as usize,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::db::test_support::test_db;
    use std::collections::HashSet;

    #[test]
    fn upsert_and_fetch_round_trip() {
        let db = test_db();
        let store = QuestionStore::new(&db);
        store.upsert_category(1, "Basics").unwrap();
        store
            .upsert_question(&Question {
                id: 7,
                category_id: 1,
                text: "2 + 2 = ?".into(),
                options: vec!["3".into(), "4".into(), "5".into()],
                correct_index: 1,
            })
            .unwrap();

        let q = store.get(7).unwrap().unwrap();
        assert_eq!(q.options.len(), 3);
        assert_eq!(q.correct_index, 1);
        assert_eq!(store.count().unwrap(), 1);

        let _ = std::fs::remove_file(db.path.as_path());
    }

    #[test]
    fn re_upserting_a_question_keeps_history_and_stars() {
        use crate::storage::{AnswerLedger, FavoriteStore};
        use chrono::Utc;

        let db = test_db();
        let store = QuestionStore::new(&db);
        store.upsert_category(1, "Basics").unwrap();
        store
            .upsert_question(&Question {
                id: 1,
                category_id: 1,
                text: "old wording".into(),
                options: vec!["a".into(), "b".into()],
                correct_index: 0,
            })
            .unwrap();

        let ledger = AnswerLedger::new(&db);
        ledger.record(1, 1, true, Utc::now()).unwrap();
        let favorites = FavoriteStore::new(&db);
        favorites.add(1).unwrap();

        // Re-import the same bank with revised text
        store.upsert_category(1, "Basics (rev)").unwrap();
        store
            .upsert_question(&Question {
                id: 1,
                category_id: 1,
                text: "new wording".into(),
                options: vec!["a".into(), "b".into()],
                correct_index: 1,
            })
            .unwrap();

        // The ledger is append-only: nothing may disappear on re-import
        assert_eq!(ledger.totals().unwrap(), (1, 1));
        assert!(favorites.contains(1).unwrap());

        let q = store.get(1).unwrap().unwrap();
        assert_eq!(q.text, "new wording");
        assert_eq!(q.correct_index, 1);

        let _ = std::fs::remove_file(db.path.as_path());
    }

    #[test]
    fn random_from_category_respects_limit_and_membership() {
        let db = test_db();
        let store = QuestionStore::new(&db);
        store.upsert_category(1, "One").unwrap();
        store.upsert_category(2, "Two").unwrap();
        for id in 1..=8 {
            store
                .upsert_question(&Question {
                    id,
                    category_id: if id <= 5 { 1 } else { 2 },
                    text: format!("q{}", id),
                    options: vec!["a".into(), "b".into()],
                    correct_index: 0,
                })
                .unwrap();
        }

        let picked = store.random_from_category(1, 3).unwrap();
        assert_eq!(picked.len(), 3);
        assert!(picked.iter().all(|q| q.category_id == 1));

        // Fewer available than the limit: return all of them
        let picked = store.random_from_category(2, 30).unwrap();
        let ids: HashSet<i64> = picked.iter().map(|q| q.id).collect();
        assert_eq!(ids, HashSet::from([6, 7, 8]));

        let _ = std::fs::remove_file(db.path.as_path());
    }
}
