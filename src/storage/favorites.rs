use anyhow::{Context, Result};
use rusqlite::params;

use super::Database;

/// Starred question ids. A plain presence set, independent of answering.
pub struct FavoriteStore<'a> {
    db: &'a Database,
}

impl<'a> FavoriteStore<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    pub fn add(&self, question_id: i64) -> Result<()> {
        self.db
            .conn
            .execute(
                "INSERT OR IGNORE INTO favorites (question_id) VALUES (?1)",
                params![question_id],
            )
            .context("Failed to add favorite")?;
        Ok(())
    }

    pub fn remove(&self, question_id: i64) -> Result<bool> {
        let affected = self.db.conn.execute(
            "DELETE FROM favorites WHERE question_id = ?1",
            params![question_id],
        )?;

        Ok(affected > 0)
    }

    pub fn contains(&self, question_id: i64) -> Result<bool> {
        let count: i64 = self.db.conn.query_row(
            "SELECT COUNT(*) FROM favorites WHERE question_id = ?1",
            params![question_id],
            |row| row.get(0),
        )?;

        Ok(count > 0)
    }

    /// Flip the mark and return the new state
    pub fn toggle(&self, question_id: i64) -> Result<bool> {
        if self.contains(question_id)? {
            self.remove(question_id)?;
            Ok(false)
        } else {
            self.add(question_id)?;
            Ok(true)
        }
    }

    pub fn list(&self) -> Result<Vec<i64>> {
        let mut stmt = self
            .db
            .conn
            .prepare("SELECT question_id FROM favorites ORDER BY question_id")?;

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

    #[test]
    fn toggle_flips_membership() {
        let db = test_db();
        let questions = QuestionStore::new(&db);
        questions.upsert_category(1, "Ch 1").unwrap();
        questions
            .upsert_question(&Question {
                id: 5,
                category_id: 1,
                text: "q".into(),
                options: vec!["a".into(), "b".into()],
                correct_index: 0,
            })
            .unwrap();

        let favorites = FavoriteStore::new(&db);
        assert!(!favorites.contains(5).unwrap());
        assert!(favorites.toggle(5).unwrap());
        assert!(favorites.contains(5).unwrap());
        // Adding twice stays a set
        favorites.add(5).unwrap();
        assert_eq!(favorites.list().unwrap(), vec![5]);
        assert!(!favorites.toggle(5).unwrap());
        assert!(favorites.list().unwrap().is_empty());

        let _ = std::fs::remove_file(db.path.as_path());
    }
}
