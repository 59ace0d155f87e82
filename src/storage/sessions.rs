use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::params;

use super::Database;

pub const MODE_EXAM: &str = "exam";
pub const MODE_CHAPTER: &str = "chapter";
pub const MODE_REVIEW_WRONG: &str = "review_wrong";
pub const MODE_QUICK10: &str = "quick10";

const STATUS_OPEN: &str = "open";
const STATUS_FINISHED: &str = "finished";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    /// Started but never finalized. Abandoned quizzes stay open forever
    /// and are excluded from streaks and trend views.
    Open,
    Finished,
}

#[derive(Debug, Clone)]
pub struct QuizSessionRecord {
    pub id: i64,
    pub mode: String,
    pub chapter_id: Option<i64>,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    pub duration_seconds: i64,
    pub total_questions: i64,
    pub correct_answers: i64,
    pub points: i64,
    pub passed: bool,
    pub status: SessionStatus,
}

#[derive(Debug, Clone)]
pub struct SessionAnswerRecord {
    pub id: i64,
    pub session_id: i64,
    pub order_index: i64,
    pub question_id: i64,
    pub selected_index: Option<i64>,
    pub is_correct: bool,
}

/// Records one row per quiz attempt plus one ordered row per answer
/// inside the attempt, enabling historical replay.
pub struct SessionStore<'a> {
    db: &'a Database,
}

impl<'a> SessionStore<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Create the session row in its placeholder state and return its id.
    /// Finals (ended, duration, correct, points, passed) are filled in by
    /// `finish`, exactly once.
    pub fn start(
        &self,
        mode: &str,
        chapter_id: Option<i64>,
        total_questions: i64,
        started_at: DateTime<Utc>,
    ) -> Result<i64> {
        let at = started_at.to_rfc3339();

        self.db
            .conn
            .execute(
                "INSERT INTO quiz_sessions
                    (mode, chapter_id, started_at, ended_at, duration_seconds,
                     total_questions, correct_answers, points, passed, status)
                 VALUES (?1, ?2, ?3, ?3, 0, ?4, 0, 0, 0, ?5)",
                params![mode, chapter_id, at, total_questions, STATUS_OPEN],
            )
            .context("Failed to create quiz session")?;

        Ok(self.db.conn.last_insert_rowid())
    }

    pub fn append_answer(
        &self,
        session_id: i64,
        order_index: i64,
        question_id: i64,
        selected_index: Option<i64>,
        is_correct: bool,
    ) -> Result<()> {
        self.db
            .conn
            .execute(
                "INSERT INTO session_answers
                    (session_id, order_index, question_id, selected_index, is_correct)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![session_id, order_index, question_id, selected_index, is_correct],
            )
            .context("Failed to record session answer")?;
        Ok(())
    }

    /// Finalize the session. Duration is derived from the stored start time.
    pub fn finish(
        &self,
        session_id: i64,
        ended_at: DateTime<Utc>,
        correct_answers: i64,
        points: i64,
        passed: bool,
    ) -> Result<()> {
        let started: String = self
            .db
            .conn
            .query_row(
                "SELECT started_at FROM quiz_sessions WHERE id = ?1",
                params![session_id],
                |row| row.get(0),
            )
            .context("Session to finish not found")?;

        let started_at = DateTime::parse_from_rfc3339(&started)
            .context("Invalid started_at timestamp")?
            .with_timezone(&Utc);
        let duration = (ended_at - started_at).num_seconds().max(0);

        self.db
            .conn
            .execute(
                "UPDATE quiz_sessions
                 SET ended_at = ?1, duration_seconds = ?2, correct_answers = ?3,
                     points = ?4, passed = ?5, status = ?6
                 WHERE id = ?7",
                params![
                    ended_at.to_rfc3339(),
                    duration,
                    correct_answers,
                    points,
                    passed,
                    STATUS_FINISHED,
                    session_id
                ],
            )
            .context("Failed to finalize quiz session")?;
        Ok(())
    }

    pub fn get(&self, session_id: i64) -> Result<Option<QuizSessionRecord>> {
        let mut stmt = self.db.conn.prepare(
            "SELECT id, mode, chapter_id, started_at, ended_at, duration_seconds,
                    total_questions, correct_answers, points, passed, status
             FROM quiz_sessions WHERE id = ?1",
        )?;

        let mut rows = stmt.query(params![session_id])?;

        if let Some(row) = rows.next()? {
            Ok(Some(Self::row_to_session(row)?))
        } else {
            Ok(None)
        }
    }

    /// All sessions, newest first
    pub fn list(&self) -> Result<Vec<QuizSessionRecord>> {
        let mut stmt = self.db.conn.prepare(
            "SELECT id, mode, chapter_id, started_at, ended_at, duration_seconds,
                    total_questions, correct_answers, points, passed, status
             FROM quiz_sessions ORDER BY started_at DESC, id DESC",
        )?;

        let mut rows = stmt.query([])?;
        let mut sessions = Vec::new();

        while let Some(row) = rows.next()? {
            sessions.push(Self::row_to_session(row)?);
        }

        Ok(sessions)
    }

    /// Finished sessions only, oldest first
    pub fn finished(&self) -> Result<Vec<QuizSessionRecord>> {
        let mut stmt = self.db.conn.prepare(
            "SELECT id, mode, chapter_id, started_at, ended_at, duration_seconds,
                    total_questions, correct_answers, points, passed, status
             FROM quiz_sessions WHERE status = ?1 ORDER BY ended_at ASC, id ASC",
        )?;

        let mut rows = stmt.query(params![STATUS_FINISHED])?;
        let mut sessions = Vec::new();

        while let Some(row) = rows.next()? {
            sessions.push(Self::row_to_session(row)?);
        }

        Ok(sessions)
    }

    /// The last `limit` finished exam sessions, oldest of them first
    pub fn recent_exams(&self, limit: usize) -> Result<Vec<QuizSessionRecord>> {
        let mut stmt = self.db.conn.prepare(
            "SELECT id, mode, chapter_id, started_at, ended_at, duration_seconds,
                    total_questions, correct_answers, points, passed, status
             FROM quiz_sessions
             WHERE status = ?1 AND mode = ?2
             ORDER BY ended_at DESC, id DESC LIMIT ?3",
        )?;

        let mut rows = stmt.query(params![STATUS_FINISHED, MODE_EXAM, limit as i64])?;
        let mut sessions = Vec::new();

        while let Some(row) = rows.next()? {
            sessions.push(Self::row_to_session(row)?);
        }

        sessions.reverse();
        Ok(sessions)
    }

    /// Answers of one session in the order they were given
    pub fn answers_for(&self, session_id: i64) -> Result<Vec<SessionAnswerRecord>> {
        let mut stmt = self.db.conn.prepare(
            "SELECT id, session_id, order_index, question_id, selected_index, is_correct
             FROM session_answers WHERE session_id = ?1 ORDER BY order_index ASC",
        )?;

        let mut rows = stmt.query(params![session_id])?;
        let mut answers = Vec::new();

        while let Some(row) = rows.next()? {
            answers.push(SessionAnswerRecord {
                id: row.get(0)?,
                session_id: row.get(1)?,
                order_index: row.get(2)?,
                question_id: row.get(3)?,
                selected_index: row.get(4)?,
                is_correct: row.get(5)?,
            });
        }

        Ok(answers)
    }

    fn row_to_session(row: &rusqlite::Row) -> Result<QuizSessionRecord> {
        let started_str: String = row.get(3)?;
        let ended_str: String = row.get(4)?;
        let status_str: String = row.get(10)?;

        let status = match status_str.as_str() {
            STATUS_FINISHED => SessionStatus::Finished,
            _ => SessionStatus::Open,
        };

        Ok(QuizSessionRecord {
            id: row.get(0)?,
            mode: row.get(1)?,
            chapter_id: row.get(2)?,
            started_at: DateTime::parse_from_rfc3339(&started_str)
                .context("Invalid started_at timestamp")?
                .with_timezone(&Utc),
            ended_at: DateTime::parse_from_rfc3339(&ended_str)
                .context("Invalid ended_at timestamp")?
                .with_timezone(&Utc),
            duration_seconds: row.get(5)?,
            total_questions: row.get(6)?,
            correct_answers: row.get(7)?,
            points: row.get(8)?,
            passed: row.get(9)?,
            status,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::db::test_support::test_db;
    use crate::storage::{Question, QuestionStore};
    use chrono::Duration;

    fn seed_question(db: &Database, id: i64) {
        let store = QuestionStore::new(db);
        store.upsert_category(1, "Ch 1").unwrap();
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

    #[test]
    fn start_leaves_placeholder_state_until_finish() {
        let db = test_db();
        let store = SessionStore::new(&db);
        let started = Utc::now();

        let id = store.start(MODE_EXAM, None, 30, started).unwrap();
        let session = store.get(id).unwrap().unwrap();
        assert_eq!(session.status, SessionStatus::Open);
        assert_eq!(session.total_questions, 30);
        assert_eq!(session.correct_answers, 0);
        assert_eq!(session.duration_seconds, 0);
        assert_eq!(session.ended_at, session.started_at);
        assert!(!session.passed);

        store
            .finish(id, started + Duration::seconds(90), 23, 46, true)
            .unwrap();
        let session = store.get(id).unwrap().unwrap();
        assert_eq!(session.status, SessionStatus::Finished);
        assert_eq!(session.duration_seconds, 90);
        assert_eq!(session.correct_answers, 23);
        assert_eq!(session.points, 46);
        assert!(session.passed);

        let _ = std::fs::remove_file(db.path.as_path());
    }

    #[test]
    fn answers_come_back_in_order() {
        let db = test_db();
        seed_question(&db, 1);
        seed_question(&db, 2);
        seed_question(&db, 3);
        let store = SessionStore::new(&db);

        let id = store.start(MODE_QUICK10, None, 3, Utc::now()).unwrap();
        store.append_answer(id, 0, 2, Some(1), false).unwrap();
        store.append_answer(id, 1, 1, None, false).unwrap();
        store.append_answer(id, 2, 3, Some(0), true).unwrap();

        let answers = store.answers_for(id).unwrap();
        let order: Vec<i64> = answers.iter().map(|a| a.order_index).collect();
        assert_eq!(order, vec![0, 1, 2]);
        // Blank commit keeps a NULL selection but still counts as answered
        assert_eq!(answers[1].selected_index, None);
        assert!(!answers[1].is_correct);

        let _ = std::fs::remove_file(db.path.as_path());
    }

    #[test]
    fn recent_exams_only_includes_finished_exam_sessions() {
        let db = test_db();
        let store = SessionStore::new(&db);
        let base = Utc::now();

        let abandoned = store.start(MODE_EXAM, None, 30, base).unwrap();
        let _ = abandoned; // stays open, must not appear

        for i in 0..3 {
            let id = store
                .start(MODE_EXAM, None, 30, base + Duration::minutes(i))
                .unwrap();
            store
                .finish(id, base + Duration::minutes(i) + Duration::seconds(60), 20, 40, false)
                .unwrap();
        }
        let quick = store.start(MODE_QUICK10, None, 10, base).unwrap();
        store.finish(quick, base, 10, 20, true).unwrap();

        let exams = store.recent_exams(2).unwrap();
        assert_eq!(exams.len(), 2);
        assert!(exams.iter().all(|s| s.mode == MODE_EXAM));
        assert!(exams[0].ended_at <= exams[1].ended_at);

        let _ = std::fs::remove_file(db.path.as_path());
    }
}
