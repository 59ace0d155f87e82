use anyhow::{Context, Result};
use chrono::Utc;
use rand::seq::SliceRandom;
use std::collections::HashSet;

use crate::storage::{
    AnswerLedger, Database, Question, QuestionStore, SessionStore, MODE_CHAPTER, MODE_EXAM,
    MODE_QUICK10, MODE_REVIEW_WRONG,
};

/// An exam draws this many questions from each of the first three chapters.
pub const EXAM_PER_CHAPTER: usize = 10;
pub const EXAM_CHAPTERS: [i64; 3] = [1, 2, 3];
pub const EXAM_TOTAL: usize = EXAM_PER_CHAPTER * EXAM_CHAPTERS.len();

/// Chapter practice caps at this many questions per run.
pub const CHAPTER_LIMIT: usize = 30;
pub const QUICK_COUNT: usize = 10;

pub const POINTS_PER_CORRECT: i64 = 2;
pub const PASS_RATE: f64 = 0.75;
pub const EXAM_PASS_POINTS: i64 = 45;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuizMode {
    /// Timed simulation: 10 questions from each of chapters 1-3.
    Exam,
    /// Practice one chapter, up to 30 questions.
    Chapter { id: i64 },
    /// Every question answered wrong and never answered correctly.
    ReviewWrong,
    /// 10 random questions from the whole bank.
    Quick10,
}

impl QuizMode {
    pub fn label(&self) -> &'static str {
        match self {
            QuizMode::Exam => MODE_EXAM,
            QuizMode::Chapter { .. } => MODE_CHAPTER,
            QuizMode::ReviewWrong => MODE_REVIEW_WRONG,
            QuizMode::Quick10 => MODE_QUICK10,
        }
    }

    pub fn chapter_id(&self) -> Option<i64> {
        match self {
            QuizMode::Chapter { id } => Some(*id),
            _ => None,
        }
    }

    /// Only the exam simulation runs against the clock
    pub fn is_timed(&self) -> bool {
        matches!(self, QuizMode::Exam)
    }
}

/// Points and verdict for a finished attempt. Exam mode requires both the
/// rate and the absolute points bar; practice modes only the rate.
pub fn evaluate_pass(mode: QuizMode, correct: i64, total: i64) -> (i64, bool) {
    let points = correct * POINTS_PER_CORRECT;
    let rate = if total > 0 {
        correct as f64 / total as f64
    } else {
        0.0
    };

    let passed = match mode {
        QuizMode::Exam => rate >= PASS_RATE && points >= EXAM_PASS_POINTS,
        _ => rate >= PASS_RATE,
    };

    (points, passed)
}

/// Pick the question set for one attempt. May come back empty (e.g. review
/// mode with nothing to review); callers check before starting an engine.
pub fn select_questions(db: &Database, mode: QuizMode) -> Result<Vec<Question>> {
    let store = QuestionStore::new(db);
    let mut rng = rand::thread_rng();

    let mut questions = match mode {
        QuizMode::Exam => {
            let mut picked = Vec::new();
            for chapter in EXAM_CHAPTERS {
                picked.extend(store.random_from_category(chapter, EXAM_PER_CHAPTER)?);
            }

            // Thin chapters: fill up to the full exam size from anywhere
            if picked.len() < EXAM_TOTAL {
                let have: HashSet<i64> = picked.iter().map(|q| q.id).collect();
                let mut rest = store.all_ids()?;
                rest.retain(|id| !have.contains(id));
                rest.shuffle(&mut rng);
                rest.truncate(EXAM_TOTAL - picked.len());
                picked.extend(store.by_ids(&rest)?);
            }

            picked
        }
        QuizMode::Chapter { id } => store.random_from_category(id, CHAPTER_LIMIT)?,
        QuizMode::Quick10 => store.random_any(QUICK_COUNT)?,
        QuizMode::ReviewWrong => {
            let ledger = AnswerLedger::new(db);
            let ids = ledger.never_correct_question_ids()?;
            store.by_ids(&ids)?
        }
    };

    questions.shuffle(&mut rng);
    Ok(questions)
}

/// Drives one quiz attempt end to end: sequencing, tentative selection,
/// answer commit, timing, and final scoring. Persistence goes through the
/// Answer Ledger and the Session Recorder on the shared database handle.
pub struct QuizEngine<'a> {
    db: &'a Database,
    mode: QuizMode,
    session_id: i64,
    questions: Vec<Question>,
    current: usize,
    selected: Option<usize>,
    correct: i64,
    remaining_seconds: Option<u32>,
    finished: bool,
}

impl<'a> QuizEngine<'a> {
    /// Create the placeholder session row and enter the in-progress state.
    /// An empty question set finishes immediately.
    pub fn start(
        db: &'a Database,
        mode: QuizMode,
        questions: Vec<Question>,
        timer_seconds: Option<u32>,
    ) -> Result<Self> {
        let sessions = SessionStore::new(db);
        let session_id = sessions
            .start(
                mode.label(),
                mode.chapter_id(),
                questions.len() as i64,
                Utc::now(),
            )
            .context("Failed to start quiz session")?;

        let mut engine = Self {
            db,
            mode,
            session_id,
            questions,
            current: 0,
            selected: None,
            correct: 0,
            remaining_seconds: if mode.is_timed() { timer_seconds } else { None },
            finished: false,
        };

        if engine.questions.is_empty() {
            engine.finalize()?;
        }

        Ok(engine)
    }

    pub fn session_id(&self) -> i64 {
        self.session_id
    }

    pub fn total_questions(&self) -> usize {
        self.questions.len()
    }

    pub fn current_index(&self) -> usize {
        self.current
    }

    pub fn current_question(&self) -> Option<&Question> {
        if self.finished {
            return None;
        }
        self.questions.get(self.current)
    }

    pub fn correct_answers(&self) -> i64 {
        self.correct
    }

    pub fn remaining_seconds(&self) -> Option<u32> {
        self.remaining_seconds
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Record a tentative choice. Re-selecting overwrites; out-of-range
    /// indexes and calls after the quiz finished are ignored.
    pub fn select_option(&mut self, index: usize) {
        if self.finished {
            return;
        }
        let Some(question) = self.questions.get(self.current) else {
            return;
        };
        if index < question.options.len() {
            self.selected = Some(index);
        }
    }

    /// Commit the current selection (or a blank, counted wrong), persist it,
    /// and advance. Finishes the session after the last question.
    pub fn commit_answer(&mut self) -> Result<()> {
        if self.finished {
            return Ok(());
        }
        let Some(question) = self.questions.get(self.current).cloned() else {
            return Ok(());
        };

        let selected = self.selected.take();
        let is_correct = selected == Some(question.correct_index);

        // Ledger event and session answer land atomically; a failure rolls
        // both back and the quiz carries on in memory (degraded, non-fatal).
        if let Err(e) = self.persist_answer(&question, selected, is_correct) {
            log::warn!(
                "dropping answer record for question {}: {:#}",
                question.id,
                e
            );
        }

        if is_correct {
            self.correct += 1;
        }
        self.current += 1;

        if self.current >= self.questions.len() {
            self.finalize()?;
        }

        Ok(())
    }

    fn persist_answer(
        &self,
        question: &Question,
        selected: Option<usize>,
        is_correct: bool,
    ) -> Result<()> {
        let tx = self
            .db
            .conn
            .unchecked_transaction()
            .context("Failed to open answer transaction")?;

        AnswerLedger::new(self.db).record(
            question.id,
            question.category_id,
            is_correct,
            Utc::now(),
        )?;
        SessionStore::new(self.db).append_answer(
            self.session_id,
            self.current as i64,
            question.id,
            selected.map(|i| i as i64),
            is_correct,
        )?;

        tx.commit().context("Failed to commit answer transaction")?;
        Ok(())
    }

    /// One second of exam clock. Hitting zero ends the attempt on the spot;
    /// questions never reached are simply not recorded.
    pub fn tick(&mut self) -> Result<()> {
        if self.finished {
            return Ok(());
        }
        let Some(remaining) = self.remaining_seconds else {
            return Ok(());
        };

        let remaining = remaining.saturating_sub(1);
        self.remaining_seconds = Some(remaining);

        if remaining == 0 {
            self.finalize()?;
        }

        Ok(())
    }

    /// Single non-reenterable finalization: score, verdict, session update.
    fn finalize(&mut self) -> Result<()> {
        if self.finished {
            return Ok(());
        }
        self.finished = true;
        self.selected = None;

        let (points, passed) =
            evaluate_pass(self.mode, self.correct, self.questions.len() as i64);

        SessionStore::new(self.db)
            .finish(self.session_id, Utc::now(), self.correct, points, passed)
            .context("Failed to finalize quiz session")?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::db::test_support::test_db;
    use crate::storage::{SessionStatus, MODE_CHAPTER};

    fn seed_chapter(db: &Database, chapter: i64, ids: std::ops::RangeInclusive<i64>) {
        let store = QuestionStore::new(db);
        store
            .upsert_category(chapter, &format!("Chapter {}", chapter))
            .unwrap();
        for id in ids {
            store
                .upsert_question(&Question {
                    id,
                    category_id: chapter,
                    text: format!("q{}", id),
                    options: vec!["a".into(), "b".into(), "c".into()],
                    correct_index: (id % 3) as usize,
                })
                .unwrap();
        }
    }

    fn run_through(engine: &mut QuizEngine, correct_count: usize) {
        let total = engine.total_questions();
        for i in 0..total {
            let question = engine.current_question().unwrap().clone();
            if i < correct_count {
                engine.select_option(question.correct_index);
            } else {
                engine.select_option((question.correct_index + 1) % question.options.len());
            }
            engine.commit_answer().unwrap();
        }
    }

    #[test]
    fn pass_rule_exam_needs_rate_and_points() {
        // 23/30: rate 0.7667, points 46 -> pass
        assert_eq!(evaluate_pass(QuizMode::Exam, 23, 30), (46, true));
        // 22/30: rate 0.733 -> fail regardless of points
        assert_eq!(evaluate_pass(QuizMode::Exam, 22, 30), (44, false));
        // 20/30: rate 0.667 -> fail
        assert_eq!(evaluate_pass(QuizMode::Exam, 20, 30), (40, false));
        // Practice modes only need the rate
        assert_eq!(evaluate_pass(QuizMode::Quick10, 8, 10), (16, true));
        assert_eq!(evaluate_pass(QuizMode::Chapter { id: 2 }, 5, 5), (10, true));
        // Empty attempt never passes
        assert_eq!(evaluate_pass(QuizMode::ReviewWrong, 0, 0), (0, false));
    }

    #[test]
    fn chapter_quiz_with_five_questions_end_to_end() {
        let db = test_db();
        seed_chapter(&db, 2, 1..=5);

        let questions = select_questions(&db, QuizMode::Chapter { id: 2 }).unwrap();
        assert_eq!(questions.len(), 5);

        let mut engine =
            QuizEngine::start(&db, QuizMode::Chapter { id: 2 }, questions, None).unwrap();
        run_through(&mut engine, 5);

        assert!(engine.is_finished());
        let session = SessionStore::new(&db)
            .get(engine.session_id())
            .unwrap()
            .unwrap();
        assert_eq!(session.total_questions, 5);
        assert_eq!(session.correct_answers, 5);
        assert_eq!(session.points, 10);
        assert!(session.passed);
        assert_eq!(session.status, SessionStatus::Finished);
        assert_eq!(session.mode, MODE_CHAPTER);
        assert_eq!(session.chapter_id, Some(2));

        let _ = std::fs::remove_file(db.path.as_path());
    }

    #[test]
    fn exam_with_twenty_of_thirty_fails() {
        let db = test_db();
        seed_chapter(&db, 1, 1..=10);
        seed_chapter(&db, 2, 11..=20);
        seed_chapter(&db, 3, 21..=30);

        let questions = select_questions(&db, QuizMode::Exam).unwrap();
        assert_eq!(questions.len(), 30);

        let mut engine = QuizEngine::start(&db, QuizMode::Exam, questions, Some(1800)).unwrap();
        run_through(&mut engine, 20);

        let session = SessionStore::new(&db)
            .get(engine.session_id())
            .unwrap()
            .unwrap();
        assert_eq!(session.correct_answers, 20);
        assert!(!session.passed);

        let _ = std::fs::remove_file(db.path.as_path());
    }

    #[test]
    fn exam_selection_fills_from_other_chapters_when_thin() {
        let db = test_db();
        // Chapter 1 has only 4 questions, chapter 4 holds spares
        seed_chapter(&db, 1, 1..=4);
        seed_chapter(&db, 2, 11..=20);
        seed_chapter(&db, 3, 21..=30);
        seed_chapter(&db, 4, 31..=50);

        let questions = select_questions(&db, QuizMode::Exam).unwrap();
        assert_eq!(questions.len(), EXAM_TOTAL);

        let unique: std::collections::HashSet<i64> = questions.iter().map(|q| q.id).collect();
        assert_eq!(unique.len(), EXAM_TOTAL);

        let _ = std::fs::remove_file(db.path.as_path());
    }

    #[test]
    fn review_wrong_skips_questions_ever_answered_correctly() {
        let db = test_db();
        seed_chapter(&db, 1, 1..=3);
        let ledger = AnswerLedger::new(&db);
        let now = Utc::now();
        ledger.record(1, 1, false, now).unwrap();
        ledger.record(1, 1, true, now).unwrap();
        ledger.record(2, 1, false, now).unwrap();

        let questions = select_questions(&db, QuizMode::ReviewWrong).unwrap();
        assert_eq!(questions.len(), 1);
        assert_eq!(questions[0].id, 2);

        let _ = std::fs::remove_file(db.path.as_path());
    }

    #[test]
    fn review_wrong_with_clean_slate_is_empty() {
        let db = test_db();
        seed_chapter(&db, 1, 1..=3);

        let questions = select_questions(&db, QuizMode::ReviewWrong).unwrap();
        assert!(questions.is_empty());

        let _ = std::fs::remove_file(db.path.as_path());
    }

    #[test]
    fn timer_running_out_forces_finish_without_recording_the_rest() {
        let db = test_db();
        seed_chapter(&db, 1, 1..=10);
        seed_chapter(&db, 2, 11..=20);
        seed_chapter(&db, 3, 21..=30);

        let questions = select_questions(&db, QuizMode::Exam).unwrap();
        let mut engine = QuizEngine::start(&db, QuizMode::Exam, questions, Some(3)).unwrap();

        // Answer two questions, then let the clock run out
        for _ in 0..2 {
            let q = engine.current_question().unwrap().clone();
            engine.select_option(q.correct_index);
            engine.commit_answer().unwrap();
        }
        engine.tick().unwrap();
        engine.tick().unwrap();
        assert!(!engine.is_finished());
        engine.tick().unwrap();
        assert!(engine.is_finished());

        let sessions = SessionStore::new(&db);
        let session = sessions.get(engine.session_id()).unwrap().unwrap();
        assert_eq!(session.status, SessionStatus::Finished);
        assert_eq!(session.correct_answers, 2);
        // totalQuestions keeps the scheduled count even though time ran out
        assert_eq!(session.total_questions, 30);
        // Unreached questions were never recorded, not marked wrong
        assert_eq!(sessions.answers_for(engine.session_id()).unwrap().len(), 2);

        let _ = std::fs::remove_file(db.path.as_path());
    }

    #[test]
    fn blank_commit_counts_as_wrong_and_reselect_overwrites() {
        let db = test_db();
        seed_chapter(&db, 1, 1..=2);

        let questions = QuestionStore::new(&db).by_ids(&[1, 2]).unwrap();
        let mut engine =
            QuizEngine::start(&db, QuizMode::Chapter { id: 1 }, questions, None).unwrap();

        // Commit with no selection: recorded as wrong with no selected index
        engine.commit_answer().unwrap();

        // Pick a wrong option, then overwrite with the right one
        let q = engine.current_question().unwrap().clone();
        let wrong = (q.correct_index + 1) % q.options.len();
        engine.select_option(wrong);
        engine.select_option(q.correct_index);
        engine.commit_answer().unwrap();

        assert!(engine.is_finished());
        let answers = SessionStore::new(&db)
            .answers_for(engine.session_id())
            .unwrap();
        assert_eq!(answers.len(), 2);
        assert_eq!(answers[0].selected_index, None);
        assert!(!answers[0].is_correct);
        assert!(answers[1].is_correct);
        assert_eq!(engine.correct_answers(), 1);

        let _ = std::fs::remove_file(db.path.as_path());
    }

    #[test]
    fn abandoned_session_stays_open() {
        let db = test_db();
        seed_chapter(&db, 1, 1..=3);

        let questions = QuestionStore::new(&db).by_ids(&[1, 2, 3]).unwrap();
        let engine = QuizEngine::start(&db, QuizMode::Quick10, questions, None).unwrap();
        let session_id = engine.session_id();
        drop(engine);

        let session = SessionStore::new(&db).get(session_id).unwrap().unwrap();
        assert_eq!(session.status, SessionStatus::Open);
        assert_eq!(session.total_questions, 3);
        assert_eq!(session.correct_answers, 0);

        let _ = std::fs::remove_file(db.path.as_path());
    }
}
