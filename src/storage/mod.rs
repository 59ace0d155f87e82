pub mod db;
pub mod favorites;
pub mod ledger;
pub mod questions;
pub mod sessions;

pub use db::Database;
pub use favorites::FavoriteStore;
pub use ledger::{AnswerLedger, ChapterAnswerStats};
pub use questions::{Category, Question, QuestionStore};
pub use sessions::{
    QuizSessionRecord, SessionAnswerRecord, SessionStatus, SessionStore, MODE_CHAPTER, MODE_EXAM,
    MODE_QUICK10, MODE_REVIEW_WRONG,
};
