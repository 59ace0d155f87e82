use anyhow::{Context, Result};
use colored::Colorize;
use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

use crate::storage::{Database, Question, QuestionStore};

#[derive(Debug, Deserialize)]
struct BankFile {
    categories: Vec<BankCategory>,
    questions: Vec<BankQuestion>,
}

#[derive(Debug, Deserialize)]
struct BankCategory {
    id: i64,
    name: String,
}

#[derive(Debug, Deserialize)]
struct BankQuestion {
    id: i64,
    category_id: i64,
    text: String,
    options: Vec<String>,
    correct_index: usize,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum BankError {
    #[error("question {id}: needs at least 2 options, has {count}")]
    TooFewOptions { id: i64, count: usize },
    #[error("question {id}: correct_index {index} is outside its {count} options")]
    CorrectIndexOutOfRange { id: i64, index: usize, count: usize },
    #[error("question {id}: references unknown category {category_id}")]
    UnknownCategory { id: i64, category_id: i64 },
    #[error("duplicate question id {id}")]
    DuplicateQuestion { id: i64 },
}

fn validate(bank: &BankFile) -> std::result::Result<(), BankError> {
    let category_ids: std::collections::HashSet<i64> =
        bank.categories.iter().map(|c| c.id).collect();
    let mut seen = std::collections::HashSet::new();

    for q in &bank.questions {
        if !seen.insert(q.id) {
            return Err(BankError::DuplicateQuestion { id: q.id });
        }
        if q.options.len() < 2 {
            return Err(BankError::TooFewOptions {
                id: q.id,
                count: q.options.len(),
            });
        }
        if q.correct_index >= q.options.len() {
            return Err(BankError::CorrectIndexOutOfRange {
                id: q.id,
                index: q.correct_index,
                count: q.options.len(),
            });
        }
        if !category_ids.contains(&q.category_id) {
            return Err(BankError::UnknownCategory {
                id: q.id,
                category_id: q.category_id,
            });
        }
    }

    Ok(())
}

/// Load a question bank from a JSON file. Existing questions with matching
/// ids are replaced; answer history is left untouched.
pub fn run(path: &Path) -> Result<()> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read bank file {:?}", path))?;
    let bank: BankFile =
        serde_json::from_str(&content).with_context(|| format!("Invalid bank file {:?}", path))?;

    validate(&bank)?;

    let db = Database::open()?;
    let store = QuestionStore::new(&db);

    for category in &bank.categories {
        store.upsert_category(category.id, &category.name)?;
    }
    for q in &bank.questions {
        store.upsert_question(&Question {
            id: q.id,
            category_id: q.category_id,
            text: q.text.clone(),
            options: q.options.clone(),
            correct_index: q.correct_index,
        })?;
    }

    println!(
        "{} Imported {} questions across {} chapters.",
        "✓".green(),
        bank.questions.len().to_string().cyan(),
        bank.categories.len().to_string().cyan()
    );

    Ok(())
}
