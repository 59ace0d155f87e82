use anyhow::Result;
use colored::Colorize;

use crate::storage::{AnswerLedger, Database, QuestionStore};

/// List every chapter with its answer history at a glance
pub fn run() -> Result<()> {
    let db = Database::open()?;
    let questions = QuestionStore::new(&db);
    let ledger = AnswerLedger::new(&db);

    let categories = questions.categories()?;
    if categories.is_empty() {
        println!(
            "{} No chapters yet. Import a question bank with {}.",
            "!".yellow(),
            "examtrainer import <file.json>".cyan()
        );
        return Ok(());
    }

    let counts = questions.counts_per_category()?;
    let stats = ledger.stats_per_category()?;

    println!("\n{}", "Chapters".bold());
    println!("{}", "─".repeat(60).dimmed());

    for category in categories {
        let total = counts.get(&category.id).copied().unwrap_or(0);
        let answered = stats.get(&category.id).copied().unwrap_or_default();

        println!(
            "  {} {}",
            format!("[{}]", category.id).dimmed(),
            category.name.bold()
        );
        println!(
            "      {} questions · {} answers given · {} solved · {} wrong answers",
            total.to_string().cyan(),
            answered.total_events,
            answered.unique_correct.to_string().green(),
            answered.wrong_events.to_string().red()
        );
    }

    println!();
    Ok(())
}
