use anyhow::Result;
use colored::Colorize;

use crate::storage::{Database, FavoriteStore, QuestionStore};

/// List starred questions with their chapter and text
pub fn list() -> Result<()> {
    let db = Database::open()?;
    let favorites = FavoriteStore::new(&db);
    let questions = QuestionStore::new(&db);

    let ids = favorites.list()?;
    if ids.is_empty() {
        println!("\n{} No starred questions.", "!".yellow());
        return Ok(());
    }

    println!("\n{}", "Starred questions".bold());
    println!("{}", "─".repeat(60).dimmed());

    for id in ids {
        match questions.get(id)? {
            Some(q) => println!(
                "  {} {}",
                format!("[{}]", q.id).dimmed(),
                q.text
            ),
            None => println!("  {} (no longer in bank)", format!("[{}]", id).dimmed()),
        }
    }
    println!();

    Ok(())
}

pub fn add(question_id: i64) -> Result<()> {
    let db = Database::open()?;

    if QuestionStore::new(&db).get(question_id)?.is_none() {
        println!("{} No question with id {}.", "✗".red(), question_id);
        return Ok(());
    }

    FavoriteStore::new(&db).add(question_id)?;
    println!("{} Starred question {}.", "✓".green(), question_id);
    Ok(())
}

/// Flip the star on a question and report the new state
pub fn toggle(question_id: i64) -> Result<()> {
    let db = Database::open()?;

    if QuestionStore::new(&db).get(question_id)?.is_none() {
        println!("{} No question with id {}.", "✗".red(), question_id);
        return Ok(());
    }

    if FavoriteStore::new(&db).toggle(question_id)? {
        println!("{} Starred question {}.", "✓".green(), question_id);
    } else {
        println!("{} Unstarred question {}.", "✓".green(), question_id);
    }
    Ok(())
}

pub fn remove(question_id: i64) -> Result<()> {
    let db = Database::open()?;

    if FavoriteStore::new(&db).remove(question_id)? {
        println!("{} Unstarred question {}.", "✓".green(), question_id);
    } else {
        println!("{} Question {} was not starred.", "!".yellow(), question_id);
    }
    Ok(())
}
