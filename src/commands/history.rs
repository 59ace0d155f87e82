use anyhow::Result;
use chrono::Local;
use colored::Colorize;

use crate::storage::{
    Database, QuestionStore, QuizSessionRecord, SessionStatus, SessionStore, MODE_CHAPTER,
};

/// List all recorded quiz sessions, newest first
pub fn list() -> Result<()> {
    let db = Database::open()?;
    let sessions = SessionStore::new(&db).list()?;

    if sessions.is_empty() {
        println!("\n{} No quiz sessions yet.", "!".yellow());
        return Ok(());
    }

    println!("\n{}", "Session history".bold());
    println!("{}", "─".repeat(60).dimmed());

    for session in &sessions {
        println!("  {}", describe(session));
    }
    println!(
        "\n  Replay one with {}.\n",
        "examtrainer history <id>".cyan()
    );

    Ok(())
}

/// Replay one session answer by answer
pub fn show(session_id: i64) -> Result<()> {
    let db = Database::open()?;
    let store = SessionStore::new(&db);

    let Some(session) = store.get(session_id)? else {
        println!("{} No session with id {}.", "✗".red(), session_id);
        return Ok(());
    };

    println!("\n  {}", describe(&session));
    println!("{}", "─".repeat(60).dimmed());

    let questions = QuestionStore::new(&db);
    for answer in store.answers_for(session_id)? {
        let mark = if answer.is_correct {
            "✓".green()
        } else {
            "✗".red()
        };

        let Some(question) = questions.get(answer.question_id)? else {
            // Question removed from the bank since; show what we have
            println!(
                "  {:>2}. {} (question {} no longer in bank)",
                answer.order_index + 1,
                mark,
                answer.question_id
            );
            continue;
        };

        let given = match answer.selected_index {
            Some(i) => question
                .options
                .get(i as usize)
                .cloned()
                .unwrap_or_else(|| format!("option {}", i)),
            None => "(no answer)".to_string(),
        };

        println!("  {:>2}. {} {}", answer.order_index + 1, mark, question.text);
        if answer.is_correct {
            println!("       answered: {}", given.green());
        } else {
            println!(
                "       answered: {} · correct: {}",
                given.red(),
                question.options[question.correct_index].green()
            );
        }
    }
    println!();

    Ok(())
}

fn describe(session: &QuizSessionRecord) -> String {
    let when = session
        .started_at
        .with_timezone(&Local)
        .format("%Y-%m-%d %H:%M");

    let mode = match (session.mode.as_str(), session.chapter_id) {
        (MODE_CHAPTER, Some(id)) => format!("chapter {}", id),
        (mode, _) => mode.replace('_', " "),
    };

    let outcome = match session.status {
        SessionStatus::Open => "abandoned".dimmed().to_string(),
        SessionStatus::Finished if session.passed => "passed".green().to_string(),
        SessionStatus::Finished => "failed".red().to_string(),
    };

    format!(
        "{} {} · {:<10} {:>5}  {} pts  {}",
        format!("#{}", session.id).dimmed(),
        when,
        mode,
        format!("{}/{}", session.correct_answers, session.total_questions),
        session.points,
        outcome
    )
}
