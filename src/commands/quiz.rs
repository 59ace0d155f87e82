use anyhow::Result;
use colored::Colorize;
use inquire::Select;
use std::time::Instant;

use crate::config::Config;
use crate::engine::{self, QuizEngine, QuizMode};
use crate::storage::{Database, FavoriteStore, QuestionStore, SessionStore};

const SKIP_LABEL: &str = "··· skip (no answer)";

/// Run one quiz attempt of the given mode from start to results screen
pub fn run(mode: QuizMode) -> Result<()> {
    let config = Config::load()?;
    let db = Database::open()?;

    let questions = engine::select_questions(&db, mode)?;
    if questions.is_empty() {
        match mode {
            QuizMode::ReviewWrong => println!(
                "\n{} Nothing to review - no question is waiting for its first correct answer.",
                "✓".green()
            ),
            QuizMode::Chapter { id } => println!(
                "\n{} Chapter {} has no questions. Import a bank first.",
                "!".yellow(),
                id
            ),
            _ => println!(
                "\n{} The question bank is empty. Import one with {}.",
                "!".yellow(),
                "examtrainer import <file.json>".cyan()
            ),
        }
        return Ok(());
    }

    let timer = mode.is_timed().then(|| config.exam_seconds());
    print_intro(mode, questions.len(), timer);

    let mut engine = QuizEngine::start(&db, mode, questions, timer)?;
    let clock = Instant::now();
    let mut ticked: u64 = 0;

    while !engine.is_finished() {
        // Fold elapsed wall-clock time into per-second ticks. tick() is the
        // single mutating entry point for the timer.
        let due = clock.elapsed().as_secs();
        while ticked < due && !engine.is_finished() {
            engine.tick()?;
            ticked += 1;
        }
        if engine.is_finished() {
            println!("\n{} Time is up!", "⏰".yellow());
            break;
        }

        let question = match engine.current_question() {
            Some(q) => q.clone(),
            None => break,
        };

        println!(
            "\n{} [{}/{}]  {}{}",
            "Question".bold().cyan(),
            engine.current_index() + 1,
            engine.total_questions(),
            format!("score {}", engine.correct_answers()).dimmed(),
            match engine.remaining_seconds() {
                Some(secs) => format!("  {}", format_clock(secs).yellow()),
                None => String::new(),
            }
        );
        println!("  {}", question.text);
        println!();

        let mut choices: Vec<String> = question
            .options
            .iter()
            .enumerate()
            .map(|(i, opt)| format!("{}) {}", (b'a' + i as u8) as char, opt))
            .collect();
        choices.push(SKIP_LABEL.to_string());

        let picked = Select::new("Your answer:", choices)
            .with_help_message("Arrow keys to choose, Enter to commit")
            .raw_prompt()?;

        let selected = (picked.index < question.options.len()).then_some(picked.index);
        if let Some(index) = selected {
            engine.select_option(index);
        }

        let was_correct = selected == Some(question.correct_index);
        engine.commit_answer()?;

        if was_correct {
            println!("  {} Correct!", "✓".green().bold());
        } else {
            println!(
                "  {} Incorrect. Answer: {}) {}",
                "✗".red().bold(),
                (b'a' + question.correct_index as u8) as char,
                question.options[question.correct_index]
            );
        }
        println!("{}", "─".repeat(50).dimmed());
    }

    print_results(&db, &engine)?;
    offer_starring(&db, engine.session_id())?;

    Ok(())
}

fn print_intro(mode: QuizMode, count: usize, timer: Option<u32>) {
    let title = match mode {
        QuizMode::Exam => "EXAM SIMULATION".to_string(),
        QuizMode::Chapter { id } => format!("CHAPTER {} PRACTICE", id),
        QuizMode::ReviewWrong => "REVIEW WRONG ANSWERS".to_string(),
        QuizMode::Quick10 => "QUICK DRILL".to_string(),
    };

    println!();
    println!("    {}", "╭──────────────────────────────────────╮".magenta());
    println!(
        "    {}  {:^36}{}",
        "│".magenta(),
        title.bold(),
        "│".magenta()
    );
    println!(
        "    {}  {:^36}{}",
        "│".magenta(),
        match timer {
            Some(secs) => format!("{} questions · {}", count, format_clock(secs)),
            None => format!("{} questions", count),
        }
        .dimmed(),
        "│".magenta()
    );
    println!("    {}", "╰──────────────────────────────────────╯".magenta());
}

fn print_results(db: &Database, engine: &QuizEngine) -> Result<()> {
    let sessions = SessionStore::new(db);
    let Some(session) = sessions.get(engine.session_id())? else {
        return Ok(());
    };

    let pct = if session.total_questions > 0 {
        100.0 * session.correct_answers as f64 / session.total_questions as f64
    } else {
        0.0
    };
    let verdict = if session.passed {
        "PASSED".green().bold()
    } else {
        "FAILED".red().bold()
    };

    println!();
    println!("    {}", "╭──────────────────────────────────────╮".green());
    println!(
        "    {}  Score: {}/{} ({:.0}%)",
        "│".green(),
        session.correct_answers.to_string().cyan(),
        session.total_questions,
        pct
    );
    println!(
        "    {}  Points: {}   Result: {}",
        "│".green(),
        session.points.to_string().cyan(),
        verdict
    );
    println!(
        "    {}  Time: {}",
        "│".green(),
        format_clock(session.duration_seconds.max(0) as u32)
    );
    println!("    {}", "╰──────────────────────────────────────╯".green());

    Ok(())
}

/// After the results, offer to star the questions that were missed
fn offer_starring(db: &Database, session_id: i64) -> Result<()> {
    let sessions = SessionStore::new(db);
    let missed: Vec<i64> = sessions
        .answers_for(session_id)?
        .iter()
        .filter(|a| !a.is_correct)
        .map(|a| a.question_id)
        .collect();

    if missed.is_empty() {
        return Ok(());
    }

    let options = vec![
        format!("⭐  Star the {} missed question(s)", missed.len()),
        "Skip".to_string(),
    ];
    let Ok(choice) = Select::new("Keep the misses handy?", options).prompt() else {
        return Ok(());
    };

    if choice.starts_with("⭐") {
        let favorites = FavoriteStore::new(db);
        for id in &missed {
            favorites.add(*id)?;
        }
        println!("{} Starred. See them with {}.", "✓".green(), "examtrainer favorites".cyan());
    }

    Ok(())
}

pub fn format_clock(secs: u32) -> String {
    format!("{:02}:{:02}", secs / 60, secs % 60)
}

/// Resolve a chapter id interactively when none was given on the CLI
pub fn pick_chapter(db: &Database) -> Result<Option<i64>> {
    let categories = QuestionStore::new(db).categories()?;
    if categories.is_empty() {
        println!("{} No chapters available yet.", "!".yellow());
        return Ok(None);
    }

    let labels: Vec<String> = categories
        .iter()
        .map(|c| format!("[{}] {}", c.id, c.name))
        .collect();
    let picked = Select::new("Which chapter?", labels).raw_prompt()?;

    Ok(Some(categories[picked.index].id))
}

#[cfg(test)]
mod tests {
    use super::format_clock;

    #[test]
    fn clock_formats_minutes_and_seconds() {
        assert_eq!(format_clock(0), "00:00");
        assert_eq!(format_clock(59), "00:59");
        assert_eq!(format_clock(1800), "30:00");
        assert_eq!(format_clock(61), "01:01");
    }
}
