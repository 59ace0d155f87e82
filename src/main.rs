use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use colored::Colorize;
use std::io;
use std::path::PathBuf;

mod commands;
mod config;
mod engine;
mod stats;
mod storage;

use engine::QuizMode;

/// ASCII art banner for the application
const BANNER: &str = r#"
  _____                   _____          _
 | ____|_  ____ _ _ __ __|_   _| __ __ _(_)_ __   ___ _ __
 |  _| \ \/ / _` | '_ ` _ \| || '__/ _` | | '_ \ / _ \ '__|
 | |___ >  < (_| | | | | | | || | | (_| | | | | |  __/ |
 |_____/_/\_\__,_|_| |_| |_|_||_|  \__,_|_|_| |_|\___|_|
"#;

fn print_banner() {
    println!("{}", BANNER.cyan().bold());
}

#[derive(Parser)]
#[command(name = "examtrainer")]
#[command(about = "Drill a question bank by chapter, simulate timed exams, and track your preparation")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Take a quiz
    Quiz {
        #[command(subcommand)]
        mode: Option<QuizCommand>,
    },
    /// Show the statistics dashboard
    Stats,
    /// List past sessions, or replay one by id
    History {
        /// Session id to replay
        id: Option<i64>,
    },
    /// List chapters with their progress
    Chapters,
    /// Manage starred questions
    Favorites {
        #[command(subcommand)]
        action: Option<FavoriteAction>,
    },
    /// Import a question bank from a JSON file
    Import {
        /// Path to the bank file
        file: PathBuf,
    },
    /// Show or edit settings (exam timer, readiness smoothing)
    Config,
    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Subcommand)]
enum QuizCommand {
    /// Timed exam simulation: 10 questions from each of chapters 1-3
    Exam,
    /// Practice one chapter (up to 30 questions)
    Chapter {
        /// Chapter id (prompted if omitted)
        id: Option<i64>,
    },
    /// 10 random questions from the whole bank
    Quick,
    /// Retry every question never yet answered correctly
    Review,
}

#[derive(Subcommand)]
enum FavoriteAction {
    /// List starred questions
    List,
    /// Star a question by id
    Add { id: i64 },
    /// Unstar a question by id
    Remove { id: i64 },
    /// Flip the star on a question
    Toggle { id: i64 },
}

fn main() -> Result<()> {
    pretty_env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Quiz { mode }) => match mode {
            Some(QuizCommand::Exam) => commands::quiz::run(QuizMode::Exam)?,
            Some(QuizCommand::Chapter { id }) => {
                let id = match id {
                    Some(id) => Some(id),
                    None => {
                        let db = storage::Database::open()?;
                        let picked = commands::quiz::pick_chapter(&db)?;
                        drop(db);
                        picked
                    }
                };
                if let Some(id) = id {
                    commands::quiz::run(QuizMode::Chapter { id })?;
                }
            }
            Some(QuizCommand::Quick) => commands::quiz::run(QuizMode::Quick10)?,
            Some(QuizCommand::Review) => commands::quiz::run(QuizMode::ReviewWrong)?,
            None => run_quiz_menu()?,
        },
        Some(Commands::Stats) => commands::stats::run()?,
        Some(Commands::History { id }) => match id {
            Some(id) => commands::history::show(id)?,
            None => commands::history::list()?,
        },
        Some(Commands::Chapters) => commands::chapters::run()?,
        Some(Commands::Favorites { action }) => match action {
            Some(FavoriteAction::Add { id }) => commands::favorites::add(id)?,
            Some(FavoriteAction::Remove { id }) => commands::favorites::remove(id)?,
            Some(FavoriteAction::Toggle { id }) => commands::favorites::toggle(id)?,
            Some(FavoriteAction::List) | None => commands::favorites::list()?,
        },
        Some(Commands::Import { file }) => commands::import::run(&file)?,
        Some(Commands::Config) => commands::config::run()?,
        Some(Commands::Completions { shell }) => {
            let mut cmd = Cli::command();
            let name = cmd.get_name().to_string();
            generate(shell, &mut cmd, name, &mut io::stdout());
        }
        None => {
            // No subcommand - show interactive menu
            run_interactive()?;
        }
    }

    Ok(())
}

fn run_quiz_menu() -> Result<()> {
    use inquire::Select;

    let options = vec![
        "🎓  Exam simulation (timed, 30 questions)",
        "📖  Chapter practice",
        "⚡  Quick drill (10 questions)",
        "🔁  Review wrong answers",
        "←   Back",
    ];

    let selection = Select::new("Which mode?", options).prompt()?;

    match selection {
        s if s.contains("Exam") => commands::quiz::run(QuizMode::Exam)?,
        s if s.contains("Chapter") => {
            let db = storage::Database::open()?;
            if let Some(id) = commands::quiz::pick_chapter(&db)? {
                drop(db);
                commands::quiz::run(QuizMode::Chapter { id })?;
            }
        }
        s if s.contains("Quick") => commands::quiz::run(QuizMode::Quick10)?,
        s if s.contains("Review") => commands::quiz::run(QuizMode::ReviewWrong)?,
        _ => {}
    }

    Ok(())
}

fn run_interactive() -> Result<()> {
    use inquire::Select;

    print_banner();

    println!(
        "  {} {}",
        "Version:".dimmed(),
        env!("CARGO_PKG_VERSION").cyan()
    );

    // Current state at a glance
    println!("{}", "─".repeat(50).dimmed());

    let db = storage::Database::open()?;
    let question_count = storage::QuestionStore::new(&db).count().unwrap_or(0);
    let session_count = storage::SessionStore::new(&db)
        .list()
        .map(|s| s.len())
        .unwrap_or(0);
    drop(db);

    println!(
        "  📚 {} {}",
        "Questions:".dimmed(),
        question_count.to_string().cyan()
    );
    println!(
        "  📝 {} {}",
        "Sessions:".dimmed(),
        session_count.to_string().cyan()
    );
    println!("{}\n", "─".repeat(50).dimmed());

    let options = vec![
        "🎯  Take a quiz",
        "📊  Dashboard",
        "📂  Session history",
        "📖  Chapters",
        "⭐  Starred questions",
        "📥  Import question bank",
        "⚙️   Configure settings",
        "🚪  Exit",
    ];

    let selection = Select::new("What would you like to do?", options)
        .with_help_message("Use arrow keys to navigate, Enter to select")
        .prompt()?;

    println!();

    match selection {
        s if s.contains("Take a quiz") => run_quiz_menu()?,
        s if s.contains("Dashboard") => commands::stats::run()?,
        s if s.contains("Session history") => commands::history::list()?,
        s if s.contains("Chapters") => commands::chapters::run()?,
        s if s.contains("Starred") => commands::favorites::list()?,
        s if s.contains("Import") => {
            let path = inquire::Text::new("Path to the bank JSON file:").prompt()?;
            commands::import::run(std::path::Path::new(path.trim()))?;
        }
        s if s.contains("Configure") => commands::config::run()?,
        s if s.contains("Exit") => {
            println!("{}", "👋 Good luck with the exam!".cyan());
        }
        _ => unreachable!(),
    }

    Ok(())
}
