use anyhow::Result;
use colored::Colorize;
use inquire::{Select, Text};

use crate::config::Config;

/// Show current settings and optionally edit them
pub fn run() -> Result<()> {
    let mut config = Config::load()?;

    println!("\n{}", "Settings".bold());
    println!("{}", "─".repeat(50).dimmed());
    println!(
        "  Config file:   {}",
        format!("{:?}", Config::config_path()?).dimmed()
    );
    println!(
        "  Database:      {}",
        format!("{:?}", config.db_path()?).dimmed()
    );
    println!(
        "  Exam timer:    {} seconds",
        config.exam_seconds().to_string().cyan()
    );
    println!(
        "  Smoothing k:   {}",
        config.readiness_smoothing().to_string().cyan()
    );
    println!();

    let options = vec![
        "⏱   Change exam timer",
        "📈  Change readiness smoothing",
        "←   Back",
    ];
    let selection = Select::new("Edit a setting?", options).prompt()?;

    if selection.contains("exam timer") {
        let input = Text::new("Exam length in seconds:")
            .with_help_message("e.g. 1800 for a 30 minute exam")
            .prompt()?;
        match input.trim().parse::<u32>() {
            Ok(secs) if secs > 0 => {
                config.exam_seconds = Some(secs);
                config.save()?;
                println!("{} Exam timer set to {} seconds.", "✓".green(), secs);
            }
            _ => println!("{} Not a valid number of seconds.", "✗".red()),
        }
    } else if selection.contains("smoothing") {
        let input = Text::new("Smoothing constant k:")
            .with_help_message("Higher values need more attempts before the score firms up")
            .prompt()?;
        match input.trim().parse::<f64>() {
            Ok(k) if k > 0.0 => {
                config.readiness_smoothing = Some(k);
                config.save()?;
                println!("{} Smoothing constant set to {}.", "✓".green(), k);
            }
            _ => println!("{} Not a valid positive number.", "✗".red()),
        }
    }

    Ok(())
}
