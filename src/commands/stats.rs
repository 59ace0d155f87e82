use anyhow::Result;
use colored::Colorize;

use crate::config::Config;
use crate::stats::{ActivitySummary, Overview, StatsAggregator};
use crate::storage::Database;

const WEEKDAYS: [&str; 7] = ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"];

/// Render the full dashboard: accuracy, mastery, readiness, streaks,
/// activity, and the exam trend
pub fn run() -> Result<()> {
    let config = Config::load()?;
    let db = Database::open()?;
    let stats = StatsAggregator::new(&db, config.readiness_smoothing());

    let overview = stats.overview();
    let activity = stats.activity();

    print_overview(&overview);
    print_chapters(&overview);
    print_activity(&activity);
    print_trend(&stats);

    Ok(())
}

fn print_overview(overview: &Overview) {
    println!("\n{}", "Dashboard".bold());
    println!("{}", "═".repeat(60).cyan());

    if overview.total_events == 0 {
        println!("  {} No answers recorded yet - take a quiz first!", "!".yellow());
        return;
    }

    println!(
        "  Accuracy: {}   Mastery: {}   Preparation: {}",
        format!("{:.0}%", overview.accuracy * 100.0).cyan().bold(),
        format!("{}%", overview.mastery_percent).cyan().bold(),
        score_colored(overview.preparation_score)
    );
    println!(
        "  {} answers given, {} of them correct",
        overview.total_events,
        overview.correct_events.to_string().green()
    );
}

fn print_chapters(overview: &Overview) {
    if overview.chapters.is_empty() {
        return;
    }

    println!("\n{}", "Chapter readiness".bold());
    for chapter in &overview.chapters {
        let filled = (chapter.readiness as usize * 20) / 100;
        let bar = format!("{}{}", "█".repeat(filled), "░".repeat(20 - filled));

        println!(
            "  {:<24} {} {}",
            chapter.category.name,
            bar.cyan(),
            score_colored(chapter.readiness)
        );
        println!(
            "      {} solved of {} · {} attempts · {} wrong",
            chapter.unique_correct.to_string().green(),
            chapter.total_questions,
            chapter.total_events,
            chapter.wrong_events.to_string().red()
        );
    }
}

fn print_activity(activity: &ActivitySummary) {
    println!("\n{}", "Activity".bold());
    println!(
        "  Daily streak: {}",
        format!("{} day(s)", activity.daily_streak).cyan().bold()
    );

    let max = activity.weekday_counts.iter().copied().max().unwrap_or(0);
    if max > 0 {
        for (name, count) in WEEKDAYS.iter().zip(activity.weekday_counts.iter()) {
            let width = ((count * 24) / max) as usize;
            println!(
                "  {} {} {}",
                name.dimmed(),
                "▇".repeat(width).cyan(),
                count
            );
        }
    }

    let strip: String = activity
        .last_28_days
        .iter()
        .map(|&active| if active { '■' } else { '·' })
        .collect();
    println!("  Last 28 days: {}", strip.green());
}

fn print_trend(stats: &StatsAggregator) {
    let trend = stats.exam_trend();
    if trend.iter().all(|p| p.is_none()) {
        return;
    }

    println!("\n{}", "Exam trend (last 10)".bold());
    let line: Vec<String> = trend
        .iter()
        .map(|point| match point {
            Some(p) => format!("{}/{}", p.correct, p.total),
            None => "--".dimmed().to_string(),
        })
        .collect();
    println!("  {}", line.join("  "));
    println!();
}

fn score_colored(score: u32) -> colored::ColoredString {
    let text = format!("{}", score);
    if score >= 75 {
        text.green().bold()
    } else if score >= 40 {
        text.yellow().bold()
    } else {
        text.red().bold()
    }
}
