use anyhow::Result;
use chrono::{DateTime, Datelike, Duration, Local, NaiveDate, Utc};
use std::collections::HashSet;

use crate::storage::{AnswerLedger, Category, Database, QuestionStore, SessionStore};

/// How many exam results the trend view holds, padding with blanks.
pub const TREND_LEN: usize = 10;
pub const ACTIVITY_DAYS: usize = 28;

#[derive(Debug, Clone)]
pub struct ChapterBreakdown {
    pub category: Category,
    pub total_questions: i64,
    pub total_events: i64,
    pub unique_correct: i64,
    pub wrong_events: i64,
    /// 0-100 readiness heuristic for this chapter
    pub readiness: u32,
}

#[derive(Debug, Clone, Default)]
pub struct Overview {
    pub total_events: i64,
    pub correct_events: i64,
    /// Correct events over all events, 0 with an empty ledger
    pub accuracy: f64,
    /// Percent of the bank ever answered correctly at least once
    pub mastery_percent: u32,
    /// Chapter readiness averaged, weighted by chapter size
    pub preparation_score: u32,
    pub chapters: Vec<ChapterBreakdown>,
}

#[derive(Debug, Clone)]
pub struct ExamPoint {
    pub correct: i64,
    pub total: i64,
    pub ended_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default)]
pub struct ActivitySummary {
    /// Consecutive days with a finished session, walking back from today
    pub daily_streak: u32,
    /// Finished sessions per weekday, Monday first
    pub weekday_counts: [i64; 7],
    /// One flag per day, oldest first, ending with today
    pub last_28_days: [bool; ACTIVITY_DAYS],
}

/// Chapter readiness: accuracy damped by sample size, blended with how much
/// of the chapter has been covered. `k` is the smoothing constant.
pub fn readiness_score(attempts: i64, unique_correct: i64, total_questions: i64, k: f64) -> u32 {
    let accuracy = if attempts > 0 {
        unique_correct as f64 / attempts as f64
    } else {
        0.0
    };
    let coverage = if total_questions > 0 {
        unique_correct as f64 / total_questions as f64
    } else {
        0.0
    };
    let reliability = 1.0 - (-(attempts as f64) / k).exp();
    let accuracy_adjusted = accuracy * (0.5 + 0.5 * reliability);

    let score = 100.0 * (0.55 * accuracy_adjusted + 0.35 * coverage.sqrt() + 0.10 * reliability);
    score.clamp(0.0, 100.0).round() as u32
}

/// Consecutive days with activity, counting back from `today`. A quiet today
/// is forgiven; the walk then starts at yesterday. The first gap stops it.
pub fn streak_from_days(days: &HashSet<NaiveDate>, today: NaiveDate) -> u32 {
    let mut cursor = if days.contains(&today) {
        today
    } else {
        today - Duration::days(1)
    };

    let mut streak = 0;
    while days.contains(&cursor) {
        streak += 1;
        cursor = cursor - Duration::days(1);
    }

    streak
}

/// Read-only derivation over the ledger, session history, and question bank.
/// Everything is recomputed from scratch on each call; a failing storage read
/// degrades to an empty result with a logged diagnostic instead of an error.
pub struct StatsAggregator<'a> {
    db: &'a Database,
    smoothing: f64,
}

impl<'a> StatsAggregator<'a> {
    pub fn new(db: &'a Database, smoothing: f64) -> Self {
        Self { db, smoothing }
    }

    pub fn overview(&self) -> Overview {
        match self.try_overview() {
            Ok(overview) => overview,
            Err(e) => {
                log::warn!("stats overview degraded to empty: {:#}", e);
                Overview::default()
            }
        }
    }

    fn try_overview(&self) -> Result<Overview> {
        let questions = QuestionStore::new(self.db);
        let ledger = AnswerLedger::new(self.db);

        let categories = questions.categories()?;
        let question_counts = questions.counts_per_category()?;
        let bank_total = questions.count()?;
        let per_category = ledger.stats_per_category()?;
        let (total_events, correct_events) = ledger.totals()?;
        let unique_correct_total = ledger.unique_correct_total()?;

        let mut chapters = Vec::with_capacity(categories.len());
        let mut weighted_sum = 0.0;

        for category in categories {
            let total_questions = question_counts.get(&category.id).copied().unwrap_or(0);
            let stats = per_category.get(&category.id).copied().unwrap_or_default();
            let readiness = readiness_score(
                stats.total_events,
                stats.unique_correct,
                total_questions,
                self.smoothing,
            );

            weighted_sum += readiness as f64 * total_questions as f64;
            chapters.push(ChapterBreakdown {
                category,
                total_questions,
                total_events: stats.total_events,
                unique_correct: stats.unique_correct,
                wrong_events: stats.wrong_events,
                readiness,
            });
        }

        let accuracy = if total_events > 0 {
            correct_events as f64 / total_events as f64
        } else {
            0.0
        };
        let mastery_percent = if bank_total > 0 {
            (100.0 * unique_correct_total as f64 / bank_total as f64).round() as u32
        } else {
            0
        };
        let preparation_score = if bank_total > 0 {
            (weighted_sum / bank_total as f64).round() as u32
        } else {
            0
        };

        Ok(Overview {
            total_events,
            correct_events,
            accuracy,
            mastery_percent,
            preparation_score,
            chapters,
        })
    }

    pub fn activity(&self) -> ActivitySummary {
        self.activity_on(Local::now().date_naive())
    }

    /// Activity relative to an explicit "today" (local calendar)
    pub fn activity_on(&self, today: NaiveDate) -> ActivitySummary {
        let days = match self.finished_session_days() {
            Ok(days) => days,
            Err(e) => {
                log::warn!("activity summary degraded to empty: {:#}", e);
                return ActivitySummary::default();
            }
        };

        let day_set: HashSet<NaiveDate> = days.iter().copied().collect();

        let mut weekday_counts = [0i64; 7];
        for day in &days {
            weekday_counts[day.weekday().num_days_from_monday() as usize] += 1;
        }

        let mut last_28_days = [false; ACTIVITY_DAYS];
        for (i, flag) in last_28_days.iter_mut().enumerate() {
            let day = today - Duration::days((ACTIVITY_DAYS - 1 - i) as i64);
            *flag = day_set.contains(&day);
        }

        ActivitySummary {
            daily_streak: streak_from_days(&day_set, today),
            weekday_counts,
            last_28_days,
        }
    }

    /// Last 10 finished exam results in chronological order, left-padded
    /// with blanks when fewer exist.
    pub fn exam_trend(&self) -> Vec<Option<ExamPoint>> {
        let exams = match SessionStore::new(self.db).recent_exams(TREND_LEN) {
            Ok(exams) => exams,
            Err(e) => {
                log::warn!("exam trend degraded to empty: {:#}", e);
                Vec::new()
            }
        };

        let mut trend: Vec<Option<ExamPoint>> = vec![None; TREND_LEN - exams.len().min(TREND_LEN)];
        trend.extend(exams.into_iter().map(|s| {
            Some(ExamPoint {
                correct: s.correct_answers,
                total: s.total_questions,
                ended_at: s.ended_at,
            })
        }));
        trend
    }

    /// Local calendar days of every finished session (one entry per session)
    fn finished_session_days(&self) -> Result<Vec<NaiveDate>> {
        let sessions = SessionStore::new(self.db).finished()?;
        Ok(sessions
            .iter()
            .map(|s| s.ended_at.with_timezone(&Local).date_naive())
            .collect())
    }
}
