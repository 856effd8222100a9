use chrono::{DateTime, Local};
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::config::TrainerSettings;
use crate::drill::LessonState;
use crate::error::TrainerResult;
use crate::stats::SessionStats;

/// Export a session summary as markdown into `dir`. Returns the file path.
pub fn export_session_report(
    dir: &Path,
    settings: &TrainerSettings,
    stats: &SessionStats,
    lesson: &LessonState,
) -> TrainerResult<PathBuf> {
    let now = Local::now();
    let filename = format!("CWDRILL-{}.md", now.format("%Y%m%d-%H%M%S"));
    let path = dir.join(filename);
    let content = session_report(settings, stats, lesson, now);

    let mut file = File::create(&path)?;
    file.write_all(content.as_bytes())?;
    info!("Exported session report to {}", path.display());

    Ok(path)
}

/// Markdown summary of a session
pub fn session_report(
    settings: &TrainerSettings,
    stats: &SessionStats,
    lesson: &LessonState,
    now: DateTime<Local>,
) -> String {
    let analysis = stats.analyze();
    let mut md = String::new();

    // Header
    md.push_str("# CW Drill Session\n\n");
    md.push_str(&format!(
        "**Exported:** {}  \n",
        now.format("%Y-%m-%d %H:%M")
    ));
    md.push_str(&format!(
        "**Alphabet:** {}  \n",
        settings.lesson.alphabet.display_name()
    ));
    md.push_str(&format!("**Mode:** {:?}  \n", settings.drill.mode));
    md.push_str(&format!(
        "**Speed:** {:.1} WPM at {:.0} Hz\n\n",
        settings.speed.wpm, settings.audio.tone_frequency_hz
    ));

    // Session Summary
    md.push_str("## Session Summary\n\n");
    if analysis.total_attempts == 0 && analysis.total_words == 0 {
        md.push_str("No attempts logged yet.\n\n");
    } else {
        md.push_str(&format!(
            "- Characters: {}/{} ({:.1}%)\n",
            analysis.correct_attempts, analysis.total_attempts, analysis.accuracy
        ));
        md.push_str(&format!(
            "- Words: {}/{} ({:.1}%)\n",
            analysis.correct_words, analysis.total_words, analysis.word_accuracy
        ));
        md.push_str(&format!(
            "- Average Response: {:.0} ms\n\n",
            analysis.avg_latency_ms
        ));
    }

    // Lesson progress
    md.push_str("## Lesson\n\n");
    let active: String = lesson.active_characters.iter().collect();
    md.push_str(&format!(
        "- Active Characters ({}): {}\n\n",
        lesson.active_characters.len(),
        active
    ));
    md.push_str("| Char | Attempts | Correct | Accuracy | Avg Response |\n");
    md.push_str("|------|----------|---------|----------|--------------|\n");
    for ch in &lesson.active_characters {
        if let Some(p) = lesson.proficiency.get(ch) {
            md.push_str(&format!(
                "| {} | {} | {} | {:.1}% | {:.0} ms |\n",
                ch,
                p.attempt_count,
                p.correct_count,
                p.accuracy() * 100.0,
                p.ema_latency_ms
            ));
        }
    }
    md.push('\n');

    // Character Error Analysis
    md.push_str("## Character Error Analysis\n\n");
    let errors_with_rate: Vec<_> = analysis
        .char_error_rates
        .iter()
        .filter(|(_, rate, _)| *rate > 0.0)
        .take(10)
        .collect();
    if errors_with_rate.is_empty() {
        md.push_str("No character errors recorded.\n");
    } else {
        md.push_str("| Char | Error Rate | Samples |\n");
        md.push_str("|------|------------|--------|\n");
        for (ch, error_rate, count) in errors_with_rate {
            md.push_str(&format!("| {} | {:.1}% | {} |\n", ch, error_rate, count));
        }
    }

    md
}
