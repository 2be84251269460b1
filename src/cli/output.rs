//! CLI output formatting utilities.

use crate::synthesis::SynthesisErrorKind;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};

/// Output helper for CLI formatting.
pub struct Output;

impl Output {
    /// Print an info message.
    pub fn info(msg: &str) {
        println!("{} {}", style(">>").cyan().bold(), msg);
    }

    /// Print a success message.
    pub fn success(msg: &str) {
        println!("{} {}", style(">>").green().bold(), msg);
    }

    /// Print a warning message.
    pub fn warning(msg: &str) {
        eprintln!("{} {}", style(">>").yellow().bold(), msg);
    }

    /// Print an error message.
    pub fn error(msg: &str) {
        eprintln!("{} {}", style(">>").red().bold(), msg);
    }

    /// Print a header.
    pub fn header(msg: &str) {
        println!("\n{}", style(msg).bold().underlined());
    }

    /// Print a key-value pair.
    pub fn kv(key: &str, value: &str) {
        println!("  {}: {}", style(key).dim(), value);
    }

    /// Print a finished pipeline stage.
    pub fn stage_done(stage: &str, msg: &str) {
        println!("  {} {} {}", style("*").cyan(), style(stage).bold(), style(msg).dim());
    }

    /// Print a synthesis failure with its title and hint.
    pub fn synthesis_failure(kind: SynthesisErrorKind, detail: &str) {
        eprintln!("{} {}", style(">>").red().bold(), style(kind.title()).bold());
        eprintln!("   {}", kind.hint());
        eprintln!("   {}", style(detail).dim());
    }

    /// Create a progress bar over `[0, len]`.
    pub fn progress_bar(len: u64, msg: &str) -> ProgressBar {
        let pb = ProgressBar::new(len);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {percent}% {msg}")
                .unwrap()
                .progress_chars("#>-"),
        );
        pb.set_message(msg.to_string());
        pb
    }

    /// Create a spinner.
    pub fn spinner(msg: &str) -> ProgressBar {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} {msg}")
                .unwrap(),
        );
        pb.set_message(msg.to_string());
        pb.enable_steady_tick(std::time::Duration::from_millis(100));
        pb
    }
}

/// Word count plus estimated speaking time, e.g. "742 words, ~5 min".
pub fn narration_summary(text: &str) -> String {
    let words = text.split_whitespace().count();
    let minutes = (words as f64 / crate::tour::WORDS_PER_MINUTE as f64).round() as u64;
    format!("{} words, ~{} min", words, minutes.max(1))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_narration_summary() {
        let text = vec!["word"; 300].join(" ");
        assert_eq!(narration_summary(&text), "300 words, ~2 min");
        assert_eq!(narration_summary("short"), "1 words, ~1 min");
    }
}
