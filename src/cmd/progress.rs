//! Spinners and progress bars for long-running commands

use crate::error::Result;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Spinner for a single Graph or LDAP call
pub fn create_spinner(message: &str) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    let style = ProgressStyle::default_spinner()
        .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏")
        .template("{spinner:.cyan} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner());
    spinner.set_style(style);
    spinner.set_message(message.to_string());
    spinner.enable_steady_tick(Duration::from_millis(80));
    spinner
}

/// Bar over the devices of a batch; the message shows the current name
pub fn create_progress_bar(total: u64, message: &str) -> ProgressBar {
    let bar = ProgressBar::new(total);
    let style = ProgressStyle::default_bar()
        .template("{spinner:.cyan} {prefix} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▓▒░ ");
    bar.set_style(style);
    bar.set_prefix(message.to_string());
    bar
}

pub fn finish_spinner_success(spinner: &ProgressBar, message: &str) {
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("{prefix:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.set_prefix("✓");
    spinner.finish_with_message(message.to_string());
}

pub fn finish_spinner_error(spinner: &ProgressBar, message: &str) {
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("{prefix:.red} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.set_prefix("✗");
    spinner.finish_with_message(message.to_string());
}

/// Finish with a count on success, or the error text on failure
pub fn finish_spinner<T>(spinner: &ProgressBar, result: &Result<Vec<T>>) {
    match result {
        Ok(items) => {
            finish_spinner_success(spinner, &format!("{} record(s) retrieved", items.len()))
        }
        Err(e) => finish_spinner_error(spinner, &e.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Dx365Error;

    #[test]
    fn test_create_progress_bar() {
        let bar = create_progress_bar(3, "Processing");
        assert_eq!(bar.length(), Some(3));
        bar.inc(2);
        assert_eq!(bar.position(), 2);
        bar.finish();
    }

    #[test]
    fn test_finish_spinner_on_both_outcomes() {
        let ok = create_spinner("Fetching...");
        finish_spinner(&ok, &Ok(vec![1, 2, 3]));
        assert!(ok.is_finished());

        let failed = create_spinner("Fetching...");
        let result: Result<Vec<u8>> = Err(Dx365Error::TokenNotFound);
        finish_spinner(&failed, &result);
        assert!(failed.is_finished());
    }
}
