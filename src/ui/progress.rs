use std::future::Future;
use std::time::Duration;

use console::style;
use indicatif::{ProgressBar, ProgressStyle};

use crate::ui::icons::CROSS;

/// A single-line spinner for one request. Draws to stderr and stays hidden
/// when stderr is not a terminal.
pub struct Spinner {
    bar: ProgressBar,
}

impl Spinner {
    pub fn start(message: &str) -> Self {
        let bar = ProgressBar::new_spinner();
        bar.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} {msg}")
                .expect("progress bar template is a valid static string"),
        );
        bar.set_message(message.to_string());
        bar.enable_steady_tick(Duration::from_millis(100));
        Self { bar }
    }

    /// Leave the spinner line showing `message` as a failure.
    pub fn fail(self, message: &str) {
        self.bar
            .finish_with_message(format!("{}{}", CROSS, style(message).red()));
    }

    /// Remove the spinner line without leaving a message.
    pub fn clear(self) {
        self.bar.finish_and_clear();
    }
}

/// Run `fut` while a spinner shows `message`; the line is cleared afterwards.
pub async fn with_spinner<F, T>(message: &str, fut: F) -> T
where
    F: Future<Output = T>,
{
    let spinner = Spinner::start(message);
    let out = fut.await;
    spinner.clear();
    out
}
