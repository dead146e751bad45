use crate::logger::Logger;
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{stdout, IsTerminal};
use std::time::Duration;

pub(crate) enum ProgressStatus {
    Success,
    Warn,
    Error,
}

/// Spinner of a single stack operation, in the cargo-like style
pub(crate) struct Progress {
    progress_bar: ProgressBar,
    stack_name: String,
}

impl Progress {
    /// A hidden progress draws nothing, e.g. in structured output mode
    pub(crate) fn new(stack_name: &str, is_hidden: bool) -> Self {
        let progress_bar = if is_hidden {
            ProgressBar::hidden()
        } else {
            Logger::multi_progress().add(ProgressBar::new_spinner())
        };

        if let Ok(style) = ProgressStyle::with_template("{spinner:.cyan} {msg}") {
            progress_bar.set_style(style);
        }

        progress_bar.enable_steady_tick(Duration::from_millis(120));

        Self {
            progress_bar,
            stack_name: stack_name.to_string(),
        }
    }

    pub(crate) fn log_stage(&self, stage: &str) {
        let msg = format!(
            "{} {}",
            console::style(Self::with_padding(stage)).green().bold(),
            self.stack_name,
        );

        // Terminal or CI/CD?
        if stdout().is_terminal() {
            self.progress_bar.set_message(msg);
        } else {
            self.progress_bar.suspend(|| {
                println!("{msg}");
            });
        }
    }

    pub(crate) fn finish(&self, stage: &str, status: ProgressStatus, message: Option<&str>) {
        let stage = console::style(Self::with_padding(stage)).bold();

        let stage = match status {
            ProgressStatus::Success => stage.green(),
            ProgressStatus::Warn => stage.yellow(),
            ProgressStatus::Error => stage.red(),
        };

        let message = message.map(|m| format!(": {m}")).unwrap_or_default();

        self.progress_bar
            .finish_with_message(format!("{} {}{}", stage, self.stack_name, message));
    }

    pub(crate) fn error(&self, stage: &str) {
        self.finish(stage, ProgressStatus::Error, None);
    }

    // Required padding to make the message centered in the cargo-like style
    fn with_padding(message: &str) -> String {
        format!("{message:>12}")
    }
}
