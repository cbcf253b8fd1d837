//! Terminal progress bar fed by core progress events.

use indicatif::{ProgressBar, ProgressStyle};
use pdfbench_core::{Progress, ProgressEvent, TracingProgress};
use std::io::IsTerminal;
use std::time::Duration;

/// Drives an `indicatif` bar and forwards every event to `tracing` underneath it.
pub struct BarProgress {
    bar: ProgressBar,
}

impl BarProgress {
    pub fn new() -> Self {
        let bar = ProgressBar::new(0);
        let style = ProgressStyle::with_template(
            "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("#>-");
        bar.set_style(style);
        bar.enable_steady_tick(Duration::from_millis(80));
        Self { bar }
    }

    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

impl Progress for BarProgress {
    fn event(&self, event: ProgressEvent<'_>) {
        match event {
            ProgressEvent::PassStarted { total, engines } => {
                self.bar.set_length((total * engines) as u64);
                self.bar.set_position(0);
            }
            ProgressEvent::DocumentStarted { document, .. } => {
                self.bar.set_message(document.to_string());
            }
            ProgressEvent::PairFinished { .. }
            | ProgressEvent::PairFailed { .. }
            | ProgressEvent::PairSkipped { .. } => self.bar.inc(1),
            ProgressEvent::ExportDiscovered { index, total, .. } => {
                self.bar.set_length(total as u64);
                self.bar.set_position(index as u64);
                self.bar.set_message("exports");
            }
            ProgressEvent::GroupScored {
                index,
                total,
                document,
                ..
            } => {
                self.bar.set_length(total as u64);
                self.bar.set_position(index as u64);
                self.bar.set_message(document.to_string());
            }
            ProgressEvent::ReportWritten { .. } => {}
        }
        self.bar.suspend(|| TracingProgress.event(event));
    }
}

/// Bar on an interactive stderr, plain tracing otherwise.
pub enum Reporter {
    Bar(BarProgress),
    Plain(TracingProgress),
}

impl Reporter {
    pub fn for_stderr(quiet: bool) -> Self {
        if !quiet && std::io::stderr().is_terminal() {
            Self::Bar(BarProgress::new())
        } else {
            Self::Plain(TracingProgress)
        }
    }

    pub fn as_progress(&self) -> &dyn Progress {
        match self {
            Self::Bar(bar) => bar,
            Self::Plain(plain) => plain,
        }
    }

    pub fn finish(&self) {
        if let Self::Bar(bar) = self {
            bar.finish();
        }
    }
}
