//! Spinner shown while a target streams records.

use following_scraper::{FollowedProfile, RecordSink, SinkError, StreamEnd};
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Forwards records to `inner` and ticks a spinner per record.
pub struct ProgressSink<S> {
    inner: S,
    bar: ProgressBar,
    label: String,
}

impl<S: RecordSink> ProgressSink<S> {
    pub fn new(inner: S, label: &str) -> Self {
        Self {
            inner,
            bar: create_spinner(&format!("{label}  starting")),
            label: label.to_string(),
        }
    }
}

impl<S: RecordSink> RecordSink for ProgressSink<S> {
    fn emit(&mut self, record: &FollowedProfile) -> Result<(), SinkError> {
        self.inner.emit(record)?;
        self.bar.inc(1);
        self.bar.set_message(format!(
            "{}  {} records \x1b[2m{}\x1b[0m",
            self.label,
            self.bar.position(),
            record.title
        ));
        Ok(())
    }

    fn finish(&mut self, end: &StreamEnd) -> Result<(), SinkError> {
        let result = self.inner.finish(end);
        self.bar.finish_and_clear();
        result
    }
}

/// Create a simple spinner for a running target.
pub fn create_spinner(message: &str) -> ProgressBar {
    let bar = ProgressBar::new_spinner();
    bar.set_style(
        ProgressStyle::with_template("  {spinner:.cyan} {msg}")
            .expect("spinner template is valid")
            .tick_chars("\u{25b8}\u{25b9}\u{25b8}\u{25b9}\u{25b8}"),
    );
    bar.set_message(message.to_string());
    bar.enable_steady_tick(Duration::from_millis(120));
    bar
}
