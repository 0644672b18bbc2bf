//! Terminal output: colors, symbols and the end-of-run summary.

use crate::runner::TargetOutcome;
use std::io::IsTerminal;

/// Check if color output is enabled.
pub fn color_enabled() -> bool {
    // https://no-color.org/
    if std::env::var("NO_COLOR").is_ok() {
        return false;
    }
    std::io::stderr().is_terminal()
}

const GREEN: &str = "\x1b[32m";
const RED: &str = "\x1b[31m";
const YELLOW: &str = "\x1b[33m";
const DIM: &str = "\x1b[2m";
const BOLD: &str = "\x1b[1m";
const RESET: &str = "\x1b[0m";

/// Colored string builder.
pub struct Styled {
    use_color: bool,
}

impl Default for Styled {
    fn default() -> Self {
        Self::new()
    }
}

impl Styled {
    pub fn new() -> Self {
        Self {
            use_color: color_enabled(),
        }
    }

    pub fn plain() -> Self {
        Self { use_color: false }
    }

    pub fn ok_sym(&self) -> &str {
        if self.use_color {
            "\x1b[32m\u{2713}\x1b[0m"
        } else {
            "OK"
        }
    }

    pub fn fail_sym(&self) -> &str {
        if self.use_color {
            "\x1b[31m\u{2717}\x1b[0m"
        } else {
            "!!"
        }
    }

    /// Partial output: aborted after some records were written.
    pub fn warn_sym(&self) -> &str {
        if self.use_color {
            "\x1b[33m\u{26a0}\x1b[0m"
        } else {
            "??"
        }
    }

    fn paint(&self, code: &str, s: &str) -> String {
        if self.use_color {
            format!("{code}{s}{RESET}")
        } else {
            s.to_string()
        }
    }

    pub fn green(&self, s: &str) -> String {
        self.paint(GREEN, s)
    }

    pub fn red(&self, s: &str) -> String {
        self.paint(RED, s)
    }

    pub fn yellow(&self, s: &str) -> String {
        self.paint(YELLOW, s)
    }

    pub fn dim(&self, s: &str) -> String {
        self.paint(DIM, s)
    }

    pub fn bold(&self, s: &str) -> String {
        self.paint(BOLD, s)
    }
}

/// Format milliseconds into a short human-readable duration (e.g. "1m 5s").
pub fn format_duration_ms(ms: u64) -> String {
    if ms < 1_000 {
        return format!("{ms}ms");
    }
    let secs = ms / 1_000;
    if secs < 60 {
        format!("{}.{}s", secs, (ms % 1_000) / 100)
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m", secs / 3600, (secs % 3600) / 60)
    }
}

/// Print JSON output to stdout.
pub fn print_json(value: &serde_json::Value) {
    if let Ok(s) = serde_json::to_string_pretty(value) {
        println!("{s}");
    }
}

/// One block per target on stderr.
pub fn print_summary(s: &Styled, outcomes: &[TargetOutcome]) {
    eprintln!();
    for outcome in outcomes {
        for line in summary_lines(s, outcome) {
            eprintln!("{line}");
        }
    }
}

fn summary_lines(s: &Styled, outcome: &TargetOutcome) -> Vec<String> {
    let mut lines = Vec::new();
    let Some(report) = &outcome.report else {
        lines.push(format!(
            "  {} {}  {}",
            s.fail_sym(),
            s.bold(&outcome.target),
            s.red(outcome.error.as_deref().unwrap_or("failed"))
        ));
        return lines;
    };

    let (sym, status) = match report.exit_code() {
        0 => (s.ok_sym(), s.green(&report.status.to_string())),
        1 => (s.fail_sym(), s.red(&report.status.to_string())),
        _ => (s.warn_sym(), s.yellow(&report.status.to_string())),
    };
    lines.push(format!("  {sym} {}  {status}", s.bold(&outcome.target)));
    lines.push(format!(
        "      {:<12} {}  {}",
        "records",
        report.records,
        s.dim(&format!(
            "({} duplicates, {} rejected, {} warnings)",
            report.duplicates, report.rejected, report.warnings
        ))
    ));
    lines.push(format!(
        "      {:<12} {} in {}",
        "pages",
        report.pages,
        format_duration_ms(report.elapsed_ms)
    ));
    if let Some(detail) = &outcome.error {
        lines.push(format!("      {:<12} {}", "reason", detail));
    }
    for file in &outcome.files {
        lines.push(format!("      {:<12} {}", "wrote", file.display()));
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use following_scraper::{AbortReason, RunReport, TerminalStatus};
    use std::path::PathBuf;

    fn report(status: TerminalStatus, records: usize) -> RunReport {
        RunReport {
            status,
            records,
            duplicates: 3,
            rejected: 1,
            warnings: 0,
            pages: 2,
            retries: 0,
            elapsed_ms: 1_250,
        }
    }

    #[test]
    fn test_format_duration_ms() {
        assert_eq!(format_duration_ms(250), "250ms");
        assert_eq!(format_duration_ms(1_250), "1.2s");
        assert_eq!(format_duration_ms(65_000), "1m 5s");
        assert_eq!(format_duration_ms(7_380_000), "2h 3m");
    }

    #[test]
    fn test_summary_for_completed_run() {
        let outcome = TargetOutcome {
            target: "UncutMagazine".into(),
            listing: Some("https://www.facebook.com/UncutMagazine/following".into()),
            files: vec![PathBuf::from("output/00_UncutMagazine.json")],
            report: Some(report(TerminalStatus::LimitReached, 5)),
            error: None,
        };
        let lines = summary_lines(&Styled::plain(), &outcome);
        assert_eq!(lines[0], "  OK UncutMagazine  limitReached");
        assert!(lines[1].contains("5  (3 duplicates, 1 rejected, 0 warnings)"));
        assert!(lines[2].ends_with("2 in 1.2s"));
        assert!(lines[3].ends_with("output/00_UncutMagazine.json"));
    }

    #[test]
    fn test_summary_for_partial_and_failed_runs() {
        let partial = TargetOutcome {
            target: "someone".into(),
            listing: None,
            files: Vec::new(),
            report: Some(report(TerminalStatus::Aborted(AbortReason::Cancelled), 4)),
            error: Some("cancelled by caller".into()),
        };
        let lines = summary_lines(&Styled::plain(), &partial);
        assert_eq!(lines[0], "  ?? someone  aborted:cancelled");
        assert!(lines[3].contains("cancelled by caller"));

        let failed = TargetOutcome {
            target: "not a profile".into(),
            listing: None,
            files: Vec::new(),
            report: None,
            error: Some("cannot resolve target".into()),
        };
        let lines = summary_lines(&Styled::plain(), &failed);
        assert_eq!(lines, vec!["  !! not a profile  cannot resolve target"]);
    }
}
