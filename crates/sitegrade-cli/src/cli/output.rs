//! Terminal output: colors, symbols, bars and the global output flags.

use std::io::IsTerminal;

/// Check if color output is enabled.
pub fn color_enabled() -> bool {
    // https://no-color.org/
    if std::env::var_os("NO_COLOR").is_some() {
        return false;
    }
    if std::env::var_os("SITEGRADE_NO_COLOR").is_some() {
        return false;
    }
    std::io::stdout().is_terminal()
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

    pub fn ok_sym(&self) -> &'static str {
        if self.use_color {
            "\x1b[32m\u{2713}\x1b[0m"
        } else {
            "OK"
        }
    }

    pub fn fail_sym(&self) -> &'static str {
        if self.use_color {
            "\x1b[31m\u{2717}\x1b[0m"
        } else {
            "!!"
        }
    }

    pub fn warn_sym(&self) -> &'static str {
        if self.use_color {
            "\x1b[33m\u{26a0}\x1b[0m"
        } else {
            "??"
        }
    }

    /// Neutral marker for metrics that were not measured.
    pub fn skip_sym(&self) -> &'static str {
        if self.use_color {
            "\x1b[2m\u{25cb}\x1b[0m"
        } else {
            "--"
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

    /// Color a 0–100 score: green from 80, yellow from 50, red below.
    pub fn score(&self, score: f64, text: &str) -> String {
        if score >= 80.0 {
            self.green(text)
        } else if score >= 50.0 {
            self.yellow(text)
        } else {
            self.red(text)
        }
    }

    /// Symbol for a metric sub-score.
    pub fn subscore_sym(&self, subscore: Option<f64>) -> &'static str {
        match subscore {
            None => self.skip_sym(),
            Some(s) if s >= 80.0 => self.ok_sym(),
            Some(s) if s >= 50.0 => self.warn_sym(),
            Some(_) => self.fail_sym(),
        }
    }
}

/// Print the branded header.
pub fn print_header(s: &Styled) {
    println!(
        "  {} {}",
        s.bold("sitegrade"),
        s.dim(&format!("v{}", env!("CARGO_PKG_VERSION")))
    );
    println!();
}

pub fn print_section(s: &Styled, title: &str) {
    println!("  {}", s.bold(title));
}

/// Print a check line with symbol and label/value.
pub fn print_check(symbol: &str, label: &str, value: &str) {
    println!("    {symbol} {label:<28} {value}");
}

/// Print an indented detail line under a check.
pub fn print_detail(msg: &str) {
    println!("                                   {msg}");
}

/// Format milliseconds for humans (e.g. "850ms", "4.2s", "2m 5s").
pub fn format_duration_ms(ms: u128) -> String {
    if ms < 1_000 {
        format!("{ms}ms")
    } else if ms < 60_000 {
        format!("{:.1}s", ms as f64 / 1_000.0)
    } else {
        let secs = ms / 1_000;
        format!("{}m {}s", secs / 60, secs % 60)
    }
}

/// Fixed-width bar for a 0–100 score.
pub fn score_bar(score: f64, width: usize) -> String {
    let filled = ((score.clamp(0.0, 100.0) / 100.0) * width as f64).round() as usize;
    format!(
        "{}{}",
        "\u{2588}".repeat(filled),
        "\u{2591}".repeat(width - filled)
    )
}

/// Coverage as a whole percentage.
pub fn percent(ratio: f64) -> String {
    format!("{:.0}%", ratio * 100.0)
}

pub fn is_quiet() -> bool {
    std::env::var_os("SITEGRADE_QUIET").is_some()
}

pub fn is_verbose() -> bool {
    std::env::var_os("SITEGRADE_VERBOSE").is_some()
}

pub fn is_json() -> bool {
    std::env::var_os("SITEGRADE_JSON").is_some()
}

/// Print pretty JSON to stdout.
pub fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    let s = serde_json::to_string_pretty(value)?;
    println!("{s}");
    Ok(())
}
