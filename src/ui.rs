use colored::Colorize;

/// Widest entry label shown on a progress line.
const LABEL_WIDTH: usize = 72;

/// Leading glyph of a status line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mark {
    Info,
    Done,
    Warn,
}

/// Print a status line on stdout
pub fn note(mark: Mark, msg: &str) {
    let glyph = match mark {
        Mark::Info => "ℹ".blue(),
        Mark::Done => "✓".green(),
        Mark::Warn => "⚠".yellow(),
    };
    println!("{glyph} {msg}");
}

/// Print a failure headline with its detail underneath, on stderr
pub fn failure(headline: &str, detail: Option<&str>) {
    eprintln!("{} {}", "✗".red(), headline);
    if let Some(detail) = detail {
        for line in detail.lines() {
            eprintln!("  {}", line.dimmed());
        }
    }
}

/// Print the progress line of a manifest entry: `[n/total] kind label`
pub fn entry(num: usize, total: usize, kind: &str, label: &str) {
    println!(
        "{} {} {}",
        format!("[{num}/{total}]").blue().bold(),
        kind.cyan(),
        truncate(label, LABEL_WIDTH)
    );
}

/// Print the muted line that closes an entry in verbose runs
pub fn entry_done(label: &str) {
    println!("  {} {}", truncate(label, LABEL_WIDTH).dimmed(), "done".dimmed());
}

/// Print a titled block of aligned fields
pub fn card(title: &str, fields: &[(&str, String)]) {
    println!("{}", title.bold());
    for (key, value) in align(fields) {
        println!("  {} {}", key.dimmed(), value);
    }
}

/// Pad keys so the values of a card start in one column.
fn align<'a>(fields: &'a [(&str, String)]) -> Vec<(String, &'a str)> {
    let width = fields
        .iter()
        .map(|(key, _)| key.chars().count())
        .max()
        .unwrap_or(0);
    fields
        .iter()
        .map(|(key, value)| (format!("{key:<width$}"), value.as_str()))
        .collect()
}

/// Shorten text for one-line display, keeping the start
fn truncate(text: &str, max_len: usize) -> String {
    if text.chars().count() <= max_len {
        text.to_string()
    } else if max_len <= 3 {
        "...".to_string()
    } else {
        let kept: String = text.chars().take(max_len - 3).collect();
        format!("{kept}...")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_short() {
        assert_eq!(truncate("make", 10), "make");
        assert_eq!(truncate("exactly10!", 10), "exactly10!");
    }

    #[test]
    fn test_truncate_long() {
        assert_eq!(
            truncate("https://example.com/very/long/path", 16),
            "https://examp..."
        );
        assert_eq!(truncate("ééééé", 4), "é...");
    }

    #[test]
    fn test_truncate_tiny() {
        assert_eq!(truncate("abcdef", 2), "...");
    }

    #[test]
    fn test_align_pads_to_widest_key() {
        let fields = [
            ("Kind", "http".to_string()),
            ("Inline", "no".to_string()),
        ];
        let rows = align(&fields);
        assert_eq!(rows[0], ("Kind  ".to_string(), "http"));
        assert_eq!(rows[1], ("Inline".to_string(), "no"));
        assert!(align(&[]).is_empty());
    }
}
