//! Log capture and retrieval (§4.5 `logs`): stdout/stderr are captured
//! to separate append-only files, one `<RFC3339Nano> <text>\n` line per
//! write, and interleaved by timestamp on read with stdout winning
//! ties (§8 property 7).

use std::io::{BufRead, BufReader, Write};
use std::path::Path;

use chrono::{DateTime, Utc};
use servin_shared::ServinResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stream {
    Stdout,
    Stderr,
}

#[derive(Debug, Clone)]
pub struct LogLine {
    pub timestamp: DateTime<Utc>,
    pub stream: Stream,
    pub text: String,
}

pub fn append_line(path: &Path, text: &str) -> ServinResult<()> {
    let mut file = std::fs::OpenOptions::new().create(true).append(true).open(path)?;
    writeln!(file, "{} {}", Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Nanos, true), text)?;
    Ok(())
}

/// Lines missing (or with an unparseable) timestamp prefix are kept,
/// not dropped — attributed to "now" at read time (§6).
fn read_lines(path: &Path, stream: Stream) -> Vec<LogLine> {
    let Ok(file) = std::fs::File::open(path) else { return Vec::new() };
    BufReader::new(file)
        .lines()
        .map_while(Result::ok)
        .map(|line| {
            let parsed = line
                .split_once(' ')
                .and_then(|(ts, text)| DateTime::parse_from_rfc3339(ts).ok().map(|t| (t.with_timezone(&Utc), text.to_string())));
            match parsed {
                Some((timestamp, text)) => LogLine { timestamp, stream, text },
                None => LogLine { timestamp: Utc::now(), stream, text: line },
            }
        })
        .collect()
}

/// Merge stdout and stderr by timestamp, ties broken stdout-first
/// (§8 property 7), optionally keeping only the last `tail` lines and
/// those within `[since, until]`.
pub fn read_interleaved(
    stdout_path: &Path,
    stderr_path: &Path,
    tail: Option<usize>,
    since: Option<DateTime<Utc>>,
    until: Option<DateTime<Utc>>,
) -> Vec<LogLine> {
    let mut lines = read_lines(stdout_path, Stream::Stdout);
    lines.extend(read_lines(stderr_path, Stream::Stderr));
    lines.sort_by(|a, b| match a.timestamp.cmp(&b.timestamp) {
        std::cmp::Ordering::Equal => match (a.stream, b.stream) {
            (Stream::Stdout, Stream::Stderr) => std::cmp::Ordering::Less,
            (Stream::Stderr, Stream::Stdout) => std::cmp::Ordering::Greater,
            _ => std::cmp::Ordering::Equal,
        },
        other => other,
    });

    let mut lines: Vec<LogLine> = lines
        .into_iter()
        .filter(|l| since.map(|s| l.timestamp >= s).unwrap_or(true))
        .filter(|l| until.map(|u| l.timestamp <= u).unwrap_or(true))
        .collect();

    if let Some(n) = tail {
        let start = lines.len().saturating_sub(n);
        lines = lines.split_off(start);
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn interleaves_stdout_and_stderr_in_timestamp_order() {
        let dir = tempdir().unwrap();
        let stdout = dir.path().join("stdout.log");
        let stderr = dir.path().join("stderr.log");
        append_line(&stdout, "first").unwrap();
        std::thread::sleep(std::time::Duration::from_millis(2));
        append_line(&stderr, "second").unwrap();
        std::thread::sleep(std::time::Duration::from_millis(2));
        append_line(&stdout, "third").unwrap();

        let lines = read_interleaved(&stdout, &stderr, None, None, None);
        let texts: Vec<&str> = lines.iter().map(|l| l.text.as_str()).collect();
        assert_eq!(texts, vec!["first", "second", "third"]);
    }

    #[test]
    fn lines_missing_a_timestamp_are_kept_not_dropped() {
        let dir = tempdir().unwrap();
        let stdout = dir.path().join("stdout.log");
        let stderr = dir.path().join("stderr.log");
        std::fs::write(&stdout, b"no timestamp here\n").unwrap();
        append_line(&stdout, "has one").unwrap();

        let lines = read_interleaved(&stdout, &stderr, None, None, None);
        let texts: Vec<&str> = lines.iter().map(|l| l.text.as_str()).collect();
        assert_eq!(texts.len(), 2);
        assert!(texts.contains(&"no timestamp here"));
    }

    #[test]
    fn tail_keeps_only_the_last_n_lines() {
        let dir = tempdir().unwrap();
        let stdout = dir.path().join("stdout.log");
        let stderr = dir.path().join("stderr.log");
        for i in 0..5 {
            append_line(&stdout, &format!("line{i}")).unwrap();
        }
        let lines = read_interleaved(&stdout, &stderr, Some(2), None, None);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1].text, "line4");
    }
}
