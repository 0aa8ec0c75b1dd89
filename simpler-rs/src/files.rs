//! Script files as ordered line arrays.
//!
//! Reading splits on `\n` (a `\r\n` pair counts as one break) and a trailing
//! newline does not produce an extra empty line.  Writing terminates every
//! line with `\n`, so any lines free of line breaks survive a write and a
//! read unchanged.

use std::io;
use std::path::Path;

/// Split file contents into lines.
pub fn split_lines(text: &str) -> Vec<String> {
    text.lines().map(str::to_owned).collect()
}

/// Join lines into file contents, each terminated by `\n`.
pub fn join_lines<S: AsRef<str>>(lines: &[S]) -> String {
    let mut out = String::with_capacity(lines.iter().map(|l| l.as_ref().len() + 1).sum());
    for line in lines {
        out.push_str(line.as_ref());
        out.push('\n');
    }
    out
}

/// Read a script file into its lines.
pub async fn read_lines(path: impl AsRef<Path>) -> io::Result<Vec<String>> {
    let text = tokio::fs::read_to_string(path).await?;
    Ok(split_lines(&text))
}

/// Write lines to a file, replacing its contents.
pub async fn write_lines<S: AsRef<str>>(path: impl AsRef<Path>, lines: &[S]) -> io::Result<()> {
    tokio::fs::write(path, join_lines(lines)).await
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trailing_newline_adds_no_line() {
        assert_eq!(split_lines("a\nb\n"), ["a", "b"]);
        assert_eq!(split_lines("a\r\nb"), ["a", "b"]);
        assert!(split_lines("").is_empty());
    }

    #[test]
    fn blank_lines_are_kept() {
        assert_eq!(split_lines("a\n\nb"), ["a", "", "b"]);
        assert_eq!(join_lines(&["", "x"]), "\nx\n");
    }

    #[tokio::test]
    async fn write_then_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prog.spp");
        let lines = ["INT x = 1", "", "PRINTVAR x endl"];
        write_lines(&path, &lines).await.unwrap();
        assert_eq!(read_lines(&path).await.unwrap(), lines);
    }

    #[tokio::test]
    async fn missing_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_lines(dir.path().join("nope")).await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }
}
