//! An immutable sequence of source lines for one run.

use std::sync::Arc;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Program {
    lines: Arc<[String]>,
}

impl Program {
    pub fn new(lines: impl Into<Arc<[String]>>) -> Self {
        Self { lines: lines.into() }
    }

    /// Split source text into lines.  A trailing newline does not produce an
    /// extra empty line.
    pub fn parse(src: &str) -> Self {
        Self::new(src.lines().map(str::to_owned).collect::<Vec<_>>())
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

impl From<Vec<String>> for Program {
    fn from(lines: Vec<String>) -> Self {
        Self::new(lines)
    }
}

impl<'a> FromIterator<&'a str> for Program {
    fn from_iter<I: IntoIterator<Item = &'a str>>(iter: I) -> Self {
        Self::new(iter.into_iter().map(str::to_owned).collect::<Vec<_>>())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_splits_lines() {
        let p = Program::parse("INT x = 1\nPRINTVAR x endl\n");
        assert_eq!(p.len(), 2);
        assert_eq!(p.lines()[1], "PRINTVAR x endl");
    }

    #[test]
    fn from_iter() {
        let p: Program = ["a", "b"].into_iter().collect();
        assert_eq!(p.lines(), ["a", "b"]);
        assert!(Program::default().is_empty());
    }
}
