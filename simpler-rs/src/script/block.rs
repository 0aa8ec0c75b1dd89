//! Block materializer.
//!
//! A block is a header line (`IF`, `FOR`, `MACRO`) followed by body lines up
//! to a terminator line that reads exactly `END <KEYWORD>`.  There is no
//! nesting bookkeeping: the first matching terminator closes the block, so an
//! `IF` nested directly inside an `IF` closes the outer block early.  A block
//! with no terminator runs to the end of the enclosing lines.

use std::fmt;
use std::ops::Range;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlockKind {
    If,
    For,
    Macro,
}

impl BlockKind {
    pub fn keyword(self) -> &'static str {
        match self {
            BlockKind::If => "IF",
            BlockKind::For => "FOR",
            BlockKind::Macro => "MACRO",
        }
    }

    /// The exact line that closes a block of this kind.
    pub fn terminator(self) -> &'static str {
        match self {
            BlockKind::If => "END IF",
            BlockKind::For => "END FOR",
            BlockKind::Macro => "END MACRO",
        }
    }
}

impl fmt::Display for BlockKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

/// Location of one block within a slice of lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    pub kind: BlockKind,
    pub header: usize,
    /// Body lines, terminator excluded.
    pub body: Range<usize>,
}

impl Block {
    /// Number of body lines.
    pub fn len(&self) -> usize {
        self.body.len()
    }

    pub fn is_empty(&self) -> bool {
        self.body.is_empty()
    }

    /// Lines from the header through the terminator.
    pub fn span(&self) -> usize {
        self.len() + 2
    }
}

/// Locate the body of the block whose header is `lines[header]`.
pub fn materialize(lines: &[String], header: usize, kind: BlockKind) -> Block {
    let start = header + 1;
    let terminator = kind.terminator();
    let end = lines
        .get(start..)
        .and_then(|rest| rest.iter().position(|l| l == terminator))
        .map_or(lines.len(), |off| start + off);
    Block { kind, header, body: start..end.max(start) }
}

/// Single-slot cache for the conditional or loop about to run.
///
/// Materializing the next block header overwrites the slot; executing a
/// block takes the body out, so each cached body is consumed once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockCache {
    pub kind: BlockKind,
    pub body: Vec<String>,
}

impl BlockCache {
    pub fn new(lines: &[String], block: &Block) -> Self {
        Self { kind: block.kind, body: lines[block.body.clone()].to_vec() }
    }

    pub fn len(&self) -> usize {
        self.body.len()
    }

    pub fn is_empty(&self) -> bool {
        self.body.is_empty()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(src: &str) -> Vec<String> {
        src.lines().map(str::to_owned).collect()
    }

    #[test]
    fn body_excludes_header_and_terminator() {
        let l = lines("IF x == 1\nPRINTSTR \"a\"\nx ++\nEND IF\nPRINTSTR \"b\"");
        let b = materialize(&l, 0, BlockKind::If);
        assert_eq!(b.body, 1..3);
        assert_eq!(b.span(), 4);
        let cache = BlockCache::new(&l, &b);
        assert_eq!(cache.body, ["PRINTSTR \"a\"", "x ++"]);
    }

    #[test]
    fn empty_body() {
        let l = lines("FOR i FROM 1 TO 2\nEND FOR");
        let b = materialize(&l, 0, BlockKind::For);
        assert!(b.is_empty());
        assert_eq!(b.span(), 2);
    }

    #[test]
    fn terminator_must_match_exactly() {
        let l = lines("MACRO m\nEND MACRO \nEND IF\nEND MACRO");
        let b = materialize(&l, 0, BlockKind::Macro);
        assert_eq!(b.body, 1..3);
    }

    #[test]
    fn same_kind_nesting_closes_outer_early() {
        let l = lines("IF a == 1\nIF b == 2\nPRINTSTR \"in\"\nEND IF\nPRINTSTR \"out\"\nEND IF");
        let outer = materialize(&l, 0, BlockKind::If);
        assert_eq!(outer.body, 1..3);
    }

    #[test]
    fn unterminated_runs_to_end() {
        let l = lines("FOR i FROM 1 TO 3\nPRINTVAR i");
        let b = materialize(&l, 0, BlockKind::For);
        assert_eq!(b.body, 1..2);
        let b = materialize(&l, 1, BlockKind::For);
        assert_eq!(b.body, 2..2);
    }
}
