//! Statement records and the line classifier.
//!
//! Simpler++ has no parse tree.  Each source line is classified on its own,
//! every time it is about to run, into exactly one [`Stmt`].  Matching is
//! tried in a fixed priority order:
//!
//! 1. keywords whose arguments are whitespace-delimited
//!    (`INT`, `PRINTVAR`, `CALL`, `MUTABLE INT`, `//`, `GOTO`, `LABEL`);
//! 2. keywords whose arguments are quote-delimited (`STRING`, `PRINTSTR`);
//! 3. block openers (`IF`, `FOR`, `MACRO`);
//! 4. block terminators (`END IF`, `END FOR`, `END MACRO`);
//! 5. a declared string variable as the leading token (`name = "text"`);
//! 6. anything else, split on whitespace (`x += 1`, `m = 4`, comments).
//!
//! Groups 1–4 are a single anchored automaton whose pattern order encodes the
//! priority.

use std::sync::OnceLock;

use aho_corasick::{AhoCorasick, AhoCorasickBuilder, MatchKind};
use regex::Regex;

use super::block::BlockKind;
use super::error::ScriptError;

// ── Statement records ─────────────────────────────────────────────────────────

/// Comparison operator of an `IF` header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Eq,
    Ne,
    Lt,
    Gt,
    Le,
    Ge,
}

impl CmpOp {
    pub fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "==" => CmpOp::Eq,
            "!=" => CmpOp::Ne,
            "<" => CmpOp::Lt,
            ">" => CmpOp::Gt,
            "<=" => CmpOp::Le,
            ">=" => CmpOp::Ge,
            _ => return None,
        })
    }

    pub fn test<T: Ord + ?Sized>(self, lhs: &T, rhs: &T) -> bool {
        match self {
            CmpOp::Eq => lhs == rhs,
            CmpOp::Ne => lhs != rhs,
            CmpOp::Lt => lhs < rhs,
            CmpOp::Gt => lhs > rhs,
            CmpOp::Le => lhs <= rhs,
            CmpOp::Ge => lhs >= rhs,
        }
    }
}

/// Right-hand side of an `IF` comparison.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operand {
    Int(i64),
    Str(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Condition {
    pub name: String,
    pub op: CmpOp,
    pub rhs: Operand,
}

/// Upper bound of a `FOR` loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bound {
    Inclusive(i64),
    /// `TO NaN`: the loop never ends on its own.
    Unbounded,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoopHeader {
    pub var: String,
    pub from: i64,
    pub to: Bound,
    pub step: i64,
}

/// Reassignment operator.  Which ones apply depends on the target namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignOp {
    Set,
    Incr,
    Decr,
    Add,
    Sub,
    Mul,
    Div,
    Pow,
}

impl AssignOp {
    pub fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "=" => AssignOp::Set,
            "++" => AssignOp::Incr,
            "--" => AssignOp::Decr,
            "+=" => AssignOp::Add,
            "-=" => AssignOp::Sub,
            "*=" => AssignOp::Mul,
            "/=" => AssignOp::Div,
            "**=" => AssignOp::Pow,
            _ => return None,
        })
    }

    /// `++` and `--` take no right operand.
    pub fn is_unary(self) -> bool {
        matches!(self, AssignOp::Incr | AssignOp::Decr)
    }
}

/// One classified source line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Stmt {
    /// `INT name = 5`
    DeclareInt { name: String, value: i64 },
    /// `STRING name = "text"`
    DeclareStr { name: String, value: String },
    /// `MUTABLE INT name [= 5]`
    DeclareMutable { name: String, value: Option<i64> },
    /// `name <op> [operand]`, resolved against the namespaces at run time.
    Assign { name: String, args: Vec<String> },
    /// `name = "text"` where `name` is a declared string.
    AssignStr { name: String, value: String },
    /// `PRINTVAR name [endl]`
    PrintVar { name: String, newline: bool },
    /// `PRINTSTR "text" [endl]`
    PrintStr { text: String, newline: bool },
    /// `IF name <op> <operand>`
    If(Condition),
    /// `FOR var FROM a TO b [INCREMENT c]`
    For(LoopHeader),
    /// `MACRO name`
    Macro { name: String },
    /// `CALL name`
    Call { name: String },
    /// `LABEL name`
    Label { name: String },
    /// `GOTO name`
    Goto { name: String },
    /// `// …` or a blank line.
    Comment,
    /// `END IF`, `END FOR`, `END MACRO`
    End(BlockKind),
}

impl Stmt {
    /// The block kind this statement opens, if it is a block header.
    pub fn opens_block(&self) -> Option<BlockKind> {
        match self {
            Stmt::If(_) => Some(BlockKind::If),
            Stmt::For(_) => Some(BlockKind::For),
            Stmt::Macro { .. } => Some(BlockKind::Macro),
            _ => None,
        }
    }
}

// ── Keyword automaton ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Keyword {
    Int,
    PrintVar,
    Call,
    MutableInt,
    Comment,
    Goto,
    Label,
    Str,
    PrintStr,
    If,
    For,
    Macro,
    End(BlockKind),
}

/// Pattern order is match priority.
const KEYWORDS: &[(&str, Keyword)] = &[
    ("INT", Keyword::Int),
    ("PRINTVAR", Keyword::PrintVar),
    ("CALL", Keyword::Call),
    ("MUTABLE INT", Keyword::MutableInt),
    ("//", Keyword::Comment),
    ("GOTO", Keyword::Goto),
    ("LABEL", Keyword::Label),
    ("STRING", Keyword::Str),
    ("PRINTSTR", Keyword::PrintStr),
    ("IF", Keyword::If),
    ("FOR", Keyword::For),
    ("MACRO", Keyword::Macro),
    ("END IF", Keyword::End(BlockKind::If)),
    ("END FOR", Keyword::End(BlockKind::For)),
    ("END MACRO", Keyword::End(BlockKind::Macro)),
];

fn keyword_automaton() -> &'static AhoCorasick {
    static AC: OnceLock<AhoCorasick> = OnceLock::new();
    AC.get_or_init(|| {
        AhoCorasickBuilder::new()
            .anchored(true)
            .match_kind(MatchKind::LeftmostFirst)
            .build(KEYWORDS.iter().map(|(pat, _)| pat))
    })
}

/// Find the keyword the line starts with.  A keyword must be followed by
/// whitespace or the end of the line; `//` needs no separator.
fn leading_keyword(line: &str) -> Option<Keyword> {
    let m = keyword_automaton().find(line)?;
    let (_, kw) = KEYWORDS[m.pattern()];
    let at_boundary = line[m.end()..]
        .chars()
        .next()
        .map_or(true, char::is_whitespace);
    (kw == Keyword::Comment || at_boundary).then_some(kw)
}

fn quoted_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#""([^"]*)""#).expect("static regex"))
}

/// Text between the first pair of double quotes.
pub fn quoted(line: &str) -> Option<&str> {
    quoted_regex()
        .captures(line)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
}

// ── Classifier ────────────────────────────────────────────────────────────────

/// Classify one source line.
///
/// `is_string` reports whether a name is a declared string variable visible
/// to the statement; such a name as the leading token makes the line a
/// quoted string reassignment.
pub fn classify(line: &str, is_string: impl Fn(&str) -> bool) -> Result<Stmt, ScriptError> {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    let Some(&first) = tokens.first() else {
        return Ok(Stmt::Comment);
    };

    if let Some(kw) = leading_keyword(line) {
        return match kw {
            Keyword::Int => parse_int_decl(&tokens),
            Keyword::PrintVar => {
                let name = arg(&tokens, 1, "PRINTVAR")?;
                Ok(Stmt::PrintVar { name, newline: wants_newline(&tokens, 2) })
            }
            Keyword::Call => Ok(Stmt::Call { name: single_arg(&tokens, "CALL")? }),
            Keyword::MutableInt => parse_mutable_decl(&tokens),
            Keyword::Comment => Ok(Stmt::Comment),
            Keyword::Goto => Ok(Stmt::Goto { name: single_arg(&tokens, "GOTO")? }),
            Keyword::Label => Ok(Stmt::Label { name: single_arg(&tokens, "LABEL")? }),
            Keyword::Str => parse_str_decl(line, &tokens),
            Keyword::PrintStr => {
                let text = quoted(line)
                    .ok_or_else(|| ScriptError::syntax("PRINTSTR expects a quoted string"))?;
                Ok(Stmt::PrintStr { text: text.to_owned(), newline: wants_newline(&tokens, 2) })
            }
            Keyword::If => parse_if(line, &tokens),
            Keyword::For => parse_for(&tokens),
            Keyword::Macro => Ok(Stmt::Macro { name: single_arg(&tokens, "MACRO")? }),
            Keyword::End(kind) => Ok(Stmt::End(kind)),
        };
    }

    if is_string(first) {
        if tokens.get(1) != Some(&"=") {
            return Err(ScriptError::syntax("Expected '=' sign!"));
        }
        let value = quoted(line)
            .ok_or_else(|| ScriptError::syntax("string assignment expects a quoted string"))?;
        return Ok(Stmt::AssignStr { name: first.to_owned(), value: value.to_owned() });
    }

    if first.starts_with("//") {
        return Ok(Stmt::Comment);
    }

    Ok(Stmt::Assign {
        name: first.to_owned(),
        args: tokens[1..].iter().map(|s| s.to_string()).collect(),
    })
}

// ── Per-keyword parsers ───────────────────────────────────────────────────────

fn arg(tokens: &[&str], i: usize, kw: &str) -> Result<String, ScriptError> {
    tokens
        .get(i)
        .map(|s| s.to_string())
        .ok_or_else(|| ScriptError::syntax(format!("{kw} expects a name")))
}

fn single_arg(tokens: &[&str], kw: &str) -> Result<String, ScriptError> {
    if tokens.len() != 2 {
        return Err(ScriptError::syntax(format!("{kw} expects exactly one name")));
    }
    arg(tokens, 1, kw)
}

/// A trailing `endl` token requests a newline.
fn wants_newline(tokens: &[&str], min_len: usize) -> bool {
    tokens.len() > min_len && tokens.last() == Some(&"endl")
}

fn int_literal(s: &str) -> Result<i64, ScriptError> {
    s.parse()
        .map_err(|_| ScriptError::syntax(format!("Expected integer, found '{s}'")))
}

fn expect_equals(tok: Option<&&str>) -> Result<(), ScriptError> {
    match tok {
        Some(&"=") => Ok(()),
        _ => Err(ScriptError::syntax("Expected '=' sign!")),
    }
}

fn parse_int_decl(tokens: &[&str]) -> Result<Stmt, ScriptError> {
    if tokens.len() != 4 {
        return Err(ScriptError::syntax("INT expects: INT name = value"));
    }
    expect_equals(tokens.get(2))?;
    Ok(Stmt::DeclareInt { name: tokens[1].to_owned(), value: int_literal(tokens[3])? })
}

fn parse_mutable_decl(tokens: &[&str]) -> Result<Stmt, ScriptError> {
    let value = match tokens.len() {
        3 => None,
        5 => {
            expect_equals(tokens.get(3))?;
            Some(int_literal(tokens[4])?)
        }
        _ => return Err(ScriptError::syntax("MUTABLE INT expects: MUTABLE INT name [= value]")),
    };
    Ok(Stmt::DeclareMutable { name: tokens[2].to_owned(), value })
}

fn parse_str_decl(line: &str, tokens: &[&str]) -> Result<Stmt, ScriptError> {
    if tokens.len() < 4 {
        return Err(ScriptError::syntax("STRING expects: STRING name = \"value\""));
    }
    expect_equals(tokens.get(2))?;
    let value = quoted(line)
        .ok_or_else(|| ScriptError::syntax("STRING expects a quoted value"))?;
    Ok(Stmt::DeclareStr { name: tokens[1].to_owned(), value: value.to_owned() })
}

fn parse_if(line: &str, tokens: &[&str]) -> Result<Stmt, ScriptError> {
    if tokens.len() < 4 {
        return Err(ScriptError::syntax("IF expects: IF name <op> value"));
    }
    let op = CmpOp::parse(tokens[2]).ok_or_else(|| ScriptError::syntax("Unknown operator!"))?;
    let rhs = match tokens[3].parse::<i64>() {
        Ok(n) => Operand::Int(n),
        Err(_) => {
            let s = quoted(line).ok_or_else(|| {
                ScriptError::syntax("IF operand must be an integer or a quoted string")
            })?;
            Operand::Str(s.to_owned())
        }
    };
    Ok(Stmt::If(Condition { name: tokens[1].to_owned(), op, rhs }))
}

fn parse_for(tokens: &[&str]) -> Result<Stmt, ScriptError> {
    const USAGE: &str = "FOR expects: FOR var FROM a TO b [INCREMENT c]";
    if !(tokens.len() == 6 || tokens.len() == 8) || tokens[2] != "FROM" || tokens[4] != "TO" {
        return Err(ScriptError::syntax(USAGE));
    }
    let from = int_literal(tokens[3])?;
    let to = match tokens[5] {
        "NaN" => Bound::Unbounded,
        s => Bound::Inclusive(int_literal(s)?),
    };
    let step = if tokens.len() == 8 {
        if tokens[6] != "INCREMENT" {
            return Err(ScriptError::syntax(USAGE));
        }
        let step = int_literal(tokens[7])?;
        if step <= 0 {
            return Err(ScriptError::syntax("INCREMENT must be a positive integer"));
        }
        step
    } else {
        1
    };
    Ok(Stmt::For(LoopHeader { var: tokens[1].to_owned(), from, to, step }))
}

// ── Tests ─────────────────────────────────────────────────────────────────────
