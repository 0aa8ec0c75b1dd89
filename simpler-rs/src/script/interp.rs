//! Simpler++ execution engine.
//!
//! The [`Interpreter`] walks an instruction pointer over a [`Program`].  Each
//! step classifies one line and executes it:
//!
//! 1. a `MACRO` header has its body registered and the whole definition is
//!    skipped without running;
//! 2. an `IF` / `FOR` header has its body copied into the block cache;
//! 3. the statement runs;
//! 4. after a cached block the pointer skips the body and its terminator;
//! 5. the pointer moves to the next line.
//!
//! Block bodies and macro bodies are stepped the same way over their own
//! lines, so nested constructs of different kinds work.  `GOTO` always moves
//! the top-level pointer, even from inside a body.  The jump takes effect once
//! the current top-level statement finishes, and the block skip of step 4 is
//! then applied from the label rather than from the header.

use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{debug, trace};

use crate::label::{LabelTable, JUMP_LIMIT};
use crate::macros::{Macro, MacroStore};
use crate::var::{Scope, Slot, VarStore};
use super::{
    block::{materialize, BlockCache, BlockKind},
    error::{LookupKind, ScriptError},
    program::Program,
    stmt::{classify, AssignOp, Bound, Condition, LoopHeader, Operand, Stmt},
};

/// Nested `CALL`s deeper than this fail the run instead of exhausting the
/// native stack.
pub const MAX_CALL_DEPTH: usize = 256;

// ── Interpreter ───────────────────────────────────────────────────────────────

/// State of one Simpler++ run plus the sink that print statements write to.
pub struct Interpreter<W: Write> {
    vars: VarStore,
    macros: MacroStore,
    labels: LabelTable,
    /// Body of the conditional or loop about to run.
    cache: Option<BlockCache>,
    /// Top-level instruction pointer.
    ip: usize,
    /// Set by `GOTO`; the current top-level step advances from the label.
    jumped: bool,
    depth: usize,
    debug: bool,
    jump_limit: u32,
    terminate: Option<Arc<AtomicBool>>,
    out: W,
}

impl Interpreter<Vec<u8>> {
    /// Everything printed so far, for in-memory sinks.
    pub fn output_text(&self) -> String {
        String::from_utf8_lossy(&self.out).into_owned()
    }
}

impl<W: Write> Interpreter<W> {
    pub fn new(out: W) -> Self {
        Interpreter {
            vars: VarStore::new(),
            macros: MacroStore::new(),
            labels: LabelTable::new(),
            cache: None,
            ip: 0,
            jumped: false,
            depth: 0,
            debug: false,
            jump_limit: JUMP_LIMIT,
            terminate: None,
            out,
        }
    }

    /// Override the per-label traversal cap (default [`JUMP_LIMIT`]).
    pub fn with_jump_limit(mut self, limit: u32) -> Self {
        self.jump_limit = limit;
        self
    }

    /// Attach a flag that, once set, makes the next statement fail with
    /// [`ScriptError::Terminated`].
    pub fn set_terminate_flag(&mut self, flag: Arc<AtomicBool>) {
        self.terminate = Some(flag);
    }

    /// Flip the per-line trace.  Returns the new setting.
    pub fn toggle_debug(&mut self) -> bool {
        self.debug = !self.debug;
        self.debug
    }

    pub fn set_debug(&mut self, on: bool) {
        self.debug = on;
    }

    pub fn debug(&self) -> bool {
        self.debug
    }

    pub fn vars(&self) -> &VarStore {
        &self.vars
    }

    pub fn macros(&self) -> &MacroStore {
        &self.macros
    }

    pub fn labels(&self) -> &LabelTable {
        &self.labels
    }

    pub fn cache(&self) -> Option<&BlockCache> {
        self.cache.as_ref()
    }

    /// Current top-level instruction pointer.  After a failed run this is the
    /// line that failed.
    pub fn ip(&self) -> usize {
        self.ip
    }

    pub fn output(&self) -> &W {
        &self.out
    }

    pub fn output_mut(&mut self) -> &mut W {
        &mut self.out
    }

    pub fn into_output(self) -> W {
        self.out
    }

    // ── Reset entry points ────────────────────────────────────────────────────

    /// Empty every namespace, the macro registry and the label table, and
    /// rewind the instruction pointer.
    pub fn clear_memory(&mut self) {
        self.vars.clear();
        self.macros.clear();
        self.labels.clear();
        self.ip = 0;
        self.depth = 0;
        self.jumped = false;
    }

    /// Drop any pending block body.
    pub fn clear_cache(&mut self) {
        self.cache = None;
    }

    // ── Execution ─────────────────────────────────────────────────────────────

    /// Run a whole program.
    ///
    /// State is reset before the run and after it completes.  On failure the
    /// state is left as it was at the failing statement; call
    /// [`clear_memory`](Self::clear_memory) and
    /// [`clear_cache`](Self::clear_cache) before the next run.
    pub fn run(&mut self, program: &Program) -> Result<(), ScriptError> {
        self.clear_memory();
        self.clear_cache();
        let lines = program.lines();
        debug!(lines = lines.len(), "run started");

        while self.ip < lines.len() {
            if self.debug {
                write!(self.out, "\nLine {}\n", self.ip)?;
            }
            trace!(ip = self.ip, line = %lines[self.ip], "step");
            let at = self.ip;
            self.jumped = false;
            let span = self.step(lines, at, Scope::Global)?;
            let from = if self.jumped { self.ip } else { at };
            self.ip = from + span;
        }

        self.out.flush()?;
        debug!("run finished");
        self.clear_memory();
        self.clear_cache();
        Ok(())
    }

    /// Classify and execute `lines[at]`, returning how far the pointer over
    /// `lines` should advance.
    fn step(&mut self, lines: &[String], at: usize, scope: Scope) -> Result<usize, ScriptError> {
        let vars = &self.vars;
        let stmt = classify(&lines[at], |name| vars.is_string(scope, name))?;

        if let Stmt::Macro { name } = stmt {
            let block = materialize(lines, at, BlockKind::Macro);
            self.define_macro(name, &lines[block.body.clone()]);
            return Ok(block.span());
        }

        let span = match stmt.opens_block() {
            Some(kind) => {
                let block = materialize(lines, at, kind);
                self.cache = Some(BlockCache::new(lines, &block));
                block.span()
            }
            None => 1,
        };
        self.exec_stmt(stmt, scope)?;
        Ok(span)
    }

    /// Step through a conditional or loop body.
    fn exec_body(&mut self, body: &[String], scope: Scope) -> Result<(), ScriptError> {
        let mut at = 0;
        while at < body.len() {
            at += self.step(body, at, scope)?;
        }
        Ok(())
    }

    fn exec_stmt(&mut self, stmt: Stmt, scope: Scope) -> Result<(), ScriptError> {
        self.guard()?;
        match stmt {
            Stmt::DeclareInt { name, value } => self.vars.int_decls(scope).declare(&name, value),
            Stmt::DeclareStr { name, value } => self.vars.str_decls(scope).declare(&name, value),
            Stmt::DeclareMutable { name, value } => self.vars.mutables.declare(&name, value),
            Stmt::Assign { name, args } => self.assign(scope, &name, &args),
            Stmt::AssignStr { name, value } => self.assign_str(scope, &name, value),
            Stmt::PrintVar { name, newline } => {
                let value = self.vars.printable(scope, &name)?;
                self.emit(&value.to_string(), newline)
            }
            Stmt::PrintStr { text, newline } => self.emit(&text, newline),
            Stmt::If(cond) => self.exec_if(&cond, scope),
            Stmt::For(header) => self.exec_for(&header, scope),
            Stmt::Call { name } => self.call_macro(&name),
            Stmt::Label { name } => {
                let ip = self.ip;
                self.labels.declare(name, ip);
                Ok(())
            }
            Stmt::Goto { name } => {
                self.ip = self.labels.jump(&name)?;
                self.jumped = true;
                debug!(label = %name, target = self.ip, "jump");
                Ok(())
            }
            // Macro headers are registered by `step` and never executed.
            Stmt::Macro { .. } | Stmt::Comment | Stmt::End(_) => Ok(()),
        }
    }

    /// Checked before every statement.
    fn guard(&self) -> Result<(), ScriptError> {
        if self.terminate.as_ref().is_some_and(|f| f.load(Ordering::Relaxed)) {
            return Err(ScriptError::Terminated);
        }
        self.labels.check(self.jump_limit)
    }

    fn emit(&mut self, text: &str, newline: bool) -> Result<(), ScriptError> {
        self.out.write_all(text.as_bytes())?;
        if newline {
            self.out.write_all(b"\n")?;
        }
        Ok(())
    }

    // ── Blocks ────────────────────────────────────────────────────────────────

    fn take_cache(&mut self, kind: BlockKind) -> Result<Vec<String>, ScriptError> {
        match self.cache.take() {
            Some(cache) if cache.kind == kind => Ok(cache.body),
            _ => Err(ScriptError::syntax(format!("{kind} header without a body"))),
        }
    }

    fn exec_if(&mut self, cond: &Condition, scope: Scope) -> Result<(), ScriptError> {
        let body = self.take_cache(BlockKind::If)?;
        if self.evaluate(cond, scope)? {
            self.exec_body(&body, scope)?;
        }
        Ok(())
    }

    fn evaluate(&self, cond: &Condition, scope: Scope) -> Result<bool, ScriptError> {
        Ok(match &cond.rhs {
            Operand::Int(rhs) => {
                let lhs = self.vars.int_value(scope, &cond.name)?;
                cond.op.test(&lhs, rhs)
            }
            Operand::Str(rhs) => {
                let lhs = self.vars.str_value(scope, &cond.name)?;
                cond.op.test(lhs, rhs.as_str())
            }
        })
    }

    /// The loop variable is always a global integer, written before each
    /// pass; changing it inside the body does not affect the iteration.
    fn exec_for(&mut self, header: &LoopHeader, scope: Scope) -> Result<(), ScriptError> {
        let body = self.take_cache(BlockKind::For)?;
        let mut i = header.from;
        loop {
            // An empty body runs no statements, so poll here too.
            self.guard()?;
            if let Bound::Inclusive(to) = header.to {
                if i > to {
                    break;
                }
            }
            self.vars.ints.insert(header.var.as_str(), i);
            self.exec_body(&body, scope)?;
            i = match (i.checked_add(header.step), header.to) {
                (Some(next), _) => next,
                (None, Bound::Inclusive(_)) => break,
                (None, Bound::Unbounded) => {
                    return Err(ScriptError::Arithmetic(format!("{} overflowed", header.var)))
                }
            };
        }
        Ok(())
    }

    // ── Macros ────────────────────────────────────────────────────────────────

    fn define_macro(&mut self, name: String, body: &[String]) {
        let mac = Macro::new(name, body.to_vec());
        debug!(name = %mac.name, lines = mac.len(), "macro defined");
        if let (num, Some(old)) = self.macros.add(mac) {
            debug!(name = %old.name, num, "macro redefined");
        }
    }

    /// Run a macro body on the local path.
    fn call_macro(&mut self, name: &str) -> Result<(), ScriptError> {
        let body = self.macros.body(name).ok_or_else(|| ScriptError::Lookup {
            kind: LookupKind::Macro,
            name: name.to_owned(),
        })?;
        if self.depth >= MAX_CALL_DEPTH {
            return Err(ScriptError::RecursionLimit {
                what: format!("call depth of macro {name}"),
                limit: MAX_CALL_DEPTH as u32,
            });
        }
        self.depth += 1;
        let result = self.exec_macro_body(&body);
        self.depth -= 1;
        result
    }

    fn exec_macro_body(&mut self, body: &[String]) -> Result<(), ScriptError> {
        let mut at = 0;
        while at < body.len() {
            if self.debug {
                writeln!(self.out, "Line {at}")?;
            }
            at += self.step(body, at, Scope::Local)?;
        }
        Ok(())
    }

    // ── Reassignment ──────────────────────────────────────────────────────────

    fn assign(&mut self, scope: Scope, name: &str, args: &[String]) -> Result<(), ScriptError> {
        let Some(slot) = self.vars.resolve_target(scope, name) else {
            if self.macros.contains(name) || self.labels.contains(name) {
                return Err(ScriptError::syntax(format!("{name} is not a variable")));
            }
            return Err(ScriptError::UnknownStatement(name.to_owned()));
        };

        let op_tok = args
            .first()
            .ok_or_else(|| ScriptError::syntax(format!("Expected an operator after {name}")))?;
        let op = AssignOp::parse(op_tok).ok_or_else(|| ScriptError::syntax("Unknown operator!"))?;
        let operand = match (op.is_unary(), args.len()) {
            (true, 1) => None,
            (false, 2) => Some(args[1].as_str()),
            _ => return Err(ScriptError::syntax(format!("Wrong number of operands for {op_tok}"))),
        };

        match slot {
            Slot::Int | Slot::LocalInt => {
                // Plain `=` is reserved for mutables.
                if op == AssignOp::Set {
                    return Err(ScriptError::syntax("Unknown operator!"));
                }
                let rhs = operand.map(|s| self.int_operand(scope, s)).transpose()?;
                let ns = if slot == Slot::Int {
                    &mut self.vars.ints
                } else {
                    &mut self.vars.local_ints
                };
                let cur = ns.get_mut(name).ok_or_else(|| ScriptError::missing_var(name))?;
                *cur = apply(op, *cur, rhs.unwrap_or_default())?;
                Ok(())
            }
            Slot::Mutable => {
                if op != AssignOp::Set {
                    return Err(ScriptError::syntax("Unknown operator!"));
                }
                let rhs = operand.map(|s| self.int_operand(scope, s)).transpose()?;
                self.vars.mutables.insert(name, rhs);
                Ok(())
            }
            Slot::Str | Slot::LocalStr => Err(ScriptError::syntax(format!(
                "String {name} expects: {name} = \"value\""
            ))),
        }
    }

    /// A right operand is an integer literal or another integer variable.
    fn int_operand(&self, scope: Scope, tok: &str) -> Result<i64, ScriptError> {
        match tok.parse::<i64>() {
            Ok(n) => Ok(n),
            Err(_) => self.vars.int_value(scope, tok),
        }
    }

    fn assign_str(&mut self, scope: Scope, name: &str, value: String) -> Result<(), ScriptError> {
        let ns = if scope == Scope::Local && self.vars.local_strs.contains(name) {
            &mut self.vars.local_strs
        } else {
            &mut self.vars.strs
        };
        let slot = ns.get_mut(name).ok_or_else(|| ScriptError::missing_var(name))?;
        *slot = value;
        Ok(())
    }
}

/// Apply a compound operator.  `**=` rounds to the nearest integer; `/=`
/// truncates toward zero.
fn apply(op: AssignOp, cur: i64, rhs: i64) -> Result<i64, ScriptError> {
    let result = match op {
        AssignOp::Set => Some(rhs),
        AssignOp::Incr => cur.checked_add(1),
        AssignOp::Decr => cur.checked_sub(1),
        AssignOp::Add => cur.checked_add(rhs),
        AssignOp::Sub => cur.checked_sub(rhs),
        AssignOp::Mul => cur.checked_mul(rhs),
        AssignOp::Div => {
            if rhs == 0 {
                return Err(ScriptError::Arithmetic("division by zero".into()));
            }
            cur.checked_div(rhs)
        }
        AssignOp::Pow => {
            let p = (cur as f64).powf(rhs as f64).round();
            (p.is_finite() && p >= i64::MIN as f64 && p < i64::MAX as f64).then_some(p as i64)
        }
    };
    result.ok_or_else(|| ScriptError::Arithmetic("integer overflow".into()))
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;
    use std::thread;
    use std::time::Duration;

    fn interp() -> Interpreter<Vec<u8>> {
        Interpreter::new(Vec::new())
    }

    fn run(src: &str) -> (Interpreter<Vec<u8>>, Result<(), ScriptError>) {
        let mut i = interp();
        let r = i.run(&Program::parse(src));
        (i, r)
    }

    fn output(src: &str) -> String {
        let (i, r) = run(src);
        r.unwrap();
        i.output_text()
    }

    #[test]
    fn apply_compound_operators() {
        assert_eq!(apply(AssignOp::Add, 5, 3).unwrap(), 8);
        assert_eq!(apply(AssignOp::Pow, 5, 2).unwrap(), 25);
        assert_eq!(apply(AssignOp::Div, 5, 2).unwrap(), 2);
        assert_eq!(apply(AssignOp::Div, -7, 2).unwrap(), -3);
        assert_eq!(apply(AssignOp::Pow, 2, -1).unwrap(), 1);
        assert_eq!(apply(AssignOp::Decr, 0, 0).unwrap(), -1);
        assert!(matches!(apply(AssignOp::Div, 1, 0), Err(ScriptError::Arithmetic(_))));
        assert!(apply(AssignOp::Mul, i64::MAX, 2).is_err());
        assert!(apply(AssignOp::Pow, 10, 40).is_err());
    }

    #[test]
    fn state_is_cleared_after_successful_run() {
        let (i, r) = run("INT x = 1\nMACRO m\nEND MACRO\nLABEL l");
        r.unwrap();
        assert!(i.vars().ints.is_empty());
        assert!(i.macros().is_empty());
        assert!(i.labels().is_empty());
        assert_eq!(i.ip(), 0);
    }

    #[test]
    fn state_survives_a_failed_run() {
        let (mut i, r) = run("INT x = 1\nINT x = 2");
        assert!(matches!(r, Err(ScriptError::Syntax(_))));
        assert_eq!(i.vars().ints.get("x"), Some(&1));
        assert_eq!(i.ip(), 1);
        i.clear_memory();
        i.clear_cache();
        assert!(i.vars().ints.is_empty());
    }

    #[test]
    fn macro_definition_is_skipped_until_called() {
        let out = output("MACRO m\nPRINTSTR \"in\" endl\nEND MACRO\nPRINTSTR \"after\" endl\nCALL m");
        assert_eq!(out, "after\nin\n");
    }

    #[test]
    fn cache_holds_last_block_until_consumed() {
        let mut i = interp();
        let r = i.run(&Program::parse("INT x = 1\nIF x == 1\nx ++\nEND IF\nPRINTVAR y"));
        assert!(r.is_err());
        assert!(i.cache().is_none(), "executed block body is consumed");
    }

    #[test]
    fn debug_trace_precedes_each_line() {
        let mut i = interp();
        i.set_debug(true);
        i.run(&Program::parse("PRINTSTR \"a\"\nPRINTSTR \"b\"")).unwrap();
        assert_eq!(i.output_text(), "\nLine 0\na\nLine 1\nb");
    }

    #[test]
    fn termination_flag_stops_the_run() {
        let flag = Arc::new(AtomicBool::new(true));
        let mut i = interp();
        i.set_terminate_flag(Arc::clone(&flag));
        let r = i.run(&Program::parse("PRINTSTR \"never\""));
        assert!(matches!(r, Err(ScriptError::Terminated)));
        assert_eq!(i.output_text(), "");
    }

    #[test]
    fn termination_flag_stops_an_empty_endless_loop() {
        let flag = Arc::new(AtomicBool::new(false));
        let mut i = interp();
        i.set_terminate_flag(Arc::clone(&flag));
        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            let _ = tx.send(i.run(&Program::parse("FOR i FROM 1 TO NaN\nEND FOR")));
        });
        thread::sleep(Duration::from_millis(100));
        flag.store(true, Ordering::Relaxed);
        let r = rx.recv_timeout(Duration::from_secs(5)).expect("run did not stop");
        assert!(matches!(r, Err(ScriptError::Terminated)));
    }

    #[test]
    fn deep_recursion_hits_call_depth_cap() {
        let (_, r) = run("MACRO r\nCALL r\nEND MACRO\nCALL r");
        assert!(matches!(r, Err(ScriptError::RecursionLimit { .. })));
    }

    #[test]
    fn goto_inside_block_skips_block_span_past_label() {
        // The jump lands on LABEL (1); the IF block spans three lines, so the
        // next step is line 4 and the two prints run only once.
        let src = "\
INT n = 0
LABEL L
PRINTSTR \"p\"
PRINTSTR \"q\"
n ++
IF n < 2
GOTO L
END IF
PRINTVAR n";
        assert_eq!(output(src), "pq2");
    }

    #[test]
    fn top_level_goto_resumes_after_label() {
        let src = "\
INT n = 0
GOTO skip
LABEL skip
n ++
PRINTVAR n";
        // GOTO before its label is declared fails; once declared it lands on
        // the line after it.
        assert!(matches!(run(src).1, Err(ScriptError::Lookup { .. })));
        // Resuming on LABEL itself would reset its counter and never trip
        // the guard.
        let mut i = Interpreter::new(Vec::new()).with_jump_limit(2);
        let r = i.run(&Program::parse("LABEL a\nPRINTSTR \"x\"\nGOTO a"));
        assert!(matches!(r, Err(ScriptError::RecursionLimit { limit: 2, .. })));
        assert_eq!(i.output_text(), "xxx");
    }

    #[test]
    fn jump_limit_is_configurable() {
        let mut i = Interpreter::new(Vec::new()).with_jump_limit(2);
        let src = "INT n = 0\nLABEL l\nn ++\nIF n < 10\nGOTO l\nEND IF";
        assert!(matches!(
            i.run(&Program::parse(src)),
            Err(ScriptError::RecursionLimit { limit: 2, .. })
        ));
        assert_eq!(i.labels().get("l").unwrap().traversals, 3);
    }
}
