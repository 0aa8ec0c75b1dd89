//! Interactive console.
//!
//! One command per line:
//!
//! | Command | Effect |
//! |---------|--------|
//! | `interpret` | read a program until a line of at most one character, then run it |
//! | `run <file>` | run a script file |
//! | `save <file>` | write the last interpreted program to a file |
//! | `echo on\|off` | show or hide the console prompt |
//! | `debug` | toggle the per-line trace |
//! | `help`, `version` | informational |
//! | `exit` | leave the console |
//!
//! Programs run on a blocking thread so that Ctrl-C stays responsive; an
//! interrupt sets the interpreter's termination flag, and the resulting
//! [`ScriptError::Terminated`] ends the console.

use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crossterm::style::Stylize;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::files;
use crate::script::{Interpreter, Program, ScriptError, Severity};

const PROMPT: &str = "Simpler++Console> ";
const LINE_PROMPT: &str = ">>> ";
const BLOCK_PROMPT: &str = "    >>> ";

const HELP: &[&str] = &[
    "> interpret: Interprets code entered from the console",
    "> run [file]: Runs a script file.",
    "> save [file]: Saves the last interpreted code to a file.",
    "> echo [on/off]: Shows or hides the console prompt.",
    "> debug: Notifies you which line it is executing.",
    "> help: Shows this menu.",
    "> exit: Exits this program.",
    "> version: Shows version information.",
];

// ── Errors ────────────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConsoleError {
    #[error(transparent)]
    Script(#[from] ScriptError),

    #[error("{}: {source}", .path.display())]
    File { path: PathBuf, source: io::Error },

    #[error("Command \"{0}\" not found.")]
    UnknownCommand(String),

    #[error("usage: {0}")]
    Usage(&'static str),

    #[error("interpreter is still running")]
    Busy,

    #[error("interpreter task failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error(transparent)]
    Io(#[from] io::Error),
}

impl ConsoleError {
    pub fn severity(&self) -> Severity {
        match self {
            ConsoleError::Script(e) => e.severity(),
            ConsoleError::Join(_) => Severity::Critical,
            _ => Severity::Error,
        }
    }

    pub fn is_termination(&self) -> bool {
        matches!(self, ConsoleError::Script(e) if e.is_termination())
    }
}

/// What the command loop does after a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Exit,
}

// ── Console ───────────────────────────────────────────────────────────────────

pub struct Console<W: Write + Send + 'static> {
    /// `None` while a program is running on the blocking pool.
    interp: Option<Interpreter<W>>,
    input: mpsc::Receiver<String>,
    terminate: Arc<AtomicBool>,
    echo: bool,
    /// Prompts are only written when attached to a terminal.
    interactive: bool,
    last_buffer: Vec<String>,
    commands: usize,
}

impl<W: Write + Send + 'static> Console<W> {
    pub fn new(out: W, input: mpsc::Receiver<String>, config: &Config, interactive: bool) -> Self {
        let terminate = Arc::new(AtomicBool::new(false));
        let mut interp = Interpreter::new(out).with_jump_limit(config.jump_limit);
        interp.set_debug(config.debug);
        interp.set_terminate_flag(Arc::clone(&terminate));
        Console {
            interp: Some(interp),
            input,
            terminate,
            echo: config.echo,
            interactive,
            last_buffer: Vec::new(),
            commands: 0,
        }
    }

    pub fn interpreter(&self) -> Option<&Interpreter<W>> {
        self.interp.as_ref()
    }

    pub fn echo(&self) -> bool {
        self.echo
    }

    /// The program most recently entered with `interpret`.
    pub fn last_buffer(&self) -> &[String] {
        &self.last_buffer
    }

    /// Flag that stops a running program before its next statement.
    pub fn terminate_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.terminate)
    }

    /// Read and execute commands until `exit`, end of input, or Ctrl-C.
    ///
    /// Command errors are reported and the loop continues; only a
    /// termination request is returned.
    pub async fn run(&mut self) -> Result<(), ConsoleError> {
        loop {
            self.prompt()?;
            let line = tokio::select! {
                line = self.input.recv() => line,
                _ = tokio::signal::ctrl_c() => {
                    info!("interrupted at prompt");
                    None
                }
            };
            let Some(line) = line else { break };

            match self.exec(&line).await {
                Ok(Flow::Continue) => {}
                Ok(Flow::Exit) => break,
                Err(e) if e.is_termination() => {
                    self.report(&e);
                    return Err(e);
                }
                Err(e) => self.report(&e),
            }
        }
        info!("Exited");
        Ok(())
    }

    /// Execute one console command.  Interpreter state is reset afterwards,
    /// whether the command succeeded or not.
    pub async fn exec(&mut self, cmd: &str) -> Result<Flow, ConsoleError> {
        info!(command = cmd, "Executing command");
        self.commands += 1;
        let result = self.dispatch(cmd).await;
        self.reset();
        result
    }

    async fn dispatch(&mut self, cmd: &str) -> Result<Flow, ConsoleError> {
        let mut params = cmd.split_whitespace();
        let Some(name) = params.next() else { return Ok(Flow::Continue) };

        match name {
            "interpret" => return self.interpret().await,
            "run" => {
                let path = params.next().ok_or(ConsoleError::Usage("run <file>"))?;
                self.run_file(path).await?;
            }
            "save" => {
                let path = params.next().ok_or(ConsoleError::Usage("save <file>"))?;
                files::write_lines(path, &self.last_buffer)
                    .await
                    .map_err(|source| ConsoleError::File { path: path.into(), source })?;
                info!(path, lines = self.last_buffer.len(), "saved buffer");
            }
            "echo" => {
                self.echo = match params.next() {
                    Some("on") => true,
                    Some("off") => false,
                    _ => return Err(ConsoleError::Usage("echo on|off")),
                };
            }
            "debug" => {
                let on = self.interp_mut()?.toggle_debug();
                debug!(on, "debug trace toggled");
            }
            "help" => {
                for line in HELP {
                    self.write_line(line)?;
                }
            }
            "version" => {
                self.write_line(&format!("Prerelease Version {}", env!("CARGO_PKG_VERSION")))?;
            }
            "exit" => return Ok(Flow::Exit),
            _ => return Err(ConsoleError::UnknownCommand(cmd.to_owned())),
        }
        Ok(Flow::Continue)
    }

    /// Read a program from the input and run it.  End of input mid-program
    /// leaves the console.
    async fn interpret(&mut self) -> Result<Flow, ConsoleError> {
        let Some(buffer) = self.read_buffer().await? else { return Ok(Flow::Exit) };
        self.last_buffer = buffer.clone();
        self.run_lines(buffer).await?;
        Ok(Flow::Continue)
    }

    async fn read_buffer(&mut self) -> Result<Option<Vec<String>>, ConsoleError> {
        let mut lines = Vec::new();
        let mut indented = false;
        loop {
            if self.interactive {
                self.write_str(if indented { BLOCK_PROMPT } else { LINE_PROMPT })?;
            }
            let Some(line) = self.input.recv().await else { return Ok(None) };
            if line.chars().count() <= 1 {
                return Ok(Some(lines));
            }
            if line.starts_with("END") {
                indented = false;
            }
            if ["IF", "FOR", "MACRO"].iter().any(|kw| line.starts_with(kw)) {
                indented = true;
            }
            lines.push(line);
        }
    }

    /// Run a script file.
    pub async fn run_file(&mut self, path: impl AsRef<Path>) -> Result<(), ConsoleError> {
        let path = path.as_ref();
        let lines = files::read_lines(path)
            .await
            .map_err(|source| ConsoleError::File { path: path.to_owned(), source })?;
        info!(path = %path.display(), lines = lines.len(), "running file");
        self.run_lines(lines).await
    }

    /// Run a program on the blocking pool.  Ctrl-C while it runs raises the
    /// termination flag.
    pub async fn run_lines(&mut self, lines: Vec<String>) -> Result<(), ConsoleError> {
        let program = Program::from(lines);
        let mut interp = self.interp.take().ok_or(ConsoleError::Busy)?;
        let mut task = tokio::task::spawn_blocking(move || {
            // A failed run leaves partial output unflushed; the run error wins.
            let result = interp.run(&program);
            let flushed = interp.output_mut().flush();
            let result = result.and_then(|()| flushed.map_err(ScriptError::from));
            (interp, result)
        });

        let joined = tokio::select! {
            joined = &mut task => joined,
            _ = tokio::signal::ctrl_c() => {
                warn!("interrupt received, terminating program");
                self.terminate.store(true, Ordering::Relaxed);
                task.await
            }
        };
        let (interp, result) = joined?;
        self.interp = Some(interp);
        result?;
        Ok(())
    }

    fn reset(&mut self) {
        if let Some(interp) = self.interp.as_mut() {
            interp.clear_memory();
            interp.clear_cache();
        }
    }

    fn interp_mut(&mut self) -> Result<&mut Interpreter<W>, ConsoleError> {
        self.interp.as_mut().ok_or(ConsoleError::Busy)
    }

    fn prompt(&mut self) -> Result<(), ConsoleError> {
        if !self.interactive {
            return Ok(());
        }
        if self.commands > 0 {
            self.write_str("\n")?;
        }
        if self.echo {
            self.write_str(PROMPT)?;
        }
        Ok(())
    }

    fn write_str(&mut self, s: &str) -> Result<(), ConsoleError> {
        let out = self.interp_mut()?.output_mut();
        out.write_all(s.as_bytes())?;
        out.flush()?;
        Ok(())
    }

    fn write_line(&mut self, s: &str) -> Result<(), ConsoleError> {
        self.write_str(s)?;
        self.write_str("\n")
    }

    /// Log an error and show it on stderr.
    pub fn report(&self, err: &ConsoleError) {
        match err.severity() {
            Severity::Critical => error!(critical = true, "{err}"),
            Severity::Error => error!("{err}"),
        }
        if self.interactive {
            eprintln!("\n{}", err.to_string().red());
        } else {
            eprintln!("{err}");
        }
    }
}

// ── Input ─────────────────────────────────────────────────────────────────────

/// Read stdin lines on a dedicated thread.
///
/// A `tokio::io::stdin()` read future dropped by `select!` leaves its
/// blocking read orphaned, and the next read races it for the same fd.  One
/// thread owning stdin avoids lost lines.
pub fn spawn_stdin_reader() -> mpsc::Receiver<String> {
    let (tx, rx) = mpsc::channel::<String>(16);
    std::thread::spawn(move || {
        let stdin = io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else { break };
            if tx.blocking_send(line).is_err() {
                break;
            }
        }
    });
    rx
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn console(input: &[&str], interactive: bool) -> Console<Vec<u8>> {
        let (tx, rx) = mpsc::channel(input.len().max(1));
        for line in input {
            tx.try_send(line.to_string()).unwrap();
        }
        Console::new(Vec::new(), rx, &Config::default(), interactive)
    }

    fn output(c: &Console<Vec<u8>>) -> String {
        c.interpreter().unwrap().output_text()
    }

    #[tokio::test]
    async fn interpret_runs_buffer_until_short_line() {
        let mut c = console(&["INT x = 2", "x *= 21", "PRINTVAR x endl", ""], false);
        assert_eq!(c.exec("interpret").await.unwrap(), Flow::Continue);
        assert_eq!(output(&c), "42\n");
        assert_eq!(c.last_buffer().len(), 3);
    }

    #[tokio::test]
    async fn block_prompts_are_indented() {
        let mut c = console(&["IF a == 1", "END IF", "."], true);
        c.exec("interpret").await.unwrap_err();
        assert_eq!(output(&c), ">>>     >>> >>> ");
    }

    #[tokio::test]
    async fn state_is_reset_after_failed_run() {
        let mut c = console(&["INT x = 1", "INT x = 2", ""], false);
        let err = c.exec("interpret").await.unwrap_err();
        assert!(matches!(err, ConsoleError::Script(ScriptError::Syntax(_))));
        assert!(c.interpreter().unwrap().vars().ints.is_empty());
    }

    #[tokio::test]
    async fn save_then_run_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("saved.spp");
        let mut c = console(&["PRINTSTR \"saved\" endl", ""], false);
        c.exec("interpret").await.unwrap();
        c.exec(&format!("save {}", path.display())).await.unwrap();
        c.exec(&format!("run {}", path.display())).await.unwrap();
        assert_eq!(output(&c), "saved\nsaved\n");
    }

    #[tokio::test]
    async fn echo_and_debug_toggle() {
        let mut c = console(&[], false);
        c.exec("echo off").await.unwrap();
        assert!(!c.echo());
        c.exec("echo on").await.unwrap();
        assert!(c.echo());
        assert!(matches!(c.exec("echo").await, Err(ConsoleError::Usage(_))));
        c.exec("debug").await.unwrap();
        assert!(c.interpreter().unwrap().debug());
    }

    #[tokio::test]
    async fn unknown_command_and_exit() {
        let mut c = console(&[], false);
        assert!(matches!(c.exec("frobnicate").await, Err(ConsoleError::UnknownCommand(_))));
        assert_eq!(c.exec("exit").await.unwrap(), Flow::Exit);
        assert_eq!(c.exec("").await.unwrap(), Flow::Continue);
    }

    #[tokio::test]
    async fn missing_file_is_reported_with_path() {
        let mut c = console(&[], false);
        let err = c.exec("run /no/such/file.spp").await.unwrap_err();
        assert!(matches!(err, ConsoleError::File { .. }));
        assert!(err.to_string().starts_with("/no/such/file.spp"));
    }

    #[derive(Default)]
    struct Buffered {
        pending: Vec<u8>,
        flushed: Vec<u8>,
    }

    impl Write for Buffered {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.pending.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            self.flushed.append(&mut self.pending);
            Ok(())
        }
    }

    #[tokio::test]
    async fn failed_run_still_flushes_partial_output() {
        let (_tx, rx) = mpsc::channel(1);
        let mut c = Console::new(Buffered::default(), rx, &Config::default(), false);
        let lines = vec!["PRINTSTR \"partial\"".to_string(), "PRINTVAR ghost".to_string()];
        let err = c.run_lines(lines).await.unwrap_err();
        assert!(matches!(err, ConsoleError::Script(ScriptError::Lookup { .. })));
        assert_eq!(c.interpreter().unwrap().output().flushed, b"partial");
    }

    #[tokio::test]
    async fn termination_ends_the_command_loop() {
        let mut c = console(&["interpret", "PRINTSTR \"x\"", ""], false);
        c.terminate_flag().store(true, Ordering::Relaxed);
        let err = c.run().await.unwrap_err();
        assert!(err.is_termination());
    }

    #[tokio::test]
    async fn end_of_input_leaves_loop() {
        let mut c = console(&["version"], false);
        c.run().await.unwrap();
        assert!(output(&c).starts_with("Prerelease Version"));
    }
}
