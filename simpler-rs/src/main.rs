use std::io;

use simpler::cli::{self, ConfigFile};
use simpler::config::{self, Config};
use simpler::console::{self, Console};
use simpler::logging;

#[tokio::main]
async fn main() {
    let args = match cli::parse_args() {
        Ok(a) => a,
        Err(e) => {
            eprintln!("simpler: {e}");
            eprintln!("Usage: simpler [-dq] [-f[<file>]] [-l<logfile>] [-c<line>] [<script>]");
            std::process::exit(1);
        }
    };

    // ── Load rc file ──────────────────────────────────────────────────────────
    let rc_path = match &args.config {
        ConfigFile::Skip => None,
        ConfigFile::Explicit(path) => Some(path.clone()),
        ConfigFile::Search => config::find_user_config(),
    };
    let mut config = Config::default();
    if let Some(path) = rc_path {
        match Config::load_file(&path) {
            Ok((c, errors)) => {
                for e in errors {
                    eprintln!("simpler: {}: {e}", path.display());
                }
                config = c;
            }
            Err(e) => eprintln!("simpler: warning: {}: {e}", path.display()),
        }
    }

    // ── Command-line overrides ────────────────────────────────────────────────
    if args.debug {
        config.debug = true;
    }
    if args.quiet {
        config.echo = false;
    }
    if let Some(log_file) = args.log_file {
        config.log_file = Some(log_file);
    }

    if let Err(e) = logging::init(config.log_level.as_deref(), config.log_file.as_deref()) {
        eprintln!("simpler: {e}");
        std::process::exit(1);
    }
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "Logger created");

    let interactive = unsafe {
        libc::isatty(libc::STDIN_FILENO) != 0 && libc::isatty(libc::STDOUT_FILENO) != 0
    };
    let mut console = Console::new(io::stdout(), console::spawn_stdin_reader(), &config, interactive);

    // ── Startup statement (-c<line>) ──────────────────────────────────────────
    if let Some(line) = args.command {
        if let Err(e) = console.run_lines(vec![line]).await {
            console.report(&e);
            if e.is_termination() {
                std::process::exit(1);
            }
        }
    }

    // ── Script or console ─────────────────────────────────────────────────────
    let script_mode = args.script.is_some();
    let result = match args.script {
        Some(path) => console.run_file(&path).await,
        None => console.run().await,
    };
    if let Err(e) = result {
        // The command loop reports its own termination.
        if script_mode {
            console.report(&e);
        }
        std::process::exit(1);
    }
}
