use proptest::prelude::*;
use simpler::files;
use simpler::script::{classify, Interpreter, Program, Stmt};

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

/// Lines made of statement-ish fragments, so the keyword paths get exercised
/// as well as the fallback.
fn script_line() -> impl Strategy<Value = String> {
    const WORDS: &[&str] = &[
        "INT", "MUTABLE", "STRING", "PRINTVAR", "PRINTSTR", "IF", "FOR", "FROM", "TO", "NaN",
        "INCREMENT", "END", "MACRO", "CALL", "GOTO", "LABEL", "=", "==", "**=", "endl", "//",
    ];
    let word = prop_oneof![
        prop::sample::select(WORDS).prop_map(str::to_owned),
        "-?[0-9]{1,20}",
        "\"[a-z ]{0,6}\"",
        "[a-z]{1,3}",
    ];
    prop::collection::vec(word, 0..8).prop_map(|w| w.join(" "))
}

proptest! {
    /// The classifier returns a statement or an error for any input.
    #[test]
    fn classify_never_panics(line in "\\PC*") {
        let _ = classify(&line, |_| false);
        let _ = classify(&line, |_| true);
    }

    #[test]
    fn classify_statement_like_lines(line in script_line()) {
        let _ = classify(&line, |name| name.starts_with('s'));
    }

    /// Keyword lines never fall through to reassignment.
    #[test]
    fn print_keywords_are_recognised(name in "[a-z]{1,8}", text in "[a-zA-Z ,]{0,12}") {
        let stmt = classify(&format!("PRINTVAR {name} endl"), |_| false).unwrap();
        let is_printvar_endl = matches!(stmt, Stmt::PrintVar { newline: true, .. });
        prop_assert!(is_printvar_endl, "classified as {:?}", stmt);
        let stmt = classify(&format!("PRINTSTR \"{text}\""), |_| false).unwrap();
        prop_assert_eq!(stmt, Stmt::PrintStr { text, newline: false });
    }

    /// Whole programs built from random lines either finish or fail cleanly.
    #[test]
    fn random_programs_terminate(
        lines in prop::collection::vec(
            script_line().prop_filter("loops may be unbounded", |l| !l.starts_with("FOR")),
            0..12,
        )
    ) {
        let mut interp = Interpreter::new(Vec::new()).with_jump_limit(50);
        let _ = interp.run(&Program::from(lines));
    }

    #[test]
    fn bounded_for_runs_expected_passes(from in -20i64..20, span in 0i64..30, step in 1i64..6) {
        let to = from + span;
        let src = format!("INT n = 0\nFOR i FROM {from} TO {to} INCREMENT {step}\nn ++\nEND FOR\nPRINTVAR n");
        let mut interp = Interpreter::new(Vec::new());
        interp.run(&Program::parse(&src)).unwrap();
        prop_assert_eq!(interp.output_text(), (span / step + 1).to_string());
    }

    /// Lines written to a file read back identically.
    #[test]
    fn line_files_round_trip(lines in prop::collection::vec("[^\r\n]{0,40}", 0..20)) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prog.spp");
        let read = runtime().block_on(async {
            files::write_lines(&path, &lines).await?;
            files::read_lines(&path).await
        }).unwrap();
        prop_assert_eq!(read, lines);
    }
}
