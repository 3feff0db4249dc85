//! ctrlcpp-drv — preprocessor driver binary.
//!
//! Wires `ctrlcpp-lex`/`ctrlcpp-pp` into a command that preprocesses one
//! translation unit and either prints the stringified, fully expanded token
//! stream to stdout, or — if preprocessing produced any error-level
//! diagnostic — prints those diagnostics to stderr and reports failure.
//!
//! There is no flag grammar: the command line is a fixed positional list,
//! root file first, any further arguments each naming a directory added to
//! the `<header>` search path.
//!
//! USAGE:
//!   ctrlcpp <root-file> [include-dir]...

use anyhow::{bail, Result};
use ctrlcpp_pp::{preprocess, stringify, Dui, PathCache};
use ctrlcpp_util::diagnostics::Diagnostics;
use ctrlcpp_util::location::FileRegistry;

/// Parsed command line: a root translation unit plus zero or more
/// directories to search for `<header>`-form includes.
#[derive(Debug, Clone)]
pub struct Config {
    pub root_file: String,
    pub include_paths: Vec<String>,
}

impl Config {
    /// Parse `args` (excluding argv[0]) into a `Config`, the way the
    /// reference's `main` reads its own fixed `argv` layout before any
    /// pipeline work starts.
    pub fn from_args(args: &[String]) -> Result<Self> {
        let Some((root_file, include_paths)) = args.split_first() else {
            bail!("usage: ctrlcpp <root-file> [include-dir]...");
        };
        Ok(Config {
            root_file: root_file.clone(),
            include_paths: include_paths.to_vec(),
        })
    }
}

/// One preprocessing invocation's state: the file registry, diagnostics
/// sink, and path cache a single `preprocess` call needs, held together so
/// `run` has one thing to build and tear down.
pub struct Session {
    pub config: Config,
    pub registry: FileRegistry,
    pub diagnostics: Diagnostics,
    cache: PathCache,
}

impl Session {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            registry: FileRegistry::new(),
            diagnostics: Diagnostics::new(),
            cache: PathCache::new(),
        }
    }

    /// Preprocess the configured root file, returning the rendered output
    /// text on success. Diagnostics accumulate in `self.diagnostics`
    /// regardless of outcome — a caller wanting warnings after a successful
    /// run should inspect it even when `Ok` comes back.
    pub fn run(&mut self) -> Option<String> {
        let mut dui = Dui {
            include_paths: self.config.include_paths.clone(),
            ..Dui::default()
        };
        let tokens = preprocess(
            &self.config.root_file,
            &mut dui,
            &self.cache,
            &mut self.registry,
            &mut self.diagnostics,
        );
        if self.diagnostics.has_errors() {
            return None;
        }
        Some(stringify(&tokens, &self.registry))
    }
}

/// Print every diagnostic in `diags` to stderr, `error:`/`warning:` prefixed
/// the way the reference's CLI front end renders an `Output`.
pub fn report_diagnostics(diags: &Diagnostics) {
    for output in diags.iter() {
        eprintln!("{output}");
    }
}

/// Run one preprocessing invocation end to end, returning the process exit
/// code: `0` on success, `1` if preprocessing reported an error.
pub fn run(config: Config) -> Result<i32> {
    let mut session = Session::new(config);
    match session.run() {
        Some(output) => {
            report_diagnostics(&session.diagnostics);
            print!("{output}");
            Ok(0)
        }
        None => {
            report_diagnostics(&session.diagnostics);
            Ok(1)
        }
    }
}
