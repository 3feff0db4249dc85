//! The append-only diagnostics sink (`simplecpp::OutputList` in the reference).
//!
//! Preprocessing never aborts on a recoverable problem — a missing header, a
//! malformed `#if`, an unterminated string — it records an [`Output`] and
//! keeps going (or, for the handful of kinds the driver treats as fatal,
//! empties the remaining stream and stops emitting tokens while still
//! returning normally). There is deliberately no `Result::Err` path for these;
//! see the crate-level error module for what *is* exceptional.

use crate::location::Location;
use std::fmt;

/// Severity shared by every diagnostic kind below.
///
/// `Error`/`Warning` mirror the reference's own `Output::ERROR`/`Output::WARNING`
/// entries (emitted for `#error`/`#warning` directives); every other kind below
/// carries its own fixed severity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Level {
    Error,
    Warning,
}

impl Level {
    pub const fn name(self) -> &'static str {
        match self {
            Level::Error => "error",
            Level::Warning => "warning",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// The fixed taxonomy of preprocessor diagnostics, ported one-for-one from the
/// `Output::Type` values actually assigned in the reference implementation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OutputKind {
    /// A `#error` directive was reached.
    Error,
    /// A `#warning` directive was reached.
    Warning,
    /// The scanner or driver could not make sense of the input (unterminated
    /// string/comment, malformed number, unbalanced `#if`/`#endif`, division
    /// or modulo by zero in a constant expression, and similar).
    SyntaxError,
    /// A backslash was followed by something other than a newline at end of
    /// line (portability warning, not an error).
    PortabilityBackslash,
    /// The scanner saw a byte it could not classify as any recognised token.
    UnhandledCharError,
    /// `#include` nesting passed the configured depth limit.
    IncludeNestedTooDeeply,
    /// `#include` named a header that could not be resolved on any search path.
    MissingHeader,
    /// A file named in [`crate::location`]-external configuration (the DUI's
    /// `includes` force-include list) could not be opened, as distinct from
    /// a header referenced by an in-source `#include`/`#uses` directive.
    ExplicitIncludeNotFound,
}

impl OutputKind {
    /// The stable diagnostic code, in a `Pxxxx` namespace analogous to an
    /// `E0001`-style compiler error code.
    pub const fn code(self) -> &'static str {
        match self {
            OutputKind::Error => "P0001",
            OutputKind::Warning => "P0002",
            OutputKind::SyntaxError => "P0003",
            OutputKind::PortabilityBackslash => "P0004",
            OutputKind::UnhandledCharError => "P0005",
            OutputKind::IncludeNestedTooDeeply => "P0006",
            OutputKind::MissingHeader => "P0007",
            OutputKind::ExplicitIncludeNotFound => "P0008",
        }
    }

    pub const fn level(self) -> Level {
        match self {
            OutputKind::Error
            | OutputKind::SyntaxError
            | OutputKind::UnhandledCharError
            | OutputKind::IncludeNestedTooDeeply
            | OutputKind::MissingHeader
            | OutputKind::ExplicitIncludeNotFound => Level::Error,
            OutputKind::Warning | OutputKind::PortabilityBackslash => Level::Warning,
        }
    }
}

/// One recorded diagnostic: a kind, a location, and a free-form message —
/// the Rust analogue of `simplecpp::Output`.
#[derive(Clone, Debug)]
pub struct Output {
    pub kind: OutputKind,
    pub location: Location,
    pub message: String,
}

impl Output {
    pub fn new(kind: OutputKind, location: Location, message: impl Into<String>) -> Self {
        Self {
            kind,
            location,
            message: message.into(),
        }
    }
}

impl fmt::Display for Output {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} [{}]: {} ({})",
            self.kind.level(),
            self.kind.code(),
            self.message,
            self.location
        )
    }
}

/// An append-only collection of [`Output`]s, the `OutputList` equivalent.
///
/// Every diagnostic-producing component takes `&mut Diagnostics` rather than
/// returning a `Result`, so a single preprocessing run can accumulate
/// diagnostics from the scanner, the folder, and the include resolver without
/// any one of them needing to know about the others.
#[derive(Clone, Debug, Default)]
pub struct Diagnostics {
    outputs: Vec<Output>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, kind: OutputKind, location: Location, message: impl Into<String>) {
        self.outputs.push(Output::new(kind, location, message));
    }

    pub fn has_errors(&self) -> bool {
        self.outputs.iter().any(|o| o.kind.level() == Level::Error)
    }

    pub fn is_empty(&self) -> bool {
        self.outputs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Output> {
        self.outputs.iter()
    }

    pub fn into_vec(self) -> Vec<Output> {
        self.outputs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::location::FileId;

    #[test]
    fn level_and_code_agree_with_the_reference_taxonomy() {
        assert_eq!(OutputKind::SyntaxError.level(), Level::Error);
        assert_eq!(OutputKind::PortabilityBackslash.level(), Level::Warning);
        assert_eq!(OutputKind::Warning.level(), Level::Warning);
    }

    #[test]
    fn diagnostics_has_errors_tracks_only_error_level() {
        let mut diags = Diagnostics::new();
        let loc = Location::new(FileId::new(0), 1, 1);
        diags.push(OutputKind::PortabilityBackslash, loc, "trailing backslash");
        assert!(!diags.has_errors());
        diags.push(OutputKind::MissingHeader, loc, "lib.ctl not found");
        assert!(diags.has_errors());
        assert_eq!(diags.iter().count(), 2);
    }
}
