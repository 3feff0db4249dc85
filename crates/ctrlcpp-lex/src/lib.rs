//! ctrlcpp-lex — lexical scanning for the CTRL preprocessor.
//!
//! This crate turns raw translation-unit text into a [`token::TokenStream`]:
//! a flat sequence of tokens with no knowledge of directives, includes, or
//! macro expansion — that belongs to `ctrlcpp-pp`. Two passes run over the
//! text, in order:
//!
//! 1. [`scanner::scan`] splits source into tokens one lexeme at a time,
//!    classifying each as a name, number, string, character, or single-byte
//!    operator, and splicing away backslash-newline line continuations.
//! 2. [`operator::combine_operators`] fuses adjacent single-character
//!    operator tokens into the compound operators the scanner never produces
//!    directly (`==`, `->`, `::`, `<<=`, ...).
//!
//! Both passes are direct ports of `TokenList::readfile` and
//! `TokenList::combineOperators` from the reference implementation this
//! preprocessor's behaviour is grounded on.

pub mod cursor;
pub mod operator;
pub mod scanner;
pub mod token;

pub use operator::{combine_operators, link_brackets};
pub use scanner::scan;
pub use token::{Token, TokenId, TokenKind, TokenStream};
