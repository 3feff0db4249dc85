//! A small pattern-matching DSL over token sequences, ported from
//! `Token::Match`/`Token::simpleMatch`/`Token::multiCompare` in the
//! reference. Downstream consumers of a preprocessed token stream (the
//! checks this preprocessor feeds, out of scope here) rely on this surface,
//! so it ships as part of the public API even though nothing inside this
//! crate's own preprocessing pipeline needs it.
//!
//! A pattern is a space-separated sequence of words, each matched against
//! one token in turn:
//!
//! - a bare word matches a token with that exact text
//! - `a|b|c` matches a token whose text is any of `a`, `b`, `c`
//! - `%name%`, `%num%`, `%str%`, `%char%`, `%type%`, `%any%`, `%op%`,
//!   `%cop%`, `%or%`, `%oror%`, `%comp%`, `%assign%`, `%bool%` match a class
//!   of token rather than exact text (`%var%`/`%varid%` are not supported —
//!   this preprocessor never assigns variable ids)
//! - `[abc]` matches a single-character operator token equal to one of the
//!   listed characters
//! - a leading `!!` negates the rest of the word: `!!)` matches any token
//!   that is not the literal `)`
//!
//! `simple_match` is the literal-only fast path (`Token::simpleMatch`): every
//! word must match verbatim, no `%...%`/`|`/`[...]`/`!!` forms.

use ctrlcpp_lex::token::{TokenId, TokenKind, TokenStream};

/// True if `text` (the full text of a multi-character operator token, e.g.
/// `"<="`) starts with one of the single characters in `chars`.
pub fn starts_with_one_of(text: &str, chars: &str) -> bool {
    text.chars().next().is_some_and(|c| chars.contains(c))
}

const COMPARISON_OPS: &[&str] = &["==", "!=", "<", "<=", ">", ">="];
const ASSIGNMENT_OPS: &[&str] = &[
    "=", "+=", "-=", "*=", "/=", "%=", "&=", "|=", "^=", "<<=", ">>=",
];

fn token_is_class(tokens: &TokenStream, tok: TokenId, class: &str) -> bool {
    let t = tokens.get(tok);
    match class {
        "name" | "type" => t.kind == TokenKind::Name,
        "num" => t.kind == TokenKind::Number,
        "str" => t.kind == TokenKind::Str,
        "char" => t.kind == TokenKind::Char,
        "any" => true,
        "op" => t.kind == TokenKind::Op,
        "cop" => t.kind == TokenKind::Op && t.text != "(" && t.text != ")",
        "or" => t.text == "|",
        "oror" => t.text == "||",
        "comp" => COMPARISON_OPS.contains(&t.text.as_str()),
        "assign" => ASSIGNMENT_OPS.contains(&t.text.as_str()),
        "bool" => t.text == "true" || t.text == "false",
        _ => false,
    }
}

/// Match one pattern word (already split out of the space-separated
/// pattern) against one token.
fn match_word(tokens: &TokenStream, tok: TokenId, word: &str) -> bool {
    let (negate, word) = match word.strip_prefix("!!") {
        Some(rest) => (true, rest),
        None => (false, word),
    };

    let matched = if let Some(set) = word.strip_prefix('[').and_then(|w| w.strip_suffix(']')) {
        tokens.get(tok).op().is_some_and(|c| set.contains(c))
    } else {
        word.split('|').any(|alt| {
            if let Some(class) = alt.strip_prefix('%').and_then(|a| a.strip_suffix('%')) {
                token_is_class(tokens, tok, class)
            } else {
                tokens.get(tok).text == alt
            }
        })
    };

    matched != negate
}

/// Match `pattern` starting at `start`, returning the id of the token
/// immediately following the matched sequence, or `None` if the pattern
/// does not match here (including running off the end of the stream).
pub fn token_match(tokens: &TokenStream, start: TokenId, pattern: &str) -> Option<TokenId> {
    let mut cur = Some(start);
    for word in pattern.split_whitespace() {
        let tok = cur?;
        if !match_word(tokens, tok, word) {
            return None;
        }
        cur = tokens.next(tok);
    }
    cur.or(Some(start))
}

/// Literal-only match: every pattern word must equal the token's text
/// exactly. Faster and stricter than [`token_match`] — no `%...%`/`|`/`[...]`.
pub fn simple_match(tokens: &TokenStream, start: TokenId, pattern: &str) -> bool {
    let mut cur = Some(start);
    for word in pattern.split_whitespace() {
        match cur {
            Some(tok) if tokens.get(tok).text == word => cur = tokens.next(tok),
            _ => return false,
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use ctrlcpp_lex::scanner::scan;
    use ctrlcpp_util::diagnostics::Diagnostics;
    use ctrlcpp_util::location::FileId;

    fn build(src: &str) -> TokenStream {
        let mut tokens = TokenStream::new();
        let mut diags = Diagnostics::new();
        scan(FileId::new(0), src, &mut tokens, &mut diags);
        ctrlcpp_lex::combine_operators(&mut tokens);
        tokens
    }

    #[test]
    fn simple_match_requires_exact_text() {
        let tokens = build("shared_ptr < T >");
        let start = tokens.front().unwrap();
        assert!(simple_match(&tokens, start, "shared_ptr < T >"));
        assert!(!simple_match(&tokens, start, "shared_ptr < U >"));
    }

    #[test]
    fn token_match_accepts_alternation() {
        let tokens = build("foo ( bar )");
        let start = tokens.front().unwrap();
        assert!(token_match(&tokens, start, "foo|baz (").is_some());
    }

    #[test]
    fn token_match_percent_classes() {
        let tokens = build("x = 5");
        let start = tokens.front().unwrap();
        assert!(token_match(&tokens, start, "%name% %assign% %num%").is_some());
    }

    #[test]
    fn token_match_bracket_class_matches_single_char_ops() {
        let tokens = build("a ( b )");
        let open = tokens.next(tokens.front().unwrap()).unwrap();
        assert!(token_match(&tokens, open, "[({[]").is_some());
    }

    #[test]
    fn token_match_negation_excludes_literal() {
        let tokens = build("a )");
        let start = tokens.front().unwrap();
        assert!(token_match(&tokens, start, "!!)").is_some());
        let close = tokens.next(start).unwrap();
        assert!(token_match(&tokens, close, "!!)").is_none());
    }
}
