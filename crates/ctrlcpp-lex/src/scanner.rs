//! The lexical scanner (`TokenList::readfile` in the reference): turns raw
//! source text for one file into a flat sequence of tokens appended to a
//! [`TokenStream`], with no knowledge of preprocessor directives, macros, or
//! includes — all of that is the driver's job.

use crate::cursor::Cursor;
use crate::token::{TokenKind, TokenStream};
use ctrlcpp_util::diagnostics::{Diagnostics, OutputKind};
use ctrlcpp_util::location::{FileId, Location};

/// A byte that decoded to something outside 7-bit ASCII. The scanner treats
/// this the way the reference treats `ch >= 0x80`: it is not a character the
/// tokenizer can classify, so it is collapsed to this sentinel up front and
/// handled as a fatal per-file condition once the main loop reaches it.
const NON_ASCII_SENTINEL: char = '\u{FF}';

/// Decode raw file bytes into scanner input: detect and strip a UTF-8 or
/// UTF-16 (BE/LE) byte-order mark, decode UTF-16 content to UTF-8, and
/// collapse anything outside 7-bit ASCII to [`NON_ASCII_SENTINEL`] so the
/// main scan loop can report it as a single unhandled-character condition
/// without needing to reason about encodings itself. This mirrors
/// `getAndSkipBOM`/`readChar` in the reference, which performs the same
/// collapse one byte at a time as it reads.
pub fn decode_bytes(bytes: &[u8]) -> String {
    if let Some(rest) = bytes.strip_prefix(&[0xEF, 0xBB, 0xBF]) {
        return collapse_non_ascii(rest);
    }
    if let Some(rest) = bytes.strip_prefix(&[0xFE, 0xFF]) {
        return collapse_non_ascii_utf16(rest, true);
    }
    if let Some(rest) = bytes.strip_prefix(&[0xFF, 0xFE]) {
        return collapse_non_ascii_utf16(rest, false);
    }
    collapse_non_ascii(bytes)
}

fn collapse_non_ascii(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len());
    let text = String::from_utf8_lossy(bytes);
    for c in text.chars() {
        if c.is_ascii() {
            out.push(c);
        } else {
            out.push(NON_ASCII_SENTINEL);
        }
    }
    out
}

fn collapse_non_ascii_utf16(bytes: &[u8], big_endian: bool) -> String {
    let mut units = Vec::with_capacity(bytes.len() / 2);
    let mut chunks = bytes.chunks_exact(2);
    for pair in &mut chunks {
        let unit = if big_endian {
            u16::from_be_bytes([pair[0], pair[1]])
        } else {
            u16::from_le_bytes([pair[0], pair[1]])
        };
        units.push(unit);
    }
    let mut out = String::with_capacity(units.len());
    for c in char::decode_utf16(units) {
        match c {
            Ok(c) if c.is_ascii() => out.push(c),
            _ => out.push(NON_ASCII_SENTINEL),
        }
    }
    out
}

/// Strip a UTF-8 byte-order mark, if present, and report whether one was
/// found. Input reaching this point has already been through
/// [`decode_bytes`] for any file read from disk; this is kept separate so
/// in-memory source (tests, synthetic translation units) can skip the byte
/// layer entirely and still get BOM handling.
pub fn strip_bom(source: &str) -> (&str, bool) {
    match source.strip_prefix('\u{feff}') {
        Some(rest) => (rest, true),
        None => (source, false),
    }
}

/// Remove every backslash-newline line continuation from `source`, the way
/// the reference's read loop folds a continuation away before the character
/// after it is ever examined — this can join the two halves of an
/// identifier, a number, or an operator that straddle the continuation.
///
/// A blank line is left in the line count implicitly: the newline is
/// deleted along with the backslash, so a token reassembled across a
/// continuation reports the location of its first half, matching the
/// reference's behaviour of not advancing `location.line` for a spliced line.
///
/// A backslash followed by trailing spaces/tabs before the newline is still
/// treated as a continuation, but is reported through `diags` as
/// [`OutputKind::PortabilityBackslash`] — this mirrors the reference's
/// `portabilityBackslash` warning for a continuation that will silently stop
/// working on a compiler that requires the backslash to be the line's very
/// last character.
fn splice_continuations(file: FileId, source: &str, diags: &mut Diagnostics) -> String {
    if !source.contains('\\') {
        return source.to_string();
    }
    let mut out = String::with_capacity(source.len());
    let mut line = 1u32;
    let mut col = 1u32;
    let mut chars = source.char_indices().peekable();
    while let Some((i, c)) = chars.next() {
        if c == '\\' {
            let rest = &source[i + 1..];
            let pad_end = rest.find(|ch: char| ch != ' ' && ch != '\t').unwrap_or(rest.len());
            let after_pad = &rest[pad_end..];
            let newline_len = if after_pad.starts_with("\r\n") {
                2
            } else if after_pad.starts_with('\n') || after_pad.starts_with('\r') {
                1
            } else {
                0
            };
            if newline_len > 0 {
                if pad_end > 0 {
                    diags.push(
                        OutputKind::PortabilityBackslash,
                        Location::new(file, line, col),
                        "backslash followed by trailing whitespace before newline",
                    );
                }
                for _ in 0..pad_end + newline_len {
                    chars.next();
                }
                line += 1;
                col = 1;
                continue;
            }
        }
        if c == '\n' {
            line += 1;
            col = 1;
        } else {
            col += 1;
        }
        out.push(c);
    }
    out
}

fn is_name_start(c: char) -> bool {
    c == '_' || c == '$' || c.is_ascii_alphabetic()
}

fn is_name_continue(c: char) -> bool {
    c == '_' || c == '$' || c.is_ascii_alphanumeric()
}

/// String/char literal prefixes the reference recognises before a `"`/`'`
/// (`isStringLiteralPrefix`). Anything ending in `R` introduces a raw string.
const STRING_PREFIXES: &[&str] = &["u8R", "uR", "UR", "LR", "R", "u8", "u", "U", "L"];

/// If the token just pushed onto `tokens` is a bare name immediately
/// adjacent (same line, no intervening whitespace) to `loc` and its text is
/// one of [`STRING_PREFIXES`], return its id and text so the caller can fold
/// it into the following string/char literal.
fn adjacent_string_prefix(tokens: &TokenStream, loc: Location) -> Option<(crate::token::TokenId, String)> {
    let back = tokens.back()?;
    let tok = tokens.get(back);
    if tok.kind != TokenKind::Name {
        return None;
    }
    if !STRING_PREFIXES.contains(&tok.text.as_str()) {
        return None;
    }
    if tok.location.file != loc.file || tok.location.line != loc.line {
        return None;
    }
    if tok.location.col + tok.text.chars().count() as u32 != loc.col {
        return None;
    }
    Some((back, tok.text.clone()))
}

/// Scan `source` (the content of file `file`) into `tokens`, reporting
/// unterminated strings/comments and unhandled characters to `diags`.
///
/// Line continuations (`\` immediately followed by a newline) are spliced
/// away before any token boundary is decided, matching the reference, which
/// performs backslash-newline removal as part of the same read loop that
/// tokenizes — a continuation can split an identifier or operator in half.
///
/// A byte that decoded to [`NON_ASCII_SENTINEL`] (see [`decode_bytes`]) is
/// fatal for the whole file: every token scanned so far is discarded and
/// scanning stops, matching the reference's `clear(); return;` on
/// `ch >= 0x80`. A control character below `0x20` other than tab/newline/CR
/// is silently normalised to a space rather than rejected.
pub fn scan(file: FileId, source: &str, tokens: &mut TokenStream, diags: &mut Diagnostics) {
    let (source, _had_bom) = strip_bom(source);
    let spliced = splice_continuations(file, source, diags);
    let mut cur = Cursor::new(&spliced);
    let mut loc = Location::new(file, 1, 1);

    loop {
        let c = cur.current();
        if c == '\0' {
            break;
        }

        if c == NON_ASCII_SENTINEL {
            diags.push(
                OutputKind::UnhandledCharError,
                loc,
                "invalid or non-ASCII byte in source file",
            );
            tokens.clear();
            return;
        }

        if c == '\n' || c == '\r' {
            let start = cur.rest();
            let text = if start.starts_with("\r\n") { "\r\n" } else { &start[..1] };
            loc.adjust(text);
            cur.eat_str(text);
            continue;
        }

        if c == ' ' || c == '\t' {
            cur.bump();
            loc.col += 1;
            continue;
        }

        if (c as u32) < 0x20 {
            // Stray control character: normalised to a space, never a token.
            cur.bump();
            loc.col += 1;
            continue;
        }

        // Line comment.
        if c == '/' && cur.peek(1) == '/' {
            let rest = cur.rest();
            let end = rest.find(['\n', '\r']).unwrap_or(rest.len());
            let text = &rest[..end];
            loc.adjust(text);
            cur.eat_str(text);
            continue;
        }

        // Block comment.
        if c == '/' && cur.peek(1) == '*' {
            let rest = cur.rest();
            match rest[2..].find("*/") {
                Some(end) => {
                    let text = &rest[..end + 4];
                    loc.adjust(text);
                    cur.eat_str(text);
                }
                None => {
                    diags.push(OutputKind::SyntaxError, loc, "unterminated block comment");
                    let text = rest;
                    loc.adjust(text);
                    cur.eat_str(text);
                }
            }
            continue;
        }

        if is_name_start(c) {
            let start_loc = loc;
            let rest = cur.rest();
            let end = rest
                .char_indices()
                .find(|&(_, ch)| !is_name_continue(ch))
                .map_or(rest.len(), |(i, _)| i);
            let text = &rest[..end];
            loc.adjust(text);
            cur.eat_str(text);
            tokens.push_back(TokenKind::Name, text, start_loc);
            continue;
        }

        if c.is_ascii_digit() {
            let start_loc = loc;
            let text = scan_number(&mut cur);
            loc.adjust(&text);
            tokens.push_back(TokenKind::Number, text, start_loc);
            continue;
        }

        if c == '"' || c == '\'' {
            let start_loc = loc;
            if let Some((prefix_id, prefix)) = adjacent_string_prefix(tokens, loc) {
                let prefix_loc = tokens.get(prefix_id).location;
                if c == '"' && prefix.ends_with('R') {
                    match scan_raw_string(&mut cur, &prefix) {
                        Some((consumed, escaped)) => {
                            loc.adjust(&consumed);
                            tokens.remove(prefix_id);
                            tokens.push_back(TokenKind::Str, escaped, prefix_loc);
                        }
                        None => {
                            diags.push(
                                OutputKind::SyntaxError,
                                loc,
                                "raw string missing terminating delimiter",
                            );
                            let text = cur.rest().to_string();
                            loc.adjust(&text);
                            cur.eat_str(&text);
                        }
                    }
                    continue;
                }
                let kind = if c == '"' { TokenKind::Str } else { TokenKind::Char };
                match scan_delimited(&mut cur, c) {
                    Some(text) => {
                        loc.adjust(&text);
                        let merged = format!("{prefix}{text}");
                        tokens.remove(prefix_id);
                        tokens.push_back(kind, merged, prefix_loc);
                    }
                    None => {
                        diags.push(OutputKind::SyntaxError, loc, "unterminated literal");
                        let text = cur.rest().to_string();
                        loc.adjust(&text);
                        cur.eat_str(&text);
                    }
                }
                continue;
            }

            let kind = if c == '"' { TokenKind::Str } else { TokenKind::Char };
            match scan_delimited(&mut cur, c) {
                Some(text) => {
                    loc.adjust(&text);
                    tokens.push_back(kind, text, start_loc);
                }
                None => {
                    let what = if c == '"' { "string" } else { "character" };
                    diags.push(
                        OutputKind::SyntaxError,
                        loc,
                        format!("unterminated {what} literal"),
                    );
                    let text = cur.rest().to_string();
                    loc.adjust(&text);
                    cur.eat_str(&text);
                }
            }
            continue;
        }

        if c.is_ascii_punctuation() {
            let start_loc = loc;
            let text = c.to_string();
            loc.adjust(&text);
            cur.bump();
            tokens.push_back(TokenKind::Op, text, start_loc);
            continue;
        }

        diags.push(
            OutputKind::UnhandledCharError,
            loc,
            format!("unhandled character {c:?}"),
        );
        loc.col += 1;
        cur.bump();
    }
}

/// Scan a numeric literal: an integer or float, optionally hex/octal
/// prefixed, with an optional trailing type suffix. A digit-separator `'`
/// may appear between digits and is kept verbatim in the token text, the way
/// the reference leaves it in `currentToken` rather than stripping it.
/// A later pass (operator combining) is responsible for re-attaching a
/// leading `.` or a detached exponent sign that this routine leaves as
/// separate tokens.
fn scan_number(cur: &mut Cursor<'_>) -> String {
    let rest = cur.rest();
    let bytes = rest.as_bytes();

    fn eat_digits(bytes: &[u8], mut end: usize, hex: bool) -> usize {
        loop {
            let is_digit = end < bytes.len()
                && if hex {
                    (bytes[end] as char).is_ascii_hexdigit()
                } else {
                    (bytes[end] as char).is_ascii_digit()
                };
            if is_digit {
                end += 1;
                continue;
            }
            if end + 1 < bytes.len() && bytes[end] == b'\'' {
                let next_is_digit = if hex {
                    (bytes[end + 1] as char).is_ascii_hexdigit()
                } else {
                    (bytes[end + 1] as char).is_ascii_digit()
                };
                if next_is_digit {
                    end += 1;
                    continue;
                }
            }
            return end;
        }
    }

    let mut end;
    if bytes.starts_with(b"0x") || bytes.starts_with(b"0X") {
        end = eat_digits(bytes, 2, true);
    } else {
        end = eat_digits(bytes, 0, false);
        if end < bytes.len() && bytes[end] == b'.' {
            end = eat_digits(bytes, end + 1, false);
        }
        if end < bytes.len() && (bytes[end] == b'e' || bytes[end] == b'E') {
            let mut e_end = end + 1;
            if e_end < bytes.len() && (bytes[e_end] == b'+' || bytes[e_end] == b'-') {
                e_end += 1;
            }
            if e_end < bytes.len() && (bytes[e_end] as char).is_ascii_digit() {
                end = eat_digits(bytes, e_end, false);
            }
        }
    }
    // Trailing type suffix: letters/underscore immediately following the digits.
    while end < bytes.len() && (is_name_continue(bytes[end] as char)) {
        end += 1;
    }

    let text = rest[..end].to_string();
    cur.eat_str(&text);
    text
}

/// Scan a quoted literal starting at the opening `quote`, handling `\`
/// escapes (including an escaped quote or backslash) and returning `None`
/// if the line ends before the closing quote is found.
fn scan_delimited(cur: &mut Cursor<'_>, quote: char) -> Option<String> {
    let rest = cur.rest();
    let mut chars = rest.char_indices();
    let (_, first) = chars.next()?;
    debug_assert_eq!(first, quote);

    let mut i = first.len_utf8();
    loop {
        let c = rest[i..].chars().next()?;
        if c == '\n' || c == '\r' {
            return None;
        }
        if c == '\\' {
            let next = rest[i + 1..].chars().next();
            match next {
                Some(n) if n != '\n' && n != '\r' => {
                    i += c.len_utf8() + n.len_utf8();
                    continue;
                }
                _ => return None,
            }
        }
        i += c.len_utf8();
        if c == quote {
            let text = rest[..i].to_string();
            cur.eat_str(&text);
            return Some(text);
        }
    }
}

/// Scan a C++11-style raw string `delim(...)delim"` starting at the opening
/// `"` (the `R`/`LR`/`u8R`/... prefix has already been consumed as a
/// separate name token by the caller). Returns the exact source text
/// consumed (for location bookkeeping) and the escaped, quote-wrapped token
/// text to store — content between the parentheses is copied verbatim except
/// that `\`, `"`, and `'` are backslash-escaped, the way the reference's
/// `escapeString` renders a raw string's contents into an ordinary string
/// token. Grounded on the delimiter-then-`(...)`-then-matching-delimiter scan
/// in the reference's raw-string branch of `readfile`.
fn scan_raw_string(cur: &mut Cursor<'_>, _prefix: &str) -> Option<(String, String)> {
    let rest = cur.rest();
    debug_assert!(rest.starts_with('"'));

    let mut delim_end = 1usize;
    loop {
        let c = rest[delim_end..].chars().next()?;
        if c == '(' {
            break;
        }
        if c == '\n' || c == '\r' {
            return None;
        }
        delim_end += c.len_utf8();
    }
    let delim = &rest[1..delim_end];
    let body_start = delim_end + 1;
    let terminator = format!("){delim}\"");
    let haystack = &rest[body_start..];
    let term_pos = haystack.find(terminator.as_str())?;

    let body = &haystack[..term_pos];
    let total_len = body_start + term_pos + terminator.len();
    let consumed = rest[..total_len].to_string();
    cur.eat_str(&consumed);

    let mut escaped = String::with_capacity(body.len() + 2);
    escaped.push('"');
    for c in body.chars() {
        if c == '\\' || c == '"' || c == '\'' {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('"');

    Some((consumed, escaped))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::TokenKind;

    fn scan_str(source: &str) -> (TokenStream, Diagnostics) {
        let mut tokens = TokenStream::new();
        let mut diags = Diagnostics::new();
        scan(FileId::new(0), source, &mut tokens, &mut diags);
        (tokens, diags)
    }

    fn texts(tokens: &TokenStream) -> Vec<String> {
        tokens.iter().map(|id| tokens.get(id).text.clone()).collect()
    }

    #[test]
    fn scans_names_numbers_and_operators() {
        let (tokens, diags) = scan_str("global int x = 42;");
        assert!(diags.is_empty());
        assert_eq!(
            texts(&tokens),
            vec!["global", "int", "x", "=", "42", ";"]
        );
    }

    #[test]
    fn strips_bom_without_emitting_a_token() {
        let (tokens, _) = scan_str("\u{feff}x");
        assert_eq!(texts(&tokens), vec!["x"]);
    }

    #[test]
    fn line_comment_is_dropped() {
        let (tokens, _) = scan_str("x // trailing comment\ny");
        assert_eq!(texts(&tokens), vec!["x", "y"]);
    }

    #[test]
    fn block_comment_is_dropped() {
        let (tokens, _) = scan_str("x /* across\nlines */ y");
        assert_eq!(texts(&tokens), vec!["x", "y"]);
    }

    #[test]
    fn unterminated_block_comment_is_reported() {
        let (_, diags) = scan_str("x /* never closes");
        assert!(diags.has_errors());
    }

    #[test]
    fn line_continuation_splices_identifier_halves() {
        let (tokens, _) = scan_str("fo\\\no");
        assert_eq!(texts(&tokens), vec!["foo"]);
    }

    #[test]
    fn line_continuation_with_trailing_space_warns_but_still_splices() {
        let (tokens, diags) = scan_str("fo\\ \no");
        assert_eq!(texts(&tokens), vec!["foo"]);
        assert!(!diags.has_errors());
        assert_eq!(diags.iter().count(), 1);
        assert_eq!(diags.iter().next().unwrap().kind, OutputKind::PortabilityBackslash);
    }

    #[test]
    fn string_literal_keeps_escaped_quote() {
        let (tokens, diags) = scan_str(r#""a\"b""#);
        assert!(diags.is_empty());
        assert_eq!(texts(&tokens), vec![r#""a\"b""#]);
    }

    #[test]
    fn unterminated_string_is_reported() {
        let (_, diags) = scan_str("\"never closes");
        assert!(diags.has_errors());
    }

    #[test]
    fn float_literal_with_exponent_scans_as_one_token() {
        let (tokens, _) = scan_str("1.5e-10");
        assert_eq!(texts(&tokens), vec!["1.5e-10"]);
    }

    #[test]
    fn hex_literal_scans_as_one_token() {
        let (tokens, _) = scan_str("0xFF");
        assert_eq!(texts(&tokens), vec!["0xFF"]);
    }

    #[test]
    fn digit_separators_are_kept_in_the_token_text() {
        let (tokens, diags) = scan_str("1'000'000");
        assert!(diags.is_empty());
        assert_eq!(texts(&tokens), vec!["1'000'000"]);
    }

    #[test]
    fn raw_string_unescapes_nothing_and_keeps_embedded_paren() {
        let (tokens, diags) = scan_str(r#"const char* p = R"xy(foo)bar)xy";"#);
        assert!(diags.is_empty());
        let kinds: Vec<_> = tokens.iter().map(|id| tokens.get(id).kind).collect();
        assert!(kinds.contains(&TokenKind::Str));
        let s = texts(&tokens).into_iter().find(|t| t.starts_with('"')).unwrap();
        assert_eq!(s, r#""foo)bar""#);
    }

    #[test]
    fn raw_string_missing_terminator_is_reported() {
        let (_, diags) = scan_str(r#"R"xy(unterminated"#);
        assert!(diags.has_errors());
    }

    #[test]
    fn prefixed_string_literal_merges_into_one_token() {
        let (tokens, diags) = scan_str(r#"u8"hi""#);
        assert!(diags.is_empty());
        assert_eq!(texts(&tokens), vec![r#"u8"hi""#]);
        let kinds: Vec<_> = tokens.iter().map(|id| tokens.get(id).kind).collect();
        assert_eq!(kinds, vec![TokenKind::Str]);
    }

    #[test]
    fn non_ascii_byte_clears_the_stream_and_is_fatal() {
        let bytes = b"x \xC3\xA9 y".to_vec();
        let decoded = decode_bytes(&bytes);
        let (tokens, diags) = scan_str(&decoded);
        assert!(diags.has_errors());
        assert!(tokens.is_empty());
    }

    #[test]
    fn control_character_is_normalised_to_whitespace() {
        let (tokens, diags) = scan_str("x \u{1} y");
        assert!(diags.is_empty());
        assert_eq!(texts(&tokens), vec!["x", "y"]);
    }

    #[test]
    fn utf8_bom_bytes_decode_and_strip_cleanly() {
        let mut bytes = vec![0xEF, 0xBB, 0xBF];
        bytes.extend_from_slice(b"x");
        let decoded = decode_bytes(&bytes);
        let (tokens, diags) = scan_str(&decoded);
        assert!(diags.is_empty());
        assert_eq!(texts(&tokens), vec!["x"]);
    }

    #[test]
    fn utf16_le_bom_decodes_ascii_content() {
        let mut bytes = vec![0xFF, 0xFE];
        for c in "x y".encode_utf16() {
            bytes.extend_from_slice(&c.to_le_bytes());
        }
        let decoded = decode_bytes(&bytes);
        let (tokens, diags) = scan_str(&decoded);
        assert!(diags.is_empty());
        assert_eq!(texts(&tokens), vec!["x", "y"]);
    }

    #[test]
    fn token_kinds_are_classified() {
        let (tokens, _) = scan_str("foo 1 \"s\" 'c' +");
        let kinds: Vec<_> = tokens.iter().map(|id| tokens.get(id).kind).collect();
        assert_eq!(
            kinds,
            vec![
                TokenKind::Name,
                TokenKind::Number,
                TokenKind::Str,
                TokenKind::Char,
                TokenKind::Op,
            ]
        );
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Scanning never panics on arbitrary printable-ASCII input, and the
        /// number of tokens produced never exceeds the number of
        /// non-whitespace characters fed in.
        #[test]
        fn scan_never_panics_and_is_bounded(s in "[ -~\\n]{0,200}") {
            let mut tokens = TokenStream::new();
            let mut diags = Diagnostics::new();
            scan(FileId::new(0), &s, &mut tokens, &mut diags);
            let non_ws = s.chars().filter(|c| !c.is_whitespace()).count();
            prop_assert!(tokens.len() <= non_ws.max(1) * 1);
        }
    }
}
