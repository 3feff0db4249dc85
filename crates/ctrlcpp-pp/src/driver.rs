//! The preprocessor driver (`simplecpp::preprocess` in the reference): walks
//! the raw token stream of a translation unit, maintaining the `#if` state
//! stack and performing include expansion, and emits the final token stream
//! through the domain rewriter.
//!
//! The reference links every included file's raw tokens into one giant
//! doubly linked list so a single `const Token *` cursor can walk across
//! file boundaries. The token arena here is scoped per file (an
//! arena-internal `TokenId` only makes sense against the `TokenStream` that
//! issued it), so this port instead keeps one loaded [`TokenStream`] per
//! file in a map and walks with an explicit `(file key, TokenId)` cursor,
//! pushing a resume point onto `include_stack` exactly where the reference
//! pushes a resume pointer.

use ctrlcpp_lex::token::{Token, TokenId, TokenKind, TokenStream};
use ctrlcpp_lex::{combine_operators, link_brackets, scan};
use ctrlcpp_util::diagnostics::{Diagnostics, OutputKind};
use ctrlcpp_util::location::{FileRegistry, Location};
use rustc_hash::{FxHashMap, FxHashSet};

use crate::dui::{Dui, PathCache, UserDefine};
use crate::fold::{fold, parse_i64, simplify_names, simplify_numbers};
use crate::include::resolve_header;
use crate::rewrite::rewrite;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum IfState {
    True,
    ElseIsTrue,
    AlwaysFalse,
}

type Cursor = (String, TokenId);

fn is_name_start_char(c: char) -> bool {
    c == '_' || c.is_alphanumeric()
}

/// Read a source file from disk and scan + combine it into a fresh stream,
/// registering its path under a new [`ctrlcpp_util::location::FileId`].
fn scan_file(registry: &mut FileRegistry, diags: &mut Diagnostics, path: &str) -> Option<TokenStream> {
    let bytes = std::fs::read(path).ok()?;
    let content = ctrlcpp_lex::scanner::decode_bytes(&bytes);
    let file = registry.register(path.to_string());
    let mut tokens = TokenStream::new();
    scan(file, &content, &mut tokens, diags);
    combine_operators(&mut tokens);
    link_brackets(&mut tokens);
    Some(tokens)
}

fn goto_next_line(tokens: &TokenStream, start: TokenId) -> Option<TokenId> {
    let start_loc = tokens.get(start).location;
    let mut cur = tokens.next(start);
    while let Some(id) = cur {
        let loc = tokens.get(id).location;
        if loc.line != start_loc.line || loc.file != start_loc.file {
            return Some(id);
        }
        cur = tokens.next(id);
    }
    None
}

fn same_line(tokens: &TokenStream, a: TokenId, b: TokenId) -> bool {
    let la = tokens.get(a).location;
    let lb = tokens.get(b).location;
    la.file == lb.file && la.line == lb.line
}

/// Collect every raw token sharing `start`'s line, cloned out of the arena so
/// the caller can build a throwaway expression/header token list from them.
fn collect_line(tokens: &TokenStream, start: TokenId) -> Vec<Token> {
    let mut out = Vec::new();
    let mut cur = Some(start);
    while let Some(id) = cur {
        if !same_line(tokens, start, id) {
            break;
        }
        out.push(tokens.get(id).clone());
        cur = tokens.next(id);
    }
    out
}

/// `#include`/`#uses` header text, ported from the reference's `inc1`/`inc2`
/// reconstruction: a single string literal is used verbatim; a `< ... >`
/// run of tokens is concatenated and treated as a system header.
fn read_include_header(line: &[Token], registry: &FileRegistry, defines: &FxHashMap<String, UserDefine>) -> Option<(bool, String)> {
    let mut tokens = line.to_vec();
    if let Some(first) = tokens.first_mut() {
        if first.kind == TokenKind::Name {
            match first.text.as_str() {
                "__FILE__" => {
                    first.text = format!("\"{}\"", registry.name(first.location.file));
                    first.kind = TokenKind::Str;
                }
                "__LINE__" => {
                    first.text = first.location.line.to_string();
                    first.kind = TokenKind::Number;
                }
                name => {
                    if let Some(def) = defines.get(name) {
                        first.text = def.value.clone();
                    }
                }
            }
        }
    }

    if tokens.len() == 1 && tokens[0].kind == TokenKind::Str {
        let text = &tokens[0].text;
        let inner = text.strip_prefix('"')?.strip_suffix('"')?;
        return Some((false, inner.to_string()));
    }

    if tokens.first()?.op() == Some('<') && tokens.last()?.op() == Some('>') {
        let joined: String = tokens.iter().map(|t| t.text.as_str()).collect();
        if joined.len() < 2 {
            return None;
        }
        return Some((true, joined[1..joined.len() - 1].to_string()));
    }

    None
}

/// Build the `#if`/`#elif` expression token stream from `line[1..]` (the
/// tokens after the directive keyword), substituting `defined X`/`defined(X)`
/// with `0` unconditionally (an intentional quirk of the dialect this is
/// ported from, not a bug — macro definitions live outside this core's
/// tracking) and running every name token through the domain rewriter chain.
/// Returns `None` on a malformed `defined` construct (unbalanced parens or
/// nothing following it), which the caller treats as a fatal syntax error.
fn build_condition_expr(line: &[Token], registry: &FileRegistry, defines: &FxHashMap<String, UserDefine>) -> Option<TokenStream> {
    let mut expr = TokenStream::new();
    let mut i = 0usize;
    while i < line.len() {
        let tok = &line[i];
        if tok.kind == TokenKind::Name && tok.text == "defined" {
            i += 1;
            let par = line.get(i).is_some_and(|t| t.op() == Some('('));
            if par {
                i += 1;
            }
            let name_tok = line.get(i)?;
            expr.push_back(TokenKind::Number, "0", name_tok.location);
            i += 1;
            if par {
                let close = line.get(i)?;
                if close.op() != Some(')') {
                    return None;
                }
                i += 1;
            }
            continue;
        }

        if tok.kind == TokenKind::Name {
            let mut scratch = TokenStream::new();
            scratch.push_back(tok.kind, tok.text.clone(), tok.location);
            let id = scratch.front().unwrap();
            let (emitted, _) = rewrite(&scratch, registry, id, defines);
            for r in emitted {
                expr.push_back(r.kind, r.text, tok.location);
            }
        } else {
            expr.push_back(tok.kind, tok.text.clone(), tok.location);
        }
        i += 1;
    }
    Some(expr)
}

/// Evaluate `line[1..]` as an `#if`/`#elif` condition. `Ok(None)` means the
/// condition could not be parsed at all (orphan `defined`), which the caller
/// treats as fatal; `Err(())` means constant folding itself failed (division
/// by zero, overflow), also fatal per the reference. A fold that completes
/// but leaves something other than a single number (an unresolved name, a
/// comma expression, ...) is not an error — it evaluates to `false`, matching
/// `evaluate`'s `cfront() == cback() && cfront()->number ? ... : 0`.
fn evaluate_condition(line: &[Token], registry: &FileRegistry, defines: &FxHashMap<String, UserDefine>, diags: &mut Diagnostics, at: Location, directive: &str) -> Result<bool, ()> {
    let Some(mut expr) = build_condition_expr(line, registry, defines) else {
        diags.push(OutputKind::SyntaxError, at, format!("failed to evaluate #{directive} condition"));
        return Err(());
    };
    if expr.is_empty() {
        diags.push(OutputKind::SyntaxError, at, format!("failed to evaluate #{directive} condition"));
        return Err(());
    }
    simplify_names(&mut expr);
    simplify_numbers(&mut expr);
    if fold(&mut expr).is_err() {
        diags.push(OutputKind::SyntaxError, at, format!("failed to evaluate #{directive} condition"));
        return Err(());
    }
    let single = expr.front().filter(|&f| expr.back() == Some(f));
    let value = single
        .filter(|&id| expr.get(id).is_number())
        .map_or(0, |id| parse_i64(&expr.get(id).text));
    Ok(value != 0)
}

/// Assemble a `#error`/`#warning` message: the rest-of-line tokens
/// concatenated, with a single space inserted only before a token whose
/// first character is a name character — ported verbatim from the
/// reference's message-building loop.
fn assemble_message(line: &[Token]) -> String {
    let mut msg = String::new();
    for tok in line {
        if !msg.is_empty() && tok.text.chars().next().is_some_and(is_name_start_char) {
            msg.push(' ');
        }
        msg.push_str(&tok.text);
    }
    msg
}

/// `#define NAME value...`: the rest-of-line tokens after `NAME`, joined the
/// same way as an `#error` message, become `NAME`'s literal value.
fn apply_define(line: &[Token], defines: &mut FxHashMap<String, UserDefine>) {
    let Some((name, rest)) = line.split_first() else { return };
    if name.kind != TokenKind::Name {
        return;
    }
    let value = assemble_message(rest);
    defines.insert(name.text.clone(), UserDefine::new(value));
}

fn apply_undef(line: &[Token], defines: &mut FxHashMap<String, UserDefine>) {
    if let Some(name) = line.first() {
        defines.remove(&name.text);
    }
}

/// Preprocess the translation unit rooted at `root_path`, returning the
/// final expanded token stream. An empty stream signals a fatal condition;
/// check `diags.has_errors()` to distinguish that from a genuinely empty
/// input.
pub fn preprocess(root_path: &str, dui: &mut Dui, cache: &PathCache, registry: &mut FileRegistry, diags: &mut Diagnostics) -> TokenStream {
    let mut output = TokenStream::new();
    let mut files: FxHashMap<String, TokenStream> = FxHashMap::default();

    let Some(root_tokens) = scan_file(registry, diags, root_path) else {
        diags.push(OutputKind::MissingHeader, Location::new(registry.register(root_path), 1, 1), format!("could not open {root_path}"));
        return output;
    };
    files.insert(root_path.to_string(), root_tokens);

    let mut include_stack: Vec<(String, Option<TokenId>)> = Vec::new();
    include_stack.push((root_path.to_string(), files[root_path].front()));
    for forced in dui.includes.clone() {
        match scan_file(registry, diags, &forced) {
            Some(tokens) => {
                let front = tokens.front();
                files.insert(forced.clone(), tokens);
                include_stack.push((forced, front));
            }
            None => {
                let file = registry.register(forced.clone());
                diags.push(
                    OutputKind::ExplicitIncludeNotFound,
                    Location::new(file, 1, 1),
                    format!("could not open forced include {forced}"),
                );
            }
        }
    }

    let mut ifstates = vec![IfState::True];
    let mut pragma_once: FxHashSet<String> = FxHashSet::default();
    let mut checked_headers: FxHashSet<String> = FxHashSet::default();
    let mut current: Option<Cursor> = None;

    loop {
        let (key, id) = match current.take() {
            Some(pair) => pair,
            None => match include_stack.pop() {
                Some((k, Some(id))) => (k, id),
                Some((_, None)) => continue,
                None => break,
            },
        };

        let tok = files[&key].get(id).clone();

        if tok.op() == Some('#') && !files[&key].prev(id).is_some_and(|p| same_line(&files[&key], p, id)) {
            let Some(next) = files[&key].next(id) else {
                current = None;
                continue;
            };
            if !same_line(&files[&key], id, next) {
                current = Some((key.clone(), next));
                continue;
            }
            let directive = files[&key].get(next).clone();
            if directive.kind != TokenKind::Name {
                current = goto_next_line(&files[&key], next).map(|n| (key.clone(), n));
                continue;
            }

            if ifstates.len() <= 1 && matches!(directive.text.as_str(), "elif" | "else" | "endif") {
                diags.push(OutputKind::SyntaxError, directive.location, format!("#{} without #if", directive.text));
                return TokenStream::new();
            }

            if *ifstates.last().unwrap() == IfState::True && matches!(directive.text.as_str(), "error" | "warning") {
                let line = collect_line(&files[&key], next);
                let msg = format!("#{} {}", directive.text, assemble_message(&line[1..]));
                let kind = if directive.text == "error" { OutputKind::Error } else { OutputKind::Warning };
                diags.push(kind, directive.location, msg);
                if directive.text == "error" {
                    return TokenStream::new();
                }
            }

            if *ifstates.last().unwrap() == IfState::True && matches!(directive.text.as_str(), "include" | "uses") {
                let line = collect_line(&files[&key], next);
                let header_line = &line[1..];
                let Some((systemheader, header)) = read_include_header(header_line, registry, &dui.defines) else {
                    diags.push(OutputKind::SyntaxError, directive.location, "No header in #include");
                    return TokenStream::new();
                };

                if checked_headers.insert(header.clone()) {
                    let sourcefile = key.clone();
                    let resolved = resolve_header(dui, cache, &sourcefile, &header, systemheader);
                    match resolved {
                        None => {
                            diags.push(OutputKind::MissingHeader, directive.location, format!("Header not found: {header}"));
                        }
                        Some(path) => {
                            if include_stack.len() >= crate::include::MAX_INCLUDE_DEPTH {
                                diags.push(OutputKind::IncludeNestedTooDeeply, directive.location, "#include nested too deeply");
                            } else if !pragma_once.contains(&path) {
                                if !files.contains_key(&path) {
                                    if let Some(tokens) = scan_file(registry, diags, &path) {
                                        files.insert(path.clone(), tokens);
                                    }
                                }
                                if let Some(tokens) = files.get(&path) {
                                    include_stack.push((key.clone(), goto_next_line(&files[&key], id)));
                                    current = tokens.front().map(|f| (path.clone(), f));
                                    continue;
                                }
                            }
                        }
                    }
                }
            } else if matches!(directive.text.as_str(), "if" | "ifdef" | "ifndef" | "elif") {
                let next2 = files[&key].next(next);
                if next2.is_none_or(|n| !same_line(&files[&key], next, n)) {
                    diags.push(OutputKind::SyntaxError, directive.location, format!("Syntax error in #{}", directive.text));
                    return TokenStream::new();
                }
                let line = collect_line(&files[&key], next2.unwrap());

                let condition_is_true = if *ifstates.last().unwrap() == IfState::AlwaysFalse
                    || (*ifstates.last().unwrap() == IfState::ElseIsTrue && directive.text != "elif")
                {
                    false
                } else {
                    match evaluate_condition(&line, registry, &dui.defines, diags, directive.location, &directive.text) {
                        Ok(v) => v,
                        Err(()) => return TokenStream::new(),
                    }
                };

                if directive.text != "elif" {
                    if *ifstates.last().unwrap() != IfState::True {
                        ifstates.push(IfState::AlwaysFalse);
                    } else {
                        ifstates.push(if condition_is_true { IfState::True } else { IfState::ElseIsTrue });
                    }
                } else if *ifstates.last().unwrap() == IfState::True {
                    *ifstates.last_mut().unwrap() = IfState::AlwaysFalse;
                } else if *ifstates.last().unwrap() == IfState::ElseIsTrue && condition_is_true {
                    *ifstates.last_mut().unwrap() = IfState::True;
                }
            } else if directive.text == "else" {
                let top = ifstates.last_mut().unwrap();
                *top = if *top == IfState::ElseIsTrue { IfState::True } else { IfState::AlwaysFalse };
            } else if directive.text == "endif" {
                ifstates.pop();
            } else if directive.text == "define" && *ifstates.last().unwrap() == IfState::True {
                let line = collect_line(&files[&key], next);
                apply_define(&line[1..], &mut dui.defines);
            } else if directive.text == "undef" && *ifstates.last().unwrap() == IfState::True {
                let line = collect_line(&files[&key], next);
                apply_undef(&line[1..], &mut dui.defines);
            } else if *ifstates.last().unwrap() == IfState::True && directive.text == "pragma" {
                if let Some(n2) = files[&key].next(next) {
                    if files[&key].get(n2).text == "once" && same_line(&files[&key], next, n2) {
                        pragma_once.insert(key.clone());
                    }
                }
            }

            current = goto_next_line(&files[&key], id).map(|n| (key.clone(), n));
            continue;
        }

        if *ifstates.last().unwrap() != IfState::True {
            current = goto_next_line(&files[&key], id).map(|n| (key.clone(), n));
            continue;
        }

        let (emitted, next_id) = rewrite(&files[&key], registry, id, &dui.defines);
        for r in emitted {
            output.push_back(r.kind, r.text, tok.location);
        }
        current = next_id.map(|n| (key.clone(), n));
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn run(src: &str) -> (Vec<String>, Diagnostics) {
        let dir = tempdir().unwrap();
        let path = dir.path().join("main.ctl");
        std::fs::write(&path, src).unwrap();
        let mut dui = Dui::default();
        let cache = PathCache::new();
        let mut registry = FileRegistry::new();
        let mut diags = Diagnostics::new();
        let tokens = preprocess(path.to_str().unwrap(), &mut dui, &cache, &mut registry, &mut diags);
        (tokens.iter().map(|id| tokens.get(id).text.clone()).collect(), diags)
    }

    #[test]
    fn basic_conditional() {
        let (out, _) = run("#define A 1\n#if A\nx\n#else\ny\n#endif\n");
        assert_eq!(out, vec!["x"]);
    }

    #[test]
    fn alternative_operators_in_condition() {
        let (out, _) = run("#if not 0 and 1\nK\n#endif\n");
        assert_eq!(out, vec!["K"]);
    }

    #[test]
    fn add_global_rewrite_end_to_end() {
        let (out, _) = run("addGlobal(\"LIMIT\", INT_VAR);\n");
        assert_eq!(out, vec!["global", "int", "LIMIT", ";"]);
    }

    #[test]
    fn shared_ptr_rewrite_end_to_end() {
        let (out, _) = run("shared_ptr<STRING_VAR> s;\n");
        assert_eq!(out, vec!["string", "s", ";"]);
    }

    #[test]
    fn ternary_fold_in_condition() {
        let (out, _) = run("#if (1 ? 2 : 3) == 2\nYES\n#endif\n");
        assert_eq!(out, vec!["YES"]);
    }

    #[test]
    fn undefined_name_is_zero() {
        let (out, _) = run("#if UNDEF\nA\n#else\nB\n#endif\n");
        assert_eq!(out, vec!["B"]);
    }

    #[test]
    fn undefined_name_collapses_to_zero_inside_a_larger_expression() {
        let (out, diags) = run("#if UNDEF + 1\nYES\n#else\nNO\n#endif\n");
        assert_eq!(out, vec!["YES"]);
        assert!(!diags.has_errors());
    }

    #[test]
    fn hex_literal_condition_is_true() {
        let (out, _) = run("#if 0x10\nYES\n#else\nNO\n#endif\n");
        assert_eq!(out, vec!["YES"]);
    }

    #[test]
    fn char_literal_condition_is_true() {
        let (out, _) = run("#if 'A'\nYES\n#else\nNO\n#endif\n");
        assert_eq!(out, vec!["YES"]);
    }

    #[test]
    fn escaped_char_literal_counts_the_backslash_not_the_escaped_value() {
        // No escape interpretation: the byte right after the opening quote is
        // `\`, not a null byte, so this reads as true rather than false.
        let (out, _) = run("#if '\\0'\nYES\n#else\nNO\n#endif\n");
        assert_eq!(out, vec!["YES"]);
    }

    #[test]
    fn division_by_zero_clears_output_and_reports_error() {
        let (out, diags) = run("#if 1 / 0\nA\n#endif\n");
        assert!(out.is_empty());
        assert!(diags.has_errors());
    }

    #[test]
    fn error_directive_clears_output() {
        let (out, diags) = run("#error boom\nA\n");
        assert!(out.is_empty());
        assert!(diags.has_errors());
    }

    #[test]
    fn warning_directive_keeps_going() {
        let (out, diags) = run("#warning heads up\nA\n");
        assert_eq!(out, vec!["A"]);
        assert!(!diags.has_errors());
    }
}
