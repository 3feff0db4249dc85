//! Operator combining (`TokenList::combineOperators` in the reference):
//! fuses adjacent single-character operator tokens produced by the scanner
//! into the multi-character operators the scanner never recognises directly
//! (`==`, `<=`, `::`, `->`, `<<`, `>>=`, ...), and splices a detached `.`/
//! exponent sign back onto a numeric literal.
//!
//! This pass only ever merges two *adjacent* tokens that are already
//! touching in the source (`tok->location.col + 1 == next.location.col` in
//! the reference) and on the same line — `a = =b` is never combined into
//! `a ==b`.

use crate::token::{TokenId, TokenKind, TokenStream};

fn is_float_suffix(text: &str) -> bool {
    matches!(text, "f" | "F" | "l" | "L")
}

fn same_line(tokens: &TokenStream, a: TokenId, b: TokenId) -> bool {
    tokens.get(a).location.line == tokens.get(b).location.line
}

fn adjacent(tokens: &TokenStream, a: TokenId, b: TokenId) -> bool {
    same_line(tokens, a, b) && tokens.get(a).location.col + (tokens.get(a).text.chars().count() as u32) == tokens.get(b).location.col
}

/// Walk backward from `tok` (which sits on a `&` that is not inside an
/// executable scope) looking for a function-declaration default-parameter
/// pattern like `void f(x&=2)`, in which `&=` must stay two tokens. Ported
/// directly from the backward scan in the reference.
fn looks_like_reference_default_param(tokens: &TokenStream, amp: TokenId) -> bool {
    let mut indent: i32 = 0;
    let mut start = Some(amp);
    loop {
        let Some(cur) = start else { break };
        let t = tokens.get(cur);
        if t.op() == Some(')') {
            indent += 1;
        } else if t.op() == Some('(') {
            indent -= 1;
        } else if matches!(t.op(), Some(';') | Some('{') | Some('}')) {
            break;
        }
        if indent < 0 {
            break;
        }
        start = tokens.prev(cur);
    }
    if indent != -1 {
        return false;
    }
    let Some(mut start) = start else { return false };
    let ftok = start;
    let mut is_func_decl = tokens.get(start).is_name();
    while is_func_decl {
        let t = tokens.get(start);
        if !t.is_name() && t.text != "::" && t.op() != Some('*') && t.op() != Some('&') {
            is_func_decl = false;
        }
        let Some(prev) = tokens.prev(start) else { break };
        if matches!(tokens.get(prev).op(), Some(';') | Some('{') | Some('}') | Some(':')) {
            break;
        }
        start = prev;
    }
    is_func_decl && start != ftok && tokens.get(start).is_name()
}

/// Run the operator-combining pass over the whole stream in place.
pub fn combine_operators(tokens: &mut TokenStream) {
    // One bool per nested `{`: true if that scope is executable code rather
    // than, e.g., a struct body — determined by whether the token before the
    // `{` closes a `)` (a function body), matching the reference's stack.
    let mut executable_scope: Vec<bool> = vec![false];

    let mut cur = tokens.front();
    while let Some(tok) = cur {
        let next_tok = tokens.next(tok);
        let op = tokens.get(tok).op();

        if op == Some('{') {
            if *executable_scope.last().unwrap() {
                executable_scope.push(true);
            } else {
                let mut prev = tokens.prev(tok);
                while let Some(p) = prev {
                    if matches!(tokens.get(p).op(), Some(';') | Some('{') | Some('}') | Some('(') | Some(')')) {
                        prev = tokens.prev(p);
                    } else {
                        break;
                    }
                }
                let is_exec = prev.map_or(false, |p| tokens.get(p).op() == Some(')'));
                executable_scope.push(is_exec);
            }
            cur = next_tok;
            continue;
        }
        if op == Some('}') {
            if executable_scope.len() > 1 {
                executable_scope.pop();
            }
            cur = next_tok;
            continue;
        }

        if op == Some('.') {
            let prev_is_dot = tokens.prev(tok).is_some_and(|p| tokens.get(p).op() == Some('.'));
            let next_is_dot = next_tok.is_some_and(|n| tokens.get(n).op() == Some('.'));
            if !prev_is_dot && !next_is_dot {
                if let Some(prev) = tokens.prev(tok) {
                    if tokens.get(prev).is_number() {
                        let merged = format!("{}.", tokens.get(prev).text);
                        tokens.get_mut(tok).text = merged;
                        tokens.get_mut(tok).kind = TokenKind::Number;
                        tokens.remove(prev);
                        if let Some(n) = tokens.next(tok) {
                            let nt = tokens.get(n);
                            if is_float_suffix(&nt.text) || nt.text.starts_with(['e', 'E']) {
                                let merged = format!("{}{}", tokens.get(tok).text, nt.text);
                                tokens.get_mut(tok).text = merged;
                                tokens.remove(n);
                            }
                        }
                    }
                }
                if let Some(n) = tokens.next(tok) {
                    if tokens.get(n).is_number() {
                        let merged = format!("{}{}", tokens.get(tok).text, tokens.get(n).text);
                        tokens.get_mut(tok).text = merged;
                        tokens.get_mut(tok).kind = TokenKind::Number;
                        tokens.remove(n);
                    }
                }
            }
        }

        // Detached exponent sign: `1.5` `e` ... is one scan token already, but
        // a split like `1` `.` `5` `e` `-` `10` can still appear after the
        // dot-merge above; re-check for a number ending in e/E.
        {
            let t = tokens.get(tok);
            let last = t.text.chars().last();
            let is_hex = t.text.starts_with("0x") || t.text.starts_with("0X");
            if t.is_number() && !is_hex && matches!(last, Some('e') | Some('E')) {
                if let Some(sign) = tokens.next(tok) {
                    if matches!(tokens.get(sign).op(), Some('+') | Some('-')) {
                        if let Some(digits) = tokens.next(sign) {
                            if tokens.get(digits).is_number() {
                                let merged = format!(
                                    "{}{}{}",
                                    tokens.get(tok).text,
                                    tokens.get(sign).op().unwrap(),
                                    tokens.get(digits).text
                                );
                                tokens.get_mut(tok).text = merged;
                                tokens.remove(sign);
                                tokens.remove(digits);
                            }
                        }
                    }
                }
            }
        }

        let Some(op) = tokens.get(tok).op() else {
            cur = tokens.next(tok);
            continue;
        };
        let Some(next) = tokens.next(tok) else {
            cur = next_tok;
            continue;
        };
        let Some(next_op) = tokens.get(next).op() else {
            cur = next_tok;
            continue;
        };
        if !adjacent(tokens, tok, next) {
            cur = next_tok;
            continue;
        }

        if next_op == '=' && "=!<>+-*/%&|^".contains(op) {
            if op == '&' && !*executable_scope.last().unwrap() && looks_like_reference_default_param(tokens, tok) {
                cur = tokens.next(tok);
                continue;
            }
            let merged = format!("{op}=");
            tokens.get_mut(tok).text = merged;
            tokens.remove(next);
        } else if (op == '|' || op == '&') && op == next_op {
            let merged = format!("{op}{next_op}");
            tokens.get_mut(tok).text = merged;
            tokens.remove(next);
        } else if op == ':' && next_op == ':' {
            tokens.get_mut(tok).text = "::".to_string();
            tokens.remove(next);
        } else if op == '-' && next_op == '>' {
            tokens.get_mut(tok).text = "->".to_string();
            tokens.remove(next);
        } else if (op == '<' || op == '>') && op == next_op {
            let merged = format!("{op}{next_op}");
            tokens.get_mut(tok).text = merged;
            tokens.remove(next);
            if let Some(eq) = tokens.next(tok) {
                if tokens.get(eq).op() == Some('=') && adjacent(tokens, tok, eq) {
                    let merged = format!("{}=", tokens.get(tok).text);
                    tokens.get_mut(tok).text = merged;
                    tokens.remove(eq);
                }
            }
        } else if (op == '+' || op == '-') && op == next_op {
            let prev_is_number = tokens.prev(tok).is_some_and(|p| tokens.get(p).is_number());
            let next_next_is_number = tokens.next(next).is_some_and(|n| tokens.get(n).is_number());
            if !prev_is_number && !next_next_is_number {
                let merged = format!("{op}{next_op}");
                tokens.get_mut(tok).text = merged;
                tokens.remove(next);
            }
        }

        cur = tokens.next(tok);
    }
}

/// Link every matched `(`/`)`, `[`/`]`, and `{`/`}` pair in the stream, the
/// way the reference's tokenizer calls `Token::createMutualLinks` while it
/// walks brackets (this preprocessor core has no nested-template-angle
/// tracking, so `<`/`>` is deliberately not linked here — only the three
/// bracket kinds that are unambiguous without a parser).
///
/// An unmatched opener (reaches end of stream with opens still pending) is
/// left unlinked rather than treated as an error — this pass is a courtesy
/// to downstream consumers of the token stream, not a balance checker.
pub fn link_brackets(tokens: &mut TokenStream) {
    let mut stack: Vec<TokenId> = Vec::new();
    let mut cur = tokens.front();
    while let Some(tok) = cur {
        match tokens.get(tok).op() {
            Some('(') | Some('[') | Some('{') => stack.push(tok),
            Some(')') | Some(']') | Some('}') => {
                if let Some(open) = stack.pop() {
                    let matches = matches!(
                        (tokens.get(open).op(), tokens.get(tok).op()),
                        (Some('('), Some(')')) | (Some('['), Some(']')) | (Some('{'), Some('}'))
                    );
                    if matches {
                        tokens.create_mutual_links(open, tok);
                    }
                }
            }
            _ => {}
        }
        cur = tokens.next(tok);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scanner::scan;
    use ctrlcpp_util::diagnostics::Diagnostics;
    use ctrlcpp_util::location::FileId;

    fn combine(src: &str) -> Vec<String> {
        let mut tokens = TokenStream::new();
        let mut diags = Diagnostics::new();
        scan(FileId::new(0), src, &mut tokens, &mut diags);
        combine_operators(&mut tokens);
        tokens.iter().map(|id| tokens.get(id).text.clone()).collect()
    }

    #[test]
    fn combines_equality_and_relational_compounds() {
        assert_eq!(combine("a == b"), vec!["a", "==", "b"]);
        assert_eq!(combine("a <= b"), vec!["a", "<=", "b"]);
        assert_eq!(combine("a != b"), vec!["a", "!=", "b"]);
        assert_eq!(combine("a += b"), vec!["a", "+=", "b"]);
    }

    #[test]
    fn combines_shift_and_shift_assign() {
        assert_eq!(combine("a << b"), vec!["a", "<<", "b"]);
        assert_eq!(combine("a <<= b"), vec!["a", "<<=", "b"]);
    }

    #[test]
    fn combines_scope_and_arrow() {
        assert_eq!(combine("a::b"), vec!["a", "::", "b"]);
        assert_eq!(combine("a->b"), vec!["a", "->", "b"]);
    }

    #[test]
    fn does_not_combine_non_adjacent_operators() {
        assert_eq!(combine("a = = b"), vec!["a", "=", "=", "b"]);
    }

    #[test]
    fn reattaches_split_float_literal() {
        // A `.` immediately followed by digits always absorbs them, matching
        // the reference's unconditional "tok->next->number" merge — this is
        // what turns a leading-dot float literal like `.5` into one token.
        assert_eq!(combine("a . 5"), vec!["a", ".5"]);
        assert_eq!(combine("1 . 5"), vec!["1.5"]);
    }

    #[test]
    fn does_not_merge_plusminus_when_adjacent_to_a_number() {
        // `1++2` is `1`, `+`, `+`, `2` staying apart because `+`'s previous
        // token is a number (this is `1 + (+2)`, not `1 (++) 2`).
        assert_eq!(combine("1++2"), vec!["1", "+", "+", "2"]);
    }

    #[test]
    fn merges_plusminus_when_not_adjacent_to_a_number() {
        assert_eq!(combine("a++b"), vec!["a", "++", "b"]);
    }

    fn scan_tokens(src: &str) -> TokenStream {
        let mut tokens = TokenStream::new();
        let mut diags = Diagnostics::new();
        scan(FileId::new(0), src, &mut tokens, &mut diags);
        combine_operators(&mut tokens);
        tokens
    }

    #[test]
    fn links_matching_parens_and_braces() {
        let mut tokens = scan_tokens("f(a, (b), {c});");
        link_brackets(&mut tokens);
        let ids: Vec<TokenId> = tokens.iter().collect();
        let open_paren = ids[1];
        let close_paren = ids[ids.len() - 2];
        assert_eq!(tokens.get(open_paren).link, Some(close_paren));
        assert_eq!(tokens.get(close_paren).link, Some(open_paren));
        for id in ids {
            if let Some(link) = tokens.get(id).link {
                assert_eq!(tokens.get(link).link, Some(id));
            }
        }
    }

    #[test]
    fn unmatched_opener_stays_unlinked() {
        let mut tokens = scan_tokens("f(a");
        link_brackets(&mut tokens);
        let open = tokens.iter().nth(1).unwrap();
        assert_eq!(tokens.get(open).link, None);
    }
}
