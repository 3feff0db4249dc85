//! Constant-expression folding for `#if`/`#elif` conditions
//! (`TokenList::constFold` and its `constFold*` helpers in the reference).
//!
//! Folding reduces a flat token stream — numbers, alternative-keyword and
//! symbolic operators, and balanced parentheses — down to a single integer
//! token. It works innermost-parenthesis-out: find the last `(`, fold the
//! expression between it and the next matching token, delete the now-empty
//! parens, and repeat until no `(` remains. Within one parenthesis-free span
//! it applies eight passes in strict precedence order, the same order the
//! reference uses, re-scanning the whole span on every pass (the span is
//! short — one `#if` line — so the reference was never optimised past "clear
//! and obviously correct").
//!
//! All arithmetic is signed 64-bit two's-complement, matching `long long` in
//! the reference; a divide/modulo by zero or a `LLONG_MIN / -1` overflow is
//! reported as an error rather than panicking or wrapping, exactly the
//! reference's `throw std::overflow_error`.

use crate::pattern::starts_with_one_of;
use ctrlcpp_lex::token::{TokenId, TokenKind, TokenStream};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FoldError {
    #[error("division by zero")]
    DivisionByZero,
    #[error("division overflow")]
    DivisionOverflow,
    #[error("invalid expression")]
    InvalidExpression,
}

type FoldResult<T> = Result<T, FoldError>;

pub(crate) fn parse_i64(text: &str) -> i64 {
    if let Some(hex) = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        let digits: String = hex.chars().take_while(|c| c.is_ascii_hexdigit()).collect();
        return i64::from_str_radix(&digits, 16).unwrap_or(0) as i64;
    }
    let digits: String = text.chars().take_while(|c| c.is_ascii_digit()).collect();
    digits.parse::<i64>().unwrap_or(0)
}

/// Keywords that spell out an operator (`and`, `not`, ...) rather than
/// standing alone as a name, per `simplifyName`'s `altop` table.
const ALT_OPS: &[&str] = &["and", "or", "bitand", "bitor", "compl", "not", "not_eq", "xor"];

fn is_alt_binary_op(tokens: &TokenStream, tok: TokenId) -> bool {
    let prev_ok = tokens.prev(tok).is_some_and(|p| {
        let t = tokens.get(p);
        t.is_number() || t.is_name() || t.op() == Some(')')
    });
    let next_ok = tokens.next(tok).is_some_and(|n| {
        let t = tokens.get(n);
        t.is_number() || t.is_name() || t.op() == Some('(')
    });
    prev_ok && next_ok
}

fn is_alt_unary_op(tokens: &TokenStream, tok: TokenId) -> bool {
    let prev_ok = tokens.prev(tok).map_or(true, |p| tokens.get(p).op() == Some('('));
    let next_ok = tokens
        .next(tok)
        .is_some_and(|n| tokens.get(n).is_name() || tokens.get(n).is_number());
    prev_ok && next_ok
}

/// `simplifyName` in the reference: every name token that isn't an
/// alternative-operator keyword actually being used as an operator collapses
/// to the number `0`, since this core tracks no macro definitions for
/// conditions to resolve names against.
pub fn simplify_names(tokens: &mut TokenStream) {
    let mut cur = tokens.front();
    while let Some(tok) = cur {
        let next = tokens.next(tok);
        if tokens.get(tok).is_name() {
            let text = tokens.get(tok).text.clone();
            let alt_used = ALT_OPS.contains(&text.as_str())
                && if text == "not" || text == "compl" {
                    is_alt_unary_op(tokens, tok)
                } else {
                    is_alt_binary_op(tokens, tok)
                };
            if !alt_used {
                set_number(tokens, tok, 0);
            }
        }
        cur = next;
    }
}

/// `simplifyNumbers` in the reference: a hex literal becomes its decimal
/// value, and a character literal becomes the low 8 bits of the byte right
/// after its opening quote (no escape interpretation — a blunt truncation
/// carried over verbatim from `tok->str()[1] & 0xffU`).
pub fn simplify_numbers(tokens: &mut TokenStream) {
    let mut cur = tokens.front();
    while let Some(tok) = cur {
        let next = tokens.next(tok);
        let text = tokens.get(tok).text.clone();
        if text.chars().count() != 1 {
            if text.starts_with("0x") || text.starts_with("0X") {
                set_number(tokens, tok, parse_i64(&text));
            } else if let Some(code) = text.as_bytes().get(1) {
                if text.starts_with('\'') {
                    set_number(tokens, tok, (*code & 0xff) as i64);
                }
            }
        }
        cur = next;
    }
}

fn is_number(tokens: &TokenStream, id: TokenId) -> bool {
    tokens.get(id).is_number()
}

fn set_number(tokens: &mut TokenStream, id: TokenId, value: i64) {
    tokens.get_mut(id).text = value.to_string();
    tokens.get_mut(id).kind = TokenKind::Number;
}

/// Replace the alternative-operator-keyword spelling of a binary operator
/// (`and`, `or`, `xor`, `bitand`, `bitor`, `not_eq`) with its symbolic form,
/// in place, if `tok` is that keyword used as a binary operator (has both a
/// previous and a next token — a unary-only keyword like lone `not` is left
/// to [`normalize_unary_alt_ops`]).
fn normalize_binary_alt_op(tokens: &mut TokenStream, tok: TokenId, keyword: &str, symbol: &str) {
    if tokens.get(tok).text == keyword && tokens.prev(tok).is_some() && tokens.next(tok).is_some() {
        tokens.get_mut(tok).text = symbol.to_string();
    }
}

/// `not`/`compl` used as a unary prefix become `!`/`~`, matching
/// `isAlternativeUnaryOp` in the reference: previous token is absent or `(`,
/// next token is a name or number.
fn normalize_unary_alt_ops(tokens: &mut TokenStream, start: TokenId) {
    let mut cur = Some(start);
    while let Some(tok) = cur {
        if tokens.get(tok).op() == Some(')') {
            break;
        }
        let next = tokens.next(tok);
        for (keyword, symbol) in [("not", "!"), ("compl", "~")] {
            if tokens.get(tok).text == keyword {
                let prev_ok = tokens.prev(tok).map_or(true, |p| tokens.get(p).op() == Some('('));
                let next_ok = next.is_some_and(|n| tokens.get(n).is_name() || tokens.get(n).is_number());
                if prev_ok && next_ok {
                    tokens.get_mut(tok).text = symbol.to_string();
                }
            }
        }
        cur = next;
    }
}

fn const_fold_unary_not_pos_neg(tokens: &mut TokenStream, start: TokenId) -> FoldResult<()> {
    normalize_unary_alt_ops(tokens, start);
    let mut cur = Some(start);
    while let Some(tok) = cur {
        if tokens.get(tok).op() == Some(')') {
            break;
        }
        let next = tokens.next(tok);
        let op = tokens.get(tok).op();
        if op == Some('!') {
            if let Some(n) = next {
                if is_number(tokens, n) {
                    let zero = parse_i64(&tokens.get(n).text) == 0;
                    set_number(tokens, tok, if zero { 1 } else { 0 });
                    tokens.remove(n);
                    cur = tokens.next(tok);
                    continue;
                }
            }
        } else if op == Some('~') {
            if let Some(n) = next {
                if is_number(tokens, n) {
                    let v = !parse_i64(&tokens.get(n).text);
                    set_number(tokens, tok, v);
                    tokens.remove(n);
                    cur = tokens.next(tok);
                    continue;
                }
            }
        } else if matches!(op, Some('+') | Some('-')) {
            let prev_blocks = tokens.prev(tok).is_some_and(|p| is_number(tokens, p) || tokens.get(p).is_name());
            if !prev_blocks {
                if let Some(n) = next {
                    if is_number(tokens, n) {
                        let v = parse_i64(&tokens.get(n).text);
                        let v = if op == Some('-') { -v } else { v };
                        set_number(tokens, tok, v);
                        tokens.remove(n);
                        cur = tokens.next(tok);
                        continue;
                    }
                }
            }
        }
        cur = next;
    }
    Ok(())
}

/// Run one left-to-right binary-fold pass from `start` to the next `)`,
/// folding `tok` whenever both neighbours are numbers and `should_fold`
/// recognises `tok`'s operator text, replacing `[prev, tok, next]` with one
/// number token holding `combine(prev, next)`.
fn fold_binary_pass(
    tokens: &mut TokenStream,
    start: TokenId,
    mut recognise: impl FnMut(&mut TokenStream, TokenId),
    mut combine: impl FnMut(&str, i64, i64) -> FoldResult<Option<i64>>,
) -> FoldResult<()> {
    let mut cur = Some(start);
    while let Some(tok) = cur {
        if tokens.get(tok).op() == Some(')') {
            break;
        }
        recognise(tokens, tok);
        let next = tokens.next(tok);
        let prev = tokens.prev(tok);
        if let (Some(p), Some(n)) = (prev, next) {
            if is_number(tokens, p) && is_number(tokens, n) {
                let lhs = parse_i64(&tokens.get(p).text);
                let rhs = parse_i64(&tokens.get(n).text);
                let op_text = tokens.get(tok).text.clone();
                if let Some(result) = combine(&op_text, lhs, rhs)? {
                    set_number(tokens, p, result);
                    tokens.remove(tok);
                    tokens.remove(n);
                    cur = tokens.next(p);
                    continue;
                }
            }
        }
        cur = next;
    }
    Ok(())
}

fn const_fold_mul_div_rem(tokens: &mut TokenStream, start: TokenId) -> FoldResult<()> {
    fold_binary_pass(
        tokens,
        start,
        |_, _| {},
        |op, lhs, rhs| match op {
            "*" => Ok(Some(lhs.wrapping_mul(rhs))),
            "/" | "%" => {
                if rhs == 0 {
                    return Err(FoldError::DivisionByZero);
                }
                if rhs == -1 && lhs == i64::MIN {
                    return Err(FoldError::DivisionOverflow);
                }
                Ok(Some(if op == "/" { lhs / rhs } else { lhs % rhs }))
            }
            _ => Ok(None),
        },
    )
}

fn const_fold_add_sub(tokens: &mut TokenStream, start: TokenId) -> FoldResult<()> {
    fold_binary_pass(
        tokens,
        start,
        |_, _| {},
        |op, lhs, rhs| match op {
            "+" => Ok(Some(lhs.wrapping_add(rhs))),
            "-" => Ok(Some(lhs.wrapping_sub(rhs))),
            _ => Ok(None),
        },
    )
}

fn const_fold_shift(tokens: &mut TokenStream, start: TokenId) -> FoldResult<()> {
    fold_binary_pass(
        tokens,
        start,
        |_, _| {},
        |op, lhs, rhs| match op {
            "<<" => Ok(Some(((lhs as u64) << (rhs & 63)) as i64)),
            ">>" => Ok(Some(lhs >> (rhs & 63))),
            _ => Ok(None),
        },
    )
}

fn const_fold_comparison(tokens: &mut TokenStream, start: TokenId) -> FoldResult<()> {
    fold_binary_pass(
        tokens,
        start,
        |toks, tok| normalize_binary_alt_op(toks, tok, "not_eq", "!="),
        |op, lhs, rhs| {
            if !starts_with_one_of(op, "<>=!") {
                return Ok(None);
            }
            let result = match op {
                "==" => lhs == rhs,
                "!=" => lhs != rhs,
                ">" => lhs > rhs,
                ">=" => lhs >= rhs,
                "<" => lhs < rhs,
                "<=" => lhs <= rhs,
                _ => return Ok(None),
            };
            Ok(Some(result as i64))
        },
    )
}

fn const_fold_bitwise(tokens: &mut TokenStream, start: TokenId) -> FoldResult<()> {
    for (symbol, keyword) in [("&", "bitand"), ("^", "xor"), ("|", "bitor")] {
        fold_binary_pass(
            tokens,
            start,
            |toks, tok| normalize_binary_alt_op(toks, tok, keyword, symbol),
            move |op, lhs, rhs| {
                if op != symbol {
                    return Ok(None);
                }
                let result = match symbol {
                    "&" => lhs & rhs,
                    "^" => lhs ^ rhs,
                    "|" => lhs | rhs,
                    _ => unreachable!(),
                };
                Ok(Some(result))
            },
        )?;
    }
    Ok(())
}

fn const_fold_logical_op(tokens: &mut TokenStream, start: TokenId) -> FoldResult<()> {
    fold_binary_pass(
        tokens,
        start,
        |toks, tok| {
            normalize_binary_alt_op(toks, tok, "and", "&&");
            normalize_binary_alt_op(toks, tok, "or", "||");
        },
        |op, lhs, rhs| match op {
            "&&" => Ok(Some(((lhs != 0) && (rhs != 0)) as i64)),
            "||" => Ok(Some(((lhs != 0) || (rhs != 0)) as i64)),
            _ => Ok(None),
        },
    )
}

/// `cond ? a : b`, folding once `cond` is a number and the `:` sits right
/// after `a`. Returns the (possibly new) start token for the next pass,
/// since folding a leading ternary can delete the token folding started at.
fn const_fold_question_op(tokens: &mut TokenStream, start: TokenId) -> FoldResult<TokenId> {
    let mut start = start;
    let mut cur = Some(start);
    while let Some(tok) = cur {
        if tokens.get(tok).op() == Some(')') {
            break;
        }
        if tokens.get(tok).text != "?" {
            cur = tokens.next(tok);
            continue;
        }
        let cond = tokens.prev(tok).ok_or(FoldError::InvalidExpression)?;
        let true_tok = tokens.next(tok).ok_or(FoldError::InvalidExpression)?;
        let colon = tokens.next(true_tok).ok_or(FoldError::InvalidExpression)?;
        if tokens.get(colon).op() != Some(':') {
            cur = tokens.next(tok);
            continue;
        }
        if !is_number(tokens, cond) {
            cur = tokens.next(tok);
            continue;
        }
        let false_tok = tokens.next(colon).ok_or(FoldError::InvalidExpression)?;
        let take_true = parse_i64(&tokens.get(cond).text) != 0;
        let survivor = if take_true { true_tok } else { false_tok };
        let loser = if take_true { false_tok } else { true_tok };
        if cond == start {
            start = survivor;
        }
        tokens.remove(tok);
        tokens.remove(colon);
        tokens.remove(loser);
        tokens.remove(cond);
        cur = Some(start);
    }
    Ok(start)
}

/// Run all eight folding passes, innermost-parenthesis-out, until the whole
/// stream reduces to a single token (ideally a number). The caller is
/// responsible for checking the final result is actually a number — an
/// expression like `(1, 2)` or a dangling name reduces to something else,
/// which the driver treats as a syntax error.
pub fn fold(tokens: &mut TokenStream) -> FoldResult<()> {
    loop {
        let Some(back) = tokens.back() else { return Ok(()) };
        let mut paren = Some(back);
        while let Some(p) = paren {
            if tokens.get(p).op() == Some('(') {
                break;
            }
            paren = tokens.prev(p);
        }
        let mut start = paren.or_else(|| tokens.front()).ok_or(FoldError::InvalidExpression)?;

        const_fold_unary_not_pos_neg(tokens, start)?;
        const_fold_mul_div_rem(tokens, start)?;
        const_fold_add_sub(tokens, start)?;
        const_fold_shift(tokens, start)?;
        const_fold_comparison(tokens, start)?;
        const_fold_bitwise(tokens, start)?;
        const_fold_logical_op(tokens, start)?;
        start = const_fold_question_op(tokens, start)?;

        if tokens.get(start).op() != Some('(') {
            return Ok(());
        }
        let open = start;
        let inner = tokens.next(open).ok_or(FoldError::InvalidExpression)?;
        let close = tokens.next(inner).ok_or(FoldError::InvalidExpression)?;
        if tokens.get(close).op() != Some(')') {
            return Err(FoldError::InvalidExpression);
        }
        tokens.remove(open);
        tokens.remove(close);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ctrlcpp_lex::scanner::scan;
    use ctrlcpp_util::diagnostics::Diagnostics;
    use ctrlcpp_util::location::FileId;

    fn fold_expr(src: &str) -> Result<String, FoldError> {
        let mut tokens = TokenStream::new();
        let mut diags = Diagnostics::new();
        scan(FileId::new(0), src, &mut tokens, &mut diags);
        ctrlcpp_lex::combine_operators(&mut tokens);
        fold(&mut tokens)?;
        Ok(tokens.iter().map(|id| tokens.get(id).text.clone()).collect::<Vec<_>>().join(" "))
    }

    #[test]
    fn folds_simple_arithmetic_by_precedence() {
        assert_eq!(fold_expr("1 + 2 * 3").unwrap(), "7");
        assert_eq!(fold_expr("(1 + 2) * 3").unwrap(), "9");
    }

    #[test]
    fn folds_comparisons_to_zero_or_one() {
        assert_eq!(fold_expr("3 > 2").unwrap(), "1");
        assert_eq!(fold_expr("3 < 2").unwrap(), "0");
    }

    #[test]
    fn folds_ternary() {
        assert_eq!(fold_expr("1 ? 10 : 20").unwrap(), "10");
        assert_eq!(fold_expr("0 ? 10 : 20").unwrap(), "20");
    }

    #[test]
    fn folds_alternative_keyword_operators() {
        assert_eq!(fold_expr("1 and 0").unwrap(), "0");
        assert_eq!(fold_expr("1 or 0").unwrap(), "1");
        assert_eq!(fold_expr("not 0").unwrap(), "1");
        assert_eq!(fold_expr("5 bitand 3").unwrap(), "1");
        assert_eq!(fold_expr("5 xor 3").unwrap(), "6");
        assert_eq!(fold_expr("1 not_eq 2").unwrap(), "1");
    }

    #[test]
    fn division_by_zero_is_an_error() {
        assert_eq!(fold_expr("1 / 0").unwrap_err(), FoldError::DivisionByZero);
    }

    #[test]
    fn modulo_by_zero_is_an_error() {
        assert_eq!(fold_expr("1 % 0").unwrap_err(), FoldError::DivisionByZero);
    }

    #[test]
    fn min_i64_divided_by_negative_one_overflows() {
        let src = format!("{} / -1", i64::MIN);
        assert_eq!(fold_expr(&src).unwrap_err(), FoldError::DivisionOverflow);
    }

    #[test]
    fn unary_minus_applies_to_a_lone_number() {
        assert_eq!(fold_expr("-5 + 10").unwrap(), "5");
    }

    #[test]
    fn bitwise_not_complements_in_two_s_complement() {
        assert_eq!(fold_expr("~0").unwrap(), "-1");
    }

    #[test]
    fn shift_operators_fold() {
        assert_eq!(fold_expr("1 << 4").unwrap(), "16");
        assert_eq!(fold_expr("256 >> 4").unwrap(), "16");
    }

    fn simplified_expr(src: &str) -> String {
        let mut tokens = TokenStream::new();
        let mut diags = Diagnostics::new();
        scan(FileId::new(0), src, &mut tokens, &mut diags);
        ctrlcpp_lex::combine_operators(&mut tokens);
        simplify_names(&mut tokens);
        simplify_numbers(&mut tokens);
        fold(&mut tokens).unwrap();
        tokens.iter().map(|id| tokens.get(id).text.clone()).collect::<Vec<_>>().join(" ")
    }

    #[test]
    fn plain_name_collapses_to_zero() {
        assert_eq!(simplified_expr("UNDEF"), "0");
        assert_eq!(simplified_expr("UNDEF + 1"), "1");
    }

    #[test]
    fn alt_op_keyword_in_operator_position_is_left_alone() {
        assert_eq!(simplified_expr("not 0 and 1"), "1");
    }

    #[test]
    fn hex_literal_simplifies_to_decimal() {
        assert_eq!(simplified_expr("0x10"), "16");
    }

    #[test]
    fn char_literal_simplifies_to_its_byte_value() {
        assert_eq!(simplified_expr("'A'"), "65");
    }
}
