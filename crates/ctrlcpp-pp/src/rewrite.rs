//! The domain rewriter (`preprocessToken` and friends in the reference):
//! CTRL-specific source-to-source rewrites applied to each raw token during
//! emission, tried in a fixed order, first match wins.

use ctrlcpp_lex::token::{TokenId, TokenKind, TokenStream};
use ctrlcpp_util::location::FileRegistry;
use rustc_hash::FxHashMap;

use crate::dui::UserDefine;

/// One rewritten token: its kind and literal text, in emission order.
pub struct Rewritten {
    pub kind: TokenKind,
    pub text: String,
}

/// `INT_VAR` -> `int`, `DYN_STRING_VAR` -> `dyn_string`: strip the segment
/// after the last `_` and lowercase what remains.
fn var_type(text: &str) -> String {
    let base = text.rfind('_').map_or(text, |pos| &text[..pos]);
    base.to_ascii_lowercase()
}

/// `"NAME"` -> `NAME`; anything not a quoted non-empty string yields `None`,
/// which aborts the enclosing rewrite and falls through to plain emission.
fn var_name(text: &str) -> Option<&str> {
    let inner = text.strip_prefix('"')?.strip_suffix('"')?;
    if inner.is_empty() {
        None
    } else {
        Some(inner)
    }
}

/// The result of attempting one rewrite starting at `cur`: the tokens to
/// emit, and the id of the first not-yet-consumed token (`None` at end of
/// stream).
struct Rewrite {
    emitted: Vec<Rewritten>,
    next: Option<TokenId>,
}

fn rewrite_builtin(tokens: &TokenStream, registry: &FileRegistry, cur: TokenId) -> Option<Rewrite> {
    let tok = tokens.get(cur);
    match tok.text.as_str() {
        "__FILE__" => Some(Rewrite {
            emitted: vec![Rewritten {
                kind: TokenKind::Str,
                text: format!("\"{}\"", registry.name(tok.location.file)),
            }],
            next: tokens.next(cur),
        }),
        "__LINE__" => Some(Rewrite {
            emitted: vec![Rewritten {
                kind: TokenKind::Number,
                text: tok.location.line.to_string(),
            }],
            next: tokens.next(cur),
        }),
        _ => None,
    }
}

fn rewrite_user_define(tokens: &TokenStream, cur: TokenId, defines: &FxHashMap<String, UserDefine>) -> Option<Rewrite> {
    let tok = tokens.get(cur);
    let define = defines.get(&tok.text)?;
    Some(Rewrite {
        emitted: vec![Rewritten {
            kind: TokenKind::Name,
            text: define.value.clone(),
        }],
        next: tokens.next(cur),
    })
}

/// `addGlobal ( "NAME" , TYPE_VAR )` -> `global type NAME`.
fn rewrite_add_global(tokens: &TokenStream, cur: TokenId) -> Option<Rewrite> {
    if tokens.get(cur).text != "addGlobal" {
        return None;
    }
    let open = tokens.next(cur)?;
    if tokens.get(open).op() != Some('(') {
        return None;
    }
    let name_tok = tokens.next(open)?;
    let comma = tokens.next(name_tok)?;
    if tokens.get(comma).op() != Some(',') {
        return None;
    }
    let type_tok = tokens.next(comma)?;
    let close = tokens.next(type_tok)?;
    if tokens.get(close).op() != Some(')') {
        return None;
    }
    let name = var_name(&tokens.get(name_tok).text)?;

    Some(Rewrite {
        emitted: vec![
            Rewritten { kind: TokenKind::Name, text: "global".to_string() },
            Rewritten { kind: TokenKind::Name, text: var_type(&tokens.get(type_tok).text) },
            Rewritten { kind: TokenKind::Name, text: name.to_string() },
        ],
        next: tokens.next(close),
    })
}

/// `shared_ptr < TYPE_VAR >` -> `type` (flat match only: exactly one token
/// between `<` and `>`, so `shared_ptr<map<a,b>>` falls through unmatched).
fn rewrite_shared_ptr(tokens: &TokenStream, cur: TokenId) -> Option<Rewrite> {
    if tokens.get(cur).text != "shared_ptr" {
        return None;
    }
    let lt = tokens.next(cur)?;
    if tokens.get(lt).op() != Some('<') {
        return None;
    }
    let type_tok = tokens.next(lt)?;
    let gt = tokens.next(type_tok)?;
    if tokens.get(gt).op() != Some('>') {
        return None;
    }

    Some(Rewrite {
        emitted: vec![Rewritten { kind: TokenKind::Name, text: var_type(&tokens.get(type_tok).text) }],
        next: tokens.next(gt),
    })
}

/// Apply the rewriter at `cur`, falling through to a verbatim copy of the
/// token if nothing recognises it. Returns the emitted tokens and the id of
/// the next token to process.
pub fn rewrite(
    tokens: &TokenStream,
    registry: &FileRegistry,
    cur: TokenId,
    defines: &FxHashMap<String, UserDefine>,
) -> (Vec<Rewritten>, Option<TokenId>) {
    for attempt in [
        rewrite_builtin(tokens, registry, cur),
        rewrite_user_define(tokens, cur, defines),
        rewrite_add_global(tokens, cur),
        rewrite_shared_ptr(tokens, cur),
    ] {
        if let Some(Rewrite { emitted, next }) = attempt {
            return (emitted, next);
        }
    }

    let tok = tokens.get(cur);
    (
        vec![Rewritten { kind: tok.kind, text: tok.text.clone() }],
        tokens.next(cur),
    )
}
