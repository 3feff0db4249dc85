//! The token arena: `TokenId`-addressed tokens forming a doubly linked list.
//!
//! The reference implementation represents a translation unit as a
//! hand-rolled doubly linked list of heap-allocated `Token` nodes connected
//! by raw `previous`/`next` pointers, with deletion and splicing done by
//! pointer surgery. Rust has no safe equivalent of that pointer dance, so
//! this arena represents the same list as an [`IndexVec`] of `Token`s
//! addressed by [`TokenId`], with `prev`/`next` fields of type
//! `Option<TokenId>`. Deleting a token marks its slot tombstoned and splices
//! its neighbours together; the slot itself is never reused, so a `TokenId`
//! captured before a deletion is safe to compare against (it will simply no
//! longer resolve to a live token).

use ctrlcpp_util::location::Location;
use ctrlcpp_util::{define_idx, IndexVec};

define_idx!(TokenId);

/// What kind of lexeme a token is. Mirrors the boolean classification flags
/// (`name`, `number`, `op`, `comment`, `str`) on `simplecpp::Token`, folded
/// into one enum since in this port they are mutually exclusive.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TokenKind {
    /// An identifier, keyword, or alternative-operator keyword (`and`, `not`, ...).
    Name,
    /// An integer or floating-point numeric literal.
    Number,
    /// A string literal, including its surrounding quotes.
    Str,
    /// A character literal, including its surrounding quotes.
    Char,
    /// A single-character or (after combining) multi-character operator/punctuator.
    Op,
    /// `# <number> "<file>"` / `# file` / `# endfile` bookkeeping tokens
    /// synthesised by the include expander, never present in raw source.
    LineMarker,
}

/// One lexeme plus its position and link-list neighbours.
#[derive(Clone, Debug)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub location: Location,
    /// Set by the scanner when a macro-like token was produced, preserved
    /// here only for the domain rewriter's `__FILE__`/`__LINE__` substitution
    /// pass; no general macro system is implemented.
    pub previous_white: bool,
    /// The matching bracket for a `(`/`)`, `[`/`]`, `{`/`}`, or template
    /// `<`/`>` pair, set mutually by [`crate::operator::link_brackets`]
    /// (`Token::createMutualLinks` in the reference). `None` until that pass
    /// runs, and for any token that is not a bracket.
    pub link: Option<TokenId>,
    prev: Option<TokenId>,
    next: Option<TokenId>,
    live: bool,
}

impl Token {
    fn new(kind: TokenKind, text: String, location: Location) -> Self {
        Self {
            kind,
            text,
            location,
            previous_white: false,
            link: None,
            prev: None,
            next: None,
            live: true,
        }
    }

    pub fn op(&self) -> Option<char> {
        if self.kind == TokenKind::Op && self.text.chars().count() == 1 {
            self.text.chars().next()
        } else {
            None
        }
    }

    pub fn is_name(&self) -> bool {
        self.kind == TokenKind::Name
    }

    pub fn is_number(&self) -> bool {
        self.kind == TokenKind::Number
    }
}

/// The arena owning every token of one translation unit, plus a stable
/// doubly linked traversal order over the live ones.
#[derive(Default)]
pub struct TokenStream {
    tokens: IndexVec<TokenId, Token>,
    front: Option<TokenId>,
    back: Option<TokenId>,
}

impl TokenStream {
    pub fn new() -> Self {
        Self {
            tokens: IndexVec::new(),
            front: None,
            back: None,
        }
    }

    pub fn front(&self) -> Option<TokenId> {
        self.front
    }

    pub fn back(&self) -> Option<TokenId> {
        self.back
    }

    pub fn get(&self, id: TokenId) -> &Token {
        &self.tokens[id]
    }

    pub fn get_mut(&mut self, id: TokenId) -> &mut Token {
        &mut self.tokens[id]
    }

    pub fn next(&self, id: TokenId) -> Option<TokenId> {
        self.tokens[id].next
    }

    pub fn prev(&self, id: TokenId) -> Option<TokenId> {
        self.tokens[id].prev
    }

    /// Append a new token at the back of the list, returning its id.
    pub fn push_back(&mut self, kind: TokenKind, text: impl Into<String>, location: Location) -> TokenId {
        let tok = Token::new(kind, text.into(), location);
        let id = self.tokens.push(tok);
        self.tokens[id].prev = self.back;
        match self.back {
            Some(back) => self.tokens[back].next = Some(id),
            None => self.front = Some(id),
        }
        self.back = Some(id);
        id
    }

    /// Insert `kind`/`text` immediately before `at`, the way the reference
    /// splices a combined-operator token in place of two raw ones.
    pub fn insert_before(&mut self, at: TokenId, kind: TokenKind, text: impl Into<String>, location: Location) -> TokenId {
        let tok = Token::new(kind, text.into(), location);
        let id = self.tokens.push(tok);
        let before = self.tokens[at].prev;
        self.tokens[id].prev = before;
        self.tokens[id].next = Some(at);
        self.tokens[at].prev = Some(id);
        match before {
            Some(b) => self.tokens[b].next = Some(id),
            None => self.front = Some(id),
        }
        id
    }

    /// Remove `id` from the live list and tombstone its slot. Safe to call
    /// even if `id` has neighbours on both sides; the list is re-linked
    /// around the gap exactly the way `Token::deleteThis`/`deleteToken` does.
    pub fn remove(&mut self, id: TokenId) {
        let (prev, next) = {
            let tok = &mut self.tokens[id];
            tok.live = false;
            (tok.prev, tok.next)
        };
        match prev {
            Some(p) => self.tokens[p].next = next,
            None => self.front = next,
        }
        match next {
            Some(n) => self.tokens[n].prev = prev,
            None => self.back = prev,
        }
    }

    pub fn is_live(&self, id: TokenId) -> bool {
        self.tokens[id].live
    }

    /// Discard every token scanned so far, the way the reference's
    /// `TokenList::clear()` empties the list when a fatal condition (an
    /// unhandled byte, a rejected encoding) aborts the rest of the file.
    pub fn clear(&mut self) {
        self.tokens = IndexVec::new();
        self.front = None;
        self.back = None;
    }

    /// Set `a.link = Some(b)` and `b.link = Some(a)`, the way
    /// `Token::createMutualLinks` wires up a matched bracket pair.
    pub fn create_mutual_links(&mut self, a: TokenId, b: TokenId) {
        self.tokens[a].link = Some(b);
        self.tokens[b].link = Some(a);
    }

    /// Iterate the live tokens front to back.
    pub fn iter(&self) -> impl Iterator<Item = TokenId> + '_ {
        std::iter::successors(self.front, move |&id| self.next(id))
    }

    pub fn len(&self) -> usize {
        self.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.front.is_none()
    }
}
