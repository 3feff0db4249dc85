//! Reconstructing preprocessed source text from a token stream
//! (`TokenList::stringify` in the reference).
//!
//! A `#line N "file"` marker is emitted whenever the file changes or the
//! line number goes backward (an include boundary, in practice); forward
//! gaps are instead caught up with blank lines so plain line counting still
//! lines up for a reader without `#line` support. A single space separates
//! two tokens that share a source line; tokens reported on different lines
//! get their separation from the newlines/markers above instead.

use ctrlcpp_lex::token::TokenStream;
use ctrlcpp_util::location::{FileId, FileRegistry, Location};
use std::fmt::Write as _;

pub fn stringify(tokens: &TokenStream, registry: &FileRegistry) -> String {
    let mut out = String::new();
    let mut loc_file: Option<FileId> = None;
    let mut loc_line: u32 = 0;
    let mut prev_loc: Option<Location> = None;

    for id in tokens.iter() {
        let tok = tokens.get(id);
        let at = tok.location;

        if loc_file != Some(at.file) || at.line < loc_line {
            let _ = write!(out, "\n#line {} \"{}\"\n", at.line, registry.name(at.file));
            loc_file = Some(at.file);
            loc_line = at.line;
        }

        while at.line > loc_line {
            out.push('\n');
            loc_line += 1;
        }

        if let Some(prev) = prev_loc {
            if prev.file == at.file && prev.line == at.line {
                out.push(' ');
            }
        }

        out.push_str(&tok.text);

        let mut adjusted = at;
        adjusted.adjust(&tok.text);
        loc_line = adjusted.line;
        prev_loc = Some(at);
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use ctrlcpp_lex::scanner::scan;
    use ctrlcpp_util::diagnostics::Diagnostics;

    fn render(src: &str) -> String {
        let mut tokens = TokenStream::new();
        let mut diags = Diagnostics::new();
        let mut registry = FileRegistry::new();
        let file = registry.register("main.ctl");
        scan(file, src, &mut tokens, &mut diags);
        ctrlcpp_lex::combine_operators(&mut tokens);
        stringify(&tokens, &registry)
    }

    #[test]
    fn tokens_on_one_line_are_space_separated() {
        let out = render("x = 1;");
        assert!(out.contains("x = 1 ;"));
    }

    #[test]
    fn emits_a_line_marker_for_the_first_line() {
        let out = render("x");
        assert!(out.starts_with("\n#line 1 \"main.ctl\"\n"));
    }

    #[test]
    fn blank_lines_pad_forward_gaps() {
        let out = render("x\n\n\ny");
        let body = out.trim_start_matches("\n#line 1 \"main.ctl\"\n");
        assert_eq!(body, "x\n\n\ny");
    }
}
