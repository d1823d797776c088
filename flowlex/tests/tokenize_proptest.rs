//! Property-based tests: tokenization must account for every byte of its input.

use flowgrammar::{forest_text, Token};
use flowlex::{LexerDef, Nested, TokenRule};
use proptest::prelude::*;

fn lexer() -> LexerDef {
    let mut def = LexerDef::new();
    def.add_token("op", &["+", "=", "==", "/"]).unwrap();
    def.add_token("nl", &["\n"]).unwrap();
    def.add_rule(TokenRule::delimited("string", "\"", "\""))
        .unwrap();
    def.add_rule(TokenRule::delimited("comment", "/*", "*/"))
        .unwrap();
    def.add_rule(
        TokenRule::delimited("paren", "(", ")")
            .pair("(", ")")
            .nested(Nested::same().wrap_kind("group")),
    )
    .unwrap();
    def
}

fn shape(toks: &[Token]) -> Vec<(String, String, usize, (usize, usize))> {
    toks.iter()
        .map(|t| (t.kind.to_string(), t.text(), t.end_index(), t.lines()))
        .collect()
}

fn source_strategy() -> impl Strategy<Value = String> {
    prop::collection::vec(
        prop::sample::select(vec![
            "a", "bc", " ", "\n", "+", "=", "/", "*", "\"", "(", ")", "é",
        ]),
        0..40,
    )
    .prop_map(|parts| parts.concat())
}

proptest! {
    #[test]
    fn round_trip(src in source_strategy()) {
        let def = lexer();
        let toks = def.tokenizer().tokenize(&src).unwrap();
        prop_assert_eq!(forest_text(&toks), src.clone());
        let mut prev = 0;
        for t in &toks {
            prop_assert!(t.end_index() > prev);
            prop_assert!(t.line_start() <= t.line_end());
            prev = t.end_index();
        }
        prop_assert_eq!(prev, src.len());
    }

    #[test]
    fn retokenization_is_stable(src in source_strategy()) {
        let def = lexer();
        let toks = def.tokenizer().tokenize(&src).unwrap();
        let again = def.tokenizer().tokenize(&forest_text(&toks)).unwrap();
        prop_assert_eq!(shape(&toks), shape(&again));
    }

    #[test]
    fn last_line_matches_newline_count(src in source_strategy()) {
        let def = lexer();
        let toks = def.tokenizer().line_offset(3).tokenize(&src).unwrap();
        if let Some(last) = toks.last() {
            let newlines = src.matches('\n').count();
            prop_assert_eq!(last.line_end(), 3 + newlines);
        }
    }
}
