use proptest::prelude::*;
use ql_core::FileId;
use ql_core::lexer::{TokenKind, lex};

fn fragment() -> impl Strategy<Value = String> {
    prop_oneof![
        "[a-z_][a-z0-9_]{0,6}",
        "[0-9]{1,4}",
        "[0-9]{1,3}\\.[0-9]{1,3}",
        Just(" ".to_string()),
        Just("\n".to_string()),
        Just("\t".to_string()),
        Just("// note\n".to_string()),
        Just("/* a /* b */ c */".to_string()),
        Just("\"text\"".to_string()),
        Just("'c'".to_string()),
        prop::sample::select(vec!["(", ")", "{", "}", ";", ",", "::", "->", "..=", "<", ">", "+=", "&&", "@unused"])
            .prop_map(str::to_string),
    ]
}

fn program() -> impl Strategy<Value = String> {
    prop::collection::vec(fragment(), 0..40).prop_map(|parts| parts.join(" "))
}

proptest! {
    #[test]
    fn lines_never_decrease_and_tokens_never_overlap(source in program()) {
        let lexed = lex(FileId(0), &source);
        prop_assert_eq!(lexed.tokens.last().map(|t| t.kind), Some(TokenKind::Eof));
        for pair in lexed.tokens.windows(2) {
            prop_assert!(pair[0].line() <= pair[1].line(), "{:?}", pair);
            prop_assert!(pair[0].span.end <= pair[1].span.start, "{:?}", pair);
        }
    }

    #[test]
    fn token_text_is_a_slice_of_the_source(source in program()) {
        let lexed = lex(FileId(0), &source);
        for token in &lexed.tokens {
            prop_assert!(token.span.end as usize <= source.len());
            prop_assert!(source.contains(token.text(&source)));
        }
    }
}

#[test]
fn empty_main_lexes_to_six_tokens() {
    let source = "void main() {\n\t// no-op\n}";
    let lexed = lex(FileId(0), source);
    assert!(lexed.diagnostics.is_empty());
    let tokens: Vec<_> = lexed
        .tokens
        .iter()
        .filter(|t| !t.is_eof())
        .map(|t| (t.kind, t.line(), t.text(source)))
        .collect();
    assert_eq!(
        tokens,
        vec![
            (TokenKind::Void, 1, "void"),
            (TokenKind::Identifier, 1, "main"),
            (TokenKind::LeftParen, 1, "("),
            (TokenKind::RightParen, 1, ")"),
            (TokenKind::LeftBrace, 1, "{"),
            (TokenKind::RightBrace, 3, "}"),
        ]
    );
}

#[test]
fn nested_block_comments_close_together() {
    let source = "/* a /* b */ c */ x";
    let lexed = lex(FileId(0), source);
    let kinds: Vec<_> = lexed.tokens.iter().map(|t| t.kind).collect();
    assert_eq!(kinds, vec![TokenKind::Identifier, TokenKind::Eof]);
}
