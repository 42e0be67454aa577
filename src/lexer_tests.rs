use super::*;

fn tokens(src: &str) -> Vec<Token<'_>> {
    Lexer::new(src).map(|(token, _)| token).collect()
}

#[test]
fn flat_assignments() {
    assert_eq!(
        tokens("a = 1\nb=\"two\"\n"),
        [
            Token::Key("a"),
            Token::Assign,
            Token::Value("1"),
            Token::Key("b"),
            Token::Assign,
            Token::Value("\"two\""),
        ]
    );
}

#[test]
fn blocks_and_closes() {
    assert_eq!(
        tokens("server {\n  port = 80\n}\n"),
        [
            Token::Key("server"),
            Token::Open,
            Token::Key("port"),
            Token::Assign,
            Token::Value("80"),
            Token::Close,
        ]
    );
    assert_eq!(
        tokens("a{b{}}"),
        [
            Token::Key("a"),
            Token::Open,
            Token::Key("b"),
            Token::Open,
            Token::Close,
            Token::Close,
        ]
    );
}

#[test]
fn value_ends_at_its_literal() {
    assert_eq!(
        tokens("b { c = 1 } d = 2"),
        [
            Token::Key("b"),
            Token::Open,
            Token::Key("c"),
            Token::Assign,
            Token::Value("1"),
            Token::Close,
            Token::Key("d"),
            Token::Assign,
            Token::Value("2"),
        ]
    );
    assert_eq!(
        tokens("list = [1, 2] // two\n"),
        [Token::Key("list"), Token::Assign, Token::Value("[1, 2]")]
    );
}

#[test]
fn comments_are_skipped() {
    assert_eq!(
        tokens("// header\n  // indented\na = 1 // trailing\n// footer"),
        [Token::Key("a"), Token::Assign, Token::Value("1")]
    );
    assert_eq!(tokens("key// comment\n"), [Token::Key("key")]);
}

#[test]
fn single_slash_is_significant() {
    assert_eq!(
        tokens("a/b = 1"),
        [Token::Key("a/b"), Token::Assign, Token::Value("1")]
    );
}

#[test]
fn empty_values() {
    assert_eq!(
        tokens("a =\nb = // nothing\nc = 3"),
        [
            Token::Key("a"),
            Token::Assign,
            Token::Value(""),
            Token::Key("b"),
            Token::Assign,
            Token::Value(""),
            Token::Key("c"),
            Token::Assign,
            Token::Value("3"),
        ]
    );
    assert_eq!(tokens("a = "), [Token::Key("a"), Token::Assign, Token::Value("")]);
}

#[test]
fn whitespace_set() {
    assert_eq!(
        tokens("\t\r\n\x08 a\x08=\t1\r\n"),
        [Token::Key("a"), Token::Assign, Token::Value("1")]
    );
    assert!(tokens(" \t\r\n\x08").is_empty());
    assert!(tokens("").is_empty());
}

#[test]
fn spans_cover_tokens() {
    let spans: Vec<Span> = Lexer::new("ab = [1]").map(|(_, span)| span).collect();
    assert_eq!(
        spans,
        [Span::new(0, 2), Span::new(3, 4), Span::new(5, 8)]
    );
}

#[test]
fn line_counter_tracks_newlines() {
    let mut lexer = Lexer::new("// one\n\n  a\n\n= 1");
    assert_eq!(lexer.next().map(|(t, _)| t), Some(Token::Key("a")));
    assert_eq!(lexer.line(), 2);
    let (_, span) = lexer.next().unwrap();
    assert_eq!(lexer.line(), 4);
    let err = lexer.error(ErrorKind::UnexpectedEof, span);
    assert_eq!(err.line_info, Some((4, 0)));
}

#[test]
fn fused_after_end() {
    let mut lexer = Lexer::new("a");
    assert!(lexer.next().is_some());
    assert!(lexer.next().is_none());
    assert!(lexer.next().is_none());
}

#[test]
fn non_ascii_keys() {
    assert_eq!(
        tokens("héllo.wörld = \"ü\""),
        [
            Token::Key("héllo.wörld"),
            Token::Assign,
            Token::Value("\"ü\""),
        ]
    );
}
