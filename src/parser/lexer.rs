//! Lexer for gesture scripts using logos

use logos::Logos;

/// Byte range in source text
pub type Span = std::ops::Range<usize>;

#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\n\r]+")]
pub enum Token {
    // View keywords
    #[token("view")]
    View,
    #[token("dashboard")]
    Dashboard,
    #[token("group")]
    Group,
    #[token("resize")]
    Resize,
    #[token("scroll")]
    Scroll,

    // Pointer keywords
    #[token("press")]
    Press,
    #[token("button")]
    Button,
    #[token("on")]
    On,
    #[token("move")]
    Move,
    #[token("frame")]
    Frame,
    #[token("release")]
    Release,
    #[token("wheel")]
    Wheel,

    // Press targets
    #[token("item")]
    Item,
    #[token("node")]
    Node,
    #[token("template")]
    Template,
    #[token("control")]
    Control,
    #[token("background")]
    Background,

    // View transform keywords
    #[token("zoom")]
    Zoom,
    #[token("in")]
    In,
    #[token("out")]
    Out,
    #[token("at")]
    At,
    #[token("pan")]
    Pan,
    #[token("fit")]
    Fit,
    #[token("padding")]
    Padding,
    #[token("reset")]
    Reset,
    #[token("tick")]
    Tick,

    // Editing and server keywords
    #[token("add")]
    Add,
    #[token("event")]
    Event,
    #[token("remove")]
    Remove,
    #[token("fail")]
    Fail,
    #[token("next")]
    Next,
    #[token("sync")]
    Sync,

    // Literals - identifiers must come after keywords
    #[regex(r"[a-zA-Z_][a-zA-Z0-9_-]*", |lex| lex.slice().to_string(), priority = 1)]
    Ident(String),

    #[regex(r#""([^"\\]|\\.)*""#, |lex| {
        let s = lex.slice();
        s[1..s.len()-1].to_string()
    })]
    String(String),

    #[regex(r"-?[0-9]+(\.[0-9]+)?", |lex| lex.slice().parse::<f64>().ok())]
    Number(f64),

    // Comments (skip)
    #[regex(r"//[^\n]*", logos::skip)]
    LineComment,
}

/// Lex input string into tokens with spans
pub fn lex(input: &str) -> impl Iterator<Item = (Token, Span)> + '_ {
    Token::lexer(input)
        .spanned()
        .filter_map(|(tok, span)| tok.ok().map(|t| (t, span)))
}
