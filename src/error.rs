//! Script parse errors and their rendering

use ariadne::{Color, Label, Report, ReportKind, Source};
use chumsky::error::{Rich, RichPattern, RichReason};
use thiserror::Error;

use crate::parser::ast::Span;
use crate::parser::lexer::Token;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseErrorKind {
    #[error("unexpected {found}{}", expecting(.expected))]
    Unexpected { found: String, expected: Vec<String> },

    /// A well-formed token with an unusable value, e.g. `button 300`
    #[error("{0}")]
    Invalid(String),
}

fn expecting(expected: &[String]) -> String {
    match expected {
        [] => String::new(),
        [only] => format!(", expected {only}"),
        many => format!(", expected one of {}", many.join(", ")),
    }
}

/// One syntax error in a gesture script
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{kind} (bytes {}..{})", span.start, span.end)]
pub struct ParseError {
    pub kind: ParseErrorKind,
    span: Span,
}

impl ParseError {
    pub fn span(&self) -> &Span {
        &self.span
    }

    /// Render with the offending source line underlined
    pub fn format(&self, source: &str, filename: &str) -> String {
        let headline = match &self.kind {
            ParseErrorKind::Unexpected { found, .. } => format!("unexpected {found}"),
            ParseErrorKind::Invalid(message) => message.clone(),
        };

        let mut out = Vec::new();
        let report = Report::build(ReportKind::Error, filename, self.span.start)
            .with_message(headline)
            .with_label(
                Label::new((filename, self.span.clone()))
                    .with_message(self.kind.to_string())
                    .with_color(Color::Red),
            )
            .finish();

        if report
            .write((filename, Source::from(source)), &mut out)
            .is_err()
        {
            return self.to_string();
        }
        String::from_utf8_lossy(&out).into_owned()
    }
}

impl<'a> From<Rich<'a, Token>> for ParseError {
    fn from(err: Rich<'a, Token>) -> Self {
        let kind = match err.reason() {
            RichReason::Custom(message) => ParseErrorKind::Invalid(message.to_string()),
            RichReason::ExpectedFound { found, .. } => ParseErrorKind::Unexpected {
                found: found
                    .as_deref()
                    .map_or_else(|| "end of script".to_string(), describe),
                expected: err.expected().filter_map(pattern).collect(),
            },
        };

        ParseError {
            kind,
            span: err.span().into_range(),
        }
    }
}

fn pattern(p: &RichPattern<'_, Token>) -> Option<String> {
    Some(match p {
        RichPattern::Token(tok) => describe(tok),
        RichPattern::Label(label) => label.to_string(),
        RichPattern::EndOfInput => "end of script".into(),
        RichPattern::Identifier(word) => format!("'{word}'"),
        RichPattern::Any => "anything".into(),
        RichPattern::SomethingElse => return None,
    })
}

fn describe(tok: &Token) -> String {
    match tok {
        Token::Ident(word) => format!("word '{word}'"),
        Token::String(text) => format!("text \"{text}\""),
        Token::Number(n) => format!("number {n}"),
        Token::LineComment => "comment".into(),
        keyword => format!("'{}'", format!("{keyword:?}").to_lowercase()),
    }
}
