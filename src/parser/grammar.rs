//! Chumsky grammar over the logos token stream

use chumsky::input::{Stream, ValueInput};
use chumsky::prelude::*;

use crate::layout::ZoomDirection;
use crate::parser::ast::*;
use crate::parser::lexer::{lex, Token};
use crate::ParseError;

/// Parse a whole gesture script, collecting every syntax error
pub fn parse(input: &str) -> Result<Script, Vec<ParseError>> {
    let eoi: SimpleSpan = (input.len()..input.len()).into();
    let tokens = Stream::from_iter(lex(input).map(|(tok, span)| (tok, SimpleSpan::from(span))))
        .map(eoi, |(tok, span): (_, _)| (tok, span));

    script_parser()
        .parse(tokens)
        .into_result()
        .map_err(|errs| errs.into_iter().map(ParseError::from).collect())
}

fn whole(n: f64) -> Option<u64> {
    (n >= 0.0 && n.fract() == 0.0 && n <= u64::MAX as f64).then_some(n as u64)
}

fn script_parser<'a, I>() -> impl Parser<'a, I, Script, extra::Err<Rich<'a, Token>>> + Clone
where
    I: ValueInput<'a, Token = Token, Span = SimpleSpan>,
{
    let number = select! {
        Token::Number(n) => n,
    }
    .labelled("number");

    let id = number
        .clone()
        .try_map(|n, span| {
            whole(n).ok_or_else(|| Rich::custom(span, format!("expected an id, found {n}")))
        })
        .labelled("id");

    let string = select! {
        Token::String(s) => s,
    }
    .labelled("string");

    let point = number.clone().then(number.clone());

    let view = just(Token::View)
        .ignore_then(choice((
            just(Token::Dashboard).to(ViewTarget::Dashboard),
            just(Token::Group).ignore_then(id.clone()).map(ViewTarget::Group),
        )))
        .map(Statement::View);

    let resize = just(Token::Resize)
        .ignore_then(point.clone())
        .map(|(width, height)| Statement::Resize { width, height });

    let target = choice((
        just(Token::Item).ignore_then(id.clone()).map(Target::Item),
        just(Token::Node).ignore_then(id.clone()).map(Target::Node),
        just(Token::Template).ignore_then(string.clone()).map(Target::Template),
        just(Token::Control).to(Target::Control),
        just(Token::Background).to(Target::Background),
    ))
    .labelled("press target");

    let button = just(Token::Button).ignore_then(id.clone().try_map(|n, span| {
        u8::try_from(n).map_err(|_| Rich::custom(span, format!("no such button {n}")))
    }));

    let press = just(Token::Press)
        .ignore_then(point.clone())
        .then(button.or_not())
        .then_ignore(just(Token::On))
        .then(target)
        .map(|(((x, y), button), target)| Statement::Press {
            x,
            y,
            button: button.unwrap_or(0),
            target,
        });

    let pointer_move = just(Token::Move)
        .ignore_then(point.clone())
        .map(|(x, y)| Statement::Move { x, y });

    let frame = just(Token::Frame)
        .ignore_then(id.clone().or_not())
        .map(|count| Statement::Frame {
            count: count.unwrap_or(1),
        });

    let release = just(Token::Release).to(Statement::Release);

    let wheel = just(Token::Wheel)
        .ignore_then(point.clone())
        .then(number.clone())
        .map(|((x, y), delta)| Statement::Wheel { x, y, delta });

    let zoom = just(Token::Zoom)
        .ignore_then(choice((
            just(Token::In).to(ZoomDirection::In),
            just(Token::Out).to(ZoomDirection::Out),
        )))
        .then_ignore(just(Token::At))
        .then(point.clone())
        .map(|(direction, (x, y))| Statement::Zoom { direction, x, y });

    let pan = just(Token::Pan)
        .ignore_then(point.clone())
        .map(|(dx, dy)| Statement::Pan { dx, dy });

    let fit = just(Token::Fit)
        .ignore_then(just(Token::Node))
        .ignore_then(id.clone())
        .then(just(Token::Padding).ignore_then(number.clone()).or_not())
        .map(|(node, padding)| Statement::Fit { node, padding });

    let reset = just(Token::Reset)
        .ignore_then(just(Token::Zoom))
        .to(Statement::ResetZoom);

    let tick = just(Token::Tick)
        .ignore_then(number.clone())
        .map(|ms| Statement::Tick { ms });

    let remove = just(Token::Remove).ignore_then(choice((
        just(Token::Item)
            .ignore_then(id.clone())
            .map(|item| Statement::Remove { item }),
        just(Token::Node)
            .ignore_then(id.clone())
            .map(|node| Statement::RemoveNode { node }),
    )));

    let add = just(Token::Add).ignore_then(choice((
        just(Token::Event)
            .ignore_then(just(Token::On))
            .ignore_then(just(Token::Node))
            .ignore_then(id.clone())
            .then(string.clone().or_not())
            .map(|(node, title)| Statement::AddEvent { node, title }),
        just(Token::Node)
            .ignore_then(just(Token::At))
            .ignore_then(point)
            .then(string.or_not())
            .map(|((x, y), label)| Statement::AddNode { x, y, label }),
    )));

    let status = id.try_map(|n, span| {
        u16::try_from(n).map_err(|_| Rich::custom(span, format!("no such status {n}")))
    });
    let fail = just(Token::Fail)
        .ignore_then(just(Token::Next))
        .ignore_then(status.or_not())
        .map(|status| Statement::FailNext { status });

    let sync = just(Token::Sync).to(Statement::Sync);

    let scroll = just(Token::Scroll)
        .ignore_then(number)
        .map(|offset| Statement::Scroll { offset });

    let statement = choice((
        view,
        resize,
        press,
        pointer_move,
        frame,
        release,
        wheel,
        zoom,
        pan,
        fit,
        reset,
        tick,
        remove,
        add,
        fail,
        sync,
        scroll,
    ))
    .labelled("statement")
    .map_with(|s, e| {
        let span: SimpleSpan = e.span();
        Spanned::new(s, span.into_range())
    });

    // Script is a list of statements
    statement
        .repeated()
        .collect()
        .then_ignore(end())
        .map(|statements| Script { statements })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn statements(input: &str) -> Vec<Statement> {
        parse(input)
            .expect("Should parse")
            .statements
            .into_iter()
            .map(|s| s.node)
            .collect()
    }

    #[test]
    fn test_parse_press_on_targets() {
        let parsed = statements(
            r#"press 10 20 on item 3
               press 0 0 button 1 on background
               press 5 5 on template "busy-periods""#,
        );
        assert_eq!(
            parsed,
            vec![
                Statement::Press {
                    x: 10.0,
                    y: 20.0,
                    button: 0,
                    target: Target::Item(3)
                },
                Statement::Press {
                    x: 0.0,
                    y: 0.0,
                    button: 1,
                    target: Target::Background
                },
                Statement::Press {
                    x: 5.0,
                    y: 5.0,
                    button: 0,
                    target: Target::Template("busy-periods".into())
                },
            ]
        );
    }

    #[test]
    fn test_parse_view_and_viewport() {
        let parsed = statements(
            "view group 2\nzoom in at 400 300\npan -10 5\nfit node 1 padding 40\nreset zoom",
        );
        assert_eq!(
            parsed,
            vec![
                Statement::View(ViewTarget::Group(2)),
                Statement::Zoom {
                    direction: ZoomDirection::In,
                    x: 400.0,
                    y: 300.0
                },
                Statement::Pan { dx: -10.0, dy: 5.0 },
                Statement::Fit {
                    node: 1,
                    padding: Some(40.0)
                },
                Statement::ResetZoom,
            ]
        );
    }

    #[test]
    fn test_optional_arguments() {
        let parsed = statements("frame\nframe 3\nfail next\nfail next 503");
        assert_eq!(
            parsed,
            vec![
                Statement::Frame { count: 1 },
                Statement::Frame { count: 3 },
                Statement::FailNext { status: None },
                Statement::FailNext { status: Some(503) },
            ]
        );
    }

    #[test]
    fn test_parse_editing_statements() {
        let parsed = statements(
            "add event on node 2\nadd event on node 2 \"Picnic\"\nadd node at 40 -5 \"Park\"\nremove node 2",
        );
        assert_eq!(
            parsed,
            vec![
                Statement::AddEvent {
                    node: 2,
                    title: None
                },
                Statement::AddEvent {
                    node: 2,
                    title: Some("Picnic".into())
                },
                Statement::AddNode {
                    x: 40.0,
                    y: -5.0,
                    label: Some("Park".into())
                },
                Statement::RemoveNode { node: 2 },
            ]
        );
    }

    #[test]
    fn test_spans_cover_statement() {
        let script = parse("sync\ntick 16").unwrap();
        assert_eq!(script.statements[1].span, 5..12);
    }

    #[test]
    fn test_empty_script() {
        assert!(parse("// nothing here\n").unwrap().statements.is_empty());
    }

    #[test]
    fn test_fractional_id_rejected() {
        assert!(parse("remove item 1.5").is_err());
    }

    #[test]
    fn test_unknown_statement_rejected() {
        assert!(parse("teleport 1 2").is_err());
    }
}
