//! A `nom`-based parser for the textual formula shorthand.
//!
//! Grammar:
//!
//! ```text
//! formula  := literal | call | path
//! literal  := 'null' | 'true' | 'false' | number | '\'' chars '\''
//! call     := ident '(' (formula (',' formula)*)? ')'
//! path     := ident ('.' ident | '[' digits ']')*
//! ```
//!
//! `and(..)` and `or(..)` become the short-circuiting AST nodes, `array(..)`
//! builds an array; any other call is a registry function.
use crate::error::FormulaParseError;
use crate::formula::Formula;
use nom::{
    IResult, Parser,
    branch::alt,
    bytes::complete::{tag, take_while},
    character::complete::{alpha1, char, digit1, multispace0, satisfy},
    combinator::{map, not, opt, peek, recognize},
    multi::{many0, separated_list0},
    sequence::{delimited, pair, preceded, terminated},
};
use serde_json::{Value, json};

pub fn parse_formula(input: &str) -> Result<Formula, FormulaParseError> {
    match formula(input.trim()) {
        Ok(("", parsed)) => Ok(parsed),
        Ok((rem, _)) => Err(FormulaParseError::Syntax {
            input: input.to_string(),
            message: format!("unexpected trailing input '{}'", rem),
        }),
        Err(e) => Err(FormulaParseError::Syntax {
            input: input.to_string(),
            message: e.to_string(),
        }),
    }
}

fn formula(input: &str) -> IResult<&str, Formula> {
    ws(alt((
        map(literal, Formula::Value),
        call, // before `path` so `f(x)` is not read as the path `f`
        path,
    )))
    .parse(input)
}

// --- Literals ---

fn keyword<'a>(word: &'static str) -> impl Parser<&'a str, Output = &'a str, Error = nom::error::Error<&'a str>> {
    terminated(tag(word), not(peek(satisfy(is_ident_char))))
}

fn literal(input: &str) -> IResult<&str, Value> {
    alt((
        map(keyword("null"), |_| Value::Null),
        map(keyword("true"), |_| json!(true)),
        map(keyword("false"), |_| json!(false)),
        number,
        string_literal,
    ))
    .parse(input)
}

fn number(input: &str) -> IResult<&str, Value> {
    let (rest, text) = recognize((
        opt(char('-')),
        digit1,
        opt(pair(char('.'), digit1)),
    ))
    .parse(input)?;
    let value = match text.parse::<i64>() {
        Ok(int) => json!(int),
        Err(_) => text.parse::<f64>().map(|f| json!(f)).unwrap_or(Value::Null),
    };
    Ok((rest, value))
}

fn string_literal(input: &str) -> IResult<&str, Value> {
    map(
        delimited(char('\''), take_while(|c| c != '\''), char('\'')),
        |s: &str| json!(s),
    )
    .parse(input)
}

// --- Paths ---

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '-'
}

fn identifier(input: &str) -> IResult<&str, &str> {
    recognize(pair(
        alt((alpha1, tag("_"))),
        take_while(|c: char| c.is_alphanumeric() || c == '_'),
    ))
    .parse(input)
}

fn segment(input: &str) -> IResult<&str, String> {
    alt((
        map(preceded(char('.'), identifier), str::to_string),
        map(delimited(char('['), digit1, char(']')), str::to_string),
    ))
    .parse(input)
}

fn path(input: &str) -> IResult<&str, Formula> {
    map(pair(identifier, many0(segment)), |(head, rest)| {
        let mut segments = Vec::with_capacity(rest.len() + 1);
        segments.push(head.to_string());
        segments.extend(rest);
        Formula::Path(segments)
    })
    .parse(input)
}

// --- Calls ---

fn call(input: &str) -> IResult<&str, Formula> {
    let (input, name) = identifier(input)?;
    let (input, _) = multispace0(input)?;
    let (input, arguments) = delimited(
        char('('),
        separated_list0(ws(char(',')), formula),
        ws(char(')')),
    )
    .parse(input)?;

    let parsed = match name {
        "and" => Formula::And(arguments),
        "or" => Formula::Or(arguments),
        "array" => Formula::Array(arguments),
        _ => Formula::Function {
            name: name.to_string(),
            arguments,
        },
    };
    Ok((input, parsed))
}

/// Wraps `inner` so that it also consumes surrounding whitespace.
fn ws<'a, F, O, E>(inner: F) -> impl Parser<&'a str, Output = O, Error = E>
where
    F: Parser<&'a str, Output = O, Error = E>,
    E: nom::error::ParseError<&'a str>,
{
    delimited(multispace0, inner, multispace0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_paths_with_indexes() {
        assert_eq!(
            parse_formula("Apis.users.data[1].name").unwrap(),
            Formula::path(&["Apis", "users", "data", "1", "name"])
        );
    }

    #[test]
    fn parses_literals() {
        assert_eq!(parse_formula("null").unwrap(), Formula::Value(Value::Null));
        assert_eq!(parse_formula("42").unwrap(), Formula::value(42));
        assert_eq!(parse_formula("-1.5").unwrap(), Formula::value(-1.5));
        assert_eq!(parse_formula("''").unwrap(), Formula::value(""));
        assert_eq!(parse_formula(" 'it' ").unwrap(), Formula::value("it"));
    }

    #[test]
    fn keywords_do_not_swallow_identifiers() {
        assert_eq!(
            parse_formula("trueValue").unwrap(),
            Formula::path(&["trueValue"])
        );
        assert_eq!(parse_formula("nullable.x").unwrap(), Formula::path(&["nullable", "x"]));
    }

    #[test]
    fn parses_nested_calls() {
        let parsed = parse_formula("concat('ID: ', upper(Attributes.id))").unwrap();
        assert_eq!(
            parsed,
            Formula::function(
                "concat",
                vec![
                    Formula::value("ID: "),
                    Formula::function("upper", vec![Formula::path(&["Attributes", "id"])]),
                ]
            )
        );
    }

    #[test]
    fn and_or_become_combinators() {
        assert_eq!(
            parse_formula("and(true, or(false, Variables.open))").unwrap(),
            Formula::And(vec![
                Formula::value(true),
                Formula::Or(vec![
                    Formula::value(false),
                    Formula::path(&["Variables", "open"])
                ]),
            ])
        );
    }

    #[test]
    fn empty_call_and_array() {
        assert_eq!(parse_formula("now()").unwrap(), Formula::function("now", vec![]));
        assert_eq!(
            parse_formula("array('a', 'b')").unwrap(),
            Formula::Array(vec![Formula::value("a"), Formula::value("b")])
        );
    }

    #[test]
    fn rejects_trailing_input() {
        let err = parse_formula("Attributes.x )").unwrap_err();
        assert!(matches!(err, FormulaParseError::Syntax { .. }));
    }
}
