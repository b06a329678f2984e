use nom::branch::alt;
use nom::bytes::complete::{is_not, tag, take_until, take_while_m_n};
use nom::character::complete::{char, digit0, digit1, multispace0, multispace1, one_of};
use nom::combinator::{map, map_res, opt, value, verify};
use nom::error::{Error, ErrorKind};
use nom::multi::{many0, many1, separated_list0, separated_list1};
use nom::sequence::{delimited, pair, separated_pair, terminated, tuple};
use nom::IResult;
use tracing::debug;

use super::{
    keyword_to_value, ColorValue, Combinator, Declaration, Ruleset, Selector, SimpleSelector,
    Stylesheet, Unit, Value,
};

/// Parse a whole stylesheet. At-rules are consumed without being
/// interpreted and unparseable rulesets are skipped, so one bad rule
/// does not take the rest of the sheet with it.
pub fn stylesheet(input: &str) -> IResult<&str, Stylesheet> {
    let (rest, _) = ws(input)?;
    let (rest, rules) = many0(terminated(stylesheet_item, ws))(rest)?;
    Ok((
        rest,
        Stylesheet {
            rules: rules.into_iter().flatten().collect(),
        },
    ))
}

fn stylesheet_item(input: &str) -> IResult<&str, Option<Ruleset>> {
    alt((
        map(skip_at_rule, |_| None),
        map(parse_ruleset, Some),
        map(skip_invalid_ruleset, |_| None),
    ))(input)
}

fn parse_ruleset(input: &str) -> IResult<&str, Ruleset> {
    let (rest, (selectors, _)) = tuple((selector_list, ws))(input)?;
    let (rest, _) = char('{')(rest)?;
    let (rest, _) = ws(rest)?;
    let (rest, declarations) =
        separated_list0(tuple((char(';'), ws)), parse_declaration)(rest)?;
    let (rest, _) = opt(char(';'))(rest)?;
    let (rest, _) = ws(rest)?;
    let (rest, _) = char('}')(rest)?;
    Ok((
        rest,
        Ruleset {
            selectors,
            declarations,
        },
    ))
}

/// Parse a comma separated selector list, as found before a rule block.
pub fn selector_list(input: &str) -> IResult<&str, Vec<Selector>> {
    separated_list1(tuple((multispace0, char(','), multispace0)), selector)(input)
}

/// Parse a full selector, folding combinator chains left to right:
/// `.a .b > h3` becomes `Combinator(Combinator(.a, Descendant, .b), Child, h3)`.
pub fn selector(input: &str) -> IResult<&str, Selector> {
    let (mut rest, mut selector) = parse_compound_selector(input)?;
    while let Ok((r, (combinator, right))) = pair(parse_combinator, parse_compound_selector)(rest)
    {
        selector = Selector::Combinator(selector.into(), combinator, right.into());
        rest = r;
    }
    Ok((rest, selector))
}

fn parse_combinator(input: &str) -> IResult<&str, Combinator> {
    alt((
        value(
            Combinator::Child,
            delimited(multispace0, char('>'), multispace0),
        ),
        value(
            Combinator::NextSibling,
            delimited(multispace0, char('+'), multispace0),
        ),
        value(
            Combinator::SubsequentSibling,
            delimited(multispace0, char('~'), multispace0),
        ),
        value(Combinator::Descendant, multispace1),
    ))(input)
}

/// One selector step without combinators, e.g. `h3.section-title`.
fn parse_compound_selector(input: &str) -> IResult<&str, Selector> {
    let (rest, mut parts) = many1(parse_simple_selector)(input)?;
    let selector = if parts.len() == 1 {
        Selector::Simple(parts.remove(0))
    } else {
        Selector::Compound(parts)
    };
    Ok((rest, selector))
}

fn parse_simple_selector(input: &str) -> IResult<&str, SimpleSelector> {
    let (rest, prefix) = opt(one_of("#.:*"))(input)?;
    match prefix {
        Some('*') => Ok((rest, SimpleSelector::Universal)),
        Some('#') => {
            let (rest, ident) = parse_identifier(rest)?;
            Ok((rest, SimpleSelector::ID(ident.to_string())))
        }
        Some('.') => {
            let (rest, ident) = parse_identifier(rest)?;
            Ok((rest, SimpleSelector::Class(ident.to_string())))
        }
        Some(':') => {
            let (rest, ident) = parse_identifier(rest)?;
            Ok((rest, SimpleSelector::PseudoClass(ident.to_string())))
        }
        // tag names match case-insensitively, classes and ids do not
        _ => {
            let (rest, ident) = parse_identifier(rest)?;
            Ok((rest, SimpleSelector::Type(ident.to_ascii_lowercase())))
        }
    }
}

#[cfg(test)]
#[test]
fn test_parse_simple_selector() {
    assert_eq!(
        parse_simple_selector(".class-name").unwrap(),
        ("", SimpleSelector::Class("class-name".to_string()))
    );
    assert_eq!(
        parse_simple_selector("#id-name").unwrap(),
        ("", SimpleSelector::ID("id-name".to_string()))
    );
    assert_eq!(
        parse_simple_selector("H3"),
        Ok(("", SimpleSelector::Type("h3".to_string())))
    );
    assert_eq!(
        parse_simple_selector("*"),
        Ok(("", SimpleSelector::Universal))
    );
}

fn parse_declaration(input: &str) -> IResult<&str, Declaration> {
    let (rest, (name, value)) = separated_pair(
        parse_identifier,
        tuple((multispace0, char(':'), multispace0)),
        parse_value_list,
    )(input)?;
    Ok((
        rest,
        Declaration {
            name: name.to_ascii_lowercase(),
            value,
        },
    ))
}

#[cfg(test)]
#[test]
fn test_parse_declaration() {
    assert_eq!(
        parse_declaration("font-size: 12px").unwrap(),
        ("", Declaration::new("font-size", Value::Length(12.0, Unit::Px)))
    );
    assert_eq!(
        parse_declaration("margin: 8px 0").unwrap(),
        (
            "",
            Declaration::new(
                "margin",
                Value::Multiple(vec![Value::Length(8.0, Unit::Px), Value::Number(0.0)])
            )
        )
    );
}

/// A declaration value, possibly a space or comma separated list.
fn parse_value_list(input: &str) -> IResult<&str, Value> {
    let separator = alt((
        map(tuple((multispace0, char(','), multispace0)), |_| ()),
        map(multispace1, |_| ()),
    ));
    let (rest, mut values) = separated_list1(separator, parse_value)(input)?;
    let value = if values.len() == 1 {
        values.remove(0)
    } else {
        Value::Multiple(values)
    };
    Ok((rest, value))
}

fn parse_value(input: &str) -> IResult<&str, Value> {
    if let Ok((rest, color)) = parse_color(input) {
        return Ok((rest, Value::Color(color)));
    }
    if let Ok((rest, (number, unit))) = tuple((parse_number, parse_unit))(input) {
        return Ok((rest, Value::Length(number, unit)));
    }
    if let Ok((rest, number)) = terminated(parse_number, char('%'))(input) {
        return Ok((rest, Value::Percentage(number)));
    }
    if let Ok((rest, number)) = parse_number(input) {
        return Ok((rest, Value::Number(number)));
    }
    let (rest, ident) = parse_identifier(input)?;
    Ok((rest, keyword_to_value(ident)))
}

/// '12' -> `12.0`
fn parse_integer_to_float(input: &str) -> IResult<&str, f64> {
    map_res(digit1, str::parse)(input)
}

/// '.5' -> `0.5`
/// '0.5' -> `0.5`
fn parse_float(input: &str) -> IResult<&str, f64> {
    map_res(
        tuple((digit0, char('.'), digit1)),
        |(whole, _, fraction): (&str, char, &str)| format!("{whole}.{fraction}").parse(),
    )(input)
}

fn parse_number(input: &str) -> IResult<&str, f64> {
    alt((parse_float, parse_integer_to_float))(input)
}

fn from_hex(input: &str) -> Result<u8, std::num::ParseIntError> {
    u8::from_str_radix(input, 16)
}

fn is_hex_digit(c: char) -> bool {
    c.is_ascii_hexdigit()
}

fn hex_primary(input: &str) -> IResult<&str, u8> {
    map_res(take_while_m_n(2, 2, is_hex_digit), from_hex)(input)
}

/// One digit of a `#abc` shorthand color, doubled to its full value.
fn hex_single(input: &str) -> IResult<&str, u8> {
    map_res(take_while_m_n(1, 1, is_hex_digit), |s| {
        from_hex(s).map(|v| v * 0x11)
    })(input)
}

fn parse_color(input: &str) -> IResult<&str, ColorValue> {
    let (input, _) = tag("#")(input)?;
    if let Ok((input, (r, g, b, a))) =
        tuple((hex_primary, hex_primary, hex_primary, hex_primary))(input)
    {
        return Ok((input, ColorValue { r, g, b, a }));
    }
    if let Ok((input, (r, g, b))) = tuple((hex_primary, hex_primary, hex_primary))(input) {
        return Ok((input, ColorValue { r, g, b, a: 255 }));
    }
    let (input, (r, g, b)) = tuple((hex_single, hex_single, hex_single))(input)?;
    Ok((input, ColorValue { r, g, b, a: 255 }))
}

#[cfg(test)]
#[test]
fn test_parse_color() {
    let target = ColorValue {
        r: 255,
        g: 255,
        b: 255,
        a: 255,
    };
    assert_eq!(parse_color("#ffffff").unwrap(), ("", target));

    let target = ColorValue {
        r: 0xdd,
        g: 0xdd,
        b: 0xdd,
        a: 255,
    };
    assert_eq!(parse_color("#ddd").unwrap(), ("", target));

    let target = ColorValue {
        r: 0,
        g: 0,
        b: 0,
        a: 0x80,
    };
    assert_eq!(parse_color("#00000080").unwrap(), ("", target));
}

fn parse_unit(input: &str) -> IResult<&str, Unit> {
    alt((
        value(Unit::Px, tag("px")),
        value(Unit::Rem, tag("rem")),
        value(Unit::Em, tag("em")),
    ))(input)
}

fn parse_identifier(input: &str) -> IResult<&str, &str> {
    verify(is_not(" \t\r\n;:,{}()#.>+~*\"'"), |s: &str| {
        !s.starts_with("--")
    })(input)
}

/// Whitespace and comments between tokens.
fn ws(input: &str) -> IResult<&str, ()> {
    let (mut rest, _) = multispace0(input)?;
    while let Ok((r, _)) = comment(rest) {
        let (r, _) = multispace0(r)?;
        rest = r;
    }
    Ok((rest, ()))
}

fn comment(input: &str) -> IResult<&str, &str> {
    delimited(tag("/*"), take_until("*/"), tag("*/"))(input)
}

/// Consume an at-rule without interpreting it. Block bodies are
/// skipped with brace counting.
fn skip_at_rule(input: &str) -> IResult<&str, ()> {
    let (rest, _) = char('@')(input)?;
    let mut depth = 0usize;
    for (index, c) in rest.char_indices() {
        match c {
            ';' if depth == 0 => return Ok((&rest[index + 1..], ())),
            '{' => depth += 1,
            '}' if depth == 1 => return Ok((&rest[index + 1..], ())),
            '}' if depth > 1 => depth -= 1,
            _ => {}
        }
    }
    Err(nom::Err::Error(Error::new(input, ErrorKind::TakeUntil)))
}

/// Recover from an unparseable ruleset by discarding input through
/// the next closing brace.
fn skip_invalid_ruleset(input: &str) -> IResult<&str, ()> {
    let (rest, skipped) = terminated(take_until("}"), char('}'))(input)?;
    debug!(skipped, "skipping unparseable css rule");
    Ok((rest, ()))
}
