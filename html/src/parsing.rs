use nom::{
    branch::alt,
    bytes::complete::{escaped, is_not, tag, tag_no_case, take_till1, take_until},
    character::complete::{alphanumeric1, char, multispace0, multispace1, none_of},
    combinator::{map, opt, verify},
    error::{Error, ErrorKind},
    multi::{many0, separated_list0},
    sequence::{delimited, preceded, separated_pair, tuple},
    IResult,
};
use tracing::trace;

use crate::{is_raw_text_element, is_void_element, Attributes, Document, Element, NodeId};
use std::fmt;

/// Parse tree before arena ids are assigned.
#[derive(Debug, PartialEq)]
enum RawNode {
    Element {
        element: Element,
        children: Vec<RawNode>,
    },
    Text(String),
}

impl RawNode {
    fn text(data: impl Into<String>) -> Self {
        Self::Text(data.into())
    }

    fn element(element: Element, children: Vec<RawNode>) -> Self {
        Self::Element { element, children }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    message: String,
}

impl ParseError {
    fn new(message: String) -> Self {
        Self { message }
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for ParseError {}

/// Parse a markup fragment, requiring the whole input to be consumed.
/// Fragments may have any number of top level elements.
pub fn parse(input: &str) -> Result<Document, ParseError> {
    match document(input) {
        Ok((remaining, document)) if remaining.trim().is_empty() => {
            trace!(nodes = document.len(), "parsed markup fragment");
            Ok(document)
        }
        Ok((remaining, _)) => Err(ParseError::new(format!(
            "unexpected trailing content: {}",
            snippet(remaining)
        ))),
        Err(e) => Err(ParseError::new(format!("invalid markup: {e}"))),
    }
}

/// Parse a markup fragment at the nom level, leaving trailing input
/// to the caller.
pub fn document(input: &str) -> IResult<&str, Document> {
    let (remaining, items) = parse_items(input)?;
    let mut document = Document::new();
    let root = document.root();
    for item in items {
        build(&mut document, root, item);
    }
    Ok((remaining, document))
}

fn build(document: &mut Document, parent: NodeId, raw: RawNode) {
    match raw {
        RawNode::Text(text) => {
            document.create_text(parent, text);
        }
        RawNode::Element { element, children } => {
            let id = document.create_element(parent, &element.tag_name, element.attributes);
            for child in children {
                build(document, id, child);
            }
        }
    }
}

fn snippet(input: &str) -> &str {
    let end = input
        .char_indices()
        .take(40)
        .last()
        .map(|(i, c)| i + c.len_utf8())
        .unwrap_or(0);
    &input[..end]
}

/// Attempt to parse a string as a valid tag name
fn parse_tag_name(input: &str) -> IResult<&str, &str> {
    alphanumeric1(input)
}

/// Parse a tag in the form `</name>`, returning `name`
fn parse_close_tag(input: &str) -> IResult<&str, &str> {
    let (remaining, (_, name, _)) = tuple((tag("</"), parse_tag_name, char('>')))(input)?;
    Ok((remaining, name))
}

/// Parse a tag in the form `<name attr=value ...>`, returning the
/// [`Element`] and whether the tag closed itself with `/>`.
fn parse_open_tag(input: &str) -> IResult<&str, (Element, bool)> {
    let (rest, (_, name, attrs, _, self_closing, _)) = tuple((
        char('<'),
        parse_tag_name,
        opt(preceded(multispace1, all_attr_parser)),
        multispace0,
        opt(char('/')),
        char('>'),
    ))(input)?;
    let attributes = attrs
        .unwrap_or_default()
        .into_iter()
        .map(|(k, v)| (k, decode_entities(v)))
        .collect::<Attributes>();
    Ok((rest, (Element::new(name, attributes), self_closing.is_some())))
}

/// Parse a run of character data up to the next tag. Whitespace-only
/// runs are dropped, everything else is trimmed and entity-decoded.
fn parse_text(input: &str) -> IResult<&str, Option<RawNode>> {
    let (remaining, raw) = take_till1(|c| c == '<')(input)?;
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        Ok((remaining, None))
    } else {
        Ok((remaining, Some(RawNode::text(decode_entities(trimmed)))))
    }
}

fn parse_comment(input: &str) -> IResult<&str, &str> {
    delimited(tag("<!--"), take_until("-->"), tag("-->"))(input)
}

fn parse_doctype(input: &str) -> IResult<&str, &str> {
    delimited(tag_no_case("<!doctype"), take_until(">"), char('>'))(input)
}

/// Parse the content between an opening and closing tag. Comments and
/// doctype declarations are consumed but produce no nodes.
fn parse_items(input: &str) -> IResult<&str, Vec<RawNode>> {
    let (remaining, items) = many0(parse_item)(input)?;
    Ok((remaining, items.into_iter().flatten().collect()))
}

fn parse_item(input: &str) -> IResult<&str, Option<RawNode>> {
    alt((
        map(parse_comment, |_| None),
        map(parse_doctype, |_| None),
        map(parse_element, Some),
        parse_text,
    ))(input)
}

/// Parse a complete element, returning the subtree under it.
fn parse_element(input: &str) -> IResult<&str, RawNode> {
    let (rest, (element, self_closing)) = parse_open_tag(input)?;
    if self_closing || is_void_element(&element.tag_name) {
        return Ok((rest, RawNode::element(element, Vec::new())));
    }
    if is_raw_text_element(&element.tag_name) {
        let (rest, text) = raw_text(rest, &element.tag_name)?;
        let (rest, _) = parse_close_tag(rest)?;
        let children = if text.trim().is_empty() {
            Vec::new()
        } else {
            vec![RawNode::text(text.trim())]
        };
        return Ok((rest, RawNode::element(element, children)));
    }
    let (rest, children) = parse_items(rest)?;
    let (rest, _) = verify(parse_close_tag, |close: &str| {
        element.tag_name.eq_ignore_ascii_case(close)
    })(rest)?;
    Ok((rest, RawNode::element(element, children)))
}

/// Take everything up to the matching close tag without interpreting
/// it. Used for `script` and `style` content.
fn raw_text<'a>(input: &'a str, tag_name: &str) -> IResult<&'a str, &'a str> {
    let lowered = input.to_ascii_lowercase();
    let needle = format!("</{tag_name}");
    match lowered.find(&needle) {
        Some(index) => Ok((&input[index..], &input[..index])),
        None => Err(nom::Err::Error(Error::new(input, ErrorKind::TakeUntil))),
    }
}

/// Decode the named entities the serializer emits plus decimal
/// character references. Unknown entities pass through verbatim.
pub fn decode_entities(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;
    while let Some(start) = rest.find('&') {
        out.push_str(&rest[..start]);
        let tail = &rest[start..];
        match tail.find(';') {
            Some(end) if end <= 10 => match decode_entity(&tail[1..end]) {
                Some(c) => {
                    out.push(c);
                    rest = &tail[end + 1..];
                }
                None => {
                    out.push('&');
                    rest = &tail[1..];
                }
            },
            _ => {
                out.push('&');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

fn decode_entity(entity: &str) -> Option<char> {
    match entity {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        _ => {
            let code = entity.strip_prefix('#')?.parse::<u32>().ok()?;
            char::from_u32(code)
        }
    }
}

// Attribute parsing below

fn parse_single_quoted(input: &str) -> IResult<&str, &str> {
    let esc = escaped(none_of("\\\'"), '\\', tag("'"));
    let esc_or_empty = alt((esc, tag("")));
    let res = delimited(tag("'"), esc_or_empty, tag("'"))(input)?;
    Ok(res)
}

fn parse_double_quoted(input: &str) -> IResult<&str, &str> {
    let esc = escaped(none_of("\\\""), '\\', tag("\""));
    let esc_or_empty = alt((esc, tag("")));
    let res = delimited(tag("\""), esc_or_empty, tag("\""))(input)?;
    Ok(res)
}

fn parse_unquoted(input: &str) -> IResult<&str, &str> {
    is_not(" \t\r\n\"'=<>`")(input)
}

fn value_parser(input: &str) -> IResult<&str, &str> {
    alt((parse_single_quoted, parse_double_quoted, parse_unquoted))(input)
}

fn name_parser(input: &str) -> IResult<&str, &str> {
    is_not(" \t\r\n\"'>/=")(input)
}

fn single_attr_parser(input: &str) -> IResult<&str, (&str, &str)> {
    let mut key_value = separated_pair(name_parser, char('='), value_parser);
    if let Ok((r, (k, v))) = key_value(input) {
        Ok((r, (k, v)))
    } else {
        let (r, res) = name_parser(input)?;
        Ok((r, (res, "")))
    }
}

fn all_attr_parser(input: &str) -> IResult<&str, Vec<(&str, &str)>> {
    separated_list0(multispace1, single_attr_parser)(input)
}
