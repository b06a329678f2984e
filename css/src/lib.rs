#[derive(PartialEq, Clone, Debug)]
pub struct Stylesheet {
    pub rules: Vec<Ruleset>,
}

#[derive(PartialEq, Clone, Debug)]
pub struct Ruleset {
    pub selectors: Vec<Selector>,
    pub declarations: Vec<Declaration>,
}

impl Ruleset {
    /// Value of the named declaration, if the rule carries it.
    pub fn declaration(&self, name: &str) -> Option<&Value> {
        self.declarations
            .iter()
            .find(|d| d.name.eq_ignore_ascii_case(name))
            .map(|d| &d.value)
    }
}

#[derive(PartialEq, Clone, Debug)]
pub enum Selector {
    Simple(SimpleSelector),
    Compound(Vec<SimpleSelector>),
    Combinator(Box<Selector>, Combinator, Box<Selector>),
}

impl Selector {
    /// Rightmost compound of the selector, the part the matched
    /// element itself must satisfy.
    pub fn subject(&self) -> &Selector {
        match self {
            Selector::Combinator(_, _, right) => right.subject(),
            other => other,
        }
    }
}

#[derive(PartialEq, Clone, Copy, Debug)]
pub enum Combinator {
    // ( )
    Descendant,
    // (>)
    Child,
    // (+)
    NextSibling,
    // (~)
    SubsequentSibling,
}

#[derive(PartialEq, Eq, Clone, Debug)]
pub enum SimpleSelector {
    Type(String),
    Universal,
    Class(String),
    PseudoClass(String),
    ID(String),
}

#[macro_export]
macro_rules! simple_selector {
    (#$x:expr) => {
        SimpleSelector::ID(stringify!($x).to_string())
    };
    (.$x:expr) => {
        SimpleSelector::Class(stringify!($x).to_string())
    };
    (:$x:expr) => {
        SimpleSelector::PseudoClass(stringify!($x).to_string())
    };
    (*) => {
        SimpleSelector::Universal
    };
    ($x:expr) => {
        SimpleSelector::Type(stringify!($x).to_string())
    };
}

#[macro_export]
macro_rules! compound_selector {
    ($($sel:expr),*) => {Selector::Compound(vec![$($sel),*])}
}

#[macro_export]
macro_rules! combinator_selector {
    ($l:expr,$c:expr,$r:expr) => {
        Selector::Combinator($l.into(), $c, $r.into())
    };
}

#[derive(PartialEq, Clone, Debug)]
pub struct Declaration {
    pub name: String,
    pub value: Value,
}

impl Declaration {
    pub fn new(name: &str, value: Value) -> Self {
        Self {
            name: name.to_string(),
            value,
        }
    }
}

#[derive(PartialEq, Clone, Debug)]
pub enum Value {
    Keyword(String),
    Number(f64),
    Percentage(f64),
    Length(f64, Unit),
    Color(ColorValue),
    Multiple(Vec<Value>),
}

impl Value {
    /// Checks for a specific keyword value, e.g. `display: none`.
    pub fn is_keyword(&self, keyword: &str) -> bool {
        matches!(self, Value::Keyword(kw) if kw == keyword)
    }
}

#[derive(PartialEq, Clone, Copy, Debug)]
pub enum Unit {
    Px,
    Em,
    Rem,
}

#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub struct ColorValue {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

mod keywords;

pub use keywords::*;

/// Takes a CSS keyword and returns a Value. If the keyword is implemented,
/// the proper value will be returned. Otherwise, it will be returned as a Value::Keyword
pub fn keyword_to_value(kw: &str) -> Value {
    match kw {
        "black" => Value::Color(BLACK),
        "white" => Value::Color(WHITE),
        _ => Value::Keyword(kw.to_string()),
    }
}

mod parsing;
#[cfg(test)]
mod tests;

pub use parsing::{selector, selector_list, stylesheet};
