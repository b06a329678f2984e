use super::parsing::stylesheet;
use super::*;

#[cfg(test)]
#[test]
fn test_stylesheet() {
    let i = r#"/* pane chrome */
@import "reader.css";

.collapsed {
    display: none
}

h3, h3:hover {
    cursor: pointer;
    margin: 8px 0;
}

.card {
    border: 1px solid #ddd;
}
"#;
    let target = Stylesheet {
        rules: vec![
            Ruleset {
                selectors: vec![Selector::Simple(SimpleSelector::Class(
                    "collapsed".to_string(),
                ))],
                declarations: vec![Declaration::new(
                    "display",
                    Value::Keyword("none".to_string()),
                )],
            },
            Ruleset {
                selectors: vec![
                    Selector::Simple(simple_selector!(h3)),
                    compound_selector!(simple_selector!(h3), simple_selector!(:hover)),
                ],
                declarations: vec![
                    Declaration::new("cursor", Value::Keyword("pointer".to_string())),
                    Declaration::new(
                        "margin",
                        Value::Multiple(vec![Value::Length(8.0, Unit::Px), Value::Number(0.0)]),
                    ),
                ],
            },
            Ruleset {
                selectors: vec![Selector::Simple(SimpleSelector::Class("card".to_string()))],
                declarations: vec![Declaration::new(
                    "border",
                    Value::Multiple(vec![
                        Value::Length(1.0, Unit::Px),
                        Value::Keyword("solid".to_string()),
                        Value::Color(ColorValue {
                            r: 0xdd,
                            g: 0xdd,
                            b: 0xdd,
                            a: 255,
                        }),
                    ]),
                )],
            },
        ],
    };
    assert_eq!(stylesheet(i), Ok(("", target)));
}

#[cfg(test)]
#[test]
fn test_invalid_rule() {
    let i = r#"h1 {
    BLAHBALH
}
h2 {
    color: black;
}"#;
    let target = Stylesheet {
        rules: vec![Ruleset {
            selectors: vec![Selector::Simple(simple_selector!(h2))],
            declarations: vec![Declaration::new("color", Value::Color(keywords::BLACK))],
        }],
    };
    assert_eq!(stylesheet(i), Ok(("", target)))
}

#[cfg(test)]
#[test]
fn test_media_block_skipped() {
    let i = r#"@media screen {
    h1 { color: white; }
}
p { margin: 0 }"#;
    let target = Stylesheet {
        rules: vec![Ruleset {
            selectors: vec![Selector::Simple(simple_selector!(p))],
            declarations: vec![Declaration::new("margin", Value::Number(0.0))],
        }],
    };
    assert_eq!(stylesheet(i), Ok(("", target)))
}

#[cfg(test)]
#[test]
fn test_descendant_selector() {
    let (rest, sel) = selector(".feedback-content h3").unwrap();
    assert_eq!(rest, "");
    assert_eq!(
        sel,
        combinator_selector!(
            Selector::Simple(SimpleSelector::Class("feedback-content".to_string())),
            Combinator::Descendant,
            Selector::Simple(simple_selector!(h3))
        )
    );
    assert_eq!(sel.subject(), &Selector::Simple(simple_selector!(h3)));
}

#[cfg(test)]
#[test]
fn test_combinator_chain() {
    let (rest, sel) = selector("#reader .cards > h4").unwrap();
    assert_eq!(rest, "");
    let target = combinator_selector!(
        combinator_selector!(
            Selector::Simple(simple_selector!(#reader)),
            Combinator::Descendant,
            Selector::Simple(SimpleSelector::Class("cards".to_string()))
        ),
        Combinator::Child,
        Selector::Simple(simple_selector!(h4))
    );
    assert_eq!(sel, target);
    assert_eq!(sel.subject(), &Selector::Simple(simple_selector!(h4)));
}

#[cfg(test)]
#[test]
fn test_sibling_combinators() {
    let (_, next) = selector("h3 + p").unwrap();
    assert_eq!(
        next,
        combinator_selector!(
            Selector::Simple(simple_selector!(h3)),
            Combinator::NextSibling,
            Selector::Simple(simple_selector!(p))
        )
    );
    let (_, subsequent) = selector("h3 ~ p").unwrap();
    assert_eq!(
        subsequent,
        combinator_selector!(
            Selector::Simple(simple_selector!(h3)),
            Combinator::SubsequentSibling,
            Selector::Simple(simple_selector!(p))
        )
    );
}

#[cfg(test)]
#[test]
fn test_compound_selector() {
    let (_, sel) = selector("h3.pane-title").unwrap();
    assert_eq!(
        sel,
        Selector::Compound(vec![
            simple_selector!(h3),
            SimpleSelector::Class("pane-title".to_string()),
        ])
    );
}

#[cfg(test)]
#[test]
fn test_selector_list() {
    let (rest, selectors) = selector_list("h1, h2,h3").unwrap();
    assert_eq!(rest, "");
    assert_eq!(
        selectors,
        vec![
            Selector::Simple(simple_selector!(h1)),
            Selector::Simple(simple_selector!(h2)),
            Selector::Simple(simple_selector!(h3)),
        ]
    );
}

#[cfg(test)]
#[test]
fn test_tag_names_lowercased() {
    let (_, sel) = selector("H3").unwrap();
    assert_eq!(sel, Selector::Simple(simple_selector!(h3)));
}

#[cfg(test)]
#[test]
fn test_length_units() {
    let (_, sheet) = stylesheet("p { font-size: 0.9em; width: 100%; line-height: 1.4 }").unwrap();
    let rule = &sheet.rules[0];
    assert_eq!(
        rule.declaration("font-size"),
        Some(&Value::Length(0.9, Unit::Em))
    );
    assert_eq!(rule.declaration("width"), Some(&Value::Percentage(100.0)));
    assert_eq!(rule.declaration("line-height"), Some(&Value::Number(1.4)));
    assert_eq!(rule.declaration("missing"), None);
}

#[cfg(test)]
#[test]
fn test_shorthand_color() {
    let (_, sheet) = stylesheet("a { color: #1a5dab; background: white }").unwrap();
    let rule = &sheet.rules[0];
    assert_eq!(
        rule.declaration("color"),
        Some(&Value::Color(ColorValue {
            r: 0x1a,
            g: 0x5d,
            b: 0xab,
            a: 255,
        }))
    );
    assert_eq!(rule.declaration("background"), Some(&Value::Color(WHITE)));
}
