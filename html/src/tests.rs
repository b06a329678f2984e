use super::parsing::{decode_entities, parse};
use super::*;

#[test]
fn test_document_parse() {
    let data = r#"<!DOCTYPE html>
<html>
    <!-- reader shell -->
    <body>
        <div class="feedback-content">
            <h3>Zusammenfassung</h3>
            <p>Hello, world</p>
        </div>
    </body>
</html>"#;
    let document = parse(data).unwrap();

    let roots = document.children(document.root());
    assert_eq!(roots.len(), 1);
    let html = roots[0];
    assert_eq!(document.tag_name(html), Some("html"));

    let body = document.children(html)[0];
    let div = document.children(body)[0];
    assert_eq!(document.attr(div, "class"), Some("feedback-content"));

    let blocks = document.children(div);
    assert_eq!(blocks.len(), 2);
    assert_eq!(document.tag_name(blocks[0]), Some("h3"));
    assert_eq!(document.text_content(blocks[0]), "Zusammenfassung");
    assert_eq!(document.tag_name(blocks[1]), Some("p"));
    assert_eq!(document.text_content(blocks[1]), "Hello, world");
}

#[test]
fn test_fragment_with_multiple_roots() {
    let document = parse("<h3>Eins</h3><p>Zwei</p>").unwrap();
    let roots = document.children(document.root());
    assert_eq!(roots.len(), 2);
    assert_eq!(document.tag_name(roots[0]), Some("h3"));
    assert_eq!(document.tag_name(roots[1]), Some("p"));
}

#[test]
fn test_attribute_forms() {
    let document =
        parse(r#"<div attr1 attr2=two attr3='three' attr4="number four"></div>"#).unwrap();
    let div = document.children(document.root())[0];
    assert_eq!(document.attr(div, "attr1"), Some(""));
    assert_eq!(document.attr(div, "attr2"), Some("two"));
    assert_eq!(document.attr(div, "attr3"), Some("three"));
    assert_eq!(document.attr(div, "attr4"), Some("number four"));
    assert_eq!(document.attr(div, "missing"), None);
}

#[test]
fn test_void_and_self_closing() {
    let document = parse(r#"<p>vorher<br>nachher<img src="chart.png"/></p>"#).unwrap();
    let p = document.children(document.root())[0];
    let children = document.children(p);
    assert_eq!(children.len(), 4);
    assert_eq!(document.tag_name(children[1]), Some("br"));
    assert_eq!(document.attr(children[3], "src"), Some("chart.png"));
}

#[test]
fn test_raw_text_elements() {
    let data = "<style>.collapsed { display: none; } h3 > p { margin: 0; }</style>";
    let document = parse(data).unwrap();
    let style = document.children(document.root())[0];
    assert_eq!(
        document.text_content(style),
        ".collapsed { display: none; } h3 > p { margin: 0; }"
    );
}

#[test]
fn test_entity_decoding() {
    let document = parse("<p title=\"Fish &amp; Chips\">a &lt; b &#228;</p>").unwrap();
    let p = document.children(document.root())[0];
    assert_eq!(document.attr(p, "title"), Some("Fish & Chips"));
    assert_eq!(document.text_content(p), "a < b ä");

    assert_eq!(decode_entities("&unknown; stays"), "&unknown; stays");
    assert_eq!(decode_entities("100 & 200"), "100 & 200");
}

#[test]
fn test_parse_malformed() {
    assert!(parse("<html></closing><opening></html>").is_err());
    assert!(parse("<html><p>unclosed</html>").is_err());
    assert!(parse("<p>ok</p> trailing <").is_err());
}

#[test]
fn test_whitespace_trimming() {
    let document = parse("<div>\n    <p>  padded  </p>\n</div>").unwrap();
    let div = document.children(document.root())[0];
    assert_eq!(document.children(div).len(), 1);
    let p = document.children(div)[0];
    assert_eq!(document.text_content(p), "padded");
}

#[test]
fn test_class_ops() {
    let mut document = Document::new();
    let root = document.root();
    let attributes = Attributes::from_iter([("class", "card text-card")]);
    let div = document.create_element(root, "div", attributes);

    assert!(document.has_class(div, "card"));
    assert!(document.has_class(div, "text-card"));
    assert!(!document.has_class(div, "collapsed"));

    assert!(document.toggle_class(div, "collapsed"));
    assert!(document.has_class(div, "collapsed"));
    assert_eq!(document.attr(div, "class"), Some("card text-card collapsed"));

    assert!(!document.toggle_class(div, "collapsed"));
    assert_eq!(document.attr(div, "class"), Some("card text-card"));

    document.add_class(div, "card");
    assert_eq!(document.attr(div, "class"), Some("card text-card"));

    let text = document.create_text(root, "not an element");
    assert!(!document.toggle_class(text, "collapsed"));
    assert_eq!(document.text_content(text), "not an element");
}

#[test]
fn test_next_element_sibling_skips_text() {
    let document = parse("<div><h3>Titel</h3>zwischen<p>eins</p><p>zwei</p></div>").unwrap();
    let div = document.children(document.root())[0];
    let h3 = document.children(div)[0];

    let first = document.next_element_sibling(h3).unwrap();
    assert_eq!(document.tag_name(first), Some("p"));
    assert_eq!(document.text_content(first), "eins");

    let second = document.next_element_sibling(first).unwrap();
    assert_eq!(document.text_content(second), "zwei");
    assert_eq!(document.next_element_sibling(second), None);
}

#[test]
fn test_set_inline_style() {
    let mut document = Document::new();
    let root = document.root();
    let h3 = document.create_element(root, "h3", Attributes::new());

    document.set_inline_style(h3, "cursor", "pointer");
    assert_eq!(document.attr(h3, "style"), Some("cursor: pointer"));
    assert_eq!(document.inline_style(h3, "cursor").as_deref(), Some("pointer"));

    document.set_inline_style(h3, "color", "red");
    document.set_inline_style(h3, "cursor", "default");
    assert_eq!(document.attr(h3, "style"), Some("cursor: default; color: red"));
}

#[test]
fn test_serialization() {
    let data = r#"<div class="card"><h4>A &amp; B</h4><img src="x.png"><p>1 &lt; 2</p></div>"#;
    let document = parse(data).unwrap();
    assert_eq!(document.to_markup(), data);

    let reparsed = parse(&document.to_markup()).unwrap();
    assert_eq!(reparsed.to_markup(), document.to_markup());
}

#[test]
fn test_serialization_escapes_built_text() {
    let mut document = Document::new();
    let root = document.root();
    let p = document.create_element(root, "p", Attributes::new());
    document.create_text(p, "if a < b & b > c");
    document.set_attr(p, "title", "say \"hi\"");
    assert_eq!(
        document.to_markup(),
        r#"<p title="say &quot;hi&quot;">if a &lt; b &amp; b &gt; c</p>"#
    );
}
