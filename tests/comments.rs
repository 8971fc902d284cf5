use lazyxml::{Handlers, Parser, XmlElement};

const XML: &[u8] = br#"
<comments>
    <comment>Test</comment>
    <comment>
        <p>Hello everyone!</p>
    </comment>
    <comment>
        I've found this quote that I feel you may like:
        <blockquote cite="https://www.osmquote.com/quote/neil-barringham-quote-54c4b8">
            The grass is greener where you water it.
            <footer>-Neil Barringham</footer>
        </blockquote>
        Feel free to share it!
    </comment>
</comments>
"#;

#[test]
fn test_comments() {
    let parser = Parser::new(XML);
    let mut items = parser.iter_from(
        Handlers::new().on_element(["comments", "comment"], |node: XmlElement| node.text().map(Some)),
    );
    assert_eq!(items.next().unwrap().unwrap(), "Test");
    assert_eq!(items.next().unwrap().unwrap(), "Hello everyone!");
    assert_eq!(
        items.next().unwrap().unwrap(),
        "I've found this quote that I feel you may like: \
         The grass is greener where you water it. \
         -Neil Barringham \
         Feel free to share it!"
    );
    assert!(items.next().is_none());
}

#[test]
fn test_quote_attribute() {
    let parser = Parser::new(XML);
    let cite = parser
        .return_from(Handlers::new().on_element(
            ["comments", "comment", "blockquote"],
            |node: XmlElement| Some(node.attributes().get("cite").map(str::to_string)),
        ))
        .unwrap();
    assert_eq!(
        cite,
        Some(Some("https://www.osmquote.com/quote/neil-barringham-quote-54c4b8".to_string()))
    );
}
