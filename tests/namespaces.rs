mod common;

use common::capture_warnings;
use lazyxml::{Handlers, Parser, XmlElement};

type Row = (String, String, String);

const XML: &[u8] = br#"
<root xmlns="https://example.com/xml/"
    xmlns:ex="https://example.com/xml/ex"
    xmlns:other="https://example.com/xml/other">
    <aaa>Nodes inherit namespaces</aaa>
    <aaa xmlns="https://example.com/xml/aaa">Overriding namespace</aaa>
    <ex:aaa>Overriding namespace bis</ex:aaa>
    <bbb uuu="0" ex:vvv="1" xxx="2" ex:xxx="3" other:xxx="4" ex:yyy="5" other:yyy="6">
        Looking for attributes
    </bbb>
</root>
"#;

fn row(a: &str, b: &str, c: &str) -> Row {
    (a.to_string(), b.to_string(), c.to_string())
}

fn handlers() -> Handlers<Row> {
    Handlers::new()
        // any namespace, unless a more specific handler exists
        .on_element(["root", "aaa"], |node: XmlElement| Some(row("aaa", node.namespace(), "")))
        .on_element(["root", "{https://example.com/xml/ex}aaa"], |node: XmlElement| {
            Some(row("aaa_ex", node.namespace(), ""))
        })
        // never matches: every element inherits a namespace here
        .on_element(["root", "{}aaa"], |node: XmlElement| {
            Some(row("aaa_no_namespace", node.namespace(), ""))
        })
        .on_element(["root", "bbb"], |node: XmlElement| {
            let attributes = node.attributes();
            let get = |key: &str| attributes.get(key).unwrap_or_default().to_string();
            vec![
                row("bbb", "uuu default", &get("uuu")),
                row("bbb", "uuu no", &get("{}uuu")),
                row("bbb", "vvv default", &get("vvv")),
                row("bbb", "vvv specific", &get("{https://example.com/xml/ex}vvv")),
                row("bbb", "xxx default", &get("xxx")),
                row("bbb", "xxx no", &get("{}xxx")),
                row("bbb", "xxx specific", &get("{https://example.com/xml/ex}xxx")),
                row("bbb", "yyy default", &get("yyy")),
            ]
        })
}

#[test]
fn test_namespaces() {
    let (rows, warnings) = capture_warnings(|| {
        Parser::new(XML)
            .iter_from(handlers())
            .collect::<Result<Vec<_>, _>>()
            .unwrap()
    });
    let (yyy, rows) = rows.split_last().unwrap();
    assert_eq!(
        rows,
        [
            row("aaa", "https://example.com/xml/", ""),
            row("aaa", "https://example.com/xml/aaa", ""),
            row("aaa_ex", "https://example.com/xml/ex", ""),
            row("bbb", "uuu default", "0"),
            row("bbb", "uuu no", "0"),
            row("bbb", "vvv default", "1"),
            row("bbb", "vvv specific", "1"),
            row("bbb", "xxx default", "2"),
            row("bbb", "xxx no", "2"),
            row("bbb", "xxx specific", "3"),
        ]
    );
    // either namespaced attribute may be picked
    assert!(*yyy == row("bbb", "yyy default", "5") || *yyy == row("bbb", "yyy default", "6"));
    assert_eq!(
        warnings,
        ["Several alternatives for attribute name 'yyy'. Specify namespace by using '{namespace}yyy' as the key."]
    );
}

#[test]
fn test_missing_attribute() {
    let parser = Parser::new(b"<root a='1'/>");
    let value = parser
        .return_from(Handlers::new().on_element("root", |root: XmlElement| {
            Some(root.attributes().get("b").map(str::to_string))
        }))
        .unwrap();
    assert_eq!(value, Some(None));
}
