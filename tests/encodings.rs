use lazyxml::{Handlers, Parser, XmlElement};
use rstest::rstest;

const TXT: &str = "aàâæcçeéèêëiïîoôuùûü";
const DECLARATION_UTF8: &str = "<?xml version='1.0' encoding='UTF-8'?>";
const DECLARATION_UTF16: &str = "<?xml version='1.0' encoding='UTF-16'?>";
const DECLARATION_LATIN1: &str = "<?xml version='1.0' encoding='ISO-8859-1'?>";

fn document(declaration: &str) -> String {
    format!("{declaration}<élément>{TXT}</élément>")
}

fn utf8(bom: bool, declaration: &str) -> Vec<u8> {
    let prefix: &[u8] = if bom { b"\xef\xbb\xbf" } else { b"" };
    [prefix, document(declaration).as_bytes()].concat()
}

fn utf16le(declaration: &str) -> Vec<u8> {
    let mut bytes = vec![0xff, 0xfe];
    bytes.extend(document(declaration).encode_utf16().flat_map(u16::to_le_bytes));
    bytes
}

fn utf16be(declaration: &str) -> Vec<u8> {
    let mut bytes = vec![0xfe, 0xff];
    bytes.extend(document(declaration).encode_utf16().flat_map(u16::to_be_bytes));
    bytes
}

fn latin1(declaration: &str) -> Vec<u8> {
    document(declaration).chars().map(|c| u8::try_from(c).unwrap()).collect()
}

fn read(xml: Vec<u8>) -> Result<Option<String>, lazyxml::Error> {
    Parser::new(xml).return_from(Handlers::new().on_element("élément", |node: XmlElement| node.text().map(Some)))
}

#[rstest]
#[case::implicit_utf8(utf8(false, ""))]
#[case::implicit_utf8_bom(utf8(true, ""))]
#[case::implicit_utf16le_bom(utf16le(""))]
#[case::implicit_utf16be_bom(utf16be(""))]
#[case::explicit_utf8(utf8(false, DECLARATION_UTF8))]
#[case::explicit_utf8_bom(utf8(true, DECLARATION_UTF8))]
#[case::explicit_utf16le_bom(utf16le(DECLARATION_UTF16))]
#[case::explicit_utf16be_bom(utf16be(DECLARATION_UTF16))]
#[case::explicit_latin1(latin1(DECLARATION_LATIN1))]
fn test_encoding(#[case] xml: Vec<u8>) {
    assert_eq!(read(xml).unwrap().as_deref(), Some(TXT));
}

#[test]
fn test_wrong_explicit_encoding() {
    // UTF-8 bytes read as declared: the element name no longer matches, if it parses at all
    let result = read(utf8(false, DECLARATION_LATIN1));
    assert_ne!(result.ok().flatten().as_deref(), Some(TXT));
}

#[test]
fn test_encoding_split_across_reads() {
    let xml = utf16le(DECLARATION_UTF16);
    let chunks: Vec<Vec<u8>> = xml.chunks(3).map(<[u8]>::to_vec).collect();
    let parser = Parser::new(lazyxml::Streamable::chain(chunks));
    let text = parser
        .return_from(Handlers::new().on_element("élément", |node: XmlElement| node.text().map(Some)))
        .unwrap();
    assert_eq!(text.as_deref(), Some(TXT));
}
