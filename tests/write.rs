use pooljson::{encode, fill, parse_str, to_string, to_writer, ErrorKind, WriteOptions};
use rstest::rstest;

#[rstest]
#[case(0, r#"{"a":[1,{"b":null}],"c":"d"}"#)]
#[case(2, "{\n  \"a\":[\n    1,\n    {\n      \"b\":null\n    }\n  ],\n  \"c\":\"d\"\n}")]
fn compact_and_pretty(#[case] indent: usize, #[case] expected: &str) {
    let doc = parse_str(r#" { "a" : [ 1 , { "b" : null } ] , "c" : "d" } "#).unwrap();
    assert_eq!(to_string(doc.root(), indent), expected);
}

#[rstest]
fn numbers_keep_their_source_text() {
    let doc = parse_str("[1.10, 2e5, -0.5E-2, 1e400]").unwrap();
    assert_eq!(to_string(doc.root(), 0), "[1.10,2e5,-0.5E-2,1e400]");
}

#[rstest]
fn control_characters_are_escaped() {
    let doc = parse_str(r#""line\nbreak\t\"quoted\"\\ \u0007""#).unwrap();
    assert_eq!(
        to_string(doc.root(), 0),
        r#""line\nbreak\t\"quoted\"\\ \u0007""#
    );
}

#[rstest]
fn writer_and_fixed_buffer_agree() {
    let doc = parse_str(r#"{"list":[true,false,null],"n":-3}"#).unwrap();
    let expected = to_string(doc.root(), 1);

    let mut out = Vec::new();
    to_writer(doc.root(), &WriteOptions::new().with_indent(1), &mut out).unwrap();
    assert_eq!(String::from_utf8(out).unwrap(), expected);

    let mut buf = vec![0u8; expected.len()];
    let used = fill(doc.root(), 1, &mut buf).unwrap();
    assert_eq!(&buf[..used], expected.as_bytes());

    let mut short = vec![0u8; expected.len() - 1];
    let err = fill(doc.root(), 1, &mut short).unwrap_err();
    assert_eq!(err.kind, ErrorKind::Overflow);
    assert_eq!(err.message, "buffer not large enough for output");
}

#[rstest]
fn large_output_streams_in_pieces() {
    let items: Vec<String> = (0..5000).map(|i| format!("\"item-{i}\"")).collect();
    let text = format!("[{}]", items.join(","));
    let doc = parse_str(&text).unwrap();
    let mut out = Vec::new();
    encode::to_writer(doc.root(), &WriteOptions::new(), &mut out).unwrap();
    assert_eq!(out, text.as_bytes());
}
