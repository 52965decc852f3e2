use pooljson::reader::chunked;
use pooljson::{
    parse_each, parse_reader, parse_slice, parse_slice_with_options, parse_str, validate,
    validate_reader, validate_str, CallbackOp, ErrorKind, Kind, Outcome, ParseOptions, ValuePool,
};
use rstest::rstest;

#[rstest]
fn parses_every_kind() {
    let doc = parse_str(
        r#"{"n":null,"t":true,"f":false,"i":-42,"d":2.5,"big":12345678901234567890123,"s":"x\u00e9\ud83d\ude00","a":[],"o":{}}"#,
    )
    .unwrap();
    let root = doc.root();
    let kinds: Vec<Kind> = root.members().map(|m| m.kind()).collect();
    assert_eq!(
        kinds,
        [
            Kind::Null,
            Kind::True,
            Kind::False,
            Kind::Int,
            Kind::Decimal,
            Kind::BigNumber,
            Kind::String,
            Kind::Array,
            Kind::Object
        ]
    );
    assert_eq!(root.get("s").unwrap().as_str().unwrap(), "xé😀");
    assert_eq!(
        root.get("big").unwrap().as_number_str().unwrap(),
        "12345678901234567890123"
    );
}

#[rstest]
#[case("9223372036854775807", Kind::Int)]
#[case("9223372036854775808", Kind::BigNumber)]
#[case("-9223372036854775808", Kind::Int)]
#[case("1.5e3", Kind::Decimal)]
#[case("1e1024", Kind::BigNumber)]
#[case("0.123456789012345678", Kind::BigNumber)]
fn number_classes(#[case] text: &str, #[case] kind: Kind) {
    assert_eq!(parse_str(text).unwrap().root().kind(), kind);
}

#[rstest]
#[case("[1,2", ErrorKind::Incomplete)]
#[case("{\"a\" 1}", ErrorKind::Parse)]
#[case("[tru]", ErrorKind::Parse)]
#[case("\"\\ud800x\"", ErrorKind::Unicode)]
#[case("[1] x", ErrorKind::Parse)]
#[case("", ErrorKind::Incomplete)]
fn malformed_input(#[case] text: &str, #[case] kind: ErrorKind) {
    let err = parse_str(text).unwrap_err();
    assert_eq!(err.kind, kind, "{text:?}: {err}");
    assert!(validate_str(text).is_err());
}

#[rstest]
fn error_location_points_at_the_byte() {
    let err = parse_str("{\n  \"a\": tx\n}").unwrap_err();
    assert_eq!(err.kind, ErrorKind::Parse);
    assert_eq!(err.line(), Some(2));
}

#[rstest]
#[case("\"a\nb\"", 1, 3)]
#[case("[1,\n\"x\ny\"]", 2, 3)]
fn raw_newline_in_string_is_reported_on_its_own_line(
    #[case] text: &str,
    #[case] line: usize,
    #[case] column: usize,
) {
    let err = parse_str(text).unwrap_err();
    assert_eq!(err.kind, ErrorKind::Parse);
    assert_eq!((err.line(), err.column()), (Some(line), Some(column)));
}

#[rstest]
fn chunked_reader_matches_slice() {
    let text = r#"{"alpha":[1,2.25,"three",{"four":null}],"beta":"\u0041\n"}"#;
    for size in [1, 2, 3, 7] {
        let pieces: Vec<&str> = text
            .as_bytes()
            .chunks(size)
            .map(|chunk| std::str::from_utf8(chunk).unwrap())
            .collect();
        let doc = parse_reader(chunked(&pieces)).unwrap();
        let whole = parse_slice(text.as_bytes()).unwrap();
        assert_eq!(doc.to_json(0), whole.to_json(0));
        assert_eq!(doc.to_json(0), text.replace("\\u0041\\n", "A\\n"));
        validate_reader(chunked(&pieces)).unwrap();
    }
}

#[rstest]
fn comments_are_optional() {
    let text = b"// head\n{\"a\": /* inline */ 1}\n";
    assert!(validate(text).is_err());
    let doc = parse_slice_with_options(text, &ParseOptions::new().with_comments(true)).unwrap();
    assert_eq!(doc.to_json(0), r#"{"a":1}"#);
}

#[rstest]
fn each_document_reuses_the_pool() {
    let mut pool = ValuePool::new();
    let mut sums = Vec::new();
    let outcome = parse_each(&mut pool, b"[1,2] [3,4] [5,6]", |pool, root| {
        let sum: i64 = pool
            .get(root)
            .unwrap()
            .members()
            .map(|m| m.as_int().unwrap())
            .sum();
        sums.push(sum);
        CallbackOp::DESTROY
    })
    .unwrap();
    assert_eq!(outcome, Outcome::Complete);
    assert_eq!(sums, [3, 7, 11]);
    assert!(pool.is_empty());
}

#[rstest]
fn each_document_can_stop() {
    let mut pool = ValuePool::new();
    let mut seen = 0;
    let outcome = parse_each(&mut pool, b"1 2 3 4", |_, _| {
        seen += 1;
        if seen == 2 {
            CallbackOp::STOP
        } else {
            CallbackOp::CONTINUE
        }
    })
    .unwrap();
    assert_eq!(outcome, Outcome::Stopped);
    assert_eq!(seen, 2);
    assert_eq!(pool.len(), 2);
}
