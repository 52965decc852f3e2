use pooljson::wire::{self, special};
use pooljson::{parse_str, CallbackOp, ErrorKind, Outcome, WireBuilder, WireItem, WireVisitor};
use rstest::rstest;

#[rstest]
fn frames_carry_their_length() {
    let doc = parse_str(r#"{"abc":1,"def":2}"#).unwrap();
    let frame = wire::to_vec(doc.root()).unwrap();
    assert_eq!(
        frame,
        b"\x00\x00\x00\x10{k\x03abci\x01k\x03defi\x02}".to_vec()
    );
}

#[rstest]
#[case("\"hello\"", b"s\x05hello".as_slice())]
#[case("-40000", b"4\xff\xff\x63\xc0".as_slice())]
#[case("300", b"2\x01\x2c".as_slice())]
#[case("5000000000", b"8\x00\x00\x00\x01\x2a\x05\xf2\x00".as_slice())]
#[case("false", b"f".as_slice())]
#[case("123456789012345678901234567890", b"n\x1e123456789012345678901234567890".as_slice())]
fn scalar_bodies(#[case] json: &str, #[case] body: &[u8]) {
    let doc = parse_str(json).unwrap();
    let frame = wire::to_vec(doc.root()).unwrap();
    assert_eq!(&frame[4..], body);
}

#[rstest]
fn long_strings_use_wider_lengths() {
    let medium = "m".repeat(200);
    let long = "l".repeat(40_000);
    let doc = parse_str(&format!("[\"{medium}\",\"{long}\"]")).unwrap();
    let frame = wire::to_vec(doc.root()).unwrap();
    assert_eq!(&frame[5..8], b"S\x00\xc8");
    let at = 8 + 200;
    assert_eq!(&frame[at..at + 5], b"B\x00\x00\x9c\x40");
    let back = wire::parse(&frame).unwrap();
    assert_eq!(back.root(), doc.root());
}

#[rstest]
fn packed_strings_come_back_unchanged() {
    let json = r#"{"id":"6ba7b810-9dad-11d1-80b4-00c04fd430c8","at":"2024-02-29T23:59:59.999999999Z","not":"2024-02-30T00:00:00.000000000Z"}"#;
    let doc = parse_str(json).unwrap();
    let frame = wire::to_vec(doc.root()).unwrap();
    assert_eq!(frame[4 + 1 + 4], b'u');
    let back = wire::parse(&frame).unwrap();
    assert_eq!(back.to_json(0), json);
    assert_eq!(wire::to_json(&frame, 0).unwrap(), json);
    assert!(special::parse_time("2024-02-30T00:00:00.000000000Z").is_none());
}

#[rstest]
fn decimals_use_fifteen_digits() {
    let doc = parse_str("[3.0, 0.1, 1e300]").unwrap();
    let frame = wire::to_vec(doc.root()).unwrap();
    assert_eq!(&frame[5..11], b"d\x033.0d\x03");
    assert_eq!(wire::to_json(&frame, 0).unwrap(), "[3.0,0.1,1e300]");
}

#[rstest]
fn builder_and_encoder_agree() {
    let mut b = WireBuilder::new();
    b.push_array(None).unwrap();
    b.push_str(None, "6ba7b810-9dad-11d1-80b4-00c04fd430c8").unwrap();
    b.push_double(None, 12.3).unwrap();
    b.push_number(None, "1e2000").unwrap();
    let built = b.finish().unwrap();

    let doc = parse_str(r#"["6ba7b810-9dad-11d1-80b4-00c04fd430c8",12.3,1e2000]"#).unwrap();
    assert_eq!(built, wire::to_vec(doc.root()).unwrap());
}

#[rstest]
fn visitor_sees_packed_items() {
    #[derive(Default)]
    struct Collect(Vec<String>);

    impl WireVisitor for Collect {
        fn item(&mut self, key: Option<&str>, item: WireItem<'_>) -> CallbackOp {
            let text = match item {
                WireItem::Uuid(..) => "uuid".to_string(),
                WireItem::Time(nanos) => format!("time {nanos}"),
                other => format!("{other:?}"),
            };
            self.0.push(format!("{}{text}", key.map(|k| format!("{k}:")).unwrap_or_default()));
            CallbackOp::CONTINUE
        }

        fn end(&mut self) -> CallbackOp {
            self.0.push("end".to_string());
            CallbackOp::CONTINUE
        }
    }

    let doc = parse_str(
        r#"{"u":"6ba7b810-9dad-11d1-80b4-00c04fd430c8","t":"1970-01-01T00:00:01.000000000Z"}"#,
    )
    .unwrap();
    let frame = wire::to_vec(doc.root()).unwrap();
    let mut visitor = Collect::default();
    assert_eq!(wire::visit(&frame, &mut visitor).unwrap(), Outcome::Complete);
    assert_eq!(visitor.0, ["Object", "u:uuid", "t:time 1000000000", "end"]);
}

#[rstest]
#[case(b"\x00\x00\x00\x02[Z".as_slice(), ErrorKind::Incomplete)]
#[case(b"\x00\x00\x00\x01?".as_slice(), ErrorKind::Parse)]
#[case(b"\x00\x00\x00".as_slice(), ErrorKind::Incomplete)]
#[case(b"\x00\x00\x00\x00".as_slice(), ErrorKind::Incomplete)]
#[case(b"\x00\x00\x00\x03d\x01x".as_slice(), ErrorKind::Parse)]
fn broken_frames(#[case] frame: &[u8], #[case] kind: ErrorKind) {
    assert_eq!(wire::parse(frame).unwrap_err().kind, kind);
    assert_eq!(wire::to_json(frame, 0).unwrap_err().kind, kind);
}

const SAMPLE: &str = r#"{
  "nil":null,
  "yes":true,
  "no":false,
  "int":12345,
  "array":[
    -23,
    1.23,
    "string",
    "123e4567-e89b-12d3-a456-426655440000",
    "2017-03-14T15:09:26.123456789Z"
  ]
}"#;

const SAMPLE_FRAME: [u8; 82] = [
    0x00, 0x00, 0x00, 0x4e, 0x7b, 0x6b, 0x03, 0x6e, 0x69, 0x6c, 0x5a, 0x6b, 0x03, 0x79, 0x65, 0x73,
    0x74, 0x6b, 0x02, 0x6e, 0x6f, 0x66, 0x6b, 0x03, 0x69, 0x6e, 0x74, 0x32, 0x30, 0x39, 0x6b, 0x05,
    0x61, 0x72, 0x72, 0x61, 0x79, 0x5b, 0x69, 0xe9, 0x64, 0x04, 0x31, 0x2e, 0x32, 0x33, 0x73, 0x06,
    0x73, 0x74, 0x72, 0x69, 0x6e, 0x67, 0x75, 0x12, 0x3e, 0x45, 0x67, 0xe8, 0x9b, 0x12, 0xd3, 0xa4,
    0x56, 0x42, 0x66, 0x55, 0x44, 0x00, 0x00, 0x54, 0x14, 0xab, 0xc8, 0x25, 0xb9, 0x40, 0xc9, 0x15,
    0x5d, 0x7d,
];

#[rstest]
fn sample_document_encodes_byte_for_byte() {
    let doc = parse_str(SAMPLE).unwrap();
    assert_eq!(wire::size(doc.root()), SAMPLE_FRAME.len());
    assert_eq!(wire::to_vec(doc.root()).unwrap(), SAMPLE_FRAME);

    let mut buf = [0u8; 128];
    let used = wire::fill(doc.root(), &mut buf).unwrap();
    assert_eq!(&buf[..used], SAMPLE_FRAME.as_slice());

    let back = wire::parse(&SAMPLE_FRAME).unwrap();
    assert_eq!(back.root(), doc.root());
}

#[rstest]
#[case(WireBuilder::new())]
#[case(WireBuilder::with_limit(SAMPLE_FRAME.len()))]
fn sample_document_builds_byte_for_byte(#[case] b: WireBuilder) {
    let mut b = b;
    b.push_object(None).unwrap();
    b.push_null(Some("nil")).unwrap();
    b.push_bool(Some("yes"), true).unwrap();
    b.push_bool(Some("no"), false).unwrap();
    b.push_int(Some("int"), 12345).unwrap();
    b.push_array(Some("array")).unwrap();
    b.push_int(None, -23).unwrap();
    b.push_double(None, 1.23).unwrap();
    b.push_str(None, "string").unwrap();
    b.push_uuid_str(None, "123e4567-e89b-12d3-a456-426655440000").unwrap();
    b.push_time(None, 1_489_504_166_123_456_789).unwrap();
    assert_eq!(b.finish().unwrap(), SAMPLE_FRAME);
}

#[rstest]
#[case(127, 1)]
#[case(128, 2)]
#[case(-128, 1)]
#[case(-129, 2)]
#[case(32767, 2)]
#[case(32768, 4)]
#[case(-32769, 4)]
#[case(2147483647, 4)]
#[case(2147483648, 8)]
#[case(i64::MIN, 8)]
fn integers_take_the_smallest_width(#[case] value: i64, #[case] width: usize) {
    let doc = parse_str(&value.to_string()).unwrap();
    let frame = wire::to_vec(doc.root()).unwrap();
    assert_eq!(wire::size(doc.root()), frame.len());
    assert_eq!(frame.len(), 4 + 1 + width);

    let back = wire::parse(&frame).unwrap();
    assert_eq!(back.root(), doc.root());
    assert_eq!(back.root().as_int().unwrap(), value);

    let list = parse_str(&format!("[{value},{value}]")).unwrap();
    let frame = wire::to_vec(list.root()).unwrap();
    assert_eq!(frame.len(), 4 + 2 + 2 * (1 + width));
    assert_eq!(wire::parse(&frame).unwrap().root(), list.root());
}
