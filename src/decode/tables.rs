//! Byte class tables driving the parser.
//!
//! Each table maps an input byte to the action the parser takes in one mode.
//! The extra slot at [`MODE_SLOT`] labels the table so error messages can
//! name the mode the parser was in.

use crate::constants::{MODE_SLOT, TABLE_SIZE};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Value,
    ArrayComma,
    After,
    FirstKey,
    Key,
    Colon,
    Negative,
    Zero,
    Digit,
    Dot,
    Fraction,
    ExpSign,
    ExpStart,
    Exponent,
    String,
    Escape,
    Unicode,
    Utf8,
    Trail,
}

impl Mode {
    pub fn label(self) -> char {
        match self {
            Mode::Value => 'v',
            Mode::ArrayComma => ',',
            Mode::After => 'a',
            Mode::FirstKey => 'K',
            Mode::Key => 'k',
            Mode::Colon => ':',
            Mode::Negative => '-',
            Mode::Zero => '0',
            Mode::Digit => 'd',
            Mode::Dot => '.',
            Mode::Fraction => 'f',
            Mode::ExpSign => 'x',
            Mode::ExpStart => 'z',
            Mode::Exponent => 'X',
            Mode::String => 's',
            Mode::Escape => '~',
            Mode::Unicode => 'u',
            Mode::Utf8 => '8',
            Mode::Trail => 'R',
        }
    }

    /// Modes in which the numeral read so far is complete.
    pub fn ends_number(self) -> bool {
        matches!(self, Mode::Zero | Mode::Digit | Mode::Fraction | Mode::Exponent)
    }

    /// Modes inside a numeral that still needs more digits.
    pub fn in_number(self) -> bool {
        matches!(
            self,
            Mode::Negative | Mode::Dot | Mode::ExpSign | Mode::ExpStart
        ) || self.ends_number()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Error,
    Skip,
    Newline,
    Comment,
    BeginNull,
    BeginTrue,
    BeginFalse,
    BeginNegative,
    BeginZero,
    BeginDigit,
    BeginString,
    OpenArray,
    OpenObject,
    CloseArray,
    CloseObject,
    Comma,
    KeyQuote,
    Colon,
    IntZero,
    IntDigit,
    Dot,
    FracDigit,
    ExpMark,
    ExpSign,
    ExpDigit,
    NumEnd,
    StrByte,
    StrEnd,
    StrEscape,
    Utf8Lead2,
    Utf8Lead3,
    Utf8Lead4,
    Utf8Cont,
    EscChar,
    EscUnicode,
    HexDigit,
    Label(Mode),
}

pub type ByteClassTable = [Action; TABLE_SIZE];

const fn blank(mode: Mode) -> ByteClassTable {
    let mut table = [Action::Error; TABLE_SIZE];
    table[MODE_SLOT] = Action::Label(mode);
    table
}

const fn set(mut table: ByteClassTable, bytes: &[u8], action: Action) -> ByteClassTable {
    let mut i = 0;
    while i < bytes.len() {
        table[bytes[i] as usize] = action;
        i += 1;
    }
    table
}

const fn range(mut table: ByteClassTable, low: u8, high: u8, action: Action) -> ByteClassTable {
    let mut byte = low as usize;
    while byte <= high as usize {
        table[byte] = action;
        byte += 1;
    }
    table
}

const fn whitespace(table: ByteClassTable) -> ByteClassTable {
    let table = set(table, b" \t\r", Action::Skip);
    let table = set(table, b"\n", Action::Newline);
    set(table, b"/", Action::Comment)
}

const fn value_start(table: ByteClassTable) -> ByteClassTable {
    let table = set(table, b"n", Action::BeginNull);
    let table = set(table, b"t", Action::BeginTrue);
    let table = set(table, b"f", Action::BeginFalse);
    let table = set(table, b"-", Action::BeginNegative);
    let table = set(table, b"0", Action::BeginZero);
    let table = range(table, b'1', b'9', Action::BeginDigit);
    let table = set(table, b"\"", Action::BeginString);
    let table = set(table, b"[", Action::OpenArray);
    set(table, b"{", Action::OpenObject)
}

const fn number_end(table: ByteClassTable) -> ByteClassTable {
    set(table, b" \t\r\n,]}/", Action::NumEnd)
}

const fn exponent_mark(table: ByteClassTable) -> ByteClassTable {
    set(table, b"eE", Action::ExpMark)
}

const fn build_value() -> ByteClassTable {
    let table = whitespace(value_start(blank(Mode::Value)));
    let table = set(table, b"]", Action::CloseArray);
    set(table, b"}", Action::CloseObject)
}

const fn build_after() -> ByteClassTable {
    let table = whitespace(blank(Mode::After));
    let table = set(table, b",", Action::Comma);
    let table = set(table, b"]", Action::CloseArray);
    set(table, b"}", Action::CloseObject)
}

const fn build_first_key() -> ByteClassTable {
    let table = whitespace(blank(Mode::FirstKey));
    let table = set(table, b"\"", Action::KeyQuote);
    set(table, b"}", Action::CloseObject)
}

const fn build_digit() -> ByteClassTable {
    let table = number_end(exponent_mark(blank(Mode::Digit)));
    let table = range(table, b'0', b'9', Action::IntDigit);
    set(table, b".", Action::Dot)
}

const fn build_zero() -> ByteClassTable {
    let table = number_end(exponent_mark(blank(Mode::Zero)));
    set(table, b".", Action::Dot)
}

const fn build_string() -> ByteClassTable {
    let table = range(blank(Mode::String), 0x20, 0x7f, Action::StrByte);
    let table = set(table, b"\"", Action::StrEnd);
    let table = set(table, b"\\", Action::StrEscape);
    let table = range(table, 0xc0, 0xdf, Action::Utf8Lead2);
    let table = range(table, 0xe0, 0xef, Action::Utf8Lead3);
    range(table, 0xf0, 0xf7, Action::Utf8Lead4)
}

const fn build_unicode() -> ByteClassTable {
    let table = range(blank(Mode::Unicode), b'0', b'9', Action::HexDigit);
    let table = range(table, b'a', b'f', Action::HexDigit);
    range(table, b'A', b'F', Action::HexDigit)
}

pub static VALUE: ByteClassTable = build_value();
pub static ARRAY_COMMA: ByteClassTable = whitespace(value_start(blank(Mode::ArrayComma)));
pub static AFTER: ByteClassTable = build_after();
pub static FIRST_KEY: ByteClassTable = build_first_key();
pub static KEY: ByteClassTable = set(whitespace(blank(Mode::Key)), b"\"", Action::KeyQuote);
pub static COLON: ByteClassTable = set(whitespace(blank(Mode::Colon)), b":", Action::Colon);
pub static NEGATIVE: ByteClassTable = range(
    set(blank(Mode::Negative), b"0", Action::IntZero),
    b'1',
    b'9',
    Action::IntDigit,
);
pub static ZERO: ByteClassTable = build_zero();
pub static DIGIT: ByteClassTable = build_digit();
pub static DOT: ByteClassTable = range(blank(Mode::Dot), b'0', b'9', Action::FracDigit);
pub static FRACTION: ByteClassTable = number_end(exponent_mark(range(
    blank(Mode::Fraction),
    b'0',
    b'9',
    Action::FracDigit,
)));
pub static EXP_SIGN: ByteClassTable = range(
    set(blank(Mode::ExpSign), b"+-", Action::ExpSign),
    b'0',
    b'9',
    Action::ExpDigit,
);
pub static EXP_START: ByteClassTable = range(blank(Mode::ExpStart), b'0', b'9', Action::ExpDigit);
pub static EXPONENT: ByteClassTable =
    number_end(range(blank(Mode::Exponent), b'0', b'9', Action::ExpDigit));
pub static STRING: ByteClassTable = build_string();
pub static ESCAPE: ByteClassTable = set(
    set(blank(Mode::Escape), b"\"\\/bfnrt", Action::EscChar),
    b"u",
    Action::EscUnicode,
);
pub static UNICODE: ByteClassTable = build_unicode();
pub static UTF8: ByteClassTable = range(blank(Mode::Utf8), 0x80, 0xbf, Action::Utf8Cont);
pub static TRAIL: ByteClassTable = whitespace(blank(Mode::Trail));

pub fn table(mode: Mode) -> &'static ByteClassTable {
    match mode {
        Mode::Value => &VALUE,
        Mode::ArrayComma => &ARRAY_COMMA,
        Mode::After => &AFTER,
        Mode::FirstKey => &FIRST_KEY,
        Mode::Key => &KEY,
        Mode::Colon => &COLON,
        Mode::Negative => &NEGATIVE,
        Mode::Zero => &ZERO,
        Mode::Digit => &DIGIT,
        Mode::Dot => &DOT,
        Mode::Fraction => &FRACTION,
        Mode::ExpSign => &EXP_SIGN,
        Mode::ExpStart => &EXP_START,
        Mode::Exponent => &EXPONENT,
        Mode::String => &STRING,
        Mode::Escape => &ESCAPE,
        Mode::Unicode => &UNICODE,
        Mode::Utf8 => &UTF8,
        Mode::Trail => &TRAIL,
    }
}

/// Mode a table was built for, read from its label slot.
pub fn mode_of(table: &ByteClassTable) -> Mode {
    match table[MODE_SLOT] {
        Action::Label(mode) => mode,
        _ => Mode::Value,
    }
}

/// Mode a numeral moves to after `action`, or `None` when the action does
/// not continue a numeral.
pub fn number_step(action: Action) -> Option<Mode> {
    match action {
        Action::BeginNegative => Some(Mode::Negative),
        Action::BeginZero | Action::IntZero => Some(Mode::Zero),
        Action::BeginDigit | Action::IntDigit => Some(Mode::Digit),
        Action::Dot => Some(Mode::Dot),
        Action::FracDigit => Some(Mode::Fraction),
        Action::ExpMark => Some(Mode::ExpSign),
        Action::ExpSign => Some(Mode::ExpStart),
        Action::ExpDigit => Some(Mode::Exponent),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [Mode; 19] = [
        Mode::Value,
        Mode::ArrayComma,
        Mode::After,
        Mode::FirstKey,
        Mode::Key,
        Mode::Colon,
        Mode::Negative,
        Mode::Zero,
        Mode::Digit,
        Mode::Dot,
        Mode::Fraction,
        Mode::ExpSign,
        Mode::ExpStart,
        Mode::Exponent,
        Mode::String,
        Mode::Escape,
        Mode::Unicode,
        Mode::Utf8,
        Mode::Trail,
    ];

    #[rstest::rstest]
    fn test_every_table_is_labeled() {
        for mode in ALL {
            assert_eq!(mode_of(table(mode)), mode);
        }
    }

    #[rstest::rstest]
    #[case(Mode::Value, b'{', Action::OpenObject)]
    #[case(Mode::Value, b'\n', Action::Newline)]
    #[case(Mode::Value, b'x', Action::Error)]
    #[case(Mode::ArrayComma, b']', Action::Error)]
    #[case(Mode::After, b',', Action::Comma)]
    #[case(Mode::FirstKey, b'}', Action::CloseObject)]
    #[case(Mode::Key, b'}', Action::Error)]
    #[case(Mode::Zero, b'5', Action::Error)]
    #[case(Mode::Zero, b'e', Action::ExpMark)]
    #[case(Mode::Digit, b']', Action::NumEnd)]
    #[case(Mode::Dot, b'e', Action::Error)]
    #[case(Mode::Fraction, b'.', Action::Error)]
    #[case(Mode::ExpSign, b'+', Action::ExpSign)]
    #[case(Mode::Exponent, b'e', Action::Error)]
    #[case(Mode::String, b'\t', Action::Error)]
    #[case(Mode::String, 0xf8, Action::Error)]
    #[case(Mode::String, 0xe3, Action::Utf8Lead3)]
    #[case(Mode::Escape, b'/', Action::EscChar)]
    #[case(Mode::Unicode, b'G', Action::Error)]
    #[case(Mode::Trail, b'{', Action::Error)]
    fn test_transitions(#[case] mode: Mode, #[case] byte: u8, #[case] action: Action) {
        assert_eq!(table(mode)[byte as usize], action);
    }

    #[rstest::rstest]
    fn test_trail_accepts_only_whitespace() {
        for byte in 0..=255u8 {
            let action = TRAIL[byte as usize];
            let expected = matches!(byte, b' ' | b'\t' | b'\r' | b'\n' | b'/');
            assert_eq!(action != Action::Error, expected, "byte {byte:#04x}");
        }
    }

    #[rstest::rstest]
    fn test_labels_are_distinct() {
        let mut labels: Vec<char> = ALL.iter().map(|mode| mode.label()).collect();
        labels.sort_unstable();
        labels.dedup();
        assert_eq!(labels.len(), ALL.len());
    }
}
