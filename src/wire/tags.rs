//! Tag bytes of the wire format and the width rules shared by the encoder,
//! the decoder and the incremental builder.

pub(crate) const NULL: u8 = b'Z';
pub(crate) const TRUE: u8 = b't';
pub(crate) const FALSE: u8 = b'f';
pub(crate) const INT1: u8 = b'i';
pub(crate) const INT2: u8 = b'2';
pub(crate) const INT4: u8 = b'4';
pub(crate) const INT8: u8 = b'8';
pub(crate) const DECIMAL: u8 = b'd';
pub(crate) const UUID: u8 = b'u';
pub(crate) const TIME: u8 = b'T';
pub(crate) const OBJECT_START: u8 = b'{';
pub(crate) const OBJECT_END: u8 = b'}';
pub(crate) const ARRAY_START: u8 = b'[';
pub(crate) const ARRAY_END: u8 = b']';

/// Bytes in the big-endian length that opens every frame.
pub(crate) const PREFIX: usize = 4;

/// Values carried as length-prefixed bytes. The tag picks the width of the
/// length: one, two or four bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Family {
    String,
    Key,
    Number,
}

impl Family {
    const fn tags(self) -> [u8; 3] {
        match self {
            Family::String => [b's', b'S', b'B'],
            Family::Key => [b'k', b'K', b'C'],
            Family::Number => [b'n', b'N', b'b'],
        }
    }

    pub(crate) fn tag(self, len: usize) -> u8 {
        let tags = self.tags();
        match len_width(len) {
            1 => tags[0],
            2 => tags[1],
            _ => tags[2],
        }
    }

    /// Family and length width for a tag byte.
    pub(crate) fn of(tag: u8) -> Option<(Family, usize)> {
        [Family::String, Family::Key, Family::Number]
            .into_iter()
            .find_map(|family| {
                let position = family.tags().iter().position(|&t| t == tag)?;
                Some((family, [1, 2, 4][position]))
            })
    }
}

/// Bytes used for a length field.
pub(crate) fn len_width(len: usize) -> usize {
    if len <= 127 {
        1
    } else if len <= 32767 {
        2
    } else {
        4
    }
}

/// Smallest two's complement width that holds `value`.
pub(crate) fn int_width(value: i64) -> usize {
    if i8::try_from(value).is_ok() {
        1
    } else if i16::try_from(value).is_ok() {
        2
    } else if i32::try_from(value).is_ok() {
        4
    } else {
        8
    }
}

pub(crate) fn int_tag(width: usize) -> u8 {
    match width {
        1 => INT1,
        2 => INT2,
        4 => INT4,
        _ => INT8,
    }
}

pub(crate) fn int_tag_width(tag: u8) -> Option<usize> {
    match tag {
        INT1 => Some(1),
        INT2 => Some(2),
        INT4 => Some(4),
        INT8 => Some(8),
        _ => None,
    }
}
