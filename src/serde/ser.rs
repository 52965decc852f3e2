use ::serde::ser::{Error as _, Serialize, SerializeMap, SerializeSeq, Serializer};

use crate::arena::Data;
use crate::constants::SERIALIZE_MAX_DEPTH;
use crate::ValueRef;

/// Feeds a tree to any serde serializer. Big numbers go out as their
/// verbatim text and opaque handles as unit, mirroring the text writer.
///
/// Serializers recurse, so trees nested deeper than [`SERIALIZE_MAX_DEPTH`]
/// are refused with a custom error instead of exhausting the stack.
impl Serialize for ValueRef<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        Nested {
            value: *self,
            depth: 0,
        }
        .serialize(serializer)
    }
}

struct Nested<'p> {
    value: ValueRef<'p>,
    depth: usize,
}

impl Nested<'_> {
    fn member<'m>(&self, value: ValueRef<'m>) -> Nested<'m> {
        Nested {
            value,
            depth: self.depth + 1,
        }
    }
}

impl Serialize for Nested<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let value = self.value;
        let pool = value.pool();
        if value.kind().is_container() && self.depth >= SERIALIZE_MAX_DEPTH {
            return Err(S::Error::custom(format!(
                "nesting exceeds the limit of {SERIALIZE_MAX_DEPTH} levels"
            )));
        }
        match value.data() {
            Data::Null | Data::Opaque(_) => serializer.serialize_unit(),
            Data::True => serializer.serialize_bool(true),
            Data::False => serializer.serialize_bool(false),
            Data::Int(number) => serializer.serialize_i64(*number),
            Data::Decimal(number) => serializer.serialize_f64(*number),
            Data::BigNumber(text) | Data::String(text) | Data::Word(text) => {
                serializer.serialize_str(pool.text(text))
            }
            Data::Array(members) => {
                let mut seq = serializer.serialize_seq(Some(members.len()))?;
                for member in value.members() {
                    seq.serialize_element(&self.member(member))?;
                }
                seq.end()
            }
            Data::Object(object) => {
                let mut map = serializer.serialize_map(Some(object.members.len()))?;
                for member in value.members() {
                    map.serialize_entry(member.key().unwrap_or(""), &self.member(member))?;
                }
                map.end()
            }
        }
    }
}

impl Serialize for crate::Document {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.root().serialize(serializer)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use crate::{parse_str, ValuePool};

    #[rstest::rstest]
    fn test_matches_serde_json() {
        let doc = parse_str(r#"{"a":[1,2.5,null,true],"b":{"c":"d"},"big":123456789012345678901234567890}"#)
            .unwrap();
        let value = serde_json::to_value(doc.root()).unwrap();
        assert_eq!(
            value,
            json!({"a": [1, 2.5, null, true], "b": {"c": "d"}, "big": "123456789012345678901234567890"})
        );
        assert_eq!(serde_json::to_value(&doc).unwrap(), value);
    }

    #[rstest::rstest]
    fn test_depth_is_bounded() {
        let mut pool = ValuePool::new();
        let root = pool.create_array();
        let mut parent = root;
        for _ in 0..crate::constants::SERIALIZE_MAX_DEPTH {
            let child = pool.create_array();
            pool.array_append(parent, child).unwrap();
            parent = child;
        }
        let err = serde_json::to_string(&pool.get(root).unwrap()).unwrap_err();
        assert!(err.to_string().contains("nesting exceeds the limit"));

        let leaf = pool.get(root).unwrap().members().next().unwrap();
        let text = serde_json::to_string(&leaf).unwrap();
        assert_eq!(text.len(), 2 * crate::constants::SERIALIZE_MAX_DEPTH);
    }

    #[rstest::rstest]
    fn test_word_and_opaque() {
        let mut pool = ValuePool::new();
        let array = pool.create_array();
        let word = pool.create_word("w");
        let opaque = pool.create_opaque(1);
        pool.array_append(array, word).unwrap();
        pool.array_append(array, opaque).unwrap();
        let text = serde_json::to_string(&pool.get(array).unwrap()).unwrap();
        assert_eq!(text, r#"["w",null]"#);
    }
}
