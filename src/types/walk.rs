use smallvec::SmallVec;

use crate::types::{Kind, Members, ValueRef};

/// One step of a depth-first walk.
pub(crate) enum Event<'p> {
    /// A value, with its key when it is an object member. Arrays and
    /// objects are entered here and left with a matching [`Event::Close`].
    Value(ValueRef<'p>, Option<&'p str>),
    Close { object: bool },
}

/// Depth-first walk over a tree on an explicit stack, so trees of any
/// depth can be visited.
pub(crate) struct Walk<'p> {
    start: Option<ValueRef<'p>>,
    open: SmallVec<[(Members<'p>, bool); 16]>,
}

impl<'p> Walk<'p> {
    pub(crate) fn new(root: ValueRef<'p>) -> Self {
        Self {
            start: Some(root),
            open: SmallVec::new(),
        }
    }

    fn enter(&mut self, value: ValueRef<'p>, key: Option<&'p str>) -> Event<'p> {
        match value.kind() {
            Kind::Array => self.open.push((value.members(), false)),
            Kind::Object => self.open.push((value.members(), true)),
            _ => {}
        }
        Event::Value(value, key)
    }
}

impl<'p> Iterator for Walk<'p> {
    type Item = Event<'p>;

    fn next(&mut self) -> Option<Event<'p>> {
        if let Some(root) = self.start.take() {
            return Some(self.enter(root, None));
        }
        let (members, object) = self.open.last_mut()?;
        let object = *object;
        match members.next() {
            Some(member) => {
                let key = object.then(|| member.key().unwrap_or(""));
                Some(self.enter(member, key))
            }
            None => {
                self.open.pop();
                Some(Event::Close { object })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse_str;

    fn trace(text: &str) -> String {
        let doc = parse_str(text).unwrap();
        let mut out = String::new();
        for event in Walk::new(doc.root()) {
            match event {
                Event::Value(value, key) => {
                    if let Some(key) = key {
                        out.push_str(key);
                        out.push('=');
                    }
                    out.push_str(value.type_name());
                    out.push(' ');
                }
                Event::Close { object: true } => out.push_str("} "),
                Event::Close { object: false } => out.push_str("] "),
            }
        }
        out
    }

    #[rstest::rstest]
    #[case("1", "int64 ")]
    #[case("[]", "array ] ")]
    #[case(r#"{"a":[1,{}],"b":null}"#, "object a=array int64 object } ] b=null } ")]
    fn test_event_order(#[case] text: &str, #[case] expected: &str) {
        assert_eq!(trace(text), expected);
    }

    #[rstest::rstest]
    fn test_deep_tree_does_not_recurse() {
        let depth = 50_000;
        let text = format!("{}{}", "[".repeat(depth), "]".repeat(depth));
        let options = crate::ParseOptions::new().with_max_depth(depth);
        let doc = crate::parse_slice_with_options(text.as_bytes(), &options).unwrap();
        let closes = Walk::new(doc.root())
            .filter(|event| matches!(event, Event::Close { .. }))
            .count();
        assert_eq!(closes, depth);
    }
}
