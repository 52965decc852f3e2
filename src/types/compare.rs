use std::cmp::Ordering;

use crate::arena::Data;
use crate::types::{Members, ValueRef};

/// Strict structural equality: kinds must match exactly and object members
/// are compared in order, keys included.
pub(crate) fn equal(a: ValueRef<'_>, b: ValueRef<'_>) -> bool {
    let mut pending = vec![(a, b)];
    while let Some((x, y)) = pending.pop() {
        if !same_node(x, y) {
            return false;
        }
        let (xs, ys) = (x.members(), y.members());
        if xs.len() != ys.len() {
            return false;
        }
        for (x, y) in xs.zip(ys) {
            if x.key() != y.key() {
                return false;
            }
            pending.push((x, y));
        }
    }
    true
}

/// Equality of the node alone; containers of the same kind match here.
fn same_node(a: ValueRef<'_>, b: ValueRef<'_>) -> bool {
    match (a.data(), b.data()) {
        (Data::Null, Data::Null) | (Data::True, Data::True) | (Data::False, Data::False) => true,
        (Data::Int(x), Data::Int(y)) => x == y,
        (Data::Decimal(x), Data::Decimal(y)) => x == y,
        (Data::Opaque(x), Data::Opaque(y)) => x == y,
        (Data::BigNumber(x), Data::BigNumber(y))
        | (Data::String(x), Data::String(y))
        | (Data::Word(x), Data::Word(y)) => a.pool().text(x) == b.pool().text(y),
        (Data::Array(_), Data::Array(_)) | (Data::Object(_), Data::Object(_)) => true,
        _ => false,
    }
}

fn rank(data: &Data) -> u8 {
    match data {
        Data::Null => 0,
        Data::False => 1,
        Data::True => 2,
        Data::Int(_) | Data::Decimal(_) | Data::BigNumber(_) => 3,
        Data::String(_) | Data::Word(_) => 4,
        Data::Array(_) => 5,
        Data::Object(_) => 6,
        Data::Opaque(_) => 7,
    }
}

fn numeric(value: ValueRef<'_>) -> f64 {
    match value.data() {
        Data::Int(x) => *x as f64,
        Data::Decimal(x) => *x,
        Data::BigNumber(text) => value.pool().text(text).parse().unwrap_or(f64::NAN),
        _ => f64::NAN,
    }
}

pub(crate) fn compare(a: ValueRef<'_>, b: ValueRef<'_>) -> Ordering {
    let order = compare_node(a, b);
    if order != Ordering::Equal || !a.kind().is_container() {
        return order;
    }
    let mut open: Vec<(Members<'_>, Members<'_>)> = vec![(a.members(), b.members())];
    while let Some((xs, ys)) = open.last_mut() {
        match (xs.next(), ys.next()) {
            (Some(x), Some(y)) => {
                let order = x.key().cmp(&y.key()).then_with(|| compare_node(x, y));
                if order != Ordering::Equal {
                    return order;
                }
                if x.kind().is_container() {
                    open.push((x.members(), y.members()));
                }
            }
            (Some(_), None) => return Ordering::Greater,
            (None, Some(_)) => return Ordering::Less,
            (None, None) => {
                open.pop();
            }
        }
    }
    Ordering::Equal
}

/// Ordering of the node alone; containers of the same kind tie here and
/// are ordered by their members.
fn compare_node(a: ValueRef<'_>, b: ValueRef<'_>) -> Ordering {
    let (x, y) = (a.data(), b.data());
    let by_rank = rank(x).cmp(&rank(y));
    if by_rank != Ordering::Equal {
        return by_rank;
    }
    match (x, y) {
        (Data::Int(x), Data::Int(y)) => x.cmp(y),
        (Data::BigNumber(x), Data::BigNumber(y))
            if a.pool().text(x) == b.pool().text(y) =>
        {
            Ordering::Equal
        }
        (Data::Int(_) | Data::Decimal(_) | Data::BigNumber(_), _) => {
            numeric(a).total_cmp(&numeric(b))
        }
        (Data::String(x) | Data::Word(x), Data::String(y) | Data::Word(y)) => {
            a.pool().text(x).cmp(b.pool().text(y))
        }
        (Data::Opaque(x), Data::Opaque(y)) => x.cmp(y),
        _ => Ordering::Equal,
    }
}

#[cfg(test)]
mod tests {
    use std::cmp::Ordering;

    use crate::parse_str;

    #[rstest::rstest]
    #[case("null", "false", Ordering::Less)]
    #[case("true", "false", Ordering::Greater)]
    #[case("1", "1.5", Ordering::Less)]
    #[case("2", "1.5", Ordering::Greater)]
    #[case("12345678901234567890", "1", Ordering::Greater)]
    #[case("\"abc\"", "\"abd\"", Ordering::Less)]
    #[case("[1,2]", "[1,2,0]", Ordering::Less)]
    #[case("[1,3]", "[1,2,0]", Ordering::Greater)]
    #[case("{\"a\":1}", "{\"a\":1}", Ordering::Equal)]
    #[case("\"z\"", "[]", Ordering::Less)]
    fn test_compare(#[case] left: &str, #[case] right: &str, #[case] expected: Ordering) {
        let a = parse_str(left).unwrap();
        let b = parse_str(right).unwrap();
        assert_eq!(a.root().cmp_value(b.root()), expected);
    }

    #[rstest::rstest]
    fn test_object_equality_is_order_sensitive() {
        let a = parse_str(r#"{"x":1,"y":2}"#).unwrap();
        let b = parse_str(r#"{"y":2,"x":1}"#).unwrap();
        let c = parse_str(r#"{ "x" : 1 , "y" : 2 }"#).unwrap();
        assert_ne!(a.root(), b.root());
        assert_ne!(a.root().cmp_value(b.root()), Ordering::Equal);
        assert_eq!(a.root(), c.root());
    }

    #[rstest::rstest]
    fn test_deep_trees_compare_without_recursion() {
        let depth = 40_000;
        let options = crate::ParseOptions::new().with_max_depth(depth + 1);
        let nested = |leaf: &str| format!("{}{leaf}{}", "[".repeat(depth), "]".repeat(depth));
        let parse = |text: String| crate::parse_slice_with_options(text.as_bytes(), &options).unwrap();
        let a = parse(nested("1"));
        let b = parse(nested("1"));
        let c = parse(nested("2"));
        assert_eq!(a.root(), b.root());
        assert_ne!(a.root(), c.root());
        assert_eq!(a.root().cmp_value(c.root()), Ordering::Less);
        assert_eq!(a.root().cmp_value(b.root()), Ordering::Equal);
    }

    #[rstest::rstest]
    fn test_equality_requires_same_kind() {
        let int = parse_str("1").unwrap();
        let decimal = parse_str("1.0").unwrap();
        assert_ne!(int.root(), decimal.root());
        assert_eq!(int.root().cmp_value(decimal.root()), Ordering::Equal);
    }
}
