//! `application/x-www-form-urlencoded` decoding.

use percent_encoding::percent_decode;

use crate::http::request::Params;

/// Split on `&`, then on the first `=`, and percent-decode both halves.
///
/// `+` is left as-is. Pairs without `=` map to an empty value. Duplicate keys
/// are last-wins.
pub fn parse(payload: &[u8]) -> Params {
    let mut fields = Params::new();

    for pair in payload.split(|b| *b == b'&') {
        if pair.is_empty() {
            continue;
        }
        let (key, value) = match pair.iter().position(|b| *b == b'=') {
            Some(eq) => (&pair[..eq], &pair[eq + 1..]),
            None => (pair, &[][..]),
        };
        fields.insert(decode(key), decode(value));
    }

    fields
}

fn decode(raw: &[u8]) -> String {
    percent_decode(raw).decode_utf8_lossy().into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_pairs() {
        let fields = parse(b"a=1&b=two%20words");
        assert_eq!(fields.get("a").map(String::as_str), Some("1"));
        assert_eq!(fields.get("b").map(String::as_str), Some("two words"));
    }

    #[test]
    fn test_value_containing_equals() {
        let fields = parse(b"token=abc==&expr=x%3Dy");
        assert_eq!(fields.get("token").map(String::as_str), Some("abc=="));
        assert_eq!(fields.get("expr").map(String::as_str), Some("x=y"));
    }

    #[test]
    fn test_last_wins_and_bare_keys() {
        let fields = parse(b"k=1&&k=2&flag");
        assert_eq!(fields.get("k").map(String::as_str), Some("2"));
        assert_eq!(fields.get("flag").map(String::as_str), Some(""));
        assert_eq!(fields.len(), 2);
    }

    #[test]
    fn test_encoded_keys() {
        let fields = parse(b"first%20name=Ada&plus=a+b");
        assert_eq!(fields.get("first name").map(String::as_str), Some("Ada"));
        assert_eq!(fields.get("plus").map(String::as_str), Some("a+b"));
    }
}
