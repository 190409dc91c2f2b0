//! Percent-encoding rules shared by the uri components.
//!
//! Every component is encoded against its own allowed character class. A `%` that already
//! starts a valid `%XX` escape is kept as is, so already encoded input passes through
//! unchanged, while a stray `%` is re-encoded to `%25`.

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, percent_encode};

/// `ALPHA / DIGIT / "-" / "." / "_" / "~"`
const UNRESERVED: &AsciiSet = &NON_ALPHANUMERIC.remove(b'-').remove(b'.').remove(b'_').remove(b'~');

/// unreserved plus `"!" / "$" / "&" / "'" / "(" / ")" / "*" / "+" / "," / ";" / "="`
const USER_INFO: &AsciiSet = &UNRESERVED
    .remove(b'!')
    .remove(b'$')
    .remove(b'&')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')')
    .remove(b'*')
    .remove(b'+')
    .remove(b',')
    .remove(b';')
    .remove(b'=');

const PATH: &AsciiSet = &USER_INFO.remove(b':').remove(b'@').remove(b'/');

const QUERY_OR_FRAGMENT: &AsciiSet = &PATH.remove(b'?');

pub(crate) fn encode_user_info(input: &str) -> String {
    encode(input, USER_INFO)
}

pub(crate) fn encode_path(input: &str) -> String {
    encode(input, PATH)
}

pub(crate) fn encode_query_or_fragment(input: &str) -> String {
    encode(input, QUERY_OR_FRAGMENT)
}

fn encode(input: &str, set: &'static AsciiSet) -> String {
    let bytes = input.as_bytes();
    let mut encoded = String::with_capacity(input.len());

    let mut start = 0;
    let mut index = 0;
    while index < bytes.len() {
        if is_escape(&bytes[index..]) {
            encoded.extend(percent_encode(&bytes[start..index], set));
            encoded.push_str(&input[index..index + 3]);
            index += 3;
            start = index;
        } else {
            index += 1;
        }
    }
    encoded.extend(percent_encode(&bytes[start..], set));

    encoded
}

#[inline]
fn is_escape(bytes: &[u8]) -> bool {
    matches!(bytes, [b'%', high, low, ..] if high.is_ascii_hexdigit() && low.is_ascii_hexdigit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_keeps_its_delimiters() {
        assert_eq!(encode_path("/hello/world:1@x"), "/hello/world:1@x");
        assert_eq!(encode_path("/a b/c?d#e"), "/a%20b/c%3Fd%23e");
    }

    #[test]
    fn valid_escapes_are_not_encoded_twice() {
        assert_eq!(encode_path("/caf%C3%A9"), "/caf%C3%A9");
        assert_eq!(encode_query_or_fragment("a=%2F&b=%zz"), "a=%2F&b=%25zz");
        assert_eq!(encode_path("100%"), "100%25");
        assert_eq!(encode_path("%4"), "%254");
    }

    #[test]
    fn non_ascii_is_encoded_bytewise() {
        assert_eq!(encode_path("/café"), "/caf%C3%A9");
    }

    #[test]
    fn query_allows_question_mark() {
        assert_eq!(encode_query_or_fragment("q=a?b/c"), "q=a?b/c");
        assert_eq!(encode_query_or_fragment("q=[x]"), "q=%5Bx%5D");
    }

    #[test]
    fn user_info_encodes_gen_delims() {
        assert_eq!(encode_user_info("us:er@host"), "us%3Aer%40host");
        assert_eq!(encode_user_info("a!$&'()*+,;=b"), "a!$&'()*+,;=b");
        assert_eq!(encode_user_info("p%40ss"), "p%40ss");
    }
}
