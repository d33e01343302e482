//! Percent-encoding sets used when normalizing URL components.
//!
//! Normalization only decodes escapes of unreserved characters. Every other
//! escape keeps its octet with upper-cased hex, so `%3B` never turns into a
//! live `;` and non-UTF-8 octets such as `%FF` survive untouched. Raw
//! characters outside a component's set are escaped.

use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

/// RFC 3986 unreserved characters stay literal, everything else is escaped.
pub(crate) const UNRESERVED: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

const SUB_DELIMS: &AsciiSet = &UNRESERVED
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

pub(crate) const USERINFO: &AsciiSet = SUB_DELIMS;

pub(crate) const HOST: &AsciiSet = SUB_DELIMS;

pub(crate) const PATH_SEGMENT: &AsciiSet = &SUB_DELIMS.remove(b':').remove(b'@');

pub(crate) const FRAGMENT: &AsciiSet = &PATH_SEGMENT.remove(b'/').remove(b'?');

/// Decodes `%XX` escapes, replacing invalid UTF-8 with U+FFFD.
pub(crate) fn decode(input: &str) -> String {
    percent_decode_str(input).decode_utf8_lossy().into_owned()
}

/// Encodes `input` with `set`.
pub(crate) fn encode(input: &str, set: &'static AsciiSet) -> String {
    utf8_percent_encode(input, set).to_string()
}

fn hex_value(digit: u8) -> Option<u8> {
    match digit {
        b'0'..=b'9' => Some(digit - b'0'),
        b'a'..=b'f' => Some(digit - b'a' + 10),
        b'A'..=b'F' => Some(digit - b'A' + 10),
        _ => None,
    }
}

fn is_unreserved(octet: u8) -> bool {
    octet.is_ascii_alphanumeric() || matches!(octet, b'-' | b'.' | b'_' | b'~')
}

/// Rewrites `input` into its RFC 3986 normal form for a component using `set`.
///
/// Equivalent spellings (`%7e` and `~`, `%2f` and `%2F`) collapse to one
/// form while distinct octets stay distinct. A `%` that does not start a
/// valid escape is itself escaped.
pub(crate) fn normalize(input: &str, set: &'static AsciiSet) -> String {
    let bytes = input.as_bytes();
    let mut out = String::with_capacity(input.len());
    let mut run_start = 0;
    let mut index = 0;

    while index < bytes.len() {
        let escaped = match bytes.get(index + 1..index + 3) {
            Some(&[high, low]) if bytes[index] == b'%' => {
                hex_value(high).zip(hex_value(low)).map(|(h, l)| (h << 4) | l)
            }
            _ => None,
        };

        let Some(octet) = escaped else {
            index += 1;
            continue;
        };

        out.push_str(&encode(&input[run_start..index], set));
        if is_unreserved(octet) {
            out.push(char::from(octet));
        } else {
            out.push_str(&format!("%{octet:02X}"));
        }
        index += 3;
        run_start = index;
    }

    out.push_str(&encode(&input[run_start..], set));
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_uppercases_existing_escapes() {
        assert_eq!(normalize("a%2fb", PATH_SEGMENT), "a%2Fb");
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let once = normalize("hello world/ü", PATH_SEGMENT);
        assert_eq!(once, "hello%20world%2F%C3%BC");
        assert_eq!(normalize(&once, PATH_SEGMENT), once);
    }

    #[test]
    fn test_unreserved_characters_stay_literal() {
        assert_eq!(normalize("a-b.c_d~e", UNRESERVED), "a-b.c_d~e");
        assert_eq!(normalize("%7E", UNRESERVED), "~");
    }

    #[test]
    fn test_non_utf8_escapes_are_preserved() {
        assert_eq!(normalize("a%FFb", PATH_SEGMENT), "a%FFb");
        assert_eq!(normalize("%ff%c3", PATH_SEGMENT), "%FF%C3");
    }

    #[test]
    fn test_escaped_delimiters_stay_escaped() {
        assert_eq!(normalize("b;%3Bx", PATH_SEGMENT), "b;%3Bx");
        assert_eq!(normalize("k%3dv%40h", PATH_SEGMENT), "k%3Dv%40h");
        assert_eq!(normalize("%2f", PATH_SEGMENT), "%2F");
    }

    #[test]
    fn test_stray_percent_is_escaped() {
        assert_eq!(normalize("100%", PATH_SEGMENT), "100%25");
        assert_eq!(normalize("%zz%4", PATH_SEGMENT), "%25zz%254");
        assert_eq!(normalize(&normalize("100%", PATH_SEGMENT), PATH_SEGMENT), "100%25");
    }

    #[test]
    fn test_userinfo_escapes_colon_and_at() {
        assert_eq!(normalize("us:er@x", USERINFO), "us%3Aer%40x");
    }
}
