//! URI handling for schema identifiers and references.
//!
//! Absolute URIs go through the `url` crate, which lowercases scheme and host
//! and drops default ports. Schemas without an identifier live under the empty
//! base, so fragment-only and relative references against it are resolved by
//! hand. Fragments are always stored in one normalized percent-encoding, so
//! `#/a%20b` and `#/a b` name the same location.

use jsv_core::Pointer;
use url::Url;

/// Split a URI at its first `#`.
pub fn split_fragment(uri: &str) -> (&str, Option<&str>) {
    match uri.split_once('#') {
        Some((main, fragment)) => (main, Some(fragment)),
        None => (uri, None),
    }
}

/// The URI without its fragment.
pub fn without_fragment(uri: &str) -> &str {
    split_fragment(uri).0
}

/// The decoded fragment, if any.
pub fn fragment(uri: &str) -> Option<String> {
    split_fragment(uri).1.map(percent_decode)
}

pub fn is_absolute(uri: &str) -> bool {
    Url::parse(uri).is_ok()
}

/// Normalize a URI so equal identifiers compare equal as strings. An empty
/// fragment is dropped.
pub fn canonicalize(uri: &str) -> String {
    let (main, fragment) = split_fragment(uri);
    let main = match Url::parse(main) {
        Ok(mut url) => {
            url.set_fragment(None);
            url.to_string()
        }
        Err(_) => main.to_string(),
    };
    match fragment {
        None | Some("") => main,
        Some(fragment) => format!("{main}#{}", encode_fragment(&percent_decode(fragment))),
    }
}

/// Resolve `reference` against `base` and canonicalize the result.
pub fn resolve(base: &str, reference: &str) -> String {
    if Url::parse(reference).is_ok() {
        return canonicalize(reference);
    }
    if let Ok(base_url) = Url::parse(base) {
        return match base_url.join(reference) {
            Ok(joined) => canonicalize(joined.as_str()),
            Err(_) => canonicalize(reference),
        };
    }
    let base = without_fragment(base);
    if reference.starts_with('#') {
        return canonicalize(&format!("{base}{reference}"));
    }
    if base.is_empty() || reference.starts_with('/') {
        return canonicalize(reference);
    }
    match base.rfind('/') {
        Some(slash) => canonicalize(&format!("{}{reference}", &base[..=slash])),
        None => canonicalize(reference),
    }
}

/// URI of a JSON Pointer inside the resource identified by `base`.
pub fn to_uri(pointer: &Pointer, base: &str) -> String {
    if pointer.is_empty() {
        return canonicalize(base);
    }
    format!(
        "{}#{}",
        without_fragment(&canonicalize(base)),
        encode_fragment(&pointer.to_string())
    )
}

/// Percent-encode the characters a fragment may not contain literally.
pub fn encode_fragment(fragment: &str) -> String {
    let mut result = String::with_capacity(fragment.len());
    for character in fragment.chars() {
        let reserved = matches!(
            character,
            '%' | ' ' | '"' | '<' | '>' | '\\' | '^' | '`' | '{' | '|' | '}' | '[' | ']' | '#'
        );
        if reserved || character.is_control() || !character.is_ascii() {
            let mut buffer = [0u8; 4];
            for byte in character.encode_utf8(&mut buffer).bytes() {
                result.push_str(&format!("%{byte:02X}"));
            }
        } else {
            result.push(character);
        }
    }
    result
}

/// Decode `%XX` escapes. Malformed escapes are kept literally.
pub fn percent_decode(input: &str) -> String {
    let bytes = input.as_bytes();
    let mut output = Vec::with_capacity(bytes.len());
    let mut index = 0;
    while index < bytes.len() {
        if bytes[index] == b'%' && index + 2 < bytes.len() {
            let high = (bytes[index + 1] as char).to_digit(16);
            let low = (bytes[index + 2] as char).to_digit(16);
            if let (Some(high), Some(low)) = (high, low) {
                output.push((high * 16 + low) as u8);
                index += 3;
                continue;
            }
        }
        output.push(bytes[index]);
        index += 1;
    }
    String::from_utf8_lossy(&output).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_form_normalizes_case_port_and_empty_fragment() {
        assert_eq!(
            canonicalize("HTTP://Example.COM:80/schema#"),
            "http://example.com/schema"
        );
        assert_eq!(
            canonicalize("http://json-schema.org/draft-07/schema#"),
            "http://json-schema.org/draft-07/schema"
        );
    }

    #[test]
    fn fragments_share_one_encoding() {
        assert_eq!(canonicalize("https://x.test/a#/b c"), canonicalize("https://x.test/a#/b%20c"));
        assert_eq!(fragment("https://x.test/a#/b%20c").as_deref(), Some("/b c"));
        assert_eq!(percent_decode("%7Efoo%2"), "~foo%2");
    }

    #[test]
    fn resolves_against_absolute_bases() {
        assert_eq!(
            resolve("https://example.com/schemas/root.json", "item.json#/$defs/a"),
            "https://example.com/schemas/item.json#/$defs/a"
        );
        assert_eq!(
            resolve("https://example.com/root.json", "#foo"),
            "https://example.com/root.json#foo"
        );
        assert_eq!(resolve("https://example.com/root.json", "urn:x:y"), "urn:x:y");
    }

    #[test]
    fn resolves_against_anonymous_bases() {
        assert_eq!(resolve("", "#/definitions/a"), "#/definitions/a");
        assert_eq!(resolve("", "#"), "");
        assert_eq!(resolve("", "other.json"), "other.json");
        assert_eq!(resolve("dir/root.json", "item.json#x"), "dir/item.json#x");
    }

    #[test]
    fn pointer_uris() {
        let pointer = Pointer::new().join("properties").join("a b");
        assert_eq!(to_uri(&pointer, ""), "#/properties/a%20b");
        assert_eq!(to_uri(&Pointer::new(), "https://x.test/s"), "https://x.test/s");
        assert_eq!(to_uri(&pointer, "https://x.test/s"), "https://x.test/s#/properties/a%20b");
    }
}
