use reqwest::cookie::{CookieStore, Jar};
use reqwest::Url;
use std::sync::Arc;

/// Read named cookies out of the client's cookie jar for one origin
#[derive(Clone)]
pub struct CookieAccessor {
    jar: Arc<Jar>,
    origin: Url,
}

impl CookieAccessor {
    pub fn new(jar: Arc<Jar>, origin: Url) -> Self {
        Self { jar, origin }
    }

    /// Decoded value of the cookie `name`, or `None` when the jar holds no
    /// such cookie for the origin.
    pub fn get(&self, name: &str) -> Option<String> {
        let header = self.jar.cookies(&self.origin)?;
        let header = header.to_str().ok()?;
        cookie_value(header, name).map(decode_component)
    }
}

/// Raw value of `name` in a `Cookie` header style string (`a=b; c=d`).
pub fn cookie_value<'a>(header: &'a str, name: &str) -> Option<&'a str> {
    if name.is_empty() {
        return None;
    }

    header
        .split(';')
        .map(str::trim_start)
        .find_map(|pair| {
            let (key, value) = pair.split_once('=')?;
            (key.trim_end() == name).then_some(value.trim_end())
        })
}

/// Decode a percent-encoded URI component.
///
/// `+` stays a literal plus. Malformed escapes or invalid UTF-8 leave the raw
/// text untouched.
pub fn decode_component(encoded: &str) -> String {
    match try_decode_component(encoded) {
        Some(decoded) => decoded,
        None => {
            tracing::warn!("Cookie value is not valid percent-encoding, using it verbatim");
            encoded.to_string()
        }
    }
}

fn try_decode_component(encoded: &str) -> Option<String> {
    let bytes = encoded.as_bytes();
    let mut decoded = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hex = bytes.get(i + 1..i + 3)?;
            // from_str_radix alone would accept a leading sign such as "%+1"
            if !hex.iter().all(u8::is_ascii_hexdigit) {
                return None;
            }
            let hex = std::str::from_utf8(hex).ok()?;
            decoded.push(u8::from_str_radix(hex, 16).ok()?);
            i += 3;
        } else {
            decoded.push(bytes[i]);
            i += 1;
        }
    }

    String::from_utf8(decoded).ok()
}
