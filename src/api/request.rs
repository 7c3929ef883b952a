use crate::core::error::ApiError;
use reqwest::multipart::{Form, Part};
use reqwest::Method;
use serde::Serialize;
use serde_json::Value;

/// One backend call: method, path relative to the base URL, payload
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub payload: Payload,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub enum Payload {
    #[default]
    Empty,
    Json(Value),
    Multipart(Vec<FormField>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct FormField {
    pub name: String,
    pub value: FormValue,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FormValue {
    Text(String),
    File {
        file_name: String,
        mime: String,
        bytes: Vec<u8>,
    },
}

impl FormField {
    pub fn text(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: FormValue::Text(value.into()),
        }
    }

    pub fn file(
        name: impl Into<String>,
        file_name: impl Into<String>,
        mime: impl Into<String>,
        bytes: Vec<u8>,
    ) -> Self {
        Self {
            name: name.into(),
            value: FormValue::File {
                file_name: file_name.into(),
                mime: mime.into(),
                bytes,
            },
        }
    }
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            payload: Payload::Empty,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    pub fn json<T: Serialize + ?Sized>(mut self, body: &T) -> Result<Self, ApiError> {
        let value = serde_json::to_value(body).map_err(|e| ApiError::Encode(e.to_string()))?;
        self.payload = Payload::Json(value);
        Ok(self)
    }

    pub fn form(mut self, fields: Vec<FormField>) -> Self {
        self.payload = Payload::Multipart(fields);
        self
    }

    pub fn is_multipart(&self) -> bool {
        matches!(self.payload, Payload::Multipart(_))
    }
}

impl Payload {
    pub(crate) fn into_form(fields: Vec<FormField>) -> Result<Form, ApiError> {
        let mut form = Form::new();
        for field in fields {
            form = match field.value {
                FormValue::Text(text) => form.text(field.name, text),
                FormValue::File {
                    file_name,
                    mime,
                    bytes,
                } => {
                    let part = Part::bytes(bytes)
                        .file_name(file_name)
                        .mime_str(&mime)
                        .map_err(|e| ApiError::Encode(format!("Invalid mime type '{mime}': {e}")))?;
                    form.part(field.name, part)
                }
            };
        }
        Ok(form)
    }
}

/// Percent-encode a caller-supplied value for use as one path segment.
///
/// Empty values and dot segments are rejected: URL parsing resolves `.`
/// and `..` (and their `%2e` forms) against the preceding path, so the
/// request would reach a different endpoint.
pub fn path_segment(value: &str) -> Result<String, ApiError> {
    if matches!(value, "" | "." | "..") {
        return Err(ApiError::Encode(format!(
            "'{value}' is not a valid path segment"
        )));
    }

    let mut encoded = String::with_capacity(value.len());
    for byte in value.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                encoded.push(byte as char)
            }
            _ => encoded.push_str(&format!("%{:02X}", byte)),
        }
    }
    Ok(encoded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_defaults_to_empty_get() {
        let request = ApiRequest::get("/api/cliente/clubs");
        assert_eq!(request.method, Method::GET);
        assert_eq!(request.payload, Payload::Empty);
        assert!(!request.is_multipart());
    }

    #[test]
    fn test_json_payload() {
        #[derive(Serialize)]
        struct Team<'a> {
            nombre: &'a str,
        }

        let request = ApiRequest::post("/api/cliente/torneos/3/unirse")
            .json(&Team { nombre: "Los Zurdos" })
            .unwrap();
        assert_eq!(request.payload, Payload::Json(json!({ "nombre": "Los Zurdos" })));
    }

    #[test]
    fn test_form_payload() {
        let request = ApiRequest::post("/api/cliente/perfil").form(vec![
            FormField::text("name", "Ana"),
            FormField::file("foto", "me.png", "image/png", vec![0x89, 0x50]),
        ]);
        assert!(request.is_multipart());
    }

    #[test]
    fn test_into_form_rejects_bad_mime() {
        let fields = vec![FormField::file("foto", "me.png", "not a mime", vec![1])];
        assert!(matches!(
            Payload::into_form(fields),
            Err(ApiError::Encode(_))
        ));
    }

    #[test]
    fn test_path_segment() {
        assert_eq!(path_segment("42").unwrap(), "42");
        assert_eq!(path_segment("AbC-9_x.~").unwrap(), "AbC-9_x.~");
        assert_eq!(path_segment("a/b").unwrap(), "a%2Fb");
        assert_eq!(path_segment("../admin").unwrap(), "..%2Fadmin");
        assert_eq!(path_segment("...").unwrap(), "...");
        assert_eq!(path_segment("código").unwrap(), "c%C3%B3digo");
    }

    #[test]
    fn test_path_segment_rejects_dot_segments() {
        for value in ["", ".", ".."] {
            assert!(
                matches!(path_segment(value), Err(ApiError::Encode(_))),
                "accepted {value:?}"
            );
        }
    }
}
