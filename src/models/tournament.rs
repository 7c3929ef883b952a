use serde::Serialize;

/// Team sign-up for a tournament
#[derive(Debug, Clone, Serialize)]
pub struct TeamRegistration {
    #[serde(rename = "nombre")]
    pub name: String,
}

impl TeamRegistration {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}
