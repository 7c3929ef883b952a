use crate::api::request::FormField;
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }
}

/// Image attached to a registration or profile update
#[derive(Debug, Clone, PartialEq)]
pub struct Photo {
    pub file_name: String,
    pub mime: String,
    pub bytes: Vec<u8>,
}

/// Player profile as submitted to the register and profile-update endpoints.
/// Unset optional fields are sent as empty strings.
#[derive(Debug, Clone, Default)]
pub struct ProfileForm {
    pub name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub password: String,
    pub birth_date: Option<String>,
    pub phone: Option<String>,
    pub dominant_hand: Option<String>,
    pub court_position: Option<String>,
    pub favorite_shot: Option<String>,
    pub play_frequency: Option<String>,
    pub play_style: Option<String>,
    pub category: Option<String>,
    pub achievement_id: Option<u64>,
    pub photo: Option<Photo>,
}

impl ProfileForm {
    /// Multipart fields for registration
    pub fn registration_fields(&self) -> Vec<FormField> {
        let mut fields = self.common_fields();
        self.push_photo(&mut fields);
        fields
    }

    /// Multipart fields for a profile update, which also carries the
    /// highlighted achievement
    pub fn update_fields(&self) -> Vec<FormField> {
        let mut fields = self.common_fields();
        fields.push(FormField::text(
            "logro_id",
            self.achievement_id.map(|id| id.to_string()).unwrap_or_default(),
        ));
        self.push_photo(&mut fields);
        fields
    }

    fn common_fields(&self) -> Vec<FormField> {
        vec![
            text("name", &self.name),
            text("last_name", &self.last_name),
            text("email", &self.email),
            FormField::text("password", self.password.as_str()),
            text("fecha_nacimiento", &self.birth_date),
            text("telefono", &self.phone),
            text("mano_dominante", &self.dominant_hand),
            text("posicion", &self.court_position),
            text("golpe_favorito", &self.favorite_shot),
            text("frecuencia_padel", &self.play_frequency),
            text("estilo_juego", &self.play_style),
            text("categoria", &self.category),
        ]
    }

    fn push_photo(&self, fields: &mut Vec<FormField>) {
        if let Some(photo) = &self.photo {
            fields.push(FormField::file(
                "foto",
                photo.file_name.as_str(),
                photo.mime.as_str(),
                photo.bytes.clone(),
            ));
        }
    }
}

fn text(name: &str, value: &Option<String>) -> FormField {
    FormField::text(name, value.clone().unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::request::FormValue;

    fn value_of<'a>(fields: &'a [FormField], name: &str) -> Option<&'a FormValue> {
        fields.iter().find(|f| f.name == name).map(|f| &f.value)
    }

    #[test]
    fn test_registration_fields_fill_blanks() {
        let form = ProfileForm {
            name: Some("Ana".to_string()),
            email: Some("ana@example.com".to_string()),
            password: "secret".to_string(),
            dominant_hand: Some("derecha".to_string()),
            ..ProfileForm::default()
        };

        let fields = form.registration_fields();
        assert_eq!(fields.len(), 12);
        assert_eq!(
            value_of(&fields, "name"),
            Some(&FormValue::Text("Ana".to_string()))
        );
        assert_eq!(
            value_of(&fields, "mano_dominante"),
            Some(&FormValue::Text("derecha".to_string()))
        );
        assert_eq!(
            value_of(&fields, "telefono"),
            Some(&FormValue::Text(String::new()))
        );
        assert!(value_of(&fields, "logro_id").is_none());
        assert!(value_of(&fields, "foto").is_none());
    }

    #[test]
    fn test_update_fields_include_achievement_and_photo() {
        let form = ProfileForm {
            password: "secret".to_string(),
            achievement_id: Some(12),
            photo: Some(Photo {
                file_name: "me.jpg".to_string(),
                mime: "image/jpeg".to_string(),
                bytes: vec![0xff, 0xd8],
            }),
            ..ProfileForm::default()
        };

        let fields = form.update_fields();
        assert_eq!(fields.len(), 14);
        assert_eq!(
            value_of(&fields, "logro_id"),
            Some(&FormValue::Text("12".to_string()))
        );
        assert!(matches!(
            value_of(&fields, "foto"),
            Some(FormValue::File { file_name, .. }) if file_name == "me.jpg"
        ));
    }
}
