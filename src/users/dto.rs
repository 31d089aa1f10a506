use axum::extract::Multipart;
use bytes::Bytes;
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::error::AppError;

use super::repo::{Role, User};

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

/// One of the three document slots accepted at registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    ProfilePhoto,
    IdProof,
    AuthorizationLetter,
}

impl DocumentKind {
    pub fn slug(self) -> &'static str {
        match self {
            DocumentKind::ProfilePhoto => "profile",
            DocumentKind::IdProof => "idproof",
            DocumentKind::AuthorizationLetter => "authletter",
        }
    }
}

/// A file received in a multipart field, buffered in memory until it is
/// pushed to the blob store.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub filename: String,
    pub content_type: String,
    pub bytes: Bytes,
}

/// Multipart registration form. Text fields land as-is; the three known
/// file fields are buffered, everything else is ignored.
#[derive(Debug, Default)]
pub struct RegisterForm {
    pub role: String,
    pub fullname: String,
    pub email: String,
    pub phone: String,
    pub password: String,
    pub username: Option<String>,
    pub city: String,
    pub state: String,
    pub country: String,
    pub designation: Option<String>,
    pub organization_name: Option<String>,
    pub employee_id: Option<String>,
    pub photo: Option<UploadedFile>,
    pub id_proof_document: Option<UploadedFile>,
    pub authorization_letter: Option<UploadedFile>,
}

impl RegisterForm {
    pub async fn from_multipart(multipart: &mut Multipart) -> Result<Self, AppError> {
        let mut form = Self::default();
        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| AppError::bad_request(e.to_string()))?
        {
            let Some(name) = field.name().map(str::to_string) else {
                continue;
            };
            match name.as_str() {
                "photo" | "id_proof_document" | "authorization_letter" => {
                    let filename = field.file_name().unwrap_or("upload").to_string();
                    let content_type = field
                        .content_type()
                        .unwrap_or("application/octet-stream")
                        .to_string();
                    let bytes = field
                        .bytes()
                        .await
                        .map_err(|e| AppError::bad_request(e.to_string()))?;
                    let file = UploadedFile {
                        filename,
                        content_type,
                        bytes,
                    };
                    match name.as_str() {
                        "photo" => form.photo = Some(file),
                        "id_proof_document" => form.id_proof_document = Some(file),
                        _ => form.authorization_letter = Some(file),
                    }
                }
                _ => {
                    let value = field
                        .text()
                        .await
                        .map_err(|e| AppError::bad_request(e.to_string()))?;
                    form.set_text_field(&name, value);
                }
            }
        }
        Ok(form)
    }

    fn set_text_field(&mut self, name: &str, value: String) {
        match name {
            "role" => self.role = value,
            "fullname" => self.fullname = value,
            "email" => self.email = value,
            "phone" => self.phone = value,
            "password" => self.password = value,
            "username" => self.username = Some(value),
            "city" => self.city = value,
            "state" => self.state = value,
            "country" => self.country = value,
            "designation" => self.designation = Some(value),
            "organizationName" => self.organization_name = Some(value),
            "employeeId" => self.employee_id = Some(value),
            _ => {}
        }
    }

    /// Field validation; returns the canonical role on success. All problems
    /// are collected into one 400 message.
    pub fn validate(&self) -> Result<Role, AppError> {
        let mut problems = Vec::new();

        let role = self.role.parse::<Role>().ok();
        if role.is_none() {
            problems.push("role must be one of citizen, official, analyst".to_string());
        }

        for (value, label) in [
            (&self.fullname, "fullname"),
            (&self.phone, "phone"),
            (&self.city, "city"),
            (&self.state, "state"),
            (&self.country, "country"),
        ] {
            if value.trim().is_empty() {
                problems.push(format!("{label} is required"));
            }
        }

        if !is_valid_email(&self.email) {
            problems.push("email must be a valid email address".to_string());
        }
        if self.password.len() < 8 {
            problems.push("password length must be at least 8 characters".to_string());
        }

        if let Some(role) = role {
            if role != Role::Citizen {
                for (value, label) in [
                    (&self.designation, "designation"),
                    (&self.organization_name, "organizationName"),
                    (&self.employee_id, "employeeId"),
                ] {
                    if value.as_deref().map_or(true, |v| v.trim().is_empty()) {
                        problems.push(format!(
                            "{label} is required for official and analyst accounts"
                        ));
                    }
                }
            }
        }

        if !problems.is_empty() {
            return Err(AppError::bad_request(problems.join(", ")));
        }
        self.role.parse::<Role>().map_err(AppError::bad_request)
    }
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub identifier: String,
    pub password: String,
}

/// Partial profile update. `password_hash`, `role`, `account_status` and
/// `email` are deliberately not part of this type: clients sending them get
/// them silently dropped during deserialization.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateProfileRequest {
    pub name: Option<String>,
    pub username: Option<String>,
    pub phone: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub country: Option<String>,
    pub profile_photo: Option<String>,
    pub id_proof_document: Option<String>,
    pub authorization_letter: Option<String>,
    pub designation: Option<String>,
    pub organization_name: Option<String>,
    pub employee_id: Option<String>,
}

/// Response returned after register or login.
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub user: User,
    pub tokens: AuthTokens,
}

#[derive(Debug, Serialize)]
pub struct AuthTokens {
    pub access: AccessToken,
}

#[derive(Debug, Serialize)]
pub struct AccessToken {
    pub token: String,
    #[serde(with = "time::serde::rfc3339")]
    pub expires_at: OffsetDateTime,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn citizen_form() -> RegisterForm {
        RegisterForm {
            role: "citizen".into(),
            fullname: "Jane Doe".into(),
            email: "jane@x.com".into(),
            phone: "+15550100".into(),
            password: "pass1234".into(),
            city: "Chennai".into(),
            state: "Tamil Nadu".into(),
            country: "India".into(),
            ..Default::default()
        }
    }

    #[test]
    fn citizen_registration_validates() {
        assert_eq!(citizen_form().validate().unwrap(), Role::Citizen);
    }

    #[test]
    fn role_is_normalized_case_insensitively() {
        let mut form = citizen_form();
        form.role = "CITIZEN".into();
        assert_eq!(form.validate().unwrap(), Role::Citizen);
    }

    #[test]
    fn short_password_and_bad_email_are_rejected_together() {
        let mut form = citizen_form();
        form.password = "short".into();
        form.email = "not-an-email".into();
        let err = form.validate().unwrap_err();
        let message = err.to_string();
        assert!(message.contains("password length must be at least 8 characters"));
        assert!(message.contains("email must be a valid email address"));
    }

    #[test]
    fn unknown_role_is_rejected() {
        let mut form = citizen_form();
        form.role = "admin".into();
        assert!(form.validate().is_err());
    }

    #[test]
    fn official_registration_requires_organization_fields() {
        let mut form = citizen_form();
        form.role = "official".into();
        let err = form.validate().unwrap_err();
        let message = err.to_string();
        assert!(message.contains("designation is required"));
        assert!(message.contains("organizationName is required"));
        assert!(message.contains("employeeId is required"));

        form.designation = Some("Disaster Response Officer".into());
        form.organization_name = Some("NDRF".into());
        form.employee_id = Some("E-1042".into());
        assert_eq!(form.validate().unwrap(), Role::Official);
    }

    #[test]
    fn citizen_registration_ignores_missing_organization_fields() {
        let form = citizen_form();
        assert!(form.designation.is_none());
        assert!(form.validate().is_ok());
    }

    #[test]
    fn update_request_silently_drops_protected_fields() {
        let body = serde_json::json!({
            "name": "Jane D.",
            "role": "official",
            "password_hash": "x",
            "account_status": "Suspended",
            "email": "evil@x.com"
        });
        let update: UpdateProfileRequest = serde_json::from_value(body).expect("deserialize");
        assert_eq!(update.name.as_deref(), Some("Jane D."));
        // The protected fields do not exist on the type at all.
        assert!(update.username.is_none());
        assert!(update.phone.is_none());
    }

    #[test]
    fn document_kind_slugs_match_object_naming() {
        assert_eq!(DocumentKind::ProfilePhoto.slug(), "profile");
        assert_eq!(DocumentKind::IdProof.slug(), "idproof");
        assert_eq!(DocumentKind::AuthorizationLetter.slug(), "authletter");
    }
}
