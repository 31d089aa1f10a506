use tracing::{info, warn};
use uuid::Uuid;

use crate::auth::password::{hash_password, verify_password};
use crate::error::AppError;
use crate::state::AppState;

use super::dto::{DocumentKind, RegisterForm, UpdateProfileRequest, UploadedFile};
use super::repo::{self, NewUser, Role, User};

/// One message for both unknown identifier and wrong password, so a caller
/// cannot probe which accounts exist.
const BAD_CREDENTIALS: &str = "Incorrect email/username or password";

pub async fn register_user(
    state: &AppState,
    form: RegisterForm,
    role: Role,
) -> Result<User, AppError> {
    if repo::find_by_email(&state.db, &form.email).await?.is_some() {
        warn!(email = %form.email, "email already registered");
        return Err(AppError::bad_request("Email already taken"));
    }
    if let Some(username) = form.username.as_deref() {
        if repo::find_by_username(&state.db, username).await?.is_some() {
            warn!(username, "username already registered");
            return Err(AppError::bad_request("Username already taken"));
        }
    }

    let password_hash = hash_password(&form.password)?;

    // Uploads happen before the insert: a storage failure fails the whole
    // registration instead of leaving a user row with dangling documents.
    let registration_id = Uuid::new_v4();
    let profile_photo = upload_document(
        state,
        registration_id,
        DocumentKind::ProfilePhoto,
        form.photo.as_ref(),
    )
    .await?;
    let id_proof_document = upload_document(
        state,
        registration_id,
        DocumentKind::IdProof,
        form.id_proof_document.as_ref(),
    )
    .await?;
    let authorization_letter = upload_document(
        state,
        registration_id,
        DocumentKind::AuthorizationLetter,
        form.authorization_letter.as_ref(),
    )
    .await?;

    let user = repo::create(
        &state.db,
        &NewUser {
            name: form.fullname,
            username: form.username,
            email: form.email,
            phone: form.phone,
            password_hash,
            role,
            city: form.city,
            state: form.state,
            country: form.country,
            profile_photo,
            id_proof_document,
            authorization_letter,
            designation: form.designation,
            organization_name: form.organization_name,
            employee_id: form.employee_id,
        },
    )
    .await?;

    info!(user_id = user.user_id, email = %user.email, role = %user.role, "user registered");
    Ok(user)
}

pub async fn login_user(
    state: &AppState,
    identifier: &str,
    password: &str,
) -> Result<User, AppError> {
    let Some(user) = repo::find_by_identifier(&state.db, identifier).await? else {
        warn!("login with unknown identifier");
        return Err(AppError::unauthorized(BAD_CREDENTIALS));
    };

    if !verify_password(password, &user.password_hash)? {
        warn!(user_id = user.user_id, "login with wrong password");
        return Err(AppError::unauthorized(BAD_CREDENTIALS));
    }

    let user = repo::touch_last_login(&state.db, user.user_id).await?;
    info!(user_id = user.user_id, "user logged in");
    Ok(user)
}

pub async fn update_profile(
    state: &AppState,
    user_id: i64,
    update: UpdateProfileRequest,
) -> Result<User, AppError> {
    let user = repo::update_profile(&state.db, user_id, &update)
        .await?
        .ok_or_else(|| AppError::not_found("User not found"))?;
    info!(user_id = user.user_id, "profile updated");
    Ok(user)
}

async fn upload_document(
    state: &AppState,
    registration_id: Uuid,
    kind: DocumentKind,
    file: Option<&UploadedFile>,
) -> Result<Option<String>, AppError> {
    let Some(file) = file else {
        return Ok(None);
    };
    let object_name = document_object_name(registration_id, kind, &file.filename);
    let url = state
        .storage
        .upload_public(&object_name, file.bytes.clone(), &file.content_type)
        .await?;
    Ok(Some(url))
}

fn document_object_name(registration_id: Uuid, kind: DocumentKind, original: &str) -> String {
    format!("user_{}_{}_{}", registration_id, kind.slug(), original)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    #[test]
    fn object_names_carry_registration_id_kind_and_filename() {
        let id = Uuid::new_v4();
        let name = document_object_name(id, DocumentKind::IdProof, "passport.pdf");
        assert_eq!(name, format!("user_{id}_idproof_passport.pdf"));
    }

    #[tokio::test]
    async fn upload_document_skips_absent_files() {
        let state = AppState::fake();
        let url = upload_document(&state, Uuid::new_v4(), DocumentKind::ProfilePhoto, None)
            .await
            .expect("no upload");
        assert!(url.is_none());
    }

    #[tokio::test]
    async fn upload_document_binds_the_returned_public_url() {
        let state = AppState::fake();
        let file = UploadedFile {
            filename: "me.jpg".into(),
            content_type: "image/jpeg".into(),
            bytes: Bytes::from_static(b"\xff\xd8\xff"),
        };
        let id = Uuid::new_v4();
        let url = upload_document(&state, id, DocumentKind::ProfilePhoto, Some(&file))
            .await
            .expect("upload")
            .expect("url bound");
        assert_eq!(url, format!("https://fake.local/user_{id}_profile_me.jpg"));
    }
}
