use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;

use super::dto::UpdateProfileRequest;

/// Platform role. Fixed at registration; stored in its canonical
/// capitalized form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
pub enum Role {
    Citizen,
    Official,
    Analyst,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Citizen => "Citizen",
            Role::Official => "Official",
            Role::Analyst => "Analyst",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.to_ascii_lowercase().as_str() {
            "citizen" => Ok(Role::Citizen),
            "official" => Ok(Role::Official),
            "analyst" => Ok(Role::Analyst),
            other => Err(format!("unknown role '{other}'")),
        }
    }
}

/// User record in the database.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct User {
    pub user_id: i64,
    pub name: String,
    pub username: Option<String>,
    pub email: String,
    pub phone: String,
    #[serde(skip_serializing)]
    pub password_hash: String, // argon2 digest, never exposed in JSON
    pub role: Role,
    pub city: String,
    pub state: String,
    pub country: String,
    pub profile_photo: Option<String>,
    pub id_proof_document: Option<String>,
    pub authorization_letter: Option<String>,
    pub designation: Option<String>,
    pub organization_name: Option<String>,
    pub employee_id: Option<String>,
    pub account_status: String,
    #[serde(with = "time::serde::rfc3339::option")]
    pub last_login_date: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// Column values for a registration insert. account_status, last_login_date
/// and created_at come from the table defaults.
#[derive(Debug)]
pub struct NewUser {
    pub name: String,
    pub username: Option<String>,
    pub email: String,
    pub phone: String,
    pub password_hash: String,
    pub role: Role,
    pub city: String,
    pub state: String,
    pub country: String,
    pub profile_photo: Option<String>,
    pub id_proof_document: Option<String>,
    pub authorization_letter: Option<String>,
    pub designation: Option<String>,
    pub organization_name: Option<String>,
    pub employee_id: Option<String>,
}

const USER_COLUMNS: &str = "user_id, name, username, email, phone, password_hash, role, \
     city, state, country, profile_photo, id_proof_document, authorization_letter, \
     designation, organization_name, employee_id, account_status, last_login_date, created_at";

pub async fn find_by_id(db: &PgPool, user_id: i64) -> anyhow::Result<Option<User>> {
    let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE user_id = $1");
    let user = sqlx::query_as::<_, User>(&sql)
        .bind(user_id)
        .fetch_optional(db)
        .await?;
    Ok(user)
}

pub async fn find_by_email(db: &PgPool, email: &str) -> anyhow::Result<Option<User>> {
    let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1");
    let user = sqlx::query_as::<_, User>(&sql)
        .bind(email)
        .fetch_optional(db)
        .await?;
    Ok(user)
}

pub async fn find_by_username(db: &PgPool, username: &str) -> anyhow::Result<Option<User>> {
    let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE username = $1");
    let user = sqlx::query_as::<_, User>(&sql)
        .bind(username)
        .fetch_optional(db)
        .await?;
    Ok(user)
}

/// Login lookup: the identifier matches either the email or the username.
pub async fn find_by_identifier(db: &PgPool, identifier: &str) -> anyhow::Result<Option<User>> {
    let sql = format!(
        "SELECT {USER_COLUMNS} FROM users \
         WHERE email = $1 OR username = $1 \
         ORDER BY user_id LIMIT 1"
    );
    let user = sqlx::query_as::<_, User>(&sql)
        .bind(identifier)
        .fetch_optional(db)
        .await?;
    Ok(user)
}

pub async fn create(db: &PgPool, new: &NewUser) -> anyhow::Result<User> {
    let sql = format!(
        "INSERT INTO users \
            (name, username, email, phone, password_hash, role, city, state, country, \
             profile_photo, id_proof_document, authorization_letter, \
             designation, organization_name, employee_id) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15) \
         RETURNING {USER_COLUMNS}"
    );
    let user = sqlx::query_as::<_, User>(&sql)
        .bind(&new.name)
        .bind(&new.username)
        .bind(&new.email)
        .bind(&new.phone)
        .bind(&new.password_hash)
        .bind(new.role)
        .bind(&new.city)
        .bind(&new.state)
        .bind(&new.country)
        .bind(&new.profile_photo)
        .bind(&new.id_proof_document)
        .bind(&new.authorization_letter)
        .bind(&new.designation)
        .bind(&new.organization_name)
        .bind(&new.employee_id)
        .fetch_one(db)
        .await?;
    Ok(user)
}

pub async fn touch_last_login(db: &PgPool, user_id: i64) -> anyhow::Result<User> {
    let sql = format!(
        "UPDATE users SET last_login_date = now() WHERE user_id = $1 RETURNING {USER_COLUMNS}"
    );
    let user = sqlx::query_as::<_, User>(&sql)
        .bind(user_id)
        .fetch_one(db)
        .await?;
    Ok(user)
}

/// Partial profile update. Only the fields present in the request change;
/// password hash, role, account status and email are not part of the
/// request type and therefore cannot be touched here.
pub async fn update_profile(
    db: &PgPool,
    user_id: i64,
    update: &UpdateProfileRequest,
) -> anyhow::Result<Option<User>> {
    let sql = format!(
        "UPDATE users SET \
            name = COALESCE($2, name), \
            username = COALESCE($3, username), \
            phone = COALESCE($4, phone), \
            city = COALESCE($5, city), \
            state = COALESCE($6, state), \
            country = COALESCE($7, country), \
            profile_photo = COALESCE($8, profile_photo), \
            id_proof_document = COALESCE($9, id_proof_document), \
            authorization_letter = COALESCE($10, authorization_letter), \
            designation = COALESCE($11, designation), \
            organization_name = COALESCE($12, organization_name), \
            employee_id = COALESCE($13, employee_id) \
         WHERE user_id = $1 \
         RETURNING {USER_COLUMNS}"
    );
    let user = sqlx::query_as::<_, User>(&sql)
        .bind(user_id)
        .bind(&update.name)
        .bind(&update.username)
        .bind(&update.phone)
        .bind(&update.city)
        .bind(&update.state)
        .bind(&update.country)
        .bind(&update.profile_photo)
        .bind(&update.id_proof_document)
        .bind(&update.authorization_letter)
        .bind(&update.designation)
        .bind(&update.organization_name)
        .bind(&update.employee_id)
        .fetch_optional(db)
        .await?;
    Ok(user)
}

#[cfg(test)]
pub(crate) fn sample_user(role: Role) -> User {
    use time::macros::datetime;

    User {
        user_id: 1,
        name: "Jane Doe".into(),
        username: Some("jane".into()),
        email: "jane@x.com".into(),
        phone: "+15550100".into(),
        password_hash: "$argon2id$v=19$m=19456,t=2,p=1$c29tZXNhbHQ$hashhashhash".into(),
        role,
        city: "Chennai".into(),
        state: "Tamil Nadu".into(),
        country: "India".into(),
        profile_photo: None,
        id_proof_document: None,
        authorization_letter: None,
        designation: None,
        organization_name: None,
        employee_id: None,
        account_status: "Active".into(),
        last_login_date: None,
        created_at: datetime!(2025-01-01 00:00:00 UTC),
    }
}
