use crate::orm::users;
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::Utc;
use derive_more::Display;
use sea_orm::{entity::*, query::*, DatabaseConnection, DbErr, FromQueryResult, PaginatorTrait};

/// A mini struct for holding only what information we need about a client.
#[derive(Clone, Debug, FromQueryResult)]
pub struct ClientUser {
    pub id: i32,
    pub name: String,
}

/// Public facing author information.
#[derive(Clone, Debug, FromQueryResult)]
pub struct Profile {
    pub id: i32,
    pub name: String,
    pub created_at: chrono::NaiveDateTime,
}

#[derive(Debug, Display)]
pub enum CreateUserError {
    #[display(fmt = "A user with that username already exists.")]
    NameTaken,
    #[display(fmt = "password hashing failed: {}", _0)]
    Hash(argon2::password_hash::Error),
    #[display(fmt = "{}", _0)]
    Db(DbErr),
}

impl From<DbErr> for CreateUserError {
    fn from(e: DbErr) -> Self {
        Self::Db(e)
    }
}

pub async fn get_profile_by_name(
    db: &DatabaseConnection,
    name: &str,
) -> Result<Option<Profile>, DbErr> {
    users::Entity::find()
        .select_only()
        .column(users::Column::Id)
        .column(users::Column::Name)
        .column(users::Column::CreatedAt)
        .filter(users::Column::Name.eq(name))
        .into_model::<Profile>()
        .one(db)
        .await
}

pub fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
    Ok(Argon2::default()
        .hash_password(password.as_bytes(), &SaltString::generate(&mut OsRng))?
        .to_string())
}

/// Returns the user if the name exists and the password matches its hash.
pub async fn authenticate(
    db: &DatabaseConnection,
    name: &str,
    password: &str,
) -> Result<Option<ClientUser>, DbErr> {
    let user = match users::Entity::find()
        .filter(users::Column::Name.eq(name))
        .one(db)
        .await?
    {
        Some(user) => user,
        None => return Ok(None),
    };

    let parsed_hash = match PasswordHash::new(&user.password) {
        Ok(hash) => hash,
        Err(e) => {
            log::error!("authenticate: unparseable hash for user {}: {}", user.id, e);
            return Ok(None);
        }
    };

    if Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok()
    {
        Ok(Some(ClientUser {
            id: user.id,
            name: user.name,
        }))
    } else {
        Ok(None)
    }
}

pub async fn insert_new_user(
    db: &DatabaseConnection,
    name: &str,
    password: &str,
    email: Option<String>,
) -> Result<users::Model, CreateUserError> {
    let taken = users::Entity::find()
        .filter(users::Column::Name.eq(name))
        .count(db)
        .await?;
    if taken > 0 {
        return Err(CreateUserError::NameTaken);
    }

    let password_hash = hash_password(password).map_err(CreateUserError::Hash)?;

    Ok(users::ActiveModel {
        name: Set(name.to_owned()),
        password: Set(password_hash),
        email: Set(email),
        created_at: Set(Utc::now().naive_utc()),
        ..Default::default()
    }
    .insert(db)
    .await?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_user_error_display() {
        assert_eq!(
            CreateUserError::NameTaken.to_string(),
            "A user with that username already exists."
        );
        assert_eq!(
            CreateUserError::from(DbErr::Custom("boom".to_owned())).to_string(),
            DbErr::Custom("boom".to_owned()).to_string()
        );
    }

    #[test]
    fn test_hash_password_verifies() {
        let hash = hash_password("correct horse").unwrap();
        let parsed = PasswordHash::new(&hash).unwrap();
        assert!(Argon2::default()
            .verify_password(b"correct horse", &parsed)
            .is_ok());
        assert!(Argon2::default().verify_password(b"wrong", &parsed).is_err());
    }
}
