use crate::global::get_session_time;
use crate::orm::{sessions, users};
use crate::user::ClientUser;
use actix_session::Session;
use chrono::Utc;
use sea_orm::{entity::*, query::*, DatabaseConnection, DbErr};
use uuid::Uuid;

/// Cookie key holding the session uuid.
pub const TOKEN_KEY: &str = "token";

/// Inserts a session row for the user and returns its token.
pub async fn new_session(db: &DatabaseConnection, user_id: i32) -> Result<Uuid, DbErr> {
    let uuid = Uuid::new_v4();

    sessions::Entity::insert(sessions::ActiveModel {
        id: Set(uuid.to_string()),
        user_id: Set(user_id),
        expires_at: Set(Utc::now().naive_utc() + *get_session_time()),
    })
    .exec(db)
    .await?;

    Ok(uuid)
}

pub async fn remove_session(db: &DatabaseConnection, uuid: Uuid) -> Result<u64, DbErr> {
    Ok(sessions::Entity::delete_many()
        .filter(sessions::Column::Id.eq(uuid.to_string()))
        .exec(db)
        .await?
        .rows_affected)
}

/// Drops every session past its expiry.
pub async fn remove_expired_sessions(db: &DatabaseConnection) -> Result<u64, DbErr> {
    Ok(sessions::Entity::delete_many()
        .filter(sessions::Column::ExpiresAt.lte(Utc::now().naive_utc()))
        .exec(db)
        .await?
        .rows_affected)
}

/// Looks up a live session by token and returns its user.
pub async fn get_user_by_token(
    db: &DatabaseConnection,
    uuid: &Uuid,
) -> Result<Option<ClientUser>, DbErr> {
    users::Entity::find()
        .select_only()
        .column(users::Column::Id)
        .column(users::Column::Name)
        .inner_join(sessions::Entity)
        .filter(sessions::Column::Id.eq(uuid.to_string()))
        .filter(sessions::Column::ExpiresAt.gt(Utc::now().naive_utc()))
        .into_model::<ClientUser>()
        .one(db)
        .await
}

/// Reads the token from the session cookie.
pub fn get_token(cookies: &Session) -> Option<Uuid> {
    match cookies.get::<String>(TOKEN_KEY) {
        Ok(Some(token)) => match Uuid::parse_str(&token) {
            Ok(uuid) => Some(uuid),
            Err(e) => {
                log::warn!("get_token: parse_str() {}", e);
                None
            }
        },
        Ok(None) => None,
        Err(e) => {
            log::error!("get_token: cookies.get() {}", e);
            None
        }
    }
}

/// Resolves the client for a request. Any failure reads as a guest.
pub async fn authenticate_client_by_session(
    db: &DatabaseConnection,
    cookies: &Session,
) -> Option<ClientUser> {
    let uuid = get_token(cookies)?;
    match get_user_by_token(db, &uuid).await {
        Ok(user) => user,
        Err(e) => {
            log::error!("authenticate_client_by_session: {}", e);
            None
        }
    }
}
