use crate::orm::follows;
use sea_orm::{entity::*, query::*, DatabaseConnection, DbErr, PaginatorTrait};

pub async fn is_following(
    db: &DatabaseConnection,
    user_id: i32,
    author_id: i32,
) -> Result<bool, DbErr> {
    Ok(follows::Entity::find()
        .filter(follows::Column::UserId.eq(user_id))
        .filter(follows::Column::AuthorId.eq(author_id))
        .count(db)
        .await?
        > 0)
}

/// Adds the edge unless it is a self-follow or already exists.
/// Returns true if a row was inserted.
///
/// Check-then-insert is not atomic; two concurrent requests can both insert.
pub async fn follow(db: &DatabaseConnection, user_id: i32, author_id: i32) -> Result<bool, DbErr> {
    if user_id == author_id || is_following(db, user_id, author_id).await? {
        return Ok(false);
    }

    follows::ActiveModel {
        user_id: Set(user_id),
        author_id: Set(author_id),
        ..Default::default()
    }
    .insert(db)
    .await?;

    Ok(true)
}

/// Removes every edge from `user_id` to `author_id`.
pub async fn unfollow(db: &DatabaseConnection, user_id: i32, author_id: i32) -> Result<u64, DbErr> {
    Ok(follows::Entity::delete_many()
        .filter(follows::Column::UserId.eq(user_id))
        .filter(follows::Column::AuthorId.eq(author_id))
        .exec(db)
        .await?
        .rows_affected)
}

pub async fn count_followers(db: &DatabaseConnection, author_id: i32) -> Result<usize, DbErr> {
    follows::Entity::find()
        .filter(follows::Column::AuthorId.eq(author_id))
        .count(db)
        .await
}

pub async fn count_following(db: &DatabaseConnection, user_id: i32) -> Result<usize, DbErr> {
    follows::Entity::find()
        .filter(follows::Column::UserId.eq(user_id))
        .count(db)
        .await
}

/// Label for an edge as seen by the follower.
pub struct Following<'a>(pub &'a str);

impl std::fmt::Display for Following<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Following {}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_following_label() {
        assert_eq!(Following("leo").to_string(), "Following leo");
    }
}
