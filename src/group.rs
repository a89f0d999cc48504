use crate::orm::groups;
use sea_orm::{entity::*, query::*, DatabaseConnection, DbErr};

pub async fn get_group_by_slug(
    db: &DatabaseConnection,
    slug: &str,
) -> Result<Option<groups::Model>, DbErr> {
    groups::Entity::find()
        .filter(groups::Column::Slug.eq(slug))
        .one(db)
        .await
}

/// Choices for the post form, alphabetical.
pub async fn get_all_groups(db: &DatabaseConnection) -> Result<Vec<groups::Model>, DbErr> {
    groups::Entity::find()
        .order_by_asc(groups::Column::Title)
        .all(db)
        .await
}
