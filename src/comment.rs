use crate::form::{required_text, FormErrors};
use crate::orm::{comments, users};
use chrono::prelude::Utc;
use sea_orm::{entity::*, query::*, DatabaseConnection, DbErr, FromQueryResult};
use serde::Deserialize;

/// A comment joined with its author's name.
#[derive(Clone, Debug, FromQueryResult)]
pub struct CommentForTemplate {
    pub id: i32,
    pub post_id: i32,
    pub user_id: i32,
    pub text: String,
    pub created_at: chrono::NaiveDateTime,
    // join users
    pub author_name: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct NewCommentFormData {
    #[serde(default)]
    pub text: String,
}

pub fn validate_comment_form(form: &NewCommentFormData) -> Result<String, FormErrors> {
    let mut errors = FormErrors::new();
    let text = required_text(&mut errors, "text", &form.text);
    errors.into_result(text)
}

/// Comments on a post, newest first.
pub async fn get_comments_for_post(
    db: &DatabaseConnection,
    post_id: i32,
) -> Result<Vec<CommentForTemplate>, DbErr> {
    comments::Entity::find()
        .inner_join(users::Entity)
        .column_as(users::Column::Name, "author_name")
        .filter(comments::Column::PostId.eq(post_id))
        .order_by_desc(comments::Column::CreatedAt)
        .order_by_desc(comments::Column::Id)
        .into_model::<CommentForTemplate>()
        .all(db)
        .await
}

pub async fn insert_comment(
    db: &DatabaseConnection,
    post_id: i32,
    user_id: i32,
    text: String,
) -> Result<comments::Model, DbErr> {
    comments::ActiveModel {
        post_id: Set(post_id),
        user_id: Set(user_id),
        text: Set(text),
        created_at: Set(Utc::now().naive_utc()),
        ..Default::default()
    }
    .insert(db)
    .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_comment_form() {
        let ok = NewCommentFormData {
            text: "  Nice post  ".to_owned(),
        };
        assert_eq!(validate_comment_form(&ok).unwrap(), "Nice post");

        let blank = NewCommentFormData::default();
        let errors = validate_comment_form(&blank).unwrap_err();
        assert!(errors.has("text"));
    }
}
