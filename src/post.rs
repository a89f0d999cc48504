use crate::filesystem::{MultipartForm, UploadPayload};
use crate::form::{required_text, FormErrors};
use crate::orm::{follows, groups, posts, users};
use chrono::prelude::Utc;
use sea_orm::sea_query::Query;
use sea_orm::{
    entity::*, query::*, ActiveValue, DatabaseConnection, DbErr, FromQueryResult, PaginatorTrait,
    Select, SelectModel, Selector,
};

/// A fully joined struct representing the post model and its relational data.
#[derive(Clone, Debug, FromQueryResult)]
pub struct PostForTemplate {
    pub id: i32,
    pub text: String,
    pub created_at: chrono::NaiveDateTime,
    pub user_id: i32,
    pub group_id: Option<i32>,
    pub image: Option<String>,
    // join users
    pub author_name: String,
    // join groups
    pub group_title: Option<String>,
    pub group_slug: Option<String>,
}

impl PostForTemplate {
    /// First 15 characters, used wherever a post needs a short label.
    pub fn label(&self) -> String {
        self.text.chars().take(15).collect()
    }

    /// Page title for the detail view.
    pub fn title(&self) -> String {
        let title: String = self.text.chars().take(30).collect();
        if self.text.chars().count() > 30 {
            format!("{}…", title)
        } else {
            title
        }
    }

    pub fn get_group_title(&self) -> &str {
        self.group_title.as_deref().unwrap_or_default()
    }

    pub fn get_image_url(&self) -> Option<String> {
        self.image.as_ref().map(|path| format!("/media/{}", path))
    }
}

/// Form values as submitted, kept for re-rendering.
#[derive(Debug, Default)]
pub struct PostFormData {
    pub text: String,
    pub group: String,
    pub image: Option<UploadPayload>,
}

impl From<MultipartForm> for PostFormData {
    fn from(mut form: MultipartForm) -> Self {
        Self {
            text: form.text("text").to_owned(),
            group: form.text("group").to_owned(),
            image: form.take_file("image"),
        }
    }
}

impl PostFormData {
    /// Prefills the edit form.
    pub fn from_post(post: &PostForTemplate) -> Self {
        Self {
            text: post.text.to_owned(),
            group: post.group_id.map(|id| id.to_string()).unwrap_or_default(),
            image: None,
        }
    }

    pub fn is_group_selected(&self, group: &groups::Model) -> bool {
        self.group == group.id.to_string()
    }
}

/// Validated post input.
#[derive(Debug)]
pub struct CleanPost {
    pub text: String,
    pub group_id: Option<i32>,
    pub image: Option<UploadPayload>,
}

/// Checks the text, that the group exists, and that the upload is an image.
pub async fn validate_post_form(
    db: &DatabaseConnection,
    form: &PostFormData,
) -> Result<Result<CleanPost, FormErrors>, DbErr> {
    let mut errors = FormErrors::new();
    let text = required_text(&mut errors, "text", &form.text);

    let group = form.group.trim();
    let group_id = if group.is_empty() {
        None
    } else {
        let found = match group.parse::<i32>() {
            Ok(id) => groups::Entity::find_by_id(id).one(db).await?.map(|g| g.id),
            Err(_) => None,
        };
        if found.is_none() {
            errors.add(
                "group",
                "Select a valid choice. That choice is not one of the available choices.",
            );
        }
        found
    };

    let image = match &form.image {
        Some(upload) if !upload.is_image() => {
            errors.add(
                "image",
                "Upload a valid image. The file you uploaded was either not an image or a corrupted image.",
            );
            None
        }
        other => other.clone(),
    };

    Ok(errors.into_result(CleanPost {
        text,
        group_id,
        image,
    }))
}

/// Base query: every post with its author name and group, newest first.
fn select_posts() -> Select<posts::Entity> {
    posts::Entity::find()
        .inner_join(users::Entity)
        .column_as(users::Column::Name, "author_name")
        .left_join(groups::Entity)
        .column_as(groups::Column::Title, "group_title")
        .column_as(groups::Column::Slug, "group_slug")
        .order_by_desc(posts::Column::CreatedAt)
        .order_by_desc(posts::Column::Id)
}

/// The unfiltered list backing the index page.
pub async fn get_all_posts(db: &DatabaseConnection) -> Result<Vec<PostForTemplate>, DbErr> {
    select_posts()
        .into_model::<PostForTemplate>()
        .all(db)
        .await
}

pub fn select_posts_in_group(group_id: i32) -> Selector<SelectModel<PostForTemplate>> {
    select_posts()
        .filter(posts::Column::GroupId.eq(group_id))
        .into_model::<PostForTemplate>()
}

pub fn select_posts_by_author(user_id: i32) -> Selector<SelectModel<PostForTemplate>> {
    select_posts()
        .filter(posts::Column::UserId.eq(user_id))
        .into_model::<PostForTemplate>()
}

/// Posts by every author `user_id` follows, as one query.
pub fn select_posts_by_followed_authors(user_id: i32) -> Selector<SelectModel<PostForTemplate>> {
    select_posts()
        .filter(
            posts::Column::UserId.in_subquery(
                Query::select()
                    .column(follows::Column::AuthorId)
                    .from(follows::Entity)
                    .and_where(follows::Column::UserId.eq(user_id))
                    .to_owned(),
            ),
        )
        .into_model::<PostForTemplate>()
}

pub async fn get_post_for_template(
    db: &DatabaseConnection,
    id: i32,
) -> Result<Option<PostForTemplate>, DbErr> {
    select_posts()
        .filter(posts::Column::Id.eq(id))
        .into_model::<PostForTemplate>()
        .one(db)
        .await
}

pub async fn count_posts_by_author(db: &DatabaseConnection, user_id: i32) -> Result<usize, DbErr> {
    posts::Entity::find()
        .filter(posts::Column::UserId.eq(user_id))
        .count(db)
        .await
}

/// `image` is the already stored path, if any.
pub async fn insert_post(
    db: &DatabaseConnection,
    user_id: i32,
    text: String,
    group_id: Option<i32>,
    image: Option<String>,
) -> Result<posts::Model, DbErr> {
    posts::ActiveModel {
        text: Set(text),
        created_at: Set(Utc::now().naive_utc()),
        user_id: Set(user_id),
        group_id: Set(group_id),
        image: Set(image),
        ..Default::default()
    }
    .insert(db)
    .await
}

/// Updates text and group. The image is only replaced when a new one is given.
pub async fn update_post(
    db: &DatabaseConnection,
    id: i32,
    text: String,
    group_id: Option<i32>,
    image: Option<String>,
) -> Result<(), DbErr> {
    let mut post = posts::ActiveModel {
        id: ActiveValue::Unchanged(id),
        text: Set(text),
        group_id: Set(group_id),
        ..Default::default()
    };
    if image.is_some() {
        post.image = Set(image);
    }
    post.update(db).await?;
    Ok(())
}
