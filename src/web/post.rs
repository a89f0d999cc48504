use super::{db_error, redirect, redirect_to_login};
use crate::comment::{
    get_comments_for_post, insert_comment, validate_comment_form, CommentForTemplate,
    NewCommentFormData,
};
use crate::filesystem::{read_multipart, save_post_image};
use crate::form::FormErrors;
use crate::global::get_settings;
use crate::group::get_all_groups;
use crate::middleware::ClientCtx;
use crate::orm::groups;
use crate::post::{
    count_posts_by_author, get_post_for_template, insert_post, update_post, validate_post_form,
    PostForTemplate, PostFormData,
};
use actix_multipart::Multipart;
use actix_web::{error, get, post, web, Error, HttpResponse};
use askama_actix::{Template, TemplateToResponse};
use sea_orm::DatabaseConnection;

pub(super) fn configure(conf: &mut actix_web::web::ServiceConfig) {
    conf.service(view_post)
        .service(view_create_post)
        .service(create_post)
        .service(view_edit_post)
        .service(edit_post)
        .service(view_comment)
        .service(create_comment);
}

#[derive(Template)]
#[template(path = "post_detail.html")]
pub struct PostDetailTemplate<'a> {
    pub client: ClientCtx,
    pub post: &'a PostForTemplate,
    pub author_post_count: usize,
    pub comments: &'a [CommentForTemplate],
    pub comment_text: &'a str,
    pub errors: &'a FormErrors,
}

/// Shared by create and edit.
#[derive(Template)]
#[template(path = "create_post.html")]
pub struct PostFormTemplate<'a> {
    pub client: ClientCtx,
    /// Set when editing.
    pub post_id: Option<i32>,
    pub form: &'a PostFormData,
    pub groups: &'a [groups::Model],
    pub errors: &'a FormErrors,
}

impl<'a> PostFormTemplate<'a> {
    pub fn is_edit(&self) -> bool {
        self.post_id.is_some()
    }

    pub fn get_action(&self) -> String {
        match self.post_id {
            Some(id) => format!("/posts/{}/edit/", id),
            None => "/create/".to_owned(),
        }
    }
}

async fn get_post(db: &DatabaseConnection, id: i32) -> Result<PostForTemplate, Error> {
    get_post_for_template(db, id)
        .await
        .map_err(db_error("get_post"))?
        .ok_or_else(|| error::ErrorNotFound("Post not found."))
}

fn post_url(id: i32) -> String {
    format!("/posts/{}/", id)
}

async fn render_post_detail(
    client: ClientCtx,
    db: &DatabaseConnection,
    post: &PostForTemplate,
    comment_text: &str,
    errors: &FormErrors,
) -> Result<HttpResponse, Error> {
    let author_post_count = count_posts_by_author(db, post.user_id)
        .await
        .map_err(db_error("render_post_detail"))?;
    let comments = get_comments_for_post(db, post.id)
        .await
        .map_err(db_error("render_post_detail"))?;

    Ok(PostDetailTemplate {
        client,
        post,
        author_post_count,
        comments: &comments,
        comment_text,
        errors,
    }
    .to_response())
}

async fn render_post_form(
    client: ClientCtx,
    db: &DatabaseConnection,
    post_id: Option<i32>,
    form: &PostFormData,
    errors: &FormErrors,
) -> Result<HttpResponse, Error> {
    let groups = get_all_groups(db)
        .await
        .map_err(db_error("render_post_form"))?;

    Ok(PostFormTemplate {
        client,
        post_id,
        form,
        groups: &groups,
        errors,
    }
    .to_response())
}

#[get("/posts/{post_id}/")]
async fn view_post(
    client: ClientCtx,
    db: web::Data<DatabaseConnection>,
    path: web::Path<i32>,
) -> Result<HttpResponse, Error> {
    let post = get_post(&db, path.into_inner()).await?;
    render_post_detail(client, &db, &post, "", &FormErrors::new()).await
}

#[get("/create/")]
async fn view_create_post(
    client: ClientCtx,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, Error> {
    if !client.is_user() {
        return Ok(redirect_to_login("/create/"));
    }

    render_post_form(client, &db, None, &PostFormData::default(), &FormErrors::new()).await
}

#[post("/create/")]
async fn create_post(
    client: ClientCtx,
    db: web::Data<DatabaseConnection>,
    multipart: Multipart,
) -> Result<HttpResponse, Error> {
    let user_id = match client.get_id() {
        Some(id) => id,
        None => return Ok(redirect_to_login("/create/")),
    };

    let form = PostFormData::from(read_multipart(multipart).await?);
    let clean = match validate_post_form(&db, &form)
        .await
        .map_err(db_error("create_post"))?
    {
        Ok(clean) => clean,
        Err(errors) => return render_post_form(client, &db, None, &form, &errors).await,
    };

    let image = match clean.image {
        Some(upload) => Some(save_post_image(&get_settings().media_dir, upload).await?),
        None => None,
    };

    let post = insert_post(&db, user_id, clean.text, clean.group_id, image)
        .await
        .map_err(db_error("create_post"))?;
    log::info!("create_post: user {} created post {}", user_id, post.id);

    Ok(redirect(&format!("/profile/{}/", client.get_name())))
}

#[get("/posts/{post_id}/edit/")]
async fn view_edit_post(
    client: ClientCtx,
    db: web::Data<DatabaseConnection>,
    path: web::Path<i32>,
) -> Result<HttpResponse, Error> {
    let post_id = path.into_inner();
    if !client.is_user() {
        return Ok(redirect_to_login(&format!("/posts/{}/edit/", post_id)));
    }

    let post = get_post(&db, post_id).await?;
    if !client.can_update_post(&post) {
        return Ok(redirect(&post_url(post.id)));
    }

    let form = PostFormData::from_post(&post);
    render_post_form(client, &db, Some(post.id), &form, &FormErrors::new()).await
}

#[post("/posts/{post_id}/edit/")]
async fn edit_post(
    client: ClientCtx,
    db: web::Data<DatabaseConnection>,
    path: web::Path<i32>,
    multipart: Multipart,
) -> Result<HttpResponse, Error> {
    let post_id = path.into_inner();
    if !client.is_user() {
        return Ok(redirect_to_login(&format!("/posts/{}/edit/", post_id)));
    }

    let post = get_post(&db, post_id).await?;
    if !client.can_update_post(&post) {
        return Ok(redirect(&post_url(post.id)));
    }

    let form = PostFormData::from(read_multipart(multipart).await?);
    let clean = match validate_post_form(&db, &form)
        .await
        .map_err(db_error("edit_post"))?
    {
        Ok(clean) => clean,
        Err(errors) => return render_post_form(client, &db, Some(post.id), &form, &errors).await,
    };

    let image = match clean.image {
        Some(upload) => Some(save_post_image(&get_settings().media_dir, upload).await?),
        None => None,
    };

    update_post(&db, post.id, clean.text, clean.group_id, image)
        .await
        .map_err(db_error("edit_post"))?;

    Ok(redirect(&post_url(post.id)))
}

/// Comments are only posted; a stray GET lands on the post.
#[get("/posts/{post_id}/comment/")]
async fn view_comment(path: web::Path<i32>) -> HttpResponse {
    redirect(&post_url(path.into_inner()))
}

#[post("/posts/{post_id}/comment/")]
async fn create_comment(
    client: ClientCtx,
    db: web::Data<DatabaseConnection>,
    path: web::Path<i32>,
    form: web::Form<NewCommentFormData>,
) -> Result<HttpResponse, Error> {
    let post_id = path.into_inner();
    let user_id = match client.get_id() {
        Some(id) => id,
        None => return Ok(redirect_to_login(&post_url(post_id))),
    };

    let post = get_post(&db, post_id).await?;
    match validate_comment_form(&form) {
        Ok(text) => {
            insert_comment(&db, post.id, user_id, text)
                .await
                .map_err(db_error("create_comment"))?;
            Ok(redirect(&post_url(post.id)))
        }
        Err(errors) => render_post_detail(client, &db, &post, &form.text, &errors).await,
    }
}
