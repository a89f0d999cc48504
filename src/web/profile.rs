use super::{db_error, redirect, redirect_to_login};
use crate::follow::{
    count_followers, count_following, follow, is_following, unfollow, Following,
};
use crate::global::get_posts_per_page;
use crate::middleware::ClientCtx;
use crate::paginator::{paginate_query, Page, PageQuery};
use crate::post::{select_posts_by_author, PostForTemplate};
use crate::user::{get_profile_by_name, Profile};
use actix_web::{error, get, web, Error, HttpResponse};
use askama_actix::{Template, TemplateToResponse};
use sea_orm::DatabaseConnection;

pub(super) fn configure(conf: &mut actix_web::web::ServiceConfig) {
    conf.service(view_profile)
        .service(follow_profile)
        .service(unfollow_profile);
}

#[derive(Template)]
#[template(path = "profile.html")]
pub struct ProfileTemplate<'a> {
    pub client: ClientCtx,
    pub author: &'a Profile,
    pub page: &'a Page<PostForTemplate>,
    pub follower_count: usize,
    pub following_count: usize,
    /// Whether the client follows this author.
    pub following: bool,
}

impl<'a> ProfileTemplate<'a> {
    pub fn following_label(&self) -> Following<'_> {
        Following(&self.author.name)
    }
}

async fn get_author(db: &DatabaseConnection, username: &str) -> Result<Profile, Error> {
    get_profile_by_name(db, username)
        .await
        .map_err(db_error("get_author"))?
        .ok_or_else(|| error::ErrorNotFound("User not found."))
}

fn profile_url(author: &Profile) -> String {
    format!("/profile/{}/", author.name)
}

#[get("/profile/{username}/")]
async fn view_profile(
    client: ClientCtx,
    db: web::Data<DatabaseConnection>,
    path: web::Path<String>,
    query: web::Query<PageQuery>,
) -> Result<HttpResponse, Error> {
    let author = get_author(&db, &path).await?;

    let page = paginate_query(
        db.get_ref(),
        select_posts_by_author(author.id),
        &profile_url(&author),
        &query,
        get_posts_per_page(),
    )
    .await
    .map_err(db_error("view_profile"))?;

    let follower_count = count_followers(&db, author.id)
        .await
        .map_err(db_error("view_profile"))?;
    let following_count = count_following(&db, author.id)
        .await
        .map_err(db_error("view_profile"))?;
    let following = match client.get_id() {
        Some(user_id) => is_following(&db, user_id, author.id)
            .await
            .map_err(db_error("view_profile"))?,
        None => false,
    };

    Ok(ProfileTemplate {
        client,
        author: &author,
        page: &page,
        follower_count,
        following_count,
        following,
    }
    .to_response())
}

#[get("/profile/{username}/follow/")]
async fn follow_profile(
    client: ClientCtx,
    db: web::Data<DatabaseConnection>,
    path: web::Path<String>,
) -> Result<HttpResponse, Error> {
    let user_id = match client.get_id() {
        Some(id) => id,
        None => return Ok(redirect_to_login(&format!("/profile/{}/follow/", path))),
    };
    let author = get_author(&db, &path).await?;

    if follow(&db, user_id, author.id)
        .await
        .map_err(db_error("follow_profile"))?
    {
        log::debug!("follow_profile: {} now follows {}", user_id, author.id);
    }

    Ok(redirect(&profile_url(&author)))
}

#[get("/profile/{username}/unfollow/")]
async fn unfollow_profile(
    client: ClientCtx,
    db: web::Data<DatabaseConnection>,
    path: web::Path<String>,
) -> Result<HttpResponse, Error> {
    let user_id = match client.get_id() {
        Some(id) => id,
        None => return Ok(redirect_to_login(&format!("/profile/{}/unfollow/", path))),
    };
    let author = get_author(&db, &path).await?;

    unfollow(&db, user_id, author.id)
        .await
        .map_err(db_error("unfollow_profile"))?;

    Ok(redirect(&profile_url(&author)))
}
