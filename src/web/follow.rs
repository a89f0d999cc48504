use super::{db_error, redirect_to_login};
use crate::global::get_posts_per_page;
use crate::middleware::ClientCtx;
use crate::paginator::{paginate_query, Page, PageQuery};
use crate::post::{select_posts_by_followed_authors, PostForTemplate};
use actix_web::{get, web, Error, HttpResponse};
use askama_actix::{Template, TemplateToResponse};
use sea_orm::DatabaseConnection;

pub(super) fn configure(conf: &mut actix_web::web::ServiceConfig) {
    conf.service(view_follow_index);
}

#[derive(Template)]
#[template(path = "follow.html")]
pub struct FollowIndexTemplate<'a> {
    pub client: ClientCtx,
    pub page: &'a Page<PostForTemplate>,
}

/// Posts by every author the client follows.
#[get("/follow/")]
async fn view_follow_index(
    client: ClientCtx,
    db: web::Data<DatabaseConnection>,
    query: web::Query<PageQuery>,
) -> Result<HttpResponse, Error> {
    let user_id = match client.get_id() {
        Some(id) => id,
        None => return Ok(redirect_to_login("/follow/")),
    };

    let page = paginate_query(
        db.get_ref(),
        select_posts_by_followed_authors(user_id),
        "/follow/",
        &query,
        get_posts_per_page(),
    )
    .await
    .map_err(db_error("view_follow_index"))?;

    Ok(FollowIndexTemplate {
        client,
        page: &page,
    }
    .to_response())
}
