use super::db_error;
use crate::cache::{PostListCache, INDEX_PAGE_KEY};
use crate::global::get_posts_per_page;
use crate::middleware::ClientCtx;
use crate::paginator::{paginate_slice, Page, PageQuery};
use crate::post::{get_all_posts, PostForTemplate};
use actix_web::{get, web, Error, Responder};
use askama_actix::{Template, TemplateToResponse};
use sea_orm::DatabaseConnection;
use std::sync::Arc;

pub(super) fn configure(conf: &mut actix_web::web::ServiceConfig) {
    conf.service(view_index);
}

#[derive(Template)]
#[template(path = "index.html")]
pub struct IndexTemplate<'a> {
    pub client: ClientCtx,
    pub page: &'a Page<PostForTemplate>,
}

/// Returns the unfiltered post list, from the cache when it is warm.
async fn get_index_posts(
    db: &DatabaseConnection,
    cache: &PostListCache,
) -> Result<Arc<Vec<PostForTemplate>>, Error> {
    if let Some(posts) = cache.get(INDEX_PAGE_KEY).await {
        log::debug!("get_index_posts: cache hit ({} posts)", posts.len());
        return Ok(posts);
    }

    let posts = Arc::new(get_all_posts(db).await.map_err(db_error("get_index_posts"))?);
    // Another worker may have filled the key meanwhile; keep theirs.
    if !cache.add(INDEX_PAGE_KEY, posts.clone()).await {
        log::debug!("get_index_posts: cache filled concurrently");
    } else {
        log::debug!("get_index_posts: cache miss, stored {} posts", posts.len());
    }
    Ok(posts)
}

#[get("/")]
async fn view_index(
    client: ClientCtx,
    db: web::Data<DatabaseConnection>,
    cache: web::Data<PostListCache>,
    query: web::Query<PageQuery>,
) -> Result<impl Responder, Error> {
    let posts = get_index_posts(&db, &cache).await?;
    let page = paginate_slice(&posts, "/", &query, get_posts_per_page());

    Ok(IndexTemplate {
        client,
        page: &page,
    }
    .to_response())
}
