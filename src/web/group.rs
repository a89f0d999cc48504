use super::db_error;
use crate::global::get_posts_per_page;
use crate::group::get_group_by_slug;
use crate::middleware::ClientCtx;
use crate::orm::groups;
use crate::paginator::{paginate_query, Page, PageQuery};
use crate::post::{select_posts_in_group, PostForTemplate};
use actix_web::{error, get, web, Error, Responder};
use askama_actix::{Template, TemplateToResponse};
use sea_orm::DatabaseConnection;

pub(super) fn configure(conf: &mut actix_web::web::ServiceConfig) {
    conf.service(view_group);
}

#[derive(Template)]
#[template(path = "group_list.html")]
pub struct GroupTemplate<'a> {
    pub client: ClientCtx,
    pub group: &'a groups::Model,
    pub page: &'a Page<PostForTemplate>,
}

#[get("/group/{slug}/")]
async fn view_group(
    client: ClientCtx,
    db: web::Data<DatabaseConnection>,
    path: web::Path<String>,
    query: web::Query<PageQuery>,
) -> Result<impl Responder, Error> {
    let slug = path.into_inner();
    let group = get_group_by_slug(&db, &slug)
        .await
        .map_err(db_error("view_group"))?
        .ok_or_else(|| error::ErrorNotFound("Group not found."))?;

    let page = paginate_query(
        db.get_ref(),
        select_posts_in_group(group.id),
        &format!("/group/{}/", group.slug),
        &query,
        get_posts_per_page(),
    )
    .await
    .map_err(db_error("view_group"))?;

    Ok(GroupTemplate {
        client,
        group: &group,
        page: &page,
    }
    .to_response())
}
