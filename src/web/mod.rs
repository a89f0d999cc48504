mod asset;
mod auth;
pub mod error;
mod follow;
mod group;
mod index;
mod post;
mod profile;

use actix_web::http::header;
use actix_web::{error as web_error, Error, HttpResponse};
use sea_orm::DbErr;

/// Configures the web app
///
/// @see https://docs.rs/actix-web/4.0.1/actix_web/struct.App.html#method.configure
pub fn configure(conf: &mut actix_web::web::ServiceConfig) {
    // Descending order. Order is important.
    // Route resolution will stop at the first match.
    index::configure(conf);
    auth::configure(conf);
    follow::configure(conf);
    group::configure(conf);
    post::configure(conf);
    profile::configure(conf);
    asset::configure(conf);
}

/// 302 to `location`.
pub fn redirect(location: &str) -> HttpResponse {
    HttpResponse::Found()
        .append_header((header::LOCATION, location))
        .finish()
}

/// 302 to the login form, which sends the client back to `path` afterwards.
pub fn redirect_to_login(path: &str) -> HttpResponse {
    let next: String = url::form_urlencoded::byte_serialize(path.as_bytes()).collect();
    redirect(&format!("/auth/login/?next={}", next))
}

/// Logs a database error and hides it behind a 500.
pub(crate) fn db_error(context: &'static str) -> impl Fn(DbErr) -> Error {
    move |e| {
        log::error!("{}: {}", context, e);
        web_error::ErrorInternalServerError("Database error.")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redirect_to_login() {
        let res = redirect_to_login("/create/");
        assert_eq!(res.status(), actix_web::http::StatusCode::FOUND);
        assert_eq!(
            res.headers().get(header::LOCATION).unwrap(),
            "/auth/login/?next=%2Fcreate%2F"
        );
    }
}
