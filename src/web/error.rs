use crate::middleware::ClientCtx;
use actix_web::body::{BoxBody, EitherBody};
use actix_web::dev::ServiceResponse;
use actix_web::http::{header, header::HeaderValue, StatusCode};
use actix_web::middleware::{ErrorHandlerResponse, ErrorHandlers};
use actix_web::{HttpMessage, Result};
use askama_actix::Template;

#[derive(Template)]
#[template(path = "error.html")]
struct ErrorTemplate {
    client: ClientCtx,
    status: StatusCode,
    /// Only client errors carry their message onto the page.
    message: Option<String>,
}

impl ErrorTemplate {
    fn title(&self) -> &'static str {
        match self.status {
            StatusCode::NOT_FOUND => "Page not found",
            StatusCode::BAD_REQUEST => "Bad request",
            StatusCode::PAYLOAD_TOO_LARGE => "Upload too large",
            _ => "Something went wrong",
        }
    }
}

/// Error handlers for the statuses which get a rendered page.
pub fn error_handlers<B: 'static>() -> ErrorHandlers<B> {
    ErrorHandlers::new()
        .handler(StatusCode::BAD_REQUEST, error_document)
        .handler(StatusCode::NOT_FOUND, error_document)
        .handler(StatusCode::PAYLOAD_TOO_LARGE, error_document)
        .handler(StatusCode::INTERNAL_SERVER_ERROR, error_document)
}

pub fn error_document<B>(res: ServiceResponse<B>) -> Result<ErrorHandlerResponse<B>> {
    let status = res.status();
    let message = match res.response().error() {
        Some(e) if status.is_client_error() => Some(e.to_string()),
        _ => None,
    };
    let client = ClientCtx::from_extensions(&res.request().extensions());

    let body = BoxBody::new(
        ErrorTemplate {
            client,
            status,
            message,
        }
        .to_string(),
    );
    let mut res: ServiceResponse<EitherBody<B>> =
        res.map_body(|_, _| EitherBody::<B, BoxBody>::right(body));

    // Headers must be manually set because Actix-Web renders no content by default.
    let headers = res.response_mut().headers_mut();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/html; charset=utf-8"),
    );
    // Proxies love to cache error pages permanently. Explicitly say not to do that.
    headers.insert(header::PRAGMA, HeaderValue::from_static("no-cache"));
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));

    Ok(ErrorHandlerResponse::Response(res))
}
