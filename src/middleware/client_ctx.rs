use crate::session::authenticate_client_by_session;
use crate::user::{ClientUser, Profile};
use actix_session::SessionExt;
use actix_utils::future::{ok, Ready};
use actix_web::dev::{
    forward_ready, Extensions, Payload, Service, ServiceRequest, ServiceResponse, Transform,
};
use actix_web::{web::Data, Error, FromRequest, HttpMessage, HttpRequest};
use chrono::Datelike;
use futures_util::future::{FutureExt as _, LocalBoxFuture};
use sea_orm::DatabaseConnection;
use std::time::{Duration, Instant};
use std::{cell::RefCell, rc::Rc};

/// Client data stored for a single request cycle.
#[derive(Clone, Debug)]
pub struct ClientCtxInner {
    pub client: Option<ClientUser>,
    pub request_start: Instant,
}

impl Default for ClientCtxInner {
    fn default() -> Self {
        Self {
            client: None,
            request_start: Instant::now(),
        }
    }
}

/// Client context passed to routes.
/// Wraps ClientCtxInner, which is set at the beginning of the request.
#[derive(Clone, Debug, Default)]
pub struct ClientCtx(Rc<RefCell<ClientCtxInner>>);

impl ClientCtx {
    /// Builds a context for an already known client, bypassing the session.
    pub fn from_client(client: Option<ClientUser>) -> Self {
        Self(Rc::new(RefCell::new(ClientCtxInner {
            client,
            request_start: Instant::now(),
        })))
    }

    fn get_client_ctx(extensions: &mut Extensions) -> Self {
        match extensions.get::<Rc<RefCell<ClientCtxInner>>>() {
            // Existing record in extensions; pull it.
            Some(s_impl) => Self(Rc::clone(s_impl)),
            // No existing record; create and insert it.
            None => {
                let inner = Rc::new(RefCell::new(ClientCtxInner::default()));
                extensions.insert(inner.clone());
                Self(inner)
            }
        }
    }

    /// Reads the context without inserting one, for code outside of extractors.
    pub fn from_extensions(extensions: &Extensions) -> Self {
        extensions
            .get::<Rc<RefCell<ClientCtxInner>>>()
            .map(|inner| Self(Rc::clone(inner)))
            .unwrap_or_default()
    }

    /// Returns either the user's id or None.
    pub fn get_id(&self) -> Option<i32> {
        self.0.borrow().client.as_ref().map(|u| u.id)
    }

    /// Returns either the user's name or the word for guest.
    pub fn get_name(&self) -> String {
        match &self.0.borrow().client {
            Some(user) => user.name.to_owned(),
            None => "Guest".to_owned(),
        }
    }

    pub fn is_user(&self) -> bool {
        self.0.borrow().client.is_some()
    }

    pub fn can_update_post(&self, post: &crate::post::PostForTemplate) -> bool {
        self.is_user() && self.get_id() == Some(post.user_id)
    }

    pub fn can_follow(&self, author: &Profile) -> bool {
        self.is_user() && self.get_id() != Some(author.id)
    }

    /// Current calendar year for page footers.
    pub fn get_year(&self) -> i32 {
        chrono::Local::now().year()
    }

    /// Returns Duration representing request time.
    pub fn request_time(&self) -> Duration {
        Instant::now() - self.0.borrow().request_start
    }

    /// Returns human readable representing request time.
    pub fn request_time_as_string(&self) -> String {
        let us = self.request_time().as_micros();
        if us > 5000 {
            format!("{}ms", us / 1000)
        } else {
            format!("{}μs", us)
        }
    }
}

/// This implementation is what actually provides the `client: ClientCtx` in the parameters of route functions.
impl FromRequest for ClientCtx {
    type Error = Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ok(ClientCtx::get_client_ctx(&mut req.extensions_mut()))
    }
}

impl<S, B> Transform<S, ServiceRequest> for ClientCtx
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Transform = ClientCtxMiddleware<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ok(ClientCtxMiddleware {
            service: Rc::new(service),
        })
    }
}

/// Client context middleware
pub struct ClientCtxMiddleware<S> {
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for ClientCtxMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);

        async move {
            let cookies = req.get_session();
            let ctx = ClientCtx::get_client_ctx(&mut req.extensions_mut());

            match req.app_data::<Data<DatabaseConnection>>() {
                Some(db) => {
                    // The RefCell must not be borrowed across the await.
                    let client = authenticate_client_by_session(db, &cookies).await;
                    ctx.0.borrow_mut().client = client;
                }
                None => {
                    log::error!("ClientCtxMiddleware: no database connection in app data");
                }
            }

            service.call(req).await
        }
        .boxed_local()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(id: i32) -> Profile {
        Profile {
            id,
            name: format!("user{}", id),
            created_at: chrono::Utc::now().naive_utc(),
        }
    }

    #[test]
    fn test_can_follow() {
        let guest = ClientCtx::default();
        assert!(!guest.can_follow(&profile(2)));
        assert_eq!(guest.get_name(), "Guest");

        let client = ClientCtx::from_client(Some(ClientUser {
            id: 1,
            name: "user1".to_owned(),
        }));
        assert!(client.can_follow(&profile(2)));
        assert!(!client.can_follow(&profile(1)));
    }
}
