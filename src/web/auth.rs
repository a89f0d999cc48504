use super::{db_error, redirect};
use crate::form::{max_chars, required_text, FormErrors};
use crate::middleware::ClientCtx;
use crate::session::{get_token, new_session, remove_session, TOKEN_KEY};
use crate::user::{authenticate, insert_new_user, ClientUser, CreateUserError};
use actix_session::Session;
use actix_web::{error, get, post, web, Error, HttpResponse, Responder};
use askama_actix::{Template, TemplateToResponse};
use sea_orm::DatabaseConnection;
use serde::Deserialize;

const USERNAME_MAX_CHARS: usize = 150;
const PASSWORD_MIN_CHARS: usize = 8;

pub(super) fn configure(conf: &mut actix_web::web::ServiceConfig) {
    conf.service(view_login)
        .service(post_login)
        .service(view_logout)
        .service(view_signup)
        .service(post_signup);
}

#[derive(Deserialize)]
pub struct NextQuery {
    pub next: Option<String>,
}

#[derive(Deserialize)]
pub struct LoginFormData {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    pub next: Option<String>,
}

#[derive(Default, Deserialize)]
pub struct SignupFormData {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password1: String,
    #[serde(default)]
    pub password2: String,
}

#[derive(Template)]
#[template(path = "login.html")]
pub struct LoginTemplate<'a> {
    pub client: ClientCtx,
    pub username: &'a str,
    pub next: &'a str,
    pub failed: bool,
}

#[derive(Template)]
#[template(path = "signup.html")]
pub struct SignupTemplate<'a> {
    pub client: ClientCtx,
    pub form: &'a SignupFormData,
    pub errors: &'a FormErrors,
}

#[derive(Template)]
#[template(path = "logged_out.html")]
pub struct LoggedOutTemplate {
    pub client: ClientCtx,
}

/// Only site-relative targets are followed after login.
fn safe_next(next: Option<&str>) -> &str {
    match next {
        Some(next) if next.starts_with('/') && !next.starts_with("//") && !next.contains('\\') => {
            next
        }
        _ => "/",
    }
}

/// Opens a session row and binds it to the cookie.
async fn log_in(db: &DatabaseConnection, cookies: &Session, user_id: i32) -> Result<(), Error> {
    let uuid = new_session(db, user_id)
        .await
        .map_err(db_error("log_in"))?;

    cookies.renew();
    cookies.insert(TOKEN_KEY, uuid.to_string()).map_err(|e| {
        log::error!("log_in: cookies.insert() {}", e);
        error::ErrorInternalServerError("Failed to store session.")
    })
}

#[get("/auth/login/")]
async fn view_login(client: ClientCtx, query: web::Query<NextQuery>) -> impl Responder {
    LoginTemplate {
        client,
        username: "",
        next: safe_next(query.next.as_deref()),
        failed: false,
    }
    .to_response()
}

#[post("/auth/login/")]
async fn post_login(
    client: ClientCtx,
    cookies: Session,
    db: web::Data<DatabaseConnection>,
    form: web::Form<LoginFormData>,
) -> Result<HttpResponse, Error> {
    let next = safe_next(form.next.as_deref());
    let username = form.username.trim();

    let user: Option<ClientUser> = if username.is_empty() || form.password.is_empty() {
        None
    } else {
        authenticate(&db, username, &form.password)
            .await
            .map_err(db_error("post_login"))?
    };

    match user {
        Some(user) => {
            log_in(&db, &cookies, user.id).await?;
            log::info!("post_login: {} logged in", user.name);
            Ok(redirect(next))
        }
        None => Ok(LoginTemplate {
            client,
            username,
            next,
            failed: true,
        }
        .to_response()),
    }
}

#[get("/auth/logout/")]
async fn view_logout(
    cookies: Session,
    db: web::Data<DatabaseConnection>,
) -> Result<impl Responder, Error> {
    if let Some(uuid) = get_token(&cookies) {
        if let Err(e) = remove_session(&db, uuid).await {
            log::error!("view_logout: remove_session() {}", e);
        }
    }

    cookies.purge();

    // The context for this request was resolved before the session was dropped.
    Ok(LoggedOutTemplate {
        client: ClientCtx::from_client(None),
    }
    .to_response())
}

#[get("/auth/signup/")]
async fn view_signup(client: ClientCtx) -> impl Responder {
    SignupTemplate {
        client,
        form: &SignupFormData::default(),
        errors: &FormErrors::new(),
    }
    .to_response()
}

fn validate_signup_form(form: &SignupFormData) -> Result<(String, Option<String>), FormErrors> {
    let mut errors = FormErrors::new();

    let username = required_text(&mut errors, "username", &form.username);
    max_chars(&mut errors, "username", &username, USERNAME_MAX_CHARS);
    if !username
        .chars()
        .all(|c| c.is_alphanumeric() || "@.+-_".contains(c))
    {
        errors.add(
            "username",
            "Enter a valid username. This value may contain only letters, numbers, and @/./+/-/_ characters.",
        );
    }

    let email = form.email.trim();
    if !email.is_empty() && !email.contains('@') {
        errors.add("email", "Enter a valid email address.");
    }

    if form.password1.chars().count() < PASSWORD_MIN_CHARS {
        errors.add(
            "password1",
            format!(
                "This password is too short. It must contain at least {} characters.",
                PASSWORD_MIN_CHARS
            ),
        );
    }
    if form.password1 != form.password2 {
        errors.add("password2", "The two password fields didn't match.");
    }

    let email = (!email.is_empty()).then(|| email.to_owned());
    errors.into_result((username, email))
}

#[post("/auth/signup/")]
async fn post_signup(
    client: ClientCtx,
    cookies: Session,
    db: web::Data<DatabaseConnection>,
    form: web::Form<SignupFormData>,
) -> Result<HttpResponse, Error> {
    let render = |client: ClientCtx, errors: &FormErrors| {
        SignupTemplate {
            client,
            form: &form,
            errors,
        }
        .to_response()
    };

    let (username, email) = match validate_signup_form(&form) {
        Ok(clean) => clean,
        Err(errors) => return Ok(render(client, &errors)),
    };

    let user = match insert_new_user(&db, &username, &form.password1, email).await {
        Ok(user) => user,
        Err(CreateUserError::NameTaken) => {
            let mut errors = FormErrors::new();
            errors.add("username", CreateUserError::NameTaken.to_string());
            return Ok(render(client, &errors));
        }
        Err(e) => {
            log::error!("post_signup: {}", e);
            return Err(error::ErrorInternalServerError("Failed to create account."));
        }
    };

    log_in(&db, &cookies, user.id).await?;
    log::info!("post_signup: created user {}", user.id);
    Ok(redirect("/"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_safe_next() {
        assert_eq!(safe_next(Some("/create/")), "/create/");
        assert_eq!(safe_next(Some("//evil.example/")), "/");
        assert_eq!(safe_next(Some("https://evil.example/")), "/");
        assert_eq!(safe_next(Some("/\\evil.example")), "/");
        assert_eq!(safe_next(None), "/");
    }

    #[test]
    fn test_validate_signup_form() {
        let form = SignupFormData {
            username: "leo".to_owned(),
            email: String::new(),
            password1: "correct horse".to_owned(),
            password2: "correct horse".to_owned(),
        };
        assert_eq!(validate_signup_form(&form), Ok(("leo".to_owned(), None)));

        let form = SignupFormData {
            username: "bad name!".to_owned(),
            email: "nope".to_owned(),
            password1: "short".to_owned(),
            password2: "other".to_owned(),
        };
        let errors = validate_signup_form(&form).unwrap_err();
        assert!(errors.has("username"));
        assert!(errors.has("email"));
        assert!(errors.has("password1"));
        assert!(errors.has("password2"));
    }
}
