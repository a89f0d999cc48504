use actix_session::{storage::CookieSessionStore, SessionMiddleware};
use actix_web::cookie::Key;
use actix_web::middleware::Logger;
use actix_web::web::Data;
use actix_web::{App, HttpServer};
use env_logger::Env;
use yatube::cache::PostListCache;
use yatube::global::get_settings;
use yatube::middleware::ClientCtx;
use yatube::session::remove_expired_sessions;
use yatube::{create_schema, init_db};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    init_lib_mods();
    init_our_mods();

    let db = init_db(std::env::var("DATABASE_URL").expect("DATABASE_URL must be set."))
        .await
        .expect("Database connection failed.");
    create_schema(&db)
        .await
        .expect("Database schema could not be created.");
    match remove_expired_sessions(&db).await {
        Ok(count) => log::info!("Removed {} expired sessions.", count),
        Err(e) => log::error!("remove_expired_sessions: {}", e),
    }

    let secret_key = match &get_settings().secret_key {
        Some(key) => Key::from(key),
        None => {
            log::warn!("SECRET_KEY is not set; sessions will not survive a restart.");
            Key::generate()
        }
    };

    let db = Data::new(db);
    let index_cache = Data::new(PostListCache::new(get_settings().index_cache_ttl));

    HttpServer::new(move || {
        // Order of middleware IS IMPORTANT and is in REVERSE EXECUTION ORDER.
        App::new()
            .app_data(db.clone())
            .app_data(index_cache.clone())
            .wrap(yatube::web::error::error_handlers())
            .wrap(ClientCtx::default())
            .wrap(SessionMiddleware::new(
                CookieSessionStore::default(),
                secret_key.clone(),
            ))
            .wrap(Logger::new("%a %r %s %Dms"))
            .configure(yatube::web::configure)
    })
    .bind(&get_settings().bind_addr)?
    .run()
    .await
}

/// Initialize third party crates we rely on but don't have control over.
pub fn init_lib_mods() {
    // A missing .env is fine when the environment is set some other way.
    if let Err(e) = dotenv::dotenv() {
        eprintln!("dotenv: {}", e);
    }
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();
}

/// Initialize all local mods.
/// Panics
pub fn init_our_mods() {
    // Settings first; the others read them.
    yatube::global::init();
    yatube::filesystem::init();
}
