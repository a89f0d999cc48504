pub mod cache;
pub mod comment;
pub mod db;
pub mod filesystem;
pub mod follow;
pub mod form;
pub mod global;
pub mod group;
pub mod middleware;
pub mod orm;
pub mod paginator;
pub mod post;
pub mod session;
pub mod user;
pub mod web;

pub use db::{create_schema, init_db};
