use crate::global::get_settings;
use actix_files as fs;
use actix_web::{error, get, web, Error};
use std::path::{Component, Path, PathBuf};

pub(super) fn configure(conf: &mut actix_web::web::ServiceConfig) {
    conf.service(view_static).service(view_media);
}

/// Joins a request path onto `root`, refusing anything that climbs out of it.
fn resolve(root: &Path, filename: &str) -> Result<PathBuf, Error> {
    let req_path = PathBuf::from(filename);
    if req_path
        .components()
        .any(|c| !matches!(c, Component::Normal(_)))
    {
        return Err(error::ErrorNotFound("File not found."));
    }
    Ok(root.join(req_path))
}

#[get("/static/{filename:.*}")]
async fn view_static(filename: web::Path<String>) -> Result<fs::NamedFile, Error> {
    let path = resolve(Path::new("public/static/"), &filename)?;
    let file = fs::NamedFile::open(path)?;

    Ok(file.use_last_modified(true))
}

#[get("/media/{filename:.*}")]
async fn view_media(filename: web::Path<String>) -> Result<fs::NamedFile, Error> {
    let path = resolve(&get_settings().media_dir, &filename)?;
    let file = fs::NamedFile::open(path)?;

    Ok(file.use_last_modified(true))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_rejects_traversal() {
        let root = Path::new("media");
        assert_eq!(
            resolve(root, "posts/cat.gif").unwrap(),
            PathBuf::from("media/posts/cat.gif")
        );
        assert!(resolve(root, "../secret").is_err());
        assert!(resolve(root, "/etc/passwd").is_err());
    }
}
