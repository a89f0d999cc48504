use crate::global::get_settings;
use actix_multipart::Multipart;
use actix_web::{error, Error};
use futures::{StreamExt, TryStreamExt};
use image::ImageFormat;
use std::collections::HashMap;
use std::io::Cursor;
use std::path::{Path, PathBuf};

/// Subdirectory of the media root that post images are written to.
pub const POST_IMAGE_DIR: &str = "posts";

const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;
const MAX_TEXT_BYTES: usize = 256 * 1024;

/// Formats accepted as post images.
const IMAGE_FORMATS: &[ImageFormat] = &[
    ImageFormat::Png,
    ImageFormat::Jpeg,
    ImageFormat::Gif,
    ImageFormat::WebP,
    ImageFormat::Bmp,
];

/// A file field read out of a multipart body.
#[derive(Clone, Debug)]
pub struct UploadPayload {
    pub filename: String,
    pub data: Vec<u8>,
}

impl UploadPayload {
    /// Detects the format from the file contents. The client's filename and content type are ignored.
    /// The header must also parse, so a bare magic number is not enough.
    pub fn image_format(&self) -> Option<ImageFormat> {
        let format = image::guess_format(&self.data).ok()?;
        if !IMAGE_FORMATS.contains(&format) {
            return None;
        }
        match image::io::Reader::with_format(Cursor::new(&self.data), format).into_dimensions() {
            Ok(_) => Some(format),
            Err(e) => {
                log::debug!("image_format: {:?} header rejected: {}", format, e);
                None
            }
        }
    }

    pub fn is_image(&self) -> bool {
        self.image_format().is_some()
    }
}

/// Text fields and files of a multipart form.
#[derive(Debug, Default)]
pub struct MultipartForm {
    pub text: HashMap<String, String>,
    pub files: HashMap<String, UploadPayload>,
}

impl MultipartForm {
    pub fn text(&self, name: &str) -> &str {
        self.text.get(name).map(String::as_str).unwrap_or("")
    }

    pub fn take_file(&mut self, name: &str) -> Option<UploadPayload> {
        self.files.remove(name)
    }
}

/// Ensures the media directory exists.
pub fn init() {
    let dir = get_settings().media_dir.join(POST_IMAGE_DIR);
    if !dir.exists() {
        std::fs::DirBuilder::new()
            .recursive(true)
            .create(&dir)
            .expect("failed to create MEDIA_DIR");
    }
}

/// Drains a multipart stream into memory.
/// File fields without a filename or without content are treated as absent.
pub async fn read_multipart(mut multipart: Multipart) -> Result<MultipartForm, Error> {
    let mut form = MultipartForm::default();

    while let Some(mut field) = multipart.try_next().await.map_err(|e| {
        log::warn!("read_multipart: {}", e);
        error::ErrorBadRequest("Malformed form data.")
    })? {
        let disposition = field.content_disposition();
        let name = match disposition.get_name() {
            Some(name) => name.to_owned(),
            None => continue,
        };
        let filename = disposition.get_filename().map(str::to_owned);
        let limit = if filename.is_some() {
            MAX_UPLOAD_BYTES
        } else {
            MAX_TEXT_BYTES
        };

        let mut buf: Vec<u8> = Vec::with_capacity(1024);
        while let Some(chunk) = field.next().await {
            let bytes = chunk.map_err(|e| {
                log::error!("read_multipart: multipart read error: {}", e);
                error::ErrorBadRequest("Error reading upload data.")
            })?;
            if buf.len() + bytes.len() > limit {
                return Err(error::ErrorPayloadTooLarge("Upload is too large."));
            }
            buf.extend_from_slice(&bytes);
        }

        match filename {
            Some(filename) if !filename.is_empty() && !buf.is_empty() => {
                form.files.insert(
                    name,
                    UploadPayload {
                        filename,
                        data: buf,
                    },
                );
            }
            Some(_) => {}
            None => {
                let value = String::from_utf8(buf)
                    .map_err(|_| error::ErrorBadRequest("Form data must be UTF-8."))?;
                form.text.insert(name, value);
            }
        }
    }

    Ok(form)
}

/// Strips directories and anything outside a conservative character set.
pub fn sanitize_filename(filename: &str) -> String {
    let base = filename
        .rsplit(|c: char| c == '/' || c == '\\')
        .next()
        .unwrap_or_default();
    let clean: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    let clean = clean.trim_start_matches('.').to_owned();
    if clean.is_empty() {
        "upload".to_owned()
    } else {
        clean
    }
}

/// Sanitized stem of the client's filename with the extension of the detected format.
fn image_filename(filename: &str, format: ImageFormat) -> String {
    let clean = sanitize_filename(filename);
    let stem = match clean.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem,
        _ => clean.as_str(),
    };
    let ext = format.extensions_str().first().copied().unwrap_or("img");
    format!("{}.{}", stem, ext)
}

/// Picks a free name under `dir`, suffixing a short content hash on collision.
fn choose_name(dir: &Path, filename: &str, data: &[u8]) -> String {
    if !dir.join(filename).exists() {
        return filename.to_owned();
    }

    let hash = blake3::hash(data).to_hex();
    let (stem, ext) = match filename.rsplit_once('.') {
        Some((stem, ext)) => (stem, format!(".{}", ext)),
        None => (filename, String::new()),
    };

    let mut len = 7;
    loop {
        let candidate = format!("{}_{}{}", stem, &hash[..len], ext);
        if !dir.join(&candidate).exists() || len >= hash.len() {
            return candidate;
        }
        len += 1;
    }
}

/// Writes a post image beneath the media root and returns its stored path, i.e. `posts/cat.gif`.
/// Anything which is not an image is refused.
pub async fn save_post_image(media_dir: &Path, payload: UploadPayload) -> Result<String, Error> {
    let format = payload
        .image_format()
        .ok_or_else(|| error::ErrorBadRequest("Upload a valid image."))?;
    let dir: PathBuf = media_dir.join(POST_IMAGE_DIR);
    let filename = image_filename(&payload.filename, format);

    actix_web::web::block(move || -> std::io::Result<String> {
        std::fs::create_dir_all(&dir)?;
        let name = choose_name(&dir, &filename, &payload.data);
        std::fs::write(dir.join(&name), &payload.data)?;
        Ok(format!("{}/{}", POST_IMAGE_DIR, name))
    })
    .await
    .map_err(error::ErrorInternalServerError)?
    .map_err(|e| {
        log::error!("save_post_image: {}", e);
        error::ErrorInternalServerError("Failed to store image.")
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 2x1 GIF.
    const SMALL_GIF: &[u8] = &[
        0x47, 0x49, 0x46, 0x38, 0x39, 0x61, 0x02, 0x00, 0x01, 0x00, 0xc0, 0x00, 0x00, 0x00, 0x00,
        0x00, 0xff, 0xff, 0xff, 0x21, 0xf9, 0x04, 0x01, 0x00, 0x00, 0x00, 0x00, 0x2c, 0x00, 0x00,
        0x00, 0x00, 0x02, 0x00, 0x01, 0x00, 0x00, 0x02, 0x02, 0x0c, 0x0a, 0x00, 0x3b,
    ];

    fn upload(filename: &str, data: &[u8]) -> UploadPayload {
        UploadPayload {
            filename: filename.to_owned(),
            data: data.to_vec(),
        }
    }

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("cat.gif"), "cat.gif");
        assert_eq!(sanitize_filename("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_filename("C:\\pics\\my cat.png"), "my_cat.png");
        assert_eq!(sanitize_filename(".htaccess"), "htaccess");
        assert_eq!(sanitize_filename(""), "upload");
    }

    #[test]
    fn test_image_format_reads_contents() {
        assert_eq!(upload("Test.gif", SMALL_GIF).image_format(), Some(ImageFormat::Gif));
        // The name does not matter, only the bytes.
        assert_eq!(upload("photo.txt", SMALL_GIF).image_format(), Some(ImageFormat::Gif));

        assert!(!upload("evil.png", b"<script>alert(1)</script>").is_image());
        assert!(!upload("notes.txt", b"hello").is_image());
        assert!(!upload("empty.gif", b"").is_image());
        // Magic number with nothing behind it.
        assert!(!upload("short.gif", b"GIF89a").is_image());
    }

    #[test]
    fn test_image_filename_uses_detected_format() {
        assert_eq!(image_filename("Test.gif", ImageFormat::Gif), "Test.gif");
        assert_eq!(image_filename("evil.html", ImageFormat::Gif), "evil.gif");
        assert_eq!(image_filename("noext", ImageFormat::Png), "noext.png");
        assert_eq!(image_filename("a.tar.gz", ImageFormat::Jpeg), "a.tar.jpg");
    }

    #[actix_rt::test]
    async fn test_save_post_image_avoids_collisions() {
        let root = std::env::temp_dir().join(format!("yatube-media-{}", uuid::Uuid::new_v4()));
        let mut other = SMALL_GIF.to_vec();
        other.push(0x00);

        let first = save_post_image(&root, upload("Test.gif", SMALL_GIF)).await.unwrap();
        let second = save_post_image(&root, upload("Test.gif", &other)).await.unwrap();

        assert_eq!(first, "posts/Test.gif");
        assert_ne!(first, second);
        assert!(second.starts_with("posts/Test_"));
        assert!(second.ends_with(".gif"));
        assert_eq!(std::fs::read(root.join(&second)).unwrap(), other);

        std::fs::remove_dir_all(root).ok();
    }

    #[actix_rt::test]
    async fn test_save_post_image_refuses_non_images() {
        let root = std::env::temp_dir().join(format!("yatube-media-{}", uuid::Uuid::new_v4()));
        let res = save_post_image(&root, upload("evil.html", b"<script>alert(1)</script>")).await;
        assert!(res.is_err());
        assert!(!root.join(POST_IMAGE_DIR).join("evil.html").exists());
        std::fs::remove_dir_all(root).ok();
    }
}
