use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Image,
    Video,
}

pub fn media_kind(path: &Path) -> Option<MediaKind> {
    let extension = path.extension()?.to_string_lossy();
    if extension.eq_ignore_ascii_case("jpg") || extension.eq_ignore_ascii_case("jpeg") {
        Some(MediaKind::Image)
    } else if extension.eq_ignore_ascii_case("mp4") {
        Some(MediaKind::Video)
    } else {
        None
    }
}
