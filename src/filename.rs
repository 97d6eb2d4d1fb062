//! Target filename derivation for fetched images.

use crate::content_type::extension_or_default;
use crate::dedupe::INDEX_FILE_NAME;
use md5::{Digest, Md5};

/// MD5 of `data` as 32 lowercase hex characters.
pub fn content_hash(data: &[u8]) -> String {
    hex::encode(Md5::digest(data))
}

/// Takes the final segment of the URL path as a filename.
///
/// Returns `None` if the URL cannot be parsed, the segment is empty (root or
/// trailing slash), or it carries no extension separator. Query and fragment
/// are ignored.
pub fn filename_from_url(url: &str) -> Option<String> {
    let parsed = url::Url::parse(url).ok()?;
    let segment = parsed.path().rsplit('/').next()?;
    if segment.is_empty() || segment == "." || segment == ".." || !segment.contains('.') {
        return None;
    }
    // Never let a download clobber the hash index
    if segment == INDEX_FILE_NAME {
        return None;
    }
    Some(segment.to_string())
}

/// Filename for `data` fetched from `url`: the URL's own filename when it has
/// one, otherwise `<md5>.<ext>` with the extension sniffed from the content.
pub fn resolve_filename(url: &str, data: &[u8]) -> String {
    filename_from_url(url)
        .unwrap_or_else(|| format!("{}.{}", content_hash(data), extension_or_default(data)))
}
