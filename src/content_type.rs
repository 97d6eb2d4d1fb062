/// Extension used when the content does not match any known image signature.
pub const DEFAULT_EXTENSION: &str = "jpg";

const JXL_CONTAINER: &[u8] = &[
    0x00, 0x00, 0x00, 0x0C, b'J', b'X', b'L', b' ', 0x0D, 0x0A, 0x87, 0x0A,
];

/// Guess an image file extension (without the leading dot) from magic bytes.
pub fn guess_extension(data: &[u8]) -> Option<&'static str> {
    if data.starts_with(&[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]) {
        return Some("png");
    }
    if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
        return Some("jpg");
    }
    if data.starts_with(b"GIF87a") || data.starts_with(b"GIF89a") {
        return Some("gif");
    }
    if data.starts_with(b"RIFF") && data.len() >= 12 && &data[8..12] == b"WEBP" {
        return Some("webp");
    }
    // CR2 is a TIFF container, check it before plain TIFF
    if data.len() >= 10 && data.starts_with(b"II*\0") && &data[8..10] == b"CR" {
        return Some("cr2");
    }
    if data.starts_with(b"II*\0") || data.starts_with(b"MM\0*") {
        return Some("tif");
    }
    if data.starts_with(&[0x49, 0x49, 0xBC]) {
        return Some("jxr");
    }
    if data.starts_with(&[0xFF, 0x0A]) || data.starts_with(JXL_CONTAINER) {
        return Some("jxl");
    }
    if let Some(ext) = iso_bmff_extension(data) {
        return Some(ext);
    }
    if data.starts_with(b"8BPS") {
        return Some("psd");
    }
    if data.starts_with(&[0x00, 0x00, 0x01, 0x00]) {
        return Some("ico");
    }
    if data.starts_with(b"BM") {
        return Some("bmp");
    }
    None
}

/// AVIF and HEIF share the ISO-BMFF `ftyp` box; the major brand tells them apart.
fn iso_bmff_extension(data: &[u8]) -> Option<&'static str> {
    if data.len() < 12 || &data[4..8] != b"ftyp" {
        return None;
    }
    match &data[8..12] {
        b"avif" | b"avis" => Some("avif"),
        b"heic" | b"heix" | b"heim" | b"heis" | b"hevc" | b"hevx" | b"mif1" | b"msf1" => {
            Some("heic")
        }
        _ => None,
    }
}

pub fn extension_or_default(data: &[u8]) -> &'static str {
    guess_extension(data).unwrap_or(DEFAULT_EXTENSION)
}

/// Whether a `Content-Type` header value declares an image payload.
pub fn is_image_content_type(header: &str) -> bool {
    header.trim().to_ascii_lowercase().starts_with("image/")
}
