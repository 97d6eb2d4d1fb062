pub mod image_server;

/// PNG signature followed by the start of an IHDR chunk
pub const PNG: [u8; 16] = [
    0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D, b'I', b'H', b'D', b'R',
];

pub const GIF: &[u8] = b"GIF89a\x01\x00\x01\x00\x80\x00\x00";
