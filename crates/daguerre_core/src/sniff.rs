//! Content type detection from magic bytes.
//!
//! Detection follows the WHATWG MIME sniffing rules: only the first
//! [`SNIFF_LEN`] bytes are considered and the result never depends on a
//! filename or a client-declared header.

/// Number of leading bytes inspected.
pub const SNIFF_LEN: usize = 512;

const OCTET_STREAM: &str = "application/octet-stream";
const TEXT_PLAIN: &str = "text/plain; charset=utf-8";

/// Tags that mark a document as HTML when they open it.
const HTML_TAGS: [&[u8]; 17] = [
    b"<!DOCTYPE HTML",
    b"<HTML",
    b"<HEAD",
    b"<SCRIPT",
    b"<IFRAME",
    b"<H1",
    b"<DIV",
    b"<FONT",
    b"<TABLE",
    b"<A",
    b"<STYLE",
    b"<TITLE",
    b"<B",
    b"<BODY",
    b"<BR",
    b"<P",
    b"<!--",
];

/// Detect the MIME type of `data`.
///
/// Returns `application/octet-stream` when no rule matches and the content
/// is binary, `text/plain; charset=utf-8` when it looks like text.
pub fn sniff_content_type(data: &[u8]) -> &'static str {
    let data = &data[..data.len().min(SNIFF_LEN)];

    if let Some(markup) = sniff_markup(data) {
        return markup;
    }
    if let Some(signature) = sniff_signature(data) {
        return signature;
    }
    if is_mp4(data) {
        return "video/mp4";
    }
    if data.iter().any(|&b| is_binary_byte(b)) {
        OCTET_STREAM
    } else {
        TEXT_PLAIN
    }
}

/// HTML and XML rules, which skip leading whitespace.
fn sniff_markup(data: &[u8]) -> Option<&'static str> {
    let start = data.iter().position(|&b| !is_whitespace(b))?;
    let data = &data[start..];

    for tag in HTML_TAGS {
        if data.len() > tag.len()
            && data[..tag.len()].eq_ignore_ascii_case(tag)
            && matches!(data[tag.len()], b' ' | b'>')
        {
            return Some("text/html; charset=utf-8");
        }
    }
    if data.starts_with(b"<?xml") {
        return Some("text/xml; charset=utf-8");
    }
    None
}

/// Exact and masked signatures.
fn sniff_signature(data: &[u8]) -> Option<&'static str> {
    let mime = match data {
        [b'%', b'P', b'D', b'F', b'-', ..] => "application/pdf",
        [b'%', b'!', b'P', b'S', b'-', b'A', b'd', b'o', b'b', b'e', b'-', ..] => {
            "application/postscript"
        }
        [0xfe, 0xff, ..] => "text/plain; charset=utf-16be",
        [0xff, 0xfe, ..] => "text/plain; charset=utf-16le",
        [0xef, 0xbb, 0xbf, ..] => TEXT_PLAIN,

        // Images
        [0x00, 0x00, 0x01 | 0x02, 0x00, ..] => "image/x-icon",
        [b'B', b'M', ..] => "image/bmp",
        [b'G', b'I', b'F', b'8', b'7' | b'9', b'a', ..] => "image/gif",
        [b'R', b'I', b'F', b'F', _, _, _, _, b'W', b'E', b'B', b'P', b'V', b'P', ..] => {
            "image/webp"
        }
        [0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a, ..] => "image/png",
        [0xff, 0xd8, 0xff, ..] => "image/jpeg",

        // Audio and video
        [b'F', b'O', b'R', b'M', _, _, _, _, b'A', b'I', b'F', b'F', ..] => "audio/aiff",
        [b'I', b'D', b'3', ..] => "audio/mpeg",
        [b'O', b'g', b'g', b'S', 0x00, ..] => "application/ogg",
        [b'M', b'T', b'h', b'd', 0x00, 0x00, 0x00, 0x06, ..] => "audio/midi",
        [b'R', b'I', b'F', b'F', _, _, _, _, b'A', b'V', b'I', b' ', ..] => "video/avi",
        [b'R', b'I', b'F', b'F', _, _, _, _, b'W', b'A', b'V', b'E', ..] => "audio/wave",
        [0x1a, 0x45, 0xdf, 0xa3, ..] => "video/webm",

        // Fonts
        [b'w', b'O', b'F', b'F', ..] => "font/woff",
        [b'w', b'O', b'F', b'2', ..] => "font/woff2",
        [b'O', b'T', b'T', b'O', ..] => "font/otf",
        [0x00, 0x01, 0x00, 0x00, ..] => "font/ttf",

        // Archives
        [0x1f, 0x8b, 0x08, ..] => "application/x-gzip",
        [b'P', b'K', 0x03, 0x04, ..] => "application/zip",
        [b'R', b'a', b'r', b'!', 0x1a, 0x07, 0x00, ..]
        | [b'R', b'a', b'r', b'!', 0x1a, 0x07, 0x01, 0x00, ..] => "application/x-rar-compressed",
        [0x00, b'a', b's', b'm', ..] => "application/wasm",
        _ => return None,
    };
    Some(mime)
}

/// ISO base media files declare an `mp4` brand in their leading `ftyp` box.
fn is_mp4(data: &[u8]) -> bool {
    if data.len() < 12 {
        return false;
    }
    let box_size = u32::from_be_bytes([data[0], data[1], data[2], data[3]]) as usize;
    if data.len() < box_size || box_size % 4 != 0 || &data[4..8] != b"ftyp" {
        return false;
    }
    (8..box_size)
        .step_by(4)
        .filter(|&offset| offset != 12)
        .any(|offset| data.get(offset..offset + 3) == Some(b"mp4".as_slice()))
}

fn is_whitespace(b: u8) -> bool {
    matches!(b, b'\t' | b'\n' | 0x0c | b'\r' | b' ')
}

fn is_binary_byte(b: u8) -> bool {
    matches!(b, 0x00..=0x08 | 0x0b | 0x0e..=0x1a | 0x1c..=0x1f)
}
