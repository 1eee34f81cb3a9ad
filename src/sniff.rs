//! Magic-byte content classification for output naming.
//!
//! Downloaded comics are expected to be one of a handful of well-formed image
//! formats, so classification inspects exactly the first four bytes against a
//! fixed signature table. This is a lazy heuristic, not a format parser:
//! anything unrecognized (including short or empty input) gets the generic
//! [`UNKNOWN_EXT`] extension rather than an error.

/// Extension assigned to buffers that match no known signature.
pub const UNKNOWN_EXT: &str = ".xxx";

/// Signature table: first four bytes -> file extension.
///
/// GIF87a and GIF89a share the `GIF8` prefix. The three JPEG entries cover
/// the JFIF, EXIF, and Adobe APP markers. The two TIFF entries are the
/// little-endian variants in both byte orders; at least one strip (Close To
/// Home) really did serve TIFF.
const SIGNATURES: [(&[u8; 4], &str); 7] = [
    (b"GIF8", ".gif"),
    (&[0x89, b'P', b'N', b'G'], ".png"),
    (&[0xff, 0xd8, 0xff, 0xe0], ".jpg"), // JFIF
    (&[0xff, 0xd8, 0xff, 0xe1], ".jpg"), // EXIF
    (&[0xff, 0xd8, 0xff, 0xee], ".jpg"), // Adobe
    (&[b'I', b'I', 0x42, 0x00], ".tif"),
    (&[b'M', b'M', 0x00, 0x42], ".tif"),
];

/// Extensions this tool may have produced, used when cleaning output
/// directories of previous runs.
const OWNED_EXTENSIONS: [&str; 6] = ["gif", "png", "jpg", "tif", "xxx", "html"];

/// Classifies a byte buffer into a file extension by its magic signature.
///
/// Returns [`UNKNOWN_EXT`] for unmatched or short input.
#[must_use]
pub fn classify(body: &[u8]) -> &'static str {
    let Some(head) = body.get(..4) else {
        return UNKNOWN_EXT;
    };
    SIGNATURES
        .iter()
        .find(|(magic, _)| &magic[..] == head)
        .map_or(UNKNOWN_EXT, |&(_, ext)| ext)
}

/// Returns true if `ext` (without the leading dot) is one of the extensions
/// this tool writes.
#[must_use]
pub fn is_owned_extension(ext: &str) -> bool {
    OWNED_EXTENSIONS.contains(&ext)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_gif_both_versions() {
        assert_eq!(classify(b"GIF87a trailing data"), ".gif");
        assert_eq!(classify(b"GIF89a trailing data"), ".gif");
    }

    #[test]
    fn test_classify_png() {
        let png = [0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a];
        assert_eq!(classify(&png), ".png");
    }

    #[test]
    fn test_classify_jpeg_variants() {
        assert_eq!(classify(&[0xff, 0xd8, 0xff, 0xe0, 0x00]), ".jpg");
        assert_eq!(classify(&[0xff, 0xd8, 0xff, 0xe1, 0x00]), ".jpg");
        assert_eq!(classify(&[0xff, 0xd8, 0xff, 0xee, 0x00]), ".jpg");
    }

    #[test]
    fn test_classify_jpeg_unknown_app_marker_is_not_jpeg() {
        // APP2 marker is not in the table; lazy heuristic says unknown.
        assert_eq!(classify(&[0xff, 0xd8, 0xff, 0xe2, 0x00]), UNKNOWN_EXT);
    }

    #[test]
    fn test_classify_tiff_both_byte_orders() {
        assert_eq!(classify(&[b'I', b'I', 0x42, 0x00]), ".tif");
        assert_eq!(classify(&[b'M', b'M', 0x00, 0x42]), ".tif");
    }

    #[test]
    fn test_classify_unknown_bytes() {
        assert_eq!(classify(b"<html><body>not an image</body></html>"), ".xxx");
    }

    #[test]
    fn test_classify_short_input() {
        assert_eq!(classify(b"GIF"), UNKNOWN_EXT);
        assert_eq!(classify(b""), UNKNOWN_EXT);
    }

    #[test]
    fn test_owned_extensions() {
        for ext in ["gif", "png", "jpg", "tif", "xxx", "html"] {
            assert!(is_owned_extension(ext), "{ext} should be owned");
        }
        assert!(!is_owned_extension("pdf"));
        assert!(!is_owned_extension("json"));
    }
}
