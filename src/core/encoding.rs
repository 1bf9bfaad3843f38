//! Markup Encoding Detection and Conversion
//!
//! Handles detection of the character encoding based on BOM, a leading
//! `<?xml ... encoding="..."?>` declaration, or the encoding declared by the
//! resource. Converts the input to UTF-8 before tokenizing.

use crate::error::ResourceError;

/// Encoding indicated by a byte order mark or byte pattern
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BomEncoding {
    Utf8,
    Utf16Le,
    Utf16Be,
    /// No BOM and no UTF-16 byte pattern
    None,
}

impl BomEncoding {
    /// Detect encoding from byte order mark or initial bytes
    pub fn detect(input: &[u8]) -> Self {
        if input.len() < 2 {
            return BomEncoding::None;
        }

        match (input[0], input[1]) {
            // UTF-16 LE BOM: 0xFF 0xFE
            (0xFF, 0xFE) => BomEncoding::Utf16Le,
            // UTF-16 BE BOM: 0xFE 0xFF
            (0xFE, 0xFF) => BomEncoding::Utf16Be,
            // UTF-8 BOM: 0xEF 0xBB 0xBF
            (0xEF, 0xBB) if input.len() >= 3 && input[2] == 0xBF => BomEncoding::Utf8,
            // No BOM - check for UTF-16 pattern (< followed by null or null followed by <)
            (0x00, b'<') => BomEncoding::Utf16Be,
            (b'<', 0x00) => BomEncoding::Utf16Le,
            _ => BomEncoding::None,
        }
    }
}

/// Decoded markup text plus what was learned about its encoding
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedMarkup {
    pub text: String,
    /// Canonical name of the encoding actually used
    pub encoding: String,
    /// The leading `<?xml ...?>` declaration, if present
    pub xml_declaration: Option<String>,
}

/// Leading xml declaration found in ASCII-compatible input
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlDeclaration {
    pub text: String,
    pub encoding: Option<String>,
}

/// Parse a leading `<?xml ... ?>` declaration (leading whitespace allowed).
/// Only ASCII bytes are inspected, so this works on any ASCII-compatible input.
pub fn read_xml_declaration(input: &[u8]) -> Option<XmlDeclaration> {
    let start = input.iter().position(|b| !matches!(b, b' ' | b'\t' | b'\n' | b'\r'))?;
    let rest = &input[start..];
    if rest.len() < 6 || !rest[..5].eq_ignore_ascii_case(b"<?xml") || !rest[5].is_ascii_whitespace() {
        return None;
    }
    let end = memchr::memmem::find(rest, b"?>")? + 2;
    let decl = &rest[..end];
    if !decl.is_ascii() {
        return None;
    }
    let text = String::from_utf8_lossy(decl).into_owned();
    let encoding = pseudo_attribute(&text, "encoding");
    Some(XmlDeclaration { text, encoding })
}

/// Extract `name="value"` from an xml declaration
fn pseudo_attribute(decl: &str, name: &str) -> Option<String> {
    let lower = decl.to_ascii_lowercase();
    let mut from = 0;
    while let Some(i) = lower[from..].find(name) {
        let at = from + i;
        from = at + name.len();
        let preceded_by_space = at > 0 && lower.as_bytes()[at - 1].is_ascii_whitespace();
        let rest = lower[from..].trim_start();
        if !preceded_by_space || !rest.starts_with('=') {
            continue;
        }
        let value_start = decl.len() - rest.len() + 1;
        let rest = decl[value_start..].trim_start();
        let quote = rest.chars().next()?;
        if quote != '"' && quote != '\'' {
            return None;
        }
        let value = &rest[1..];
        return value.find(quote).map(|end| value[..end].to_string());
    }
    None
}

/// Decode markup bytes to UTF-8.
///
/// Resolution order: BOM, xml declaration, `declared` (from the resource),
/// then `default_encoding`.
pub fn decode_markup(
    input: &[u8],
    declared: Option<&str>,
    default_encoding: &str,
    resource: &str,
) -> Result<DecodedMarkup, ResourceError> {
    match BomEncoding::detect(input) {
        BomEncoding::Utf16Le => {
            let text = convert_utf16(input, false).map_err(|m| encoding_error(resource, "UTF-16LE", m))?;
            return Ok(finish(text, "UTF-16LE"));
        }
        BomEncoding::Utf16Be => {
            let text = convert_utf16(input, true).map_err(|m| encoding_error(resource, "UTF-16BE", m))?;
            return Ok(finish(text, "UTF-16BE"));
        }
        BomEncoding::Utf8 => {
            let text = decode_named(&input[3..], "UTF-8", resource)?;
            return Ok(finish(text, "UTF-8"));
        }
        BomEncoding::None => {}
    }

    let from_decl = read_xml_declaration(input).and_then(|d| d.encoding);
    let name = from_decl
        .as_deref()
        .or(declared)
        .unwrap_or(default_encoding);
    let canonical = canonical_name(name).ok_or_else(|| {
        encoding_error(resource, name, "unsupported encoding".to_string())
    })?;
    let text = decode_named(input, canonical, resource)?;
    Ok(finish(text, canonical))
}

fn finish(text: String, encoding: &str) -> DecodedMarkup {
    let xml_declaration = read_xml_declaration(text.as_bytes()).map(|d| d.text);
    DecodedMarkup {
        text,
        encoding: encoding.to_string(),
        xml_declaration,
    }
}

/// Map an encoding label to one of the supported canonical names
pub fn canonical_name(label: &str) -> Option<&'static str> {
    match label.trim().to_ascii_lowercase().as_str() {
        "utf-8" | "utf8" => Some("UTF-8"),
        "utf-16le" => Some("UTF-16LE"),
        "utf-16be" | "utf-16" => Some("UTF-16BE"),
        "iso-8859-1" | "iso8859-1" | "latin1" | "latin-1" | "l1" => Some("ISO-8859-1"),
        "us-ascii" | "ascii" => Some("US-ASCII"),
        _ => None,
    }
}

fn decode_named(input: &[u8], canonical: &str, resource: &str) -> Result<String, ResourceError> {
    match canonical {
        "UTF-8" => String::from_utf8(input.to_vec())
            .map_err(|e| encoding_error(resource, canonical, e.to_string())),
        "US-ASCII" => {
            if let Some(pos) = input.iter().position(|b| !b.is_ascii()) {
                return Err(encoding_error(
                    resource,
                    canonical,
                    format!("non-ASCII byte at offset {pos}"),
                ));
            }
            Ok(input.iter().map(|&b| b as char).collect())
        }
        // Every byte maps to the code point of the same value
        "ISO-8859-1" => Ok(input.iter().map(|&b| b as char).collect()),
        "UTF-16LE" => convert_utf16(input, false).map_err(|m| encoding_error(resource, canonical, m)),
        "UTF-16BE" => convert_utf16(input, true).map_err(|m| encoding_error(resource, canonical, m)),
        other => Err(encoding_error(resource, other, "unsupported encoding".to_string())),
    }
}

fn encoding_error(resource: &str, encoding: &str, message: String) -> ResourceError {
    ResourceError::Encoding {
        resource: resource.to_string(),
        encoding: encoding.to_string(),
        message,
    }
}

/// Convert UTF-16 bytes (BOM optional) to a UTF-8 string
fn convert_utf16(input: &[u8], big_endian: bool) -> Result<String, String> {
    // Skip BOM if present
    let bom: [u8; 2] = if big_endian { [0xFE, 0xFF] } else { [0xFF, 0xFE] };
    let start = if input.starts_with(&bom) { 2 } else { 0 };
    let bytes = &input[start..];

    // Ensure even number of bytes
    if bytes.len() % 2 != 0 {
        return Err("odd number of bytes".to_string());
    }

    let code_units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|chunk| {
            if big_endian {
                u16::from_be_bytes([chunk[0], chunk[1]])
            } else {
                u16::from_le_bytes([chunk[0], chunk[1]])
            }
        })
        .collect();

    String::from_utf16(&code_units).map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_bom() {
        assert_eq!(BomEncoding::detect(b"<root/>"), BomEncoding::None);
        assert_eq!(BomEncoding::detect(&[0xEF, 0xBB, 0xBF, b'<']), BomEncoding::Utf8);
        assert_eq!(BomEncoding::detect(&[0xFF, 0xFE, b'<', 0x00]), BomEncoding::Utf16Le);
        assert_eq!(BomEncoding::detect(&[0xFE, 0xFF, 0x00, b'<']), BomEncoding::Utf16Be);
    }

    #[test]
    fn test_xml_declaration_encoding() {
        let decl = read_xml_declaration(b"<?xml version=\"1.0\" encoding='ISO-8859-1'?>\n<html/>").unwrap();
        assert_eq!(decl.encoding.as_deref(), Some("ISO-8859-1"));
        assert_eq!(decl.text, "<?xml version=\"1.0\" encoding='ISO-8859-1'?>");
    }

    #[test]
    fn test_no_declaration() {
        assert!(read_xml_declaration(b"<html>").is_none());
        assert!(read_xml_declaration(b"<?xml-stylesheet href='a'?>").is_none());
    }

    #[test]
    fn test_declared_latin1_is_decoded() {
        let mut input = b"<?xml version=\"1.0\" encoding=\"ISO-8859-1\"?><p>".to_vec();
        input.push(0xE9); // é
        input.extend_from_slice(b"</p>");
        let decoded = decode_markup(&input, None, "UTF-8", "test").unwrap();
        assert_eq!(decoded.encoding, "ISO-8859-1");
        assert!(decoded.text.ends_with("<p>\u{e9}</p>"));
        assert!(decoded.xml_declaration.is_some());
    }

    #[test]
    fn test_resource_encoding_used_without_declaration() {
        let decoded = decode_markup(&[b'<', b'p', b'>', 0xFC], Some("latin1"), "UTF-8", "test").unwrap();
        assert_eq!(decoded.text, "<p>\u{fc}");
    }

    #[test]
    fn test_utf16_le_with_bom() {
        let input = vec![0xFF, 0xFE, b'<', 0x00, b'r', 0x00, b'/', 0x00, b'>', 0x00];
        let decoded = decode_markup(&input, None, "UTF-8", "test").unwrap();
        assert_eq!(decoded.text, "<r/>");
        assert_eq!(decoded.encoding, "UTF-16LE");
    }

    #[test]
    fn test_utf8_bom_is_stripped() {
        let decoded = decode_markup(&[0xEF, 0xBB, 0xBF, b'<', b'a', b'>'], None, "UTF-8", "test").unwrap();
        assert_eq!(decoded.text, "<a>");
    }

    #[test]
    fn test_unsupported_encoding() {
        let err = decode_markup(b"<a>", Some("EBCDIC"), "UTF-8", "page.html").unwrap_err();
        assert!(matches!(err, ResourceError::Encoding { .. }));
    }

    #[test]
    fn test_invalid_utf8() {
        assert!(decode_markup(&[b'<', 0xFF, b'>'], None, "UTF-8", "x").is_err());
    }
}
