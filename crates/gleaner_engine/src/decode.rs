use chardetng::EncodingDetector;
use encoding_rs::Encoding;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedPage {
    pub html: String,
    pub encoding_label: String,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum DecodeError {
    #[error("failed to decode page bytes as {encoding}")]
    DecodeFailure { encoding: String },
}

/// Decode raw page bytes into UTF-8: BOM -> Content-Type charset ->
/// meta charset -> chardetng sniff.
///
/// Forum pages in the wild frequently declare GBK or Big5 in a meta tag
/// while the Content-Type header says nothing, so the meta scan runs
/// before statistical detection. A declared encoding that fails mid-way
/// falls through to the sniffing step rather than failing the run.
pub fn decode_page(bytes: &[u8], content_type: Option<&str>) -> Result<DecodedPage, DecodeError> {
    if let Some((encoding, _)) = Encoding::for_bom(bytes) {
        return decode_strict(bytes, encoding);
    }

    let declared = content_type
        .and_then(extract_charset)
        .or_else(|| meta_charset(bytes));
    if let Some(label) = declared {
        if let Some(encoding) = Encoding::for_label(label.as_bytes()) {
            if let Ok(page) = decode_strict(bytes, encoding) {
                return Ok(page);
            }
        }
    }

    let mut detector = EncodingDetector::new();
    detector.feed(bytes, true);
    let encoding = detector.guess(None, true);
    // The sniffed fallback decodes lossily; a page with a few mojibake
    // characters still yields its image URLs.
    let (text, _, _) = encoding.decode(bytes);
    Ok(DecodedPage {
        html: text.into_owned(),
        encoding_label: encoding.name().to_string(),
    })
}

fn decode_strict(bytes: &[u8], encoding: &'static Encoding) -> Result<DecodedPage, DecodeError> {
    let (text, _, had_errors) = encoding.decode(bytes);
    if had_errors {
        return Err(DecodeError::DecodeFailure {
            encoding: encoding.name().to_string(),
        });
    }
    Ok(DecodedPage {
        html: text.into_owned(),
        encoding_label: encoding.name().to_string(),
    })
}

fn extract_charset(content_type: &str) -> Option<String> {
    content_type.split(';').find_map(|part| {
        let part = part.trim();
        let prefix = part.get(..8)?;
        if !prefix.eq_ignore_ascii_case("charset=") {
            return None;
        }
        let label = part[8..].trim_matches([' ', '"', '\'']);
        (!label.is_empty()).then(|| label.to_string())
    })
}

/// Scan the head of the document for `charset=` inside a meta tag. ASCII
/// matching is safe here: every encoding a forum realistically serves is
/// ASCII-compatible in the markup range.
fn meta_charset(bytes: &[u8]) -> Option<String> {
    let head = &bytes[..bytes.len().min(2048)];
    let lower: Vec<u8> = head.iter().map(|b| b.to_ascii_lowercase()).collect();
    let needle = b"charset=";
    let start = lower
        .windows(needle.len())
        .position(|window| window == needle)?
        + needle.len();
    let label: String = head[start..]
        .iter()
        .skip_while(|b| matches!(b, b'"' | b'\'' | b' '))
        .take_while(|b| b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_'))
        .map(|b| *b as char)
        .collect();
    (!label.is_empty()).then_some(label)
}
