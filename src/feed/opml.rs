use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use thiserror::Error;
use url::Url;

use crate::util::{validate_url, HostPolicy};

/// SEC-003: Maximum allowed nesting depth for OPML outline elements.
const MAX_OPML_DEPTH: usize = 50;

/// Errors that can occur during OPML parsing.
#[derive(Debug, Error)]
pub enum OpmlError {
    /// SEC-003: OPML nesting depth exceeds safety limit.
    #[error("OPML nesting depth exceeds maximum of {0} levels")]
    MaxDepthExceeded(usize),

    /// XML parsing failed.
    #[error("XML parse error: {0}")]
    XmlParse(String),
}

impl From<quick_xml::Error> for OpmlError {
    fn from(e: quick_xml::Error) -> Self {
        OpmlError::XmlParse(e.to_string())
    }
}

/// Extracts feed URLs from an OPML document.
///
/// Every `<outline>` carrying an `xmlUrl` attribute contributes one URL,
/// whatever its nesting. Folder outlines without `xmlUrl` are traversed but
/// contribute nothing. URLs failing validation under `policy` are skipped
/// with a warning.
///
/// # Security
///
/// SEC-002: quick-xml (0.37) never parses `<!ENTITY>` declarations, and
/// attribute values go through `decode_and_unescape_value()`, which only
/// resolves the five XML builtins. Custom entities are an error, not an
/// expansion.
pub fn parse_opml(content: &str, policy: HostPolicy) -> Result<Vec<Url>, OpmlError> {
    let mut reader = Reader::from_str(content);
    reader.config_mut().trim_text(true);

    let mut urls = Vec::new();
    let mut buf = Vec::new();
    let mut depth: usize = 0;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) if e.name().as_ref() == b"outline" => {
                depth += 1;
                if depth > MAX_OPML_DEPTH {
                    return Err(OpmlError::MaxDepthExceeded(MAX_OPML_DEPTH));
                }
                urls.extend(outline_url(&e, &reader, policy)?);
            }
            Ok(Event::Empty(e)) if e.name().as_ref() == b"outline" => {
                urls.extend(outline_url(&e, &reader, policy)?);
            }
            Ok(Event::End(e)) if e.name().as_ref() == b"outline" => {
                depth = depth.saturating_sub(1);
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(e.into()),
            _ => {}
        }
        buf.clear();
    }

    Ok(urls)
}

fn outline_url(
    e: &BytesStart<'_>,
    reader: &Reader<&[u8]>,
    policy: HostPolicy,
) -> Result<Option<Url>, OpmlError> {
    for attr_result in e.attributes() {
        let attr = match attr_result {
            Ok(attr) => attr,
            Err(err) => {
                tracing::warn!(error = %err, "Skipping malformed OPML attribute");
                continue;
            }
        };
        if attr.key.as_ref() != b"xmlUrl" {
            continue;
        }

        let raw = attr.decode_and_unescape_value(reader.decoder())?;
        return match validate_url(&raw, policy) {
            Ok(url) => Ok(Some(url)),
            Err(e) => {
                tracing::warn!(url = %raw, error = %e, "Skipping invalid feed URL");
                Ok(None)
            }
        };
    }
    Ok(None)
}

/// Returns true when the document looks like OPML rather than a plain URL list.
pub fn looks_like_opml(content: &str) -> bool {
    content.contains("<opml") || content.contains("<outline")
}
