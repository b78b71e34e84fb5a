use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use thiserror::Error;

use super::types::{PostControl, RemoteAuthor, RemoteBlog, RemoteComment, RemotePost};

/// SEC-003: Maximum element nesting inside one `<entry>`.
const MAX_ENTRY_DEPTH: usize = 64;

/// Errors that can occur while reading an Atom feed document.
#[derive(Debug, Error)]
pub enum AtomError {
    /// XML parsing failed.
    #[error("XML parse error: {0}")]
    XmlParse(String),

    /// SEC-003: Entry nesting depth exceeds safety limit.
    #[error("Entry nesting depth exceeds maximum of {0} levels")]
    MaxDepthExceeded(usize),
}

impl From<quick_xml::Error> for AtomError {
    fn from(e: quick_xml::Error) -> Self {
        AtomError::XmlParse(e.to_string())
    }
}

/// The subset of an Atom `<entry>` the importer reads.
///
/// Element names are matched on their local part, so `app:control` and
/// `control` are the same element regardless of namespace prefix.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct AtomEntry {
    pub title: Option<String>,
    pub content: Option<String>,
    pub published: Option<String>,
    pub updated: Option<String>,
    pub categories: Vec<String>,
    pub self_link: Option<String>,
    pub control: Option<PostControl>,
    pub authors: Vec<RemoteAuthor>,
}

impl AtomEntry {
    /// Identifier taken from the last path segment of the self link.
    fn id(&self) -> String {
        self.self_link
            .as_deref()
            .map(trailing_segment)
            .unwrap_or_default()
            .to_string()
    }
}

/// Last `/`-separated segment of a link, e.g. the post id of
/// `https://www.blogger.com/feeds/123/posts/default/456`.
pub fn trailing_segment(href: &str) -> &str {
    href.rsplit('/').next().unwrap_or(href)
}

/// Parses every `<entry>` of an Atom document, in document order.
///
/// # Security
///
/// SEC-002: quick-xml (0.37) never expands `<!ENTITY>` declarations; custom
/// entities fail to unescape instead of resolving.
pub(crate) fn parse_entries(bytes: &[u8]) -> Result<Vec<AtomEntry>, AtomError> {
    let mut reader = Reader::from_reader(bytes);

    let mut entries = Vec::new();
    let mut buf = Vec::new();
    let mut current: Option<AtomEntry> = None;
    // Local names of the open elements below the current <entry>
    let mut path: Vec<Vec<u8>> = Vec::new();
    let mut text = String::new();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) => {
                let name = e.local_name().as_ref().to_vec();
                match current.as_mut() {
                    None if name == b"entry" => {
                        current = Some(AtomEntry::default());
                        path.clear();
                    }
                    None => {}
                    Some(entry) => {
                        path.push(name);
                        if path.len() > MAX_ENTRY_DEPTH {
                            return Err(AtomError::MaxDepthExceeded(MAX_ENTRY_DEPTH));
                        }
                        text.clear();
                        open_element(entry, &path, &e, &reader)?;
                    }
                }
            }
            Event::Empty(e) => {
                if let Some(entry) = current.as_mut() {
                    path.push(e.local_name().as_ref().to_vec());
                    open_element(entry, &path, &e, &reader)?;
                    path.pop();
                }
            }
            Event::Text(t) => {
                if current.is_some() && !path.is_empty() {
                    let unescaped = t
                        .unescape()
                        .map_err(|e| AtomError::XmlParse(e.to_string()))?;
                    text.push_str(&unescaped);
                }
            }
            Event::CData(c) => {
                if current.is_some() && !path.is_empty() {
                    text.push_str(&String::from_utf8_lossy(c.as_ref()));
                }
            }
            Event::End(e) => {
                if let Some(entry) = current.as_mut() {
                    if path.is_empty() {
                        if e.local_name().as_ref() == b"entry" {
                            if let Some(done) = current.take() {
                                entries.push(done);
                            }
                        }
                    } else {
                        close_element(entry, &path, std::mem::take(&mut text));
                        path.pop();
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(entries)
}

/// Handles attributes and structure on an opening (or self-closing) tag.
fn open_element(
    entry: &mut AtomEntry,
    path: &[Vec<u8>],
    e: &BytesStart<'_>,
    reader: &Reader<&[u8]>,
) -> Result<(), AtomError> {
    let Some(name) = path.last() else {
        return Ok(());
    };
    if path.len() != 1 {
        return Ok(());
    }

    match name.as_slice() {
        b"category" => {
            if let Some(term) = attribute(e, reader, b"term")? {
                entry.categories.push(term);
            }
        }
        b"link" => {
            if attribute(e, reader, b"rel")?.as_deref() == Some("self") {
                entry.self_link = attribute(e, reader, b"href")?;
            }
        }
        b"control" => entry.control = Some(PostControl::default()),
        b"author" => entry.authors.push(RemoteAuthor::default()),
        _ => {}
    }
    Ok(())
}

/// Stores collected text when a field element closes.
fn close_element(entry: &mut AtomEntry, path: &[Vec<u8>], text: String) {
    let depth = path.len();
    let name = path[depth - 1].as_slice();
    let parent = if depth >= 2 {
        Some(path[depth - 2].as_slice())
    } else {
        None
    };

    match (depth, parent, name) {
        (1, _, b"title") => entry.title = Some(text),
        (1, _, b"content") => entry.content = Some(text),
        (1, _, b"published") => entry.published = Some(text),
        (1, _, b"updated") => entry.updated = Some(text),
        (2, Some(b"control"), b"draft") => {
            if let Some(control) = entry.control.as_mut() {
                control.draft = Some(text);
            }
        }
        (2, Some(b"author"), field) => {
            if let Some(author) = entry.authors.last_mut() {
                match field {
                    b"name" => author.name = Some(text),
                    b"email" => author.email = Some(text),
                    b"uri" => author.uri = Some(text),
                    _ => {}
                }
            }
        }
        _ => {}
    }
}

fn attribute(
    e: &BytesStart<'_>,
    reader: &Reader<&[u8]>,
    key: &[u8],
) -> Result<Option<String>, AtomError> {
    for attr_result in e.attributes() {
        let attr = match attr_result {
            Ok(attr) => attr,
            Err(err) => {
                tracing::warn!(error = %err, "Skipping malformed feed attribute");
                continue;
            }
        };
        if attr.key.local_name().as_ref() == key {
            let value = attr
                .decode_and_unescape_value(reader.decoder())
                .map_err(|err| AtomError::XmlParse(err.to_string()))?;
            return Ok(Some(value.into_owned()));
        }
    }
    Ok(None)
}

// ============================================================================
// Feed-specific views
// ============================================================================

pub(crate) fn parse_blogs(bytes: &[u8]) -> Result<Vec<RemoteBlog>, AtomError> {
    Ok(parse_entries(bytes)?
        .into_iter()
        .map(|entry| RemoteBlog {
            id: entry.id(),
            title: entry.title.unwrap_or_default(),
        })
        .collect())
}

pub(crate) fn parse_posts(bytes: &[u8]) -> Result<Vec<RemotePost>, AtomError> {
    Ok(parse_entries(bytes)?
        .into_iter()
        .map(|entry| RemotePost {
            id: entry.id(),
            title: entry.title.unwrap_or_default(),
            content: entry.content.unwrap_or_default(),
            published: entry.published.unwrap_or_default(),
            updated: entry.updated.unwrap_or_default(),
            control: entry.control,
            categories: entry.categories,
        })
        .collect())
}

pub(crate) fn parse_comments(bytes: &[u8]) -> Result<Vec<RemoteComment>, AtomError> {
    Ok(parse_entries(bytes)?
        .into_iter()
        .map(|entry| RemoteComment {
            content: entry.content.unwrap_or_default(),
            published: entry.published.unwrap_or_default(),
            author: entry.authors.into_iter().next(),
        })
        .collect())
}
