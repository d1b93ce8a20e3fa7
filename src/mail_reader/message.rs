use log::debug;
use mailparse::{parse_headers, parse_mail, MailHeader, MailParseError, ParsedMail};

/// Every header of a part, in the order they appeared.
///
/// Names compare case-insensitively and repeated headers are all kept.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Headers {
    entries: Vec<(String, String)>,
}

impl Headers {
    /// First value stored under `name`.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn get_all<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.entries
            .iter()
            .filter(move |(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl From<&[MailHeader<'_>]> for Headers {
    fn from(headers: &[MailHeader<'_>]) -> Self {
        Headers {
            entries: headers
                .iter()
                .map(|header| (header.get_key(), header.get_value()))
                .collect(),
        }
    }
}

/// A part holding literal content.
#[derive(Debug, Clone, PartialEq)]
pub struct LeafPart {
    pub headers: Headers,
    pub content_type: String,
    /// Payload as it appeared on the wire, before transfer decoding
    pub raw: String,
    /// Payload after base64 / quoted-printable decoding
    pub content: Vec<u8>,
    /// Charset-decoded payload, only for `text/*` parts
    pub text: Option<String>,
    pub filename: Option<String>,
}

impl LeafPart {
    pub fn filename(&self) -> Option<&str> {
        self.filename.as_deref()
    }
}

/// A `multipart/*` part whose payload is a list of further parts.
#[derive(Debug, Clone, PartialEq)]
pub struct ContainerPart {
    pub headers: Headers,
    pub content_type: String,
    pub raw: String,
    pub parts: Vec<ParsedMessage>,
}

/// A decoded mail message, or one part of it.
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedMessage {
    Leaf(LeafPart),
    Container(ContainerPart),
}

/// What [`ParsedMessage::content`] hands back.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Payload<'a> {
    Text(&'a str),
    Parts(&'a [ParsedMessage]),
}

impl ParsedMessage {
    /// Only a message whose header block cannot be read is an error. Parts
    /// with broken transfer encoding keep their undecoded bytes as content.
    pub fn parse(raw: &[u8]) -> Result<Self, MailParseError> {
        let mail = parse_mail(raw)?;
        Ok(Self::from_mail(&mail))
    }

    fn from_mail(mail: &ParsedMail) -> Self {
        let headers = Headers::from(mail.headers.as_slice());
        let content_type = mail.ctype.mimetype.to_ascii_lowercase();
        let section = body_section(mail);
        let raw = String::from_utf8_lossy(section).into_owned();

        if content_type.starts_with("multipart/") {
            let parts = mail.subparts.iter().map(Self::from_mail).collect();
            return ParsedMessage::Container(ContainerPart {
                headers,
                content_type,
                raw,
                parts,
            });
        }

        let content = mail.get_body_raw().unwrap_or_else(|e| {
            debug!("Keeping undecoded {} payload: {}", content_type, e);
            section.to_vec()
        });
        let text = if content_type.starts_with("text/") {
            Some(
                mail.get_body()
                    .unwrap_or_else(|_| String::from_utf8_lossy(&content).into_owned()),
            )
        } else {
            None
        };
        let filename = mail
            .get_content_disposition()
            .params
            .get("filename")
            .or_else(|| mail.ctype.params.get("name"))
            .map(|name| name.trim().to_string());

        ParsedMessage::Leaf(LeafPart {
            headers,
            content_type,
            raw,
            content,
            text,
            filename,
        })
    }

    pub fn headers(&self) -> &Headers {
        match self {
            ParsedMessage::Leaf(leaf) => &leaf.headers,
            ParsedMessage::Container(container) => &container.headers,
        }
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers().get(name)
    }

    pub fn subject(&self) -> Option<&str> {
        self.header("Subject")
    }

    pub fn sender(&self) -> Option<&str> {
        self.header("From")
    }

    pub fn recipient(&self) -> Option<&str> {
        self.header("To")
    }

    pub fn date(&self) -> Option<&str> {
        self.header("Date")
    }

    pub fn message_id(&self) -> Option<&str> {
        self.header("Message-ID")
    }

    /// Lowercased MIME type, `text/plain` when the header is absent.
    pub fn content_type(&self) -> &str {
        match self {
            ParsedMessage::Leaf(leaf) => &leaf.content_type,
            ParsedMessage::Container(container) => &container.content_type,
        }
    }

    pub fn is_multipart(&self) -> bool {
        matches!(self, ParsedMessage::Container(_))
    }

    pub fn content(&self) -> Payload<'_> {
        match self {
            ParsedMessage::Leaf(leaf) => Payload::Text(&leaf.raw),
            ParsedMessage::Container(container) => Payload::Parts(&container.parts),
        }
    }

    /// Undecoded text after the header block. For containers this includes the
    /// preamble, the boundaries and every nested part with its headers.
    pub fn raw_payload(&self) -> &str {
        match self {
            ParsedMessage::Leaf(leaf) => &leaf.raw,
            ParsedMessage::Container(container) => &container.raw,
        }
    }

    /// The leaf reached by always descending into the first sub-part.
    pub fn first_leaf(&self) -> Option<&LeafPart> {
        match self {
            ParsedMessage::Leaf(leaf) => Some(leaf),
            ParsedMessage::Container(container) => container.parts.first()?.first_leaf(),
        }
    }

    /// Decoded content of the first branch of the tree.
    ///
    /// Only sub-part 0 is ever followed, so `[[text/plain, text/html], image/png]`
    /// yields the `text/plain` part and `[image/png, text/plain]` yields the image
    /// bytes. An empty container has an empty body.
    pub fn body(&self) -> &[u8] {
        self.first_leaf()
            .map(|leaf| leaf.content.as_slice())
            .unwrap_or_default()
    }

    /// Same branch as [`body`](Self::body), charset-decoded when it is `text/*`.
    pub fn body_text(&self) -> Option<&str> {
        self.first_leaf().and_then(|leaf| leaf.text.as_deref())
    }

    /// Pre-order walk over this part and every nested part.
    pub fn walk(&self) -> Walk<'_> {
        Walk { stack: vec![self] }
    }

    /// Leaves carrying a `Content-Disposition` header and a non-empty filename,
    /// in tree-walk order.
    pub fn attachments(&self) -> Vec<&LeafPart> {
        self.walk()
            .filter_map(|part| match part {
                ParsedMessage::Leaf(leaf) => Some(leaf),
                ParsedMessage::Container(_) => None,
            })
            .filter(|leaf| leaf.headers.contains("Content-Disposition"))
            .filter(|leaf| leaf.filename().is_some_and(|name| !name.is_empty()))
            .collect()
    }
}

pub struct Walk<'a> {
    stack: Vec<&'a ParsedMessage>,
}

impl<'a> Iterator for Walk<'a> {
    type Item = &'a ParsedMessage;

    fn next(&mut self) -> Option<Self::Item> {
        let part = self.stack.pop()?;
        if let ParsedMessage::Container(container) = part {
            self.stack.extend(container.parts.iter().rev());
        }
        Some(part)
    }
}

// Everything after the header block, boundaries and nested parts included
fn body_section<'a>(mail: &ParsedMail<'a>) -> &'a [u8] {
    let raw = mail.raw_bytes;
    match parse_headers(raw) {
        Ok((_, offset)) => raw.get(offset..).unwrap_or_default(),
        Err(_) => &[],
    }
}
