//! Minimal typed XML building and scanning for the TallyPrime request
//! envelope.
//!
//! The protocol uses a small, fixed vocabulary of uppercase tags, so a
//! full XML parser is unnecessary; what matters is that every field value
//! is escaped on the way out and entity-decoded on the way in.

/// Escape a field value for element content or an attribute
pub fn escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(ch),
        }
    }
    out
}

/// Decode the five predefined entities
pub fn unescape(value: &str) -> String {
    value
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

/// Append-only builder for a request document
#[derive(Debug, Default)]
pub struct RequestBuilder {
    buf: String,
}

impl RequestBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn open(&mut self, tag: &str) -> &mut Self {
        self.buf.push('<');
        self.buf.push_str(tag);
        self.buf.push('>');
        self
    }

    pub fn open_attrs(&mut self, tag: &str, attrs: &[(&str, &str)]) -> &mut Self {
        self.buf.push('<');
        self.buf.push_str(tag);
        for (name, value) in attrs {
            self.buf.push(' ');
            self.buf.push_str(name);
            self.buf.push_str("=\"");
            self.buf.push_str(&escape(value));
            self.buf.push('"');
        }
        self.buf.push('>');
        self
    }

    pub fn close(&mut self, tag: &str) -> &mut Self {
        self.buf.push_str("</");
        self.buf.push_str(tag);
        self.buf.push('>');
        self
    }

    /// Element with escaped text content
    pub fn leaf(&mut self, tag: &str, value: &str) -> &mut Self {
        self.open(tag);
        self.buf.push_str(&escape(value));
        self.close(tag)
    }

    /// Splice pre-built, already-escaped XML
    pub fn raw(&mut self, xml: &str) -> &mut Self {
        self.buf.push_str(xml);
        self
    }

    pub fn finish(self) -> String {
        self.buf
    }
}

/// Byte offset of the first ASCII-case-insensitive occurrence of `needle`
/// at or after `from`. The tag vocabulary is ASCII, so matching on bytes is
/// safe and every returned offset is a char boundary of `haystack`.
fn find_ci(haystack: &str, needle: &str, from: usize) -> Option<usize> {
    let h = haystack.as_bytes();
    let n = needle.as_bytes();
    if n.is_empty() || h.len() < n.len() || from > h.len() - n.len() {
        return None;
    }
    (from..=h.len() - n.len()).find(|&i| h[i..i + n.len()].eq_ignore_ascii_case(n))
}

/// Text content of the first occurrence of `<tag>...</tag>`, decoded.
/// Tag matching is case-insensitive because responses vary in casing.
pub fn text_of(xml: &str, tag: &str) -> Option<String> {
    let open = format!("<{tag}>");
    let close = format!("</{tag}>");
    let start = find_ci(xml, &open, 0)? + open.len();
    let end = find_ci(xml, &close, start)?;
    Some(unescape(xml[start..end].trim()))
}

/// Text content of every occurrence of `<tag ...>...</tag>`, decoded
pub fn texts_of(xml: &str, tag: &str) -> Vec<String> {
    let open = format!("<{tag}");
    let close = format!("</{tag}>");
    let mut out = Vec::new();
    let mut at = 0;
    while let Some(open_at) = find_ci(xml, &open, at) {
        let Some(gt_rel) = xml[open_at..].find('>') else {
            break;
        };
        let content_at = open_at + gt_rel + 1;
        let Some(content_end) = find_ci(xml, &close, content_at) else {
            break;
        };
        out.push(unescape(xml[content_at..content_end].trim()));
        at = content_end + close.len();
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_round_trip() {
        let raw = r#"M/s Shah & Sons <Pvt> "Ltd" 'unit'"#;
        assert_eq!(unescape(&escape(raw)), raw);
        assert!(!escape(raw).contains('<'));
    }

    #[test]
    fn test_builder_nesting() {
        let mut b = RequestBuilder::new();
        b.open("ENVELOPE")
            .open("HEADER")
            .leaf("VERSION", "1")
            .close("HEADER")
            .close("ENVELOPE");
        assert_eq!(
            b.finish(),
            "<ENVELOPE><HEADER><VERSION>1</VERSION></HEADER></ENVELOPE>"
        );
    }

    #[test]
    fn test_leaf_escapes_value() {
        let mut b = RequestBuilder::new();
        b.leaf("LEDGERNAME", "Shah & Sons");
        assert_eq!(
            b.finish(),
            "<LEDGERNAME>Shah &amp; Sons</LEDGERNAME>"
        );
    }

    #[test]
    fn test_attrs_are_escaped() {
        let mut b = RequestBuilder::new();
        b.open_attrs("VOUCHER", &[("VCHTYPE", "Sales"), ("ACTION", "Create")])
            .close("VOUCHER");
        assert_eq!(
            b.finish(),
            r#"<VOUCHER VCHTYPE="Sales" ACTION="Create"></VOUCHER>"#
        );
    }

    #[test]
    fn test_text_of_case_insensitive() {
        let xml = "<Envelope><LineError>Ledger does not exist</LineError></Envelope>";
        assert_eq!(
            text_of(xml, "LINEERROR").as_deref(),
            Some("Ledger does not exist")
        );
        assert!(text_of(xml, "NAME").is_none());
    }

    #[test]
    fn test_text_of_after_non_ascii_content() {
        // characters whose uppercase form grows in bytes must not shift
        // the extraction offsets
        let xml =
            "<NARRATION>ııııı</NARRATION><LINEERROR>Ledger does not exist</LINEERROR>";
        assert_eq!(
            text_of(xml, "LINEERROR").as_deref(),
            Some("Ledger does not exist")
        );
        assert_eq!(text_of(xml, "NARRATION").as_deref(), Some("ııııı"));
    }

    #[test]
    fn test_texts_of_after_non_ascii_content() {
        let xml = "<NAME>Müller &amp; Söhne</NAME><NAME>ışık Traders</NAME>";
        assert_eq!(texts_of(xml, "NAME"), vec!["Müller & Söhne", "ışık Traders"]);
    }

    #[test]
    fn test_texts_of_collects_all() {
        let xml = "<COMPANY><NAME>Alpha</NAME></COMPANY><COMPANY><NAME>Beta &amp; Co</NAME></COMPANY>";
        assert_eq!(texts_of(xml, "NAME"), vec!["Alpha", "Beta & Co"]);
    }
}
