//! Low-level HTML string helpers.
//!
//! Deliberately naive: enough to walk a server-rendered price table without a
//! DOM. Tag names are matched ASCII case-insensitively and must be followed by
//! `>`, `/` or whitespace, so `<tr` never matches `<track`. Comments and
//! `<script>`/`<style>` bodies are blanked with [`mask_raw_text`] before any
//! tag search, so markup quoted inside them is never taken for an element.

/// ASCII-only lowercasing. Byte offsets into the result are valid for the input.
pub fn to_lowercase_fast(s: &str) -> String {
    s.chars()
        .map(|c| if c.is_ascii() { c.to_ascii_lowercase() } else { c })
        .collect()
}

fn is_name_boundary(b: Option<&u8>) -> bool {
    match b {
        None => true,
        Some(b) => *b == b'>' || *b == b'/' || b.is_ascii_whitespace(),
    }
}

fn find_bounded(lc: &str, pat: &str, from: usize) -> Option<usize> {
    let bytes = lc.as_bytes();
    let mut pos = from;
    while let Some(rel) = lc.get(pos..)?.find(pat) {
        let start = pos + rel;
        if is_name_boundary(bytes.get(start + pat.len())) {
            return Some(start);
        }
        pos = start + pat.len();
    }
    None
}

/// Offset of the next `<name ...>` opening tag at or after `from`.
/// `lc` must already be lowercased; `name` must be lowercase.
pub fn find_open_tag(lc: &str, name: &str, from: usize) -> Option<usize> {
    find_bounded(lc, &format!("<{name}"), from)
}

/// Offset of the next `</name>` closing tag at or after `from`.
pub fn find_close_tag(lc: &str, name: &str, from: usize) -> Option<usize> {
    find_bounded(lc, &format!("</{name}"), from)
}

/// Offset just past the `>` that ends the tag starting at `tag_start`.
///
/// A `>` inside a quoted attribute value (`title="a>b"`) does not end the tag.
pub fn tag_end(s: &str, tag_start: usize) -> Option<usize> {
    let bytes = s.as_bytes();
    let mut quote: Option<u8> = None;
    let mut prev = b'<';

    for (i, &b) in bytes.iter().enumerate().skip(tag_start + 1) {
        match quote {
            Some(q) if b == q => {
                quote = None;
                prev = b;
            }
            Some(_) => {}
            None => match b {
                b'>' => return Some(i + 1),
                b'"' | b'\'' if prev == b'=' => quote = Some(b),
                _ if b.is_ascii_whitespace() => {}
                _ => prev = b,
            },
        }
    }
    None
}

/// Blank out `<!-- ... -->` comments and the bodies of `<script>` and
/// `<style>` elements in lowercased markup.
///
/// Blanked bytes become ASCII spaces, so offsets stay valid for the original.
/// An unterminated comment or raw-text element blanks to the end.
pub fn mask_raw_text(lc: &str) -> String {
    let mut out = String::with_capacity(lc.len());
    let mut pos = 0;

    loop {
        let comment = lc.get(pos..).and_then(|rest| rest.find("<!--")).map(|rel| pos + rel);
        let script = find_open_tag(lc, "script", pos);
        let style = find_open_tag(lc, "style", pos);

        let Some(start) = [comment, script, style].into_iter().flatten().min() else {
            break;
        };

        let (keep_to, blank_to) = if Some(start) == comment {
            let end = lc[start + 4..]
                .find("-->")
                .map_or(lc.len(), |rel| start + 4 + rel + 3);
            (start, end)
        } else {
            let name = if Some(start) == script { "script" } else { "style" };
            let body = tag_end(lc, start).unwrap_or(lc.len());
            let close = find_close_tag(lc, name, body).unwrap_or(lc.len());
            (body, close)
        };

        out.push_str(&lc[pos..keep_to]);
        out.extend(std::iter::repeat(' ').take(blank_to - keep_to));
        pos = blank_to;
    }

    out.push_str(&lc[pos..]);
    out
}

/// Remove all `<...>` tags.
pub fn strip_tags(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut pos = 0;
    while let Some(rel) = s[pos..].find('<') {
        out.push_str(&s[pos..pos + rel]);
        match tag_end(s, pos + rel) {
            Some(end) => pos = end,
            None => return out,
        }
    }
    out.push_str(&s[pos..]);
    out
}

/// Decode the handful of entities that show up in table cells.
pub fn decode_entities(s: &str) -> String {
    if !s.contains('&') {
        return s.to_string();
    }
    s.replace("&nbsp;", " ")
        .replace("&#160;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&#44;", ",")
        .replace("&amp;", "&")
}

/// Visible text of a cell: tags stripped, entities decoded, trimmed.
pub fn cell_text(inner: &str) -> String {
    decode_entities(&strip_tags(inner)).trim().to_string()
}
