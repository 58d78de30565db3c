// ABOUTME: Minimal HTML-to-text helpers shared by the search and scraping tools.
// ABOUTME: Tag stripping, entity decoding, block-aware text extraction, and truncation.

const BLOCK_CLOSERS: &[&str] = &[
    "</p>", "</div>", "</h1>", "</h2>", "</h3>", "</h4>", "</h5>", "</h6>", "<br>", "<br/>",
    "<br />", "</li>", "</tr>", "</section>", "</article>",
];

/// Remove every `<...>` tag, keeping the text between them.
pub fn strip_tags(html: &str) -> String {
    let mut text = String::with_capacity(html.len());
    let mut in_tag = false;
    for ch in html.chars() {
        match ch {
            '<' => in_tag = true,
            '>' => in_tag = false,
            _ if !in_tag => text.push(ch),
            _ => {}
        }
    }
    text
}

/// Decode the handful of entities that show up in search snippets and articles.
pub fn decode_entities(text: &str) -> String {
    text.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&#x27;", "'")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

/// Remove `<tag ...>...</tag>` blocks entirely (scripts, styles).
fn remove_blocks(html: &str, tag: &str) -> String {
    let open = format!("<{}", tag);
    let close = format!("</{}>", tag);
    let mut result = html.to_string();
    while let Some(start) = result.find(&open) {
        let Some(len) = result[start..].find(&close) else {
            result.truncate(start);
            break;
        };
        result.replace_range(start..start + len + close.len(), "");
    }
    result
}

/// Collapse runs of spaces, keep at most one blank line between blocks.
fn collapse_whitespace(text: &str) -> String {
    let mut collapsed = String::with_capacity(text.len());
    let mut prev_space = false;
    let mut newlines = 0;

    for ch in text.chars() {
        if ch == '\n' {
            if newlines < 2 {
                // Drop trailing spaces before a line break.
                while collapsed.ends_with(' ') {
                    collapsed.pop();
                }
                collapsed.push('\n');
            }
            newlines += 1;
            prev_space = true;
        } else if ch.is_whitespace() {
            if !prev_space {
                collapsed.push(' ');
                prev_space = true;
            }
        } else {
            collapsed.push(ch);
            prev_space = false;
            newlines = 0;
        }
    }
    collapsed.trim().to_string()
}

/// Convert an HTML page into readable plain text.
pub fn html_to_text(html: &str) -> String {
    let mut result = remove_blocks(html, "script");
    result = remove_blocks(&result, "style");
    result = remove_blocks(&result, "noscript");
    for tag in BLOCK_CLOSERS {
        result = result.replace(tag, &format!("{}\n", tag));
    }
    collapse_whitespace(&decode_entities(&strip_tags(&result)))
}

/// Extract the `<title>` of a page, if any.
pub fn page_title(html: &str) -> Option<String> {
    let start = html.find("<title")?;
    let after = &html[start..];
    let open_end = after.find('>')?;
    let body = &after[open_end + 1..];
    let end = body.find("</title>")?;
    let title = collapse_whitespace(&decode_entities(&body[..end]));
    (!title.is_empty()).then_some(title)
}

/// Truncate to at most `max_chars` characters, on a char boundary.
pub fn truncate_chars(text: &str, max_chars: usize) -> (String, bool) {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => (text[..idx].to_string(), true),
        None => (text.to_string(), false),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_tags() {
        assert_eq!(strip_tags("<b>Bold</b> and <i>italic</i>"), "Bold and italic");
    }

    #[test]
    fn test_decode_entities_amp_last() {
        assert_eq!(decode_entities("R&amp;D &amp;lt;"), "R&D &lt;");
        assert_eq!(decode_entities("it&#x27;s &quot;fine&quot;"), "it's \"fine\"");
    }

    #[test]
    fn test_html_to_text_drops_scripts_and_keeps_blocks() {
        let html = r#"<html><head><style>p { color: red }</style><script>alert(1)</script></head>
            <body><h1>Title</h1><p>First   paragraph.</p><p>Second&nbsp;one.</p></body></html>"#;
        let text = html_to_text(html);
        assert!(!text.contains("alert"));
        assert!(!text.contains("color"));
        assert!(text.contains("Title\n"));
        assert!(text.contains("First paragraph.\n"));
        assert!(text.ends_with("Second one."));
    }

    #[test]
    fn test_unclosed_script_is_cut() {
        assert_eq!(html_to_text("<p>keep</p><script>var x ="), "keep");
    }

    #[test]
    fn test_page_title() {
        assert_eq!(
            page_title("<html><title lang=\"en\"> Rust &amp; Cargo </title></html>").as_deref(),
            Some("Rust & Cargo")
        );
        assert_eq!(page_title("<html></html>"), None);
    }

    #[test]
    fn test_truncate_chars_respects_boundaries() {
        assert_eq!(truncate_chars("héllo", 2), ("hé".to_string(), true));
        assert_eq!(truncate_chars("hi", 5), ("hi".to_string(), false));
    }
}
