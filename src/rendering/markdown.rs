use pulldown_cmark::{html, Options, Parser};

/// Render a raw Markdown string to HTML, then sanitize it.
///
/// Supports tables, footnotes, strikethrough and smart punctuation. Raw HTML
/// embedded in the Markdown goes through `ammonia`, so scripts, event
/// handlers and `javascript:` links never reach the page.
pub fn render_markdown(raw: &str) -> String {
    let options = Options::ENABLE_TABLES
        | Options::ENABLE_FOOTNOTES
        | Options::ENABLE_STRIKETHROUGH
        | Options::ENABLE_SMART_PUNCTUATION;

    let parser = Parser::new_ext(raw, options);
    let mut html_output = String::new();
    html::push_html(&mut html_output, parser);
    ammonia::clean(&html_output)
}

/// Plain-text teaser of a Markdown body, cut at a word boundary.
pub fn excerpt(raw: &str, max_chars: usize) -> String {
    let text = ammonia::Builder::empty()
        .clean(&render_markdown(raw))
        .to_string();
    let text = text.split_whitespace().collect::<Vec<_>>().join(" ");

    if text.chars().count() <= max_chars {
        return text;
    }
    // one extra char tells whether the cut falls on a word boundary
    let window: String = text.chars().take(max_chars + 1).collect();
    let trimmed: String = match window.rfind(' ') {
        Some(space) => window[..space].to_string(),
        None => text.chars().take(max_chars).collect(),
    };
    format!("{}…", trimmed.trim_end_matches(|c: char| c.is_ascii_punctuation()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_paragraph() {
        let result = render_markdown("Hello, world!");
        assert_eq!(result.trim(), "<p>Hello, world!</p>");
    }

    #[test]
    fn test_heading() {
        let result = render_markdown("# Title");
        assert_eq!(result.trim(), "<h1>Title</h1>");
    }

    #[test]
    fn test_bold_and_italic() {
        let result = render_markdown("**bold** and *italic*");
        assert!(result.contains("<strong>bold</strong>"));
        assert!(result.contains("<em>italic</em>"));
    }

    #[test]
    fn test_table() {
        let input = "| A | B |\n|---|---|\n| 1 | 2 |";
        let result = render_markdown(input);
        assert!(result.contains("<table>"));
        assert!(result.contains("<td>1</td>"));
    }

    #[test]
    fn test_strikethrough() {
        let result = render_markdown("~~deleted~~");
        assert!(result.contains("<del>deleted</del>"));
    }

    #[test]
    fn test_links_keep_href() {
        let result = render_markdown("[Sessions](https://example.com/sessions)");
        assert!(result.contains("href=\"https://example.com/sessions\""));
        assert!(result.contains(">Sessions</a>"));
    }

    #[test]
    fn test_script_is_stripped() {
        let result = render_markdown("Hi <script>alert('x')</script> there");
        assert!(!result.contains("<script"));
        assert!(!result.contains("alert"));
    }

    #[test]
    fn test_event_handlers_and_js_links_are_stripped() {
        let result = render_markdown(
            "<img src=\"/a.png\" onerror=\"steal()\"> [click](javascript:steal())",
        );
        assert!(!result.contains("onerror"));
        assert!(!result.contains("javascript:"));
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(render_markdown(""), "");
    }

    #[test]
    fn test_excerpt() {
        let body = "# Breath\n\nA **gentle** practice of returning to the body, one breath at a time.";
        assert_eq!(
            excerpt(body, 200),
            "Breath A gentle practice of returning to the body, one breath at a time."
        );
        assert_eq!(excerpt(body, 24), "Breath A gentle practice…");
    }
}
