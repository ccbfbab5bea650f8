//! Markdown rendering for chat bubbles.
//!
//! Assistant replies go through [`MarkdownRenderer::render`]; user text is
//! only ever passed through [`escape_html`], so a user typing `# Routine`
//! sees those literal characters.

use linkify::{LinkFinder, LinkKind};
use pulldown_cmark::{CowStr, Event, LinkType, Options, Parser, Tag, TagEnd, TextMergeStream, html};

/// Schemes a link or image may point at. Scheme-less (relative) URLs also pass.
const ALLOWED_SCHEMES: [&str; 3] = ["http", "https", "mailto"];

/// Turns markdown into displayable HTML.
pub trait MarkdownRenderer: Send + Sync + std::fmt::Debug {
    /// Render `markdown` to an HTML fragment.
    fn render(&self, markdown: &str) -> String;
}

/// `pulldown-cmark` renderer with the GFM extension set.
///
/// Bare URLs and email addresses become links. Raw HTML embedded in the
/// markdown is emitted as escaped text, and link or image targets with a
/// scheme outside [`ALLOWED_SCHEMES`] are blanked.
#[derive(Debug, Clone, Copy, Default)]
pub struct CmarkRenderer;

impl CmarkRenderer {
    fn options() -> Options {
        Options::ENABLE_TABLES | Options::ENABLE_STRIKETHROUGH | Options::ENABLE_TASKLISTS
    }
}

impl MarkdownRenderer for CmarkRenderer {
    fn render(&self, markdown: &str) -> String {
        let finder = LinkFinder::new();
        let mut events = Vec::new();
        // Text inside links, images and code blocks is never autolinked.
        let mut literal_depth = 0usize;

        for event in TextMergeStream::new(Parser::new_ext(markdown, Self::options())) {
            match event {
                Event::Start(tag @ (Tag::Link { .. } | Tag::Image { .. } | Tag::CodeBlock(_))) => {
                    literal_depth += 1;
                    events.push(Event::Start(sanitize_tag(tag)));
                }
                Event::End(end @ (TagEnd::Link | TagEnd::Image | TagEnd::CodeBlock)) => {
                    literal_depth = literal_depth.saturating_sub(1);
                    events.push(Event::End(end));
                }
                Event::Text(text) if literal_depth == 0 => {
                    push_linkified(&finder, text, &mut events);
                }
                Event::Html(raw) | Event::InlineHtml(raw) => events.push(Event::Text(raw)),
                other => events.push(other),
            }
        }

        let mut out = String::with_capacity(markdown.len() * 3 / 2);
        html::push_html(&mut out, events.into_iter());
        out
    }
}

fn sanitize_tag(tag: Tag<'_>) -> Tag<'_> {
    match tag {
        Tag::Link {
            link_type,
            dest_url,
            title,
            id,
        } => Tag::Link {
            link_type,
            dest_url: safe_url(dest_url),
            title,
            id,
        },
        Tag::Image {
            link_type,
            dest_url,
            title,
            id,
        } => Tag::Image {
            link_type,
            dest_url: safe_url(dest_url),
            title,
            id,
        },
        other => other,
    }
}

fn safe_url(url: CowStr<'_>) -> CowStr<'_> {
    if is_safe_url(&url) {
        url
    } else {
        tracing::debug!(url = %url, "Blanking link target with a disallowed scheme");
        CowStr::Borrowed("")
    }
}

/// Whether `url` is relative or uses one of [`ALLOWED_SCHEMES`].
fn is_safe_url(url: &str) -> bool {
    let url = url.trim_start();
    let Some(colon) = url.find(':') else {
        return true;
    };
    // A colon after a path, query or fragment delimiter is not a scheme separator.
    if url.find(['/', '?', '#']).is_some_and(|delim| delim < colon) {
        return true;
    }
    ALLOWED_SCHEMES
        .iter()
        .any(|scheme| url[..colon].eq_ignore_ascii_case(scheme))
}

/// Split `text` around bare URLs and emails, wrapping each in a link.
fn push_linkified<'a>(finder: &LinkFinder, text: CowStr<'a>, events: &mut Vec<Event<'a>>) {
    if finder.links(&text).next().is_none() {
        events.push(Event::Text(text));
        return;
    }

    for span in finder.spans(&text) {
        let piece = span.as_str().to_string();
        match span.kind() {
            Some(LinkKind::Email) => push_link(events, format!("mailto:{piece}"), piece),
            Some(_) => push_link(events, piece.clone(), piece),
            None => events.push(Event::Text(piece.into())),
        }
    }
}

fn push_link<'a>(events: &mut Vec<Event<'a>>, dest: String, label: String) {
    events.push(Event::Start(Tag::Link {
        link_type: LinkType::Autolink,
        dest_url: safe_url(dest.into()),
        title: CowStr::Borrowed(""),
        id: CowStr::Borrowed(""),
    }));
    events.push(Event::Text(label.into()));
    events.push(Event::End(TagEnd::Link));
}

/// Escape text for use in HTML element content or quoted attributes.
#[must_use]
pub fn escape_html(text: &str) -> String {
    html_escape::encode_quoted_attribute(text).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(md: &str) -> String {
        CmarkRenderer.render(md)
    }

    #[test]
    fn test_heading_and_list() {
        let html = render("# Routine\n- Cleanse\n- Moisturize");
        assert!(html.contains("<h1>Routine</h1>"));
        assert!(html.contains("<ul>"));
        assert_eq!(html.matches("<li>").count(), 2);
        assert!(html.contains("<li>Cleanse</li>"));
        assert!(html.contains("<li>Moisturize</li>"));
    }

    #[test]
    fn test_gfm_extensions() {
        let html = render("| a | b |\n|---|---|\n| 1 | 2 |");
        assert!(html.contains("<table>"));

        let html = render("~~gone~~");
        assert!(html.contains("<del>gone</del>"));

        let html = render("- [x] SPF\n- [ ] Retinol");
        assert_eq!(html.matches("type=\"checkbox\"").count(), 2);
        assert!(html.contains("checked"));
    }

    #[test]
    fn test_angle_autolink() {
        let html = render("<https://example.com>");
        assert!(html.contains("<a href=\"https://example.com\">"));
    }

    #[test]
    fn test_bare_url_autolink() {
        let html = render("Visit https://example.com today");
        assert!(html.contains("Visit <a href=\"https://example.com\">https://example.com</a> today"));

        let html = render("Write to care@example.com.");
        assert!(html.contains("<a href=\"mailto:care@example.com\">care@example.com</a>."));
    }

    #[test]
    fn test_no_autolink_inside_code_or_links() {
        let html = render("```\ncurl https://example.com\n```");
        assert!(!html.contains("<a "));

        let html = render("`https://example.com`");
        assert!(!html.contains("<a "));

        let html = render("[docs https://example.com](https://example.org)");
        assert_eq!(html.matches("<a ").count(), 1);
    }

    #[test]
    fn test_unsafe_link_targets_are_blanked() {
        let html = render("[click](javascript:alert(document.cookie))");
        assert!(!html.contains("javascript:"));
        assert!(html.contains("<a href=\"\">click</a>"));

        let html = render("![x](javascript:alert(1))");
        assert!(!html.contains("javascript:"));

        let html = render("[x](JaVaScRiPt:alert(1)) [y](data:text/html;base64,AAAA)");
        assert!(!html.to_ascii_lowercase().contains("javascript:"));
        assert!(!html.contains("data:"));

        let html = render("[x](javascript&#58;alert(1))");
        assert!(!html.contains("alert"));
    }

    #[test]
    fn test_safe_link_targets_are_kept() {
        let html = render("[a](https://example.com/x?y=1) [b](/routine) [c](#top) [d](mailto:hi@example.com)");
        assert!(html.contains("href=\"https://example.com/x?y=1\""));
        assert!(html.contains("href=\"/routine\""));
        assert!(html.contains("href=\"#top\""));
        assert!(html.contains("href=\"mailto:hi@example.com\""));
        assert!(is_safe_url("notes/a:b"));
        assert!(!is_safe_url("vbscript:msgbox"));
    }

    #[test]
    fn test_raw_html_is_escaped() {
        let html = render("hello <script>alert(1)</script>");
        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;script&gt;"));
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(escape_html("# Routine"), "# Routine");

        let escaped = escape_html(r#"<b a="1">&'</b>"#);
        assert!(escaped.starts_with("&lt;b a=&quot;1&quot;&gt;&amp;"));
        assert!(!escaped.contains('\''));
        assert!(!escaped.contains('<'));
    }
}
