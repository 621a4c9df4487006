//! Turns model output into something the UI can display.
//!
//! Prompt pane answers become standalone HTML pages for the web view. Chat
//! bubbles use Pango markup. Raw HTML in model output is always shown as text.

use crate::constants::SOURCES_HEADING;
use crate::responder::Answer;
use horrorshow::helper::doctype;
use horrorshow::{html, Raw};
use html_escape::{encode_double_quoted_attribute, encode_text};
use pulldown_cmark::{html as md_html, Event, Options, Parser, Tag, TagEnd};

const PAGE_CSP: &str = "default-src 'none'; img-src data:; style-src 'unsafe-inline';";

const PAGE_STYLE: &str = "
    body {
        font-family: sans-serif;
        line-height: 1.6;
        padding: 16px 24px;
        color: #1e1e1e;
        background-color: #ffffff;
    }
    pre { background: #f3f3f3; padding: 12px; border-radius: 6px; overflow-x: auto; }
    code { font-family: monospace; }
    .sources { border-top: 1px solid #d0d0d0; margin-top: 24px; padding-top: 8px; }
    .sources a { color: #3584e4; word-break: break-all; }

    @media (prefers-color-scheme: dark) {
        body { background-color: #1e1e1e; color: #e0e0e0; }
        pre { background: #2a2a2a; }
        .sources { border-top-color: #444444; }
        .sources a { color: #78aeed; }
    }
";

fn markdown_options() -> Options {
    Options::ENABLE_TABLES | Options::ENABLE_STRIKETHROUGH
}

/// Markdown to an HTML fragment. Embedded HTML is escaped, not passed through.
pub fn markdown_to_html(markdown: &str) -> String {
    let events = Parser::new_ext(markdown, markdown_options()).map(|event| match event {
        Event::Html(raw) | Event::InlineHtml(raw) => Event::Text(raw),
        other => other,
    });
    let mut out = String::with_capacity(markdown.len() * 3 / 2);
    md_html::push_html(&mut out, events);
    out
}

/// Full page for a prompt pane answer, with a source list for grounded answers.
pub fn render_answer_page(answer: &Answer) -> String {
    let body = markdown_to_html(&answer.text);
    let sources = answer.sources.as_deref().unwrap_or_default();
    format!(
        "{}",
        html! {
            : doctype::HTML;
            html {
                head {
                    meta(charset="utf-8");
                    meta(http-equiv="Content-Security-Policy", content=PAGE_CSP);
                    meta(http-equiv="X-Content-Type-Options", content="nosniff");
                    style { : Raw(PAGE_STYLE) }
                }
                body {
                    div(class="answer") { : Raw(&body) }
                    @ if !sources.is_empty() {
                        div(class="sources") {
                            h3 { : SOURCES_HEADING }
                            ul {
                                @ for source in sources {
                                    li {
                                        a(href=source.uri.as_str()) { : source.label() }
                                    }
                                }
                            }
                        }
                    }
                }
            }
        }
    )
}

/// Inline error page used when a pane has nothing else to show.
pub fn render_error_page(message: &str) -> String {
    format!(
        "{}",
        html! {
            : doctype::HTML;
            html {
                head {
                    meta(charset="utf-8");
                    meta(http-equiv="Content-Security-Policy", content=PAGE_CSP);
                    style {
                        : Raw("
                            body { font-family: sans-serif; padding: 20px; white-space: pre-wrap; background: #fff1f1; color: #a94442; }
                            @media (prefers-color-scheme: dark) {
                                body { background: #2a0f0f; color: #ff9999; }
                            }
                        ")
                    }
                }
                body {
                    p { : message }
                }
            }
        }
    )
}

/// Empty page shown before the first answer.
pub fn render_blank_page() -> String {
    format!(
        "{}",
        html! {
            : doctype::HTML;
            html {
                head {
                    meta(charset="utf-8");
                    meta(http-equiv="Content-Security-Policy", content=PAGE_CSP);
                    style { : Raw(PAGE_STYLE) }
                }
                body {}
            }
        }
    )
}

/// Markdown to Pango markup for chat bubbles.
///
/// Only the subset Pango understands is emitted. Partial input from a running
/// stream still yields balanced markup.
pub fn markdown_to_pango(markdown: &str) -> String {
    let mut out = String::with_capacity(markdown.len() + 16);
    // Next number per open list, `None` for bullet lists.
    let mut lists: Vec<Option<u64>> = Vec::new();

    for event in Parser::new_ext(markdown, Options::ENABLE_STRIKETHROUGH) {
        match event {
            Event::Start(Tag::Strong) => out.push_str("<b>"),
            Event::End(TagEnd::Strong) => out.push_str("</b>"),
            Event::Start(Tag::Emphasis) => out.push_str("<i>"),
            Event::End(TagEnd::Emphasis) => out.push_str("</i>"),
            Event::Start(Tag::Strikethrough) => out.push_str("<s>"),
            Event::End(TagEnd::Strikethrough) => out.push_str("</s>"),
            Event::Start(Tag::Heading { .. }) => out.push_str("<b>"),
            Event::End(TagEnd::Heading(_)) => out.push_str("</b>\n\n"),
            Event::Start(Tag::CodeBlock(_)) => out.push_str("<tt>"),
            Event::End(TagEnd::CodeBlock) => {
                trim_trailing_newlines(&mut out);
                out.push_str("</tt>\n\n");
            }
            Event::Start(Tag::Link { dest_url, .. }) => {
                out.push_str("<a href=\"");
                out.push_str(&encode_double_quoted_attribute(&dest_url));
                out.push_str("\">");
            }
            Event::End(TagEnd::Link) => out.push_str("</a>"),
            Event::Start(Tag::List(start)) => {
                if !out.is_empty() && !out.ends_with('\n') {
                    out.push('\n');
                }
                lists.push(start);
            }
            Event::End(TagEnd::List(_)) => {
                lists.pop();
                if lists.is_empty() {
                    out.push('\n');
                }
            }
            Event::Start(Tag::Item) => {
                let depth = lists.len().saturating_sub(1);
                out.push_str(&"  ".repeat(depth));
                match lists.last_mut() {
                    Some(Some(n)) => {
                        out.push_str(&format!("{}. ", n));
                        *n += 1;
                    }
                    _ => out.push_str("• "),
                }
            }
            Event::End(TagEnd::Item) => {
                trim_trailing_newlines(&mut out);
                out.push('\n');
            }
            Event::End(TagEnd::Paragraph) => {
                if lists.is_empty() {
                    out.push_str("\n\n");
                } else {
                    out.push('\n');
                }
            }
            Event::Text(text) | Event::Html(text) | Event::InlineHtml(text) => {
                out.push_str(&encode_text(&text))
            }
            Event::Code(code) => {
                out.push_str("<tt>");
                out.push_str(&encode_text(&code));
                out.push_str("</tt>");
            }
            Event::SoftBreak | Event::HardBreak => out.push('\n'),
            Event::Rule => out.push_str("――――\n\n"),
            _ => {}
        }
    }

    trim_trailing_newlines(&mut out);
    out
}

fn trim_trailing_newlines(out: &mut String) {
    while out.ends_with('\n') {
        out.pop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::GroundingSource;

    #[test]
    fn test_markdown_to_html_escapes_raw_html() {
        let html = markdown_to_html("Hello <script>alert(1)</script> **world**");
        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;script&gt;"));
        assert!(html.contains("<strong>world</strong>"));
    }

    #[test]
    fn test_answer_page_without_sources() {
        let page = render_answer_page(&Answer::plain("Paris"));
        assert!(page.starts_with("<!DOCTYPE html>"));
        assert!(page.contains("Content-Security-Policy"));
        assert!(page.contains("Paris"));
        assert!(!page.contains(SOURCES_HEADING));
    }

    #[test]
    fn test_empty_source_list_is_hidden() {
        let answer = Answer {
            text: "Verstappen".to_string(),
            sources: Some(Vec::new()),
        };
        assert!(!render_answer_page(&answer).contains(SOURCES_HEADING));
    }

    #[test]
    fn test_sources_use_title_or_uri() {
        let answer = Answer {
            text: "Verstappen".to_string(),
            sources: Some(vec![
                GroundingSource {
                    uri: "https://f1.example/race".to_string(),
                    title: "F1 Results".to_string(),
                },
                GroundingSource {
                    uri: "https://news.example/a?b=1&c=2".to_string(),
                    title: String::new(),
                },
            ]),
        };
        let page = render_answer_page(&answer);
        assert!(page.contains(SOURCES_HEADING));
        assert!(page.contains(">F1 Results</a>"));
        assert!(page.contains("href=\"https://f1.example/race\""));
        assert!(page.contains(">https://news.example/a?b=1&amp;c=2</a>"));
    }

    #[test]
    fn test_error_page_escapes_message() {
        let page = render_error_page("<b>bad</b>");
        assert!(page.contains("&lt;b&gt;bad&lt;/b&gt;"));
    }

    #[test]
    fn test_pango_inline_styles() {
        assert_eq!(
            markdown_to_pango("**bold** and *it* and `x < y`"),
            "<b>bold</b> and <i>it</i> and <tt>x &lt; y</tt>"
        );
    }

    #[test]
    fn test_pango_lists() {
        assert_eq!(markdown_to_pango("- a\n- b"), "• a\n• b");
        assert_eq!(markdown_to_pango("1. a\n2. b"), "1. a\n2. b");
        assert_eq!(markdown_to_pango("- a\n  - b"), "• a\n  • b");
    }

    #[test]
    fn test_pango_partial_stream_stays_balanced() {
        let markup = markdown_to_pango("**Mer▋");
        assert!(!markup.contains("<b>"));
        assert!(markup.contains("Mer▋"));
    }

    #[test]
    fn test_pango_escapes_html() {
        assert_eq!(markdown_to_pango("<img src=x>"), "&lt;img src=x&gt;");
    }
}
