//! Markdown rendering for info pages
//!
//! Images get the `img-responsive` class and tables are wrapped in a
//! `table-responsive` container so pages render well on small screens.

use pulldown_cmark::{html, CowStr, Event, Options, Parser, Tag, TagEnd};
use pulldown_cmark_escape::{escape_href, escape_html};
use std::fmt;
use tracing::warn;

/// `<img>` tag with the responsive class
fn image_tag(src: &str, alt: &str, title: &str) -> Result<String, fmt::Error> {
    let mut tag = String::from("<img src=\"");
    escape_href(&mut tag, src)?;
    tag.push_str("\" alt=\"");
    escape_html(&mut tag, alt)?;
    tag.push_str("\" class=\"img-responsive\"");
    if !title.is_empty() {
        tag.push_str(" title=\"");
        escape_html(&mut tag, title)?;
        tag.push('"');
    }
    tag.push_str(" />");
    Ok(tag)
}

/// Render markdown to HTML
pub fn render(markdown: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);

    let mut events: Vec<Event> = Vec::new();
    // (src, title, alt text) of the image being read
    let mut image: Option<(CowStr, CowStr, String)> = None;

    for event in Parser::new_ext(markdown, options) {
        if image.is_some() {
            match event {
                Event::End(TagEnd::Image) => {
                    if let Some((src, title, alt)) = image.take() {
                        match image_tag(&src, &alt, &title) {
                            Ok(tag) => events.push(Event::InlineHtml(CowStr::from(tag))),
                            Err(e) => warn!("Dropped image {}: {}", src, e),
                        }
                    }
                }
                Event::Text(text) | Event::Code(text) => {
                    if let Some((_, _, alt)) = image.as_mut() {
                        alt.push_str(&text);
                    }
                }
                _ => {}
            }
            continue;
        }

        match event {
            Event::Start(Tag::Image { dest_url, title, .. }) => {
                image = Some((dest_url, title, String::new()));
            }
            Event::Start(Tag::Table(alignments)) => {
                events.push(Event::Html(CowStr::from("<div class=\"table-responsive\">")));
                events.push(Event::Start(Tag::Table(alignments)));
            }
            Event::End(TagEnd::Table) => {
                events.push(Event::End(TagEnd::Table));
                events.push(Event::Html(CowStr::from("</div>\n")));
            }
            other => events.push(other),
        }
    }

    let mut output = String::with_capacity(markdown.len() * 3 / 2);
    html::push_html(&mut output, events.into_iter());
    output
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_images_are_responsive() {
        let rendered = render("![Map of \"Rome\"](map.png)");
        assert!(rendered.contains("class=\"img-responsive\""));
        assert!(rendered.contains("src=\"map.png\""));
        assert!(rendered.contains("alt=\"Map of &quot;Rome&quot;\""));
    }

    #[test]
    fn test_image_attributes_are_escaped() {
        let rendered = render("![Plan](<plan of rome.png> \"Rome & Co\")");
        assert!(rendered.contains("src=\"plan%20of%20rome.png\""));
        assert!(rendered.contains("title=\"Rome &amp; Co\""));
    }

    #[test]
    fn test_tables_are_wrapped() {
        let rendered = render("| a | b |\n|---|---|\n| 1 | 2 |\n");
        let wrapper = rendered.find("<div class=\"table-responsive\">").unwrap();
        let table = rendered.find("<table>").unwrap();
        assert!(wrapper < table);
        assert!(rendered.trim_end().ends_with("</div>"));
    }

    #[test]
    fn test_plain_markdown() {
        assert_eq!(render("# About"), "<h1>About</h1>\n");
    }
}
