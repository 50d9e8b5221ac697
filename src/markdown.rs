use pulldown_cmark::{html, CowStr, Event, Options, Parser, Tag};
use scraper::Html;

use crate::error::{GeneratorError, Result};

/// Minimum number of plain-text characters a generated document must have
pub const MIN_PLAIN_TEXT_CHARS: usize = 50;

const UNSAFE_SCHEMES: [&str; 3] = ["javascript:", "vbscript:", "data:"];

/// Renders Markdown to HTML
///
/// Raw HTML in the source is emitted as escaped text and links or images
/// pointing at script-capable schemes lose their target.
pub fn render_html(markdown: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TASKLISTS);

    let parser = Parser::new_ext(markdown, options).map(|event| match event {
        Event::Html(raw) | Event::InlineHtml(raw) => Event::Text(raw),
        Event::Start(Tag::Link { link_type, dest_url, title, id }) => Event::Start(Tag::Link {
            link_type,
            dest_url: safe_destination(dest_url),
            title,
            id,
        }),
        Event::Start(Tag::Image { link_type, dest_url, title, id }) => Event::Start(Tag::Image {
            link_type,
            dest_url: safe_destination(dest_url),
            title,
            id,
        }),
        other => other,
    });
    let mut out = String::with_capacity(markdown.len() * 3 / 2);
    html::push_html(&mut out, parser);
    out
}

fn safe_destination(url: CowStr<'_>) -> CowStr<'_> {
    let normalized: String = url
        .chars()
        .filter(|c| !c.is_whitespace() && !c.is_control())
        .collect::<String>()
        .to_lowercase();
    if UNSAFE_SCHEMES.iter().any(|scheme| normalized.starts_with(scheme)) {
        CowStr::Borrowed("#")
    } else {
        url
    }
}

/// Renders Markdown and strips every tag, leaving the visible text
///
/// Raw HTML blocks contribute only their text content.
pub fn plain_text(markdown: &str) -> String {
    let mut rendered = String::with_capacity(markdown.len());
    html::push_html(&mut rendered, Parser::new_ext(markdown, Options::ENABLE_TABLES));
    let fragment = Html::parse_fragment(&rendered);
    fragment.root_element().text().collect::<String>().trim().to_string()
}

/// Returns `content` unchanged if it renders to enough visible text
///
/// This is a content-quality gate: malformed but long Markdown passes.
pub fn validate_markdown(content: &str) -> Result<&str> {
    let text = plain_text(content);
    let length = text.chars().count();
    if length < MIN_PLAIN_TEXT_CHARS {
        return Err(GeneratorError::Validation(format!(
            "Generated content is too short or invalid ({} characters of text, need {})",
            length, MIN_PLAIN_TEXT_CHARS
        )));
    }
    Ok(content)
}
