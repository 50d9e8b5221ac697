//! HTML views for the web interface

use std::fmt::Write as _;

use crate::markdown::render_html;
use crate::store::GeneratedDocument;

const STYLE: &str = r#"
body { font-family: system-ui, sans-serif; max-width: 60rem; margin: 2rem auto; padding: 0 1rem; color: #1f2328; }
nav a { margin-right: 1rem; }
form label { display: block; margin-top: 1rem; font-weight: 600; }
input[type=url], textarea { width: 100%; box-sizing: border-box; padding: .5rem; font: inherit; }
textarea.raw { font-family: ui-monospace, monospace; min-height: 24rem; }
.flash { padding: .75rem 1rem; border-radius: 6px; margin: 1rem 0; }
.flash.error { background: #ffebe9; border: 1px solid #ff8182; }
.flash.warning { background: #fff8c5; border: 1px solid #d4a72c; }
.flash.success { background: #dafbe1; border: 1px solid #4ac26b; }
.rendered { border: 1px solid #d0d7de; border-radius: 6px; padding: 1rem 2rem; }
table { border-collapse: collapse; }
td, th { border: 1px solid #d0d7de; padding: .25rem .5rem; }
"#;

/// Severity of a flash banner
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlashLevel {
    /// Request failed
    Error,
    /// Request succeeded with a caveat
    Warning,
}

impl FlashLevel {
    fn class(self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warning => "warning",
        }
    }
}

/// A one-off message shown above the form
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Flash {
    /// Severity
    pub level: FlashLevel,
    /// Text shown to the user
    pub message: String,
}

impl Flash {
    /// Error banner
    pub fn error(message: impl Into<String>) -> Self {
        Self { level: FlashLevel::Error, message: message.into() }
    }

    /// Warning banner
    pub fn warning(message: impl Into<String>) -> Self {
        Self { level: FlashLevel::Warning, message: message.into() }
    }
}

/// Values echoed back into the form after a failed submission
#[derive(Debug, Clone, Default)]
pub struct FormValues<'a> {
    /// Submitted URL
    pub url: &'a str,
    /// Submitted instructions
    pub instructions: &'a str,
    /// Profile mode checkbox
    pub profile: bool,
}

/// Escapes text for use in HTML element content and attribute values
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#x27;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

fn layout(title: &str, body: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n\
         <meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n\
         <title>{title} · readmegen</title>\n<style>{STYLE}</style>\n</head>\n<body>\n\
         <nav><a href=\"/\">Generate</a><a href=\"/about\">About</a></nav>\n{body}\n</body>\n</html>\n",
        title = escape_html(title),
    )
}

fn flash_banner(flash: Option<&Flash>) -> String {
    match flash {
        Some(flash) => format!(
            "<div class=\"flash {}\" role=\"alert\">{}</div>\n",
            flash.level.class(),
            escape_html(&flash.message)
        ),
        None => String::new(),
    }
}

/// The generation form with recently generated documents
pub fn home_page(form: &FormValues<'_>, flash: Option<&Flash>, recent: &[GeneratedDocument]) -> String {
    let mut body = String::from("<h1>README generator</h1>\n");
    body.push_str(&flash_banner(flash));

    let _ = write!(
        body,
        "<form method=\"post\" action=\"/generate\">\n\
         <label for=\"url\">GitHub repository or profile URL</label>\n\
         <input type=\"url\" id=\"url\" name=\"url\" required placeholder=\"https://github.com/owner/repo\" value=\"{url}\">\n\
         <label for=\"instructions\">Additional instructions (optional)</label>\n\
         <textarea id=\"instructions\" name=\"instructions\" rows=\"4\" maxlength=\"2000\">{instructions}</textarea>\n\
         <label><input type=\"checkbox\" name=\"profile\" value=\"true\"{checked}> Generate a profile README</label>\n\
         <p><button type=\"submit\">Generate README</button></p>\n</form>\n",
        url = escape_html(form.url),
        instructions = escape_html(form.instructions),
        checked = if form.profile { " checked" } else { "" },
    );

    if !recent.is_empty() {
        body.push_str("<h2>Recently generated</h2>\n<ul>\n");
        for document in recent {
            let url = escape_html(&document.source_url);
            let _ = writeln!(
                body,
                "<li><a href=\"/edit?url={}\">{}</a> <small>updated {}</small></li>",
                escape_html(&query_escape(&document.source_url)),
                url,
                document.updated_at.format("%Y-%m-%d %H:%M UTC"),
            );
        }
        body.push_str("</ul>\n");
    }

    layout("Generate", &body)
}

/// Generated README shown rendered and as raw Markdown
pub fn result_page(source_url: &str, markdown: &str, flash: Option<&Flash>) -> String {
    let mut body = String::new();
    let _ = writeln!(body, "<h1>README for {}</h1>", escape_html(source_url));
    body.push_str(&flash_banner(flash));
    let _ = writeln!(
        body,
        "<p><a href=\"/edit?url={}\">Edit and publish</a></p>",
        escape_html(&query_escape(source_url))
    );
    let _ = writeln!(body, "<h2>Preview</h2>\n<div class=\"rendered\">\n{}\n</div>", render_html(markdown));
    let _ = writeln!(
        body,
        "<h2>Markdown</h2>\n<textarea class=\"raw\" readonly>{}</textarea>",
        escape_html(markdown)
    );
    layout("Result", &body)
}

/// Editor for a stored document with save and publish actions
pub fn edit_page(document: &GeneratedDocument) -> String {
    let mut body = String::new();
    let _ = writeln!(body, "<h1>Edit README for {}</h1>", escape_html(&document.source_url));
    body.push_str("<div id=\"status\" class=\"flash\" hidden></div>\n");
    let _ = writeln!(
        body,
        "<input type=\"hidden\" id=\"url\" value=\"{}\">\n\
         <textarea id=\"content\" class=\"raw\">{}</textarea>\n\
         <p><button id=\"save\">Save</button> <button id=\"push\">Push to GitHub</button></p>",
        escape_html(&document.source_url),
        escape_html(&document.content),
    );
    body.push_str(EDIT_SCRIPT);
    layout("Edit", &body)
}

const EDIT_SCRIPT: &str = r#"<script>
async function send(path) {
  const status = document.getElementById('status');
  const payload = { url: document.getElementById('url').value, content: document.getElementById('content').value };
  const response = await fetch(path, { method: 'POST', headers: { 'Content-Type': 'application/json' }, body: JSON.stringify(payload) });
  const result = await response.json();
  status.hidden = false;
  status.className = 'flash ' + (result.success ? 'success' : 'error');
  status.textContent = result.success ? (result.message || 'Saved') : result.error;
}
document.getElementById('save').addEventListener('click', () => send('/edit/save'));
document.getElementById('push').addEventListener('click', () => send('/push'));
</script>
"#;

/// Static description of the service
pub fn about_page() -> String {
    let body = format!(
        "<h1>About</h1>\n\
         <p>readmegen {} reads a GitHub repository's metadata and a bounded sample of its files, \
         then asks a language model to write a README from them.</p>\n\
         <p>Profile URLs (<code>https://github.com/&lt;user&gt;</code>) produce a profile README that \
         spans the user's public repositories.</p>\n\
         <p>Generated documents are stored so they can be edited and committed back to GitHub.</p>\n",
        env!("CARGO_PKG_VERSION")
    );
    layout("About", &body)
}

/// Percent-encodes a value for use in a query string
fn query_escape(value: &str) -> String {
    url::form_urlencoded::byte_serialize(value.as_bytes()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn document(content: &str) -> GeneratedDocument {
        GeneratedDocument {
            source_url: "https://github.com/octo/repo".into(),
            content: content.into(),
            instructions: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(
            escape_html(r#"<a href="x">Tom & 'Jerry'</a>"#),
            "&lt;a href=&quot;x&quot;&gt;Tom &amp; &#x27;Jerry&#x27;&lt;/a&gt;"
        );
    }

    #[test]
    fn test_home_page_echoes_form_and_flash() {
        let form = FormValues {
            url: "https://github.com/<bad>",
            instructions: "short",
            profile: true,
        };
        let page = home_page(&form, Some(&Flash::error("Please enter a valid URL")), &[]);

        assert!(page.contains("value=\"https://github.com/&lt;bad&gt;\""));
        assert!(page.contains("class=\"flash error\""));
        assert!(page.contains(" checked>"));
        assert!(!page.contains("Recently generated"));
    }

    #[test]
    fn test_home_page_links_recent_documents() {
        let page = home_page(&FormValues::default(), None, &[document("# Doc")]);

        assert!(page.contains("Recently generated"));
        assert!(page.contains("/edit?url=https%3A%2F%2Fgithub.com%2Focto%2Frepo"));
    }

    #[test]
    fn test_result_page_never_embeds_generated_markup() {
        let markdown = "# repo\n\n<script>fetch('/push', {method: 'POST'})</script>\n\nSee <img src=x onerror=alert(1)>\n";
        let page = result_page("https://github.com/octo/repo", markdown, None);

        assert!(page.contains("<h1>repo</h1>"));
        assert!(!page.contains("<script>fetch"));
        assert!(!page.contains("<img src=x"));
        assert!(page.contains("&lt;script&gt;"));
    }

    #[test]
    fn test_edit_page_escapes_content() {
        let page = edit_page(&document("</textarea><script>alert(1)</script>"));

        assert!(page.contains("&lt;/textarea&gt;&lt;script&gt;"));
        assert!(!page.contains("</textarea><script>alert"));
    }
}
