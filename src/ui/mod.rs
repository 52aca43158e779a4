// src/ui/mod.rs

use crate::memory::Turn;
use crate::shell::View;
use pulldown_cmark::{Event, Options, Parser, Tag, html};

pub const TITLE: &str = "Chatbot with OpenAI";

/// Static labels around the conversation.
#[derive(Debug, Clone)]
pub struct PageLabels {
    pub title: String,
    pub caption: String,
}

impl PageLabels {
    pub fn new(caption: &str) -> Self {
        Self {
            title: TITLE.into(),
            caption: caption.into(),
        }
    }
}

/// Escapes `text` for use inside HTML element content or attribute values.
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    html::push_html(&mut out, std::iter::once(Event::Text(text.into())));
    out
}

/// Renders message content as Markdown. Embedded raw HTML is shown as text
/// and link or image targets with a scriptable scheme become `#`.
pub fn render_markdown(source: &str) -> String {
    let parser = Parser::new_ext(source, Options::ENABLE_TABLES | Options::ENABLE_STRIKETHROUGH)
        .map(|event| match event {
            Event::Html(raw) | Event::InlineHtml(raw) => Event::Text(raw),
            Event::Start(Tag::Link {
                link_type,
                dest_url,
                title,
                id,
            }) if !is_safe_url(&dest_url) => Event::Start(Tag::Link {
                link_type,
                dest_url: "#".into(),
                title,
                id,
            }),
            Event::Start(Tag::Image {
                link_type,
                dest_url,
                title,
                id,
            }) if !is_safe_url(&dest_url) => Event::Start(Tag::Image {
                link_type,
                dest_url: "#".into(),
                title,
                id,
            }),
            other => other,
        });

    let mut out = String::new();
    html::push_html(&mut out, parser);
    out
}

/// http, https and mailto targets, or a relative reference with no scheme.
fn is_safe_url(url: &str) -> bool {
    let url = url.trim().to_ascii_lowercase();
    if ["http:", "https:", "mailto:"]
        .iter()
        .any(|scheme| url.starts_with(scheme))
    {
        return true;
    }
    let head = url.split(['/', '?', '#']).next().unwrap_or_default();
    !head.contains(':')
}

/// One role-tagged block per turn, most recent first.
pub fn render_history(history: &[Turn]) -> String {
    history
        .iter()
        .rev()
        .map(|turn| {
            format!(
                "<div class=\"chat-message {role}\" data-role=\"{role}\">\n<div class=\"avatar\">{role}</div>\n<div class=\"content\">{body}</div>\n</div>",
                role = turn.role(),
                body = render_markdown(turn.content()),
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn render_page(view: &View, labels: &PageLabels) -> String {
    let error = view
        .error
        .as_deref()
        .map(|e| format!("<div class=\"error\" role=\"alert\">{}</div>\n", escape(e)))
        .unwrap_or_default();

    format!(
        r#"<!DOCTYPE html>
<html lang="ja">
<head>
<meta charset="utf-8">
<title>{title}</title>
<style>{STYLE}</style>
</head>
<body>
<aside class="sidebar">
<form method="post" action="/clear">
<button type="submit" name="clear">Clear Conversation</button>
</form>
</aside>
<main>
<h1>{title}</h1>
<p class="caption">{caption}</p>
<form method="post" action="/send" class="composer">
<label for="message">Enter your message</label>
<textarea id="message" name="message" style="height: 100px"></textarea>
<button type="submit">Send</button>
</form>
{error}<section class="history">
{history}
</section>
</main>
</body>
</html>
"#,
        title = escape(&labels.title),
        caption = escape(&labels.caption),
        history = render_history(&view.history),
    )
}

const STYLE: &str = "body{display:flex;margin:0;font-family:sans-serif}\
.sidebar{width:14rem;padding:1rem;background:#f0f2f6;min-height:100vh}\
main{flex:1;max-width:46rem;padding:1rem 2rem}\
.caption{color:#808495}\
.composer{display:flex;flex-direction:column;gap:.5rem;margin-bottom:1rem}\
.composer textarea{width:100%;font:inherit}\
.error{background:#ffe6e6;color:#7d1a1a;padding:.75rem;border-radius:.25rem;margin-bottom:1rem}\
.chat-message{display:flex;gap:.75rem;padding:.75rem 0;border-top:1px solid #eee}\
.avatar{font-size:.75rem;font-weight:bold;min-width:5rem}\
.assistant .avatar{color:#ff4b4b}\
.user .avatar{color:#4b7bff}";
