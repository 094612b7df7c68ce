// Markdown preview rendering.

use pulldown_cmark::{html, CowStr, Event, Options, Parser};

fn preview_options() -> Options {
    Options::ENABLE_TABLES
        | Options::ENABLE_STRIKETHROUGH
        | Options::ENABLE_TASKLISTS
        | Options::ENABLE_FOOTNOTES
}

/// Render Markdown (with GitHub-flavored tables, strikethrough and task
/// lists) to HTML for the preview pane.
///
/// Raw HTML in the source is escaped and shown as text, never passed through.
pub fn render_preview(markdown: &str) -> String {
    let parser = Parser::new_ext(markdown, preview_options()).map(|event| match event {
        Event::Html(raw) | Event::InlineHtml(raw) => Event::Text(CowStr::from(raw.into_string())),
        other => other,
    });

    let mut out = String::with_capacity(markdown.len() * 3 / 2);
    html::push_html(&mut out, parser);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_headings_and_paragraphs() {
        let html = render_preview("# Welcome\n\nSome *text*.");
        assert!(html.contains("<h1>Welcome</h1>"));
        assert!(html.contains("<em>text</em>"));
    }

    #[test]
    fn renders_gfm_tables() {
        let html = render_preview("| a | b |\n|---|---|\n| 1 | 2 |\n");
        assert!(html.contains("<table>"));
        assert!(html.contains("<th>a</th>"));
        assert!(html.contains("<td>2</td>"));
    }

    #[test]
    fn renders_task_lists() {
        let html = render_preview("- [x] shipped\n- [ ] pending\n");
        assert_eq!(html.matches("type=\"checkbox\"").count(), 2);
        assert_eq!(html.matches("checked").count(), 1);
        assert!(html.contains("shipped"));
    }

    #[test]
    fn renders_strikethrough() {
        assert!(render_preview("~~gone~~").contains("<del>gone</del>"));
    }

    #[test]
    fn raw_html_is_escaped() {
        let html = render_preview("<script>alert(1)</script>\n\nhi <b>there</b>");
        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;script&gt;"));
        assert!(!html.contains("<b>"));
    }
}
