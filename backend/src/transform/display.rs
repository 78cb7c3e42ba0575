//! HTML rendering of the question review view.

use crate::models::{DisplayCell, DisplayRow};

const HEADERS: [&str; 6] = ["Topic/Subject", "Questions", "Answer Type", "Group", "Option No", "Option"];

/// Thumbnail width for inline images, in pixels.
const THUMBNAIL_WIDTH: u32 = 100;

fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            '\n' => out.push_str("<br>"),
            _ => out.push(c),
        }
    }
    out
}

fn render_cell(cell: &DisplayCell) -> String {
    match cell {
        DisplayCell::Text { value } => escape_html(value),
        DisplayCell::Image { .. } => format!(
            r#"<img src="{}" width="{}">"#,
            cell.data_uri().unwrap_or_default(),
            THUMBNAIL_WIDTH
        ),
    }
}

/// Render display rows as a standalone HTML table.
pub fn render_html(rows: &[DisplayRow]) -> String {
    let mut html = String::from("<table border=\"1\" class=\"questions\">\n  <thead>\n    <tr>");
    for header in HEADERS {
        html.push_str(&format!("<th>{}</th>", escape_html(header)));
    }
    html.push_str("</tr>\n  </thead>\n  <tbody>\n");

    for row in rows {
        let option_no = row.option_no.map(|n| n.to_string()).unwrap_or_default();
        html.push_str("    <tr>");
        for cell in [
            escape_html(&row.topic),
            render_cell(&row.question),
            escape_html(&row.answer_type),
            escape_html(&row.group),
            option_no,
            render_cell(&row.option),
        ] {
            html.push_str(&format!("<td>{}</td>", cell));
        }
        html.push_str("</tr>\n");
    }

    html.push_str("  </tbody>\n</table>\n");
    html
}

#[cfg(test)]
mod tests {
    use super::*;

    fn choice_row(option_no: usize, option: DisplayCell) -> DisplayRow {
        DisplayRow {
            topic: if option_no == 1 { "Geo".into() } else { String::new() },
            question: DisplayCell::text(if option_no == 1 { "Capital <b>?" } else { "" }),
            answer_type: String::new(),
            group: String::new(),
            option_no: Some(option_no),
            option,
        }
    }

    #[test]
    fn test_text_is_escaped() {
        let html = render_html(&[choice_row(1, DisplayCell::text("Paris & Co"))]);
        assert!(html.contains("Capital &lt;b&gt;?"));
        assert!(html.contains("Paris &amp; Co"));
        assert!(html.contains("<td>1</td>"));
    }

    #[test]
    fn test_image_rendered_inline() {
        let cell = DisplayCell::Image {
            path: "q.png".into(),
            mime: "image/png".into(),
            base64: "iVBORw0KGgo=".into(),
        };
        let html = render_html(&[choice_row(2, cell)]);
        assert!(html.contains(r#"<img src="data:image/png;base64,iVBORw0KGgo=" width="100">"#));
    }

    #[test]
    fn test_headers_present_for_empty_view() {
        let html = render_html(&[]);
        for header in HEADERS {
            assert!(html.contains(&format!("<th>{}</th>", header)));
        }
        assert!(!html.contains("<td>"));
    }
}
