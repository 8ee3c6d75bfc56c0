//! Markdown rendering and checkbox handling for task cards.
//!
//! Task content is GFM markdown. Cards are rendered server-side; checkbox
//! inputs carry a `data-line` attribute with their 1-based source line so
//! the board can toggle the exact line the user clicked.

use pulldown_cmark::{Event, Options, Parser, html};

/// Render task content to an HTML fragment.
///
/// Task-list markers are replaced with live checkbox inputs addressed by
/// source line; everything else goes through the stock HTML renderer.
pub fn render_markdown(content: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TASKLISTS);
    options.insert(Options::ENABLE_STRIKETHROUGH);

    let parser = Parser::new_ext(content, options)
        .into_offset_iter()
        .map(|(event, range)| match event {
            Event::TaskListMarker(checked) => {
                let line = line_of_offset(content, range.start);
                let checked_attr = if checked { " checked" } else { "" };
                Event::InlineHtml(
                    format!(r#"<input type="checkbox" data-line="{line}"{checked_attr}>"#).into(),
                )
            }
            other => other,
        });

    let mut out = String::new();
    html::push_html(&mut out, parser);
    out
}

/// 1-based line number of a byte offset into `content`.
fn line_of_offset(content: &str, offset: usize) -> usize {
    content
        .as_bytes()
        .iter()
        .take(offset)
        .filter(|b| **b == b'\n')
        .count()
        + 1
}

/// Flip the first `[ ]`/`[x]` on the given 1-based line of `content`.
///
/// Returns `None` when the line does not exist or carries no checkbox
/// token; callers use that to suppress the no-op store write.
pub fn toggle_checkbox(content: &str, line: usize) -> Option<String> {
    if line == 0 {
        return None;
    }

    let mut lines: Vec<&str> = content.split('\n').collect();
    let target = *lines.get(line - 1)?;

    let toggled = if target.contains("[ ]") {
        target.replacen("[ ]", "[x]", 1)
    } else if target.contains("[x]") {
        target.replacen("[x]", "[ ]", 1)
    } else {
        return None;
    };

    lines[line - 1] = &toggled;
    Some(lines.join("\n"))
}
