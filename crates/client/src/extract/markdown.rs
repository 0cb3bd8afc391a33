//! Markdown rendering of classified blocks.
//!
//! Pure and deterministic: the same block sequence always renders to the
//! same bytes. Top-level blocks are separated by one blank line.

use super::block::{Block, Inline, List, MAX_LIST_NUMBER, Table};

/// Render a block sequence to Markdown.
pub fn render_markdown(blocks: &[Block]) -> String {
    blocks
        .iter()
        .map(render_block)
        .filter(|rendered| !rendered.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn render_block(block: &Block) -> String {
    match block {
        Block::Heading { level, content } => {
            let text = render_inline(content);
            let text = text.trim();
            if text.is_empty() {
                return String::new();
            }
            format!("{} {}", "#".repeat(usize::from((*level).clamp(1, 6))), escape_closing_hashes(text))
        }
        Block::Paragraph(spans) | Block::InlineGroup(spans) => escape_line_start(render_inline(spans).trim()),
        Block::Code { language, text } => render_code_block(language.as_deref(), text),
        Block::Table(table) => render_table(table),
        Block::List(list) => {
            let mut lines = Vec::new();
            render_list(list, 0, &mut lines);
            lines.join("\n")
        }
    }
}

fn render_code_block(language: Option<&str>, text: &str) -> String {
    let fence = "`".repeat((longest_backtick_run(text) + 1).max(3));
    format!("{fence}{}\n{}\n{fence}", language.unwrap_or(""), text.trim_end_matches('\n'))
}

fn render_table(table: &Table) -> String {
    let columns = table.columns();
    if columns == 0 {
        return String::new();
    }

    let mut lines = Vec::with_capacity(table.rows.len() + 1);
    for (i, row) in table.rows.iter().enumerate() {
        let cells: Vec<String> = (0..columns)
            .map(|c| row.get(c).map(|cell| escape_cell(cell)).unwrap_or_default())
            .collect();
        lines.push(format!("| {} |", cells.join(" | ")));
        if i == 0 {
            lines.push(format!("|{}", " --- |".repeat(columns)));
        }
    }
    lines.join("\n")
}

fn escape_cell(cell: &str) -> String {
    cell.replace('\n', " ").replace('|', "\\|").replace('<', "\\<")
}

fn render_list(list: &List, depth: usize, lines: &mut Vec<String>) {
    let indent = "  ".repeat(depth);
    for (i, item) in list.items.iter().enumerate() {
        let marker = if list.ordered {
            format!("{}.", list.start.saturating_add(i as u64).min(MAX_LIST_NUMBER))
        } else {
            "-".to_string()
        };
        let text = escape_line_start(render_inline(&item.content).trim());
        let line = format!("{indent}{marker} {text}");
        lines.push(line.trim_end().to_string());

        // Item blocks sit under the item text, aligned past the marker.
        let continuation = format!("{indent}{}", " ".repeat(marker.len() + 1));
        for block in &item.blocks {
            for body in render_block(block).lines() {
                lines.push(if body.is_empty() { String::new() } else { format!("{continuation}{body}") });
            }
        }
        for child in &item.children {
            render_list(child, depth + 1, lines);
        }
    }
}

fn render_inline(spans: &[Inline]) -> String {
    let mut out = String::new();
    for span in spans {
        match span {
            Inline::Text(text) => out.push_str(&escape_text(text)),
            Inline::Strong(inner) => out.push_str(&wrap("**", &render_inline(inner))),
            Inline::Emphasis(inner) => out.push_str(&wrap("*", &render_inline(inner))),
            Inline::Code(code) => out.push_str(&render_code_span(code)),
            Inline::Link { text, href } => {
                let label = render_inline(text);
                let label = label.trim();
                let label = if label.is_empty() { escape_text(href) } else { label.to_string() };
                out.push_str(&format!("[{label}]({})", link_destination(href)));
            }
        }
    }
    out
}

/// Wrap `inner` in emphasis markers, keeping edge whitespace outside them.
fn wrap(marker: &str, inner: &str) -> String {
    let core = inner.trim();
    if core.is_empty() {
        return inner.to_string();
    }
    let lead = &inner[..inner.len() - inner.trim_start().len()];
    let trail = &inner[inner.trim_end().len()..];
    format!("{lead}{marker}{core}{marker}{trail}")
}

fn render_code_span(code: &str) -> String {
    let fence = "`".repeat(longest_backtick_run(code) + 1);
    if code.starts_with('`') || code.ends_with('`') {
        format!("{fence} {code} {fence}")
    } else {
        format!("{fence}{code}{fence}")
    }
}

fn link_destination(href: &str) -> String {
    if href.contains([' ', '(', ')']) { format!("<{href}>") } else { href.to_string() }
}

fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '\\' | '`' | '*' | '[' | ']' | '<') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Escape a leading marker that would turn a line into a heading, quote,
/// list item, thematic break or fence.
fn escape_line_start(line: &str) -> String {
    let digits = line.bytes().take_while(u8::is_ascii_digit).count();
    if (1..=9).contains(&digits)
        && matches!(line.as_bytes().get(digits), Some(b'.' | b')'))
        && matches!(line.as_bytes().get(digits + 1), None | Some(b' '))
    {
        let (number, rest) = line.split_at(digits);
        return format!("{number}\\{rest}");
    }
    match line.chars().next() {
        Some('#' | '>' | '-' | '+' | '_' | '~' | '=') => format!("\\{line}"),
        _ => line.to_string(),
    }
}

/// Keep a trailing `#` run in heading text from reading as a closing sequence.
fn escape_closing_hashes(text: &str) -> String {
    let stem = text.trim_end_matches('#');
    if stem.len() < text.len() && (stem.is_empty() || stem.ends_with(' ')) {
        format!("{stem}\\{}", &text[stem.len()..])
    } else {
        text.to_string()
    }
}

fn longest_backtick_run(text: &str) -> usize {
    let mut longest = 0;
    let mut current = 0;
    for c in text.chars() {
        if c == '`' {
            current += 1;
            longest = longest.max(current);
        } else {
            current = 0;
        }
    }
    longest
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::block::ListItem;

    fn text(s: &str) -> Inline {
        Inline::Text(s.to_string())
    }

    fn row(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|c| c.to_string()).collect()
    }

    #[test]
    fn test_heading_levels() {
        let blocks = vec![
            Block::Heading { level: 1, content: vec![text("Get Users")] },
            Block::Heading { level: 3, content: vec![text("Query")] },
        ];
        assert_eq!(render_markdown(&blocks), "# Get Users\n\n### Query");
    }

    #[test]
    fn test_code_block_with_language() {
        let blocks = vec![Block::Code { language: Some("json".into()), text: "{\"id\": 1}".into() }];
        assert_eq!(render_markdown(&blocks), "```json\n{\"id\": 1}\n```");
    }

    #[test]
    fn test_code_block_verbatim() {
        let blocks = vec![Block::Code { language: None, text: "*a* | [b] # c\n  indented".into() }];
        assert_eq!(render_markdown(&blocks), "```\n*a* | [b] # c\n  indented\n```");
    }

    #[test]
    fn test_code_fence_grows_past_backticks() {
        let blocks = vec![Block::Code { language: Some("md".into()), text: "```\nnested\n```".into() }];
        assert_eq!(render_markdown(&blocks), "````md\n```\nnested\n```\n````");
    }

    #[test]
    fn test_table_with_separator() {
        let table = Table {
            rows: vec![
                row(&["Parameter", "Type", "Required", "Description"]),
                row(&["limit", "integer", "no", "Page size"]),
            ],
        };
        assert_eq!(
            render_markdown(&[Block::Table(table)]),
            "| Parameter | Type | Required | Description |\n| --- | --- | --- | --- |\n| limit | integer | no | Page size |"
        );
    }

    #[test]
    fn test_uneven_table_is_padded() {
        let table = Table { rows: vec![row(&["a"]), row(&["b", "c", "d"]), row(&["e", "f"])] };
        let rendered = render_markdown(&[Block::Table(table)]);
        let lines: Vec<&str> = rendered.lines().collect();

        assert_eq!(lines[0], "| a |  |  |");
        assert_eq!(lines[1], "| --- | --- | --- |");
        assert_eq!(lines[3], "| e | f |  |");
        for line in lines {
            assert_eq!(line.matches(" |").count(), 3, "{line}");
        }
    }

    #[test]
    fn test_table_escapes_pipes() {
        let table = Table { rows: vec![row(&["Type"]), row(&["string | null"])] };
        assert_eq!(render_markdown(&[Block::Table(table)]), "| Type |\n| --- |\n| string \\| null |");
    }

    #[test]
    fn test_empty_table_renders_nothing() {
        let blocks = vec![Block::Table(Table { rows: vec![] }), Block::Paragraph(vec![text("after")])];
        assert_eq!(render_markdown(&blocks), "after");
    }

    #[test]
    fn test_nested_list_indentation() {
        let list = List {
            ordered: false,
            start: 1,
            items: vec![
                ListItem {
                    content: vec![text("outer")],
                    children: vec![List {
                        ordered: true,
                        start: 1,
                        items: vec![
                            ListItem { content: vec![text("first")], children: vec![], blocks: vec![] },
                            ListItem {
                                content: vec![text("second")],
                                children: vec![List {
                                    ordered: false,
                                    start: 1,
                                    items: vec![ListItem { content: vec![text("deep")], children: vec![], blocks: vec![] }],
                                }],
                                blocks: vec![],
                            },
                        ],
                    }],
                    blocks: vec![],
                },
                ListItem { content: vec![text("next")], children: vec![], blocks: vec![] },
            ],
        };
        assert_eq!(
            render_markdown(&[Block::List(list)]),
            "- outer\n  1. first\n  2. second\n    - deep\n- next"
        );
    }

    #[test]
    fn test_ordered_list_start() {
        let list = List {
            ordered: true,
            start: 4,
            items: vec![
                ListItem { content: vec![text("four")], children: vec![], blocks: vec![] },
                ListItem { content: vec![text("five")], children: vec![], blocks: vec![] },
            ],
        };
        assert_eq!(render_markdown(&[Block::List(list)]), "4. four\n5. five");
    }

    #[test]
    fn test_huge_list_start_saturates() {
        let list = List {
            ordered: true,
            start: u64::MAX,
            items: vec![
                ListItem { content: vec![text("a")], ..ListItem::default() },
                ListItem { content: vec![text("b")], ..ListItem::default() },
            ],
        };
        assert_eq!(render_markdown(&[Block::List(list)]), "999999999. a\n999999999. b");
    }

    #[test]
    fn test_list_item_code_block_is_indented() {
        let list = List {
            ordered: true,
            start: 1,
            items: vec![ListItem {
                content: vec![text("Send:")],
                children: vec![],
                blocks: vec![Block::Code { language: Some("json".into()), text: "{\n\n  \"a\": 1\n}".into() }],
            }],
        };
        assert_eq!(
            render_markdown(&[Block::List(list)]),
            "1. Send:\n   ```json\n   {\n\n     \"a\": 1\n   }\n   ```"
        );
    }

    #[test]
    fn test_list_item_leading_marker_is_escaped() {
        let list = List {
            ordered: false,
            start: 1,
            items: vec![ListItem { content: vec![text("- not nested")], ..ListItem::default() }],
        };
        assert_eq!(render_markdown(&[Block::List(list)]), "- \\- not nested");
    }

    #[test]
    fn test_inline_spans() {
        let spans = vec![
            text("Pass "),
            Inline::Strong(vec![text("id")]),
            text(" or "),
            Inline::Emphasis(vec![text("email")]),
            text(" as "),
            Inline::Code("user_id".into()),
            text(", see "),
            Inline::Link { text: vec![text("auth")], href: "https://example.com/auth".into() },
        ];
        assert_eq!(
            render_markdown(&[Block::Paragraph(spans)]),
            "Pass **id** or *email* as `user_id`, see [auth](https://example.com/auth)"
        );
    }

    #[test]
    fn test_emphasis_whitespace_moves_outside() {
        let spans = vec![text("a"), Inline::Strong(vec![text(" bold ")]), text("b")];
        assert_eq!(render_markdown(&[Block::InlineGroup(spans)]), "a **bold** b");
    }

    #[test]
    fn test_code_span_with_backtick() {
        assert_eq!(render_code_span("a`b"), "``a`b``");
        assert_eq!(render_code_span("`x"), "`` `x ``");
    }

    #[test]
    fn test_link_without_text_uses_href() {
        let spans = vec![Inline::Link { text: vec![], href: "https://example.com/x".into() }];
        assert_eq!(render_markdown(&[Block::Paragraph(spans)]), "[https://example.com/x](https://example.com/x)");
    }

    #[test]
    fn test_link_destination_with_spaces() {
        assert_eq!(link_destination("https://x/a b"), "<https://x/a b>");
    }

    #[test]
    fn test_text_escaping() {
        let spans = vec![text("use *wildcards* and [brackets]")];
        assert_eq!(render_markdown(&[Block::Paragraph(spans)]), "use \\*wildcards\\* and \\[brackets\\]");
    }

    #[test]
    fn test_leading_block_markers_are_escaped() {
        let cases = [
            ("# of results per page", "\\# of results per page"),
            ("1. is the default version", "1\\. is the default version"),
            ("2) second form", "2\\) second form"),
            ("- leading dash", "\\- leading dash"),
            ("+ plus", "\\+ plus"),
            ("> quoted", "\\> quoted"),
            ("---", "\\---"),
            ("3.14 is not a list", "3.14 is not a list"),
            ("Version 1. only", "Version 1. only"),
        ];
        for (input, expected) in cases {
            assert_eq!(render_markdown(&[Block::Paragraph(vec![text(input)])]), expected, "{input}");
        }
    }

    #[test]
    fn test_angle_brackets_are_escaped() {
        let spans = vec![text("Send Authorization: Bearer <token>")];
        assert_eq!(render_markdown(&[Block::Paragraph(spans)]), "Send Authorization: Bearer \\<token>");

        let table = Table { rows: vec![row(&["Header"]), row(&["Bearer <token>"])] };
        assert_eq!(render_markdown(&[Block::Table(table)]), "| Header |\n| --- |\n| Bearer \\<token> |");
    }

    #[test]
    fn test_heading_trailing_hash_is_kept() {
        let blocks = vec![
            Block::Heading { level: 2, content: vec![text("Use #")] },
            Block::Heading { level: 2, content: vec![text("C#")] },
        ];
        assert_eq!(render_markdown(&blocks), "## Use \\#\n\n## C#");
    }

    #[test]
    fn test_rendering_is_deterministic() {
        let blocks = vec![
            Block::Heading { level: 2, content: vec![text("Responses")] },
            Block::Table(Table { rows: vec![row(&["Code", "Meaning"]), row(&["200", "OK"])] }),
            Block::Code { language: Some("bash".into()), text: "curl -X GET /users".into() },
        ];
        let first = render_markdown(&blocks);
        let second = render_markdown(&blocks);
        assert_eq!(first.as_bytes(), second.as_bytes());
    }

    #[test]
    fn test_empty_sequence() {
        assert_eq!(render_markdown(&[]), "");
    }
}
