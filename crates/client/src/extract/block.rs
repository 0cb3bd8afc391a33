//! Classified content blocks.

/// Inline markup inside a paragraph, heading, list item or link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inline {
    Text(String),
    Strong(Vec<Inline>),
    Emphasis(Vec<Inline>),
    Code(String),
    Link { text: Vec<Inline>, href: String },
}

/// Largest ordered-list number Markdown recognises as a list marker.
pub const MAX_LIST_NUMBER: u64 = 999_999_999;

/// A table; the first row renders as the header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    pub rows: Vec<Vec<String>>,
}

impl Table {
    /// Column count of the widest row.
    pub fn columns(&self) -> usize {
        self.rows.iter().map(Vec::len).max().unwrap_or(0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct List {
    pub ordered: bool,
    /// First number of an ordered list, at most [`MAX_LIST_NUMBER`].
    pub start: u64,
    pub items: Vec<ListItem>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ListItem {
    pub content: Vec<Inline>,
    /// Lists nested one level deeper, in document order.
    pub children: Vec<List>,
    /// Code samples inside the item, rendered under its text.
    pub blocks: Vec<Block>,
}

/// One classified unit of content, in document order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    Heading { level: u8, content: Vec<Inline> },
    Paragraph(Vec<Inline>),
    Code { language: Option<String>, text: String },
    Table(Table),
    List(List),
    /// Loose inline content not wrapped in a paragraph element.
    InlineGroup(Vec<Inline>),
}

impl Block {
    /// Visible text without markup, for identification heuristics.
    pub fn plain_text(&self) -> String {
        match self {
            Block::Heading { content, .. } | Block::Paragraph(content) | Block::InlineGroup(content) => {
                inline_text(content)
            }
            Block::Code { text, .. } => text.clone(),
            Block::Table(table) => table
                .rows
                .iter()
                .map(|row| row.join(" "))
                .collect::<Vec<_>>()
                .join("\n"),
            Block::List(list) => list_text(list),
        }
    }

    pub fn is_heading(&self) -> bool {
        matches!(self, Block::Heading { .. })
    }
}

/// Concatenated text of inline spans.
pub fn inline_text(spans: &[Inline]) -> String {
    let mut out = String::new();
    for span in spans {
        match span {
            Inline::Text(t) | Inline::Code(t) => out.push_str(t),
            Inline::Strong(inner) | Inline::Emphasis(inner) => out.push_str(&inline_text(inner)),
            Inline::Link { text, .. } => out.push_str(&inline_text(text)),
        }
    }
    out
}

fn list_text(list: &List) -> String {
    let mut lines = Vec::new();
    for item in &list.items {
        lines.push(inline_text(&item.content));
        lines.extend(item.blocks.iter().map(Block::plain_text));
        for child in &item.children {
            lines.push(list_text(child));
        }
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text_heading() {
        let block = Block::Heading {
            level: 2,
            content: vec![Inline::Code("GET".into()), Inline::Text(" /users".into())],
        };
        assert_eq!(block.plain_text(), "GET /users");
        assert!(block.is_heading());
    }

    #[test]
    fn test_plain_text_nested_inline() {
        let spans = vec![
            Inline::Strong(vec![Inline::Emphasis(vec![Inline::Text("deep".into())])]),
            Inline::Link { text: vec![Inline::Text(" link".into())], href: "https://x".into() },
        ];
        assert_eq!(inline_text(&spans), "deep link");
    }

    #[test]
    fn test_table_columns() {
        let table = Table { rows: vec![vec!["a".into(), "b".into()], vec!["c".into()], vec![]] };
        assert_eq!(table.columns(), 2);
        assert_eq!(Table { rows: vec![] }.columns(), 0);
    }

    #[test]
    fn test_plain_text_list() {
        let list = List {
            ordered: false,
            start: 1,
            items: vec![ListItem {
                content: vec![Inline::Text("outer".into())],
                children: vec![List {
                    ordered: true,
                    start: 1,
                    items: vec![ListItem { content: vec![Inline::Text("inner".into())], children: vec![], blocks: vec![] }],
                }],
                blocks: vec![Block::Code { language: None, text: "x = 1".into() }],
            }],
        };
        assert_eq!(Block::List(list).plain_text(), "outer\nx = 1\ninner");
    }
}
