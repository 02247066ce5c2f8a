use async_trait::async_trait;
use futures_util::future::{BoxFuture, FutureExt};

use crate::qnap::content::{
    CheckListItem, FileAttrs, Inline, ListItem, Mark, Node, ParagraphStyle, TableCell, TableRow,
};
use crate::qnap::{Document, Location, ResourceKind, Result};

/// Turns a resource referenced from note content into an id usable as
/// `:/<id>` in the rendered Markdown
#[async_trait]
pub trait ResourceResolver: Send + Sync {
    async fn resolve(
        &self,
        location: &Location,
        kind: ResourceKind,
        attrs: &FileAttrs,
    ) -> Result<String>;
}

/// Export a note's document to Markdown
pub async fn export_document_to_markdown<R>(
    document: &Document,
    location: &Location,
    resolver: &R,
) -> Result<String>
where
    R: ResourceResolver + ?Sized,
{
    MarkdownRenderer::new(resolver, location)
        .render(document)
        .await
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ListKind {
    Bullet,
    Ordered,
    Check,
}

impl ListKind {
    fn marker(self) -> &'static str {
        match self {
            ListKind::Bullet => "- ",
            ListKind::Ordered => "1. ",
            ListKind::Check => "- ",
        }
    }
}

/// Extra indentation of a list nested in a list item
fn nested_indent(parent: ListKind, child: ListKind) -> usize {
    match (parent, child) {
        (_, ListKind::Ordered) | (ListKind::Ordered, _) => 3,
        _ => 2,
    }
}

/// Renders one note; resources are resolved relative to the note's location
pub struct MarkdownRenderer<'a, R: ResourceResolver + ?Sized> {
    resolver: &'a R,
    location: &'a Location,
}

impl<'a, R: ResourceResolver + ?Sized> MarkdownRenderer<'a, R> {
    pub fn new(resolver: &'a R, location: &'a Location) -> Self {
        Self { resolver, location }
    }

    pub async fn render(&self, document: &Document) -> Result<String> {
        self.render_blocks(&document.content).await
    }

    /// Every block is followed by a newline
    fn render_blocks<'b>(&'b self, nodes: &'b [Node]) -> BoxFuture<'b, Result<String>> {
        async move {
            let mut md = String::new();
            for node in nodes {
                md.push_str(&self.render_block(node).await?);
                md.push('\n');
            }
            Ok(md)
        }
        .boxed()
    }

    async fn render_block(&self, node: &Node) -> Result<String> {
        match node {
            Node::Heading { attrs, content } => {
                let text = self.render_inline(content, false).await?;
                Ok(format!("{} {}", "#".repeat(attrs.level()), text))
            }
            Node::Paragraph { attrs, content } => {
                let text = self.render_inline(content, true).await?;
                Ok(style_paragraph(attrs, text))
            }
            Node::Table { content } => self.render_table(content).await,
            Node::BulletList { content } => self.render_list(ListKind::Bullet, content, 0).await,
            Node::OrderedList { content } => self.render_list(ListKind::Ordered, content, 0).await,
            Node::CheckList { content } => self.render_check_list(content, 0).await,
            Node::Blockquote { content } => {
                let inner = self.render_blocks(content).await?;
                Ok(quote(&inner))
            }
            Node::CodeBlock { content } => Ok(render_code(content)),
            Node::HorizontalRule => Ok("---".to_string()),
            Node::Unsupported => {
                log::warn!("Skipping unsupported block in note {}", self.location);
                Ok(String::new())
            }
        }
    }

    async fn render_inline(&self, content: &[Option<Inline>], escape: bool) -> Result<String> {
        let mut md = String::new();
        for inline in content.iter().flatten() {
            match inline {
                Inline::Text { text, marks } => md.push_str(&render_text(text, marks, escape)),
                Inline::File { attrs } => {
                    md.push_str(&self.render_file(ResourceKind::Attachment, attrs).await?)
                }
                Inline::Image { attrs } => {
                    md.push_str(&self.render_file(ResourceKind::Image, attrs).await?)
                }
                Inline::HardBreak => md.push_str("<br/>"),
                Inline::Unsupported => {
                    log::warn!("Skipping unsupported inline node in note {}", self.location)
                }
            }
        }
        Ok(md)
    }

    async fn render_file(&self, kind: ResourceKind, attrs: &FileAttrs) -> Result<String> {
        let id = self.resolver.resolve(self.location, kind, attrs).await?;
        let sign = match kind {
            ResourceKind::Image => "!",
            ResourceKind::Attachment => "",
        };
        Ok(format!("{}[{}](:/{})", sign, attrs.title(), id))
    }

    /// Inline content of the paragraphs among `nodes`, concatenated
    async fn render_paragraphs(&self, nodes: &[Node]) -> Result<String> {
        let mut md = String::new();
        for node in nodes {
            if let Node::Paragraph { content, .. } = node {
                md.push_str(&self.render_inline(content, true).await?);
            }
        }
        Ok(md)
    }

    async fn render_cell(&self, cell: &TableCell) -> Result<String> {
        self.render_paragraphs(&cell.content).await
    }

    async fn render_table(&self, rows: &[TableRow]) -> Result<String> {
        let mut lines = Vec::with_capacity(rows.len() + 1);

        for (row_idx, row) in rows.iter().enumerate() {
            let mut cells = Vec::with_capacity(row.content.len());
            for cell in &row.content {
                cells.push(self.render_cell(cell).await?);
            }
            lines.push(format!("|{}|", cells.join("|")));

            // Divider after the first row
            if row_idx == 0 {
                let divider = vec!["-"; row.content.len()];
                lines.push(format!("|{}|", divider.join("|")));
            }
        }

        Ok(lines.join("\n"))
    }

    fn render_list<'b>(
        &'b self,
        kind: ListKind,
        items: &'b [ListItem],
        level: usize,
    ) -> BoxFuture<'b, Result<String>> {
        async move {
            let mut md = String::new();
            for item in items {
                for child in &item.content {
                    match child {
                        Node::Paragraph { content, .. } => {
                            let text = self.render_inline(content, true).await?;
                            md.push_str(&" ".repeat(level));
                            md.push_str(kind.marker());
                            md.push_str(&text);
                            md.push('\n');
                        }
                        nested => md.push_str(&self.render_nested(kind, nested, level).await?),
                    }
                }
            }
            Ok(md)
        }
        .boxed()
    }

    fn render_check_list<'b>(
        &'b self,
        items: &'b [CheckListItem],
        level: usize,
    ) -> BoxFuture<'b, Result<String>> {
        async move {
            let mut md = String::new();
            for item in items {
                let checked = if item.attrs.checked.unwrap_or(false) { 'x' } else { ' ' };
                let text = self.render_paragraphs(&item.content).await?;
                md.push_str(&format!("{}- [{}] {}\n", " ".repeat(level), checked, text));

                for child in &item.content {
                    if !matches!(child, Node::Paragraph { .. }) {
                        md.push_str(&self.render_nested(ListKind::Check, child, level).await?);
                    }
                }
            }
            Ok(md)
        }
        .boxed()
    }

    /// A list nested in an item of a `parent` list at `level`
    async fn render_nested(&self, parent: ListKind, node: &Node, level: usize) -> Result<String> {
        match node {
            Node::BulletList { content } => {
                let level = level + nested_indent(parent, ListKind::Bullet);
                self.render_list(ListKind::Bullet, content, level).await
            }
            Node::OrderedList { content } => {
                let level = level + nested_indent(parent, ListKind::Ordered);
                self.render_list(ListKind::Ordered, content, level).await
            }
            Node::CheckList { content } => {
                let level = level + nested_indent(parent, ListKind::Check);
                self.render_check_list(content, level).await
            }
            _ => {
                log::warn!("Skipping non-list block inside a list item of note {}", self.location);
                Ok(String::new())
            }
        }
    }
}

fn mark_symbol(mark: &Mark) -> Option<&'static str> {
    match mark {
        Mark::Emphasis => Some("*"),
        Mark::Strong => Some("**"),
        Mark::Superscript => Some("^"),
        Mark::Subscript => Some("~"),
        Mark::Underline => Some("++"),
        Mark::Strikethrough => Some("~~"),
        Mark::Link { .. } | Mark::Unsupported => None,
    }
}

fn escape_angle_brackets(text: &str) -> String {
    text.replace('<', "&lt;").replace('>', "&gt;")
}

/// Render a text run.
///
/// A link mark wins over every other mark on the run. Otherwise the mark
/// symbols open in order and close in reverse order.
pub fn render_text(text: &str, marks: &[Mark], escape: bool) -> String {
    let href = marks.iter().find_map(|mark| match mark {
        Mark::Link { attrs } => Some(attrs.href.as_str()),
        _ => None,
    });
    if let Some(href) = href {
        return format!("[{}]({})", text, href);
    }

    let symbols: Vec<&str> = marks.iter().filter_map(mark_symbol).collect();
    let opening = symbols.concat();
    let closing: String = symbols.iter().rev().copied().collect();

    let text = if escape {
        escape_angle_brackets(text)
    } else {
        text.to_string()
    };

    format!("{}{}{}", opening, text, closing)
}

/// Wrap an indented or aligned paragraph in a styled container
fn style_paragraph(style: &ParagraphStyle, text: String) -> String {
    let mut css = Vec::new();

    if let Some(indent) = style.indent.filter(|i| *i > 0.0) {
        css.push(format!("padding-left: {}em;", indent));
    }
    if let Some(align) = style
        .align
        .as_deref()
        .filter(|a| matches!(*a, "center" | "right"))
    {
        css.push(format!("text-align: {};", align));
    }

    if css.is_empty() {
        text
    } else {
        format!("<div style=\"{}\">{}</div>", css.join(" "), text)
    }
}

fn render_code(content: &[Option<Inline>]) -> String {
    let mut code = String::new();
    for inline in content.iter().flatten() {
        match inline {
            Inline::Text { text, .. } => code.push_str(text),
            Inline::HardBreak => code.push('\n'),
            _ => {}
        }
    }

    if code.ends_with('\n') {
        format!("```\n{}```", code)
    } else {
        format!("```\n{}\n```", code)
    }
}

/// Prefix every line with one `>`
fn quote(markdown: &str) -> String {
    markdown
        .lines()
        .map(|line| format!(">{}", line))
        .collect::<Vec<_>>()
        .join("\n")
}
