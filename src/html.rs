//! Converts the HTML subset used in catalog content into terminal text.
//!
//! Handles headings, paragraphs, lists, block quotes, tables, rules, inline
//! code and `<pre><code>` blocks. Unknown tags are dropped and their text
//! kept. Every code block is recorded so the content panel can attach a
//! copy label to it after rendering.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use ratatui::layout::Alignment;
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span, Text};
use unicode_width::UnicodeWidthStr;

use crate::theme::Palette;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeBlock {
    /// 1-based, matches the `[copy N]` label.
    pub number: usize,
    /// Index of the label line inside [`Rendered::text`].
    pub header_line: usize,
    pub language: Option<String>,
    pub code: String,
}

#[derive(Debug, Clone)]
pub struct Rendered {
    pub text: Text<'static>,
    pub code_blocks: Vec<CodeBlock>,
}

impl Rendered {
    /// Copy of the text with each code block's label showing whether it was
    /// just copied.
    pub fn decorated(&self, copied: Option<usize>, palette: &Palette) -> Text<'static> {
        let mut text = self.text.clone();
        for block in &self.code_blocks {
            if let Some(line) = text.lines.get_mut(block.header_line) {
                *line = code_header_line(block, copied == Some(block.number), palette);
            }
        }
        text
    }

    pub fn code_block_at_line(&self, line: usize) -> Option<&CodeBlock> {
        self.code_blocks.iter().find(|block| block.header_line == line)
    }
}

pub fn code_header_line(block: &CodeBlock, copied: bool, palette: &Palette) -> Line<'static> {
    let language = block.language.as_deref().unwrap_or("code");
    let label = if copied {
        Span::styled(
            "copied ✓".to_string(),
            Style::default()
                .fg(palette.success)
                .add_modifier(Modifier::BOLD),
        )
    } else {
        Span::styled(
            format!("[copy {}]", block.number),
            Style::default().fg(palette.accent),
        )
    };
    Line::from(vec![
        Span::styled(
            format!("╭─ {language} "),
            Style::default().fg(palette.text_secondary),
        ),
        label,
    ])
}

pub struct Renderer<'p> {
    palette: &'p Palette,
}

impl<'p> Renderer<'p> {
    pub fn new(palette: &'p Palette) -> Self {
        Self { palette }
    }

    pub fn render(&self, input: &str) -> Rendered {
        let mut writer = HtmlWriter::default();
        writer.render(input);
        writer.into_rendered(self.palette)
    }
}

#[derive(Default)]
struct HtmlWriter {
    lines: Vec<RenderLine>,
    buffer: String,
    list_stack: Vec<ListState>,
    current_item: Option<ListMeta>,
    blockquote_depth: usize,
    heading_level: Option<u8>,
    code_block: Option<CodeMeta>,
    inline_code: bool,
    table: Option<TableMeta>,
    code_blocks: Vec<CodeBlock>,
}

#[derive(Clone, Copy)]
struct ListState {
    ordered: bool,
    index: usize,
}

#[derive(Clone)]
struct ListMeta {
    indent: usize,
    marker: String,
}

#[derive(Default)]
struct CodeMeta {
    language: Option<String>,
    buffer: String,
}

#[derive(Default)]
struct TableMeta {
    rows: Vec<(Vec<String>, bool)>,
    cells: Vec<String>,
    header_row: bool,
}

#[derive(Clone)]
enum RenderLine {
    Text(String),
    Heading {
        level: u8,
        text: String,
    },
    Bullet {
        indent: usize,
        marker: String,
        text: String,
    },
    Quote {
        depth: usize,
        text: String,
    },
    CodeHeader(usize),
    Code(String),
    CodeFooter,
    TableRow {
        text: String,
        header: bool,
    },
    Separator,
}

impl HtmlWriter {
    fn render(&mut self, input: &str) {
        let mut reader = Reader::from_str(input);
        reader
            .trim_text(false)
            .check_end_names(false)
            .expand_empty_elements(false);

        loop {
            match reader.read_event() {
                Ok(Event::Start(tag)) => {
                    let name = tag_name(tag.name().as_ref());
                    self.start_tag(&name, language_from_class(&tag));
                }
                Ok(Event::Empty(tag)) => {
                    let name = tag_name(tag.name().as_ref());
                    self.start_tag(&name, language_from_class(&tag));
                    self.end_tag(&name);
                }
                Ok(Event::End(tag)) => self.end_tag(&tag_name(tag.name().as_ref())),
                Ok(Event::Text(text)) => {
                    // Stray `&` or unknown entities keep the raw text.
                    let decoded = match text.unescape_with(html_entity) {
                        Ok(decoded) => decoded.into_owned(),
                        Err(_) => String::from_utf8_lossy(&text).into_owned(),
                    };
                    self.text(&decoded);
                }
                Ok(Event::CData(data)) => self.text(&String::from_utf8_lossy(&data)),
                Ok(Event::Eof) => break,
                Ok(_) => {}
                Err(err) => {
                    let position = reader.buffer_position();
                    tracing::debug!(error = %err, position, "html: malformed markup");
                    if let Some(rest) = input.get(position..) {
                        self.text(rest);
                    }
                    break;
                }
            }
        }
        self.flush_buffer();
    }

    fn start_tag(&mut self, name: &str, language: Option<String>) {
        if self.code_block.is_some() {
            if name == "code" {
                if let Some(meta) = self.code_block.as_mut() {
                    if meta.language.is_none() {
                        meta.language = language;
                    }
                }
            } else if name == "br" {
                self.push_code("\n");
            }
            return;
        }

        match name {
            "p" | "div" | "section" | "article" => self.flush_buffer(),
            "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
                self.flush_buffer();
                self.heading_level = name[1..].parse().ok();
            }
            "blockquote" => {
                self.flush_buffer();
                self.blockquote_depth += 1;
            }
            "pre" => {
                self.flush_buffer();
                self.code_block = Some(CodeMeta {
                    language,
                    buffer: String::new(),
                });
            }
            "code" => {
                self.inline_code = true;
                self.append_text("`");
            }
            "ul" | "ol" => {
                self.flush_buffer();
                self.list_stack.push(ListState {
                    ordered: name == "ol",
                    index: 1,
                });
            }
            "li" => {
                self.flush_buffer();
                let indent = self.list_stack.len().saturating_sub(1);
                let marker = match self.list_stack.last() {
                    Some(state) if state.ordered => format!("{}.", state.index),
                    _ => "•".to_string(),
                };
                self.current_item = Some(ListMeta { indent, marker });
            }
            "br" => self.flush_buffer(),
            "hr" => {
                self.flush_buffer();
                self.lines.push(RenderLine::Text("―".repeat(20)));
                self.lines.push(RenderLine::Separator);
            }
            "table" => {
                self.flush_buffer();
                self.table = Some(TableMeta::default());
            }
            "tr" => {
                if let Some(table) = self.table.as_mut() {
                    table.cells.clear();
                    table.header_row = false;
                }
            }
            "td" | "th" => {
                self.buffer.clear();
                if name == "th" {
                    if let Some(table) = self.table.as_mut() {
                        table.header_row = true;
                    }
                }
            }
            _ => {}
        }
    }

    fn end_tag(&mut self, name: &str) {
        if self.code_block.is_some() {
            if name == "pre" {
                self.finish_code_block();
            }
            return;
        }

        match name {
            "p" | "div" | "section" | "article" => {
                self.flush_buffer();
                self.push_separator();
            }
            "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
                if let Some(level) = self.heading_level.take() {
                    let text = self.consume_buffer();
                    if !text.is_empty() {
                        self.lines.push(RenderLine::Heading { level, text });
                        self.lines.push(RenderLine::Separator);
                    }
                }
            }
            "blockquote" => {
                self.flush_buffer();
                self.blockquote_depth = self.blockquote_depth.saturating_sub(1);
                self.push_separator();
            }
            "code" => {
                if self.inline_code {
                    self.inline_code = false;
                    self.append_text("`");
                }
            }
            "ul" | "ol" => {
                self.flush_buffer();
                self.list_stack.pop();
                self.current_item = None;
                if self.list_stack.is_empty() {
                    self.push_separator();
                }
            }
            "li" => {
                self.flush_buffer();
                if let Some(state) = self.list_stack.last_mut() {
                    state.index += 1;
                }
                self.current_item = None;
            }
            "td" | "th" => {
                let cell = self.consume_buffer();
                if let Some(table) = self.table.as_mut() {
                    table.cells.push(cell);
                }
            }
            "tr" => {
                if let Some(table) = self.table.as_mut() {
                    let cells = std::mem::take(&mut table.cells);
                    if !cells.is_empty() {
                        table.rows.push((cells, table.header_row));
                    }
                }
            }
            "table" => self.finish_table(),
            _ => {}
        }
    }

    fn text(&mut self, decoded: &str) {
        if decoded.is_empty() {
            return;
        }
        if self.code_block.is_some() {
            self.push_code(decoded);
            return;
        }
        let collapsed = collapse_whitespace(decoded);
        if self.buffer.is_empty() && collapsed.trim().is_empty() {
            return;
        }
        self.append_text(collapsed);
    }

    fn push_code(&mut self, text: &str) {
        if let Some(code) = self.code_block.as_mut() {
            code.buffer.push_str(text);
        }
    }

    fn finish_code_block(&mut self) {
        let Some(meta) = self.code_block.take() else {
            return;
        };
        let code = meta.buffer.trim_matches('\n').to_string();
        let number = self.code_blocks.len() + 1;
        self.lines.push(RenderLine::CodeHeader(self.code_blocks.len()));
        for line in code.split('\n') {
            self.lines.push(RenderLine::Code(line.to_string()));
        }
        self.lines.push(RenderLine::CodeFooter);
        self.lines.push(RenderLine::Separator);
        self.code_blocks.push(CodeBlock {
            number,
            header_line: 0,
            language: meta.language,
            code,
        });
    }

    fn finish_table(&mut self) {
        let Some(table) = self.table.take() else {
            return;
        };
        let columns = table.rows.iter().map(|(cells, _)| cells.len()).max().unwrap_or(0);
        let mut widths = vec![0usize; columns];
        for (cells, _) in &table.rows {
            for (idx, cell) in cells.iter().enumerate() {
                widths[idx] = widths[idx].max(UnicodeWidthStr::width(cell.as_str()));
            }
        }
        for (cells, header) in table.rows {
            let padded: Vec<String> = cells
                .iter()
                .enumerate()
                .map(|(idx, cell)| {
                    let pad = widths[idx].saturating_sub(UnicodeWidthStr::width(cell.as_str()));
                    format!("{}{}", cell, " ".repeat(pad))
                })
                .collect();
            self.lines.push(RenderLine::TableRow {
                text: padded.join(" │ "),
                header,
            });
        }
        self.push_separator();
    }

    fn append_text<T: AsRef<str>>(&mut self, text: T) {
        self.buffer.push_str(text.as_ref());
    }

    fn push_separator(&mut self) {
        if !matches!(self.lines.last(), Some(RenderLine::Separator) | None) {
            self.lines.push(RenderLine::Separator);
        }
    }

    fn flush_buffer(&mut self) {
        if self.table.is_some() {
            return;
        }
        let text = self.consume_buffer();
        if text.is_empty() {
            return;
        }

        if let Some(level) = self.heading_level {
            self.lines.push(RenderLine::Heading { level, text });
            return;
        }

        if let Some(item) = &self.current_item {
            self.lines.push(RenderLine::Bullet {
                indent: item.indent,
                marker: item.marker.clone(),
                text,
            });
            return;
        }

        if self.blockquote_depth > 0 {
            self.lines.push(RenderLine::Quote {
                depth: self.blockquote_depth,
                text,
            });
            return;
        }

        self.lines.push(RenderLine::Text(text));
    }

    fn consume_buffer(&mut self) -> String {
        let text = self.buffer.trim().to_string();
        self.buffer.clear();
        text
    }

    fn into_rendered(mut self, palette: &Palette) -> Rendered {
        while matches!(self.lines.last(), Some(RenderLine::Separator)) {
            self.lines.pop();
        }

        let code_style = Style::default().fg(palette.code);
        let frame_style = Style::default().fg(palette.text_secondary);
        let mut styled_lines = Vec::with_capacity(self.lines.len());
        for line in self.lines {
            match line {
                RenderLine::Text(content) => styled_lines.push(Line::from(Span::raw(content))),
                RenderLine::Heading { level, text } => {
                    styled_lines.push(Line::from(Span::styled(text, heading_style(level, palette))));
                }
                RenderLine::Bullet {
                    indent,
                    marker,
                    text,
                } => {
                    styled_lines.push(Line::from(vec![
                        Span::raw("  ".repeat(indent)),
                        Span::styled(format!("{} ", marker), Style::default().fg(palette.heading)),
                        Span::raw(text),
                    ]));
                }
                RenderLine::Quote { depth, text } => {
                    let prefix = "▍".repeat(depth.max(1));
                    styled_lines.push(Line::from(vec![
                        Span::styled(prefix + " ", Style::default().fg(palette.quote)),
                        Span::styled(
                            text,
                            Style::default()
                                .fg(palette.quote)
                                .add_modifier(Modifier::ITALIC),
                        ),
                    ]));
                }
                RenderLine::CodeHeader(block) => {
                    let header_line = styled_lines.len();
                    if let Some(meta) = self.code_blocks.get_mut(block) {
                        meta.header_line = header_line;
                        styled_lines.push(code_header_line(meta, false, palette));
                    }
                }
                RenderLine::Code(text) => {
                    styled_lines.push(Line::from(vec![
                        Span::styled("│ ".to_string(), frame_style),
                        Span::styled(text, code_style),
                    ]));
                }
                RenderLine::CodeFooter => {
                    styled_lines.push(Line::from(Span::styled("╰─".to_string(), frame_style)));
                }
                RenderLine::TableRow { text, header } => {
                    let style = if header {
                        Style::default().add_modifier(Modifier::BOLD)
                    } else {
                        Style::default()
                    };
                    styled_lines.push(Line::from(Span::styled(text, style)));
                }
                RenderLine::Separator => styled_lines.push(Line::default()),
            }
        }

        if styled_lines.is_empty() {
            styled_lines.push(Line::from(Span::raw("")));
        }

        Rendered {
            text: Text {
                lines: styled_lines,
                alignment: Some(Alignment::Left),
                style: Style::default().fg(palette.text_primary),
            },
            code_blocks: self.code_blocks,
        }
    }
}

fn heading_style(level: u8, palette: &Palette) -> Style {
    match level {
        1 => Style::default()
            .fg(palette.heading)
            .add_modifier(Modifier::BOLD | Modifier::UNDERLINED),
        2 => Style::default()
            .fg(palette.heading)
            .add_modifier(Modifier::BOLD),
        3 => Style::default()
            .fg(palette.subheading)
            .add_modifier(Modifier::BOLD),
        _ => Style::default().fg(palette.subheading),
    }
}

fn tag_name(raw: &[u8]) -> String {
    String::from_utf8_lossy(raw).to_ascii_lowercase()
}

/// Picks `rust` out of `class="language-rust"`.
fn language_from_class(tag: &BytesStart<'_>) -> Option<String> {
    tag.html_attributes()
        .flatten()
        .find(|attr| attr.key.as_ref().eq_ignore_ascii_case(b"class"))
        .and_then(|attr| {
            String::from_utf8_lossy(&attr.value)
                .split_whitespace()
                .find_map(|class| class.strip_prefix("language-"))
                .filter(|language| !language.is_empty())
                .map(str::to_string)
        })
}

/// Named HTML entities seen in catalog content. Numeric references are
/// resolved by the reader.
fn html_entity(name: &str) -> Option<&'static str> {
    let value = match name {
        "amp" => "&",
        "lt" => "<",
        "gt" => ">",
        "quot" => "\"",
        "apos" => "'",
        "nbsp" => "\u{a0}",
        "ndash" => "–",
        "mdash" => "—",
        "hellip" => "…",
        "middot" => "·",
        "bull" => "•",
        "times" => "×",
        "le" => "≤",
        "ge" => "≥",
        "ne" => "≠",
        "rarr" => "→",
        "larr" => "←",
        "harr" => "↔",
        "laquo" => "«",
        "raquo" => "»",
        "copy" => "©",
        _ => return None,
    };
    Some(value)
}

/// Runs of whitespace become one space. Non-breaking spaces are kept.
fn collapse_whitespace(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut in_space = false;
    for ch in raw.chars() {
        if ch.is_whitespace() && ch != '\u{a0}' {
            if !in_space {
                out.push(' ');
            }
            in_space = true;
        } else {
            out.push(ch);
            in_space = false;
        }
    }
    out
}

/// Flattens rendered text into plain lines, mostly for tests and search.
pub fn plain_lines(text: &Text<'_>) -> Vec<String> {
    text.lines
        .iter()
        .map(|line| {
            line.spans
                .iter()
                .map(|span| span.content.as_ref())
                .collect::<String>()
        })
        .collect()
}
