use crossterm::style::{Color, Stylize};
use std::io::{self, Write};

use super::syntax::Highlighter;

// Monokai foreground/background pair for inline code.
const INLINE_CODE_FG: Color = Color::Rgb {
    r: 0xf8,
    g: 0xf8,
    b: 0xf2,
};
const INLINE_CODE_BG: Color = Color::Rgb {
    r: 0x27,
    g: 0x28,
    b: 0x22,
};
const HEADING_COLOR: Color = Color::Rgb {
    r: 0x66,
    g: 0xd9,
    b: 0xef,
};
const MUTED_COLOR: Color = Color::DarkGrey;
const RULE_WIDTH: usize = 60;
const MAX_HEADING_LEVEL: usize = 6;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    Heading { level: usize, text: String },
    Paragraph(String),
    ListItem {
        indent: usize,
        marker: String,
        text: String,
    },
    Quote(String),
    CodeBlock { lang: Option<String>, code: String },
    Rule,
}

fn is_rule(trimmed: &str) -> bool {
    trimmed.len() >= 3
        && ['-', '*', '_']
            .iter()
            .any(|marker| trimmed.chars().all(|c| c == *marker))
}

fn parse_heading(trimmed: &str) -> Option<(usize, String)> {
    let level = trimmed.chars().take_while(|c| *c == '#').count();
    if level == 0 || level > MAX_HEADING_LEVEL {
        return None;
    }
    let rest = &trimmed[level..];
    if !rest.is_empty() && !rest.starts_with(char::is_whitespace) {
        return None;
    }
    Some((level, rest.trim().trim_end_matches('#').trim_end().to_string()))
}

fn parse_list_item(line: &str) -> Option<Block> {
    let trimmed = line.trim_start();
    let indent = (line.len() - trimmed.len()) / 2;

    for bullet in ["- ", "* ", "+ "] {
        if let Some(text) = trimmed.strip_prefix(bullet) {
            return Some(Block::ListItem {
                indent,
                marker: "•".to_string(),
                text: text.trim().to_string(),
            });
        }
    }

    let digits = trimmed.chars().take_while(char::is_ascii_digit).count();
    if digits > 0 {
        let (number, rest) = trimmed.split_at(digits);
        if let Some(text) = rest.strip_prefix(". ") {
            return Some(Block::ListItem {
                indent,
                marker: format!("{number}."),
                text: text.trim().to_string(),
            });
        }
    }

    None
}

pub fn parse_blocks(text: &str) -> Vec<Block> {
    let mut blocks = Vec::new();
    let mut paragraph: Vec<&str> = Vec::new();
    let mut quote: Vec<&str> = Vec::new();
    let mut lines = text.lines();

    let flush = |acc: &mut Vec<&str>, blocks: &mut Vec<Block>, make: fn(String) -> Block| {
        if !acc.is_empty() {
            blocks.push(make(acc.join("\n")));
            acc.clear();
        }
    };

    while let Some(line) = lines.next() {
        let trimmed = line.trim();

        if let Some(quoted) = trimmed.strip_prefix('>') {
            flush(&mut paragraph, &mut blocks, Block::Paragraph);
            quote.push(quoted.trim());
            continue;
        }
        flush(&mut quote, &mut blocks, Block::Quote);

        if let Some(lang) = trimmed.strip_prefix("```") {
            flush(&mut paragraph, &mut blocks, Block::Paragraph);
            let lang = Some(lang.trim().to_string()).filter(|lang| !lang.is_empty());
            let code: Vec<&str> = lines
                .by_ref()
                .take_while(|line| !line.trim_start().starts_with("```"))
                .collect();
            blocks.push(Block::CodeBlock {
                lang,
                code: code.join("\n"),
            });
            continue;
        }

        if trimmed.is_empty() {
            flush(&mut paragraph, &mut blocks, Block::Paragraph);
            continue;
        }

        if is_rule(trimmed) {
            flush(&mut paragraph, &mut blocks, Block::Paragraph);
            blocks.push(Block::Rule);
            continue;
        }

        if let Some((level, text)) = parse_heading(trimmed) {
            flush(&mut paragraph, &mut blocks, Block::Paragraph);
            blocks.push(Block::Heading { level, text });
            continue;
        }

        if let Some(item) = parse_list_item(line) {
            flush(&mut paragraph, &mut blocks, Block::Paragraph);
            blocks.push(item);
            continue;
        }

        paragraph.push(trimmed);
    }
    flush(&mut quote, &mut blocks, Block::Quote);
    flush(&mut paragraph, &mut blocks, Block::Paragraph);

    blocks
}

fn styled_span(tail: &str) -> Option<(String, &str)> {
    if let Some(body) = tail.strip_prefix('`') {
        let end = body.find('`').filter(|end| *end > 0)?;
        let code = &body[..end];
        return Some((
            code.with(INLINE_CODE_FG).on(INLINE_CODE_BG).to_string(),
            &body[end + 1..],
        ));
    }

    if let Some(body) = tail.strip_prefix("**") {
        let end = body.find("**").filter(|end| *end > 0)?;
        return Some((body[..end].bold().to_string(), &body[end + 2..]));
    }

    let body = tail.strip_prefix('*')?;
    if body.starts_with(char::is_whitespace) {
        return None;
    }
    let end = body.find('*').filter(|end| *end > 0)?;
    let inner = &body[..end];
    if inner.ends_with(char::is_whitespace) {
        return None;
    }
    Some((inner.italic().to_string(), &body[end + 1..]))
}

fn render_inline(text: &str) -> String {
    let mut rendered = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(pos) = rest.find(['`', '*']) {
        rendered.push_str(&rest[..pos]);
        let tail = &rest[pos..];
        match styled_span(tail) {
            Some((styled, remaining)) => {
                rendered.push_str(&styled);
                rest = remaining;
            }
            None => {
                rendered.push_str(&tail[..1]);
                rest = &tail[1..];
            }
        }
    }
    rendered.push_str(rest);

    rendered
}

pub struct MarkdownRenderer {
    highlighter: Highlighter,
}

impl MarkdownRenderer {
    pub fn new() -> Self {
        Self {
            highlighter: Highlighter::new(),
        }
    }

    pub fn render<W: Write + ?Sized>(&self, text: &str, out: &mut W) -> io::Result<()> {
        let blocks = parse_blocks(text);
        let mut previous: Option<&Block> = None;

        for block in &blocks {
            let tight_list = matches!(
                (previous, block),
                (Some(Block::ListItem { .. }), Block::ListItem { .. })
            );
            if previous.is_some() && !tight_list {
                writeln!(out)?;
            }
            self.render_block(block, out)?;
            previous = Some(block);
        }
        writeln!(out)?;

        Ok(())
    }

    fn render_block<W: Write + ?Sized>(&self, block: &Block, out: &mut W) -> io::Result<()> {
        match block {
            Block::Heading { level: 1, text } => {
                writeln!(out, "{}", text.as_str().with(HEADING_COLOR).bold().underlined())
            }
            Block::Heading { text, .. } => {
                writeln!(out, "{}", text.as_str().with(HEADING_COLOR).bold())
            }
            Block::Paragraph(text) => {
                for line in text.lines() {
                    writeln!(out, "{}", render_inline(line))?;
                }
                Ok(())
            }
            Block::ListItem {
                indent,
                marker,
                text,
            } => writeln!(
                out,
                "{}{} {}",
                "  ".repeat(indent + 1),
                marker,
                render_inline(text)
            ),
            Block::Quote(text) => {
                for line in text.lines() {
                    writeln!(out, "{} {}", "▌".with(MUTED_COLOR), line.italic())?;
                }
                Ok(())
            }
            Block::CodeBlock { lang, code } => {
                let syntax = self.highlighter.syntax_for_token(lang.as_deref());
                self.highlighter.highlight(code, syntax, out)
            }
            Block::Rule => writeln!(out, "{}", "─".repeat(RULE_WIDTH).with(MUTED_COLOR)),
        }
    }
}

impl Default for MarkdownRenderer {
    fn default() -> Self {
        Self::new()
    }
}
