mod markdown;
mod syntax;

pub use markdown::{Block, MarkdownRenderer, parse_blocks};
pub use syntax::{Highlighter, print_syntax};

#[cfg(test)]
pub(crate) fn strip_ansi(text: &str) -> String {
    let mut plain = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(ch) = chars.next() {
        if ch == '\x1b' {
            for next in chars.by_ref() {
                if next.is_ascii_alphabetic() {
                    break;
                }
            }
            continue;
        }
        plain.push(ch);
    }
    plain
}
