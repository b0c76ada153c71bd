use anyhow::{Context, Result};
use std::fs;
use std::io::{self, Write};
use std::path::Path;
use syntect::easy::HighlightLines;
use syntect::highlighting::{Theme, ThemeSet};
use syntect::parsing::{SyntaxReference, SyntaxSet};
use syntect::util::{LinesWithEndings, as_24_bit_terminal_escaped};
use tracing::{debug, warn};

use crate::error::FileAccessError;

const CODE_THEME: &str = "base16-mocha.dark";
const RESET: &str = "\x1b[0m";

pub struct Highlighter {
    syntaxes: SyntaxSet,
    theme: Theme,
}

impl Highlighter {
    pub fn new() -> Self {
        let syntaxes = SyntaxSet::load_defaults_newlines();
        let mut themes = ThemeSet::load_defaults();
        let theme = themes.themes.remove(CODE_THEME).unwrap_or_else(|| {
            warn!(theme = CODE_THEME, "bundled highlight theme missing; using plain theme");
            Theme::default()
        });
        Self { syntaxes, theme }
    }

    pub fn syntax_for_token(&self, token: Option<&str>) -> &SyntaxReference {
        token
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .and_then(|token| self.syntaxes.find_syntax_by_token(token))
            .unwrap_or_else(|| self.syntaxes.find_syntax_plain_text())
    }

    fn syntax_for_file(&self, path: &Path, source: &str) -> &SyntaxReference {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(|ext| self.syntaxes.find_syntax_by_extension(ext))
            .or_else(|| self.syntaxes.find_syntax_by_first_line(source))
            .unwrap_or_else(|| self.syntaxes.find_syntax_plain_text())
    }

    /// Writes `code` with 24-bit colour escapes, always ending on a reset and a newline.
    pub fn highlight<W: Write + ?Sized>(
        &self,
        code: &str,
        syntax: &SyntaxReference,
        out: &mut W,
    ) -> io::Result<()> {
        let mut lines = HighlightLines::new(syntax, &self.theme);
        for line in LinesWithEndings::from(code) {
            match lines.highlight_line(line, &self.syntaxes) {
                Ok(ranges) => write!(out, "{}", as_24_bit_terminal_escaped(&ranges, false))?,
                Err(err) => {
                    debug!(error = %err, "highlighting failed; writing line unstyled");
                    write!(out, "{RESET}{line}")?;
                }
            }
        }

        write!(out, "{RESET}")?;
        if !code.ends_with('\n') {
            writeln!(out)?;
        }
        Ok(())
    }
}

impl Default for Highlighter {
    fn default() -> Self {
        Self::new()
    }
}

pub fn print_syntax<W: Write + ?Sized>(
    highlighter: &Highlighter,
    path: &Path,
    out: &mut W,
) -> Result<()> {
    let source = fs::read_to_string(path).map_err(|source| FileAccessError {
        path: path.to_path_buf(),
        source,
    })?;
    let syntax = highlighter.syntax_for_file(path, &source);
    debug!(path = %path.display(), syntax = %syntax.name, "printing highlighted file");

    highlighter
        .highlight(&source, syntax, out)
        .with_context(|| format!("Failed to write highlighted '{}'", path.display()))
}
