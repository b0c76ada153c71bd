use clap::Parser;
use std::path::PathBuf;

use crate::config::DEFAULT_SYSTEM_PROMPT;

/// Ask questions about code from multiple files.
#[derive(Debug, Parser)]
#[command(name = "codechat", about, version)]
pub struct Cli {
    /// List of files to include in the context
    #[arg(value_name = "FILE", required = true, num_args = 1..)]
    pub files: Vec<PathBuf>,

    /// Custom initial prompt for the conversation
    #[arg(short, long, value_name = "TEXT")]
    pub prompt: Option<String>,
}

impl Cli {
    pub fn system_prompt(&self) -> &str {
        self.prompt.as_deref().unwrap_or(DEFAULT_SYSTEM_PROMPT)
    }
}

#[cfg(test)]
mod tests {
    use clap::Parser;
    use clap::error::ErrorKind;
    use std::path::PathBuf;

    use super::Cli;
    use crate::config::DEFAULT_SYSTEM_PROMPT;

    #[test]
    fn parses_files_in_order_with_default_prompt() {
        let cli = Cli::try_parse_from(["codechat", "b.rs", "a.rs"]).expect("args should parse");
        assert_eq!(cli.files, vec![PathBuf::from("b.rs"), PathBuf::from("a.rs")]);
        assert_eq!(cli.system_prompt(), DEFAULT_SYSTEM_PROMPT);
    }

    #[test]
    fn accepts_short_and_long_prompt_flags() {
        let short = Cli::try_parse_from(["codechat", "main.rs", "-p", "Be terse."])
            .expect("args should parse");
        assert_eq!(short.system_prompt(), "Be terse.");

        let long = Cli::try_parse_from(["codechat", "--prompt", "Review it.", "a.rs", "b.rs"])
            .expect("args should parse");
        assert_eq!(long.system_prompt(), "Review it.");
        assert_eq!(long.files.len(), 2);
    }

    #[test]
    fn requires_at_least_one_file() {
        let err = Cli::try_parse_from(["codechat"]).expect_err("missing files should fail");
        assert_eq!(err.kind(), ErrorKind::MissingRequiredArgument);

        let err =
            Cli::try_parse_from(["codechat", "-p", "x"]).expect_err("missing files should fail");
        assert_eq!(err.kind(), ErrorKind::MissingRequiredArgument);
    }

    #[test]
    fn definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
