use anyhow::{Context, Result};
use std::io::{BufRead, Write};
use std::mem;
use tracing::{debug, info};

use crate::render::MarkdownRenderer;
use crate::session::{ChatBackend, ChatSession};

const FIRST_PROMPT: &str = "Ask a question (type 'exit' to quit): ";
const FOLLOW_UP_PROMPT: &str = "Ask another question (type 'exit' to quit): ";
const EXIT_COMMAND: &str = "exit";

#[derive(Debug, Clone, PartialEq, Eq)]
enum TurnState {
    FirstTurn { context: String },
    Steady,
}

impl TurnState {
    fn prompt(&self) -> &'static str {
        match self {
            Self::FirstTurn { .. } => FIRST_PROMPT,
            Self::Steady => FOLLOW_UP_PROMPT,
        }
    }

    fn take_user_content(&mut self, question: &str) -> String {
        match mem::replace(self, Self::Steady) {
            Self::FirstTurn { context } => format!("{question}\n\n{context}"),
            Self::Steady => question.to_string(),
        }
    }
}

fn is_exit(line: &str) -> bool {
    line.eq_ignore_ascii_case(EXIT_COMMAND)
}

pub async fn run_repl<B, R, W>(
    session: &mut ChatSession<B>,
    system_prompt: &str,
    file_context: String,
    renderer: &MarkdownRenderer,
    input: &mut R,
    out: &mut W,
) -> Result<()>
where
    B: ChatBackend,
    R: BufRead,
    W: Write,
{
    let mut state = TurnState::FirstTurn {
        context: file_context,
    };

    loop {
        write!(out, "{}", state.prompt()).context("Failed to write prompt")?;
        out.flush().context("Failed to flush stdout")?;

        let mut line = String::new();
        let read = input
            .read_line(&mut line)
            .context("Failed to read stdin")?;
        if read == 0 {
            writeln!(out).context("Failed to write to stdout")?;
            info!("input closed; leaving chat loop");
            break;
        }

        let question = line.trim_end_matches(['\r', '\n']);
        if is_exit(question) {
            info!("exit requested; leaving chat loop");
            break;
        }
        if question.is_empty() && state == TurnState::Steady {
            info!("empty question; leaving chat loop");
            break;
        }

        let user_content = state.take_user_content(question);
        match session.ask(system_prompt, &user_content).await {
            Ok(reply) if reply.trim().is_empty() => {
                debug!("chat backend returned an empty reply");
                writeln!(out, "Error: the model returned an empty response")
                    .context("Failed to write to stdout")?;
            }
            Ok(reply) => {
                renderer
                    .render(&reply, out)
                    .context("Failed to render response")?;
            }
            Err(err) => {
                debug!(error = %err, "chat turn failed");
                writeln!(out, "Error: {err}").context("Failed to write to stdout")?;
            }
        }
    }

    Ok(())
}
