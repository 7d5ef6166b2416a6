//! Interactive terminal loop
//!
//! Reads one line per query, streams the answer to the output as it is
//! generated, and keeps going after failed turns. Logs go to stderr.

use crate::agent::Coordinator;
use crate::Result;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tracing::{debug, error};
use uuid::Uuid;

pub const EXAMPLE_QUERIES: &[&str] = &[
    "Compare P/E ratios of Apple and Google",
    "Get latest news for Tesla",
    "What is Microsoft's current stock price?",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Exit,
    Help,
    Empty,
    Query(String),
}

/// Commands are matched case-insensitively after trimming
pub fn parse_command(line: &str) -> Command {
    let trimmed = line.trim();
    match trimmed.to_lowercase().as_str() {
        "" => Command::Empty,
        "exit" | "quit" | "q" => Command::Exit,
        "help" | "h" => Command::Help,
        _ => Command::Query(trimmed.to_string()),
    }
}

pub fn help_text() -> String {
    let mut text = String::from("Ask a question about public companies, for example:\n");
    for example in EXAMPLE_QUERIES {
        text.push_str(&format!("  - {}\n", example));
    }
    text.push_str("Commands: help (h), exit (quit, q)\n");
    text
}

pub struct Repl {
    coordinator: Arc<Coordinator>,
    session_id: Uuid,
}

impl Repl {
    pub fn new(coordinator: Arc<Coordinator>, session_id: Uuid) -> Self {
        Self {
            coordinator,
            session_id,
        }
    }

    /// Run until an exit command or end of input
    pub async fn run<R, W>(&self, input: R, output: &mut W) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        output
            .write_all(b"Financial Analyst Assistant\nType 'help' for examples, 'exit' to quit.\n")
            .await?;

        let mut lines = input.lines();

        loop {
            output.write_all(b"\n> ").await?;
            output.flush().await?;

            let Some(line) = lines.next_line().await? else {
                debug!("End of input");
                break;
            };

            match parse_command(&line) {
                Command::Empty => continue,
                Command::Exit => break,
                Command::Help => output.write_all(help_text().as_bytes()).await?,
                Command::Query(query) => self.answer(query, output).await?,
            }
        }

        output.write_all(b"Goodbye.\n").await?;
        output.flush().await?;
        Ok(())
    }

    async fn answer<W>(&self, query: String, output: &mut W) -> Result<()>
    where
        W: AsyncWrite + Unpin,
    {
        let (tx, rx) = mpsc::channel::<String>(64);
        let coordinator = &self.coordinator;
        let session_id = self.session_id;

        let turn = async move {
            // tx is dropped when the turn ends, closing the stream below
            let tx = tx;
            coordinator.run(&query, session_id, &tx).await
        };

        let printer = async {
            // rx is dropped on a write error so pending sends fail instead of blocking
            let mut rx = rx;
            while let Some(chunk) = rx.recv().await {
                output.write_all(chunk.as_bytes()).await?;
                output.flush().await?;
            }
            Ok::<_, std::io::Error>(())
        };

        let (turn, printed) = tokio::join!(turn, printer);
        printed?;

        match turn {
            Ok(turn) => {
                debug!(
                    observations = turn.observations.len(),
                    execution_time_ms = turn.execution_time_ms,
                    "Turn finished"
                );
                output.write_all(b"\n").await?;
            }
            Err(e) => {
                error!(kind = ?e.kind(), "Turn failed: {}", e);
                output
                    .write_all(format!("\nError: {}\n", e).as_bytes())
                    .await?;
            }
        }

        Ok(())
    }
}
