//! A line-oriented interpreter for insert and range-count commands.
//!
//! The input is a stream of whitespace-separated tokens:
//!
//! - `k <key>` inserts `key` into the set.
//! - `q <low> <high>` counts the keys in `[low, high]`. Queries with `low >= high` report 0.
//!
//! Every query result is written followed by a single space, and the output ends with a newline.
//! Unknown tokens are skipped.

use std::{
    io::{self, BufRead, Write},
    num::ParseIntError,
};

use log::{debug, trace};

use crate::AvlSet;

#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error("failed to process commands: {0}")]
    Io(#[from] io::Error),

    #[error("`{command}` command is missing an operand")]
    MissingOperand { command: char },

    #[error("`{command}` command has an invalid operand `{token}`")]
    InvalidOperand {
        command: char,
        token: String,
        #[source]
        source: ParseIntError,
    },
}

/// Counts of the commands processed by [`run`].
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Summary {
    pub inserts: usize,
    pub queries: usize,
    pub skipped: usize,
}

// Splits the input into whitespace-separated tokens, reading one line at a time.
struct Tokens<R> {
    input: R,
    // Tokens of the current line, in reverse order.
    pending: Vec<String>,
}

impl<R: BufRead> Tokens<R> {
    fn new(input: R) -> Self {
        Tokens {
            input,
            pending: Vec::new(),
        }
    }

    fn next_token(&mut self) -> io::Result<Option<String>> {
        loop {
            if let Some(token) = self.pending.pop() {
                return Ok(Some(token));
            }

            let mut line = String::new();
            if self.input.read_line(&mut line)? == 0 {
                return Ok(None);
            }

            self.pending
                .extend(line.split_whitespace().rev().map(str::to_owned));
        }
    }

    fn operand(&mut self, command: char) -> Result<i64, CommandError> {
        let token = self
            .next_token()?
            .ok_or(CommandError::MissingOperand { command })?;

        token
            .parse::<i64>()
            .map_err(|source| CommandError::InvalidOperand {
                command,
                token,
                source,
            })
    }
}

/// Executes the commands read from `input` against `set`, writing query results to `output`.
pub fn run<R, W>(input: R, mut output: W, set: &mut AvlSet<i64>) -> Result<Summary, CommandError>
where
    R: BufRead,
    W: Write,
{
    let mut tokens = Tokens::new(input);
    let mut summary = Summary::default();

    while let Some(token) = tokens.next_token()? {
        match token.as_str() {
            "k" => {
                let key = tokens.operand('k')?;
                let inserted = set.insert(key);
                debug!("k {key}: {}", if inserted { "inserted" } else { "duplicate" });
                summary.inserts += 1;
            }

            "q" => {
                let low = tokens.operand('q')?;
                let high = tokens.operand('q')?;

                let count = if low >= high {
                    0
                } else {
                    set.range_count(&low, &high)
                };

                debug!("q {low} {high}: {count}");
                write!(output, "{count} ")?;
                summary.queries += 1;
            }

            other => {
                trace!("skipping unknown token {other:?}");
                summary.skipped += 1;
            }
        }
    }

    writeln!(output)?;
    output.flush()?;

    Ok(summary)
}

/// Runs the commands in `input` against a fresh set and returns the output.
pub fn process_str(input: &str) -> Result<String, CommandError> {
    let mut set = AvlSet::new();
    let mut output = Vec::new();

    run(input.as_bytes(), &mut output, &mut set)?;

    Ok(String::from_utf8_lossy(&output).into_owned())
}
