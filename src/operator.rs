//! The operator's line-based input/output stream.
//!
//! Interactive flows (scene drafting, consolidation review, memory approval)
//! talk to the operator only through [`Operator`]. `None` from a read means the
//! input stream is closed; flows treat that as "stop without writing".

use std::collections::VecDeque;
use std::io::{BufRead, Write};

/// A line-oriented conversation with the person driving the tool.
pub trait Operator {
    /// Show text.
    fn say(&mut self, text: &str);

    /// Ask for a single line. Returns it without the trailing newline.
    fn ask(&mut self, prompt: &str) -> Option<String>;

    /// Ask for multi-line text terminated by a blank line.
    fn ask_block(&mut self, prompt: &str) -> Option<String>;

    /// Yes/no question; anything but `y`/`yes` (or a closed stream) is no.
    fn confirm(&mut self, prompt: &str) -> bool {
        self.ask(prompt)
            .map(|answer| matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"))
            .unwrap_or(false)
    }
}

/// Operator on the process's stdin/stdout.
#[derive(Debug, Default)]
pub struct ConsoleOperator;

impl ConsoleOperator {
    fn read_line() -> Option<String> {
        let mut line = String::new();
        match std::io::stdin().lock().read_line(&mut line) {
            Ok(0) => None,
            Ok(_) => Some(line.trim_end_matches(['\n', '\r']).to_string()),
            Err(e) => {
                tracing::warn!(error = %e, "failed to read operator input");
                None
            }
        }
    }
}

impl Operator for ConsoleOperator {
    fn say(&mut self, text: &str) {
        println!("{text}");
    }

    fn ask(&mut self, prompt: &str) -> Option<String> {
        print!("{prompt}");
        let _ = std::io::stdout().flush();
        Self::read_line()
    }

    fn ask_block(&mut self, prompt: &str) -> Option<String> {
        println!("{prompt}");
        read_block(Self::read_line)
    }
}

/// Operator fed from a fixed list of input lines.
///
/// Used to replay a recorded session from a file and to drive flows in tests.
/// Everything shown or asked is kept in [`transcript`](Self::transcript).
#[derive(Debug, Default)]
pub struct ScriptedOperator {
    input: VecDeque<String>,
    transcript: Vec<String>,
    echo: bool,
}

impl ScriptedOperator {
    pub fn new<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            input: lines.into_iter().map(Into::into).collect(),
            transcript: Vec::new(),
            echo: false,
        }
    }

    /// One input line per line of `text`.
    pub fn from_text(text: &str) -> Self {
        Self::new(text.lines())
    }

    /// Also print everything to stdout, as a console session would.
    pub fn echo(mut self, echo: bool) -> Self {
        self.echo = echo;
        self
    }

    /// Everything shown and asked so far, in order.
    pub fn transcript(&self) -> &[String] {
        &self.transcript
    }

    /// `true` if any transcript line contains `needle`.
    pub fn saw(&self, needle: &str) -> bool {
        self.transcript.iter().any(|line| line.contains(needle))
    }

    /// Input lines not consumed yet.
    pub fn remaining(&self) -> usize {
        self.input.len()
    }

    fn record(&mut self, text: &str) {
        if self.echo {
            println!("{text}");
        }
        self.transcript.push(text.to_string());
    }
}

impl Operator for ScriptedOperator {
    fn say(&mut self, text: &str) {
        self.record(text);
    }

    fn ask(&mut self, prompt: &str) -> Option<String> {
        self.record(prompt);
        let line = self.input.pop_front()?;
        if self.echo {
            println!("> {line}");
        }
        Some(line)
    }

    fn ask_block(&mut self, prompt: &str) -> Option<String> {
        self.record(prompt);
        let echo = self.echo;
        let input = &mut self.input;
        read_block(|| {
            let line = input.pop_front()?;
            if echo {
                println!("> {line}");
            }
            Some(line)
        })
    }
}

/// Collect lines until a blank one. `None` if the stream closed before any
/// line was read.
fn read_block(mut next_line: impl FnMut() -> Option<String>) -> Option<String> {
    let mut lines = Vec::new();
    loop {
        match next_line() {
            Some(line) if line.trim().is_empty() => break,
            Some(line) => lines.push(line),
            None if lines.is_empty() => return None,
            None => break,
        }
    }
    Some(lines.join("\n"))
}
