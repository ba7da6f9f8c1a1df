//! Human-in-the-loop approval of database changes.
//!
//! Every addition is shown to the user before it is committed. The
//! [`Confirm`] trait lets callers decide how: [`TerminalPrompt`] asks on the
//! terminal, [`FixedAnswer`] answers without asking (`--yes`, tests).

use std::io::{self, BufRead, Write};

use crate::Result;

/// Decides whether a previewed entry may be committed.
pub trait Confirm {
    /// Shows `preview` and blocks until an answer is available.
    fn confirm(&mut self, preview: &str) -> Result<bool>;
}

/// Asks `[y/n]` on a reader/writer pair, stdin/stdout by default.
///
/// Only `y` and `yes` (any case) approve; anything else, including end of
/// input, declines.
pub struct TerminalPrompt<R, W> {
    input: R,
    output: W,
}

impl TerminalPrompt<io::StdinLock<'static>, io::Stdout> {
    pub fn stdio() -> Self {
        Self::new(io::stdin().lock(), io::stdout())
    }
}

impl<R: BufRead, W: Write> TerminalPrompt<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }
}

impl<R: BufRead, W: Write> Confirm for TerminalPrompt<R, W> {
    fn confirm(&mut self, preview: &str) -> Result<bool> {
        write!(self.output, "Add bib entry below?\n{preview}\n[y/n] ")?;
        self.output.flush()?;

        let mut answer = String::new();
        self.input.read_line(&mut answer)?;
        Ok(matches!(
            answer.trim().to_lowercase().as_str(),
            "y" | "yes"
        ))
    }
}

/// Answers every confirmation the same way and remembers what it was shown.
#[derive(Debug, Clone, Default)]
pub struct FixedAnswer {
    answer: bool,
    previews: Vec<String>,
}

impl FixedAnswer {
    pub fn approve() -> Self {
        Self {
            answer: true,
            previews: Vec::new(),
        }
    }

    pub fn decline() -> Self {
        Self {
            answer: false,
            previews: Vec::new(),
        }
    }

    /// Previews shown so far, oldest first.
    pub fn previews(&self) -> &[String] {
        &self.previews
    }
}

impl Confirm for FixedAnswer {
    fn confirm(&mut self, preview: &str) -> Result<bool> {
        self.previews.push(preview.to_string());
        Ok(self.answer)
    }
}
