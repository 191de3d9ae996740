//! Operator interaction module.
//!
//! Prompts go through the [`Prompter`] trait so the builder can be driven
//! by a scripted implementation in tests. The production implementation
//! talks to `/dev/tty` directly and keeps working when stdin or stdout are
//! redirected.

use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};

use crate::error::{Error, IoResultExt, Result};

/// Synchronous operator prompts.
pub trait Prompter {
    /// Asks a yes/no question. Only `y`/`yes` (case-insensitive) is true.
    fn confirm(&mut self, prompt: &str) -> Result<bool>;

    /// Asks for a free-text reply, returned trimmed.
    fn ask(&mut self, prompt: &str) -> Result<String>;
}

/// Prompter bound to the controlling terminal.
pub struct TtyPrompter {
    input: BufReader<File>,
    output: File,
}

impl TtyPrompter {
    /// Opens `/dev/tty` for reading and writing.
    pub fn open() -> Result<Self> {
        let input = File::open("/dev/tty").map_err(|e| Error::TerminalUnavailable {
            message: e.to_string(),
        })?;
        let output = OpenOptions::new().write(true).open("/dev/tty").map_err(|e| {
            Error::TerminalUnavailable {
                message: e.to_string(),
            }
        })?;

        Ok(Self {
            input: BufReader::new(input),
            output,
        })
    }

    fn read_reply(&mut self, prompt: &str) -> Result<String> {
        write!(self.output, "{prompt}").prompt_context()?;
        self.output.flush().prompt_context()?;

        let mut line = String::new();
        let n = self.input.read_line(&mut line).prompt_context()?;
        if n == 0 {
            // EOF on the terminal; treating it as an empty reply would
            // loop forever in re-prompting callers.
            return Err(Error::Prompt {
                source: std::io::Error::new(
                    std::io::ErrorKind::UnexpectedEof,
                    "end of input on terminal",
                ),
            });
        }

        Ok(line.trim().to_string())
    }
}

impl Prompter for TtyPrompter {
    fn confirm(&mut self, prompt: &str) -> Result<bool> {
        let reply = self.read_reply(&format!("{prompt} [y/N]: "))?;
        Ok(matches!(reply.to_lowercase().as_str(), "y" | "yes"))
    }

    fn ask(&mut self, prompt: &str) -> Result<String> {
        self.read_reply(&format!("{prompt}: "))
    }
}
