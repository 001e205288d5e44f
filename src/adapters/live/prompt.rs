//! Terminal adapter for the `Prompter` port.

use std::io::{BufRead, Write};

use crate::ports::prompt::{Choice, Prompter};
use crate::resolve::Candidate;

const HELP: &str = "\
y: accept the proposed package (default)
n: propose the next candidate
<number>: pick a candidate from the list
e: type the package name yourself
i: ignore the module (it is added to the ignored modules)
q: quit without saving anything
?: display this help";

/// Prompts an operator over a line-oriented reader and writer.
pub struct TerminalPrompter<R: BufRead, W: Write> {
    reader: R,
    writer: W,
}

impl TerminalPrompter<std::io::StdinLock<'static>, std::io::Stdout> {
    /// Creates a prompter on the process's stdin and stdout.
    #[must_use]
    pub fn stdio() -> Self {
        Self::new(std::io::stdin().lock(), std::io::stdout())
    }
}

impl<R: BufRead, W: Write> TerminalPrompter<R, W> {
    /// Creates a prompter over the given reader and writer.
    pub fn new(reader: R, writer: W) -> Self {
        Self { reader, writer }
    }

    fn read_answer(&mut self) -> Result<Option<String>, std::io::Error> {
        let mut line = String::new();
        if self.reader.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim().to_string()))
    }
}

impl<R: BufRead, W: Write> Prompter for TerminalPrompter<R, W> {
    fn choose(
        &mut self,
        module: &str,
        candidates: &[Candidate],
    ) -> Result<Choice, Box<dyn std::error::Error + Send + Sync>> {
        writeln!(self.writer, "\nModule [{module}] candidates:")?;
        for (i, candidate) in candidates.iter().enumerate() {
            writeln!(
                self.writer,
                "  {}) {} ({}, confidence {})",
                i + 1,
                candidate.package,
                candidate.source,
                candidate.confidence
            )?;
        }

        let mut proposed = 0;
        loop {
            let Some(candidate) = candidates.get(proposed) else {
                return Err("no candidate to propose".into());
            };
            write!(
                self.writer,
                "Map [{module}] to [{}]? (y/n/<number>/e/i/q/?) ",
                candidate.package
            )?;
            self.writer.flush()?;

            // End of input behaves like quitting: nothing is saved.
            let Some(answer) = self.read_answer()? else {
                return Ok(Choice::Abort);
            };

            match answer.as_str() {
                "" | "y" => {
                    return Ok(if proposed == 0 {
                        Choice::AcceptTop
                    } else {
                        Choice::Pick(proposed)
                    });
                }
                "n" => {
                    proposed = (proposed + 1) % candidates.len();
                    if proposed == 0 {
                        writeln!(self.writer, "All candidates proposed, starting over.")?;
                    }
                }
                "i" => return Ok(Choice::Ignore),
                "q" => return Ok(Choice::Abort),
                "e" => {
                    write!(self.writer, "Package name: ")?;
                    self.writer.flush()?;
                    match self.read_answer()? {
                        None => return Ok(Choice::Abort),
                        Some(name) if !name.is_empty() => return Ok(Choice::Custom(name)),
                        Some(_) => writeln!(self.writer, "Empty package name.")?,
                    }
                }
                "?" => writeln!(self.writer, "{HELP}")?,
                other => match other.parse::<usize>() {
                    Ok(n) if (1..=candidates.len()).contains(&n) => {
                        return Ok(if n == 1 { Choice::AcceptTop } else { Choice::Pick(n - 1) });
                    }
                    _ => writeln!(self.writer, "Unknown answer {other:?}, type ? for help.")?,
                },
            }
        }
    }
}
