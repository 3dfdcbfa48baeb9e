use std::io::{BufRead, Write};

use automata::{Error, Regex};
use log::debug;

const REGEX_PROMPT: &str = "Enter a regular expression ('e' to exit): ";
const INPUT_PROMPT: &str = "Enter a string to be checked ('s' to stop): ";
const EXIT_COMMAND: &str = "e";
const STOP_COMMAND: &str = "s";
const LEGEND: &str = "> — entry state, X — exit state";

/// Interactive loop: reads patterns, dumps their stages and checks strings
/// against them until `e` or the end of input.
pub struct Session<R, W> {
    input: R,
    output: W,
    quiet: bool,
}

impl<R: BufRead, W: Write> Session<R, W> {
    pub fn new(input: R, output: W, quiet: bool) -> Self {
        Self {
            input,
            output,
            quiet,
        }
    }

    pub fn run(&mut self) -> anyhow::Result<()> {
        while let Some(pattern) = self.prompt(REGEX_PROMPT)? {
            if pattern == EXIT_COMMAND {
                break;
            }

            let regex = match Regex::new(&pattern) {
                Ok(regex) => regex,
                Err(Error::InvalidSyntax(err)) => {
                    debug!("rejected pattern '{pattern}': {err:?}");
                    writeln!(self.output, "# {err}")?;
                    writeln!(self.output)?;
                    continue;
                }
                Err(err) => return Err(err.into()),
            };

            if !self.quiet {
                print_stages(&mut self.output, &regex)?;
            }
            if !self.check_strings(&regex)? {
                break;
            }
            writeln!(self.output)?;
        }
        Ok(())
    }

    /// Returns `false` when the input ended before `s`.
    fn check_strings(&mut self, regex: &Regex) -> anyhow::Result<bool> {
        while let Some(input) = self.prompt(INPUT_PROMPT)? {
            if input == STOP_COMMAND {
                return Ok(true);
            }
            writeln!(self.output, "# {}", regex.is_exact_match(&input)?)?;
        }
        Ok(false)
    }

    /// The next line without its line terminator, `None` at the end of input.
    fn prompt(&mut self, message: &str) -> anyhow::Result<Option<String>> {
        write!(self.output, "{message}")?;
        self.output.flush()?;

        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            writeln!(self.output)?;
            return Ok(None);
        }
        let trimmed = line.strip_suffix('\n').unwrap_or(&line);
        let trimmed = trimmed.strip_suffix('\r').unwrap_or(trimmed);
        Ok(Some(trimmed.to_owned()))
    }
}

pub fn print_stages<W: Write>(output: &mut W, regex: &Regex) -> anyhow::Result<()> {
    writeln!(output, "# syntax tree:")?;
    writeln!(output, "{}", regex.syntax_tree())?;

    writeln!(output, "# NFA adjacency list ({LEGEND}):")?;
    writeln!(output, "{}", regex.nfa())?;

    writeln!(output, "# DFA adjacency list ({LEGEND}):")?;
    writeln!(output, "{}", regex.dfa())?;

    writeln!(output, "# equivalence classes:")?;
    writeln!(output, "{}", regex.equivalence_classes())?;
    writeln!(output)?;

    writeln!(output, "# minimized DFA adjacency list ({LEGEND}):")?;
    writeln!(output, "{}", regex.minimized_dfa())?;
    Ok(())
}

/// Non-interactive evaluation of one pattern against `inputs`.
pub fn evaluate<W: Write>(
    output: &mut W,
    pattern: &str,
    inputs: &[String],
    quiet: bool,
) -> anyhow::Result<()> {
    let regex = Regex::new(pattern)?;
    if !quiet {
        print_stages(output, &regex)?;
    }
    for input in inputs {
        writeln!(output, "# {}", regex.is_exact_match(input)?)?;
    }
    Ok(())
}
