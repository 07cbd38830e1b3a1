use std::io::{BufRead, Write};

use tracing::debug;

/// Asks the user a yes/no question. Anything but an explicit yes,
/// including a closed input stream, is a no.
pub trait Confirm {
    fn confirm(&mut self, question: &str) -> bool;
}

/// Prompts on `output` and reads one line from `input`.
pub struct Prompt<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> Prompt<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }
}

impl<R: BufRead, W: Write> Confirm for Prompt<R, W> {
    fn confirm(&mut self, question: &str) -> bool {
        if write!(self.output, "{question} (yes/no) ")
            .and_then(|_| self.output.flush())
            .is_err()
        {
            return false;
        }
        let mut answer = String::new();
        match self.input.read_line(&mut answer) {
            Ok(0) | Err(_) => {
                debug!("no answer on input, treating as decline");
                false
            }
            Ok(_) => is_yes(&answer),
        }
    }
}

fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "ye" | "yes")
}
