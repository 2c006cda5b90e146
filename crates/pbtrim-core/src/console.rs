use std::fmt;
use std::io;
use std::time::Duration;

/// The only response that counts as consent.
pub const AFFIRMATIVE: char = 'y';

/// One operator answer to a prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Response {
    Key(char),
    /// Input was closed before a key arrived.
    EndOfInput,
}

impl Response {
    pub fn is_affirmative(&self) -> bool {
        matches!(self, Response::Key(AFFIRMATIVE))
    }
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Response::Key(c) if c.is_control() => write!(f, "{:?}", c),
            Response::Key(c) => write!(f, "'{c}'"),
            Response::EndOfInput => f.write_str("end of input"),
        }
    }
}

/// Operator-facing I/O used by the pipeline.
///
/// Report text goes through here rather than through `tracing`: it is the
/// operator's evidence for an irreversible decision and must never be
/// filtered by log level.
pub trait Console {
    /// Print `text` followed by a newline.
    fn line(&mut self, text: &str) -> io::Result<()>;

    /// Print `text` without a newline (prompts, countdown ticks).
    fn print(&mut self, text: &str) -> io::Result<()>;

    /// Block until the operator answers.
    fn read_response(&mut self) -> io::Result<Response>;

    /// Block for `duration`. Not interruptible from the console.
    fn pause(&mut self, duration: Duration);

    /// Report a failure.
    fn error(&mut self, text: &str) -> io::Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_lowercase_y_is_affirmative() {
        assert!(Response::Key('y').is_affirmative());
        assert!(!Response::Key('Y').is_affirmative());
        assert!(!Response::Key('n').is_affirmative());
        assert!(!Response::Key('\n').is_affirmative());
        assert!(!Response::EndOfInput.is_affirmative());
    }

    #[test]
    fn display() {
        assert_eq!(Response::Key('n').to_string(), "'n'");
        assert_eq!(Response::Key('\r').to_string(), "'\\r'");
        assert_eq!(Response::EndOfInput.to_string(), "end of input");
    }
}
