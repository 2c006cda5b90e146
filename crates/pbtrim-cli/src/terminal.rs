use std::io::{self, Write};
use std::time::Duration;

use pbtrim_core::console::{Console, Response};

use crate::prompt::read_key;

/// Operator console on the process's stdin/stdout. Errors go to stderr.
pub(crate) struct TerminalConsole;

impl Console for TerminalConsole {
    fn line(&mut self, text: &str) -> io::Result<()> {
        let mut out = io::stdout().lock();
        writeln!(out, "{text}")?;
        out.flush()
    }

    fn print(&mut self, text: &str) -> io::Result<()> {
        let mut out = io::stdout().lock();
        write!(out, "{text}")?;
        out.flush()
    }

    fn read_response(&mut self) -> io::Result<Response> {
        match read_key()? {
            Some(key) => {
                if !key.is_control() {
                    self.print(&key.to_string())?;
                }
                Ok(Response::Key(key))
            }
            None => Ok(Response::EndOfInput),
        }
    }

    fn pause(&mut self, duration: Duration) {
        std::thread::sleep(duration);
    }

    fn error(&mut self, text: &str) -> io::Result<()> {
        let mut err = io::stderr().lock();
        writeln!(err, "Error: {text}")?;
        err.flush()
    }
}
