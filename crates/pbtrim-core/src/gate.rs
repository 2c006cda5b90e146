use std::time::Duration;

use tracing::info;

use pbtrim_types::error::Result;

use crate::console::{Console, Response};

/// Number of one-second steps in the final abort window.
pub const COUNTDOWN_STEPS: u32 = 5;
pub const COUNTDOWN_STEP: Duration = Duration::from_secs(1);

const FIRST_PROMPT: &str = "[y/n]? ";
const SECOND_PROMPT: &str = "⛔️ NO WARRANTY: THIS WILL CLEAR TRAILER PAGE(S), RESULTING IN POTENTIAL DATA LOSS. \
     Are you REALLY sure? Did you take a backup/snapshot?? [y/n] ";

/// Which confirmation a response answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    First,
    Second,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateState {
    AwaitingFirstConfirm,
    AwaitingSecondConfirm,
    /// Both confirmations given; the countdown runs without accepting input.
    AwaitingCountdown,
    Approved,
    Aborted { stage: Stage, response: Response },
}

impl GateState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, GateState::Approved | GateState::Aborted { .. })
    }
}

/// Proof that the gate reached `Approved`. Only the gate can create one, and
/// the executor consumes it.
#[derive(Debug)]
pub struct Approval {
    _private: (),
}

impl Approval {
    #[cfg(test)]
    pub(crate) fn for_tests() -> Self {
        Approval { _private: () }
    }
}

#[derive(Debug)]
pub enum GateOutcome {
    Approved(Approval),
    Aborted { stage: Stage, response: Response },
}

/// Two explicit confirmations followed by a fixed, uncancellable countdown.
///
/// State is per blob; a new gate is built for every plan.
#[derive(Debug)]
pub struct ConfirmationGate {
    state: GateState,
}

impl Default for ConfirmationGate {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfirmationGate {
    pub fn new() -> Self {
        Self {
            state: GateState::AwaitingFirstConfirm,
        }
    }

    pub fn state(&self) -> GateState {
        self.state
    }

    /// Perform one transition. `report` is printed before the first prompt.
    /// Terminal states do not change.
    pub fn step(&mut self, console: &mut dyn Console, report: &[String]) -> Result<GateState> {
        self.state = match self.state {
            GateState::AwaitingFirstConfirm => {
                for line in report {
                    console.line(line)?;
                }
                match ask(console, FIRST_PROMPT)? {
                    r if r.is_affirmative() => GateState::AwaitingSecondConfirm,
                    response => GateState::Aborted {
                        stage: Stage::First,
                        response,
                    },
                }
            }
            GateState::AwaitingSecondConfirm => match ask(console, SECOND_PROMPT)? {
                r if r.is_affirmative() => GateState::AwaitingCountdown,
                response => GateState::Aborted {
                    stage: Stage::Second,
                    response,
                },
            },
            GateState::AwaitingCountdown => {
                console.print("Last chance, resizing in ")?;
                for remaining in (1..=COUNTDOWN_STEPS).rev() {
                    console.print(&format!("{remaining}.. "))?;
                    console.pause(COUNTDOWN_STEP);
                }
                console.line("")?;
                GateState::Approved
            }
            terminal => terminal,
        };
        Ok(self.state)
    }

    /// Drive the gate to a terminal state.
    pub fn run(mut self, console: &mut dyn Console, report: &[String]) -> Result<GateOutcome> {
        while !self.state.is_terminal() {
            self.step(console, report)?;
        }
        match self.state {
            GateState::Aborted { stage, response } => {
                info!(?stage, %response, "operator declined");
                Ok(GateOutcome::Aborted { stage, response })
            }
            _ => {
                info!("operator approved");
                Ok(GateOutcome::Approved(Approval { _private: () }))
            }
        }
    }
}

fn ask(console: &mut dyn Console, prompt: &str) -> Result<Response> {
    console.print(prompt)?;
    let response = console.read_response()?;
    console.line("")?;
    Ok(response)
}
