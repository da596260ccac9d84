use crate::engine::gesture::Outcome;
use crate::engine::state::SessionEvent;

/// Logical commands of the control surface. Each is ignored when invalid in the current phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Start,
    Accept,
    Reject,
    Reset,
}

impl Command {
    /// Map a keyboard key name to a command.
    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "ArrowRight" | "l" | "L" => Some(Command::Accept),
            "ArrowLeft" | "d" | "D" => Some(Command::Reject),
            "Enter" | " " => Some(Command::Start),
            _ => None,
        }
    }

    pub fn to_event(self) -> SessionEvent {
        match self {
            Command::Start => SessionEvent::Start,
            Command::Accept => SessionEvent::Decide(Outcome::Accept),
            Command::Reject => SessionEvent::Decide(Outcome::Reject),
            Command::Reset => SessionEvent::Reset,
        }
    }
}
