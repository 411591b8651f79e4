use crate::backend::Backend;
use crate::errors::ServerError;

mod bootstrapped;
mod configuring;
mod running;

pub(super) use bootstrapped::Bootstrapped;
pub(super) use configuring::Configuring;
pub(super) use running::Running;

pub(super) enum State {
    Configuring(Configuring),
    Bootstrapped(Bootstrapped),
    Running(Running),
    Closed,
}

impl State {
    /// The backend of a bootstrapped or running server
    pub(super) fn backend(&self) -> Result<&Backend, ServerError> {
        match self {
            State::Configuring(_) => Err(ServerError::NotBootstrapped),
            State::Bootstrapped(bootstrapped) => Ok(bootstrapped.backend()),
            State::Running(running) => Ok(running.backend()),
            State::Closed => Err(ServerError::Closed),
        }
    }
}

impl From<Configuring> for State {
    fn from(configuring: Configuring) -> Self {
        State::Configuring(configuring)
    }
}

impl From<Bootstrapped> for State {
    fn from(bootstrapped: Bootstrapped) -> Self {
        State::Bootstrapped(bootstrapped)
    }
}

impl From<Running> for State {
    fn from(running: Running) -> Self {
        State::Running(running)
    }
}
