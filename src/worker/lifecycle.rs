use strum::Display;

/// States a worker version moves through, from first load to retirement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum WorkerState {
    Parsed,
    Installing,
    /// Installed and waiting to be activated.
    Installed,
    Activating,
    Activated,
    Redundant,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum Transition {
    InstallStarted,
    InstallFinished,
    InstallFailed,
    ActivateStarted,
    ActivateFinished,
    Replaced,
}

impl WorkerState {
    /// State reached by applying `transition`, or `None` when the transition
    /// is not allowed from this state.
    pub fn next(self, transition: Transition) -> Option<WorkerState> {
        use Transition::*;
        use WorkerState::*;

        match (self, transition) {
            (Parsed, InstallStarted) => Some(Installing),
            (Installing, InstallFinished) => Some(Installed),
            (Installing, InstallFailed) => Some(Redundant),
            (Installed, ActivateStarted) => Some(Activating),
            (Activating, ActivateFinished) => Some(Activated),
            (Installed | Activated, Replaced) => Some(Redundant),
            _ => None,
        }
    }

    pub fn is_active(&self) -> bool {
        *self == WorkerState::Activated
    }
}
