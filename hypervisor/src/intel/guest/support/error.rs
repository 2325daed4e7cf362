use kernelutils::HypervisorError;

#[derive(thiserror_no_std::Error, Debug, Copy, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("a session needs at least one processor")]
    NoProcessors,

    #[error("`{requested}` processors requested, at most `{max}` are supported")]
    TooManyProcessors { requested: usize, max: usize },

    #[error("no state exists for core `{core_id}`")]
    UnknownCore { core_id: usize },

    #[error("the session is not running")]
    NotRunning,

    #[error(transparent)]
    Hardware(#[from] HypervisorError),
}
