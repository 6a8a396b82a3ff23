use std::fmt::Display;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobPhase {
    // Built and validated, nothing dispatched yet.
    Created,
    // Map tasks are being dispatched to workers concurrently.
    MapPhase,
    // Waiting for every dispatched map invocation to finish.
    Barrier,
    // Collapsing intermediate values, one key at a time.
    ReducePhase,
    Completed,
    // Reached from the map phase (worker error) or the reduce phase (reducer error).
    Failed,
}

impl JobPhase {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobPhase::Completed | JobPhase::Failed)
    }
}

impl Display for JobPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            JobPhase::Created => "created",
            JobPhase::MapPhase => "map",
            JobPhase::Barrier => "barrier",
            JobPhase::ReducePhase => "reduce",
            JobPhase::Completed => "completed",
            JobPhase::Failed => "failed",
        };
        write!(f, "{}", name)
    }
}
