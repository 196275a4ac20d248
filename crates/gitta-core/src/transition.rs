use crate::error::{GittaError, Result};
use crate::types::SprintStatus;

/// Decide whether a sprint may move from `from` to `to`.
///
/// Total and side-effect free. Activation, archival and `gitta sprint check`
/// all go through here.
pub fn validate(from: SprintStatus, to: SprintStatus) -> Result<()> {
    use SprintStatus::*;

    let reject = |reason: &str| {
        Err(GittaError::IllegalTransition {
            from: from.to_string(),
            to: to.to_string(),
            reason: reason.to_string(),
        })
    };

    match (from, to) {
        (Archived, Archived) => Ok(()),
        (Archived, _) => reject("archived sprints are read-only"),
        (Active, Ready | Planning) => reject("archive the active sprint before repurposing it"),
        _ if from == to => Ok(()),
        (_, Archived) => Ok(()),
        (Planning | Ready, Active) => Ok(()),
        _ => reject("sprints move between ready and planning only by being recreated"),
    }
}
