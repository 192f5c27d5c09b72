mod pipeline;
mod planner;
mod renumber;
mod rules;
mod visit;

use thiserror::Error;

use spliceasm_codec::{DecodeError, EncodeError, PlanViolation};
use spliceasm_nodes::{IndexSpace, SectionKind};

pub use pipeline::{transform, Pipeline, Stage};
pub use rules::{NewEntry, Rules};
pub use visit::Visit;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EditError {
    /// A removed entity is still referenced by something that survives the edit.
    #[error("{space} index {index} was removed but is still referenced at byte {at}")]
    DanglingReference {
        space: IndexSpace,
        index: u32,
        at: usize,
    },

    #[error("cannot renumber the {space} index space: the {section} section was not decoded")]
    OpaqueReferences {
        space: IndexSpace,
        section: SectionKind,
    },

    #[error("invalid edit plan: {0}")]
    InvalidEditPlan(#[from] PlanViolation),

    #[error("cannot {action} in the {stage} stage")]
    OutOfOrder { stage: Stage, action: &'static str },

    #[error(transparent)]
    Decode(#[from] DecodeError),
}

impl From<EncodeError> for EditError {
    fn from(err: EncodeError) -> Self {
        match err {
            EncodeError::InvalidEditPlan(violation) => EditError::InvalidEditPlan(violation),
            EncodeError::Decode(err) => EditError::Decode(err),
        }
    }
}

#[cfg(test)]
mod test_utils;

#[cfg(test)]
mod scenarios;
