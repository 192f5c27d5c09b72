use std::fmt::{Display, Formatter};

use spliceasm_codec::{reencode, validate_plan};
use spliceasm_nodes::{EditPlan, Module};

use crate::{EditError, Rules};

/// Where a module is on its way from input bytes to edited output. Stages only move forward;
/// a failure is terminal.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Stage {
    Decoded,
    RulesApplied,
    PlanValidated,
    Reencoded,
    Verified,
    Failed,
}

impl Display for Stage {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Stage::Decoded => "decoded",
            Stage::RulesApplied => "rules-applied",
            Stage::PlanValidated => "plan-validated",
            Stage::Reencoded => "reencoded",
            Stage::Verified => "verified",
            Stage::Failed => "failed",
        })
    }
}

/// Drives one (module, rules) case through apply, validate and re-encode. Verification happens
/// outside this crate and reports back through [`Pipeline::verified`].
#[derive(Debug)]
pub struct Pipeline<'m> {
    original: &'m [u8],
    module: &'m Module,
    plan: EditPlan,
    output: Vec<u8>,
    stage: Stage,
}

impl<'m> Pipeline<'m> {
    /// `module` must have been decoded from `original`.
    pub fn new(original: &'m [u8], module: &'m Module) -> Self {
        Self {
            original,
            module,
            plan: EditPlan::new(),
            output: Vec::new(),
            stage: Stage::Decoded,
        }
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn module(&self) -> &Module {
        self.module
    }

    pub fn plan(&self) -> &EditPlan {
        &self.plan
    }

    fn advance(&mut self, from: Stage, action: &'static str) -> Result<(), EditError> {
        if self.stage != from {
            return Err(EditError::OutOfOrder {
                stage: self.stage,
                action,
            });
        }
        Ok(())
    }

    fn settle<T>(&mut self, result: Result<T, EditError>, next: Stage) -> Result<T, EditError> {
        self.stage = if result.is_ok() { next } else { Stage::Failed };
        result
    }

    pub fn apply(&mut self, rules: &mut Rules<'_>) -> Result<&EditPlan, EditError> {
        self.advance(Stage::Decoded, "apply rules")?;
        let result = rules.apply(self.module);
        self.plan = self.settle(result, Stage::RulesApplied)?;
        Ok(&self.plan)
    }

    pub fn validate(&mut self) -> Result<(), EditError> {
        self.advance(Stage::RulesApplied, "validate the plan")?;
        let result = validate_plan(self.original, &self.module.metadata(), &self.plan)
            .map_err(EditError::from);
        self.settle(result, Stage::PlanValidated)
    }

    pub fn reencode(&mut self) -> Result<&[u8], EditError> {
        self.advance(Stage::PlanValidated, "re-encode")?;
        let result =
            reencode(self.original, &self.module.metadata(), &self.plan).map_err(EditError::from);
        self.output = self.settle(result, Stage::Reencoded)?;
        Ok(&self.output)
    }

    /// The edited bytes, once re-encoding has succeeded.
    pub fn output(&self) -> Option<&[u8]> {
        matches!(self.stage, Stage::Reencoded | Stage::Verified).then_some(&self.output[..])
    }

    /// Records the outcome of verifying [`Pipeline::output`]. A rejected output fails the
    /// pipeline.
    pub fn verified(&mut self, passed: bool) -> Result<(), EditError> {
        self.advance(Stage::Reencoded, "record verification")?;
        self.stage = if passed { Stage::Verified } else { Stage::Failed };
        Ok(())
    }

    pub fn into_output(self) -> Option<Vec<u8>> {
        matches!(self.stage, Stage::Reencoded | Stage::Verified).then_some(self.output)
    }
}

/// Applies `rules` to `module` (decoded from `original`) and returns the edited bytes.
pub fn transform(
    original: &[u8],
    module: &Module,
    rules: &mut Rules<'_>,
) -> Result<Vec<u8>, EditError> {
    let mut pipeline = Pipeline::new(original, module);
    pipeline.apply(rules)?;
    pipeline.validate()?;
    pipeline.reencode()?;
    Ok(pipeline.output)
}
