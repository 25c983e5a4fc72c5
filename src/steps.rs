//! Static catalog of the production pipeline steps.
//!
//! The pipeline is a fixed, linearly ordered sequence. Transition validation
//! only cares about the integer ordering; names and descriptions exist for
//! display and can change without touching the state machine.

use serde::Serialize;

use crate::errors::ServiceError;

/// One stage in the fixed manufacturing pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Step {
    pub id: i32,
    pub name: &'static str,
    pub description: &'static str,
}

/// Step at which produced quantity is inspected and split accepted/rejected.
pub const QA_GATE_STEP: i32 = 10;

/// Last step of the pipeline; reaching it completes a job card.
pub const FINAL_STEP: i32 = 11;

/// First step; every job card (including rework spawns) starts here.
pub const FIRST_STEP: i32 = 1;

const STEPS: &[Step] = &[
    Step {
        id: 1,
        name: "Material Issue",
        description: "Source material issued against the plan's material request",
    },
    Step {
        id: 2,
        name: "Melting",
        description: "Source alloy melted down for conversion",
    },
    Step {
        id: 3,
        name: "Casting",
        description: "Molten material cast into blanks",
    },
    Step {
        id: 4,
        name: "Rolling",
        description: "Blanks rolled to target gauge",
    },
    Step {
        id: 5,
        name: "Cutting",
        description: "Rolled stock cut to piece dimensions",
    },
    Step {
        id: 6,
        name: "Forming",
        description: "Pieces formed to target shape",
    },
    Step {
        id: 7,
        name: "Assembly",
        description: "Formed parts assembled into units",
    },
    Step {
        id: 8,
        name: "Soldering",
        description: "Joints soldered and cleaned",
    },
    Step {
        id: 9,
        name: "Polishing",
        description: "Surface finishing and polish",
    },
    Step {
        id: 10,
        name: "Quality Inspection",
        description: "QA gate: units inspected and split into accepted/rejected",
    },
    Step {
        id: 11,
        name: "Finishing & Handover",
        description: "Final packing and handover to stock",
    },
];

/// Returns the full ordered step catalog.
pub fn list_steps() -> &'static [Step] {
    STEPS
}

/// Looks up a step by id, failing with `UnknownStep` for ids outside the catalog.
pub fn get_step(step_id: i32) -> Result<&'static Step, ServiceError> {
    STEPS
        .iter()
        .find(|s| s.id == step_id)
        .ok_or(ServiceError::UnknownStep(step_id))
}

/// True when the id names a step in the catalog.
pub fn is_known_step(step_id: i32) -> bool {
    step_id >= FIRST_STEP && step_id <= FINAL_STEP
}
