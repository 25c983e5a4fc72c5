//! Domain events emitted by the workflow engine.
//!
//! The engine emits but does not deliver: `process_events` is the seam where
//! a notification collaborator would attach. Each event carries the full
//! updated entity so subscribers never need a read-back.

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{error, info};
use uuid::Uuid;

use crate::entities::{job_card, material_request, production_plan, qa_report, rejection};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    PlanCreated {
        plan: production_plan::Model,
    },
    PlanUpdated {
        plan: production_plan::Model,
    },
    JobCardCreated {
        job_card: job_card::Model,
    },
    JobCardAdvanced {
        job_card: job_card::Model,
        from_step: i32,
        to_step: i32,
    },
    JobCardOnHold {
        job_card: job_card::Model,
        reason: Option<String>,
    },
    JobCardResumed {
        job_card: job_card::Model,
    },
    InspectionSubmitted {
        report: qa_report::Model,
    },
    RejectionResolved {
        rejection: rejection::Model,
    },
    MaterialRequested {
        request: material_request::Model,
    },
    MaterialFulfilled {
        request: material_request::Model,
    },
}

impl Event {
    /// Primary entity id the event is about, for log correlation.
    pub fn subject_id(&self) -> Uuid {
        match self {
            Event::PlanCreated { plan } | Event::PlanUpdated { plan } => plan.id,
            Event::JobCardCreated { job_card }
            | Event::JobCardAdvanced { job_card, .. }
            | Event::JobCardOnHold { job_card, .. }
            | Event::JobCardResumed { job_card } => job_card.id,
            Event::InspectionSubmitted { report } => report.id,
            Event::RejectionResolved { rejection } => rejection.id,
            Event::MaterialRequested { request } | Event::MaterialFulfilled { request } => {
                request.id
            }
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Event::PlanCreated { .. } => "PlanCreated",
            Event::PlanUpdated { .. } => "PlanUpdated",
            Event::JobCardCreated { .. } => "JobCardCreated",
            Event::JobCardAdvanced { .. } => "JobCardAdvanced",
            Event::JobCardOnHold { .. } => "JobCardOnHold",
            Event::JobCardResumed { .. } => "JobCardResumed",
            Event::InspectionSubmitted { .. } => "InspectionSubmitted",
            Event::RejectionResolved { .. } => "RejectionResolved",
            Event::MaterialRequested { .. } => "MaterialRequested",
            Event::MaterialFulfilled { .. } => "MaterialFulfilled",
        }
    }
}

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Sends an event, returning an error if the channel is closed or full.
    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("Failed to send event: {}", e))
    }

    /// Sends an event, logging on failure. Event delivery is best-effort and
    /// must never fail the workflow write that produced it.
    pub async fn send_or_log(&self, event: Event) {
        let name = event.name();
        let subject = event.subject_id();
        if let Err(e) = self.send(event).await {
            error!(event = name, subject = %subject, "failed to emit event: {}", e);
        }
    }
}

/// Consumes the event stream. Delivery to external systems happens behind
/// this seam; the default processor just records the stream.
pub async fn process_events(mut rx: mpsc::Receiver<Event>) {
    info!("Starting event processing loop");

    while let Some(event) = rx.recv().await {
        info!(event = event.name(), subject = %event.subject_id(), "domain event");
        metrics::counter!("prodflow.events.emitted", 1, "event" => event.name());
    }

    info!("Event channel closed; processor exiting");
}
