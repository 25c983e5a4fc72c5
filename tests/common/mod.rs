#![allow(dead_code)]

use std::sync::Arc;

use sea_orm::DatabaseConnection;
use tokio::sync::mpsc;
use uuid::Uuid;

use prodflow_api::db::{self, DbConfig};
use prodflow_api::entities::{job_card, production_plan};
use prodflow_api::events::{process_events, EventSender};
use prodflow_api::handlers::AppServices;
use prodflow_api::services::job_cards::{AdvanceStepCommand, CreateJobCardCommand};
use prodflow_api::services::plans::CreatePlanCommand;

pub struct TestContext {
    pub services: AppServices,
    pub db: Arc<DatabaseConnection>,
    pub actor: Uuid,
}

/// Fresh in-memory database per test. A single pooled connection keeps all
/// queries on the same SQLite memory instance.
pub async fn setup() -> TestContext {
    let cfg = DbConfig {
        url: "sqlite::memory:".to_string(),
        max_connections: 1,
        min_connections: 1,
        ..Default::default()
    };
    let pool = db::establish_connection_with_config(&cfg)
        .await
        .expect("db connect");
    db::run_migrations(&pool).await.expect("migrations");

    let db_arc = Arc::new(pool);
    let (tx, rx) = mpsc::channel(100);
    let sender = EventSender::new(tx);
    tokio::spawn(process_events(rx));

    TestContext {
        services: AppServices::new(db_arc.clone(), sender),
        db: db_arc,
        actor: Uuid::new_v4(),
    }
}

pub async fn create_plan(ctx: &TestContext, total_quantity: i32) -> production_plan::Model {
    ctx.services
        .plans
        .create_plan(
            CreatePlanCommand {
                source_spec_id: Uuid::new_v4(),
                target_spec_id: Uuid::new_v4(),
                total_quantity,
                urgent: false,
                notes: None,
            },
            ctx.actor,
        )
        .await
        .expect("create plan")
}

pub async fn create_card(ctx: &TestContext, plan_id: Uuid, quantity: i32) -> job_card::Model {
    ctx.services
        .job_cards
        .create_job_card(
            CreateJobCardCommand {
                plan_id,
                quantity,
                urgent: None,
            },
            ctx.actor,
        )
        .await
        .expect("create job card")
}

/// Walks a card forward one step at a time up to `target_step`.
pub async fn advance_to(ctx: &TestContext, card_id: Uuid, target_step: i32) -> job_card::Model {
    let mut card = ctx
        .services
        .job_cards
        .get_job_card(card_id)
        .await
        .expect("get job card");

    while card.current_step < target_step {
        card = ctx
            .services
            .job_cards
            .advance_step(
                AdvanceStepCommand {
                    job_card_id: card_id,
                    target_step: card.current_step + 1,
                    expected_current_step: Some(card.current_step),
                    notes: None,
                },
                ctx.actor,
            )
            .await
            .expect("advance step");
    }

    card
}
