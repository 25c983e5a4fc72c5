mod common;

use assert_matches::assert_matches;
use uuid::Uuid;

use prodflow_api::entities::job_card::JobCardStatus;
use prodflow_api::errors::ServiceError;
use prodflow_api::services::job_cards::{AdvanceStepCommand, CreateJobCardCommand};
use prodflow_api::steps::{FINAL_STEP, QA_GATE_STEP};

#[tokio::test]
async fn card_walks_pipeline_to_qa_gate() {
    let ctx = common::setup().await;
    let plan = common::create_plan(&ctx, 100).await;
    let card = common::create_card(&ctx, plan.id, 100).await;

    assert_eq!(card.current_step, 1);
    assert_eq!(card.status, JobCardStatus::Pending);
    assert_eq!(card.quantity, 100);

    let card = common::advance_to(&ctx, card.id, 9).await;
    assert_eq!(card.status, JobCardStatus::InProgress);

    let card = common::advance_to(&ctx, card.id, QA_GATE_STEP).await;
    assert_eq!(card.status, JobCardStatus::QaPending);
    assert_eq!(card.current_step, QA_GATE_STEP);

    // Transition log is gap-free: one entry per step, starting at creation.
    let history = ctx.services.job_cards.history(card.id).await.unwrap();
    assert_eq!(history.len(), QA_GATE_STEP as usize);
    assert_eq!(history[0].from_step, None);
    assert_eq!(history[0].to_step, 1);
    for (i, t) in history.iter().enumerate().skip(1) {
        assert_eq!(t.from_step, Some(i as i32));
        assert_eq!(t.to_step, i as i32 + 1);
    }
}

#[tokio::test]
async fn backward_and_repeat_moves_are_rejected() {
    let ctx = common::setup().await;
    let plan = common::create_plan(&ctx, 10).await;
    let card = common::create_card(&ctx, plan.id, 10).await;
    common::advance_to(&ctx, card.id, 5).await;

    for target in [3, 5] {
        let err = ctx
            .services
            .job_cards
            .advance_step(
                AdvanceStepCommand {
                    job_card_id: card.id,
                    target_step: target,
                    expected_current_step: None,
                    notes: None,
                },
                ctx.actor,
            )
            .await
            .unwrap_err();
        assert_matches!(err, ServiceError::InvalidTransition(_));
    }
}

#[tokio::test]
async fn qa_gate_cannot_be_skipped() {
    let ctx = common::setup().await;
    let plan = common::create_plan(&ctx, 10).await;
    let card = common::create_card(&ctx, plan.id, 10).await;
    common::advance_to(&ctx, card.id, 9).await;

    let err = ctx
        .services
        .job_cards
        .advance_step(
            AdvanceStepCommand {
                job_card_id: card.id,
                target_step: FINAL_STEP,
                expected_current_step: None,
                notes: None,
            },
            ctx.actor,
        )
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::InvalidTransition(_));
}

#[tokio::test]
async fn gate_blocks_exit_without_inspection() {
    let ctx = common::setup().await;
    let plan = common::create_plan(&ctx, 10).await;
    let card = common::create_card(&ctx, plan.id, 10).await;
    common::advance_to(&ctx, card.id, QA_GATE_STEP).await;

    let err = ctx
        .services
        .job_cards
        .advance_step(
            AdvanceStepCommand {
                job_card_id: card.id,
                target_step: FINAL_STEP,
                expected_current_step: None,
                notes: None,
            },
            ctx.actor,
        )
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::InvalidTransition(_));
}

#[tokio::test]
async fn unknown_target_step_is_rejected() {
    let ctx = common::setup().await;
    let plan = common::create_plan(&ctx, 10).await;
    let card = common::create_card(&ctx, plan.id, 10).await;

    let err = ctx
        .services
        .job_cards
        .advance_step(
            AdvanceStepCommand {
                job_card_id: card.id,
                target_step: 12,
                expected_current_step: None,
                notes: None,
            },
            ctx.actor,
        )
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::UnknownStep(12));
}

#[tokio::test]
async fn stale_observation_loses_deterministically() {
    let ctx = common::setup().await;
    let plan = common::create_plan(&ctx, 10).await;
    let card = common::create_card(&ctx, plan.id, 10).await;

    // First caller advances 1 -> 2.
    ctx.services
        .job_cards
        .advance_step(
            AdvanceStepCommand {
                job_card_id: card.id,
                target_step: 2,
                expected_current_step: Some(1),
                notes: None,
            },
            ctx.actor,
        )
        .await
        .expect("first advance");

    // Second caller still believes the card is at step 1.
    let err = ctx
        .services
        .job_cards
        .advance_step(
            AdvanceStepCommand {
                job_card_id: card.id,
                target_step: 2,
                expected_current_step: Some(1),
                notes: None,
            },
            ctx.actor,
        )
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::ConcurrentModification(id) if id == card.id);
    assert!(err.is_retryable());

    // Exactly one transition beyond the initial entry was recorded.
    let history = ctx.services.job_cards.history(card.id).await.unwrap();
    assert_eq!(history.len(), 2);
}

#[tokio::test]
async fn hold_parks_and_resume_restores_position() {
    let ctx = common::setup().await;
    let plan = common::create_plan(&ctx, 10).await;
    let card = common::create_card(&ctx, plan.id, 10).await;
    common::advance_to(&ctx, card.id, 4).await;

    let held = ctx
        .services
        .job_cards
        .hold_job_card(card.id, Some("tooling changeover".into()), ctx.actor)
        .await
        .unwrap();
    assert_eq!(held.status, JobCardStatus::OnHold);

    // A held card refuses to advance.
    let err = ctx
        .services
        .job_cards
        .advance_step(
            AdvanceStepCommand {
                job_card_id: card.id,
                target_step: 5,
                expected_current_step: None,
                notes: None,
            },
            ctx.actor,
        )
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::InvalidTransition(_));

    let resumed = ctx
        .services
        .job_cards
        .resume_job_card(card.id, ctx.actor)
        .await
        .unwrap();
    assert_eq!(resumed.status, JobCardStatus::InProgress);
    assert_eq!(resumed.current_step, 4);

    // Resuming a card that is not held is an error.
    let err = ctx
        .services
        .job_cards
        .resume_job_card(card.id, ctx.actor)
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::InvalidTransition(_));
}

#[tokio::test]
async fn dwell_time_requires_entry_and_exit() {
    let ctx = common::setup().await;
    let plan = common::create_plan(&ctx, 10).await;
    let card = common::create_card(&ctx, plan.id, 10).await;
    common::advance_to(&ctx, card.id, 3).await;

    // Step 2 was entered and left.
    let dwell = ctx
        .services
        .job_cards
        .dwell_time(card.id, 2)
        .await
        .unwrap();
    assert!(dwell.is_some());
    assert!(dwell.unwrap().num_milliseconds() >= 0);

    // Step 3 was entered but not left yet.
    assert!(ctx
        .services
        .job_cards
        .dwell_time(card.id, 3)
        .await
        .unwrap()
        .is_none());

    // Step 7 was never reached.
    assert!(ctx
        .services
        .job_cards
        .dwell_time(card.id, 7)
        .await
        .unwrap()
        .is_none());

    assert_matches!(
        ctx.services.job_cards.dwell_time(card.id, 0).await,
        Err(ServiceError::UnknownStep(0))
    );
}

#[tokio::test]
async fn capacity_is_enforced_across_cards() {
    let ctx = common::setup().await;
    let plan = common::create_plan(&ctx, 100).await;

    common::create_card(&ctx, plan.id, 60).await;

    let err = ctx
        .services
        .job_cards
        .create_job_card(
            CreateJobCardCommand {
                plan_id: plan.id,
                quantity: 50,
                urgent: None,
            },
            ctx.actor,
        )
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::CapacityExceeded(_));

    // The remaining 40 units still fit.
    let second = common::create_card(&ctx, plan.id, 40).await;
    assert_eq!(second.quantity, 40);
}

#[tokio::test]
async fn card_creation_requires_existing_plan() {
    let ctx = common::setup().await;

    let err = ctx
        .services
        .job_cards
        .create_job_card(
            CreateJobCardCommand {
                plan_id: Uuid::new_v4(),
                quantity: 5,
                urgent: None,
            },
            ctx.actor,
        )
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::NotFound(_));
}

#[tokio::test]
async fn history_order_is_stable_when_timestamps_tie() {
    use prodflow_api::entities::step_transition;
    use sea_orm::{ActiveModelTrait, ActiveValue::Set};

    let ctx = common::setup().await;
    let plan = common::create_plan(&ctx, 10).await;
    let card = common::create_card(&ctx, plan.id, 10).await;

    // Same-tick entries, inserted out of step order.
    let tick = chrono::Utc::now();
    for (from, to) in [(Some(3), 4), (Some(1), 2), (Some(2), 3)] {
        step_transition::ActiveModel {
            id: Set(Uuid::new_v4()),
            job_card_id: Set(card.id),
            from_step: Set(from),
            to_step: Set(to),
            actor_id: Set(ctx.actor),
            notes: Set(None),
            created_at: Set(tick),
        }
        .insert(&*ctx.db)
        .await
        .unwrap();
    }

    let history = ctx.services.job_cards.history(card.id).await.unwrap();
    let steps: Vec<i32> = history.iter().map(|t| t.to_step).collect();
    assert_eq!(steps, vec![1, 2, 3, 4]);
}
