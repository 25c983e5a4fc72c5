mod common;

use assert_matches::assert_matches;

use prodflow_api::entities::job_card::JobCardStatus;
use prodflow_api::entities::rejection::{ResolutionAction, Severity};
use prodflow_api::errors::ServiceError;
use prodflow_api::services::job_cards::AdvanceStepCommand;
use prodflow_api::services::qa::SubmitInspectionCommand;
use prodflow_api::steps::{FINAL_STEP, QA_GATE_STEP};

fn inspection(
    job_card_id: uuid::Uuid,
    accepted: i32,
    rejected: i32,
) -> SubmitInspectionCommand {
    SubmitInspectionCommand {
        job_card_id,
        accepted_quantity: accepted,
        rejected_quantity: rejected,
        quality_score: 90,
        reason: (rejected > 0).then(|| "surface defects".to_string()),
        notes: None,
    }
}

#[tokio::test]
async fn clean_pass_completes_the_card() {
    let ctx = common::setup().await;
    let plan = common::create_plan(&ctx, 100).await;
    let card = common::create_card(&ctx, plan.id, 100).await;
    common::advance_to(&ctx, card.id, QA_GATE_STEP).await;

    let report = ctx
        .services
        .qa
        .submit_inspection(inspection(card.id, 100, 0), ctx.actor)
        .await
        .unwrap();
    assert_eq!(report.accepted_quantity, 100);
    assert_eq!(report.rejected_quantity, 0);

    // A clean pass moves the card through the gate in the same transaction.
    let card = ctx.services.job_cards.get_job_card(card.id).await.unwrap();
    assert_eq!(card.status, JobCardStatus::Completed);
    assert_eq!(card.current_step, FINAL_STEP);
    assert_eq!(card.accepted_quantity, Some(100));

    let history = ctx.services.job_cards.history(card.id).await.unwrap();
    let last = history.last().unwrap();
    assert_eq!(last.from_step, Some(QA_GATE_STEP));
    assert_eq!(last.to_step, FINAL_STEP);
}

#[tokio::test]
async fn inspection_requires_card_at_the_gate() {
    let ctx = common::setup().await;
    let plan = common::create_plan(&ctx, 10).await;
    let card = common::create_card(&ctx, plan.id, 10).await;
    common::advance_to(&ctx, card.id, 5).await;

    let err = ctx
        .services
        .qa
        .submit_inspection(inspection(card.id, 10, 0), ctx.actor)
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::InvalidInspection(_));
}

#[tokio::test]
async fn split_must_cover_the_full_lot() {
    let ctx = common::setup().await;
    let plan = common::create_plan(&ctx, 10).await;
    let card = common::create_card(&ctx, plan.id, 10).await;
    common::advance_to(&ctx, card.id, QA_GATE_STEP).await;

    let err = ctx
        .services
        .qa
        .submit_inspection(inspection(card.id, 6, 3), ctx.actor)
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::InvalidInspection(_));

    // Rejecting without a reason is also invalid.
    let mut cmd = inspection(card.id, 6, 4);
    cmd.reason = None;
    let err = ctx
        .services
        .qa
        .submit_inspection(cmd, ctx.actor)
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::InvalidInspection(_));
}

#[tokio::test]
async fn second_inspection_is_rejected() {
    let ctx = common::setup().await;
    let plan = common::create_plan(&ctx, 10).await;
    let card = common::create_card(&ctx, plan.id, 10).await;
    common::advance_to(&ctx, card.id, QA_GATE_STEP).await;

    ctx.services
        .qa
        .submit_inspection(inspection(card.id, 8, 2), ctx.actor)
        .await
        .unwrap();

    let err = ctx
        .services
        .qa
        .submit_inspection(inspection(card.id, 10, 0), ctx.actor)
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::AlreadyInspected(id) if id == card.id);
}

#[tokio::test]
async fn rejection_parks_card_until_resolved_by_rework() {
    let ctx = common::setup().await;
    let plan = common::create_plan(&ctx, 100).await;
    let card = common::create_card(&ctx, plan.id, 100).await;
    common::advance_to(&ctx, card.id, QA_GATE_STEP).await;

    ctx.services
        .qa
        .submit_inspection(inspection(card.id, 80, 20), ctx.actor)
        .await
        .unwrap();

    // Card holds at the gate with the split recorded.
    let card = ctx.services.job_cards.get_job_card(card.id).await.unwrap();
    assert_eq!(card.status, JobCardStatus::QaPending);
    assert_eq!(card.current_step, QA_GATE_STEP);
    assert_eq!(card.accepted_quantity, Some(80));
    assert_eq!(card.rejected_quantity, Some(20));

    let open = ctx
        .services
        .qa
        .list_open_rejections_for_plan(plan.id)
        .await
        .unwrap();
    assert_eq!(open.len(), 1);
    let rejection = &open[0];
    assert_eq!(rejection.rejected_quantity, 20);
    assert_eq!(rejection.severity, Severity::Medium);

    // The gate stays shut while the rejection is open.
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

    // Rework spawns a fresh card for the rejected 20 units.
    let resolved = ctx
        .services
        .rejections
        .resolve(rejection.id, ResolutionAction::Rework, None, ctx.actor)
        .await
        .unwrap();
    assert!(resolved.is_resolved);
    let rework_id = resolved.rework_job_card_id.expect("rework card spawned");

    let rework = ctx.services.job_cards.get_job_card(rework_id).await.unwrap();
    assert_eq!(rework.quantity, 20);
    assert_eq!(rework.current_step, 1);
    assert_eq!(rework.status, JobCardStatus::Pending);
    assert_eq!(rework.rework_of, Some(card.id));

    // The original card may now carry its accepted 80 through the gate.
    let card = common::advance_to(&ctx, card.id, FINAL_STEP).await;
    assert_eq!(card.status, JobCardStatus::Completed);
    assert_eq!(card.accepted_quantity, Some(80));
}

#[tokio::test]
async fn resolution_is_idempotent_and_spawns_one_rework_card() {
    let ctx = common::setup().await;
    let plan = common::create_plan(&ctx, 50).await;
    let card = common::create_card(&ctx, plan.id, 50).await;
    common::advance_to(&ctx, card.id, QA_GATE_STEP).await;

    ctx.services
        .qa
        .submit_inspection(inspection(card.id, 40, 10), ctx.actor)
        .await
        .unwrap();

    let open = ctx
        .services
        .qa
        .list_open_rejections_for_plan(plan.id)
        .await
        .unwrap();
    let rejection_id = open[0].id;

    ctx.services
        .rejections
        .resolve(rejection_id, ResolutionAction::Rework, None, ctx.actor)
        .await
        .unwrap();

    let err = ctx
        .services
        .rejections
        .resolve(rejection_id, ResolutionAction::Rework, None, ctx.actor)
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::AlreadyResolved(id) if id == rejection_id);

    // Exactly one rework card exists: the original plus one spawn.
    let cards = ctx
        .services
        .job_cards
        .list_job_cards_for_plan(plan.id)
        .await
        .unwrap();
    assert_eq!(cards.len(), 2);
}

#[tokio::test]
async fn full_rejection_scrapped_marks_card_rejected() {
    let ctx = common::setup().await;
    let plan = common::create_plan(&ctx, 30).await;
    let card = common::create_card(&ctx, plan.id, 30).await;
    common::advance_to(&ctx, card.id, QA_GATE_STEP).await;

    ctx.services
        .qa
        .submit_inspection(inspection(card.id, 0, 30), ctx.actor)
        .await
        .unwrap();

    let open = ctx
        .services
        .qa
        .list_open_rejections_for_plan(plan.id)
        .await
        .unwrap();
    assert_eq!(open[0].severity, Severity::High);

    ctx.services
        .rejections
        .resolve(open[0].id, ResolutionAction::Scrap, None, ctx.actor)
        .await
        .unwrap();

    // No accepted units survive, so the card is terminally rejected.
    let card = ctx.services.job_cards.get_job_card(card.id).await.unwrap();
    assert_eq!(card.status, JobCardStatus::Rejected);

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
async fn accept_override_clears_the_gate() {
    let ctx = common::setup().await;
    let plan = common::create_plan(&ctx, 40).await;
    let card = common::create_card(&ctx, plan.id, 40).await;
    common::advance_to(&ctx, card.id, QA_GATE_STEP).await;

    ctx.services
        .qa
        .submit_inspection(inspection(card.id, 35, 5), ctx.actor)
        .await
        .unwrap();

    let open = ctx
        .services
        .qa
        .list_open_rejections_for_plan(plan.id)
        .await
        .unwrap();

    ctx.services
        .rejections
        .resolve(
            open[0].id,
            ResolutionAction::Accept,
            Some("deviation approved".into()),
            ctx.actor,
        )
        .await
        .unwrap();

    // The override folds the rejected units back into accepted.
    let card = ctx.services.job_cards.get_job_card(card.id).await.unwrap();
    assert_eq!(card.accepted_quantity, Some(40));
    assert_eq!(card.rejected_quantity, Some(0));

    let card = common::advance_to(&ctx, card.id, FINAL_STEP).await;
    assert_eq!(card.status, JobCardStatus::Completed);
}
