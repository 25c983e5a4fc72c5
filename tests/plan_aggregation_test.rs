mod common;

use prodflow_api::entities::rejection::ResolutionAction;
use prodflow_api::services::qa::SubmitInspectionCommand;
use prodflow_api::steps::{FINAL_STEP, QA_GATE_STEP};

async fn inspect(
    ctx: &common::TestContext,
    card_id: uuid::Uuid,
    accepted: i32,
    rejected: i32,
) {
    ctx.services
        .qa
        .submit_inspection(
            SubmitInspectionCommand {
                job_card_id: card_id,
                accepted_quantity: accepted,
                rejected_quantity: rejected,
                quality_score: 75,
                reason: (rejected > 0).then(|| "out of tolerance".to_string()),
                notes: None,
            },
            ctx.actor,
        )
        .await
        .expect("submit inspection");
}

#[tokio::test]
async fn empty_plan_reports_nothing_in_flight() {
    let ctx = common::setup().await;
    let plan = common::create_plan(&ctx, 100).await;

    let progress = ctx
        .services
        .aggregation
        .plan_progress(plan.id)
        .await
        .unwrap();
    assert_eq!(progress.total_quantity, 100);
    assert_eq!(progress.completed_quantity, 0);
    assert_eq!(progress.in_production_quantity, 0);
    assert_eq!(progress.rejected_quantity, 0);
    assert_eq!(progress.job_card_count, 0);
    // A plan with no cards has produced nothing; it is not complete.
    assert!(!progress.is_completed);
}

#[tokio::test]
async fn progress_classifies_completed_in_flight_and_lost_units() {
    let ctx = common::setup().await;
    let plan = common::create_plan(&ctx, 100).await;

    // Card A: 50 units, clean pass, completed.
    let a = common::create_card(&ctx, plan.id, 50).await;
    common::advance_to(&ctx, a.id, QA_GATE_STEP).await;
    inspect(&ctx, a.id, 50, 0).await;

    // Card B: 30 units, 10 rejected and scrapped, 20 accepted and completed.
    let b = common::create_card(&ctx, plan.id, 30).await;
    common::advance_to(&ctx, b.id, QA_GATE_STEP).await;
    inspect(&ctx, b.id, 20, 10).await;
    let open = ctx
        .services
        .qa
        .list_open_rejections_for_plan(plan.id)
        .await
        .unwrap();
    ctx.services
        .rejections
        .resolve(open[0].id, ResolutionAction::Scrap, None, ctx.actor)
        .await
        .unwrap();
    common::advance_to(&ctx, b.id, FINAL_STEP).await;

    // Card C: 20 units, mid-pipeline.
    let c = common::create_card(&ctx, plan.id, 20).await;
    common::advance_to(&ctx, c.id, 4).await;

    let progress = ctx
        .services
        .aggregation
        .plan_progress(plan.id)
        .await
        .unwrap();
    assert_eq!(progress.completed_quantity, 70); // 50 + 20 accepted
    assert_eq!(progress.in_production_quantity, 20); // card C
    assert_eq!(progress.rejected_quantity, 10); // scrapped units
    assert_eq!(progress.open_rejections, 0);
    assert_eq!(progress.job_card_count, 3);
    assert!(!progress.is_completed);
}

#[tokio::test]
async fn rework_is_not_counted_as_lost() {
    let ctx = common::setup().await;
    let plan = common::create_plan(&ctx, 60).await;

    let card = common::create_card(&ctx, plan.id, 60).await;
    common::advance_to(&ctx, card.id, QA_GATE_STEP).await;
    inspect(&ctx, card.id, 45, 15).await;

    let open = ctx
        .services
        .qa
        .list_open_rejections_for_plan(plan.id)
        .await
        .unwrap();
    ctx.services
        .rejections
        .resolve(open[0].id, ResolutionAction::Rework, None, ctx.actor)
        .await
        .unwrap();

    let progress = ctx
        .services
        .aggregation
        .plan_progress(plan.id)
        .await
        .unwrap();
    // Reworked units re-enter production on the spawned card.
    assert_eq!(progress.rejected_quantity, 0);
    assert_eq!(progress.in_production_quantity, 60 + 15);
    assert_eq!(progress.job_card_count, 2);
}

#[tokio::test]
async fn plan_completes_when_all_cards_terminal_and_no_open_rejections() {
    let ctx = common::setup().await;
    let plan = common::create_plan(&ctx, 20).await;

    let card = common::create_card(&ctx, plan.id, 20).await;
    common::advance_to(&ctx, card.id, QA_GATE_STEP).await;
    inspect(&ctx, card.id, 15, 5).await;

    // Open rejection keeps the plan incomplete.
    let progress = ctx
        .services
        .aggregation
        .plan_progress(plan.id)
        .await
        .unwrap();
    assert_eq!(progress.open_rejections, 1);
    assert!(!progress.is_completed);

    let open = ctx
        .services
        .qa
        .list_open_rejections_for_plan(plan.id)
        .await
        .unwrap();
    ctx.services
        .rejections
        .resolve(open[0].id, ResolutionAction::Return, None, ctx.actor)
        .await
        .unwrap();
    common::advance_to(&ctx, card.id, FINAL_STEP).await;

    let progress = ctx
        .services
        .aggregation
        .plan_progress(plan.id)
        .await
        .unwrap();
    assert_eq!(progress.completed_quantity, 15);
    assert_eq!(progress.rejected_quantity, 5);
    assert!(progress.is_completed);
}

#[tokio::test]
async fn committed_quantity_frees_resolved_units() {
    let ctx = common::setup().await;
    let plan = common::create_plan(&ctx, 100).await;

    let card = common::create_card(&ctx, plan.id, 100).await;
    assert_eq!(
        ctx.services
            .aggregation
            .committed_quantity(plan.id)
            .await
            .unwrap(),
        100
    );

    common::advance_to(&ctx, card.id, QA_GATE_STEP).await;
    inspect(&ctx, card.id, 70, 30).await;

    let open = ctx
        .services
        .qa
        .list_open_rejections_for_plan(plan.id)
        .await
        .unwrap();
    ctx.services
        .rejections
        .resolve(open[0].id, ResolutionAction::Rework, None, ctx.actor)
        .await
        .unwrap();

    // 100 original + 30 rework - 30 released by the resolution.
    assert_eq!(
        ctx.services
            .aggregation
            .committed_quantity(plan.id)
            .await
            .unwrap(),
        100
    );
}
