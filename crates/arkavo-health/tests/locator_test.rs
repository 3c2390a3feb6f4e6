mod common;

use arkavo_health::sim::{SimBackend, SimElement, SimScreen};
use arkavo_health::{
    AppId, AutomationBackend, DiagnosticContext, ElementQuery, HealthError, LabelPredicate, Locator,
    Presence, ScrollPlan,
};
use std::sync::Arc;
use std::time::Duration;

fn list_app() -> AppId {
    AppId::new("com.example.list")
}

fn setup(element: SimElement) -> (Arc<SimBackend>, Locator) {
    common::init_tracing();
    let sim = Arc::new(SimBackend::new());
    sim.add_screen(
        &list_app(),
        "list",
        SimScreen::new()
            .with(SimElement::static_text("Activity"))
            .with(element),
    );
    sim.start_on(&list_app(), "list");
    let locator = Locator::new(sim.clone());
    (sim, locator)
}

fn vitals() -> ElementQuery {
    ElementQuery::static_text(&list_app(), LabelPredicate::contains("vitals"))
}

#[tokio::test(start_paused = true)]
async fn test_never_hittable_target_scrolls_at_most_twice() {
    let (sim, locator) = setup(SimElement::static_text("Vitals").not_hittable());
    let diag = DiagnosticContext::new();
    let plan = ScrollPlan::new(2, Duration::from_secs(10));

    let err = locator
        .locate_tappable(&vitals(), Duration::from_secs(30), &plan, &diag)
        .await
        .unwrap_err();

    match err {
        HealthError::ElementUnreachable {
            scroll_attempts,
            context,
            ..
        } => {
            assert_eq!(scroll_attempts, 2);
            assert!(context.visible_labels.contains(&"Vitals".to_string()));
        }
        other => panic!("expected ElementUnreachable, got {other:?}"),
    }
    assert_eq!(sim.scroll_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_scroll_makes_target_tappable() {
    let (sim, locator) = setup(SimElement::static_text("Vitals").revealed_after_scrolls(1));
    let diag = DiagnosticContext::new();
    let plan = ScrollPlan::new(2, Duration::from_secs(10));

    let element = locator
        .locate_tappable(&vitals(), Duration::from_secs(30), &plan, &diag)
        .await
        .unwrap();

    assert!(element.hittable);
    assert_eq!(element.label, "Vitals");
    assert_eq!(sim.scroll_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_missing_target_is_not_found() {
    let (sim, locator) = setup(SimElement::static_text("Heart"));
    let diag = DiagnosticContext::new();
    let plan = ScrollPlan::new(2, Duration::from_secs(10));

    let err = locator
        .locate_tappable(&vitals(), Duration::from_secs(30), &plan, &diag)
        .await
        .unwrap_err();

    assert!(matches!(err, HealthError::ElementNotFound { .. }));
    assert_eq!(sim.scroll_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_locate_waits_for_late_element() {
    let (_sim, locator) =
        setup(SimElement::static_text("Vitals").appears_after(Duration::from_secs(4)));

    assert_eq!(locator.presence(&vitals()).await.unwrap(), Presence::Absent);
    assert!(
        locator
            .locate(&vitals(), Duration::from_secs(1))
            .await
            .unwrap()
            .is_none()
    );

    let start = tokio::time::Instant::now();
    let found = locator.locate(&vitals(), Duration::from_secs(10)).await.unwrap();
    assert!(found.is_some());
    assert!(start.elapsed() <= Duration::from_secs(4));
    assert_eq!(locator.presence(&vitals()).await.unwrap(), Presence::Hittable);
}

#[tokio::test(start_paused = true)]
async fn test_tap_if_present_skips_absent_element() {
    let (sim, locator) = setup(SimElement::button("Dismiss"));
    let cancel = ElementQuery::button(&list_app(), LabelPredicate::named("Cancel"));
    let dismiss = ElementQuery::button(&list_app(), LabelPredicate::named("Dismiss"));

    assert!(!locator.tap_if_present(&cancel, Duration::from_secs(1)).await.unwrap());
    assert!(locator.tap_if_present(&dismiss, Duration::from_secs(1)).await.unwrap());
    assert_eq!(sim.tap_count("Dismiss"), 1);
    assert!(sim.exists(&dismiss).await.unwrap());
}

#[tokio::test(start_paused = true)]
async fn test_require_reports_visible_labels() {
    let (_sim, locator) = setup(SimElement::button("Dismiss"));
    let mut diag = DiagnosticContext::new();
    diag.enter("looking for cancel");
    let cancel = ElementQuery::button(&list_app(), LabelPredicate::named("Cancel"));

    let err = locator
        .require(&cancel, Duration::from_secs(2), &diag)
        .await
        .unwrap_err();

    let context = err.context().unwrap();
    assert_eq!(context.steps, vec!["looking for cancel".to_string()]);
    assert_eq!(
        context.visible_labels,
        vec!["Activity".to_string(), "Dismiss".to_string()]
    );
    assert!(context.to_json().contains("Dismiss"));
}
