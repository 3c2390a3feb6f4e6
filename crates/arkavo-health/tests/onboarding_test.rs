mod common;

use arkavo_health::sim::{SimAction, SimBackend, SimEffect};
use arkavo_health::{
    DiagnosticContext, HealthError, SampleInput, SampleType, SystemAlert, ValueEntry,
};
use common::{
    NOTIFICATIONS_TITLE, health, legacy_health_app, legacy_session, notifications_alert,
    onboarding_screens,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Health app that starts in onboarding. The user info page's "Next" runs
/// `next`.
fn onboarding_sim(next: Vec<SimEffect>) -> Arc<SimBackend> {
    let sim = Arc::new(SimBackend::new());
    legacy_health_app(&sim);
    onboarding_screens(&sim);
    sim.on_tap_in(&health(), "user_info", "Next", next);
    sim
}

/// "Next" lands on the loading page for the first `stuck_taps` taps, then
/// moves on to the trends page.
fn sticky_next(stuck_taps: usize) -> Vec<SimEffect> {
    let taps = Arc::new(AtomicUsize::new(0));
    vec![SimEffect::mutate(move |world, app| {
        let n = taps.fetch_add(1, Ordering::SeqCst);
        world.show(app, if n < stuck_taps { "loading" } else { "trends" });
    })]
}

fn terminations(sim: &SimBackend) -> usize {
    sim.actions()
        .iter()
        .filter(|action| matches!(action, SimAction::Terminate(_)))
        .count()
}

#[tokio::test(start_paused = true)]
async fn test_onboarding_with_notifications_alert() {
    let sim = onboarding_sim(vec![
        SimEffect::go_to("trends"),
        SimEffect::ShowAlert(notifications_alert()),
    ]);
    sim.start_on(&health(), "welcome");
    let session = legacy_session(&sim);
    let mut diag = DiagnosticContext::new();

    assert!(session.handle_onboarding_if_needed(&mut diag).await.unwrap());

    assert!(sim.alert().is_none());
    assert_eq!(sim.tap_count("Allow"), 1);
    assert_eq!(sim.tap_count("Trends"), 1);
    assert_eq!(sim.tap_count("Back"), 0);
    assert_eq!(terminations(&sim), 0);
    assert_eq!(sim.current_screen(&health()).as_deref(), Some("browse"));
    assert_eq!(sim.monitor_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_alert_while_walkthrough_closes() {
    let sim = onboarding_sim(vec![SimEffect::go_to("trends")]);
    sim.on_tap_in(
        &health(),
        "trends",
        "Continue",
        vec![SimEffect::ShowAlert(notifications_alert())],
    );
    sim.start_on(&health(), "welcome");
    let session = legacy_session(&sim);
    let mut diag = DiagnosticContext::new();

    session.handle_onboarding_if_needed(&mut diag).await.unwrap();

    assert!(sim.alert().is_none());
    assert_eq!(sim.tap_count("Allow"), 1);
}

#[tokio::test(start_paused = true)]
async fn test_no_onboarding_is_a_no_op() {
    let sim = Arc::new(SimBackend::new());
    legacy_health_app(&sim);
    sim.start_on(&health(), "browse");
    let session = legacy_session(&sim);
    let mut diag = DiagnosticContext::new();

    assert!(!session.handle_onboarding_if_needed(&mut diag).await.unwrap());
    assert!(sim.actions().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_stuck_step_recovers_after_going_back() {
    let sim = onboarding_sim(sticky_next(1));
    sim.start_on(&health(), "welcome");
    let session = legacy_session(&sim);
    let mut diag = DiagnosticContext::new();

    session.handle_onboarding_if_needed(&mut diag).await.unwrap();

    assert_eq!(sim.tap_count("Back"), 1);
    assert_eq!(sim.tap_count("Next"), 2);
    assert_eq!(terminations(&sim), 0);
    assert_eq!(sim.current_screen(&health()).as_deref(), Some("browse"));
}

#[tokio::test(start_paused = true)]
async fn test_stuck_walkthrough_relaunches_once() {
    let sim = onboarding_sim(sticky_next(2));
    sim.start_on(&health(), "welcome");
    let session = legacy_session(&sim);
    let mut diag = DiagnosticContext::new();

    session.handle_onboarding_if_needed(&mut diag).await.unwrap();

    assert_eq!(terminations(&sim), 1);
    assert_eq!(sim.tap_count("Back"), 1);
    assert_eq!(sim.tap_count("Next"), 3);
    assert_eq!(sim.current_screen(&health()).as_deref(), Some("browse"));
}

#[tokio::test(start_paused = true)]
async fn test_always_stuck_gives_up_after_two_attempts() {
    let sim = onboarding_sim(vec![SimEffect::go_to("loading")]);
    sim.start_on(&health(), "welcome");
    let session = legacy_session(&sim);
    let mut diag = DiagnosticContext::new();

    let err = session
        .handle_onboarding_if_needed(&mut diag)
        .await
        .unwrap_err();

    match err {
        HealthError::OnboardingStuck { attempts, context } => {
            assert_eq!(attempts, 2);
            assert_eq!(context.steps, vec!["onboarding".to_string()]);
        }
        other => panic!("expected OnboardingStuck, got {other:?}"),
    }
    assert_eq!(terminations(&sim), 1);
    assert_eq!(sim.tap_count("Back"), 2);
}

#[tokio::test(start_paused = true)]
async fn test_notifications_alert_without_allow_fails() {
    let sim = onboarding_sim(vec![
        SimEffect::go_to("trends"),
        SimEffect::ShowAlert(SystemAlert::new(NOTIFICATIONS_TITLE, &["OK"])),
    ]);
    sim.start_on(&health(), "welcome");
    let session = legacy_session(&sim);
    let mut diag = DiagnosticContext::new();

    let err = session
        .handle_onboarding_if_needed(&mut diag)
        .await
        .unwrap_err();

    assert!(matches!(err, HealthError::AlertNotHandled { ref title, .. } if title == NOTIFICATIONS_TITLE));
    assert!(sim.alert().is_some());
}

#[tokio::test(start_paused = true)]
async fn test_fresh_launch_runs_onboarding_before_adding_samples() {
    let sim = onboarding_sim(vec![
        SimEffect::go_to("trends"),
        SimEffect::ShowAlert(notifications_alert()),
    ]);
    let session = legacy_session(&sim);
    let mut diag = DiagnosticContext::new();

    session
        .launch_and_add_sample(
            SampleInput::new(SampleType::STEPS, ValueEntry::numeric(52.0)),
            &mut diag,
        )
        .await
        .unwrap();

    assert_eq!(sim.launch_count(&health()), 1);
    assert_eq!(sim.tap_count("Allow"), 1);
    assert_eq!(sim.typed_text("Value"), vec!["52".to_string()]);
    assert_eq!(sim.current_screen(&health()).as_deref(), Some("steps"));
    assert_eq!(diag.steps().first().map(String::as_str), Some("launch health app"));
}
