mod common;

use arkavo_health::sim::{SimBackend, SimEffect, SimElement, SimScreen};
use arkavo_health::{
    AppId, AppStateMismatch, Category, DiagnosticContext, HealthConfig, HealthError, HealthSession,
    NavigationState, NavigationTarget, PlatformVersion, SampleInput, SampleType, Scope, ValueEntry,
};
use common::{
    browse_tab, health, legacy_health_app, legacy_session, list_row, nav_title, session_for,
};
use std::sync::Arc;

fn legacy_sim() -> Arc<SimBackend> {
    let sim = Arc::new(SimBackend::new());
    legacy_health_app(&sim);
    sim
}

/// Health app on iOS 26: Summary and Search tabs.
fn search_sim(root_tab_hittable: bool) -> Arc<SimBackend> {
    let sim = Arc::new(SimBackend::new());
    let app = health();
    let search_tab = || SimElement::button("Search").in_tab_bar("UITabBar");
    let root_tab = if root_tab_hittable {
        search_tab()
    } else {
        search_tab().not_hittable()
    };
    sim.add_screen(
        &app,
        "search",
        SimScreen::new().with_all([
            nav_title("Search"),
            root_tab,
            list_row("Activity"),
        ]),
    );
    sim.add_screen(
        &app,
        "summary",
        SimScreen::new().with_all([nav_title("Summary"), search_tab()]),
    );
    sim.add_screen(
        &app,
        "activity",
        SimScreen::new().with_all([nav_title("Activity"), search_tab()]),
    );
    sim.set_launch_screen(&app, "summary");
    sim.on_tap(&app, "Search", vec![SimEffect::go_to("search")]);
    sim.on_tap_in(&app, "search", "Activity", vec![SimEffect::go_to("activity")]);
    sim
}

fn ios26() -> PlatformVersion {
    PlatformVersion::new(26, 0, 0)
}

#[tokio::test(start_paused = true)]
async fn test_navigate_to_sample_type_from_stale_page() {
    let sim = legacy_sim();
    sim.start_on(&health(), "steps");
    let session = legacy_session(&sim);
    let mut navigator = session.navigator();
    let mut diag = DiagnosticContext::new();

    navigator
        .navigate(&NavigationTarget::sample_type(SampleType::STEPS), &mut diag)
        .await
        .unwrap();

    assert_eq!(
        navigator.state(),
        &NavigationState::AtSampleTypePage(SampleType::STEPS)
    );
    assert_eq!(sim.current_screen(&health()).as_deref(), Some("steps"));
    // once to select the tab, once to pop to its root
    assert_eq!(sim.tap_count("Browse"), 2);
    assert_eq!(sim.tap_count("Activity"), 1);
    assert_eq!(sim.tap_count("Steps"), 1);
    assert_eq!(sim.scroll_count(), 0);
    assert_eq!(
        diag.steps(),
        &["Browse tab", "category Activity", "sample type Steps"]
    );
}

#[tokio::test(start_paused = true)]
async fn test_category_below_the_fold_is_scrolled_to() {
    let sim = legacy_sim();
    sim.add_screen(
        &health(),
        "vitals",
        SimScreen::new().with_all([nav_title("Vitals"), browse_tab()]),
    );
    sim.on_tap_in(&health(), "browse", "Vitals", vec![SimEffect::go_to("vitals")]);
    sim.start_on(&health(), "browse");
    let session = legacy_session(&sim);
    let mut navigator = session.navigator();
    let mut diag = DiagnosticContext::new();

    navigator
        .navigate(&NavigationTarget::category(Category::Vitals), &mut diag)
        .await
        .unwrap();

    assert_eq!(navigator.state(), &NavigationState::AtCategoryPage(Category::Vitals));
    assert_eq!(sim.scroll_count(), 2);
    assert_eq!(sim.scroll_scopes(), vec![Scope::scroll_view(None); 2]);
    assert_eq!(sim.tap_count("Vitals"), 1);
}

#[tokio::test(start_paused = true)]
async fn test_row_lookup_ignores_text_outside_the_list() {
    let sim = legacy_sim();
    sim.add_screen(
        &health(),
        "heart",
        SimScreen::new().with_all([nav_title("Heart"), browse_tab()]),
    );
    sim.on_tap_in(&health(), "browse", "Heart", vec![SimEffect::go_to("heart")]);
    sim.with_world(|world| {
        if let Some(screen) = world.screen_mut(&health(), "browse") {
            screen
                .elements
                .insert(0, SimElement::static_text("Heart Rate Notifications").not_hittable());
        }
    });
    sim.start_on(&health(), "browse");
    let session = legacy_session(&sim);
    let mut navigator = session.navigator();
    let mut diag = DiagnosticContext::new();

    navigator
        .navigate(&NavigationTarget::category(Category::Heart), &mut diag)
        .await
        .unwrap();

    assert_eq!(navigator.state(), &NavigationState::AtCategoryPage(Category::Heart));
    assert_eq!(sim.scroll_count(), 0);
    assert_eq!(sim.tap_count("Heart"), 1);
    assert_eq!(sim.tap_count("Heart Rate Notifications"), 0);
}

#[tokio::test(start_paused = true)]
async fn test_unreachable_category_reports_visible_labels() {
    let sim = legacy_sim();
    sim.start_on(&health(), "browse");
    let config = HealthConfig {
        max_scroll_attempts: 1,
        ..HealthConfig::default().with_os_version(PlatformVersion::new(18, 2, 0))
    };
    common::init_tracing();
    let session = HealthSession::new(sim.clone(), config).unwrap();
    let mut navigator = session.navigator();
    let mut diag = DiagnosticContext::new();

    let err = navigator
        .navigate(&NavigationTarget::category(Category::Vitals), &mut diag)
        .await
        .unwrap_err();

    match err {
        HealthError::NavigationFailure {
            target, context, ..
        } => {
            assert_eq!(target, "Vitals");
            assert!(context.visible_labels.contains(&"Vitals".to_string()));
            assert!(context.visible_labels.contains(&"Heart".to_string()));
            assert_eq!(context.steps.last().map(String::as_str), Some("category Vitals"));
        }
        other => panic!("expected NavigationFailure, got {other:?}"),
    }
    assert_eq!(sim.scroll_count(), 1);
    assert_eq!(sim.tap_count("Vitals"), 0);
    assert_eq!(navigator.state(), &NavigationState::AtRootTab);
}

#[tokio::test(start_paused = true)]
async fn test_lost_tap_is_retried_once() {
    let sim = legacy_sim();
    // no rule for Heart: the page never changes
    sim.start_on(&health(), "browse");
    let session = legacy_session(&sim);
    let mut navigator = session.navigator();
    let mut diag = DiagnosticContext::new();

    let err = navigator
        .navigate(&NavigationTarget::category(Category::Heart), &mut diag)
        .await
        .unwrap_err();

    assert!(matches!(err, HealthError::NavigationFailure { ref target, .. } if target == "Heart"));
    assert!(!err.is_skippable());
    assert_eq!(sim.tap_count("Heart"), 2);
}

#[tokio::test(start_paused = true)]
async fn test_wrong_foreground_app_is_rejected() {
    let sim = legacy_sim();
    let other = AppId::new("com.example.sut");
    sim.add_screen(&other, "home", SimScreen::new().with(SimElement::button("Browse")));
    sim.start_on(&health(), "browse");
    sim.start_on(&other, "home");
    let session = legacy_session(&sim);
    let mut navigator = session.navigator();
    let mut diag = DiagnosticContext::new();

    let err = navigator.go_to_root_tab(&mut diag).await.unwrap_err();

    match err {
        HealthError::UnexpectedAppState {
            mismatch: AppStateMismatch::NotTargetApplication { expected, actual },
            ..
        } => {
            assert_eq!(expected, "com.apple.Health");
            assert_eq!(actual, "com.example.sut");
        }
        other => panic!("expected NotTargetApplication, got {other:?}"),
    }
    assert_eq!(sim.tap_count("Browse"), 0);
}

#[tokio::test(start_paused = true)]
async fn test_account_sheet_is_dismissed_before_retrying_tab() {
    let sim = legacy_sim();
    sim.add_screen(
        &health(),
        "profile",
        SimScreen::new().with_all([
            SimElement::button("Done").in_navigation_bar("HealthExperienceUI.ProfileView"),
            browse_tab().not_hittable(),
        ]),
    );
    sim.on_tap_in(&health(), "profile", "Done", vec![SimEffect::go_to("browse")]);
    sim.start_on(&health(), "profile");
    let session = legacy_session(&sim);
    let mut navigator = session.navigator();
    let mut diag = DiagnosticContext::new();

    navigator.go_to_root_tab(&mut diag).await.unwrap();

    assert_eq!(sim.tap_count("Done"), 1);
    assert_eq!(sim.tap_count("Browse"), 2);
    assert_eq!(navigator.state(), &NavigationState::AtRootTab);
}

#[tokio::test(start_paused = true)]
async fn test_open_sheet_is_cancelled_before_selecting_tab() {
    let sim = legacy_sim();
    sim.add_screen(
        &health(),
        "sheet",
        SimScreen::new().with_all([
            SimElement::button("Cancel").in_navigation_bar("Browse"),
            browse_tab().not_hittable(),
        ]),
    );
    sim.on_tap_in(&health(), "sheet", "Cancel", vec![SimEffect::go_to("browse")]);
    sim.start_on(&health(), "sheet");
    let session = legacy_session(&sim);
    let mut navigator = session.navigator();
    let mut diag = DiagnosticContext::new();

    navigator.go_to_root_tab(&mut diag).await.unwrap();

    assert_eq!(sim.tap_count("Cancel"), 1);
    assert_eq!(sim.tap_count("Browse"), 2);
    assert_eq!(sim.current_screen(&health()).as_deref(), Some("browse"));
    assert_eq!(navigator.state(), &NavigationState::AtRootTab);
}

#[tokio::test(start_paused = true)]
async fn test_failed_return_to_category_stops_the_batch() {
    let sim = legacy_sim();
    sim.add_screen(&health(), "stuck", SimScreen::new().with(browse_tab()));
    // applied after the fixture's rule, so the back button lands on "stuck"
    sim.on_tap_in(&health(), "steps", "Activity", vec![SimEffect::go_to("stuck")]);
    let session = legacy_session(&sim);
    let mut diag = DiagnosticContext::new();

    let err = session
        .launch_and_add_samples(
            vec![
                SampleInput::new(SampleType::STEPS, ValueEntry::numeric(52.0)),
                SampleInput::new(SampleType::PUSHES, ValueEntry::numeric(3.5)),
            ],
            &mut diag,
        )
        .await
        .unwrap_err();

    match err {
        HealthError::NavigationFailure {
            target, context, ..
        } => {
            assert_eq!(target, "Activity");
            assert_eq!(context.steps.last().map(String::as_str), Some("back to Activity"));
        }
        other => panic!("expected NavigationFailure, got {other:?}"),
    }
    assert_eq!(sim.typed_text("Value"), vec!["52".to_string()]);
    assert_eq!(sim.tap_count("Pushes"), 0);
    assert_eq!(sim.current_screen(&health()).as_deref(), Some("stuck"));
}

#[tokio::test(start_paused = true)]
async fn test_missing_tab_bar_fails() {
    let sim = legacy_sim();
    sim.add_screen(&health(), "blank", SimScreen::new());
    sim.start_on(&health(), "blank");
    let session = legacy_session(&sim);
    let mut navigator = session.navigator();
    let mut diag = DiagnosticContext::new();

    let err = navigator.go_to_root_tab(&mut diag).await.unwrap_err();

    assert!(matches!(err, HealthError::NavigationFailure { ref target, .. } if target == "Browse"));
    assert_eq!(navigator.state(), &NavigationState::AtUnknownScreen);
}

#[tokio::test(start_paused = true)]
async fn test_search_root_page_short_circuits() {
    let sim = search_sim(true);
    sim.start_on(&health(), "search");
    let session = session_for(&sim, ios26());
    let mut navigator = session.navigator();
    let mut diag = DiagnosticContext::new();

    navigator
        .navigate(&NavigationTarget::category(Category::Activity), &mut diag)
        .await
        .unwrap();

    assert_eq!(sim.tap_count("Search"), 0);
    assert_eq!(sim.tap_count("Activity"), 1);
    assert_eq!(sim.current_screen(&health()).as_deref(), Some("activity"));
}

#[tokio::test(start_paused = true)]
async fn test_search_tab_tapped_twice_while_hittable() {
    let sim = search_sim(true);
    sim.start_on(&health(), "summary");
    let session = session_for(&sim, ios26());
    let mut navigator = session.navigator();
    let mut diag = DiagnosticContext::new();

    navigator.go_to_root_tab(&mut diag).await.unwrap();

    assert_eq!(sim.tap_count("Search"), 2);
    assert_eq!(diag.steps(), &["Search tab"]);
}

#[tokio::test(start_paused = true)]
async fn test_search_tab_second_tap_skipped_when_covered() {
    let sim = search_sim(false);
    sim.start_on(&health(), "summary");
    let session = session_for(&sim, ios26());
    let mut navigator = session.navigator();
    let mut diag = DiagnosticContext::new();

    navigator.go_to_root_tab(&mut diag).await.unwrap();

    assert_eq!(sim.tap_count("Search"), 1);
    assert_eq!(sim.current_screen(&health()).as_deref(), Some("search"));
}
