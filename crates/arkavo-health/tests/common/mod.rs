#![allow(dead_code)]

use arkavo_health::data_entry::{ADD_DATA_TABLE, ADD_DATA_VALUE_CELL};
use arkavo_health::sim::{SimBackend, SimEffect, SimElement, SimScreen};
use arkavo_health::{
    AppId, ContainerKind, Container, ElementKind, HealthConfig, HealthSession, PlatformVersion,
    SystemAlert,
};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

pub const NOTIFICATIONS_TITLE: &str = "“Health” Would Like to Send You Notifications";

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_test_writer()
        .try_init();
}

pub fn health() -> AppId {
    AppId::new("com.apple.Health")
}

pub fn session_for(sim: &Arc<SimBackend>, version: PlatformVersion) -> HealthSession {
    init_tracing();
    let config = HealthConfig::default().with_os_version(version);
    HealthSession::new(sim.clone(), config).unwrap()
}

pub fn legacy_session(sim: &Arc<SimBackend>) -> HealthSession {
    session_for(sim, PlatformVersion::new(18, 2, 0))
}

pub fn nav_title(title: &str) -> SimElement {
    SimElement::static_text(title).in_navigation_bar(title)
}

/// A category or sample type row in the page's list.
pub fn list_row(label: &str) -> SimElement {
    SimElement::static_text(label).in_scroll_view()
}

pub fn browse_tab() -> SimElement {
    SimElement::button("Browse").in_tab_bar("Tab Bar")
}

pub fn notifications_alert() -> SystemAlert {
    SystemAlert::new(NOTIFICATIONS_TITLE, &["Don’t Allow", "Allow"])
}

/// Elements shared by every state of the "Add Data" sheet.
pub fn add_sheet_base() -> Vec<SimElement> {
    vec![
        SimElement::static_text("Steps").in_navigation_bar("Add Data"),
        SimElement::button("Cancel").in_navigation_bar("Add Data"),
        SimElement::button("Add").in_navigation_bar("Add Data"),
        SimElement::static_text("Date").in_table(ADD_DATA_TABLE),
        SimElement::static_text("Time").in_table(ADD_DATA_TABLE),
        SimElement::text_field("Value")
            .in_table(ADD_DATA_TABLE)
            .inside(Container::named(ContainerKind::Cell, ADD_DATA_VALUE_CELL)),
    ]
}

/// Health app on iOS 18: Browse root, Activity and Heart categories, the
/// Steps page and its "Add Data" sheet. Launches onto the browse page.
pub fn legacy_health_app(sim: &SimBackend) {
    let app = health();

    sim.add_screen(
        &app,
        "browse",
        SimScreen::new().with_all([
            nav_title("Browse"),
            browse_tab(),
            list_row("Activity").appears_after(std::time::Duration::from_secs(2)),
            list_row("Heart"),
            list_row("Vitals").revealed_after_scrolls(2),
        ]),
    );
    sim.add_screen(
        &app,
        "activity",
        SimScreen::new().with_all([
            nav_title("Activity"),
            SimElement::button("Browse").in_navigation_bar("Activity"),
            browse_tab(),
            list_row("Steps"),
            list_row("Pushes").revealed_after_scrolls(1),
        ]),
    );
    for (page, category) in [("Steps", "Activity"), ("Pushes", "Activity")] {
        sim.add_screen(
            &app,
            page.to_lowercase(),
            SimScreen::new().with_all([
                nav_title(page),
                SimElement::button(category).in_navigation_bar(page),
                SimElement::button("Add Data").in_navigation_bar(page),
                browse_tab(),
            ]),
        );
    }
    sim.add_screen(&app, "add", SimScreen::new().with_all(add_sheet_base()));
    sim.add_screen(&app, "add_pushes", SimScreen::new().with_all(add_sheet_base()));
    sim.set_launch_screen(&app, "browse");

    sim.on_tap(&app, "Browse", vec![SimEffect::go_to("browse")]);
    sim.on_tap_in(&app, "browse", "Activity", vec![SimEffect::go_to("activity")]);
    sim.on_tap_in(&app, "activity", "Steps", vec![SimEffect::go_to("steps")]);
    sim.on_tap_in(&app, "activity", "Pushes", vec![SimEffect::go_to("pushes")]);
    sim.on_tap_in(&app, "steps", "Activity", vec![SimEffect::go_to("activity")]);
    sim.on_tap_in(&app, "pushes", "Activity", vec![SimEffect::go_to("activity")]);
    sim.on_tap_in(&app, "steps", "Add Data", vec![SimEffect::go_to("add")]);
    sim.on_tap_in(&app, "pushes", "Add Data", vec![SimEffect::go_to("add_pushes")]);
    sim.on_tap_in(&app, "add", "Add", vec![SimEffect::go_to("steps")]);
    sim.on_tap_in(&app, "add_pushes", "Add", vec![SimEffect::go_to("pushes")]);
}

/// Onboarding screens ahead of `legacy_health_app`'s browse page. The
/// caller decides what tapping "Next" on the user info page does.
pub fn onboarding_screens(sim: &SimBackend) {
    let app = health();
    sim.add_screen(
        &app,
        "welcome",
        SimScreen::new().with_all([
            SimElement::static_text("Welcome to Health"),
            SimElement::static_text("Continue"),
        ]),
    );
    sim.add_screen(
        &app,
        "consent",
        SimScreen::new().with(SimElement::static_text("Continue")),
    );
    sim.add_screen(
        &app,
        "user_info",
        SimScreen::new().with_all([
            SimElement::button("Back").in_navigation_bar("WDBuddyFlowUserInfoView"),
            SimElement::button("Next").in_table("UIA.Health.Onboarding.UserInfo"),
        ]),
    );
    sim.add_screen(
        &app,
        "loading",
        SimScreen::new().with(SimElement::button("Back").in_navigation_bar("WDBuddyFlowUserInfoView")),
    );
    sim.add_screen(
        &app,
        "trends",
        SimScreen::new().with_all([
            SimElement::new(ElementKind::Switch, "Trends"),
            SimElement::static_text("Continue"),
        ]),
    );
    sim.set_launch_screen(&app, "welcome");

    sim.on_tap_in(&app, "welcome", "Continue", vec![SimEffect::go_to("consent")]);
    sim.on_tap_in(&app, "consent", "Continue", vec![SimEffect::go_to("user_info")]);
    sim.on_tap_in(&app, "loading", "Back", vec![SimEffect::go_to("consent")]);
    sim.on_tap_in(&app, "trends", "Continue", vec![SimEffect::go_to("browse")]);
}
