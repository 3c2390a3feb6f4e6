//! In-memory automation backend.
//!
//! Screens are named sets of [`SimElement`]s; tap rules move between them.
//! Time is tokio time, so tests that run with a paused clock get
//! deterministic waits without sleeping for real.

mod element;

pub use element::{SimElement, SimScreen};

use crate::backend::{
    AppId, AutomationBackend, ElementSnapshot, InterruptionMonitor, MonitorDecision, MonitorToken,
    ScrollDirection, ScrollVelocity, SystemAlert,
};
use crate::query::{Container, ContainerKind, ElementQuery, Scope};
use crate::{HealthError, Result};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, trace};

/// Everything the simulated device did, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SimAction {
    Launch(AppId),
    Activate(AppId),
    Terminate(AppId),
    Tap { app: AppId, label: String },
    Type { app: AppId, label: String, text: String },
    Scroll { app: AppId, scope: Scope, direction: ScrollDirection },
    AdjustWheel { app: AppId, from: String, to: String },
    /// A button tapped by an interruption monitor.
    AlertTap { title: String, button: String },
}

type MutateFn = dyn Fn(&mut SimWorld, &AppId) + Send + Sync;

/// What happens when a rule's element is tapped.
#[derive(Clone)]
pub enum SimEffect {
    GoTo(String),
    ShowAlert(SystemAlert),
    DismissAlert,
    Terminate,
    Mutate(Arc<MutateFn>),
}

impl SimEffect {
    pub fn go_to(screen: impl Into<String>) -> Self {
        SimEffect::GoTo(screen.into())
    }

    pub fn mutate(f: impl Fn(&mut SimWorld, &AppId) + Send + Sync + 'static) -> Self {
        SimEffect::Mutate(Arc::new(f))
    }
}

impl std::fmt::Debug for SimEffect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SimEffect::GoTo(screen) => f.debug_tuple("GoTo").field(screen).finish(),
            SimEffect::ShowAlert(alert) => f.debug_tuple("ShowAlert").field(&alert.title).finish(),
            SimEffect::DismissAlert => f.write_str("DismissAlert"),
            SimEffect::Terminate => f.write_str("Terminate"),
            SimEffect::Mutate(_) => f.write_str("Mutate(..)"),
        }
    }
}

#[derive(Debug, Clone)]
struct TapRule {
    app: AppId,
    screen: Option<String>,
    key: String,
    effects: Vec<SimEffect>,
}

#[derive(Debug, Clone)]
struct SimApp {
    screens: HashMap<String, SimScreen>,
    launch_screen: Option<String>,
    current: Option<String>,
    shown_at: Instant,
    scrolls: u32,
    running: bool,
}

impl Default for SimApp {
    fn default() -> Self {
        Self {
            screens: HashMap::new(),
            launch_screen: None,
            current: None,
            shown_at: Instant::now(),
            scrolls: 0,
            running: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Origin {
    Alert,
    Screen(usize),
}

/// State of the simulated device. Reachable from [`SimEffect::Mutate`].
#[derive(Debug, Default)]
pub struct SimWorld {
    apps: BTreeMap<AppId, SimApp>,
    foreground: Option<AppId>,
    alert: Option<SystemAlert>,
    rules: Vec<TapRule>,
    actions: Vec<SimAction>,
}

impl SimWorld {
    fn app_mut(&mut self, app: &AppId) -> &mut SimApp {
        self.apps.entry(app.clone()).or_default()
    }

    pub fn add_screen(&mut self, app: &AppId, name: impl Into<String>, screen: SimScreen) {
        self.app_mut(app).screens.insert(name.into(), screen);
    }

    pub fn set_launch_screen(&mut self, app: &AppId, name: impl Into<String>) {
        self.app_mut(app).launch_screen = Some(name.into());
    }

    /// Switch `app` to the named screen, resetting its clock and scroll
    /// position.
    pub fn show(&mut self, app: &AppId, name: impl Into<String>) {
        let state = self.app_mut(app);
        state.current = Some(name.into());
        state.shown_at = Instant::now();
        state.scrolls = 0;
    }

    /// Bring `app` to the foreground on the named screen, launching it if
    /// needed. Models one app handing over to another.
    pub fn open(&mut self, app: &AppId, name: impl Into<String>) {
        if !self.is_running(app) {
            self.launch(app);
        }
        self.foreground = Some(app.clone());
        self.show(app, name);
    }

    pub fn current_screen(&self, app: &AppId) -> Option<&str> {
        self.apps.get(app).and_then(|a| a.current.as_deref())
    }

    pub fn screen_mut(&mut self, app: &AppId, name: &str) -> Option<&mut SimScreen> {
        self.apps.get_mut(app).and_then(|a| a.screens.get_mut(name))
    }

    pub fn show_alert(&mut self, alert: SystemAlert) {
        self.alert = Some(alert);
    }

    pub fn dismiss_alert(&mut self) {
        self.alert = None;
    }

    pub fn alert(&self) -> Option<&SystemAlert> {
        self.alert.as_ref()
    }

    pub fn is_running(&self, app: &AppId) -> bool {
        self.apps.get(app).is_some_and(|a| a.running)
    }

    pub fn actions(&self) -> &[SimAction] {
        &self.actions
    }

    fn launch(&mut self, app: &AppId) {
        let state = self.app_mut(app);
        state.running = true;
        state.current = state.launch_screen.clone();
        state.shown_at = Instant::now();
        state.scrolls = 0;
        self.foreground = Some(app.clone());
    }

    fn terminate(&mut self, app: &AppId) {
        let state = self.app_mut(app);
        state.running = false;
        state.current = None;
        if self.foreground.as_ref() == Some(app) {
            self.foreground = None;
        }
    }

    fn alert_elements(&self) -> Vec<SimElement> {
        let Some(alert) = &self.alert else {
            return Vec::new();
        };
        let container = Container::named(ContainerKind::Alert, alert.title.clone());
        let mut elements = vec![SimElement::static_text(alert.title.clone()).inside(container.clone())];
        elements.extend(
            alert
                .texts
                .iter()
                .map(|text| SimElement::static_text(text.clone()).inside(container.clone())),
        );
        elements.extend(
            alert
                .buttons
                .iter()
                .map(|button| SimElement::button(button.clone()).inside(container.clone())),
        );
        elements
    }

    /// Elements currently in the hierarchy for `app`, alert first.
    fn visible(&self, app: &AppId) -> Vec<(Origin, SimElement, u32)> {
        let mut out: Vec<(Origin, SimElement, u32)> = self
            .alert_elements()
            .into_iter()
            .map(|e| (Origin::Alert, e, 0))
            .collect();

        let Some(state) = self.apps.get(app).filter(|a| a.running) else {
            return out;
        };
        let Some(screen) = state.current.as_ref().and_then(|name| state.screens.get(name)) else {
            return out;
        };
        let elapsed = state.shown_at.elapsed();
        out.extend(
            screen
                .elements
                .iter()
                .enumerate()
                .filter(|(_, e)| elapsed >= e.appears_after)
                .map(|(i, e)| (Origin::Screen(i), e.clone(), state.scrolls)),
        );
        out
    }

    /// Visible elements matching `query`, in tree order. A `first_match`
    /// scope step is pinned to the first matching container on screen;
    /// containers are told apart by kind and identifier.
    fn matching(&self, query: &ElementQuery) -> Vec<(Origin, SimElement, u32)> {
        let mut visible = self.visible(&query.app);
        for step in query.scope.path.iter().filter(|step| step.first_match) {
            let first = visible
                .iter()
                .flat_map(|(_, e, _)| e.containers.iter())
                .find(|c| step.matches(c))
                .cloned();
            if let Some(first) = first {
                visible.retain(|(_, e, _)| e.containers.contains(&first));
            }
        }
        visible.retain(|(_, e, _)| e.matches(query));
        visible
    }

    fn find(&self, query: &ElementQuery) -> Result<(Origin, SimElement, u32)> {
        self.matching(query)
            .into_iter()
            .nth(query.index)
            .ok_or_else(|| HealthError::Backend(format!("no element matches {}", query.describe())))
    }

    fn element_mut(&mut self, app: &AppId, index: usize) -> Option<&mut SimElement> {
        let state = self.apps.get_mut(app)?;
        let name = state.current.clone()?;
        state.screens.get_mut(&name)?.elements.get_mut(index)
    }

    fn tap(&mut self, query: &ElementQuery) -> Result<()> {
        let (origin, element, scrolls) = self.find(query)?;
        if !element.snapshot(scrolls).hittable {
            return Err(HealthError::Backend(format!(
                "element is not hittable: {}",
                query.describe()
            )));
        }
        trace!(app = %query.app, label = %element.label, "sim tap");
        self.actions.push(SimAction::Tap {
            app: query.app.clone(),
            label: element.label.clone(),
        });
        if origin == Origin::Alert {
            self.alert = None;
        }
        self.apply_rules(&query.app, &element);
        Ok(())
    }

    fn tap_alert_button(&mut self, button: &str) {
        let Some(alert) = self.alert.take() else {
            return;
        };
        self.actions.push(SimAction::AlertTap {
            title: alert.title,
            button: button.to_string(),
        });
    }

    fn apply_rules(&mut self, app: &AppId, element: &SimElement) {
        let current = self.current_screen(app).map(str::to_string);
        let effects: Vec<SimEffect> = self
            .rules
            .iter()
            .filter(|rule| {
                &rule.app == app
                    && rule.screen.as_ref().is_none_or(|s| Some(s) == current.as_ref())
                    && element.answers_to(&rule.key)
            })
            .flat_map(|rule| rule.effects.clone())
            .collect();

        for effect in effects {
            debug!(app = %app, ?effect, "applying tap effect");
            match effect {
                SimEffect::GoTo(screen) => self.show(app, screen),
                SimEffect::ShowAlert(alert) => self.alert = Some(alert),
                SimEffect::DismissAlert => self.alert = None,
                SimEffect::Terminate => self.terminate(app),
                SimEffect::Mutate(f) => f(self, app),
            }
        }
    }
}

/// Deterministic [`AutomationBackend`] over a [`SimWorld`].
pub struct SimBackend {
    world: Mutex<SimWorld>,
    monitors: Mutex<Vec<(MonitorToken, Arc<dyn InterruptionMonitor>)>>,
    poll_interval: Duration,
}

impl Default for SimBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl SimBackend {
    pub fn new() -> Self {
        Self {
            world: Mutex::new(SimWorld::default()),
            monitors: Mutex::new(Vec::new()),
            poll_interval: Duration::from_millis(100),
        }
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    fn lock(&self) -> MutexGuard<'_, SimWorld> {
        self.world.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn lock_monitors(&self) -> MutexGuard<'_, Vec<(MonitorToken, Arc<dyn InterruptionMonitor>)>> {
        self.monitors.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn with_world<R>(&self, f: impl FnOnce(&mut SimWorld) -> R) -> R {
        f(&mut self.lock())
    }

    pub fn add_screen(&self, app: &AppId, name: impl Into<String>, screen: SimScreen) {
        self.lock().add_screen(app, name, screen);
    }

    pub fn set_launch_screen(&self, app: &AppId, name: impl Into<String>) {
        self.lock().set_launch_screen(app, name);
    }

    /// Launch `app` straight onto `screen`, bypassing the backend trait.
    pub fn start_on(&self, app: &AppId, screen: impl Into<String>) {
        self.lock().open(app, screen);
    }

    /// Run `effects` whenever an element of `app` answering to `key` (label
    /// or identifier) is tapped, on any screen.
    pub fn on_tap(&self, app: &AppId, key: impl Into<String>, effects: Vec<SimEffect>) {
        self.add_rule(app, None, key.into(), effects);
    }

    /// Like [`SimBackend::on_tap`], restricted to one screen.
    pub fn on_tap_in(
        &self,
        app: &AppId,
        screen: impl Into<String>,
        key: impl Into<String>,
        effects: Vec<SimEffect>,
    ) {
        self.add_rule(app, Some(screen.into()), key.into(), effects);
    }

    fn add_rule(&self, app: &AppId, screen: Option<String>, key: String, effects: Vec<SimEffect>) {
        self.lock().rules.push(TapRule {
            app: app.clone(),
            screen,
            key,
            effects,
        });
    }

    pub fn show_alert(&self, alert: SystemAlert) {
        self.lock().show_alert(alert);
    }

    pub fn alert(&self) -> Option<SystemAlert> {
        self.lock().alert.clone()
    }

    pub fn current_screen(&self, app: &AppId) -> Option<String> {
        self.lock().current_screen(app).map(str::to_string)
    }

    pub fn actions(&self) -> Vec<SimAction> {
        self.lock().actions.clone()
    }

    /// Taps on elements or alert buttons labelled `label`.
    pub fn tap_count(&self, label: &str) -> usize {
        self.lock()
            .actions
            .iter()
            .filter(|action| match action {
                SimAction::Tap { label: l, .. } => l == label,
                SimAction::AlertTap { button, .. } => button == label,
                _ => false,
            })
            .count()
    }

    /// Containers that received scroll gestures, in order.
    pub fn scroll_scopes(&self) -> Vec<Scope> {
        self.lock()
            .actions
            .iter()
            .filter_map(|action| match action {
                SimAction::Scroll { scope, .. } => Some(scope.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn scroll_count(&self) -> usize {
        self.lock()
            .actions
            .iter()
            .filter(|action| matches!(action, SimAction::Scroll { .. }))
            .count()
    }

    pub fn launch_count(&self, app: &AppId) -> usize {
        self.lock()
            .actions
            .iter()
            .filter(|action| matches!(action, SimAction::Launch(a) | SimAction::Activate(a) if a == app))
            .count()
    }

    /// Texts typed into elements labelled `label`, in order.
    pub fn typed_text(&self, label: &str) -> Vec<String> {
        self.lock()
            .actions
            .iter()
            .filter_map(|action| match action {
                SimAction::Type { label: l, text, .. } if l == label => Some(text.clone()),
                _ => None,
            })
            .collect()
    }

    /// Values picker wheels were set to, in order.
    pub fn wheel_values(&self) -> Vec<String> {
        self.lock()
            .actions
            .iter()
            .filter_map(|action| match action {
                SimAction::AdjustWheel { to, .. } => Some(to.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn monitor_count(&self) -> usize {
        self.lock_monitors().len()
    }
}

#[async_trait]
impl AutomationBackend for SimBackend {
    async fn launch(&self, app: &AppId) -> Result<()> {
        let mut world = self.lock();
        world.actions.push(SimAction::Launch(app.clone()));
        world.launch(app);
        Ok(())
    }

    async fn activate(&self, app: &AppId) -> Result<()> {
        let mut world = self.lock();
        world.actions.push(SimAction::Activate(app.clone()));
        if world.is_running(app) {
            world.foreground = Some(app.clone());
        } else {
            world.launch(app);
        }
        Ok(())
    }

    async fn terminate(&self, app: &AppId) -> Result<()> {
        let mut world = self.lock();
        world.actions.push(SimAction::Terminate(app.clone()));
        world.terminate(app);
        Ok(())
    }

    async fn foreground_app(&self) -> Result<Option<AppId>> {
        Ok(self.lock().foreground.clone())
    }

    async fn resolve(&self, query: &ElementQuery) -> Result<Vec<ElementSnapshot>> {
        let world = self.lock();
        Ok(world
            .matching(query)
            .into_iter()
            .map(|(_, e, scrolls)| e.snapshot(scrolls))
            .collect())
    }

    async fn tap(&self, query: &ElementQuery) -> Result<()> {
        self.lock().tap(query)
    }

    async fn type_text(&self, query: &ElementQuery, text: &str) -> Result<()> {
        let mut world = self.lock();
        let (origin, element, _) = world.find(query)?;
        let Origin::Screen(index) = origin else {
            return Err(HealthError::Backend("cannot type into an alert".to_string()));
        };
        world.actions.push(SimAction::Type {
            app: query.app.clone(),
            label: element.label.clone(),
            text: text.to_string(),
        });
        if let Some(target) = world.element_mut(&query.app, index) {
            let mut value = target.value.take().unwrap_or_default();
            value.push_str(text);
            target.value = Some(value);
        }
        Ok(())
    }

    async fn scroll(
        &self,
        app: &AppId,
        scope: &Scope,
        direction: ScrollDirection,
        _velocity: ScrollVelocity,
    ) -> Result<()> {
        let mut world = self.lock();
        world.actions.push(SimAction::Scroll {
            app: app.clone(),
            scope: scope.clone(),
            direction,
        });
        world.app_mut(app).scrolls += 1;
        Ok(())
    }

    async fn adjust_wheel(&self, query: &ElementQuery, value: &str) -> Result<()> {
        let mut world = self.lock();
        let (origin, element, _) = world.find(query)?;
        let Origin::Screen(index) = origin else {
            return Err(HealthError::Backend("alerts have no picker wheels".to_string()));
        };
        world.actions.push(SimAction::AdjustWheel {
            app: query.app.clone(),
            from: element.label.clone(),
            to: value.to_string(),
        });
        if let Some(target) = world.element_mut(&query.app, index) {
            target.label = value.to_string();
            target.value = Some(value.to_string());
        }
        Ok(())
    }

    fn register_interruption_monitor(&self, monitor: Arc<dyn InterruptionMonitor>) -> MonitorToken {
        let token = MonitorToken::new();
        debug!(monitor = monitor.description(), "registering interruption monitor");
        self.lock_monitors().push((token, monitor));
        token
    }

    fn remove_interruption_monitor(&self, token: MonitorToken) -> bool {
        let mut monitors = self.lock_monitors();
        let before = monitors.len();
        monitors.retain(|(t, _)| *t != token);
        monitors.len() != before
    }

    /// Offer a pending alert to the monitors, most recently registered first.
    async fn pump_interruptions(&self) -> Result<()> {
        let Some(alert) = self.alert() else {
            return Ok(());
        };
        let monitors: Vec<Arc<dyn InterruptionMonitor>> = self
            .lock_monitors()
            .iter()
            .rev()
            .map(|(_, m)| m.clone())
            .collect();

        for monitor in monitors {
            match monitor.handle(&alert) {
                MonitorDecision::Tap(button) => {
                    if !alert.has_button(&button) {
                        return Err(HealthError::AlertNotHandled {
                            title: alert.title.clone(),
                            reason: format!(
                                "monitor '{}' chose missing button '{}'",
                                monitor.description(),
                                button
                            ),
                        });
                    }
                    debug!(title = %alert.title, button = %button, "monitor handled alert");
                    self.lock().tap_alert_button(&button);
                    return Ok(());
                }
                MonitorDecision::Decline => continue,
                MonitorDecision::Fail(reason) => {
                    return Err(HealthError::AlertNotHandled {
                        title: alert.title.clone(),
                        reason,
                    });
                }
            }
        }
        Ok(())
    }

    fn poll_interval(&self) -> Duration {
        self.poll_interval
    }
}
