use std::fmt::{Display, Formatter, Result as FmtResult};
use std::time::Duration;

use crate::effect::Effect;
use crate::event::LoadStatus;
use crate::ids::WindowId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum WindowType {
    #[default]
    Card,
    Launcher,
}

impl WindowType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Card => "card",
            Self::Launcher => "launcher",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "card" => Some(Self::Card),
            "launcher" => Some(Self::Launcher),
            _ => None,
        }
    }
}

impl Display for WindowType {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}

/// Staged visibility of one application window.
///
/// A window starts out preparing and hidden. It becomes visible once content signals
/// `stage_ready`, or once the fallback timer armed after a successful load fires.
#[derive(Debug, Clone, PartialEq)]
pub struct WindowState {
    id: WindowId,
    url: String,
    window_type: WindowType,
    headless: bool,
    stage_preparing: bool,
    stage_ready: bool,
    keep_alive: bool,
    visible: bool,
    show_timer_armed: bool,
    zoom_factor: f64,
    show_timeout: Duration,
}

impl WindowState {
    pub fn new(
        id: WindowId,
        url: impl Into<String>,
        window_type: WindowType,
        headless: bool,
        zoom_factor: f64,
        show_timeout: Duration,
    ) -> Self {
        Self {
            id,
            url: url.into(),
            window_type,
            headless,
            stage_preparing: true,
            stage_ready: false,
            keep_alive: false,
            visible: false,
            show_timer_armed: false,
            zoom_factor,
            show_timeout,
        }
    }

    pub fn id(&self) -> WindowId {
        self.id
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn window_type(&self) -> WindowType {
        self.window_type
    }

    pub fn headless(&self) -> bool {
        self.headless
    }

    pub fn is_preparing(&self) -> bool {
        self.stage_preparing
    }

    pub fn is_ready(&self) -> bool {
        self.stage_ready
    }

    pub fn keep_alive(&self) -> bool {
        self.keep_alive
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn show_timer_armed(&self) -> bool {
        self.show_timer_armed
    }

    pub fn set_keep_alive(&mut self, keep_alive: bool) {
        self.keep_alive = keep_alive;
    }

    pub fn creation_effect(&self) -> Effect {
        Effect::CreateWindow {
            window_id: self.id,
            url: self.url.clone(),
            window_type: self.window_type,
            headless: self.headless,
        }
    }

    pub fn stage_preparing(&mut self) -> Vec<Effect> {
        self.stage_preparing = true;
        Vec::new()
    }

    pub fn stage_ready(&mut self) -> Vec<Effect> {
        self.stage_preparing = false;
        self.stage_ready = true;

        let mut effects = Vec::new();
        if self.show_timer_armed {
            self.show_timer_armed = false;
            effects.push(Effect::CancelShowTimer { window_id: self.id });
        }
        effects.extend(self.show());
        effects
    }

    pub fn load_changed(&mut self, status: LoadStatus) -> Vec<Effect> {
        match status {
            LoadStatus::Started => {
                return vec![Effect::SetupPage {
                    window_id: self.id,
                    zoom_factor: self.zoom_factor,
                }];
            }
            LoadStatus::Stopped | LoadStatus::Failed => return Vec::new(),
            LoadStatus::Succeeded => {}
        }

        if self.headless {
            return Vec::new();
        }

        if self.stage_preparing && !self.stage_ready && !self.show_timer_armed {
            self.show_timer_armed = true;
            vec![Effect::StartShowTimer {
                window_id: self.id,
                delay: self.show_timeout,
            }]
        } else if !self.stage_preparing && self.stage_ready && !self.visible {
            // stage_ready arrived while the page was still loading
            self.show()
        } else {
            Vec::new()
        }
    }

    /// A firing for a timer that was already cancelled is ignored.
    pub fn show_timer_fired(&mut self) -> Vec<Effect> {
        if !self.show_timer_armed {
            return Vec::new();
        }
        self.show_timer_armed = false;
        self.stage_ready()
    }

    pub fn show(&mut self) -> Vec<Effect> {
        if self.headless || self.visible {
            return Vec::new();
        }
        self.visible = true;
        vec![Effect::ShowWindow { window_id: self.id }]
    }

    pub fn hide(&mut self) -> Vec<Effect> {
        if self.headless || !self.visible {
            return Vec::new();
        }
        self.visible = false;
        vec![Effect::HideWindow { window_id: self.id }]
    }

    pub fn execute_script(&self, script: impl Into<String>) -> Effect {
        Effect::ExecuteScript {
            window_id: self.id,
            script: script.into(),
        }
    }

    /// Cancels a pending fallback timer as part of teardown.
    pub(crate) fn teardown(&mut self) -> Vec<Effect> {
        let mut effects = Vec::new();
        if self.show_timer_armed {
            self.show_timer_armed = false;
            effects.push(Effect::CancelShowTimer { window_id: self.id });
        }
        effects.push(Effect::DestroyWindow { window_id: self.id });
        effects
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::{WindowState, WindowType};
    use crate::effect::Effect;
    use crate::event::LoadStatus;
    use crate::ids::WindowId;

    const TIMEOUT: Duration = Duration::from_millis(3000);

    fn window(headless: bool) -> WindowState {
        WindowState::new(
            WindowId(1),
            "file:///usr/palm/applications/app/index.html",
            WindowType::Card,
            headless,
            1.0,
            TIMEOUT,
        )
    }

    fn show_count(effects: &[Effect]) -> usize {
        effects
            .iter()
            .filter(|effect| matches!(effect, Effect::ShowWindow { .. }))
            .count()
    }

    #[test]
    fn starts_preparing_and_hidden() {
        let window = window(false);
        assert!(window.is_preparing());
        assert!(!window.is_ready());
        assert!(!window.is_visible());
        assert!(!window.keep_alive());
    }

    #[test]
    fn load_started_requests_page_setup() {
        let mut window = window(false);
        assert_eq!(
            window.load_changed(LoadStatus::Started),
            vec![Effect::SetupPage {
                window_id: WindowId(1),
                zoom_factor: 1.0
            }]
        );
        assert!(window.load_changed(LoadStatus::Stopped).is_empty());
        assert!(window.load_changed(LoadStatus::Failed).is_empty());
    }

    #[test]
    fn load_success_arms_fallback_timer_once() {
        let mut window = window(false);
        let effects = window.load_changed(LoadStatus::Succeeded);
        assert_eq!(
            effects,
            vec![Effect::StartShowTimer {
                window_id: WindowId(1),
                delay: TIMEOUT
            }]
        );
        assert!(window.show_timer_armed());

        assert!(window.load_changed(LoadStatus::Succeeded).is_empty());
    }

    #[test]
    fn stage_ready_cancels_timer_and_shows_exactly_once() {
        let mut window = window(false);
        window.load_changed(LoadStatus::Succeeded);

        let effects = window.stage_ready();
        assert_eq!(
            effects,
            vec![
                Effect::CancelShowTimer {
                    window_id: WindowId(1)
                },
                Effect::ShowWindow {
                    window_id: WindowId(1)
                },
            ]
        );
        assert!(!window.show_timer_armed());
        assert!(window.is_ready());
        assert!(!window.is_preparing());

        assert!(window.stage_ready().is_empty());
        assert!(window.show_timer_fired().is_empty());
    }

    #[test]
    fn fallback_timer_forces_visibility_once() {
        let mut window = window(false);
        window.load_changed(LoadStatus::Succeeded);

        let effects = window.show_timer_fired();
        assert_eq!(show_count(&effects), 1);
        assert!(window.is_ready());
        assert!(window.is_visible());

        assert!(window.show_timer_fired().is_empty());
        assert!(window.stage_ready().is_empty());
    }

    #[test]
    fn ready_before_load_finishes_shows_without_timer() {
        let mut window = window(false);
        window.load_changed(LoadStatus::Started);
        let effects = window.stage_ready();
        assert_eq!(show_count(&effects), 1);

        window.hide();
        let effects = window.load_changed(LoadStatus::Succeeded);
        assert_eq!(
            effects,
            vec![Effect::ShowWindow {
                window_id: WindowId(1)
            }]
        );
        assert!(!window.show_timer_armed());
    }

    #[test]
    fn stage_preparing_is_reentrant() {
        let mut window = window(false);
        assert!(window.stage_preparing().is_empty());
        assert!(window.stage_preparing().is_empty());
        assert!(window.is_preparing());
        assert!(!window.is_ready());
    }

    #[test]
    fn headless_window_is_never_shown() {
        let mut window = window(true);
        assert!(window.load_changed(LoadStatus::Succeeded).is_empty());
        assert!(window.stage_ready().is_empty());
        assert!(window.show().is_empty());
        assert!(!window.is_visible());
        assert!(window.is_ready());
    }

    #[test]
    fn hide_then_show_toggles_visibility() {
        let mut window = window(false);
        assert!(window.hide().is_empty());
        assert_eq!(show_count(&window.show()), 1);
        assert_eq!(
            window.hide(),
            vec![Effect::HideWindow {
                window_id: WindowId(1)
            }]
        );
        assert!(!window.is_visible());
    }

    #[test]
    fn window_type_parses_known_names() {
        assert_eq!(WindowType::parse("launcher"), Some(WindowType::Launcher));
        assert_eq!(WindowType::parse("dashboard"), None);
        assert_eq!(WindowType::Card.to_string(), "card");
    }
}
