/// Receives the system-level lifecycle notifications delivered to a running application.
///
/// Only relaunch carries state; the others default to doing nothing.
pub trait ApplicationLifecycleObserver {
    fn on_relaunch(&mut self, parameters: String);

    fn on_activate(&mut self) {}

    fn on_deactivate(&mut self) {}

    fn on_suspend(&mut self) {}

    fn on_low_memory(&mut self) {}
}
