pub mod application;
pub mod description;
pub mod effect;
pub mod event;
pub mod identity;
pub mod ids;
pub mod lifecycle;
pub mod policy;
pub mod validator;
pub mod window;

pub use application::{Activity, Application, ApplicationError, MAIN_WINDOW_ID, RELAUNCH_SCRIPT};
pub use description::{ApplicationDescription, DescriptionError, DEFAULT_ICON};
pub use effect::Effect;
pub use event::{AppEvent, LoadStatus};
pub use identity::{is_privileged, ApplicationIdentity, TrustScope, PRIVILEGED_ID_PREFIXES};
pub use ids::{CallbackId, WindowId};
pub use lifecycle::ApplicationLifecycleObserver;
pub use policy::{LaunchPolicy, DEFAULT_SHOW_WINDOW_TIMEOUT};
pub use validator::ResourcePathValidator;
pub use window::{WindowState, WindowType};
