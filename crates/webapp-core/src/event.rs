use crate::ids::WindowId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadStatus {
    Started,
    Stopped,
    Succeeded,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppEvent {
    StagePreparing {
        window_id: WindowId,
    },
    StageReady {
        window_id: WindowId,
    },
    Show {
        window_id: WindowId,
    },
    Hide {
        window_id: WindowId,
    },
    SetKeepAlive {
        window_id: WindowId,
        keep_alive: bool,
    },
    LoadChanged {
        window_id: WindowId,
        status: LoadStatus,
    },
    ShowTimerFired {
        window_id: WindowId,
    },
    ExecuteScript {
        window_id: WindowId,
        script: String,
    },
    WindowClosed {
        window_id: WindowId,
    },
    NewWindowRequested {
        url: String,
    },
    Relaunch {
        parameters: String,
    },
    ActivityFocusChanged {
        focused: bool,
    },
}
