use dich_types::{UpdateEvent, UpdateInfo};

#[derive(Debug, Clone, PartialEq)]
pub enum UpdateState {
    /// `last_error` is what sent the machine back here, if anything
    Idle { last_error: Option<String> },
    Checking,
    NotAvailable,
    Available(UpdateInfo),
    Downloading { info: UpdateInfo, progress: f64 },
    Downloaded(UpdateInfo),
    Installing(UpdateInfo),
}

impl Default for UpdateState {
    fn default() -> Self {
        UpdateState::Idle { last_error: None }
    }
}

impl UpdateState {
    pub fn label(&self) -> &'static str {
        match self {
            UpdateState::Idle { last_error: Some(_) } => "error",
            UpdateState::Idle { last_error: None } => "idle",
            UpdateState::Checking => "checking",
            UpdateState::NotAvailable => "not-available",
            UpdateState::Available(_) => "available",
            UpdateState::Downloading { .. } => "downloading",
            UpdateState::Downloaded(_) => "downloaded",
            UpdateState::Installing(_) => "installing",
        }
    }

    pub fn info(&self) -> Option<&UpdateInfo> {
        match self {
            UpdateState::Available(info)
            | UpdateState::Downloading { info, .. }
            | UpdateState::Downloaded(info)
            | UpdateState::Installing(info) => Some(info),
            _ => None,
        }
    }

    /// A check or transfer is under way
    pub fn is_busy(&self) -> bool {
        matches!(
            self,
            UpdateState::Checking | UpdateState::Downloading { .. } | UpdateState::Installing(_)
        )
    }

    /// Next state after a channel event. Events that make no sense in the
    /// current state leave it unchanged.
    pub fn on_event(self, event: &UpdateEvent) -> UpdateState {
        match (self, event) {
            (_, UpdateEvent::Error(message)) => UpdateState::Idle {
                last_error: Some(message.clone()),
            },
            (_, UpdateEvent::Checking) => UpdateState::Checking,
            (UpdateState::Checking, UpdateEvent::Available(info)) => {
                UpdateState::Available(info.clone())
            }
            (UpdateState::Checking, UpdateEvent::NotAvailable) => UpdateState::NotAvailable,
            (UpdateState::Available(info), UpdateEvent::Progress(p))
            | (UpdateState::Downloading { info, .. }, UpdateEvent::Progress(p)) => {
                UpdateState::Downloading {
                    info,
                    progress: p.clamp(0.0, 100.0),
                }
            }
            (
                UpdateState::Available(_) | UpdateState::Downloading { .. },
                UpdateEvent::Downloaded(info),
            ) => UpdateState::Downloaded(info.clone()),
            (state, event) => {
                tracing::debug!("Ignoring {:?} in state {}", event, state.label());
                state
            }
        }
    }
}
