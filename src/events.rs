use crate::error::ControllerError;

// Event types sent from controllers to the manager
#[derive(Debug, Clone, PartialEq)]
pub enum ControllerEvent {
    Error {
        key: &'static str,
        error: ControllerError,
    },
    Ended {
        key: &'static str,
    },
    Hooked {
        key: &'static str,
    },
    Resync {
        key: &'static str,
    },
    Seeked {
        key: &'static str,
    },
    ShowSpinner,
    HideSpinner,
}

impl ControllerEvent {
    // Get the name of the manager callback this event stands for
    pub fn event_type(&self) -> &'static str {
        match self {
            ControllerEvent::Error { .. } => "controllerError",
            ControllerEvent::Ended { .. } => "controllerEnded",
            ControllerEvent::Hooked { .. } => "controllerHooked",
            ControllerEvent::Resync { .. } => "controllerResync",
            ControllerEvent::Seeked { .. } => "seeked",
            ControllerEvent::ShowSpinner => "showSpinner",
            ControllerEvent::HideSpinner => "hideSpinner",
        }
    }

    /// Key of the controller that raised the event, if it is controller-scoped.
    pub fn key(&self) -> Option<&'static str> {
        match self {
            ControllerEvent::Error { key, .. }
            | ControllerEvent::Ended { key }
            | ControllerEvent::Hooked { key }
            | ControllerEvent::Resync { key }
            | ControllerEvent::Seeked { key } => Some(key),
            ControllerEvent::ShowSpinner | ControllerEvent::HideSpinner => None,
        }
    }

    /// If this event is an error report, returns the error
    pub fn error(&self) -> Option<&ControllerError> {
        match self {
            ControllerEvent::Error { error, .. } => Some(error),
            _ => None,
        }
    }
}
