use std::sync::Arc;

use embed_controllers::{AudioContext, AudioTap, ControllerError, ControllerEvent, ElementRef, Manager};

struct NullTap;

impl AudioTap for NullTap {
    fn disconnect(&mut self) {}
}

struct NullAudio;

impl AudioContext for NullAudio {
    fn create_media_source(&self, _element: &ElementRef) -> Box<dyn AudioTap> {
        Box::new(NullTap)
    }
}

fn manager() -> Manager {
    Manager::with_capacity(Arc::new(NullAudio), 16)
}

// Test the callback names events stand for
#[test]
fn test_event_types() {
    let cases = [
        (
            ControllerEvent::Error {
                key: "frame",
                error: ControllerError::SourceError,
            },
            "controllerError",
        ),
        (ControllerEvent::Ended { key: "frame" }, "controllerEnded"),
        (ControllerEvent::Hooked { key: "frame" }, "controllerHooked"),
        (ControllerEvent::Resync { key: "twitch" }, "controllerResync"),
        (ControllerEvent::Seeked { key: "youtube" }, "seeked"),
        (ControllerEvent::ShowSpinner, "showSpinner"),
        (ControllerEvent::HideSpinner, "hideSpinner"),
    ];

    for (event, event_type) in cases {
        assert_eq!(event.event_type(), event_type);
    }
}

// Test controller-scoped accessors
#[test]
fn test_event_key_and_error() {
    let event = ControllerEvent::Error {
        key: "twitch",
        error: ControllerError::TwitchChannelOffline,
    };
    assert_eq!(event.key(), Some("twitch"));
    assert_eq!(event.error(), Some(&ControllerError::TwitchChannelOffline));

    assert_eq!(ControllerEvent::Resync { key: "twitch" }.error(), None);
    assert_eq!(ControllerEvent::ShowSpinner.key(), None);
}

// Test that every subscriber receives manager callbacks in order
#[tokio::test]
async fn test_manager_fan_out() {
    let manager = manager();
    let mut first = manager.subscribe();
    let mut second = manager.clone().subscribe();

    manager.show_spinner();
    manager.controller_hooked("frame");
    manager.controller_error("frame", ControllerError::SourceNotFound);
    manager.hide_spinner();

    for rx in [&mut first, &mut second] {
        assert_eq!(rx.recv().await.unwrap(), ControllerEvent::ShowSpinner);
        assert_eq!(rx.recv().await.unwrap(), ControllerEvent::Hooked { key: "frame" });
        assert_eq!(
            rx.recv().await.unwrap().error(),
            Some(&ControllerError::SourceNotFound)
        );
        assert_eq!(rx.recv().await.unwrap(), ControllerEvent::HideSpinner);
    }
}

// Test that reporting without subscribers is harmless
#[test]
fn test_manager_without_subscribers() {
    let manager = manager();
    manager.controller_ended("youtube");
    manager.seeked("youtube");

    let mut late = manager.subscribe();
    assert!(late.try_recv().is_err());
}
