use crate::format::{display_or_dash, format_metric, state_class, PLACEHOLDER};
use crate::metrics::{Snapshot, StateClass};
use crate::registry::DeviceRegistry;
use tokio::sync::watch;
use tracing::debug;

/// Window sizes offered by the window control, in minutes.
pub const WINDOW_PRESETS: [u32; 6] = [1, 5, 10, 15, 30, 60];

/// User-adjustable parameters read by every history refresh.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewParams {
    pub window_minutes: u32,
    /// Empty means all devices.
    pub device_filter: String,
}

impl ViewParams {
    pub fn new(window_minutes: u32, device_filter: impl Into<String>) -> Self {
        Self {
            window_minutes: window_minutes.max(1),
            device_filter: device_filter.into(),
        }
    }

    pub fn device(&self) -> Option<&str> {
        Some(self.device_filter.as_str()).filter(|d| !d.is_empty())
    }
}

impl Default for ViewParams {
    fn default() -> Self {
        Self::new(10, "")
    }
}

fn wider_window(minutes: u32) -> u32 {
    WINDOW_PRESETS
        .iter()
        .copied()
        .find(|&p| p > minutes)
        .unwrap_or(minutes)
}

fn narrower_window(minutes: u32) -> u32 {
    WINDOW_PRESETS
        .iter()
        .rev()
        .copied()
        .find(|&p| p < minutes)
        .unwrap_or(minutes)
}

/// Handle held by the input side. Every effective change is published to the
/// scheduler, which answers it with an immediate history refresh.
pub struct ViewControls {
    tx: watch::Sender<ViewParams>,
}

impl ViewControls {
    pub fn new(initial: ViewParams) -> (Self, watch::Receiver<ViewParams>) {
        let (tx, rx) = watch::channel(initial);
        (Self { tx }, rx)
    }

    pub fn current(&self) -> ViewParams {
        self.tx.borrow().clone()
    }

    pub fn set_window(&self, minutes: u32) -> bool {
        let minutes = minutes.max(1);
        self.update(|p| {
            if p.window_minutes == minutes {
                return false;
            }
            p.window_minutes = minutes;
            true
        })
    }

    pub fn widen(&self) -> bool {
        self.set_window(wider_window(self.current().window_minutes))
    }

    pub fn narrow(&self) -> bool {
        self.set_window(narrower_window(self.current().window_minutes))
    }

    pub fn set_device(&self, device: &str) -> bool {
        self.update(|p| {
            if p.device_filter == device {
                return false;
            }
            p.device_filter = device.to_string();
            true
        })
    }

    /// Moves the device filter to the next registry entry.
    pub fn cycle_device(&self, registry: &DeviceRegistry) -> bool {
        let next = registry.next_after(&self.current().device_filter);
        self.set_device(&next)
    }

    fn update(&self, modify: impl FnOnce(&mut ViewParams) -> bool) -> bool {
        let changed = self.tx.send_if_modified(modify);
        if changed {
            let params = self.current();
            debug!(?params, "View parameters changed");
        }
        changed
    }
}

/// Scalar fields of the status panel, mutated in place on every latest refresh.
#[derive(Debug, Clone, PartialEq)]
pub struct LatestView {
    pub state: String,
    pub state_class: Option<StateClass>,
    pub rssi: String,
    pub router_ms: String,
    pub linux_ms: String,
    pub device: String,
    pub ts: String,
}

impl Default for LatestView {
    fn default() -> Self {
        Self {
            state: PLACEHOLDER.to_string(),
            state_class: None,
            rssi: PLACEHOLDER.to_string(),
            router_ms: PLACEHOLDER.to_string(),
            linux_ms: PLACEHOLDER.to_string(),
            device: PLACEHOLDER.to_string(),
            ts: PLACEHOLDER.to_string(),
        }
    }
}

impl LatestView {
    pub fn apply(&mut self, snapshot: &Snapshot) {
        self.state = snapshot
            .state
            .as_deref()
            .filter(|s| !s.is_empty())
            .unwrap_or(PLACEHOLDER)
            .to_uppercase();
        self.state_class = state_class(&self.state);
        self.rssi = format_metric(snapshot.rssi);
        self.router_ms = format_metric(snapshot.router_ms);
        self.linux_ms = format_metric(snapshot.linux_ms);
        self.device = display_or_dash(snapshot.device.as_deref());
        self.ts = display_or_dash(snapshot.ts.as_deref());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_fields_render_placeholder() {
        let mut view = LatestView::default();
        view.apply(&Snapshot {
            state: Some("ok".into()),
            rssi: Some(-58.0),
            ..Default::default()
        });
        view.apply(&Snapshot::default());

        for field in [&view.rssi, &view.router_ms, &view.linux_ms, &view.device, &view.ts] {
            assert_eq!(field, "-");
        }
        assert_eq!(view.state, "-");
        assert_eq!(view.state_class, None);
    }

    #[test]
    fn state_is_uppercased_and_classed() {
        let mut view = LatestView::default();
        view.apply(&Snapshot {
            state: Some("degraded".into()),
            rssi: Some(-71.0),
            router_ms: Some(3.5),
            linux_ms: Some(48.0),
            device: Some("esp32-a".into()),
            ts: Some("2026-02-03T04:12:30Z".into()),
        });
        assert_eq!(view.state, "DEGRADED");
        assert_eq!(view.state_class, Some(StateClass::Degraded));
        assert_eq!(view.rssi, "-71");
        assert_eq!(view.router_ms, "3.5");
        assert_eq!(view.linux_ms, "48");
        assert_eq!(view.device, "esp32-a");
        assert_eq!(view.ts, "2026-02-03T04:12:30Z");
    }

    #[test]
    fn repeated_updates_replace_the_class() {
        let mut view = LatestView::default();
        for state in ["OK", "OK", "DOWN", "weird", "RECOVERING", "RECOVERING"] {
            view.apply(&Snapshot {
                state: Some(state.into()),
                ..Default::default()
            });
        }
        assert_eq!(view.state_class, Some(StateClass::Recovering));

        view.apply(&Snapshot {
            state: Some("weird".into()),
            ..Default::default()
        });
        assert_eq!(view.state, "WEIRD");
        assert_eq!(view.state_class, None);
    }

    #[test]
    fn window_is_clamped_and_steps_through_presets() {
        assert_eq!(ViewParams::new(0, "").window_minutes, 1);
        assert_eq!(wider_window(10), 15);
        assert_eq!(wider_window(12), 15);
        assert_eq!(wider_window(60), 60);
        assert_eq!(narrower_window(10), 5);
        assert_eq!(narrower_window(1), 1);
    }

    #[test]
    fn controls_publish_only_effective_changes() {
        let (controls, mut rx) = ViewControls::new(ViewParams::default());
        rx.borrow_and_update();

        assert!(!controls.set_window(10));
        assert!(!rx.has_changed().unwrap());

        assert!(controls.widen());
        assert!(rx.has_changed().unwrap());
        assert_eq!(rx.borrow_and_update().window_minutes, 15);

        assert!(controls.set_device("esp32-a"));
        assert!(!controls.set_device("esp32-a"));
        assert_eq!(rx.borrow_and_update().device(), Some("esp32-a"));
    }

    #[test]
    fn cycling_device_follows_the_registry() {
        let mut registry = DeviceRegistry::new();
        registry.insert("esp32-a");
        let (controls, _rx) = ViewControls::new(ViewParams::default());

        assert!(controls.cycle_device(&registry));
        assert_eq!(controls.current().device_filter, "esp32-a");
        assert!(controls.cycle_device(&registry));
        assert_eq!(controls.current().device(), None);
    }
}
