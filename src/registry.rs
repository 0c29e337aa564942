use crate::metrics::Snapshot;

/// Label of the implicit selector entry that clears the device filter.
pub const ALL_DEVICES: &str = "All devices";

/// Device ids seen during this session, in discovery order.
///
/// Append-only: ids are never removed, and inserting a known id is a no-op,
/// so concurrent pollers can feed it in any order.
#[derive(Debug, Default, Clone)]
pub struct DeviceRegistry {
    devices: Vec<String>,
}

impl DeviceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if `device` was not known before.
    pub fn insert(&mut self, device: &str) -> bool {
        if device.is_empty() || self.contains(device) {
            return false;
        }
        self.devices.push(device.to_string());
        true
    }

    pub fn contains(&self, device: &str) -> bool {
        self.devices.iter().any(|d| d == device)
    }

    pub fn has_real_options(&self) -> bool {
        !self.devices.is_empty()
    }

    /// The latest snapshot only seeds an empty selector.
    pub fn observe_latest(&mut self, snapshot: &Snapshot) -> bool {
        match snapshot.device_id() {
            Some(device) if !self.has_real_options() => self.insert(device),
            _ => false,
        }
    }

    /// Adds every previously unseen device in `series`. Returns how many were new.
    pub fn observe_history(&mut self, series: &[Snapshot]) -> usize {
        series
            .iter()
            .filter_map(Snapshot::device_id)
            .filter(|device| self.insert(device))
            .count()
    }

    pub fn options(&self) -> &[String] {
        &self.devices
    }

    /// `(value, label)` pairs for the selector, "all devices" first with an empty value.
    pub fn selector_entries(&self) -> Vec<(&str, &str)> {
        std::iter::once(("", ALL_DEVICES))
            .chain(self.devices.iter().map(|d| (d.as_str(), d.as_str())))
            .collect()
    }

    /// Next selector value after `current`, wrapping back to all devices.
    pub fn next_after(&self, current: &str) -> String {
        if current.is_empty() {
            return self.devices.first().cloned().unwrap_or_default();
        }
        match self.devices.iter().position(|d| d == current) {
            Some(i) => self.devices.get(i + 1).cloned().unwrap_or_default(),
            None => String::new(),
        }
    }
}
