//! In-memory monitoring backend for poller and scheduler tests.

use crate::client::{FetchError, MonitorApi};
use crate::metrics::Snapshot;
use async_trait::async_trait;
use std::sync::Mutex;

/// Answers with whatever was last set; `None` makes the call fail.
#[derive(Default)]
pub struct FakeApi {
    latest: Mutex<Option<Snapshot>>,
    history: Mutex<Option<Vec<Snapshot>>>,
    latest_calls: Mutex<usize>,
    history_calls: Mutex<Vec<(u32, Option<String>)>>,
}

impl FakeApi {
    pub fn new() -> Self {
        Self {
            latest: Mutex::new(Some(Snapshot::default())),
            history: Mutex::new(Some(Vec::new())),
            ..Default::default()
        }
    }

    pub fn set_latest(&self, snapshot: Option<Snapshot>) {
        *self.latest.lock().unwrap() = snapshot;
    }

    pub fn set_history(&self, series: Option<Vec<Snapshot>>) {
        *self.history.lock().unwrap() = series;
    }

    pub fn latest_calls(&self) -> usize {
        *self.latest_calls.lock().unwrap()
    }

    pub fn history_calls(&self) -> Vec<(u32, Option<String>)> {
        self.history_calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl MonitorApi for FakeApi {
    async fn latest(&self) -> Result<Snapshot, FetchError> {
        *self.latest_calls.lock().unwrap() += 1;
        self.latest
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| FetchError::Backend("latest.json not found yet".into()))
    }

    async fn history(&self, n: u32, device: Option<&str>) -> Result<Vec<Snapshot>, FetchError> {
        self.history_calls
            .lock()
            .unwrap()
            .push((n, device.map(str::to_string)));
        self.history
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| FetchError::Backend("history unavailable".into()))
    }
}
