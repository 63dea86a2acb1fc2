//! Scripted provider for tests.

use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::VecDeque;
use std::sync::Mutex;

use gatewatch_core::types::FlightStatus;
use gatewatch_core::ProviderError;

use crate::FlightProvider;

/// Returns queued responses in order and counts calls. An exhausted script
/// answers `NotFound`.
#[derive(Default)]
pub struct ScriptedProvider {
    responses: Mutex<VecDeque<Result<FlightStatus, ProviderError>>>,
    calls: Mutex<usize>,
}

impl ScriptedProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, response: Result<FlightStatus, ProviderError>) {
        self.responses.lock().unwrap().push_back(response);
    }

    pub fn calls(&self) -> usize {
        *self.calls.lock().unwrap()
    }
}

#[async_trait]
impl FlightProvider for ScriptedProvider {
    async fn fetch_status(
        &self,
        _flight_number: &str,
        _date: NaiveDate,
    ) -> Result<FlightStatus, ProviderError> {
        *self.calls.lock().unwrap() += 1;
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Err(ProviderError::NotFound))
    }
}
