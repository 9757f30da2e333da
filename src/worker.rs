/// scheduler loop status structs
///
use serde::{Deserialize, Serialize};

pub type JsonString = String;

pub const OK: &str = "ok";
pub const DOWN: &str = "down";

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum WorkerState {
    #[default]
    Idle,
    Busy,
    Broken,
    Shutdown,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerStatus {
    pub worker_id: String,
    pub role: String,
    pub status: String,
    pub state: WorkerState,
    /// the loop's current phase, for loops that have one
    pub phase: Option<String>,
    pub passes: u64,
    pub uptime: String,
    pub error_count: u16,
}

impl WorkerStatus {
    pub fn new(
        worker_id: String,
        role: String,
        state: WorkerState,
        uptime: String,
        error_count: u16,
    ) -> WorkerStatus {
        let status = match state {
            WorkerState::Broken | WorkerState::Shutdown => DOWN,
            _ => OK,
        };

        WorkerStatus {
            worker_id,
            role,
            status: status.to_string(),
            state,
            phase: None,
            passes: 0,
            uptime,
            error_count,
        }
    }

    pub fn with_phase(mut self, phase: Option<String>) -> WorkerStatus {
        self.phase = phase;
        self
    }

    pub fn with_passes(mut self, passes: u64) -> WorkerStatus {
        self.passes = passes;
        self
    }

    pub fn to_json(&self) -> JsonString {
        match serde_json::to_string(self) {
            Ok(js) => js,
            Err(e) => {
                format!(r#"{}"status":"json parse error: {:?}"{}"#, "{", e, "}\n")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips_through_json() {
        let status = WorkerStatus::new(
            "abcdefghijklmnop".to_string(),
            "membership".to_string(),
            WorkerState::Busy,
            "0 days, 00:00:01".to_string(),
            2,
        )
        .with_phase(Some("SteadyHourly".to_string()))
        .with_passes(3);

        let js = status.to_json();
        let back: WorkerStatus = serde_json::from_str(&js).expect("valid json");
        assert_eq!(back, status);
        assert_eq!(back.status, OK);
    }

    #[test]
    fn stopped_workers_report_down() {
        let status = WorkerStatus::new(
            "id".to_string(),
            "full-refresh".to_string(),
            WorkerState::Shutdown,
            String::new(),
            0,
        );
        assert_eq!(status.status, DOWN);
        assert_eq!(status.phase, None);
    }
}
