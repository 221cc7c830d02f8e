// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use serde::{Deserialize, Serialize};

use super::WorkUnit;

/// How the invocation endpoint should run a function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InvocationType {
    /// Fire and forget; nothing comes back but an acceptance status.
    Event,
    /// Wait for the function and return its response.
    RequestResponse,
}

/// Body of one outer invocation of the fan-out relay. The relay invokes
/// `function_name` once per payload with `invocation_type`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvocationGroup {
    pub function_name: String,
    pub invocation_type: InvocationType,
    pub payloads: Vec<WorkUnit>,
}

/// What a worker returns from a request/response invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvocationResponse {
    pub status: u16,
    #[serde(default)]
    pub result_file: Option<String>,
}

/// A synchronous invocation that came back, with its decoded log tail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvocationOutcome {
    pub unit: WorkUnit,
    pub response: InvocationResponse,
    pub log_tail: Option<String>,
}

/// One message of a queue batch. Ids are unique within a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueEntry {
    pub id: String,
    pub body: String,
}

impl QueueEntry {
    pub fn for_unit(index: usize, unit: &WorkUnit) -> Self {
        Self {
            id: format!("unit-{}", index),
            body: unit.to_body(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_group_wire_shape() {
        let group = InvocationGroup {
            function_name: "robots-worker".into(),
            invocation_type: InvocationType::Event,
            payloads: vec![WorkUnit::new(0, 2, 2)],
        };

        let value = serde_json::to_value(&group).unwrap();
        assert_eq!(value["function_name"], "robots-worker");
        assert_eq!(value["invocation_type"], "Event");
        assert_eq!(value["payloads"][0]["end_pos"], 2);
    }

    #[test]
    fn test_response_without_file() {
        let response: InvocationResponse = serde_json::from_str(r#"{"status": 200}"#).unwrap();
        assert_eq!(response.result_file, None);
    }
}
