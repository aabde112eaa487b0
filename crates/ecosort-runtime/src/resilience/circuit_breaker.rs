//! Circuit breaker around the generator.
//!
//! When generation fails repeatedly the circuit opens and answers come
//! straight from the deterministic templates until the recovery timeout
//! has passed.

use parking_lot::RwLock;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::{Duration, Instant};

/// What the generator is asked to do. Each task has its own circuit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GenerationTask {
    /// Text answers to chat queries
    Chat,
    /// Photo descriptions
    Vision,
}

/// Circuit breaker configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CircuitBreakerConfig {
    /// Failures before opening circuit
    pub failure_threshold: u32,

    /// Time before attempting recovery
    #[serde(deserialize_with = "crate::config::duration_human::deserialize")]
    pub recovery_timeout: Duration,

    /// Successes needed to close circuit
    pub success_threshold: u32,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 3,
            recovery_timeout: Duration::from_secs(30),
            success_threshold: 1,
        }
    }
}

/// State of a circuit.
#[derive(Debug, Clone, PartialEq)]
pub enum CircuitState {
    Closed { failures: u32 },
    Open { opened_at: Instant },
    HalfOpen { successes: u32 },
}

pub struct CircuitBreaker {
    states: RwLock<HashMap<GenerationTask, CircuitState>>,
    config: CircuitBreakerConfig,
}

impl CircuitBreaker {
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self {
            states: RwLock::new(HashMap::new()),
            config,
        }
    }

    /// True when calls for `task` should skip the generator.
    pub fn is_open(&self, task: GenerationTask) -> bool {
        let states = self.states.read();
        match states.get(&task) {
            Some(CircuitState::Open { opened_at }) => {
                if opened_at.elapsed() >= self.config.recovery_timeout {
                    drop(states);
                    self.transition_to_half_open(task);
                    false
                } else {
                    true
                }
            }
            _ => false,
        }
    }

    pub fn record_success(&self, task: GenerationTask) {
        let mut states = self.states.write();
        match states.get(&task).cloned() {
            Some(CircuitState::HalfOpen { successes }) => {
                if successes + 1 >= self.config.success_threshold {
                    states.insert(task, CircuitState::Closed { failures: 0 });
                    tracing::info!(task = ?task, "Generator circuit closed after recovery");
                } else {
                    states.insert(
                        task,
                        CircuitState::HalfOpen {
                            successes: successes + 1,
                        },
                    );
                }
            }
            Some(CircuitState::Closed { .. }) => {
                states.insert(task, CircuitState::Closed { failures: 0 });
            }
            _ => {}
        }
    }

    pub fn record_failure(&self, task: GenerationTask) {
        let mut states = self.states.write();
        let failures = match states.get(&task).cloned() {
            Some(CircuitState::Closed { failures }) => failures + 1,
            None => 1,
            Some(CircuitState::HalfOpen { .. }) => {
                states.insert(
                    task,
                    CircuitState::Open {
                        opened_at: Instant::now(),
                    },
                );
                tracing::warn!(task = ?task, "Generator circuit reopened after failed recovery");
                return;
            }
            Some(CircuitState::Open { .. }) => return,
        };

        if failures >= self.config.failure_threshold {
            states.insert(
                task,
                CircuitState::Open {
                    opened_at: Instant::now(),
                },
            );
            tracing::warn!(task = ?task, failures, "Generator circuit opened");
        } else {
            states.insert(task, CircuitState::Closed { failures });
        }
    }

    fn transition_to_half_open(&self, task: GenerationTask) {
        let mut states = self.states.write();
        if matches!(states.get(&task), Some(CircuitState::Open { .. })) {
            states.insert(task, CircuitState::HalfOpen { successes: 0 });
            tracing::info!(task = ?task, "Generator circuit half-open");
        }
    }

    pub fn state(&self, task: GenerationTask) -> CircuitState {
        self.states
            .read()
            .get(&task)
            .cloned()
            .unwrap_or(CircuitState::Closed { failures: 0 })
    }

    pub fn reset(&self) {
        self.states.write().clear();
    }
}

impl Default for CircuitBreaker {
    fn default() -> Self {
        Self::new(CircuitBreakerConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_circuit_starts_closed() {
        let cb = CircuitBreaker::default();
        assert!(!cb.is_open(GenerationTask::Chat));
        assert_eq!(cb.state(GenerationTask::Chat), CircuitState::Closed { failures: 0 });
    }

    #[test]
    fn test_opens_after_threshold() {
        let cb = CircuitBreaker::new(CircuitBreakerConfig {
            failure_threshold: 2,
            ..Default::default()
        });

        cb.record_failure(GenerationTask::Chat);
        assert!(!cb.is_open(GenerationTask::Chat));
        cb.record_failure(GenerationTask::Chat);
        assert!(cb.is_open(GenerationTask::Chat));
    }

    #[test]
    fn test_success_resets_failures() {
        let cb = CircuitBreaker::default();
        cb.record_failure(GenerationTask::Chat);
        cb.record_failure(GenerationTask::Chat);
        cb.record_success(GenerationTask::Chat);
        cb.record_failure(GenerationTask::Chat);
        cb.record_failure(GenerationTask::Chat);
        assert!(!cb.is_open(GenerationTask::Chat));
    }

    #[test]
    fn test_tasks_are_independent() {
        let cb = CircuitBreaker::new(CircuitBreakerConfig {
            failure_threshold: 1,
            ..Default::default()
        });
        cb.record_failure(GenerationTask::Vision);
        assert!(cb.is_open(GenerationTask::Vision));
        assert!(!cb.is_open(GenerationTask::Chat));
    }

    #[test]
    fn test_half_open_after_recovery_timeout() {
        let cb = CircuitBreaker::new(CircuitBreakerConfig {
            failure_threshold: 1,
            recovery_timeout: Duration::ZERO,
            success_threshold: 1,
        });
        cb.record_failure(GenerationTask::Chat);

        // Zero recovery timeout: the next check lets a trial call through
        assert!(!cb.is_open(GenerationTask::Chat));
        assert_eq!(
            cb.state(GenerationTask::Chat),
            CircuitState::HalfOpen { successes: 0 }
        );

        cb.record_success(GenerationTask::Chat);
        assert_eq!(cb.state(GenerationTask::Chat), CircuitState::Closed { failures: 0 });
    }

    #[test]
    fn test_failed_trial_call_reopens() {
        let cb = CircuitBreaker::new(CircuitBreakerConfig {
            failure_threshold: 1,
            recovery_timeout: Duration::ZERO,
            success_threshold: 1,
        });
        cb.record_failure(GenerationTask::Chat);
        assert!(!cb.is_open(GenerationTask::Chat));
        cb.record_failure(GenerationTask::Chat);
        assert!(matches!(
            cb.state(GenerationTask::Chat),
            CircuitState::Open { .. }
        ));
    }
}
