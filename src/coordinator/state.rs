//! Coordination state types

use alloy::primitives::B256;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Latest readiness report from one agent for one pool
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentReadinessSignal {
    pub agent_id: String,
    pub pool_id: B256,
    pub ready: bool,
    pub pending_commitments: u32,
    pub preferred_slippage_bps: Option<u32>,
    pub timestamp: DateTime<Utc>,
}

impl AgentReadinessSignal {
    pub fn ready(agent_id: impl Into<String>, pool_id: B256, pending_commitments: u32) -> Self {
        Self {
            agent_id: agent_id.into(),
            pool_id,
            ready: true,
            pending_commitments,
            preferred_slippage_bps: None,
            timestamp: Utc::now(),
        }
    }

    pub fn not_ready(agent_id: impl Into<String>, pool_id: B256) -> Self {
        Self {
            agent_id: agent_id.into(),
            pool_id,
            ready: false,
            pending_commitments: 0,
            preferred_slippage_bps: None,
            timestamp: Utc::now(),
        }
    }

    pub fn with_slippage(mut self, bps: u32) -> Self {
        self.preferred_slippage_bps = Some(bps);
        self
    }
}

/// Parameters resolved at the moment a pool's batch window fires
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchParameters {
    pub pool_id: B256,
    /// Ready agents in signal-insertion order
    pub participating_agents: Vec<String>,
    pub total_commitments: u32,
    pub slippage_bps: u32,
    pub fired_at: DateTime<Utc>,
}

/// Event delivered to the single batch consumer when a pool fires
#[derive(Debug, Clone)]
pub struct BatchReadyEvent {
    pub pool_id: B256,
    pub params: BatchParameters,
}

/// Observable snapshot of one pool's coordination state
#[derive(Debug, Clone, Default)]
pub struct PoolStatus {
    pub total_ready: usize,
    pub ready_agents: Vec<String>,
    pub quorum_met: bool,
    pub countdown_active: bool,
    pub total_pending_commitments: u32,
    pub countdown_deadline: Option<DateTime<Utc>>,
}
