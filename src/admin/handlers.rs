//! Admin API handlers.
//!
//! # Responsibilities
//! - Report overall status and alive host count
//! - List each pool's targets with their liveness and RTT, plus the backup
//! - Dump the raw health snapshot
//!
//! Every handler reads shared state only; nothing here mutates pools or health.

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use crate::admin::AdminState;
use crate::health::status::DEAD;

#[derive(Debug, Serialize, Deserialize)]
pub struct SystemStatus {
    pub version: String,
    pub status: String,
    pub pools: usize,
    pub hosts: usize,
    pub alive_hosts: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TargetStatus {
    pub url: String,
    pub authority: String,
    pub host_header: String,
    pub alive: bool,
    pub rtt_ms: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PoolStatus {
    pub port: u16,
    pub targets: Vec<TargetStatus>,
    pub backup: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HostHealth {
    pub host: String,
    pub rtt_ms: i64,
    pub alive: bool,
}

pub async fn get_status(State(state): State<AdminState>) -> Json<SystemStatus> {
    let snapshot = state.status.snapshot();
    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION").to_string(),
        status: "operational".to_string(),
        pools: state.pools.len(),
        hosts: snapshot.len(),
        alive_hosts: snapshot.iter().filter(|(_, rtt)| *rtt != DEAD).count(),
    })
}

pub async fn get_pools(State(state): State<AdminState>) -> Json<Vec<PoolStatus>> {
    let pools = state
        .pools
        .iter()
        .map(|pool| PoolStatus {
            port: pool.port(),
            targets: pool
                .backends()
                .iter()
                .map(|target| {
                    let (rtt_ms, alive) = state.status.get_status(target.authority());
                    TargetStatus {
                        url: target.url().to_string(),
                        authority: target.authority().to_string(),
                        host_header: target.host_header().to_string(),
                        alive,
                        rtt_ms,
                    }
                })
                .collect(),
            backup: pool.backup().map(|b| b.url().to_string()),
        })
        .collect();
    Json(pools)
}

pub async fn get_health(State(state): State<AdminState>) -> Json<Vec<HostHealth>> {
    Json(
        state
            .status
            .snapshot()
            .into_iter()
            .map(|(host, rtt_ms)| HostHealth {
                host,
                rtt_ms,
                alive: rtt_ms != DEAD,
            })
            .collect(),
    )
}
