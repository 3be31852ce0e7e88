//! Agent-based monitoring
//!
//! Each agent runs as an independent tokio task and is controlled through a cloneable handle.
//!
//! ## Architecture Overview
//!
//! ```text
//!                       ┌──────────────────┐
//!                       │ AgentSupervisor  │
//!                       └────────┬─────────┘
//!                                │ start_all / stop_all
//!                 ┌──────────────┴──────────────┐
//!                 │                             │
//!      ┌──────────▼──────────┐       ┌──────────▼──────────┐
//!      │ SystemMonitoring    │       │ HealthCheck         │
//!      │ SystemCollector     │       │ HealthCollector     │
//!      │ SystemProcessor     │       │ HealthProcessor     │
//!      └──────────┬──────────┘       └──────────┬──────────┘
//!                 │ push                        │ overwrite
//!      ┌──────────▼──────────┐       ┌──────────▼──────────┐
//!      │ HistoryBuffer       │       │ Option<HealthStatus>│
//!      └──────────┬──────────┘       └──────────┬──────────┘
//!                 └──────────────┬──────────────┘
//!                                │ copies
//!                       ┌────────▼─────────┐
//!                       │   MonitorQuery   │
//!                       └──────────────────┘
//! ```
//!
//! ## Communication Patterns
//!
//! 1. **Commands**: every agent has an mpsc command channel for control messages
//! 2. **Request/Response**: oneshot channels for queries to the agent task
//! 3. **State**: lifecycle state is published on a watch channel

pub mod agent;
pub mod health;
pub mod messages;
pub mod supervisor;
pub mod system;
