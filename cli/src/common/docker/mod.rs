//! # Harness Docker Fixtures (`common::docker`)
//!
//! File: cli/src/common/docker/mod.rs
//!
//! ## Overview
//!
//! Thin glue over `bollard` for the containers and networks a run needs. Every
//! daemon call is bounded by a lifecycle `Scope` supplied by the caller: the
//! starting scope while bringing fixtures up, the terminating scope while
//! tearing them down.
//!
//! ## Architecture
//!
//! - **`connect`**: `connect_docker`, one client per run.
//! - **`network`**: `Network`, the internal network joining the participants.
//! - **`fixture`**: `Fixture`, one participant's container and its log capture.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use harness::common::docker::{connect_docker, Fixture, Network};
//! use harness::common::lifecycle::PhasedContext;
//! use harness::common::participant::Participant;
//! use harness::core::config::LifecycleConfig;
//!
//! # async fn run(server: Participant) -> anyhow::Result<()> {
//! let ctx = PhasedContext::from_config(&LifecycleConfig::default());
//! let docker = connect_docker().await?;
//! let network = Network::create_internal(&docker, ctx.starting(), "harness").await?;
//! let fixture = Fixture::start(&docker, ctx.starting(), &server, std::slice::from_ref(&network)).await?;
//! // ... exercise the fixture ...
//! fixture.stop(ctx.terminating()).await?;
//! network.remove(ctx.terminating()).await?;
//! # Ok(())
//! # }
//! ```
//!

pub mod connect;
pub mod fixture;
pub mod network;

pub use connect::connect_docker;
pub use fixture::Fixture;
pub use network::Network;
