//! Follow a CircleCI deployment pipeline: workflow status, job logs and the
//! URL the deploy step announces.
//!
//! [`providers::circleci::CircleCiProvider`] rebuilds a [`snapshot::RunSnapshot`]
//! from the CircleCI APIs, [`poller::StatusPoller`] refreshes it on an interval,
//! and [`session::DeploySession`] projects each snapshot into log lines and a
//! deployment URL.

pub mod auth;
pub mod cli;
pub mod config;
pub mod error;
pub mod logs;
pub mod output;
pub mod poller;
pub mod providers;
pub mod server;
pub mod session;
pub mod snapshot;
