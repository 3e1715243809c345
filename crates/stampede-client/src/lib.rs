// Typed client for the load-test target service
//
// Consumes the target only through its documented HTTP contract: the
// {success, data, error, meta} envelope, plus /health (accepted bare or
// enveloped). The TargetApi trait is the seam the runner and its tests
// depend on.

pub mod client;
pub mod error;
pub mod types;

pub use client::{ApiResult, TargetApi, TargetClient, TargetOptions};
pub use error::{ClientError, ClientResult};
pub use types::{ApiEnvelope, Health, MemoryInfo, Meta, NewPost, NewUser, Post, User};
