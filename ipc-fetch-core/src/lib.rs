//! Core wire types for ipc-fetch.
//!
//! This crate provides the contract shared by the client (`ipc-fetch`) and any
//! host that executes requests on its behalf (`ipc-fetch-host`).
//!
//! ## Modules
//!
//! - [`error`]: The RPC substrate error and the cancellation sentinel
//! - [`chunk`]: Body chunk framing (payload + trailing control byte)
//! - [`wire`]: Serde payloads exchanged by the open/send calls
//! - [`rpc`]: The [`HostRpc`] trait and the push channel used for bodies
//! - [`state`]: Lifecycle states of a transfer

pub mod chunk;
pub mod error;
pub mod rpc;
pub mod state;
pub mod wire;

pub use chunk::*;
pub use error::*;
pub use rpc::*;
pub use state::*;
pub use wire::*;
