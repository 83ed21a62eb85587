//! Network layer for Branchline.
//!
//! [`ReqwestTransport`] is the only component that touches the network;
//! [`RemoteClient`] turns the conversation service's endpoints into typed
//! calls on top of any [`Transport`](branchline_core::transport::Transport).

pub mod client;
pub mod reqwest_transport;

pub use client::RemoteClient;
pub use reqwest_transport::ReqwestTransport;
