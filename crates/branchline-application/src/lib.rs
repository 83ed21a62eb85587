//! Application layer for Branchline.
//!
//! Use cases built on the domain and infrastructure layers: the overlay
//! interception rules, the overlay/fork/navigation services, and the
//! [`Branchline`] façade composing them.

pub mod branchline;
pub mod fork_service;
pub mod interceptors;
pub mod navigation_service;
pub mod overlay_service;

pub use branchline::Branchline;
pub use fork_service::ForkService;
pub use interceptors::{PhantomReadRule, PhantomWriteRule};
pub use navigation_service::NavigationService;
pub use overlay_service::OverlayService;
