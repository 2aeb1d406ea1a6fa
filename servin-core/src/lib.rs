//! `servin-core`: the Container & VM Lifecycle Core (§4).
//!
//! A cross-platform container runtime library. On Linux every
//! operation drives namespaces/cgroups directly through
//! [`platform`]/[`lifecycle`]; on macOS/Windows the same operations are
//! relayed into a guest VM through [`orchestrator`]/[`dispatcher`], so
//! [`runtime::ServinRuntime`] presents one uniform facade regardless of
//! host OS (§4.2).

pub mod buildfile;
pub mod disk;
pub mod dispatcher;
pub mod images;
pub mod lifecycle;
pub mod net;
pub mod orchestrator;
pub mod platform;
pub mod runtime;
pub mod store;
pub mod util;
pub mod vmm;
pub mod volumes;

pub use lifecycle::{CreateSpec, LifecycleEngine};
pub use runtime::{ServinOptions, ServinRuntime};
