//! A compiler wrapper that pins a build to an exact set of optimization flags.
//!
//! The wrapper is invoked in place of `cc`/`c++`. It drops every optimization
//! level flag, adds an `-O0` baseline, removes the known optimization flags
//! that are not enabled, forces the enabled ones on and then runs the real
//! compiler with the result.

pub mod driver;
pub mod error;
pub mod invocation;
pub mod policy;
pub mod rewrite;
