//! Exec run supervision and output streaming.
//!
//! Submodules:
//! - `args`: launch options and their argument-vector mapping.
//! - `env`: two-tier child environment composition.
//! - `codec`: [`LinesCodec`](tokio_util::codec::LinesCodec)-based stdout framing.
//! - `schema`: temp-file staging for output schemas.
//! - `supervisor`: process spawn, stdin delivery and exit watching.
//! - `stream`: the lazy line sequence and exit resolution.

pub mod args;
pub mod codec;
pub mod env;
pub mod schema;
pub mod stream;
pub mod supervisor;

pub use args::{ApprovalPolicy, LaunchOptions, LaunchRequest, ReasoningEffort, SandboxMode};
pub use stream::ExecLines;
pub use supervisor::ExecSupervisor;
