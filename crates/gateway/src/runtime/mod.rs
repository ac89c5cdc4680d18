//! Call runtime: acceptance, per-call session state machines and the
//! supervisor that runs them.

pub mod acceptor;
pub mod agent;
pub mod functions;
pub mod session;
pub mod supervisor;

pub use acceptor::{AcceptOutcome, CallAcceptor};
pub use agent::{AgentConfig, AgentResolver};
pub use session::{run_call, CallReport, CallSession, CallState, Reaction, SessionContext};
pub use supervisor::{ActiveCall, SessionSupervisor};
