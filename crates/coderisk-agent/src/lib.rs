//! Phase 2 investigation agent: a deterministic reducer (`reducer`) driving
//! an LLM chat loop over `AgentState` (`state`), a fixed system prompt
//! builder (`prompt`), and the assembler that turns the reducer's terminal
//! outcome plus Phase 0/1 results into a `RiskAssessment` (`assembler`).

pub mod assembler;
pub mod prompt;
pub mod reducer;
pub mod state;

pub use assembler::{assemble, BlockMode};
pub use state::{AgentState, EmergencyReason, FinishArgs, Outcome};
