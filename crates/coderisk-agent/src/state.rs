use coderisk_ai::Message;
use coderisk_core::{Phase0Result, Phase1Result, RiskLevel, ToolCallRecord};

/// The arguments the agent declared to `finish_investigation`, before the
/// assembler turns them into a `RiskAssessment`.
#[derive(Debug, Clone)]
pub struct FinishArgs {
    pub risk_level: RiskLevel,
    pub confidence: f64,
    pub reasoning: String,
    pub recommendations: Vec<String>,
}

/// Why the loop ended without the model calling `finish_investigation`
/// itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmergencyReason {
    HopBudgetExhausted,
    TokenBudgetExhausted,
    Stalled,
    Cancelled,
    ProviderError,
}

impl EmergencyReason {
    pub fn summary(self) -> &'static str {
        match self {
            EmergencyReason::HopBudgetExhausted => "hop budget exhausted before a conclusion was reached",
            EmergencyReason::TokenBudgetExhausted => "token budget exhausted before a conclusion was reached",
            EmergencyReason::Stalled => "agent stalled without making progress",
            EmergencyReason::Cancelled => "investigation cancelled before completion",
            EmergencyReason::ProviderError => "the LLM provider failed and the investigation could not continue",
        }
    }
}

/// Terminal outcome of the investigation, set once `step` produces one.
#[derive(Debug, Clone)]
pub enum Outcome {
    Finished(FinishArgs),
    Emergency(EmergencyReason),
}

/// The reducer's state: `{ file, resolved_paths, phase0, phase1, messages,
/// tool_call_history, hop_count, token_count }` per the investigation
/// contract, plus a stall counter and an optional terminal outcome once the
/// loop has ended.
#[derive(Debug, Clone)]
pub struct AgentState {
    pub file: String,
    pub resolved_paths: Vec<String>,
    pub phase0: Phase0Result,
    pub phase1: Phase1Result,
    pub messages: Vec<Message>,
    pub tool_call_history: Vec<ToolCallRecord>,
    pub hop_count: u32,
    pub token_count: u64,
    pub stall_count: u32,
    pub outcome: Option<Outcome>,
}

impl AgentState {
    pub fn new(
        file: String,
        resolved_paths: Vec<String>,
        phase0: Phase0Result,
        phase1: Phase1Result,
        system_prompt: String,
    ) -> Self {
        Self {
            file,
            resolved_paths,
            phase0,
            phase1,
            messages: vec![Message::system(system_prompt)],
            tool_call_history: Vec::new(),
            hop_count: 0,
            token_count: 0,
            stall_count: 0,
            outcome: None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.outcome.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use coderisk_core::Phase1Result;

    #[test]
    fn new_state_starts_with_a_single_system_message_and_zero_counters() {
        let state = AgentState::new(
            "src/lib.rs".to_string(),
            vec!["src/lib.rs".to_string()],
            Phase0Result::unknown(),
            Phase1Result::empty(),
            "investigate".to_string(),
        );
        assert_eq!(state.messages.len(), 1);
        assert_eq!(state.hop_count, 0);
        assert_eq!(state.token_count, 0);
        assert_eq!(state.stall_count, 0);
        assert!(!state.is_terminal());
    }
}
