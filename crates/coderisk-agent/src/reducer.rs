use crate::state::{AgentState, EmergencyReason, FinishArgs, Outcome};
use coderisk_ai::{GenerationConfig, LLMProvider, Message, ToolDefinition};
use coderisk_core::{AgentConfig, Hop, InvestigationTrace, RiskLevel, ToolCallOutcome, ToolCallRecord};
use coderisk_tools::{Tool, ToolExecutor, ToolSchema};
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::warn;

/// Runs the reducer loop to completion: repeatedly calls `step`, checking
/// the hop/token/stall budgets between iterations, until the agent calls
/// `finish_investigation`, a budget is exhausted, or `cancel` fires. Returns
/// the terminal state (with `state.outcome` set) and the accumulated trace.
pub async fn run(
    mut state: AgentState,
    provider: &dyn LLMProvider,
    executor: &ToolExecutor<'_>,
    tools: &[ToolSchema],
    config: &AgentConfig,
    cancel: &CancellationToken,
) -> (AgentState, InvestigationTrace) {
    let tool_defs: Vec<ToolDefinition> = tools
        .iter()
        .map(|t| ToolDefinition::function(t.name, t.description, t.parameters.clone()))
        .collect();
    let gen_config = GenerationConfig::default();
    let mut hops = Vec::new();

    loop {
        if let Some(reason) = budget_exceeded(&state, config, cancel) {
            state.outcome = Some(Outcome::Emergency(reason));
            break;
        }

        let started = Instant::now();
        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => StepOutcome::Cancelled,
            result = step(&mut state, provider, executor, &tool_defs, &gen_config) => result,
        };

        match outcome {
            StepOutcome::Stalled => continue,
            StepOutcome::Cancelled => {
                state.outcome = Some(Outcome::Emergency(EmergencyReason::Cancelled));
                break;
            }
            StepOutcome::ProviderError => {
                state.outcome = Some(Outcome::Emergency(EmergencyReason::ProviderError));
                break;
            }
            StepOutcome::Hop { tool_calls, tokens } => {
                state.hop_count += 1;
                state.token_count += tokens;
                hops.push(Hop {
                    hop_number: state.hop_count,
                    messages_sent: 1,
                    tool_calls,
                    tokens_used: tokens,
                    duration: started.elapsed(),
                });
            }
            StepOutcome::Terminal {
                tool_calls,
                tokens,
                finish,
            } => {
                state.hop_count += 1;
                state.token_count += tokens;
                hops.push(Hop {
                    hop_number: state.hop_count,
                    messages_sent: 1,
                    tool_calls,
                    tokens_used: tokens,
                    duration: started.elapsed(),
                });
                state.outcome = Some(Outcome::Finished(finish));
                break;
            }
        }
    }

    let emergency_finished = matches!(state.outcome, Some(Outcome::Emergency(_)));
    let trace = InvestigationTrace {
        hops,
        emergency_finished,
    };
    (state, trace)
}

fn budget_exceeded(
    state: &AgentState,
    config: &AgentConfig,
    cancel: &CancellationToken,
) -> Option<EmergencyReason> {
    if cancel.is_cancelled() {
        Some(EmergencyReason::Cancelled)
    } else if state.hop_count >= config.max_hops {
        Some(EmergencyReason::HopBudgetExhausted)
    } else if state.token_count >= config.max_tokens {
        Some(EmergencyReason::TokenBudgetExhausted)
    } else if state.stall_count >= config.max_stalls {
        Some(EmergencyReason::Stalled)
    } else {
        None
    }
}

enum StepOutcome {
    Hop {
        tool_calls: Vec<ToolCallRecord>,
        tokens: u64,
    },
    Terminal {
        tool_calls: Vec<ToolCallRecord>,
        tokens: u64,
        finish: FinishArgs,
    },
    Stalled,
    Cancelled,
    ProviderError,
}

/// One reducer step: call the LLM, then either dispatch its tool call(s) or
/// treat a tool-call-free turn as a malformed stall. Mutates `state` in
/// place (messages, tool_call_history) rather than returning a fresh clone —
/// conceptually the same `state -> state'` transition since the caller
/// never reads the pre-step value again.
async fn step(
    state: &mut AgentState,
    provider: &dyn LLMProvider,
    executor: &ToolExecutor<'_>,
    tool_defs: &[ToolDefinition],
    gen_config: &GenerationConfig,
) -> StepOutcome {
    let response = match provider
        .generate_chat_with_tools(&state.messages, Some(tool_defs), gen_config)
        .await
    {
        Ok(r) => r,
        Err(e) => {
            warn!(error = %e, file = %state.file, "LLM call failed during investigation");
            return StepOutcome::ProviderError;
        }
    };
    let tokens = response.total_tokens.unwrap_or(0) as u64;

    if !response.has_tool_calls() {
        state.messages.push(Message::assistant(response.content, vec![]));
        state.messages.push(Message::user(crate::prompt::stall_instruction()));
        state.stall_count += 1;
        return StepOutcome::Stalled;
    }

    let calls = response.tool_calls.unwrap_or_default();
    state
        .messages
        .push(Message::assistant(response.content, calls.clone()));

    let mut records = Vec::with_capacity(calls.len());
    let mut finish = None;

    for call in &calls {
        let args_value: serde_json::Value = call.parse_arguments().unwrap_or(serde_json::Value::Null);

        if call.function.name == Tool::FinishInvestigation.name() {
            match parse_finish_args(&args_value) {
                Ok(args) => {
                    let ack = serde_json::json!({ "status": "investigation_concluded" });
                    state
                        .messages
                        .push(Message::tool_result(call.id.clone(), ack.to_string()));
                    records.push(ToolCallRecord {
                        name: call.function.name.clone(),
                        args: args_value,
                        result: ToolCallOutcome::Ok { result: ack },
                    });
                    finish = Some(args);
                }
                Err(reason) => {
                    let payload = serde_json::json!({ "error": reason });
                    state
                        .messages
                        .push(Message::tool_result(call.id.clone(), payload.to_string()));
                    records.push(ToolCallRecord {
                        name: call.function.name.clone(),
                        args: args_value,
                        result: ToolCallOutcome::Error { error: reason },
                    });
                }
            }
            continue;
        }

        if args_value.is_null() {
            let payload = serde_json::json!({ "error": "invalid_arguments" });
            state
                .messages
                .push(Message::tool_result(call.id.clone(), payload.to_string()));
            records.push(ToolCallRecord {
                name: call.function.name.clone(),
                args: serde_json::json!({}),
                result: ToolCallOutcome::Error {
                    error: "invalid_arguments".to_string(),
                },
            });
            continue;
        }

        let result = executor.execute(&call.function.name, &args_value).await;
        state
            .messages
            .push(Message::tool_result(call.id.clone(), result.to_string()));
        let outcome = match result.get("error").and_then(|e| e.as_str()) {
            Some(err) => ToolCallOutcome::Error {
                error: err.to_string(),
            },
            None => ToolCallOutcome::Ok { result },
        };
        records.push(ToolCallRecord {
            name: call.function.name.clone(),
            args: args_value,
            result: outcome,
        });
    }

    state.tool_call_history.extend(records.clone());

    match finish {
        Some(finish) => StepOutcome::Terminal {
            tool_calls: records,
            tokens,
            finish,
        },
        None => StepOutcome::Hop {
            tool_calls: records,
            tokens,
        },
    }
}

fn parse_finish_args(value: &serde_json::Value) -> Result<FinishArgs, String> {
    let risk_level = value
        .get("risk_level")
        .and_then(|v| v.as_str())
        .ok_or_else(|| "missing risk_level".to_string())?;
    let risk_level = match risk_level.to_lowercase().as_str() {
        "minimal" => RiskLevel::Minimal,
        "low" => RiskLevel::Low,
        "medium" => RiskLevel::Medium,
        "high" => RiskLevel::High,
        "critical" => RiskLevel::Critical,
        other => return Err(format!("unrecognised risk_level: {other}")),
    };
    let confidence = value
        .get("confidence")
        .and_then(|v| v.as_f64())
        .ok_or_else(|| "missing confidence".to_string())?
        .clamp(0.0, 1.0);
    let reasoning = value
        .get("reasoning")
        .and_then(|v| v.as_str())
        .unwrap_or_default()
        .to_string();
    let recommendations = value
        .get("recommendations")
        .and_then(|v| v.as_array())
        .map(|arr| {
            arr.iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default();
    Ok(FinishArgs {
        risk_level,
        confidence,
        reasoning,
        recommendations,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_finish_args_requires_risk_level_and_confidence() {
        assert!(parse_finish_args(&serde_json::json!({})).is_err());
        assert!(parse_finish_args(&serde_json::json!({"risk_level": "high"})).is_err());
    }

    #[test]
    fn parse_finish_args_clamps_out_of_range_confidence() {
        let args = parse_finish_args(&serde_json::json!({
            "risk_level": "high",
            "confidence": 1.4,
        }))
        .unwrap();
        assert_eq!(args.confidence, 1.0);
    }

    #[test]
    fn parse_finish_args_rejects_unknown_risk_level() {
        let result = parse_finish_args(&serde_json::json!({
            "risk_level": "catastrophic",
            "confidence": 0.5,
        }));
        assert!(result.is_err());
    }

    #[test]
    fn parse_finish_args_defaults_recommendations_to_empty() {
        let args = parse_finish_args(&serde_json::json!({
            "risk_level": "low",
            "confidence": 0.5,
        }))
        .unwrap();
        assert!(args.recommendations.is_empty());
    }

    #[test]
    fn budget_exceeded_checks_cancellation_first() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let state = AgentState::new(
            "f".to_string(),
            vec!["f".to_string()],
            coderisk_core::Phase0Result::unknown(),
            coderisk_core::Phase1Result::empty(),
            "prompt".to_string(),
        );
        let config = AgentConfig::default();
        assert_eq!(
            budget_exceeded(&state, &config, &cancel),
            Some(EmergencyReason::Cancelled)
        );
    }

    #[test]
    fn budget_exceeded_is_none_within_budget() {
        let cancel = CancellationToken::new();
        let state = AgentState::new(
            "f".to_string(),
            vec!["f".to_string()],
            coderisk_core::Phase0Result::unknown(),
            coderisk_core::Phase1Result::empty(),
            "prompt".to_string(),
        );
        let config = AgentConfig::default();
        assert_eq!(budget_exceeded(&state, &config, &cancel), None);
    }
}
