//! The Context Mediator (§4.5): sits between a chat completion request and
//! the deployed container, truncating conversation history to fit the
//! model's context window and forwarding the (possibly streamed) response.
//!
//! Grounded in the teacher's SSE passthrough in the `generate` route
//! (`api::routes::generate`), generalized from a single local inference
//! call to a reverse-proxy hop toward a container endpoint.

use common::error::{OrchestratorError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A per-message token estimate: `ceil(len(content) / 4) + 4`. Cheap and
/// conservative; real tokenization would require loading the model's
/// tokenizer, which the orchestrator never does.
pub fn estimate_tokens(content: &str) -> u32 {
    let chars = content.chars().count() as u32;
    chars.div_ceil(4) + 4
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatCompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    #[serde(default)]
    pub stream: bool,
    #[serde(default)]
    pub max_tokens: Option<u32>,
    #[serde(flatten)]
    pub extra: std::collections::HashMap<String, Value>,
}

pub struct TruncationOutcome {
    pub messages: Vec<ChatMessage>,
    pub truncated: bool,
    pub max_tokens: u32,
    pub input_tokens: u32,
}

/// Truncates `messages` to fit inside `context_window` tokens, reserving
/// `response_reserve` tokens (`R`) for the model's reply.
///
/// Algorithm (§4.5):
/// 1. The system message (if `messages[0].role == "system"`) is always kept.
/// 2. Estimates the full conversation's token count (`input_tokens`).
/// 3. If `input_tokens + response_reserve <= context_window`, forward every
///    message unchanged — the windowing below never applies.
/// 4. Otherwise: keep the most recent `k = min(10, len - 1)` non-system
///    messages, then while the preserved set's estimated tokens exceed
///    `context_window - response_reserve`, drop the oldest droppable
///    message — a user/assistant pair at once when the two oldest
///    preserved messages are adjacent turns, one message otherwise.
/// 5. If a single remaining message still overflows, shrink the reserved
///    response budget to `max(64, context_window - total)` rather than
///    drop further history.
/// 6. If it still doesn't fit, the caller returns a context-overflow error.
pub fn truncate(
    messages: &[ChatMessage],
    context_window: u32,
    response_reserve: u32,
) -> Result<TruncationOutcome> {
    if messages.is_empty() {
        return Err(OrchestratorError::Validation("messages must not be empty".to_string()));
    }

    let (system, rest): (Option<&ChatMessage>, &[ChatMessage]) = if messages[0].role == "system" {
        (Some(&messages[0]), &messages[1..])
    } else {
        (None, messages)
    };

    let system_tokens = system.map(|m| estimate_tokens(&m.content)).unwrap_or(0);
    let input_tokens: u32 = system_tokens + rest.iter().map(|m| estimate_tokens(&m.content)).sum::<u32>();
    let budget = context_window.saturating_sub(response_reserve);

    // Step 3/4: the full conversation already fits — forward unchanged.
    if input_tokens <= budget {
        return Ok(TruncationOutcome { messages: messages.to_vec(), truncated: false, max_tokens: response_reserve, input_tokens });
    }

    let k = rest.len().min(10);
    let mut kept: Vec<ChatMessage> = rest.iter().rev().take(k).cloned().collect();
    kept.reverse();
    let mut truncated = true;

    let mut total: u32 = system_tokens + kept.iter().map(|m| estimate_tokens(&m.content)).sum::<u32>();

    while total > budget && kept.len() > 1 {
        // Adjacent user/assistant turns drop together; otherwise one at a
        // time (§4.5 "Tie-breaks and edge cases").
        let is_user_assistant_pair = matches!(
            (kept[0].role.as_str(), kept[1].role.as_str()),
            ("user", "assistant") | ("assistant", "user")
        );
        let drop_pair = kept.len() > 2 && is_user_assistant_pair;
        let drop_count = if drop_pair { 2 } else { 1 };
        for _ in 0..drop_count {
            let dropped = kept.remove(0);
            total -= estimate_tokens(&dropped.content);
        }
    }

    let mut reserve = response_reserve;
    if total > budget {
        // Last resort: shrink the response reserve instead of dropping the
        // final remaining message, floored at 64 tokens.
        reserve = (context_window.saturating_sub(total)).max(64);
        if total + 64 > context_window {
            return Err(OrchestratorError::ContextOverflow(format!(
                "input alone ({total} tokens) exceeds the context window ({context_window})"
            )));
        }
    }

    let mut out = Vec::with_capacity(kept.len() + 1);
    if let Some(sys) = system {
        out.push(sys.clone());
    }
    out.extend(kept);

    Ok(TruncationOutcome { messages: out, truncated, max_tokens: reserve, input_tokens })
}
