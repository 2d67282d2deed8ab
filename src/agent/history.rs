//! In-memory session history.

use super::message::{Message, Role};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Record of one tool invocation made during a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolInvocation {
    pub call_id: String,
    pub tool: String,
    pub arguments: Value,
    pub output: String,
    pub rating: Option<f32>,
    pub release_date: Option<String>,
    pub ok: bool,
    pub timestamp: DateTime<Utc>,
}

impl std::fmt::Display for ToolInvocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}({})", self.tool, self.arguments)
    }
}

/// Ordered messages and tool trace of one session.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionHistory {
    messages: Vec<Message>,
    trace: Vec<ToolInvocation>,
}

impl SessionHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn trace(&self) -> &[ToolInvocation] {
        &self.trace
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Tool invocations made during the most recent turn.
    pub fn last_turn_trace(&self) -> Vec<&ToolInvocation> {
        let start = self
            .messages
            .iter()
            .rposition(|m| m.role == Role::User)
            .unwrap_or(0);
        let ids: Vec<&str> = self.messages[start..]
            .iter()
            .filter_map(|m| m.tool_call_id.as_deref())
            .collect();
        self.trace
            .iter()
            .filter(|inv| ids.contains(&inv.call_id.as_str()))
            .collect()
    }

    /// Forget everything.
    pub fn clear(&mut self) {
        self.messages.clear();
        self.trace.clear();
    }

    /// Append the messages and trace of a finished turn.
    pub(crate) fn commit(&mut self, messages: Vec<Message>, trace: Vec<ToolInvocation>) {
        self.messages.extend(messages);
        self.trace.extend(trace);
    }

    /// Drop whole turns from the front until at most `limit` messages remain.
    ///
    /// A turn starts at a user message, so the result never begins with a
    /// tool result or separates a tool call from its results. A single turn
    /// longer than `limit` is kept whole.
    pub fn trim_to(&mut self, limit: usize) {
        if self.messages.len() <= limit {
            return;
        }

        let total = self.messages.len();
        let turn_starts: Vec<usize> = self
            .messages
            .iter()
            .enumerate()
            .filter(|(_, m)| m.role == Role::User)
            .map(|(i, _)| i)
            .collect();

        let cut = turn_starts
            .iter()
            .copied()
            .find(|&start| total - start <= limit)
            .or_else(|| turn_starts.last().copied())
            .unwrap_or(0);

        if cut == 0 {
            return;
        }

        self.messages.drain(..cut);

        let kept_ids: Vec<&str> = self
            .messages
            .iter()
            .filter_map(|m| m.tool_call_id.as_deref())
            .collect();
        self.trace
            .retain(|inv| kept_ids.contains(&inv.call_id.as_str()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::message::ToolCallRequest;

    fn invocation(call_id: &str) -> ToolInvocation {
        ToolInvocation {
            call_id: call_id.to_string(),
            tool: "web_search".to_string(),
            arguments: serde_json::json!({"query": "q"}),
            output: "out".to_string(),
            rating: None,
            release_date: None,
            ok: true,
            timestamp: Utc::now(),
        }
    }

    fn tool_turn(n: usize) -> (Vec<Message>, Vec<ToolInvocation>) {
        let id = format!("call_{}", n);
        (
            vec![
                Message::user(format!("question {}", n)),
                Message::assistant_tool_calls("", vec![ToolCallRequest::new(&id, "web_search", "{}")]),
                Message::tool(&id, "result"),
                Message::assistant(format!("answer {}", n)),
            ],
            vec![invocation(&id)],
        )
    }

    #[test]
    fn test_commit_and_clear() {
        let mut history = SessionHistory::new();
        let (messages, trace) = tool_turn(1);
        history.commit(messages, trace);
        assert_eq!(history.len(), 4);
        assert_eq!(history.trace().len(), 1);

        history.clear();
        assert!(history.is_empty());
        assert!(history.trace().is_empty());
    }

    #[test]
    fn test_trim_drops_whole_turns() {
        let mut history = SessionHistory::new();
        for n in 0..3 {
            let (messages, trace) = tool_turn(n);
            history.commit(messages, trace);
        }

        history.trim_to(9);
        assert_eq!(history.len(), 8);
        assert_eq!(history.messages()[0].role, Role::User);
        assert_eq!(history.messages()[0].content, "question 1");
        let ids: Vec<_> = history.trace().iter().map(|t| t.call_id.as_str()).collect();
        assert_eq!(ids, ["call_1", "call_2"]);
    }

    #[test]
    fn test_trim_keeps_oversized_last_turn() {
        let mut history = SessionHistory::new();
        for n in 0..2 {
            let (messages, trace) = tool_turn(n);
            history.commit(messages, trace);
        }

        history.trim_to(2);
        assert_eq!(history.len(), 4);
        assert_eq!(history.messages()[0].content, "question 1");
    }

    #[test]
    fn test_last_turn_trace() {
        let mut history = SessionHistory::new();
        assert!(history.last_turn_trace().is_empty());

        for n in 0..2 {
            let (messages, trace) = tool_turn(n);
            history.commit(messages, trace);
        }
        let last = history.last_turn_trace();
        assert_eq!(last.len(), 1);
        assert_eq!(last[0].call_id, "call_1");
    }

    #[test]
    fn test_trim_noop_under_limit() {
        let mut history = SessionHistory::new();
        let (messages, trace) = tool_turn(0);
        history.commit(messages, trace);
        history.trim_to(40);
        assert_eq!(history.len(), 4);
    }
}
