//! Scripted in-process client for pipeline tests.

use async_trait::async_trait;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use super::{
    Completion, CompletionCategory, CompletionClient, CompletionError, CompletionRequest,
    TokenUsage,
};

enum Outcome {
    Reply(String),
    Fail(CompletionCategory),
}

enum Scope {
    System,
    User,
}

struct Rule {
    scope: Scope,
    needle: String,
    outcome: Outcome,
    delay: Option<Duration>,
}

/// Answers by the first rule whose needle appears in the request.
pub(crate) struct ScriptedClient {
    rules: Vec<Rule>,
    default_reply: Option<String>,
    calls: AtomicU32,
    log: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedClient {
    pub fn new() -> Self {
        Self {
            rules: Vec::new(),
            default_reply: None,
            calls: AtomicU32::new(0),
            log: Mutex::new(Vec::new()),
        }
    }

    /// Reply when the system instruction contains `needle`
    pub fn reply_when(mut self, needle: &str, reply: &str) -> Self {
        self.rules.push(Rule {
            scope: Scope::System,
            needle: needle.to_string(),
            outcome: Outcome::Reply(reply.to_string()),
            delay: None,
        });
        self
    }

    /// Reply when the user content contains `needle`
    pub fn reply_when_user(mut self, needle: &str, reply: &str) -> Self {
        self.rules.push(Rule {
            scope: Scope::User,
            needle: needle.to_string(),
            outcome: Outcome::Reply(reply.to_string()),
            delay: None,
        });
        self
    }

    /// Fail when the system instruction contains `needle`
    pub fn fail_when(mut self, needle: &str, category: CompletionCategory) -> Self {
        self.rules.push(Rule {
            scope: Scope::System,
            needle: needle.to_string(),
            outcome: Outcome::Fail(category),
            delay: None,
        });
        self
    }

    /// Delay the most recently added rule
    pub fn delayed(mut self, delay: Duration) -> Self {
        if let Some(rule) = self.rules.last_mut() {
            rule.delay = Some(delay);
        }
        self
    }

    pub fn default_reply(mut self, reply: &str) -> Self {
        self.default_reply = Some(reply.to_string());
        self
    }

    pub fn call_count(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.log.lock().map(|l| l.clone()).unwrap_or_default()
    }

    fn find(&self, request: &CompletionRequest) -> Option<&Rule> {
        self.rules.iter().find(|r| match r.scope {
            Scope::System => request.system_instruction.contains(&r.needle),
            Scope::User => request.user_content.contains(&r.needle),
        })
    }
}

#[async_trait]
impl CompletionClient for ScriptedClient {
    async fn complete(
        &self,
        request: &CompletionRequest,
    ) -> Result<Completion, CompletionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut log) = self.log.lock() {
            log.push(request.clone());
        }

        let rule = self.find(request);
        if let Some(delay) = rule.and_then(|r| r.delay) {
            tokio::time::sleep(delay).await;
        }

        let text = match rule.map(|r| &r.outcome) {
            Some(Outcome::Reply(text)) => text.clone(),
            Some(Outcome::Fail(category)) => {
                return Err(CompletionError::with_provider(
                    *category,
                    "scripted failure",
                    "scripted",
                ));
            }
            None => self.default_reply.clone().ok_or_else(|| {
                CompletionError::with_provider(
                    CompletionCategory::Unknown,
                    "no scripted reply",
                    "scripted",
                )
            })?,
        };

        let mut completion = Completion::text_only(text);
        completion.usage = TokenUsage::new(10, 5);
        Ok(completion)
    }

    fn name(&self) -> &str {
        "scripted"
    }

    fn model(&self) -> &str {
        "scripted-model"
    }

    async fn health_check(&self) -> bool {
        true
    }
}
