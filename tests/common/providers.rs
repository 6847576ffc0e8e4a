//! Provider test utilities
//!
//! A fake [`LlmProvider`] that plays back a script of outcomes, so tests can
//! stage timeouts and vendor failures without a network.

use async_trait::async_trait;
use docqa_gateway::core::providers::{Completion, CompletionRequest, LlmProvider, UsageSource};
use docqa_gateway::ProviderError;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

/// Input tokens reported by every scripted answer
pub const INPUT_TOKENS: u32 = 500;
/// Output tokens reported by every scripted answer
pub const OUTPUT_TOKENS: u32 = 200;

/// One scripted outcome
#[derive(Debug)]
pub enum Step {
    /// Answer with this text
    Answer(&'static str),
    /// Answer after a delay
    Slow(Duration),
    /// Never answer; the dispatcher's call timeout has to fire
    Hang,
    /// Fail with this error
    Fail(ProviderError),
}

/// Plays back its script, then keeps answering "ok"
#[derive(Debug)]
pub struct ScriptedProvider {
    name: &'static str,
    script: Mutex<VecDeque<Step>>,
    calls: AtomicU32,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedProvider {
    pub fn new(name: &'static str, steps: Vec<Step>) -> Arc<Self> {
        Arc::new(Self {
            name,
            script: Mutex::new(steps.into()),
            calls: AtomicU32::new(0),
            prompts: Mutex::new(Vec::new()),
        })
    }

    /// Always answers "ok"
    pub fn answering(name: &'static str) -> Arc<Self> {
        Self::new(name, Vec::new())
    }

    /// Number of `complete` calls so far, timed-out ones included
    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    /// Every prompt received, in call order
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().clone()
    }
}

fn answer(text: &str) -> Completion {
    Completion {
        text: text.to_string(),
        input_tokens: INPUT_TOKENS,
        output_tokens: OUTPUT_TOKENS,
        usage_source: UsageSource::Vendor,
    }
}

#[async_trait]
impl LlmProvider for ScriptedProvider {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<Completion, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().push(request.prompt.clone());

        let step = self.script.lock().pop_front();
        match step {
            Some(Step::Answer(text)) => Ok(answer(text)),
            Some(Step::Slow(delay)) => {
                tokio::time::sleep(delay).await;
                Ok(answer("ok"))
            }
            Some(Step::Hang) => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Err(ProviderError::timeout(self.name, "hung call was not cancelled"))
            }
            Some(Step::Fail(e)) => Err(e),
            None => Ok(answer("ok")),
        }
    }
}
