//! Test doubles shared by the core unit tests.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use webrag_shared::{Result, WebRagError};

use crate::model::LanguageModel;

/// A [`LanguageModel`] that replays scripted replies and records every prompt.
///
/// Unscripted rewrites fail (exercising the fallback); unscripted answers
/// succeed with `answer N`, N counting generate calls from 1.
#[derive(Default)]
pub(crate) struct ScriptedModel {
    rewrites: Mutex<VecDeque<std::result::Result<String, String>>>,
    answers: Mutex<VecDeque<std::result::Result<String, String>>>,
    rewrite_prompts: Mutex<Vec<String>>,
    answer_prompts: Mutex<Vec<String>>,
}

impl ScriptedModel {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_rewrite(self, reply: std::result::Result<String, String>) -> Self {
        self.rewrites.lock().unwrap().push_back(reply);
        self
    }

    pub(crate) fn with_answer(self, reply: std::result::Result<String, String>) -> Self {
        self.answers.lock().unwrap().push_back(reply);
        self
    }

    pub(crate) fn rewrite_prompts(&self) -> Vec<String> {
        self.rewrite_prompts.lock().unwrap().clone()
    }

    pub(crate) fn answer_prompts(&self) -> Vec<String> {
        self.answer_prompts.lock().unwrap().clone()
    }

    pub(crate) fn last_answer_prompt(&self) -> String {
        self.answer_prompts
            .lock()
            .unwrap()
            .last()
            .cloned()
            .expect("no answer prompt recorded")
    }
}

#[async_trait]
impl LanguageModel for ScriptedModel {
    async fn rewrite(&self, prompt: &str) -> Result<String> {
        self.rewrite_prompts.lock().unwrap().push(prompt.to_string());
        self.rewrites
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err("no scripted rewrite".into()))
            .map_err(WebRagError::Generation)
    }

    async fn generate(&self, prompt: &str) -> Result<String> {
        let n = {
            let mut prompts = self.answer_prompts.lock().unwrap();
            prompts.push(prompt.to_string());
            prompts.len()
        };
        self.answers
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(format!("answer {n}")))
            .map_err(WebRagError::Generation)
    }
}
