//! A minimal interceptor chain.
//!
//! Interceptors run in registration order for the request phase and in
//! reverse order for the response phase.  The first one that asks to halt
//! stops the chain; later interceptors do not run for that phase.

use std::sync::Arc;

use async_trait::async_trait;

use crate::context::{Flow, Phase, SessionContext};

#[async_trait]
pub trait Interceptor: Send + Sync {
    fn name(&self) -> &str;

    async fn call(&self, ctx: &mut dyn SessionContext, phase: Phase) -> Flow;
}

#[derive(Default, Clone)]
pub struct Pipeline {
    interceptors: Vec<Arc<dyn Interceptor>>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, interceptor: Arc<dyn Interceptor>) -> Self {
        self.interceptors.push(interceptor);
        self
    }

    pub fn len(&self) -> usize {
        self.interceptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.interceptors.is_empty()
    }

    /// Run every interceptor for `phase`, stopping at the first halt.
    pub async fn run(&self, ctx: &mut dyn SessionContext, phase: Phase) -> Flow {
        let order: Vec<&Arc<dyn Interceptor>> = match phase {
            Phase::Request => self.interceptors.iter().collect(),
            Phase::Response => self.interceptors.iter().rev().collect(),
        };

        for interceptor in order {
            if interceptor.call(ctx, phase).await == Flow::HaltWithInternalError {
                tracing::debug!(
                    interceptor = interceptor.name(),
                    phase = ?phase,
                    path = ctx.request_path(),
                    "pipeline halted"
                );
                return Flow::HaltWithInternalError;
            }
        }
        Flow::Continue
    }
}
