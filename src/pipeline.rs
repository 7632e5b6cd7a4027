//! Call pipeline: `before` -> transport call -> `after`
//!
//! Stages run strictly in order for one invocation. Each stage failure is
//! normalized into a failure result, or surfaced as-is when `never_throw` is
//! off.

use crate::error::Result;
use crate::normalize;
use crate::result::CallResult;
use crate::transport::{CallContext, Transport};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};

#[derive(Clone)]
pub struct CallPipeline {
    transport: Arc<dyn Transport>,
    never_throw: bool,
}

impl CallPipeline {
    pub fn new(transport: Arc<dyn Transport>, never_throw: bool) -> Self {
        Self {
            transport,
            never_throw,
        }
    }

    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }

    pub fn never_throw(&self) -> bool {
        self.never_throw
    }

    /// Run one invocation of `procedure` through the hooks and the transport
    pub async fn invoke(&self, procedure: &str, arg: Value) -> Result<CallResult> {
        let mut ctx = CallContext::new(procedure, arg);
        let mut produced = None;

        if let Some(hook) = self.transport.before() {
            match hook.before(&mut ctx).await {
                Ok(Some(result)) => {
                    debug!("'before' short-circuited {}", ctx.procedure_name);
                    produced = Some(result);
                }
                Ok(None) => {}
                Err(error) => {
                    warn!("'before' failed for {}: {}", ctx.procedure_name, error);
                    if !self.never_throw {
                        return Err(error.into());
                    }
                    produced = Some(normalize::before_failure(&ctx.procedure_name, error));
                }
            }
        }

        let result = match produced {
            Some(result) => result,
            None => {
                debug!("Calling {} on {}", ctx.procedure_name, self.transport.uri());
                match self
                    .transport
                    .call(&ctx.procedure_name, ctx.arg.clone())
                    .await
                {
                    Ok(result) => result,
                    Err(error) => {
                        warn!("Call to {} failed: {}", ctx.procedure_name, error);
                        if !self.never_throw {
                            return Err(error.into());
                        }
                        normalize::unreachable(&ctx.procedure_name, error)
                    }
                }
            }
        };

        let Some(hook) = self.transport.after() else {
            return Ok(result);
        };

        ctx.result = Some(result.clone());
        match hook.after(&mut ctx).await {
            Ok(Some(replaced)) => {
                debug!("'after' replaced the result of {}", ctx.procedure_name);
                Ok(replaced)
            }
            // The hook may have edited the context result in place.
            Ok(None) => Ok(ctx.result.unwrap_or(result)),
            Err(error) => {
                warn!("'after' failed for {}: {}", ctx.procedure_name, error);
                if !self.never_throw {
                    return Err(error.into());
                }
                Ok(normalize::after_failure(&ctx.procedure_name, error))
            }
        }
    }
}
