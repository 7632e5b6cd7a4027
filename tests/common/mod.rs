//! In-memory transport with scripted answers, shared by integration tests

#![allow(dead_code)]

use allclient::{AfterHook, BeforeHook, CallContext, CallResult, Transport};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

type IntrospectFn = Box<dyn Fn() -> anyhow::Result<CallResult> + Send + Sync>;
type CallFn = Box<dyn Fn(&str, &Value) -> anyhow::Result<CallResult> + Send + Sync>;
type HookFn = Box<dyn Fn(&mut CallContext) -> anyhow::Result<Option<CallResult>> + Send + Sync>;

/// Ordered record of what the transport and its hooks saw
pub type Events = Arc<Mutex<Vec<String>>>;

pub struct FnHook {
    stage: &'static str,
    events: Events,
    hook: HookFn,
}

#[async_trait]
impl BeforeHook for FnHook {
    async fn before(&self, ctx: &mut CallContext) -> anyhow::Result<Option<CallResult>> {
        self.events
            .lock()
            .unwrap()
            .push(format!("{}:{}", self.stage, ctx.procedure_name));
        (self.hook)(ctx)
    }
}

#[async_trait]
impl AfterHook for FnHook {
    async fn after(&self, ctx: &mut CallContext) -> anyhow::Result<Option<CallResult>> {
        self.events
            .lock()
            .unwrap()
            .push(format!("{}:{}", self.stage, ctx.procedure_name));
        (self.hook)(ctx)
    }
}

pub struct ScriptedTransport {
    uri: String,
    introspect_with: IntrospectFn,
    call_with: CallFn,
    before_hook: Option<FnHook>,
    after_hook: Option<FnHook>,
    pub introspections: AtomicUsize,
    pub events: Events,
}

impl ScriptedTransport {
    /// Advertises nothing useful and answers every call with success
    pub fn new(uri: &str) -> Self {
        Self {
            uri: uri.to_string(),
            introspect_with: Box::new(|| Ok(introspection(&[]))),
            call_with: Box::new(|name, _| Ok(CallResult::ok("OK", format!("called {}", name)))),
            before_hook: None,
            after_hook: None,
            introspections: AtomicUsize::new(0),
            events: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn advertising(mut self, names: &[&str]) -> Self {
        let result = introspection(names);
        self.introspect_with = Box::new(move || Ok(result.clone()));
        self
    }

    pub fn introspect_with<F>(mut self, f: F) -> Self
    where
        F: Fn() -> anyhow::Result<CallResult> + Send + Sync + 'static,
    {
        self.introspect_with = Box::new(f);
        self
    }

    pub fn calls_with<F>(mut self, f: F) -> Self
    where
        F: Fn(&str, &Value) -> anyhow::Result<CallResult> + Send + Sync + 'static,
    {
        self.call_with = Box::new(f);
        self
    }

    pub fn before<F>(mut self, f: F) -> Self
    where
        F: Fn(&mut CallContext) -> anyhow::Result<Option<CallResult>> + Send + Sync + 'static,
    {
        self.before_hook = Some(FnHook {
            stage: "before",
            events: self.events.clone(),
            hook: Box::new(f),
        });
        self
    }

    pub fn after<F>(mut self, f: F) -> Self
    where
        F: Fn(&mut CallContext) -> anyhow::Result<Option<CallResult>> + Send + Sync + 'static,
    {
        self.after_hook = Some(FnHook {
            stage: "after",
            events: self.events.clone(),
            hook: Box::new(f),
        });
        self
    }

    pub fn shared(self) -> Arc<Self> {
        Arc::new(self)
    }

    pub fn introspection_count(&self) -> usize {
        self.introspections.load(Ordering::SeqCst)
    }

    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }

    /// Names passed to the transport's `call`, in order
    pub fn calls(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| e.strip_prefix("call:").map(str::to_string))
            .collect()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    fn uri(&self) -> &str {
        &self.uri
    }

    async fn introspect(&self) -> anyhow::Result<CallResult> {
        self.introspections.fetch_add(1, Ordering::SeqCst);
        tokio::task::yield_now().await;
        (self.introspect_with)()
    }

    async fn call(&self, procedure: &str, arg: Value) -> anyhow::Result<CallResult> {
        self.events
            .lock()
            .unwrap()
            .push(format!("call:{}", procedure));
        (self.call_with)(procedure, &arg)
    }

    fn before(&self) -> Option<&dyn BeforeHook> {
        self.before_hook.as_ref().map(|h| h as &dyn BeforeHook)
    }

    fn after(&self) -> Option<&dyn AfterHook> {
        self.after_hook.as_ref().map(|h| h as &dyn AfterHook)
    }
}

/// Successful introspection advertising `names`
pub fn introspection(names: &[&str]) -> CallResult {
    let procedures: serde_json::Map<String, Value> = names
        .iter()
        .map(|name| (name.to_string(), json!("function")))
        .collect();
    CallResult::ok("OK", "Introspection")
        .with_field("procedures", json!(Value::Object(procedures).to_string()))
}
