//! Recording gateway double shared by the effect and runtime tests.

use std::collections::{HashMap, HashSet, VecDeque};
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::time::Instant;

use rulehub_domain::error::{GatewayError, NotFoundError};
use rulehub_domain::thing::{ActionRef, PropertyRef, ThingId};
use rulehub_domain::value::{PropertyType, PropertyValue};

use crate::config::EffectConfig;
use crate::event_bus::EffectEventBus;
use crate::ports::Gateway;

use super::EffectContext;

/// A gateway call as seen by the double.
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    PropertyType(PropertyRef),
    Read(PropertyRef),
    Write(PropertyRef, PropertyValue),
    Invoke(ActionRef, serde_json::Value),
}

impl Call {
    fn is_device_call(&self) -> bool {
        !matches!(self, Self::PropertyType(_))
    }
}

/// Scripted outcome for the next device call (read, write or invoke).
#[derive(Debug, Clone)]
pub enum Script {
    Fail(GatewayError),
    Hang,
}

type Key = (ThingId, String);

/// In-memory gateway that records every call with its (virtual) time.
pub struct RecordingGateway {
    properties: Mutex<HashMap<Key, (PropertyType, PropertyValue)>>,
    actions: HashSet<Key>,
    scripts: Mutex<VecDeque<Script>>,
    calls: Mutex<Vec<(Duration, Call)>>,
    latency: Duration,
    start: Instant,
}

impl RecordingGateway {
    pub fn new() -> Self {
        Self {
            properties: Mutex::new(HashMap::new()),
            actions: HashSet::new(),
            scripts: Mutex::new(VecDeque::new()),
            calls: Mutex::new(Vec::new()),
            latency: Duration::ZERO,
            start: Instant::now(),
        }
    }

    pub fn with_property(
        self,
        thing: &str,
        name: &str,
        declared: PropertyType,
        value: impl Into<PropertyValue>,
    ) -> Self {
        self.properties
            .lock()
            .unwrap()
            .insert((ThingId::from(thing), name.to_string()), (declared, value.into()));
        self
    }

    pub fn with_action(mut self, thing: &str, name: &str) -> Self {
        self.actions.insert((ThingId::from(thing), name.to_string()));
        self
    }

    /// Delay applied to every device call before it is acknowledged.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Queue an outcome for the next device call.
    pub fn script(&self, script: Script) {
        self.scripts.lock().unwrap().push_back(script);
    }

    pub fn fail_next(&self, count: usize, err: &GatewayError) {
        for _ in 0..count {
            self.script(Script::Fail(err.clone()));
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.timed_calls().into_iter().map(|(_, c)| c).collect()
    }

    /// Calls with the virtual time (since construction) they were issued at.
    pub fn timed_calls(&self) -> Vec<(Duration, Call)> {
        self.calls.lock().unwrap().clone()
    }

    /// Reads, writes and invocations; type lookups are not counted.
    pub fn device_calls(&self) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, c)| c.is_device_call())
            .count()
    }

    /// Writes with the virtual time they were issued at.
    pub fn writes(&self) -> Vec<(Duration, PropertyValue)> {
        self.timed_calls()
            .into_iter()
            .filter_map(|(at, c)| match c {
                Call::Write(_, value) => Some((at, value)),
                _ => None,
            })
            .collect()
    }

    pub fn value(&self, thing: &str, name: &str) -> Option<PropertyValue> {
        self.properties
            .lock()
            .unwrap()
            .get(&(ThingId::from(thing), name.to_string()))
            .map(|(_, v)| v.clone())
    }

    fn record(&self, call: Call) -> Option<Script> {
        let at = self.start.elapsed();
        self.calls.lock().unwrap().push((at, call.clone()));
        if call.is_device_call() {
            self.scripts.lock().unwrap().pop_front()
        } else {
            None
        }
    }

    async fn settle(&self, script: Option<Script>) -> Result<(), GatewayError> {
        match script {
            Some(Script::Hang) => std::future::pending().await,
            Some(Script::Fail(err)) => Err(err),
            None => {
                if !self.latency.is_zero() {
                    tokio::time::sleep(self.latency).await;
                }
                Ok(())
            }
        }
    }

    fn not_found(entity: &'static str, id: String) -> GatewayError {
        NotFoundError { entity, id }.into()
    }

    fn lookup(&self, property: &PropertyRef) -> Result<(PropertyType, PropertyValue), GatewayError> {
        self.properties
            .lock()
            .unwrap()
            .get(&(property.thing_id.clone(), property.name.clone()))
            .cloned()
            .ok_or_else(|| Self::not_found("Property", property.to_string()))
    }
}

impl Default for RecordingGateway {
    fn default() -> Self {
        Self::new()
    }
}

impl Gateway for RecordingGateway {
    fn property_type(
        &self,
        property: &PropertyRef,
    ) -> impl Future<Output = Result<PropertyType, GatewayError>> + Send {
        self.record(Call::PropertyType(property.clone()));
        let result = self.lookup(property).map(|(t, _)| t);
        async move { result }
    }

    async fn read_property(&self, property: &PropertyRef) -> Result<PropertyValue, GatewayError> {
        let script = self.record(Call::Read(property.clone()));
        self.settle(script).await?;
        self.lookup(property).map(|(_, v)| v)
    }

    async fn write_property(
        &self,
        property: &PropertyRef,
        value: PropertyValue,
    ) -> Result<(), GatewayError> {
        let script = self.record(Call::Write(property.clone(), value.clone()));
        self.settle(script).await?;
        let mut properties = self.properties.lock().unwrap();
        let slot = properties
            .get_mut(&(property.thing_id.clone(), property.name.clone()))
            .ok_or_else(|| Self::not_found("Property", property.to_string()))?;
        slot.1 = value;
        Ok(())
    }

    async fn invoke_action(
        &self,
        action: &ActionRef,
        params: serde_json::Value,
    ) -> Result<(), GatewayError> {
        let script = self.record(Call::Invoke(action.clone(), params));
        self.settle(script).await?;
        if self
            .actions
            .contains(&(action.thing_id.clone(), action.name.clone()))
        {
            Ok(())
        } else {
            Err(Self::not_found("Action", action.to_string()))
        }
    }
}

/// Fast timings so tests on a paused clock stay readable.
pub fn test_config() -> EffectConfig {
    EffectConfig {
        action_timeout_ms: 1_000,
        retry_backoff_ms: 100,
    }
}

pub fn context(gateway: &Arc<RecordingGateway>) -> EffectContext<RecordingGateway> {
    EffectContext::new(Arc::clone(gateway), &test_config(), EffectEventBus::new(64))
}
