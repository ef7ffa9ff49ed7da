//! Scripted Gateway
//!
//! A `Gateway` whose responses are queued up front by the test. Every call
//! is recorded so tests can assert on what was (or was not) sent.

use async_trait::async_trait;
use core_kernel::PortError;
use domain_payments::{Gateway, GatewayResponse, OperationRequest, OperationType};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// One recorded gateway call
#[derive(Debug, Clone, PartialEq)]
pub struct GatewayCall {
    pub operation: OperationType,
    pub request: OperationRequest,
}

/// Gateway returning queued responses, approving once the queue is empty
#[derive(Debug, Default)]
pub struct ScriptedGateway {
    script: Mutex<VecDeque<Result<GatewayResponse, String>>>,
    calls: Mutex<Vec<GatewayCall>>,
    sequence: AtomicU64,
    requires_email: bool,
    latency: Duration,
}

impl ScriptedGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn requiring_email(mut self) -> Self {
        self.requires_email = true;
        self
    }

    /// Sleeps this long inside every call, keeping requests in flight
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Queues an approval carrying `transaction_id`
    pub fn approve_next(&self, transaction_id: &str) -> &Self {
        self.push(Ok(GatewayResponse::approved(transaction_id, "APPROVED")))
    }

    /// Queues a decline with the gateway's error text
    pub fn decline_next(&self, message: &str) -> &Self {
        self.push(Ok(GatewayResponse::declined("DECLINED", message)))
    }

    /// Queues a transport failure
    pub fn fail_next(&self, message: &str) -> &Self {
        self.push(Err(message.to_string()))
    }

    fn push(&self, response: Result<GatewayResponse, String>) -> &Self {
        self.script.lock().unwrap().push_back(response);
        self
    }

    pub fn calls(&self) -> Vec<GatewayCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn operations(&self) -> Vec<OperationType> {
        self.calls().into_iter().map(|c| c.operation).collect()
    }

    pub fn last_call(&self) -> Option<GatewayCall> {
        self.calls.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl Gateway for ScriptedGateway {
    fn name(&self) -> &str {
        "scripted"
    }

    fn requires_email(&self) -> bool {
        self.requires_email
    }

    async fn submit(
        &self,
        operation: OperationType,
        request: &OperationRequest,
    ) -> Result<GatewayResponse, PortError> {
        self.calls.lock().unwrap().push(GatewayCall {
            operation,
            request: request.clone(),
        });
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        let scripted = self.script.lock().unwrap().pop_front();
        match scripted {
            Some(Ok(response)) => Ok(response),
            Some(Err(message)) => Err(PortError::connection(message)),
            None => {
                let n = self.sequence.fetch_add(1, Ordering::SeqCst) + 1;
                Ok(GatewayResponse::approved(format!("gw_auto_{n:04}"), "APPROVED"))
            }
        }
    }
}
