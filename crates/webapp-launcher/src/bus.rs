use serde::Serialize;
use serde_json::Value;

const BUS_SCHEMES: &[&str] = &["luna://", "palm://"];

/// Who a bus call is made on behalf of. Privileged callers use the private bus.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BusCredential {
    pub app_id: String,
    pub privileged: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BusRequest {
    pub uri: String,
    pub credential: BusCredential,
    pub payload: Value,
}

impl BusRequest {
    pub fn new(
        uri: impl Into<String>,
        credential: BusCredential,
        payload: Value,
    ) -> Result<Self, BusError> {
        let uri = uri.into();
        if !BUS_SCHEMES.iter().any(|scheme| uri.starts_with(scheme)) {
            return Err(BusError::InvalidUri(uri));
        }
        Ok(Self {
            uri,
            credential,
            payload,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BusError {
    #[error("service bus unavailable: {0}")]
    Unavailable(String),
    #[error("invalid service uri: {0}")]
    InvalidUri(String),
}

/// Blocking request/response access to the system service bus.
///
/// Exactly one round trip per call; callers never retry.
pub trait ServiceBus {
    fn call(&mut self, request: &BusRequest) -> Result<Value, BusError>;
}

/// Bus used when no service daemon is reachable. Every call fails.
#[derive(Debug, Default)]
pub struct NullBus;

impl ServiceBus for NullBus {
    fn call(&mut self, request: &BusRequest) -> Result<Value, BusError> {
        Err(BusError::Unavailable(request.uri.clone()))
    }
}

#[cfg(test)]
#[derive(Debug, Default)]
pub struct MockServiceBus {
    requests: Vec<BusRequest>,
    replies: std::collections::HashMap<String, Result<Value, BusError>>,
}

#[cfg(test)]
impl MockServiceBus {
    pub fn reply(mut self, uri: &str, reply: Result<Value, BusError>) -> Self {
        self.replies.insert(uri.to_owned(), reply);
        self
    }

    pub fn requests(&self) -> &[BusRequest] {
        &self.requests
    }
}

#[cfg(test)]
impl ServiceBus for MockServiceBus {
    fn call(&mut self, request: &BusRequest) -> Result<Value, BusError> {
        self.requests.push(request.clone());
        self.replies
            .get(&request.uri)
            .cloned()
            .unwrap_or_else(|| Err(BusError::Unavailable(request.uri.clone())))
    }
}
