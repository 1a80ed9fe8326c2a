use relay_core::Value;

use super::wire::{WireRequest, WireResponse};

/// Per-attempt state of one backend call: the ambient document it was admitted with,
/// the wire request/response, and the output slot the response policy fills.
#[derive(Debug, Clone)]
pub struct CallController {
    call_id: String,
    service_name: String,
    context: Value,
    request: WireRequest,
    response: Option<WireResponse>,
    output: Option<Value>,
}

impl CallController {
    pub fn new(call_id: impl Into<String>, service_name: impl Into<String>, context: Value) -> Self {
        Self {
            call_id: call_id.into(),
            service_name: service_name.into(),
            context,
            request: WireRequest::default(),
            response: None,
            output: None,
        }
    }

    pub fn call_id(&self) -> &str {
        &self.call_id
    }

    pub fn service_name(&self) -> &str {
        &self.service_name
    }

    pub fn context(&self) -> &Value {
        &self.context
    }

    pub fn request(&self) -> &WireRequest {
        &self.request
    }

    pub fn set_request(&mut self, request: WireRequest) {
        self.request = request;
    }

    pub fn response(&self) -> Option<&WireResponse> {
        self.response.as_ref()
    }

    pub fn set_response(&mut self, response: WireResponse) {
        self.response = Some(response);
    }

    pub fn output(&self) -> Option<&Value> {
        self.output.as_ref()
    }

    pub fn set_output(&mut self, output: Value) {
        self.output = Some(output);
    }

    pub fn take_output(&mut self) -> Option<Value> {
        self.output.take()
    }
}
