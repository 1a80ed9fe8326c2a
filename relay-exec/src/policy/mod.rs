mod controller;
mod request;
mod response;
mod wire;

pub use controller::CallController;
pub use request::{BuildError, RequestPolicy};
pub use response::{ResponseError, ResponsePolicy};
pub use wire::{HttpMethod, WireRequest, WireResponse};
