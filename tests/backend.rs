#[path = "support/backend_harness.rs"]
mod harness;

#[path = "backend/api.rs"]
mod api;
#[path = "backend/extension_flow.rs"]
mod extension_flow;
