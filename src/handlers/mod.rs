pub mod avatar_handlers;
pub mod health_handlers;
pub mod rpc_handlers;
