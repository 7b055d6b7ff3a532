mod client;
mod codec;
mod protocol;
mod service;

pub use client::*;
pub use codec::*;
pub use protocol::*;
pub use service::*;
