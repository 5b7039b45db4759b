//! The session router: decides, for every inbound unit, who sees it (the
//! order aggregator, a menu handler, a profile or search sub-flow, the
//! operator relay, or the general responder) and owns the assignment
//! protocol and the reconciliation sweep.

pub mod content;
pub mod operator;
pub mod profile;
pub mod responder;
pub mod route;
pub mod sweep;
pub mod wizard;

pub use {responder::Responder, route::Router};
