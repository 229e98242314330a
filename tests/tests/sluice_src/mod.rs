//! Integration tests for sluice-src

mod flushing;
mod lifecycle;
mod live;
mod negotiation;
mod pull;
mod seeking;
