//! TPI Hardware Abstraction Layer
//!
//! This crate defines the byte-link traits the TPI protocol runs over. The
//! protocol and session code only ever needs four primitives from a serial
//! port: open it, read one byte with a bounded wait, write a run of bytes,
//! and close it. Concrete ports (the `serialport` backend, in-memory test
//! links) implement these traits.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │  tpi-driver (Session, Heartbeat)        │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//! ┌─────────────────────────────────────────┐
//! │  tpi-hal (this crate - traits)          │
//! └─────────────────────────────────────────┘
//!                     │
//!         ┌───────────┴───────────┐
//!         ▼                       ▼
//! ┌───────────────┐       ┌───────────────┐
//! │ tpi-hal-      │       │   MockLink    │
//! │  serialport   │       │   (tests)     │
//! └───────────────┘       └───────────────┘
//! ```

#![no_std]
#![deny(unsafe_code)]

pub mod link;

pub use link::{
    ErrorType, Link, LinkConfig, LinkRx, LinkTx, DEFAULT_BAUD_RATE, DEFAULT_BYTE_TIMEOUT,
};
