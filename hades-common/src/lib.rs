#![cfg_attr(not(test), no_std)]

//! Shared core of the hades rootkit detector.
//!
//! Everything in here runs inside the eBPF program as well as on the host:
//! no allocation, bounded loops, and every kernel access goes through the
//! collaborator traits in [`probe`].

pub mod consts;
pub mod event;
pub mod gate;
pub mod hooks;
pub mod ksym;
pub mod probe;
pub mod record;
pub mod scan;
pub mod task;

mod error;

#[cfg(test)]
mod support;

pub use self::error::{Error, ReadFault, Result};
