#![forbid(unsafe_code)]

pub mod adapter;
pub mod dump_coordinator;
pub mod dumper;
pub mod facade;
pub mod file_discovery;
pub mod remote;
pub mod rng;
pub mod single_flight;
pub mod watch;
