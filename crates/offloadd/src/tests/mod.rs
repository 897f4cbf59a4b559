//! Behavioural suites for the offload daemon.

mod support;
