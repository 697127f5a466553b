#![deny(dead_code)]
#![deny(unused_imports)]
#![deny(unused_variables)]

pub mod auditor;
pub mod config;
pub mod costs;
pub mod data;
pub mod dataset;
pub mod learner;
pub mod metrics;
pub mod oracle;
pub mod play;
pub mod regression;

#[cfg(test)]
pub mod test_fixtures;
