//! Penalized linear regression.
//!
//! ElasticNet combines L1 and L2 penalties and is fitted by cyclic coordinate
//! descent on centered data, so the intercept is never penalized.

mod elastic_net;

pub use elastic_net::{ElasticNet, ElasticNetConfig, ElasticNetModel};
