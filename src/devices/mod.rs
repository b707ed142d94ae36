//! Device implementations

pub mod mindwave;
