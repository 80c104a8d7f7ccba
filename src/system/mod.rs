// src/system/mod.rs

pub mod api;
pub mod latch;

#[cfg(test)]
pub(crate) mod testing;
