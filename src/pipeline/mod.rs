// src/pipeline/mod.rs

pub mod annotators;
pub mod readers;
pub mod writers;
