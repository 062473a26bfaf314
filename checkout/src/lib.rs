pub mod assembler;
pub mod cart;
pub mod error;
pub mod fulfillment;
pub mod memory;
pub mod model;
pub mod money;
pub mod pricing;
pub mod settlement;
pub mod storage;
pub mod webhook;
