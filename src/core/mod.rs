//! Core decoding logic
//!
//! - `cq2py`: CodeQuilt notation to Python source

pub mod cq2py;
