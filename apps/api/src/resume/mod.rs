//! Resume intake over HTTP. The decoding itself lives in `crate::extraction`.

pub mod handlers;
