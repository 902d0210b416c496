// Build model, text formatters, import-code codec, and error modeling.
pub mod build;
pub mod codec;
pub mod error;
pub mod item;
pub mod sockets;
pub mod xml;
