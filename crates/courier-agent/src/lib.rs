pub mod error;
pub mod openai;

pub use error::BridgeError;
pub use openai::OpenAiBridge;
