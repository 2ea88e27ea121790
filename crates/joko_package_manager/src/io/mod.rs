pub mod deserialize;
pub mod source;
pub mod tbin;
