pub mod layout;
mod process;
mod reader;

#[cfg(test)]
pub mod mock;

pub use process::*;
pub use reader::{
    ByteBuffer, MemoryReader, ReadMemory, decode_latin1, decode_utf16le, is_plausible_pointer,
};

#[cfg(test)]
pub use mock::{MockMemoryBuilder, MockMemoryReader};
