mod receiver;
mod ringbuf;

pub use receiver::*;
pub use ringbuf::*;
