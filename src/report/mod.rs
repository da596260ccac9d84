// Result reporting: session summary text and the share sink.

pub mod share;
pub mod summary;
