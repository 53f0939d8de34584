/// Reader and writer traits shared by every item source and sink.
pub mod item;
