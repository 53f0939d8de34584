pub mod mocks;

pub use mocks::{MockFile, full_disk};
