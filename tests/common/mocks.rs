//! Mock of a file handle, used to simulate device failures while writing rows.
use mockall::mock;

use std::io::{self, Write};

mock! {
    pub File {}
    impl Write for File {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize>;
        fn flush(&mut self) -> io::Result<()>;
    }
}

/// A file whose every write fails as if the disk were full.
pub fn full_disk() -> MockFile {
    let mut file = MockFile::new();
    file.expect_write()
        .returning(|_| Err(io::Error::other("no space left on device")));
    file.expect_flush().returning(|| Ok(()));
    file
}
