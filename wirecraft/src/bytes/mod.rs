mod read_cursor;
pub use read_cursor::*;

mod write_cursor;
pub use write_cursor::*;
