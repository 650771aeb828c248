// Lua 5.4 Standard Libraries Implementation

// #[cfg(feature = "async")]
// pub mod async_lib;
pub mod basic;
pub mod coroutine;
pub mod debug;
// #[cfg(feature = "loadlib")]
// pub mod ffi;
pub mod io;
pub mod math;
pub mod os;
pub mod package;
pub mod string;
pub mod table;
pub mod utf8;
