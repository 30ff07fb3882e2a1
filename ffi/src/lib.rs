//! C FFI of the tcambuf crate.
//!
//! This crate provides a C API allowing capture pipelines written in C or C++
//! to wrap the frame memory they own into [`tcambuf::MemoryBuffer`]s and
//! share them with consumers.

pub mod memory_buffer;

static INIT: std::sync::Once = std::sync::Once::new();

/// Initialize the tcambuf library. This only sets up the proper hooks for
/// logging, so although it is not a hard requirement to call this function,
/// failure to do so will result in no logs being printed.
#[no_mangle]
pub extern "C" fn tcambuf_init() {
    INIT.call_once(|| {
        #[cfg(feature = "env_logger")]
        env_logger::builder().format_timestamp(None).init();

        #[cfg(feature = "android")]
        android_logger::init_once(
            android_logger::Config::default().with_min_level(log::Level::Trace),
        );
    });
}
