//! Thin wrapper around `env_logger`, in the same shape as the teacher repo's
//! `src/log.rs`: a single `init()` the embedder (or a test) calls once.

use env_logger::Builder;
use std::io::Write;

pub fn init() {
    let mut builder = Builder::from_default_env();
    builder
        .format_timestamp_micros()
        .format(|buf, record| {
            writeln!(
                buf,
                "[{} {}] {}",
                record.level(),
                record.target(),
                record.args()
            )
        })
        .is_test(cfg!(test))
        .try_init()
        .ok();
}
