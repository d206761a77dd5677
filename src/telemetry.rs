//! Logging setup.
//!
//! `READALONG_LOG` takes an `EnvFilter` directive (for example
//! `"info,glance=debug"`). `READALONG_LOG_FORMAT=json` switches to JSON lines.
//! Logs go to stderr so they never interleave with the story on stdout.

use tracing_subscriber::EnvFilter;

pub fn init_tracing() {
    let filter = EnvFilter::try_from_env("READALONG_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr);

    match std::env::var("READALONG_LOG_FORMAT").as_deref() {
        Ok("json") => builder.json().init(),
        _ => builder.init(),
    }
}
