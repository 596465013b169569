use std::fs::OpenOptions;
use std::sync::Mutex;

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// 日志同时输出到终端和工作目录下的 app.log
pub fn init_logger() {
    let file_layer = OpenOptions::new()
        .create(true)
        .append(true)
        .open("app.log")
        .ok()
        .map(|file| fmt::layer().with_ansi(false).with_writer(Mutex::new(file)));

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "tareagen=info".into()))
        .with(fmt::layer())
        .with(file_layer)
        .init();
}
