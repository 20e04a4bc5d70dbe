use env_logger::{Builder, Env};
use std::io::Write;

/// Фильтр по умолчанию, если `RUST_LOG` не задан.
/// Подробности по каждой записи состояния нужны только при отладке.
pub const DEFAULT_FILTER: &str = "warn,narration_sync=info,narration_sync::reader::store=info";

/// Настроить `env_logger` для приложения. Повторный вызов ничего не делает.
pub fn init_logger() {
    let env = Env::default().filter_or("RUST_LOG", DEFAULT_FILTER);

    if build_logger(env).try_init().is_err() {
        log::debug!("Logger is already initialized");
    }
}

fn build_logger(env: Env) -> Builder {
    let mut builder = Builder::from_env(env);

    builder
        .format(|buf, record| {
            writeln!(
                buf,
                "[{}] {}: {}",
                record.level(),
                record.target(),
                record.args()
            )
        })
        .target(env_logger::Target::Stderr);

    builder
}
