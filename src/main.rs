use anyhow::Result;
use clap::Parser;
use std::sync::Arc;
use tokio::signal;
use tokio::sync::mpsc;
use tracing::{error, info, warn};
mod config;
mod editor;
mod error;
mod events;
pub mod mappings;
mod services;
mod storage;
mod utils;

use config::{Config, LoggingConfig};
use editor::BuiltinLayout;
use services::{create_input_listener, spawn_console, spawn_status_logger, EditorCommand, OverlayRuntime};
use storage::PresetStore;

#[derive(Parser, Debug)]
#[command(name = "keystrokes-rust")]
#[command(about = "Оверлей нажатий клавиш и кнопок мыши с редактируемой раскладкой")]
struct Args {
    /// Путь к файлу конфигурации
    #[arg(short, long, default_value = "keystrokes.toml")]
    config: String,

    /// Режим сухого запуска (устройства ввода не читаются)
    #[arg(long)]
    dry_run: bool,

    /// Уровень логирования (по умолчанию logging.filter из конфигурации)
    #[arg(long)]
    log_level: Option<String>,

    /// Загрузить пресет при старте (имя в каталоге пресетов или путь)
    #[arg(long)]
    preset: Option<String>,

    /// Восстановить временную сессию прошлого запуска.
    /// При session.cleanup_on_exit = true (по умолчанию) сессия удаляется при выходе,
    /// поэтому для восстановления задайте cleanup_on_exit = false
    #[arg(long)]
    restore_session: bool,

    /// Вывести список пресетов и выйти
    #[arg(long)]
    list_presets: bool,

    /// Добавить встроенную раскладку при старте
    #[arg(long, value_enum)]
    builtin: Option<BuiltinLayout>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Загрузка конфигурации (до логирования: формат и фильтр берутся из неё)
    let config = Arc::new(Config::load(&args.config)?);

    // Инициализация системы логирования
    init_tracing(&config.logging, args.log_level.as_deref())?;

    info!("Запуск Keystrokes Rust v{}", env!("CARGO_PKG_VERSION"));
    info!("Конфигурация загружена из: {}", args.config);

    let store = match PresetStore::from_config(&config) {
        Ok(store) => {
            info!("Каталог данных: {}", store.root().display());
            Some(store)
        }
        Err(e) => {
            warn!("Пресеты и сессия недоступны: {}", e);
            None
        }
    };

    if args.list_presets {
        return list_presets(store.as_ref());
    }

    let mut runtime = OverlayRuntime::new(config.clone(), store);

    if args.restore_session && !runtime.restore_session() {
        info!("Начинаем с пустой раскладки");
    }
    if let Some(preset) = args.preset.clone() {
        runtime.handle_command(EditorCommand::Load { preset });
    }
    if let Some(layout) = args.builtin {
        runtime.handle_command(EditorCommand::Builtin(layout));
    }

    if args.dry_run {
        warn!("Режим сухого запуска - устройства ввода не читаются");
    } else {
        // Проверка прав доступа
        utils::permissions::check_permissions();
    }

    // Инициализация компонентов
    let (event_tx, event_rx) = mpsc::unbounded_channel();
    let (command_tx, command_rx) = mpsc::unbounded_channel();

    let input_listener = create_input_listener(config.clone(), event_tx, args.dry_run);
    let listener_handle = tokio::spawn(async move {
        if let Err(e) = input_listener.run().await {
            error!("Ошибка в InputListener: {}", e);
        }
    });
    let status_handle = spawn_status_logger(runtime.monitor().subscribe(), runtime.document().subscribe());
    spawn_console(command_tx);

    info!("Все сервисы запущены (help - список команд консоли)");

    // Ожидание сигнала завершения внутри основного цикла
    runtime
        .run(event_rx, command_rx, async {
            match signal::ctrl_c().await {
                Ok(()) => info!("Получен сигнал завершения (Ctrl+C)"),
                Err(err) => error!("Ошибка при ожидании сигнала завершения: {}", err),
            }
        })
        .await;

    info!("Завершение работы...");

    runtime.autosave();

    // Прерываем задачу слушателя: Drop закроет устройства
    listener_handle.abort();
    status_handle.abort();

    let shutdown_timeout = tokio::time::Duration::from_secs(5);
    let shutdown_result = tokio::time::timeout(shutdown_timeout, async {
        let _ = listener_handle.await;
        let _ = status_handle.await;
    })
    .await;

    match shutdown_result {
        Ok(_) => info!("Все сервисы завершили работу корректно"),
        Err(_) => warn!("Таймаут при завершении сервисов"),
    }

    if config.session.cleanup_on_exit {
        if let Some(store) = runtime.store() {
            store.remove_temporary_session();
        }
    }

    info!("Keystrokes Rust завершил работу");
    Ok(())
}

fn list_presets(store: Option<&PresetStore>) -> Result<()> {
    let Some(store) = store else {
        anyhow::bail!("Каталог данных недоступен");
    };

    let names = store.list_presets()?;
    if names.is_empty() {
        println!("Пресетов нет в {}", store.presets_dir().display());
    }
    for name in names {
        println!("{}", name);
    }
    Ok(())
}

fn init_tracing(logging: &LoggingConfig, cli_level: Option<&str>) -> Result<()> {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(logging.directive(cli_level)))?;

    let registry = tracing_subscriber::registry().with(filter);
    if logging.is_json() {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer().compact()).init();
    }

    Ok(())
}
