use std::fs;
use std::path::Path;
use tracing::{info, warn};

const INPUT_DIR: &str = "/dev/input";

/// Проверить доступ к устройствам ввода.
///
/// Не фатально: без доступа слушатель не запустится, но редактор и пресеты работают.
pub fn check_permissions() -> bool {
    info!("Проверка прав доступа...");

    let accessible = check_input_devices_access();
    check_not_root();

    if accessible {
        info!("Проверка прав доступа завершена успешно");
    } else {
        for line in get_setup_commands() {
            warn!("   {}", line);
        }
    }
    accessible
}

fn check_input_devices_access() -> bool {
    if !Path::new(INPUT_DIR).exists() {
        warn!("Директория {} не существует", INPUT_DIR);
        return false;
    }

    match fs::read_dir(INPUT_DIR) {
        Ok(_) => {
            info!("Доступ к {} подтвержден", INPUT_DIR);
            true
        }
        Err(e) => {
            warn!("Нет доступа к {}: {}. Добавьте пользователя в группу 'input'", INPUT_DIR, e);
            false
        }
    }
}

fn check_not_root() {
    match std::env::var("USER") {
        Ok(user) if user == "root" => {
            warn!("⚠️  Приложение запущено от имени root!");
            warn!("   Для чтения /dev/input достаточно группы 'input'");
        }
        Ok(user) => {
            info!("Приложение запущено от имени пользователя: {}", user);
        }
        Err(_) => {
            warn!("Не удалось определить пользователя");
        }
    }
}

/// Рекомендуемые команды для настройки прав доступа
pub fn get_setup_commands() -> Vec<String> {
    vec![
        "# Добавить пользователя в группу input:".to_string(),
        "sudo usermod -a -G input $USER".to_string(),
        "# После выполнения команды перезайдите в систему".to_string(),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_setup_commands() {
        let commands = get_setup_commands();
        assert!(commands.iter().any(|cmd| cmd.contains("usermod")));
        assert!(!commands.iter().any(|cmd| cmd.contains("uinput")));
    }
}
