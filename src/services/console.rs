use std::io::{self, BufRead};
use std::thread;
use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::editor::{DocumentChange, EditorMode};
use crate::services::activity::ActivityState;
use crate::services::command::{EditorCommand, COMMAND_HELP};

/// Текстовая консоль на stdin: каждая строка становится `EditorCommand`.
///
/// Чтение блокирующее, поэтому идёт в отдельном потоке ОС, а не в задаче tokio:
/// так завершение рантайма не ждёт ввода. Конец ввода не останавливает оверлей.
pub fn spawn_console(commands: mpsc::UnboundedSender<EditorCommand>) {
    let spawned = thread::Builder::new()
        .name("console".to_string())
        .spawn(move || read_commands(io::stdin().lock(), &commands));

    if let Err(e) = spawned {
        warn!("Не удалось запустить консоль: {}", e);
    }
}

fn read_commands(input: impl BufRead, commands: &mpsc::UnboundedSender<EditorCommand>) {
    for line in input.lines() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                warn!("Ошибка чтения stdin: {}", e);
                return;
            }
        };

        match line.trim() {
            "" => continue,
            "help" => {
                for entry in COMMAND_HELP {
                    info!("{}", entry);
                }
                continue;
            }
            _ => {}
        }

        match line.parse::<EditorCommand>() {
            Ok(command) => {
                if commands.send(command).is_err() {
                    return;
                }
            }
            Err(e) => warn!("{} (help - список команд)", e),
        }
    }
    debug!("stdin закрыт, консоль остановлена");
}

/// Наблюдатель за снимками активности и изменениями документа.
/// Пишет в лог то, что отрисовал бы слой оверлея.
pub fn spawn_status_logger(
    mut activity: watch::Receiver<ActivityState>,
    mut changes: broadcast::Receiver<DocumentChange>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut last_rates = (0.0, 0.0);
        let mut last_pressed = 0;

        loop {
            tokio::select! {
                changed = activity.changed() => {
                    if changed.is_err() {
                        return;
                    }
                    let (rates, pressed) = {
                        let state = activity.borrow_and_update();
                        (
                            (state.left_cps(), state.right_cps()),
                            state.pressed_keys().len() + state.pressed_buttons().len(),
                        )
                    };
                    if pressed != last_pressed {
                        debug!("Удерживается клавиш и кнопок: {}", pressed);
                        last_pressed = pressed;
                    }
                    if rates != last_rates {
                        debug!("CPS: LMB {} / RMB {}", rates.0, rates.1);
                        last_rates = rates;
                    }
                }
                change = changes.recv() => match change {
                    Ok(DocumentChange::Mode(EditorMode::AddingKey)) => {
                        info!("Нажмите клавишу или кнопку мыши, чтобы добавить её на оверлей");
                    }
                    Ok(change) => debug!("Изменение раскладки: {:?}", change),
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        debug!("Пропущено уведомлений раскладки: {}", skipped);
                    }
                    Err(broadcast::error::RecvError::Closed) => return,
                },
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::editor::BuiltinLayout;

    #[test]
    fn test_read_commands_skips_invalid_lines() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let input = "undo\n\nfly away\nhelp\nbuiltin mouse\nquit\n";

        read_commands(input.as_bytes(), &tx);

        assert_eq!(rx.try_recv().unwrap(), EditorCommand::Undo);
        assert_eq!(rx.try_recv().unwrap(), EditorCommand::Builtin(BuiltinLayout::Mouse));
        assert_eq!(rx.try_recv().unwrap(), EditorCommand::Shutdown);
        assert!(rx.try_recv().is_err());
    }
}
