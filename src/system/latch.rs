// src/system/latch.rs

use std::sync::Mutex;
use tokio::sync::oneshot;

/// Cerrojo de un solo disparo: varias señales pueden intentar completarlo,
/// pero solo la primera llega al receptor. Las demás se ignoran.
pub struct CompletionLatch<T> {
    sender: Mutex<Option<oneshot::Sender<T>>>,
}

/// Crea el cerrojo y el receptor que recibirá, como mucho, un valor.
pub fn completion_latch<T>() -> (CompletionLatch<T>, oneshot::Receiver<T>) {
    let (tx, rx) = oneshot::channel();
    let latch = CompletionLatch {
        sender: Mutex::new(Some(tx)),
    };
    (latch, rx)
}

impl<T> CompletionLatch<T> {
    /// Intenta completar. Devuelve `true` solo para la señal que gana.
    pub fn fire(&self, value: T) -> bool {
        let sender = match self.sender.lock() {
            Ok(mut slot) => slot.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        match sender {
            Some(tx) => {
                // Si el receptor ya no existe no hay nadie a quien avisar, pero la señal ganó igual.
                let _ = tx.send(value);
                true
            }
            None => false,
        }
    }
}
