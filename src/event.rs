use std::io::{self, BufRead};
use std::sync::Arc;
use std::sync::mpsc;
use std::thread;

use crate::engine::activity_key::ActivityKey;
use crate::session::timer::TickSink;

pub enum AppEvent {
    Line(String),
    LockTick(ActivityKey),
    InputClosed,
}

/// Merges learner input and lockout ticks into one ordered stream.
pub struct EventHandler {
    rx: mpsc::Receiver<AppEvent>,
    tx: mpsc::Sender<AppEvent>,
}

impl EventHandler {
    pub fn new() -> Self {
        Self::from_reader(io::BufReader::new(io::stdin()))
    }

    pub fn from_reader<R: BufRead + Send + 'static>(reader: R) -> Self {
        let (tx, rx) = mpsc::channel();
        let input_tx = tx.clone();

        thread::spawn(move || {
            for line in reader.lines() {
                let Ok(line) = line else {
                    break;
                };
                if input_tx.send(AppEvent::Line(line)).is_err() {
                    return;
                }
            }
            let _ = input_tx.send(AppEvent::InputClosed);
        });

        Self { rx, tx }
    }

    pub fn tick_sink(&self) -> TickSink {
        let tx = self.tx.clone();
        Arc::new(move |key| tx.send(AppEvent::LockTick(key)).is_ok())
    }

    pub fn next(&self) -> anyhow::Result<AppEvent> {
        Ok(self.rx.recv()?)
    }
}

impl Default for EventHandler {
    fn default() -> Self {
        Self::new()
    }
}
