//! Inbound input and outbound presentation events
//!
//! Input producers may live on other threads: they hold an `InputSender` and
//! push pointer events into a bounded channel that the tick drains once.

use crossbeam_channel::{Receiver, Sender, TrySendError, bounded};
use glam::Vec2;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::enemy::EnemyKind;
use super::shield::ArmourSide;

/// A pointer sample in game units
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InputEvent {
    pub point: Vec2,
    /// True for down/move, false for up
    pub pressed: bool,
}

impl InputEvent {
    pub fn press(point: Vec2) -> Self {
        Self {
            point,
            pressed: true,
        }
    }

    pub fn release(point: Vec2) -> Self {
        Self {
            point,
            pressed: false,
        }
    }
}

/// Input hand-off errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum InputError {
    /// Queue is full (backpressure)
    #[error("input queue is full")]
    Full,
    /// The game was dropped
    #[error("input queue is disconnected")]
    Disconnected,
}

/// Bounded input queue drained once per tick
#[derive(Debug, Clone)]
pub struct InputQueue {
    sender: Sender<InputEvent>,
    receiver: Receiver<InputEvent>,
}

impl InputQueue {
    pub fn new(capacity: usize) -> Self {
        let (sender, receiver) = bounded(capacity);
        Self { sender, receiver }
    }

    /// Create a sender handle for a producer
    pub fn sender(&self) -> InputSender {
        InputSender {
            sender: self.sender.clone(),
        }
    }

    /// Take everything queued so far; events pushed afterwards wait for the next tick
    pub fn drain(&self) -> Vec<InputEvent> {
        let pending = self.receiver.len();
        self.receiver.try_iter().take(pending).collect()
    }

    #[inline]
    pub fn pending_count(&self) -> usize {
        self.receiver.len()
    }
}

impl Default for InputQueue {
    fn default() -> Self {
        Self::new(256)
    }
}

/// Clonable producer handle
#[derive(Debug, Clone)]
pub struct InputSender {
    sender: Sender<InputEvent>,
}

impl InputSender {
    /// Queue an event without blocking
    pub fn try_send(&self, event: InputEvent) -> Result<(), InputError> {
        self.sender.try_send(event).map_err(|e| match e {
            TrySendError::Full(_) => InputError::Full,
            TrySendError::Disconnected(_) => InputError::Disconnected,
        })
    }
}

/// Named visual effects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EffectKind {
    RedBolt,
    GreenBolt,
    RedBomb,
    YellowBomb,
}

impl EffectKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EffectKind::RedBolt => "redbolt",
            EffectKind::GreenBolt => "greenbolt",
            EffectKind::RedBomb => "redbomb",
            EffectKind::YellowBomb => "yellowbomb",
        }
    }
}

/// A scripted or engine-emitted text command with an optional parameter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelText {
    pub command: String,
    pub parameter: Option<String>,
}

impl LevelText {
    pub fn new(command: impl Into<String>, parameter: Option<String>) -> Self {
        Self {
            command: command.into(),
            parameter,
        }
    }
}

/// Presentation requests produced by the simulation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GameEvent {
    /// Projectile detonation
    Effect { effect: EffectKind, position: Vec2 },
    /// Enemy debris
    EnemyGibs {
        kind: EnemyKind,
        position: Vec2,
        rotation: f32,
    },
    /// Armour debris
    ArmourGibs {
        side: ArmourSide,
        position: Vec2,
        rotation: f32,
    },
    /// Banner, score change or other level text
    LevelText(LevelText),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_queue_drains_in_order() {
        let queue = InputQueue::new(8);
        let sender = queue.sender();
        sender.try_send(InputEvent::press(Vec2::new(1.0, 2.0))).unwrap();
        sender.try_send(InputEvent::release(Vec2::new(1.0, 2.0))).unwrap();
        assert_eq!(queue.pending_count(), 2);

        let events = queue.drain();
        assert_eq!(events.len(), 2);
        assert!(events[0].pressed);
        assert!(!events[1].pressed);
        assert!(queue.drain().is_empty());
    }

    #[test]
    fn test_queue_backpressure() {
        let queue = InputQueue::new(1);
        let sender = queue.sender();
        assert!(sender.try_send(InputEvent::press(Vec2::ZERO)).is_ok());
        assert_eq!(sender.try_send(InputEvent::press(Vec2::ZERO)), Err(InputError::Full));
    }

    #[test]
    fn test_cross_thread_handoff() {
        let queue = InputQueue::new(64);
        let sender = queue.sender();
        let producer = std::thread::spawn(move || {
            for i in 0..10 {
                sender.try_send(InputEvent::press(Vec2::new(i as f32, 0.0))).unwrap();
            }
        });
        producer.join().unwrap();
        assert_eq!(queue.drain().len(), 10);
    }
}
