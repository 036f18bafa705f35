//! On-screen control buttons
//!
//! Buttons only track pressed and triggered state; drawing them is left to
//! the presentation layer. The simulation polls `triggered` once per tick.

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// When a button reports itself triggered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ButtonBehaviour {
    /// Fires once when pressed
    OnPress,
    /// Fires once when released over the button
    OnRelease,
    /// Each press flips the state
    Toggle,
    /// Triggered for as long as it is held
    WhileHeld,
}

/// A rectangular button in game units
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Button {
    pub bottom_left: Vec2,
    pub top_right: Vec2,
    pub behaviour: ButtonBehaviour,
    pub active: bool,
    pressed: bool,
    triggered: bool,
    /// Pressed since the last poll; blocks re-pressing within one tick
    pressed_since_poll: bool,
    /// Ticks held during the current press
    pressed_length: u32,
}

impl Button {
    pub fn new(bottom_left: Vec2, top_right: Vec2, behaviour: ButtonBehaviour) -> Self {
        Self {
            bottom_left,
            top_right,
            behaviour,
            active: true,
            pressed: false,
            triggered: false,
            pressed_since_poll: false,
            pressed_length: 0,
        }
    }

    /// Inclusive on every edge
    pub fn contains(&self, point: Vec2) -> bool {
        point.cmpge(self.bottom_left).all() && point.cmple(self.top_right).all()
    }

    pub fn is_pressed(&self) -> bool {
        self.pressed
    }

    pub fn is_triggered(&self) -> bool {
        self.triggered
    }

    pub fn pressed_length(&self) -> u32 {
        self.pressed_length
    }

    /// Count ticks held
    pub fn update(&mut self) {
        if self.pressed {
            self.pressed_length += 1;
        }
    }

    /// Pointer down or moved to `point`; returns whether the point is on the button
    pub fn press(&mut self, point: Vec2) -> bool {
        let inside = self.contains(point);
        if self.active && inside && !self.pressed && !self.pressed_since_poll {
            match self.behaviour {
                ButtonBehaviour::OnPress | ButtonBehaviour::WhileHeld => self.triggered = true,
                ButtonBehaviour::Toggle => self.triggered = !self.triggered,
                ButtonBehaviour::OnRelease => {}
            }
            self.pressed = true;
            self.pressed_since_poll = true;
            self.pressed_length = 0;
        } else if !inside && self.pressed {
            // Slid off
            self.pressed = false;
            if self.behaviour == ButtonBehaviour::WhileHeld {
                self.triggered = false;
            }
        }
        inside
    }

    /// Pointer up at `point`
    pub fn release(&mut self, point: Vec2) {
        if self.active && self.contains(point) && self.pressed {
            match self.behaviour {
                ButtonBehaviour::OnRelease => self.triggered = true,
                ButtonBehaviour::WhileHeld => self.triggered = false,
                ButtonBehaviour::OnPress | ButtonBehaviour::Toggle => {}
            }
        }
        self.pressed = false;
    }

    /// Read the triggered state; one-shot behaviours clear it
    pub fn poll(&mut self) -> bool {
        self.pressed_since_poll = false;
        match self.behaviour {
            ButtonBehaviour::OnPress | ButtonBehaviour::OnRelease => {
                std::mem::take(&mut self.triggered)
            }
            ButtonBehaviour::Toggle | ButtonBehaviour::WhileHeld => self.triggered,
        }
    }

    /// Enable or disable; disabling drops any press in progress
    pub fn set_active(&mut self, active: bool) {
        self.active = active;
        if !active {
            self.pressed = false;
            self.pressed_since_poll = false;
            if self.behaviour != ButtonBehaviour::Toggle {
                self.triggered = false;
            }
        }
    }

    pub fn reset(&mut self) {
        self.pressed = false;
        self.triggered = false;
        self.pressed_since_poll = false;
        self.pressed_length = 0;
    }
}

/// The four gameplay buttons along the bottom of the screen
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControlPanel {
    pub bomb: Button,
    pub auto_fire: Button,
    pub pause: Button,
    pub shield: Button,
}

impl Default for ControlPanel {
    fn default() -> Self {
        Self {
            bomb: Button::new(
                Vec2::new(-6.75, -4.75),
                Vec2::new(-2.0, -0.75),
                ButtonBehaviour::OnRelease,
            ),
            auto_fire: Button::new(
                Vec2::new(-2.0, -2.5),
                Vec2::new(2.0, -0.25),
                ButtonBehaviour::Toggle,
            ),
            pause: Button::new(
                Vec2::new(-2.0, -5.25),
                Vec2::new(2.0, -2.5),
                ButtonBehaviour::Toggle,
            ),
            shield: Button::new(
                Vec2::new(2.0, -4.75),
                Vec2::new(6.75, -0.75),
                ButtonBehaviour::OnRelease,
            ),
        }
    }
}

impl ControlPanel {
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Button> {
        [
            &mut self.bomb,
            &mut self.auto_fire,
            &mut self.pause,
            &mut self.shield,
        ]
        .into_iter()
    }

    pub fn update(&mut self) {
        self.iter_mut().for_each(Button::update);
    }

    /// Offer a press to every button; true if any button covers the point
    pub fn press(&mut self, point: Vec2) -> bool {
        // Every button must see the press so slid-off buttons let go
        self.iter_mut().fold(false, |hit, b| b.press(point) | hit)
    }

    pub fn release(&mut self, point: Vec2) {
        self.iter_mut().for_each(|b| b.release(point));
    }
}
