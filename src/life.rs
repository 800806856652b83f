use crate::config::DEATH_SINK_SPEED;
use crate::steering::smoothstep;
use std::fmt;

/// Animated existence status of one population slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LifeState {
    #[default]
    Alive,
    Dying,
    Dead,
    Newborn,
}

impl fmt::Display for LifeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LifeState::Alive => "alive",
            LifeState::Dying => "dying",
            LifeState::Dead => "dead",
            LifeState::Newborn => "newborn",
        };
        f.write_str(name)
    }
}

/// What the agent should do after its life timers advanced this tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LifeStep {
    /// Dead agents are skipped entirely
    Skip,
    /// The agent finished dying this tick and is skipped from now on
    Died,
    /// Keep simulating; `sink` is how far a dying body sinks this tick
    Live { sink: f32 },
}

/// Life state plus the continuous multipliers rendering consumes.
///
/// Every transition out of `Alive` is triggered externally by the
/// generation orchestrator; `advance` only finishes animations already started.
#[derive(Debug, Clone, PartialEq)]
pub struct Vitality {
    state: LifeState,
    death_timer: f32,
    newborn_timer: f32,
    scale: f32,
    visibility: f32,
}

impl Default for Vitality {
    fn default() -> Self {
        Self {
            state: LifeState::Alive,
            death_timer: 0.0,
            newborn_timer: 0.0,
            scale: 1.0,
            visibility: 1.0,
        }
    }
}

impl Vitality {
    pub fn state(&self) -> LifeState {
        self.state
    }

    /// Size multiplier in `[0, 1]`
    pub fn scale(&self) -> f32 {
        self.scale
    }

    /// Opacity multiplier in `[0, 1]`
    pub fn visibility(&self) -> f32 {
        self.visibility
    }

    /// Dead slots are excluded from flocking and rendering
    pub fn is_active(&self) -> bool {
        self.state != LifeState::Dead
    }

    fn set_full(&mut self, level: f32) {
        self.scale = level;
        self.visibility = level;
    }

    /// Start the death animation from full size
    pub fn mark_doomed(&mut self) {
        self.state = LifeState::Dying;
        self.death_timer = 0.0;
        self.set_full(1.0);
    }

    /// Bring a dead slot back as a survivor. Returns `false` (and changes
    /// nothing) unless the slot was dead.
    pub fn resurrect(&mut self) -> bool {
        if self.state != LifeState::Dead {
            return false;
        }
        self.state = LifeState::Alive;
        self.death_timer = 0.0;
        self.newborn_timer = 0.0;
        self.set_full(1.0);
        true
    }

    /// Start the birth animation from nothing
    pub fn mark_newborn(&mut self) {
        self.state = LifeState::Newborn;
        self.newborn_timer = 0.0;
        self.death_timer = 0.0;
        self.set_full(0.0);
    }

    /// Advance the running animation by `dt` seconds
    pub fn advance(&mut self, dt: f32, death_duration: f32, newborn_duration: f32) -> LifeStep {
        match self.state {
            LifeState::Dead => LifeStep::Skip,
            LifeState::Alive => {
                self.set_full(1.0);
                LifeStep::Live { sink: 0.0 }
            }
            LifeState::Dying => {
                self.death_timer += dt;
                let t = (self.death_timer / death_duration.max(1e-4)).clamp(0.0, 1.0);
                if t >= 1.0 {
                    self.state = LifeState::Dead;
                    self.set_full(0.0);
                    return LifeStep::Died;
                }
                let fade = 1.0 - t;
                self.set_full(fade);
                LifeStep::Live {
                    sink: dt * DEATH_SINK_SPEED * fade,
                }
            }
            LifeState::Newborn => {
                self.newborn_timer += dt;
                let t = (self.newborn_timer / newborn_duration.max(1e-4)).clamp(0.0, 1.0);
                if t >= 1.0 {
                    self.state = LifeState::Alive;
                    self.death_timer = 0.0;
                    self.set_full(1.0);
                } else {
                    self.set_full(smoothstep(0.0, 1.0, t));
                }
                LifeStep::Live { sink: 0.0 }
            }
        }
    }
}
