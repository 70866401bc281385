/// Timed player actions: the staged effects a contact plays out.
///
/// A sequence is an ordered list of steps. Timed steps (move, scale)
/// interpolate linearly from the value captured when the step starts;
/// instant steps (remove, restore dynamics) run as soon as they are reached.
/// Time left over when a step ends flows into the next one, so a frame
/// that straddles two steps finishes the first and starts the second.
///
/// The session owns the running sequence, not the player, so the
/// completion still fires after a `Remove` step has dropped the ball.

use glam::Vec2;

use crate::domain::entity::{Player, VANISH_SCALE};

#[derive(Clone, Copy, PartialEq, Debug)]
pub enum Action {
    MoveTo { target: Vec2, duration: f32 },
    ScaleTo { scale: f32, duration: f32 },
    /// Take the player out of the scene.
    Remove,
    /// Let physics move the player again.
    RestoreDynamics,
}

/// What the session does once every step has run.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Completion {
    /// Player is back in play (after a teleport).
    Resume,
    /// Create a fresh player at the start and lift game-over.
    Respawn,
    /// Tear down the level and load the next one.
    AdvanceLevel,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Progress {
    Running,
    Finished(Completion),
}

#[derive(Clone, Debug)]
pub struct ActionSequence {
    steps: Vec<Action>,
    index: usize,
    elapsed: f32,
    started: bool,
    from_pos: Vec2,
    from_scale: f32,
    completion: Completion,
}

impl ActionSequence {
    pub fn new(steps: Vec<Action>, completion: Completion) -> Self {
        ActionSequence {
            steps,
            index: 0,
            elapsed: 0.0,
            started: false,
            from_pos: Vec2::ZERO,
            from_scale: 1.0,
            completion,
        }
    }

    /// Vortex: slide into it, shrink away, vanish, then respawn.
    pub fn swallow(into: Vec2, secs: f32) -> Self {
        Self::new(
            vec![
                Action::MoveTo { target: into, duration: secs },
                Action::ScaleTo { scale: VANISH_SCALE, duration: secs },
                Action::Remove,
            ],
            Completion::Respawn,
        )
    }

    /// Teleporter: sink into `entry`, reappear out of `exit`.
    pub fn teleport(entry: Vec2, exit: Vec2, secs: f32) -> Self {
        Self::new(
            vec![
                Action::MoveTo { target: entry, duration: secs },
                Action::ScaleTo { scale: VANISH_SCALE, duration: secs },
                Action::MoveTo { target: exit, duration: secs },
                Action::ScaleTo { scale: 1.0, duration: secs },
                Action::RestoreDynamics,
            ],
            Completion::Resume,
        )
    }

    /// Goal: slide into it, shrink away, vanish, then next level.
    pub fn finish(at: Vec2, secs: f32) -> Self {
        Self::new(
            vec![
                Action::MoveTo { target: at, duration: secs },
                Action::ScaleTo { scale: VANISH_SCALE, duration: secs },
                Action::Remove,
            ],
            Completion::AdvanceLevel,
        )
    }

    #[cfg(test)]
    pub fn steps(&self) -> &[Action] {
        &self.steps
    }

    pub fn completion(&self) -> Completion {
        self.completion
    }

    /// Spend `dt` seconds on the sequence.
    /// Timed steps on a missing player are skipped.
    pub fn advance(&mut self, dt: f32, player: &mut Option<Player>) -> Progress {
        let mut budget = dt.max(0.0);

        while let Some(&action) = self.steps.get(self.index) {
            match action {
                Action::MoveTo { target, duration } => {
                    let Some(p) = player.as_mut() else {
                        self.next_step();
                        continue;
                    };
                    if !self.started {
                        self.from_pos = p.pos;
                        self.started = true;
                    }
                    match self.spend(&mut budget, duration) {
                        Some(t) => {
                            p.pos = self.from_pos.lerp(target, t);
                            return Progress::Running;
                        }
                        None => {
                            p.pos = target;
                            self.next_step();
                        }
                    }
                }
                Action::ScaleTo { scale, duration } => {
                    let Some(p) = player.as_mut() else {
                        self.next_step();
                        continue;
                    };
                    if !self.started {
                        self.from_scale = p.scale;
                        self.started = true;
                    }
                    match self.spend(&mut budget, duration) {
                        Some(t) => {
                            p.scale = self.from_scale + (scale - self.from_scale) * t;
                            return Progress::Running;
                        }
                        None => {
                            p.scale = scale;
                            self.next_step();
                        }
                    }
                }
                Action::Remove => {
                    *player = None;
                    self.next_step();
                }
                Action::RestoreDynamics => {
                    if let Some(p) = player.as_mut() {
                        p.dynamic = true;
                    }
                    self.next_step();
                }
            }
        }

        Progress::Finished(self.completion)
    }

    /// Consume time for the current timed step. Returns the interpolation
    /// factor if the step is still running, `None` once it has ended
    /// (leaving the unused time in `budget`).
    fn spend(&mut self, budget: &mut f32, duration: f32) -> Option<f32> {
        let remaining = (duration - self.elapsed).max(0.0);
        if *budget < remaining {
            self.elapsed += *budget;
            *budget = 0.0;
            Some(self.elapsed / duration)
        } else {
            *budget -= remaining;
            None
        }
    }

    fn next_step(&mut self) {
        self.index += 1;
        self.elapsed = 0.0;
        self.started = false;
    }
}
