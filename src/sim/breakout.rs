//! Breakout rules: paddle, ball, bricks, lives and score.
//!
//! The arena spans `0..width` horizontally and `0..height` vertically with
//! `y` pointing up. The paddle moves along the bottom, the top and the side
//! walls reflect the ball, and the bottom edge is open.

use cgmath::{InnerSpace, Vector2};

use crate::geometry::Rect;

#[derive(Clone, Debug, PartialEq)]
pub struct BreakoutConfig {
    pub width: f32,
    pub height: f32,
    pub paddle_size: Vector2<f32>,
    /// Height of the paddle's centre above the bottom edge.
    pub paddle_y: f32,
    pub paddle_speed: f32,
    pub ball_radius: f32,
    pub ball_speed: f32,
    /// Angle from vertical of a served ball, in radians.
    pub launch_angle: f32,
    /// Largest angle from vertical the paddle can give the ball, in radians.
    pub max_bounce_angle: f32,
    pub brick_cols: usize,
    pub brick_rows: usize,
    pub brick_size: Vector2<f32>,
    pub brick_gap: f32,
    /// Space between the top wall and the first brick row.
    pub brick_top_margin: f32,
    pub lives: u32,
}

impl Default for BreakoutConfig {
    fn default() -> Self {
        Self {
            width: 10.0,
            height: 14.0,
            paddle_size: Vector2::new(2.0, 0.3),
            paddle_y: 0.8,
            paddle_speed: 10.0,
            ball_radius: 0.2,
            ball_speed: 7.0,
            launch_angle: 20f32.to_radians(),
            max_bounce_angle: 60f32.to_radians(),
            brick_cols: 8,
            brick_rows: 5,
            brick_size: Vector2::new(1.1, 0.4),
            brick_gap: 0.1,
            brick_top_margin: 1.0,
            lives: 3,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    /// The ball rides on the paddle until [`Breakout::launch`].
    Serving,
    Playing,
    Won,
    Lost,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Brick {
    pub rect: Rect,
    pub points: u32,
    pub alive: bool,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Ball {
    pub position: Vector2<f32>,
    pub velocity: Vector2<f32>,
    pub radius: f32,
}

impl Ball {
    fn touches(&self, rect: &Rect) -> bool {
        (rect.closest_point(self.position) - self.position).magnitude2() <= self.radius * self.radius
    }
}

#[derive(Clone, Debug)]
pub struct Breakout {
    pub config: BreakoutConfig,
    pub paddle: Rect,
    pub ball: Ball,
    pub bricks: Vec<Brick>,
    pub score: u32,
    pub lives: u32,
    pub phase: Phase,
}

impl Breakout {
    pub fn new(config: BreakoutConfig) -> Self {
        let paddle = Rect::from_center(Vector2::new(config.width * 0.5, config.paddle_y), config.paddle_size);
        let mut game = Self {
            paddle,
            ball: Ball {
                position: Vector2::new(0.0, 0.0),
                velocity: Vector2::new(0.0, 0.0),
                radius: config.ball_radius,
            },
            bricks: mk_bricks(&config),
            score: 0,
            lives: config.lives.max(1),
            phase: Phase::Serving,
            config,
        };
        game.rest_ball_on_paddle();
        if game.bricks_left() == 0 {
            log::info!("no bricks to clear");
            game.phase = Phase::Won;
        }
        game
    }

    pub fn bricks_left(&self) -> usize {
        self.bricks.iter().filter(|b| b.alive).count()
    }

    /// Start play from [`Phase::Serving`]; ignored in any other phase.
    pub fn launch(&mut self) {
        if self.phase != Phase::Serving {
            return;
        }
        let angle = self.config.launch_angle;
        self.ball.velocity = Vector2::new(angle.sin(), angle.cos()) * self.config.ball_speed;
        self.phase = Phase::Playing;
    }

    /// Advance by `dt` seconds. `paddle_direction` is clamped to `-1..=1`.
    pub fn step(&mut self, dt: f32, paddle_direction: f32) {
        if matches!(self.phase, Phase::Won | Phase::Lost) || dt <= 0.0 {
            return;
        }
        self.move_paddle(paddle_direction.clamp(-1.0, 1.0) * self.config.paddle_speed * dt);
        if self.phase == Phase::Serving {
            self.rest_ball_on_paddle();
            return;
        }

        // Sub-steps keep the ball from tunnelling through bricks.
        let distance = self.ball.velocity.magnitude() * dt;
        let steps = (distance / self.ball.radius.max(1e-3)).ceil().clamp(1.0, 64.0) as u32;
        let h = dt / steps as f32;
        for _ in 0..steps {
            self.ball.position += self.ball.velocity * h;
            self.bounce_off_walls();
            if self.ball.position.y + self.ball.radius < 0.0 {
                self.lose_ball();
                return;
            }
            self.bounce_off_paddle();
            self.hit_brick();
            if self.phase == Phase::Won {
                return;
            }
        }
    }

    fn move_paddle(&mut self, dx: f32) {
        let half = self.paddle.size().x * 0.5;
        let x = (self.paddle.center().x + dx).clamp(half, self.config.width - half);
        self.paddle = Rect::from_center(Vector2::new(x, self.paddle.center().y), self.paddle.size());
    }

    fn rest_ball_on_paddle(&mut self) {
        self.ball.velocity = Vector2::new(0.0, 0.0);
        self.ball.position = Vector2::new(self.paddle.center().x, self.paddle.max.y + self.ball.radius);
    }

    fn bounce_off_walls(&mut self) {
        let ball = &mut self.ball;
        if ball.position.x - ball.radius < 0.0 {
            ball.position.x = ball.radius;
            ball.velocity.x = ball.velocity.x.abs();
        } else if ball.position.x + ball.radius > self.config.width {
            ball.position.x = self.config.width - ball.radius;
            ball.velocity.x = -ball.velocity.x.abs();
        }
        if ball.position.y + ball.radius > self.config.height {
            ball.position.y = self.config.height - ball.radius;
            ball.velocity.y = -ball.velocity.y.abs();
        }
    }

    fn bounce_off_paddle(&mut self) {
        if self.ball.velocity.y >= 0.0 || !self.ball.touches(&self.paddle) {
            return;
        }
        let half = self.paddle.size().x * 0.5;
        let offset = ((self.ball.position.x - self.paddle.center().x) / half).clamp(-1.0, 1.0);
        let angle = offset * self.config.max_bounce_angle;
        let speed = self.ball.velocity.magnitude();
        self.ball.velocity = Vector2::new(angle.sin(), angle.cos()) * speed;
        self.ball.position.y = self.paddle.max.y + self.ball.radius;
    }

    fn hit_brick(&mut self) {
        let ball = self.ball;
        let Some(brick) = self
            .bricks
            .iter_mut()
            .find(|b| b.alive && ball.touches(&b.rect))
        else {
            return;
        };
        brick.alive = false;
        self.score += brick.points;

        // Reflect along the axis of least penetration.
        let r = &brick.rect;
        let overlap_x = (ball.position.x + ball.radius - r.min.x).min(r.max.x - (ball.position.x - ball.radius));
        let overlap_y = (ball.position.y + ball.radius - r.min.y).min(r.max.y - (ball.position.y - ball.radius));
        let center = r.center();
        if overlap_x < overlap_y {
            self.ball.velocity.x = if ball.position.x < center.x {
                -ball.velocity.x.abs()
            } else {
                ball.velocity.x.abs()
            };
        } else {
            self.ball.velocity.y = if ball.position.y < center.y {
                -ball.velocity.y.abs()
            } else {
                ball.velocity.y.abs()
            };
        }

        if self.bricks_left() == 0 {
            log::info!("all bricks cleared, score {}", self.score);
            self.phase = Phase::Won;
        }
    }

    fn lose_ball(&mut self) {
        self.lives = self.lives.saturating_sub(1);
        if self.lives == 0 {
            log::info!("game over, score {}", self.score);
            self.phase = Phase::Lost;
            self.ball.velocity = Vector2::new(0.0, 0.0);
        } else {
            self.phase = Phase::Serving;
            self.rest_ball_on_paddle();
        }
    }
}

/// Rows are centred horizontally; the top row is worth the most.
fn mk_bricks(config: &BreakoutConfig) -> Vec<Brick> {
    let size = config.brick_size;
    let total_width =
        config.brick_cols as f32 * size.x + config.brick_cols.saturating_sub(1) as f32 * config.brick_gap;
    let left = (config.width - total_width) * 0.5;
    let top = config.height - config.brick_top_margin;
    let mut bricks = Vec::with_capacity(config.brick_cols * config.brick_rows);
    for row in 0..config.brick_rows {
        let max_y = top - row as f32 * (size.y + config.brick_gap);
        for col in 0..config.brick_cols {
            let min_x = left + col as f32 * (size.x + config.brick_gap);
            bricks.push(Brick {
                rect: Rect::new(
                    Vector2::new(min_x, max_y - size.y),
                    Vector2::new(min_x + size.x, max_y),
                ),
                points: ((config.brick_rows - row) * 10) as u32,
                alive: true,
            });
        }
    }
    bricks
}
