use cgmath::{InnerSpace, Vector2};
use mini_api::sim::{
    breakout::{Breakout, BreakoutConfig, Phase},
    starfield::{MAX_SPEED, MIN_SPEED, NEAR, Starfield},
};

fn assert_close(a: f32, b: f32) {
    assert!((a - b).abs() < 1e-4, "{a} != {b}");
}

#[test]
fn should_spawn_stars_in_volume() {
    let field = Starfield::new(200, 1.5, 10.0, 3);
    assert_eq!(field.stars().len(), 200);
    for star in field.stars() {
        assert!(star.position.x.abs() <= 1.5 && star.position.y.abs() <= 1.5);
        assert!(star.position.z >= -10.0 && star.position.z <= -NEAR);
        assert!((MIN_SPEED..=MAX_SPEED).contains(&star.speed));
    }
    assert_eq!(field.stars(), Starfield::new(200, 1.5, 10.0, 3).stars());
    assert_ne!(field.stars(), Starfield::new(200, 1.5, 10.0, 4).stars());
}

#[test]
fn should_fly_towards_viewer() {
    let mut field = Starfield::new(50, 1.0, 10.0, 9);
    let before = field.stars().to_vec();
    field.update(0.01);
    for (old, new) in before.iter().zip(field.stars()) {
        if new.position.z > old.position.z {
            assert_close(new.position.z, old.position.z + old.speed * 0.01);
        }
    }
    for _ in 0..500 {
        field.update(0.05);
        assert!(field.stars().iter().all(|s| s.position.z <= -NEAR && s.position.z >= -10.0));
    }
}

#[test]
fn should_respawn_at_far_plane() {
    let mut field = Starfield::new(1, 1.0, 10.0, 5);
    field.update(100.0);
    assert_eq!(field.stars()[0].position.z, -field.depth());
}

#[test]
fn should_project_closer_stars_brighter() {
    let field = Starfield::new(100, 1.0, 10.0, 11);
    let points = field.project(2.0);
    assert_eq!(points.len(), 100);
    for (star, point) in field.stars().iter().zip(&points) {
        let w = -star.position.z;
        assert_close(point.position.x, star.position.x / w / 2.0);
        assert_close(point.position.y, star.position.y / w);
        assert!((0.0..=1.0).contains(&point.brightness));
    }
    let by_depth = |a: &usize, b: &usize| {
        field.stars()[*a].position.z.total_cmp(&field.stars()[*b].position.z)
    };
    let nearest = (0..points.len()).max_by(by_depth).unwrap();
    let farthest = (0..points.len()).min_by(by_depth).unwrap();
    assert!(points[nearest].brightness > points[farthest].brightness);
}

fn playing(position: Vector2<f32>, velocity: Vector2<f32>) -> Breakout {
    let mut game = Breakout::new(BreakoutConfig::default());
    game.phase = Phase::Playing;
    game.ball.position = position;
    game.ball.velocity = velocity;
    game
}

#[test]
fn should_serve_from_paddle() {
    let mut game = Breakout::new(BreakoutConfig::default());
    assert_eq!(game.phase, Phase::Serving);
    assert_eq!((game.lives, game.score, game.bricks_left()), (3, 0, 40));
    assert_eq!(game.ball.position, Vector2::new(5.0, game.paddle.max.y + game.ball.radius));

    game.step(0.1, 1.0);
    assert_close(game.paddle.center().x, 6.0);
    assert_close(game.ball.position.x, 6.0);

    game.step(10.0, -1.0);
    assert_close(game.paddle.min.x, 0.0);
    assert_eq!(game.phase, Phase::Serving);
}

#[test]
fn should_launch_once() {
    let mut game = Breakout::new(BreakoutConfig::default());
    game.launch();
    assert_eq!(game.phase, Phase::Playing);
    let velocity = game.ball.velocity;
    assert_close(velocity.magnitude(), 7.0);
    assert!(velocity.y > 0.0 && velocity.x > 0.0);

    game.launch();
    assert_eq!(game.ball.velocity, velocity);
}

#[test]
fn should_bounce_off_walls() {
    let mut game = playing(Vector2::new(9.75, 5.0), Vector2::new(5.0, 0.0));
    game.step(0.02, 0.0);
    assert!(game.ball.velocity.x < 0.0);
    assert_close(game.ball.position.x, 9.8);

    let mut game = playing(Vector2::new(0.25, 5.0), Vector2::new(-5.0, 0.0));
    game.step(0.02, 0.0);
    assert!(game.ball.velocity.x > 0.0);

    let mut game = playing(Vector2::new(5.0, 13.75), Vector2::new(0.0, 5.0));
    game.bricks.iter_mut().for_each(|b| b.alive = false);
    game.step(0.02, 0.0);
    assert!(game.ball.velocity.y < 0.0);
    assert_close(game.ball.position.y, 13.8);
}

#[test]
fn should_angle_paddle_bounces() {
    let mut game = playing(Vector2::new(5.5, 1.2), Vector2::new(0.0, -5.0));
    game.step(0.02, 0.0);
    let v = game.ball.velocity;
    assert_close(v.x, 2.5);
    assert_close(v.y, 5.0 * 30f32.to_radians().cos());
    assert_close(game.ball.position.y, game.paddle.max.y + game.ball.radius);

    // Balls rising through the paddle pass.
    let mut game = playing(Vector2::new(5.0, 0.8), Vector2::new(0.0, 5.0));
    game.step(0.01, 0.0);
    assert_eq!(game.ball.velocity, Vector2::new(0.0, 5.0));
}

#[test]
fn should_lose_lives_then_game() {
    let mut game = playing(Vector2::new(0.5, 0.0), Vector2::new(0.0, -10.0));
    game.step(0.1, 0.0);
    assert_eq!((game.phase, game.lives), (Phase::Serving, 2));
    assert_eq!(game.ball.velocity, Vector2::new(0.0, 0.0));

    for lives in [1, 0] {
        game.phase = Phase::Playing;
        game.ball.position = Vector2::new(0.5, 0.0);
        game.ball.velocity = Vector2::new(0.0, -10.0);
        game.step(0.1, 0.0);
        assert_eq!(game.lives, lives);
    }
    assert_eq!(game.phase, Phase::Lost);

    let frozen = game.ball;
    game.step(0.1, 1.0);
    game.launch();
    assert_eq!(game.ball, frozen);
    assert_eq!(game.phase, Phase::Lost);
}

#[test]
fn should_score_bricks() {
    // Left brick of the bottom row spans x 0.25..1.35 and y 10.6..11.0.
    let mut game = playing(Vector2::new(0.8, 10.39), Vector2::new(0.0, 5.0));
    assert_close(game.bricks[32].rect.min.x, 0.25);
    assert_close(game.bricks[32].rect.min.y, 10.6);
    game.step(0.01, 0.0);
    assert!(!game.bricks[32].alive);
    assert_eq!((game.score, game.bricks_left()), (10, 39));
    assert_eq!(game.ball.velocity, Vector2::new(0.0, -5.0));
    assert_eq!(game.phase, Phase::Playing);
    assert_eq!(game.bricks[0].points, 50);
}

#[test]
fn should_win_after_last_brick() {
    let mut game = playing(Vector2::new(0.8, 10.39), Vector2::new(0.0, 5.0));
    for (i, brick) in game.bricks.iter_mut().enumerate() {
        brick.alive = i == 32;
    }
    game.step(0.01, 0.0);
    assert_eq!(game.phase, Phase::Won);
    assert_eq!(game.bricks_left(), 0);

    let frozen = game.ball;
    game.step(0.5, 0.0);
    assert_eq!(game.ball, frozen);
}

#[test]
fn should_win_empty_grid_at_once() {
    for config in [
        BreakoutConfig { brick_cols: 0, ..Default::default() },
        BreakoutConfig { brick_rows: 0, ..Default::default() },
    ] {
        let mut game = Breakout::new(config);
        assert_eq!((game.phase, game.bricks_left()), (Phase::Won, 0));

        let resting = game.ball;
        game.launch();
        game.step(0.5, 1.0);
        assert_eq!(game.phase, Phase::Won);
        assert_eq!(game.ball, resting);
    }
}
