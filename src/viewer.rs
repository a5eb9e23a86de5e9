//! Interactive window: train, watch the champion, or play by hand.
//!
//! Keys: `T` train, `V` watch the champion, `H` play with arrows/WASD,
//! `M` menu, `+`/`-` resize the first hidden layer (menu only, restarts training),
//! `R` restart training, `Esc` back to the menu or quit.

use std::time::{Duration, Instant};

use anyhow::Context;
use pixels::{Pixels, SurfaceTexture};
use winit::dpi::LogicalSize;
use winit::event::{Event, VirtualKeyCode};
use winit::event_loop::{ControlFlow, EventLoop};
use winit::window::WindowBuilder;
use winit_input_helper::WinitInputHelper;

use crate::config::TrainingConfig;
use crate::game::{Arena, Dir, Game};
use crate::pos::Pos;
use crate::trainer::Trainer;

const MAX_HIDDEN_NODES: usize = 64;
const DEMO_TICK: Duration = Duration::from_millis(60);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Mode {
    Menu,
    Training,
    Visualizing,
    Human,
}

/// RGBA frame with alpha-blended primitives.
struct Canvas<'a> {
    frame: &'a mut [u8],
    width: u32,
    height: u32,
}

impl<'a> Canvas<'a> {
    fn new(frame: &'a mut [u8], width: u32, height: u32) -> Self {
        Self {
            frame,
            width,
            height,
        }
    }

    fn clear(&mut self, r: u8, g: u8, b: u8) {
        for px in self.frame.chunks_exact_mut(4) {
            px.copy_from_slice(&[r, g, b, 255]);
        }
    }

    fn blend_pixel(&mut self, x: u32, y: u32, rgba: [u8; 4]) {
        if x >= self.width || y >= self.height {
            return;
        }
        let idx = ((y * self.width + x) * 4) as usize;
        let Some(px) = self.frame.get_mut(idx..idx + 4) else {
            return;
        };
        let a = rgba[3] as u16;
        for c in 0..3 {
            px[c] = ((rgba[c] as u16 * a + px[c] as u16 * (255 - a)) / 255) as u8;
        }
        px[3] = 255;
    }

    fn fill_rect(&mut self, x: u32, y: u32, w: u32, h: u32, rgba: [u8; 4]) {
        let x2 = x.saturating_add(w).min(self.width);
        let y2 = y.saturating_add(h).min(self.height);
        for py in y..y2 {
            for px in x..x2 {
                self.blend_pixel(px, py, rgba);
            }
        }
    }

    fn stroke_rect(&mut self, x: u32, y: u32, w: u32, h: u32, rgba: [u8; 4]) {
        if w == 0 || h == 0 || self.width == 0 || self.height == 0 {
            return;
        }
        let x2 = x.saturating_add(w - 1).min(self.width - 1);
        let y2 = y.saturating_add(h - 1).min(self.height - 1);
        for px in x..=x2 {
            self.blend_pixel(px, y, rgba);
            self.blend_pixel(px, y2, rgba);
        }
        for py in y..=y2 {
            self.blend_pixel(x, py, rgba);
            self.blend_pixel(x2, py, rgba);
        }
    }

    fn fill_cell(&mut self, arena: Arena, p: Pos, rgba: [u8; 4]) {
        if !arena.contains(p) {
            return;
        }
        let size = arena.cell_size;
        self.fill_rect(p.x as u32 * size, p.y as u32 * size, size, size, rgba);
    }
}

fn draw_game(canvas: &mut Canvas, game: &Game) {
    let arena = game.arena();
    canvas.clear(20, 20, 30);
    for y in 0..arena.rows {
        for x in 0..arena.cols {
            if (x + y) % 2 == 0 {
                canvas.fill_cell(arena, Pos::new(x, y), [25, 25, 35, 255]);
            }
        }
    }

    canvas.fill_cell(arena, game.food(), [220, 50, 50, 255]);
    for (i, &pos) in game.body().iter().enumerate() {
        let colour = if i == 0 {
            [100, 255, 100, 255]
        } else {
            [50, 200 - (i * 10).min(100) as u8, 50, 255]
        };
        canvas.fill_cell(arena, pos, colour);
    }
}

/// Line chart of `data` scaled to its maximum.
fn draw_chart(canvas: &mut Canvas, x: u32, y: u32, w: u32, h: u32, data: &[f64]) {
    canvas.fill_rect(x, y, w, h, [30, 30, 30, 255]);
    canvas.stroke_rect(x, y, w, h, [255, 255, 255, 255]);
    if data.len() < 2 || w < 2 || h < 3 {
        return;
    }
    let max = data.iter().copied().fold(1.0, f64::max);
    let step = w as f64 / (data.len() - 1) as f64;
    let to_y = |v: f64| y + h - 1 - ((v / max) * (h - 2) as f64) as u32;

    for (i, pair) in data.windows(2).enumerate() {
        let (x1, x2) = (x as f64 + i as f64 * step, x as f64 + (i + 1) as f64 * step);
        let (y1, y2) = (to_y(pair[0]) as f64, to_y(pair[1]) as f64);
        let samples = (x2 - x1).abs().max((y2 - y1).abs()).ceil().max(1.0) as u32;
        for s in 0..=samples {
            let t = s as f64 / samples as f64;
            let px = (x1 + (x2 - x1) * t) as u32;
            let py = (y1 + (y2 - y1) * t) as u32;
            canvas.blend_pixel(px.min(x + w - 1), py, [0, 255, 0, 255]);
        }
    }
}

/// Input and output blocks with one bar per first-layer hidden node between
/// them, a flat dash when there is no hidden layer. Scales with the canvas.
fn draw_menu(canvas: &mut Canvas, hidden: usize, history: &[f64]) {
    canvas.clear(20, 20, 30);
    let (cx, cy) = (canvas.width / 2, canvas.height / 3);
    let block = (canvas.width / 16).clamp(4, 50);
    let top = cy.saturating_sub(block * 4 / 5);
    canvas.fill_rect(cx.saturating_sub(block * 3), top, block, block, [50, 50, 200, 255]);
    canvas.fill_rect(cx + block * 2, top, block, block, [50, 200, 50, 255]);

    let bar_height = block * 3 / 5;
    if hidden == 0 {
        canvas.fill_rect(
            cx.saturating_sub(block / 5),
            cy.saturating_sub(bar_height / 2),
            block * 2 / 5,
            2,
            [255, 255, 255, 255],
        );
    } else {
        let span = block * 18 / 5;
        let spacing = (span / hidden as u32).clamp(2, 10);
        let start = cx.saturating_sub((hidden as u32 * spacing) / 2);
        for i in 0..hidden as u32 {
            canvas.fill_rect(
                start + i * spacing,
                cy.saturating_sub(bar_height),
                (spacing / 2).max(1),
                bar_height,
                [255, 255, 255, 255],
            );
        }
    }
    let (w, h) = (canvas.width, canvas.height);
    draw_chart(canvas, w / 8, h / 2, w * 3 / 4, h / 3, history);
}

/// Grow or shrink the first hidden layer, leaving deeper layers alone.
///
/// Shrinking a lone one-node layer removes it; a first layer with layers
/// behind it stops at one node.
fn resize_first_layer(layers: &[usize], grow: bool) -> Vec<usize> {
    let mut next = layers.to_vec();
    match (next.first().copied(), grow) {
        (None, true) => next.push(1),
        (None, false) => {}
        (Some(nodes), true) => next[0] = (nodes + 1).min(MAX_HIDDEN_NODES),
        (Some(1), false) if next.len() == 1 => next.clear(),
        (Some(nodes), false) => next[0] = nodes.saturating_sub(1).max(1),
    }
    next
}

pub fn run(config: TrainingConfig) -> anyhow::Result<()> {
    let arena = config.fitness.arena;
    let width = arena.cols as u32 * arena.cell_size;
    let height = arena.rows as u32 * arena.cell_size;
    let mut hidden_layers = config.hidden_layers.clone();
    let mut trainer = Trainer::new(config)?;

    let event_loop = EventLoop::new();
    let mut input = WinitInputHelper::new();
    let window = WindowBuilder::new()
        .with_title("Snake Evo")
        .with_inner_size(LogicalSize::new(width, height))
        .with_resizable(false)
        .build(&event_loop)
        .context("creating window")?;

    let mut pixels = {
        let window_size = window.inner_size();
        let surface_texture = SurfaceTexture::new(window_size.width, window_size.height, &window);
        Pixels::new(width, height, surface_texture).context("creating pixel surface")?
    };

    let mut mode = Mode::Menu;
    let mut demo = Game::new(arena);
    let mut last_tick = Instant::now();
    let mut title = String::new();

    event_loop.run(move |event, _, control_flow| {
        *control_flow = ControlFlow::Poll;

        if let Event::RedrawRequested(_) = event {
            let history: Vec<f64> = trainer
                .history()
                .iter()
                .map(|s| s.average_fitness)
                .collect();
            let mut canvas = Canvas::new(pixels.frame_mut(), width, height);
            match mode {
                Mode::Menu => draw_menu(
                    &mut canvas,
                    hidden_layers.first().copied().unwrap_or(0),
                    &history,
                ),
                Mode::Training => draw_chart(&mut canvas, 0, 0, width, height, &history),
                Mode::Visualizing | Mode::Human => draw_game(&mut canvas, &demo),
            }
            if let Err(err) = pixels.render() {
                log::error!("render failed: {err}");
                *control_flow = ControlFlow::Exit;
                return;
            }
        }

        if input.update(&event) {
            if input.close_requested() || input.destroyed() {
                *control_flow = ControlFlow::Exit;
                return;
            }
            if input.key_pressed(VirtualKeyCode::Escape) {
                if mode == Mode::Menu {
                    *control_flow = ControlFlow::Exit;
                    return;
                }
                mode = Mode::Menu;
            }

            if input.key_pressed(VirtualKeyCode::M) {
                mode = Mode::Menu;
            }
            if input.key_pressed(VirtualKeyCode::T) {
                mode = Mode::Training;
            }
            if input.key_pressed(VirtualKeyCode::V) && mode != Mode::Visualizing {
                mode = Mode::Visualizing;
                demo = Game::new(arena);
            }
            if input.key_pressed(VirtualKeyCode::H) && mode != Mode::Human {
                mode = Mode::Human;
                demo = Game::new(arena);
            }

            let mut resized = None;
            if mode == Mode::Menu {
                if input.key_pressed(VirtualKeyCode::NumpadAdd) || input.key_pressed(VirtualKeyCode::Equals) {
                    resized = Some(resize_first_layer(&hidden_layers, true));
                }
                if input.key_pressed(VirtualKeyCode::NumpadSubtract) || input.key_pressed(VirtualKeyCode::Minus) {
                    resized = Some(resize_first_layer(&hidden_layers, false));
                }
            }
            if input.key_pressed(VirtualKeyCode::R) {
                resized = Some(hidden_layers.clone());
            }
            if let Some(layers) = resized {
                match trainer.reset_topology(&layers) {
                    Ok(()) => {
                        log::info!("Hidden layers: {layers:?}");
                        hidden_layers = layers;
                    }
                    Err(err) => log::error!("reset failed: {err}"),
                }
            }

            if mode == Mode::Human {
                if input.key_pressed(VirtualKeyCode::Up) || input.key_pressed(VirtualKeyCode::W) {
                    demo.change_dir(Dir::Up);
                }
                if input.key_pressed(VirtualKeyCode::Down) || input.key_pressed(VirtualKeyCode::S) {
                    demo.change_dir(Dir::Down);
                }
                if input.key_pressed(VirtualKeyCode::Left) || input.key_pressed(VirtualKeyCode::A) {
                    demo.change_dir(Dir::Left);
                }
                if input.key_pressed(VirtualKeyCode::Right) || input.key_pressed(VirtualKeyCode::D) {
                    demo.change_dir(Dir::Right);
                }
            }

            match mode {
                Mode::Menu => {}
                Mode::Training => {
                    if let Err(err) = trainer.step_generation() {
                        log::error!("generation failed: {err}");
                        mode = Mode::Menu;
                    }
                }
                Mode::Visualizing | Mode::Human => {
                    if last_tick.elapsed() >= DEMO_TICK {
                        last_tick = Instant::now();
                        if demo.is_terminated() {
                            log::info!("{mode:?} game over, score {}", demo.score());
                            demo = Game::new(arena);
                        } else {
                            if mode == Mode::Visualizing {
                                steer_with_champion(&trainer, &mut demo);
                            }
                            demo.tick();
                        }
                    }
                }
            }

            let next_title = match mode {
                Mode::Menu => format!(
                    "Snake Evo | MENU | hidden layers: {hidden_layers:?} | +/- resize  T train  V watch  H play"
                ),
                Mode::Training => {
                    let population = trainer.population();
                    format!(
                        "Snake Evo | TRAINING | gen {} | best {:.0} | avg {:.1}",
                        population.generation(),
                        population.best_fitness(),
                        trainer.history().last().map_or(0.0, |s| s.average_fitness)
                    )
                }
                Mode::Visualizing => format!("Snake Evo | CHAMPION | score {}", demo.score()),
                Mode::Human => format!("Snake Evo | HUMAN | score {}", demo.score()),
            };
            if next_title != title {
                window.set_title(&next_title);
                title = next_title;
            }

            window.request_redraw();
        }
    });
}

fn steer_with_champion(trainer: &Trainer, game: &mut Game) {
    match trainer.population().champion().feed_forward(&game.observe()) {
        Ok(outputs) => game.apply_decision(&outputs),
        Err(err) => log::error!("champion cannot play: {err}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(width: u32, height: u32) -> Vec<u8> {
        vec![0; (width * height * 4) as usize]
    }

    #[test]
    fn test_menu_fits_small_canvas() {
        for (w, h) in [(200, 200), (60, 40), (1, 1), (0, 0)] {
            let mut buf = frame(w, h);
            let mut canvas = Canvas::new(&mut buf, w, h);
            for hidden in [0, 1, 8, MAX_HIDDEN_NODES] {
                draw_menu(&mut canvas, hidden, &[1.0, 40.0, 25.0]);
            }
        }
    }

    #[test]
    fn test_chart_handles_degenerate_sizes() {
        let mut buf = frame(10, 10);
        let mut canvas = Canvas::new(&mut buf, 10, 10);
        for (w, h) in [(0, 0), (1, 5), (5, 1), (5, 2), (10, 10), (40, 40)] {
            draw_chart(&mut canvas, 2, 2, w, h, &[0.0, 3.0, 1.0]);
        }
    }

    #[test]
    fn test_resize_only_touches_first_layer() {
        assert_eq!(resize_first_layer(&[12, 6], true), vec![13, 6]);
        assert_eq!(resize_first_layer(&[12, 6], false), vec![11, 6]);
        assert_eq!(resize_first_layer(&[1, 6], false), vec![1, 6]);
        assert_eq!(resize_first_layer(&[1], false), Vec::<usize>::new());
        assert_eq!(resize_first_layer(&[], true), vec![1]);
        assert_eq!(resize_first_layer(&[], false), Vec::<usize>::new());
        assert_eq!(resize_first_layer(&[MAX_HIDDEN_NODES], true), vec![MAX_HIDDEN_NODES]);
    }
}
