#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line demo that drives influence fields and prints the result.
//!
//! A handful of rabbit sources wander a walled grid while a smell field
//! ticks at a fixed frequency; after the simulation the accumulated levels
//! are rendered as ASCII and a navigation query from the northwest corner
//! reports the trail a predator would take toward the strongest scent.

use std::thread;
use std::time::Duration;

use anyhow::{ensure, Context, Result};
use clap::Parser;
use fieldsense_core::{CellCoord, Grid, SourceId, WorldRect};
use fieldsense_navigation::{find_best_cell, WeightedField};
use fieldsense_world::{InfluenceField, InfluenceSource, ObstacleMap, Preferences, SourceKind};
use glam::Vec2;
use log::info;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Glyph ramp used when rendering normalized levels.
const LEVEL_GLYPHS: &[u8] = b" .,:;ox%@";

/// Arguments controlling the demo scenario.
#[derive(Debug, Parser)]
#[command(
    name = "fieldsense",
    about = "Influence-field playground: wandering sources, decay, navigation"
)]
struct Args {
    /// Grid width in cells.
    #[arg(long, default_value_t = 24)]
    columns: u32,

    /// Grid height in cells.
    #[arg(long, default_value_t = 16)]
    rows: u32,

    /// Cell edge length in world units.
    #[arg(long, default_value_t = 1.0)]
    cell_size: f32,

    /// Number of wandering rabbit sources.
    #[arg(long, default_value_t = 3)]
    sources: u32,

    /// Field update frequency in ticks per second.
    #[arg(long, default_value_t = 30.0)]
    update_frequency: f32,

    /// Number of ticks to simulate before rendering.
    #[arg(long, default_value_t = 90)]
    ticks: u32,

    /// Level decay per second.
    #[arg(long, default_value_t = 2.0)]
    decay: f32,

    /// Influence contributed by each source at its own cell.
    #[arg(long, default_value_t = 10.0)]
    source_value: f32,

    /// Propagation range of each source in cells.
    #[arg(long, default_value_t = 6)]
    source_range: u32,

    /// Path-distance budget for the navigation query.
    #[arg(long, default_value_t = 40.0)]
    search_radius: f32,

    /// Seed for source placement and wandering.
    #[arg(long, default_value_t = 7)]
    seed: u64,

    /// Pace ticks in real time instead of running flat out.
    #[arg(long)]
    realtime: bool,
}

/// A moving source owner: keeps its registered footprint and direction
/// current as it bounces around the world.
struct Wanderer {
    id: SourceId,
    position: Vec2,
    velocity: Vec2,
}

impl Wanderer {
    fn step(&mut self, dt: f32, world_size: Vec2) {
        self.position += self.velocity * dt;
        if self.position.x < 0.0 || self.position.x > world_size.x {
            self.velocity.x = -self.velocity.x;
            self.position.x = self.position.x.clamp(0.0, world_size.x);
        }
        if self.position.y < 0.0 || self.position.y > world_size.y {
            self.velocity.y = -self.velocity.y;
            self.position.y = self.position.y.clamp(0.0, world_size.y);
        }
    }

    fn footprint(&self, cell_size: f32) -> WorldRect {
        WorldRect::from_center_size(self.position, Vec2::splat(cell_size * 1.5))
    }
}

/// Entry point for the fieldsense command-line demo.
fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();
    ensure!(
        args.update_frequency > 0.0,
        "update frequency must be positive"
    );

    let grid = Grid::new(Vec2::ZERO, args.columns, args.rows, args.cell_size);
    ensure!(grid.cell_count() > 0, "grid must contain at least one cell");
    let world_size = Vec2::new(
        grid.width() as f32 * grid.cell_size(),
        grid.height() as f32 * grid.cell_size(),
    );

    let mut obstacles = ObstacleMap::new(&grid);
    place_dividing_wall(&grid, &mut obstacles);

    let mut field = InfluenceField::new(&grid, args.decay);
    let mut rng = ChaCha8Rng::seed_from_u64(args.seed);
    let mut wanderers = spawn_wanderers(&args, &mut rng, world_size, &grid, &mut field)?;

    let tick = Duration::from_secs_f32(1.0 / args.update_frequency);
    for _ in 0..args.ticks {
        for wanderer in &mut wanderers {
            wanderer.step(tick.as_secs_f32(), world_size);
            if let Some(source) = field.source_mut(wanderer.id) {
                source.footprint = wanderer.footprint(grid.cell_size());
                source.direction = Some(wanderer.velocity);
            }
        }

        field
            .advance(tick, &grid, &obstacles)
            .context("field tick failed")?;

        if args.realtime {
            thread::sleep(tick);
        }
    }
    info!(
        "simulated {} ticks at {} Hz with {} sources",
        args.ticks,
        args.update_frequency,
        wanderers.len()
    );

    print_levels(&grid, &obstacles, &field);
    print_trail(&args, &grid, &obstacles, &field);
    Ok(())
}

fn spawn_wanderers(
    args: &Args,
    rng: &mut ChaCha8Rng,
    world_size: Vec2,
    grid: &Grid,
    field: &mut InfluenceField,
) -> Result<Vec<Wanderer>> {
    let mut wanderers = Vec::new();
    for index in 0..args.sources {
        let id = SourceId::new(index);
        let position = Vec2::new(
            rng.gen_range(0.0..world_size.x),
            rng.gen_range(0.0..world_size.y),
        );
        let angle = rng.gen_range(0.0..std::f32::consts::TAU);
        let speed = rng.gen_range(0.5..2.0) * grid.cell_size();
        let wanderer = Wanderer {
            id,
            position,
            velocity: Vec2::from_angle(angle) * speed,
        };

        let source = InfluenceSource::new(
            SourceKind::Rabbit,
            args.source_value,
            args.source_range,
            wanderer.footprint(grid.cell_size()),
        );
        ensure!(
            field.register_source(id, source),
            "source identifiers must be unique"
        );
        wanderers.push(wanderer);
    }
    Ok(wanderers)
}

/// Walls off the middle row, leaving a single gap near the eastern end.
fn place_dividing_wall(grid: &Grid, obstacles: &mut ObstacleMap) {
    if grid.height() < 3 {
        return;
    }
    let wall_row = grid.height() / 2;
    let gap_column = grid.width().saturating_sub(3);
    for x in 0..grid.width() {
        if x == gap_column {
            continue;
        }
        obstacles.add_height(CellCoord::new(x, wall_row), 2.0);
    }
}

fn print_levels(grid: &Grid, obstacles: &ObstacleMap, field: &InfluenceField) {
    let view = field.levels();
    let peak = view.iter().fold(0.0f32, |max, level| max.max(level.abs()));
    println!("levels after simulation (peak {peak:.2}):");

    for y in 0..grid.height() {
        let mut line = String::with_capacity(grid.width() as usize);
        for x in 0..grid.width() {
            let cell = CellCoord::new(x, y);
            if !obstacles.is_passable(cell) {
                line.push('#');
                continue;
            }
            line.push(level_glyph(view.level(cell), peak));
        }
        println!("{line}");
    }
}

fn level_glyph(level: f32, peak: f32) -> char {
    if peak <= 0.0 {
        return ' ';
    }
    let normalized = (level.abs() / peak).clamp(0.0, 1.0);
    let last = LEVEL_GLYPHS.len() - 1;
    let slot = (normalized * last as f32).round() as usize;
    LEVEL_GLYPHS[slot.min(last)] as char
}

fn print_trail(args: &Args, grid: &Grid, obstacles: &ObstacleMap, field: &InfluenceField) {
    let mut preferences = Preferences::new();
    preferences.set_weight(SourceKind::Rabbit, 1.0);

    let weighted = [WeightedField::new(
        field,
        preferences.weight_for(SourceKind::Rabbit),
    )];
    let start = CellCoord::new(0, 0);
    let trail = find_best_cell(
        grid,
        obstacles,
        &weighted,
        start,
        args.search_radius,
        None,
        0.0,
    );

    if trail.is_empty() {
        println!("no scent worth chasing from {start:?}");
        return;
    }
    println!("predator trail from {start:?} ({} steps):", trail.len());
    let rendered: Vec<String> = trail
        .iter()
        .map(|cell| format!("({}, {})", cell.x(), cell.y()))
        .collect();
    println!("  {}", rendered.join(" -> "));
}
