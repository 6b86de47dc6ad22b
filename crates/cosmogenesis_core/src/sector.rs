//! Sector streaming: lazy procedural generation of cubic world sectors
//! around the observer, with bounded work per tick and distance-based
//! unloading.
//!
//! Sector content is owned here and only ever mutated here. Generation is
//! deterministic per coordinate for a fixed world seed, so revisiting a
//! sector after an unload reproduces the same objects.

use crate::bus::EventBus;
use crate::config::SectorConfig;
use crate::potential::{BodySnapshot, DustSnapshot, FieldSubject, Modulation, UnifiedField};
use cosmogenesis_data::{BodyKind, CelestialBody, Color, CreationRequest, Payload, Vec3};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::collections::{BTreeMap, VecDeque};

/// Integer sector key, `floor(world / sector_size)` per axis. Ordered so
/// that grid iteration has a stable, seed-independent order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SectorCoord {
    pub x: i64,
    pub y: i64,
    pub z: i64,
}

impl SectorCoord {
    #[must_use]
    pub fn of(position: Vec3, sector_size: f64) -> Self {
        Self {
            x: (position.x / sector_size).floor() as i64,
            y: (position.y / sector_size).floor() as i64,
            z: (position.z / sector_size).floor() as i64,
        }
    }

    /// Euclidean distance in sector units.
    #[must_use]
    pub fn distance(&self, other: &SectorCoord) -> f64 {
        let dx = (self.x - other.x) as f64;
        let dy = (self.y - other.y) as f64;
        let dz = (self.z - other.z) as f64;
        (dx * dx + dy * dy + dz * dz).sqrt()
    }

    #[must_use]
    pub fn as_array(&self) -> [i64; 3] {
        [self.x, self.y, self.z]
    }
}

/// Lifecycle: Unloaded, then Generating while queued or being populated,
/// then Loaded until unloaded again by distance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectorState {
    Unloaded,
    Generating,
    Loaded,
}

#[derive(Debug)]
pub struct Sector {
    pub coord: SectorCoord,
    pub origin: Vec3,
    pub state: SectorState,
    pub bodies: Vec<CelestialBody>,
    pub last_visited: u64,
}

pub struct SectorGrid {
    config: SectorConfig,
    world_seed: u64,
    sectors: BTreeMap<SectorCoord, Sector>,
    queue: VecDeque<SectorCoord>,
    next_body_id: u64,
}

impl SectorGrid {
    #[must_use]
    pub fn new(config: SectorConfig, world_seed: u64) -> Self {
        Self {
            config,
            world_seed,
            sectors: BTreeMap::new(),
            queue: VecDeque::new(),
            next_body_id: 0,
        }
    }

    #[must_use]
    pub fn coord_of(&self, position: Vec3) -> SectorCoord {
        SectorCoord::of(position, self.config.sector_size)
    }

    #[must_use]
    pub fn sector(&self, coord: SectorCoord) -> Option<&Sector> {
        self.sectors.get(&coord)
    }

    #[must_use]
    pub fn loaded_count(&self) -> usize {
        self.sectors
            .values()
            .filter(|s| s.state == SectorState::Loaded)
            .count()
    }

    #[must_use]
    pub fn queued_count(&self) -> usize {
        self.queue.len()
    }

    /// All bodies in loaded sectors, read-only, in sector-coordinate order.
    /// The renderer and the potential model consume this; neither mutates
    /// sector content.
    pub fn bodies(&self) -> impl Iterator<Item = &CelestialBody> {
        self.sectors
            .values()
            .filter(|s| s.state == SectorState::Loaded)
            .flat_map(|s| s.bodies.iter())
    }

    #[must_use]
    pub fn body_snapshots(&self) -> Vec<BodySnapshot> {
        self.bodies().map(BodySnapshot::of).collect()
    }

    /// One streaming step: enqueue sectors entering the load radius, drain
    /// the generation queue within the per-tick budget, unload sectors past
    /// the unload radius.
    pub fn update(&mut self, observer: Vec3, tick: u64, bus: &EventBus) {
        let center = self.coord_of(observer);
        let load_radius = (self.config.load_distance / self.config.sector_size).ceil();
        let unload_radius = (self.config.unload_distance / self.config.sector_size).ceil();
        let reach = load_radius as i64;

        for dx in -reach..=reach {
            for dy in -reach..=reach {
                for dz in -reach..=reach {
                    let coord = SectorCoord {
                        x: center.x + dx,
                        y: center.y + dy,
                        z: center.z + dz,
                    };
                    if coord.distance(&center) > load_radius {
                        continue;
                    }
                    self.request(coord, tick);
                }
            }
        }

        for _ in 0..self.config.max_generated_per_tick {
            let Some(coord) = self.queue.pop_front() else {
                break;
            };
            // The observer may have left since the coord was queued.
            if coord.distance(&center) > load_radius {
                if let Some(sector) = self.sectors.get_mut(&coord) {
                    if sector.state == SectorState::Generating {
                        sector.state = SectorState::Unloaded;
                    }
                }
                continue;
            }
            self.generate(coord, tick, bus);
        }

        for sector in self.sectors.values_mut() {
            if sector.state == SectorState::Loaded {
                if sector.coord.distance(&center) > unload_radius {
                    sector.bodies.clear();
                    sector.state = SectorState::Unloaded;
                } else {
                    sector.last_visited = tick;
                }
            }
        }
    }

    /// No-op for sectors already loaded or generating.
    fn request(&mut self, coord: SectorCoord, tick: u64) {
        let origin = Vec3::new(
            coord.x as f64 * self.config.sector_size,
            coord.y as f64 * self.config.sector_size,
            coord.z as f64 * self.config.sector_size,
        );
        let sector = self.sectors.entry(coord).or_insert_with(|| Sector {
            coord,
            origin,
            state: SectorState::Unloaded,
            bodies: Vec::new(),
            last_visited: tick,
        });
        if sector.state != SectorState::Unloaded {
            return;
        }
        sector.state = SectorState::Generating;
        self.queue.push_back(coord);
    }

    fn generate(&mut self, coord: SectorCoord, tick: u64, bus: &EventBus) {
        let mut rng = ChaCha8Rng::seed_from_u64(self.world_seed ^ Self::coord_hash(coord));
        let mut bodies = Vec::new();

        let star_count = rng.gen_range(5..15);
        for _ in 0..star_count {
            let body = self.make_star(&mut rng, coord);
            bodies.push(body);
        }
        if rng.gen_bool(0.3) {
            let planet_count = rng.gen_range(1..=3);
            for _ in 0..planet_count {
                let body = self.make_planet(&mut rng, coord);
                bodies.push(body);
            }
        }
        if rng.gen_bool(0.1) {
            let body = self.make_nebula(&mut rng, coord);
            bodies.push(body);
        }
        if rng.gen_bool(0.02) {
            let body = self.make_black_hole(&mut rng, coord);
            bodies.push(body);
        }

        let object_count = bodies.len();
        if let Some(sector) = self.sectors.get_mut(&coord) {
            // Append: objects placed while the sector was queued survive.
            sector.bodies.append(&mut bodies);
            sector.state = SectorState::Loaded;
            sector.last_visited = tick;
        }
        tracing::debug!(
            coord = ?coord.as_array(),
            object_count,
            "sector generated"
        );
        bus.publish(Payload::SectorGenerated {
            coord: coord.as_array(),
            object_count,
            tick,
        });
    }

    fn coord_hash(coord: SectorCoord) -> u64 {
        (coord.x.wrapping_mul(127) ^ coord.y.wrapping_mul(311) ^ coord.z.wrapping_mul(613)) as u64
    }

    fn position_in(&self, rng: &mut ChaCha8Rng, coord: SectorCoord) -> Vec3 {
        let size = self.config.sector_size;
        Vec3::new(
            coord.x as f64 * size + rng.gen_range(0.0..size),
            coord.y as f64 * size + rng.gen_range(0.0..size),
            coord.z as f64 * size + rng.gen_range(0.0..size),
        )
    }

    fn next_id(&mut self) -> u64 {
        let id = self.next_body_id;
        self.next_body_id += 1;
        id
    }

    fn make_star(&mut self, rng: &mut ChaCha8Rng, coord: SectorCoord) -> CelestialBody {
        let position = self.position_in(rng, coord);
        let size = rng.gen_range(10.0..60.0);
        let temperature = rng.gen_range(3000.0..8000.0);
        let brightness = rng.gen_range(0.5..2.5);
        let mut body = CelestialBody::new(
            self.next_id(),
            BodyKind::Star {
                temperature,
                brightness,
            },
            position,
            size * 100.0,
            size,
        );
        body.color = star_color(rng);
        body.consciousness_energy = rng.gen_range(0.0..10.0);
        body.vibrational_frequency = rng.gen_range(0.0..100.0);
        body.lyapunov_exponent = rng.gen_range(0.0..1.0);
        body
    }

    fn make_planet(&mut self, rng: &mut ChaCha8Rng, coord: SectorCoord) -> CelestialBody {
        let position = self.position_in(rng, coord);
        let size = rng.gen_range(5.0..25.0);
        let atmosphere = rng.gen_bool(0.5);
        let rings = rng.gen_bool(0.2);
        let mut body = CelestialBody::new(
            self.next_id(),
            BodyKind::Planet { atmosphere, rings },
            position,
            size * 10.0,
            size,
        );
        body.color = planet_color(rng);
        body.vibrational_frequency = rng.gen_range(0.0..20.0);
        body
    }

    fn make_nebula(&mut self, rng: &mut ChaCha8Rng, coord: SectorCoord) -> CelestialBody {
        let position = self.position_in(rng, coord);
        let size = rng.gen_range(100.0..300.0);
        let density = rng.gen_range(0.1..0.6);
        let mut body = CelestialBody::new(
            self.next_id(),
            BodyKind::Nebula { density },
            position,
            size,
            size,
        );
        body.color = nebula_color(rng);
        body
    }

    fn make_black_hole(&mut self, rng: &mut ChaCha8Rng, coord: SectorCoord) -> CelestialBody {
        let position = self.position_in(rng, coord);
        let size = rng.gen_range(20.0..50.0);
        let event_horizon = rng.gen_range(5.0..15.0);
        let mass = rng.gen_range(100.0..1100.0);
        CelestialBody::new(
            self.next_id(),
            BodyKind::BlackHole { event_horizon },
            position,
            mass,
            size,
        )
    }

    /// Inserts an externally requested object into its containing sector.
    /// This is the only route by which critical events become world content.
    ///
    /// A Loaded sector takes the body immediately. A Generating sector keeps
    /// its queue slot and the body rides along when generation appends the
    /// procedural content. An Unloaded or unseen sector is queued so its
    /// procedural content still arrives; the body is visible once the sector
    /// loads.
    pub fn place_object(&mut self, request: &CreationRequest, tick: u64) -> u64 {
        let coord = self.coord_of(request.position);
        let id = self.next_id();
        let mut body = CelestialBody::new(
            id,
            request.object,
            request.position,
            request.magnitude.max(1.0),
            request.size,
        );
        body.consciousness_energy = request.magnitude;
        body.vibrational_frequency = request.magnitude.sqrt();

        let origin = Vec3::new(
            coord.x as f64 * self.config.sector_size,
            coord.y as f64 * self.config.sector_size,
            coord.z as f64 * self.config.sector_size,
        );
        let sector = self.sectors.entry(coord).or_insert_with(|| Sector {
            coord,
            origin,
            state: SectorState::Unloaded,
            bodies: Vec::new(),
            last_visited: tick,
        });
        sector.bodies.push(body);
        if sector.state == SectorState::Unloaded {
            sector.state = SectorState::Generating;
            self.queue.push_back(coord);
        }
        id
    }

    /// Moves every loaded body through the unified field for one tick.
    /// Body motion stays inside the manager so nothing else ever mutates
    /// sector content.
    pub fn step_bodies(
        &mut self,
        dt: f64,
        now: f64,
        field: &UnifiedField,
        dust: &[DustSnapshot],
        modulation: &Modulation,
        bounds: f64,
    ) {
        let snapshots = self.body_snapshots();
        for sector in self.sectors.values_mut() {
            if sector.state != SectorState::Loaded {
                continue;
            }
            for body in &mut sector.bodies {
                let (total, force) = {
                    let subject = FieldSubject::of_body(body, field.field_strength());
                    (
                        field.evaluate(&subject, &snapshots, dust, modulation).total,
                        field.force(&subject, &snapshots, dust, modulation),
                    )
                };
                body.potential = total;
                UnifiedField::integrate(
                    &mut body.position,
                    &mut body.velocity,
                    force,
                    body.mass,
                    dt,
                );
                UnifiedField::wrap(&mut body.position, bounds);
                body.record_path(now);
            }
        }
    }
}

fn star_color(rng: &mut ChaCha8Rng) -> Color {
    let palette = [
        Color::new(1.0, 1.0, 1.0),
        Color::new(1.0, 1.0, 0.0),
        Color::new(1.0, 0.0, 0.0),
        Color::new(0.0, 0.0, 1.0),
        Color::new(1.0, 0.0, 1.0),
    ];
    palette[rng.gen_range(0..palette.len())]
}

fn planet_color(rng: &mut ChaCha8Rng) -> Color {
    let palette = [
        Color::new(0.545, 0.271, 0.075),
        Color::new(0.133, 0.545, 0.133),
        Color::new(0.255, 0.412, 0.882),
        Color::new(1.0, 0.843, 0.0),
        Color::new(1.0, 0.388, 0.278),
    ];
    palette[rng.gen_range(0..palette.len())]
}

fn nebula_color(rng: &mut ChaCha8Rng) -> Color {
    let palette = [
        Color::new(1.0, 0.412, 0.706),
        Color::new(0.0, 0.808, 0.820),
        Color::new(0.576, 0.439, 0.859),
        Color::new(0.196, 0.804, 0.196),
        Color::new(1.0, 0.271, 0.0),
    ];
    palette[rng.gen_range(0..palette.len())]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;

    fn grid() -> (SectorGrid, EventBus) {
        let config = AppConfig::default();
        let bus = EventBus::new(config.bus.history_capacity);
        (SectorGrid::new(config.sector.clone(), 42), bus)
    }

    fn drain(grid: &mut SectorGrid, observer: Vec3, bus: &EventBus, ticks: u64) {
        for tick in 0..ticks {
            grid.update(observer, tick, bus);
        }
    }

    #[test]
    fn test_coord_floor_semantics() {
        assert_eq!(
            SectorCoord::of(Vec3::new(-0.1, 0.0, 9_999.9), 10_000.0),
            SectorCoord { x: -1, y: 0, z: 0 }
        );
        assert_eq!(
            SectorCoord::of(Vec3::new(10_000.0, -10_000.0, 0.0), 10_000.0),
            SectorCoord { x: 1, y: -1, z: 0 }
        );
    }

    #[test]
    fn test_generation_budget_bounds_work_per_tick() {
        let (mut grid, bus) = grid();
        grid.update(Vec3::ZERO, 0, &bus);
        assert_eq!(grid.loaded_count(), 2);
        grid.update(Vec3::ZERO, 1, &bus);
        assert_eq!(grid.loaded_count(), 4);
    }

    #[test]
    fn test_generation_is_idempotent_per_coord() {
        let (mut grid, bus) = grid();
        drain(&mut grid, Vec3::ZERO, &bus, 300);
        let loaded = grid.loaded_count();
        let origin_count = grid
            .sector(SectorCoord { x: 0, y: 0, z: 0 })
            .map(|s| s.bodies.len());
        drain(&mut grid, Vec3::ZERO, &bus, 300);
        assert_eq!(grid.loaded_count(), loaded);
        assert_eq!(
            grid.sector(SectorCoord { x: 0, y: 0, z: 0 })
                .map(|s| s.bodies.len()),
            origin_count
        );
    }

    #[test]
    fn test_generation_is_deterministic_per_seed() {
        let config = AppConfig::default();
        let bus = EventBus::new(16);
        let mut a = SectorGrid::new(config.sector.clone(), 7);
        let mut b = SectorGrid::new(config.sector.clone(), 7);
        drain(&mut a, Vec3::ZERO, &bus, 300);
        drain(&mut b, Vec3::ZERO, &bus, 300);
        let coord = SectorCoord { x: 0, y: 0, z: 0 };
        let bodies_a = &a.sector(coord).unwrap().bodies;
        let bodies_b = &b.sector(coord).unwrap().bodies;
        assert_eq!(bodies_a.len(), bodies_b.len());
        for (x, y) in bodies_a.iter().zip(bodies_b.iter()) {
            assert_eq!(x.position, y.position);
            assert_eq!(x.mass, y.mass);
        }
    }

    #[test]
    fn test_unload_clears_objects_beyond_radius() {
        let config = AppConfig::default();
        let bus = EventBus::new(16);
        let mut grid = SectorGrid::new(config.sector.clone(), 1);
        drain(&mut grid, Vec3::ZERO, &bus, 200);
        assert!(grid.loaded_count() > 0);

        // Far beyond the unload radius everything at the origin clears.
        let far = Vec3::new(500_000.0, 0.0, 0.0);
        grid.update(far, 200, &bus);
        let origin = grid.sector(SectorCoord { x: 0, y: 0, z: 0 }).unwrap();
        assert_eq!(origin.state, SectorState::Unloaded);
        assert!(origin.bodies.is_empty());
    }

    #[test]
    fn test_hysteresis_band_keeps_loaded_sector_loaded() {
        let config = AppConfig::default();
        let bus = EventBus::new(16);
        let mut grid = SectorGrid::new(config.sector.clone(), 1);
        drain(&mut grid, Vec3::ZERO, &bus, 200);

        // Between the load (5) and unload (10) radii in sector units:
        // already-loaded sectors stay loaded, nothing new is queued there.
        let observer = Vec3::new(7.0 * 10_000.0, 0.0, 0.0);
        grid.update(observer, 200, &bus);
        let origin = grid.sector(SectorCoord { x: 0, y: 0, z: 0 }).unwrap();
        assert_eq!(origin.state, SectorState::Loaded);
    }

    #[test]
    fn test_sector_generated_events_published() {
        let (mut grid, bus) = grid();
        drain(&mut grid, Vec3::ZERO, &bus, 3);
        let events = bus.history(Some(cosmogenesis_data::Topic::SectorGenerated), 100);
        assert_eq!(events.len(), 6);
    }

    #[test]
    fn test_place_object_lands_in_containing_sector() {
        let (mut grid, _bus) = grid();
        let request = CreationRequest {
            object: BodyKind::DimensionalRift,
            position: Vec3::new(25_000.0, 0.0, 0.0),
            size: 50.0,
            lifetime_s: 120.0,
            magnitude: 800.0,
        };
        let id = grid.place_object(&request, 0);
        let sector = grid.sector(SectorCoord { x: 2, y: 0, z: 0 }).unwrap();
        assert!(sector.bodies.iter().any(|b| b.id == id));
    }

    #[test]
    fn test_placed_object_survives_generation() {
        let (mut grid, bus) = grid();
        grid.update(Vec3::ZERO, 0, &bus);

        let origin = SectorCoord { x: 0, y: 0, z: 0 };
        assert_eq!(grid.sector(origin).unwrap().state, SectorState::Generating);

        let request = CreationRequest {
            object: BodyKind::DimensionalRift,
            position: Vec3::new(100.0, 100.0, 100.0),
            size: 50.0,
            lifetime_s: 120.0,
            magnitude: 800.0,
        };
        let id = grid.place_object(&request, 0);
        drain(&mut grid, Vec3::ZERO, &bus, 300);

        let sector = grid.sector(origin).unwrap();
        assert_eq!(sector.state, SectorState::Loaded);
        assert!(sector.bodies.iter().any(|b| b.id == id));
        assert!(sector.bodies.len() > 1);
    }

    #[test]
    fn test_place_object_queues_unseen_sector_for_generation() {
        let (mut grid, bus) = grid();
        let request = CreationRequest {
            object: BodyKind::QuantumCoalescence,
            position: Vec3::new(15_000.0, 0.0, 0.0),
            size: 30.0,
            lifetime_s: 90.0,
            magnitude: 600.0,
        };
        let coord = SectorCoord { x: 1, y: 0, z: 0 };
        let id = grid.place_object(&request, 0);
        assert_eq!(grid.sector(coord).unwrap().state, SectorState::Generating);

        drain(&mut grid, Vec3::ZERO, &bus, 300);
        let sector = grid.sector(coord).unwrap();
        assert_eq!(sector.state, SectorState::Loaded);
        assert!(sector.bodies.iter().any(|b| b.id == id));
        assert!(sector.bodies.len() > 1);
    }

    #[test]
    fn test_body_iteration_order_is_stable_across_instances() {
        let config = AppConfig::default();
        let bus = EventBus::new(16);
        let mut a = SectorGrid::new(config.sector.clone(), 7);
        let mut b = SectorGrid::new(config.sector.clone(), 7);
        drain(&mut a, Vec3::ZERO, &bus, 300);
        drain(&mut b, Vec3::ZERO, &bus, 300);

        let ids_a: Vec<u64> = a.bodies().map(|body| body.id).collect();
        let ids_b: Vec<u64> = b.bodies().map(|body| body.id).collect();
        assert!(!ids_a.is_empty());
        assert_eq!(ids_a, ids_b);

        for (x, y) in a.bodies().zip(b.bodies()) {
            assert_eq!(x.position, y.position);
        }
    }

    #[test]
    fn test_body_ids_unique_across_sectors() {
        let (mut grid, bus) = grid();
        drain(&mut grid, Vec3::ZERO, &bus, 30);
        let mut ids: Vec<u64> = grid.bodies().map(|b| b.id).collect();
        let total = ids.len();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), total);
    }
}
