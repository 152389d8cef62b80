//! Factions, their fog of war, and alliance-merged visibility.
//!
//! A [`Faction`] tracks the vision sources of the units it owns and feeds
//! them into its own [`FogOfWar`]. The [`Factions`] registry consumes the
//! [`EntityEvent`] log of the entity manager, keeps each faction's fog
//! current, and answers visibility queries merged across allies.
//!
//! Alliances are one-directional: when A is allied with B, A sees what B
//! sees, and tiles B discovers are recorded as discovered for A as well.
//! Breaking the alliance stops live sharing; discoveries already recorded
//! stay.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::entity::{center_of, grid_region_at, Entity, EntityEvent, Handle};
use crate::error::{GameError, Result};
use crate::fog::{FogOfWar, TileVisibility};
use crate::geometry::{Circle, Point, Region, Size};
use crate::manager::EntityManager;
use crate::math::{Fixed, Vec2Fixed};

/// Upper bound on a faction's food capacity.
pub const MAX_FOOD: u32 = 200;

/// Faction identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FactionId(pub u8);

impl fmt::Display for FactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "faction {}", self.0)
    }
}

/// What a tracked entity contributes to its faction's fog.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Vision {
    /// Counted sight circle of a unit.
    Sight { circle: Circle, size: Size },
    /// Counted sight circle and footprint of a finished building.
    Building {
        circle: Circle,
        size: Size,
        footprint: Region,
    },
    /// Discovery-only footprint of a building under construction.
    Footprint(Region),
}

#[derive(Debug, Clone, PartialEq)]
struct Tracked {
    vision: Vision,
    food_cost: u32,
    food_provided: u32,
}

/// Notification produced by [`Factions`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FactionEvent {
    /// The merged view of `faction` changed inside `region`.
    VisibilityChanged {
        /// Faction whose view changed.
        faction: FactionId,
        /// Bounds of the changed tiles.
        region: Region,
    },
    /// The faction lost its last unit or building.
    Defeated(FactionId),
}

/// A player or AI side.
#[derive(Debug, Clone)]
pub struct Faction {
    id: FactionId,
    name: String,
    fog: FogOfWar,
    allies: BTreeSet<FactionId>,
    tracked: BTreeMap<Handle, Tracked>,
    food_used: u32,
    food_provided: u32,
    defeated: bool,
}

impl Faction {
    /// Create a faction with a fully undiscovered map.
    #[must_use]
    pub fn new(id: FactionId, name: impl Into<String>, world_size: Size) -> Self {
        Self {
            id,
            name: name.into(),
            fog: FogOfWar::new(world_size),
            allies: BTreeSet::new(),
            tracked: BTreeMap::new(),
            food_used: 0,
            food_provided: 0,
            defeated: false,
        }
    }

    /// Identifier.
    #[must_use]
    pub const fn id(&self) -> FactionId {
        self.id
    }

    /// Display name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The faction's own fog, without ally contributions.
    #[must_use]
    pub const fn fog(&self) -> &FogOfWar {
        &self.fog
    }

    /// Factions this one sees through.
    pub fn allies(&self) -> impl Iterator<Item = FactionId> + '_ {
        self.allies.iter().copied()
    }

    /// Check whether this faction sees through `other`.
    #[must_use]
    pub fn is_allied_with(&self, other: FactionId) -> bool {
        self.allies.contains(&other)
    }

    /// Food consumed by living units.
    #[must_use]
    pub const fn food_used(&self) -> u32 {
        self.food_used
    }

    /// Food provided by finished buildings, capped at [`MAX_FOOD`].
    #[must_use]
    pub fn food_capacity(&self) -> u32 {
        self.food_provided.min(MAX_FOOD)
    }

    /// Whether `cost` more food fits under the current capacity.
    #[must_use]
    pub fn can_afford_food(&self, cost: u32) -> bool {
        self.food_used + cost <= self.food_capacity()
    }

    /// Number of living units and buildings.
    #[must_use]
    pub fn entity_count(&self) -> usize {
        self.tracked.len()
    }

    /// Whether the faction has been defeated. A defeated faction's fog is
    /// frozen.
    #[must_use]
    pub const fn is_defeated(&self) -> bool {
        self.defeated
    }

    fn track(&mut self, entity: &Entity) -> Region {
        let Some(unit) = entity.as_unit() else {
            return Region::default();
        };
        let (vision, dirty, food_provided) = if unit.under_construction {
            let footprint = entity.grid_region();
            (Vision::Footprint(footprint), self.fog.discover_region(&footprint), 0)
        } else {
            let (vision, dirty) = self.see_from(entity, unit.data.sight_range, unit.data.is_building);
            (vision, dirty, unit.data.food_provided)
        };

        self.food_used += unit.data.food_cost;
        self.food_provided += food_provided;
        self.tracked.insert(
            entity.handle(),
            Tracked {
                vision,
                food_cost: unit.data.food_cost,
                food_provided,
            },
        );
        dirty
    }

    /// Start counting the sight of a finished unit or building.
    fn see_from(&mut self, entity: &Entity, sight_range: Fixed, is_building: bool) -> (Vision, Region) {
        let circle = Circle::new(entity.center(), sight_range);
        let size = entity.size();
        let dirty = self.fog.add_line_of_sight(&circle);
        if !is_building {
            return (Vision::Sight { circle, size }, dirty);
        }
        let footprint = entity.grid_region();
        let dirty = dirty.union(&self.fog.add_region_sight(&footprint));
        (
            Vision::Building {
                circle,
                size,
                footprint,
            },
            dirty,
        )
    }

    fn relocate(&mut self, handle: Handle, to: Vec2Fixed) -> Region {
        let Some(tracked) = self.tracked.get_mut(&handle) else {
            return Region::default();
        };
        match &mut tracked.vision {
            Vision::Sight { circle, size } => {
                let moved = Circle::new(center_of(to, *size), circle.radius);
                let old = std::mem::replace(circle, moved);
                self.fog.update_line_of_sight(&old, &moved)
            }
            Vision::Building {
                circle,
                size,
                footprint,
            } => {
                let moved = Circle::new(center_of(to, *size), circle.radius);
                let old = std::mem::replace(circle, moved);
                let new_footprint = grid_region_at(to, *size);
                let old_footprint = std::mem::replace(footprint, new_footprint);
                // Raise the new footprint first so shared tiles never drop to zero.
                let dirty = self.fog.add_region_sight(&new_footprint);
                dirty
                    .union(&self.fog.remove_region_sight(&old_footprint))
                    .union(&self.fog.update_line_of_sight(&old, &moved))
            }
            Vision::Footprint(_) => Region::default(),
        }
    }

    fn finish_construction(&mut self, entity: &Entity) -> Region {
        let Some(unit) = entity.as_unit() else {
            return Region::default();
        };
        let Some(tracked) = self.tracked.get_mut(&entity.handle()) else {
            return Region::default();
        };
        if !matches!(tracked.vision, Vision::Footprint(_)) {
            return Region::default();
        }

        // The footprint was discovery only; discoveries persist, so the swap
        // only adds counted sight.
        tracked.food_provided = unit.data.food_provided;
        self.food_provided += unit.data.food_provided;
        let (vision, dirty) = self.see_from(entity, unit.data.sight_range, unit.data.is_building);
        if let Some(tracked) = self.tracked.get_mut(&entity.handle()) {
            tracked.vision = vision;
        }
        dirty
    }

    fn release(&mut self, handle: Handle) -> Option<Region> {
        let tracked = self.tracked.remove(&handle)?;
        self.food_used -= tracked.food_cost;
        self.food_provided -= tracked.food_provided;
        Some(match tracked.vision {
            Vision::Sight { circle, .. } => self.fog.remove_line_of_sight(&circle),
            Vision::Building {
                circle, footprint, ..
            } => self
                .fog
                .remove_line_of_sight(&circle)
                .union(&self.fog.remove_region_sight(&footprint)),
            Vision::Footprint(_) => Region::default(),
        })
    }
}

/// Registry of all factions.
#[derive(Debug, Clone, Default)]
pub struct Factions {
    factions: BTreeMap<FactionId, Faction>,
    events: Vec<FactionEvent>,
    /// Factions that lost an entity since defeats were last settled.
    losses: BTreeSet<FactionId>,
}

impl Factions {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a faction.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::InvalidState`] if the identifier is taken.
    pub fn add(&mut self, faction: Faction) -> Result<()> {
        let id = faction.id();
        if self.factions.contains_key(&id) {
            return Err(GameError::InvalidState(format!("{id} already exists")));
        }
        self.factions.insert(id, faction);
        Ok(())
    }

    /// Look up a faction.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::FactionNotFound`] for unknown identifiers.
    pub fn get(&self, id: FactionId) -> Result<&Faction> {
        self.factions.get(&id).ok_or(GameError::FactionNotFound(id))
    }

    /// Iterate factions in identifier order.
    pub fn iter(&self) -> impl Iterator<Item = &Faction> {
        self.factions.values()
    }

    /// Number of registered factions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.factions.len()
    }

    /// Whether no faction is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.factions.is_empty()
    }

    /// Let `faction` see through `ally`, or stop doing so.
    ///
    /// Becoming allied back-fills every tile `ally` has discovered into
    /// `faction`'s own fog.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::FactionNotFound`] if either faction is unknown.
    pub fn set_allied(&mut self, faction: FactionId, ally: FactionId, allied: bool) -> Result<()> {
        let ally_fog = self.get(ally)?.fog.clone();
        let own = self
            .factions
            .get_mut(&faction)
            .ok_or(GameError::FactionNotFound(faction))?;
        if faction == ally || own.is_allied_with(ally) == allied {
            return Ok(());
        }

        if allied {
            own.allies.insert(ally);
            if !own.defeated {
                own.fog.absorb_discoveries(&ally_fog);
            }
        } else {
            own.allies.remove(&ally);
        }
        let region = own.fog.bounds();
        tracing::debug!(%faction, %ally, allied, "Alliance changed");
        self.events
            .push(FactionEvent::VisibilityChanged { faction, region });
        Ok(())
    }

    /// Visibility of a tile for `faction`, merged across its allies.
    ///
    /// Visible if the faction or any ally sees the tile, otherwise the best
    /// of the faction's and its allies' discovered states.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::FactionNotFound`] for unknown identifiers.
    pub fn tile_visibility(&self, faction: FactionId, point: Point) -> Result<TileVisibility> {
        let own = self.get(faction)?;
        Ok(self.merged(own, point))
    }

    fn merged(&self, own: &Faction, point: Point) -> TileVisibility {
        let mut best = own.fog.get(point);
        if best == TileVisibility::Visible {
            return best;
        }
        for ally in own.allies.iter().filter_map(|id| self.factions.get(id)) {
            let state = ally.fog.get(point);
            if state == TileVisibility::Visible {
                return state;
            }
            best = best.max(state);
        }
        best
    }

    /// Whether `faction` currently sees at least one tile of `region`.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::FactionNotFound`] for unknown identifiers.
    pub fn can_see(&self, faction: FactionId, region: &Region) -> Result<bool> {
        let own = self.get(faction)?;
        let clipped = region.intersection(&own.fog.bounds());
        Ok(clipped
            .points()
            .any(|p| self.merged(own, p) == TileVisibility::Visible))
    }

    /// Apply a batch of entity events, then settle defeats.
    ///
    /// A faction is defeated only if it owns nothing once the whole batch
    /// is applied, so a unit replaced within one tick does not defeat it.
    pub fn handle_events<I>(&mut self, entities: &EntityManager, events: I)
    where
        I: IntoIterator<Item = EntityEvent>,
    {
        for event in events {
            self.handle_event(entities, &event);
        }
        self.settle_defeats();
    }

    /// Apply one entity event to the owning faction's bookkeeping.
    ///
    /// Entities without an owner, owners that are not registered, and
    /// defeated owners are ignored. Defeat is decided later by
    /// [`settle_defeats`](Self::settle_defeats).
    pub fn handle_event(&mut self, entities: &EntityManager, event: &EntityEvent) {
        match *event {
            EntityEvent::Added(handle) => {
                if let Some(entity) = entities.from_handle(handle) {
                    self.with_owner(entity, |faction| faction.track(entity));
                }
            }
            EntityEvent::Moved { handle, to, .. } => {
                let owner = self.owner_of(handle);
                if let Some(id) = owner {
                    self.apply(id, |faction| faction.relocate(handle, to));
                }
            }
            EntityEvent::ConstructionCompleted(handle) => {
                if let Some(entity) = entities.get_any(handle) {
                    self.with_owner(entity, |faction| faction.finish_construction(entity));
                }
            }
            EntityEvent::Died(handle) | EntityEvent::Removed(handle) => {
                if let Some(id) = self.owner_of(handle) {
                    self.apply(id, |faction| faction.release(handle).unwrap_or_default());
                    self.losses.insert(id);
                }
            }
        }
    }

    /// Take every event produced since the last drain.
    pub fn drain_events(&mut self) -> Vec<FactionEvent> {
        std::mem::take(&mut self.events)
    }

    fn owner_of(&self, handle: Handle) -> Option<FactionId> {
        self.factions
            .values()
            .find(|f| !f.defeated && f.tracked.contains_key(&handle))
            .map(Faction::id)
    }

    fn with_owner<F>(&mut self, entity: &Entity, update: F)
    where
        F: FnOnce(&mut Faction) -> Region,
    {
        if let Some(id) = entity.faction() {
            self.apply(id, update);
        }
    }

    /// Run a fog update on a live faction and propagate the dirty region to
    /// the factions that see through it.
    fn apply<F>(&mut self, id: FactionId, update: F)
    where
        F: FnOnce(&mut Faction) -> Region,
    {
        let Some(faction) = self.factions.get_mut(&id).filter(|f| !f.defeated) else {
            return;
        };
        let dirty = update(faction);
        if dirty.is_empty() {
            return;
        }
        self.events.push(FactionEvent::VisibilityChanged {
            faction: id,
            region: dirty,
        });

        let discovered: Vec<Point> = faction.fog.discovered_in(&dirty).collect();
        for other in self.factions.values_mut() {
            if other.id == id || !other.allies.contains(&id) {
                continue;
            }
            if !other.defeated {
                for point in &discovered {
                    other.fog.discover(*point);
                }
            }
            self.events.push(FactionEvent::VisibilityChanged {
                faction: other.id,
                region: dirty,
            });
        }
        tracing::trace!(faction = %id, ?dirty, "Visibility changed");
    }

    /// Defeat every faction that lost an entity and now owns nothing.
    pub fn settle_defeats(&mut self) {
        for id in std::mem::take(&mut self.losses) {
            let Some(faction) = self.factions.get_mut(&id) else {
                continue;
            };
            if !faction.defeated && faction.tracked.is_empty() {
                faction.defeated = true;
                tracing::debug!(faction = %id, "Faction defeated");
                self.events.push(FactionEvent::Defeated(id));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::UnitData;

    const RED: FactionId = FactionId(1);
    const BLUE: FactionId = FactionId(2);

    fn setup() -> (EntityManager, Factions) {
        let size = Size::new(32, 32);
        let mut factions = Factions::new();
        factions.add(Faction::new(RED, "Red", size)).unwrap();
        factions.add(Faction::new(BLUE, "Blue", size)).unwrap();
        (EntityManager::new(size, 8), factions)
    }

    fn dispatch(entities: &mut EntityManager, factions: &mut Factions) {
        let events = entities.drain_events();
        factions.handle_events(entities, events);
    }

    fn scout() -> UnitData {
        UnitData::ground("scout", Fixed::from_num(3))
    }

    fn at(x: i32, y: i32) -> Vec2Fixed {
        Vec2Fixed::from_ints(x, y)
    }

    fn vis(factions: &Factions, id: FactionId, x: i32, y: i32) -> TileVisibility {
        factions.tile_visibility(id, Point::new(x, y)).unwrap()
    }

    #[test]
    fn test_duplicate_and_unknown_factions() {
        let (_, mut factions) = setup();
        assert!(factions.add(Faction::new(RED, "Again", Size::new(4, 4))).is_err());
        assert_eq!(
            factions.get(FactionId(9)).err(),
            Some(GameError::FactionNotFound(FactionId(9)))
        );
        assert_eq!(FactionId(3).to_string(), "faction 3");
    }

    #[test]
    fn test_unit_reveals_and_follows() {
        let (mut entities, mut factions) = setup();
        let unit = entities.create_unit(RED, scout(), at(5, 5));
        dispatch(&mut entities, &mut factions);
        assert_eq!(vis(&factions, RED, 5, 5), TileVisibility::Visible);
        assert_eq!(vis(&factions, BLUE, 5, 5), TileVisibility::Undiscovered);

        entities.move_entity(unit, at(20, 5)).unwrap();
        dispatch(&mut entities, &mut factions);
        assert_eq!(vis(&factions, RED, 5, 5), TileVisibility::Discovered);
        assert_eq!(vis(&factions, RED, 20, 5), TileVisibility::Visible);

        let events = factions.drain_events();
        assert!(events.iter().all(|e| matches!(
            e,
            FactionEvent::VisibilityChanged { faction: RED, .. }
        )));
        assert_eq!(events.len(), 2);
    }

    #[test]
    fn test_moves_before_add_are_resolved() {
        let (mut entities, mut factions) = setup();
        let unit = entities.create_unit(RED, scout(), at(2, 2));
        entities.move_entity(unit, at(10, 10)).unwrap();
        entities.move_entity(unit, at(20, 20)).unwrap();
        dispatch(&mut entities, &mut factions);

        assert_eq!(vis(&factions, RED, 20, 20), TileVisibility::Visible);
        assert_eq!(vis(&factions, RED, 2, 2), TileVisibility::Undiscovered);
        assert_eq!(factions.get(RED).unwrap().fog().visible_count(), 29);
    }

    #[test]
    fn test_building_footprint_then_sight() {
        let (mut entities, mut factions) = setup();
        let farm = entities.create_unit(
            RED,
            UnitData::building("farm", Size::new(2, 2), Fixed::from_num(4), 10),
            at(10, 10),
        );
        dispatch(&mut entities, &mut factions);
        let red = factions.get(RED).unwrap();
        assert_eq!(red.fog().visible_count(), 0);
        assert_eq!(red.fog().discovered_count(), 4);
        assert_eq!(red.food_capacity(), 0);

        entities.complete_construction(farm).unwrap();
        dispatch(&mut entities, &mut factions);
        let red = factions.get(RED).unwrap();
        assert_eq!(vis(&factions, RED, 14, 11), TileVisibility::Visible);
        assert_eq!(red.food_capacity(), 10);
    }

    #[test]
    fn test_food_is_capped() {
        let (mut entities, mut factions) = setup();
        for i in 0..3 {
            let data = UnitData::building("castle", Size::new(2, 2), Fixed::from_num(2), 90);
            let handle = entities.create_unit(RED, data, at(i * 4, 0));
            entities.complete_construction(handle).unwrap();
        }
        entities.create_unit(RED, scout(), at(20, 20));
        dispatch(&mut entities, &mut factions);

        let red = factions.get(RED).unwrap();
        assert_eq!(red.food_capacity(), MAX_FOOD);
        assert_eq!(red.food_used(), 1);
        assert!(red.can_afford_food(199));
        assert!(!red.can_afford_food(200));
    }

    #[test]
    fn test_death_downgrades_to_discovered_and_defeats() {
        let (mut entities, mut factions) = setup();
        let unit = entities.create_unit(BLUE, scout(), at(8, 8));
        dispatch(&mut entities, &mut factions);
        factions.drain_events();

        entities.kill(unit).unwrap();
        dispatch(&mut entities, &mut factions);
        assert_eq!(vis(&factions, BLUE, 8, 8), TileVisibility::Discovered);
        let blue = factions.get(BLUE).unwrap();
        assert!(blue.is_defeated());
        assert_eq!(blue.food_used(), 0);
        assert!(factions.drain_events().contains(&FactionEvent::Defeated(BLUE)));
    }

    #[test]
    fn test_replacement_in_same_batch_is_not_defeat() {
        let (mut entities, mut factions) = setup();
        let parent = entities.create_unit(BLUE, scout(), at(4, 4));
        dispatch(&mut entities, &mut factions);

        entities
            .update(Fixed::ONE, |entities, handle, _| {
                if handle == parent {
                    entities.create_unit(BLUE, scout(), at(20, 20));
                    entities.kill(handle)?;
                }
                Ok(())
            })
            .unwrap();
        dispatch(&mut entities, &mut factions);

        let blue = factions.get(BLUE).unwrap();
        assert!(!blue.is_defeated());
        assert_eq!(blue.entity_count(), 1);
        assert_eq!(blue.food_used(), 1);
        assert_eq!(vis(&factions, BLUE, 20, 20), TileVisibility::Visible);
        assert_eq!(vis(&factions, BLUE, 4, 4), TileVisibility::Discovered);
        assert!(!factions.drain_events().contains(&FactionEvent::Defeated(BLUE)));
    }

    #[test]
    fn test_finished_building_sees_its_whole_footprint() {
        let (mut entities, mut factions) = setup();
        let data = UnitData::building("wall", Size::new(6, 6), Fixed::ZERO, 0);
        let wall = entities.create_unit(RED, data, at(10, 10));
        dispatch(&mut entities, &mut factions);
        assert_eq!(factions.get(RED).unwrap().fog().visible_count(), 0);

        entities.complete_construction(wall).unwrap();
        dispatch(&mut entities, &mut factions);
        let footprint = Region::new(Point::new(10, 10), Size::new(6, 6));
        assert!(footprint.points().all(|p| vis(&factions, RED, p.x, p.y) == TileVisibility::Visible));
        assert_eq!(factions.get(RED).unwrap().fog().visible_count(), 36);

        entities.kill(wall).unwrap();
        dispatch(&mut entities, &mut factions);
        let red = factions.get(RED).unwrap();
        assert_eq!(red.fog().visible_count(), 0);
        assert_eq!(red.fog().discovered_count(), 36);
    }

    #[test]
    fn test_defeated_fog_is_frozen() {
        let (mut entities, mut factions) = setup();
        let unit = entities.create_unit(BLUE, scout(), at(8, 8));
        dispatch(&mut entities, &mut factions);
        entities.kill(unit).unwrap();
        dispatch(&mut entities, &mut factions);
        let frozen = factions.get(BLUE).unwrap().fog().clone();

        entities.create_unit(BLUE, scout(), at(25, 25));
        dispatch(&mut entities, &mut factions);
        assert_eq!(factions.get(BLUE).unwrap().fog(), &frozen);
    }

    #[test]
    fn test_alliance_merges_live_visibility() {
        let (mut entities, mut factions) = setup();
        let blue_unit = entities.create_unit(BLUE, scout(), at(20, 20));
        entities.create_unit(RED, scout(), at(2, 2));
        dispatch(&mut entities, &mut factions);
        assert_eq!(vis(&factions, RED, 20, 20), TileVisibility::Undiscovered);

        factions.set_allied(RED, BLUE, true).unwrap();
        assert_eq!(vis(&factions, RED, 20, 20), TileVisibility::Visible);
        // Alliances are one-directional.
        assert_eq!(vis(&factions, BLUE, 2, 2), TileVisibility::Undiscovered);
        assert!(factions.can_see(RED, &Region::new(Point::new(19, 19), Size::ONE)).unwrap());

        entities.move_entity(blue_unit, at(28, 20)).unwrap();
        factions.drain_events();
        dispatch(&mut entities, &mut factions);
        assert_eq!(vis(&factions, RED, 28, 20), TileVisibility::Visible);
        let events = factions.drain_events();
        assert!(events
            .iter()
            .any(|e| matches!(e, FactionEvent::VisibilityChanged { faction: RED, .. })));

        factions.set_allied(RED, BLUE, false).unwrap();
        assert_eq!(vis(&factions, RED, 28, 20), TileVisibility::Discovered);
        assert_eq!(vis(&factions, RED, 20, 20), TileVisibility::Discovered);
        assert!(!factions.can_see(RED, &Region::new(Point::new(26, 18), Size::new(4, 4))).unwrap());
        assert_eq!(vis(&factions, RED, 2, 2), TileVisibility::Visible);
    }

    #[test]
    fn test_set_allied_unknown_faction() {
        let (_, mut factions) = setup();
        assert_eq!(
            factions.set_allied(RED, FactionId(7), true),
            Err(GameError::FactionNotFound(FactionId(7)))
        );
        factions.set_allied(RED, RED, true).unwrap();
        assert!(!factions.get(RED).unwrap().is_allied_with(RED));
    }

    #[test]
    fn test_resource_nodes_are_ignored() {
        let (mut entities, mut factions) = setup();
        entities.create_resource_node(at(4, 4), Size::new(2, 2), 100);
        dispatch(&mut entities, &mut factions);
        assert!(factions.drain_events().is_empty());
        assert!(factions.iter().all(|f| f.entity_count() == 0));
    }

    #[test]
    fn test_can_see_clips_region() {
        let (mut entities, mut factions) = setup();
        entities.create_unit(RED, scout(), at(0, 0));
        dispatch(&mut entities, &mut factions);
        let region = Region::new(Point::new(-5, -5), Size::new(6, 6));
        assert!(factions.can_see(RED, &region).unwrap());
        assert!(!factions.can_see(BLUE, &region).unwrap());
    }
}
