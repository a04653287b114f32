//! Deterministic world fixtures and single-system tick helpers shared by the
//! inline and integration test suites.

use rand::SeedableRng;
use rand::rngs::SmallRng;

use crate::config::Settings;
use crate::model::{
    Clan, ClanKind, FormationClass, Hero, ItemRoster, PartyKind, PartySpec, PartyState, Position,
    RaidState, Settlement, SettlementKind, SimTimestamp, TroopRoster, TroopType, World,
};
use crate::sim::{EngineState, Signal, SimSystem, TickContext};

/// A small but complete campaign world: an outlaw clan, a noble clan, the
/// player, a handful of lord parties for the power snapshot, hideouts, and
/// enough villages to open a raid slot.
pub struct WorldFixture {
    pub world: World,
    pub culture: u64,
    pub outlaw_clan: u64,
    pub noble_clan: u64,
    pub hideout: u64,
    pub hideout2: u64,
    pub village: u64,
    pub town: u64,
    pub looter: u64,
    pub raider: u64,
    pub veteran: u64,
    pub archer: u64,
    pub horseman: u64,
    pub recruit: u64,
}

pub fn build_world() -> WorldFixture {
    let mut world = World::new();
    world.current_time = SimTimestamp::new(1, 1, 0);
    let culture = world.add_culture("highland");

    // Clans. The noble clan gets a ruling hero so avoidance has an identity
    // to key on.
    let noble_leader = next_hero(&mut world, "Lord Varric", 60.0);
    let outlaw_clan = world.id_gen.next_id();
    world.add_clan(Clan {
        id: outlaw_clan,
        name: "Black Pennant".to_string(),
        kind: ClanKind::Outlaw,
        culture,
        leader: None,
    });
    let noble_clan = world.id_gen.next_id();
    world.add_clan(Clan {
        id: noble_clan,
        name: "House Varric".to_string(),
        kind: ClanKind::Noble,
        culture,
        leader: Some(noble_leader),
    });

    // Settlements. The hideouts are the warband home bases; the villages
    // ring the noble heartland so raid targeting has ten candidates (one
    // raid slot).
    let hideout = next_settlement(
        &mut world,
        "Crag Hollow",
        SettlementKind::Hideout,
        Position::new(10.0, 10.0),
        culture,
        outlaw_clan,
    );
    let hideout2 = next_settlement(
        &mut world,
        "Fenn's Rest",
        SettlementKind::Hideout,
        Position::new(150.0, 20.0),
        culture,
        outlaw_clan,
    );
    let town = next_settlement(
        &mut world,
        "Varric Keep",
        SettlementKind::Town,
        Position::new(70.0, 40.0),
        culture,
        noble_clan,
    );
    let mut village = 0;
    for index in 0..10u32 {
        let angle = index as f32 * 0.628;
        let position = Position::new(50.0 + 20.0 * angle.cos(), 50.0 + 20.0 * angle.sin());
        let id = next_settlement(
            &mut world,
            &format!("Varric Village {index}"),
            SettlementKind::Village,
            position,
            culture,
            noble_clan,
        );
        if index == 0 {
            village = id;
        }
    }

    // Troop catalog.
    let veteran = next_troop(&mut world, "Brigand Veteran", FormationClass::Infantry, 3, 6.0)
        .outlaw()
        .build();
    let raider = next_troop(&mut world, "Brigand Raider", FormationClass::Infantry, 2, 4.0)
        .outlaw()
        .upgrades_to(veteran)
        .build();
    let looter = next_troop(&mut world, "Looter", FormationClass::Infantry, 1, 2.0)
        .outlaw()
        .looter()
        .build();
    let archer = next_troop(&mut world, "Brigand Archer", FormationClass::Ranged, 2, 4.0)
        .outlaw()
        .build();
    let horseman = next_troop(&mut world, "Brigand Rider", FormationClass::Cavalry, 2, 5.0)
        .outlaw()
        .mounted()
        .build();
    let recruit = next_troop(&mut world, "Highland Recruit", FormationClass::Infantry, 2, 3.0)
        .cultured(culture)
        .build();
    let guard = next_troop(&mut world, "Highland Guard", FormationClass::Infantry, 3, 5.0)
        .cultured(culture)
        .build();

    // Lord parties feed the power-budget snapshot.
    for (name, size, position) in [
        ("Varric Column", 40, Position::new(120.0, 120.0)),
        ("Varric Vanguard", 60, Position::new(130.0, 110.0)),
        ("Varric Host", 80, Position::new(140.0, 130.0)),
    ] {
        let leader = next_hero(&mut world, name, 50.0);
        let mut troops = TroopRoster::new();
        troops.add_to_counts(guard, i64::from(size) - 1);
        register_active(
            &mut world,
            PartySpec {
                kind: PartyKind::Lord,
                clan: noble_clan,
                leader: Some(leader),
                home_settlement: Some(town),
                position,
                troops,
                prisoners: TroopRoster::new(),
                inventory: ItemRoster::new(),
            },
            name,
        );
    }

    // The player.
    let player_hero = next_hero(&mut world, "Player", 100.0);
    let mut player_troops = TroopRoster::new();
    player_troops.add_to_counts(guard, 49);
    let player_party = register_active(
        &mut world,
        PartySpec {
            kind: PartyKind::Lord,
            clan: noble_clan,
            leader: Some(player_hero),
            home_settlement: Some(town),
            position: Position::new(200.0, 200.0),
            troops: player_troops,
            prisoners: TroopRoster::new(),
            inventory: ItemRoster::new(),
        },
        "Player's Company",
    );
    world.player_party = Some(player_party);
    world.player_hero = Some(player_hero);

    WorldFixture {
        world,
        culture,
        outlaw_clan,
        noble_clan,
        hideout,
        hideout2,
        village,
        town,
        looter,
        raider,
        veteran,
        archer,
        horseman,
        recruit,
    }
}

impl WorldFixture {
    pub fn add_hero(&mut self, power: f32) -> u64 {
        next_hero(&mut self.world, "Bandit Hero", power)
    }

    /// A managed warband with a leader, home hideout, and `size` total men,
    /// roaming away from any hideout so merge seeking is not suppressed.
    pub fn spawn_managed_party(&mut self, size: u32) -> u64 {
        self.spawn_managed_party_at(size, Position::new(60.0, 60.0))
    }

    pub fn spawn_managed_party_at(&mut self, size: u32, position: Position) -> u64 {
        let leader = self.add_hero(30.0);
        self.world.managed_heroes.insert(leader);
        let mut troops = TroopRoster::new();
        troops.add_to_counts(self.raider, i64::from(size) - 1);
        let hideout = self.hideout;
        register_active(
            &mut self.world,
            PartySpec {
                kind: PartyKind::Managed,
                clan: self.outlaw_clan,
                leader: Some(leader),
                home_settlement: Some(hideout),
                position,
                troops,
                prisoners: TroopRoster::new(),
                inventory: ItemRoster::new(),
            },
            "Warband",
        )
    }

    /// A leaderless free-bandit party, mergeable prey for managed warbands.
    pub fn spawn_free_bandits_at(&mut self, size: u32, position: Position) -> u64 {
        let mut troops = TroopRoster::new();
        troops.add_to_counts(self.looter, i64::from(size));
        register_active(
            &mut self.world,
            PartySpec {
                kind: PartyKind::FreeBandit,
                clan: self.outlaw_clan,
                leader: None,
                home_settlement: None,
                position,
                troops,
                prisoners: TroopRoster::new(),
                inventory: ItemRoster::new(),
            },
            "Looters",
        )
    }

    /// Backdate the merge/split cooldown so the party is immediately
    /// eligible.
    pub fn expire_cooldown(&mut self, id: u64) {
        if let Some(party) = self.world.parties.get_mut(&id) {
            party.last_merged_or_split = SimTimestamp::from_year(0);
        }
    }
}

/// Fresh engine state, RNG, and signal buffer for driving single operations.
pub fn test_context(_fixture: &WorldFixture) -> (EngineState, SmallRng, Vec<Signal>) {
    (
        EngineState::new(Settings::default()),
        SmallRng::seed_from_u64(42),
        Vec::new(),
    )
}

/// Assemble a `TickContext` over pre-borrowed parts.
pub fn make_ctx<'a>(
    world: &'a mut World,
    state: &'a mut EngineState,
    rng: &'a mut SmallRng,
    signals: &'a mut Vec<Signal>,
) -> TickContext<'a> {
    let EngineState {
        settings,
        budget,
        population,
    } = state;
    TickContext {
        world,
        settings,
        budget,
        population,
        rng,
        signals,
        inbox: &[],
    }
}

/// Run a single system tick at a specific timestamp. Returns emitted signals.
pub fn tick_system_at(
    world: &mut World,
    state: &mut EngineState,
    system: &mut dyn SimSystem,
    time: SimTimestamp,
    seed: u64,
) -> Vec<Signal> {
    world.current_time = time;
    let mut rng = SmallRng::seed_from_u64(seed);
    let mut signals = Vec::new();
    let EngineState {
        settings,
        budget,
        population,
    } = state;
    let mut ctx = TickContext {
        world,
        settings,
        budget,
        population,
        rng: &mut rng,
        signals: &mut signals,
        inbox: &[],
    };
    system.tick(&mut ctx);
    signals
}

/// Run a system's `handle_signals` with the given inbox. Returns newly
/// emitted signals.
pub fn deliver_signals(
    world: &mut World,
    state: &mut EngineState,
    system: &mut dyn SimSystem,
    inbox: &[Signal],
    seed: u64,
) -> Vec<Signal> {
    let mut rng = SmallRng::seed_from_u64(seed);
    let mut signals = Vec::new();
    let EngineState {
        settings,
        budget,
        population,
    } = state;
    let mut ctx = TickContext {
        world,
        settings,
        budget,
        population,
        rng: &mut rng,
        signals: &mut signals,
        inbox,
    };
    system.handle_signals(&mut ctx);
    signals
}

// -- Internal builders --

fn next_hero(world: &mut World, name: &str, power: f32) -> u64 {
    let id = world.id_gen.next_id();
    world.add_hero(Hero {
        id,
        name: name.to_string(),
        power,
        clan: None,
        home_settlement: None,
        alive: true,
    });
    id
}

fn next_settlement(
    world: &mut World,
    name: &str,
    kind: SettlementKind,
    position: Position,
    culture: u64,
    owner_clan: u64,
) -> u64 {
    let id = world.id_gen.next_id();
    world.add_settlement(Settlement {
        id,
        name: name.to_string(),
        kind,
        position,
        culture,
        owner_clan,
        raid_state: RaidState::Quiet,
    });
    id
}

fn register_active(world: &mut World, spec: PartySpec, name: &str) -> u64 {
    let now = world.current_time;
    let id = world
        .register_party(spec, now)
        .expect("fixture spec must be valid");
    let party = world.parties.get_mut(&id).expect("just registered");
    party.state = PartyState::Active;
    party.name = name.to_string();
    id
}

struct TroopBuilder<'a> {
    world: &'a mut World,
    troop: TroopType,
}

fn next_troop<'a>(
    world: &'a mut World,
    name: &str,
    class: FormationClass,
    tier: u32,
    power: f32,
) -> TroopBuilder<'a> {
    let id = world.id_gen.next_id();
    TroopBuilder {
        world,
        troop: TroopType {
            id,
            name: name.to_string(),
            class,
            tier,
            power,
            culture: None,
            mounted: false,
            is_looter: false,
            is_outlaw: false,
            upgrade_to: None,
        },
    }
}

impl TroopBuilder<'_> {
    fn outlaw(mut self) -> Self {
        self.troop.is_outlaw = true;
        self
    }
    fn looter(mut self) -> Self {
        self.troop.is_looter = true;
        self
    }
    fn mounted(mut self) -> Self {
        self.troop.mounted = true;
        self
    }
    fn cultured(mut self, culture: u64) -> Self {
        self.troop.culture = Some(culture);
        self
    }
    fn upgrades_to(mut self, next: u64) -> Self {
        self.troop.upgrade_to = Some(next);
        self
    }
    fn build(self) -> u64 {
        self.world.add_troop_type(self.troop)
    }
}
