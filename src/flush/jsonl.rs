use std::collections::BTreeSet;
use std::fs::{self, File};
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::model::{IdGenerator, SimTimestamp, World};

/// Write an iterator of serializable items to a JSONL file (one JSON object
/// per line).
fn write_jsonl<T: Serialize>(path: &Path, items: impl Iterator<Item = T>) -> io::Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    for item in items {
        serde_json::to_writer(&mut writer, &item)?;
        writer.write_all(b"\n")?;
    }
    writer.flush()
}

fn read_jsonl<T: DeserializeOwned>(path: &Path) -> io::Result<Vec<T>> {
    let reader = BufReader::new(File::open(path)?);
    let mut items = Vec::new();
    for line in reader.lines() {
        let line = line?;
        if line.is_empty() {
            continue;
        }
        items.push(serde_json::from_str(&line)?);
    }
    Ok(items)
}

/// Scalar world state, with the tuple-keyed relation maps flattened into
/// arrays (JSON object keys must be strings).
#[derive(Serialize, Deserialize)]
struct WorldMeta {
    current_time: SimTimestamp,
    id_gen: IdGenerator,
    wars: Vec<(u64, u64)>,
    clan_relations: Vec<(u64, u64, i32)>,
    managed_heroes: Vec<u64>,
    player_party: Option<u64>,
    player_hero: Option<u64>,
}

/// Flush the world to JSONL checkpoint files in `output_dir`.
///
/// Creates the directory if needed. Writes one JSONL file per catalog
/// (`parties.jsonl`, `heroes.jsonl`, `settlements.jsonl`, `clans.jsonl`,
/// `cultures.jsonl`, `troop_types.jsonl`) plus `meta.json` for scalar state.
/// This is the whole persistence surface: budgets and population caches are
/// recomputed from scratch after a load.
pub fn save_to_jsonl(world: &World, output_dir: &Path) -> io::Result<()> {
    fs::create_dir_all(output_dir)?;

    write_jsonl(&output_dir.join("parties.jsonl"), world.parties.values())?;
    write_jsonl(&output_dir.join("heroes.jsonl"), world.heroes.values())?;
    write_jsonl(
        &output_dir.join("settlements.jsonl"),
        world.settlements.values(),
    )?;
    write_jsonl(&output_dir.join("clans.jsonl"), world.clans.values())?;
    write_jsonl(&output_dir.join("cultures.jsonl"), world.cultures.values())?;
    write_jsonl(
        &output_dir.join("troop_types.jsonl"),
        world.troop_types.values(),
    )?;

    let meta = WorldMeta {
        current_time: world.current_time,
        id_gen: world.id_gen.clone(),
        wars: world.wars.iter().copied().collect(),
        clan_relations: world
            .clan_relations
            .iter()
            .map(|(&(a, b), &v)| (a, b, v))
            .collect(),
        managed_heroes: world.managed_heroes.iter().copied().collect(),
        player_party: world.player_party,
        player_hero: world.player_hero,
    };
    let mut writer = BufWriter::new(File::create(output_dir.join("meta.json"))?);
    serde_json::to_writer_pretty(&mut writer, &meta)?;
    writer.flush()
}

/// Load a world from a checkpoint directory written by `save_to_jsonl`.
pub fn load_from_jsonl(input_dir: &Path) -> io::Result<World> {
    let meta: WorldMeta =
        serde_json::from_reader(BufReader::new(File::open(input_dir.join("meta.json"))?))?;

    let mut world = World::new();
    for party in read_jsonl::<crate::model::Party>(&input_dir.join("parties.jsonl"))? {
        world.parties.insert(party.id, party);
    }
    for hero in read_jsonl::<crate::model::Hero>(&input_dir.join("heroes.jsonl"))? {
        world.heroes.insert(hero.id, hero);
    }
    for settlement in
        read_jsonl::<crate::model::Settlement>(&input_dir.join("settlements.jsonl"))?
    {
        world.settlements.insert(settlement.id, settlement);
    }
    for clan in read_jsonl::<crate::model::Clan>(&input_dir.join("clans.jsonl"))? {
        world.clans.insert(clan.id, clan);
    }
    for culture in read_jsonl::<crate::model::Culture>(&input_dir.join("cultures.jsonl"))? {
        world.cultures.insert(culture.id, culture);
    }
    for troop in read_jsonl::<crate::model::TroopType>(&input_dir.join("troop_types.jsonl"))? {
        world.troop_types.insert(troop.id, troop);
    }

    world.current_time = meta.current_time;
    world.id_gen = meta.id_gen;
    world.wars = meta.wars.into_iter().collect::<BTreeSet<_>>();
    world.clan_relations = meta
        .clan_relations
        .into_iter()
        .map(|(a, b, v)| ((a, b), v))
        .collect();
    world.managed_heroes = meta.managed_heroes.into_iter().collect();
    world.player_party = meta.player_party;
    world.player_hero = meta.player_hero;
    Ok(world)
}
