use crate::aliases::AliasTable;
use crate::compose::{Composer, CompositionKey};
use crate::generation::Generation;
use crate::layer::{Layer, LayerId};
use crate::loader::MemoryLoader;
use crate::manifest::{GenerationEntry, Manifest};
use crate::value::{Fields, Value};
use schema::{GenerationNumber, Language, ModId};
use serde_json::json;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

pub fn gen(num: u8) -> GenerationNumber {
    GenerationNumber::new(num).unwrap()
}

/// Decode a layer body, panicking on malformed fixtures.
pub fn layer(name: &str, body: serde_json::Value) -> Layer {
    Layer::from_json(name, body).unwrap()
}

pub fn fields(body: serde_json::Value) -> Fields {
    Value::from(body).as_object().unwrap().clone()
}

/// Gens 5 to 7. Gen 7 publishes the "Mix And Mega" mod plus English and
/// French text. Gens 6 and 7 publish species details.
pub fn chain_manifest() -> Manifest {
    let entry = |num: u8| GenerationEntry {
        num: gen(num),
        data: format!("gen{}.json", num),
        mods: BTreeMap::new(),
        languages: BTreeMap::new(),
        details: (num >= 6).then(|| format!("gen{}/details.json", num)),
    };
    let mut gen7 = entry(7);
    gen7.mods
        .insert(ModId::normalize("Mix And Mega"), "gen7/mixandmega.json".to_string());
    gen7.languages.insert(Language::En, "gen7/text/en.json".to_string());
    gen7.languages.insert(Language::Fr, "gen7/text/fr.json".to_string());

    Manifest {
        aliases: Some("aliases.json".to_string()),
        generations: vec![entry(5), entry(6), gen7],
    }
}

/// Layer bodies of the chain, keyed by their manifest location.
pub fn chain_bodies() -> Vec<(&'static str, serde_json::Value)> {
    vec![
        (
            "gen7.json",
            json!({
                "species": {
                    "Charmander": {"num": 4, "name": "Charmander", "evos": ["Charmeleon"], "tier": "LC"},
                    "Charmeleon": {
                        "num": 5,
                        "name": "Charmeleon",
                        "prevo": "Charmander",
                        "evos": ["Charizard"],
                        "requiredItems": ["Leftovers"]
                    },
                    "Charizard": {
                        "num": 6,
                        "name": "Charizard",
                        "prevo": "Charmeleon",
                        "requiredItems": ["Charizardite X", "Charizardite Y"],
                        "tier": "OU"
                    }
                },
                "items": {
                    "Charizardite X": {
                        "num": 660,
                        "name": "Charizardite X",
                        "megaEvolves": "Charizard",
                        "megaStone": "Charizard-Mega-X"
                    },
                    "Charizardite Y": {"num": 678, "name": "Charizardite Y", "megaEvolves": "Charizard"},
                    "Leftovers": {"num": 234, "name": "Leftovers"},
                    "Choice Band": {"num": 220, "name": "Choice Band"}
                },
                "moves": {
                    "Flamethrower": {"num": 53, "name": "Flamethrower", "basePower": 90}
                }
            }),
        ),
        ("gen6.json", json!({"species": {"charizard": {"tier": "BL"}}})),
        (
            "gen5.json",
            json!({
                "species": {"charizard": {"tier": "UU", "requiredItems": null}},
                "items": {"charizarditex": null, "charizarditey": null}
            }),
        ),
        (
            "gen7/mixandmega.json",
            json!({
                "items": {
                    "choiceband": null,
                    "Dragon Ascent": {"num": 9001, "name": "Dragon Ascent", "megaEvolves": "Rayquaza"},
                    "leftovers": {"num": 1234}
                }
            }),
        ),
        (
            "gen7/text/en.json",
            json!({
                "items": {
                    "leftovers": {
                        "shortDesc": "Heals 1/16 max HP each turn.",
                        "desc": "At the end of every turn, holder restores 1/16 of its max HP."
                    }
                }
            }),
        ),
        (
            "gen7/text/fr.json",
            json!({"items": {"leftovers": {"shortDesc": "Soigne 1/16 des PV max."}}}),
        ),
        (
            "gen7/details.json",
            json!({
                "details": {
                    "Charmeleon": {
                        "color": "Red",
                        "heightm": 1.1,
                        "evoDetails": {"type": "LevelHold", "level": 16, "item": "Leftovers"},
                        "learnset": {"Dragon Ascent": ["7L1"], "Flamethrower": ["7M"]}
                    },
                    "Charizard": {"color": "Red", "heightm": 1.7}
                }
            }),
        ),
        (
            "gen6/details.json",
            json!({"details": {"charmeleon": {"heightm": 1.0}, "charizard": null}}),
        ),
        (
            "aliases.json",
            json!({
                "species": {"Zard": "charizard"},
                "items": {"lefties": "Leftovers"}
            }),
        ),
    ]
}

/// The chain's manifest together with every layer already decoded.
pub fn generation_chain() -> (Arc<Manifest>, HashMap<LayerId, Arc<Layer>>) {
    let manifest = chain_manifest();
    let bodies: HashMap<&str, serde_json::Value> = chain_bodies().into_iter().collect();

    let mut ids = Vec::new();
    for entry in &manifest.generations {
        ids.push(LayerId::Generation(entry.num));
        ids.extend(entry.mods.keys().map(|m| LayerId::Mod(entry.num, m.clone())));
        ids.extend(entry.languages.keys().map(|l| LayerId::Text(entry.num, *l)));
        if entry.details.is_some() {
            ids.push(LayerId::Details(entry.num));
        }
    }

    let layers = ids
        .into_iter()
        .map(|id| {
            let location = manifest.layer_ref(&id).unwrap();
            let body = bodies[location.path.as_str()].clone();
            let decoded = layer(&id.to_string(), body);
            (id, Arc::new(decoded))
        })
        .collect();
    (Arc::new(manifest), layers)
}

/// The chain's manifest and a loader serving all of its bodies.
pub fn memory_fixture() -> (Manifest, MemoryLoader) {
    let loader = MemoryLoader::new();
    for (path, body) in chain_bodies() {
        loader.insert(path, body);
    }
    (chain_manifest(), loader)
}

pub fn scenario_aliases() -> AliasTable {
    let (_, body) = chain_bodies()
        .into_iter()
        .find(|(path, _)| *path == "aliases.json")
        .unwrap();
    AliasTable::from_json(body).unwrap()
}

/// Plain gen 7 with the chain's aliases: three Charmander line species, two
/// mega stones pointing back at Charizard, and Leftovers.
pub fn scenario_generation() -> Generation {
    let (manifest, layers) = generation_chain();
    let composer = Composer::new(manifest);
    let dataset = composer.compose(&layers, &CompositionKey::new(gen(7))).unwrap();
    Generation::new(dataset, Arc::new(scenario_aliases()))
}

/// Gen 7 with both text languages folded in.
pub fn text_generation() -> Generation {
    let (manifest, layers) = generation_chain();
    let composer = Composer::new(manifest);
    let key = CompositionKey::new(gen(7)).with_languages([Language::En, Language::Fr]);
    let dataset = composer.compose(&layers, &key).unwrap();
    Generation::new(dataset, Arc::new(scenario_aliases()))
}

/// A one-generation view over `body`, without aliases.
pub fn single_generation(body: serde_json::Value) -> Generation {
    let manifest = Manifest {
        aliases: None,
        generations: vec![GenerationEntry {
            num: gen(7),
            data: "gen7.json".to_string(),
            mods: BTreeMap::new(),
            languages: BTreeMap::new(),
            details: None,
        }],
    };
    let layers = HashMap::from([(LayerId::Generation(gen(7)), Arc::new(layer("gen7", body)))]);
    let dataset = Composer::new(Arc::new(manifest))
        .compose(&layers, &CompositionKey::new(gen(7)))
        .unwrap();
    Generation::new(dataset, Arc::new(AliasTable::default()))
}
