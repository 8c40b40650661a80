//! Watch event filtering.
//!
//! Raw watcher events are classified into [`GameEvent`]s. Only creations of games
//! that should run, spec changes and confirmed deletions reach the reconciler;
//! status writes and relists of unchanged objects are dropped here.

use crate::{crds::Game, reconciler::GameKey};
use kube::{runtime::watcher, ResourceExt};
use std::collections::{HashMap, HashSet};
use tracing::debug;

#[derive(Clone, Debug)]
pub enum GameEvent {
    Created(Game),
    Updated {
        old_generation: Option<i64>,
        game: Game,
    },
    /// `confirmed` is false when the game disappeared during a relist without
    /// a delete event from the API server
    Deleted { game: Game, confirmed: bool },
}

impl GameEvent {
    pub fn should_reconcile(&self) -> bool {
        match self {
            GameEvent::Created(game) => game.spec.deploy,
            GameEvent::Updated {
                old_generation,
                game,
            } => *old_generation != game.metadata.generation,
            GameEvent::Deleted { confirmed, .. } => *confirmed,
        }
    }

    pub fn into_game(self) -> Game {
        match self {
            GameEvent::Created(game)
            | GameEvent::Updated { game, .. }
            | GameEvent::Deleted { game, .. } => game,
        }
    }
}

/// Remembers the last seen version of every game so watcher events can be told apart
#[derive(Default)]
pub struct GameEventFilter {
    known: HashMap<GameKey, Game>,
    relisted: Option<HashSet<GameKey>>,
}

impl GameEventFilter {
    pub fn classify(&mut self, event: watcher::Event<Game>) -> Vec<GameEvent> {
        match event {
            watcher::Event::Init => {
                self.relisted = Some(HashSet::new());
                Vec::new()
            }
            watcher::Event::InitApply(game) => {
                if let (Some(seen), Some(key)) = (self.relisted.as_mut(), key_of(&game)) {
                    seen.insert(key);
                }
                self.apply(game).into_iter().collect()
            }
            watcher::Event::InitDone => {
                let seen = self.relisted.take().unwrap_or_default();
                let vanished: Vec<GameKey> = self
                    .known
                    .keys()
                    .filter(|key| !seen.contains(key))
                    .cloned()
                    .collect();

                vanished
                    .into_iter()
                    .filter_map(|key| self.known.remove(&key))
                    .map(|game| GameEvent::Deleted {
                        game,
                        confirmed: false,
                    })
                    .collect()
            }
            watcher::Event::Apply(game) => self.apply(game).into_iter().collect(),
            watcher::Event::Delete(game) => {
                if let Some(key) = key_of(&game) {
                    self.known.remove(&key);
                }
                vec![GameEvent::Deleted {
                    game,
                    confirmed: true,
                }]
            }
        }
    }

    fn apply(&mut self, game: Game) -> Option<GameEvent> {
        let Some(key) = key_of(&game) else {
            debug!("Ignoring game {} without namespace", game.name_any());
            return None;
        };

        match self.known.insert(key, game.clone()) {
            None => Some(GameEvent::Created(game)),
            Some(previous) => Some(GameEvent::Updated {
                old_generation: previous.metadata.generation,
                game,
            }),
        }
    }
}

fn key_of(game: &Game) -> Option<GameKey> {
    GameKey::of(game).ok()
}
