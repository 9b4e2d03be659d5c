//! Demo game configuration: a lobby world that counts down into an arena
//! world, which runs its fighters until the round is over and cycles back.
//!
//! This is a scripted end-to-end exercise of the kernel: world switching at
//! tick boundaries, entity spawn/despawn through the scene graph, and
//! entity update hooks.

use simhost_common::{GameTime, NodeId};
use simhost_kernel::{
    BoxError, Entity, GameConfiguration, KernelError, SceneGraph, ServerContext, UpdateContext,
    World, WorldFactory,
};
use std::cell::Cell;
use std::rc::Rc;
use tracing::info;

const LOBBY_COUNTDOWN: u64 = 3;
const FIGHTERS_PER_ROUND: usize = 3;
const FIGHTER_HEALTH: u32 = 5;

/// Registration-list entry wiring the demo game into the server.
pub struct DemoConfiguration;

impl GameConfiguration for DemoConfiguration {
    fn configure(&self, context: &mut ServerContext) -> Result<(), KernelError> {
        context.switch_world(LobbyFactory);
        Ok(())
    }
}

struct LobbyFactory;

impl WorldFactory for LobbyFactory {
    fn create(&self, _scene: &mut SceneGraph) -> Result<Box<dyn World>, BoxError> {
        Ok(Box::new(LobbyWorld {
            countdown: LOBBY_COUNTDOWN,
        }))
    }
}

struct ArenaFactory;

impl WorldFactory for ArenaFactory {
    fn create(&self, _scene: &mut SceneGraph) -> Result<Box<dyn World>, BoxError> {
        Ok(Box::new(ArenaWorld {
            fighters: Vec::new(),
            deployed: false,
        }))
    }
}

/// Holding pen before a round: counts down, then switches to the arena.
struct LobbyWorld {
    countdown: u64,
}

impl World for LobbyWorld {
    fn name(&self) -> &str {
        "lobby"
    }

    fn update(&mut self, ctx: &mut UpdateContext<'_>) {
        if self.countdown == 0 {
            info!(tick = ctx.tick(), "lobby countdown finished, starting round");
            ctx.switch_world(ArenaFactory);
        } else {
            self.countdown -= 1;
        }
    }
}

/// A fighter loses one health per tick; the arena culls it at zero.
struct Fighter {
    health: Rc<Cell<u32>>,
}

impl Entity for Fighter {
    fn update(&mut self, _time: &GameTime) {
        self.health.set(self.health.get().saturating_sub(1));
    }
}

/// One round of combat: deploys fighters, ticks them, culls the dead, and
/// returns to the lobby when the arena is empty.
struct ArenaWorld {
    fighters: Vec<(NodeId, Rc<Cell<u32>>)>,
    deployed: bool,
}

impl World for ArenaWorld {
    fn name(&self) -> &str {
        "arena"
    }

    fn update(&mut self, ctx: &mut UpdateContext<'_>) {
        if !self.deployed {
            self.deployed = true;
            for _ in 0..FIGHTERS_PER_ROUND {
                let health = Rc::new(Cell::new(FIGHTER_HEALTH));
                match ctx.spawn(Box::new(Fighter {
                    health: health.clone(),
                })) {
                    Ok(node) => self.fighters.push((node, health)),
                    Err(err) => tracing::warn!(error = %err, "failed to deploy fighter"),
                }
            }
            info!(
                tick = ctx.tick(),
                fighters = self.fighters.len(),
                "round started"
            );
        }

        ctx.update_entities();

        for (node, health) in &self.fighters {
            if health.get() == 0 {
                if let Err(err) = ctx.despawn(*node) {
                    tracing::warn!(error = %err, "failed to cull fighter");
                }
            }
        }
        self.fighters.retain(|(_, health)| health.get() > 0);

        if self.fighters.is_empty() {
            info!(tick = ctx.tick(), "round over, returning to lobby");
            ctx.switch_world(LobbyFactory);
        }
    }
}
