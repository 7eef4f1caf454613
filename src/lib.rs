pub mod agent_pool;
pub mod animation;
pub mod assets;
pub mod camera;
pub mod cli;
pub mod config;
pub mod deck;
pub mod dispatch;
pub mod events;
pub mod formation;
pub mod gesture;
pub mod input;
pub mod material;
pub mod picking;
pub mod replay;
pub mod roster;
pub mod scene;
pub mod timer;

pub use deck::CommandDeck;
pub use events::{CommandBus, DeckCommand, Subscription};
