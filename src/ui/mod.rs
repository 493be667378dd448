// Terminal UI for tubepipe
// ratatui front end over the player

mod app;         // event loop, dialogs and rendering
pub mod events;  // key mapping per input mode
mod terminal;    // raw mode and alternate screen ownership
pub mod widgets; // text for the playlist and player panels

pub use app::App;
pub use events::{AppEvent, InputMode};
pub use terminal::Tui;
