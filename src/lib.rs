//! pollcast library
//!
//! Live audience polling for stream overlays: an operator starts a poll,
//! viewers vote through a public page, and an overlay page shows the live
//! tally. The poll engine is shared by three HTTP listeners (display,
//! dashboard, voting) and throttles each voter with a cooldown.

pub mod cli;
pub mod config;
pub mod logging;
pub mod polls;
pub mod server;
