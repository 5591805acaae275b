//! Common functionality and types of the command line.

use console::Emoji;

pub static STARTING: Emoji = Emoji("🚀 ", "");
pub static TRIGGERED: Emoji = Emoji("⏳ ", "");
pub static SUCCESS: Emoji = Emoji("✅ ", "");
pub static ERROR: Emoji = Emoji("❌ ", "");
