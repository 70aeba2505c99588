//! Shared UI icons.
//!
//! Each icon falls back to a plain-text marker on terminals without emoji
//! support.

use console::Emoji;

// Status indicators
pub static CHECK: Emoji<'_, '_> = Emoji("✅ ", "[OK]");
pub static CROSS: Emoji<'_, '_> = Emoji("❌ ", "[ERR]");
pub static SPARKLE: Emoji<'_, '_> = Emoji("✨ ", "*");
pub static LOCK: Emoji<'_, '_> = Emoji("🔒 ", "[!]");

// Farm indicators
pub static FARM: Emoji<'_, '_> = Emoji("🌱 ", "-");
pub static PIN: Emoji<'_, '_> = Emoji("📍 ", "@");
pub static DEVICE: Emoji<'_, '_> = Emoji("📟 ", "#");
pub static SEARCH: Emoji<'_, '_> = Emoji("🔍 ", "[?]");
