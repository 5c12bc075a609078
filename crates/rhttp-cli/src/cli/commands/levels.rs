//! `rhttp levels` – list log levels.

use rhttp_core::sinks::Level;

pub fn run_levels() {
    println!("{:<14} {:>5}  {}", "LEVEL", "VALUE", "KIND");
    for level in Level::all() {
        let kind = if level.is_custom() { "custom" } else { "standard" };
        println!("{:<14} {:>5}  {}", level.name(), level.value(), kind);
    }
}
