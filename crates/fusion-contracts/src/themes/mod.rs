mod palette;
mod store;

pub use palette::{Rgb, Theme, ThemeChoice, ThemeColors, THEMES};
pub use store::{JsonFileStorage, ThemeContext, ThemeStorage, THEME_STORAGE_KEY};
