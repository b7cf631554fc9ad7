//! Ordered collection of built-in colormaps with a circular cursor.

use crate::colormap::Colormap;

pub struct ColormapRegistry {
    palettes: Vec<Colormap>,
    cursor: usize,
}

impl ColormapRegistry {
    /// Built-in set: viridis, hot, grayscale, in that order. The cursor
    /// starts on viridis.
    pub fn builtin() -> Self {
        let palettes = vec![Colormap::viridis(), Colormap::hot(), Colormap::grayscale()];
        let cursor = palettes.iter().position(|p| p.name() == "viridis").unwrap_or(0);
        ColormapRegistry { palettes, cursor }
    }

    pub fn current(&self) -> &Colormap {
        &self.palettes[self.cursor]
    }

    pub fn next(&mut self) -> &Colormap {
        self.cursor = (self.cursor + 1) % self.palettes.len();
        self.current()
    }

    pub fn prev(&mut self) -> &Colormap {
        self.cursor = (self.cursor + self.palettes.len() - 1) % self.palettes.len();
        self.current()
    }

    pub fn by_name(&self, name: &str) -> Option<&Colormap> {
        self.palettes.iter().find(|p| p.name() == name)
    }

    pub fn select(&mut self, name: &str) -> bool {
        if let Some(idx) = self.palettes.iter().position(|p| p.name() == name) {
            self.cursor = idx;
            true
        } else {
            false
        }
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.palettes.iter().map(|p| p.name()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_on_viridis() {
        let reg = ColormapRegistry::builtin();
        assert_eq!(reg.current().name(), "viridis");
    }

    #[test]
    fn next_wraps_around() {
        let mut reg = ColormapRegistry::builtin();
        let n = reg.names().len();
        for _ in 0..n {
            reg.next();
        }
        assert_eq!(reg.current().name(), "viridis");
    }

    #[test]
    fn prev_wraps_backward() {
        let mut reg = ColormapRegistry::builtin();
        reg.prev();
        assert_eq!(reg.current().name(), "grayscale");
    }

    #[test]
    fn select_by_name() {
        let mut reg = ColormapRegistry::builtin();
        assert!(reg.select("hot"));
        assert_eq!(reg.current().name(), "hot");
        assert!(!reg.select("nonexistent"));
    }
}
