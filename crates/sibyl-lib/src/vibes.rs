//! Voice-style preset ("vibe") catalog.
//!
//! Loaded once from an embedded JSON asset. Lookup is case-insensitive;
//! the front-end asks for a small random sample to rotate suggestions.

use rand::seq::SliceRandom;

use sibyl_core::types::Vibe;

const VIBES_JSON: &str = include_str!("../assets/vibes.json");

pub struct VibeCatalog {
    vibes: Vec<Vibe>,
}

impl Default for VibeCatalog {
    fn default() -> Self {
        Self::load()
    }
}

impl VibeCatalog {
    /// Parse the embedded catalog. A malformed asset is a build defect, so
    /// this panics rather than returning an error.
    pub fn load() -> Self {
        let vibes: Vec<Vibe> =
            serde_json::from_str(VIBES_JSON).expect("embedded vibes.json is valid");
        tracing::info!("loaded {} vibes", vibes.len());
        Self { vibes }
    }

    pub fn all(&self) -> &[Vibe] {
        &self.vibes
    }

    pub fn by_name(&self, name: &str) -> Option<&Vibe> {
        self.vibes.iter().find(|v| v.name.eq_ignore_ascii_case(name))
    }

    /// Up to `count` distinct vibes in random order. Asking for more than
    /// the catalog holds returns the whole catalog.
    pub fn random(&self, count: usize) -> Vec<Vibe> {
        self.vibes
            .choose_multiple(&mut rand::thread_rng(), count)
            .cloned()
            .collect()
    }
}
