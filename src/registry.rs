// Registry - Name-keyed factory map with deterministic ordering
// Chord strategies and playback styles are both looked up through this

type Factory<T> = Box<dyn Fn() -> Box<T> + Send + Sync>;

/// Ordered map from identifier to factory
///
/// Enumeration follows registration order. Registering an existing name
/// replaces its factory in place.
pub struct Registry<T: ?Sized> {
    entries: Vec<(String, Factory<T>)>,
}

impl<T: ?Sized> Registry<T> {
    pub fn new() -> Self {
        Registry {
            entries: Vec::new(),
        }
    }

    /// Register a factory under a name
    pub fn register<F>(&mut self, name: impl Into<String>, factory: F)
    where
        F: Fn() -> Box<T> + Send + Sync + 'static,
    {
        let name = name.into();
        let factory: Factory<T> = Box::new(factory);
        match self.entries.iter_mut().find(|(existing, _)| *existing == name) {
            Some(entry) => entry.1 = factory,
            None => self.entries.push((name, factory)),
        }
    }

    /// Build a fresh instance, None for unknown names
    pub fn create(&self, name: &str) -> Option<Box<T>> {
        self.entries
            .iter()
            .find(|(existing, _)| existing == name)
            .map(|(_, factory)| factory())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.iter().any(|(existing, _)| existing == name)
    }

    /// Registered names in registration order
    pub fn names(&self) -> Vec<String> {
        self.entries.iter().map(|(name, _)| name.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<T: ?Sized> Default for Registry<T> {
    fn default() -> Self {
        Registry::new()
    }
}
