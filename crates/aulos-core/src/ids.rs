#![forbid(unsafe_code)]

//! Monotonic id generation for manifest entities.
//!
//! Ids generated here are internal to one player session: they are distinct
//! from any id found in the source manifest and only need to be unique
//! within the generator that produced them. Each Manifest owns one
//! generator and derives nested generators for its Periods, Adaptations and
//! Representations, so no global counter is ever shared.

/// Generates ids of the form `<prefix><counter>`.
#[derive(Debug)]
pub struct IdGenerator {
    prefix: String,
    next: u64,
}

impl IdGenerator {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            next: 0,
        }
    }

    /// Produce the next id from this generator.
    pub fn generate(&mut self) -> String {
        let id = format!("{}{}", self.prefix, self.next);
        self.next += 1;
        id
    }

    /// Derive a nested generator scoped under the given id.
    ///
    /// Used to give each Period its own Adaptation id space, each
    /// Adaptation its own Representation id space, and so on.
    pub fn child(&self, scope: &str) -> IdGenerator {
        IdGenerator::new(format!("{}{}-", self.prefix, scope))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generates_monotonic_ids() {
        let mut gen = IdGenerator::new("manifest-");
        assert_eq!(gen.generate(), "manifest-0");
        assert_eq!(gen.generate(), "manifest-1");
        assert_eq!(gen.generate(), "manifest-2");
    }

    #[test]
    fn child_generators_are_independent() {
        let root = IdGenerator::new("");
        let mut periods = root.child("period");
        let mut adaptations = root.child("adaptation");

        assert_eq!(periods.generate(), "period-0");
        assert_eq!(periods.generate(), "period-1");
        assert_eq!(adaptations.generate(), "adaptation-0");
    }
}
