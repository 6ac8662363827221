use rustc_hash::FxHashMap;

/// A value assigned by the solver to one declared symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelValue {
    Bool(bool),
    /// Bit pattern, zero-extended to 64 bits.
    BitVec(u64),
}

impl ModelValue {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ModelValue::Bool(b) => Some(*b),
            ModelValue::BitVec(_) => None,
        }
    }

    pub fn as_bits(&self) -> Option<u64> {
        match self {
            ModelValue::BitVec(v) => Some(*v),
            ModelValue::Bool(_) => None,
        }
    }
}

/// A satisfying assignment parsed from `(get-model)` output. Keys are
/// the symbol names as declared, without SMT-LIB `|` quoting.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Model {
    assignments: FxHashMap<String, ModelValue>,
}

impl Model {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: String, value: ModelValue) {
        self.assignments.insert(name, value);
    }

    pub fn get(&self, name: &str) -> Option<&ModelValue> {
        self.assignments.get(name)
    }

    /// A selector is true only if the model explicitly says so.
    pub fn is_true(&self, name: &str) -> bool {
        matches!(self.get(name), Some(ModelValue::Bool(true)))
    }

    pub fn len(&self) -> usize {
        self.assignments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assignments.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ModelValue)> {
        self.assignments.iter().map(|(k, v)| (k.as_str(), v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_and_lookup() {
        let mut m = Model::new();
        m.insert("a".to_string(), ModelValue::Bool(true));
        m.insert("x".to_string(), ModelValue::BitVec(0x2A));
        assert_eq!(m.get("a"), Some(&ModelValue::Bool(true)));
        assert_eq!(m.get("x").and_then(ModelValue::as_bits), Some(0x2A));
        assert!(m.get("missing").is_none());
        assert_eq!(m.len(), 2);
    }

    #[test]
    fn is_true_requires_an_explicit_true() {
        let mut m = Model::new();
        m.insert("yes".to_string(), ModelValue::Bool(true));
        m.insert("no".to_string(), ModelValue::Bool(false));
        m.insert("bits".to_string(), ModelValue::BitVec(1));
        assert!(m.is_true("yes"));
        assert!(!m.is_true("no"));
        assert!(!m.is_true("bits"));
        assert!(!m.is_true("absent"));
    }

    #[test]
    fn value_accessors_are_typed() {
        assert_eq!(ModelValue::Bool(false).as_bool(), Some(false));
        assert_eq!(ModelValue::Bool(false).as_bits(), None);
        assert_eq!(ModelValue::BitVec(7).as_bits(), Some(7));
        assert_eq!(ModelValue::BitVec(7).as_bool(), None);
    }
}
