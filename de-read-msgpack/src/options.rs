//! Decode configuration shared by every value of a single decode call.
use crate::ext::{ExtDecoder, ExtRegistry};

/// Default limit of nested arrays, maps and structs.
pub const DEFAULT_MAX_DEPTH: usize = 128;

/// How structs are laid out on the wire.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StructMode {
    /// Structs are MessagePack arrays with fields in declaration order.
    Positional,
    /// Structs are MessagePack maps keyed by field names.
    #[default]
    Named,
}

/// Options carried through a whole decode call.
#[derive(Debug, Clone)]
pub struct DecodeOptions {
    /// Struct convention for every struct encountered
    pub struct_mode: StructMode,
    /// Maximum nesting depth of containers
    pub max_depth: usize,
    /// Extension decoders consulted in order
    pub extensions: ExtRegistry,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        DecodeOptions {
            struct_mode: StructMode::default(),
            max_depth: DEFAULT_MAX_DEPTH,
            extensions: ExtRegistry::new(),
        }
    }
}

impl DecodeOptions {
    /// Options with the given struct convention and defaults otherwise.
    pub fn new(struct_mode: StructMode) -> Self {
        DecodeOptions { struct_mode, ..DecodeOptions::default() }
    }
    /// Replace the struct convention.
    pub fn struct_mode(mut self, struct_mode: StructMode) -> Self {
        self.struct_mode = struct_mode;
        self
    }
    /// Replace the maximum nesting depth.
    pub fn max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }
    /// Append an extension decoder to the registry.
    pub fn extension<E: ExtDecoder + 'static>(mut self, coder: E) -> Self {
        self.extensions.push(coder);
        self
    }
    /// Replace the extension registry.
    pub fn extensions(mut self, extensions: ExtRegistry) -> Self {
        self.extensions = extensions;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ext::TimestampDecoder;

    #[test]
    fn test_options_builder() {
        let opts = DecodeOptions::default();
        assert_eq!(opts.struct_mode, StructMode::Named);
        assert_eq!(opts.max_depth, DEFAULT_MAX_DEPTH);
        assert!(opts.extensions.is_empty());
        let opts = DecodeOptions::new(StructMode::Positional)
                   .max_depth(4)
                   .extension(TimestampDecoder);
        assert_eq!(opts.struct_mode, StructMode::Positional);
        assert_eq!(opts.max_depth, 4);
        assert_eq!(opts.extensions.len(), 1);
        let opts = opts.struct_mode(StructMode::Named).extensions(ExtRegistry::new());
        assert_eq!(opts.struct_mode, StructMode::Named);
        assert!(opts.extensions.is_empty());
    }
}
