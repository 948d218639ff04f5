//! Declarative field/fallback tables.
//!
//! ## Learning: Data over Repetition
//!
//! Every field a panel shows needs "stored value, or this default". Rather
//! than repeating that check at each read, a block type declares its fields
//! once in a `BlockSchema` and every read goes through `BlockSchema::resolve`.
//!
//! The tables describe what the presentation layer shows. The store itself
//! accepts any field on any block type.

use std::collections::HashMap;

use blockdefaults_model::{BlockSettings, BlockTypeId, FieldValue, lookup};

/// Block type of the Advanced Heading block.
pub const ADVANCED_HEADING: &str = "kadence/advancedheading";

/// One configurable field and the value it takes when unset.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSpec {
    pub key: &'static str,
    pub fallback: FieldValue,
}

impl FieldSpec {
    pub fn new(key: &'static str, fallback: impl Into<FieldValue>) -> Self {
        Self {
            key,
            fallback: fallback.into(),
        }
    }
}

/// The declared fields of one block type.
#[derive(Debug, Clone)]
pub struct BlockSchema {
    block_type: BlockTypeId,
    fields: Vec<FieldSpec>,
}

impl BlockSchema {
    /// Creates a schema from its field table.
    pub fn new(block_type: impl Into<BlockTypeId>, fields: Vec<FieldSpec>) -> Self {
        Self {
            block_type: block_type.into(),
            fields,
        }
    }

    /// Field table of the Advanced Heading block.
    pub fn advanced_heading() -> Self {
        let padding = FieldValue::numbers([0, 0, 0, 0]);
        Self::new(
            ADVANCED_HEADING,
            vec![
                FieldSpec::new("level", 2),
                FieldSpec::new("align", ""),
                FieldSpec::new("color", ""),
                FieldSpec::new("sizeType", "px"),
                FieldSpec::new("lineType", "px"),
                // Typography
                FieldSpec::new("letterSpacing", ""),
                FieldSpec::new("typography", ""),
                FieldSpec::new("googleFont", false),
                FieldSpec::new("loadGoogleFont", true),
                FieldSpec::new("fontVariant", ""),
                FieldSpec::new("fontWeight", "regular"),
                FieldSpec::new("fontStyle", "normal"),
                FieldSpec::new("fontSubset", ""),
                FieldSpec::new("textTransform", ""),
                // Highlight
                FieldSpec::new("markColor", "#f76a0c"),
                FieldSpec::new("markBG", ""),
                FieldSpec::new("markBGOpacity", 1),
                FieldSpec::new("markBorder", ""),
                FieldSpec::new("markBorderOpacity", 1),
                FieldSpec::new("markBorderStyle", "solid"),
                FieldSpec::new("markBorderWidth", 0),
                FieldSpec::new("markSizeType", "px"),
                FieldSpec::new("markLineType", "px"),
                FieldSpec::new("markLetterSpacing", ""),
                FieldSpec::new("markTypography", ""),
                FieldSpec::new("markGoogleFont", false),
                FieldSpec::new("markLoadGoogleFont", true),
                FieldSpec::new("markFontVariant", ""),
                FieldSpec::new("markFontWeight", "regular"),
                FieldSpec::new("markFontStyle", "normal"),
                FieldSpec::new("markFontSubset", ""),
                FieldSpec::new("markPadding", padding),
                FieldSpec::new("markPaddingControl", "linked"),
                FieldSpec::new("markTextTransform", ""),
                // Margin
                FieldSpec::new("marginType", "px"),
                FieldSpec::new("topMargin", ""),
                FieldSpec::new("bottomMargin", ""),
            ],
        )
    }

    pub fn block_type(&self) -> &BlockTypeId {
        &self.block_type
    }

    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    /// Returns the declared fallback of a field.
    pub fn fallback(&self, key: &str) -> Option<&FieldValue> {
        self.fields
            .iter()
            .find(|spec| spec.key == key)
            .map(|spec| &spec.fallback)
    }

    /// Returns the effective value of a field.
    ///
    /// `None` only for an undeclared field that also has no stored value.
    pub fn resolve(&self, settings: Option<&BlockSettings>, key: &str) -> Option<FieldValue> {
        lookup(settings, key)
            .or_else(|| self.fallback(key))
            .cloned()
    }

    /// Returns every declared field defaulted, plus any extra stored fields.
    pub fn effective(&self, settings: Option<&BlockSettings>) -> BlockSettings {
        let mut view: BlockSettings = self
            .fields
            .iter()
            .map(|spec| (spec.key, spec.fallback.clone()))
            .collect();
        if let Some(settings) = settings {
            for (key, value) in settings.iter() {
                view.insert(key.clone(), value.clone());
            }
        }
        view
    }
}

/// Known block schemas, looked up by block type.
pub struct SchemaRegistry {
    schemas: HashMap<BlockTypeId, BlockSchema>,
}

impl SchemaRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self {
            schemas: HashMap::new(),
        }
    }

    /// Creates a registry holding the built-in schemas.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        registry.register(BlockSchema::advanced_heading());
        registry
    }

    /// Adds or replaces a schema.
    pub fn register(&mut self, schema: BlockSchema) {
        self.schemas.insert(schema.block_type.clone(), schema);
    }

    pub fn get(&self, block_type: &str) -> Option<&BlockSchema> {
        self.schemas.get(block_type)
    }

    /// Returns all registered schemas.
    pub fn iter(&self) -> impl Iterator<Item = &BlockSchema> {
        self.schemas.values()
    }
}

impl Default for SchemaRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}
