//! AsyncAPI 2.x vocabulary shared by the import and export walkers.
//!
//! Every construct the walkers understand is a [`Construct`], and each one has
//! a [`Layout`] describing how it maps onto entities: an object with a fixed
//! field table, a keyed map of members, an ordered list of items, or a leaf.
//! Import walks the layout top-down creating entities; export reads the same
//! layout to re-dispatch children by label. Keeping both directions on one
//! table is what keeps them inverse of each other.

pub mod cleanup;
pub mod export;
pub mod import;

pub use cleanup::{CleanupSummary, clean_document};
pub use export::export_document;
pub use import::{ImportSummary, import_document};

use crate::catalog::{AssetKind, COMPONENTS_PREFIX, CatalogStore, Entity, StoreError};
use serde_json::{Map, Value};
use tracing::{debug, warn};

/// Label of the root entity of an imported document.
pub const ROOT_LABEL: &str = "document";

/// The root entity imported under `name`: parentless and labelled
/// [`ROOT_LABEL`]. Descendants sharing the name are ignored. When the same
/// name was imported more than once the newest root wins.
pub fn find_root<S: CatalogStore + ?Sized>(store: &S, name: &str) -> Result<Option<Entity>, StoreError> {
    let matches = store.find_entities_by_name(name)?;
    let total = matches.len();
    let root = matches
        .into_iter()
        .filter(|entity| entity.parent.is_none() && entity.label == ROOT_LABEL)
        .max_by_key(|entity| entity.id);
    debug!(name, total, found = root.is_some(), "looked up root entity");
    Ok(root)
}

/// Component categories the walkers model. Anything else found under
/// `components` is kept verbatim in the side channel.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ComponentCategory {
    Schemas,
    Messages,
    SecuritySchemes,
    Parameters,
    OperationTraits,
    MessageTraits,
    Channels,
    Servers,
}

impl ComponentCategory {
    pub const ALL: [ComponentCategory; 8] = [
        ComponentCategory::Schemas,
        ComponentCategory::Messages,
        ComponentCategory::SecuritySchemes,
        ComponentCategory::Parameters,
        ComponentCategory::OperationTraits,
        ComponentCategory::MessageTraits,
        ComponentCategory::Channels,
        ComponentCategory::Servers,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ComponentCategory::Schemas => "schemas",
            ComponentCategory::Messages => "messages",
            ComponentCategory::SecuritySchemes => "securitySchemes",
            ComponentCategory::Parameters => "parameters",
            ComponentCategory::OperationTraits => "operationTraits",
            ComponentCategory::MessageTraits => "messageTraits",
            ComponentCategory::Channels => "channels",
            ComponentCategory::Servers => "servers",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|category| category.as_str() == key)
    }

    /// Construct every member of this category is walked as.
    pub fn member(&self) -> Construct {
        match self {
            ComponentCategory::Schemas => Construct::Schema,
            ComponentCategory::Messages => Construct::Message,
            ComponentCategory::SecuritySchemes => Construct::SecurityScheme,
            ComponentCategory::Parameters => Construct::Parameter,
            ComponentCategory::OperationTraits => Construct::OperationTrait,
            ComponentCategory::MessageTraits => Construct::MessageTrait,
            ComponentCategory::Channels => Construct::Channel,
            ComponentCategory::Servers => Construct::Server,
        }
    }

    /// Canonical path of a member, e.g. `#/components/messages/Ping`. The
    /// name is escaped as a JSON pointer token, so `a/b` becomes `a~1b` and
    /// matches how references spell it.
    pub fn member_path(&self, name: &str) -> String {
        let token = name.replace('~', "~0").replace('/', "~1");
        format!("{COMPONENTS_PREFIX}{}/{token}", self.as_str())
    }
}

/// Document constructs known to the walkers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Construct {
    Document,
    /// Scalar leaf (`id`, `asyncapi`, `info.version`).
    Simple,
    /// Leaf whose whole JSON value is stored verbatim (`contact`, `x-examples`).
    Opaque,
    Info,
    Components,
    Category(ComponentCategory),
    Servers,
    Server,
    Security,
    Requirement,
    RequiredScopes,
    RequiredScope,
    Channels,
    Channel,
    Parameters,
    Parameter,
    Operation,
    OperationTraits,
    OperationTrait,
    Message,
    MessageTraits,
    MessageTrait,
    Schema,
    SecurityScheme,
    Flows,
    Flow,
    Scopes,
    Scope,
    Tags,
    Tag,
    ExternalDocs,
}

/// Expected shape of a modeled field. A field whose value has another shape
/// is left in the side channel.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Shape {
    /// Non-empty string.
    Text,
    Object,
    NonEmptyObject,
    Array,
    /// Anything but the empty string.
    Value,
    /// Anything; the walker enforces its own rules.
    Any,
}

impl Shape {
    pub fn matches(&self, value: &Value) -> bool {
        match self {
            Shape::Text => value.as_str().is_some_and(|text| !text.is_empty()),
            Shape::Object => value.is_object(),
            Shape::NonEmptyObject => value.as_object().is_some_and(|map| !map.is_empty()),
            Shape::Array => value.is_array(),
            Shape::Value => value.as_str() != Some(""),
            Shape::Any => true,
        }
    }
}

/// A fixed field of an object construct, walked as `construct`.
#[derive(Clone, Copy, Debug)]
pub struct Field {
    pub key: &'static str,
    pub shape: Shape,
    pub construct: Construct,
}

const fn field(key: &'static str, shape: Shape, construct: Construct) -> Field {
    Field {
        key,
        shape,
        construct,
    }
}

/// How a construct is laid out as entities.
#[derive(Clone, Copy, Debug)]
pub enum Layout {
    /// One entity; `description` becomes the entity description when
    /// `described`, listed fields become children, the rest goes to the side
    /// channel.
    Object {
        described: bool,
        fields: &'static [Field],
    },
    /// One entity with a child per key, each walked as `member`.
    Map { member: Construct },
    /// One entity typed `array` with a child per item, labelled `item_label`.
    List {
        item: Construct,
        item_label: &'static str,
    },
    Simple,
    Opaque,
    /// Property leaf whose description is the scope text.
    Scope,
    /// Property leaf named after a required scope string.
    RequiredScope,
}

const DOCUMENT_FIELDS: &[Field] = &[
    field("id", Shape::Value, Construct::Simple),
    field("asyncapi", Shape::Value, Construct::Simple),
    field("info", Shape::Object, Construct::Info),
    field("components", Shape::Any, Construct::Components),
    field("servers", Shape::Any, Construct::Servers),
    field("channels", Shape::Any, Construct::Channels),
    field("tags", Shape::Array, Construct::Tags),
    field("externalDocs", Shape::Object, Construct::ExternalDocs),
];

const INFO_FIELDS: &[Field] = &[
    field("version", Shape::Value, Construct::Simple),
    field("contact", Shape::Any, Construct::Opaque),
];

const SERVER_FIELDS: &[Field] = &[field("security", Shape::Array, Construct::Security)];

const CHANNEL_FIELDS: &[Field] = &[
    field("parameters", Shape::Object, Construct::Parameters),
    field("subscribe", Shape::Object, Construct::Operation),
    field("publish", Shape::Object, Construct::Operation),
];

const PARAMETER_FIELDS: &[Field] = &[field("schema", Shape::Object, Construct::Schema)];

const OPERATION_FIELDS: &[Field] = &[
    field("tags", Shape::Array, Construct::Tags),
    field("externalDocs", Shape::Object, Construct::ExternalDocs),
    field("traits", Shape::Array, Construct::OperationTraits),
    field("message", Shape::Object, Construct::Message),
];

const OPERATION_TRAIT_FIELDS: &[Field] = &[
    field("tags", Shape::Array, Construct::Tags),
    field("externalDocs", Shape::Object, Construct::ExternalDocs),
];

const MESSAGE_FIELDS: &[Field] = &[
    field("tags", Shape::Array, Construct::Tags),
    field("externalDocs", Shape::Object, Construct::ExternalDocs),
    field("traits", Shape::Array, Construct::MessageTraits),
    field("payload", Shape::Object, Construct::Schema),
    field("headers", Shape::Object, Construct::Schema),
];

const MESSAGE_TRAIT_FIELDS: &[Field] = &[
    field("tags", Shape::Array, Construct::Tags),
    field("externalDocs", Shape::Object, Construct::ExternalDocs),
    field("headers", Shape::Object, Construct::Schema),
];

/// `properties` is handled by the schema walkers directly: its members become
/// `Property` children of the schema entity itself.
const SCHEMA_FIELDS: &[Field] = &[
    field("items", Shape::Object, Construct::Schema),
    field("x-examples", Shape::Any, Construct::Opaque),
];

const SECURITY_SCHEME_FIELDS: &[Field] = &[field("flows", Shape::Object, Construct::Flows)];

const FLOW_FIELDS: &[Field] = &[field("scopes", Shape::Object, Construct::Scopes)];

const TAG_FIELDS: &[Field] = &[field("externalDocs", Shape::Object, Construct::ExternalDocs)];

const NO_FIELDS: &[Field] = &[];

const fn described(fields: &'static [Field]) -> Layout {
    Layout::Object {
        described: true,
        fields,
    }
}

impl Construct {
    pub fn layout(&self) -> Layout {
        match self {
            Construct::Document => Layout::Object {
                described: false,
                fields: DOCUMENT_FIELDS,
            },
            Construct::Simple => Layout::Simple,
            Construct::Opaque => Layout::Opaque,
            Construct::Info => described(INFO_FIELDS),
            Construct::Components => Layout::Object {
                described: false,
                fields: NO_FIELDS,
            },
            Construct::Category(category) => Layout::Map {
                member: category.member(),
            },
            Construct::Servers => Layout::Map {
                member: Construct::Server,
            },
            Construct::Server => described(SERVER_FIELDS),
            Construct::Security => Layout::List {
                item: Construct::Requirement,
                item_label: "requirement",
            },
            Construct::Requirement => Layout::Map {
                member: Construct::RequiredScopes,
            },
            Construct::RequiredScopes => Layout::List {
                item: Construct::RequiredScope,
                item_label: "scope",
            },
            Construct::RequiredScope => Layout::RequiredScope,
            Construct::Channels => Layout::Map {
                member: Construct::Channel,
            },
            Construct::Channel => described(CHANNEL_FIELDS),
            Construct::Parameters => Layout::Map {
                member: Construct::Parameter,
            },
            Construct::Parameter => described(PARAMETER_FIELDS),
            Construct::Operation => described(OPERATION_FIELDS),
            Construct::OperationTraits => Layout::List {
                item: Construct::OperationTrait,
                item_label: "trait",
            },
            Construct::OperationTrait => described(OPERATION_TRAIT_FIELDS),
            Construct::Message => described(MESSAGE_FIELDS),
            Construct::MessageTraits => Layout::List {
                item: Construct::MessageTrait,
                item_label: "trait",
            },
            Construct::MessageTrait => described(MESSAGE_TRAIT_FIELDS),
            Construct::Schema => described(SCHEMA_FIELDS),
            Construct::SecurityScheme => described(SECURITY_SCHEME_FIELDS),
            Construct::Flows => Layout::Map {
                member: Construct::Flow,
            },
            Construct::Flow => described(FLOW_FIELDS),
            Construct::Scopes => Layout::Map {
                member: Construct::Scope,
            },
            Construct::Scope => Layout::Scope,
            Construct::Tags => Layout::List {
                item: Construct::Tag,
                item_label: "tag",
            },
            Construct::Tag => described(TAG_FIELDS),
            Construct::ExternalDocs => described(NO_FIELDS),
        }
    }

    /// Asset kind of entities created for this construct. Schema properties
    /// are `Property` as well, but that depends on position, not construct.
    pub fn kind(&self) -> AssetKind {
        match self {
            Construct::Tag | Construct::Scope | Construct::RequiredScope => AssetKind::Property,
            _ => AssetKind::Element,
        }
    }

    /// Whether a `$ref` into components short-circuits this construct.
    pub fn accepts_ref(&self) -> bool {
        matches!(self.layout(), Layout::Object { .. }) && *self != Construct::Document
    }
}

/// Field table lookup by child label, used by export re-dispatch.
pub fn field_for(fields: &'static [Field], label: &str) -> Option<&'static Field> {
    fields.iter().find(|field| field.key == label)
}

/// The fields of `map` an object construct models with the expected shape.
///
/// Present fields with the wrong shape are logged; they stay in the side
/// channel because they are not returned here.
pub(crate) fn modeled_fields(
    map: &Map<String, Value>,
    described: bool,
    fields: &[Field],
    path: &str,
) -> Vec<&'static str> {
    let mut keys = Vec::new();
    if described {
        match map.get("description") {
            Some(value) if Shape::Text.matches(value) => keys.push("description"),
            Some(_) => warn!(path, "description is not a non-empty string; keeping it verbatim"),
            None => {}
        }
    }
    for field in fields {
        match map.get(field.key) {
            Some(value) if field.shape.matches(value) => keys.push(field.key),
            Some(_) => warn!(
                path,
                field = field.key,
                expected = ?field.shape,
                "unexpected shape; keeping field verbatim"
            ),
            None => {}
        }
    }
    keys
}
