//! Flattening of the raw dataset into filterable items.
//!
//! Every class member becomes one [`Member`] carrying its class name and the
//! class inheritance chain; every enum becomes one [`EnumType`] holding its
//! items. Both are wrapped in [`FilterableItem`] and shared through `Arc`, since
//! they are immutable once indexed.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::dataset::{RawDataset, nullable};
use crate::query::{Bindings, Field, Value};

/// Member kinds the dump is known to produce. Anything else, or a missing
/// kind, decodes as `Unknown` instead of failing the whole dataset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MemberType {
    Property,
    Function,
    Event,
    Callback,
    #[default]
    #[serde(other)]
    Unknown,
}

impl MemberType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MemberType::Property => "Property",
            MemberType::Function => "Function",
            MemberType::Event => "Event",
            MemberType::Callback => "Callback",
            MemberType::Unknown => "Unknown",
        }
    }
}

/// Enum values are usually integers, but the dump format allows strings.
/// A missing or `null` value is `Null`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EnumValue {
    Integer(i64),
    Float(f64),
    Text(String),
    Bool(bool),
    #[default]
    Null,
}

impl EnumValue {
    fn value(&self) -> Value<'_> {
        match self {
            EnumValue::Integer(i) => Value::Number(*i as f64),
            EnumValue::Float(f) => Value::Number(*f),
            EnumValue::Text(s) => Value::str(s),
            EnumValue::Bool(b) => Value::Bool(*b),
            EnumValue::Null => Value::Null,
        }
    }
}

impl fmt::Display for EnumValue {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            EnumValue::Integer(i) => write!(f, "{i}"),
            EnumValue::Float(x) => write!(f, "{x}"),
            EnumValue::Text(s) => write!(f, "{s}"),
            EnumValue::Bool(b) => write!(f, "{b}"),
            EnumValue::Null => Ok(()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnumItem {
    pub name: String,
    #[serde(default)]
    pub value: EnumValue,
    #[serde(default, deserialize_with = "nullable")]
    pub unreplicated: bool,
    #[serde(default, deserialize_with = "nullable")]
    pub deprecated: bool,
    #[serde(default, deserialize_with = "nullable")]
    pub hidden: bool,
    #[serde(default, deserialize_with = "nullable")]
    pub unscriptable: bool,
    #[serde(default)]
    pub security: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Member {
    pub name: String,
    pub member_type: MemberType,
    pub value_type: Option<String>,
    pub class_name: String,
    pub inheritance: Vec<String>,
    pub unreplicated: bool,
    pub deprecated: bool,
    pub hidden: bool,
    pub unscriptable: bool,
    pub security: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnumType {
    pub name: String,
    pub enum_items: Vec<EnumItem>,
}

impl EnumType {
    /// The pseudo-items used to test each enum item with the member vocabulary.
    pub fn pseudo_items(&self) -> impl Iterator<Item = EnumItemView<'_>> {
        self.enum_items.iter().map(move |item| EnumItemView { owner: self, item })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FilterableItem {
    Member(Member),
    Enum(EnumType),
}

impl FilterableItem {
    pub fn name(&self) -> &str {
        match self {
            FilterableItem::Member(m) => &m.name,
            FilterableItem::Enum(e) => &e.name,
        }
    }
    pub fn as_member(&self) -> Option<&Member> {
        match self {
            FilterableItem::Member(m) => Some(m),
            FilterableItem::Enum(_) => None,
        }
    }
    pub fn as_enum(&self) -> Option<&EnumType> {
        match self {
            FilterableItem::Enum(e) => Some(e),
            FilterableItem::Member(_) => None,
        }
    }
}

// ------------- Field bindings -------------
impl Bindings for Member {
    fn field(&self, field: Field) -> Value<'_> {
        match field {
            Field::Name => Value::str(&self.name),
            Field::MemberType => Value::str(self.member_type.as_str()),
            Field::ValueType => Value::opt_str(self.value_type.as_deref()),
            Field::ClassName => Value::str(&self.class_name),
            Field::Inheritance => Value::List(&self.inheritance),
            Field::Unreplicated => Value::Bool(self.unreplicated),
            Field::Deprecated => Value::Bool(self.deprecated),
            Field::Hidden => Value::Bool(self.hidden),
            Field::Unscriptable => Value::Bool(self.unscriptable),
            Field::Security => Value::opt_str(self.security.as_deref()),
        }
    }
}

// An enum on its own only has a name; everything else is synthetic.
impl Bindings for EnumType {
    fn field(&self, field: Field) -> Value<'_> {
        match field {
            Field::Name => Value::str(&self.name),
            Field::MemberType | Field::ClassName => Value::str("Enum"),
            Field::ValueType | Field::Security => Value::Null,
            Field::Inheritance => Value::List(&[]),
            Field::Unreplicated | Field::Deprecated | Field::Hidden | Field::Unscriptable => {
                Value::Bool(false)
            }
        }
    }
}

/// An enum item seen as if it were a member of a class named after its enum.
#[derive(Debug, Clone, Copy)]
pub struct EnumItemView<'a> {
    pub owner: &'a EnumType,
    pub item: &'a EnumItem,
}

impl Bindings for EnumItemView<'_> {
    fn field(&self, field: Field) -> Value<'_> {
        match field {
            Field::Name => Value::str(&self.item.name),
            Field::MemberType => Value::str("Enum"),
            Field::ValueType => self.item.value.value(),
            Field::ClassName => Value::str(&self.owner.name),
            Field::Inheritance => Value::List(&[]),
            Field::Unreplicated => Value::Bool(self.item.unreplicated),
            Field::Deprecated => Value::Bool(self.item.deprecated),
            Field::Hidden => Value::Bool(self.item.hidden),
            Field::Unscriptable => Value::Bool(self.item.unscriptable),
            Field::Security => Value::opt_str(self.item.security.as_deref()),
        }
    }
}

impl Bindings for FilterableItem {
    fn field(&self, field: Field) -> Value<'_> {
        match self {
            FilterableItem::Member(m) => m.field(field),
            FilterableItem::Enum(e) => e.field(field),
        }
    }
}

// ------------- Indexing -------------
/// The two flat collections, in declaration order.
#[derive(Debug, Clone, Default)]
pub struct Index {
    pub members: Vec<Arc<FilterableItem>>,
    pub enum_types: Vec<Arc<FilterableItem>>,
}

impl Index {
    pub fn len(&self) -> usize {
        self.members.len() + self.enum_types.len()
    }
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
    /// Members then enums, the order every filter result follows.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<FilterableItem>> {
        self.members.iter().chain(self.enum_types.iter())
    }
}

pub fn index(dataset: &RawDataset) -> Index {
    let members = dataset
        .classes
        .iter()
        .flat_map(|class| {
            class.members.iter().map(move |member| {
                Arc::new(FilterableItem::Member(Member {
                    name: member.name.clone(),
                    member_type: member.member_type,
                    value_type: member.value_type.clone(),
                    class_name: class.name.clone(),
                    inheritance: class.inherits.clone(),
                    unreplicated: member.unreplicated,
                    deprecated: member.deprecated,
                    hidden: member.hidden,
                    unscriptable: member.unscriptable,
                    security: member.security.clone(),
                }))
            })
        })
        .collect();
    let enum_types = dataset
        .enums
        .iter()
        .map(|raw| {
            Arc::new(FilterableItem::Enum(EnumType {
                name: raw.name.clone(),
                enum_items: raw.items.clone(),
            }))
        })
        .collect();
    Index { members, enum_types }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::from_json_str;

    const DATASET: &str = r#"{
        "classes": [
            {"name": "Part", "inherits": ["BasePart", "Instance"], "members": [
                {"name": "Anchored", "member_type": "Property", "value_type": "bool"},
                {"name": "Touched", "member_type": "Event", "security": "None"}
            ]},
            {"name": "Workspace", "members": [
                {"name": "Raycast", "member_type": "Function", "deprecated": true}
            ]}
        ],
        "enums": [
            {"name": "Material", "items": [
                {"name": "Plastic", "value": 256},
                {"name": "Wood", "value": 512, "hidden": true}
            ]}
        ]
    }"#;

    #[test]
    fn flattens_in_declaration_order() {
        let index = index(&from_json_str(DATASET).unwrap());
        let names: Vec<&str> = index.iter().map(|i| i.name()).collect();
        assert_eq!(names, ["Anchored", "Touched", "Raycast", "Material"]);
        let touched = index.members[1].as_member().unwrap();
        assert_eq!(touched.class_name, "Part");
        assert_eq!(touched.inheritance, ["BasePart", "Instance"]);
        assert_eq!(touched.security.as_deref(), Some("None"));
        let raycast = index.members[2].as_member().unwrap();
        assert!(raycast.inheritance.is_empty());
        assert!(raycast.deprecated);
    }

    #[test]
    fn enum_synthetic_fields() {
        let index = index(&from_json_str(DATASET).unwrap());
        let material = index.enum_types[0].as_enum().unwrap();
        assert_eq!(material.field(Field::MemberType), Value::str("Enum"));
        assert_eq!(material.field(Field::ClassName), Value::str("Enum"));
        assert_eq!(material.field(Field::Security), Value::Null);
        assert_eq!(material.field(Field::Hidden), Value::Bool(false));

        let wood = material.pseudo_items().nth(1).unwrap();
        assert_eq!(wood.field(Field::ClassName), Value::str("Material"));
        assert_eq!(wood.field(Field::ValueType), Value::Number(512.0));
        assert_eq!(wood.field(Field::Hidden), Value::Bool(true));
    }

    #[test]
    fn unexpected_shapes_do_not_fail_the_load() {
        let dataset = from_json_str(
            r#"{"classes": [{"name": "Part", "members": [
                {"name": "Shape", "member_type": "Plugin"},
                {"name": "Size"}
            ]}], "enums": [{"name": "Axis", "items": [
                {"name": "X"},
                {"name": "Y", "value": null},
                {"name": "Z", "value": true}
            ]}]}"#,
        )
        .unwrap();
        let index = index(&dataset);
        let shape = index.members[0].as_member().unwrap();
        assert_eq!(shape.member_type, MemberType::Unknown);
        assert_eq!(shape.field(Field::MemberType), Value::str("Unknown"));
        assert_eq!(index.members[1].as_member().unwrap().member_type, MemberType::Unknown);
        let axis = index.enum_types[0].as_enum().unwrap();
        assert_eq!(axis.enum_items[0].value, EnumValue::Null);
        assert_eq!(axis.enum_items[1].value, EnumValue::Null);
        assert_eq!(axis.pseudo_items().next().unwrap().field(Field::ValueType), Value::Null);
        assert_eq!(axis.enum_items[2].value, EnumValue::Bool(true));
    }

    #[test]
    fn empty_dataset_indexes_to_nothing() {
        let index = index(&RawDataset::default());
        assert!(index.is_empty());
    }

    #[test]
    fn serialized_items_are_tagged() {
        let index = index(&from_json_str(DATASET).unwrap());
        let json = serde_json::to_value(&*index.members[0]).unwrap();
        assert_eq!(json["kind"], "member");
        assert_eq!(json["className"], "Part");
        assert_eq!(json["memberType"], "Property");
        let json = serde_json::to_value(&*index.enum_types[0]).unwrap();
        assert_eq!(json["kind"], "enum");
        assert_eq!(json["enumItems"][0]["value"], 256);
    }
}
