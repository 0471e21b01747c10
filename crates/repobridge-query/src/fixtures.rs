//! Test entity shared by the unit tests of this crate.

use repobridge_core::{
    Annotation, Entity, Mapped, NamingStrategyKind, PropertyInfo, Result, Row, SqlType, Value,
};
use repobridge_mapping::{MappingConfig, MappingContext, PersistentEntity};
use std::sync::Arc;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Person {
    pub id: Option<i64>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub age: Value,
    pub email: Option<String>,
    pub revision: Option<i64>,
    pub scratch: Option<String>,
}

impl Person {
    /// A probe with every property unset.
    pub fn probe() -> Self {
        Self {
            age: Value::Null,
            ..Self::default()
        }
    }

    pub fn id(mut self, id: i64) -> Self {
        self.id = Some(id);
        self
    }

    pub fn first_name(mut self, v: &str) -> Self {
        self.first_name = Some(v.to_string());
        self
    }

    pub fn last_name(mut self, v: &str) -> Self {
        self.last_name = Some(v.to_string());
        self
    }

    pub fn age(mut self, v: i32) -> Self {
        self.age = Value::Int(v);
        self
    }

    pub fn raw_age(mut self, v: Value) -> Self {
        self.age = v;
        self
    }

    pub fn email(mut self, v: &str) -> Self {
        self.email = Some(v.to_string());
        self
    }

    pub fn revision(mut self, v: i64) -> Self {
        self.revision = Some(v);
        self
    }
}

impl Mapped for Person {
    const NAME: &'static str = "Person";
    fn properties() -> &'static [PropertyInfo] {
        static P: &[PropertyInfo] = &[
            PropertyInfo::new("id", SqlType::BigInt).with(&[Annotation::Id]),
            PropertyInfo::new("firstName", SqlType::Text).nullable(true),
            PropertyInfo::new("lastName", SqlType::Text).nullable(true),
            PropertyInfo::new("age", SqlType::Integer).nullable(true),
            PropertyInfo::new("email", SqlType::Text)
                .nullable(true)
                .with(&[Annotation::Indexed(None)]),
            PropertyInfo::new("revision", SqlType::BigInt).with(&[Annotation::Version]),
            PropertyInfo::new("scratch", SqlType::Text).with(&[Annotation::Transient]),
        ];
        P
    }
}

impl Entity for Person {
    fn to_values(&self) -> Vec<(&'static str, Value)> {
        vec![
            ("id", self.id.into()),
            ("firstName", self.first_name.clone().into()),
            ("lastName", self.last_name.clone().into()),
            ("age", self.age.clone()),
            ("email", self.email.clone().into()),
            ("revision", self.revision.into()),
            ("scratch", self.scratch.clone().into()),
        ]
    }

    fn from_row(row: &Row) -> Result<Self> {
        Ok(Self {
            id: row.value("id").as_i64(),
            first_name: row.value("firstName").as_str().map(str::to_string),
            last_name: row.value("lastName").as_str().map(str::to_string),
            age: row.value("age"),
            email: row.value("email").as_str().map(str::to_string),
            revision: row.value("revision").as_i64(),
            scratch: None,
        })
    }
}

pub fn person_model() -> Arc<PersistentEntity> {
    MappingContext::new(MappingConfig::new().naming(NamingStrategyKind::SnakeCase))
        .get_or_create_entity_model::<Person>()
        .expect("person model")
}
