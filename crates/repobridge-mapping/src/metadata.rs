//! Memoised lookup of declarative metadata.
//!
//! Scanning annotation slices is cheap but not free, and entity model
//! construction asks the same questions for every property of every type in a
//! hierarchy. Each (type, member, kind) answer is computed once and kept for
//! the lifetime of the cache.

use repobridge_core::{Annotation, EntityDescriptor, MetadataKind};
use std::any::TypeId;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct CacheKey {
    type_id: TypeId,
    member: Option<&'static str>,
    kind: MetadataKind,
}

/// Per-(type, member, kind) memo of annotation lookups.
#[derive(Debug, Default)]
pub struct AnnotationCache {
    entries: RwLock<HashMap<CacheKey, Arc<[Annotation]>>>,
}

impl AnnotationCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// The type-level annotation of `kind`, if declared.
    ///
    /// Repeatable kinds and kinds that only apply to members yield `None`;
    /// use `find_repeatable_metadata` for the former.
    pub fn find_metadata(
        &self,
        entity: &EntityDescriptor,
        kind: MetadataKind,
    ) -> Option<Annotation> {
        if !kind.applies_to_type() || kind.is_repeatable() {
            return None;
        }
        self.lookup(entity, None, kind).first().copied()
    }

    /// Every distinct type-level annotation of `kind`, in declaration order.
    pub fn find_repeatable_metadata(
        &self,
        entity: &EntityDescriptor,
        kind: MetadataKind,
    ) -> Vec<Annotation> {
        if !kind.applies_to_type() {
            return Vec::new();
        }
        self.lookup(entity, None, kind).to_vec()
    }

    /// The annotation of `kind` on the property `member` declared by `entity`.
    ///
    /// Unknown members and kinds that only apply to types yield `None`.
    pub fn find_member_metadata(
        &self,
        entity: &EntityDescriptor,
        member: &'static str,
        kind: MetadataKind,
    ) -> Option<Annotation> {
        if !kind.applies_to_member() {
            return None;
        }
        self.lookup(entity, Some(member), kind).first().copied()
    }

    /// Number of memoised answers.
    pub fn cached_entries(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    fn lookup(
        &self,
        entity: &EntityDescriptor,
        member: Option<&'static str>,
        kind: MetadataKind,
    ) -> Arc<[Annotation]> {
        let key = CacheKey {
            type_id: entity.type_id(),
            member,
            kind,
        };

        // Fast path: already answered
        {
            let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(found) = entries.get(&key) {
                return Arc::clone(found);
            }
        }

        let found: Arc<[Annotation]> = scan(entity, member, kind).into();
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(entries.entry(key).or_insert(found))
    }
}

fn scan(
    entity: &EntityDescriptor,
    member: Option<&'static str>,
    kind: MetadataKind,
) -> Vec<Annotation> {
    let source: &[Annotation] = match member {
        None => entity.annotations(),
        Some(name) => entity
            .declared_properties()
            .iter()
            .find(|p| p.name == name)
            .map_or(&[][..], |p| p.annotations),
    };
    let mut out: Vec<Annotation> = Vec::new();
    for annotation in source.iter().filter(|a| a.kind() == kind) {
        if !out.contains(annotation) {
            out.push(*annotation);
        }
    }
    out
}
