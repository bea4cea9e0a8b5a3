//! Renderer elements created by the host, keyed by element id

use std::collections::HashMap;

use remote_ui_protocol::{LabelMeasuringRequest, RendererDescriptor, RendererType, SolidLabelDesc};

use crate::error::{Classify, ErrorKind};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("element {0} already exists")]
    DuplicateId(i64),
    #[error("element {0} does not exist")]
    UnknownId(i64),
    #[error("element {id} was created as {expected:?}, update is {found:?}")]
    TagMismatch {
        id: i64,
        expected: RendererType,
        found: RendererType,
    },
}

impl Classify for RegistryError {
    fn kind(&self) -> ErrorKind {
        match self {
            Self::DuplicateId(_) => ErrorKind::DuplicateId,
            Self::UnknownId(_) => ErrorKind::UnknownId,
            Self::TagMismatch { .. } => ErrorKind::InvalidStructure,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ElementEntry {
    pub kind: RendererType,
    pub descriptor: RendererDescriptor,
    /// Bumped on every create/update; never reused across ids
    pub revision: u64,
}

#[derive(Debug, Clone, Default)]
pub struct ElementRegistry {
    entries: HashMap<i64, ElementEntry>,
    next_revision: u64,
}

impl ElementRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn bump(&mut self) -> u64 {
        self.next_revision += 1;
        self.next_revision
    }

    /// Register a new element; `initial` must be of the same kind when given
    pub fn create(
        &mut self,
        id: i64,
        kind: RendererType,
        initial: Option<RendererDescriptor>,
    ) -> Result<(), RegistryError> {
        if self.entries.contains_key(&id) {
            return Err(RegistryError::DuplicateId(id));
        }
        let descriptor = match initial {
            Some(desc) if desc.renderer_type() != kind => {
                return Err(RegistryError::TagMismatch {
                    id,
                    expected: kind,
                    found: desc.renderer_type(),
                })
            }
            Some(desc) => desc,
            None => RendererDescriptor::default_for(kind, id),
        };
        let revision = self.bump();
        self.entries.insert(
            id,
            ElementEntry {
                kind,
                descriptor,
                revision,
            },
        );
        Ok(())
    }

    /// Replace an element's descriptor, returning the new revision
    pub fn update(&mut self, descriptor: RendererDescriptor) -> Result<u64, RegistryError> {
        let id = descriptor.id();
        let entry = self.entries.get(&id).ok_or(RegistryError::UnknownId(id))?;
        if entry.kind != descriptor.renderer_type() {
            return Err(RegistryError::TagMismatch {
                id,
                expected: entry.kind,
                found: descriptor.renderer_type(),
            });
        }

        let merged = match (descriptor, &entry.descriptor) {
            (RendererDescriptor::SolidLabel(mut label), RendererDescriptor::SolidLabel(old)) => {
                if label.font.is_none() {
                    label.font.clone_from(&old.font);
                }
                if label.text.is_none() {
                    label.text.clone_from(&old.text);
                }
                RendererDescriptor::SolidLabel(label)
            }
            (descriptor, _) => descriptor,
        };

        let revision = self.bump();
        if let Some(entry) = self.entries.get_mut(&id) {
            entry.descriptor = merged;
            entry.revision = revision;
        }
        Ok(revision)
    }

    /// Forget an element; disposing an unknown id does nothing
    pub fn dispose(&mut self, id: i64) -> bool {
        self.entries.remove(&id).is_some()
    }

    pub fn resolve(&self, id: i64) -> Option<&RendererDescriptor> {
        self.entries.get(&id).map(|e| &e.descriptor)
    }

    pub fn entry(&self, id: i64) -> Option<&ElementEntry> {
        self.entries.get(&id)
    }

    pub fn contains(&self, id: i64) -> bool {
        self.entries.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Labels that asked to be measured, clearing the request
    pub fn take_measuring_requests(&mut self) -> Vec<(SolidLabelDesc, LabelMeasuringRequest)> {
        let mut requests: Vec<_> = self
            .entries
            .values_mut()
            .filter_map(|entry| match &mut entry.descriptor {
                RendererDescriptor::SolidLabel(label) => label
                    .measuring_request
                    .take()
                    .map(|request| (label.clone(), request)),
                _ => None,
            })
            .collect();
        requests.sort_by_key(|(label, _)| label.id);
        requests
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use remote_ui_protocol::{
        Color, FontProperties, InnerShadowDesc, SolidBorderDesc, SolidLabelDesc,
    };

    fn label(id: i64, text: Option<&str>, size: Option<i64>) -> RendererDescriptor {
        RendererDescriptor::SolidLabel(SolidLabelDesc {
            id,
            text: text.map(str::to_string),
            font: size.map(|size| FontProperties {
                font_family: "Arial".to_string(),
                size,
                ..FontProperties::default()
            }),
            ..SolidLabelDesc::default()
        })
    }

    #[test]
    fn create_then_resolve_defaults() {
        let mut registry = ElementRegistry::new();
        registry.create(1, RendererType::SolidBorder, None).unwrap();
        assert_eq!(
            registry.resolve(1),
            Some(&RendererDescriptor::SolidBorder(SolidBorderDesc {
                id: 1,
                ..SolidBorderDesc::default()
            }))
        );
        assert_eq!(
            registry.create(1, RendererType::Polygon, None),
            Err(RegistryError::DuplicateId(1))
        );
    }

    #[test]
    fn create_rejects_mismatched_initial_descriptor() {
        let mut registry = ElementRegistry::new();
        let err = registry
            .create(2, RendererType::Polygon, Some(label(2, None, None)))
            .unwrap_err();
        assert!(matches!(err, RegistryError::TagMismatch { id: 2, .. }));
        assert!(registry.is_empty());
    }

    #[test]
    fn update_with_other_tag_is_rejected() {
        let mut registry = ElementRegistry::new();
        registry.create(3, RendererType::SolidLabel, None).unwrap();
        let before = registry.entry(3).cloned();

        let err = registry
            .update(RendererDescriptor::InnerShadow(InnerShadowDesc {
                id: 3,
                shadow_color: Color::rgb(1, 2, 3),
                thickness: 2,
            }))
            .unwrap_err();

        assert_eq!(
            err,
            RegistryError::TagMismatch {
                id: 3,
                expected: RendererType::SolidLabel,
                found: RendererType::InnerShadow,
            }
        );
        assert_eq!(registry.entry(3).cloned(), before);
    }

    #[test]
    fn update_unknown_id() {
        let mut registry = ElementRegistry::new();
        assert_eq!(
            registry.update(label(9, None, None)),
            Err(RegistryError::UnknownId(9))
        );
    }

    #[test]
    fn double_dispose_is_a_no_op() {
        let mut registry = ElementRegistry::new();
        registry.create(4, RendererType::SinkBorder, None).unwrap();
        assert!(registry.dispose(4));
        assert!(!registry.dispose(4));
        assert!(registry.resolve(4).is_none());
        assert!(!registry.dispose(4));
    }

    #[test]
    fn label_keeps_font_and_text_on_null_update() {
        let mut registry = ElementRegistry::new();
        registry.create(5, RendererType::SolidLabel, None).unwrap();
        registry.update(label(5, Some("OK"), Some(12))).unwrap();
        registry.update(label(5, None, None)).unwrap();

        let Some(RendererDescriptor::SolidLabel(desc)) = registry.resolve(5) else {
            panic!("expected a label");
        };
        assert_eq!(desc.text.as_deref(), Some("OK"));
        assert_eq!(desc.font.as_ref().map(|f| f.size), Some(12));

        registry.update(label(5, Some("Cancel"), None)).unwrap();
        let Some(RendererDescriptor::SolidLabel(desc)) = registry.resolve(5) else {
            panic!("expected a label");
        };
        assert_eq!(desc.text.as_deref(), Some("Cancel"));
    }

    #[test]
    fn revisions_increase_across_recreation() {
        let mut registry = ElementRegistry::new();
        registry.create(6, RendererType::Polygon, None).unwrap();
        let first = registry.entry(6).unwrap().revision;
        registry.dispose(6);
        registry.create(6, RendererType::Polygon, None).unwrap();
        assert!(registry.entry(6).unwrap().revision > first);
    }

    #[test]
    fn measuring_requests_are_taken_once() {
        let mut registry = ElementRegistry::new();
        registry.create(7, RendererType::SolidLabel, None).unwrap();
        let RendererDescriptor::SolidLabel(mut desc) = label(7, Some("x"), Some(10)) else {
            unreachable!()
        };
        desc.measuring_request = Some(LabelMeasuringRequest::TotalSize);
        registry.update(RendererDescriptor::SolidLabel(desc)).unwrap();

        let requests = registry.take_measuring_requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].1, LabelMeasuringRequest::TotalSize);
        assert!(registry.take_measuring_requests().is_empty());
    }
}
