//! definition::objects — the components attached to one model object.

use crate::definition::{
    components::{
        Component, ComponentKind, EllipticityComponent, ObjectComponent, PositionComponent,
        RadiusComponent,
    },
    errors::{DefinitionError, DefinitionResult},
};

/// ObjectComponentSet — at most one component of each kind for a single
/// object.
///
/// Fields
/// ------
/// - `id`: caller-assigned object id, unique within a
///   [`Definition`](crate::definition::Definition).
/// - `position`, `radius`, `ellipticity`: typed slots; a point source has
///   only a position.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectComponentSet {
    id: u64,
    position: Option<PositionComponent>,
    radius: Option<RadiusComponent>,
    ellipticity: Option<EllipticityComponent>,
}

impl ObjectComponentSet {
    pub fn new(id: u64) -> Self {
        ObjectComponentSet { id, position: None, radius: None, ellipticity: None }
    }

    /// Builder form of [`insert`](Self::insert).
    pub fn with(mut self, component: impl Into<ObjectComponent>) -> DefinitionResult<Self> {
        self.insert(component)?;
        Ok(self)
    }

    /// Place `component` in its slot.
    ///
    /// Errors
    /// ------
    /// - `DefinitionError::DuplicateComponent` when the slot is taken.
    pub fn insert(&mut self, component: impl Into<ObjectComponent>) -> DefinitionResult<()> {
        let component = component.into();
        let duplicate =
            DefinitionError::DuplicateComponent { object: self.id, component: component.kind() };
        match component {
            ObjectComponent::Position(c) => fill(&mut self.position, c).ok_or(duplicate),
            ObjectComponent::Radius(c) => fill(&mut self.radius, c).ok_or(duplicate),
            ObjectComponent::Ellipticity(c) => fill(&mut self.ellipticity, c).ok_or(duplicate),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn position(&self) -> Option<&PositionComponent> {
        self.position.as_ref()
    }

    pub fn radius(&self) -> Option<&RadiusComponent> {
        self.radius.as_ref()
    }

    pub fn ellipticity(&self) -> Option<&EllipticityComponent> {
        self.ellipticity.as_ref()
    }

    pub fn get(&self, kind: ComponentKind) -> Option<ObjectComponent> {
        match kind {
            ComponentKind::Position => self.position.map(ObjectComponent::Position),
            ComponentKind::Radius => self.radius.map(ObjectComponent::Radius),
            ComponentKind::Ellipticity => self.ellipticity.map(ObjectComponent::Ellipticity),
        }
    }

    /// Present components in position, radius, ellipticity order.
    pub fn components(&self) -> impl Iterator<Item = ObjectComponent> + '_ {
        [ComponentKind::Position, ComponentKind::Radius, ComponentKind::Ellipticity]
            .into_iter()
            .filter_map(|kind| self.get(kind))
    }

    pub fn free_parameters(&self) -> usize {
        self.components().map(|c| c.free_parameters()).sum()
    }

    /// Values of the active components, concatenated in component order.
    pub fn active_values(&self) -> Vec<f64> {
        self.components().filter(|c| c.is_active()).flat_map(|c| c.values()).collect()
    }

    /// Errors
    /// ------
    /// - `DefinitionError::OutsideBounds` for the first component whose
    ///   value violates its bounds.
    pub fn check_bounds(&self) -> DefinitionResult<()> {
        let inside = [
            (ComponentKind::Position, self.position.is_none_or(|c| c.is_within_bounds())),
            (ComponentKind::Radius, self.radius.is_none_or(|c| c.is_within_bounds())),
            (ComponentKind::Ellipticity, self.ellipticity.is_none_or(|c| c.is_within_bounds())),
        ];
        match inside.iter().find(|(_, ok)| !ok) {
            Some(&(component, _)) => {
                Err(DefinitionError::OutsideBounds { object: self.id, component })
            }
            None => Ok(()),
        }
    }
}

fn fill<T>(slot: &mut Option<T>, value: T) -> Option<()> {
    if slot.is_some() {
        return None;
    }
    *slot = Some(value);
    Some(())
}
