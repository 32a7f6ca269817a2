use crate::map::{EntityId, MapSurface};

/// Overlays of the single visible scene.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SceneEntities {
    pub marker: Option<EntityId>,
    pub polyline: Option<EntityId>,
    pub origin: Option<EntityId>,
    pub destination: Option<EntityId>,
}

impl SceneEntities {
    pub fn is_empty(&self) -> bool {
        self.marker.is_none()
            && self.polyline.is_none()
            && self.origin.is_none()
            && self.destination.is_none()
    }

    /// Removes every overlay from the surface and forgets it.
    pub fn clear(&mut self, surface: &dyn MapSurface) -> usize {
        let mut removed = 0;
        for slot in [
            &mut self.marker,
            &mut self.polyline,
            &mut self.origin,
            &mut self.destination,
        ] {
            if let Some(entity) = slot.take() {
                surface.remove_entity(entity);
                removed += 1;
            }
        }
        removed
    }
}

/// Truncates to `max_chars` characters, appending an ellipsis when cut.
pub fn marker_label(query: &str, max_chars: usize) -> String {
    let mut chars = query.chars();
    let head: String = chars.by_ref().take(max_chars).collect();
    if chars.next().is_some() {
        format!("{head}…")
    } else {
        head
    }
}
