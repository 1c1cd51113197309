//! In-memory annotation store.
//!
//! Used by [`crate::scan`] for dry runs and by tests. Markers are kept in
//! commit order; `commit` counts as a redraw.

use crate::error::RedactError;
use crate::geometry::Quad;
use crate::pipeline::annotate::{AnnotationStore, MarkerHeader, RedactionMarker};

#[derive(Debug, Clone, Default)]
pub struct MemoryAnnotationStore {
    user: String,
    markers: Vec<RedactionMarker>,
    redraws: usize,
}

impl MemoryAnnotationStore {
    pub fn new(user: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            ..Self::default()
        }
    }

    pub fn markers(&self) -> &[RedactionMarker] {
        &self.markers
    }

    pub fn markers_for_page(&self, page_num: usize) -> impl Iterator<Item = &RedactionMarker> {
        self.markers
            .iter()
            .filter(move |m| m.header.page_num == page_num)
    }

    pub fn redraw_count(&self) -> usize {
        self.redraws
    }

    pub fn into_markers(self) -> Vec<RedactionMarker> {
        self.markers
    }
}

impl AnnotationStore for MemoryAnnotationStore {
    type Quad = Quad;
    type Marker = RedactionMarker;

    fn current_user(&self) -> String {
        self.user.clone()
    }

    fn build_quad(&mut self, _page_num: usize, quad: &Quad) -> Result<Quad, RedactError> {
        Ok(*quad)
    }

    fn build_marker(
        &mut self,
        header: &MarkerHeader,
        quads: Vec<Quad>,
    ) -> Result<RedactionMarker, RedactError> {
        Ok(RedactionMarker {
            header: header.clone(),
            quads,
        })
    }

    fn commit(&mut self, marker: RedactionMarker) -> Result<(), RedactError> {
        self.markers.push(marker);
        self.redraws += 1;
        Ok(())
    }
}
