//! Link rendering
//!
//! Links depend on routing, which the codec does not own. The [`LinkBuilder`] trait is
//! the seam: [`NoLinks`] renders nothing and [`PathLinkBuilder`] derives conventional
//! paths (`/articles/1`, `/articles/1/relationships/author`) from a base URL.

use crate::document::{RelationshipLinks, ResourceLinks, TopLevelLinks};
use crate::request::RequestScope;
use crate::resources::{RelationshipDef, Resource, ResourceShape};

pub trait LinkBuilder {
    fn top_level_links(&self, scope: &RequestScope) -> Option<TopLevelLinks>;

    fn resource_links(&self, shape: &ResourceShape, id: Option<&str>) -> Option<ResourceLinks>;

    fn relationship_links(
        &self,
        shape: &ResourceShape,
        relationship: &RelationshipDef,
        resource: &Resource,
    ) -> Option<RelationshipLinks>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoLinks;

impl LinkBuilder for NoLinks {
    fn top_level_links(&self, _scope: &RequestScope) -> Option<TopLevelLinks> {
        None
    }

    fn resource_links(&self, _shape: &ResourceShape, _id: Option<&str>) -> Option<ResourceLinks> {
        None
    }

    fn relationship_links(
        &self,
        _shape: &ResourceShape,
        _relationship: &RelationshipDef,
        _resource: &Resource,
    ) -> Option<RelationshipLinks> {
        None
    }
}

/// Builds links from a base URL and the conventional route layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathLinkBuilder {
    pub base_url: String,
    pub top_level: bool,
    pub resources: bool,
    pub relationships: bool,
}

impl Default for PathLinkBuilder {
    fn default() -> Self {
        PathLinkBuilder {
            base_url: String::new(),
            top_level: true,
            resources: true,
            relationships: true,
        }
    }
}

impl PathLinkBuilder {
    pub fn new(base_url: impl Into<String>) -> Self {
        PathLinkBuilder {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            ..PathLinkBuilder::default()
        }
    }

    fn resource_path(&self, type_name: &str, id: &str) -> String {
        format!("{}/{}/{}", self.base_url, type_name, id)
    }
}

impl LinkBuilder for PathLinkBuilder {
    fn top_level_links(&self, scope: &RequestScope) -> Option<TopLevelLinks> {
        if !self.top_level {
            return None;
        }
        let path = scope.request_path.as_ref()?;
        Some(TopLevelLinks {
            self_link: Some(format!("{}{}", self.base_url, path)),
            ..TopLevelLinks::default()
        })
    }

    fn resource_links(&self, shape: &ResourceShape, id: Option<&str>) -> Option<ResourceLinks> {
        if !self.resources {
            return None;
        }
        Some(ResourceLinks {
            self_link: Some(self.resource_path(&shape.name, id?)),
        })
    }

    fn relationship_links(
        &self,
        shape: &ResourceShape,
        relationship: &RelationshipDef,
        resource: &Resource,
    ) -> Option<RelationshipLinks> {
        if !self.relationships {
            return None;
        }
        let base = self.resource_path(&shape.name, resource.id.as_deref()?);
        Some(RelationshipLinks {
            self_link: Some(format!("{base}/relationships/{}", relationship.name)),
            related: Some(format!("{base}/{}", relationship.name)),
        })
    }
}
