//! Server-side pivot widget.

use crate::model::metadata::PivotableObject;
use crate::model::object::{ObjectRef, ObjectType, ObjectTypeError};
use crate::repo::object_repo::ObjectRepository;
use crate::repo::pivot_repo::{PivotRepository, PivotedObject};
use crate::service::pivot_service::{PivotService, PivotServiceError};
use crate::service::registry::ObjectRegistry;
use serde::Serialize;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Errors from widget configuration and rendering.
#[derive(Debug)]
pub enum WidgetError {
    NegativeNumPerPage(i64),
    NegativePage(i64),
    /// Target type has no `create_item_label` for the dialog title.
    MissingCreateItemLabel(ObjectType),
    /// Source metadata declares an invalid pivotable type.
    InvalidMetadata(ObjectTypeError),
    Service(PivotServiceError),
}

impl Display for WidgetError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NegativeNumPerPage(value) => {
                write!(f, "num-per-page needs to be >= 0, got {value}")
            }
            Self::NegativePage(value) => write!(f, "page number needs to be >= 0, got {value}"),
            Self::MissingCreateItemLabel(obj_type) => {
                write!(f, "create_item label is not defined for `{obj_type}`")
            }
            Self::InvalidMetadata(err) => write!(f, "invalid pivot metadata: {err}"),
            Self::Service(err) => write!(f, "{err}"),
        }
    }
}

impl Error for WidgetError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidMetadata(err) => Some(err),
            Self::Service(err) => Some(err),
            _ => None,
        }
    }
}

impl From<PivotServiceError> for WidgetError {
    fn from(value: PivotServiceError) -> Self {
        Self::Service(value)
    }
}

/// Options handed to the client script.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WidgetOptions {
    pub title: Option<String>,
    pub obj_type: String,
    pub obj_id: String,
    pub target_object_type: String,
}

/// Rendered widget data.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PivotWidgetView {
    pub options: WidgetOptions,
    pub has_obj: bool,
    pub has_pivots: bool,
    /// Count of listed pivots before pagination.
    pub total: usize,
    pub page: usize,
    pub num_per_page: usize,
    pub entries: Vec<PivotedObject>,
    pub pivotable_objects: Vec<PivotableObject>,
    pub dialog_title: Option<String>,
}

/// Pivot list widget for one source object and one target type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PivotWidget {
    source: ObjectRef,
    target_type: ObjectType,
    title: Option<String>,
    num_per_page: usize,
    page: usize,
}

impl PivotWidget {
    pub fn new(source: ObjectRef, target_type: ObjectType) -> Self {
        Self {
            source,
            target_type,
            title: None,
            num_per_page: 0,
            page: 0,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Sets how many pivots are displayed per page. `0` shows all.
    pub fn set_num_per_page(&mut self, num: i64) -> Result<&mut Self, WidgetError> {
        if num < 0 {
            return Err(WidgetError::NegativeNumPerPage(num));
        }
        self.num_per_page = num as usize;
        Ok(self)
    }

    /// Sets the current page, starting at 0.
    pub fn set_page(&mut self, page: i64) -> Result<&mut Self, WidgetError> {
        if page < 0 {
            return Err(WidgetError::NegativePage(page));
        }
        self.page = page as usize;
        Ok(self)
    }

    pub fn source(&self) -> &ObjectRef {
        &self.source
    }

    pub fn target_type(&self) -> &ObjectType {
        &self.target_type
    }

    pub fn widget_options(&self) -> WidgetOptions {
        WidgetOptions {
            title: self.title.clone(),
            obj_type: self.source.obj_type.to_string(),
            obj_id: self.source.id.to_string(),
            target_object_type: self.target_type.to_string(),
        }
    }

    /// Title of the "create target" dialog.
    pub fn dialog_title(&self, registry: &ObjectRegistry) -> Result<String, WidgetError> {
        registry
            .metadata(&self.target_type)
            .and_then(|metadata| metadata.create_item_label.as_deref())
            .map(str::trim)
            .filter(|label| !label.is_empty())
            .map(str::to_string)
            .ok_or_else(|| WidgetError::MissingCreateItemLabel(self.target_type.clone()))
    }

    /// Loads pivots and builds the widget view.
    pub fn render<P: PivotRepository, O: ObjectRepository>(
        &self,
        service: &PivotService<'_, P, O>,
    ) -> Result<PivotWidgetView, WidgetError> {
        let has_obj = service.find_object(&self.source)?.is_some();
        let all = service.list_pivots(&self.source, &self.target_type)?;
        let total = all.len();
        let entries = self.paginate(all);

        let registry = service.registry();
        let pivotable_objects = match registry.metadata(&self.source.obj_type) {
            Some(metadata) => metadata
                .pivots
                .pivotable_objects()
                .map_err(WidgetError::InvalidMetadata)?,
            None => Vec::new(),
        };

        Ok(PivotWidgetView {
            options: self.widget_options(),
            has_obj,
            has_pivots: total > 0,
            total,
            page: self.page,
            num_per_page: self.num_per_page,
            entries,
            pivotable_objects,
            dialog_title: self.dialog_title(registry).ok(),
        })
    }

    fn paginate(&self, items: Vec<PivotedObject>) -> Vec<PivotedObject> {
        if self.num_per_page == 0 {
            return items;
        }
        items
            .into_iter()
            .skip(self.page.saturating_mul(self.num_per_page))
            .take(self.num_per_page)
            .collect()
    }
}
